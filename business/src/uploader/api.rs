//! Upload endpoint contract.
//!
//! One `POST <upload_url>` per file, multipart body with a single part named
//! after the configured field. The server answers with
//! `{ "data": { "filename": "<stored name>" } }` on success, or
//! `{ "data": { "<field>": "<user-displayable message>" } }` on rejection.

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::drop_surface::CandidateFile;
use super::error::UploadError;
use crate::config::UploaderConfig;
use crate::http::{Client, HttpError, MultipartFile, Response};

#[derive(Debug, Deserialize)]
struct UploadResponseBody {
    data: UploadResponseData,
}

#[derive(Debug, Deserialize)]
struct UploadResponseData {
    filename: String,
}

/// Map transferred bytes to a display percentage.
///
/// Clamped to 1..=99: 100 is reserved for "the server answered", so a fully
/// transmitted body still shows 99 until the response is processed.
pub(crate) fn transfer_percent(sent: u64, total: u64) -> u8 {
    if total == 0 || sent >= total {
        return 99;
    }
    let percent = sent.saturating_mul(100) / total;
    (percent as u8).clamp(1, 99)
}

/// Field-error text out of a rejection body, if the server sent one.
fn field_error_message(response: &Response, field: &str) -> Option<String> {
    let value: serde_json::Value = response.json().ok()?;
    value.get("data")?.get(field)?.as_str().map(str::to_owned)
}

/// Upload one file, reporting progress percentages while bytes are in
/// flight. Resolves to the server-assigned filename.
pub(crate) async fn upload_file(
    client: &Client,
    config: &UploaderConfig,
    file: CandidateFile,
    on_progress: impl Fn(u8) + Send + Sync + 'static,
    cancel: CancellationToken,
) -> Result<String, UploadError> {
    let field = config.field_name.to_string();

    let response = client
        .post(config.upload_url.as_str())
        .multipart(MultipartFile {
            field: field.clone(),
            filename: file.filename,
            mime_type: file.mime_type,
            bytes: file.bytes,
        })
        .on_progress(move |sent, total| on_progress(transfer_percent(sent, total)))
        .cancel_token(cancel)
        .send()
        .await
        .map_err(|e| match e {
            HttpError::Cancelled => UploadError::Cancelled,
            HttpError::Transport(message) | HttpError::InvalidRequest(message) => {
                UploadError::Transport(message)
            }
        })?;

    if response.is_success() {
        let body: UploadResponseBody = response
            .json()
            .map_err(|e| UploadError::Transport(format!("malformed upload response: {e}")))?;
        Ok(body.data.filename)
    } else {
        let message = field_error_message(&response, &field)
            .unwrap_or_else(|| format!("upload failed with status {}", response.status));
        Err(UploadError::Rejected(message))
    }
}
