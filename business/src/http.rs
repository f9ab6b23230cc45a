//! HTTP client for the admin API.
//!
//! A thin layer over `reqwest` shaped for the upload pipeline:
//! - [`Client`] is an explicit factory parameterized by a bearer token, so
//!   authentication is injected rather than read from ambient state.
//! - [`RequestBuilder`] supports multipart file bodies streamed in chunks,
//!   reporting sent/total bytes through a progress callback.
//! - Requests are cancellable mid-flight via a `CancellationToken`; a
//!   cancelled request settles as [`HttpError::Cancelled`], which callers
//!   must keep distinct from a transport failure.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// HTTP method for requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// A simplified HTTP response holding only owned data.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response headers (lowercased keys)
    pub headers: HashMap<String, String>,
    /// Response body as bytes
    pub body: Vec<u8>,
}

impl Response {
    /// Returns true if the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|s| s.as_str())
    }

    /// Attempt to parse the body as UTF-8 text.
    pub fn text(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.clone())
    }

    /// Attempt to deserialize the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// HTTP client error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpError {
    /// The request was aborted through its cancellation token.
    #[error("request cancelled")]
    Cancelled,
    /// The request never produced a response (connect, DNS, reset, ...).
    #[error("transport error: {0}")]
    Transport(String),
    /// The request could not be constructed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for HTTP operations.
pub type HttpResult<T> = Result<T, HttpError>;

/// Upload progress observer: `(bytes_sent, bytes_total)`.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// One file attached to a multipart request.
#[derive(Debug, Clone)]
pub struct MultipartFile {
    pub field: String,
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// HTTP client bound to an optional bearer token.
///
/// Every request built through an authenticated client carries an
/// `Authorization: Bearer <token>` header.
#[derive(Debug, Clone, Default)]
pub struct Client {
    bearer_token: Option<String>,
}

impl Client {
    /// Client without credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Client that authenticates with the given bearer token.
    pub fn with_bearer(token: impl Into<String>) -> Self {
        Self {
            bearer_token: Some(token.into()),
        }
    }

    pub fn get(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::Get, url)
    }

    pub fn post(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::Post, url)
    }

    pub fn put(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::Put, url)
    }

    pub fn delete(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::Delete, url)
    }

    fn request(&self, method: Method, url: impl Into<String>) -> RequestBuilder {
        let builder = RequestBuilder::new(method, url);
        match &self.bearer_token {
            Some(token) => builder.header("Authorization", format!("Bearer {token}")),
            None => builder,
        }
    }
}

/// A builder for constructing HTTP requests.
pub struct RequestBuilder {
    method: Method,
    url: String,
    headers: HashMap<String, String>,
    body: Option<Vec<u8>>,
    multipart: Option<MultipartFile>,
    progress: Option<ProgressFn>,
    cancel: Option<CancellationToken>,
}

impl RequestBuilder {
    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            multipart: None,
            progress: None,
            cancel: None,
        }
    }

    /// Add a header to the request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the request body as raw bytes.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the request body as JSON.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        let json_bytes = serde_json::to_vec(value)?;
        self.body = Some(json_bytes);
        self.headers
            .insert("content-type".to_string(), "application/json".to_string());
        Ok(self)
    }

    /// Attach a file as a multipart body. Takes precedence over [`body`].
    ///
    /// [`body`]: RequestBuilder::body
    pub fn multipart(mut self, file: MultipartFile) -> Self {
        self.multipart = Some(file);
        self
    }

    /// Observe upload progress as `(bytes_sent, bytes_total)`.
    ///
    /// Only fires for multipart bodies; the callback runs on the runtime
    /// driving the request, so it must not block.
    pub fn on_progress(mut self, progress: impl Fn(u64, u64) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    /// Abort the request when `token` is cancelled.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Send the request.
    ///
    /// If a cancellation token was attached and fires first, the result is
    /// `Err(HttpError::Cancelled)` and the connection is dropped.
    pub async fn send(self) -> HttpResult<Response> {
        let cancel = self.cancel.clone();
        let request = self.send_inner();
        match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(HttpError::Cancelled),
                    result = request => result,
                }
            }
            None => request.await,
        }
    }

    async fn send_inner(self) -> HttpResult<Response> {
        let client = reqwest::Client::new();

        let mut request = match self.method {
            Method::Get => client.get(&self.url),
            Method::Post => client.post(&self.url),
            Method::Put => client.put(&self.url),
            Method::Delete => client.delete(&self.url),
        };

        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        if let Some(file) = self.multipart {
            let total = file.bytes.len() as u64;
            let body = match self.progress {
                Some(progress) => progress_body(file.bytes, total, progress),
                None => reqwest::Body::from(file.bytes),
            };
            let part = reqwest::multipart::Part::stream_with_length(body, total)
                .file_name(file.filename)
                .mime_str(&file.mime_type)
                .map_err(|e| HttpError::InvalidRequest(e.to_string()))?;
            let form = reqwest::multipart::Form::new().part(file.field, part);
            request = request.multipart(form);
        } else if let Some(body) = self.body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?;

        // Extract status and headers before consuming the response
        let status = response.status().as_u16();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.as_str().to_lowercase(), v.to_string());
            }
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?
            .to_vec();

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

const UPLOAD_CHUNK: usize = 64 * 1024;

fn chunk_bytes(bytes: &[u8]) -> Vec<Vec<u8>> {
    bytes.chunks(UPLOAD_CHUNK).map(<[u8]>::to_vec).collect()
}

/// Wrap file bytes in a chunked stream that reports cumulative progress as
/// each chunk is handed to the transport.
fn progress_body(bytes: Vec<u8>, total: u64, progress: ProgressFn) -> reqwest::Body {
    let chunks = chunk_bytes(&bytes);
    let mut sent = 0u64;
    let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
        sent += chunk.len() as u64;
        progress(sent, total);
        Ok::<Vec<u8>, std::convert::Infallible>(chunk)
    }));
    reqwest::Body::wrap_stream(stream)
}
