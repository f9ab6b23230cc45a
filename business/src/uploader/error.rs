//! Upload error taxonomy.
//!
//! None of these cross the component boundary as propagated errors; they are
//! folded into slot state (an inline error string) or, for cancellation,
//! discarded. Cancellation is deliberately its own variant: a cancelled
//! request must never be rendered as a failure.

/// Terminal outcome of a single upload request that did not commit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    /// The server rejected the file; the message is user-displayable
    /// field-error text from the response body.
    #[error("{0}")]
    Rejected(String),
    /// The request failed before a usable response arrived.
    #[error("network error: {0}")]
    Transport(String),
    /// The user aborted the request.
    #[error("upload cancelled")]
    Cancelled,
}

impl UploadError {
    /// Text to render next to the failed slot.
    pub fn display_message(&self) -> String {
        match self {
            Self::Rejected(message) => message.clone(),
            Self::Transport(_) | Self::Cancelled => self.to_string(),
        }
    }
}
