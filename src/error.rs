use thiserror::Error;

/// Errors produced by the detection workflow and its network clients.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("No cropped leaf image available")]
    CropUnavailable,

    #[error("Image error: {0}")]
    Image(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error: HTTP {status}: {body}")]
    Server { status: u16, body: String },

    // Domain-level error carried in a 2xx body; the server message is
    // surfaced verbatim.
    #[error("{0}")]
    Model(String),

    #[error("Advice unavailable: {0}")]
    AdviceUnavailable(String),

    #[error("Step not available: {0}")]
    Precondition(&'static str),

    #[error("Another operation is already in flight")]
    Busy,

    #[error("Session expired, login required")]
    SessionExpired,
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

impl From<reqwest::Error> for WorkflowError {
    fn from(err: reqwest::Error) -> Self {
        WorkflowError::Network(err.to_string())
    }
}
