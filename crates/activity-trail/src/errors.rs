use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrailError {
    #[error("invalid argument: {0}")]
    InvalidArg(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("backend returned status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("malformed response body: {0}")]
    Malformed(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl TrailError {
    /// Whether the failure came from talking to the backend.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            TrailError::Transport(_) | TrailError::Status { .. } | TrailError::Malformed(_)
        )
    }
}

pub type TrailResult<T> = Result<T, TrailError>;
