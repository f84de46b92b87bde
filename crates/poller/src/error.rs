use activity_trail::TrailError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PollError {
    #[error("poller is shut down")]
    Shutdown,
    #[error("scan trigger failed: {0}")]
    Scan(#[from] TrailError),
    #[error("poll task failed: {0}")]
    Join(String),
}
