use std::time::Duration;

/// Failure of a whole dispatch cycle. Per-habit problems never surface here.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("habit store unavailable: {0:#}")]
    StoreUnavailable(anyhow::Error),

    #[error("a reminder cycle is already running")]
    AlreadyRunning,
}

/// Why a single notification did not go out. The dispatch cycle treats every
/// variant the same way: skip the habit, leave its marker alone.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("network error: {0}")]
    Network(String),

    #[error("provider rejected message ({status}): {description}")]
    Rejected { status: u16, description: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("send timed out after {0:?}")]
    Timeout(Duration),
}
