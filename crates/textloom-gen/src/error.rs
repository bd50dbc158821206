use textloom::v1::{BatchId, EngineError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("event channel closed before batch {0} settled")]
    ChannelClosed(BatchId),

    #[error("generation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, GenError>;
