use thiserror::Error;

/// Failure reported by an upstream collaborator (roster, server-detail or
/// Discord lookup endpoint).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("unexpected payload: {0}")]
    Payload(String),
}

pub type Result<T> = std::result::Result<T, SourceError>;
