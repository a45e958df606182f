/// Errors surfaced to callers of the A/B testing client.
///
/// Only caller misuse is reported here. Network failures, bad payloads and
/// unusable custom subjects resolve to the default value instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    /// Raised while building outbound custom properties.
    #[error("illegal data: {0}")]
    IllegalData(String),

    /// Only returned by manual exposure tracking.
    #[error("failed to track event: {0}")]
    Track(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
