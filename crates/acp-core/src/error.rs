use thiserror::Error;

/// Errors raised while building or validating core domain types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("payload must be a JSON object")]
    PayloadNotObject,

    #[error("tool_slug is required and must be non-empty")]
    MissingToolSlug,

    #[error("arguments must be a JSON object")]
    InvalidArguments,

    #[error("created_at could not be parsed as an RFC 3339 timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("tool_slug `{0}` is not in the expected PROVIDER__action.name shape")]
    MalformedSlug(String),

    #[error("risk `{0}` is not one of low, medium, high")]
    InvalidRisk(String),
}
