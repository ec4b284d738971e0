use uuid::Uuid;

/// Errors raised by an `OutboxStore` implementation.
#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("envelope {0} not found in outbox")]
    NotFound(Uuid),

    #[error("envelope {0} is not in_progress")]
    NotInProgress(Uuid),

    #[error("envelope {0} is not in the DLQ")]
    NotInDlq(Uuid),

    #[error("backing store unreachable: {0}")]
    StoreUnavailable(String),
}
