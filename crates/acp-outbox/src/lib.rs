//! Durable outbox and dead-letter queue for staged action envelopes.
pub mod error;
pub mod in_memory;
pub mod record;
#[cfg(feature = "sql")]
pub mod sql;
pub mod store;

pub use error::OutboxError;
pub use in_memory::InMemoryOutboxStore;
pub use record::{DeskQueueItem, DeskQueueStatus, OutboxRecord, OutboxStatus};
#[cfg(feature = "sql")]
pub use sql::SqlOutboxStore;
pub use store::OutboxStore;
