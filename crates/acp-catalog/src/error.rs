use thiserror::Error;

/// Errors raised while resolving or validating against the tool catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("tool `{0}` is not registered in the catalog")]
    UnknownTool(String),

    #[error("tool `{0}` schema is not a valid JSON Schema: {1}")]
    InvalidSchema(String, String),

    #[error("arguments for `{0}` failed schema validation: {1}")]
    SchemaViolation(String, String),
}
