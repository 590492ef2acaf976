use thiserror::Error;

/// Storage failure taxonomy. Not-found is not an error here; lookups
/// return `Ok(None)` and callers decide what absence means.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("database query error: {0}")]
    Query(String),

    #[error("database migration error: {0}")]
    Migration(String),

    /// A key expected to be unique matched more than one record. Fatal
    /// to the operation that hit it; distinct from not-found.
    #[error("found more than one {entity} record for {key}")]
    Integrity { entity: &'static str, key: String },
}
