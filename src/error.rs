use thiserror::Error;

/// Durable read/write failure.
///
/// Reads recover locally by degrading to defaults; writes surface to the
/// caller so the in-memory record can be left untouched.
#[derive(Debug, Clone, Error)]
pub enum PersistenceError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to write {path}: {message}")]
    Write { path: String, message: String },

    #[error("storage backend failure: {0}")]
    Backend(String),
}
