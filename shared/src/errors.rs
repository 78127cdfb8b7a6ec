//! Shared error types for the runner workspace

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Serialization failed: {message}")]
    SerializationError { message: String },

    #[error("Invalid manifest: {message}")]
    InvalidManifest { message: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
