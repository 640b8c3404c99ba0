//! Error types for the simulation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Malformed map or inconsistent configuration.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Population targeted at a cell that cannot hold it, or an unknown species.
    #[error("Invalid placement: {0}")]
    InvalidPlacement(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
