//! Store and configuration errors shared by the poller and the API

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// SQLite query or connection failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem failure while reading config or creating the data directory
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// No track play with the given id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unparsable variant name or stored timestamp
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Write rejected by a UNIQUE index (a playlist event id already recorded)
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}
