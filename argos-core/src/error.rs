//! Error types for argos

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Document already indexed under key: {0}")]
    AlreadyIndexed(String),

    #[error("Index is empty")]
    EmptyIndex,

    #[error("Bad query: {0}")]
    BadQuery(String),

    #[error("Index corruption: {0}")]
    Corruption(String),

    #[error("Precondition failure: {0}")]
    Precondition(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;
