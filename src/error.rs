use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Sink errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Programmer misuse and terminal writer state
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
