//! Error types for the Tabula shell

use thiserror::Error;

use tabula_core::TabulaError;

/// Errors that can occur while running a shell command
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sheet(#[from] TabulaError),

    #[error("{0}")]
    Command(String),
}

pub type Result<T> = std::result::Result<T, ShellError>;
