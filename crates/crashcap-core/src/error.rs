use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Sampling error: {0}")]
    Sampling(String),

    #[error("Process {0} not found")]
    NotFound(u32),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Notification delivery failed: {0}")]
    Notification(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures the caller can retry or skip. Config errors are the
    /// exception: they must abort startup before the monitor loop runs.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
