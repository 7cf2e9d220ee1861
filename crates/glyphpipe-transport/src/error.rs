/// Errors that can occur while setting up or tearing down pipe transports.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The OS refused to create a pipe.
    #[error("failed to create pipe: {0}")]
    Pipe(std::io::Error),

    /// Failed to fork the child role.
    #[error("failed to fork child process: {0}")]
    Fork(std::io::Error),

    /// Failed to reap the child role.
    #[error("failed to wait for child process {pid}: {source}")]
    Wait { pid: i32, source: std::io::Error },

    /// An I/O error occurred on a pipe end.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
