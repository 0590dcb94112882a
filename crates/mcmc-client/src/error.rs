use std::fmt;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while syncing with a monitor service
#[derive(Debug)]
pub enum Error {
    /// The request could not be delivered or answered
    Transport(String),

    /// The service answered with a response of the wrong kind
    UnexpectedResponse {
        expected: &'static str,
        got: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(msg) => write!(f, "Transport error: {}", msg),
            Error::UnexpectedResponse { expected, got } => {
                write!(f, "Unexpected response: expected {}, got {}", expected, got)
            }
        }
    }
}

impl std::error::Error for Error {}
