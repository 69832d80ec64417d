use thiserror::Error;

/// Failure talking to the remote system
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{api} API error ({status}): {body}")]
    Rejected {
        api: &'static str,
        status: u16,
        body: String,
    },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("remote unreachable: {0}")]
    Unreachable(String),
}

pub type Result<T, E = NetworkError> = std::result::Result<T, E>;
