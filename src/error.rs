use thiserror::Error;

/// Failures raised inside the crate's own plumbing (storage, config, http).
///
/// Collaborator adapters convert these into [`crate::collab::CallResult`]
/// before anything reaches the game state.
#[derive(Debug, Error)]
pub enum ReflexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http status {0}")]
    HttpStatus(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("no session credential available")]
    MissingCredential,

    #[error("submission rejected (code={code}): {msg}")]
    Rejected { code: i64, msg: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ReflexError>;

impl From<ureq::Error> for ReflexError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, _) => ReflexError::HttpStatus(status),
            ureq::Error::Transport(transport) => {
                let io_timeout = std::error::Error::source(&transport)
                    .and_then(|e| e.downcast_ref::<std::io::Error>())
                    .is_some_and(|e| {
                        matches!(
                            e.kind(),
                            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                        )
                    });
                let detail = transport.to_string();
                let lower = detail.to_ascii_lowercase();
                if io_timeout || lower.contains("timed out") || lower.contains("timeout") {
                    ReflexError::Timeout
                } else {
                    ReflexError::Transport(detail)
                }
            }
        }
    }
}
