use thiserror::Error;

/// Everything that can go wrong between reading credentials and releasing the session.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("missing credential: set {0}")]
    MissingCredentials(&'static str),
    #[error("could not open automation session at {url}: {reason}")]
    SessionConnect { url: String, reason: String },
    #[error("{0} not found after trying every selector")]
    ElementNotFound(&'static str),
    #[error("could not {action} {target}")]
    Interaction {
        action: &'static str,
        target: &'static str,
    },
    #[error("automation server rejected {command}: {message}")]
    Protocol { command: String, message: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("screenshot payload was not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
}

impl BotError {
    /// Name of the diagnostic screenshot taken when this error ends a run.
    pub fn screenshot_label(&self) -> &'static str {
        match self {
            BotError::ElementNotFound(_) | BotError::Interaction { .. } => "error",
            _ => "critical_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
