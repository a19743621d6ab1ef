use thiserror::Error;

#[derive(Debug, Error)]
pub enum PulseError {
    #[error("unauthorized: no authenticated member")]
    Unauthorized,

    #[error("workspace not found: {0}")]
    WorkspaceNotFound(String),

    #[error("member not found: {0}")]
    MemberNotFound(String),

    #[error("pulse not found: {0}")]
    PulseNotFound(String),

    #[error("action item not found: {0}")]
    ActionItemNotFound(String),

    #[error("invalid {category} score {value}: must be between 1 and 10")]
    InvalidScore { category: String, value: i64 },

    #[error("missing answer for '{0}'")]
    MissingAnswer(String),

    #[error("invalid date '{0}'")]
    InvalidDate(String),

    #[error("invalid status '{0}'")]
    InvalidStatus(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("workspace has no billing account")]
    NoBillingAccount,

    #[error("store write failed: {0}")]
    StoreWriteFailed(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("text generation failed: {0}")]
    GenerationFailed(String),

    #[error("billing provider error: {0}")]
    Billing(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PulseError {
    /// True for errors caused by the caller's input rather than the system.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            PulseError::InvalidScore { .. }
                | PulseError::MissingAnswer(_)
                | PulseError::InvalidDate(_)
                | PulseError::InvalidStatus(_)
                | PulseError::InvalidInput(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PulseError::WorkspaceNotFound(_)
                | PulseError::MemberNotFound(_)
                | PulseError::PulseNotFound(_)
                | PulseError::ActionItemNotFound(_)
        )
    }
}

impl From<rusqlite::Error> for PulseError {
    fn from(e: rusqlite::Error) -> Self {
        PulseError::Store(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PulseError>;
