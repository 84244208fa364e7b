use thiserror::Error;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid {kind} '{id}': {reason}")]
    InvalidRecord {
        kind:   &'static str,
        id:     String,
        reason: String,
    },

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Tick gate poisoned by a panicking tick")]
    GatePoisoned,

    #[error("Tick panicked: {0}")]
    TickPanicked(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GameError {
    pub fn invalid(kind: &'static str, id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRecord { kind, id: id.into(), reason: reason.into() }
    }
}

pub type GameResult<T> = Result<T, GameError>;
