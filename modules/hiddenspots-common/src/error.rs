use thiserror::Error;

#[derive(Error, Debug)]
pub enum HiddenSpotsError {
    #[error("Validation error on {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl HiddenSpotsError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        HiddenSpotsError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        HiddenSpotsError::NotFound(what.into())
    }
}
