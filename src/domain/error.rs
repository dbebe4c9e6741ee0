use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("view properties could not be serialized: {message}")]
    Serialization { message: String },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
