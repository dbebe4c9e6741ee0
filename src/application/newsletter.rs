use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("mailing list is not configured")]
    NotConfigured,
    #[error("mailing list request failed: {0}")]
    Transport(String),
    #[error("mailing list rejected subscriber with status {status}: {detail}")]
    Rejected { status: u16, detail: String },
}

/// A mailing list that accepts new subscribers.
#[async_trait]
pub trait SubscriberDirectory: Send + Sync {
    async fn add_subscriber(&self, email: &str) -> Result<(), DirectoryError>;
}

/// Directory used when no mailing list is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredDirectory;

#[async_trait]
impl SubscriberDirectory for UnconfiguredDirectory {
    async fn add_subscriber(&self, _email: &str) -> Result<(), DirectoryError> {
        Err(DirectoryError::NotConfigured)
    }
}

#[derive(Debug, Error)]
pub enum NewsletterError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

#[derive(Clone)]
pub struct NewsletterService {
    directory: Arc<dyn SubscriberDirectory>,
}

impl NewsletterService {
    pub fn new(directory: Arc<dyn SubscriberDirectory>) -> Self {
        Self { directory }
    }

    pub async fn subscribe(&self, email: &str) -> Result<(), NewsletterError> {
        let email = normalize_email(email).ok_or(NewsletterError::InvalidEmail)?;
        self.directory.add_subscriber(email).await?;
        info!(target: "mondrian::newsletter", "subscriber added");
        Ok(())
    }
}

/// Trim `raw` and accept it when it looks like `local@domain`.
fn normalize_email(raw: &str) -> Option<&str> {
    let email = raw.trim();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    if email.chars().any(char::is_whitespace) {
        return None;
    }
    Some(email)
}
