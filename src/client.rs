mod email_client;

pub use email_client::*;

use crate::domain::EmailAddress;

/// Failure to hand a message over to the delivery transport
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Failed to send email: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

/// Outbound message transport used by the notification dispatcher
#[async_trait::async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn deliver(&self, recipient: &EmailAddress, email: &Email) -> Result<(), DeliveryError>;
}
