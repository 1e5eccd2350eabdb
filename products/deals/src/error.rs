use platform_store::StoreError;
use thiserror::Error;
use uuid::Uuid;

use crate::negotiation::NegotiationError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DealRoomError {
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
    #[error("Deal not found")]
    DealNotFound(Uuid),
    #[error("User not found")]
    UnknownUser(Uuid),
    #[error("Notification not found")]
    NotificationNotFound(Uuid),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type DealRoomResult<T> = Result<T, DealRoomError>;

impl DealRoomError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
