//! The module contains the error the engine can throw.
//!
//! The errors are grouped as:
//!
//! - [`KeyNotFound`] thrown when a referenced entity does not exist.
//! - [`Forbidden`] thrown by the scoping layer when a caller addresses a
//!   group outside its assignment.
//! - validation errors ([`MissingReason`], [`AlreadyVoided`],
//!   [`InvalidState`], [`InvalidAmount`], [`InsufficientFunds`]) raised
//!   before any write happens.
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`MissingReason`]: EngineError::MissingReason
//!  [`AlreadyVoided`]: EngineError::AlreadyVoided
//!  [`InvalidState`]: EngineError::InvalidState
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InsufficientFunds`]: EngineError::InsufficientFunds
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("A reason is required: {0}")]
    MissingReason(String),
    #[error("Already voided: {0}")]
    AlreadyVoided(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Invalid role: {0}")]
    InvalidRole(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::MissingReason(a), Self::MissingReason(b)) => a == b,
            (Self::AlreadyVoided(a), Self::AlreadyVoided(b)) => a == b,
            (Self::InvalidState(a), Self::InvalidState(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::InvalidRole(a), Self::InvalidRole(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
