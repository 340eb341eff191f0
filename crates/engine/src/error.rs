//! The module contains the error the engine can throw.
//!
//! Every variant belongs to exactly one [`ErrorKind`], which is what callers
//! should branch on:
//!
//! - [`KeyNotFound`] when a wallet, transaction, category or user is missing.
//! - [`Forbidden`] when the acting user may not touch the target. The message
//!   never says more than "unauthorized".
//! - [`Conflict`] and [`ExistingKey`] when the stored state no longer allows
//!   the operation (double delete, lost update race, duplicate name).
//! - [`Storage`] when the atomic unit failed and nothing was written.
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`Conflict`]: EngineError::Conflict
//!  [`ExistingKey`]: EngineError::ExistingKey
//!  [`Storage`]: EngineError::Storage
use std::fmt;

use sea_orm::DbErr;
use thiserror::Error;

/// Coarse classification of [`EngineError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Authorization,
    Validation,
    Conflict,
    Storage,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Authorization => "authorization",
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::Storage => "storage",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Invalid role: {0}")]
    InvalidRole(String),
    #[error("Invalid polarity: {0}")]
    InvalidPolarity(String),
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("{context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: DbErr,
    },
}

impl EngineError {
    pub(crate) fn unauthorized() -> Self {
        Self::Forbidden("unauthorized".to_string())
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::KeyNotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Authorization,
            Self::ExistingKey(_) | Self::Conflict(_) => ErrorKind::Conflict,
            Self::InvalidAmount(_)
            | Self::InvalidId(_)
            | Self::InvalidName(_)
            | Self::InvalidRole(_)
            | Self::InvalidPolarity(_)
            | Self::InvalidCurrency(_)
            | Self::InvalidFilter(_) => ErrorKind::Validation,
            Self::Hashing(_) => ErrorKind::Internal,
            Self::Storage { .. } => ErrorKind::Storage,
        }
    }

    /// Labels a storage failure with the operation that hit it.
    ///
    /// Non-storage errors are returned untouched.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        match self {
            Self::Storage { source, .. } => Self::Storage {
                context: context.into(),
                source,
            },
            other => other,
        }
    }
}

impl From<DbErr> for EngineError {
    fn from(source: DbErr) -> Self {
        Self::Storage {
            context: "database".to_string(),
            source,
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::InvalidRole(a), Self::InvalidRole(b)) => a == b,
            (Self::InvalidPolarity(a), Self::InvalidPolarity(b)) => a == b,
            (Self::InvalidCurrency(a), Self::InvalidCurrency(b)) => a == b,
            (Self::InvalidFilter(a), Self::InvalidFilter(b)) => a == b,
            (Self::Hashing(a), Self::Hashing(b)) => a == b,
            (
                Self::Storage {
                    context: ca,
                    source: a,
                },
                Self::Storage {
                    context: cb,
                    source: b,
                },
            ) => ca == cb && a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
