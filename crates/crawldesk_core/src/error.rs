//! Error taxonomy shared by every repository component.
//!
//! # Responsibility
//! - Define the closed set of failure kinds surfaced by the data-access core.
//! - Keep the kind determinable without parsing messages.
//!
//! # Invariants
//! - Public repository APIs fail with exactly one `RepoError` variant.
//! - Validation errors aggregate every violation found in one pass.
//! - Store failures keep the original error reachable through `source()`.

use crate::db::DbError;
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub type RepoResult<T> = Result<T, RepoError>;

/// Closed classification of repository failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Integrity,
    DatabaseOperation,
    InvalidOperation,
}

/// Store-level constraint category recognized by the execution wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityKind {
    Unique,
    NotNull,
    ForeignKey,
    Check,
    Other,
}

impl IntegrityKind {
    /// Human-readable label used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Unique => "duplicate value",
            Self::NotNull => "missing required value",
            Self::ForeignKey => "referenced record constraint",
            Self::Check => "check constraint",
            Self::Other => "integrity constraint",
        }
    }
}

/// One rejected field and the reason it was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub reason: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Aggregated input validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Entity name the payload was validated for.
    pub entity: String,
    /// Every violation found in one validation pass, in detection order.
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn new(entity: impl Into<String>, violations: Vec<FieldViolation>) -> Self {
        Self {
            entity: entity.into(),
            violations,
        }
    }

    /// Single-violation shorthand.
    pub fn single(
        entity: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(entity, vec![FieldViolation::new(field, reason)])
    }

    /// Returns field names in violation order, without duplicates.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        for violation in &self.violations {
            if !fields.contains(&violation.field.as_str()) {
                fields.push(violation.field.as_str());
            }
        }
        fields
    }

    /// Whether any violation names `field`.
    pub fn mentions(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {} payload: ", self.entity)?;
        for (index, violation) in self.violations.iter().enumerate() {
            if index > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", violation.field, violation.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Underlying cause kept by `RepoError::DatabaseOperation`.
#[derive(Debug, Error)]
pub enum DbCause {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Bootstrap(#[from] DbError),
    /// Identity-bearing mutation targeted a row that does not exist.
    #[error("{entity} not found: id={id}")]
    EntityNotFound { entity: String, id: i64 },
    /// Persisted row could not be decoded into the entity shape.
    #[error("invalid persisted {entity} data: {message}")]
    InvalidData { entity: String, message: String },
    /// A preserved error that was wrapped because the caller did not preserve its kind.
    #[error(transparent)]
    Wrapped(Box<RepoError>),
}

/// Error returned by every repository operation.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity} not found: id={id}")]
    NotFound { entity: String, id: i64 },

    #[error("integrity violation ({}) on {entity}: {detail}", kind.label())]
    Integrity {
        entity: String,
        kind: IntegrityKind,
        detail: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("{message}")]
    DatabaseOperation {
        message: String,
        #[source]
        cause: DbCause,
    },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Integrity { .. } => ErrorKind::Integrity,
            Self::DatabaseOperation { .. } => ErrorKind::DatabaseOperation,
            Self::InvalidOperation(_) => ErrorKind::InvalidOperation,
        }
    }

    /// Database-operation failure for an update/delete that targeted a missing id.
    pub fn entity_not_found(entity: impl Into<String>, id: i64) -> Self {
        let entity = entity.into();
        Self::DatabaseOperation {
            message: format!("{entity} not found: id={id}"),
            cause: DbCause::EntityNotFound { entity, id },
        }
    }

    pub fn invalid_data(entity: impl Into<String>, message: impl Into<String>) -> Self {
        let cause = DbCause::InvalidData {
            entity: entity.into(),
            message: message.into(),
        };
        Self::DatabaseOperation {
            message: cause.to_string(),
            cause,
        }
    }

    /// Whether this error is the "entity not found" flavour of a database-operation failure.
    pub fn is_entity_not_found(&self) -> bool {
        match self {
            Self::DatabaseOperation { cause, .. } => match cause {
                DbCause::EntityNotFound { .. } => true,
                DbCause::Wrapped(inner) => inner.is_entity_not_found(),
                _ => false,
            },
            _ => false,
        }
    }

    /// Returns the aggregated validation failure, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::DatabaseOperation {
            message: format!("database bootstrap failed: {value}"),
            cause: DbCause::Bootstrap(value),
        }
    }
}
