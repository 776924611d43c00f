//! Execution wrapper around store calls.
//!
//! # Responsibility
//! - Run one store operation and classify its failure into the error taxonomy.
//! - Recognize constraint failures (unique, not-null, foreign-key, check) once,
//!   here, before the preserve-or-wrap decision.
//!
//! # Invariants
//! - Raw `rusqlite` errors never escape; they become `Integrity` or
//!   `DatabaseOperation` with the original kept as `source()`.
//! - Errors whose kind is in `preserve` are returned unchanged.

use crate::error::{DbCause, ErrorKind, IntegrityKind, RepoError, RepoResult};
use crate::logging::sanitize_message;
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::ErrorCode;

/// Kinds passed through unchanged by default.
pub const DEFAULT_PRESERVE: &[ErrorKind] = &[ErrorKind::Integrity, ErrorKind::Validation];

const MAX_LOGGED_ERROR_CHARS: usize = 240;

static CONSTRAINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(UNIQUE|NOT NULL|FOREIGN KEY|CHECK) constraint failed(?::\s*(.+))?")
        .expect("valid constraint regex")
});

/// Failure raised inside an operation passed to [`execute`].
#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Repo(RepoError),
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Runs `operation`, classifying any failure for `entity`.
///
/// `context` prefixes wrapped messages, e.g. `"failed to create article"`.
pub fn execute<T>(
    entity: &str,
    context: &str,
    preserve: &[ErrorKind],
    operation: impl FnOnce() -> Result<T, StoreError>,
) -> RepoResult<T> {
    let failure = match operation() {
        Ok(value) => return Ok(value),
        Err(failure) => failure,
    };

    let classified = match failure {
        StoreError::Sqlite(err) => match classify_integrity(&err) {
            Some((kind, detail)) => RepoError::Integrity {
                entity: entity.to_string(),
                kind,
                detail,
                source: Some(err),
            },
            None => {
                let wrapped = RepoError::DatabaseOperation {
                    message: format!("{context}: {err}"),
                    cause: DbCause::Sqlite(err),
                };
                log_failure(entity, context, &wrapped);
                return Err(wrapped);
            }
        },
        StoreError::Repo(err) => err,
    };

    let result = if preserve.contains(&classified.kind()) {
        classified
    } else {
        RepoError::DatabaseOperation {
            message: format!("{context}: {classified}"),
            cause: DbCause::Wrapped(Box::new(classified)),
        }
    };
    log_failure(entity, context, &result);
    Err(result)
}

/// Recognizes a store constraint violation and returns its category and detail.
pub fn classify_integrity(err: &rusqlite::Error) -> Option<(IntegrityKind, String)> {
    let text = err.to_string();
    if let Some(captures) = CONSTRAINT_RE.captures(&text) {
        let kind = match captures[1].to_ascii_uppercase().as_str() {
            "UNIQUE" => IntegrityKind::Unique,
            "NOT NULL" => IntegrityKind::NotNull,
            "FOREIGN KEY" => IntegrityKind::ForeignKey,
            "CHECK" => IntegrityKind::Check,
            _ => IntegrityKind::Other,
        };
        let detail = captures
            .get(2)
            .map_or_else(|| text.clone(), |m| m.as_str().trim().to_string());
        return Some((kind, detail));
    }

    if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
        return Some((IntegrityKind::Other, text));
    }
    None
}

fn log_failure(entity: &str, context: &str, err: &RepoError) {
    warn!(
        "event=repo_execute module=repo status=error entity={} kind={:?} context=\"{}\" error={}",
        entity,
        err.kind(),
        context,
        sanitize_message(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
    );
}
