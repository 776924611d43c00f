//! Two-stage payload validation.
//!
//! # Responsibility
//! - Stage A (`validate`): shape checks against the schema contract for one operation.
//! - Stage B (`reconcile`): required-field reconciliation against the existing row.
//!
//! # Invariants
//! - Both stages are pure: inputs are never mutated, a new record is returned.
//! - Every violation found in a pass is reported in one `ValidationError`.
//! - Update payloads are partial: absent fields are never defaulted.

use crate::error::{FieldViolation, ValidationError};
use crate::model::Record;
use crate::schema::SchemaContract;
use log::debug;
use serde_json::Value;

/// Operation a payload is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
}

/// Stage A: validates raw input shape for `operation`.
///
/// - `Create`: every provided declared field is coerced, omitted fields with a
///   default get it, and missing/blank required fields are reported.
///   Undeclared keys are dropped.
/// - `Update`: only provided fields are coerced; immutable or non-updatable
///   keys reject the whole payload; an empty result is rejected.
pub fn validate(
    contract: &SchemaContract,
    raw: &Record,
    operation: Operation,
) -> Result<Record, ValidationError> {
    match operation {
        Operation::Create => validate_create(contract, raw),
        Operation::Update => validate_update(contract, raw),
    }
}

/// Stage B: reconciles a Stage A payload with the existing row, if any.
///
/// On update, a required field that is not immutable and is absent or null in
/// `payload` is backfilled from `existing`, but only when the existing value is
/// non-null. Required fields still null or blank afterwards are reported.
pub fn reconcile(
    contract: &SchemaContract,
    payload: &Record,
    existing: Option<&Record>,
) -> Result<Record, ValidationError> {
    let mut reconciled = payload.clone();

    let checked: Vec<&str> = match existing {
        None => contract.required_fields().iter().map(String::as_str).collect(),
        Some(row) => {
            let mutable_required: Vec<&str> = contract
                .required_fields()
                .iter()
                .map(String::as_str)
                .filter(|name| !contract.is_immutable(name))
                .collect();
            for name in &mutable_required {
                let absent = reconciled.get(*name).map_or(true, Value::is_null);
                if !absent {
                    continue;
                }
                if let Some(current) = row.get(*name).filter(|value| !value.is_null()) {
                    reconciled.insert((*name).to_string(), current.clone());
                }
            }
            mutable_required
        }
    };

    let violations: Vec<FieldViolation> = checked
        .into_iter()
        .filter(|name| is_blank(reconciled.get(*name)))
        .map(|name| FieldViolation::new(name, "is required and must not be blank"))
        .collect();
    if !violations.is_empty() {
        return Err(ValidationError::new(contract.entity(), violations));
    }
    Ok(reconciled)
}

fn validate_create(contract: &SchemaContract, raw: &Record) -> Result<Record, ValidationError> {
    let mut validated = Record::new();
    let mut violations = Vec::new();

    for field in contract.fields() {
        match raw.get(&field.name) {
            Some(Value::Null) => {
                if contract.is_required(&field.name) {
                    continue;
                }
                if field.nullable {
                    validated.insert(field.name.clone(), Value::Null);
                } else {
                    violations.push(FieldViolation::new(&field.name, "must not be null"));
                }
            }
            Some(value) => match field.coerce(value) {
                Ok(normalized) => {
                    validated.insert(field.name.clone(), normalized);
                }
                Err(reason) => violations.push(FieldViolation::new(&field.name, reason)),
            },
            None => {
                if let Some(default) = field.default.as_ref() {
                    validated.insert(field.name.clone(), default.clone());
                }
            }
        }
    }

    for key in raw.keys().filter(|key| contract.field(key).is_none()) {
        debug!(
            "event=validate module=validate status=skip entity={} operation=create field={}",
            contract.entity(),
            key
        );
    }

    for name in contract.required_fields() {
        let already_reported = violations.iter().any(|v| &v.field == name);
        if !already_reported && is_blank(validated.get(name)) {
            violations.push(FieldViolation::new(
                name,
                "is required and must not be blank",
            ));
        }
    }

    if violations.is_empty() {
        Ok(validated)
    } else {
        Err(ValidationError::new(contract.entity(), violations))
    }
}

fn validate_update(contract: &SchemaContract, raw: &Record) -> Result<Record, ValidationError> {
    let mut validated = Record::new();
    let mut violations = Vec::new();

    for (key, value) in raw {
        if contract.is_immutable(key) {
            violations.push(FieldViolation::new(key, "is immutable and cannot be updated"));
            continue;
        }
        let Some(field) = contract.field(key).filter(|_| contract.is_updatable(key)) else {
            violations.push(FieldViolation::new(key, "is not an updatable field"));
            continue;
        };

        if value.is_null() {
            if contract.is_required(key) || field.nullable {
                validated.insert(key.clone(), Value::Null);
            } else {
                violations.push(FieldViolation::new(key, "must not be null"));
            }
            continue;
        }

        match field.coerce(value) {
            Ok(normalized) => {
                validated.insert(key.clone(), normalized);
            }
            Err(reason) => violations.push(FieldViolation::new(key, reason)),
        }
    }

    if !violations.is_empty() {
        return Err(ValidationError::new(contract.entity(), violations));
    }
    if validated.is_empty() {
        return Err(ValidationError::single(
            contract.entity(),
            "payload",
            "no updatable fields provided",
        ));
    }
    Ok(validated)
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(_) => false,
    }
}
