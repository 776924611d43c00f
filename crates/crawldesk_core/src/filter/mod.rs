//! Filter expression translation.
//!
//! # Responsibility
//! - Turn MongoDB-style filter maps into a conjunction of store predicates.
//! - Let entity translators intercept composite keys before the generic pass.
//!
//! # Invariants
//! - Unknown field names are ignored, never rejected.
//! - Unknown operators or mistyped operands on a known field are rejected
//!   with one aggregated `ValidationError`.
//! - The returned predicates are combined with logical AND.

pub mod article;
pub mod sql;

use crate::error::{FieldViolation, RepoResult, ValidationError};
use crate::model::Record;
use crate::schema::field::FieldSpec;
use crate::schema::SchemaContract;
use log::debug;
use rusqlite::types::Value as SqlValue;
use serde_json::Value;

/// Comparison operators of the filter dialect.
///
/// `Eq` has no operator spelling; it comes from plain literal values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    /// Maps a `$`-prefixed operator name; `$in`/`$nin` are handled separately.
    pub fn from_operator(name: &str) -> Option<Self> {
        match name {
            "$ne" => Some(Self::Ne),
            "$gt" => Some(Self::Gt),
            "$gte" => Some(Self::Gte),
            "$lt" => Some(Self::Lt),
            "$lte" => Some(Self::Lte),
            _ => None,
        }
    }

    fn is_ordering(self) -> bool {
        matches!(self, Self::Gt | Self::Gte | Self::Lt | Self::Lte)
    }
}

/// Store-neutral predicate over one entity table.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `Eq`/`Ne` against `Null` mean "is null" / "is not null".
    Compare {
        column: String,
        op: CompareOp,
        value: SqlValue,
    },
    /// Membership; a negated set also matches null columns.
    In {
        column: String,
        values: Vec<SqlValue>,
        negated: bool,
    },
    /// Case-insensitive substring match.
    Contains { column: String, needle: String },
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: SqlValue) -> Self {
        Self::Compare {
            column: column.into(),
            op: CompareOp::Eq,
            value,
        }
    }

    pub fn contains(column: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::Contains {
            column: column.into(),
            needle: needle.into(),
        }
    }
}

/// Translates a filter expression into predicates for one contract.
pub trait FilterTranslator {
    fn translate(&self, contract: &SchemaContract, expression: &Record)
        -> RepoResult<Vec<Predicate>>;
}

/// Field/operator translator shared by every entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericFilterTranslator;

impl FilterTranslator for GenericFilterTranslator {
    fn translate(
        &self,
        contract: &SchemaContract,
        expression: &Record,
    ) -> RepoResult<Vec<Predicate>> {
        let mut predicates = Vec::new();
        let mut violations = Vec::new();

        for (column, value) in expression {
            let Some(spec) = operand_spec(contract, column) else {
                debug!(
                    "event=filter_translate module=filter status=skip entity={} field={}",
                    contract.entity(),
                    column
                );
                continue;
            };

            match translate_field(&spec, value) {
                Ok(mut translated) => predicates.append(&mut translated),
                Err(reason) => violations.push(FieldViolation::new(column, reason)),
            }
        }

        if violations.is_empty() {
            Ok(predicates)
        } else {
            Err(ValidationError::new(contract.entity(), violations).into())
        }
    }
}

/// Field spec used to coerce operands; system columns get an ad-hoc spec.
fn operand_spec(contract: &SchemaContract, column: &str) -> Option<FieldSpec> {
    if let Some(spec) = contract.field(column) {
        return Some(spec.clone());
    }
    contract
        .column_kind(column)
        .map(|kind| FieldSpec::new(column, kind))
}

fn translate_field(spec: &FieldSpec, value: &Value) -> Result<Vec<Predicate>, String> {
    match value {
        Value::Object(operators) => {
            if operators.is_empty() {
                return Err("operator object must not be empty".to_string());
            }
            operators
                .iter()
                .map(|(operator, operand)| translate_operator(spec, operator, operand))
                .collect()
        }
        Value::Array(items) => Ok(vec![membership(spec, items, false)?]),
        scalar => Ok(vec![Predicate::Compare {
            column: spec.name.clone(),
            op: CompareOp::Eq,
            value: spec.filter_operand(scalar)?,
        }]),
    }
}

fn translate_operator(
    spec: &FieldSpec,
    operator: &str,
    operand: &Value,
) -> Result<Predicate, String> {
    match operator {
        "$in" | "$nin" => {
            let Value::Array(items) = operand else {
                return Err(format!("`{operator}` expects an array operand"));
            };
            membership(spec, items, operator == "$nin")
        }
        _ => {
            let op = CompareOp::from_operator(operator)
                .ok_or_else(|| format!("unsupported operator `{operator}`"))?;
            if op.is_ordering() && operand.is_null() {
                return Err(format!("`{operator}` requires a non-null operand"));
            }
            Ok(Predicate::Compare {
                column: spec.name.clone(),
                op,
                value: spec.filter_operand(operand)?,
            })
        }
    }
}

fn membership(spec: &FieldSpec, items: &[Value], negated: bool) -> Result<Predicate, String> {
    let values = items
        .iter()
        .map(|item| {
            if item.is_null() {
                Err("membership lists must not contain null".to_string())
            } else {
                spec.filter_operand(item)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Predicate::In {
        column: spec.name.clone(),
        values,
        negated,
    })
}
