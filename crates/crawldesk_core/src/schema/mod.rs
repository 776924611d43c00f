//! Per-entity schema contracts.
//!
//! # Responsibility
//! - Declare the fields, required set, immutable set and updatable set of an entity.
//! - Answer "is this a known column" statically, so filters and sorts never
//!   probe the store.
//!
//! # Invariants
//! - `immutable ∩ updatable` is empty.
//! - Every referenced name is a declared field (or a system column where allowed).
//! - Field names are plain SQL identifiers; they are interpolated into statements.

pub mod field;

use crate::schema::field::{FieldKind, FieldSpec};
use std::collections::BTreeSet;
use thiserror::Error;

/// Store-assigned identity column.
pub const ID_COLUMN: &str = "id";
/// Audit column set by the store on insert.
pub const CREATED_AT_COLUMN: &str = "created_at";
/// Audit column maintained by store triggers on update.
pub const UPDATED_AT_COLUMN: &str = "updated_at";

const SYSTEM_COLUMNS: [(&str, FieldKind); 3] = [
    (ID_COLUMN, FieldKind::Integer),
    (CREATED_AT_COLUMN, FieldKind::Timestamp),
    (UPDATED_AT_COLUMN, FieldKind::Timestamp),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),
    #[error("`{0}` is not a valid column identifier")]
    InvalidIdentifier(String),
    #[error("{set} references undeclared field `{field}`")]
    UnknownField { set: &'static str, field: String },
    #[error("field `{0}` cannot be both immutable and updatable")]
    ImmutableAndUpdatable(String),
}

/// Declarative create/update contract of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaContract {
    entity: String,
    table: String,
    fields: Vec<FieldSpec>,
    required: Vec<String>,
    immutable: BTreeSet<String>,
    updatable: BTreeSet<String>,
    natural_key: Option<String>,
    preview_fields: Vec<String>,
}

impl SchemaContract {
    pub fn builder(entity: impl Into<String>, table: impl Into<String>) -> SchemaContractBuilder {
        SchemaContractBuilder {
            entity: entity.into(),
            table: table.into(),
            fields: Vec::new(),
            required: Vec::new(),
            immutable: Vec::new(),
            updatable: Vec::new(),
            natural_key: None,
            preview_fields: Vec::new(),
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Declared attributes, excluding system columns.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn required_fields(&self) -> &[String] {
        &self.required
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|field| field == name)
    }

    pub fn is_immutable(&self, name: &str) -> bool {
        self.immutable.contains(name)
    }

    pub fn is_updatable(&self, name: &str) -> bool {
        self.updatable.contains(name)
    }

    pub fn natural_key(&self) -> Option<&str> {
        self.natural_key.as_deref()
    }

    /// Fields returned when a preview is requested without an explicit field list.
    pub fn preview_fields(&self) -> &[String] {
        &self.preview_fields
    }

    /// Kind of any filterable/sortable column, system columns included.
    pub fn column_kind(&self, name: &str) -> Option<FieldKind> {
        SYSTEM_COLUMNS
            .iter()
            .find(|(column, _)| *column == name)
            .map(|(_, kind)| *kind)
            .or_else(|| self.field(name).map(|field| field.kind))
    }

    pub fn is_known_column(&self, name: &str) -> bool {
        self.column_kind(name).is_some()
    }

    /// All persisted columns in select order: id, declared fields, audit columns.
    pub fn columns(&self) -> Vec<(&str, FieldKind)> {
        let mut columns = vec![SYSTEM_COLUMNS[0]];
        columns.extend(
            self.fields
                .iter()
                .map(|field| (field.name.as_str(), field.kind)),
        );
        columns.extend_from_slice(&SYSTEM_COLUMNS[1..]);
        columns
    }

    /// Default ordering column: the insert audit column, tie-broken by id.
    pub fn default_sort_column(&self) -> &'static str {
        CREATED_AT_COLUMN
    }
}

/// Builder validating contract invariants once, at construction.
#[derive(Debug, Clone)]
pub struct SchemaContractBuilder {
    entity: String,
    table: String,
    fields: Vec<FieldSpec>,
    required: Vec<String>,
    immutable: Vec<String>,
    updatable: Vec<String>,
    natural_key: Option<String>,
    preview_fields: Vec<String>,
}

impl SchemaContractBuilder {
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn immutable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.immutable.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn updatable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.updatable.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn natural_key(mut self, name: impl Into<String>) -> Self {
        self.natural_key = Some(name.into());
        self
    }

    pub fn preview<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preview_fields.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<SchemaContract, SchemaError> {
        for name in [&self.table]
            .into_iter()
            .chain(self.fields.iter().map(|field| &field.name))
        {
            if !is_identifier(name) {
                return Err(SchemaError::InvalidIdentifier(name.clone()));
            }
        }

        let mut declared = BTreeSet::new();
        for field in &self.fields {
            let is_system = SYSTEM_COLUMNS.iter().any(|(column, _)| *column == field.name);
            if is_system || !declared.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }

        let check = |set: &'static str, names: &[String]| -> Result<(), SchemaError> {
            match names.iter().find(|name| !declared.contains(name.as_str())) {
                Some(name) => Err(SchemaError::UnknownField {
                    set,
                    field: name.clone(),
                }),
                None => Ok(()),
            }
        };
        check("required", &self.required)?;
        check("immutable", &self.immutable)?;
        check("updatable", &self.updatable)?;
        if let Some(key) = self.natural_key.as_ref() {
            check("natural_key", std::slice::from_ref(key))?;
        }
        if let Some(name) = self.preview_fields.iter().find(|name| {
            !declared.contains(name.as_str()) && !SYSTEM_COLUMNS.iter().any(|(c, _)| c == name)
        }) {
            return Err(SchemaError::UnknownField {
                set: "preview",
                field: name.clone(),
            });
        }

        let immutable: BTreeSet<String> = self.immutable.into_iter().collect();
        let updatable: BTreeSet<String> = self.updatable.into_iter().collect();
        if let Some(name) = immutable.intersection(&updatable).next() {
            return Err(SchemaError::ImmutableAndUpdatable(name.clone()));
        }

        let mut required = Vec::new();
        for name in self.required {
            if !required.contains(&name) {
                required.push(name);
            }
        }

        Ok(SchemaContract {
            entity: self.entity,
            table: self.table,
            fields: self.fields,
            required,
            immutable,
            updatable,
            natural_key: self.natural_key,
            preview_fields: self.preview_fields,
        })
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_lowercase() || first == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::{SchemaContract, SchemaError};
    use crate::schema::field::{FieldKind, FieldSpec};

    fn base() -> super::SchemaContractBuilder {
        SchemaContract::builder("post", "posts")
            .field(FieldSpec::new("title", FieldKind::Text))
            .field(FieldSpec::new("link", FieldKind::Url))
    }

    #[test]
    fn immutable_and_updatable_must_not_overlap() {
        let err = base()
            .immutable(["link"])
            .updatable(["title", "link"])
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::ImmutableAndUpdatable("link".to_string()));
    }

    #[test]
    fn required_may_overlap_immutable() {
        let contract = base()
            .required(["title", "link", "title"])
            .immutable(["link"])
            .updatable(["title"])
            .build()
            .unwrap();
        assert_eq!(contract.required_fields(), ["title", "link"]);
        assert!(contract.is_immutable("link"));
        assert!(contract.is_required("link"));
    }

    #[test]
    fn undeclared_names_are_rejected() {
        let err = base().required(["summary"]).build().unwrap_err();
        assert!(matches!(err, SchemaError::UnknownField { set: "required", .. }));
    }

    #[test]
    fn system_columns_are_known_but_not_declarable() {
        let contract = base().build().unwrap();
        assert_eq!(contract.column_kind("id"), Some(FieldKind::Integer));
        assert_eq!(contract.column_kind("updated_at"), Some(FieldKind::Timestamp));
        assert!(!contract.is_known_column("nonexistent_field"));

        let err = base()
            .field(FieldSpec::new("id", FieldKind::Integer))
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateField("id".to_string()));
    }

    #[test]
    fn column_identifiers_are_checked() {
        let err = SchemaContract::builder("post", "posts")
            .field(FieldSpec::new("title; drop", FieldKind::Text))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidIdentifier(_)));
    }
}
