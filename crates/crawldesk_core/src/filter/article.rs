//! Article-specific composite filters.
//!
//! # Responsibility
//! - Intercept `search_text`, `tags` and `filter` before the generic pass.
//!
//! # Invariants
//! - Unknown `filter` aliases are logged and ignored, never rejected.
//! - Date aliases are computed from the injected clock.

use crate::error::{RepoResult, ValidationError};
use crate::filter::{CompareOp, FilterTranslator, GenericFilterTranslator, Predicate};
use crate::model::Record;
use crate::schema::field::{normalize_tag, TAG_DELIMITER};
use crate::schema::SchemaContract;
use chrono::{DateTime, Duration, Utc};
use log::warn;
use rusqlite::types::Value as SqlValue;
use serde_json::Value;

pub const SEARCH_TEXT_KEY: &str = "search_text";
pub const TAGS_KEY: &str = "tags";
pub const ALIAS_KEY: &str = "filter";

const SEARCH_COLUMNS: [&str; 3] = ["title", "content", "summary"];
const TAGS_COLUMN: &str = "tags";
const PUBLISHED_COLUMN: &str = "published_at";
const AI_COLUMN: &str = "is_ai_related";

/// Source of "now" for date-relative aliases.
pub type Clock = fn() -> DateTime<Utc>;

/// Article translator: composite keys first, remainder through the generic translator.
#[derive(Debug, Clone, Copy)]
pub struct ArticleFilterTranslator {
    clock: Clock,
}

impl Default for ArticleFilterTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl ArticleFilterTranslator {
    pub fn new() -> Self {
        Self { clock: Utc::now }
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self { clock }
    }

    fn alias_predicate(&self, alias: &str) -> Option<Predicate> {
        let now = (self.clock)();
        let since = |start: DateTime<Utc>| Predicate::Compare {
            column: PUBLISHED_COLUMN.to_string(),
            op: CompareOp::Gte,
            value: SqlValue::Integer(start.timestamp_millis()),
        };
        match alias {
            "today" => {
                let midnight = now.date_naive().and_hms_opt(0, 0, 0)?.and_utc();
                Some(since(midnight))
            }
            "week" => Some(since(now - Duration::days(7))),
            "month" => Some(since(now - Duration::days(30))),
            "ai" => Some(Predicate::eq(AI_COLUMN, SqlValue::Integer(1))),
            "not-ai" => Some(Predicate::eq(AI_COLUMN, SqlValue::Integer(0))),
            _ => None,
        }
    }
}

impl FilterTranslator for ArticleFilterTranslator {
    fn translate(
        &self,
        contract: &SchemaContract,
        expression: &Record,
    ) -> RepoResult<Vec<Predicate>> {
        let mut remainder = expression.clone();
        let mut predicates = Vec::new();

        if let Some(value) = remainder.remove(SEARCH_TEXT_KEY) {
            let text = value.as_str().ok_or_else(|| {
                ValidationError::single(contract.entity(), SEARCH_TEXT_KEY, "expected a string")
            })?;
            let text = text.trim();
            if !text.is_empty() {
                predicates.push(Predicate::Or(
                    SEARCH_COLUMNS
                        .iter()
                        .map(|column| Predicate::contains(*column, text))
                        .collect(),
                ));
            }
        }

        if let Some(value) = remainder.remove(TAGS_KEY) {
            let tags = requested_tags(&value).ok_or_else(|| {
                ValidationError::single(
                    contract.entity(),
                    TAGS_KEY,
                    "expected a tag list or delimited string",
                )
            })?;
            if !tags.is_empty() {
                predicates.push(Predicate::Or(
                    tags.into_iter()
                        .map(|tag| Predicate::contains(TAGS_COLUMN, tag))
                        .collect(),
                ));
            }
        }

        if let Some(value) = remainder.remove(ALIAS_KEY) {
            let alias = value.as_str().map(|alias| alias.trim().to_ascii_lowercase());
            match alias.as_deref().and_then(|alias| self.alias_predicate(alias)) {
                Some(predicate) => predicates.push(predicate),
                None => warn!(
                    "event=filter_translate module=filter status=ignored entity={} alias={}",
                    contract.entity(),
                    value
                ),
            }
        }

        predicates.extend(GenericFilterTranslator.translate(contract, &remainder)?);
        Ok(predicates)
    }
}

fn requested_tags(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(text) => Some(text.split(TAG_DELIMITER).filter_map(normalize_tag).collect()),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(normalize_tag))
            .collect::<Option<Vec<_>>>()
            .map(|tags| tags.into_iter().flatten().collect()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::ArticleFilterTranslator;
    use crate::filter::{CompareOp, FilterTranslator, Predicate};
    use crate::model::article::article_contract;
    use crate::model::Record;
    use chrono::{DateTime, TimeZone, Utc};
    use rusqlite::types::Value as SqlValue;
    use serde_json::{json, Value};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 13, 30, 0).unwrap()
    }

    fn expr(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn translate(value: Value) -> Vec<Predicate> {
        ArticleFilterTranslator::with_clock(fixed_now)
            .translate(&article_contract(), &expr(value))
            .unwrap()
    }

    #[test]
    fn search_text_ors_over_text_columns() {
        let predicates = translate(json!({"search_text": " rust "}));
        assert_eq!(
            predicates,
            vec![Predicate::Or(vec![
                Predicate::contains("title", "rust"),
                Predicate::contains("content", "rust"),
                Predicate::contains("summary", "rust"),
            ])]
        );
    }

    #[test]
    fn tags_or_over_delimited_column() {
        let predicates = translate(json!({"tags": ["AI", "llm"]}));
        assert_eq!(
            predicates,
            vec![Predicate::Or(vec![
                Predicate::contains("tags", "ai"),
                Predicate::contains("tags", "llm"),
            ])]
        );
    }

    #[test]
    fn today_alias_starts_at_utc_midnight() {
        let predicates = translate(json!({"filter": "today"}));
        let midnight = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        assert_eq!(
            predicates,
            vec![Predicate::Compare {
                column: "published_at".to_string(),
                op: CompareOp::Gte,
                value: SqlValue::Integer(midnight.timestamp_millis()),
            }]
        );
    }

    #[test]
    fn ai_aliases_use_boolean_column() {
        assert_eq!(
            translate(json!({"filter": "not-ai"})),
            vec![Predicate::eq("is_ai_related", SqlValue::Integer(0))]
        );
    }

    #[test]
    fn unknown_alias_is_ignored_and_generic_keys_still_apply() {
        let predicates = translate(json!({"filter": "yesterday", "author": "kim"}));
        assert_eq!(
            predicates,
            vec![Predicate::eq("author", SqlValue::Text("kim".to_string()))]
        );
    }

    #[test]
    fn blank_search_text_adds_nothing() {
        assert!(translate(json!({"search_text": "  ", "tags": ""})).is_empty());
    }
}
