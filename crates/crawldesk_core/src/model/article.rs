//! Crawled article entity.
//!
//! # Invariants
//! - `link` is the natural key: unique, required and immutable after create.
//! - `tags` is persisted comma-delimited and exposed as a normalized list.

use crate::model::{deserialize_tags, EntityId};
use crate::schema::field::{FieldKind, FieldSpec};
use crate::schema::SchemaContract;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub const TITLE_MAX_CHARS: usize = 512;
pub const LINK_MAX_CHARS: usize = 2048;
pub const SUMMARY_MAX_CHARS: usize = 4096;
pub const AUTHOR_MAX_CHARS: usize = 256;

static ARTICLE_CONTRACT: Lazy<Arc<SchemaContract>> =
    Lazy::new(|| Arc::new(build_article_contract().expect("valid article contract")));

/// One crawled news article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: EntityId,
    pub source_id: Option<EntityId>,
    pub title: String,
    pub link: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    #[serde(deserialize_with = "deserialize_tags", default)]
    pub tags: Vec<String>,
    /// Epoch milliseconds.
    pub published_at: Option<i64>,
    pub is_ai_related: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Shared article contract.
pub fn article_contract() -> Arc<SchemaContract> {
    Arc::clone(&ARTICLE_CONTRACT)
}

fn build_article_contract() -> Result<SchemaContract, crate::schema::SchemaError> {
    SchemaContract::builder("article", "articles")
        .field(FieldSpec::new("source_id", FieldKind::Integer).min_value(1))
        .field(
            FieldSpec::new("title", FieldKind::Text)
                .not_null()
                .max_len(TITLE_MAX_CHARS),
        )
        .field(
            FieldSpec::new("link", FieldKind::Url)
                .not_null()
                .max_len(LINK_MAX_CHARS),
        )
        .field(FieldSpec::new("summary", FieldKind::Text).max_len(SUMMARY_MAX_CHARS))
        .field(FieldSpec::new("content", FieldKind::Text))
        .field(FieldSpec::new("author", FieldKind::Text).max_len(AUTHOR_MAX_CHARS))
        .field(
            FieldSpec::new("tags", FieldKind::TagList)
                .not_null()
                .default_value(json!("")),
        )
        .field(FieldSpec::new("published_at", FieldKind::Timestamp))
        .field(
            FieldSpec::new("is_ai_related", FieldKind::Bool)
                .not_null()
                .default_value(json!(false)),
        )
        .required(["title", "link"])
        .immutable(["link"])
        .updatable([
            "source_id",
            "title",
            "summary",
            "content",
            "author",
            "tags",
            "published_at",
            "is_ai_related",
        ])
        .natural_key("link")
        .preview(["id", "title", "link", "summary", "published_at", "tags"])
        .build()
}

#[cfg(test)]
mod tests {
    use super::{article_contract, Article};
    use serde_json::json;

    #[test]
    fn contract_declares_link_as_immutable_natural_key() {
        let contract = article_contract();
        assert_eq!(contract.natural_key(), Some("link"));
        assert!(contract.is_immutable("link"));
        assert!(!contract.is_updatable("link"));
        assert_eq!(contract.required_fields(), ["title", "link"]);
    }

    #[test]
    fn article_decodes_delimited_tags() {
        let article: Article = serde_json::from_value(json!({
            "id": 1,
            "source_id": null,
            "title": "T",
            "link": "https://x",
            "summary": null,
            "content": null,
            "author": null,
            "tags": "ai,rust",
            "published_at": null,
            "is_ai_related": true,
            "created_at": 0,
            "updated_at": 0
        }))
        .unwrap();
        assert_eq!(article.tags, vec!["ai", "rust"]);
    }
}
