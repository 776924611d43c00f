//! Crawl source (feed/site) entity.

use crate::model::EntityId;
use crate::schema::field::{FieldKind, FieldSpec};
use crate::schema::SchemaContract;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub const DEFAULT_CRAWL_INTERVAL_MINUTES: i64 = 60;

static SOURCE_CONTRACT: Lazy<Arc<SchemaContract>> =
    Lazy::new(|| Arc::new(build_source_contract().expect("valid source contract")));

/// A site or feed articles are crawled from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: EntityId,
    pub name: String,
    pub url: String,
    pub enabled: bool,
    pub crawl_interval_minutes: i64,
    /// Epoch milliseconds of the last finished crawl.
    pub last_crawled_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Shared source contract.
pub fn source_contract() -> Arc<SchemaContract> {
    Arc::clone(&SOURCE_CONTRACT)
}

fn build_source_contract() -> Result<SchemaContract, crate::schema::SchemaError> {
    SchemaContract::builder("source", "sources")
        .field(
            FieldSpec::new("name", FieldKind::Text)
                .not_null()
                .min_len(1)
                .max_len(200),
        )
        .field(FieldSpec::new("url", FieldKind::Url).not_null().max_len(2048))
        .field(
            FieldSpec::new("enabled", FieldKind::Bool)
                .not_null()
                .default_value(json!(true)),
        )
        .field(
            FieldSpec::new("crawl_interval_minutes", FieldKind::Integer)
                .not_null()
                .min_value(1)
                .default_value(json!(DEFAULT_CRAWL_INTERVAL_MINUTES)),
        )
        .field(FieldSpec::new("last_crawled_at", FieldKind::Timestamp))
        .required(["name", "url"])
        .immutable(["url"])
        .updatable(["name", "enabled", "crawl_interval_minutes", "last_crawled_at"])
        .natural_key("url")
        .preview(["id", "name", "url", "enabled"])
        .build()
}
