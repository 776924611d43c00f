//! Entity models persisted by crawldesk core.
//!
//! # Responsibility
//! - Define the plain record shape crossing the repository boundary.
//! - Define typed entities and their schema contracts.
//!
//! # Invariants
//! - Every entity carries a store-assigned `id` and audit timestamps.
//! - Entities are decoded from records only; they are never built field by
//!   field outside the repository create/update paths.

pub mod article;
pub mod source;

use serde::{Deserialize, Deserializer};

/// Store-assigned entity identity.
pub type EntityId = i64;

/// Plain field map used for raw input, validated payloads and projections.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Deserializes tags from a persisted comma-delimited column or a list.
pub(crate) fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TagsShape {
        Delimited(String),
        List(Vec<String>),
    }

    let tags = match Option::<TagsShape>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(TagsShape::Delimited(raw)) => crate::schema::field::split_tags(&raw),
        Some(TagsShape::List(items)) => items
            .iter()
            .filter_map(|tag| crate::schema::field::normalize_tag(tag))
            .collect(),
    };
    Ok(tags)
}
