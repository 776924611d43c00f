//! Source repository instantiation and crawl bookkeeping.

use crate::config::QueryConfig;
use crate::error::RepoResult;
use crate::filter::GenericFilterTranslator;
use crate::model::source::{source_contract, Source};
use crate::model::{EntityId, Record};
use crate::repo::generic::GenericRepository;
use crate::repo::page::FindOptions;
use rusqlite::Connection;
use serde_json::Value;

/// Repository over `sources`.
pub type SourceRepository<'conn> = GenericRepository<'conn, Source, GenericFilterTranslator>;

impl<'conn> GenericRepository<'conn, Source, GenericFilterTranslator> {
    pub fn attach(conn: &'conn Connection, config: QueryConfig) -> Self {
        Self::new(conn, source_contract(), GenericFilterTranslator, config)
    }

    pub fn get_by_url(&self, url: &str) -> RepoResult<Option<Source>> {
        self.get_by_natural_key(url)
    }

    /// Records a finished crawl at `crawled_at_ms` through the regular update path.
    ///
    /// Fails with an entity-not-found `DatabaseOperation` when `id` is unknown.
    pub fn mark_crawled(&self, id: EntityId, crawled_at_ms: i64) -> RepoResult<Option<Source>> {
        let mut raw = Record::new();
        raw.insert("last_crawled_at".to_string(), Value::from(crawled_at_ms));
        self.update(id, &raw)
    }

    /// Enabled sources, oldest first.
    pub fn list_enabled(&self) -> RepoResult<Vec<Source>> {
        let mut expression = Record::new();
        expression.insert("enabled".to_string(), Value::Bool(true));
        let options = FindOptions {
            sort_desc: false,
            ..FindOptions::default()
        };
        Ok(self
            .find_by_filter(&expression, &options)?
            .into_full()
            .unwrap_or_default())
    }
}
