//! Article repository instantiation and natural-key helpers.

use crate::config::QueryConfig;
use crate::error::RepoResult;
use crate::filter::article::ArticleFilterTranslator;
use crate::model::article::{article_contract, Article};
use crate::model::Record;
use crate::repo::batch::BatchSummary;
use crate::repo::generic::GenericRepository;
use rusqlite::Connection;

/// Repository over `articles`, with `search_text`/`tags`/`filter` composites.
pub type ArticleRepository<'conn> = GenericRepository<'conn, Article, ArticleFilterTranslator>;

impl<'conn> GenericRepository<'conn, Article, ArticleFilterTranslator> {
    /// Article repository using the wall clock for date aliases.
    pub fn attach(conn: &'conn Connection, config: QueryConfig) -> Self {
        Self::with_translator(conn, config, ArticleFilterTranslator::new())
    }

    pub fn with_translator(
        conn: &'conn Connection,
        config: QueryConfig,
        translator: ArticleFilterTranslator,
    ) -> Self {
        Self::new(conn, article_contract(), translator, config)
    }

    pub fn get_by_link(&self, link: &str) -> RepoResult<Option<Article>> {
        self.get_by_natural_key(link)
    }

    /// Updates articles located by `link`; see `batch_update_by_natural_key`.
    pub fn batch_update_by_link(&self, items: &[Record]) -> RepoResult<BatchSummary<String>> {
        self.batch_update_by_natural_key(items)
    }
}
