//! Data-access core for crawldesk.
//!
//! Schema contracts describe each entity; one generic repository provides
//! validated CRUD, Mongo-style filtering, pagination and batch updates over
//! SQLite, and the service layer owns transactions.

pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schema;
pub mod service;
pub mod validate;

pub use config::{ConfigError, CoreConfig, DatabaseConfig, LoggingConfig, QueryConfig};
pub use db::{open_db, open_db_in_memory, open_db_with_config, DbError, DbResult};
pub use error::{ErrorKind, FieldViolation, IntegrityKind, RepoError, RepoResult, ValidationError};
pub use filter::article::ArticleFilterTranslator;
pub use filter::{FilterTranslator, GenericFilterTranslator, Predicate};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::article::{article_contract, Article};
pub use model::source::{source_contract, Source};
pub use model::{EntityId, Record};
pub use repo::{
    ArticleRepository, BatchItemError, BatchSummary, FindOptions, GenericRepository, Listing,
    PageRequest, PageResult, SourceRepository,
};
pub use schema::field::{FieldKind, FieldSpec};
pub use schema::{SchemaContract, SchemaError};
pub use service::article_service::ArticleService;
pub use service::envelope::ResponseEnvelope;
pub use validate::Operation;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
