//! Repository layer over SQLite.
//!
//! # Responsibility
//! - Provide contract-driven data access for every entity.
//! - Isolate SQL, error classification and pagination from service orchestration.
//!
//! # Invariants
//! - Repositories borrow the caller's connection or transaction and never commit.
//! - Writes pass both validation stages before any SQL mutation.
//! - Store failures are classified once, by the execution wrapper.

pub mod article_repo;
pub mod batch;
pub mod exec;
pub mod generic;
pub mod page;
pub mod source_repo;

pub use article_repo::ArticleRepository;
pub use batch::{BatchItemError, BatchSummary};
pub use exec::{execute, StoreError, DEFAULT_PRESERVE};
pub use generic::GenericRepository;
pub use page::{FindOptions, Listing, PageRequest, PageResult};
pub use source_repo::SourceRepository;
