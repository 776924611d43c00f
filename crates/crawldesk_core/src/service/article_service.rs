//! Article use-case service.
//!
//! # Responsibility
//! - Provide envelope-returning CRUD, listing and batch entry points.
//! - Run every write in its own transaction.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Batch calls commit the items that succeeded; per-item failures are reported
//!   in the summary, not as a failed envelope.

use crate::config::QueryConfig;
use crate::error::{ErrorKind, RepoError, RepoResult};
use crate::filter::article::ArticleFilterTranslator;
use crate::model::article::Article;
use crate::model::{EntityId, Record};
use crate::repo::article_repo::ArticleRepository;
use crate::repo::batch::BatchSummary;
use crate::repo::page::{PageRequest, PageResult};
use crate::service::envelope::ResponseEnvelope;
use crate::service::in_transaction;
use log::warn;
use rusqlite::Connection;

/// Envelope-returning façade over `ArticleRepository`.
pub struct ArticleService<'conn> {
    conn: &'conn mut Connection,
    config: QueryConfig,
    translator: ArticleFilterTranslator,
}

impl<'conn> ArticleService<'conn> {
    pub fn new(conn: &'conn mut Connection, config: QueryConfig) -> Self {
        Self::with_translator(conn, config, ArticleFilterTranslator::new())
    }

    pub fn with_translator(
        conn: &'conn mut Connection,
        config: QueryConfig,
        translator: ArticleFilterTranslator,
    ) -> Self {
        Self {
            conn,
            config,
            translator,
        }
    }

    /// Creates one article from a raw payload.
    pub fn create_article(&mut self, raw: &Record) -> ResponseEnvelope<Article> {
        let (config, translator) = (self.config, self.translator);
        let result = in_transaction(self.conn, |tx| {
            ArticleRepository::with_translator(tx, config, translator).create(raw)
        });
        respond("create_article", result, |_| "article created".to_string())
    }

    /// Loads one article; a miss is an unsuccessful envelope.
    pub fn get_article(&self, id: EntityId) -> ResponseEnvelope<Article> {
        let result = self.repo().get_or_fail(id);
        respond("get_article", result, |_| "article found".to_string())
    }

    pub fn get_article_by_link(&self, link: &str) -> ResponseEnvelope<Article> {
        match self.repo().get_by_link(link) {
            Ok(Some(article)) => ResponseEnvelope::ok("article found", Some(article)),
            Ok(None) => ResponseEnvelope::fail(format!("article not found: link={link}")),
            Err(err) => failed("get_article_by_link", &err),
        }
    }

    /// Applies a partial update. An empty payload succeeds with no data.
    pub fn update_article(&mut self, id: EntityId, raw: &Record) -> ResponseEnvelope<Article> {
        let (config, translator) = (self.config, self.translator);
        let result = in_transaction(self.conn, |tx| {
            ArticleRepository::with_translator(tx, config, translator).update(id, raw)
        });
        match result {
            Ok(Some(article)) => ResponseEnvelope::ok("article updated", Some(article)),
            Ok(None) => ResponseEnvelope::ok("nothing to update", None),
            Err(err) => failed("update_article", &err),
        }
    }

    /// Deletes one article; the payload is whether a row was removed.
    pub fn delete_article(&mut self, id: EntityId) -> ResponseEnvelope<bool> {
        let (config, translator) = (self.config, self.translator);
        let result = in_transaction(self.conn, |tx| {
            ArticleRepository::with_translator(tx, config, translator).delete(id)
        });
        respond("delete_article", result, |deleted| {
            if *deleted {
                "article deleted".to_string()
            } else {
                format!("article not found: id={id}")
            }
        })
    }

    /// Lists one page of articles matching `expression`.
    pub fn list_articles(
        &self,
        expression: &Record,
        request: &PageRequest,
    ) -> ResponseEnvelope<PageResult<Article>> {
        let result = self.repo().find_paginated(expression, request);
        respond("list_articles", result, |page| {
            format!("{} of {} articles", page.items.len(), page.total)
        })
    }

    /// First page with the configured default page size.
    pub fn list_recent(&self, expression: &Record) -> ResponseEnvelope<PageResult<Article>> {
        self.list_articles(expression, &PageRequest::new(1, self.config.default_per_page))
    }

    pub fn batch_create_articles(
        &mut self,
        items: &[Record],
    ) -> ResponseEnvelope<BatchSummary<EntityId>> {
        let (config, translator) = (self.config, self.translator);
        let result = in_transaction(self.conn, |tx| {
            ArticleRepository::with_translator(tx, config, translator).batch_create(items)
        });
        respond("batch_create_articles", result, batch_message)
    }

    pub fn batch_update_articles(
        &mut self,
        ids: &[EntityId],
        raw: &Record,
    ) -> ResponseEnvelope<BatchSummary<EntityId>> {
        let (config, translator) = (self.config, self.translator);
        let result = in_transaction(self.conn, |tx| {
            ArticleRepository::with_translator(tx, config, translator)
                .batch_update_by_ids(ids, raw)
        });
        respond("batch_update_articles", result, batch_message)
    }

    pub fn batch_update_by_link(
        &mut self,
        items: &[Record],
    ) -> ResponseEnvelope<BatchSummary<String>> {
        let (config, translator) = (self.config, self.translator);
        let result = in_transaction(self.conn, |tx| {
            ArticleRepository::with_translator(tx, config, translator).batch_update_by_link(items)
        });
        respond("batch_update_by_link", result, batch_message)
    }

    fn repo(&self) -> ArticleRepository<'_> {
        ArticleRepository::with_translator(&*self.conn, self.config, self.translator)
    }
}

fn respond<T>(
    action: &str,
    result: RepoResult<T>,
    message: impl FnOnce(&T) -> String,
) -> ResponseEnvelope<T> {
    match result {
        Ok(data) => ResponseEnvelope::ok(message(&data), Some(data)),
        Err(err) => failed(action, &err),
    }
}

fn failed<T>(action: &str, err: &RepoError) -> ResponseEnvelope<T> {
    let kind = err.kind();
    if kind != ErrorKind::Validation {
        warn!(
            "event=service_call module=service status=error action={} kind={:?}",
            action, kind
        );
    }
    ResponseEnvelope::fail(err.to_string())
}

fn batch_message<K>(summary: &BatchSummary<K>) -> String {
    format!(
        "{} succeeded, {} failed",
        summary.success_count, summary.fail_count
    )
}
