//! Contract-driven repository shared by every entity.
//!
//! # Responsibility
//! - Provide CRUD, filtered listing, pagination and batch APIs over one table
//!   described by a `SchemaContract`.
//! - Run every write through the two validation stages before SQL.
//!
//! # Invariants
//! - Never opens, commits or rolls back a transaction; callers own the unit of work.
//! - Every store call goes through the execution wrapper.
//! - Audit columns are never written here; the schema maintains them.
//! - Read misses return `None`; mutations on a missing id fail with an
//!   entity-not-found `DatabaseOperation`.

use crate::config::QueryConfig;
use crate::error::{RepoError, RepoResult};
use crate::filter::sql::{render, SqlFilter};
use crate::filter::FilterTranslator;
use crate::model::{EntityId, Record};
use crate::repo::batch::BatchSummary;
use crate::repo::exec::{execute, StoreError, DEFAULT_PRESERVE};
use crate::repo::page::{plan_page, FindOptions, Listing, PageRequest, PageResult};
use crate::schema::field::{read_column, to_sql_value, FieldKind};
use crate::schema::{SchemaContract, ID_COLUMN};
use crate::validate::{reconcile, validate, Operation};
use log::{debug, info};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, Row};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

type Column<'c> = (&'c str, FieldKind);

/// Repository for entity `E` whose filters are translated by `T`.
pub struct GenericRepository<'conn, E, T> {
    conn: &'conn Connection,
    contract: Arc<SchemaContract>,
    translator: T,
    config: QueryConfig,
    _entity: PhantomData<fn() -> E>,
}

impl<'conn, E, T> GenericRepository<'conn, E, T>
where
    E: DeserializeOwned,
    T: FilterTranslator,
{
    pub fn new(
        conn: &'conn Connection,
        contract: Arc<SchemaContract>,
        translator: T,
        config: QueryConfig,
    ) -> Self {
        Self {
            conn,
            contract,
            translator,
            config,
            _entity: PhantomData,
        }
    }

    pub fn contract(&self) -> &SchemaContract {
        &self.contract
    }

    pub fn query_config(&self) -> QueryConfig {
        self.config
    }

    /// Loads one entity by id; `None` when absent.
    pub fn get_by_id(&self, id: EntityId) -> RepoResult<Option<E>> {
        self.run("get", || self.load_record(id))?
            .map(|record| self.decode(record))
            .transpose()
    }

    /// Loads one entity by id, failing with `NotFound` when absent.
    pub fn get_or_fail(&self, id: EntityId) -> RepoResult<E> {
        self.get_by_id(id)?.ok_or_else(|| RepoError::NotFound {
            entity: self.contract.entity().to_string(),
            id,
        })
    }

    /// Loads one entity by its natural key; `None` when absent.
    pub fn get_by_natural_key(&self, value: &str) -> RepoResult<Option<E>> {
        self.find_record_by_natural_key(value)?
            .map(|record| self.decode(record))
            .transpose()
    }

    /// Validates, inserts and reads back a new entity.
    pub fn create(&self, raw: &Record) -> RepoResult<E> {
        let record = self.create_record(raw)?;
        self.decode(record)
    }

    /// Applies a partial update.
    ///
    /// # Contract
    /// - Empty `raw` returns `Ok(None)` without touching storage.
    /// - Missing `id` fails with an entity-not-found `DatabaseOperation`.
    /// - A payload equal to the stored row returns the row without writing.
    pub fn update(&self, id: EntityId, raw: &Record) -> RepoResult<Option<E>> {
        self.update_record(id, raw)?
            .map(|record| self.decode(record))
            .transpose()
    }

    /// Deletes by id. Returns `false` when no such row exists.
    pub fn delete(&self, id: EntityId) -> RepoResult<bool> {
        let table = self.contract.table();
        let exists_sql =
            format!("SELECT EXISTS(SELECT 1 FROM \"{table}\" WHERE \"{ID_COLUMN}\" = ?1)");
        let delete_sql = format!("DELETE FROM \"{table}\" WHERE \"{ID_COLUMN}\" = ?1");

        let deleted = self.run("delete", || {
            let exists: i64 = self.conn.query_row(&exists_sql, [id], |row| row.get(0))?;
            if exists == 0 {
                return Ok(false);
            }
            let changed = self.conn.execute(&delete_sql, [id])?;
            Ok(changed > 0)
        })?;

        if deleted {
            info!(
                "event=repo_write module=repo status=ok entity={} action=delete id={}",
                self.contract.entity(),
                id
            );
        }
        Ok(deleted)
    }

    /// Lists entities matching `expression`, optionally as preview projections.
    pub fn find_by_filter(
        &self,
        expression: &Record,
        options: &FindOptions,
    ) -> RepoResult<Listing<E>> {
        let predicates = self.translator.translate(&self.contract, expression)?;
        let order = self.order_clause(options.sort_by.as_deref(), options.sort_desc)?;
        let filter = render(&predicates);
        let projection = self.projection(options.is_preview, options.preview_fields.as_deref());
        self.select_listing(
            &filter,
            &order,
            options.limit.map(u64::from),
            u64::from(options.offset),
            projection,
        )
    }

    /// Returns one page of entities matching `expression`.
    ///
    /// Pages past the end are clamped to the last page.
    pub fn find_paginated(
        &self,
        expression: &Record,
        request: &PageRequest,
    ) -> RepoResult<PageResult<E>> {
        self.check_page_request(request)?;
        let predicates = self.translator.translate(&self.contract, expression)?;
        let order = self.order_clause(request.sort_by.as_deref(), request.sort_desc)?;
        let filter = render(&predicates);

        let total = self.count_rendered(&filter)?;
        let window = plan_page(total, request.page, request.per_page);
        let projection = self.projection(request.is_preview, request.preview_fields.as_deref());
        let items = self.select_listing(
            &filter,
            &order,
            Some(u64::from(request.per_page)),
            window.offset,
            projection,
        )?;

        debug!(
            "event=repo_page module=repo status=ok entity={} page={} per_page={} total={}",
            self.contract.entity(),
            window.page,
            request.per_page,
            total
        );
        Ok(PageResult {
            items,
            page: window.page,
            per_page: request.per_page,
            total,
            total_pages: window.total_pages,
            has_next: window.has_next,
            has_prev: window.has_prev,
        })
    }

    /// Counts entities matching `expression`.
    pub fn count(&self, expression: &Record) -> RepoResult<u64> {
        let predicates = self.translator.translate(&self.contract, expression)?;
        self.count_rendered(&render(&predicates))
    }

    /// Creates each item independently and reports the created ids.
    pub fn batch_create(&self, items: &[Record]) -> RepoResult<BatchSummary<EntityId>> {
        let mut summary = BatchSummary::new();
        for item in items {
            match self
                .create_record(item)
                .and_then(|record| self.record_id(&record))
            {
                Ok(id) => summary.record_success(id),
                Err(err) => summary.record_failure(Value::Object(item.clone()), err.to_string()),
            }
        }
        self.log_batch("batch_create", &summary);
        Ok(summary)
    }

    /// Applies the same partial update to every id.
    ///
    /// An empty `raw` is a no-op for the whole batch. Ids with no row are
    /// reported in `missing`.
    pub fn batch_update_by_ids(
        &self,
        ids: &[EntityId],
        raw: &Record,
    ) -> RepoResult<BatchSummary<EntityId>> {
        let mut summary = BatchSummary::new();
        if raw.is_empty() {
            debug!(
                "event=repo_batch module=repo status=noop entity={} action=batch_update_by_ids",
                self.contract.entity()
            );
            return Ok(summary);
        }

        for &id in ids {
            match self.update_record(id, raw) {
                Ok(_) => summary.record_success(id),
                Err(err) if err.is_entity_not_found() => summary.record_missing(id),
                Err(err) => summary.record_failure(Value::from(id), err.to_string()),
            }
        }
        self.log_batch("batch_update_by_ids", &summary);
        Ok(summary)
    }

    /// Updates each item located by the contract's natural key.
    ///
    /// Each item carries its key plus the fields to change. An item with no
    /// fields besides its key is skipped and counted nowhere.
    pub fn batch_update_by_natural_key(
        &self,
        items: &[Record],
    ) -> RepoResult<BatchSummary<String>> {
        let key_field = self.natural_key()?;
        let mut summary = BatchSummary::new();

        for item in items {
            let key = item
                .get(key_field)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|key| !key.is_empty());
            let Some(key) = key else {
                summary.record_failure(
                    Value::Object(item.clone()),
                    format!("missing natural key `{key_field}`"),
                );
                continue;
            };

            let mut changes = item.clone();
            changes.remove(key_field);
            if changes.is_empty() {
                debug!(
                    "event=repo_batch module=repo status=skip entity={} key={}",
                    self.contract.entity(),
                    key
                );
                continue;
            }

            let outcome = self
                .find_record_by_natural_key(key)
                .and_then(|found| match found {
                    None => Ok(false),
                    Some(record) => {
                        let id = self.record_id(&record)?;
                        self.update_record(id, &changes).map(|_| true)
                    }
                });
            match outcome {
                Ok(true) => summary.record_success(key.to_string()),
                Ok(false) => summary.record_missing(key.to_string()),
                Err(err) => summary.record_failure(Value::Object(item.clone()), err.to_string()),
            }
        }
        self.log_batch("batch_update_by_natural_key", &summary);
        Ok(summary)
    }

    fn create_record(&self, raw: &Record) -> RepoResult<Record> {
        let validated = validate(&self.contract, raw, Operation::Create)?;
        let payload = reconcile(&self.contract, &validated, None)?;

        let table = self.contract.table();
        let sql = if payload.is_empty() {
            format!("INSERT INTO \"{table}\" DEFAULT VALUES")
        } else {
            let columns: Vec<String> = payload.keys().map(|column| format!("\"{column}\"")).collect();
            let placeholders = vec!["?"; payload.len()].join(", ");
            format!(
                "INSERT INTO \"{table}\" ({}) VALUES ({placeholders})",
                columns.join(", ")
            )
        };
        let params: Vec<SqlValue> = payload.values().map(to_sql_value).collect();

        let record = self.run("create", || {
            self.conn.execute(&sql, params_from_iter(params))?;
            let id = self.conn.last_insert_rowid();
            self.load_record(id)?.ok_or_else(|| {
                StoreError::from(RepoError::invalid_data(
                    self.contract.entity(),
                    format!("row id={id} missing after insert"),
                ))
            })
        })?;

        info!(
            "event=repo_write module=repo status=ok entity={} action=create id={}",
            self.contract.entity(),
            record.get(ID_COLUMN).unwrap_or(&Value::Null)
        );
        Ok(record)
    }

    fn update_record(&self, id: EntityId, raw: &Record) -> RepoResult<Option<Record>> {
        if raw.is_empty() {
            debug!(
                "event=repo_write module=repo status=noop entity={} action=update id={}",
                self.contract.entity(),
                id
            );
            return Ok(None);
        }

        let existing = self
            .run("update", || self.load_record(id))?
            .ok_or_else(|| RepoError::entity_not_found(self.contract.entity(), id))?;
        let validated = validate(&self.contract, raw, Operation::Update)?;
        let reconciled = reconcile(&self.contract, &validated, Some(&existing))?;

        let changes: Vec<(&String, &Value)> = reconciled
            .iter()
            .filter(|(column, value)| existing.get(column.as_str()) != Some(*value))
            .collect();
        if changes.is_empty() {
            debug!(
                "event=repo_write module=repo status=unchanged entity={} action=update id={}",
                self.contract.entity(),
                id
            );
            return Ok(Some(existing));
        }

        let assignments: Vec<String> = changes
            .iter()
            .map(|(column, _)| format!("\"{column}\" = ?"))
            .collect();
        let mut params: Vec<SqlValue> = changes.iter().map(|(_, value)| to_sql_value(value)).collect();
        params.push(SqlValue::Integer(id));
        let sql = format!(
            "UPDATE \"{}\" SET {} WHERE \"{ID_COLUMN}\" = ?",
            self.contract.table(),
            assignments.join(", ")
        );

        let updated = self.run("update", || {
            let changed = self.conn.execute(&sql, params_from_iter(params))?;
            if changed == 0 {
                return Ok(None);
            }
            self.load_record(id)
        })?;
        let record = updated.ok_or_else(|| RepoError::entity_not_found(self.contract.entity(), id))?;

        info!(
            "event=repo_write module=repo status=ok entity={} action=update id={} fields={}",
            self.contract.entity(),
            id,
            changes.len()
        );
        Ok(Some(record))
    }

    fn find_record_by_natural_key(&self, value: &str) -> RepoResult<Option<Record>> {
        let key_field = self.natural_key()?;
        let columns = self.contract.columns();
        let sql = format!(
            "{} WHERE \"{key_field}\" = ?1 LIMIT 1",
            self.select_sql(&columns)
        );
        let records = self.run("get", || {
            self.query_records(&sql, vec![SqlValue::Text(value.to_string())], &columns)
        })?;
        Ok(records.into_iter().next())
    }

    fn natural_key(&self) -> RepoResult<&str> {
        self.contract.natural_key().ok_or_else(|| {
            RepoError::InvalidOperation(format!(
                "{} has no natural key",
                self.contract.entity()
            ))
        })
    }

    fn check_page_request(&self, request: &PageRequest) -> RepoResult<()> {
        if request.page == 0 {
            return Err(RepoError::InvalidOperation(
                "page must be >= 1".to_string(),
            ));
        }
        if request.per_page == 0 || request.per_page > self.config.max_per_page {
            return Err(RepoError::InvalidOperation(format!(
                "per_page must be within 1..={}, got {}",
                self.config.max_per_page, request.per_page
            )));
        }
        Ok(())
    }

    fn order_clause(&self, sort_by: Option<&str>, descending: bool) -> RepoResult<String> {
        let column = sort_by.unwrap_or_else(|| self.contract.default_sort_column());
        if !self.contract.is_known_column(column) {
            return Err(RepoError::InvalidOperation(format!(
                "cannot sort {} by unknown field `{column}`",
                self.contract.entity()
            )));
        }

        let direction = if descending { "DESC" } else { "ASC" };
        if column == ID_COLUMN {
            Ok(format!(" ORDER BY \"{ID_COLUMN}\" {direction}"))
        } else {
            Ok(format!(
                " ORDER BY \"{column}\" {direction}, \"{ID_COLUMN}\" {direction}"
            ))
        }
    }

    /// Resolves preview columns; `None` means full entities.
    fn projection(&self, is_preview: bool, requested: Option<&[String]>) -> Option<Vec<Column<'_>>> {
        if !is_preview {
            return None;
        }

        let names: Vec<&str> = match requested {
            Some(fields) if !fields.is_empty() => fields.iter().map(String::as_str).collect(),
            _ => self
                .contract
                .preview_fields()
                .iter()
                .map(String::as_str)
                .collect(),
        };

        let available = self.contract.columns();
        let mut columns: Vec<Column<'_>> = Vec::new();
        for name in names {
            match available.iter().find(|(column, _)| *column == name) {
                Some(column) if !columns.iter().any(|(seen, _)| *seen == column.0) => {
                    columns.push(*column);
                }
                Some(_) => {}
                None => debug!(
                    "event=repo_preview module=repo status=skip entity={} field={}",
                    self.contract.entity(),
                    name
                ),
            }
        }

        if columns.is_empty() {
            debug!(
                "event=repo_preview module=repo status=fallback entity={}",
                self.contract.entity()
            );
            return None;
        }
        Some(columns)
    }

    fn select_listing<'s>(
        &'s self,
        filter: &SqlFilter,
        order: &str,
        limit: Option<u64>,
        offset: u64,
        projection: Option<Vec<Column<'s>>>,
    ) -> RepoResult<Listing<E>> {
        let is_preview = projection.is_some();
        let columns = projection.unwrap_or_else(|| self.contract.columns());

        let mut sql = format!("{}{}{}", self.select_sql(&columns), filter.clause, order);
        let mut params = filter.params.clone();
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            params.push(SqlValue::Integer(to_i64(limit)));
            if offset > 0 {
                sql.push_str(" OFFSET ?");
                params.push(SqlValue::Integer(to_i64(offset)));
            }
        } else if offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            params.push(SqlValue::Integer(to_i64(offset)));
        }

        let records = self.run("list", || self.query_records(&sql, params, &columns))?;
        if is_preview {
            return Ok(Listing::Preview(records));
        }
        records
            .into_iter()
            .map(|record| self.decode(record))
            .collect::<RepoResult<Vec<E>>>()
            .map(Listing::Full)
    }

    fn count_rendered(&self, filter: &SqlFilter) -> RepoResult<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM \"{}\"{}",
            self.contract.table(),
            filter.clause
        );
        let params = filter.params.clone();
        let total: i64 = self.run("count", || {
            Ok(self
                .conn
                .query_row(&sql, params_from_iter(params), |row| row.get(0))?)
        })?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    fn select_sql(&self, columns: &[Column<'_>]) -> String {
        let list: Vec<String> = columns
            .iter()
            .map(|(column, _)| format!("\"{column}\""))
            .collect();
        format!("SELECT {} FROM \"{}\"", list.join(", "), self.contract.table())
    }

    fn load_record(&self, id: EntityId) -> Result<Option<Record>, StoreError> {
        let columns = self.contract.columns();
        let sql = format!("{} WHERE \"{ID_COLUMN}\" = ?1", self.select_sql(&columns));
        Ok(self
            .query_records(&sql, vec![SqlValue::Integer(id)], &columns)?
            .into_iter()
            .next())
    }

    fn query_records(
        &self,
        sql: &str,
        params: Vec<SqlValue>,
        columns: &[Column<'_>],
    ) -> Result<Vec<Record>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(read_record(row, columns)?);
        }
        Ok(records)
    }

    fn decode(&self, record: Record) -> RepoResult<E> {
        serde_json::from_value(Value::Object(record))
            .map_err(|err| RepoError::invalid_data(self.contract.entity(), err.to_string()))
    }

    fn record_id(&self, record: &Record) -> RepoResult<EntityId> {
        record
            .get(ID_COLUMN)
            .and_then(Value::as_i64)
            .ok_or_else(|| RepoError::invalid_data(self.contract.entity(), "row has no id"))
    }

    fn run<R>(
        &self,
        action: &str,
        operation: impl FnOnce() -> Result<R, StoreError>,
    ) -> RepoResult<R> {
        let entity = self.contract.entity();
        execute(
            entity,
            &format!("failed to {action} {entity}"),
            DEFAULT_PRESERVE,
            operation,
        )
    }

    fn log_batch<K>(&self, action: &str, summary: &BatchSummary<K>) {
        info!(
            "event=repo_batch module=repo status=ok entity={} action={} success={} failed={}",
            self.contract.entity(),
            action,
            summary.success_count,
            summary.fail_count
        );
    }
}

fn read_record(row: &Row<'_>, columns: &[Column<'_>]) -> rusqlite::Result<Record> {
    let mut record = Record::new();
    for (column, kind) in columns {
        record.insert((*column).to_string(), read_column(row, column, *kind)?);
    }
    Ok(record)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
