//! The storage engine: table lifecycle, item operations, query/scan
//! execution, GSI synchronization, admission control, and the control-plane
//! table.
//!
//! All state-changing and state-reading operations serialize through one
//! engine-wide lock held for the duration of a logical transaction; the
//! deterministic version-history behavior this buys matters more than
//! throughput for a test double. Admission (chaos counter, then rate
//! limiter) runs before the lock is taken, against per-table state kept in
//! a registry that tolerates concurrent access.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering as AtomicOrdering;

use chrono::Duration;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use baddb_model::types::{TableDescription, TableStatus};
use baddb_model::{AttributeValue, Entry};

use crate::clock::{Clock, SystemClock};
use crate::config::BaddbConfig;
use crate::error::{BaddbError, BaddbResult};
use crate::expression::ConditionExpression;
use crate::gsi;
use crate::key::{PrimaryKey, validated_key};
use crate::plan::sort_matches;
use crate::request::{
    BatchGetRequest, BatchGetResult, BatchWriteOperation, BatchWriteRequest, BatchWriteResult,
    DeleteRequest, GetRequest, PutRequest, Query, QueryResult, ScanRequest, TransactWriteOperation,
    TransactWriteRequest, UpdateRequest, UpdateResult, UpdateTableRequest,
};
use crate::store::{Row, RowStore};
use crate::table::{CONTROL_TABLE_NAME, Table, TableAdmission, TableMetadata};
use crate::tuple::EntryWrapper;

/// Maximum entry size in bytes (400 KB).
const MAX_ENTRY_SIZE_BYTES: u64 = 400 * 1024;

/// The storage engine owning all tables.
#[derive(Debug)]
pub struct StorageEngine {
    inner: Mutex<EngineInner>,
    admission: DashMap<String, Arc<TableAdmission>>,
    clock: Arc<dyn Clock>,
    config: BaddbConfig,
}

#[derive(Debug, Default)]
struct EngineInner {
    tables: HashMap<String, Table>,
}

impl StorageEngine {
    /// Creates an engine on the system clock.
    #[must_use]
    pub fn new(config: BaddbConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an engine on an injected clock.
    #[must_use]
    pub fn with_clock(config: BaddbConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(EngineInner::default()),
            admission: DashMap::new(),
            clock,
            config,
        }
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &BaddbConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// Admission control
// ---------------------------------------------------------------------------

impl StorageEngine {
    fn admission_for(&self, table: &str) -> BaddbResult<Arc<TableAdmission>> {
        self.admission
            .get(table)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| BaddbError::table_not_found(table))
    }

    /// Consumes one unit of the chaos counter if it is positive.
    fn consume_chaos(admission: &TableAdmission) -> BaddbResult<()> {
        let mut current = admission.unprocessed.load(AtomicOrdering::SeqCst);
        loop {
            if current <= 0 {
                return Ok(());
            }
            match admission.unprocessed.compare_exchange(
                current,
                current - 1,
                AtomicOrdering::SeqCst,
                AtomicOrdering::SeqCst,
            ) {
                Ok(_) => return Err(BaddbError::Unprocessed),
                Err(actual) => current = actual,
            }
        }
    }

    /// Write admission: chaos counter, then one write token.
    fn admit_write(&self, table: &str) -> BaddbResult<()> {
        let admission = self.admission_for(table)?;
        Self::consume_chaos(&admission)?;
        if let Some(limiter) = &admission.write_limiter {
            if !limiter.try_take(1.0, self.clock.now()) {
                return Err(BaddbError::throughput_exceeded(table));
            }
        }
        Ok(())
    }

    /// Read admission: chaos counter, then one token (two for a strongly
    /// consistent read). An index read takes from the index's own limiter.
    fn admit_read(&self, table: &str, index: Option<&str>, consistent: bool) -> BaddbResult<()> {
        let admission = self.admission_for(table)?;
        Self::consume_chaos(&admission)?;
        match index {
            Some(index_name) => {
                if let Some(limiter) = admission.gsi_read_limiters.get(index_name) {
                    if !limiter.try_take(1.0, self.clock.now()) {
                        return Err(BaddbError::throughput_exceeded(index_name));
                    }
                }
            }
            None => {
                if let Some(limiter) = &admission.read_limiter {
                    let tokens = if consistent { 2.0 } else { 1.0 };
                    if !limiter.try_take(tokens, self.clock.now()) {
                        return Err(BaddbError::throughput_exceeded(table));
                    }
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Table lifecycle
// ---------------------------------------------------------------------------

impl StorageEngine {
    /// Creates a table.
    ///
    /// # Errors
    ///
    /// Returns `ResourceInUse` if a table of that name exists, and
    /// `Validation` for the reserved control-table name.
    pub fn create_table(&self, meta: TableMetadata) -> BaddbResult<TableDescription> {
        if meta.table_name == CONTROL_TABLE_NAME {
            return Err(BaddbError::validation(format!(
                "table name '{CONTROL_TABLE_NAME}' is reserved"
            )));
        }

        let now = self.clock.now();
        let mut inner = self.inner.lock();
        if inner.tables.contains_key(&meta.table_name) {
            return Err(BaddbError::table_exists(&meta.table_name));
        }

        let name = meta.table_name.clone();
        let admission = Arc::new(TableAdmission::for_table(&meta, now, 0));
        let gsi_rows = meta
            .global_secondary_indexes
            .iter()
            .map(|gsi| (gsi.index_name.clone(), RowStore::new()))
            .collect();

        let table = Table {
            arn: format!(
                "arn:aws:dynamodb:{}:000000000000:table/{}",
                self.config.default_region, name
            ),
            table_id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            meta,
            rows: RowStore::new(),
            gsi_rows,
        };
        let description = table.to_description();
        inner.tables.insert(name.clone(), table);
        self.admission.insert(name.clone(), admission);
        debug!(table = %name, "created table");
        Ok(description)
    }

    /// Deletes a table.
    pub fn delete_table(&self, name: &str) -> BaddbResult<TableDescription> {
        if name == CONTROL_TABLE_NAME {
            return Err(BaddbError::validation(format!(
                "table '{CONTROL_TABLE_NAME}' cannot be deleted"
            )));
        }
        let mut inner = self.inner.lock();
        let table = inner
            .tables
            .remove(name)
            .ok_or_else(|| BaddbError::table_not_found(name))?;
        self.admission.remove(name);
        debug!(table = %name, "deleted table");
        let mut description = table.to_description();
        description.table_status = TableStatus::Deleting;
        Ok(description)
    }

    /// Describes a table.
    pub fn describe_table(&self, name: &str) -> BaddbResult<TableDescription> {
        let inner = self.inner.lock();
        inner
            .tables
            .get(name)
            .map(Table::to_description)
            .ok_or_else(|| BaddbError::table_not_found(name))
    }

    /// Lists all table names, sorted, including the control table.
    #[must_use]
    pub fn list_tables(&self) -> Vec<String> {
        let inner = self.inner.lock();
        let mut names: Vec<String> = inner.tables.keys().cloned().collect();
        names.push(CONTROL_TABLE_NAME.to_owned());
        names.sort();
        names
    }

    /// Returns a table's settings, for the request builders.
    pub fn table_metadata(&self, name: &str) -> BaddbResult<TableMetadata> {
        let inner = self.inner.lock();
        inner
            .tables
            .get(name)
            .map(|table| table.meta.clone())
            .ok_or_else(|| BaddbError::table_not_found(name))
    }

    /// Applies GSI topology changes: backfills created indexes from the
    /// existing rows, all within this one engine transaction. On any error
    /// the previous metadata stays in place.
    pub fn update_table(&self, request: UpdateTableRequest) -> BaddbResult<TableDescription> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let table = inner
            .tables
            .get_mut(&request.table_name)
            .ok_or_else(|| BaddbError::table_not_found(&request.table_name))?;

        // Stage everything on a clone of the metadata.
        let mut meta = table.meta.clone();
        for index_name in &request.delete {
            let Some(position) = meta
                .global_secondary_indexes
                .iter()
                .position(|gsi| gsi.index_name == *index_name)
            else {
                return Err(BaddbError::index_not_found(&request.table_name, index_name));
            };
            meta.global_secondary_indexes.remove(position);
        }

        let mut backfilled = Vec::new();
        for setting in &request.create {
            if meta.gsi(&setting.index_name).is_some() {
                return Err(BaddbError::validation(format!(
                    "index already exists: {}",
                    setting.index_name
                )));
            }
            let store = gsi::backfill(&meta, setting, &table.rows);
            meta.global_secondary_indexes.push(setting.clone());
            backfilled.push((setting.index_name.clone(), store));
        }

        // Commit: swap the metadata record and the index stores.
        for index_name in &request.delete {
            table.gsi_rows.remove(index_name);
        }
        for (index_name, store) in backfilled {
            table.gsi_rows.insert(index_name, store);
        }
        table.meta = meta;

        let carried = self
            .admission
            .get(&request.table_name)
            .map_or(0, |a| a.unprocessed.load(AtomicOrdering::SeqCst));
        self.admission.insert(
            request.table_name.clone(),
            Arc::new(TableAdmission::for_table(&table.meta, now, carried)),
        );
        debug!(table = %request.table_name, "updated table indexes");
        Ok(table.to_description())
    }
}

// ---------------------------------------------------------------------------
// Item operations
// ---------------------------------------------------------------------------

impl StorageEngine {
    /// Stores an entry. Writes to the control table mutate another table's
    /// knobs instead.
    ///
    /// Returns the entry the write replaced, if any.
    pub fn put(&self, request: PutRequest) -> BaddbResult<Option<Entry>> {
        if request.table_name == CONTROL_TABLE_NAME {
            self.control_put(&request.entry)?;
            return Ok(None);
        }
        self.admit_write(&request.table_name)?;
        self.put_admitted(&request.table_name, request.entry, request.condition.as_ref())
    }

    /// Reads an entry by primary key.
    pub fn get(&self, request: GetRequest) -> BaddbResult<Option<Entry>> {
        self.admit_read(&request.table_name, None, request.consistent_read)?;
        self.get_admitted(&request)
    }

    /// Deletes an entry by appending a tombstone version.
    ///
    /// Returns the entry the delete removed, if any.
    pub fn delete(&self, request: DeleteRequest) -> BaddbResult<Option<Entry>> {
        self.admit_write(&request.table_name)?;
        self.delete_admitted(
            &request.table_name,
            &request.key,
            request.key_entry,
            request.condition.as_ref(),
        )
    }

    /// Applies an update expression to an entry, creating it if absent.
    pub fn update(&self, request: UpdateRequest) -> BaddbResult<UpdateResult> {
        self.admit_write(&request.table_name)?;
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let table = inner
            .tables
            .get_mut(&request.table_name)
            .ok_or_else(|| BaddbError::table_not_found(&request.table_name))?;

        let encoded = request.key.encoded();
        let current = current_entry(&table.rows, &encoded);
        check_condition(request.condition.as_ref(), current.as_ref())?;

        let base = current.clone().unwrap_or_else(|| request.key_entry.clone());
        let updated = request
            .update
            .apply(&base)
            .map_err(|e| BaddbError::evaluation(&e))?;

        // Key attributes are immutable through updates.
        let new_key = validated_key(
            &table.meta.partition_key,
            table.meta.sort_key.as_ref(),
            &updated,
        )?;
        if new_key.encoded() != encoded {
            return Err(BaddbError::validation(
                "an update expression may not modify key attributes",
            ));
        }
        check_entry_size(&updated)?;

        write_version(table, &request.key, EntryWrapper::live(updated.clone(), now));
        debug!(table = %request.table_name, "updated entry");
        Ok(UpdateResult {
            old: current.unwrap_or_default(),
            new: updated,
        })
    }

    /// Executes a query against the base table or a GSI.
    pub fn query(&self, request: Query) -> BaddbResult<QueryResult> {
        self.admit_read(
            &request.table_name,
            request.index_name.as_deref(),
            request.consistent_read,
        )?;
        let now = self.clock.now();
        let inner = self.inner.lock();
        let table = inner
            .tables
            .get(&request.table_name)
            .ok_or_else(|| BaddbError::table_not_found(&request.table_name))?;

        let target = resolve_target(table, request.index_name.as_deref())?;
        let partition = request
            .key_condition
            .partition_value
            .key_bytes()
            .ok_or_else(|| {
                BaddbError::validation("the partition key value is not key-encodable")
            })?;

        let read_ts = now - Duration::seconds(target.delay_seconds);
        let partition_slice: &[u8] = &partition;

        let rows: Box<dyn Iterator<Item = (&Vec<u8>, &Row)> + '_> = if request.scan_index_forward {
            match &request.exclusive_start_key {
                Some(start) => Box::new(
                    target
                        .store
                        .iter_after(start)
                        .filter(move |(_, row)| row.partition == partition_slice),
                ),
                None => Box::new(target.store.partition_rows(partition_slice)),
            }
        } else {
            match &request.exclusive_start_key {
                Some(start) => Box::new(
                    target
                        .store
                        .iter_before(start)
                        .filter(move |(_, row)| row.partition == partition_slice),
                ),
                None => Box::new(target.store.partition_rows(partition_slice).rev()),
            }
        };

        let mut result = QueryResult::default();
        for (_, row) in rows {
            if result.entries.len() >= request.limit {
                break;
            }
            let Some(wrapper) =
                row.tuple
                    .visible(read_ts, request.consistent_read, target.is_gsi)
            else {
                continue;
            };
            if wrapper.is_deleted {
                continue;
            }
            if !sort_matches(
                request.key_condition.sort_predicate.as_ref(),
                target.sort_attribute,
                &wrapper.entry,
            )? {
                continue;
            }
            result.scanned_count += 1;
            if let Some(filter) = &request.filter {
                if !filter
                    .evaluate(&wrapper.entry)
                    .map_err(|e| BaddbError::evaluation(&e))?
                {
                    continue;
                }
            }
            result.entries.push(match &request.projection {
                Some(projection) => projection.apply(&wrapper.entry),
                None => wrapper.entry.clone(),
            });
        }
        Ok(result)
    }

    /// Executes a scan against the base table or a GSI, optionally limited
    /// to one parallel-scan segment.
    pub fn scan(&self, request: ScanRequest) -> BaddbResult<QueryResult> {
        self.admit_read(
            &request.table_name,
            request.index_name.as_deref(),
            request.consistent_read,
        )?;
        let now = self.clock.now();
        let inner = self.inner.lock();
        let table = inner
            .tables
            .get(&request.table_name)
            .ok_or_else(|| BaddbError::table_not_found(&request.table_name))?;

        let target = resolve_target(table, request.index_name.as_deref())?;
        let read_ts = now - Duration::seconds(target.delay_seconds);

        let rows: Box<dyn Iterator<Item = (&Vec<u8>, &Row)> + '_> =
            match &request.exclusive_start_key {
                Some(start) => Box::new(target.store.iter_after(start)),
                None => Box::new(target.store.iter()),
            };

        let mut result = QueryResult::default();
        for (_, row) in rows {
            if result.entries.len() >= request.limit {
                break;
            }
            if let Some(segments) = request.segments {
                if row.shard_id % segments.total_segments != segments.segment {
                    continue;
                }
            }
            let Some(wrapper) =
                row.tuple
                    .visible(read_ts, request.consistent_read, target.is_gsi)
            else {
                continue;
            };
            if wrapper.is_deleted {
                continue;
            }
            result.scanned_count += 1;
            if let Some(filter) = &request.filter {
                if !filter
                    .evaluate(&wrapper.entry)
                    .map_err(|e| BaddbError::evaluation(&e))?
                {
                    continue;
                }
            }
            result.entries.push(match &request.projection {
                Some(projection) => projection.apply(&wrapper.entry),
                None => wrapper.entry.clone(),
            });
        }
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Batch and transactional operations
// ---------------------------------------------------------------------------

impl StorageEngine {
    /// Fans out over `Get`. Items rejected by the chaos counter land in the
    /// per-table unprocessed map instead of failing the batch.
    pub fn batch_get(&self, request: BatchGetRequest) -> BaddbResult<BatchGetResult> {
        let mut result = BatchGetResult::default();
        for get in request.gets {
            match self.admit_read(&get.table_name, None, get.consistent_read) {
                Err(BaddbError::Unprocessed) => {
                    result
                        .unprocessed_keys
                        .entry(get.table_name.clone())
                        .or_default()
                        .push(get.key_entry);
                    continue;
                }
                Err(other) => return Err(other),
                Ok(()) => {}
            }
            if let Some(entry) = self.get_admitted(&get)? {
                result
                    .responses
                    .entry(get.table_name.clone())
                    .or_default()
                    .push(entry);
            }
        }
        Ok(result)
    }

    /// Fans out over `Put`/`Delete`. Items rejected by the chaos counter
    /// land in the per-table unprocessed map instead of failing the batch.
    pub fn batch_write(&self, request: BatchWriteRequest) -> BaddbResult<BatchWriteResult> {
        let mut result = BatchWriteResult::default();
        for write in request.writes {
            match self.admit_write(write.table_name()) {
                Err(BaddbError::Unprocessed) => {
                    result
                        .unprocessed
                        .entry(write.table_name().to_owned())
                        .or_default()
                        .push(write);
                    continue;
                }
                Err(other) => return Err(other),
                Ok(()) => {}
            }
            match write {
                BatchWriteOperation::Put { table_name, entry } => {
                    self.put_admitted(&table_name, entry, None)?;
                }
                BatchWriteOperation::Delete {
                    table_name,
                    key,
                    key_entry,
                } => {
                    self.delete_admitted(&table_name, &key, key_entry, None)?;
                }
            }
        }
        Ok(result)
    }

    /// Applies a list of writes atomically: every condition is checked
    /// against the pre-transaction state, and either all effects commit or
    /// none do.
    pub fn transact_write(&self, request: TransactWriteRequest) -> BaddbResult<()> {
        for item in &request.items {
            self.admit_write(item.table_name())?;
        }

        let now = self.clock.now();
        let mut inner = self.inner.lock();

        // Phase 1: validate every item and stage its effect.
        let mut staged: Vec<(String, PrimaryKey, EntryWrapper)> = Vec::new();
        for item in &request.items {
            match item {
                TransactWriteOperation::Put(put) => {
                    let table = inner
                        .tables
                        .get(&put.table_name)
                        .ok_or_else(|| BaddbError::table_not_found(&put.table_name))?;
                    let key = validated_key(
                        &table.meta.partition_key,
                        table.meta.sort_key.as_ref(),
                        &put.entry,
                    )?;
                    let current = current_entry(&table.rows, &key.encoded());
                    check_condition(put.condition.as_ref(), current.as_ref())?;
                    check_entry_size(&put.entry)?;
                    staged.push((
                        put.table_name.clone(),
                        key,
                        EntryWrapper::live(put.entry.clone(), now),
                    ));
                }
                TransactWriteOperation::Delete(delete) => {
                    let table = inner
                        .tables
                        .get(&delete.table_name)
                        .ok_or_else(|| BaddbError::table_not_found(&delete.table_name))?;
                    let current = current_entry(&table.rows, &delete.key.encoded());
                    check_condition(delete.condition.as_ref(), current.as_ref())?;
                    if current.is_some() {
                        staged.push((
                            delete.table_name.clone(),
                            delete.key.clone(),
                            EntryWrapper::tombstone(delete.key_entry.clone(), now),
                        ));
                    }
                }
                TransactWriteOperation::Update(update) => {
                    let table = inner
                        .tables
                        .get(&update.table_name)
                        .ok_or_else(|| BaddbError::table_not_found(&update.table_name))?;
                    let encoded = update.key.encoded();
                    let current = current_entry(&table.rows, &encoded);
                    check_condition(update.condition.as_ref(), current.as_ref())?;
                    let base = current.unwrap_or_else(|| update.key_entry.clone());
                    let updated = update
                        .update
                        .apply(&base)
                        .map_err(|e| BaddbError::evaluation(&e))?;
                    let new_key = validated_key(
                        &table.meta.partition_key,
                        table.meta.sort_key.as_ref(),
                        &updated,
                    )?;
                    if new_key.encoded() != encoded {
                        return Err(BaddbError::validation(
                            "an update expression may not modify key attributes",
                        ));
                    }
                    check_entry_size(&updated)?;
                    staged.push((
                        update.table_name.clone(),
                        update.key.clone(),
                        EntryWrapper::live(updated, now),
                    ));
                }
            }
        }

        // Phase 2: apply all staged effects.
        for (table_name, key, wrapper) in staged {
            let table = inner
                .tables
                .get_mut(&table_name)
                .ok_or_else(|| BaddbError::internal("staged table vanished mid-transaction"))?;
            write_version(table, &key, wrapper);
        }
        debug!(items = request.items.len(), "committed transactional write");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Admitted (post-admission) operation bodies
// ---------------------------------------------------------------------------

impl StorageEngine {
    fn put_admitted(
        &self,
        table_name: &str,
        entry: Entry,
        condition: Option<&ConditionExpression>,
    ) -> BaddbResult<Option<Entry>> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let table = inner
            .tables
            .get_mut(table_name)
            .ok_or_else(|| BaddbError::table_not_found(table_name))?;

        let key = validated_key(
            &table.meta.partition_key,
            table.meta.sort_key.as_ref(),
            &entry,
        )?;
        let current = current_entry(&table.rows, &key.encoded());
        check_condition(condition, current.as_ref())?;
        check_entry_size(&entry)?;

        write_version(table, &key, EntryWrapper::live(entry, now));
        debug!(table = %table_name, "stored entry");
        Ok(current)
    }

    fn get_admitted(&self, request: &GetRequest) -> BaddbResult<Option<Entry>> {
        let now = self.clock.now();
        let inner = self.inner.lock();
        let table = inner
            .tables
            .get(&request.table_name)
            .ok_or_else(|| BaddbError::table_not_found(&request.table_name))?;

        let read_ts = now - Duration::seconds(table.meta.table_delay_seconds);
        let entry = table
            .rows
            .get(&request.key.encoded())
            .and_then(|row| row.tuple.visible(read_ts, request.consistent_read, false))
            .filter(|wrapper| !wrapper.is_deleted)
            .map(|wrapper| wrapper.entry.clone());

        Ok(match (entry, &request.projection) {
            (Some(entry), Some(projection)) => Some(projection.apply(&entry)),
            (entry, _) => entry,
        })
    }

    fn delete_admitted(
        &self,
        table_name: &str,
        key: &PrimaryKey,
        key_entry: Entry,
        condition: Option<&ConditionExpression>,
    ) -> BaddbResult<Option<Entry>> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let table = inner
            .tables
            .get_mut(table_name)
            .ok_or_else(|| BaddbError::table_not_found(table_name))?;

        let current = current_entry(&table.rows, &key.encoded());
        check_condition(condition, current.as_ref())?;

        if current.is_some() {
            write_version(table, key, EntryWrapper::tombstone(key_entry, now));
            debug!(table = %table_name, "deleted entry");
        }
        Ok(current)
    }
}

// ---------------------------------------------------------------------------
// Control-plane table
// ---------------------------------------------------------------------------

impl StorageEngine {
    /// Applies a write to the control table: attributes `tableName` (S) and
    /// the optional `tableDelaySeconds`, `gsiDelaySeconds`, and
    /// `unprocessedRequests` (all N) mutate the named table's knobs.
    fn control_put(&self, entry: &Entry) -> BaddbResult<()> {
        let Some(AttributeValue::S(target)) = entry.get("tableName") else {
            return Err(BaddbError::validation(
                "control table writes require a string 'tableName' attribute",
            ));
        };

        let table_delay = control_knob(entry, "tableDelaySeconds")?;
        let gsi_delay = control_knob(entry, "gsiDelaySeconds")?;
        let unprocessed = control_knob(entry, "unprocessedRequests")?;

        let mut inner = self.inner.lock();
        let table = inner
            .tables
            .get_mut(target)
            .ok_or_else(|| BaddbError::table_not_found(target))?;

        if let Some(seconds) = table_delay {
            table.meta.table_delay_seconds = seconds;
        }
        if let Some(seconds) = gsi_delay {
            table.meta.gsi_delay_seconds = seconds;
        }
        if let Some(count) = unprocessed {
            let admission = self
                .admission
                .get(target)
                .ok_or_else(|| BaddbError::internal("admission state missing for table"))?;
            admission.unprocessed.store(count, AtomicOrdering::SeqCst);
        }
        debug!(
            table = %target,
            ?table_delay,
            ?gsi_delay,
            ?unprocessed,
            "applied control-table update"
        );
        Ok(())
    }
}

/// Reads an optional non-negative `N` knob attribute from a control entry.
fn control_knob(entry: &Entry, attribute: &str) -> BaddbResult<Option<i64>> {
    match entry.get(attribute) {
        None => Ok(None),
        Some(AttributeValue::N(raw)) => {
            let value: i64 = raw.parse().map_err(|_| {
                BaddbError::validation(format!("'{raw}' is not a valid value for {attribute}"))
            })?;
            if value < 0 {
                return Err(BaddbError::validation(format!(
                    "{attribute} must not be negative"
                )));
            }
            Ok(Some(value))
        }
        Some(other) => Err(BaddbError::validation(format!(
            "{attribute} must be of type N, found {}",
            other.type_descriptor()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// The read target of a query or scan: the base table or one GSI.
struct ReadTarget<'a> {
    store: &'a RowStore,
    delay_seconds: i64,
    sort_attribute: Option<&'a str>,
    is_gsi: bool,
}

fn resolve_target<'a>(table: &'a Table, index: Option<&str>) -> BaddbResult<ReadTarget<'a>> {
    match index {
        Some(index_name) => {
            let gsi = table
                .meta
                .gsi(index_name)
                .ok_or_else(|| BaddbError::index_not_found(&table.meta.table_name, index_name))?;
            let store = table.gsi_rows.get(index_name).ok_or_else(|| {
                BaddbError::internal(format!("missing backing store for index {index_name}"))
            })?;
            Ok(ReadTarget {
                store,
                delay_seconds: table.meta.gsi_delay_seconds,
                sort_attribute: gsi.sort_key.as_ref().map(|k| k.attribute_name.as_str()),
                is_gsi: true,
            })
        }
        None => Ok(ReadTarget {
            store: &table.rows,
            delay_seconds: table.meta.table_delay_seconds,
            sort_attribute: table.meta.sort_key.as_ref().map(|k| k.attribute_name.as_str()),
            is_gsi: false,
        }),
    }
}

/// The entry a consistent read currently observes for a row, if any.
fn current_entry(rows: &RowStore, encoded_key: &[u8]) -> Option<Entry> {
    rows.get(encoded_key)
        .and_then(|row| row.tuple.newest())
        .filter(|wrapper| !wrapper.is_deleted)
        .map(|wrapper| wrapper.entry.clone())
}

/// Evaluates a conditional check against the current entry (or an empty one
/// when the item does not exist).
fn check_condition(
    condition: Option<&ConditionExpression>,
    current: Option<&Entry>,
) -> BaddbResult<()> {
    let Some(condition) = condition else {
        return Ok(());
    };
    let empty = Entry::new();
    let target = current.unwrap_or(&empty);
    let passed = condition
        .evaluate(target)
        .map_err(|e| BaddbError::evaluation(&e))?;
    if passed {
        Ok(())
    } else {
        Err(BaddbError::ConditionalCheckFailed)
    }
}

/// Appends a version to the base row and mirrors it into every GSI store
/// within the same transaction.
fn write_version(table: &mut Table, key: &PrimaryKey, wrapper: EntryWrapper) {
    let encoded = key.encoded();
    let previous = table
        .rows
        .get(&encoded)
        .and_then(|row| row.tuple.newest().cloned());

    let Table {
        meta,
        rows,
        gsi_rows,
        ..
    } = table;
    rows.push_version(key, wrapper.clone());
    for setting in &meta.global_secondary_indexes {
        let store = gsi_rows.entry(setting.index_name.clone()).or_default();
        gsi::mirror_mutation(meta, setting, store, &encoded, previous.as_ref(), &wrapper);
    }
}

/// Rejects entries over the service's 400 KB item-size limit.
fn check_entry_size(entry: &Entry) -> BaddbResult<()> {
    let size = entry_size(entry);
    if size > MAX_ENTRY_SIZE_BYTES {
        return Err(BaddbError::validation(format!(
            "item size {size} has exceeded the maximum allowed size of {MAX_ENTRY_SIZE_BYTES} bytes"
        )));
    }
    Ok(())
}

/// Approximate stored size of an entry, following the service's item-size
/// accounting.
fn entry_size(entry: &Entry) -> u64 {
    entry
        .iter()
        .map(|(name, value)| name.len() as u64 + value_size(value))
        .sum()
}

fn value_size(value: &AttributeValue) -> u64 {
    match value {
        AttributeValue::S(s) => s.len() as u64,
        AttributeValue::N(n) => (n.len().div_ceil(2) + 1) as u64,
        AttributeValue::B(b) => b.len() as u64,
        AttributeValue::Bool(_) | AttributeValue::Null => 1,
        AttributeValue::Ss(v) => v.iter().map(|s| s.len() as u64).sum(),
        AttributeValue::Ns(v) => v.iter().map(|n| (n.len().div_ceil(2) + 1) as u64).sum(),
        AttributeValue::L(list) => {
            3 + list.iter().map(|elem| 1 + value_size(elem)).sum::<u64>()
        }
        AttributeValue::M(map) => {
            3 + map
                .iter()
                .map(|(k, v)| k.len() as u64 + 1 + value_size(v))
                .sum::<u64>()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap as StdHashMap;

    use baddb_model::types::{BillingMode, KeySchema, ScalarAttributeType};

    use super::*;
    use crate::clock::ManualClock;

    fn schema(name: &str, attr_type: ScalarAttributeType) -> KeySchema {
        KeySchema {
            attribute_name: name.to_owned(),
            attribute_type: attr_type,
        }
    }

    fn simple_meta(name: &str) -> TableMetadata {
        TableMetadata {
            table_name: name.to_owned(),
            partition_key: schema("pk", ScalarAttributeType::S),
            sort_key: None,
            key_schema_elements: Vec::new(),
            attribute_definitions: Vec::new(),
            global_secondary_indexes: Vec::new(),
            billing_mode: BillingMode::PayPerRequest,
            provisioned_throughput: None,
            table_delay_seconds: 0,
            gsi_delay_seconds: 0,
        }
    }

    fn engine() -> (StorageEngine, ManualClock) {
        let clock = ManualClock::default();
        let engine = StorageEngine::with_clock(BaddbConfig::default(), Arc::new(clock.clone()));
        (engine, clock)
    }

    fn entry(pk: &str, extra: &[(&str, AttributeValue)]) -> Entry {
        let mut e = Entry::new();
        e.insert("pk", AttributeValue::S(pk.to_owned()));
        for (k, v) in extra {
            e.insert((*k).to_owned(), v.clone());
        }
        e
    }

    fn put_request(table: &str, e: Entry) -> PutRequest {
        PutRequest {
            table_name: table.to_owned(),
            entry: e,
            condition: None,
        }
    }

    fn get_request(table: &str, pk: &str, consistent: bool) -> GetRequest {
        GetRequest {
            table_name: table.to_owned(),
            key: PrimaryKey::new(pk.as_bytes().to_vec(), None),
            key_entry: entry(pk, &[]),
            consistent_read: consistent,
            projection: None,
        }
    }

    #[test]
    fn test_should_create_and_describe_table() {
        let (engine, _) = engine();
        engine.create_table(simple_meta("t")).unwrap();
        let description = engine.describe_table("t").unwrap();
        assert_eq!(description.table_name, "t");
        assert_eq!(description.item_count, 0);

        // Duplicate creation is rejected.
        assert!(matches!(
            engine.create_table(simple_meta("t")),
            Err(BaddbError::ResourceInUse { .. })
        ));
    }

    #[test]
    fn test_should_reject_reserved_table_name() {
        let (engine, _) = engine();
        assert!(matches!(
            engine.create_table(simple_meta(CONTROL_TABLE_NAME)),
            Err(BaddbError::Validation { .. })
        ));
    }

    #[test]
    fn test_should_list_tables_including_control_table() {
        let (engine, _) = engine();
        engine.create_table(simple_meta("alpha")).unwrap();
        engine.create_table(simple_meta("zeta")).unwrap();
        let names = engine.list_tables();
        assert_eq!(
            names,
            vec![
                "alpha".to_owned(),
                CONTROL_TABLE_NAME.to_owned(),
                "zeta".to_owned()
            ]
        );
    }

    #[test]
    fn test_should_put_and_get_consistently() {
        let (engine, _) = engine();
        engine.create_table(simple_meta("t")).unwrap();

        engine.put(put_request("t", entry("a", &[]))).unwrap();
        let got = engine.get(get_request("t", "a", true)).unwrap();
        assert!(got.is_some());
        assert!(engine.get(get_request("t", "missing", true)).unwrap().is_none());
    }

    #[test]
    fn test_should_return_replaced_entry_from_put() {
        let (engine, clock) = engine();
        engine.create_table(simple_meta("t")).unwrap();

        engine
            .put(put_request(
                "t",
                entry("a", &[("v", AttributeValue::N("1".to_owned()))]),
            ))
            .unwrap();
        clock.advance(Duration::seconds(1));
        let old = engine
            .put(put_request(
                "t",
                entry("a", &[("v", AttributeValue::N("2".to_owned()))]),
            ))
            .unwrap();
        assert_eq!(
            old.unwrap().get("v"),
            Some(&AttributeValue::N("1".to_owned()))
        );
    }

    #[test]
    fn test_should_bound_version_history() {
        let (engine, clock) = engine();
        engine.create_table(simple_meta("t")).unwrap();

        for i in 0..5 {
            engine
                .put(put_request(
                    "t",
                    entry("a", &[("v", AttributeValue::N(i.to_string()))]),
                ))
                .unwrap();
            clock.advance(Duration::seconds(1));
        }

        let inner = engine.inner.lock();
        let row = inner.tables["t"].rows.get(b"a").unwrap();
        assert_eq!(row.tuple.len(), 2);
    }

    #[test]
    fn test_should_gate_stale_reads_on_table_delay() {
        let (engine, clock) = engine();
        let mut meta = simple_meta("t");
        meta.table_delay_seconds = 5;
        engine.create_table(meta).unwrap();

        engine.put(put_request("t", entry("a", &[]))).unwrap();

        // Consistent read sees it immediately; stale read does not.
        assert!(engine.get(get_request("t", "a", true)).unwrap().is_some());
        assert!(engine.get(get_request("t", "a", false)).unwrap().is_none());

        clock.advance(Duration::seconds(6));
        assert!(engine.get(get_request("t", "a", false)).unwrap().is_some());
    }

    #[test]
    fn test_should_observe_tombstones_per_consistency_mode() {
        let (engine, clock) = engine();
        let mut meta = simple_meta("t");
        meta.table_delay_seconds = 5;
        engine.create_table(meta).unwrap();

        engine.put(put_request("t", entry("a", &[]))).unwrap();
        clock.advance(Duration::seconds(6));

        let delete = DeleteRequest {
            table_name: "t".to_owned(),
            key: PrimaryKey::new(b"a".to_vec(), None),
            key_entry: entry("a", &[]),
            condition: None,
        };
        engine.delete(delete).unwrap();

        // Consistent read observes the tombstone; a stale read still sees
        // the original item until the window elapses.
        assert!(engine.get(get_request("t", "a", true)).unwrap().is_none());
        assert!(engine.get(get_request("t", "a", false)).unwrap().is_some());
        clock.advance(Duration::seconds(6));
        assert!(engine.get(get_request("t", "a", false)).unwrap().is_none());
    }

    #[test]
    fn test_should_enforce_conditional_put() {
        let (engine, _) = engine();
        engine.create_table(simple_meta("t")).unwrap();
        engine.put(put_request("t", entry("a", &[]))).unwrap();

        let condition = ConditionExpression::new(
            "attribute_not_exists(pk)",
            &StdHashMap::new(),
            &StdHashMap::new(),
        )
        .unwrap();
        let request = PutRequest {
            table_name: "t".to_owned(),
            entry: entry("a", &[]),
            condition: Some(condition),
        };
        assert!(matches!(
            engine.put(request),
            Err(BaddbError::ConditionalCheckFailed)
        ));
    }

    #[test]
    fn test_should_consume_chaos_counter_before_rate_limiter() {
        let (engine, _) = engine();
        engine.create_table(simple_meta("t")).unwrap();

        let mut knob = Entry::new();
        knob.insert("tableName", AttributeValue::S("t".to_owned()));
        knob.insert("unprocessedRequests", AttributeValue::N("2".to_owned()));
        engine.put(put_request(CONTROL_TABLE_NAME, knob)).unwrap();

        assert!(matches!(
            engine.get(get_request("t", "a", true)),
            Err(BaddbError::Unprocessed)
        ));
        assert!(matches!(
            engine.get(get_request("t", "a", true)),
            Err(BaddbError::Unprocessed)
        ));
        // Third call goes through.
        assert!(engine.get(get_request("t", "a", true)).unwrap().is_none());
    }

    #[test]
    fn test_should_reject_writes_beyond_provisioned_capacity() {
        let (engine, clock) = engine();
        let mut meta = simple_meta("t");
        meta.billing_mode = BillingMode::Provisioned;
        meta.provisioned_throughput = Some(baddb_model::types::ProvisionedThroughput {
            read_capacity_units: 1,
            write_capacity_units: 1,
        });
        engine.create_table(meta).unwrap();

        assert!(engine.put(put_request("t", entry("a", &[]))).is_ok());
        assert!(matches!(
            engine.put(put_request("t", entry("b", &[]))),
            Err(BaddbError::ProvisionedThroughputExceeded { .. })
        ));

        // Capacity refills with time.
        clock.advance(Duration::seconds(1));
        assert!(engine.put(put_request("t", entry("b", &[]))).is_ok());
    }

    #[test]
    fn test_should_validate_control_table_writes() {
        let (engine, _) = engine();
        engine.create_table(simple_meta("t")).unwrap();

        // Unknown target table.
        let mut knob = Entry::new();
        knob.insert("tableName", AttributeValue::S("missing".to_owned()));
        assert!(matches!(
            engine.put(put_request(CONTROL_TABLE_NAME, knob)),
            Err(BaddbError::ResourceNotFound { .. })
        ));

        // Non-numeric knob value.
        let mut knob = Entry::new();
        knob.insert("tableName", AttributeValue::S("t".to_owned()));
        knob.insert("tableDelaySeconds", AttributeValue::S("5".to_owned()));
        assert!(matches!(
            engine.put(put_request(CONTROL_TABLE_NAME, knob)),
            Err(BaddbError::Validation { .. })
        ));
    }

    #[test]
    fn test_should_compute_entry_size() {
        let mut e = Entry::new();
        e.insert("pk", AttributeValue::S("hello".to_owned()));
        e.insert("age", AttributeValue::N("25".to_owned()));
        // "pk" (2) + "hello" (5) + "age" (3) + N("25") -> (2+1)/2+1 = 2.
        assert_eq!(entry_size(&e), 12);
    }
}
