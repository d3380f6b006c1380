//! The emulator facade: wire inputs in, typed results out.
//!
//! Each handler fetches the target table's metadata, runs the request
//! builder, and executes the internal request against the engine. This is
//! the surface an HTTP front end drives.

use std::sync::Arc;

use baddb_model::Entry;
use baddb_model::input::{
    BatchGetItemInput, BatchWriteItemInput, CreateTableInput, DeleteItemInput, DeleteTableInput,
    DescribeTableInput, GetItemInput, ListTablesInput, PutItemInput, QueryInput, ScanInput,
    TransactWriteItemsInput, UpdateItemInput, UpdateTableInput,
};
use baddb_model::types::{ReturnValue, TableDescription};

use crate::builder;
use crate::clock::Clock;
use crate::config::BaddbConfig;
use crate::engine::StorageEngine;
use crate::error::BaddbResult;
use crate::request::{BatchGetResult, BatchWriteResult, PutRequest, QueryResult, UpdateResult};
use crate::table::CONTROL_TABLE_NAME;

/// The emulator entry point, wrapping the storage engine with the request
/// builders.
#[derive(Debug, Clone)]
pub struct Baddb {
    engine: Arc<StorageEngine>,
}

impl Baddb {
    /// Creates an emulator on the system clock.
    #[must_use]
    pub fn new(config: BaddbConfig) -> Self {
        Self {
            engine: Arc::new(StorageEngine::new(config)),
        }
    }

    /// Creates an emulator on an injected clock.
    #[must_use]
    pub fn with_clock(config: BaddbConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            engine: Arc::new(StorageEngine::with_clock(config, clock)),
        }
    }

    /// The underlying storage engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<StorageEngine> {
        &self.engine
    }

    /// Handles `CreateTable`.
    pub fn create_table(&self, input: CreateTableInput) -> BaddbResult<TableDescription> {
        let meta = builder::build_table_metadata(input, self.engine.config())?;
        self.engine.create_table(meta)
    }

    /// Handles `DeleteTable`.
    pub fn delete_table(&self, input: DeleteTableInput) -> BaddbResult<TableDescription> {
        self.engine.delete_table(&input.table_name)
    }

    /// Handles `DescribeTable`.
    pub fn describe_table(&self, input: DescribeTableInput) -> BaddbResult<TableDescription> {
        self.engine.describe_table(&input.table_name)
    }

    /// Handles `ListTables` with pagination.
    pub fn list_tables(&self, input: ListTablesInput) -> BaddbResult<Vec<String>> {
        #[allow(clippy::cast_sign_loss)]
        let limit = match input.limit {
            None => 100,
            Some(value) if (1..=100).contains(&value) => value as usize,
            Some(value) => {
                return Err(crate::error::BaddbError::validation(format!(
                    "Limit must be between 1 and 100, found {value}"
                )));
            }
        };
        let names = self.engine.list_tables();
        let skip = match &input.exclusive_start_table_name {
            Some(start) => names.iter().position(|n| n > start).unwrap_or(names.len()),
            None => 0,
        };
        Ok(names.into_iter().skip(skip).take(limit).collect())
    }

    /// Handles `UpdateTable`.
    pub fn update_table(&self, input: UpdateTableInput) -> BaddbResult<TableDescription> {
        let meta = self.engine.table_metadata(&input.table_name)?;
        let request = builder::build_update_table(&meta, input)?;
        self.engine.update_table(request)
    }

    /// Handles `PutItem`. Returns the replaced entry when `ALL_OLD` was
    /// requested.
    pub fn put_item(&self, input: PutItemInput) -> BaddbResult<Option<Entry>> {
        let return_values = input.return_values.unwrap_or_default();

        // Control-plane writes have no schema to validate against; they go
        // straight to the engine's dedicated handler.
        if input.table_name == CONTROL_TABLE_NAME {
            self.engine.put(PutRequest {
                table_name: input.table_name,
                entry: Entry::from(input.item),
                condition: None,
            })?;
            return Ok(None);
        }

        let meta = self.engine.table_metadata(&input.table_name)?;
        let request = builder::build_put(&meta, input)?;
        let old = self.engine.put(request)?;
        Ok(match return_values {
            ReturnValue::AllOld => old,
            _ => None,
        })
    }

    /// Handles `GetItem`.
    pub fn get_item(&self, input: GetItemInput) -> BaddbResult<Option<Entry>> {
        let meta = self.engine.table_metadata(&input.table_name)?;
        let request = builder::build_get(&meta, input)?;
        self.engine.get(request)
    }

    /// Handles `DeleteItem`. Returns the deleted entry when `ALL_OLD` was
    /// requested.
    pub fn delete_item(&self, input: DeleteItemInput) -> BaddbResult<Option<Entry>> {
        let return_values = input.return_values.unwrap_or_default();
        let meta = self.engine.table_metadata(&input.table_name)?;
        let request = builder::build_delete(&meta, input)?;
        let old = self.engine.delete(request)?;
        Ok(match return_values {
            ReturnValue::AllOld => old,
            _ => None,
        })
    }

    /// Handles `UpdateItem`, returning the entry before and after.
    pub fn update_item(&self, input: UpdateItemInput) -> BaddbResult<UpdateResult> {
        let meta = self.engine.table_metadata(&input.table_name)?;
        let request = builder::build_update(&meta, input)?;
        self.engine.update(request)
    }

    /// Handles `Query`.
    pub fn query(&self, input: QueryInput) -> BaddbResult<QueryResult> {
        let meta = self.engine.table_metadata(&input.table_name)?;
        let request = builder::build_query(&meta, input)?;
        self.engine.query(request)
    }

    /// Handles `Scan`.
    pub fn scan(&self, input: ScanInput) -> BaddbResult<QueryResult> {
        let meta = self.engine.table_metadata(&input.table_name)?;
        let request = builder::build_scan(&meta, input)?;
        self.engine.scan(request)
    }

    /// Handles `BatchGetItem`.
    pub fn batch_get_item(&self, input: BatchGetItemInput) -> BaddbResult<BatchGetResult> {
        let request =
            builder::build_batch_get(input, |name| self.engine.table_metadata(name))?;
        self.engine.batch_get(request)
    }

    /// Handles `BatchWriteItem`.
    pub fn batch_write_item(&self, input: BatchWriteItemInput) -> BaddbResult<BatchWriteResult> {
        let request =
            builder::build_batch_write(input, |name| self.engine.table_metadata(name))?;
        self.engine.batch_write(request)
    }

    /// Handles `TransactWriteItems`.
    pub fn transact_write_items(&self, input: TransactWriteItemsInput) -> BaddbResult<()> {
        let request =
            builder::build_transact_write(input, |name| self.engine.table_metadata(name))?;
        self.engine.transact_write(request)
    }
}
