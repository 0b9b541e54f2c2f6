// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! In-memory reference engine
//!
//! The catalog lives behind a short-lived `RwLock`; statements take a
//! snapshot of the tables they read and apply writes in one brief critical
//! section after all values have been evaluated, so no lock is held across
//! scans or user-defined function calls.
//!
//! Transactions work on a private copy of the catalog. Commit publishes the
//! tables the transaction touched; when two transactions touch the same
//! table, the last committer wins.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};

use super::catalog::{Catalog, Table};
use super::persist;
use crate::api::identity::Location;
use crate::core::{Error, Result, Value};
use crate::executor::{
    evaluate_insert_rows, execute_select, function_source, ExecutionContext, RowStream,
};
use crate::parser::{parse_sql, Statement, TableSource};
use crate::storage::config::{Config, READ_ONLY, THREADS};
use crate::storage::traits::{
    Engine, EngineFactory, MemoryResult, QueryResult, StatementKind, TransactionId,
};

/// Engine settings understood by [`MemoryEngine`], with their defaults
pub const MEMORY_ENGINE_SETTINGS: &[(&str, &str)] = &[
    ("memory_limit", "unlimited"),
    ("default_order", "asc"),
    ("max_rows", "unlimited"),
    ("checkpoint_threshold", "16MB"),
];

const RECOGNIZED: &[&str] = &[
    "memory_limit",
    "default_order",
    "max_rows",
    "checkpoint_threshold",
];

/// Private state of an open transaction
#[derive(Debug, Default)]
struct Workspace {
    catalog: Catalog,
    touched: FxHashSet<String>,
    /// Set under the workspace lock once commit or rollback has claimed it
    finished: bool,
}

impl Workspace {
    fn check_active(&self, txn: TransactionId) -> Result<()> {
        if self.finished {
            return Err(inactive(txn));
        }
        Ok(())
    }
}

fn inactive(txn: TransactionId) -> Error {
    Error::transaction_state(format!("transaction {} is not active", txn))
}

/// In-memory engine with optional JSON snapshot persistence
pub struct MemoryEngine {
    location: Location,
    path: Option<PathBuf>,
    config: Config,
    threads: usize,
    max_rows: Option<usize>,
    catalog: RwLock<Catalog>,
    transactions: Mutex<FxHashMap<TransactionId, Arc<Mutex<Workspace>>>>,
    next_txn_id: AtomicU64,
    closed: AtomicBool,
}

impl MemoryEngine {
    /// Open an engine for `location`
    ///
    /// File locations load their snapshot; a missing file is created unless
    /// the engine is read-only.
    pub fn open(location: Location, config: Config) -> Result<Self> {
        config.validate_settings(RECOGNIZED)?;
        let max_rows = match config.setting("max_rows") {
            None => None,
            Some(v) if v.eq_ignore_ascii_case("unlimited") => None,
            Some(v) => Some(v.trim().parse::<usize>().map_err(|_| {
                Error::configuration(format!(
                    "Failed to cast value '{}' for option 'max_rows' to an unsigned integer",
                    v
                ))
            })?),
        };

        let path = location.path().map(|p| p.to_path_buf());
        let catalog = match &path {
            None => Catalog::new(),
            Some(path) => match persist::load(path)? {
                Some(catalog) => catalog,
                None if config.read_only => {
                    return Err(Error::io(format!(
                        "Cannot open database \"{}\" in read-only mode: database does not exist",
                        path.display()
                    )))
                }
                None => {
                    let catalog = Catalog::new();
                    persist::save(path, &catalog)?;
                    catalog
                }
            },
        };

        let threads = config.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });

        tracing::debug!(%location, tables = catalog.len(), "memory engine opened");
        Ok(Self {
            location,
            path,
            config,
            threads,
            max_rows,
            catalog: RwLock::new(catalog),
            transactions: Mutex::new(FxHashMap::default()),
            next_txn_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        })
    }

    /// Location this engine was opened for
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Number of tables visible outside any transaction
    pub fn table_count(&self) -> usize {
        self.catalog.read().len()
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::internal(format!(
                "engine for {} is closed",
                self.location
            )));
        }
        Ok(())
    }

    fn workspace(&self, txn: TransactionId) -> Result<Arc<Mutex<Workspace>>> {
        self.transactions
            .lock()
            .get(&txn)
            .cloned()
            .ok_or_else(|| inactive(txn))
    }

    fn check_writable(&self, what: &str) -> Result<()> {
        if self.config.read_only {
            return Err(Error::invalid_input(format!(
                "Cannot execute statement of type \"{}\" on database \"{}\" which is attached in read-only mode!",
                what, self.location
            )));
        }
        Ok(())
    }

    /// Snapshot one table, from the transaction workspace if there is one
    fn table_snapshot(&self, ctx: &ExecutionContext, name: &str) -> Result<Arc<Table>> {
        let table = match ctx.transaction_id() {
            Some(txn) => {
                let workspace = self.workspace(txn)?;
                let workspace = workspace.lock();
                workspace.check_active(txn)?;
                workspace.catalog.get(name)
            }
            None => self.catalog.read().get(name),
        };
        table.ok_or_else(|| Error::catalog(format!("Table with name {} does not exist!", name)))
    }

    /// Apply a catalog mutation, to the workspace if there is one
    fn mutate<T>(
        &self,
        ctx: &ExecutionContext,
        table: &str,
        f: impl FnOnce(&mut Catalog) -> Result<T>,
    ) -> Result<T> {
        match ctx.transaction_id() {
            Some(txn) => {
                let workspace = self.workspace(txn)?;
                let mut workspace = workspace.lock();
                workspace.check_active(txn)?;
                let out = f(&mut workspace.catalog)?;
                workspace.touched.insert(table.to_lowercase());
                Ok(out)
            }
            None => f(&mut self.catalog.write()),
        }
    }

    fn execute(&self, ctx: &ExecutionContext, statement: Statement) -> Result<MemoryResult> {
        let settings = |name: &str| self.setting(name);
        match statement {
            Statement::CreateTable(create) => {
                self.check_writable("CREATE")?;
                self.mutate(ctx, &create.name, |catalog| catalog.create(&create))?;
                Ok(MemoryResult::for_modification(0))
            }
            Statement::DropTable(drop) => {
                self.check_writable("DROP")?;
                self.mutate(ctx, &drop.name, |catalog| {
                    catalog.drop_table(&drop.name, drop.if_exists)
                })?;
                Ok(MemoryResult::for_modification(0))
            }
            Statement::Insert(insert) => {
                self.check_writable("INSERT")?;
                let table = self.table_snapshot(ctx, &insert.table)?;
                let rows = evaluate_insert_rows(
                    ctx,
                    &settings,
                    &insert.table,
                    &table.column_types(),
                    &insert.rows,
                )?;
                ctx.check_cancelled()?;
                let count = self.mutate(ctx, &insert.table, |catalog| {
                    catalog.append(&insert.table, rows, self.max_rows)
                })?;
                Ok(MemoryResult::for_modification(count as i64))
            }
            Statement::Select(select) => {
                let source = match &select.from {
                    None => RowStream::single(),
                    Some(TableSource::Table(name)) => {
                        let table = self.table_snapshot(ctx, name)?;
                        RowStream::from_rows(table.column_names(), Arc::clone(&table.rows))
                    }
                    Some(TableSource::Function { name, args }) => {
                        function_source(ctx, &settings, name, args)?
                    }
                };
                execute_select(ctx, &settings, &select, source)
            }
            Statement::Begin | Statement::Commit | Statement::Rollback => Err(
                Error::invalid_input("transaction control statements must be issued through a connection"),
            ),
        }
    }
}

impl Engine for MemoryEngine {
    fn run(&self, ctx: &ExecutionContext, sql: &str) -> Result<Box<dyn QueryResult>> {
        self.check_open()?;
        let statement = parse_sql(sql)?;
        let needed = statement.parameter_count();
        if needed != ctx.param_count() {
            return Err(Error::invalid_input(format!(
                "Prepared statement needs {} parameters, {} given",
                needed,
                ctx.param_count()
            )));
        }
        ctx.check_cancelled()?;
        tracing::trace!(location = %self.location, sql, "executing statement");
        let result = self.execute(ctx, statement)?;
        Ok(Box::new(result))
    }

    fn classify(&self, sql: &str) -> Result<StatementKind> {
        Ok(match parse_sql(sql)? {
            Statement::Select(_) => StatementKind::Query,
            Statement::Insert(_) => StatementKind::Mutation,
            Statement::CreateTable(_) | Statement::DropTable(_) => StatementKind::Ddl,
            Statement::Begin => StatementKind::Begin,
            Statement::Commit => StatementKind::Commit,
            Statement::Rollback => StatementKind::Rollback,
        })
    }

    fn begin_transaction(&self) -> Result<TransactionId> {
        self.check_open()?;
        let id = self.next_txn_id.fetch_add(1, Ordering::Relaxed);
        let workspace = Workspace {
            catalog: self.catalog.read().clone(),
            ..Workspace::default()
        };
        self.transactions
            .lock()
            .insert(id, Arc::new(Mutex::new(workspace)));
        Ok(id)
    }

    fn commit(&self, txn: TransactionId) -> Result<()> {
        let workspace = self
            .transactions
            .lock()
            .remove(&txn)
            .ok_or_else(|| inactive(txn))?;
        let mut workspace = workspace.lock();
        workspace.finished = true;
        if !workspace.touched.is_empty() {
            self.catalog
                .write()
                .publish(&workspace.catalog, &workspace.touched);
        }
        Ok(())
    }

    fn rollback(&self, txn: TransactionId) -> Result<()> {
        let workspace = self
            .transactions
            .lock()
            .remove(&txn)
            .ok_or_else(|| inactive(txn))?;
        workspace.lock().finished = true;
        Ok(())
    }

    fn setting(&self, name: &str) -> Option<Value> {
        let name = name.to_lowercase();
        match name.as_str() {
            THREADS => return Some(Value::Integer(self.threads as i64)),
            READ_ONLY => return Some(Value::Boolean(self.config.read_only)),
            _ => {}
        }
        if let Some(value) = self.config.setting(&name) {
            return Some(Value::text(value));
        }
        MEMORY_ENGINE_SETTINGS
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, default)| Value::text(default))
    }

    fn is_read_only(&self) -> bool {
        self.config.read_only
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let abandoned = {
            let mut transactions = self.transactions.lock();
            let n = transactions.len();
            transactions.clear();
            n
        };
        if abandoned > 0 {
            tracing::debug!(location = %self.location, abandoned, "rolled back open transactions on close");
        }
        if let (Some(path), false) = (&self.path, self.config.read_only) {
            persist::save(path, &self.catalog.read())?;
        }
        tracing::debug!(location = %self.location, "memory engine closed");
        Ok(())
    }
}

/// Factory for [`MemoryEngine`]
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryEngineFactory;

impl EngineFactory for MemoryEngineFactory {
    fn create(&self, location: &Location, config: &Config) -> Result<Arc<dyn Engine>> {
        Ok(Arc::new(MemoryEngine::open(location.clone(), config.clone())?))
    }

    fn recognized_settings(&self) -> &[&'static str] {
        RECOGNIZED
    }
}
