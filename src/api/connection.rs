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

//! Connection API
//!
//! # Examples
//!
//! ```ignore
//! use stoolap_client::{connect, Config};
//!
//! let conn = connect(":memory:", Config::default())?;
//! conn.execute("CREATE TABLE users (id INTEGER, name TEXT)", ())?;
//! conn.execute("INSERT INTO users VALUES ($1, $2)", (1, "Alice"))?;
//!
//! let mut rows = conn.execute("SELECT name FROM users", ())?;
//! assert_eq!(rows.fetch_all().len(), 1);
//!
//! // Cancel from another thread
//! let handle = conn.clone();
//! std::thread::spawn(move || handle.interrupt());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHashSet;

use super::cursor::Cursor;
use super::identity::{Location, StorageIdentity};
use super::interrupt::{InterruptStats, InterruptToken};
use super::params::Params;
use super::registry::{EngineLease, InstanceRegistry};
use super::rows::{FromValue, Rows};
use super::transaction::{Transaction, TransactionSlot, TransactionState};
use crate::core::{DataType, Error, Result, Value};
use crate::executor::ExecutionContext;
use crate::functions::{FunctionRegistry, ScalarFunction, TableFunction};
use crate::storage::{Config, Engine, MemoryResult, StatementKind};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Shared session state behind every clone of a [`Connection`]
pub(crate) struct ConnectionInner {
    id: u64,
    lease: EngineLease,
    identity: StorageIdentity,
    functions: Arc<FunctionRegistry>,
    token: InterruptToken,
    transaction: Mutex<TransactionSlot>,
    closed: AtomicBool,
    cursors: Mutex<FxHashSet<u64>>,
}

impl ConnectionInner {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn token(&self) -> &InterruptToken {
        &self.token
    }

    fn engine(&self) -> &dyn Engine {
        self.lease.engine().as_ref()
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        Ok(())
    }

    pub(crate) fn attach_cursor(&self, cursor_id: u64) -> Result<()> {
        self.check_open()?;
        self.cursors.lock().insert(cursor_id);
        Ok(())
    }

    pub(crate) fn detach_cursor(&self, cursor_id: u64) {
        self.cursors.lock().remove(&cursor_id);
    }

    /// Lock the transaction slot of an open connection
    ///
    /// `close` marks the connection closed before it takes this lock, so a
    /// transaction begun under the lock is always seen by its rollback.
    fn open_transaction_slot(&self) -> Result<MutexGuard<'_, TransactionSlot>> {
        let slot = self.transaction.lock();
        self.check_open()?;
        Ok(slot)
    }

    fn begin(&self) -> Result<()> {
        let id = self.open_transaction_slot()?.begin(self.engine())?;
        tracing::debug!(connection = self.id, transaction = id, "transaction started");
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.open_transaction_slot()?.commit(self.engine())
    }

    fn rollback(&self) -> Result<()> {
        self.open_transaction_slot()?.rollback(self.engine())
    }

    /// Run one statement on behalf of the connection or one of its cursors.
    ///
    /// `label` names the issuer in wrapped engine errors. The caller holds a
    /// strong reference for the duration of the call.
    pub(crate) fn run_statement(
        self: &Arc<Self>,
        sql: &str,
        params: Vec<Value>,
        label: &str,
    ) -> Result<Rows> {
        self.check_open()?;
        let kind = self
            .engine()
            .classify(sql)
            .map_err(|e| e.with_context(label))?;
        if kind.is_transaction_control() {
            match kind {
                StatementKind::Begin => self.begin()?,
                StatementKind::Commit => self.commit()?,
                _ => self.rollback()?,
            }
            return Ok(Rows::new(Box::new(MemoryResult::for_modification(0))));
        }

        let guard = self.token.begin_query()?;
        let mut builder = ExecutionContext::builder()
            .params(params)
            .functions(Arc::clone(&self.functions))
            .cancellation(guard.probe());
        if let Some(txn) = self.transaction.lock().active_id() {
            builder = builder.transaction_id(txn);
        }
        let ctx = builder.build();

        tracing::trace!(connection = self.id, issuer = label, generation = guard.generation(), sql, "executing");
        let result = self.engine().run(&ctx, sql);
        guard.finish(&result);
        result.map(Rows::new).map_err(|e| e.with_context(label))
    }

    /// Tear the session down; later calls are no-ops
    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.token.close();
        self.token.wait_idle();

        let rolled_back = self.transaction.lock().abandon(self.engine());
        if let Ok(true) = rolled_back {
            tracing::debug!(connection = self.id, "rolled back active transaction on close");
        }
        let cursors = {
            let mut cursors = self.cursors.lock();
            let n = cursors.len();
            cursors.clear();
            n
        };
        self.functions.clear();
        let released = self.lease.release();
        tracing::debug!(connection = self.id, location = %self.identity, cursors, "connection closed");
        rolled_back.and(released)
    }
}

impl Drop for ConnectionInner {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(connection = self.id, error = %e, "error closing dropped connection");
        }
    }
}

/// A session on a cached engine instance
///
/// `Connection` is a cheap handle: clones share one session, including its
/// transaction, cursors, function registry and interrupt token. The session
/// ends on [`close`](Connection::close) or when the last clone is dropped
/// and no statement is executing.
///
/// # Thread Safety
///
/// All methods take `&self`; clones can be moved to other threads, e.g. to
/// call [`interrupt`](Connection::interrupt) while a statement runs.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    pub(crate) fn open(
        registry: &Arc<InstanceRegistry>,
        location: Location,
        config: Config,
    ) -> Result<Self> {
        let lease = registry.acquire(location, &config)?;
        Ok(Self::from_lease(lease))
    }

    fn from_lease(lease: EngineLease) -> Self {
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        let identity = StorageIdentity::new(lease.location().clone(), lease.config().fingerprint());
        let token = InterruptToken::new();
        token.set_hook(lease.engine().interrupt_hook());
        tracing::debug!(connection = id, location = %identity, "connection opened");
        Self {
            inner: Arc::new(ConnectionInner {
                id,
                lease,
                identity,
                functions: Arc::new(FunctionRegistry::new()),
                token,
                transaction: Mutex::new(TransactionSlot::default()),
                closed: AtomicBool::new(false),
                cursors: Mutex::new(FxHashSet::default()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<ConnectionInner>) -> Self {
        Self { inner }
    }

    /// Process-unique connection number
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    fn label(&self) -> String {
        format!("Connection #{}", self.inner.id)
    }

    /// Execute a statement and return its result
    ///
    /// # Examples
    ///
    /// ```ignore
    /// conn.execute("INSERT INTO users VALUES (?, ?)", (1, "Alice"))?;
    /// let rows = conn.execute("SELECT * FROM users", ())?.fetch_all();
    /// ```
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<Rows> {
        self.inner
            .run_statement(sql, params.into_params(), &self.label())
    }

    /// Execute a statement once per parameter set
    ///
    /// Returns the result of the last execution. An empty list is rejected.
    pub fn executemany<P, I>(&self, sql: &str, param_sets: I) -> Result<Rows>
    where
        P: Params,
        I: IntoIterator<Item = P>,
    {
        self.inner.check_open()?;
        let label = self.label();
        let mut last = None;
        for params in param_sets {
            last = Some(self.inner.run_statement(sql, params.into_params(), &label)?);
        }
        last.ok_or_else(|| {
            Error::invalid_input(
                "executemany requires a non-empty list of parameter sets to be provided",
            )
        })
    }

    /// Execute a query and return the first column of the first row
    pub fn query_one<T: FromValue, P: Params>(&self, sql: &str, params: P) -> Result<T> {
        let row = self
            .execute(sql, params)?
            .next()
            .ok_or_else(|| Error::invalid_input("Query returned no rows"))??;
        row.get(0)
    }

    /// Open a cursor on this connection
    pub fn cursor(&self) -> Result<Cursor> {
        Cursor::new(&self.inner)
    }

    /// Number of open cursors
    pub fn cursor_count(&self) -> usize {
        self.inner.cursors.lock().len()
    }

    pub fn begin(&self) -> Result<()> {
        self.inner.begin()
    }

    pub fn commit(&self) -> Result<()> {
        self.inner.commit()
    }

    pub fn rollback(&self) -> Result<()> {
        self.inner.rollback()
    }

    /// Begin a transaction that rolls back unless committed
    pub fn transaction(&self) -> Result<Transaction> {
        self.begin()?;
        Ok(Transaction::new(self.clone()))
    }

    pub fn transaction_state(&self) -> TransactionState {
        self.inner.transaction.lock().state()
    }

    /// Interrupt every statement currently running on this connection
    ///
    /// A no-op when idle. Fails with `ConnectionClosed` after `close()`.
    pub fn interrupt(&self) -> Result<()> {
        self.inner.check_open()?;
        self.inner.token.interrupt()
    }

    pub fn interrupt_stats(&self) -> InterruptStats {
        self.inner.token.stats()
    }

    /// Open an independent session on the same engine
    ///
    /// The new connection has its own transaction state, cursors, function
    /// registry and interrupt token.
    pub fn duplicate(&self) -> Result<Connection> {
        self.inner.check_open()?;
        let lease = self.inner.lease.duplicate()?;
        Ok(Self::from_lease(lease))
    }

    /// Register a scalar function
    pub fn register_scalar_function(&self, function: ScalarFunction) -> Result<()> {
        self.inner.check_open()?;
        self.inner.functions.register_scalar(function)
    }

    /// Register a scalar function from its parts
    ///
    /// ```ignore
    /// conn.create_function("plus_one", vec![DataType::Integer], DataType::Integer, |args| {
    ///     Ok(Value::Integer(args[0].as_int64().unwrap_or(0) + 1))
    /// })?;
    /// ```
    pub fn create_function<F>(
        &self,
        name: &str,
        arg_types: Vec<DataType>,
        return_type: DataType,
        callable: F,
    ) -> Result<()>
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.register_scalar_function(ScalarFunction::new(name, arg_types, return_type, callable))
    }

    /// Register a table function
    pub fn register_table_function(&self, function: TableFunction) -> Result<()> {
        self.inner.check_open()?;
        self.inner.functions.register_table(function)
    }

    /// Unregister a table function
    pub fn unregister_table_function(&self, name: &str) -> Result<()> {
        self.inner.check_open()?;
        self.inner.functions.unregister_table(name)
    }

    /// Remove a scalar function
    pub fn remove_function(&self, name: &str) -> Result<()> {
        self.inner.check_open()?;
        self.inner.functions.remove_scalar(name)
    }

    /// Remove a function of either kind
    pub fn unregister_function(&self, name: &str) -> Result<()> {
        self.inner.check_open()?;
        self.inner.functions.unregister(name)
    }

    /// Names of the registered functions, sorted
    pub fn function_names(&self) -> Vec<String> {
        self.inner.functions.names()
    }

    /// Read back an instance setting, as `current_setting(name)` would
    pub fn setting(&self, name: &str) -> Result<Option<Value>> {
        self.inner.check_open()?;
        Ok(self.inner.engine().setting(name))
    }

    /// Configuration of the shared engine instance
    pub fn config(&self) -> &Config {
        self.inner.lease.config()
    }

    pub fn identity(&self) -> &StorageIdentity {
        &self.inner.identity
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Close the session
    ///
    /// Running statements on this connection are interrupted and awaited,
    /// an active transaction is rolled back, cursors are invalidated and
    /// the engine lease is released. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        self.inner.close()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.inner.id)
            .field("location", self.inner.identity.location())
            .field("closed", &self.is_closed())
            .finish()
    }
}
