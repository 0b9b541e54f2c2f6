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

//! Engine trait for the storage engine
//!

use std::sync::Arc;

use crate::api::identity::Location;
use crate::core::{Result, Value};
use crate::executor::ExecutionContext;
use crate::storage::config::Config;
use crate::storage::traits::QueryResult;

/// Identifier of an engine-side transaction
pub type TransactionId = u64;

/// Callback an engine installs to be woken when a query is interrupted
pub type InterruptHook = Arc<dyn Fn() + Send + Sync>;

/// Coarse statement classification used by the client layer to route
/// transaction control to the connection state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Returns rows (SELECT)
    Query,
    /// Modifies table data (INSERT)
    Mutation,
    /// Modifies the catalog (CREATE/DROP)
    Ddl,
    /// BEGIN [TRANSACTION]
    Begin,
    /// COMMIT
    Commit,
    /// ROLLBACK
    Rollback,
}

impl StatementKind {
    /// Returns true for BEGIN/COMMIT/ROLLBACK
    pub fn is_transaction_control(&self) -> bool {
        matches!(
            self,
            StatementKind::Begin | StatementKind::Commit | StatementKind::Rollback
        )
    }
}

/// Engine represents one open database instance
///
/// An engine is shared by every connection that resolved to the same storage
/// location, so all methods take `&self` and implementations use interior
/// mutability. The client layer never holds its own locks while calling
/// into the engine.
///
/// # Example
///
/// ```ignore
/// let engine = MemoryEngineFactory.create(&Location::Anonymous(1), &Config::default())?;
/// let txn = engine.begin_transaction()?;
/// let ctx = ExecutionContext::builder().transaction_id(txn).build();
/// engine.run(&ctx, "INSERT INTO t VALUES (1)")?;
/// engine.commit(txn)?;
/// engine.close()?;
/// ```
pub trait Engine: Send + Sync {
    /// Executes one statement to completion
    ///
    /// Long-running work must call `ctx.check_cancelled()` at bounded
    /// intervals and return its error unchanged. When `ctx` carries a
    /// transaction id the statement runs inside that transaction, otherwise
    /// it auto-commits.
    fn run(&self, ctx: &ExecutionContext, sql: &str) -> Result<Box<dyn QueryResult>>;

    /// Classifies a statement without executing it
    fn classify(&self, sql: &str) -> Result<StatementKind>;

    /// Begins a new transaction
    fn begin_transaction(&self) -> Result<TransactionId>;

    /// Commits a transaction begun with [`Engine::begin_transaction`]
    fn commit(&self, txn: TransactionId) -> Result<()>;

    /// Discards a transaction begun with [`Engine::begin_transaction`]
    fn rollback(&self, txn: TransactionId) -> Result<()>;

    /// Reads back an instance setting
    ///
    /// `threads` and `read_only` are always answered, along with every
    /// setting the engine was created with.
    fn setting(&self, name: &str) -> Option<Value>;

    /// Returns true if the engine rejects mutations
    fn is_read_only(&self) -> bool;

    /// Optional native interrupt hook invoked after the cancellation flag is set
    fn interrupt_hook(&self) -> Option<InterruptHook> {
        None
    }

    /// Closes the engine
    ///
    /// Called exactly once, after the last connection released it.
    fn close(&self) -> Result<()>;
}

/// Constructs engines for the instance registry
pub trait EngineFactory: Send + Sync {
    /// Opens a new engine for `location`
    fn create(&self, location: &Location, config: &Config) -> Result<Arc<dyn Engine>>;

    /// Settings accepted in [`Config::settings`] besides `custom.*`
    fn recognized_settings(&self) -> &[&'static str];
}
