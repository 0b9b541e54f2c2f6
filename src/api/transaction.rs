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

//! Transaction API
//!
//! A connection has at most one transaction at a time. It is driven either
//! through [`Connection::begin`]/[`commit`](Connection::commit)/
//! [`rollback`](Connection::rollback), through `BEGIN`/`COMMIT`/`ROLLBACK`
//! statements, or through the RAII [`Transaction`] guard, which rolls back
//! when dropped without a commit.
//!
//! # Examples
//!
//! ```ignore
//! let conn = connect(":memory:", Config::default())?;
//! conn.execute("CREATE TABLE accounts (id INTEGER, balance INTEGER)", ())?;
//!
//! let tx = conn.transaction()?;
//! tx.execute("INSERT INTO accounts VALUES ($1, $2)", (1, 1000))?;
//! tx.execute("INSERT INTO accounts VALUES ($1, $2)", (2, 500))?;
//! tx.commit()?;
//! ```

use crate::core::{Error, Result};
use crate::storage::{Engine, TransactionId};

use super::connection::Connection;
use super::params::Params;
use super::rows::Rows;

/// Transaction state of a connection
///
/// `Committed` and `RolledBack` report how the last transaction ended and
/// otherwise behave like `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransactionState {
    #[default]
    None,
    Active,
    Committed,
    RolledBack,
}

impl TransactionState {
    pub fn is_active(&self) -> bool {
        matches!(self, TransactionState::Active)
    }
}

/// Per-connection transaction state machine
#[derive(Debug, Default)]
pub(crate) struct TransactionSlot {
    state: TransactionState,
    id: Option<TransactionId>,
}

impl TransactionSlot {
    pub(crate) fn state(&self) -> TransactionState {
        self.state
    }

    /// Engine transaction statements should run in
    pub(crate) fn active_id(&self) -> Option<TransactionId> {
        self.id
    }

    pub(crate) fn begin(&mut self, engine: &dyn Engine) -> Result<TransactionId> {
        if self.state.is_active() {
            return Err(Error::transaction_state(
                "cannot start a transaction within a transaction",
            ));
        }
        let id = engine.begin_transaction()?;
        self.state = TransactionState::Active;
        self.id = Some(id);
        Ok(id)
    }

    pub(crate) fn commit(&mut self, engine: &dyn Engine) -> Result<()> {
        let id = self.id.take().ok_or_else(|| {
            Error::transaction_state("cannot commit - no transaction is active")
        })?;
        match engine.commit(id) {
            Ok(()) => {
                self.state = TransactionState::Committed;
                Ok(())
            }
            Err(e) => {
                self.state = TransactionState::RolledBack;
                Err(e)
            }
        }
    }

    pub(crate) fn rollback(&mut self, engine: &dyn Engine) -> Result<()> {
        let id = self.id.take().ok_or_else(|| {
            Error::transaction_state("cannot rollback - no transaction is active")
        })?;
        self.state = TransactionState::RolledBack;
        engine.rollback(id)
    }

    /// Roll back whatever is active; used when the connection closes
    pub(crate) fn abandon(&mut self, engine: &dyn Engine) -> Result<bool> {
        if self.id.is_none() {
            return Ok(false);
        }
        self.rollback(engine).map(|()| true)
    }
}

/// RAII transaction on a connection
///
/// Statements run through the guard or through the connection itself both
/// take part in the transaction. Dropping the guard while the transaction
/// is still active rolls it back.
pub struct Transaction {
    conn: Connection,
    finished: bool,
}

impl Transaction {
    pub(crate) fn new(conn: Connection) -> Self {
        Self {
            conn,
            finished: false,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Execute a statement inside the transaction
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<Rows> {
        if self.finished {
            return Err(Error::transaction_state("transaction already finished"));
        }
        self.conn.execute(sql, params)
    }

    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        self.conn.commit()
    }

    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.conn.rollback()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.finished || self.conn.is_closed() || !self.conn.transaction_state().is_active() {
            return;
        }
        if let Err(e) = self.conn.rollback() {
            tracing::warn!(connection = self.conn.id(), error = %e, "rollback on drop failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::identity::Location;
    use crate::storage::{Config, MemoryEngine};

    fn engine() -> MemoryEngine {
        MemoryEngine::open(Location::Anonymous(1), Config::default()).unwrap()
    }

    #[test]
    fn test_state_machine() {
        let engine = engine();
        let mut slot = TransactionSlot::default();
        assert_eq!(slot.state(), TransactionState::None);
        assert!(slot.commit(&engine).is_err());
        assert!(slot.rollback(&engine).is_err());

        let id = slot.begin(&engine).unwrap();
        assert_eq!(slot.active_id(), Some(id));
        assert_eq!(
            slot.begin(&engine).unwrap_err(),
            Error::transaction_state("cannot start a transaction within a transaction")
        );
        slot.commit(&engine).unwrap();
        assert_eq!(slot.state(), TransactionState::Committed);
        assert_eq!(slot.active_id(), None);

        slot.begin(&engine).unwrap();
        slot.rollback(&engine).unwrap();
        assert_eq!(slot.state(), TransactionState::RolledBack);
        assert_eq!(
            slot.rollback(&engine).unwrap_err(),
            Error::transaction_state("cannot rollback - no transaction is active")
        );
    }

    #[test]
    fn test_abandon() {
        let engine = engine();
        let mut slot = TransactionSlot::default();
        assert!(!slot.abandon(&engine).unwrap());
        slot.begin(&engine).unwrap();
        assert!(slot.abandon(&engine).unwrap());
        assert_eq!(slot.state(), TransactionState::RolledBack);
    }

    #[test]
    fn test_failed_commit_ends_transaction() {
        let engine = engine();
        let mut slot = TransactionSlot::default();
        let id = slot.begin(&engine).unwrap();
        engine.rollback(id).unwrap();
        assert!(slot.commit(&engine).is_err());
        assert_eq!(slot.state(), TransactionState::RolledBack);
        assert!(slot.begin(&engine).is_ok());
    }
}
