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

//! Cursor API
//!
//! A cursor executes statements on its connection's session and keeps the
//! latest result open for fetching. It refers to the connection weakly, so
//! it never keeps a dropped connection alive.
//!
//! ```ignore
//! let mut cur = conn.cursor()?;
//! cur.execute("SELECT * FROM range(10)", ())?;
//! let first = cur.fetch_one()?;
//! let rest = cur.fetch_all()?;
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use super::connection::{Connection, ConnectionInner};
use super::params::Params;
use super::rows::Rows;
use crate::core::{Error, Result, Row};

static NEXT_CURSOR_ID: AtomicU64 = AtomicU64::new(1);

/// Statement executor bound to one connection
pub struct Cursor {
    id: u64,
    connection: Weak<ConnectionInner>,
    result: Option<Rows>,
    closed: bool,
}

impl Cursor {
    pub(crate) fn new(connection: &Arc<ConnectionInner>) -> Result<Self> {
        let id = NEXT_CURSOR_ID.fetch_add(1, Ordering::Relaxed);
        connection.attach_cursor(id)?;
        tracing::debug!(cursor = id, connection = connection.id(), "cursor opened");
        Ok(Self {
            id,
            connection: Arc::downgrade(connection),
            result: None,
            closed: false,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    fn label(&self) -> String {
        format!("Cursor #{}", self.id)
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::CursorClosed);
        }
        Ok(())
    }

    /// Strong reference to a live parent connection
    fn live_connection(&self) -> Result<Arc<ConnectionInner>> {
        self.check_open()?;
        let inner = self.connection.upgrade().ok_or(Error::ConnectionClosed)?;
        if inner.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        Ok(inner)
    }

    /// Execute a statement, replacing the previous result
    pub fn execute<P: Params>(&mut self, sql: &str, params: P) -> Result<&mut Self> {
        let inner = self.live_connection()?;
        self.result = None;
        let rows = inner.run_statement(sql, params.into_params(), &self.label())?;
        self.result = Some(rows);
        Ok(self)
    }

    /// Execute a statement once per parameter set, keeping the last result
    ///
    /// An empty list is rejected and leaves no open result.
    pub fn executemany<P, I>(&mut self, sql: &str, param_sets: I) -> Result<&mut Self>
    where
        P: Params,
        I: IntoIterator<Item = P>,
    {
        let inner = self.live_connection()?;
        self.result = None;
        let label = self.label();
        let mut last = None;
        for params in param_sets {
            last = Some(inner.run_statement(sql, params.into_params(), &label)?);
        }
        match last {
            Some(rows) => {
                self.result = Some(rows);
                Ok(self)
            }
            None => Err(Error::invalid_input(
                "executemany requires a non-empty list of parameter sets to be provided",
            )),
        }
    }

    fn open_result(&mut self) -> Result<&mut Rows> {
        self.check_open()?;
        self.result
            .as_mut()
            .ok_or_else(|| Error::invalid_input("No open result set"))
    }

    /// Take the next row of the open result
    pub fn fetch_one(&mut self) -> Result<Option<Row>> {
        Ok(self.open_result()?.fetch_one())
    }

    /// Take up to `n` rows of the open result
    pub fn fetch_many(&mut self, n: usize) -> Result<Vec<Row>> {
        Ok(self.open_result()?.fetch_many(n))
    }

    /// Take every remaining row of the open result
    pub fn fetch_all(&mut self) -> Result<Vec<Row>> {
        Ok(self.open_result()?.fetch_all())
    }

    /// Column names of the open result
    pub fn columns(&self) -> Option<&[String]> {
        self.result.as_ref().map(Rows::columns)
    }

    /// Rows inserted by the last statement, or -1
    pub fn rows_affected(&self) -> i64 {
        self.result.as_ref().map(Rows::rows_affected).unwrap_or(-1)
    }

    /// Interrupt the statements running on the parent connection
    pub fn interrupt(&self) -> Result<()> {
        self.live_connection()?.token().interrupt()
    }

    /// The parent connection, while it is open
    pub fn connection(&self) -> Result<Connection> {
        self.live_connection().map(Connection::from_inner)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release the result and detach from the connection
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.result = None;
        if let Some(inner) = self.connection.upgrade() {
            inner.detach_cursor(self.id);
        }
        tracing::debug!(cursor = self.id, "cursor closed");
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("id", &self.id)
            .field("has_result", &self.result.is_some())
            .field("closed", &self.closed)
            .finish()
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        self.close();
    }
}
