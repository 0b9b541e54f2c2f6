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

//! Client API
//!
//! # Quick Start
//!
//! ```ignore
//! use stoolap_client::{connect, params, Config};
//!
//! // Anonymous in-memory database
//! let conn = connect(":memory:", Config::default())?;
//!
//! conn.execute("CREATE TABLE users (id INTEGER, name TEXT)", ())?;
//! conn.execute("INSERT INTO users VALUES ($1, $2)", (1, "Alice"))?;
//! conn.execute("INSERT INTO users VALUES ($1, $2)", params![2, "Bob"])?;
//!
//! // Cursors keep their own open result
//! let mut cur = conn.cursor()?;
//! cur.execute("SELECT name FROM users", ())?;
//! let names = cur.fetch_all()?;
//!
//! // A second connection to the same file shares one engine instance
//! let a = connect("file:///tmp/app.db", Config::default())?;
//! let b = connect("/tmp/app.db", Config::default())?;
//! ```
//!
//! # Modules
//!
//! - [`registry`] - engine instance cache ([`InstanceRegistry`], [`connect`])
//! - [`identity`] - connect targets and normalized storage locations
//! - [`connection`] - sessions ([`Connection`])
//! - [`cursor`] - statement executors with an open result ([`Cursor`])
//! - [`interrupt`] - cooperative cancellation ([`InterruptToken`])
//! - [`transaction`] - transaction state and the RAII [`Transaction`] guard
//! - [`params`] / [`rows`] - parameter binding and result consumption

pub mod connection;
pub mod cursor;
pub mod identity;
pub mod interrupt;
pub mod params;
pub mod registry;
pub mod rows;
pub mod transaction;

pub use connection::Connection;
pub use cursor::Cursor;
pub use identity::{IntoTarget, Location, StorageIdentity, Target, FILE_SCHEME, MEMORY_SCHEME};
pub use interrupt::{InterruptStats, InterruptToken, QueryGuard, QueryOutcome};
pub use params::{Params, ToParam};
pub use registry::{connect, EngineLease, InstanceRegistry};
pub use rows::{FromRow, FromValue, ResultRow, Rows};
pub use transaction::{Transaction, TransactionState};
