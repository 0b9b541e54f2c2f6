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

//! # Stoolap Client - thread-safe embedded database client layer
//!
//! Connections, cursors and user-defined functions on top of shared,
//! reference-counted engine instances.
//!
//! ## Key Features
//!
//! - **Instance cache** - Connections to one storage location share a single
//!   engine, constructed exactly once and closed after the last release
//! - **Sessions** - Cheap clonable connections with their own transaction
//!   state, cursors and function registry
//! - **Cooperative interruption** - Cancel running statements from any
//!   thread with generation-checked interrupt tokens
//! - **User-defined functions** - Scalar functions and table-valued
//!   functions with declared, enforced output schemas
//!
//! ## Quick Start
//!
//! ```rust
//! use stoolap_client::{Config, InstanceRegistry, MemoryEngineFactory, Value};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(InstanceRegistry::new(Arc::new(MemoryEngineFactory)));
//! let conn = registry.connect(":memory:", Config::default()).unwrap();
//!
//! conn.execute("CREATE TABLE users (id INTEGER, name TEXT)", ()).unwrap();
//! conn.execute("INSERT INTO users VALUES (?, ?)", (1, "Alice")).unwrap();
//!
//! let mut cur = conn.cursor().unwrap();
//! cur.execute("SELECT name FROM users", ()).unwrap();
//! let rows = cur.fetch_all().unwrap();
//! assert_eq!(rows[0][0], Value::text("Alice"));
//! conn.close().unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`api`] - Public client interface ([`Connection`], [`Cursor`], [`InstanceRegistry`])
//! - [`core`] - Core types ([`DataType`], [`Value`], [`Row`], [`Error`])
//! - [`storage`] - Engine boundary, configuration and the reference in-memory engine
//! - [`parser`] - Parser for the reference engine's SQL dialect
//! - [`functions`] - Scalar and table function registration
//! - [`executor`] - Execution context and statement evaluation

pub mod api;
pub mod core;
pub mod executor;
pub mod functions;
pub mod parser;
pub mod storage;

// Re-export main types for convenience
pub use core::{DataType, Error, Result, Row, Value};

// Re-export config and engine boundary types
pub use storage::{
    Config, ConfigFingerprint, Engine, EngineFactory, InterruptHook, MemoryEngine,
    MemoryEngineFactory, MemoryResult, QueryResult, StatementKind, TransactionId,
};

// Re-export function types
pub use functions::{
    Column, FunctionRegistry, ScalarFunction, TableArguments, TableFunction, TableFunctionKind,
    TableOutput,
};

// Re-export executor types
pub use executor::{CancellationProbe, ExecutionContext};

// Re-export API types
pub use api::{
    connect, Connection, Cursor, EngineLease, FromRow, FromValue, InstanceRegistry,
    InterruptStats, InterruptToken, IntoTarget, Location, Params, QueryOutcome, ResultRow, Rows,
    StorageIdentity, Target, ToParam, Transaction, TransactionState,
};
