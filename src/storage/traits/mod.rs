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

//! Storage traits
//!
//! - [`Engine`] - One open database instance
//! - [`EngineFactory`] - Opens engines for the instance registry
//! - [`QueryResult`] - Query result iteration
//!

pub mod engine;
pub mod result;

// Re-export main traits
pub use engine::{Engine, EngineFactory, InterruptHook, StatementKind, TransactionId};
pub use result::{MemoryResult, QueryResult};
