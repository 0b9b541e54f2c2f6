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

//! Storage module
//!
//! - Engine and factory traits consumed by the client layer
//! - Configuration types
//! - The reference in-memory engine

pub mod config;
pub mod memory;
pub mod traits;

// Re-export config types
pub use config::{Config, ConfigFingerprint};

// Re-export trait types
pub use traits::{
    Engine, EngineFactory, InterruptHook, MemoryResult, QueryResult, StatementKind, TransactionId,
};

// Re-export the reference engine
pub use memory::{MemoryEngine, MemoryEngineFactory};
