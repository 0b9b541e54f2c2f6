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

//! Query Executor
//!
//! - [`ExecutionContext`] - Per-statement parameters, functions, cancellation
//!   and transaction
//! - [`eval`] - Expression evaluation and aggregate state
//! - [`query`] - SELECT pipeline, FROM-clause function sources, INSERT
//!   value evaluation

pub mod context;
pub mod eval;
pub mod query;

pub use context::{
    CancellationHandle, CancellationProbe, ExecutionContext, ExecutionContextBuilder,
};
pub use eval::{AggregateState, Evaluator, SettingLookup};
pub use query::{
    evaluate_insert_rows, execute_select, function_source, RowStream, CANCEL_CHECK_INTERVAL,
};
