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

//! User-Defined Function System
//!
//! - [`ScalarFunction`] - Row-at-a-time functions callable in SELECT lists
//! - [`TableFunction`] - Table-valued functions usable as a FROM source
//! - [`FunctionRegistry`] - Per-connection registry consulted by the engine

pub mod registry;
pub mod table;
pub mod udf;

pub use registry::{FunctionRegistry, RegisteredFunction};
pub use table::{
    Column, TableArguments, TableCallable, TableFunction, TableFunctionKind, TableOutput,
    TableRows,
};
pub use udf::{ScalarCallable, ScalarFunction};
