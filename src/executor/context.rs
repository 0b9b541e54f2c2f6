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

//! Execution Context
//!
//! This module provides the execution context handed to an engine for one
//! statement: bound parameters, the connection's function registry, the
//! cancellation probe and the enclosing transaction.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::{Error, Result, Value};
use crate::functions::FunctionRegistry;

/// Polled by engines during long-running work
pub trait CancellationProbe: Send + Sync {
    /// Returns `Err(Error::Interrupted)` once the statement must stop
    fn check_cancelled(&self) -> Result<()>;
}

/// Execution context for one statement
///
/// Shared data sits behind `Arc` so cloning the context per nested
/// evaluation is cheap.
#[derive(Clone)]
pub struct ExecutionContext {
    /// Query parameters ($1, $2 or ?) - wrapped in Arc for cheap cloning
    params: Arc<Vec<Value>>,
    /// Functions registered on the issuing connection
    functions: Arc<FunctionRegistry>,
    /// Cancellation probe
    cancellation: Arc<dyn CancellationProbe>,
    /// Enclosing transaction, `None` for auto-commit
    transaction_id: Option<u64>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("params", &self.params)
            .field("functions", &self.functions.len())
            .field("transaction_id", &self.transaction_id)
            .finish()
    }
}

impl ExecutionContext {
    /// Create a new empty execution context
    pub fn new() -> Self {
        Self {
            params: Arc::new(Vec::new()),
            functions: Arc::new(FunctionRegistry::new()),
            cancellation: Arc::new(CancellationHandle::new()),
            transaction_id: None,
        }
    }

    /// Start building a context
    pub fn builder() -> ExecutionContextBuilder {
        ExecutionContextBuilder::new()
    }

    /// Create an execution context with positional parameters
    pub fn with_params(params: Vec<Value>) -> Self {
        Self {
            params: Arc::new(params),
            ..Self::new()
        }
    }

    /// Get a positional parameter by index (1-based)
    pub fn get_param(&self, index: usize) -> Option<&Value> {
        if index == 0 {
            return None;
        }
        self.params.get(index - 1)
    }

    /// Get all positional parameters
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Get the number of positional parameters
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Functions visible to this statement
    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Get the enclosing transaction id
    pub fn transaction_id(&self) -> Option<u64> {
        self.transaction_id
    }

    /// Check for cancellation and return an error if cancelled
    pub fn check_cancelled(&self) -> Result<()> {
        self.cancellation.check_cancelled()
    }
}

/// Standalone cancellation flag for contexts not driven by a connection
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancellationHandle {
    /// Create a handle that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the query
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check if the query has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl CancellationProbe for CancellationHandle {
    fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Interrupted)
        } else {
            Ok(())
        }
    }
}

/// Builder for ExecutionContext
pub struct ExecutionContextBuilder {
    ctx: ExecutionContext,
}

impl ExecutionContextBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            ctx: ExecutionContext::new(),
        }
    }

    /// Set positional parameters
    pub fn params(mut self, params: Vec<Value>) -> Self {
        self.ctx.params = Arc::new(params);
        self
    }

    /// Set the function registry
    pub fn functions(mut self, functions: Arc<FunctionRegistry>) -> Self {
        self.ctx.functions = functions;
        self
    }

    /// Set the cancellation probe
    pub fn cancellation(mut self, probe: Arc<dyn CancellationProbe>) -> Self {
        self.ctx.cancellation = probe;
        self
    }

    /// Run inside a transaction
    pub fn transaction_id(mut self, txn_id: u64) -> Self {
        self.ctx.transaction_id = Some(txn_id);
        self
    }

    /// Build the execution context
    pub fn build(self) -> ExecutionContext {
        self.ctx
    }
}

impl Default for ExecutionContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
