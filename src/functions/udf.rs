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

//! User-defined scalar functions

use std::fmt;
use std::sync::Arc;

use crate::core::{DataType, Error, Result, Value};

/// Callable backing a scalar function
pub type ScalarCallable = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// A scalar function registered on a connection
///
/// Arguments are checked for arity and coerced to the declared types before
/// the callable runs; the return value is checked against `return_type`.
#[derive(Clone)]
pub struct ScalarFunction {
    name: String,
    arg_types: Vec<DataType>,
    return_type: DataType,
    callable: ScalarCallable,
}

impl ScalarFunction {
    /// Create a scalar function
    pub fn new<F>(
        name: impl Into<String>,
        arg_types: Vec<DataType>,
        return_type: DataType,
        callable: F,
    ) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arg_types,
            return_type,
            callable: Arc::new(callable),
        }
    }

    /// Function name as registered
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared argument types
    pub fn arg_types(&self) -> &[DataType] {
        &self.arg_types
    }

    /// Declared return type
    pub fn return_type(&self) -> DataType {
        self.return_type
    }

    /// Invoke the function with already-evaluated arguments
    pub fn invoke(&self, args: Vec<Value>) -> Result<Value> {
        if args.len() != self.arg_types.len() {
            return Err(Error::invalid_input(format!(
                "Function '{}' expects {} argument(s), got {}",
                self.name,
                self.arg_types.len(),
                args.len()
            )));
        }

        let mut coerced = Vec::with_capacity(args.len());
        for (i, (arg, ty)) in args.into_iter().zip(&self.arg_types).enumerate() {
            match arg.coerce_to(*ty) {
                Some(v) => coerced.push(v),
                None => {
                    return Err(Error::invalid_input(format!(
                        "Function '{}' argument {} expects {}, got {}",
                        self.name,
                        i + 1,
                        ty,
                        arg.data_type()
                    )))
                }
            }
        }

        let result = (self.callable)(&coerced)?;
        result.coerce_to(self.return_type).ok_or_else(|| {
            Error::invalid_input(format!(
                "Function '{}' returned {}, expected {}",
                self.name,
                result.data_type(),
                self.return_type
            ))
        })
    }
}

impl fmt::Debug for ScalarFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarFunction")
            .field("name", &self.name)
            .field("arg_types", &self.arg_types)
            .field("return_type", &self.return_type)
            .finish()
    }
}
