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

//! Function Registry
//!
//! Each connection owns one registry of user-defined scalar and table
//! functions. Names are case-insensitive and share one namespace. Lookups
//! hand out `Arc`s, so a statement that already resolved a function keeps
//! calling it even if the name is unregistered meanwhile; new statements no
//! longer see it.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::table::TableFunction;
use super::udf::ScalarFunction;
use crate::core::{Error, Result};

/// A registry entry
#[derive(Debug, Clone)]
pub enum RegisteredFunction {
    Scalar(Arc<ScalarFunction>),
    Table(Arc<TableFunction>),
}

impl RegisteredFunction {
    /// Name as registered
    pub fn name(&self) -> &str {
        match self {
            RegisteredFunction::Scalar(f) => f.name(),
            RegisteredFunction::Table(f) => f.name(),
        }
    }
}

/// Per-connection registry of user-defined functions
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: RwLock<FxHashMap<String, RegisteredFunction>>,
}

impl FunctionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scalar function
    pub fn register_scalar(&self, function: ScalarFunction) -> Result<()> {
        let key = function.name().to_lowercase();
        let mut functions = self.functions.write();
        if functions.contains_key(&key) {
            return Err(Error::function_registration(format!(
                "A function by the name of '{}' is already registered, please unregister it first",
                function.name()
            )));
        }
        functions.insert(key, RegisteredFunction::Scalar(Arc::new(function)));
        Ok(())
    }

    /// Register a table function
    pub fn register_table(&self, function: TableFunction) -> Result<()> {
        let key = function.name().to_lowercase();
        let mut functions = self.functions.write();
        if functions.contains_key(&key) {
            return Err(Error::function_registration(format!(
                "A table function by the name of '{}' is already registered, please unregister it first",
                function.name()
            )));
        }
        functions.insert(key, RegisteredFunction::Table(Arc::new(function)));
        Ok(())
    }

    /// Remove a table function
    pub fn unregister_table(&self, name: &str) -> Result<()> {
        let key = name.to_lowercase();
        let mut functions = self.functions.write();
        match functions.get(&key) {
            Some(RegisteredFunction::Table(_)) => {
                functions.remove(&key);
                Ok(())
            }
            _ => Err(Error::function_registration(format!(
                "No table function by the name of '{}'",
                name
            ))),
        }
    }

    /// Remove a scalar function
    pub fn remove_scalar(&self, name: &str) -> Result<()> {
        let key = name.to_lowercase();
        let mut functions = self.functions.write();
        match functions.get(&key) {
            Some(RegisteredFunction::Scalar(_)) => {
                functions.remove(&key);
                Ok(())
            }
            _ => Err(Error::function_registration(format!(
                "No function by the name of '{}'",
                name
            ))),
        }
    }

    /// Remove whatever is registered under `name`
    pub fn unregister(&self, name: &str) -> Result<()> {
        match self.functions.write().remove(&name.to_lowercase()) {
            Some(_) => Ok(()),
            None => Err(Error::function_registration(format!(
                "No function by the name of '{}'",
                name
            ))),
        }
    }

    /// Look up a scalar function
    pub fn resolve_scalar(&self, name: &str) -> Option<Arc<ScalarFunction>> {
        match self.functions.read().get(&name.to_lowercase()) {
            Some(RegisteredFunction::Scalar(f)) => Some(Arc::clone(f)),
            _ => None,
        }
    }

    /// Look up a table function
    pub fn resolve_table(&self, name: &str) -> Option<Arc<TableFunction>> {
        match self.functions.read().get(&name.to_lowercase()) {
            Some(RegisteredFunction::Table(f)) => Some(Arc::clone(f)),
            _ => None,
        }
    }

    /// Check whether any function is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.functions.read().contains_key(&name.to_lowercase())
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .functions
            .read()
            .values()
            .map(|f| f.name().to_string())
            .collect();
        names.sort();
        names
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.functions.read().len()
    }

    /// Returns true if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.functions.read().is_empty()
    }

    /// Drop every registration
    pub fn clear(&self) {
        self.functions.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, Value};
    use crate::functions::{TableFunctionKind, TableOutput};

    fn table(name: &str) -> TableFunction {
        TableFunction::new(
            name,
            vec![("x", DataType::Integer)],
            TableFunctionKind::Tuples,
            |_| Ok(TableOutput::rows(vec![vec![Value::integer(1)]])),
        )
        .unwrap()
    }

    fn scalar(name: &str) -> ScalarFunction {
        ScalarFunction::new(name, vec![], DataType::Integer, |_| Ok(Value::integer(1)))
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = FunctionRegistry::new();
        registry.register_table(table("Gen")).unwrap();
        registry.register_scalar(scalar("one")).unwrap();

        assert!(registry.resolve_table("GEN").is_some());
        assert!(registry.resolve_scalar("gen").is_none());
        assert!(registry.resolve_scalar("ONE").is_some());
        assert_eq!(registry.names(), vec!["Gen".to_string(), "one".to_string()]);
    }

    #[test]
    fn test_duplicate_registration() {
        let registry = FunctionRegistry::new();
        registry.register_table(table("gen")).unwrap();
        let err = registry.register_table(table("gen")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid Input Error: A table function by the name of 'gen' is already registered, please unregister it first"
        );
        assert!(registry.register_scalar(scalar("GEN")).is_err());
    }

    #[test]
    fn test_unregister() {
        let registry = FunctionRegistry::new();
        let err = registry.unregister_table("f").unwrap_err();
        assert!(err.to_string().contains("No table function by the name of 'f'"));

        registry.register_table(table("f")).unwrap();
        let captured = registry.resolve_table("f").unwrap();
        registry.unregister_table("f").unwrap();
        assert!(registry.resolve_table("f").is_none());
        assert_eq!(captured.name(), "f");

        registry.register_table(table("f")).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_scalar_wrong_kind() {
        let registry = FunctionRegistry::new();
        registry.register_table(table("f")).unwrap();
        assert!(registry.remove_scalar("f").is_err());
        assert!(registry.unregister("f").is_ok());
        assert!(registry.is_empty());
    }
}
