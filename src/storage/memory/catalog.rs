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

//! Table catalog
//!
//! Tables are immutable once published: writers clone-on-write through
//! `Arc::make_mut`, so readers holding an `Arc<Table>` keep a consistent
//! snapshot without holding any lock.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::core::{DataType, Error, Result, Row};
use crate::parser::CreateTableStatement;

/// Column of a stored table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: DataType,
}

/// A stored table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub rows: Arc<Vec<Row>>,
}

impl Table {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_types(&self) -> Vec<DataType> {
        self.columns.iter().map(|c| c.data_type).collect()
    }
}

/// Tables keyed by lowercase name
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: FxHashMap<String, Arc<Table>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from loaded tables
    pub fn from_tables(tables: Vec<Table>) -> Self {
        Self {
            tables: tables
                .into_iter()
                .map(|t| (t.name.to_lowercase(), Arc::new(t)))
                .collect(),
        }
    }

    /// Tables sorted by name
    pub fn to_tables(&self) -> Vec<Table> {
        let mut tables: Vec<Table> = self.tables.values().map(|t| (**t).clone()).collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        tables
    }

    /// Snapshot of one table
    pub fn get(&self, name: &str) -> Option<Arc<Table>> {
        self.tables.get(&name.to_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Create a table; returns false if it existed and IF NOT EXISTS was given
    pub fn create(&mut self, stmt: &CreateTableStatement) -> Result<bool> {
        let key = stmt.name.to_lowercase();
        if self.tables.contains_key(&key) {
            if stmt.if_not_exists {
                return Ok(false);
            }
            return Err(Error::catalog(format!(
                "Table with name \"{}\" already exists!",
                stmt.name
            )));
        }
        let mut seen = FxHashSet::default();
        for column in &stmt.columns {
            if !seen.insert(column.name.to_lowercase()) {
                return Err(Error::catalog(format!(
                    "Column with name {} already exists!",
                    column.name
                )));
            }
        }
        let table = Table {
            name: stmt.name.clone(),
            columns: stmt
                .columns
                .iter()
                .map(|c| ColumnSpec {
                    name: c.name.clone(),
                    data_type: c.data_type,
                })
                .collect(),
            rows: Arc::new(Vec::new()),
        };
        self.tables.insert(key, Arc::new(table));
        Ok(true)
    }

    /// Drop a table; returns false if it was missing and IF EXISTS was given
    pub fn drop_table(&mut self, name: &str, if_exists: bool) -> Result<bool> {
        match self.tables.remove(&name.to_lowercase()) {
            Some(_) => Ok(true),
            None if if_exists => Ok(false),
            None => Err(Error::catalog(format!(
                "Table with name {} does not exist!",
                name
            ))),
        }
    }

    /// Append already-coerced rows
    pub fn append(&mut self, name: &str, rows: Vec<Row>, max_rows: Option<usize>) -> Result<usize> {
        let table = self
            .tables
            .get_mut(&name.to_lowercase())
            .ok_or_else(|| Error::catalog(format!("Table with name {} does not exist!", name)))?;
        if let Some(limit) = max_rows {
            if table.rows.len() + rows.len() > limit {
                return Err(Error::invalid_input(format!(
                    "Table {} would exceed max_rows ({})",
                    name, limit
                )));
            }
        }
        let count = rows.len();
        let table = Arc::make_mut(table);
        Arc::make_mut(&mut table.rows).extend(rows);
        Ok(count)
    }

    /// Publish `names` from a transaction workspace into this catalog.
    /// Names missing from `workspace` were dropped there.
    pub fn publish(&mut self, workspace: &Catalog, names: &FxHashSet<String>) {
        for name in names {
            match workspace.tables.get(name) {
                Some(table) => {
                    self.tables.insert(name.clone(), Arc::clone(table));
                }
                None => {
                    self.tables.remove(name);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use crate::parser::ColumnDefinition;

    fn create_stmt(name: &str) -> CreateTableStatement {
        CreateTableStatement {
            name: name.to_string(),
            if_not_exists: false,
            columns: vec![ColumnDefinition {
                name: "id".to_string(),
                data_type: DataType::Integer,
            }],
        }
    }

    #[test]
    fn test_create_drop() {
        let mut catalog = Catalog::new();
        assert!(catalog.create(&create_stmt("T")).unwrap());
        assert!(catalog.contains("t"));
        assert!(catalog.create(&create_stmt("t")).is_err());
        assert!(catalog.drop_table("t", false).unwrap());
        assert!(!catalog.drop_table("t", true).unwrap());
        assert!(catalog.drop_table("t", false).unwrap_err().is_not_found());
    }

    #[test]
    fn test_append_is_copy_on_write() {
        let mut catalog = Catalog::new();
        catalog.create(&create_stmt("t")).unwrap();
        let before = catalog.get("t").unwrap();
        catalog
            .append("t", vec![Row::from_values(vec![Value::integer(1)])], None)
            .unwrap();
        assert_eq!(before.rows.len(), 0);
        assert_eq!(catalog.get("t").unwrap().rows.len(), 1);
        assert!(catalog
            .append("t", vec![Row::new(), Row::new()], Some(2))
            .is_err());
    }

    #[test]
    fn test_publish() {
        let mut global = Catalog::new();
        global.create(&create_stmt("keep")).unwrap();
        global.create(&create_stmt("gone")).unwrap();

        let mut workspace = global.clone();
        workspace.create(&create_stmt("new")).unwrap();
        workspace.drop_table("gone", false).unwrap();
        let touched: FxHashSet<String> = ["new".to_string(), "gone".to_string()].into_iter().collect();

        global.publish(&workspace, &touched);
        assert!(global.contains("keep"));
        assert!(global.contains("new"));
        assert!(!global.contains("gone"));
    }
}
