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

//! Result trait for query results
//!

use std::collections::VecDeque;

use crate::core::Row;

/// QueryResult represents the outcome of one statement
///
/// Engines fully evaluate a statement inside [`Engine::run`], so a result
/// never touches engine state and can be drained after the issuing
/// connection is closed or interrupted.
///
/// [`Engine::run`]: super::Engine::run
///
/// # Example
///
/// ```ignore
/// let mut result = engine.run(&ctx, "SELECT * FROM t")?;
/// println!("Columns: {:?}", result.columns());
/// while let Some(row) = result.next_row() {
///     // Process row...
/// }
/// ```
pub trait QueryResult: Send {
    /// Returns the column names in the result
    fn columns(&self) -> &[String];

    /// Takes the next row, or `None` when the result is exhausted
    fn next_row(&mut self) -> Option<Row>;

    /// Number of rows not yet taken
    fn remaining(&self) -> usize;

    /// Returns the number of rows affected by an INSERT, or -1 for queries
    fn rows_affected(&self) -> i64;

    /// Releases buffered rows
    fn close(&mut self);
}

/// A materialized in-memory query result
#[derive(Debug, Default)]
pub struct MemoryResult {
    columns: Vec<String>,
    rows: VecDeque<Row>,
    rows_affected: i64,
}

impl MemoryResult {
    /// Creates a new empty result with the given columns
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: VecDeque::new(),
            rows_affected: -1,
        }
    }

    /// Creates a result with columns and rows
    pub fn with_rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows: rows.into(),
            rows_affected: -1,
        }
    }

    /// Creates a result for a modification or DDL statement
    pub fn for_modification(rows_affected: i64) -> Self {
        Self {
            columns: Vec::new(),
            rows: VecDeque::new(),
            rows_affected,
        }
    }

    /// Adds a row to the result
    pub fn add_row(&mut self, row: Row) {
        self.rows.push_back(row);
    }
}

impl QueryResult for MemoryResult {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }

    fn remaining(&self) -> usize {
        self.rows.len()
    }

    fn rows_affected(&self) -> i64 {
        self.rows_affected
    }

    fn close(&mut self) {
        self.rows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    #[test]
    fn test_memory_result_empty() {
        let mut result = MemoryResult::new(vec!["id".to_string()]);
        assert_eq!(result.columns(), &["id".to_string()]);
        assert!(result.next_row().is_none());
        assert_eq!(result.rows_affected(), -1);
    }

    #[test]
    fn test_memory_result_with_rows() {
        let rows = vec![
            Row::from_values(vec![Value::integer(1)]),
            Row::from_values(vec![Value::integer(2)]),
        ];
        let mut result = MemoryResult::with_rows(vec!["id".to_string()], rows);
        assert_eq!(result.remaining(), 2);
        assert_eq!(result.next_row().unwrap()[0], Value::integer(1));
        result.close();
        assert!(result.next_row().is_none());
    }

    #[test]
    fn test_for_modification() {
        let result = MemoryResult::for_modification(3);
        assert_eq!(result.rows_affected(), 3);
        assert!(result.columns().is_empty());
    }
}
