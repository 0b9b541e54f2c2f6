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

//! Result sets returned by connections and cursors
//!
//! # Example
//!
//! ```ignore
//! // Pull-style fetching
//! let mut rows = conn.execute("SELECT id, name FROM users", ())?;
//! let first = rows.fetch_one();
//! let next_ten = rows.fetch_many(10);
//! let rest = rows.fetch_all();
//!
//! // Iteration with typed access
//! for row in conn.execute("SELECT id, name FROM users", ())? {
//!     let row = row?;
//!     let id: i64 = row.get(0)?;
//!     let name: String = row.get_by_name("name")?;
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use crate::core::{Error, Result, Row, Value};
use crate::storage::traits::QueryResult;

/// Trait for converting from Value to a Rust type
pub trait FromValue: Sized {
    /// Convert a Value to Self
    fn from_value(value: &Value) -> Result<Self>;
}

fn conversion_error(value: &Value, to: &str) -> Error {
    Error::invalid_input(format!(
        "Could not convert {} value {} to {}",
        value.data_type(),
        value,
        to
    ))
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(*i),
            Value::Float(f) => Ok(*f as i64),
            _ => Err(conversion_error(value, "i64")),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|_| conversion_error(value, "i32"))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Integer(i) => Ok(*i as f64),
            _ => Err(conversion_error(value, "f64")),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s.to_string()),
            Value::Null => Err(conversion_error(value, "String")),
            other => Ok(other.to_string()),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Boolean(b) => Ok(*b),
            Value::Integer(i) => Ok(*i != 0),
            _ => Err(conversion_error(value, "bool")),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            Ok(Some(T::from_value(value)?))
        }
    }
}

/// Trait for converting a result row into a Rust struct
///
/// ```ignore
/// struct User { id: i64, name: String }
///
/// impl FromRow for User {
///     fn from_row(row: &ResultRow) -> Result<Self> {
///         Ok(User { id: row.get(0)?, name: row.get_by_name("name")? })
///     }
/// }
///
/// let users: Vec<User> = conn.execute("SELECT id, name FROM users", ())?.collect_as()?;
/// ```
pub trait FromRow: Sized {
    /// Convert a result row into Self
    fn from_row(row: &ResultRow) -> Result<Self>;
}

/// A single row from a query result with typed accessors
#[derive(Debug, Clone)]
pub struct ResultRow {
    row: Row,
    columns: Arc<Vec<String>>,
}

impl ResultRow {
    pub(crate) fn new(row: Row, columns: Arc<Vec<String>>) -> Self {
        Self { row, columns }
    }

    /// Get a column value by index with type conversion
    pub fn get<T: FromValue>(&self, index: usize) -> Result<T> {
        let value = self.row.get(index).ok_or_else(|| {
            Error::invalid_input(format!(
                "Column index {} out of range for row of {} columns",
                index,
                self.row.len()
            ))
        })?;
        T::from_value(value)
    }

    /// Get a column value by name (case-insensitive) with type conversion
    pub fn get_by_name<T: FromValue>(&self, name: &str) -> Result<T> {
        let index = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::catalog(format!("Referenced column \"{}\" not found", name)))?;
        self.get(index)
    }

    /// Get the raw Value at an index
    pub fn get_value(&self, index: usize) -> Option<&Value> {
        self.row.get(index)
    }

    pub fn into_inner(self) -> Row {
        self.row
    }

    pub fn as_row(&self) -> &Row {
        &self.row
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.row.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row.is_empty()
    }
}

/// Outstanding result of one statement
///
/// Rows are pulled with [`fetch_one`](Rows::fetch_one),
/// [`fetch_many`](Rows::fetch_many), [`fetch_all`](Rows::fetch_all) or by
/// iterating. The result is fully materialized by the engine, so it stays
/// readable after the issuing connection is closed.
pub struct Rows {
    result: Box<dyn QueryResult>,
    columns: Arc<Vec<String>>,
    closed: bool,
}

impl Rows {
    pub(crate) fn new(result: Box<dyn QueryResult>) -> Self {
        let columns = Arc::new(result.columns().to_vec());
        Self {
            result,
            columns,
            closed: false,
        }
    }

    /// Get the column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows inserted, or -1 for queries
    pub fn rows_affected(&self) -> i64 {
        self.result.rows_affected()
    }

    /// Take the next row
    pub fn fetch_one(&mut self) -> Option<Row> {
        if self.closed {
            return None;
        }
        self.result.next_row()
    }

    /// Take up to `n` rows
    pub fn fetch_many(&mut self, n: usize) -> Vec<Row> {
        let mut rows = Vec::with_capacity(n.min(self.result.remaining()));
        while rows.len() < n {
            match self.fetch_one() {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        rows
    }

    /// Take every remaining row
    pub fn fetch_all(&mut self) -> Vec<Row> {
        let mut rows = Vec::with_capacity(self.result.remaining());
        while let Some(row) = self.fetch_one() {
            rows.push(row);
        }
        rows
    }

    /// Collect all rows into a Vec
    pub fn collect_vec(self) -> Result<Vec<ResultRow>> {
        self.collect()
    }

    /// Map every remaining row through [`FromRow`]
    pub fn collect_as<T: FromRow>(self) -> Result<Vec<T>> {
        self.map(|row| row.and_then(|row| T::from_row(&row)))
            .collect()
    }

    /// Release the buffered rows
    ///
    /// This is called automatically when the Rows is dropped.
    pub fn close(&mut self) {
        if !self.closed {
            self.result.close();
            self.closed = true;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl fmt::Debug for Rows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rows")
            .field("columns", &self.columns)
            .field("remaining", &self.result.remaining())
            .field("rows_affected", &self.result.rows_affected())
            .field("closed", &self.closed)
            .finish()
    }
}

impl Iterator for Rows {
    type Item = Result<ResultRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.fetch_one()
            .map(|row| Ok(ResultRow::new(row, Arc::clone(&self.columns))))
    }
}

impl Drop for Rows {
    fn drop(&mut self) {
        self.close();
    }
}
