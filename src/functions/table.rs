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

//! Table-valued functions
//!
//! A table function declares its output schema at registration. The engine
//! calls it during execution and pulls rows through [`TableRows`], which
//! checks every row (tuples) or every column (columnar) against the declared
//! schema before handing data to the engine. Column names are bound
//! positionally; only counts and types are enforced.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::core::{DataType, Error, Result, Row, Value};

/// How a table function delivers its output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableFunctionKind {
    /// Row iterator; each row is a vector of values
    #[default]
    Tuples,
    /// Columnar batch; every column carries its own type
    Arrow,
}

impl fmt::Display for TableFunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableFunctionKind::Tuples => write!(f, "tuples"),
            TableFunctionKind::Arrow => write!(f, "arrow_table"),
        }
    }
}

impl FromStr for TableFunctionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "tuples" => Ok(TableFunctionKind::Tuples),
            "arrow_table" | "arrow" => Ok(TableFunctionKind::Arrow),
            _ => Err(Error::invalid_input(format!(
                "'{}' is not a recognized type for 'tvf_type'",
                s
            ))),
        }
    }
}

/// One column of columnar table function output
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            data_type,
            values,
        }
    }
}

/// What a table function callable returns
pub enum TableOutput {
    /// Lazily produced rows, for [`TableFunctionKind::Tuples`]
    Rows(Box<dyn Iterator<Item = Vec<Value>> + Send>),
    /// A columnar batch, for [`TableFunctionKind::Arrow`]
    Columns(Vec<Column>),
}

impl TableOutput {
    /// Wrap any sendable row iterator
    pub fn rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<Value>>,
        I::IntoIter: Send + 'static,
    {
        TableOutput::Rows(Box::new(rows.into_iter()))
    }

    /// Wrap a columnar batch
    pub fn columns(columns: Vec<Column>) -> Self {
        TableOutput::Columns(columns)
    }
}

impl fmt::Debug for TableOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableOutput::Rows(_) => f.write_str("TableOutput::Rows(..)"),
            TableOutput::Columns(cols) => f.debug_tuple("TableOutput::Columns").field(cols).finish(),
        }
    }
}

/// Arguments bound to one table function call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableArguments {
    positional: Vec<Value>,
    named: FxHashMap<String, Value>,
}

impl TableArguments {
    pub fn new(positional: Vec<Value>) -> Self {
        Self {
            positional,
            named: FxHashMap::default(),
        }
    }

    /// Positional argument by index (0-based)
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    /// Named argument, if the caller passed it
    pub fn named(&self, name: &str) -> Option<&Value> {
        self.named.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

/// Callable backing a table function
pub type TableCallable = Arc<dyn Fn(&TableArguments) -> Result<TableOutput> + Send + Sync>;

/// A table-valued function registered on a connection
#[derive(Clone)]
pub struct TableFunction {
    name: String,
    schema: Vec<(String, DataType)>,
    kind: TableFunctionKind,
    parameters: Vec<String>,
    callable: TableCallable,
}

impl TableFunction {
    /// Create a table function. The schema must not be empty.
    pub fn new<S, F>(
        name: impl Into<String>,
        schema: Vec<(S, DataType)>,
        kind: TableFunctionKind,
        callable: F,
    ) -> Result<Self>
    where
        S: Into<String>,
        F: Fn(&TableArguments) -> Result<TableOutput> + Send + Sync + 'static,
    {
        let name = name.into();
        if schema.is_empty() {
            return Err(Error::invalid_input(format!(
                "Table function '{}' schema cannot be empty",
                name
            )));
        }
        Ok(Self {
            name,
            schema: schema.into_iter().map(|(n, t)| (n.into(), t)).collect(),
            kind,
            parameters: Vec::new(),
            callable: Arc::new(callable),
        })
    }

    /// Create a table function from textual type names and kind
    ///
    /// ```ignore
    /// let f = TableFunction::from_type_names(
    ///     "gen", &[("id", "INTEGER"), ("label", "VARCHAR")], "tuples", callable)?;
    /// ```
    pub fn from_type_names<F>(
        name: impl Into<String>,
        schema: &[(&str, &str)],
        kind: &str,
        callable: F,
    ) -> Result<Self>
    where
        F: Fn(&TableArguments) -> Result<TableOutput> + Send + Sync + 'static,
    {
        let kind = kind.parse::<TableFunctionKind>()?;
        let columns = schema
            .iter()
            .map(|(col, ty)| Ok((col.to_string(), ty.parse::<DataType>()?)))
            .collect::<Result<Vec<_>>>()?;
        Self::new(name, columns, kind, callable)
    }

    /// Declare named parameters accepted as `name := value`
    pub fn with_parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.parameters = parameters
            .into_iter()
            .map(|p| p.as_ref().to_lowercase())
            .collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &[(String, DataType)] {
        &self.schema
    }

    pub fn kind(&self) -> TableFunctionKind {
        self.kind
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Output column names in declaration order
    pub fn column_names(&self) -> Vec<String> {
        self.schema.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Bind call-site arguments, rejecting undeclared named parameters
    pub fn bind_arguments(
        &self,
        positional: Vec<Value>,
        named: Vec<(String, Value)>,
    ) -> Result<TableArguments> {
        let mut bound = TableArguments::new(positional);
        for (key, value) in named {
            let key = key.to_lowercase();
            if !self.parameters.contains(&key) {
                return Err(Error::invalid_input(format!(
                    "Table function '{}' does not support named parameter '{}'",
                    self.name, key
                )));
            }
            bound.named.insert(key, value);
        }
        Ok(bound)
    }

    /// Call the function and wrap its output in a validating row source
    pub fn invoke(&self, args: &TableArguments) -> Result<TableRows> {
        let output = (self.callable)(args)?;
        let types: Vec<DataType> = self.schema.iter().map(|(_, t)| *t).collect();
        match (self.kind, output) {
            (TableFunctionKind::Tuples, TableOutput::Rows(iter)) => Ok(TableRows {
                function: self.name.clone(),
                types,
                source: RowSource::Tuples { iter, index: 0 },
            }),
            (TableFunctionKind::Arrow, TableOutput::Columns(columns)) => {
                self.check_columns(&columns)?;
                let len = columns.first().map(|c| c.values.len()).unwrap_or(0);
                Ok(TableRows {
                    function: self.name.clone(),
                    types,
                    source: RowSource::Columns {
                        columns,
                        index: 0,
                        len,
                    },
                })
            }
            (kind, TableOutput::Rows(_)) | (kind, TableOutput::Columns(_)) => {
                let expected = match kind {
                    TableFunctionKind::Tuples => "an iterator of rows",
                    TableFunctionKind::Arrow => "a columnar batch",
                };
                Err(Error::invalid_input(format!(
                    "Table function '{}' of type '{}' must return {}",
                    self.name, kind, expected
                )))
            }
        }
    }

    fn check_columns(&self, columns: &[Column]) -> Result<()> {
        if columns.len() != self.schema.len() {
            return Err(Error::schema_mismatch(
                &self.name,
                format!(
                    "declared {} column(s), got {}",
                    self.schema.len(),
                    columns.len()
                ),
            ));
        }
        let len = columns.first().map(|c| c.values.len()).unwrap_or(0);
        for (column, (declared, ty)) in columns.iter().zip(&self.schema) {
            if column.data_type != *ty {
                return Err(Error::schema_mismatch(
                    &self.name,
                    format!(
                        "column '{}' declared {}, got {}",
                        declared, ty, column.data_type
                    ),
                ));
            }
            if column.values.len() != len {
                return Err(Error::schema_mismatch(
                    &self.name,
                    format!(
                        "column '{}' has {} value(s), expected {}",
                        declared,
                        column.values.len(),
                        len
                    ),
                ));
            }
            if let Some(bad) = column
                .values
                .iter()
                .find(|v| !v.is_null() && v.data_type() != *ty)
            {
                return Err(Error::schema_mismatch(
                    &self.name,
                    format!(
                        "column '{}' declared {}, contains {}",
                        declared,
                        ty,
                        bad.data_type()
                    ),
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for TableFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableFunction")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("kind", &self.kind)
            .field("parameters", &self.parameters)
            .finish()
    }
}

enum RowSource {
    Tuples {
        iter: Box<dyn Iterator<Item = Vec<Value>> + Send>,
        index: usize,
    },
    Columns {
        columns: Vec<Column>,
        index: usize,
        len: usize,
    },
}

/// Validated rows produced by one table function call
///
/// Tuple rows are checked as they are pulled, so a bad row is reported
/// before it reaches the engine and before later rows are produced.
pub struct TableRows {
    function: String,
    types: Vec<DataType>,
    source: RowSource,
}

impl Iterator for TableRows {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.source {
            RowSource::Tuples { iter, index } => {
                let values = iter.next()?;
                let row_index = *index;
                *index += 1;
                Some(check_tuple(&self.function, &self.types, values, row_index))
            }
            RowSource::Columns {
                columns,
                index,
                len,
            } => {
                if *index >= *len {
                    return None;
                }
                let i = *index;
                *index += 1;
                Some(Ok(Row::from_values(
                    columns
                        .iter_mut()
                        .map(|c| std::mem::take(&mut c.values[i]))
                        .collect(),
                )))
            }
        }
    }
}

fn check_tuple(function: &str, types: &[DataType], values: Vec<Value>, row: usize) -> Result<Row> {
    if values.len() != types.len() {
        return Err(Error::schema_mismatch(
            function,
            format!(
                "row {} has {} value(s), declared {} column(s)",
                row,
                values.len(),
                types.len()
            ),
        ));
    }
    let mut out = Vec::with_capacity(values.len());
    for (col, (value, ty)) in values.into_iter().zip(types).enumerate() {
        match value.coerce_to(*ty) {
            Some(v) => out.push(v),
            None => {
                return Err(Error::schema_mismatch(
                    function,
                    format!(
                        "row {} column {} declared {}, got {}",
                        row,
                        col,
                        ty,
                        value.data_type()
                    ),
                ))
            }
        }
    }
    Ok(Row::from_values(out))
}
