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

//! Query execution
//!
//! A SELECT pulls rows from a [`RowStream`] (table snapshot, `range(n)` or a
//! table function) and projects or aggregates them. The cancellation probe is
//! polled every [`CANCEL_CHECK_INTERVAL`] rows for scans and before every
//! row pulled from a table function.

use std::sync::Arc;

use super::context::ExecutionContext;
use super::eval::{AggregateState, Evaluator, SettingLookup};
use crate::core::{DataType, Error, Result, Row, Value};
use crate::parser::{Expression, FunctionArgument, SelectItem, SelectStatement};
use crate::storage::MemoryResult;

/// Rows between two cancellation checks during scans
pub const CANCEL_CHECK_INTERVAL: usize = 1024;

/// Name of the built-in row generator
pub const RANGE_FUNCTION: &str = "range";

/// Source rows for a SELECT
pub struct RowStream {
    columns: Vec<String>,
    rows: Box<dyn Iterator<Item = Result<Row>> + Send>,
    check_every: usize,
}

impl RowStream {
    /// Rows of a table snapshot
    pub fn from_rows(columns: Vec<String>, rows: Arc<Vec<Row>>) -> Self {
        let len = rows.len();
        Self {
            columns,
            rows: Box::new((0..len).map(move |i| Ok(rows[i].clone()))),
            check_every: CANCEL_CHECK_INTERVAL,
        }
    }

    /// A single empty row, for SELECT without FROM
    pub fn single() -> Self {
        Self {
            columns: Vec::new(),
            rows: Box::new(std::iter::once(Ok(Row::new()))),
            check_every: CANCEL_CHECK_INTERVAL,
        }
    }

    /// Column names of the source
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// Resolve `name(args)` in a FROM clause
///
/// Registered table functions take precedence over the built-in `range`.
pub fn function_source(
    ctx: &ExecutionContext,
    settings: SettingLookup<'_>,
    name: &str,
    args: &[FunctionArgument],
) -> Result<RowStream> {
    let eval = Evaluator::new(ctx, settings).bind(args.iter().map(|arg| match arg {
        FunctionArgument::Positional(expr) | FunctionArgument::Named(_, expr) => expr,
    }))?;
    let mut positional = Vec::new();
    let mut named = Vec::new();
    for arg in args {
        match arg {
            FunctionArgument::Positional(expr) => positional.push(eval.eval(expr, &[], None)?),
            FunctionArgument::Named(key, expr) => {
                named.push((key.clone(), eval.eval(expr, &[], None)?))
            }
        }
    }

    if let Some(function) = ctx.functions().resolve_table(name) {
        let bound = function.bind_arguments(positional, named)?;
        let rows = function.invoke(&bound)?;
        return Ok(RowStream {
            columns: function.column_names(),
            rows: Box::new(rows),
            check_every: 1,
        });
    }

    if name.eq_ignore_ascii_case(RANGE_FUNCTION) {
        if !named.is_empty() {
            return Err(Error::invalid_input("range() does not accept named parameters"));
        }
        let (start, end) = match positional.as_slice() {
            [Value::Integer(end)] => (0, *end),
            [Value::Integer(start), Value::Integer(end)] => (*start, *end),
            _ => {
                return Err(Error::invalid_input(
                    "range() expects one or two INTEGER arguments",
                ))
            }
        };
        return Ok(RowStream {
            columns: vec![RANGE_FUNCTION.to_string()],
            rows: Box::new((start..end).map(|i| Ok(Row::from_values(vec![Value::Integer(i)])))),
            check_every: CANCEL_CHECK_INTERVAL,
        });
    }

    Err(Error::catalog(format!(
        "Table Function with name {} does not exist!",
        name
    )))
}

/// Run a SELECT over `source`
pub fn execute_select(
    ctx: &ExecutionContext,
    settings: SettingLookup<'_>,
    select: &SelectStatement,
    source: RowStream,
) -> Result<MemoryResult> {
    let eval = Evaluator::new(ctx, settings).bind(select.items.iter().filter_map(|item| {
        match item {
            SelectItem::Expression { expr, .. } => Some(expr),
            SelectItem::Wildcard => None,
        }
    }))?;
    let RowStream {
        columns: source_columns,
        rows,
        check_every,
    } = source;
    let output_columns = output_columns(select, &source_columns);

    if select.has_aggregates() {
        return aggregate(ctx, &eval, select, &source_columns, output_columns, rows, check_every);
    }

    let mut result = MemoryResult::new(output_columns);
    for (i, row) in rows.enumerate() {
        if i % check_every == 0 {
            ctx.check_cancelled()?;
        }
        let row = row?;
        let mut out = Vec::with_capacity(select.items.len());
        for item in &select.items {
            match item {
                SelectItem::Wildcard => out.extend(row.iter().cloned()),
                SelectItem::Expression { expr, .. } => {
                    out.push(eval.eval(expr, &source_columns, Some(&row))?)
                }
            }
        }
        result.add_row(Row::from_values(out));
    }
    ctx.check_cancelled()?;
    Ok(result)
}

fn aggregate(
    ctx: &ExecutionContext,
    eval: &Evaluator<'_>,
    select: &SelectStatement,
    source_columns: &[String],
    output_columns: Vec<String>,
    rows: Box<dyn Iterator<Item = Result<Row>> + Send>,
    check_every: usize,
) -> Result<MemoryResult> {
    let mut states = Vec::with_capacity(select.items.len());
    for item in &select.items {
        match item {
            SelectItem::Expression {
                expr: Expression::Aggregate { function, arg },
                ..
            } => states.push(Some((AggregateState::new(*function), arg.as_deref()))),
            SelectItem::Expression { .. } => states.push(None),
            SelectItem::Wildcard => {
                return Err(Error::invalid_input(
                    "* cannot be combined with aggregate functions",
                ))
            }
        }
    }

    for (i, row) in rows.enumerate() {
        if i % check_every == 0 {
            ctx.check_cancelled()?;
        }
        let row = row?;
        for (state, arg) in states.iter_mut().flatten() {
            let input = match *arg {
                Some(expr) => Some(eval.eval(expr, source_columns, Some(&row))?),
                None => None,
            };
            state.update(input)?;
        }
    }
    ctx.check_cancelled()?;

    let mut out = Vec::with_capacity(select.items.len());
    for (item, state) in select.items.iter().zip(states) {
        match (item, state) {
            (_, Some((state, _))) => out.push(state.finish()),
            (SelectItem::Expression { expr, .. }, None) => {
                out.push(eval.eval(expr, source_columns, None)?)
            }
            (SelectItem::Wildcard, None) => {}
        }
    }
    Ok(MemoryResult::with_rows(
        output_columns,
        vec![Row::from_values(out)],
    ))
}

fn output_columns(select: &SelectStatement, source_columns: &[String]) -> Vec<String> {
    let mut columns = Vec::with_capacity(select.items.len());
    for item in &select.items {
        match item {
            SelectItem::Wildcard => columns.extend(source_columns.iter().cloned()),
            SelectItem::Expression {
                alias: Some(alias), ..
            } => columns.push(alias.clone()),
            SelectItem::Expression { expr, .. } => columns.push(expr.to_string()),
        }
    }
    columns
}

/// Evaluate INSERT value lists and coerce them to the table's column types
pub fn evaluate_insert_rows(
    ctx: &ExecutionContext,
    settings: SettingLookup<'_>,
    table: &str,
    types: &[DataType],
    rows: &[Vec<Expression>],
) -> Result<Vec<Row>> {
    let eval = Evaluator::new(ctx, settings).bind(rows.iter().flatten())?;
    let mut out = Vec::with_capacity(rows.len());
    for (i, exprs) in rows.iter().enumerate() {
        if i % CANCEL_CHECK_INTERVAL == 0 {
            ctx.check_cancelled()?;
        }
        if exprs.len() != types.len() {
            return Err(Error::invalid_input(format!(
                "table {} has {} columns but {} values were supplied",
                table,
                types.len(),
                exprs.len()
            )));
        }
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            values.push(eval.eval(expr, &[], None)?);
        }
        let row = Row::from_values(values)
            .coerce_to(types)
            .map_err(|e| match e {
                Error::InvalidInput(msg) => {
                    Error::invalid_input(format!("Conversion Error in table {}: {}", table, msg))
                }
                other => other,
            })?;
        out.push(row);
    }
    Ok(out)
}
