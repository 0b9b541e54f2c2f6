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

//! Expression evaluation
//!
//! Expressions are evaluated against an optional current row. Scalar
//! function calls are bound once per statement by [`Evaluator::bind`], so
//! every row of a statement runs the same callable even if the registry
//! changes mid-statement. `current_setting(name)` is answered by the engine.

use std::cmp::Ordering;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::context::ExecutionContext;
use crate::core::{Error, Result, Row, Value};
use crate::functions::ScalarFunction;
use crate::parser::{Aggregate, Expression};

const CURRENT_SETTING: &str = "current_setting";

/// Reads back instance settings for `current_setting`
pub type SettingLookup<'a> = &'a dyn Fn(&str) -> Option<Value>;

/// Expression evaluator bound to one statement
pub struct Evaluator<'a> {
    ctx: &'a ExecutionContext,
    settings: SettingLookup<'a>,
    scalars: FxHashMap<String, Arc<ScalarFunction>>,
}

impl<'a> Evaluator<'a> {
    pub fn new(ctx: &'a ExecutionContext, settings: SettingLookup<'a>) -> Self {
        Self {
            ctx,
            settings,
            scalars: FxHashMap::default(),
        }
    }

    /// Resolve every scalar function called by `exprs`
    ///
    /// Unknown functions fail here, before any row is produced. Calls to
    /// functions that were not bound fail at evaluation time.
    pub fn bind<'e>(mut self, exprs: impl IntoIterator<Item = &'e Expression>) -> Result<Self> {
        let mut names = Vec::new();
        for expr in exprs {
            collect_calls(expr, &mut names);
        }
        for name in names {
            let key = name.to_lowercase();
            if key == CURRENT_SETTING || self.scalars.contains_key(&key) {
                continue;
            }
            let function = self.ctx.functions().resolve_scalar(name).ok_or_else(|| {
                Error::catalog(format!("Scalar Function with name {} does not exist!", name))
            })?;
            self.scalars.insert(key, function);
        }
        Ok(self)
    }

    /// Evaluate a non-aggregate expression
    pub fn eval(&self, expr: &Expression, columns: &[String], row: Option<&Row>) -> Result<Value> {
        match expr {
            Expression::Literal(v) => Ok(v.clone()),
            Expression::Parameter(n) => self.ctx.get_param(*n).cloned().ok_or_else(|| {
                Error::invalid_input(format!(
                    "Values were not provided for the following prepared statement parameters: {}",
                    n
                ))
            }),
            Expression::Column(name) => {
                let index = column_index(columns, name)?;
                match row {
                    Some(row) => Ok(row.get(index).cloned().unwrap_or(Value::Null)),
                    None => Err(Error::invalid_input(format!(
                        "column \"{}\" must appear in the GROUP BY clause or must be part of an aggregate function",
                        name
                    ))),
                }
            }
            Expression::Negate(inner) => match self.eval(inner, columns, row)? {
                Value::Null => Ok(Value::Null),
                Value::Integer(i) => i
                    .checked_neg()
                    .map(Value::Integer)
                    .ok_or_else(|| Error::invalid_input("integer out of range")),
                Value::Float(f) => Ok(Value::Float(-f)),
                other => Err(Error::invalid_input(format!(
                    "cannot negate a value of type {}",
                    other.data_type()
                ))),
            },
            Expression::Call { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, columns, row)?);
                }
                self.call(name, values)
            }
            Expression::Aggregate { .. } => Err(Error::internal(
                "aggregate evaluated outside of an aggregation",
            )),
        }
    }

    fn call(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        if name.eq_ignore_ascii_case(CURRENT_SETTING) {
            let key = match args.as_slice() {
                [Value::Text(key)] => key.to_lowercase(),
                _ => {
                    return Err(Error::invalid_input(
                        "current_setting requires a single VARCHAR argument",
                    ))
                }
            };
            return (self.settings)(&key).ok_or_else(|| {
                Error::catalog(format!("unrecognized configuration parameter \"{}\"", key))
            });
        }

        match self.scalars.get(&name.to_lowercase()) {
            Some(function) => function.invoke(args),
            None => Err(Error::catalog(format!(
                "Scalar Function with name {} does not exist!",
                name
            ))),
        }
    }
}

fn collect_calls<'e>(expr: &'e Expression, out: &mut Vec<&'e str>) {
    match expr {
        Expression::Call { name, args } => {
            out.push(name);
            for arg in args {
                collect_calls(arg, out);
            }
        }
        Expression::Negate(inner) => collect_calls(inner, out),
        Expression::Aggregate { arg: Some(arg), .. } => collect_calls(arg, out),
        Expression::Literal(_)
        | Expression::Parameter(_)
        | Expression::Column(_)
        | Expression::Aggregate { arg: None, .. } => {}
    }
}

/// Find a column by name (case-insensitive)
pub fn column_index(columns: &[String], name: &str) -> Result<usize> {
    columns
        .iter()
        .position(|c| c.eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::catalog(format!("Referenced column \"{}\" not found", name)))
}

/// Running state of one aggregate
#[derive(Debug, Clone)]
pub struct AggregateState {
    function: Aggregate,
    count: i64,
    value: Value,
}

impl AggregateState {
    pub fn new(function: Aggregate) -> Self {
        Self {
            function,
            count: 0,
            value: Value::Null,
        }
    }

    /// Fold one input value (ignored for COUNT(*))
    pub fn update(&mut self, input: Option<Value>) -> Result<()> {
        let input = match (self.function, input) {
            (Aggregate::CountStar, _) => {
                self.count += 1;
                return Ok(());
            }
            (_, None) | (_, Some(Value::Null)) => return Ok(()),
            (_, Some(v)) => v,
        };
        self.count += 1;
        match self.function {
            Aggregate::CountStar | Aggregate::Count => {}
            Aggregate::Sum => {
                self.value = match (&self.value, &input) {
                    (Value::Null, v) if v.data_type().is_numeric() => v.clone(),
                    (Value::Integer(a), Value::Integer(b)) => match a.checked_add(*b) {
                        Some(sum) => Value::Integer(sum),
                        None => Value::Float(*a as f64 + *b as f64),
                    },
                    (a, b) => match (a.as_float64(), b.as_float64()) {
                        (Some(x), Some(y)) if b.data_type().is_numeric() => Value::Float(x + y),
                        _ => {
                            return Err(Error::invalid_input(format!(
                                "sum(): cannot aggregate values of type {}",
                                input.data_type()
                            )))
                        }
                    },
                };
            }
            Aggregate::Min => {
                if self.value.is_null() || input.compare(&self.value) == Ordering::Less {
                    self.value = input;
                }
            }
            Aggregate::Max => {
                if self.value.is_null() || input.compare(&self.value) == Ordering::Greater {
                    self.value = input;
                }
            }
        }
        Ok(())
    }

    /// Final value
    pub fn finish(self) -> Value {
        match self.function {
            Aggregate::CountStar | Aggregate::Count => Value::Integer(self.count),
            _ => self.value,
        }
    }
}
