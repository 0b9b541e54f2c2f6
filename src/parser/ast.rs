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

//! AST (Abstract Syntax Tree) for the reference dialect

use std::fmt;

use crate::core::{DataType, Value};

/// A parsed statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateTableStatement),
    DropTable(DropTableStatement),
    Insert(InsertStatement),
    Select(SelectStatement),
    Begin,
    Commit,
    Rollback,
}

impl Statement {
    /// Highest parameter number referenced by the statement
    pub fn parameter_count(&self) -> usize {
        let exprs: Vec<&Expression> = match self {
            Statement::Insert(insert) => insert.rows.iter().flatten().collect(),
            Statement::Select(select) => {
                let mut exprs: Vec<&Expression> = select
                    .items
                    .iter()
                    .filter_map(|item| match item {
                        SelectItem::Expression { expr, .. } => Some(expr),
                        SelectItem::Wildcard => None,
                    })
                    .collect();
                if let Some(TableSource::Function { args, .. }) = &select.from {
                    exprs.extend(args.iter().map(|arg| match arg {
                        FunctionArgument::Positional(expr) | FunctionArgument::Named(_, expr) => {
                            expr
                        }
                    }));
                }
                exprs
            }
            _ => Vec::new(),
        };
        exprs
            .into_iter()
            .map(Expression::max_parameter)
            .max()
            .unwrap_or(0)
    }
}

/// CREATE TABLE [IF NOT EXISTS] name (col TYPE, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    pub name: String,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnDefinition>,
}

/// Column definition in CREATE TABLE
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
}

/// DROP TABLE [IF EXISTS] name
#[derive(Debug, Clone, PartialEq)]
pub struct DropTableStatement {
    pub name: String,
    pub if_exists: bool,
}

/// INSERT INTO name VALUES (...), (...)
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub rows: Vec<Vec<Expression>>,
}

/// SELECT items [FROM source]
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub items: Vec<SelectItem>,
    pub from: Option<TableSource>,
}

impl SelectStatement {
    /// Returns true if any item is an aggregate
    pub fn has_aggregates(&self) -> bool {
        self.items.iter().any(|item| match item {
            SelectItem::Expression { expr, .. } => expr.is_aggregate(),
            SelectItem::Wildcard => false,
        })
    }
}

/// One entry of a SELECT list
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Wildcard,
    Expression {
        expr: Expression,
        alias: Option<String>,
    },
}

/// FROM clause source
#[derive(Debug, Clone, PartialEq)]
pub enum TableSource {
    /// A catalog table
    Table(String),
    /// A table function call, including the built-in range(n)
    Function {
        name: String,
        args: Vec<FunctionArgument>,
    },
}

/// Argument of a table function call
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionArgument {
    Positional(Expression),
    Named(String, Expression),
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    CountStar,
    Count,
    Sum,
    Min,
    Max,
}

impl Aggregate {
    /// Resolve an aggregate by name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "COUNT" => Some(Aggregate::Count),
            "SUM" => Some(Aggregate::Sum),
            "MIN" => Some(Aggregate::Min),
            "MAX" => Some(Aggregate::Max),
            _ => None,
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregate::CountStar | Aggregate::Count => write!(f, "count"),
            Aggregate::Sum => write!(f, "sum"),
            Aggregate::Min => write!(f, "min"),
            Aggregate::Max => write!(f, "max"),
        }
    }
}

/// Scalar expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    /// Positional parameter, 1-based
    Parameter(usize),
    Column(String),
    Negate(Box<Expression>),
    Call {
        name: String,
        args: Vec<Expression>,
    },
    Aggregate {
        function: Aggregate,
        arg: Option<Box<Expression>>,
    },
}

impl Expression {
    /// Returns true if this expression is an aggregate
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Expression::Aggregate { .. })
    }

    /// Highest parameter number referenced, 0 if none
    pub fn max_parameter(&self) -> usize {
        match self {
            Expression::Parameter(n) => *n,
            Expression::Negate(inner) => inner.max_parameter(),
            Expression::Call { args, .. } => {
                args.iter().map(Expression::max_parameter).max().unwrap_or(0)
            }
            Expression::Aggregate { arg: Some(arg), .. } => arg.max_parameter(),
            _ => 0,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(Value::Text(s)) => write!(f, "'{}'", s),
            Expression::Literal(v) => write!(f, "{}", v),
            Expression::Parameter(n) => write!(f, "${}", n),
            Expression::Column(name) => write!(f, "{}", name),
            Expression::Negate(inner) => write!(f, "-{}", inner),
            Expression::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expression::Aggregate { function, arg } => match arg {
                None => write!(f, "count_star()"),
                Some(arg) => write!(f, "{}({})", function, arg),
            },
        }
    }
}
