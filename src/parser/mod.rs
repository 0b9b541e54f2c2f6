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

//! SQL Parser
//!
//! Parser for the small dialect understood by the reference engine:
//!
//! - [`Lexer`] - Tokenizer for SQL input
//! - [`Parser`] - Parser that builds AST from tokens
//! - [`ast`] - Abstract Syntax Tree types
//! - [`token`] - Token types
//!
//! # Example
//!
//! ```
//! use stoolap_client::parser::{parse_sql, Statement};
//!
//! let stmt = parse_sql("SELECT * FROM range(10)").unwrap();
//! assert!(matches!(stmt, Statement::Select(_)));
//! ```

pub mod ast;
pub mod lexer;
#[allow(clippy::module_inception)]
pub mod parser;
pub mod token;

// Re-export main types
pub use ast::{
    Aggregate, ColumnDefinition, CreateTableStatement, DropTableStatement, Expression,
    FunctionArgument, InsertStatement, SelectItem, SelectStatement, Statement, TableSource,
};
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{Position, Token, TokenType};

use crate::core::Result;

/// Parse a single SQL statement
pub fn parse_sql(sql: &str) -> Result<Statement> {
    Parser::new(sql).parse_statement()
}
