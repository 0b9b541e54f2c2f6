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

//! Recursive-descent parser for the reference dialect

use super::ast::*;
use super::lexer::Lexer;
use super::token::{Token, TokenType};
use crate::core::{DataType, Error, Result, Value};

/// SQL Parser
pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
    /// Next number handed to a `?` placeholder
    next_placeholder: usize,
}

impl Parser {
    /// Create a new parser for the given input
    pub fn new(input: &str) -> Self {
        Self {
            tokens: Lexer::new(input).tokenize(),
            index: 0,
            next_placeholder: 1,
        }
    }

    /// Parse exactly one statement; a trailing `;` is optional
    pub fn parse_statement(&mut self) -> Result<Statement> {
        if self.current().is_eof() || self.only_semicolons_left() {
            return Err(Error::invalid_input("No statement to prepare!"));
        }
        let statement = self.parse_inner()?;
        while self.current().is_symbol(";") {
            self.advance();
        }
        if !self.current().is_eof() {
            return Err(self.unexpected());
        }
        Ok(statement)
    }

    fn parse_inner(&mut self) -> Result<Statement> {
        let token = self.current().clone();
        match token.token_type {
            TokenType::Keyword => match token.literal.as_str() {
                "SELECT" => self.parse_select().map(Statement::Select),
                "CREATE" => self.parse_create().map(Statement::CreateTable),
                "DROP" => self.parse_drop().map(Statement::DropTable),
                "INSERT" => self.parse_insert().map(Statement::Insert),
                "BEGIN" => {
                    self.advance();
                    self.accept_keyword("TRANSACTION");
                    Ok(Statement::Begin)
                }
                "COMMIT" => {
                    self.advance();
                    self.accept_keyword("TRANSACTION");
                    Ok(Statement::Commit)
                }
                "ROLLBACK" => {
                    self.advance();
                    self.accept_keyword("TRANSACTION");
                    Ok(Statement::Rollback)
                }
                _ => Err(self.unexpected()),
            },
            _ => Err(self.unexpected()),
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect_keyword("SELECT")?;
        let mut items = vec![self.parse_select_item()?];
        while self.accept_symbol(",") {
            items.push(self.parse_select_item()?);
        }
        let from = if self.accept_keyword("FROM") {
            Some(self.parse_table_source()?)
        } else {
            None
        };
        Ok(SelectStatement { items, from })
    }

    fn parse_select_item(&mut self) -> Result<SelectItem> {
        if self.accept_symbol("*") {
            return Ok(SelectItem::Wildcard);
        }
        let expr = self.parse_expression()?;
        let alias = if self.accept_keyword("AS") {
            Some(self.expect_identifier()?)
        } else if self.current().token_type == TokenType::Identifier {
            Some(self.expect_identifier()?)
        } else {
            None
        };
        Ok(SelectItem::Expression { expr, alias })
    }

    fn parse_table_source(&mut self) -> Result<TableSource> {
        let name = self.expect_identifier()?;
        if !self.accept_symbol("(") {
            return Ok(TableSource::Table(name));
        }
        let mut args = Vec::new();
        if !self.accept_symbol(")") {
            loop {
                args.push(self.parse_function_argument()?);
                if self.accept_symbol(")") {
                    break;
                }
                self.expect_symbol(",")?;
            }
        }
        Ok(TableSource::Function { name, args })
    }

    fn parse_function_argument(&mut self) -> Result<FunctionArgument> {
        let is_named = self.current().token_type == TokenType::Identifier
            && self.peek(1).is_symbol(":=");
        if is_named {
            let name = self.expect_identifier()?;
            self.advance(); // :=
            return Ok(FunctionArgument::Named(name, self.parse_expression()?));
        }
        Ok(FunctionArgument::Positional(self.parse_expression()?))
    }

    fn parse_create(&mut self) -> Result<CreateTableStatement> {
        self.expect_keyword("CREATE")?;
        self.expect_keyword("TABLE")?;
        let if_not_exists = if self.accept_keyword("IF") {
            self.expect_keyword("NOT")?;
            self.expect_keyword("EXISTS")?;
            true
        } else {
            false
        };
        let name = self.expect_identifier()?;
        self.expect_symbol("(")?;
        let mut columns = Vec::new();
        loop {
            let column = self.expect_identifier()?;
            let type_token = self.current().clone();
            if type_token.token_type != TokenType::Identifier {
                return Err(self.unexpected());
            }
            self.advance();
            let data_type = type_token.literal.parse::<DataType>()?;
            columns.push(ColumnDefinition {
                name: column,
                data_type,
            });
            if self.accept_symbol(")") {
                break;
            }
            self.expect_symbol(",")?;
        }
        Ok(CreateTableStatement {
            name,
            if_not_exists,
            columns,
        })
    }

    fn parse_drop(&mut self) -> Result<DropTableStatement> {
        self.expect_keyword("DROP")?;
        self.expect_keyword("TABLE")?;
        let if_exists = if self.accept_keyword("IF") {
            self.expect_keyword("EXISTS")?;
            true
        } else {
            false
        };
        let name = self.expect_identifier()?;
        Ok(DropTableStatement { name, if_exists })
    }

    fn parse_insert(&mut self) -> Result<InsertStatement> {
        self.expect_keyword("INSERT")?;
        self.expect_keyword("INTO")?;
        let table = self.expect_identifier()?;
        self.expect_keyword("VALUES")?;
        let mut rows = Vec::new();
        loop {
            self.expect_symbol("(")?;
            let mut row = vec![self.parse_expression()?];
            while self.accept_symbol(",") {
                row.push(self.parse_expression()?);
            }
            self.expect_symbol(")")?;
            rows.push(row);
            if !self.accept_symbol(",") {
                break;
            }
        }
        Ok(InsertStatement { table, rows })
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn parse_expression(&mut self) -> Result<Expression> {
        let token = self.current().clone();
        match token.token_type {
            TokenType::Integer => {
                self.advance();
                token
                    .literal
                    .parse::<i64>()
                    .map(|v| Expression::Literal(Value::Integer(v)))
                    .map_err(|_| Error::parse(format!("integer out of range: {}", token.literal)))
            }
            TokenType::Float => {
                self.advance();
                token
                    .literal
                    .parse::<f64>()
                    .map(|v| Expression::Literal(Value::Float(v)))
                    .map_err(|_| Error::parse(format!("invalid number: {}", token.literal)))
            }
            TokenType::String => {
                self.advance();
                Ok(Expression::Literal(Value::text(&token.literal)))
            }
            TokenType::Parameter => {
                self.advance();
                if token.literal == "?" {
                    let n = self.next_placeholder;
                    self.next_placeholder += 1;
                    return Ok(Expression::Parameter(n));
                }
                match token.literal[1..].parse::<usize>() {
                    Ok(n) if n > 0 => Ok(Expression::Parameter(n)),
                    _ => Err(Error::parse(format!(
                        "invalid parameter reference {}",
                        token.literal
                    ))),
                }
            }
            TokenType::Keyword => match token.literal.as_str() {
                "NULL" => {
                    self.advance();
                    Ok(Expression::Literal(Value::Null))
                }
                "TRUE" => {
                    self.advance();
                    Ok(Expression::Literal(Value::Boolean(true)))
                }
                "FALSE" => {
                    self.advance();
                    Ok(Expression::Literal(Value::Boolean(false)))
                }
                _ => Err(self.unexpected()),
            },
            TokenType::Operator if token.literal == "-" => {
                self.advance();
                let inner = self.parse_expression()?;
                Ok(match inner {
                    Expression::Literal(Value::Integer(v)) => {
                        Expression::Literal(Value::Integer(-v))
                    }
                    Expression::Literal(Value::Float(v)) => Expression::Literal(Value::Float(-v)),
                    other => Expression::Negate(Box::new(other)),
                })
            }
            TokenType::Identifier => {
                self.advance();
                if !self.accept_symbol("(") {
                    return Ok(Expression::Column(token.literal));
                }
                self.parse_call(token.literal)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Parse the argument list after `name(`
    fn parse_call(&mut self, name: String) -> Result<Expression> {
        if let Some(function) = Aggregate::from_name(&name) {
            if function == Aggregate::Count && self.accept_symbol("*") {
                self.expect_symbol(")")?;
                return Ok(Expression::Aggregate {
                    function: Aggregate::CountStar,
                    arg: None,
                });
            }
            let arg = self.parse_expression()?;
            self.expect_symbol(")")?;
            return Ok(Expression::Aggregate {
                function,
                arg: Some(Box::new(arg)),
            });
        }

        let mut args = Vec::new();
        if !self.accept_symbol(")") {
            loop {
                args.push(self.parse_expression()?);
                if self.accept_symbol(")") {
                    break;
                }
                self.expect_symbol(",")?;
            }
        }
        Ok(Expression::Call { name, args })
    }

    // =========================================================================
    // Token helpers
    // =========================================================================

    fn current(&self) -> &Token {
        self.peek(0)
    }

    fn peek(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.index + n).min(last)]
    }

    fn advance(&mut self) {
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
    }

    fn only_semicolons_left(&self) -> bool {
        self.tokens[self.index..]
            .iter()
            .all(|t| t.is_eof() || t.is_symbol(";"))
    }

    fn accept_keyword(&mut self, keyword: &str) -> bool {
        if self.current().is_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.accept_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn accept_symbol(&mut self, symbol: &str) -> bool {
        if self.current().is_symbol(symbol) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, symbol: &str) -> Result<()> {
        if self.accept_symbol(symbol) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        let token = self.current();
        if token.token_type == TokenType::Identifier {
            let name = token.literal.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> Error {
        let token = self.current();
        if token.token_type == TokenType::Error {
            return Error::parse(format!(
                "{} at {}",
                token.literal, token.position
            ));
        }
        Error::parse(format!(
            "syntax error at or near {} ({})",
            token, token.position
        ))
    }
}
