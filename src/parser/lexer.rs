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

//! SQL Lexer

use super::token::{is_keyword, is_punctuator, Position, Token, TokenType};

/// SQL Lexer for tokenizing input
pub struct Lexer {
    /// Input string
    input: Vec<char>,
    /// Current position in input (points to current char)
    position: usize,
    /// Current reading position in input (after current char)
    read_position: usize,
    /// Current character under examination
    ch: char,
    /// Current position tracking
    pos: Position,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let mut lexer = Self {
            input: chars,
            position: 0,
            read_position: 0,
            ch: '\0',
            pos: Position::new(0, 1, 1),
        };
        lexer.read_char();
        lexer
    }

    /// Read the next character
    fn read_char(&mut self) {
        if self.ch == '\n' {
            self.pos.line += 1;
            self.pos.column = 1;
        } else if self.ch != '\0' {
            self.pos.column += 1;
        }

        if self.read_position >= self.input.len() {
            self.ch = '\0'; // EOF
            self.position = self.input.len();
        } else {
            self.ch = self.input[self.read_position];
            self.position = self.read_position;
            self.read_position += 1;
        }

        self.pos.offset = self.position;
    }

    /// Peek at the next character without advancing
    fn peek_char(&self) -> char {
        if self.read_position >= self.input.len() {
            '\0'
        } else {
            self.input[self.read_position]
        }
    }

    /// Get the next token. Comments are skipped.
    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();
            if self.ch == '-' && self.peek_char() == '-' {
                while self.ch != '\n' && self.ch != '\0' {
                    self.read_char();
                }
                continue;
            }
            break;
        }

        let pos = self.pos;

        match self.ch {
            '\0' => Token::eof(pos),

            // String literal (single quotes, '' escapes a quote)
            '\'' => match self.read_string_literal() {
                Some(literal) => Token::new(TokenType::String, literal, pos),
                None => Token::new(TokenType::Error, "unterminated quoted string", pos),
            },

            // Double-quoted identifier
            '"' => match self.read_quoted_identifier() {
                Some(literal) => Token::new(TokenType::Identifier, literal, pos),
                None => Token::new(TokenType::Error, "unterminated quoted identifier", pos),
            },

            // Number literal
            c if c.is_ascii_digit() => {
                let literal = self.read_number();
                if literal.contains('.') {
                    Token::new(TokenType::Float, literal, pos)
                } else {
                    Token::new(TokenType::Integer, literal, pos)
                }
            }

            // Parameter ($1, $2, etc.)
            '$' if self.peek_char().is_ascii_digit() => {
                let literal = self.read_parameter();
                Token::new(TokenType::Parameter, literal, pos)
            }

            // Parameter (?)
            '?' => {
                self.read_char();
                Token::new(TokenType::Parameter, "?", pos)
            }

            // Named argument assignment
            ':' if self.peek_char() == '=' => {
                self.read_char();
                self.read_char();
                Token::new(TokenType::Operator, ":=", pos)
            }

            '*' | '-' => {
                let c = self.ch;
                self.read_char();
                Token::new(TokenType::Operator, c.to_string(), pos)
            }

            // Regular punctuator
            c if is_punctuator(c) => {
                self.read_char();
                Token::new(TokenType::Punctuator, c.to_string(), pos)
            }

            // Identifier or keyword
            c if c.is_alphabetic() || c == '_' => {
                let literal = self.read_identifier();
                if is_keyword(&literal) {
                    Token::new(TokenType::Keyword, literal.to_uppercase(), pos)
                } else {
                    Token::new(TokenType::Identifier, literal, pos)
                }
            }

            // Unrecognized character
            c => {
                self.read_char();
                Token::new(TokenType::Error, c.to_string(), pos)
            }
        }
    }

    /// Tokenize the whole input, ending with an EOF token
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.is_eof();
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    /// Skip whitespace characters
    fn skip_whitespace(&mut self) {
        while self.ch.is_whitespace() {
            self.read_char();
        }
    }

    /// Read an identifier
    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while self.ch.is_alphanumeric() || self.ch == '_' {
            result.push(self.ch);
            self.read_char();
        }
        result
    }

    /// Read a number (integer or float)
    fn read_number(&mut self) -> String {
        let mut result = String::new();
        let mut seen_dot = false;
        while self.ch.is_ascii_digit() || (self.ch == '.' && !seen_dot) {
            if self.ch == '.' {
                if !self.peek_char().is_ascii_digit() {
                    break;
                }
                seen_dot = true;
            }
            result.push(self.ch);
            self.read_char();
        }
        result
    }

    /// Read a $n parameter
    fn read_parameter(&mut self) -> String {
        let mut result = String::from("$");
        self.read_char();
        while self.ch.is_ascii_digit() {
            result.push(self.ch);
            self.read_char();
        }
        result
    }

    /// Read a single-quoted string, returning None if unterminated
    fn read_string_literal(&mut self) -> Option<String> {
        let mut result = String::new();
        self.read_char(); // opening quote
        loop {
            match self.ch {
                '\0' => return None,
                '\'' if self.peek_char() == '\'' => {
                    result.push('\'');
                    self.read_char();
                    self.read_char();
                }
                '\'' => {
                    self.read_char();
                    return Some(result);
                }
                c => {
                    result.push(c);
                    self.read_char();
                }
            }
        }
    }

    /// Read a double-quoted identifier, returning None if unterminated
    fn read_quoted_identifier(&mut self) -> Option<String> {
        let mut result = String::new();
        self.read_char(); // opening quote
        loop {
            match self.ch {
                '\0' => return None,
                '"' => {
                    self.read_char();
                    return Some(result);
                }
                c => {
                    result.push(c);
                    self.read_char();
                }
            }
        }
    }
}
