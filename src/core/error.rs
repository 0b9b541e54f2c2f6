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

//! Error types for the client layer
//!
//! Lifecycle errors (closed handles, transaction misuse, registration
//! conflicts) are reported by the call that violates the invariant. Engine
//! failures are wrapped in [`Error::Execution`] with the connection or cursor
//! that issued the statement, except for the variants callers are expected to
//! branch on (interruption, catalog lookups, schema mismatches, bad input),
//! which always pass through unchanged.

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the client layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // =========================================================================
    // Lifecycle errors
    // =========================================================================
    /// Incompatible cache reuse, unrecognized option, bad storage target
    #[error("Configuration Error: {0}")]
    Configuration(String),

    /// Operation on a connection that has been closed
    #[error("Connection Error: Connection already closed!")]
    ConnectionClosed,

    /// Operation on a cursor that has been closed
    #[error("Connection Error: Cursor already closed!")]
    CursorClosed,

    /// BEGIN/COMMIT/ROLLBACK issued in the wrong transaction state
    #[error("TransactionContext Error: {0}")]
    TransactionState(String),

    // =========================================================================
    // Execution errors
    // =========================================================================
    /// The running query was cancelled by an interrupt request
    #[error("INTERRUPT Error: Interrupted!")]
    Interrupted,

    /// Duplicate registration or unknown name on unregister
    #[error("Invalid Input Error: {0}")]
    FunctionRegistration(String),

    /// A table function produced data that does not match its declared schema
    #[error("Invalid Input Error: Table function '{function}' schema mismatch: {detail}")]
    SchemaMismatch { function: String, detail: String },

    /// Engine-level object lookup failure (table, function)
    #[error("Catalog Error: {0}")]
    Catalog(String),

    /// Caller supplied invalid arguments
    #[error("Invalid Input Error: {0}")]
    InvalidInput(String),

    /// Statement could not be parsed by the engine
    #[error("Parser Error: {0}")]
    Parse(String),

    /// Engine failure with the issuing connection/cursor attached
    #[error("{context}: {message}")]
    Execution { context: String, message: String },

    /// IO error (wrapped)
    #[error("IO Error: {message}")]
    Io { message: String },

    /// Internal error for unexpected conditions
    #[error("INTERNAL Error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new Configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    /// Create a new TransactionState error
    pub fn transaction_state(message: impl Into<String>) -> Self {
        Error::TransactionState(message.into())
    }

    /// Create a new FunctionRegistration error
    pub fn function_registration(message: impl Into<String>) -> Self {
        Error::FunctionRegistration(message.into())
    }

    /// Create a new SchemaMismatch error
    pub fn schema_mismatch(function: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::SchemaMismatch {
            function: function.into(),
            detail: detail.into(),
        }
    }

    /// Create a new Catalog error
    pub fn catalog(message: impl Into<String>) -> Self {
        Error::Catalog(message.into())
    }

    /// Create a new InvalidInput error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }

    /// Create a new Parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Error::Parse(message.into())
    }

    /// Create a new Execution error
    pub fn execution(context: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Execution {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a new IO error
    pub fn io(message: impl Into<String>) -> Self {
        Error::Io {
            message: message.into(),
        }
    }

    /// Create a new Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Attach the issuing connection/cursor to an engine failure.
    ///
    /// Variants callers branch on are returned unchanged, and an error that
    /// already carries context keeps its original one.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        match self {
            Error::Parse(message) | Error::Io { message } | Error::Internal { message } => {
                Error::Execution {
                    context: context.into(),
                    message,
                }
            }
            other => other,
        }
    }

    /// Check if the query was cancelled by request
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Interrupted)
    }

    /// Check if this error reports use of a closed handle
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::ConnectionClosed | Error::CursorClosed)
    }

    /// Check if this is a "not found" type error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Catalog(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Io {
            message: format!("snapshot encoding: {}", err),
        }
    }
}
