// ABOUTME: Error types for lexing, parsing, compiling, and running Flow programs

use thiserror::Error;

// ===== Arity constant strings (eliminates allocations in error paths) =====
pub const ARITY_ONE: &str = "1";
pub const ARITY_TWO: &str = "2";
pub const ARITY_THREE: &str = "3";
pub const ARITY_AT_LEAST_ONE: &str = "at least 1";
pub const ARITY_ZERO_OR_ONE: &str = "0-1";
pub const ARITY_ONE_OR_TWO: &str = "1-2";

pub const ERR_SANDBOX_NOT_INIT: &str = "sandbox not initialized";

/// Top-level error type a driver sees: a source position (when known) plus
/// which stage produced the failure. All four kinds are fatal to top-level
/// evaluation; Flow has no user-level try/catch.
#[derive(Error, Debug, Clone)]
pub enum FlowError {
    #[error("lex error at {0}")]
    Lex(#[from] LexError),

    #[error("parse error at {0}")]
    Parse(#[from] ParseError),

    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

#[derive(Error, Debug, Clone)]
#[error("{line}:{column}: {message}")]
pub struct LexError {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

#[derive(Error, Debug, Clone)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct CompileError(pub String);

#[derive(Error, Debug, Clone)]
pub enum RuntimeError {
    #[error("name error: undefined name '{name}'")]
    Name { name: String },

    #[error("type error in {operation}: expected {expected}, got {actual}")]
    Type {
        operation: String,
        expected: String,
        actual: String,
    },

    #[error("value error in {operation}: {message}")]
    Value { operation: String, message: String },

    #[error("{function}: expected {expected} argument{}, got {actual}", if *.expected == "1" { "" } else { "s" })]
    Arity {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("index error in {operation}: index {index} out of bounds for length {length}")]
    Index {
        operation: String,
        index: i64,
        length: usize,
    },

    #[error("io error in {operation}: {message}")]
    Io { operation: String, message: String },

    #[error("{function}: {message}")]
    Other { function: String, message: String },
}

impl RuntimeError {
    pub fn name(name: impl Into<String>) -> Self {
        RuntimeError::Name { name: name.into() }
    }

    pub fn type_error(
        operation: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        RuntimeError::Type {
            operation: operation.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn value(operation: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError::Value {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn arity(function: impl Into<String>, expected: impl Into<String>, actual: usize) -> Self {
        RuntimeError::Arity {
            function: function.into(),
            expected: expected.into(),
            actual,
        }
    }

    pub fn index(operation: impl Into<String>, index: i64, length: usize) -> Self {
        RuntimeError::Index {
            operation: operation.into(),
            index,
            length,
        }
    }

    pub fn io(operation: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError::Io {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn other(function: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError::Other {
            function: function.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_message_is_singular_for_one() {
        let err = RuntimeError::arity("f", ARITY_ONE, 0);
        assert_eq!(err.to_string(), "f: expected 1 argument, got 0");
    }

    #[test]
    fn arity_message_is_plural_for_many() {
        let err = RuntimeError::arity("f", ARITY_TWO, 3);
        assert_eq!(err.to_string(), "f: expected 2 arguments, got 3");
    }

    #[test]
    fn flow_error_wraps_runtime_error() {
        let err: FlowError = RuntimeError::name("x").into();
        assert!(matches!(err, FlowError::Runtime(_)));
    }
}
