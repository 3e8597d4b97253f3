use num_bigint::BigInt;
use smol_str::SmolStr;

use crate::value::Arity;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while reading or evaluating.
///
/// Errors propagate on sight: the first one produced inside a form is handed
/// up unchanged and no sibling is evaluated after it. At the top level an
/// error is turned into an `Error` value for the front-end to print.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("unbound symbol '{0}'")]
    UnboundSymbol(SmolStr),

    #[error("incorrect number of arguments to {name}. expected {expected}, got {got}")]
    Arity {
        name: SmolStr,
        expected: Arity,
        got: usize,
    },

    #[error("argument to {name} is not of type {expected}, got {got}")]
    Type {
        name: SmolStr,
        expected: &'static str,
        got: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("index {index} out of bounds in '{name}' (length {len})")]
    IndexOutOfBounds {
        name: SmolStr,
        index: BigInt,
        len: usize,
    },

    /// A builtin was asked for more memory than could be had.
    #[error("cannot allocate {size} elements in '{name}'")]
    Alloc { name: SmolStr, size: BigInt },

    #[error("first object in list is not a function, got {0}")]
    NotCallable(&'static str),

    /// Raised by the `raise` builtin.
    #[error("{0}")]
    UserRaised(String),

    #[error("unable to load '{path}': {message}")]
    Load { path: String, message: String },

    #[error("i/o error: {0}")]
    Io(String),

    /// Raised by `exit`. Unwinds all evaluation back to the front-end.
    #[error("exit with status {0}")]
    Exit(i32),
}

impl Error {
    pub fn syntax(message: impl Into<String>) -> Self {
        Error::Syntax(message.into())
    }

    pub fn arity(name: impl Into<SmolStr>, expected: Arity, got: usize) -> Self {
        Error::Arity {
            name: name.into(),
            expected,
            got,
        }
    }

    pub fn type_error(name: impl Into<SmolStr>, expected: &'static str, got: &'static str) -> Self {
        Error::Type {
            name: name.into(),
            expected,
            got,
        }
    }
}

/// The front-end asked to terminate with the given status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exit(pub i32);

impl std::fmt::Display for Exit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "exit with status {}", self.0)
    }
}
