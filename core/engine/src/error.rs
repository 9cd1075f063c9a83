//! Error types produced by the engine and by the debugger subsystem.

use std::fmt;

/// A value-carrying error returned from engine operations.
///
/// Mirrors the shape of Boa's own `JsError`: a tagged native error plus an
/// optional human-readable message, cheap to clone and to hand across the
/// debugger/DAP boundary.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct JsError {
    kind: JsErrorKind,
    message: String,
}

impl JsError {
    /// Build an error from a kind and message.
    pub fn new(kind: JsErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The error's category.
    pub fn kind(&self) -> JsErrorKind {
        self.kind
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Broad category of an engine-level error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsErrorKind {
    /// Malformed source text.
    Syntax,
    /// A runtime type mismatch.
    Type,
    /// Reference to an unbound identifier.
    Reference,
    /// Any other runtime error (`Error` in the scripting language).
    Runtime,
    /// Execution was cancelled by a debugger `terminate()` request. Distinct
    /// from `Runtime` so callers can tell a deliberate shutdown apart from
    /// a script fault.
    Cancelled,
}

impl fmt::Display for JsErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JsErrorKind::Syntax => "SyntaxError",
            JsErrorKind::Type => "TypeError",
            JsErrorKind::Reference => "ReferenceError",
            JsErrorKind::Runtime => "Error",
            JsErrorKind::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}

/// Convenience constructors used throughout lexing/parsing/evaluation.
impl JsError {
    /// Build a `SyntaxError`.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(JsErrorKind::Syntax, message)
    }

    /// Build a `TypeError`.
    pub fn typ(message: impl Into<String>) -> Self {
        Self::new(JsErrorKind::Type, message)
    }

    /// Build a `ReferenceError`.
    pub fn reference(message: impl Into<String>) -> Self {
        Self::new(JsErrorKind::Reference, message)
    }

    /// Build a generic runtime `Error`.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(JsErrorKind::Runtime, message)
    }
}

/// The result type returned by evaluation and debugger operations alike.
pub type JsResult<T> = Result<T, JsError>;
