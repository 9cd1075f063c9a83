//! A small, embeddable scripting engine built to exercise a debugger
//! subsystem end to end: parsing, tree-walking evaluation, and a Debug
//! Adapter Protocol-facing debugger (Script Registry, Breakpoint Table,
//! Variable Store, Session Controller).
//!
//! The engine itself is deliberately small — just enough of a dynamically
//! typed, JavaScript-flavored language to drive breakpoints, stepping, and
//! variable inspection — so that the debugger subsystem, not the language,
//! is what this crate is really about.

pub mod ast;
pub mod context;
pub mod debugger;
pub mod error;
mod lexer;
mod parser;
pub mod source;
pub mod value;
mod vm;

pub use context::{Context, ContextBuilder};
pub use error::{JsError, JsErrorKind, JsResult};
pub use source::Source;
pub use value::JsValue;
