//! Boa's JavaScript Debugger API
//!
//! This module provides a comprehensive debugging interface for JavaScript code
//! running in the Boa engine, inspired by SpiderMonkey's debugger architecture.
//!
//! # Overview
//!
//! The debugger API consists of several key components:
//!
//! - [`Debugger`]: the Session Controller, attached to a [`crate::Context`]
//!   through [`crate::context::HostHooks`] (`Debugger` implements the trait
//!   directly — no separate adapter type)
//! - [`script_registry::ScriptRegistry`]: tracks registered scripts and
//!   snaps requested breakpoint positions to valid statement boundaries
//! - [`breakpoint::BreakpointTable`]: breakpoint storage and hit evaluation
//! - [`variable_store::VariableStore`]: monotonic variable-reference handles
//!   backing DAP `variables`/`setVariable` requests
//! - [`DebuggerFrame`]: a read-only view over one call-stack frame, handed
//!   to the DAP layer for `stackTrace`/`scopes` responses
//! - [`dap`]: the Debug Adapter Protocol transport and session glue
//!
//! # Architecture
//!
//! The Session Controller observes execution through two callbacks the
//! engine invokes at every statement boundary:
//!
//! - `on_step`: an ordinary statement, no breakpoint bound
//! - `on_break`: a statement bound to a breakpoint, or a `debugger;` statement
//!
//! Both run on the interpreter thread and may block it, rendezvousing with
//! the client-facing thread through a condvar.
//!
//! # Example
//!
//! ```rust,ignore
//! use boa_engine::{ContextBuilder, Source};
//! use boa_engine::debugger::Debugger;
//!
//! let debugger = Debugger::new();
//! let mut context = ContextBuilder::new()
//!     .host_hooks(std::rc::Rc::new(debugger.clone()))
//!     .build()
//!     .unwrap();
//! debugger.attach(&mut context).unwrap();
//! debugger.notify_ui_ready().unwrap();
//! context.eval(&Source::from_bytes("debugger; var x = 1;")).unwrap();
//! ```

pub mod breakpoint;
pub mod dap;
pub mod reflection;
pub mod script_registry;
pub mod state;
pub mod variable_store;

pub use reflection::DebuggerFrame;
pub use script_registry::{ScriptInfo, ScriptRegistry};
pub use state::{
    BreakKind, DebugError, DebugEvent, DebugInformation, Debugger, DebuggerState, PauseReason,
    StepIntent, StepMode,
};
pub use variable_store::{Handle, ValueInfo, VariableStore};

/// Result type for Session Controller operations.
pub type DebugResult<T> = state::DebugResult<T>;

/// Unique identifier for a script or code block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScriptId(pub(crate) usize);

/// Unique identifier for a call frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub(crate) usize);
