//! The evaluation context: global state, the call stack, and the seam
//! through which the debugger observes and drives execution.

use std::fmt;
use std::rc::Rc;

use crate::ast::{Position, Program};
use crate::debugger::ScriptId;
use crate::debugger::state::{BreakKind, StepMode};
use crate::error::JsResult;
use crate::source::Source;
use crate::value::{Environment, JsValue};
use crate::vm::CallFrame;

/// The seam the debugger subsystem uses to observe and drive script
/// execution. A [`Context`] always has one installed; absent an attached
/// debugger, [`NullHostHooks`] makes every hook a no-op.
///
/// This is the engine's half of the "collaborator" boundary: the debugger
/// never reaches into the interpreter directly, only through these calls.
pub trait HostHooks: fmt::Debug {
    /// Invoked before executing an ordinary statement (one with no bound
    /// breakpoint and that is not a `debugger;` statement).
    fn on_step(&self, context: &mut Context) -> JsResult<StepMode>;

    /// Invoked before executing a statement bound to a breakpoint, or a
    /// `debugger;` statement. Never called for the same statement as
    /// [`HostHooks::on_step`].
    fn on_break(&self, context: &mut Context, kind: BreakKind) -> JsResult<StepMode>;

    /// Registers a freshly parsed program with the debugger's script
    /// registry, returning the id future operations will reference it by.
    fn register_script(&self, source: &Source, program: &Program) -> ScriptId;

    /// Whether `(script, position)` is bound to an enabled breakpoint.
    fn has_breakpoint_site(&self, script: ScriptId, position: Position) -> bool;

    /// Whether the session has been asked to terminate; checked on every
    /// statement so a long-running script unwinds promptly.
    fn is_terminating(&self) -> bool;
}

/// The default hooks used when no debugger is attached.
#[derive(Debug, Default)]
pub struct NullHostHooks;

impl HostHooks for NullHostHooks {
    fn on_step(&self, _context: &mut Context) -> JsResult<StepMode> {
        Ok(StepMode::None)
    }

    fn on_break(&self, _context: &mut Context, _kind: BreakKind) -> JsResult<StepMode> {
        Ok(StepMode::None)
    }

    fn register_script(&self, _source: &Source, _program: &Program) -> ScriptId {
        ScriptId(0)
    }

    fn has_breakpoint_site(&self, _script: ScriptId, _position: Position) -> bool {
        false
    }

    fn is_terminating(&self) -> bool {
        false
    }
}

/// Builds a [`Context`], mirroring Boa's own `ContextBuilder`.
#[derive(Debug, Default)]
pub struct ContextBuilder {
    host_hooks: Option<Rc<dyn HostHooks>>,
}

impl ContextBuilder {
    /// Start building a context with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the hooks the debugger subsystem will drive execution
    /// through. Analogous to the real engine's extension point for
    /// embedding a debugger without forking the interpreter.
    pub fn host_hooks(mut self, hooks: Rc<dyn HostHooks>) -> Self {
        self.host_hooks = Some(hooks);
        self
    }

    /// Finish building the context.
    pub fn build(self) -> JsResult<Context> {
        Ok(Context {
            frames: Vec::new(),
            global: Environment::new_global(),
            host_hooks: self.host_hooks.unwrap_or_else(|| Rc::new(NullHostHooks)),
            last_value: None,
            last_step_mode: StepMode::None,
        })
    }
}

/// The engine's evaluation context: global scope, call stack, and the
/// installed [`HostHooks`]. Not `Send`/`Sync` by design — a `Context` is
/// confined to the thread that drives it, exactly as the real engine's is.
pub struct Context {
    pub(crate) frames: Vec<CallFrame>,
    pub(crate) global: Rc<Environment>,
    pub(crate) host_hooks: Rc<dyn HostHooks>,
    pub(crate) last_value: Option<JsValue>,
    pub(crate) last_step_mode: StepMode,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("frame_depth", &self.frames.len())
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Construct a context with default (no-op) hooks.
    pub fn default_with_hooks() -> JsResult<Self> {
        ContextBuilder::new().build()
    }

    /// The installed host hooks.
    pub fn host_hooks(&self) -> Rc<dyn HostHooks> {
        Rc::clone(&self.host_hooks)
    }

    /// The call stack, innermost frame last.
    pub fn call_stack(&self) -> &[CallFrame] {
        &self.frames
    }

    /// The depth of the call stack (1 at top level, once a script is
    /// running).
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    /// The position of the statement currently executing in the innermost
    /// frame, if any.
    pub fn current_position(&self) -> Option<Position> {
        self.frames.last().map(|f| f.position)
    }

    /// The script id of the innermost frame, if any.
    pub fn current_script(&self) -> Option<ScriptId> {
        self.frames.last().map(|f| f.script_id)
    }

    pub(crate) fn register_script(&self, source: &Source, program: &Program) -> ScriptId {
        self.host_hooks.register_script(source, program)
    }

    pub(crate) fn has_breakpoint_site(&self, script: ScriptId, position: Position) -> bool {
        self.host_hooks.has_breakpoint_site(script, position)
    }

    pub(crate) fn is_terminating(&self) -> bool {
        self.host_hooks.is_terminating()
    }
}
