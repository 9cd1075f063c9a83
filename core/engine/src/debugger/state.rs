//! The Session Controller: the state machine rendezvousing the interpreter
//! thread with the client-facing command surface.
//!
//! Exactly two threads touch a `Debugger`: the interpreter thread (`T_int`,
//! which calls [`Debugger::on_step`]/[`Debugger::on_break`] from inside the
//! engine's [`crate::context::HostHooks`] implementation) and the client
//! thread (`T_cli`, which calls the public ops below in response to DAP
//! requests). All shared state lives behind one [`Mutex`]; a [`Condvar`]
//! paired with that mutex is the rendezvous primitive T_int blocks on while
//! paused and T_cli releases to resume it.
//!
//! `Debugger` implements [`crate::context::HostHooks`] directly, so a
//! session simply hands `Rc::new(debugger.clone())` to
//! [`crate::context::ContextBuilder::host_hooks`] — no adapter type needed.

use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::{Arc, Condvar, Mutex, mpsc};

use crate::ast::Position;
use crate::context::Context;
use crate::debugger::breakpoint::BreakpointId;
use crate::debugger::reflection::DebuggerFrame;
use crate::debugger::script_registry::{ScriptId, ScriptRegistry};
use crate::debugger::variable_store::{Handle, ValueInfo, VariableStore};
use crate::error::{JsError, JsResult};
use crate::source::Source;
use crate::value::{Environment, PropertyValue};

/// The engine-facing hint returned from the step/break callbacks, telling
/// the interpreter whether another statement boundary should be watched
/// closely (`Step`) or whether only hard breakpoints matter (`None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepMode {
    /// Only hard breakpoints / `debugger;` statements need attention.
    #[default]
    None,
    /// A step is in flight; the next qualifying statement should pause.
    Step,
}

/// Distinguishes the two kinds of hard pause points the break callback is
/// invoked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakKind {
    /// A statement bound to a breakpoint in the [`crate::debugger::breakpoint::BreakpointTable`].
    Breakpoint,
    /// A `debugger;` statement, which always stops regardless of the
    /// breakpoint table.
    DebuggerStatement,
}

/// The kind of step the client asked for; recorded when a pause begins so
/// the Session Controller knows the call-stack depth a step is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepIntent {
    /// No step is armed; only hard breakpoints/`debugger;` stop execution.
    #[default]
    None,
    /// Stop at the next statement at the same or a shallower frame depth.
    Over,
    /// Stop at the very next statement, regardless of depth.
    Into,
    /// Stop only once the current frame has returned.
    Out,
}

/// The controller's coarse-grained state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebuggerState {
    /// A session has been created but the client has not yet signalled
    /// readiness; execution has not started.
    WaitingForUI,
    /// The client is ready; the very first statement will pause (entry).
    Entering,
    /// Executing freely; only hard breakpoints stop it.
    Running,
    /// Blocked inside [`Debugger::on_step`]/[`Debugger::on_break`], waiting
    /// on the rendezvous.
    Pausing,
    /// A step has been armed and is in flight.
    Stepping,
    /// Terminate has been requested; execution is unwinding.
    Terminating,
}

/// Why execution stopped, reported to the client in the `Stopped` event.
#[derive(Debug, Clone, PartialEq)]
pub enum PauseReason {
    /// Pause-on-entry, the first statement of the session.
    Entry,
    /// A step operation completed.
    Step,
    /// A breakpoint fired.
    Breakpoint(BreakpointId),
    /// A `debugger;` statement was reached.
    DebuggerStatement,
    /// The client called `pause()` while running.
    PauseRequested,
}

/// A snapshot of where execution stopped, retained for the duration of a
/// pause so stack-trace/scope/variable requests can be served without
/// re-entering the interpreter.
#[derive(Debug, Clone)]
pub struct DebugInformation {
    /// Why execution stopped.
    pub reason: PauseReason,
    /// The single thread id this adapter reports (always 1).
    pub thread_id: i64,
    /// Call stack frames, outermost first.
    pub frames: Vec<DebuggerFrame>,
}

/// The error taxonomy for debugger operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DebugError {
    /// The requested operation is not legal in the controller's current
    /// state (e.g. `run()` while not paused).
    #[error("invalid state for this operation: {0}")]
    InvalidState(String),
    /// A variable reference handle that was never issued, or has since
    /// been invalidated.
    #[error("unknown variable handle: {0}")]
    UnknownHandle(u64),
    /// A source id that was never registered.
    #[error("unknown source id: {0:?}")]
    UnknownSource(ScriptId),
    /// No breakpointable position exists near the requested line/column.
    #[error("no breakpoint location near line {0}, column {1}")]
    NoBreakpointLocation(u32, u32),
    /// Expression evaluation failed.
    #[error("evaluation failed: {0}")]
    EvaluationFault(String),
    /// The embedded engine faulted in a way the session cannot recover
    /// from; the session must terminate.
    #[error("engine fault: {0}")]
    EngineFault(String),
}

/// The result type for Session Controller operations.
pub type DebugResult<T> = Result<T, DebugError>;

/// A task queued by the client thread for the (possibly parked) interpreter
/// thread to service using its live `&mut Context`, while paused.
enum PendingTask {
    StackTrace {
        respond: mpsc::Sender<DebugResult<Vec<DebuggerFrame>>>,
    },
    Evaluate {
        frame_index: usize,
        expression: String,
        respond: mpsc::Sender<DebugResult<ValueInfo>>,
    },
    SetVariable {
        handle: Handle,
        name: String,
        value_expr: String,
        respond: mpsc::Sender<DebugResult<ValueInfo>>,
    },
    ExpandGetter {
        handle: Handle,
        respond: mpsc::Sender<DebugResult<Vec<(String, ValueInfo)>>>,
    },
}

struct Inner {
    state: DebuggerState,
    step_intent: StepIntent,
    step_depth: usize,
    pause_requested: bool,
    pause_on_entry: bool,
    attached: bool,
    cancelled: bool,
    scripts: ScriptRegistry,
    breakpoints: crate::debugger::breakpoint::BreakpointTable,
    variables: VariableStore,
    current_stop: Option<DebugInformation>,
    tasks: VecDeque<PendingTask>,
    events: Option<mpsc::Sender<DebugEvent>>,
}

/// Events the Session Controller emits for the DAP layer to translate into
/// wire messages. Transport-agnostic on purpose: this type has no
/// knowledge of JSON or `Content-Length` framing.
#[derive(Debug, Clone)]
pub enum DebugEvent {
    /// Execution stopped; carries the same reason as [`DebugInformation`].
    Stopped(PauseReason),
    /// Execution resumed after a stop.
    Continued,
    /// A log point fired; the message has already had its `{expr}`
    /// placeholders substituted.
    LogPoint(String),
    /// The script produced console output (`print`/`console.log`), to be
    /// relayed as a DAP `output` event.
    Output(String),
    /// A script was admitted to the Script Registry. Lets a DAP session
    /// resolve breakpoints that were set by source path before the
    /// interpreter thread had registered that script.
    ScriptRegistered { id: ScriptId, path: String },
    /// The session ended normally.
    Terminated,
    /// `terminate()` was honored; execution was cancelled rather than
    /// running to completion.
    Cancelled,
    /// An unrecoverable engine fault ended the session.
    EngineFault(String),
}

/// The Session Controller: the public handle shared between the
/// interpreter thread and the client thread.
///
/// Cloning is cheap and shares the same underlying state; this is the
/// "session" DAP request handlers and the spawned interpreter thread both
/// hold a copy of.
#[derive(Clone)]
pub struct Debugger {
    inner: Arc<Mutex<Inner>>,
    condvar: Arc<Condvar>,
}

impl std::fmt::Debug for Debugger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.inner.lock().unwrap();
        f.debug_struct("Debugger").field("state", &guard.state).finish()
    }
}

impl Default for Debugger {
    fn default() -> Self {
        Self::new()
    }
}

impl Debugger {
    /// Construct a fresh, unattached controller in `WaitingForUI`.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: DebuggerState::WaitingForUI,
                step_intent: StepIntent::None,
                step_depth: 0,
                pause_requested: false,
                pause_on_entry: false,
                attached: false,
                cancelled: false,
                scripts: ScriptRegistry::new(),
                breakpoints: crate::debugger::breakpoint::BreakpointTable::new(),
                variables: VariableStore::new(),
                current_stop: None,
                tasks: VecDeque::new(),
                events: None,
            })),
            condvar: Arc::new(Condvar::new()),
        }
    }

    /// Install the channel events are published on. Call before attaching.
    pub fn set_event_sink(&self, sink: mpsc::Sender<DebugEvent>) {
        self.inner.lock().unwrap().events = Some(sink);
    }

    /// Whether the very first statement of the session should pause
    /// (`launch`'s `stopOnEntry`). Defaults to `false`.
    pub fn set_pause_on_entry(&self, value: bool) {
        self.inner.lock().unwrap().pause_on_entry = value;
    }

    fn emit(inner: &Inner, event: DebugEvent) {
        if let Some(tx) = &inner.events {
            let _ = tx.send(event);
        }
    }

    /// Publish a line of script console output. Called by the `log`
    /// subscriber that captures `target: "script"` records, so a session's
    /// event stream carries `print`/`console.log` output alongside
    /// `Stopped`/`LogPoint` events.
    pub fn emit_output(&self, text: impl Into<String>) {
        let inner = self.inner.lock().unwrap();
        Self::emit(&inner, DebugEvent::Output(text.into()));
    }

    /// The controller's current state.
    pub fn state(&self) -> DebuggerState {
        self.inner.lock().unwrap().state
    }

    /// Whether the controller is blocked inside a pause right now.
    pub fn is_paused(&self) -> bool {
        matches!(self.inner.lock().unwrap().state, DebuggerState::Pausing)
    }

    fn require_paused(&self) -> DebugResult<()> {
        let inner = self.inner.lock().unwrap();
        if inner.state != DebuggerState::Pausing {
            return Err(DebugError::InvalidState(format!(
                "this operation requires the session to be paused, was {:?}",
                inner.state
            )));
        }
        Ok(())
    }

    // ---- Attach/detach ------------------------------------------------

    /// Attach this controller to a context. Idempotent detach, but
    /// attaching twice without an intervening detach is an error: a
    /// context may only ever be observed by one controller at a time.
    pub fn attach(&self, _context: &mut Context) -> JsResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.attached {
            return Err(JsError::runtime("debugger already attached"));
        }
        inner.attached = true;
        Ok(())
    }

    /// Detach. Safe to call multiple times.
    pub fn detach(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.attached = false;
    }

    // ---- Client-facing operations --------------------------------------

    /// Begin a session: resets to `WaitingForUI`.
    pub fn execute(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = DebuggerState::WaitingForUI;
        inner.cancelled = false;
    }

    /// The client has finished configuring breakpoints and is ready for
    /// execution to begin; releases the interpreter thread parked in
    /// [`Debugger::wait_for_ui_ready`].
    pub fn notify_ui_ready(&self) -> DebugResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != DebuggerState::WaitingForUI {
            return Err(DebugError::InvalidState(format!(
                "notifyUIReady is only valid while WaitingForUI, was {:?}",
                inner.state
            )));
        }
        inner.state = DebuggerState::Entering;
        drop(inner);
        self.condvar.notify_all();
        Ok(())
    }

    /// Blocks the calling thread until the client has called
    /// [`Debugger::notify_ui_ready`]. The interpreter thread calls this
    /// immediately after [`Debugger::attach`] and before evaluating any
    /// source, so the engine never calls back into [`Debugger::on_step`]
    /// while still `WaitingForUI` — an illegal transition per the step
    /// callback's state table.
    pub fn wait_for_ui_ready(&self) {
        let mut guard = self.inner.lock().unwrap();
        while guard.state == DebuggerState::WaitingForUI {
            guard = self.condvar.wait(guard).unwrap();
        }
    }

    /// Request that execution pause at the next statement boundary.
    pub fn pause(&self) -> DebugResult<()> {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            DebuggerState::Running | DebuggerState::Stepping => {
                inner.pause_requested = true;
                Ok(())
            }
            other => Err(DebugError::InvalidState(format!(
                "pause is only valid while running or stepping, was {other:?}"
            ))),
        }
    }

    /// Resume a paused session with no step armed.
    pub fn run(&self) -> DebugResult<()> {
        self.resume_with(StepIntent::None)
    }

    /// Resume, pausing again at the next statement in the same or a
    /// shallower frame.
    pub fn step_over(&self) -> DebugResult<()> {
        self.resume_with(StepIntent::Over)
    }

    /// Resume, pausing again at the very next statement at any depth.
    pub fn step_into(&self) -> DebugResult<()> {
        self.resume_with(StepIntent::Into)
    }

    /// Resume, pausing again only once the current frame returns.
    pub fn step_out(&self) -> DebugResult<()> {
        self.resume_with(StepIntent::Out)
    }

    fn resume_with(&self, intent: StepIntent) -> DebugResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != DebuggerState::Pausing {
            return Err(DebugError::InvalidState(format!(
                "cannot resume, was {:?}",
                inner.state
            )));
        }
        let depth = inner
            .current_stop
            .as_ref()
            .map(|s| s.frames.len())
            .unwrap_or(0);
        inner.step_intent = intent;
        inner.step_depth = depth;
        inner.state = if intent == StepIntent::None {
            DebuggerState::Running
        } else {
            DebuggerState::Stepping
        };
        inner.current_stop = None;
        Self::emit(&inner, DebugEvent::Continued);
        drop(inner);
        self.condvar.notify_all();
        Ok(())
    }

    /// Terminate the session. Idempotent. If currently paused, releases the
    /// rendezvous so the interpreter thread can observe cancellation and
    /// unwind. No further `Stopped` events follow a successful terminate.
    pub fn terminate(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.cancelled = true;
        inner.state = DebuggerState::Terminating;
        inner.current_stop = None;
        drop(inner);
        self.condvar.notify_all();
    }

    /// Whether termination has been requested; consulted by the
    /// interpreter on every statement ([`crate::context::HostHooks::is_terminating`]).
    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().unwrap().cancelled
    }

    // ---- Breakpoints ----------------------------------------------------

    /// Register a script with the controller's Script Registry, emitting
    /// [`DebugEvent::ScriptRegistered`] so a DAP session can bind
    /// breakpoints that were set by path before this script existed.
    pub fn register_script(&self, source: &Source, program: &crate::ast::Program) -> ScriptId {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.scripts.register(source, program);
        let path = inner
            .scripts
            .info(id)
            .map(|info| info.name.clone())
            .unwrap_or_default();
        Self::emit(&inner, DebugEvent::ScriptRegistered { id, path });
        id
    }

    /// Set a breakpoint, snapping the requested position to the nearest
    /// breakpointable statement.
    #[allow(clippy::too_many_arguments)]
    pub fn set_breakpoint(
        &self,
        script: ScriptId,
        line: u32,
        column: u32,
        condition: Option<String>,
        hit_condition: Option<String>,
        log_message: Option<String>,
    ) -> DebugResult<crate::debugger::breakpoint::BreakpointSite> {
        let mut inner = self.inner.lock().unwrap();
        let snapped = inner
            .scripts
            .snap_breakpoint(script, line, column)
            .ok_or(DebugError::NoBreakpointLocation(line, column))?;
        Ok(inner
            .breakpoints
            .set(script, snapped, condition, hit_condition, log_message))
    }

    /// Remove every breakpoint bound to `script`.
    pub fn clear_breakpoints(&self, script: ScriptId) {
        self.inner.lock().unwrap().breakpoints.clear_script(script);
    }

    pub(crate) fn has_breakpoint_site(&self, script: ScriptId, position: Position) -> bool {
        self.inner.lock().unwrap().breakpoints.has_site(script, position)
    }

    /// The script registered under the given display name (path, or
    /// synthetic `<script N>`), if any has been registered so far.
    pub fn find_script_by_name(&self, name: &str) -> Option<ScriptId> {
        self.inner.lock().unwrap().scripts.find_by_name(name)
    }

    /// A read-only view over a registered script's retained info.
    pub fn script_info(&self, id: ScriptId) -> Option<crate::debugger::script_registry::ScriptInfo> {
        self.inner.lock().unwrap().scripts.info(id).cloned()
    }

    // ---- Variable Store -------------------------------------------------

    /// Evaluate an expression in the scope of the given frame index
    /// (0 = innermost), serviced by queuing a task for the parked
    /// interpreter thread.
    pub fn evaluate(&self, frame_index: usize, expression: String) -> DebugResult<ValueInfo> {
        self.require_paused()?;
        let (tx, rx) = mpsc::channel();
        {
            let mut inner = self.inner.lock().unwrap();
            inner.tasks.push_back(PendingTask::Evaluate {
                frame_index,
                expression,
                respond: tx,
            });
        }
        self.condvar.notify_all();
        rx.recv()
            .map_err(|_| DebugError::EvaluationFault("interpreter thread gone".into()))?
    }

    /// Assign a new value to a named variable reachable from `handle`
    /// (either a scope or an object). `value_expr` is evaluated against the
    /// innermost frame on the interpreter thread, matching how DAP's
    /// `setVariable` request carries the new value as expression text
    /// rather than a pre-typed value.
    pub fn set_variable(
        &self,
        handle: Handle,
        name: impl Into<String>,
        value_expr: impl Into<String>,
    ) -> DebugResult<ValueInfo> {
        self.require_paused()?;
        let (tx, rx) = mpsc::channel();
        {
            let mut inner = self.inner.lock().unwrap();
            inner.tasks.push_back(PendingTask::SetVariable {
                handle,
                name: name.into(),
                value_expr: value_expr.into(),
                respond: tx,
            });
        }
        self.condvar.notify_all();
        rx.recv()
            .map_err(|_| DebugError::EvaluationFault("interpreter thread gone".into()))?
    }

    /// Invoke the getter registered under `handle`, materializing and
    /// returning whatever it produces. A primitive result is reported as a
    /// single synthetic `"value"` entry; an object/array result is
    /// reported as its own children.
    pub fn expand_getter(&self, handle: Handle) -> DebugResult<Vec<(String, ValueInfo)>> {
        self.require_paused()?;
        let (tx, rx) = mpsc::channel();
        {
            let mut inner = self.inner.lock().unwrap();
            inner.tasks.push_back(PendingTask::ExpandGetter { handle, respond: tx });
        }
        self.condvar.notify_all();
        rx.recv()
            .map_err(|_| DebugError::EvaluationFault("interpreter thread gone".into()))?
    }

    /// Fetch the call stack as of the last pause.
    pub fn stack_trace(&self) -> DebugResult<Vec<DebuggerFrame>> {
        let inner = self.inner.lock().unwrap();
        match &inner.current_stop {
            Some(info) => Ok(info.frames.clone()),
            None => Err(DebugError::InvalidState("not paused".into())),
        }
    }

    /// The snapshot taken at the most recent pause.
    pub fn current_stop(&self) -> Option<DebugInformation> {
        self.inner.lock().unwrap().current_stop.clone()
    }

    /// Materialize variables visible under a handle (scope or object).
    pub fn variables(&self, handle: Handle) -> DebugResult<Vec<(String, ValueInfo)>> {
        self.inner
            .lock()
            .unwrap()
            .variables
            .children(handle)
            .ok_or(DebugError::UnknownHandle(handle.0))
    }

    /// Invalidate every handle issued so far. Not called automatically
    /// between pauses; see the module-level note on retention.
    pub fn clear_variables(&self) {
        self.inner.lock().unwrap().variables.clear();
    }

    // ---- Interpreter-facing entry points --------------------------------

    /// Called from [`crate::context::HostHooks::on_step`] for an ordinary
    /// statement (no bound breakpoint, not `debugger;`).
    pub fn on_step(&self, context: &mut Context) -> JsResult<StepMode> {
        if !self.inner.lock().unwrap().attached {
            return Ok(StepMode::None);
        }
        self.check_cancelled()?;

        let should_pause = {
            let mut inner = self.inner.lock().unwrap();
            if inner.pause_requested {
                inner.pause_requested = false;
                Some(PauseReason::PauseRequested)
            } else if inner.state == DebuggerState::Entering {
                if inner.pause_on_entry {
                    Some(PauseReason::Entry)
                } else {
                    inner.state = DebuggerState::Running;
                    None
                }
            } else if inner.state == DebuggerState::Stepping {
                let depth = context.frame_depth();
                let stop = match inner.step_intent {
                    StepIntent::None => false,
                    StepIntent::Into => true,
                    StepIntent::Over => depth <= inner.step_depth,
                    StepIntent::Out => depth < inner.step_depth,
                };
                if stop { Some(PauseReason::Step) } else { None }
            } else {
                None
            }
        };

        match should_pause {
            Some(reason) => {
                let mut live = self.begin_pause(context, reason);
                let intent = self.block_until_resumed(context, &mut live)?;
                Ok(step_mode_for(intent))
            }
            None => {
                let inner = self.inner.lock().unwrap();
                Ok(if inner.state == DebuggerState::Stepping {
                    StepMode::Step
                } else {
                    StepMode::None
                })
            }
        }
    }

    /// Called from [`crate::context::HostHooks::on_break`] at a
    /// breakpoint-bound statement or a `debugger;` statement.
    ///
    /// Hit-count and condition evaluation happen before the log-message
    /// check, per the Breakpoint Table's normative ordering; a log point
    /// never blocks the interpreter.
    pub fn on_break(&self, context: &mut Context, kind: BreakKind) -> JsResult<StepMode> {
        if !self.inner.lock().unwrap().attached {
            return Ok(StepMode::None);
        }
        self.check_cancelled()?;

        if kind == BreakKind::DebuggerStatement {
            let mut live = self.begin_pause(context, PauseReason::DebuggerStatement);
            let intent = self.block_until_resumed(context, &mut live)?;
            return Ok(step_mode_for(intent));
        }

        let script = context.current_script().unwrap_or(ScriptId(0));
        let position = context.current_position().unwrap_or(Position::new(0, 0));

        let snapshot = self.inner.lock().unwrap().breakpoints.peek(script, position);
        let Some(bp) = snapshot else {
            // The breakpoint was cleared between `has_breakpoint_site`
            // returning true and this callback running; nothing to do.
            return Ok(StepMode::None);
        };
        let condition_passed = match &bp.condition {
            Some(expr) => context
                .eval_expression_in_frame(0, expr)
                .map(|v| v.to_boolean())
                .unwrap_or(false),
            None => true,
        };

        let decision = self
            .inner
            .lock()
            .unwrap()
            .breakpoints
            .record_hit(script, position, condition_passed);

        match decision {
            crate::debugger::breakpoint::HitDecision::Break(id) => {
                let mut live = self.begin_pause(context, PauseReason::Breakpoint(id));
                let intent = self.block_until_resumed(context, &mut live)?;
                Ok(step_mode_for(intent))
            }
            crate::debugger::breakpoint::HitDecision::Log => {
                let message = format_log_message(context, bp.log_message.as_deref().unwrap_or(""));
                let inner = self.inner.lock().unwrap();
                Self::emit(&inner, DebugEvent::LogPoint(message));
                Ok(StepMode::None)
            }
            crate::debugger::breakpoint::HitDecision::Skip => {
                let inner = self.inner.lock().unwrap();
                Ok(if inner.state == DebuggerState::Stepping {
                    StepMode::Step
                } else {
                    StepMode::None
                })
            }
        }
    }

    fn check_cancelled(&self) -> JsResult<()> {
        if self.inner.lock().unwrap().cancelled {
            return Err(JsError::new(crate::error::JsErrorKind::Cancelled, "cancelled"));
        }
        Ok(())
    }

    /// Snapshots the call stack and materializes every frame's local scope,
    /// returning the thread-confined [`crate::debugger::variable_store::LiveHandles`]
    /// needed to service `evaluate`/`setVariable`/getter-expansion for the
    /// rest of this pause. Never stored in `Inner` — it owns `Rc`s and must
    /// stay on this thread.
    fn begin_pause(
        &self,
        context: &mut Context,
        reason: PauseReason,
    ) -> crate::debugger::variable_store::LiveHandles {
        let mut frames = DebuggerFrame::capture_stack(context);
        let frame_envs: Vec<Rc<Environment>> = context.call_stack().iter().map(|f| Rc::clone(&f.env)).collect();

        let mut inner = self.inner.lock().unwrap();
        let (scope_handles, live) = inner.variables.begin_pause(&frame_envs);
        for (frame, handle) in frames.iter_mut().zip(scope_handles) {
            frame.scope = handle;
        }

        inner.state = DebuggerState::Pausing;
        let info = DebugInformation {
            reason: reason.clone(),
            thread_id: 1,
            frames,
        };
        inner.current_stop = Some(info);
        Self::emit(&inner, DebugEvent::Stopped(reason));
        live
    }

    /// Drains pending inspection tasks using the live context, then blocks
    /// on the rendezvous until resumed or cancelled. Tasks are serviced
    /// without holding the controller's lock for longer than each step
    /// needs, so client-thread requests never contend with the (possibly
    /// long) evaluation they trigger.
    fn block_until_resumed(
        &self,
        context: &mut Context,
        live: &mut crate::debugger::variable_store::LiveHandles,
    ) -> JsResult<StepIntent> {
        loop {
            let task = self.inner.lock().unwrap().tasks.pop_front();
            if let Some(task) = task {
                self.service_task(task, context, live);
                continue;
            }

            let mut guard = self.inner.lock().unwrap();
            if guard.state != DebuggerState::Pausing {
                if guard.cancelled {
                    return Err(JsError::new(crate::error::JsErrorKind::Cancelled, "cancelled"));
                }
                let intent = guard.step_intent;
                return Ok(intent);
            }
            if !guard.tasks.is_empty() {
                continue;
            }
            let _unused = self.condvar.wait(guard).unwrap();
        }
    }

    fn service_task(
        &self,
        task: PendingTask,
        context: &mut Context,
        live: &mut crate::debugger::variable_store::LiveHandles,
    ) {
        match task {
            PendingTask::StackTrace { respond } => {
                let frames = DebuggerFrame::capture_stack(context);
                let _ = respond.send(Ok(frames));
            }
            PendingTask::Evaluate {
                frame_index,
                expression,
                respond,
            } => {
                let result = context
                    .eval_expression_in_frame(frame_index, &expression)
                    .map_err(|e| DebugError::EvaluationFault(e.message().to_string()))
                    .map(|value| {
                        let mut inner = self.inner.lock().unwrap();
                        inner.variables.materialize(&value, live, 0)
                    });
                let _ = respond.send(result);
            }
            PendingTask::SetVariable {
                handle,
                name,
                value_expr,
                respond,
            } => {
                let result = context
                    .eval_expression_in_frame(0, &value_expr)
                    .map_err(|e| DebugError::EvaluationFault(e.message().to_string()))
                    .and_then(|value| {
                        if let Some(env) = live.env(handle) {
                            env.declare(name, value.clone());
                            let mut inner = self.inner.lock().unwrap();
                            Ok(inner.variables.materialize(&value, live, 0))
                        } else if let Some(obj) = live.object(handle) {
                            obj.borrow_mut()
                                .properties
                                .insert(name, PropertyValue::Data(value.clone()));
                            let mut inner = self.inner.lock().unwrap();
                            Ok(inner.variables.materialize(&value, live, 0))
                        } else {
                            Err(DebugError::UnknownHandle(handle.0))
                        }
                    });
                let _ = respond.send(result);
            }
            PendingTask::ExpandGetter { handle, respond } => {
                let result = match live.getter(handle) {
                    // This toy language has no `this` binding; the owner is
                    // retained only so future getter semantics could bind it.
                    Some((func, _owner)) => match context.call_function(&func, Vec::new()) {
                        Ok(value) => {
                            let mut inner = self.inner.lock().unwrap();
                            let info = inner.variables.materialize(&value, live, 0);
                            Ok(vec![("value".to_string(), info)])
                        }
                        Err(e) => Err(DebugError::EvaluationFault(e.message().to_string())),
                    },
                    None => Err(DebugError::UnknownHandle(handle.0)),
                };
                let _ = respond.send(result);
            }
        }
    }
}

/// Substitutes every `{expr}` placeholder in a log message template with
/// the result of evaluating `expr` in the innermost frame. An expression
/// that fails to evaluate is rendered as `<error>` rather than aborting the
/// whole message.
fn format_log_message(context: &mut Context, template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        rest = &rest[open + 1..];
        match rest.find('}') {
            Some(close) => {
                let expr = &rest[..close];
                let rendered = context
                    .eval_expression_in_frame(0, expr)
                    .map(|v| v.display())
                    .unwrap_or_else(|_| "<error>".to_string());
                out.push_str(&rendered);
                rest = &rest[close + 1..];
            }
            None => {
                out.push('{');
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

fn step_mode_for(intent: StepIntent) -> StepMode {
    match intent {
        StepIntent::None => StepMode::None,
        StepIntent::Over | StepIntent::Into | StepIntent::Out => StepMode::Step,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextBuilder;
    use std::time::Duration;

    /// Spawns the interpreter thread for `source` attached to a fresh
    /// [`Debugger`], releasing it immediately so the first event the caller
    /// receives is whatever the very first statement produces (an `Entry`
    /// stop if `pause_on_entry`, otherwise free run until the first hard
    /// breakpoint/`debugger;` statement).
    /// Also drains the leading [`DebugEvent::ScriptRegistered`] every
    /// session starts with (`Context::eval` registers the script before
    /// running its first statement), returning the id it carries so callers
    /// can set breakpoints against it.
    fn spawn(source: &'static str, pause_on_entry: bool) -> (Debugger, ScriptId, mpsc::Receiver<DebugEvent>, std::thread::JoinHandle<()>) {
        let debugger = Debugger::new();
        debugger.set_pause_on_entry(pause_on_entry);
        let (tx, rx) = mpsc::channel();
        debugger.set_event_sink(tx);

        let d = debugger.clone();
        let handle = std::thread::spawn(move || {
            let mut context = ContextBuilder::new()
                .host_hooks(Rc::new(d.clone()))
                .build()
                .expect("default hooks never fail to build");
            d.attach(&mut context).expect("fresh debugger attaches cleanly");
            d.wait_for_ui_ready();
            let src = crate::source::Source::from_bytes(source);
            let _ = context.eval(&src);
            d.detach();
        });

        debugger.notify_ui_ready().expect("still WaitingForUI");
        let id = match recv(&rx) {
            DebugEvent::ScriptRegistered { id, .. } => id,
            other => panic!("expected ScriptRegistered first, got {other:?}"),
        };
        (debugger, id, rx, handle)
    }

    fn recv(rx: &mpsc::Receiver<DebugEvent>) -> DebugEvent {
        rx.recv_timeout(Duration::from_secs(5)).expect("event within timeout")
    }

    #[test]
    fn pause_on_entry_then_step_over_then_run() {
        let (debugger, _id, rx, handle) = spawn("var x = 1;\nvar y = 2;\n", true);

        assert!(matches!(recv(&rx), DebugEvent::Stopped(PauseReason::Entry)));
        debugger.step_over().expect("paused at entry");
        assert!(matches!(recv(&rx), DebugEvent::Continued));
        assert!(matches!(recv(&rx), DebugEvent::Stopped(PauseReason::Step)));

        debugger.run().expect("paused after the step");
        assert!(matches!(recv(&rx), DebugEvent::Continued));
        handle.join().expect("interpreter thread should not panic");
    }

    #[test]
    fn conditional_breakpoint_stops_only_once_the_condition_is_met() {
        let source = "var x = 0;\nfor (var i = 0; i < 3; i = i + 1) {\nx = i;\n}\n";
        let (debugger, id, rx, handle) = spawn(source, true);

        assert!(matches!(recv(&rx), DebugEvent::Stopped(PauseReason::Entry)));

        debugger
            .set_breakpoint(id, 3, 1, Some("i == 1".into()), None, None)
            .expect("line 3 is breakpointable");

        debugger.run().expect("paused at entry");
        assert!(matches!(recv(&rx), DebugEvent::Continued));
        // Iteration i=0 evaluates the condition false and never fires; the
        // first real stop is i=1.
        assert!(matches!(
            recv(&rx),
            DebugEvent::Stopped(PauseReason::Breakpoint(_))
        ));

        debugger.run().expect("paused at the breakpoint");
        assert!(matches!(recv(&rx), DebugEvent::Continued));
        // i=2 never satisfies the condition again; the script runs to
        // completion without another stop.
        handle.join().expect("interpreter thread should not panic");
    }

    #[test]
    fn debugger_statement_always_stops_regardless_of_breakpoints() {
        let (_debugger, _id, rx, handle) = spawn("var x = 1;\ndebugger;\nvar y = 2;\n", false);

        assert!(matches!(
            recv(&rx),
            DebugEvent::Stopped(PauseReason::DebuggerStatement)
        ));
        _debugger.run().expect("paused at the debugger statement");
        assert!(matches!(recv(&rx), DebugEvent::Continued));
        handle.join().expect("interpreter thread should not panic");
    }

    #[test]
    fn terminate_mid_pause_yields_no_further_stops() {
        let (debugger, _id, rx, handle) = spawn("var x = 1;\nvar y = 2;\nvar z = 3;\n", true);

        assert!(matches!(recv(&rx), DebugEvent::Stopped(PauseReason::Entry)));
        debugger.terminate();
        // No `Continued` is emitted by `terminate`; the interpreter thread
        // observes cancellation on its next callback and unwinds.
        handle.join().expect("cancellation unwinds cleanly");
        assert!(debugger.is_cancelled());
    }

    #[test]
    fn pause_requested_during_free_run_is_observed_at_the_next_statement() {
        // A loop long enough that the main thread's `pause()` retry below
        // always lands well before the script runs to completion.
        let source = "var x = 0;\nfor (var i = 0; i < 5000; i = i + 1) {\nx = i;\n}\n";
        let (debugger, _id, rx, handle) = spawn(source, false);

        // `pause()` is only legal once the interpreter thread has left
        // `Entering` for `Running`, which races this thread; retry rather
        // than assume it has happened by the time we get here.
        let mut tries = 0;
        while debugger.pause().is_err() {
            tries += 1;
            assert!(tries < 100_000, "debugger never reached a pausable state");
            std::thread::yield_now();
        }
        assert!(matches!(
            recv(&rx),
            DebugEvent::Stopped(PauseReason::PauseRequested)
        ));
        debugger.run().expect("paused");
        assert!(matches!(recv(&rx), DebugEvent::Continued));
        handle.join().expect("interpreter thread should not panic");
    }

    #[test]
    fn resume_operations_fail_when_not_paused() {
        let debugger = Debugger::new();
        assert!(debugger.run().is_err());
        assert!(debugger.step_over().is_err());
        assert!(debugger.step_into().is_err());
        assert!(debugger.step_out().is_err());
    }

    #[test]
    fn notify_ui_ready_twice_fails_the_second_time() {
        let debugger = Debugger::new();
        debugger.notify_ui_ready().expect("first call is legal");
        assert!(debugger.notify_ui_ready().is_err());
    }

    #[test]
    fn attach_twice_without_detach_fails() {
        let debugger = Debugger::new();
        let mut context = ContextBuilder::new().build().unwrap();
        debugger.attach(&mut context).expect("first attach succeeds");
        assert!(debugger.attach(&mut context).is_err());
        debugger.detach();
        debugger.detach(); // idempotent
        debugger.attach(&mut context).expect("attach succeeds again after detach");
    }
}

impl crate::context::HostHooks for Debugger {
    fn on_step(&self, context: &mut Context) -> JsResult<StepMode> {
        Debugger::on_step(self, context)
    }

    fn on_break(&self, context: &mut Context, kind: BreakKind) -> JsResult<StepMode> {
        Debugger::on_break(self, context, kind)
    }

    fn register_script(&self, source: &Source, program: &crate::ast::Program) -> ScriptId {
        Debugger::register_script(self, source, program)
    }

    fn has_breakpoint_site(&self, script: ScriptId, position: Position) -> bool {
        Debugger::has_breakpoint_site(self, script, position)
    }

    fn is_terminating(&self) -> bool {
        self.is_cancelled()
    }
}
