//! Debug session management: translates DAP requests into operations on a
//! [`Debugger`], and owns the one interpreter thread a launched program runs
//! on.
//!
//! The trickiest seam is addressing. DAP addresses scripts by path and
//! frames/variables by opaque integer references; the Session Controller
//! addresses them by [`ScriptId`], frame index (0 = innermost), and
//! [`Handle`]. Where the two line up exactly (frame index, variable
//! handles) this module passes the DAP integer straight through with no
//! translation table of its own. Where they don't — a client may set
//! breakpoints against a source path before the corresponding script has
//! been parsed and registered — this module keeps the one piece of state
//! that bridges the gap: breakpoints pending a script registration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Mutex;
use std::sync::mpsc;
use std::thread;

use super::messages::*;
use crate::context::ContextBuilder;
use crate::debugger::variable_store::Handle;
use crate::debugger::{DebugError, DebugEvent, DebugResult, Debugger, ScriptId, ValueInfo};
use crate::error::JsErrorKind;
use crate::source::Source as EngineSource;

/// A breakpoint spec queued against a source path before its script exists.
#[derive(Debug, Clone)]
struct PendingBreakpoint {
    line: i64,
    column: Option<i64>,
    condition: Option<String>,
    hit_condition: Option<String>,
    log_message: Option<String>,
}

/// Bridges one DAP client connection to one [`Debugger`].
pub struct DebugSession {
    debugger: Debugger,
    events: mpsc::Sender<DebugEvent>,
    program: Mutex<Option<PathBuf>>,
    pending_breakpoints: Mutex<HashMap<String, Vec<PendingBreakpoint>>>,
    interpreter: Mutex<Option<thread::JoinHandle<()>>>,
}

impl DebugSession {
    /// Build a session around a fresh controller, returning the event
    /// stream the caller should pump onto the DAP transport.
    pub fn new(debugger: Debugger) -> (Self, mpsc::Receiver<DebugEvent>) {
        let (tx, rx) = mpsc::channel();
        debugger.set_event_sink(tx.clone());
        (
            Self {
                debugger,
                events: tx,
                program: Mutex::new(None),
                pending_breakpoints: Mutex::new(HashMap::new()),
                interpreter: Mutex::new(None),
            },
            rx,
        )
    }

    /// The underlying controller, for the event pump to read `DebugEvent`s
    /// against (translating `PauseReason` into DAP `stopped` reasons needs
    /// no session state, only the event payload itself).
    pub fn debugger(&self) -> &Debugger {
        &self.debugger
    }

    // ---- Lifecycle -------------------------------------------------------

    /// Answer the client's capability negotiation. The arguments (locale,
    /// line/column conventions) don't currently change anything we report.
    pub fn handle_initialize(&self, _args: InitializeRequestArguments) -> Capabilities {
        Capabilities {
            supports_configuration_done_request: true,
            supports_function_breakpoints: false,
            supports_conditional_breakpoints: true,
            supports_hit_conditional_breakpoints: true,
            supports_evaluate_for_hovers: true,
            supports_step_back: false,
            supports_set_variable: true,
            supports_restart_frame: false,
            supports_goto_targets_request: false,
            supports_step_in_targets_request: false,
            supports_completions_request: false,
            supports_modules_request: false,
            supports_restart_request: false,
            supports_exception_options: false,
            supports_value_formatting_options: false,
            supports_exception_info_request: false,
            supports_terminate_debuggee: true,
            supports_delayed_stack_trace_loading: false,
            supports_loaded_sources_request: false,
            supports_log_points: true,
            supports_terminate_threads_request: false,
            supports_set_expression: false,
            supports_terminate_request: true,
            supports_data_breakpoints: false,
            supports_read_memory_request: false,
            supports_disassemble_request: false,
            supports_cancel_request: false,
            supports_breakpoint_locations_request: false,
            supports_clipboard_context: false,
        }
    }

    pub fn handle_launch(&self, args: LaunchRequestArguments) -> DebugResult<()> {
        let program = args
            .program
            .ok_or_else(|| DebugError::InvalidState("launch requires 'program'".into()))?;
        self.debugger.set_pause_on_entry(args.stop_on_entry.unwrap_or(false));
        *self.program.lock().unwrap() = Some(PathBuf::from(&program));
        self.spawn_interpreter(program);
        Ok(())
    }

    pub fn handle_attach(&self, _args: AttachRequestArguments) -> DebugResult<()> {
        Err(DebugError::InvalidState(
            "attach is not supported; launch the program directly".into(),
        ))
    }

    /// Releases the interpreter thread parked in `wait_for_ui_ready`, once
    /// the client has finished sending its initial `setBreakpoints` batch.
    pub fn handle_configuration_done(&self) -> DebugResult<()> {
        self.debugger.notify_ui_ready()
    }

    fn spawn_interpreter(&self, program: String) {
        let debugger = self.debugger.clone();
        let events = self.events.clone();
        let handle = thread::spawn(move || {
            let source_text = match std::fs::read_to_string(&program) {
                Ok(text) => text,
                Err(e) => {
                    let _ = events.send(DebugEvent::EngineFault(format!(
                        "failed to read {program}: {e}"
                    )));
                    let _ = events.send(DebugEvent::Terminated);
                    return;
                }
            };
            let source = EngineSource::from_filepath(&program, &source_text);
            let mut context = match ContextBuilder::new()
                .host_hooks(Rc::new(debugger.clone()))
                .build()
            {
                Ok(ctx) => ctx,
                Err(e) => {
                    let _ = events.send(DebugEvent::EngineFault(e.message().to_string()));
                    let _ = events.send(DebugEvent::Terminated);
                    return;
                }
            };
            if debugger.attach(&mut context).is_err() {
                return;
            }
            debugger.wait_for_ui_ready();
            match context.eval(&source) {
                Ok(_) => {
                    let _ = events.send(DebugEvent::Terminated);
                }
                Err(e) if e.kind() == JsErrorKind::Cancelled => {
                    let _ = events.send(DebugEvent::Cancelled);
                    let _ = events.send(DebugEvent::Terminated);
                }
                Err(e) => {
                    let _ = events.send(DebugEvent::EngineFault(e.message().to_string()));
                    let _ = events.send(DebugEvent::Terminated);
                }
            }
            debugger.detach();
        });
        *self.interpreter.lock().unwrap() = Some(handle);
    }

    // ---- Breakpoints -------------------------------------------------------

    pub fn handle_set_breakpoints(&self, args: SetBreakpointsArguments) -> SetBreakpointsResponseBody {
        let path = args
            .source
            .path
            .clone()
            .or_else(|| args.source.name.clone())
            .unwrap_or_else(|| "unknown".to_string());
        let requested = args.breakpoints.unwrap_or_default();

        let breakpoints = match self.debugger.find_script_by_name(&path) {
            Some(script) => {
                self.debugger.clear_breakpoints(script);
                requested
                    .iter()
                    .map(|bp| self.install_breakpoint(script, bp, &path))
                    .collect()
            }
            None => {
                let mut pending = self.pending_breakpoints.lock().unwrap();
                let specs = requested
                    .iter()
                    .map(|bp| PendingBreakpoint {
                        line: bp.line,
                        column: bp.column,
                        condition: bp.condition.clone(),
                        hit_condition: bp.hit_condition.clone(),
                        log_message: bp.log_message.clone(),
                    })
                    .collect();
                pending.insert(path.clone(), specs);
                requested
                    .iter()
                    .map(|bp| Breakpoint {
                        id: None,
                        verified: false,
                        message: Some("script not yet loaded".to_string()),
                        source: Some(args.source.clone()),
                        line: Some(bp.line),
                        column: bp.column,
                        end_line: None,
                        end_column: None,
                    })
                    .collect()
            }
        };

        SetBreakpointsResponseBody { breakpoints }
    }

    fn install_breakpoint(&self, script: ScriptId, bp: &SourceBreakpoint, path: &str) -> Breakpoint {
        let line = bp.line.max(0) as u32;
        let column = bp.column.unwrap_or(1).max(0) as u32;
        match self.debugger.set_breakpoint(
            script,
            line,
            column,
            bp.condition.clone(),
            bp.hit_condition.clone(),
            bp.log_message.clone(),
        ) {
            Ok(site) => Breakpoint {
                id: Some(site.id.0 as i64),
                verified: true,
                message: None,
                source: Some(source_ref(path)),
                line: Some(i64::from(site.position.line)),
                column: Some(i64::from(site.position.column)),
                end_line: None,
                end_column: None,
            },
            Err(e) => Breakpoint {
                id: None,
                verified: false,
                message: Some(e.to_string()),
                source: Some(source_ref(path)),
                line: Some(bp.line),
                column: bp.column,
                end_line: None,
                end_column: None,
            },
        }
    }

    /// Called by the event pump when `DebugEvent::ScriptRegistered` fires,
    /// binding any breakpoints that were set by path before this script
    /// existed. Returns the now-verified breakpoints so the caller can
    /// announce them via `breakpoint` events.
    pub fn resolve_pending_breakpoints(&self, id: ScriptId, path: &str) -> Vec<Breakpoint> {
        let Some(pending) = self.pending_breakpoints.lock().unwrap().remove(path) else {
            return Vec::new();
        };
        pending
            .into_iter()
            .map(|p| {
                let bp = SourceBreakpoint {
                    line: p.line,
                    column: p.column,
                    condition: p.condition,
                    hit_condition: p.hit_condition,
                    log_message: p.log_message,
                };
                self.install_breakpoint(id, &bp, path)
            })
            .collect()
    }

    // ---- Execution control -------------------------------------------------

    pub fn handle_continue(&self, _args: ContinueArguments) -> DebugResult<ContinueResponseBody> {
        self.debugger.run()?;
        Ok(ContinueResponseBody {
            all_threads_continued: true,
        })
    }

    pub fn handle_next(&self, _args: NextArguments) -> DebugResult<()> {
        self.debugger.step_over()
    }

    pub fn handle_step_in(&self, _args: StepInArguments) -> DebugResult<()> {
        self.debugger.step_into()
    }

    pub fn handle_step_out(&self, _args: StepOutArguments) -> DebugResult<()> {
        self.debugger.step_out()
    }

    pub fn handle_pause(&self, _args: PauseArguments) -> DebugResult<()> {
        self.debugger.pause()
    }

    pub fn handle_terminate(&self, _args: TerminateArguments) {
        self.debugger.terminate();
    }

    pub fn handle_disconnect(&self, _args: DisconnectArguments) {
        self.debugger.terminate();
    }

    // ---- Inspection -------------------------------------------------------

    pub fn handle_stack_trace(&self, _args: StackTraceArguments) -> DebugResult<StackTraceResponseBody> {
        let frames = self.debugger.stack_trace()?;
        let total = frames.len();
        let stack_frames = frames
            .iter()
            .rev()
            .enumerate()
            .map(|(fid, frame)| {
                let source = self
                    .debugger
                    .script_info(frame.script)
                    .map(|info| source_ref(&info.name));
                StackFrame {
                    id: fid as i64,
                    name: frame.function_name.clone().unwrap_or_else(|| "<anonymous>".to_string()),
                    source,
                    line: i64::from(frame.position.line),
                    column: i64::from(frame.position.column),
                    end_line: None,
                    end_column: None,
                    can_restart: false,
                    instruction_pointer_reference: None,
                    module_id: None,
                    presentation_hint: None,
                }
            })
            .collect();
        Ok(StackTraceResponseBody {
            stack_frames,
            total_frames: Some(total as i64),
        })
    }

    pub fn handle_scopes(&self, args: ScopesArguments) -> DebugResult<ScopesResponseBody> {
        let frames = self.debugger.stack_trace()?;
        let count = frames.len();
        let frame_id = args.frame_id.max(0) as usize;
        let original_index = count
            .checked_sub(1 + frame_id)
            .ok_or_else(|| DebugError::InvalidState(format!("unknown frame id {frame_id}")))?;
        let scope_handle = frames[original_index].scope;
        Ok(ScopesResponseBody {
            scopes: vec![Scope {
                name: "Locals".to_string(),
                presentation_hint: Some("locals".to_string()),
                variables_reference: scope_handle.0 as i64,
                named_variables: None,
                indexed_variables: None,
                expensive: false,
                source: None,
                line: None,
                column: None,
                end_line: None,
                end_column: None,
            }],
        })
    }

    pub fn handle_variables(&self, args: VariablesArguments) -> DebugResult<VariablesResponseBody> {
        let handle = Handle(args.variables_reference as u64);
        let entries = match self.debugger.variables(handle) {
            Ok(entries) => entries,
            Err(DebugError::UnknownHandle(_)) => self.debugger.expand_getter(handle)?,
            Err(e) => return Err(e),
        };
        Ok(VariablesResponseBody {
            variables: entries.into_iter().map(|(name, info)| variable_from(name, info)).collect(),
        })
    }

    pub fn handle_evaluate(&self, args: EvaluateArguments) -> DebugResult<EvaluateResponseBody> {
        let frame_index = args.frame_id.unwrap_or(0).max(0) as usize;
        let info = self.debugger.evaluate(frame_index, args.expression)?;
        Ok(EvaluateResponseBody {
            result: info.display(),
            type_: Some(value_type_name(&info).to_string()),
            presentation_hint: None,
            variables_reference: info.handle().0 as i64,
            named_variables: None,
            indexed_variables: None,
        })
    }

    pub fn handle_set_variable(&self, args: SetVariableArguments) -> DebugResult<SetVariableResponseBody> {
        let handle = Handle(args.variables_reference as u64);
        let info = self.debugger.set_variable(handle, args.name, args.value)?;
        Ok(SetVariableResponseBody {
            value: info.display(),
            type_: Some(value_type_name(&info).to_string()),
            variables_reference: Some(info.handle().0 as i64),
        })
    }

    pub fn handle_source(&self, args: SourceArguments) -> DebugResult<SourceResponseBody> {
        let path = args
            .source
            .and_then(|s| s.path.or(s.name))
            .ok_or_else(|| DebugError::InvalidState("source request carries no path".into()))?;
        let id = self
            .debugger
            .find_script_by_name(&path)
            .ok_or_else(|| DebugError::InvalidState(format!("unknown source {path}")))?;
        let info = self
            .debugger
            .script_info(id)
            .ok_or_else(|| DebugError::InvalidState(format!("unknown source {path}")))?;
        Ok(SourceResponseBody {
            content: info.source_text,
            mime_type: None,
        })
    }

    pub fn handle_threads(&self) -> ThreadsResponseBody {
        ThreadsResponseBody {
            threads: vec![Thread {
                id: 1,
                name: "main".to_string(),
            }],
        }
    }
}

fn source_ref(path: &str) -> Source {
    Source {
        name: std::path::Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned()),
        path: Some(path.to_string()),
        source_reference: None,
        presentation_hint: None,
        origin: None,
        sources: None,
        adapter_data: None,
        checksums: None,
    }
}

fn value_type_name(info: &ValueInfo) -> &'static str {
    match info {
        ValueInfo::Undefined => "undefined",
        ValueInfo::Null => "object",
        ValueInfo::Primitive { type_name, .. } => type_name,
        ValueInfo::Array { .. } => "object",
        ValueInfo::Function { .. } => "function",
        ValueInfo::Object { .. } => "object",
        ValueInfo::Getter { .. } => "getter",
    }
}

fn variable_from(name: String, info: ValueInfo) -> Variable {
    let type_name = value_type_name(&info);
    Variable {
        name,
        value: info.display(),
        type_: Some(type_name.to_string()),
        presentation_hint: None,
        evaluate_name: None,
        variables_reference: info.handle().0 as i64,
        named_variables: None,
        indexed_variables: None,
        memory_reference: None,
    }
}
