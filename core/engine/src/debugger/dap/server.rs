//! The DAP request/response loop and the background thread that pumps
//! [`DebugEvent`]s onto the wire as DAP events.
//!
//! One [`DapServer`] owns one [`Transport`] and one [`DebugSession`]. The
//! main thread blocks in [`Transport::read_message`], dispatching each
//! request to the session and writing back a response; a second thread
//! drains the session's event channel and turns each [`DebugEvent`] into the
//! matching `stopped`/`continued`/`output`/`breakpoint`/`terminated` event.
//! Both threads write through the same [`MessageWriter`] behind a mutex, and
//! share one sequence counter, so interleaved events and responses still get
//! strictly increasing `seq` numbers as the protocol requires.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::Value;

use super::messages::*;
use super::session::DebugSession;
use super::transport::{MessageWriter, Transport};
use super::{Event, ProtocolMessage, Request, Response};
use crate::debugger::state::{DebugEvent, PauseReason};
use crate::debugger::Debugger;

type Writer = Arc<Mutex<Box<dyn MessageWriter>>>;

/// Drives one DAP client connection to completion.
pub struct DapServer {
    session: Arc<DebugSession>,
    writer: Writer,
    seq: Arc<AtomicI64>,
}

impl DapServer {
    /// Build a server around a freshly constructed [`Debugger`] and an
    /// already-connected transport.
    pub fn new(debugger: Debugger, transport: &mut impl Transport) -> Self {
        let (session, events) = DebugSession::new(debugger);
        let session = Arc::new(session);
        let writer: Writer = Arc::new(Mutex::new(transport.writer_handle()));
        let seq = Arc::new(AtomicI64::new(1));
        spawn_event_pump(Arc::clone(&session), Arc::clone(&writer), Arc::clone(&seq), events);
        Self { session, writer, seq }
    }

    /// Run the request/response loop until the transport closes or a
    /// `disconnect` request is handled.
    pub fn run(&self, transport: &mut impl Transport) -> std::io::Result<()> {
        loop {
            let raw = match transport.read_message() {
                Ok(raw) => raw,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(e),
            };
            let message: ProtocolMessage = match serde_json::from_str(&raw) {
                Ok(m) => m,
                Err(_) => continue,
            };
            let ProtocolMessage::Request(request) = message else {
                continue;
            };
            let is_disconnect = request.command == "disconnect";
            let response = self.handle_request(&request);
            self.write_response(response)?;
            if is_disconnect {
                return Ok(());
            }
        }
    }

    fn handle_request(&self, request: &Request) -> Response {
        let command = request.command.clone();
        match self.dispatch(request) {
            Ok(body) => Response {
                seq: 0,
                request_seq: request.seq,
                success: true,
                command,
                message: None,
                body,
            },
            Err(message) => Response {
                seq: 0,
                request_seq: request.seq,
                success: false,
                command,
                message: Some(message),
                body: None,
            },
        }
    }

    fn dispatch(&self, request: &Request) -> Result<Option<Value>, String> {
        let args = || request.arguments.clone().unwrap_or(Value::Null);
        let parse = |v: Value| serde_json::from_value(v).map_err(|e| e.to_string());
        let to_value = |v: impl serde::Serialize| Some(serde_json::to_value(v).expect("DAP bodies always serialize"));

        match request.command.as_str() {
            "initialize" => Ok(to_value(self.session.handle_initialize(parse(args())?))),
            "launch" => {
                self.session.handle_launch(parse(args())?).map_err(|e| e.to_string())?;
                Ok(None)
            }
            "attach" => {
                self.session.handle_attach(parse(args())?).map_err(|e| e.to_string())?;
                Ok(None)
            }
            "configurationDone" => {
                self.session.handle_configuration_done().map_err(|e| e.to_string())?;
                Ok(None)
            }
            "setBreakpoints" => Ok(to_value(self.session.handle_set_breakpoints(parse(args())?))),
            "continue" => Ok(to_value(
                self.session
                    .handle_continue(parse(args())?)
                    .map_err(|e| e.to_string())?,
            )),
            "next" => {
                self.session.handle_next(parse(args())?).map_err(|e| e.to_string())?;
                Ok(None)
            }
            "stepIn" => {
                self.session.handle_step_in(parse(args())?).map_err(|e| e.to_string())?;
                Ok(None)
            }
            "stepOut" => {
                self.session.handle_step_out(parse(args())?).map_err(|e| e.to_string())?;
                Ok(None)
            }
            "pause" => {
                self.session.handle_pause(parse(args())?).map_err(|e| e.to_string())?;
                Ok(None)
            }
            "terminate" => {
                self.session.handle_terminate(parse(args())?);
                Ok(None)
            }
            "disconnect" => {
                self.session.handle_disconnect(parse(args())?);
                Ok(None)
            }
            "stackTrace" => Ok(to_value(
                self.session
                    .handle_stack_trace(parse(args())?)
                    .map_err(|e| e.to_string())?,
            )),
            "scopes" => Ok(to_value(
                self.session.handle_scopes(parse(args())?).map_err(|e| e.to_string())?,
            )),
            "variables" => Ok(to_value(
                self.session
                    .handle_variables(parse(args())?)
                    .map_err(|e| e.to_string())?,
            )),
            "evaluate" => Ok(to_value(
                self.session
                    .handle_evaluate(parse(args())?)
                    .map_err(|e| e.to_string())?,
            )),
            "setVariable" => Ok(to_value(
                self.session
                    .handle_set_variable(parse(args())?)
                    .map_err(|e| e.to_string())?,
            )),
            "threads" => Ok(to_value(self.session.handle_threads())),
            "source" => Ok(to_value(
                self.session.handle_source(parse(args())?).map_err(|e| e.to_string())?,
            )),
            other => Err(format!("unrecognized command: {other}")),
        }
    }

    fn write_response(&self, mut response: Response) -> std::io::Result<()> {
        response.seq = self.seq.fetch_add(1, Ordering::SeqCst);
        write_message(&self.writer, &ProtocolMessage::Response(response))
    }
}

fn spawn_event_pump(session: Arc<DebugSession>, writer: Writer, seq: Arc<AtomicI64>, events: Receiver<DebugEvent>) {
    thread::spawn(move || {
        for event in events {
            match event {
                DebugEvent::Stopped(reason) => {
                    let hit_breakpoint_ids = match reason {
                        PauseReason::Breakpoint(id) => Some(vec![id.0 as i64]),
                        _ => None,
                    };
                    emit(
                        &writer,
                        &seq,
                        "stopped",
                        StoppedEventBody {
                            reason: stop_reason_name(&reason).to_string(),
                            description: None,
                            thread_id: Some(1),
                            preserve_focus_hint: None,
                            text: None,
                            all_threads_stopped: true,
                            hit_breakpoint_ids,
                        },
                    );
                }
                DebugEvent::Continued => emit(
                    &writer,
                    &seq,
                    "continued",
                    ContinuedEventBody {
                        thread_id: 1,
                        all_threads_continued: true,
                    },
                ),
                DebugEvent::LogPoint(message) | DebugEvent::Output(message) => {
                    emit(&writer, &seq, "output", output_body("console", &message));
                }
                DebugEvent::ScriptRegistered { id, path } => {
                    for breakpoint in session.resolve_pending_breakpoints(id, &path) {
                        emit(
                            &writer,
                            &seq,
                            "breakpoint",
                            BreakpointEventBody {
                                reason: "changed".to_string(),
                                breakpoint,
                            },
                        );
                    }
                }
                DebugEvent::Terminated | DebugEvent::Cancelled => {
                    emit(&writer, &seq, "terminated", TerminatedEventBody { restart: None });
                }
                DebugEvent::EngineFault(message) => {
                    emit(&writer, &seq, "output", output_body("stderr", &message));
                }
            }
        }
    });
}

fn output_body(category: &str, message: &str) -> OutputEventBody {
    OutputEventBody {
        category: Some(category.to_string()),
        output: format!("{message}\n"),
        group: None,
        variables_reference: None,
        source: None,
        line: None,
        column: None,
        data: None,
    }
}

fn emit(writer: &Writer, seq: &Arc<AtomicI64>, event: &str, body: impl serde::Serialize) {
    let envelope = ProtocolMessage::Event(Event {
        seq: seq.fetch_add(1, Ordering::SeqCst),
        event: event.to_string(),
        body: Some(serde_json::to_value(body).expect("DAP event bodies always serialize")),
    });
    let _ = write_message(writer, &envelope);
}

fn write_message(writer: &Writer, message: &ProtocolMessage) -> std::io::Result<()> {
    let json = serde_json::to_string(message).expect("DAP messages always serialize");
    writer.lock().unwrap().write_message(&json)
}

fn stop_reason_name(reason: &PauseReason) -> &'static str {
    match reason {
        PauseReason::Entry => "entry",
        PauseReason::Step => "step",
        PauseReason::Breakpoint(_) => "breakpoint",
        PauseReason::DebuggerStatement => "debugger_statement",
        PauseReason::PauseRequested => "pause",
    }
}
