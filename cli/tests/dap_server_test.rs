//! Integration tests for the Debug Adapter Protocol bridge.
//!
//! These drive `DebugSession` and `DapServer` directly rather than spawning
//! the `boa` binary as a subprocess: a `DebugSession` is cheap to build and
//! every request handler is a plain method, so there is no need to pay for
//! process startup and stdio framing just to exercise them.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use boa_engine::debugger::dap::messages::*;
use boa_engine::debugger::dap::session::DebugSession;
use boa_engine::debugger::dap::{DapServer, TcpTransport};
use boa_engine::debugger::{DebugEvent, Debugger, PauseReason};

fn init_args() -> InitializeRequestArguments {
    InitializeRequestArguments {
        client_id: Some("test".to_string()),
        client_name: Some("test client".to_string()),
        adapter_id: Some("boa".to_string()),
        locale: Some("en-US".to_string()),
        lines_start_at_1: true,
        columns_start_at_1: true,
        path_format: Some("path".to_string()),
        supports_variable_type: true,
        supports_variable_paging: false,
        supports_run_in_terminal_request: false,
        supports_memory_references: false,
        supports_progress_reporting: false,
        supports_invalidated_event: false,
    }
}

#[test]
fn initialize_reports_breakpoint_and_stepping_capabilities() {
    let (session, _events) = DebugSession::new(Debugger::new());
    let caps = session.handle_initialize(init_args());

    assert!(caps.supports_configuration_done_request);
    assert!(caps.supports_conditional_breakpoints);
    assert!(caps.supports_hit_conditional_breakpoints);
    assert!(caps.supports_log_points);
    assert!(caps.supports_set_variable);
    assert!(caps.supports_terminate_request);
    // Never advertised: there is exactly one interpreter thread per session.
    assert!(!caps.supports_restart_request);
}

#[test]
fn threads_reports_a_single_main_thread() {
    let (session, _events) = DebugSession::new(Debugger::new());
    let body = session.handle_threads();

    assert_eq!(body.threads.len(), 1);
    assert_eq!(body.threads[0].id, 1);
    assert_eq!(body.threads[0].name, "main");
}

#[test]
fn set_breakpoints_on_an_unregistered_script_is_unverified_but_pending() {
    let (session, _events) = DebugSession::new(Debugger::new());
    let body = session.handle_set_breakpoints(SetBreakpointsArguments {
        source: Source {
            name: Some("unseen.js".to_string()),
            path: Some("unseen.js".to_string()),
            source_reference: None,
            presentation_hint: None,
            origin: None,
            sources: None,
            adapter_data: None,
            checksums: None,
        },
        breakpoints: Some(vec![SourceBreakpoint {
            line: 3,
            column: None,
            condition: None,
            hit_condition: None,
            log_message: None,
        }]),
        lines: None,
        source_modified: None,
    });

    assert_eq!(body.breakpoints.len(), 1);
    assert!(!body.breakpoints[0].verified);
    assert!(body.breakpoints[0].message.is_some());
}

#[test]
fn evaluate_without_a_pause_reports_invalid_state() {
    let (session, _events) = DebugSession::new(Debugger::new());
    let err = session
        .handle_evaluate(EvaluateArguments {
            expression: "1 + 1".to_string(),
            frame_id: None,
            context: None,
            format: None,
        })
        .expect_err("nothing is paused yet");
    assert!(err.to_string().contains("invalid state") || err.to_string().contains("not paused"));
}

/// Writes a throwaway script next to the test binary and returns its path.
fn write_script(name: &str, body: &str) -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("boa-dap-test-{}-{}.js", std::process::id(), name));
    std::fs::write(&path, body).expect("can write temp script");
    path
}

#[test]
fn launch_with_stop_on_entry_pauses_before_the_first_statement() {
    let script = write_script("entry", "var x = 1;\nvar y = 2;\n");
    let (session, events) = DebugSession::new(Debugger::new());

    session
        .handle_launch(LaunchRequestArguments {
            no_debug: None,
            program: Some(script.to_string_lossy().into_owned()),
            args: None,
            cwd: None,
            env: None,
            stop_on_entry: Some(true),
        })
        .expect("launch accepts a readable program");

    session
        .handle_configuration_done()
        .expect("releases the interpreter thread parked on wait_for_ui_ready");

    let event = events
        .recv_timeout(Duration::from_secs(5))
        .expect("entry stop is reported before any timeout");
    assert!(matches!(event, DebugEvent::Stopped(PauseReason::Entry)));

    let trace = session
        .handle_stack_trace(StackTraceArguments {
            thread_id: 1,
            start_frame: None,
            levels: None,
            format: None,
        })
        .expect("paused, so a stack trace is available");
    assert_eq!(trace.stack_frames.len(), 1);
    assert_eq!(trace.stack_frames[0].line, 1);

    session.handle_continue(ContinueArguments { thread_id: 1, single_thread: None }).expect("resume to completion");

    let terminated = events.recv_timeout(Duration::from_secs(5)).expect("script runs to completion");
    assert!(matches!(terminated, DebugEvent::Continued));
    let terminated = events.recv_timeout(Duration::from_secs(5)).expect("terminated follows completion");
    assert!(matches!(terminated, DebugEvent::Terminated));

    std::fs::remove_file(&script).ok();
}

#[test]
fn unrecognized_command_fails_without_tearing_down_the_connection() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("loopback bind always succeeds");
        listener.local_addr().unwrap().port()
    };

    let server_thread = std::thread::spawn(move || {
        let mut transport = TcpTransport::listen(port).expect("one client connects");
        let server = DapServer::new(Debugger::new(), &mut transport);
        server.run(&mut transport).ok();
    });

    // Give the listener a moment to bind before connecting.
    std::thread::sleep(Duration::from_millis(50));
    let mut client = TcpStream::connect(("127.0.0.1", port)).expect("server is listening");

    let request = serde_json::json!({
        "seq": 1,
        "type": "request",
        "command": "frobnicate",
    });
    let body = serde_json::to_string(&request).unwrap();
    write!(client, "Content-Length: {}\r\n\r\n{}", body.len(), body).unwrap();
    client.flush().unwrap();

    let response = read_one_message(&mut client);
    assert_eq!(response["type"], "response");
    assert_eq!(response["success"], false);
    assert_eq!(response["command"], "frobnicate");

    // Tear the connection down so the server thread's read loop exits.
    drop(client);
    server_thread.join().ok();
}

/// Minimal blocking reader for one `Content-Length`-framed DAP message,
/// good enough for a single request/response exchange in a test.
fn read_one_message(stream: &mut TcpStream) -> serde_json::Value {
    let mut header = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        stream.read_exact(&mut byte).expect("header byte");
        header.push(byte[0]);
        if header.ends_with(b"\r\n\r\n") {
            break;
        }
    }
    let header = String::from_utf8(header).unwrap();
    let len: usize = header
        .lines()
        .find(|l| l.starts_with("Content-Length:"))
        .and_then(|l| l.split(':').nth(1))
        .and_then(|s| s.trim().parse().ok())
        .expect("Content-Length header present");
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).expect("message body");
    serde_json::from_slice(&body).expect("valid JSON")
}
