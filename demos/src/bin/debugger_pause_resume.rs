//! Demonstrates the debugger's pause/resume rendezvous without a DAP client
//! in the loop: one thread drives the interpreter, another plays the role
//! of a client issuing `run()` after a delay.
//!
//! A [`Debugger`] is `Clone` and already internally shared (an
//! `Arc<Mutex<Inner>>` plus a `Condvar`), so no extra synchronization
//! wrapper is needed around it — cloning it and handing one clone to the
//! interpreter thread's `Context` and keeping another on the "client"
//! thread is the whole story.

use std::rc::Rc;
use std::thread;
use std::time::Duration;

use boa_engine::Source;
use boa_engine::context::ContextBuilder;
use boa_engine::debugger::{DebugEvent, Debugger};

fn main() -> boa_engine::JsResult<()> {
    let debugger = Debugger::new();
    let (tx, rx) = std::sync::mpsc::channel();
    debugger.set_event_sink(tx);

    let interpreter_debugger = debugger.clone();
    let interpreter = thread::spawn(move || {
        let mut context = ContextBuilder::new()
            .host_hooks(Rc::new(interpreter_debugger.clone()))
            .build()
            .expect("default hooks never fail to build");
        interpreter_debugger.attach(&mut context).expect("fresh debugger attaches cleanly");
        interpreter_debugger.wait_for_ui_ready();

        let source = Source::from_bytes(
            r"
            var x = 1 + 1;
            debugger; // execution pauses here until the client calls run()
            var y = 2 + 2;
            y;
            ",
        );
        let result = context.eval(&source);
        interpreter_debugger.detach();
        result
    });

    // Stand in for a DAP client: print every event, and resume the script
    // two seconds after it stops at the `debugger;` statement.
    let client_debugger = debugger.clone();
    let client = thread::spawn(move || {
        for event in rx {
            println!("[client] {event:?}");
            if matches!(event, DebugEvent::Stopped(_)) {
                thread::sleep(Duration::from_secs(2));
                println!("[client] resuming");
                client_debugger.run().expect("paused, so run() is legal");
            }
        }
    });

    // Stand in for the client finishing its initial breakpoint setup and
    // releasing the parked interpreter thread.
    debugger.notify_ui_ready().expect("still waiting for the client");

    let result = interpreter.join().expect("interpreter thread should not panic");
    client.join().expect("client thread should not panic");
    result.map(|_| ())
}
