//! Routes script console output (`print`/`console.log`, emitted by the
//! engine as `log` records under the `"script"` target) to wherever it needs
//! to go: a live [`Debugger`] when one is attached, plain stdout otherwise.
//! Every other log record is handed off to [`SimpleLogger`] unchanged.

use std::sync::Mutex;

use boa_engine::debugger::Debugger;
use log::{Level, LevelFilter, Log, Metadata, Record};
use simple_logger::SimpleLogger;

/// The process-wide logger. Installed once in `main`; a DAP session attaches
/// its `Debugger` to it for the duration of a `launch`.
pub struct ScriptLogger {
    inner: SimpleLogger,
    debugger: Mutex<Option<Debugger>>,
}

impl ScriptLogger {
    /// Install this logger as the global `log` sink at the given level.
    pub fn install(level: LevelFilter) -> &'static Self {
        let logger: &'static Self = Box::leak(Box::new(Self {
            inner: SimpleLogger::new().with_level(level),
            debugger: Mutex::new(None),
        }));
        log::set_logger(logger).expect("logger already installed");
        log::set_max_level(level);
        logger
    }

    /// Route subsequent `"script"`-target records to `debugger` instead of
    /// stdout. Call again with a fresh debugger for each `launch`.
    pub fn attach(&self, debugger: Debugger) {
        *self.debugger.lock().unwrap() = Some(debugger);
    }

    /// Stop routing script output anywhere but stdout.
    pub fn detach(&self) {
        *self.debugger.lock().unwrap() = None;
    }
}

impl Log for ScriptLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target() == "script" || self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if record.target() == "script" {
            if record.level() > Level::Info {
                return;
            }
            let message = record.args().to_string();
            match self.debugger.lock().unwrap().as_ref() {
                Some(debugger) => debugger.emit_output(message),
                None => println!("{message}"),
            }
            return;
        }
        self.inner.log(record);
    }

    fn flush(&self) {
        self.inner.flush();
    }
}
