//! Launches a [`DapServer`] over either transport the engine supports.
//!
//! The heavy lifting — spawning the interpreter thread, pumping engine
//! events onto the wire, answering requests — all lives in
//! `boa_engine::debugger::dap`; this module only wires a fresh [`Debugger`]
//! to the chosen [`Transport`] and to the process's [`ScriptLogger`] so that
//! `print`/`console.log` from the debuggee surfaces as DAP `output` events
//! instead of landing on stdout underneath the protocol framing.

use boa_engine::debugger::Debugger;
use boa_engine::debugger::dap::{DapServer, StdioTransport, TcpTransport, Transport};

use crate::logging::ScriptLogger;

/// Where a DAP client connects.
pub enum DapTransportMode {
    /// Standard input/output — the default, used when the client spawns
    /// this process directly.
    Stdio,
    /// A loopback TCP socket, for clients that attach rather than spawn.
    Tcp(u16),
}

/// Run one DAP session to completion on the chosen transport.
pub fn run_dap_server(mode: DapTransportMode, logger: &'static ScriptLogger) -> std::io::Result<()> {
    match mode {
        DapTransportMode::Stdio => {
            let mut transport = StdioTransport::new();
            serve(&mut transport, logger)
        }
        DapTransportMode::Tcp(port) => {
            let mut transport = TcpTransport::listen(port)?;
            serve(&mut transport, logger)
        }
    }
}

fn serve(transport: &mut impl Transport, logger: &'static ScriptLogger) -> std::io::Result<()> {
    let debugger = Debugger::new();
    logger.attach(debugger.clone());
    let server = DapServer::new(debugger, transport);
    let result = server.run(transport);
    logger.detach();
    result
}
