//! `boa` — a command-line front end for the Boa JavaScript engine with an
//! embedded Debug Adapter Protocol bridge.
//!
//! Run a script directly (`boa script.js`), or start a DAP session for an
//! editor to attach to (`boa --dap` over stdio, `boa --dap --port 4711`
//! over TCP).

mod debug;
mod logging;

use std::path::PathBuf;

use boa_engine::{Context, Source};
use clap::Parser;
use log::LevelFilter;

use debug::dap::{DapTransportMode, run_dap_server};
use logging::ScriptLogger;

/// Boa: an embedded JavaScript engine with a debug adapter.
#[derive(Debug, Parser)]
#[command(name = "boa", version, about)]
struct Cli {
    /// A JavaScript source file to execute directly.
    ///
    /// Ignored when `--dap` is set.
    script: Option<PathBuf>,

    /// Start a Debug Adapter Protocol server instead of running a script.
    #[arg(long)]
    dap: bool,

    /// Listen on a loopback TCP port instead of stdio. Implies `--dap`.
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,

    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let logger = ScriptLogger::install(level);

    if cli.dap || cli.port.is_some() {
        let mode = match cli.port {
            Some(port) => DapTransportMode::Tcp(port),
            None => DapTransportMode::Stdio,
        };
        run_dap_server(mode, logger)?;
        return Ok(());
    }

    let Some(path) = cli.script else {
        color_eyre::eyre::bail!("no script given; pass a file path or --dap");
    };

    let text = std::fs::read_to_string(&path)
        .map_err(|e| color_eyre::eyre::eyre!("failed to read {}: {e}", path.display()))?;
    let source = Source::from_filepath(&path, &text);
    let mut context = Context::default_with_hooks().map_err(|e| color_eyre::eyre::eyre!("{e}"))?;
    context
        .eval(&source)
        .map_err(|e| color_eyre::eyre::eyre!("{e}"))?;
    Ok(())
}
