//! CLI-side wiring for the debug adapter.

pub mod dap;
