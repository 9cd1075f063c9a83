//! Read-only views over debuggee state, handed to the DAP layer for
//! `stackTrace`/`scopes` responses.

use crate::ast::Position;
use crate::context::Context;
use crate::debugger::variable_store::Handle;
use crate::debugger::{FrameId, ScriptId};

/// A snapshot of one call-stack frame, taken at pause time.
#[derive(Debug, Clone)]
pub struct DebuggerFrame {
    /// A stable id for this frame for the duration of the pause.
    pub id: FrameId,
    /// The function name, or `None` for the top-level frame.
    pub function_name: Option<String>,
    /// Which script this frame is executing in.
    pub script: ScriptId,
    /// The statement currently executing.
    pub position: Position,
    /// The variable-reference handle naming this frame's local scope.
    /// [`Handle::NONE`] until [`crate::debugger::state::Debugger`]'s pause
    /// setup fills it in — [`Self::capture_stack`] has no access to the
    /// Variable Store that mints it.
    pub scope: Handle,
}

impl DebuggerFrame {
    /// Snapshot the full call stack, outermost frame first (index 0 is the
    /// program's top level, the last entry is the innermost/current frame).
    pub fn capture_stack(context: &Context) -> Vec<DebuggerFrame> {
        context
            .call_stack()
            .iter()
            .enumerate()
            .map(|(i, frame)| DebuggerFrame {
                id: FrameId(i),
                function_name: frame.function_name.clone(),
                script: frame.script_id,
                position: frame.position,
                scope: Handle::NONE,
            })
            .collect()
    }
}
