//! Tracks every script handed to [`crate::Context::eval`] and answers
//! breakpoint-snapping queries against it.

use rustc_hash::FxHashMap;

use crate::ast::{Position, Program, breakpointable_positions};
use crate::source::Source;

pub use super::ScriptId;

/// What the registry retains about one registered script.
#[derive(Debug, Clone)]
pub struct ScriptInfo {
    /// The path the source was loaded from, if any, else a synthetic name.
    pub name: String,
    /// The full source text, used to render source in DAP `Source` bodies.
    pub source_text: String,
    /// Every statement-boundary position a breakpoint may legally bind to,
    /// sorted and deduplicated.
    pub breakpointable_positions: Vec<Position>,
}

/// Maps [`ScriptId`] to [`ScriptInfo`] and snaps requested breakpoint
/// positions to the nearest legal statement boundary.
#[derive(Debug, Default)]
pub struct ScriptRegistry {
    scripts: FxHashMap<ScriptId, ScriptInfo>,
    next_id: usize,
}

impl ScriptRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            scripts: FxHashMap::default(),
            next_id: 1,
        }
    }

    /// Register a freshly parsed program, returning the id future
    /// operations reference it by. Ids are assigned monotonically and are
    /// never reused within a session.
    pub fn register(&mut self, source: &Source, program: &Program) -> ScriptId {
        let id = ScriptId(self.next_id);
        self.next_id += 1;
        let name = source
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| format!("<script {}>", id.0));
        self.scripts.insert(
            id,
            ScriptInfo {
                name,
                source_text: source.text().to_string(),
                breakpointable_positions: breakpointable_positions(program),
            },
        );
        id
    }

    /// Look up a script's retained info.
    pub fn info(&self, id: ScriptId) -> Option<&ScriptInfo> {
        self.scripts.get(&id)
    }

    /// Find the script id whose name matches `name`, if any. Used when a
    /// DAP `setBreakpoints` request names a source path the client hasn't
    /// been told a [`ScriptId`] for yet (the script may not have been
    /// parsed when the request arrives).
    pub fn find_by_name(&self, name: &str) -> Option<ScriptId> {
        self.scripts
            .iter()
            .find(|(_, info)| info.name == name)
            .map(|(id, _)| *id)
    }

    /// Snap a requested (line, column) to the least breakpointable position
    /// at or after the request. Returns `None` (the caller reports
    /// `NoBreakpointLocation`) if the script is unknown or no breakpointable
    /// position exists at or after `(line, column)` in the whole script —
    /// the result never precedes the request, matching the `p' ≥ p`
    /// invariant.
    pub fn snap_breakpoint(&self, script: ScriptId, line: u32, column: u32) -> Option<Position> {
        let info = self.scripts.get(&script)?;
        let requested = Position::new(line, column);

        info.breakpointable_positions
            .iter()
            .find(|p| **p >= requested)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::source::Source;

    fn register(registry: &mut ScriptRegistry, text: &str) -> ScriptId {
        let source = Source::from_bytes(text);
        let program = parse(text).unwrap();
        registry.register(&source, &program)
    }

    #[test]
    fn snap_returns_the_requested_position_when_it_is_already_breakpointable() {
        let mut registry = ScriptRegistry::new();
        let id = register(&mut registry, "var x = 1;\nvar y = 2;\n");
        let snapped = registry.snap_breakpoint(id, 2, 1).unwrap();
        assert_eq!(snapped, Position::new(2, 1));
    }

    #[test]
    fn snap_falls_forward_to_the_next_breakpointable_position_on_the_line() {
        let mut registry = ScriptRegistry::new();
        let id = register(&mut registry, "var x = 1; var y = 2;\n");
        // Column 5 sits inside the first statement; the nearest legal site
        // at or after it is `var y`'s column.
        let snapped = registry.snap_breakpoint(id, 1, 5).unwrap();
        assert!(snapped >= Position::new(1, 5));
    }

    #[test]
    fn snap_falls_forward_across_lines_when_none_remain_on_the_requested_line() {
        let mut registry = ScriptRegistry::new();
        let id = register(&mut registry, "var x = 1;\nvar y = 2;\n");
        let snapped = registry.snap_breakpoint(id, 1, 999).unwrap();
        assert_eq!(snapped, Position::new(2, 1));
    }

    #[test]
    fn snap_fails_past_the_end_of_the_script() {
        let mut registry = ScriptRegistry::new();
        let id = register(&mut registry, "var x = 1;\n");
        assert!(registry.snap_breakpoint(id, 50, 1).is_none());
    }

    #[test]
    fn ids_are_assigned_monotonically_and_never_reused() {
        let mut registry = ScriptRegistry::new();
        let a = register(&mut registry, "var a = 1;\n");
        let b = register(&mut registry, "var b = 2;\n");
        assert_ne!(a, b);
    }

    #[test]
    fn find_by_name_resolves_a_registered_path() {
        let mut registry = ScriptRegistry::new();
        let source = Source::from_filepath("demo.js", "var x = 1;\n");
        let program = parse("var x = 1;\n").unwrap();
        let id = registry.register(&source, &program);
        assert_eq!(registry.find_by_name("demo.js"), Some(id));
        assert_eq!(registry.find_by_name("missing.js"), None);
    }
}
