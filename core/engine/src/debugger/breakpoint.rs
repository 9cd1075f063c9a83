//! Breakpoint storage and hit evaluation.
//!
//! A breakpoint binds to an exact `(script, position)` site, snapped there
//! in advance by [`crate::debugger::script_registry::ScriptRegistry`]. Hit
//! evaluation order is: hit-condition first, log-message second — a
//! logpoint whose hit count has not yet been reached does not fire its log
//! message, and a conditional breakpoint whose condition is false never
//! increments its hit count.

use rustc_hash::FxHashMap;

use crate::ast::Position;
use crate::debugger::ScriptId;

/// Unique identifier for a breakpoint, stable for the breakpoint's
/// lifetime (until cleared).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BreakpointId(pub usize);

/// The snapped site a breakpoint was installed at, returned from
/// [`BreakpointTable::set`] so the caller can report the verified
/// line/column back to the client.
#[derive(Debug, Clone, Copy)]
pub struct BreakpointSite {
    /// The id assigned to the new breakpoint.
    pub id: BreakpointId,
    /// The exact position it was snapped to.
    pub position: Position,
}

/// A parsed `hitCondition` expression: `"N"`, `">= N"`, `"> N"`, `"== N"`,
/// or `"% N"` (fires every Nth hit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitCondition {
    /// Fires once hit count reaches exactly `N`.
    Equal(u32),
    /// Fires once hit count is at least `N`.
    AtLeast(u32),
    /// Fires once hit count exceeds `N`.
    GreaterThan(u32),
    /// Fires every `N`th hit (hit count is a multiple of `N`).
    Multiple(u32),
}

impl HitCondition {
    /// Parse a `hitCondition` string. Bare numbers mean [`HitCondition::Equal`].
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix(">=") {
            return rest.trim().parse().ok().map(HitCondition::AtLeast);
        }
        if let Some(rest) = s.strip_prefix('>') {
            return rest.trim().parse().ok().map(HitCondition::GreaterThan);
        }
        if let Some(rest) = s.strip_prefix("==") {
            return rest.trim().parse().ok().map(HitCondition::Equal);
        }
        if let Some(rest) = s.strip_prefix('%') {
            return rest.trim().parse().ok().map(HitCondition::Multiple);
        }
        s.parse().ok().map(HitCondition::Equal)
    }

    fn satisfied_by(self, hits: u32) -> bool {
        match self {
            HitCondition::Equal(n) => hits == n,
            HitCondition::AtLeast(n) => hits >= n,
            HitCondition::GreaterThan(n) => hits > n,
            HitCondition::Multiple(n) => n != 0 && hits % n == 0,
        }
    }
}

/// A single installed breakpoint.
#[derive(Debug, Clone)]
pub struct Breakpoint {
    /// This breakpoint's id.
    pub id: BreakpointId,
    /// The script it is bound to.
    pub script: ScriptId,
    /// The exact statement position it is bound to.
    pub position: Position,
    /// An optional boolean expression; the breakpoint only fires when this
    /// evaluates truthy. Evaluated by the caller (the Session Controller,
    /// which has access to the live interpreter); this table only stores
    /// the source text.
    pub condition: Option<String>,
    /// An optional hit-count condition.
    pub hit_condition: Option<HitCondition>,
    /// An optional log message; when present this is a logpoint: it never
    /// pauses execution, only emits a formatted message.
    pub log_message: Option<String>,
    /// Number of times this breakpoint's site has been reached (whether or
    /// not it ultimately fired).
    pub hits: u32,
}

/// The outcome of evaluating a breakpoint hit, after the caller has
/// resolved `condition`/`log_message` against the live interpreter.
#[derive(Debug, Clone)]
pub enum HitDecision {
    /// Execution should pause.
    Break(BreakpointId),
    /// A logpoint fired; execution continues. The caller already has the
    /// log message template (from [`BreakpointTable::peek`]) and is
    /// responsible for substituting `{expr}` placeholders and emitting it.
    Log,
    /// The site has a breakpoint but it did not fire this time (condition
    /// false, or hit-condition not yet met).
    Skip,
}

/// Breakpoints indexed by their exact site.
#[derive(Debug, Default)]
pub struct BreakpointTable {
    sites: FxHashMap<(ScriptId, Position), Breakpoint>,
    next_id: usize,
}

impl BreakpointTable {
    /// An empty table.
    pub fn new() -> Self {
        Self {
            sites: FxHashMap::default(),
            next_id: 1,
        }
    }

    /// Install (or replace) a breakpoint at an already-snapped site.
    pub fn set(
        &mut self,
        script: ScriptId,
        position: Position,
        condition: Option<String>,
        hit_condition: Option<String>,
        log_message: Option<String>,
    ) -> BreakpointSite {
        let id = BreakpointId(self.next_id);
        self.next_id += 1;
        let hit_condition = hit_condition.and_then(|s| HitCondition::parse(&s));
        self.sites.insert(
            (script, position),
            Breakpoint {
                id,
                script,
                position,
                condition,
                hit_condition,
                log_message,
                hits: 0,
            },
        );
        BreakpointSite { id, position }
    }

    /// Remove every breakpoint bound to `script`.
    pub fn clear_script(&mut self, script: ScriptId) {
        self.sites.retain(|(s, _), _| *s != script);
    }

    /// Whether `(script, position)` has an installed breakpoint, regardless
    /// of its condition. Used to decide whether a statement dispatches
    /// through `on_step` or `on_break`.
    pub fn has_site(&self, script: ScriptId, position: Position) -> bool {
        self.sites.contains_key(&(script, position))
    }

    /// A snapshot of the breakpoint at a site, if any, without recording a
    /// hit. Used by the caller to fetch `condition`/`log_message` before
    /// evaluating them against the live interpreter.
    pub fn peek(&self, script: ScriptId, position: Position) -> Option<Breakpoint> {
        self.sites.get(&(script, position)).cloned()
    }

    /// Record a hit and decide the outcome, given the already-evaluated
    /// condition result. Hit-condition is checked before the log message is
    /// considered, per this table's normative ordering.
    pub fn record_hit(
        &mut self,
        script: ScriptId,
        position: Position,
        condition_passed: bool,
    ) -> HitDecision {
        let Some(bp) = self.sites.get_mut(&(script, position)) else {
            return HitDecision::Skip;
        };
        if !condition_passed {
            return HitDecision::Skip;
        }
        bp.hits += 1;
        if let Some(hit_condition) = bp.hit_condition {
            if !hit_condition.satisfied_by(bp.hits) {
                return HitDecision::Skip;
            }
        }
        match &bp.log_message {
            Some(_) => HitDecision::Log,
            None => HitDecision::Break(bp.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: u32) -> Position {
        Position::new(line, 1)
    }

    #[test]
    fn set_then_clear_is_idempotent() {
        let mut table = BreakpointTable::new();
        let site = table.set(ScriptId(1), pos(3), None, None, None);
        assert!(table.has_site(ScriptId(1), pos(3)));
        table.clear_script(ScriptId(1));
        assert!(!table.has_site(ScriptId(1), pos(3)));
        // A second clear of an already-empty table is a no-op.
        table.clear_script(ScriptId(1));
        assert!(table.peek(ScriptId(1), pos(3)).is_none());
        let _ = site;
    }

    #[test]
    fn plain_breakpoint_breaks_on_first_hit() {
        let mut table = BreakpointTable::new();
        table.set(ScriptId(1), pos(1), None, None, None);
        match table.record_hit(ScriptId(1), pos(1), true) {
            HitDecision::Break(_) => {}
            other => panic!("expected Break, got {other:?}"),
        }
    }

    #[test]
    fn false_condition_suppresses_the_hit_without_incrementing() {
        let mut table = BreakpointTable::new();
        table.set(ScriptId(1), pos(1), Some("i===2".into()), None, None);
        assert!(matches!(
            table.record_hit(ScriptId(1), pos(1), false),
            HitDecision::Skip
        ));
        assert_eq!(table.peek(ScriptId(1), pos(1)).unwrap().hits, 0);
    }

    #[test]
    fn hit_condition_gates_before_log_message_fires() {
        let mut table = BreakpointTable::new();
        table.set(
            ScriptId(1),
            pos(1),
            None,
            Some(">= 2".into()),
            Some("i is {i}".into()),
        );
        assert!(matches!(
            table.record_hit(ScriptId(1), pos(1), true),
            HitDecision::Skip
        ));
        assert!(matches!(
            table.record_hit(ScriptId(1), pos(1), true),
            HitDecision::Log
        ));
    }

    #[test_case::test_case("3", Some(HitCondition::Equal(3)); "bare number means equal")]
    #[test_case::test_case(">= 3", Some(HitCondition::AtLeast(3)); "at-least form")]
    #[test_case::test_case("> 3", Some(HitCondition::GreaterThan(3)); "greater-than form")]
    #[test_case::test_case("== 3", Some(HitCondition::Equal(3)); "explicit equal form")]
    #[test_case::test_case("% 2", Some(HitCondition::Multiple(2)); "multiple-of form")]
    #[test_case::test_case("not a number", None; "garbage input is rejected")]
    fn hit_condition_variants_parse(input: &str, expected: Option<HitCondition>) {
        assert_eq!(HitCondition::parse(input), expected);
    }
}
