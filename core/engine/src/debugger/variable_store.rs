//! The Variable Store: monotonic handles over materialized snapshots of
//! scopes and objects, backing DAP `scopes`/`variables`/`setVariable`.
//!
//! A [`Debugger`](super::Debugger) is shared across threads (`Arc<Mutex<_>>`),
//! but the live object graph (`Rc`-based, see [`crate::value`]) is not
//! `Send`. [`VariableStore`] therefore only ever holds owned, `Send`-safe
//! [`ValueInfo`] snapshots; the live `Rc` handles a snapshot was taken from
//! are kept separately, confined to the interpreter thread, in
//! [`LiveHandles`], which only exists for the duration of one pause.

use std::collections::HashSet;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::value::{Environment, JsFunction, JsObjectRef, JsValue, PropertyValue};

/// A resolved getter invocation target: the function to call and the
/// object it was read off of (its `this` binding for the purposes of this
/// toy language, which has no explicit `this`).
pub(crate) type GetterTarget = (Rc<JsFunction>, JsObjectRef);

/// A variable-reference handle. `0` means "not inspectable" (a primitive
/// value with nothing to expand); real handles start at 1 and are never
/// reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub u64);

impl Handle {
    /// The reserved "nothing to expand" handle.
    pub const NONE: Handle = Handle(0);
}

/// An owned, `Send`-safe description of a value, suitable for a DAP
/// `variables` response body.
#[derive(Debug, Clone)]
pub enum ValueInfo {
    /// `undefined`.
    Undefined,
    /// `null`.
    Null,
    /// A boolean, number, or string, pre-rendered to its display form.
    Primitive { type_name: &'static str, display: String },
    /// An array-like object.
    Array { handle: Handle, length: usize },
    /// A callable.
    Function { name: Option<String> },
    /// A plain object.
    Object { handle: Handle },
    /// A getter property that has not yet been invoked. `handle` names the
    /// pending invocation; resolving it replaces this entry with whatever
    /// the getter returns.
    Getter { handle: Handle },
}

impl ValueInfo {
    /// A short display string, used for DAP `variables` `value` fields.
    pub fn display(&self) -> String {
        match self {
            ValueInfo::Undefined => "undefined".to_string(),
            ValueInfo::Null => "null".to_string(),
            ValueInfo::Primitive { display, .. } => display.clone(),
            ValueInfo::Array { length, .. } => format!("Array({length})"),
            ValueInfo::Function { name } => format!("function {}()", name.as_deref().unwrap_or("anonymous")),
            ValueInfo::Object { .. } => "Object".to_string(),
            ValueInfo::Getter { .. } => "<getter>".to_string(),
        }
    }

    /// The variable-reference handle a client would send back to expand
    /// this value, or [`Handle::NONE`] if it is a leaf.
    pub fn handle(&self) -> Handle {
        match self {
            ValueInfo::Array { handle, .. }
            | ValueInfo::Object { handle }
            | ValueInfo::Getter { handle } => *handle,
            _ => Handle::NONE,
        }
    }
}

/// What a handle resolves to on the interpreter thread, for `setVariable`
/// and getter invocation. Not `Send`; lives only as long as one pause.
enum Container {
    Env(Rc<Environment>),
    Obj(JsObjectRef),
}

/// The live, thread-confined counterpart of a pause's handles: the actual
/// `Rc`-based environments/objects/getters a handle was minted for. Built
/// fresh by [`VariableStore::begin_pause`] and dropped when the pause ends.
#[derive(Default)]
pub(crate) struct LiveHandles {
    containers: FxHashMap<Handle, Container>,
    getters: FxHashMap<Handle, GetterTarget>,
}

/// Monotonic-handle storage over materialized scope/object snapshots.
#[derive(Debug, Default)]
pub struct VariableStore {
    next_handle: u64,
    children: FxHashMap<Handle, Vec<(String, ValueInfo)>>,
}

impl VariableStore {
    /// An empty store, with handle allocation starting at 1.
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            children: FxHashMap::default(),
        }
    }

    fn alloc(&mut self) -> Handle {
        let h = Handle(self.next_handle);
        self.next_handle += 1;
        h
    }

    /// The materialized children of a scope or object handle, in
    /// enumeration order.
    pub fn children(&self, handle: Handle) -> Option<Vec<(String, ValueInfo)>> {
        self.children.get(&handle).cloned()
    }

    /// Materialize every frame's local scope, recursing into reachable
    /// objects up to a bounded depth. Returns the scope handle for each
    /// frame (outermost first, matching [`crate::debugger::reflection::DebuggerFrame::capture_stack`])
    /// plus the [`LiveHandles`] needed to service `setVariable`/getter
    /// expansion for the rest of this pause.
    pub(crate) fn begin_pause(&mut self, frame_envs: &[Rc<Environment>]) -> (Vec<Handle>, LiveHandles) {
        self.children.clear();
        let mut live = LiveHandles::default();
        let mut scope_handles = Vec::with_capacity(frame_envs.len());
        for env in frame_envs {
            let handle = self.alloc();
            live.containers.insert(handle, Container::Env(Rc::clone(env)));
            let mut names = env.own_names();
            names.sort();
            let mut entries = Vec::with_capacity(names.len());
            for name in names {
                if let Some(value) = env.get(&name) {
                    let info = self.materialize(&value, &mut live, 0);
                    entries.push((name, info));
                }
            }
            self.children.insert(handle, entries);
            scope_handles.push(handle);
        }
        (scope_handles, live)
    }

    /// Convert a live value into an owned [`ValueInfo`], recursing into
    /// objects/arrays up to a depth of 3 and registering every container
    /// handle it mints into `live` so later `setVariable`/getter-expansion
    /// requests can resolve back to the live `Rc`.
    pub(crate) fn materialize(&mut self, value: &JsValue, live: &mut LiveHandles, depth: usize) -> ValueInfo {
        match value {
            JsValue::Undefined => ValueInfo::Undefined,
            JsValue::Null => ValueInfo::Null,
            JsValue::Boolean(b) => ValueInfo::Primitive {
                type_name: "boolean",
                display: b.to_string(),
            },
            JsValue::Number(_) | JsValue::String(_) => ValueInfo::Primitive {
                type_name: value.type_name(),
                display: value.display(),
            },
            JsValue::Function(f) => ValueInfo::Function { name: f.name.clone() },
            JsValue::Object(obj) => {
                let handle = self.alloc();
                live.containers.insert(handle, Container::Obj(Rc::clone(obj)));
                let is_array = obj.borrow().array_length.is_some();
                let length = obj.borrow().array_length.unwrap_or(0);

                if depth < MAX_MATERIALIZE_DEPTH {
                    let mut visited = HashSet::new();
                    let entries = self.materialize_object_entries(obj, live, depth, &mut visited);
                    self.children.insert(handle, entries);
                } else {
                    self.children.insert(handle, Vec::new());
                }

                if is_array {
                    ValueInfo::Array { handle, length }
                } else {
                    ValueInfo::Object { handle }
                }
            }
        }
    }

    fn materialize_object_entries(
        &mut self,
        obj: &JsObjectRef,
        live: &mut LiveHandles,
        depth: usize,
        visited: &mut HashSet<*const ()>,
    ) -> Vec<(String, ValueInfo)> {
        let ptr = Rc::as_ptr(obj) as *const ();
        if !visited.insert(ptr) {
            return Vec::new();
        }
        let cell = obj.borrow();
        let mut entries = Vec::with_capacity(cell.properties.len());
        for (name, prop) in cell.properties.iter() {
            let info = match prop {
                PropertyValue::Data(v) => self.materialize(v, live, depth + 1),
                PropertyValue::Getter(func) => {
                    let handle = self.alloc();
                    live.getters.insert(handle, (Rc::clone(func), Rc::clone(obj)));
                    ValueInfo::Getter { handle }
                }
            };
            entries.push((name.clone(), info));
        }
        entries
    }

    /// Invalidate every handle issued so far. The monotonic counter is
    /// never reset, only the lookup tables.
    pub fn clear(&mut self) {
        self.children.clear();
    }
}

const MAX_MATERIALIZE_DEPTH: usize = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_zero_is_reserved_for_not_inspectable() {
        assert_eq!(Handle::NONE, Handle(0));
        let mut store = VariableStore::new();
        let env = Environment::new_global();
        let mut live = LiveHandles::default();
        let info = store.materialize(&JsValue::Undefined, &mut live, 0);
        assert_eq!(info.handle(), Handle::NONE);
        let _ = env;
    }

    #[test]
    fn successive_object_materializations_mint_distinct_handles() {
        let mut store = VariableStore::new();
        let mut live = LiveHandles::default();
        let obj = JsValue::new_object();
        let a = store.materialize(&JsValue::Object(Rc::clone(&obj)), &mut live, 0);
        let b = store.materialize(&JsValue::Object(obj), &mut live, 0);
        assert_ne!(a.handle(), b.handle());
        assert!(a.handle().0 > 0 && b.handle().0 > 0);
    }

    #[test]
    fn arrays_materialize_with_their_length() {
        let mut store = VariableStore::new();
        let mut live = LiveHandles::default();
        let arr = JsValue::new_array(vec![JsValue::Number(1.0), JsValue::Number(2.0)]);
        let info = store.materialize(&JsValue::Object(arr), &mut live, 0);
        match info {
            ValueInfo::Array { length, .. } => assert_eq!(length, 2),
            other => panic!("expected Array, got {other:?}"),
        }
    }

    #[test]
    fn getters_are_registered_but_never_invoked_during_materialization() {
        let mut store = VariableStore::new();
        let mut live = LiveHandles::default();
        let obj = JsValue::new_object();
        let getter = Rc::new(JsFunction {
            name: Some("g".to_string()),
            params: Vec::new(),
            body: Rc::new(Vec::new()),
        });
        obj.borrow_mut()
            .properties
            .insert("lazy".to_string(), PropertyValue::Getter(Rc::clone(&getter)));
        let info = store.materialize(&JsValue::Object(Rc::clone(&obj)), &mut live, 0);
        let handle = info.handle();
        let children = store.children(handle).unwrap();
        assert_eq!(children.len(), 1);
        assert!(matches!(children[0].1, ValueInfo::Getter { .. }));
        let getter_handle = children[0].1.handle();
        assert!(live.getter(getter_handle).is_some());
    }

    #[test]
    fn begin_pause_clears_prior_scope_children() {
        let mut store = VariableStore::new();
        let global = Environment::new_global();
        global.declare("x", JsValue::Number(1.0));
        let (handles, _live) = store.begin_pause(&[Rc::clone(&global)]);
        let handle = handles[0];
        assert_eq!(store.children(handle).unwrap().len(), 1);

        // A second pause re-materializes from scratch with fresh handles.
        let (handles2, _live2) = store.begin_pause(&[global]);
        assert_ne!(handle, handles2[0]);
    }
}

impl LiveHandles {
    /// Look up the getter function and owning object registered for a
    /// handle, invoked on demand the first time a client expands it.
    pub(crate) fn getter(&self, handle: Handle) -> Option<GetterTarget> {
        self.getters
            .get(&handle)
            .map(|(f, o)| (Rc::clone(f), Rc::clone(o)))
    }

    /// Resolve `handle` to its live environment, if it names one.
    pub(crate) fn env(&self, handle: Handle) -> Option<Rc<Environment>> {
        match self.containers.get(&handle) {
            Some(Container::Env(e)) => Some(Rc::clone(e)),
            _ => None,
        }
    }

    /// Resolve `handle` to its live object, if it names one.
    pub(crate) fn object(&self, handle: Handle) -> Option<JsObjectRef> {
        match self.containers.get(&handle) {
            Some(Container::Obj(o)) => Some(Rc::clone(o)),
            _ => None,
        }
    }
}
