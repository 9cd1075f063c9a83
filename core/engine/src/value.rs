//! Runtime value representation.
//!
//! The engine is intentionally small: enough of a dynamically-typed
//! scripting language to drive the debugger's per-statement stepping,
//! breakpoints, and variable inspection end to end, without attempting
//! full ECMAScript fidelity.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{JsError, JsResult};

/// A function value: parameters plus the statements that make up its body.
#[derive(Debug, Clone)]
pub struct JsFunction {
    /// The function's declared name, if any (anonymous functions are legal).
    pub name: Option<String>,
    /// Parameter names in declaration order.
    pub params: Vec<String>,
    /// Body statements, shared so closures can be cloned cheaply.
    pub body: Rc<Vec<crate::ast::Stmt>>,
}

/// A plain object: an ordered string-keyed property bag.
///
/// Properties may be either a stored value or a getter (a zero-argument
/// function invoked lazily, never during enumeration).
#[derive(Debug, Default)]
pub struct JsObject {
    /// Object properties in insertion order.
    pub properties: indexmap::IndexMap<String, PropertyValue>,
    /// When `Some`, this object is treated as array-like and `properties`
    /// additionally holds numeric-index entries `"0"`, `"1"`, ...
    pub array_length: Option<usize>,
}

/// A single property's stored representation.
#[derive(Debug, Clone)]
pub enum PropertyValue {
    /// An ordinary data property.
    Data(JsValue),
    /// A getter: evaluated only when the debugger (or the script) asks for
    /// the property's value explicitly, never while enumerating siblings.
    Getter(Rc<JsFunction>),
}

/// A reference-counted, interior-mutable object handle.
pub type JsObjectRef = Rc<RefCell<JsObject>>;

/// A dynamically-typed runtime value.
#[derive(Debug, Clone)]
pub enum JsValue {
    /// The `undefined` value.
    Undefined,
    /// The `null` value.
    Null,
    /// A boolean.
    Boolean(bool),
    /// A double-precision number.
    Number(f64),
    /// A UTF-8 string.
    String(Rc<str>),
    /// A plain object or array-like object.
    Object(JsObjectRef),
    /// A callable function.
    Function(Rc<JsFunction>),
}

impl JsValue {
    /// Construct a string value.
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        JsValue::String(s.into())
    }

    /// Construct a fresh, empty plain object.
    pub fn new_object() -> JsObjectRef {
        Rc::new(RefCell::new(JsObject::default()))
    }

    /// Construct a fresh array-like object from the given elements.
    pub fn new_array(elements: Vec<JsValue>) -> JsObjectRef {
        let mut obj = JsObject {
            array_length: Some(elements.len()),
            ..JsObject::default()
        };
        for (i, v) in elements.into_iter().enumerate() {
            obj.properties
                .insert(i.to_string(), PropertyValue::Data(v));
        }
        Rc::new(RefCell::new(obj))
    }

    /// JavaScript-style truthiness.
    pub fn to_boolean(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Boolean(b) => *b,
            JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
            JsValue::String(s) => !s.is_empty(),
            JsValue::Object(_) | JsValue::Function(_) => true,
        }
    }

    /// Coerce to `f64`, used by arithmetic operators.
    pub fn to_number(&self) -> JsResult<f64> {
        match self {
            JsValue::Undefined => Ok(f64::NAN),
            JsValue::Null => Ok(0.0),
            JsValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            JsValue::Number(n) => Ok(*n),
            JsValue::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| JsError::typ(format!("cannot convert {s:?} to a number"))),
            JsValue::Object(_) | JsValue::Function(_) => {
                Err(JsError::typ("cannot convert object to a number"))
            }
        }
    }

    /// A short, human-readable rendering used for logging, log points and
    /// `ValueInfo::Primitive` display strings.
    pub fn display(&self) -> String {
        match self {
            JsValue::Undefined => "undefined".to_string(),
            JsValue::Null => "null".to_string(),
            JsValue::Boolean(b) => b.to_string(),
            JsValue::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            JsValue::String(s) => s.to_string(),
            JsValue::Object(o) => {
                if o.borrow().array_length.is_some() {
                    format!("Array({})", o.borrow().array_length.unwrap())
                } else {
                    "[object Object]".to_string()
                }
            }
            JsValue::Function(f) => {
                format!("function {}()", f.name.as_deref().unwrap_or("anonymous"))
            }
        }
    }

    /// The type tag used by `typeof`-ish debugger reflection.
    pub fn type_name(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "object",
            JsValue::Boolean(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Object(_) => "object",
            JsValue::Function(_) => "function",
        }
    }
}

impl fmt::Display for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// A lexical environment: a chain of variable scopes.
#[derive(Debug)]
pub struct Environment {
    vars: RefCell<HashMap<String, JsValue>>,
    parent: Option<Rc<Environment>>,
    /// A label identifying this scope for the debugger ("Local", "Closure",
    /// "Global"); purely informational.
    pub label: &'static str,
}

impl Environment {
    /// Construct a root (global) environment.
    pub fn new_global() -> Rc<Self> {
        Rc::new(Self {
            vars: RefCell::new(HashMap::new()),
            parent: None,
            label: "Global",
        })
    }

    /// Construct a child scope.
    pub fn new_child(parent: &Rc<Environment>, label: &'static str) -> Rc<Self> {
        Rc::new(Self {
            vars: RefCell::new(HashMap::new()),
            parent: Some(Rc::clone(parent)),
            label,
        })
    }

    /// Declare (or overwrite) a binding in this scope directly.
    pub fn declare(&self, name: impl Into<String>, value: JsValue) {
        self.vars.borrow_mut().insert(name.into(), value);
    }

    /// Look up a binding, walking up through parent scopes.
    pub fn get(&self, name: &str) -> Option<JsValue> {
        if let Some(v) = self.vars.borrow().get(name) {
            return Some(v.clone());
        }
        self.parent.as_ref().and_then(|p| p.get(name))
    }

    /// Assign to an existing binding, walking up through parent scopes.
    /// Falls back to declaring on the global scope, matching loose
    /// assignment semantics for undeclared identifiers.
    pub fn set(self: &Rc<Self>, name: &str, value: JsValue) {
        let mut env = Rc::clone(self);
        loop {
            if env.vars.borrow().contains_key(name) {
                env.vars.borrow_mut().insert(name.to_string(), value);
                return;
            }
            match &env.parent {
                Some(p) => env = Rc::clone(p),
                None => {
                    env.vars.borrow_mut().insert(name.to_string(), value);
                    return;
                }
            }
        }
    }

    /// Bindings declared directly in this scope (not parents), in
    /// insertion order is not guaranteed (`HashMap`); callers that need a
    /// stable order should sort.
    pub fn own_names(&self) -> Vec<String> {
        self.vars.borrow().keys().cloned().collect()
    }
}
