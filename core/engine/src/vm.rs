//! The tree-walking statement executor.
//!
//! Each statement boundary is a potential debugger pause point: before
//! executing a statement the interpreter consults the attached debugger
//! (via [`crate::context::HostHooks`]) either through the ordinary step
//! callback or, at a breakpoint-bound position or a `debugger;` statement,
//! through the break callback.

use std::rc::Rc;

use crate::ast::{BinaryOp, Expr, Literal, Position, Program, Stmt, StmtKind};
use crate::context::Context;
use crate::debugger::ScriptId;
use crate::debugger::state::BreakKind;
use crate::error::{JsError, JsResult};
use crate::value::{Environment, JsFunction, JsValue, PropertyValue};

/// A single activation record on the call stack, exposed to the debugger
/// for stack traces and scope listings.
#[derive(Debug)]
pub struct CallFrame {
    /// The function name, or `None` for the top-level/global frame.
    pub function_name: Option<String>,
    /// Which script this frame is executing.
    pub script_id: ScriptId,
    /// The statement currently executing in this frame.
    pub position: Position,
    /// The frame's local lexical environment.
    pub env: Rc<Environment>,
    /// Environments shadowed by nested block scopes, restored on exit.
    saved_envs: Vec<Rc<Environment>>,
}

/// Unwinds a function body early via `return`.
enum Flow {
    Normal,
    Return(JsValue),
}

impl Context {
    /// Parses and evaluates a complete program, returning the value of the
    /// last expression statement (or `undefined`).
    pub fn eval(&mut self, source: &crate::source::Source) -> JsResult<JsValue> {
        let program = crate::parser::parse(source.text())?;
        let script_id = self.register_script(source, &program);
        self.frames.push(CallFrame {
            function_name: None,
            script_id,
            position: Position::new(1, 1),
            env: Rc::clone(&self.global),
            saved_envs: Vec::new(),
        });
        let result = self.run_block(&program);
        self.frames.pop();
        match result? {
            Flow::Return(v) => Ok(v),
            Flow::Normal => Ok(self.last_value.take().unwrap_or(JsValue::Undefined)),
        }
    }

    fn run_block(&mut self, stmts: &Program) -> JsResult<Flow> {
        for stmt in stmts {
            match self.run_stmt(stmt)? {
                Flow::Normal => {}
                ret @ Flow::Return(_) => return Ok(ret),
            }
        }
        Ok(Flow::Normal)
    }

    fn run_stmt(&mut self, stmt: &Stmt) -> JsResult<Flow> {
        if let Some(frame) = self.frames.last_mut() {
            frame.position = stmt.position;
        }
        self.dispatch_callback(stmt)?;
        if self.is_terminating() {
            return Err(JsError::new(crate::error::JsErrorKind::Cancelled, "execution cancelled"));
        }

        match &stmt.kind {
            StmtKind::VarDecl { name, init } => {
                let value = match init {
                    Some(e) => self.eval_expr(e)?,
                    None => JsValue::Undefined,
                };
                self.env().declare(name.clone(), value);
                Ok(Flow::Normal)
            }
            StmtKind::Expr(e) => {
                let v = self.eval_expr(e)?;
                self.last_value = Some(v);
                Ok(Flow::Normal)
            }
            StmtKind::Block(body) => {
                let parent = self.env();
                let child = Environment::new_child(&parent, "Block");
                self.push_scope(child);
                let res = self.run_block(body);
                self.pop_scope();
                res
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval_expr(cond)?.to_boolean() {
                    self.run_stmt(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.run_stmt(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                let parent = self.env();
                let scope = Environment::new_child(&parent, "Block");
                self.push_scope(scope);
                if let Some(init) = init {
                    self.run_stmt(init)?;
                }
                loop {
                    if let Some(cond) = cond {
                        if !self.eval_expr(cond)?.to_boolean() {
                            break;
                        }
                    }
                    match self.run_stmt(body)? {
                        Flow::Normal => {}
                        ret @ Flow::Return(_) => {
                            self.pop_scope();
                            return Ok(ret);
                        }
                    }
                    if let Some(update) = update {
                        self.eval_expr(update)?;
                    }
                }
                self.pop_scope();
                Ok(Flow::Normal)
            }
            StmtKind::While { cond, body } => {
                while self.eval_expr(cond)?.to_boolean() {
                    match self.run_stmt(body)? {
                        Flow::Normal => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Ok(Flow::Normal)
            }
            StmtKind::FunctionDecl { name, params, body } => {
                let func = JsFunction {
                    name: Some(name.clone()),
                    params: params.clone(),
                    body: Rc::clone(body),
                };
                self.env().declare(name.clone(), JsValue::Function(Rc::new(func)));
                Ok(Flow::Normal)
            }
            StmtKind::Return(expr) => {
                let v = match expr {
                    Some(e) => self.eval_expr(e)?,
                    None => JsValue::Undefined,
                };
                Ok(Flow::Return(v))
            }
            StmtKind::Debugger => Ok(Flow::Normal),
        }
    }

    /// Parses and evaluates a standalone expression (no statement dispatch,
    /// no callback invocation) in the given frame's environment. Used by
    /// breakpoint condition/log-message evaluation and by `evaluate`
    /// requests, both of which run while the interpreter is already parked
    /// inside a callback and must not recurse back into it.
    pub(crate) fn eval_expression_in_frame(&mut self, frame_index: usize, src: &str) -> JsResult<JsValue> {
        let expr = crate::parser::parse_expression(src)?;
        let target = self
            .frames
            .len()
            .checked_sub(frame_index + 1)
            .ok_or_else(|| JsError::reference("no such frame"))?;
        let env = Rc::clone(&self.frames[target].env);
        let top = self.frames.last_mut().expect("no active frame");
        let original = std::mem::replace(&mut top.env, env);
        let result = self.eval_expr(&expr);
        self.frames.last_mut().expect("no active frame").env = original;
        result
    }

    /// Invokes the step or break callback for the statement about to run.
    fn dispatch_callback(&mut self, stmt: &Stmt) -> JsResult<()> {
        let hooks = self.host_hooks.clone();
        let script_id = self.frames.last().map(|f| f.script_id);
        let is_debugger_stmt = matches!(stmt.kind, StmtKind::Debugger);
        let is_breakpoint = script_id
            .map(|id| self.has_breakpoint_site(id, stmt.position))
            .unwrap_or(false);

        if is_debugger_stmt {
            let mode = hooks.on_break(self, BreakKind::DebuggerStatement)?;
            self.last_step_mode = mode;
        } else if is_breakpoint {
            let mode = hooks.on_break(self, BreakKind::Breakpoint)?;
            self.last_step_mode = mode;
        } else {
            let mode = hooks.on_step(self)?;
            self.last_step_mode = mode;
        }
        Ok(())
    }

    fn eval_expr(&mut self, expr: &Expr) -> JsResult<JsValue> {
        match expr {
            Expr::Literal(Literal::Number(n)) => Ok(JsValue::Number(*n)),
            Expr::Literal(Literal::String(s)) => Ok(JsValue::string(s.clone())),
            Expr::Literal(Literal::Boolean(b)) => Ok(JsValue::Boolean(*b)),
            Expr::Literal(Literal::Null) => Ok(JsValue::Null),
            Expr::Literal(Literal::Undefined) => Ok(JsValue::Undefined),
            Expr::Identifier(name) => Ok(self.env().get(name).unwrap_or(JsValue::Undefined)),
            Expr::Assign { name, value } => {
                let v = self.eval_expr(value)?;
                self.env().set(name, v.clone());
                Ok(v)
            }
            Expr::Binary { op, left, right } => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                eval_binary(*op, &l, &r)
            }
            Expr::Member { object, property } => {
                let obj = self.eval_expr(object)?;
                self.get_property(&obj, property)
            }
            Expr::Call { callee, args } => {
                if callee == "print" || callee == "console_log" {
                    let mut parts = Vec::with_capacity(args.len());
                    for a in args {
                        parts.push(self.eval_expr(a)?.display());
                    }
                    log::info!(target: "script", "{}", parts.join(" "));
                    return Ok(JsValue::Undefined);
                }
                let func = match self.env().get(callee) {
                    Some(JsValue::Function(f)) => f,
                    _ => return Err(JsError::reference(format!("{callee} is not a function"))),
                };
                let mut values = Vec::with_capacity(args.len());
                for a in args {
                    values.push(self.eval_expr(a)?);
                }
                self.call_function(&func, values)
            }
        }
    }

    fn get_property(&self, obj: &JsValue, property: &str) -> JsResult<JsValue> {
        match obj {
            JsValue::Object(o) => {
                let cell = o.borrow();
                match cell.properties.get(property) {
                    Some(PropertyValue::Data(v)) => Ok(v.clone()),
                    Some(PropertyValue::Getter(_)) => Ok(JsValue::Undefined),
                    None => Ok(JsValue::Undefined),
                }
            }
            _ => Ok(JsValue::Undefined),
        }
    }

    pub(crate) fn call_function(&mut self, func: &Rc<JsFunction>, args: Vec<JsValue>) -> JsResult<JsValue> {
        let parent = self.env();
        let scope = Environment::new_child(&parent, "Closure");
        for (i, param) in func.params.iter().enumerate() {
            scope.declare(param.clone(), args.get(i).cloned().unwrap_or(JsValue::Undefined));
        }
        let script_id = self
            .frames
            .last()
            .map(|f| f.script_id)
            .unwrap_or(ScriptId(0));
        self.frames.push(CallFrame {
            function_name: func.name.clone(),
            script_id,
            position: Position::new(1, 1),
            env: scope,
            saved_envs: Vec::new(),
        });
        let result = self.run_block(&func.body);
        self.frames.pop();
        match result? {
            Flow::Return(v) => Ok(v),
            Flow::Normal => Ok(JsValue::Undefined),
        }
    }

    fn env(&self) -> Rc<Environment> {
        Rc::clone(&self.frames.last().expect("no active frame").env)
    }

    fn push_scope(&mut self, env: Rc<Environment>) {
        if let Some(frame) = self.frames.last_mut() {
            let previous = std::mem::replace(&mut frame.env, env);
            frame.saved_envs.push(previous);
        }
    }

    fn pop_scope(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            if let Some(previous) = frame.saved_envs.pop() {
                frame.env = previous;
            }
        }
    }
}

fn eval_binary(op: BinaryOp, l: &JsValue, r: &JsValue) -> JsResult<JsValue> {
    use BinaryOp::*;
    match op {
        Add => {
            if let (JsValue::String(_), _) | (_, JsValue::String(_)) = (l, r) {
                return Ok(JsValue::string(format!("{}{}", l.display(), r.display())));
            }
            Ok(JsValue::Number(l.to_number()? + r.to_number()?))
        }
        Sub => Ok(JsValue::Number(l.to_number()? - r.to_number()?)),
        Mul => Ok(JsValue::Number(l.to_number()? * r.to_number()?)),
        Div => Ok(JsValue::Number(l.to_number()? / r.to_number()?)),
        Mod => Ok(JsValue::Number(l.to_number()? % r.to_number()?)),
        Eq => Ok(JsValue::Boolean(values_loosely_equal(l, r))),
        NotEq => Ok(JsValue::Boolean(!values_loosely_equal(l, r))),
        Lt => Ok(JsValue::Boolean(l.to_number()? < r.to_number()?)),
        LtEq => Ok(JsValue::Boolean(l.to_number()? <= r.to_number()?)),
        Gt => Ok(JsValue::Boolean(l.to_number()? > r.to_number()?)),
        GtEq => Ok(JsValue::Boolean(l.to_number()? >= r.to_number()?)),
        And => Ok(if l.to_boolean() { r.clone() } else { l.clone() }),
        Or => Ok(if l.to_boolean() { l.clone() } else { r.clone() }),
    }
}

fn values_loosely_equal(l: &JsValue, r: &JsValue) -> bool {
    match (l, r) {
        (JsValue::Undefined, JsValue::Undefined) => true,
        (JsValue::Null, JsValue::Null) => true,
        (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
        (JsValue::Number(a), JsValue::Number(b)) => a == b,
        (JsValue::String(a), JsValue::String(b)) => a == b,
        _ => l.display() == r.display() && l.type_name() == r.type_name(),
    }
}
