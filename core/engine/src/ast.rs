//! The abstract syntax tree produced by the parser.
//!
//! Every statement carries its source [`Position`] so the debugger can bind
//! breakpoints to statement boundaries and report accurate stack frames.

use std::rc::Rc;

/// A 1-based line/column pair into a single source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
}

impl Position {
    /// Construct a position.
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A full parsed program: a flat list of top-level statements.
pub type Program = Vec<Stmt>;

/// A statement, tagged with the position of its first token.
#[derive(Debug, Clone)]
pub struct Stmt {
    /// Where this statement begins.
    pub position: Position,
    /// What kind of statement this is.
    pub kind: StmtKind,
}

/// The statement forms supported by the scripting language.
#[derive(Debug, Clone)]
pub enum StmtKind {
    /// `var name = expr;` (the initializer is optional).
    VarDecl { name: String, init: Option<Expr> },
    /// A bare expression statement, `expr;`.
    Expr(Expr),
    /// `{ stmts }`.
    Block(Vec<Stmt>),
    /// `if (cond) then_branch [else else_branch]`.
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    /// `for (init; cond; update) body`. Each clause is optional.
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    /// `while (cond) body`.
    While { cond: Expr, body: Box<Stmt> },
    /// `function name(params) { body }`.
    FunctionDecl {
        name: String,
        params: Vec<String>,
        body: Rc<Vec<Stmt>>,
    },
    /// `return [expr];`.
    Return(Option<Expr>),
    /// The `debugger;` statement: always a hard pause point.
    Debugger,
}

/// An expression.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A numeric, string, boolean, `null`, or `undefined` literal.
    Literal(Literal),
    /// A bare identifier reference.
    Identifier(String),
    /// `left op right`.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `name = expr`.
    Assign { name: String, value: Box<Expr> },
    /// `callee(args)`.
    Call { callee: String, args: Vec<Expr> },
    /// `object.property` / `object["property"]`.
    Member {
        object: Box<Expr>,
        property: String,
    },
}

/// A literal value as written in source.
#[derive(Debug, Clone)]
pub enum Literal {
    /// A numeric literal.
    Number(f64),
    /// A string literal (already unescaped).
    String(String),
    /// `true` / `false`.
    Boolean(bool),
    /// `null`.
    Null,
    /// `undefined`.
    Undefined,
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `&&`
    And,
    /// `||`
    Or,
}

/// Walks a parsed program and collects every position a breakpoint may
/// legally bind to: every statement boundary, recursively through nested
/// blocks and control-flow bodies.
pub fn breakpointable_positions(program: &Program) -> Vec<Position> {
    let mut out = Vec::new();
    collect_positions(program, &mut out);
    out.sort();
    out.dedup();
    out
}

fn collect_positions(stmts: &[Stmt], out: &mut Vec<Position>) {
    for stmt in stmts {
        out.push(stmt.position);
        match &stmt.kind {
            StmtKind::Block(body) => collect_positions(body, out),
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                collect_positions(std::slice::from_ref(then_branch), out);
                if let Some(else_branch) = else_branch {
                    collect_positions(std::slice::from_ref(else_branch), out);
                }
            }
            StmtKind::For { init, body, .. } => {
                if let Some(init) = init {
                    collect_positions(std::slice::from_ref(init), out);
                }
                collect_positions(std::slice::from_ref(body), out);
            }
            StmtKind::While { body, .. } => collect_positions(std::slice::from_ref(body), out),
            StmtKind::FunctionDecl { body, .. } => collect_positions(body, out),
            StmtKind::VarDecl { .. }
            | StmtKind::Expr(_)
            | StmtKind::Return(_)
            | StmtKind::Debugger => {}
        }
    }
}
