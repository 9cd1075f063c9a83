//! A recursive-descent parser turning tokens into an [`ast::Program`].

use std::rc::Rc;

use crate::ast::{BinaryOp, Expr, Literal, Program, Stmt, StmtKind};
use crate::error::{JsError, JsResult};
use crate::lexer::{Token, TokenKind, lex};

/// Parses an entire source text into a program.
pub fn parse(src: &str) -> JsResult<Program> {
    let tokens = lex(src)?;
    let mut p = Parser { tokens, pos: 0 };
    let mut stmts = Vec::new();
    while !p.at_eof() {
        stmts.push(p.statement()?);
    }
    Ok(stmts)
}

/// Parses a single standalone expression, as used by breakpoint
/// conditions, log-point messages, and `evaluate` requests. Trailing
/// input beyond the expression is an error, matching a REPL-style
/// single-expression evaluation.
pub fn parse_expression(src: &str) -> JsResult<Expr> {
    let tokens = lex(src)?;
    let mut p = Parser { tokens, pos: 0 };
    let expr = p.expression()?;
    if !p.at_eof() {
        return Err(JsError::syntax(format!(
            "unexpected trailing input at line {}",
            p.peek().position.line
        )));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn expect_punct(&mut self, p: &'static str) -> JsResult<()> {
        match &self.peek().kind {
            TokenKind::Punct(s) if *s == p => {
                self.advance();
                Ok(())
            }
            other => Err(JsError::syntax(format!(
                "expected {p:?}, found {other:?} at line {}",
                self.peek().position.line
            ))),
        }
    }

    fn is_punct(&self, p: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Punct(s) if *s == p)
    }

    fn consume_punct(&mut self, p: &str) -> bool {
        if self.is_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_ident(&mut self) -> JsResult<String> {
        match self.advance().kind {
            TokenKind::Ident(name) => Ok(name),
            other => Err(JsError::syntax(format!("expected identifier, found {other:?}"))),
        }
    }

    fn statement(&mut self) -> JsResult<Stmt> {
        let position = self.peek().position;
        let kind = match &self.peek().kind {
            TokenKind::Var => {
                self.advance();
                let name = self.expect_ident()?;
                let init = if self.consume_punct("=") {
                    Some(self.expression()?)
                } else {
                    None
                };
                self.consume_punct(";");
                StmtKind::VarDecl { name, init }
            }
            TokenKind::Debugger => {
                self.advance();
                self.consume_punct(";");
                StmtKind::Debugger
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.is_punct(";") {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.consume_punct(";");
                StmtKind::Return(value)
            }
            TokenKind::Punct("{") => {
                return self.block();
            }
            TokenKind::If => {
                self.advance();
                self.expect_punct("(")?;
                let cond = self.expression()?;
                self.expect_punct(")")?;
                let then_branch = Box::new(self.statement()?);
                let else_branch = if matches!(self.peek().kind, TokenKind::Else) {
                    self.advance();
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                StmtKind::If {
                    cond,
                    then_branch,
                    else_branch,
                }
            }
            TokenKind::For => {
                self.advance();
                self.expect_punct("(")?;
                let init = if self.is_punct(";") {
                    None
                } else {
                    Some(Box::new(self.statement()?))
                };
                if !matches!(init, Some(_)) {
                    self.consume_punct(";");
                }
                let cond = if self.is_punct(";") {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.expect_punct(";")?;
                let update = if self.is_punct(")") {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.expect_punct(")")?;
                let body = Box::new(self.statement()?);
                StmtKind::For {
                    init,
                    cond,
                    update,
                    body,
                }
            }
            TokenKind::While => {
                self.advance();
                self.expect_punct("(")?;
                let cond = self.expression()?;
                self.expect_punct(")")?;
                let body = Box::new(self.statement()?);
                StmtKind::While { cond, body }
            }
            TokenKind::Function => {
                self.advance();
                let name = self.expect_ident()?;
                self.expect_punct("(")?;
                let mut params = Vec::new();
                if !self.is_punct(")") {
                    loop {
                        params.push(self.expect_ident()?);
                        if !self.consume_punct(",") {
                            break;
                        }
                    }
                }
                self.expect_punct(")")?;
                let body = match self.block()?.kind {
                    StmtKind::Block(b) => b,
                    _ => unreachable!(),
                };
                StmtKind::FunctionDecl {
                    name,
                    params,
                    body: Rc::new(body),
                }
            }
            _ => {
                let expr = self.expression()?;
                self.consume_punct(";");
                StmtKind::Expr(expr)
            }
        };
        Ok(Stmt { position, kind })
    }

    fn block(&mut self) -> JsResult<Stmt> {
        let position = self.peek().position;
        self.expect_punct("{")?;
        let mut stmts = Vec::new();
        while !self.is_punct("}") && !self.at_eof() {
            stmts.push(self.statement()?);
        }
        self.expect_punct("}")?;
        Ok(Stmt {
            position,
            kind: StmtKind::Block(stmts),
        })
    }

    fn expression(&mut self) -> JsResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> JsResult<Expr> {
        let expr = self.logical_or()?;
        if self.is_punct("=") {
            if let Expr::Identifier(name) = expr {
                self.advance();
                let value = Box::new(self.assignment()?);
                return Ok(Expr::Assign { name, value });
            }
            return Err(JsError::syntax("invalid assignment target"));
        }
        Ok(expr)
    }

    fn logical_or(&mut self) -> JsResult<Expr> {
        let mut left = self.logical_and()?;
        while self.is_punct("||") {
            self.advance();
            let right = self.logical_and()?;
            left = Expr::Binary {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> JsResult<Expr> {
        let mut left = self.equality()?;
        while self.is_punct("&&") {
            self.advance();
            let right = self.equality()?;
            left = Expr::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn equality(&mut self) -> JsResult<Expr> {
        let mut left = self.comparison()?;
        loop {
            let op = if self.is_punct("==") {
                BinaryOp::Eq
            } else if self.is_punct("!=") {
                BinaryOp::NotEq
            } else {
                break;
            };
            self.advance();
            let right = self.comparison()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn comparison(&mut self) -> JsResult<Expr> {
        let mut left = self.additive()?;
        loop {
            let op = if self.is_punct("<") {
                BinaryOp::Lt
            } else if self.is_punct("<=") {
                BinaryOp::LtEq
            } else if self.is_punct(">") {
                BinaryOp::Gt
            } else if self.is_punct(">=") {
                BinaryOp::GtEq
            } else {
                break;
            };
            self.advance();
            let right = self.additive()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn additive(&mut self) -> JsResult<Expr> {
        let mut left = self.multiplicative()?;
        loop {
            let op = if self.is_punct("+") {
                BinaryOp::Add
            } else if self.is_punct("-") {
                BinaryOp::Sub
            } else {
                break;
            };
            self.advance();
            let right = self.multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> JsResult<Expr> {
        let mut left = self.unary()?;
        loop {
            let op = if self.is_punct("*") {
                BinaryOp::Mul
            } else if self.is_punct("/") {
                BinaryOp::Div
            } else if self.is_punct("%") {
                BinaryOp::Mod
            } else {
                break;
            };
            self.advance();
            let right = self.unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> JsResult<Expr> {
        if self.consume_punct("-") {
            let operand = self.unary()?;
            return Ok(Expr::Binary {
                op: BinaryOp::Sub,
                left: Box::new(Expr::Literal(Literal::Number(0.0))),
                right: Box::new(operand),
            });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> JsResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.consume_punct(".") {
                let property = self.expect_ident()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> JsResult<Expr> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Number(n) => Ok(Expr::Literal(Literal::Number(n))),
            TokenKind::String(s) => Ok(Expr::Literal(Literal::String(s))),
            TokenKind::True => Ok(Expr::Literal(Literal::Boolean(true))),
            TokenKind::False => Ok(Expr::Literal(Literal::Boolean(false))),
            TokenKind::Null => Ok(Expr::Literal(Literal::Null)),
            TokenKind::Undefined => Ok(Expr::Literal(Literal::Undefined)),
            TokenKind::Ident(name) => {
                if self.is_punct("(") {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.is_punct(")") {
                        loop {
                            args.push(self.expression()?);
                            if !self.consume_punct(",") {
                                break;
                            }
                        }
                    }
                    self.expect_punct(")")?;
                    Ok(Expr::Call { callee: name, args })
                } else {
                    Ok(Expr::Identifier(name))
                }
            }
            TokenKind::Punct("(") => {
                let e = self.expression()?;
                self.expect_punct(")")?;
                Ok(e)
            }
            other => Err(JsError::syntax(format!(
                "unexpected token {other:?} at line {}",
                tok.position.line
            ))),
        }
    }
}
