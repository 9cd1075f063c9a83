//! A hand-written lexer for the engine's small scripting language.

use crate::ast::Position;
use crate::error::{JsError, JsResult};

/// A single lexical token, paired with its starting position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The token's kind and payload.
    pub kind: TokenKind,
    /// Where the token begins in the source.
    pub position: Position,
}

/// The kinds of tokens the lexer produces.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// An identifier or keyword spelling.
    Ident(String),
    /// A numeric literal.
    Number(f64),
    /// A string literal, already unescaped.
    String(String),
    /// `var`
    Var,
    /// `function`
    Function,
    /// `return`
    Return,
    /// `if`
    If,
    /// `else`
    Else,
    /// `for`
    For,
    /// `while`
    While,
    /// `debugger`
    Debugger,
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
    /// `undefined`
    Undefined,
    /// Punctuation/operator tokens, kept as their literal spelling.
    Punct(&'static str),
    /// End of input.
    Eof,
}

/// Tokenizes an entire source text up front.
pub fn lex(src: &str) -> JsResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0usize;
    let mut line = 1u32;
    let mut col = 1u32;

    macro_rules! advance {
        () => {{
            if chars[i] == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
            i += 1;
        }};
    }

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            advance!();
            continue;
        }

        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                advance!();
            }
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            advance!();
            advance!();
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                advance!();
            }
            if i < chars.len() {
                advance!();
                advance!();
            }
            continue;
        }

        let start = Position::new(line, col);

        if c.is_ascii_digit() {
            let mut s = String::new();
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                s.push(chars[i]);
                advance!();
            }
            let n: f64 = s
                .parse()
                .map_err(|_| JsError::syntax(format!("invalid number literal {s:?}")))?;
            tokens.push(Token {
                kind: TokenKind::Number(n),
                position: start,
            });
            continue;
        }

        if c.is_alphabetic() || c == '_' || c == '$' {
            let mut s = String::new();
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
            {
                s.push(chars[i]);
                advance!();
            }
            let kind = match s.as_str() {
                "var" => TokenKind::Var,
                "function" => TokenKind::Function,
                "return" => TokenKind::Return,
                "if" => TokenKind::If,
                "else" => TokenKind::Else,
                "for" => TokenKind::For,
                "while" => TokenKind::While,
                "debugger" => TokenKind::Debugger,
                "true" => TokenKind::True,
                "false" => TokenKind::False,
                "null" => TokenKind::Null,
                "undefined" => TokenKind::Undefined,
                _ => TokenKind::Ident(s),
            };
            tokens.push(Token {
                kind,
                position: start,
            });
            continue;
        }

        if c == '"' || c == '\'' {
            let quote = c;
            advance!();
            let mut s = String::new();
            while i < chars.len() && chars[i] != quote {
                if chars[i] == '\\' && i + 1 < chars.len() {
                    advance!();
                    let esc = chars[i];
                    s.push(match esc {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                    advance!();
                } else {
                    s.push(chars[i]);
                    advance!();
                }
            }
            if i >= chars.len() {
                return Err(JsError::syntax("unterminated string literal"));
            }
            advance!(); // closing quote
            tokens.push(Token {
                kind: TokenKind::String(s),
                position: start,
            });
            continue;
        }

        let two: Option<&'static str> = match (c, chars.get(i + 1).copied()) {
            ('=', Some('=')) => Some("=="),
            ('!', Some('=')) => Some("!="),
            ('<', Some('=')) => Some("<="),
            ('>', Some('=')) => Some(">="),
            ('&', Some('&')) => Some("&&"),
            ('|', Some('|')) => Some("||"),
            _ => None,
        };
        if let Some(op) = two {
            advance!();
            advance!();
            tokens.push(Token {
                kind: TokenKind::Punct(op),
                position: start,
            });
            continue;
        }

        let one: &'static str = match c {
            '+' => "+",
            '-' => "-",
            '*' => "*",
            '/' => "/",
            '%' => "%",
            '=' => "=",
            '<' => "<",
            '>' => ">",
            '(' => "(",
            ')' => ")",
            '{' => "{",
            '}' => "}",
            ';' => ";",
            ',' => ",",
            '.' => ".",
            other => {
                return Err(JsError::syntax(format!("unexpected character {other:?}")));
            }
        };
        advance!();
        tokens.push(Token {
            kind: TokenKind::Punct(one),
            position: start,
        });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        position: Position::new(line, col),
    });
    Ok(tokens)
}
