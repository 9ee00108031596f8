//! Built-in expression language for field remapping.
//!
//! A small arithmetic grammar over the raw decoded value, bound to the
//! variable `value`: numeric literals, `+ - * / %`, unary minus, parentheses
//! and the functions `abs`, `round`, `floor`, `ceil`, `min`, `max`.
//! Expressions are compiled once at layout construction and evaluated per
//! field decode.

use thiserror::Error;

use super::{EvalError, Evaluate};
use crate::Value;

/// Expression compilation failure (construction-time).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprParseError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character `{ch}` at byte {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("invalid number literal `{text}`")]
    BadNumber { text: String },
    #[error("unexpected token at byte {pos}")]
    UnexpectedToken { pos: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unknown identifier `{name}`")]
    UnknownIdent { name: String },
    #[error("function `{name}` expects {expected} argument(s), got {got}")]
    WrongArity {
        name: String,
        expected: usize,
        got: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Func {
    Abs,
    Round,
    Floor,
    Ceil,
    Min,
    Max,
}

impl Func {
    fn lookup(name: &str) -> Option<Func> {
        match name {
            "abs" => Some(Func::Abs),
            "round" => Some(Func::Round),
            "floor" => Some(Func::Floor),
            "ceil" => Some(Func::Ceil),
            "min" => Some(Func::Min),
            "max" => Some(Func::Max),
            _ => None,
        }
    }

    fn arity(&self) -> usize {
        match self {
            Func::Abs | Func::Round | Func::Floor | Func::Ceil => 1,
            Func::Min | Func::Max => 2,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Number(f64),
    Input,
    Neg(Box<Node>),
    Bin(BinOp, Box<Node>, Box<Node>),
    Call(Func, Vec<Node>),
}

/// A compiled expression. Immutable; safe for concurrent evaluation.
#[derive(Debug, Clone)]
pub struct ExprProgram {
    source: String,
    root: Node,
}

impl ExprProgram {
    /// Compile an expression source string.
    pub fn compile(source: &str) -> Result<ExprProgram, ExprParseError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(ExprParseError::Empty);
        }
        let mut parser = Parser { tokens, index: 0 };
        let root = parser.expr()?;
        if parser.index != parser.tokens.len() {
            return Err(ExprParseError::UnexpectedToken {
                pos: parser.tokens[parser.index].1,
            });
        }
        Ok(ExprProgram {
            source: source.to_string(),
            root,
        })
    }

    /// The original expression source.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Evaluate for ExprProgram {
    fn evaluate(&self, value: f64) -> Result<Value, EvalError> {
        let result = eval(&self.root, value);
        if result.is_finite() {
            Ok(Value::Float(result))
        } else {
            Err(EvalError::NonFinite)
        }
    }
}

fn eval(node: &Node, input: f64) -> f64 {
    match node {
        Node::Number(n) => *n,
        Node::Input => input,
        Node::Neg(inner) => -eval(inner, input),
        Node::Bin(op, lhs, rhs) => {
            let l = eval(lhs, input);
            let r = eval(rhs, input);
            match op {
                BinOp::Add => l + r,
                BinOp::Sub => l - r,
                BinOp::Mul => l * r,
                BinOp::Div => l / r,
                BinOp::Rem => l % r,
            }
        }
        Node::Call(func, args) => match func {
            Func::Abs => eval(&args[0], input).abs(),
            Func::Round => eval(&args[0], input).round(),
            Func::Floor => eval(&args[0], input).floor(),
            Func::Ceil => eval(&args[0], input).ceil(),
            Func::Min => eval(&args[0], input).min(eval(&args[1], input)),
            Func::Max => eval(&args[0], input).max(eval(&args[1], input)),
        },
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Comma,
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, ExprParseError> {
    let mut tokens = Vec::new();
    let bytes = source.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        let ch = bytes[pos] as char;
        match ch {
            ' ' | '\t' | '\n' | '\r' => pos += 1,
            '+' => {
                tokens.push((Token::Plus, pos));
                pos += 1;
            }
            '-' => {
                tokens.push((Token::Minus, pos));
                pos += 1;
            }
            '*' => {
                tokens.push((Token::Star, pos));
                pos += 1;
            }
            '/' => {
                tokens.push((Token::Slash, pos));
                pos += 1;
            }
            '%' => {
                tokens.push((Token::Percent, pos));
                pos += 1;
            }
            '(' => {
                tokens.push((Token::LParen, pos));
                pos += 1;
            }
            ')' => {
                tokens.push((Token::RParen, pos));
                pos += 1;
            }
            ',' => {
                tokens.push((Token::Comma, pos));
                pos += 1;
            }
            '0'..='9' | '.' => {
                let start = pos;
                while pos < bytes.len() && matches!(bytes[pos] as char, '0'..='9' | '.') {
                    pos += 1;
                }
                let text = &source[start..pos];
                let number = text.parse::<f64>().map_err(|_| ExprParseError::BadNumber {
                    text: text.to_string(),
                })?;
                tokens.push((Token::Number(number), start));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let start = pos;
                while pos < bytes.len()
                    && matches!(bytes[pos] as char, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_')
                {
                    pos += 1;
                }
                tokens.push((Token::Ident(source[start..pos].to_string()), start));
            }
            other => {
                return Err(ExprParseError::UnexpectedChar {
                    ch: other,
                    pos,
                });
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    index: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index).map(|(token, _)| token)
    }

    fn next(&mut self) -> Result<(Token, usize), ExprParseError> {
        let entry = self
            .tokens
            .get(self.index)
            .cloned()
            .ok_or(ExprParseError::UnexpectedEnd)?;
        self.index += 1;
        Ok(entry)
    }

    fn expr(&mut self) -> Result<Node, ExprParseError> {
        let mut node = self.term()?;
        while let Some(token) = self.peek() {
            let op = match token {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.index += 1;
            let rhs = self.term()?;
            node = Node::Bin(op, Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn term(&mut self) -> Result<Node, ExprParseError> {
        let mut node = self.unary()?;
        while let Some(token) = self.peek() {
            let op = match token {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Rem,
                _ => break,
            };
            self.index += 1;
            let rhs = self.unary()?;
            node = Node::Bin(op, Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn unary(&mut self) -> Result<Node, ExprParseError> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.index += 1;
            let inner = self.unary()?;
            return Ok(Node::Neg(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Node, ExprParseError> {
        let (token, pos) = self.next()?;
        match token {
            Token::Number(number) => Ok(Node::Number(number)),
            Token::Ident(name) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    return self.call(name);
                }
                if name == "value" {
                    Ok(Node::Input)
                } else {
                    Err(ExprParseError::UnknownIdent { name })
                }
            }
            Token::LParen => {
                let node = self.expr()?;
                self.expect_rparen()?;
                Ok(node)
            }
            _ => Err(ExprParseError::UnexpectedToken { pos }),
        }
    }

    fn call(&mut self, name: String) -> Result<Node, ExprParseError> {
        let func = Func::lookup(&name).ok_or_else(|| ExprParseError::UnknownIdent {
            name: name.clone(),
        })?;
        // Consume the opening parenthesis checked by the caller.
        self.index += 1;
        let mut args = Vec::new();
        if !matches!(self.peek(), Some(Token::RParen)) {
            loop {
                args.push(self.expr()?);
                match self.peek() {
                    Some(Token::Comma) => self.index += 1,
                    _ => break,
                }
            }
        }
        self.expect_rparen()?;
        if args.len() != func.arity() {
            return Err(ExprParseError::WrongArity {
                name,
                expected: func.arity(),
                got: args.len(),
            });
        }
        Ok(Node::Call(func, args))
    }

    fn expect_rparen(&mut self) -> Result<(), ExprParseError> {
        let (token, pos) = self.next()?;
        if token == Token::RParen {
            Ok(())
        } else {
            Err(ExprParseError::UnexpectedToken { pos })
        }
    }
}
