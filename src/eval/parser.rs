//! Recursive descent over the token list, one function per precedence
//! level:
//!
//!   ||  <  &&  <  == != < <= > >=  <  + - | ^  <  * / % << >> & &^
//!
//! then unary `+ - ! ^` and primaries (literals, `true`/`false`,
//! other identifiers, parenthesized expressions).

use crate::eval::constant::{self, Constant};
use crate::eval::lexer::{Spanned, Token};
use crate::eval::EvalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    LogOr,
    LogAnd,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Or,
    Xor,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    And,
    AndNot,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::LogOr => "||",
            BinaryOp::LogAnd => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::And => "&",
            BinaryOp::AndNot => "&^",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(Constant),
    /// Any identifier other than `true` and `false`; there are no
    /// variables, so evaluating one fails.
    Ident(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
}

impl Expr {
    pub fn eval(&self) -> Result<Constant, EvalError> {
        match self {
            Expr::Lit(c) => Ok(c.clone()),
            Expr::Ident(name) => Err(EvalError::Undefined(name.clone())),
            Expr::Unary(op, x) => constant::unary(*op, x.eval()?),
            Expr::Binary(x, op, y) => constant::binary(*op, x.eval()?, y.eval()?),
        }
    }
}

/// Bound on the depth of the expression tree (unary operators,
/// parentheses and operator chains all count).
pub const MAX_DEPTH: usize = 256;

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Offset reported for errors at end of input.
    end: usize,
    depth: usize,
}

pub fn parse(tokens: Vec<Spanned>, src_len: usize) -> Result<Expr, EvalError> {
    let mut p = Parser { tokens, pos: 0, end: src_len, depth: 0 };
    let expr = p.parse_or()?;
    match p.tokens.get(p.pos) {
        None => Ok(expr),
        Some((tok, at)) => Err(EvalError::Syntax {
            pos: *at,
            msg: format!("unexpected {} after top level expression", describe(tok)),
        }),
    }
}

fn describe(tok: &Token) -> String {
    match tok {
        Token::Op(op) => format!("operator {op}"),
        Token::LParen => "(".into(),
        Token::RParen => ")".into(),
        Token::Ident(name) => format!("name {name}"),
        _ => "literal".into(),
    }
}

impl Parser {
    fn peek_op(&self) -> Option<&'static str> {
        match self.tokens.get(self.pos) {
            Some((Token::Op(op), _)) => Some(op),
            _ => None,
        }
    }

    fn enter(&mut self, at: usize) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::Syntax { pos: at, msg: "expression nested too deeply".into() })
        }
        Ok(())
    }

    /// One left-associative level: operands from `next`, operators
    /// mapped by `op_of`.
    fn binary_level(
        &mut self,
        next: fn(&mut Parser) -> Result<Expr, EvalError>,
        op_of: fn(&str) -> Option<BinaryOp>,
    ) -> Result<Expr, EvalError> {
        let outer = self.depth;
        let mut left = next(self)?;
        while let Some(op) = self.peek_op().and_then(op_of) {
            let at = self.tokens[self.pos].1;
            self.pos += 1;
            // each link of the chain sits one level deeper in the tree
            self.enter(at)?;
            let right = next(self)?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        self.depth = outer;
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(Parser::parse_and, |op| match op {
            "||" => Some(BinaryOp::LogOr),
            _ => None,
        })
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(Parser::parse_compare, |op| match op {
            "&&" => Some(BinaryOp::LogAnd),
            _ => None,
        })
    }

    fn parse_compare(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(Parser::parse_additive, |op| match op {
            "==" => Some(BinaryOp::Eq),
            "!=" => Some(BinaryOp::Ne),
            "<" => Some(BinaryOp::Lt),
            "<=" => Some(BinaryOp::Le),
            ">" => Some(BinaryOp::Gt),
            ">=" => Some(BinaryOp::Ge),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(Parser::parse_multiplicative, |op| match op {
            "+" => Some(BinaryOp::Add),
            "-" => Some(BinaryOp::Sub),
            "|" => Some(BinaryOp::Or),
            "^" => Some(BinaryOp::Xor),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(Parser::parse_unary, |op| match op {
            "*" => Some(BinaryOp::Mul),
            "/" => Some(BinaryOp::Div),
            "%" => Some(BinaryOp::Rem),
            "<<" => Some(BinaryOp::Shl),
            ">>" => Some(BinaryOp::Shr),
            "&" => Some(BinaryOp::And),
            "&^" => Some(BinaryOp::AndNot),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        let op = match self.peek_op() {
            Some("+") => UnaryOp::Plus,
            Some("-") => UnaryOp::Neg,
            Some("!") => UnaryOp::Not,
            Some("^") => UnaryOp::BitNot,
            _ => return self.parse_primary(),
        };
        let at = self.tokens[self.pos].1;
        self.pos += 1;
        self.enter(at)?;
        let operand = self.parse_unary()?;
        self.depth -= 1;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        let Some((tok, at)) = self.tokens.get(self.pos).cloned() else {
            return Err(EvalError::Syntax { pos: self.end, msg: "expected operand".into() })
        };
        self.pos += 1;
        Ok(match tok {
            Token::Int(n) | Token::Char(n) => Expr::Lit(Constant::Int(n)),
            Token::Float(r) => Expr::Lit(Constant::Float(r)),
            Token::Imag(x) => Expr::Lit(Constant::Complex(0., x)),
            Token::Str(s) => Expr::Lit(Constant::String(s)),
            Token::Ident(name) => match name.as_str() {
                "true" => Expr::Lit(Constant::Bool(true)),
                "false" => Expr::Lit(Constant::Bool(false)),
                _ => Expr::Ident(name),
            },
            Token::LParen => {
                self.enter(at)?;
                let inner = self.parse_or()?;
                self.depth -= 1;
                match self.tokens.get(self.pos) {
                    Some((Token::RParen, _)) => self.pos += 1,
                    Some((_, at)) => return Err(EvalError::Syntax {
                        pos: *at, msg: "expected ')'".into()
                    }),
                    None => return Err(EvalError::Syntax {
                        pos: self.end, msg: "expected ')'".into()
                    }),
                }
                inner
            }
            Token::RParen | Token::Op(_) => return Err(EvalError::Syntax {
                pos: at,
                msg: format!("expected operand, found {}", describe(&tok)),
            }),
        })
    }
}
