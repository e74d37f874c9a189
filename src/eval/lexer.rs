//! Tokens of the constant expression language: number, imaginary,
//! character and string literals, identifiers, operators, parens.

use crate::eval::constant::Real;
use crate::eval::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i128),
    Float(Real),
    /// Imaginary literal, `2i`, `1.5i`
    Imag(f64),
    /// Character literal, its code point
    Char(i128),
    Str(String),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
}

/// Longest first.
const OPERATORS: &[&str] = &[
    "&&", "||", "&^", "<<", ">>", "==", "!=", "<=", ">=",
    "+", "-", "*", "/", "%", "&", "|", "^", "!", "<", ">",
];

/// A token and the (0-based, char) offset it starts at.
pub type Spanned = (Token, usize);

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

fn syntax(pos: usize, msg: impl Into<String>) -> EvalError {
    EvalError::Syntax { pos, msg: msg.into() }
}

pub fn tokenize(src: &str) -> Result<Vec<Spanned>, EvalError> {
    let mut lexer = Lexer { chars: src.chars().collect(), pos: 0 };
    let mut out = Vec::new();
    while let Some(tok) = lexer.next_token()? {
        out.push(tok);
    }
    Ok(out)
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn rest_starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn next_token(&mut self) -> Result<Option<Spanned>, EvalError> {
        while self.peek().map_or(false, char::is_whitespace) {
            self.pos += 1;
        }
        let start = self.pos;
        let c = match self.peek() {
            None => return Ok(None),
            Some(c) => c
        };
        let tok = if c.is_ascii_digit()
            || (c == '.' && self.peek_at(1).map_or(false, |d| d.is_ascii_digit()))
        {
            self.number()?
        } else if c == '_' || c.is_alphabetic() {
            let mut name = String::new();
            while let Some(c) = self.peek().filter(|c| *c == '_' || c.is_alphanumeric()) {
                name.push(c);
                self.pos += 1;
            }
            Token::Ident(name)
        } else if c == '"' {
            self.pos += 1;
            Token::Str(self.interpreted('"')?)
        } else if c == '`' {
            self.pos += 1;
            self.raw_string()?
        } else if c == '\'' {
            self.pos += 1;
            self.char_literal()?
        } else if c == '(' {
            self.pos += 1;
            Token::LParen
        } else if c == ')' {
            self.pos += 1;
            Token::RParen
        } else if let Some(op) = OPERATORS.iter().find(|op| self.rest_starts_with(op)) {
            self.pos += op.chars().count();
            Token::Op(op)
        } else {
            return Err(syntax(start, format!("invalid character {c:?}")))
        };
        Ok(Some((tok, start)))
    }

    fn digits(&mut self, radix: u32) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c == '_' {
                self.pos += 1;
            } else if c.is_digit(radix) {
                s.push(c);
                self.pos += 1;
            } else {
                break
            }
        }
        s
    }

    fn int_of(&self, start: usize, digits: &str, radix: u32) -> Result<i128, EvalError> {
        if digits.is_empty() {
            return Err(syntax(start, format!("{radix}-base literal has no digits")))
        }
        i128::from_str_radix(digits, radix).map_err(|_| EvalError::Overflow)
    }

    fn number(&mut self) -> Result<Token, EvalError> {
        let start = self.pos;
        if self.peek() == Some('0') {
            let radix = match self.peek_at(1) {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None
            };
            if let Some(radix) = radix {
                self.pos += 2;
                let digits = self.digits(radix);
                let n = self.int_of(start, &digits, radix)?;
                return self.maybe_imaginary(Token::Int(n), n as f64)
            }
        }

        let int_part = self.digits(10);
        let mut is_float = false;
        let mut frac_part = String::new();
        let mut exponent: i32 = 0;
        if self.peek() == Some('.') {
            is_float = true;
            self.pos += 1;
            frac_part = self.digits(10);
        }
        if let Some('e' | 'E') = self.peek() {
            is_float = true;
            self.pos += 1;
            let mut sign = 1;
            match self.peek() {
                Some('+') => self.pos += 1,
                Some('-') => { sign = -1; self.pos += 1 }
                _ => ()
            }
            let exp_digits = self.digits(10);
            if exp_digits.is_empty() {
                return Err(syntax(start, "exponent has no digits"))
            }
            exponent = sign * exp_digits.parse::<i32>().map_err(|_| EvalError::Overflow)?;
        }
        if self.peek().map_or(false, |c| c.is_alphanumeric() && c != 'i') {
            return Err(syntax(self.pos, "invalid digit in numeric literal"))
        }

        if is_float {
            let real = Real::from_decimal(&int_part, &frac_part, exponent);
            self.maybe_imaginary(Token::Float(real), real.to_f64())
        } else {
            // 0-prefixed: legacy octal (0777); a lone 0 is just 0
            let (digits, radix) = if int_part.len() > 1 && int_part.starts_with('0') {
                if self.peek() == Some('i') {
                    // 0123i is decimal
                    (int_part.as_str(), 10)
                } else {
                    (&int_part[1..], 8)
                }
            } else {
                (int_part.as_str(), 10)
            };
            if radix == 8 && digits.chars().any(|c| c > '7') {
                return Err(syntax(start, format!("invalid digit in octal literal {int_part}")))
            }
            let n = self.int_of(start, digits, radix)?;
            self.maybe_imaginary(Token::Int(n), n as f64)
        }
    }

    fn maybe_imaginary(&mut self, tok: Token, value: f64) -> Result<Token, EvalError> {
        if self.peek() == Some('i') {
            self.pos += 1;
            Ok(Token::Imag(value))
        } else {
            Ok(tok)
        }
    }

    fn hex_escape(&mut self, n: usize) -> Result<u32, EvalError> {
        let start = self.pos;
        let mut v: u32 = 0;
        for _ in 0..n {
            let d = self.peek()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| syntax(start, "invalid escape sequence"))?;
            v = v * 16 + d;
            self.pos += 1;
        }
        Ok(v)
    }

    /// One (possibly escaped) unit of a string or char literal,
    /// appended to `out` as bytes.
    fn literal_unit(&mut self, quote: char, out: &mut Vec<u8>) -> Result<(), EvalError> {
        let pos = self.pos;
        let c = self.peek().ok_or_else(|| syntax(pos, "literal not terminated"))?;
        self.pos += 1;
        if c == '\n' {
            return Err(syntax(pos, "newline in literal"))
        }
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            return Ok(())
        }
        let e = self.peek().ok_or_else(|| syntax(pos, "escape sequence not terminated"))?;
        self.pos += 1;
        let simple = match e {
            'a' => Some(0x07),
            'b' => Some(0x08),
            'f' => Some(0x0c),
            'n' => Some(b'\n'),
            'r' => Some(b'\r'),
            't' => Some(b'\t'),
            'v' => Some(0x0b),
            '\\' => Some(b'\\'),
            _ if e == quote => Some(quote as u8),
            _ => None
        };
        if let Some(b) = simple {
            out.push(b);
            return Ok(())
        }
        match e {
            'x' => out.push(self.hex_escape(2)? as u8),
            '0'..='7' => {
                let mut v = e.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    let d = self.peek()
                        .and_then(|c| c.to_digit(8))
                        .ok_or_else(|| syntax(pos, "invalid octal escape"))?;
                    v = v * 8 + d;
                    self.pos += 1;
                }
                if v > 255 {
                    return Err(syntax(pos, "octal escape value > 255"))
                }
                out.push(v as u8);
            }
            'u' | 'U' => {
                let v = self.hex_escape(if e == 'u' { 4 } else { 8 })?;
                let c = char::from_u32(v)
                    .ok_or_else(|| syntax(pos, "escape sequence is invalid Unicode code point"))?;
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
            _ => return Err(syntax(pos, "unknown escape sequence"))
        }
        Ok(())
    }

    fn interpreted(&mut self, quote: char) -> Result<String, EvalError> {
        let mut bytes = Vec::new();
        while self.peek() != Some(quote) {
            self.literal_unit(quote, &mut bytes)?;
        }
        self.pos += 1;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn raw_string(&mut self) -> Result<Token, EvalError> {
        let start = self.pos;
        let mut s = String::new();
        loop {
            match self.peek() {
                None => return Err(syntax(start, "raw string literal not terminated")),
                Some('`') => {
                    self.pos += 1;
                    return Ok(Token::Str(s))
                }
                Some('\r') => self.pos += 1,
                Some(c) => {
                    s.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn char_literal(&mut self) -> Result<Token, EvalError> {
        let start = self.pos;
        if self.peek() == Some('\'') {
            return Err(syntax(start, "empty rune literal or unescaped ' in rune literal"))
        }
        let mut bytes = Vec::new();
        self.literal_unit('\'', &mut bytes)?;
        if self.peek() != Some('\'') {
            return Err(syntax(start, "rune literal not terminated"))
        }
        self.pos += 1;
        // A byte escape (\x80) stands for its value, not for UTF-8.
        let value = match std::str::from_utf8(&bytes) {
            Ok(s) => s.chars().next().map(|c| c as i128).unwrap_or(0),
            Err(_) => bytes[0] as i128,
        };
        Ok(Token::Char(value))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<Token> {
        tokenize(s).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn t_numbers() {
        assert_eq!(toks("0 42 1_000 0x1F 0o17 017 0b101"),
                   [Token::Int(0), Token::Int(42), Token::Int(1000), Token::Int(31),
                    Token::Int(15), Token::Int(15), Token::Int(5)]);
        assert_eq!(toks("2i"), [Token::Imag(2.)]);
        assert_eq!(toks("1.5i"), [Token::Imag(1.5)]);
        assert!(matches!(toks("1.5")[..], [Token::Float(_)]));
        assert!(matches!(toks(".5e1")[..], [Token::Float(_)]));
        assert!(tokenize("09").is_err());
        assert!(tokenize("0x").is_err());
        assert!(tokenize("1e").is_err());
        assert!(tokenize("12abc").is_err());
        assert_eq!(tokenize("999999999999999999999999999999999999999999"),
                   Err(EvalError::Overflow));
    }

    #[test]
    fn t_operators() {
        assert_eq!(toks("a&^b&&!c<=d"),
                   [Token::Ident("a".into()), Token::Op("&^"), Token::Ident("b".into()),
                    Token::Op("&&"), Token::Op("!"), Token::Ident("c".into()),
                    Token::Op("<="), Token::Ident("d".into())]);
        assert_eq!(toks("(1)"), [Token::LParen, Token::Int(1), Token::RParen]);
        assert!(tokenize("1 @ 2").is_err());
    }

    #[test]
    fn t_strings() {
        assert_eq!(toks(r#""a\tb\"c\x41\101ä""#), [Token::Str("a\tb\"cAAä".into())]);
        assert_eq!(toks("`raw\\n`"), [Token::Str("raw\\n".into())]);
        assert_eq!(toks(r"'a' '\n' '\x80' 'ä'"),
                   [Token::Char(97), Token::Char(10), Token::Char(128), Token::Char(228)]);
        assert!(tokenize(r#""open"#).is_err());
        assert!(tokenize(r#""\q""#).is_err());
        assert!(tokenize("''").is_err());
        assert!(tokenize("'ab'").is_err());
    }
}
