//! `eval`: evaluates a literal constant expression (`2+3*4`,
//! `"a" + "b"`, `1 << 10 > 1000 && true`) without any variables or
//! calls. Results are booleans, strings, integers (narrowed to i64,
//! else u64), floats, or complex numbers.

pub mod constant;
pub mod lexer;
pub mod parser;

use crate::eval::constant::Constant;
use crate::coerce::to_canonical_string;
use crate::value::Value;
use crate::warn;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// `pos` is the 0-based character offset; shown 1-based.
    #[error("1:{}: {msg}", .pos + 1)]
    Syntax { pos: usize, msg: String },
    #[error("undefined: {0}")]
    Undefined(String),
    #[error("invalid operation: operator {op} not defined on {operand} ({kind} constant)")]
    NotDefined { op: &'static str, operand: String, kind: &'static str },
    #[error("invalid operation: mismatched types {0} and {1}")]
    Mismatched(&'static str, &'static str),
    #[error("invalid operation: division by zero")]
    DivisionByZero,
    #[error("constant overflow")]
    Overflow,
    #[error("invalid shift count {0}")]
    ShiftCount(String),
    #[error("constant {0} overflows uint64")]
    OutOfRange(i128),
    #[error("cannot evaluate a {0} value")]
    NotText(&'static str),
}

/// Evaluate `expr` down to a constant.
pub fn eval_constant(expr: &str) -> Result<Constant, EvalError> {
    let tokens = lexer::tokenize(expr)?;
    parser::parse(tokens, expr.chars().count())?.eval()
}

/// Evaluate `expr` and convert the result to a `Value`. Integers that
/// fit neither i64 nor u64 are an error.
pub fn eval_str(expr: &str) -> Result<Value, EvalError> {
    Ok(match eval_constant(expr)? {
        Constant::Bool(b) => Value::Bool(b),
        Constant::String(s) => Value::from(s),
        Constant::Int(n) => {
            if let Ok(i) = i64::try_from(n) {
                Value::Int(i)
            } else if let Ok(u) = u64::try_from(n) {
                Value::UInt(u)
            } else {
                return Err(EvalError::OutOfRange(n))
            }
        }
        Constant::Float(r) => Value::Float(r.to_f64()),
        Constant::Complex(re, im) => Value::Complex(re, im),
    })
}

/// The `eval` helper: the expression is the string form of `v`. Any
/// failure is logged and gives `Value::Nil`, never a render error.
pub fn eval_value(v: &Value) -> Value {
    let expr = match to_canonical_string(v) {
        Ok(expr) => expr,
        Err(_) => {
            warn!("eval: {}", EvalError::NotText(v.type_name()));
            return Value::Nil
        }
    };
    match eval_str(&expr) {
        Ok(value) => value,
        Err(e) => {
            warn!("eval {expr:?}: {e}");
            Value::Nil
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn ev(s: &str) -> Value {
        eval_str(s).unwrap()
    }

    #[test]
    fn t_arithmetic() {
        assert_eq!(ev("2+3*4"), Value::Int(14));
        assert_eq!(ev("(2+3)*4"), Value::Int(20));
        assert_eq!(ev("7/2"), Value::Int(3));
        assert_eq!(ev("-7/2"), Value::Int(-3));
        assert_eq!(ev("-7%3"), Value::Int(-1));
        assert_eq!(ev("7/2.0"), Value::Float(3.5));
        assert_eq!(ev("0.1+0.2"), Value::Float(0.3));
        assert_eq!(ev("1e3"), Value::Float(1000.));
        assert_eq!(ev("1<<10 | 1"), Value::Int(1025));
        assert_eq!(ev("0xff &^ 0x0f"), Value::Int(0xf0));
        assert_eq!(ev("^0"), Value::Int(-1));
        assert_eq!(ev("'a' + 1"), Value::Int(98));
    }

    #[test]
    fn t_integer_range() {
        assert_eq!(ev("1<<63 - 1"), Value::Int(i64::MAX));
        assert_eq!(ev("1<<63"), Value::UInt(1 << 63));
        assert_eq!(ev("1<<64 - 1"), Value::UInt(u64::MAX));
        assert_eq!(eval_str("1<<64"), Err(EvalError::OutOfRange(1 << 64)));
        assert_eq!(ev("-(1<<63)"), Value::Int(i64::MIN));
        assert!(eval_str("-(1<<63) - 1").is_err());
        // intermediate values may exceed 64 bits
        assert_eq!(ev("(1<<100) >> 98"), Value::Int(4));
    }

    #[test]
    fn t_logic_and_strings() {
        assert_eq!(ev("true && false"), Value::Bool(false));
        assert_eq!(ev("true || false && false"), Value::Bool(true));
        assert_eq!(ev("!(1 < 2)"), Value::Bool(false));
        assert_eq!(ev("1 == 1.0"), Value::Bool(true));
        assert_eq!(ev(r#""foo" + "bar""#), Value::str("foobar"));
        assert_eq!(ev(r#""abc" < "abd""#), Value::Bool(true));
        assert_eq!(ev("`raw` == \"raw\""), Value::Bool(true));
    }

    #[test]
    fn t_complex() {
        assert_eq!(ev("2i * 2i"), Value::Complex(-4., 0.));
        assert_eq!(ev("1 + 2i"), Value::Complex(1., 2.));
        assert_eq!(ev("(1+2i) == (1+2i)"), Value::Bool(true));
        assert!(eval_str("1i < 2i").is_err());
    }

    #[test]
    fn t_errors() {
        assert_eq!(eval_str("x + 1"), Err(EvalError::Undefined("x".into())));
        assert_eq!(eval_str("1/0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval_str("1.5/0.0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval_str(r#""a" + 1"#),
                   Err(EvalError::Mismatched("untyped string", "untyped int")));
        assert_eq!(eval_str("!1").unwrap_err().to_string(),
                   "invalid operation: operator ! not defined on 1 (untyped int constant)");
        assert!(eval_str("1.5 % 1").is_err());
        assert!(eval_str("true + true").is_err());
        assert_eq!(eval_str("1 +").unwrap_err().to_string(), "1:4: expected operand");
    }

    #[test]
    fn t_eval_value() {
        assert_eq!(eval_value(&Value::str("2+3*4")), Value::Int(14));
        assert_eq!(eval_value(&Value::str("not-an-expr")), Value::Nil);
        assert_eq!(eval_value(&Value::Int(5)), Value::Int(5));
        assert_eq!(eval_value(&Value::Seq(vec![])), Value::Nil);
    }

    #[test]
    fn t_deep_nesting() {
        assert_eq!(eval_value(&Value::str(&format!("{}1", "-".repeat(20_000)))), Value::Nil);
        assert_eq!(eval_value(&Value::str(&"(".repeat(200_000))), Value::Nil);
        assert_eq!(eval_value(&Value::str(&format!("1{}", "+1".repeat(100_000)))), Value::Nil);
        assert_eq!(ev(&format!("{}7{}", "(".repeat(100), ")".repeat(100))), Value::Int(7));
        assert_eq!(ev(&format!("{}1", "-".repeat(100))), Value::Int(1));
    }
}
