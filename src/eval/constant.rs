//! Untyped constant values and their arithmetic.
//!
//! Integers are exact within i128 (overflow is an error), reals are
//! exact fractions while numerator and denominator fit i128 and fall
//! back to f64 after that, complex numbers are a pair of f64.

use std::cmp::Ordering;
use std::fmt;

use crate::eval::parser::{BinaryOp, UnaryOp};
use crate::eval::EvalError;

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// A reduced fraction, `den > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ratio {
    num: i128,
    den: i128,
}

impl Ratio {
    pub fn new(num: i128, den: i128) -> Option<Ratio> {
        if den == 0 {
            return None
        }
        let (num, den) = if den < 0 {
            (num.checked_neg()?, den.checked_neg()?)
        } else {
            (num, den)
        };
        let g = i128::try_from(gcd(num.unsigned_abs(), den.unsigned_abs())).ok()?;
        if g <= 1 {
            Some(Ratio { num, den })
        } else {
            Some(Ratio { num: num / g, den: den / g })
        }
    }

    pub fn from_int(n: i128) -> Ratio {
        Ratio { num: n, den: 1 }
    }

    fn to_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }

    fn is_zero(self) -> bool {
        self.num == 0
    }

    fn checked_add(self, o: Ratio) -> Option<Ratio> {
        Ratio::new(
            self.num.checked_mul(o.den)?.checked_add(o.num.checked_mul(self.den)?)?,
            self.den.checked_mul(o.den)?)
    }

    fn checked_sub(self, o: Ratio) -> Option<Ratio> {
        self.checked_add(Ratio { num: o.num.checked_neg()?, den: o.den })
    }

    fn checked_mul(self, o: Ratio) -> Option<Ratio> {
        Ratio::new(self.num.checked_mul(o.num)?, self.den.checked_mul(o.den)?)
    }

    fn checked_div(self, o: Ratio) -> Option<Ratio> {
        Ratio::new(self.num.checked_mul(o.den)?, self.den.checked_mul(o.num)?)
    }

    fn checked_cmp(self, o: Ratio) -> Option<Ordering> {
        Some(self.num.checked_mul(o.den)?.cmp(&o.num.checked_mul(self.den)?))
    }

    /// The integer value, if the fraction is whole.
    pub fn to_int(self) -> Option<i128> {
        (self.den == 1).then_some(self.num)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Real {
    Exact(Ratio),
    Approx(f64),
}

impl Real {
    /// From the parts of a decimal float literal: `int.frac e exponent`
    /// (digits only, underscores already removed).
    pub fn from_decimal(int: &str, frac: &str, exponent: i32) -> Real {
        let exact = || -> Option<Real> {
            let digits = format!("{int}{frac}");
            let mantissa: i128 = if digits.is_empty() { 0 } else { digits.parse().ok()? };
            let scale = exponent.checked_sub(i32::try_from(frac.len()).ok()?)?;
            let pow = 10i128.checked_pow(scale.unsigned_abs())?;
            Some(Real::Exact(if scale >= 0 {
                Ratio::from_int(mantissa.checked_mul(pow)?)
            } else {
                Ratio::new(mantissa, pow)?
            }))
        };
        exact().unwrap_or_else(|| {
            let int = if int.is_empty() { "0" } else { int };
            let frac = if frac.is_empty() { "0" } else { frac };
            Real::Approx(format!("{int}.{frac}e{exponent}").parse().unwrap_or(f64::NAN))
        })
    }

    pub fn to_f64(self) -> f64 {
        match self {
            Real::Exact(r) => r.to_f64(),
            Real::Approx(x) => x,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Real::Exact(r) => r.is_zero(),
            Real::Approx(x) => x == 0.,
        }
    }

    /// Exact if both sides are and `exact` doesn't overflow, `approx`
    /// on their f64 values otherwise.
    fn combine(
        self,
        other: Real,
        exact: fn(Ratio, Ratio) -> Option<Ratio>,
        approx: fn(f64, f64) -> f64,
    ) -> Real {
        if let (Real::Exact(a), Real::Exact(b)) = (self, other) {
            if let Some(r) = exact(a, b) {
                return Real::Exact(r)
            }
        }
        Real::Approx(approx(self.to_f64(), other.to_f64()))
    }

    fn compare(self, other: Real) -> Option<Ordering> {
        if let (Real::Exact(a), Real::Exact(b)) = (self, other) {
            if let Some(o) = a.checked_cmp(b) {
                return Some(o)
            }
        }
        self.to_f64().partial_cmp(&other.to_f64())
    }

    fn neg(self) -> Real {
        Real::Exact(Ratio::from_int(0)).combine(self, Ratio::checked_sub, |a, b| a - b)
    }

    /// The integer value, if whole and within i128.
    fn to_int(self) -> Option<i128> {
        match self {
            Real::Exact(r) => r.to_int(),
            Real::Approx(x) =>
                if x.fract() == 0. && x.abs() < 1.7e38 { Some(x as i128) } else { None },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Bool(bool),
    String(String),
    Int(i128),
    Float(Real),
    Complex(f64, f64),
}

impl Constant {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Constant::Bool(_) => "untyped bool",
            Constant::String(_) => "untyped string",
            Constant::Int(_) => "untyped int",
            Constant::Float(_) => "untyped float",
            Constant::Complex(..) => "untyped complex",
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Constant::Int(_) | Constant::Float(_) | Constant::Complex(..))
    }

    fn to_real(&self) -> Option<Real> {
        match self {
            Constant::Int(n) => Some(Real::Exact(Ratio::from_int(*n))),
            Constant::Float(r) => Some(*r),
            _ => None,
        }
    }

    fn to_complex(&self) -> Option<(f64, f64)> {
        match self {
            Constant::Complex(re, im) => Some((*re, *im)),
            _ => self.to_real().map(|r| (r.to_f64(), 0.)),
        }
    }

    /// For shift operands: integers, and reals that are whole.
    fn to_int(&self) -> Option<i128> {
        match self {
            Constant::Int(n) => Some(*n),
            Constant::Float(r) => r.to_int(),
            Constant::Complex(re, im) if *im == 0. => Real::Approx(*re).to_int(),
            _ => None,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Bool(b) => write!(f, "{b}"),
            Constant::String(s) => write!(f, "{s:?}"),
            Constant::Int(n) => write!(f, "{n}"),
            Constant::Float(r) => write!(f, "{}", r.to_f64()),
            Constant::Complex(re, im) => write!(f, "({re} + {im}i)"),
        }
    }
}

fn not_defined(op: &'static str, operand: &Constant) -> EvalError {
    EvalError::NotDefined { op, operand: operand.to_string(), kind: operand.kind_name() }
}

pub fn unary(op: UnaryOp, x: Constant) -> Result<Constant, EvalError> {
    match (op, x) {
        (UnaryOp::Plus, x @ (Constant::Int(_) | Constant::Float(_) | Constant::Complex(..))) =>
            Ok(x),
        (UnaryOp::Neg, Constant::Int(n)) =>
            n.checked_neg().map(Constant::Int).ok_or(EvalError::Overflow),
        (UnaryOp::Neg, Constant::Float(r)) => Ok(Constant::Float(r.neg())),
        (UnaryOp::Neg, Constant::Complex(re, im)) => Ok(Constant::Complex(-re, -im)),
        (UnaryOp::Not, Constant::Bool(b)) => Ok(Constant::Bool(!b)),
        (UnaryOp::BitNot, Constant::Int(n)) => Ok(Constant::Int(!n)),
        (op, x) => Err(not_defined(op.as_str(), &x)),
    }
}

fn compare_result(op: BinaryOp, ord: Option<Ordering>) -> Constant {
    use BinaryOp::*;
    Constant::Bool(match ord {
        // NaN compares unequal to everything
        None => op == Ne,
        Some(o) => match op {
            Eq => o == Ordering::Equal,
            Ne => o != Ordering::Equal,
            Lt => o == Ordering::Less,
            Le => o != Ordering::Greater,
            Gt => o == Ordering::Greater,
            Ge => o != Ordering::Less,
            _ => false,
        }
    })
}

fn shift(op: BinaryOp, x: &Constant, y: &Constant) -> Result<Constant, EvalError> {
    let v = x.to_int().ok_or_else(|| not_defined(op.as_str(), x))?;
    let count = match y.to_int() {
        Some(n) if n >= 0 => n,
        _ => return Err(EvalError::ShiftCount(y.to_string())),
    };
    Ok(Constant::Int(if op == BinaryOp::Shl {
        if v == 0 {
            0
        } else {
            let n = u32::try_from(count).ok().filter(|n| *n < 128).ok_or(EvalError::Overflow)?;
            let shifted = v << n;
            if shifted >> n != v {
                return Err(EvalError::Overflow)
            }
            shifted
        }
    } else {
        v >> count.min(127)
    }))
}

fn int_binary(op: BinaryOp, a: i128, b: i128) -> Result<Constant, EvalError> {
    use BinaryOp::*;
    let r = match op {
        Add => a.checked_add(b),
        Sub => a.checked_sub(b),
        Mul => a.checked_mul(b),
        Div | Rem if b == 0 => return Err(EvalError::DivisionByZero),
        // integer division truncates
        Div => a.checked_div(b),
        Rem => a.checked_rem(b),
        And => Some(a & b),
        Or => Some(a | b),
        Xor => Some(a ^ b),
        AndNot => Some(a & !b),
        _ => return Ok(compare_result(op, Some(a.cmp(&b)))),
    };
    r.map(Constant::Int).ok_or(EvalError::Overflow)
}

fn real_binary(op: BinaryOp, a: Real, b: Real) -> Result<Constant, EvalError> {
    use BinaryOp::*;
    let r = match op {
        Add => a.combine(b, Ratio::checked_add, |x, y| x + y),
        Sub => a.combine(b, Ratio::checked_sub, |x, y| x - y),
        Mul => a.combine(b, Ratio::checked_mul, |x, y| x * y),
        Div if b.is_zero() => return Err(EvalError::DivisionByZero),
        Div => a.combine(b, Ratio::checked_div, |x, y| x / y),
        Eq | Ne | Lt | Le | Gt | Ge => return Ok(compare_result(op, a.compare(b))),
        _ => return Err(not_defined(op.as_str(), &Constant::Float(a))),
    };
    Ok(Constant::Float(r))
}

fn complex_binary(
    op: BinaryOp, (a, b): (f64, f64), (c, d): (f64, f64)
) -> Result<Constant, EvalError> {
    use BinaryOp::*;
    let (re, im) = match op {
        Add => (a + c, b + d),
        Sub => (a - c, b - d),
        Mul => (a * c - b * d, a * d + b * c),
        Div => {
            let den = c * c + d * d;
            if den == 0. {
                return Err(EvalError::DivisionByZero)
            }
            ((a * c + b * d) / den, (b * c - a * d) / den)
        }
        Eq => return Ok(Constant::Bool(a == c && b == d)),
        Ne => return Ok(Constant::Bool(a != c || b != d)),
        _ => return Err(not_defined(op.as_str(), &Constant::Complex(a, b))),
    };
    Ok(Constant::Complex(re, im))
}

pub fn binary(op: BinaryOp, x: Constant, y: Constant) -> Result<Constant, EvalError> {
    use BinaryOp::*;
    if let Shl | Shr = op {
        return shift(op, &x, &y)
    }
    match (&x, &y) {
        (Constant::Bool(a), Constant::Bool(b)) => match op {
            LogAnd => Ok(Constant::Bool(*a && *b)),
            LogOr => Ok(Constant::Bool(*a || *b)),
            Eq => Ok(Constant::Bool(a == b)),
            Ne => Ok(Constant::Bool(a != b)),
            _ => Err(not_defined(op.as_str(), &x)),
        },
        (Constant::String(a), Constant::String(b)) => match op {
            Add => Ok(Constant::String(format!("{a}{b}"))),
            Eq | Ne | Lt | Le | Gt | Ge => Ok(compare_result(op, Some(a.cmp(b)))),
            _ => Err(not_defined(op.as_str(), &x)),
        },
        _ => {
            if !(x.is_numeric() && y.is_numeric()) {
                return Err(EvalError::Mismatched(x.kind_name(), y.kind_name()))
            }
            if let LogAnd | LogOr = op {
                return Err(not_defined(op.as_str(), &x))
            }
            // promote to the larger of the two kinds
            if let (Constant::Int(a), Constant::Int(b)) = (&x, &y) {
                return int_binary(op, *a, *b)
            }
            if let (Some(a), Some(b)) = (x.to_real(), y.to_real()) {
                return real_binary(op, a, b)
            }
            match (x.to_complex(), y.to_complex()) {
                (Some(a), Some(b)) => complex_binary(op, a, b),
                _ => Err(EvalError::Mismatched(x.kind_name(), y.kind_name())),
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(n: i128, d: i128) -> Real {
        Real::Exact(Ratio::new(n, d).unwrap())
    }

    #[test]
    fn t_ratio() {
        assert_eq!(Ratio::new(2, -4), Ratio::new(-1, 2));
        assert_eq!(Ratio::new(1, 0), None);
        assert_eq!(Ratio::new(6, 3).unwrap().to_int(), Some(2));
        let third = Ratio::new(1, 3).unwrap();
        assert_eq!(third.checked_add(third).unwrap(), Ratio::new(2, 3).unwrap());
        assert_eq!(third.checked_cmp(Ratio::new(1, 2).unwrap()), Some(Ordering::Less));
    }

    #[test]
    fn t_from_decimal() {
        assert_eq!(Real::from_decimal("3", "14", 0), ratio(157, 50));
        assert_eq!(Real::from_decimal("", "5", 1), ratio(5, 1));
        assert_eq!(Real::from_decimal("1", "", 3), ratio(1000, 1));
        assert_eq!(Real::from_decimal("1", "", 400).to_f64(), f64::INFINITY);
        assert_eq!(Real::from_decimal("2", "5", -60).to_f64(), 2.5e-60);
    }

    #[test]
    fn t_exact_reals() {
        let r = real_binary(BinaryOp::Add, ratio(1, 10), ratio(2, 10)).unwrap();
        assert_eq!(r, Constant::Float(ratio(3, 10)));
        let Constant::Float(r) = r else { panic!() };
        assert_eq!(r.to_f64(), 0.3);
    }

    #[test]
    fn t_shift() {
        let s = |op, a, b| shift(op, &Constant::Int(a), &Constant::Int(b));
        assert_eq!(s(BinaryOp::Shl, 1, 10), Ok(Constant::Int(1024)));
        assert_eq!(s(BinaryOp::Shr, -8, 1), Ok(Constant::Int(-4)));
        assert_eq!(s(BinaryOp::Shr, 5, 1000), Ok(Constant::Int(0)));
        assert_eq!(s(BinaryOp::Shl, 0, 1000), Ok(Constant::Int(0)));
        assert_eq!(s(BinaryOp::Shl, 1, 127), Err(EvalError::Overflow));
        assert!(matches!(s(BinaryOp::Shl, 1, -1), Err(EvalError::ShiftCount(_))));
        assert_eq!(shift(BinaryOp::Shl, &Constant::Float(ratio(2, 1)), &Constant::Int(2)),
                   Ok(Constant::Int(8)));
        assert!(shift(BinaryOp::Shl, &Constant::Float(ratio(1, 2)), &Constant::Int(2))
                .is_err());
    }
}
