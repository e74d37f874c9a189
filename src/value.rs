//! The runtime-typed values that flow through the helper functions.
//!
//! Template data and helper arguments are not statically shaped; a
//! `Value` is the closed set of what they can be. Helpers dispatch on
//! the variant and have to produce something for every one of them
//! (at worst `Value::Nil`).

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use kstring::KString;
use serde::ser::{Error as SerError, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// The output context a trusted string has been approved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MarkupContext {
    Css,
    Html,
    HtmlAttr,
    Js,
    Url,
}

impl MarkupContext {
    pub fn as_str(self) -> &'static str {
        match self {
            MarkupContext::Css => "CSS",
            MarkupContext::Html => "HTML",
            MarkupContext::HtmlAttr => "HTMLAttr",
            MarkupContext::Js => "JS",
            MarkupContext::Url => "URL",
        }
    }
}

/// A string the template author vouches for: the render pipeline
/// writes it out without escaping. Nothing checks the claim; putting
/// user input in here is an injection hole.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Markup {
    context: MarkupContext,
    text: KString,
}

impl Markup {
    pub fn new(context: MarkupContext, text: impl Into<KString>) -> Self {
        Markup { context, text: text.into() }
    }
    pub fn context(&self) -> MarkupContext {
        self.context
    }
    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }
}

/// Values that know how to present themselves as text.
pub trait ToText: Debug + Send + Sync {
    fn to_text(&self) -> String;
}

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Kept apart from `Float` so that the text form is the shortest
    /// one for 32 bits (3.14, not 3.140000104904175).
    Float32(f32),
    /// (real, imaginary)
    Complex(f64, f64),
    String(KString),
    Bytes(Vec<u8>),
    Time(DateTime<Utc>),
    Markup(Markup),
    Seq(Vec<Value>),
    Map(BTreeMap<Value, Value>),
    Text(Arc<dyn ToText>),
    Error(Arc<dyn std::error::Error + Send + Sync>),
    /// Something from the template engine we have no representation
    /// for; carries a type description.
    Opaque(KString),
}

/// `0001-01-01T00:00:00Z`, the instant that counts as "no time".
pub fn zero_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl Value {
    pub fn str(s: &str) -> Value {
        Value::String(KString::from_ref(s))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int64",
            Value::UInt(_) => "uint64",
            Value::Float(_) => "float64",
            Value::Float32(_) => "float32",
            Value::Complex(..) => "complex128",
            Value::String(_) => "string",
            Value::Bytes(_) => "[]byte",
            Value::Time(_) => "time",
            Value::Markup(m) => m.context().as_str(),
            Value::Seq(_) => "sequence",
            Value::Map(_) => "mapping",
            Value::Text(_) => "text",
            Value::Error(_) => "error",
            Value::Opaque(_) => "opaque",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(v) => Some(v),
            _ => None
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<Value, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None
        }
    }

    /// Integer view used for indexing and limits; floats don't count.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            _ => None
        }
    }

    /// Whether the value counts as given, for `default`. Booleans
    /// always do, even `false`.
    pub fn is_present(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(_) => true,
            Value::Int(i) => *i != 0,
            Value::UInt(u) => *u != 0,
            Value::Float(f) => *f != 0.,
            Value::Float32(f) => *f != 0.,
            Value::Complex(re, im) => *re != 0. || *im != 0.,
            Value::String(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::Markup(m) => !m.as_str().is_empty(),
            Value::Seq(v) => !v.is_empty(),
            Value::Map(m) => !m.is_empty(),
            Value::Time(t) => *t != zero_time(),
            Value::Text(_) | Value::Error(_) | Value::Opaque(_) => true,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Nil => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::UInt(_) => 3,
            Value::Float(_) => 4,
            Value::Float32(_) => 5,
            Value::Complex(..) => 6,
            Value::String(_) => 7,
            Value::Bytes(_) => 8,
            Value::Time(_) => 9,
            Value::Markup(_) => 10,
            Value::Seq(_) => 11,
            Value::Map(_) => 12,
            Value::Text(_) => 13,
            Value::Error(_) => 14,
            Value::Opaque(_) => 15,
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "{u}u"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Float32(x) => write!(f, "{x:?}f32"),
            Value::Complex(re, im) => write!(f, "({re}{im:+}i)"),
            Value::String(s) => write!(f, "{:?}", s.as_str()),
            Value::Bytes(b) => write!(f, "b{:?}", String::from_utf8_lossy(b)),
            Value::Time(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Markup(m) => write!(f, "{}({:?})", m.context().as_str(), m.as_str()),
            Value::Seq(v) => f.debug_list().entries(v.iter()).finish(),
            Value::Map(m) => f.debug_map().entries(m.iter()).finish(),
            Value::Text(t) => write!(f, "{t:?}"),
            Value::Error(e) => write!(f, "error({e})"),
            Value::Opaque(name) => write!(f, "<{name}>"),
        }
    }
}

// Total order, so that values can be mapping keys. Variants sort by
// kind first; values of different kinds are never equal (1 and 1u
// are different keys).
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Nil, Value::Nil) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::UInt(a), Value::UInt(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Float32(a), Value::Float32(b)) => a.total_cmp(b),
            (Value::Complex(ar, ai), Value::Complex(br, bi)) =>
                ar.total_cmp(br).then_with(|| ai.total_cmp(bi)),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Time(a), Value::Time(b)) => a.cmp(b),
            (Value::Markup(a), Value::Markup(b)) => a.cmp(b),
            (Value::Seq(a), Value::Seq(b)) => a.cmp(b),
            (Value::Map(a), Value::Map(b)) => a.iter().cmp(b.iter()),
            (Value::Text(a), Value::Text(b)) => a.to_text().cmp(&b.to_text()),
            (Value::Error(a), Value::Error(b)) => a.to_string().cmp(&b.to_string()),
            (Value::Opaque(a), Value::Opaque(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}


// ------------------------------------------------------------------
// Conversions

macro_rules! from_signed {
    ($($t:ty)*) => { $(
        impl From<$t> for Value {
            fn from(v: $t) -> Self { Value::Int(v as i64) }
        }
    )* }
}
from_signed!(i8 i16 i32 i64 isize);

macro_rules! from_unsigned {
    ($($t:ty)*) => { $(
        impl From<$t> for Value {
            fn from(v: $t) -> Self { Value::UInt(v as u64) }
        }
    )* }
}
from_unsigned!(u8 u16 u32 u64 usize);

impl From<bool> for Value {
    fn from(v: bool) -> Self { Value::Bool(v) }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self { Value::Float(v) }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self { Value::Float32(v) }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self { Value::str(v) }
}

impl From<String> for Value {
    fn from(v: String) -> Self { Value::String(KString::from_string(v)) }
}

impl From<KString> for Value {
    fn from(v: KString) -> Self { Value::String(v) }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self { Value::Bytes(v) }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self { Value::Time(v) }
}

impl From<Markup> for Value {
    fn from(v: Markup) -> Self { Value::Markup(v) }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self { Value::Seq(v) }
}

impl From<BTreeMap<Value, Value>> for Value {
    fn from(v: BTreeMap<Value, Value>) -> Self { Value::Map(v) }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Nil)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value as J;
        match v {
            J::Null => Value::Nil,
            J::Bool(b) => Value::Bool(b),
            J::Number(n) =>
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                },
            J::String(s) => Value::from(s),
            J::Array(items) => Value::Seq(items.into_iter().map(Value::from).collect()),
            J::Object(entries) => Value::Map(
                entries.into_iter()
                    .map(|(k, v)| (Value::from(k), Value::from(v)))
                    .collect()),
        }
    }
}

impl Value {
    /// Build a `Value` from anything serde can serialize, via JSON.
    pub fn from_serialize<T: Serialize + ?Sized>(v: &T) -> serde_json::Result<Value> {
        Ok(serde_json::to_value(v)?.into())
    }
}

/// Build a `Value::Map` from string keys, for handler code.
#[macro_export]
macro_rules! value_map {
    { $($k:expr => $v:expr),* $(,)? } => {{
        let mut m = std::collections::BTreeMap::new();
        $( m.insert($crate::value::Value::from($k), $crate::value::Value::from($v)); )*
        $crate::value::Value::Map(m)
    }}
}


// ------------------------------------------------------------------
// JSON encoding

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Nil => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::UInt(u) => serializer.serialize_u64(*u),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Float32(x) => serializer.serialize_f32(*x),
            Value::Complex(..) =>
                Err(S::Error::custom("json: unsupported type: complex128")),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_str(&base64::encode(b)),
            Value::Time(t) => serializer.serialize_str(&t.to_rfc3339()),
            Value::Markup(m) => serializer.serialize_str(m.as_str()),
            Value::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Text(t) => serializer.serialize_str(&t.to_text()),
            Value::Error(e) => serializer.serialize_str(&e.to_string()),
            Value::Opaque(name) =>
                Err(S::Error::custom(format!("json: unsupported type: {name}"))),
        }
    }
}
