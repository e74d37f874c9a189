//! The one place that decides how a `Value` reads as text. Every
//! string helper goes through `to_canonical_string`.

use std::borrow::Cow;

use chrono::{DateTime, Timelike, Utc};

use crate::value::Value;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("cast error; value: {repr}, type: {type_name}")]
pub struct TypeMismatch {
    pub type_name: &'static str,
    pub repr: String,
}

/// Text form of a float, shortest that reads back to the same value,
/// never in exponent notation.
pub fn float_to_string(x: f64) -> String {
    if x.is_nan() {
        "NaN".into()
    } else if x.is_infinite() {
        if x > 0. { "+Inf".into() } else { "-Inf".into() }
    } else {
        // Display for floats is already shortest-roundtrip and
        // positional.
        x.to_string()
    }
}

pub fn float32_to_string(x: f32) -> String {
    if x.is_nan() || x.is_infinite() {
        float_to_string(x as f64)
    } else {
        x.to_string()
    }
}

/// `2006-01-02 15:04:05.999999999 +0000 UTC`, fraction only if non-zero.
pub fn time_to_string(t: &DateTime<Utc>) -> String {
    let mut out = t.format("%Y-%m-%d %H:%M:%S").to_string();
    let nanos = t.nanosecond() % 1_000_000_000;
    if nanos != 0 {
        out.push('.');
        out.push_str(format!("{nanos:09}").trim_end_matches('0'));
    }
    out.push_str(" +0000 UTC");
    out
}

pub fn to_canonical_string(v: &Value) -> Result<Cow<'_, str>, TypeMismatch> {
    Ok(match v {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        Value::Int(i) => Cow::Owned(i.to_string()),
        Value::UInt(u) => Cow::Owned(u.to_string()),
        Value::Float(x) => Cow::Owned(float_to_string(*x)),
        Value::Float32(x) => Cow::Owned(float32_to_string(*x)),
        Value::Bytes(b) => String::from_utf8_lossy(b),
        Value::Markup(m) => Cow::Borrowed(m.as_str()),
        Value::Nil => Cow::Borrowed(""),
        Value::Time(t) => Cow::Owned(time_to_string(t)),
        Value::Text(t) => Cow::Owned(t.to_text()),
        Value::Error(e) => Cow::Owned(e.to_string()),
        Value::Complex(..) | Value::Seq(_) | Value::Map(_) | Value::Opaque(_) =>
            return Err(TypeMismatch {
                type_name: v.type_name(),
                repr: format!("{v:?}"),
            }),
    })
}

/// For helpers: the text of `v`, or `None` where it has none.
pub fn canonical(v: &Value) -> Option<Cow<'_, str>> {
    to_canonical_string(v).ok()
}
