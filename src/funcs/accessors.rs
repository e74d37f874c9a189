//! `default`, `dict`, `map`, `in`, `index`, `len`, `slice`.
//!
//! Wrong argument counts or shapes give `Value::Nil` (or false/0);
//! only an out-of-range sequence index fails the render.

use std::collections::BTreeMap;

use kstring::KString;

use crate::coerce::canonical;
use crate::funcs::HelperError;
use crate::value::Value;

/// `default(d, x)`: `x` if it is present, else `d`.
pub fn default(args: &[Value]) -> Value {
    match args {
        [] => Value::str(""),
        [x] => x.clone(),
        [d, x, ..] => if x.is_present() { x.clone() } else { d.clone() }
    }
}

/// Feed pairs, sequences of pairs and mappings to `insert`, in
/// argument order. Returns `None` on a dangling key.
fn for_each_pair(args: &[Value], mut insert: impl FnMut(&Value, &Value)) -> Option<()> {
    let mut rest = args;
    loop {
        match rest {
            [] => return Some(()),
            [Value::Seq(items), tail @ ..] => {
                if items.len() % 2 != 0 {
                    return None
                }
                for pair in items.chunks(2) {
                    insert(&pair[0], &pair[1]);
                }
                rest = tail;
            }
            [Value::Map(entries), tail @ ..] => {
                for (k, v) in entries {
                    insert(k, v);
                }
                rest = tail;
            }
            [k, v, tail @ ..] => {
                insert(k, v);
                rest = tail;
            }
            [_] => return None
        }
    }
}

pub fn dict(args: &[Value]) -> Value {
    let mut out = BTreeMap::new();
    match for_each_pair(args, |k, v| { out.insert(k.clone(), v.clone()); }) {
        Some(()) => Value::Map(out),
        None => Value::Nil,
    }
}

/// Like `dict` but keys are coerced to strings; keys without a
/// string form are dropped. When two keys have the same string form
/// the later pair wins.
pub fn map(args: &[Value]) -> Value {
    if args.is_empty() {
        return Value::Nil
    }
    let mut out = BTreeMap::new();
    let complete = for_each_pair(args, |k, v| {
        if let Some(k) = canonical(k) {
            out.insert(Value::String(KString::from_ref(&k)), v.clone());
        }
    });
    match complete {
        Some(()) => Value::Map(out),
        None => Value::Nil,
    }
}

/// `in(haystack, needle)`: substring test on the string forms. For a
/// sequence only the *first* element is tested; that's how it has
/// always behaved and templates may rely on it.
pub fn contains(args: &[Value]) -> Value {
    let [haystack, needle] = args else {
        return Value::Bool(false)
    };
    let found = match haystack {
        Value::Nil => false,
        Value::Seq(items) => {
            match (items.first().and_then(canonical), canonical(needle)) {
                (Some(item), Some(needle)) => item.contains(&*needle),
                _ => false
            }
        }
        _ => match (canonical(haystack), canonical(needle)) {
            (Some(h), Some(n)) => h.contains(&*n),
            _ => false
        }
    };
    Value::Bool(found)
}

/// `index(container, key)`. Missing mapping keys give `Nil`, a bad
/// sequence index fails.
pub fn index(args: &[Value]) -> Result<Value, HelperError> {
    let [container, key, ..] = args else {
        return Ok(Value::Nil)
    };
    match container {
        Value::Seq(items) => {
            let i = match key {
                Value::Int(_) | Value::UInt(_) => key.as_i64().unwrap_or(i64::MAX),
                _ => return Err(HelperError::BadIndex(key.type_name()))
            };
            usize::try_from(i).ok()
                .and_then(|u| items.get(u))
                .cloned()
                .ok_or(HelperError::IndexOutOfRange { index: i, len: items.len() })
        }
        Value::Map(entries) => Ok(entries.get(key).cloned().unwrap_or(Value::Nil)),
        _ => Ok(Value::Nil)
    }
}

/// Element count for containers, character count of the string
/// form otherwise (byte strings are decoded first).
pub fn len(v: &Value) -> Value {
    let n = match v {
        Value::Seq(items) => items.len(),
        Value::Map(entries) => entries.len(),
        _ => canonical(v).map(|s| s.chars().count()).unwrap_or(0)
    };
    Value::Int(n as i64)
}

pub fn slice(args: &[Value]) -> Value {
    Value::Seq(args.to_vec())
}
