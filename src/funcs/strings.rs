//! String helpers, all working on the canonical string forms.

use itertools::Itertools;
use regex::Regex;

use crate::coerce::canonical;
use crate::funcs::HelperError;
use crate::value::Value;
use crate::warn;

/// The string forms of all `args`, or `None` if any has none.
fn all_canonical(args: &[Value]) -> Option<Vec<String>> {
    args.iter().map(|v| canonical(v).map(|s| s.into_owned())).collect()
}

fn strings(items: impl IntoIterator<Item = impl Into<String>>) -> Value {
    Value::Seq(items.into_iter().map(|s| Value::from(s.into())).collect())
}

/// Fold each argument's case, join with a space. Arguments without
/// a string form are left out.
fn fold_join(args: &[Value], fold: fn(&str) -> String) -> Value {
    args.iter()
        .filter_map(|v| canonical(v))
        .map(|s| fold(&s))
        .join(" ")
        .into()
}

pub fn upper(args: &[Value]) -> Value {
    fold_join(args, str::to_uppercase)
}

pub fn lower(args: &[Value]) -> Value {
    fold_join(args, str::to_lowercase)
}

#[derive(Clone, Copy)]
enum TrimSide {
    Both,
    Left,
    Right,
}

fn trim_with(args: &[Value], side: TrimSide) -> Value {
    let (s, cutset) = match args {
        [] => return Value::str(""),
        [s] => match canonical(s) {
            Some(s) => (s, " ".into()),
            None => return Value::str(""),
        },
        [s, cutset, ..] => match (canonical(s), canonical(cutset)) {
            (Some(s), Some(cutset)) => (s, cutset),
            _ => return Value::str(""),
        },
    };
    let cut = |c: char| cutset.contains(c);
    let trimmed = match side {
        TrimSide::Both => s.trim_matches(cut),
        TrimSide::Left => s.trim_start_matches(cut),
        TrimSide::Right => s.trim_end_matches(cut),
    };
    trimmed.into()
}

/// `trim(s)` strips spaces (only ' '), `trim(s, cutset)` any of the
/// characters in `cutset`.
pub fn trim(args: &[Value]) -> Value {
    trim_with(args, TrimSide::Both)
}

pub fn trim_left(args: &[Value]) -> Value {
    trim_with(args, TrimSide::Left)
}

pub fn trim_right(args: &[Value]) -> Value {
    trim_with(args, TrimSide::Right)
}

/// `replace(s, old, new)`, all occurrences.
pub fn replace(args: &[Value]) -> Value {
    match args {
        [_, _, _] => match all_canonical(args).as_deref() {
            Some([s, old, new]) => s.replace(old.as_str(), new).into(),
            _ => Value::str(""),
        },
        _ => Value::str(""),
    }
}

/// `replaceRE(pattern, replacement, s)`; `$1`, `${name}` in the
/// replacement refer to groups. A bad pattern fails the render.
pub fn replace_re(args: &[Value]) -> Result<Value, HelperError> {
    if args.len() != 3 {
        return Ok(Value::str(""))
    }
    match all_canonical(args).as_deref() {
        Some([pattern, replacement, s]) => {
            let re = Regex::new(pattern)?;
            Ok(re.replace_all(s, replacement.as_str()).into_owned().into())
        }
        _ => Ok(Value::str("")),
    }
}

/// `findRE(pattern, s[, limit])`: all non-overlapping matches, at
/// most `limit` of them if it is given and not negative.
pub fn find_re(args: &[Value]) -> Result<Value, HelperError> {
    let Some(strs) = all_canonical(args) else {
        return Ok(Value::Nil)
    };
    let (pattern, s, limit) = match strs.as_slice() {
        [pattern, s] => (pattern, s, None),
        [pattern, s, limit] => match limit.trim().parse::<i64>() {
            Ok(n) => (pattern, s, usize::try_from(n).ok()),
            Err(e) => {
                warn!("findRE: invalid limit {limit:?}: {e}");
                return Ok(Value::Nil)
            }
        },
        _ => return Ok(Value::Nil),
    };
    let re = Regex::new(pattern)?;
    let found = re.find_iter(s).map(|m| m.as_str());
    Ok(match limit {
        Some(n) => strings(found.take(n)),
        None => strings(found),
    })
}

/// `split(s, delimiter)`; an empty delimiter splits into characters.
pub fn split(args: &[Value]) -> Value {
    let [s, delimiter, ..] = args else {
        return Value::Nil
    };
    match (canonical(s), canonical(delimiter)) {
        (Some(s), Some(d)) =>
            if d.is_empty() {
                strings(s.chars().map(String::from))
            } else {
                strings(s.split(&*d))
            },
        _ => Value::Nil,
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn v(items: &[&str]) -> Vec<Value> {
        items.iter().map(|s| Value::str(s)).collect()
    }

    #[test]
    fn t_case() {
        assert_eq!(upper(&v(&["abc", "dé"])), Value::str("ABC DÉ"));
        assert_eq!(lower(&[Value::str("ABC"), Value::Int(1), Value::Bool(true)]),
                   Value::str("abc 1 true"));
        // no string form: skipped
        assert_eq!(upper(&[Value::Seq(vec![]), Value::str("x")]), Value::str("X"));
        assert_eq!(upper(&[]), Value::str(""));
    }

    #[test]
    fn t_trim() {
        assert_eq!(trim(&[]), Value::str(""));
        assert_eq!(trim(&v(&["  a b \t"])), Value::str("a b \t"));
        assert_eq!(trim(&v(&["xxaxyx", "xy"])), Value::str("a"));
        assert_eq!(trim_left(&v(&["xxaxyx", "xy"])), Value::str("axyx"));
        assert_eq!(trim_right(&v(&["xxaxyx", "xy"])), Value::str("xxa"));
        assert_eq!(trim_left(&v(&["  a  "])), Value::str("a  "));
        assert_eq!(trim_right(&v(&["  a  "])), Value::str("  a"));
        assert_eq!(trim(&[Value::Int(1001), Value::Int(1)]), Value::str("00"));
    }

    #[test]
    fn t_replace() {
        assert_eq!(replace(&v(&["a-b-c", "-", "+"])), Value::str("a+b+c"));
        assert_eq!(replace(&v(&["aaa", "a", "aa"])), Value::str("aaaaaa"));
        assert_eq!(replace(&v(&["a", "b"])), Value::str(""));
    }

    #[test]
    fn t_replace_re() {
        assert_eq!(replace_re(&v(&["a(b)", "X${1}Y", "abc"])).unwrap(),
                   Value::str("XbYc"));
        assert_eq!(replace_re(&v(&["a(b)c", "X${1}Y", "abc"])).unwrap(),
                   Value::str("XbY"));
        // `$1Y` names a group "1Y", which doesn't exist
        assert_eq!(replace_re(&v(&["a(b)c", "X$1Y", "abc"])).unwrap(),
                   Value::str("X"));
        assert_eq!(replace_re(&v(&["o", "0", "foo boo"])).unwrap(),
                   Value::str("f00 b00"));
        assert!(replace_re(&v(&["(", "", "x"])).is_err());
        assert_eq!(replace_re(&v(&["a"])).unwrap(), Value::str(""));
    }

    #[test]
    fn t_find_re() {
        let all = find_re(&v(&["[0-9]+", "a1 b22 c333"])).unwrap();
        assert_eq!(all, Value::Seq(v(&["1", "22", "333"])));
        let two = find_re(&[Value::str("[0-9]+"), Value::str("a1 b22 c333"), Value::Int(2)])
            .unwrap();
        assert_eq!(two, Value::Seq(v(&["1", "22"])));
        assert_eq!(find_re(&v(&["[0-9]+", "a1 b22", "-1"])).unwrap(),
                   Value::Seq(v(&["1", "22"])));
        assert_eq!(find_re(&v(&["[0-9]+", "a1 b22", "0"])).unwrap(), Value::Seq(vec![]));
        assert_eq!(find_re(&v(&["[0-9]+", "a1", "many"])).unwrap(), Value::Nil);
        assert_eq!(find_re(&v(&["x"])).unwrap(), Value::Nil);
        assert!(find_re(&v(&["[", "x"])).is_err());
    }

    #[test]
    fn t_split() {
        assert_eq!(split(&v(&["a,b,,c", ","])), Value::Seq(v(&["a", "b", "", "c"])));
        assert_eq!(split(&v(&["abc", ""])), Value::Seq(v(&["a", "b", "c"])));
        assert_eq!(split(&v(&["", ","])), Value::Seq(v(&[""])));
        assert_eq!(split(&[Value::Int(1020), Value::Int(0)]),
                   Value::Seq(v(&["1", "2", ""])));
        assert_eq!(split(&v(&["abc"])), Value::Nil);
    }
}
