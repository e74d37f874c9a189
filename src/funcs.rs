//! The helper-function table templates can call into.
//!
//! `BASE_FUNCS` is built once on first use and never changes after;
//! a render gets its own derived table (`FuncTable::merged`) with the
//! builder's extensions on top, which is dropped with the render.
//! Names and arities are part of the template language surface; don't
//! rename entries.

pub mod accessors;
pub mod clock;
pub mod markup;
pub mod strings;

use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use kstring::KString;
use lazy_static::lazy_static;

use crate::eval::eval_value;
use crate::value::Value;

/// Failures of helpers that fail the whole render (everything else
/// is absorbed into a zero result by the helpers themselves).
#[derive(thiserror::Error, Debug)]
pub enum HelperError {
    #[error("wrong number of args for {name}: want {want} got {got}")]
    Arity { name: KString, want: usize, got: usize },
    #[error("function {0:?} not defined")]
    Undefined(KString),
    #[error("index out of range [{index}] with length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("cannot index sequence with {0}")]
    BadIndex(&'static str),
    #[error("regexp: {0}")]
    Regex(#[from] regex::Error),
}

pub type HelperFn = Arc<dyn Fn(&[Value]) -> Result<Value, HelperError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Variadic,
}

#[derive(Clone)]
pub struct Helper {
    arity: Arity,
    f: HelperFn,
}

impl Helper {
    pub fn new(
        arity: Arity,
        f: impl Fn(&[Value]) -> Result<Value, HelperError> + Send + Sync + 'static
    ) -> Self {
        Helper { arity, f: Arc::new(f) }
    }

    /// For helpers that can't fail.
    pub fn total(
        arity: Arity,
        f: impl Fn(&[Value]) -> Value + Send + Sync + 'static
    ) -> Self {
        Helper::new(arity, move |args| Ok(f(args)))
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, HelperError> {
        if let Arity::Exact(want) = self.arity {
            if args.len() != want {
                return Err(HelperError::Arity {
                    name: KString::from_ref(name),
                    want,
                    got: args.len()
                })
            }
        }
        (self.f)(args)
    }
}

impl Debug for Helper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Helper({:?})", self.arity)
    }
}

#[derive(Clone, Default, Debug)]
pub struct FuncTable {
    entries: BTreeMap<KString, Helper>,
}

impl FuncTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the entry for `name`.
    pub fn insert(&mut self, name: impl Into<KString>, helper: Helper) -> &mut Self {
        self.entries.insert(name.into(), helper);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Helper> {
        self.entries.get(name)
    }

    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, HelperError> {
        self.get(name)
            .ok_or_else(|| HelperError::Undefined(KString::from_ref(name)))?
            .call(name, args)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Helper)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A copy of `self` with the entries of `extensions` added;
    /// extensions win on equal names.
    pub fn merged(&self, extensions: &FuncTable) -> FuncTable {
        let mut entries = self.entries.clone();
        for (name, helper) in &extensions.entries {
            entries.insert(name.clone(), helper.clone());
        }
        FuncTable { entries }
    }
}

fn base_table() -> FuncTable {
    use Arity::{Exact, Variadic};
    let mut t = FuncTable::new();
    t.insert("day", Helper::total(Exact(0), clock::day))
        .insert("date", Helper::total(Exact(0), clock::date))
        .insert("datetime", Helper::total(Exact(0), clock::datetime))
        .insert("default", Helper::total(Variadic, accessors::default))
        .insert("dict", Helper::total(Variadic, accessors::dict))
        .insert("eval", Helper::total(Exact(1), |args| eval_value(&args[0])))
        .insert("findRE", Helper::new(Variadic, strings::find_re))
        .insert("in", Helper::total(Variadic, accessors::contains))
        .insert("index", Helper::new(Variadic, accessors::index))
        .insert("len", Helper::total(Exact(1), |args| accessors::len(&args[0])))
        .insert("lower", Helper::total(Variadic, strings::lower))
        .insert("map", Helper::total(Variadic, accessors::map))
        .insert("month", Helper::total(Exact(0), clock::month))
        .insert("replace", Helper::total(Variadic, strings::replace))
        .insert("replaceRE", Helper::new(Variadic, strings::replace_re))
        .insert("safeCSS", Helper::total(Exact(1), markup::safe_css))
        .insert("safeHTML", Helper::total(Exact(1), markup::safe_html))
        .insert("safeHTMLAttr", Helper::total(Exact(1), markup::safe_html_attr))
        .insert("safeJS", Helper::total(Exact(1), markup::safe_js))
        .insert("safeURL", Helper::total(Exact(1), markup::safe_url))
        .insert("slice", Helper::total(Variadic, accessors::slice))
        .insert("split", Helper::total(Variadic, strings::split))
        .insert("time", Helper::total(Exact(0), clock::time))
        .insert("trim", Helper::total(Variadic, strings::trim))
        .insert("trimLeft", Helper::total(Variadic, strings::trim_left))
        .insert("trimRight", Helper::total(Variadic, strings::trim_right))
        .insert("upper", Helper::total(Variadic, strings::upper))
        .insert("year", Helper::total(Exact(0), clock::year));
    t
}

lazy_static! {
    pub static ref BASE_FUNCS: FuncTable = base_table();
}
