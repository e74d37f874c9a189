//! Bridge to minijinja: our `Value` in and out of the engine's value
//! type, helper registration, and the output formatter that makes
//! trusted markup bypass HTML escaping.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kstring::KString;
use minijinja::value::{Object, ObjectRepr, Rest, ValueKind};
use minijinja::{AutoEscape, Environment, Error, ErrorKind, Output, State};

pub use minijinja::Value as MjValue;

use crate::coerce::{float_to_string, time_to_string};
use crate::funcs::FuncTable;
use crate::value::{Markup, MarkupContext, Value};

/// How deep `partial` calls may nest within one render.
pub const MAX_PARTIAL_DEPTH: usize = 16;

#[derive(Debug)]
struct TimeObject(DateTime<Utc>);

impl Object for TimeObject {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&time_to_string(&self.0))
    }
}

#[derive(Debug)]
struct ComplexObject {
    re: f64,
    im: f64,
}

impl Object for ComplexObject {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let im = float_to_string(self.im);
        let sign = if im.starts_with(&['-', '+'][..]) { "" } else { "+" };
        write!(f, "({}{sign}{im}i)", float_to_string(self.re))
    }
}

pub fn to_engine(v: &Value) -> MjValue {
    match v {
        Value::Nil => MjValue::from(()),
        Value::Bool(b) => MjValue::from(*b),
        Value::Int(i) => MjValue::from(*i),
        Value::UInt(u) => MjValue::from(*u),
        Value::Float(x) => MjValue::from(*x),
        // via the shortest f32 text, so 3.14f32 stays 3.14
        Value::Float32(x) => MjValue::from(x.to_string().parse::<f64>().unwrap_or(*x as f64)),
        Value::Complex(re, im) => MjValue::from_object(ComplexObject { re: *re, im: *im }),
        Value::String(s) => MjValue::from(s.as_str()),
        Value::Bytes(b) => MjValue::from_bytes(b.clone()),
        Value::Time(t) => MjValue::from_object(TimeObject(*t)),
        Value::Markup(m) => MjValue::from_safe_string(m.as_str().to_owned()),
        Value::Seq(items) => MjValue::from(items.iter().map(to_engine).collect::<Vec<_>>()),
        Value::Map(entries) =>
            entries.iter().map(|(k, v)| (to_engine(k), to_engine(v))).collect(),
        Value::Text(t) => MjValue::from(t.to_text()),
        Value::Error(e) => MjValue::from(e.to_string()),
        Value::Opaque(_) => MjValue::from(()),
    }
}

fn number_from_engine(v: &MjValue) -> Value {
    if v.is_integer() {
        if let Ok(i) = i64::try_from(v.clone()) {
            return Value::Int(i)
        }
        if let Ok(u) = u64::try_from(v.clone()) {
            return Value::UInt(u)
        }
    }
    match f64::try_from(v.clone()) {
        Ok(x) => Value::Float(x),
        Err(_) => Value::Opaque(KString::from_static("number")),
    }
}

/// Convert an engine value back.
///
/// The engine has a single "safe" flag for strings, so markup of any
/// context crosses into it as a safe string and comes back tagged
/// `MarkupContext::Html`: `default(safeCSS(x), y)` yields HTML markup
/// with the text of `x`. The text is kept and stays unescaped in
/// output; only the tag is lost.
pub fn from_engine(v: &MjValue) -> Value {
    match v.kind() {
        ValueKind::Undefined | ValueKind::None => Value::Nil,
        ValueKind::Bool => Value::Bool(v.is_true()),
        ValueKind::Number => number_from_engine(v),
        ValueKind::String => {
            let s = v.as_str().unwrap_or("");
            if v.is_safe() {
                Value::Markup(Markup::new(MarkupContext::Html, KString::from_ref(s)))
            } else {
                Value::str(s)
            }
        }
        ValueKind::Bytes => Value::Bytes(v.as_bytes().map(<[u8]>::to_vec).unwrap_or_default()),
        ValueKind::Seq | ValueKind::Iterable => match v.try_iter() {
            Ok(items) => Value::Seq(items.map(|item| from_engine(&item)).collect()),
            Err(_) => Value::Opaque(KString::from_static("iterable")),
        },
        ValueKind::Map => match v.try_iter() {
            Ok(keys) => {
                let mut entries = BTreeMap::new();
                for k in keys {
                    let item = v.get_item(&k).unwrap_or_default();
                    entries.insert(from_engine(&k), from_engine(&item));
                }
                Value::Map(entries)
            }
            Err(_) => Value::Opaque(KString::from_static("map")),
        },
        _ => {
            if let Some(t) = v.downcast_object_ref::<TimeObject>() {
                Value::Time(t.0)
            } else if let Some(c) = v.downcast_object_ref::<ComplexObject>() {
                Value::Complex(c.re, c.im)
            } else {
                Value::Opaque(KString::from_string(format!("{:?}", v.kind())))
            }
        }
    }
}

fn write_failure(_: fmt::Error) -> Error {
    Error::new(ErrorKind::WriteFailure, "could not write output")
}

/// Nil renders as nothing, floats in their canonical text form,
/// everything else as the engine does it (which leaves safe strings
/// unescaped).
fn format_value(out: &mut Output<'_>, state: &State<'_, '_>, value: &MjValue)
                -> Result<(), Error>
{
    match value.kind() {
        ValueKind::Undefined | ValueKind::None => Ok(()),
        ValueKind::Number if !value.is_integer() => {
            let x = f64::try_from(value.clone())?;
            out.write_str(&float_to_string(x)).map_err(write_failure)
        }
        _ => minijinja::escape_formatter(out, state, value),
    }
}

thread_local! {
    static PARTIAL_DEPTH: Cell<usize> = Cell::new(0);
}

struct DepthGuard;

impl DepthGuard {
    fn enter() -> Result<DepthGuard, Error> {
        PARTIAL_DEPTH.with(|d| {
            if d.get() >= MAX_PARTIAL_DEPTH {
                Err(Error::new(ErrorKind::InvalidOperation,
                               format!("partial: nesting deeper than {MAX_PARTIAL_DEPTH}")))
            } else {
                d.set(d.get() + 1);
                Ok(DepthGuard)
            }
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        PARTIAL_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

/// A template set for one render, with a helper table registered.
pub struct Engine {
    env: Environment<'static>,
}

impl Engine {
    pub fn new(funcs: &FuncTable) -> Engine {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.set_formatter(format_value);
        for (name, helper) in funcs.iter() {
            let helper = helper.clone();
            let fname = KString::from_ref(name);
            env.add_function(name.to_owned(), move |args: Rest<MjValue>| -> Result<MjValue, Error> {
                let args: Vec<Value> = args.iter().map(from_engine).collect();
                helper.call(&fname, &args)
                    .map(|v| to_engine(&v))
                    .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string())
                             .with_source(e))
            });
        }
        Engine { env }
    }

    /// Parse `source` as template `name`, replacing an earlier one of
    /// the same name. On error the set is left as it was.
    pub fn add_template(&mut self, name: &str, source: String) -> Result<(), Error> {
        self.env.add_template_owned(name.to_owned(), source)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.env.get_template(name).is_ok()
    }

    /// Register `partial(name[, data])`, which renders another
    /// template of this set (with `data`, or the render's own data)
    /// and gives the result as trusted HTML.
    pub fn enable_partial(&mut self, data: &Value) {
        let root = to_engine(data);
        self.env.add_function(
            "partial",
            move |state: &State, name: String, data: Option<MjValue>| -> Result<MjValue, Error> {
                let _guard = DepthGuard::enter()?;
                let tmpl = state.env().get_template(&name)?;
                let out = tmpl.render(data.unwrap_or_else(|| root.clone()))?;
                Ok(MjValue::from_safe_string(out))
            });
    }

    /// Execute template `name` against `data`, output fully buffered.
    pub fn render(&self, name: &str, data: &Value) -> Result<String, Error> {
        self.env.get_template(name)?.render(to_engine(data))
    }
}


#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use crate::funcs::BASE_FUNCS;
    use crate::value_map;
    use super::*;

    fn render(src: &str, data: Value) -> Result<String, Error> {
        let mut e = Engine::new(&BASE_FUNCS);
        e.add_template("t", src.into())?;
        e.render("t", &data)
    }

    #[test]
    fn t_roundtrip() {
        let t = Utc.with_ymd_and_hms(2023, 1, 15, 1, 2, 3).unwrap();
        for v in [
            Value::Nil,
            Value::Bool(true),
            Value::Int(-3),
            Value::UInt(u64::MAX),
            Value::Float(2.5),
            Value::str("x"),
            Value::Bytes(b"ab".to_vec()),
            Value::Time(t),
            Value::Complex(1., -2.),
            Markup::new(MarkupContext::Html, "<b>").into(),
            Value::Seq(vec![Value::Int(1), Value::str("a")]),
            value_map!{"a" => 1i32, 2i32 => "b"},
        ] {
            assert_eq!(from_engine(&to_engine(&v)), v);
        }
        assert_eq!(from_engine(&to_engine(&Value::Float32(3.14))), Value::Float(3.14));
        // markup keeps its text but not its context
        let css: Value = Markup::new(MarkupContext::Css, "a{}").into();
        assert_eq!(from_engine(&to_engine(&css)),
                   Value::Markup(Markup::new(MarkupContext::Html, "a{}")));
    }

    #[test]
    fn t_escaping() {
        let data = value_map!{"x" => "<b>&</b>"};
        assert_eq!(render("{{ x }}", data.clone()).unwrap(), "&lt;b&gt;&amp;&lt;&#x2f;b&gt;");
        assert_eq!(render("{{ safeHTML(x) }}", data.clone()).unwrap(), "<b>&</b>");
        assert_eq!(render("{{ safeJS(x) }}", data.clone()).unwrap(), "<b>&</b>");
        assert_eq!(render("{{ safeURL(x) }}", data).unwrap(), "<b>&</b>");
    }

    #[test]
    fn t_formatting() {
        assert_eq!(render("{{ eval('4/2.0') }}|{{ eval('1/4.0') }}", Value::Nil).unwrap(),
                   "2|0.25");
        assert_eq!(render("[{{ eval('nope') }}][{{ missing }}]", Value::Nil).unwrap(), "[][]");
        assert_eq!(render("{{ eval('1+2i') }}", Value::Nil).unwrap(), "(1+2i)");
        assert_eq!(render("{{ eval('1-2i') }}", Value::Nil).unwrap(), "(1-2i)");
    }

    #[test]
    fn t_helpers() {
        assert_eq!(render("{{ upper('a', 1) }}", Value::Nil).unwrap(), "A 1");
        assert_eq!(render("{{ eval('2+3*4') }}", Value::Nil).unwrap(), "14");
        assert_eq!(render("{{ len(dict('a', 1, 'b', 2)) }}", Value::Nil).unwrap(), "2");
        assert_eq!(render("{{ index(m, 'k') }}", value_map!{"m" => value_map!{"k" => "v"}})
                   .unwrap(), "v");
        assert_eq!(render("{% for w in split('a b', ' ') %}<{{ w }}>{% endfor %}", Value::Nil)
                   .unwrap(), "<a><b>");
    }

    #[test]
    fn t_execution_failures() {
        let data = value_map!{"s" => vec![Value::Int(1), Value::Int(2), Value::Int(3)]};
        let e = render("{{ index(s, 10) }}", data).unwrap_err();
        assert!(e.to_string().contains("index out of range [10] with length 3"), "{e}");
        let e = render("{{ len() }}", Value::Nil).unwrap_err();
        assert!(e.to_string().contains("wrong number of args for len"), "{e}");
        assert!(render("{{ replaceRE('(', 'x', 'y') }}", Value::Nil).is_err());
        assert!(render("{{ nosuchfunc() }}", Value::Nil).is_err());
    }

    #[test]
    fn t_partial() {
        let mut e = Engine::new(&BASE_FUNCS);
        e.enable_partial(&value_map!{"who" => "world"});
        e.add_template("greet", "<i>{{ who }}</i>".into()).unwrap();
        e.add_template("page", "{{ partial('greet') }}/{{ partial('greet', {'who': 'x'}) }}"
                       .into()).unwrap();
        e.add_template("loop", "{{ partial('loop') }}".into()).unwrap();
        assert_eq!(e.render("page", &value_map!{"who" => "world"}).unwrap(),
                   "<i>world</i>/<i>x</i>");
        assert!(e.render("loop", &Value::Nil).is_err());
        assert!(e.has_template("greet"));
        assert!(!e.has_template("nope"));
    }
}
