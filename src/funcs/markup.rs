//! `safeCSS`, `safeHTML`, `safeHTMLAttr`, `safeJS`, `safeURL`.
//!
//! These only *label* their argument as safe for a context, they
//! check nothing. The pipeline then writes the text out unescaped, so
//! passing anything user-controlled through them is an injection
//! vulnerability. Values without a string form become empty markup.

use kstring::KString;

use crate::coerce::canonical;
use crate::value::{Markup, MarkupContext, Value};

fn mark(args: &[Value], context: MarkupContext) -> Value {
    let text = args.first()
        .and_then(canonical)
        .map(|s| KString::from_ref(&s))
        .unwrap_or_default();
    Value::Markup(Markup::new(context, text))
}

pub fn safe_css(args: &[Value]) -> Value {
    mark(args, MarkupContext::Css)
}

pub fn safe_html(args: &[Value]) -> Value {
    mark(args, MarkupContext::Html)
}

pub fn safe_html_attr(args: &[Value]) -> Value {
    mark(args, MarkupContext::HtmlAttr)
}

pub fn safe_js(args: &[Value]) -> Value {
    mark(args, MarkupContext::Js)
}

pub fn safe_url(args: &[Value]) -> Value {
    mark(args, MarkupContext::Url)
}
