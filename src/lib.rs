//! Template rendering for web handlers: a library of helper functions
//! for template expressions (including a small constant expression
//! evaluator), and the pipeline that turns templates plus data into
//! an HTML or JSON response.

pub mod warn;
pub mod boxed_error;
pub mod util;
pub mod config;
pub mod value;
pub mod coerce;
pub mod eval;
pub mod funcs;
pub mod engine;
pub mod source;
pub mod webutils;
pub mod render;

pub use render::{html, json, ParseFailureMode, RenderError, RenderErrorKind, Renderer, Template};
pub use source::TemplateSource;
pub use value::{Markup, MarkupContext, ToText, Value};
