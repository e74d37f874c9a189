//! Compose template sources under the helper table, execute, and turn
//! the outcome into a response.
//!
//! Two entry forms: `html` (layout and extension names resolved under
//! the configured templates root; any bad source fails the render)
//! and `Template` (explicit sources; bad ones are skipped). Either way
//! the body is produced completely before the response is built, so
//! a failure never leaves half a page behind.

use kstring::KString;
use rouille::Response;
use serde::Serialize;

use crate::config::RenderConfig;
use crate::def_boxed_thiserror;
use crate::engine::Engine;
use crate::funcs::{FuncTable, Helper, BASE_FUNCS};
use crate::source::{SourceError, TemplateSource};
use crate::value::Value;
use crate::warn;
use crate::webutils::{errorresponse, htmlresponse, jsonresponse};

def_boxed_thiserror!(RenderError, pub enum RenderErrorKind {
    #[error("{0}")]
    Source(#[from] SourceError),
    #[error("parsing template \"{name}\": {error}")]
    Parse { name: KString, error: minijinja::Error },
    #[error("no template named \"{0}\" to execute")]
    MissingLayout(KString),
    #[error("executing template \"{name}\": {error}")]
    Execution { name: KString, error: minijinja::Error },
    #[error("encoding: {0}")]
    Encoding(#[from] serde_json::Error),
});

/// What to do when a source can't be read or parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFailureMode {
    /// The render fails.
    Fatal,
    /// The source is left out (and logged); later sources and the
    /// layout are used as far as they go.
    Skip,
}

/// Render settings: extension helpers on top of the base table, and
/// where templates are looked up for `html`.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    extensions: FuncTable,
    config: RenderConfig,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a helper; replaces a base helper of the same name.
    pub fn with_function(mut self, name: &str, helper: Helper) -> Self {
        self.extensions.insert(KString::from_ref(name), helper);
        self
    }

    pub fn with_functions(mut self, table: &FuncTable) -> Self {
        self.extensions = self.extensions.merged(table);
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// The table a render sees: base plus extensions.
    pub fn funcs(&self) -> FuncTable {
        BASE_FUNCS.merged(&self.extensions)
    }

    /// Read and parse `sources` in order into one template set. Later
    /// sources may refer to templates of earlier ones; a name given
    /// twice means the later text.
    pub fn compose(
        &self,
        sources: impl IntoIterator<Item = TemplateSource>,
        data: &Value,
        mode: ParseFailureMode,
    ) -> Result<Engine, RenderError> {
        let mut engine = Engine::new(&self.funcs());
        engine.enable_partial(data);
        for source in sources {
            let added = source.read()
                .map_err(RenderError::from)
                .and_then(|(name, text)| {
                    engine.add_template(&name, text)
                        .map_err(|error| RenderErrorKind::Parse { name, error }.into())
                });
            if let Err(e) = added {
                match mode {
                    ParseFailureMode::Fatal => return Err(e),
                    ParseFailureMode::Skip => warn!("skipping template source: {e}"),
                }
            }
        }
        Ok(engine)
    }

    /// Compose `sources` and execute template `layout` with `data`.
    pub fn render_to_string(
        &self,
        sources: impl IntoIterator<Item = TemplateSource>,
        layout: &str,
        data: &Value,
        mode: ParseFailureMode,
    ) -> Result<String, RenderError> {
        let engine = self.compose(sources, data, mode)?;
        if !engine.has_template(layout) {
            return Err(RenderErrorKind::MissingLayout(KString::from_ref(layout)).into())
        }
        engine.render(layout, data).map_err(|error| RenderErrorKind::Execution {
            name: KString::from_ref(layout),
            error,
        }.into())
    }

    /// The sources of a single-call render: `layout`, then
    /// `extensions`, each `<templates root>/<name><suffix>`.
    pub fn layout_sources(&self, layout: &str, extensions: &[&str]) -> Vec<TemplateSource> {
        std::iter::once(layout)
            .chain(extensions.iter().copied())
            .map(|name| TemplateSource::named_file(name, self.config.template_path(name)))
            .collect()
    }

    /// Render `layout` (plus `extensions`) from the templates root as
    /// HTML with `status`; a 500 with the error description if any
    /// source is missing or broken, or execution fails.
    pub fn html(&self, status: u16, data: &Value, layout: &str, extensions: &[&str]) -> Response {
        let sources = self.layout_sources(layout, extensions);
        match self.render_to_string(sources, layout, data, ParseFailureMode::Fatal) {
            Ok(body) => htmlresponse(status, body),
            Err(e) => errorresponse(&format!("rendering {layout:?}"), &e),
        }
    }

    /// `data` as JSON with `status`, or a 500 if it can't be encoded.
    pub fn json<T: Serialize + ?Sized>(&self, status: u16, data: &T) -> Response {
        match serde_json::to_string(data) {
            Ok(body) => jsonresponse(status, body),
            Err(e) => errorresponse("json encoding", &RenderError::from(e)),
        }
    }
}

/// `Renderer::default().html(..)`
pub fn html(status: u16, data: &Value, layout: &str, extensions: &[&str]) -> Response {
    Renderer::default().html(status, data, layout, extensions)
}

/// `Renderer::default().json(..)`
pub fn json<T: Serialize + ?Sized>(status: u16, data: &T) -> Response {
    Renderer::default().json(status, data)
}

/// A render from explicit sources. Sources that fail to read or parse
/// are skipped; the layout has to come out defined.
#[derive(Debug)]
pub struct Template {
    pub sources: Vec<TemplateSource>,
    pub layout: KString,
    pub data: Value,
}

impl Template {
    pub fn new(layout: &str) -> Self {
        Template { sources: Vec::new(), layout: KString::from_ref(layout), data: Value::Nil }
    }

    pub fn source(mut self, source: TemplateSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.data = data.into();
        self
    }

    pub fn render_with(self, renderer: &Renderer) -> Result<String, RenderError> {
        let Template { sources, layout, data } = self;
        renderer.render_to_string(sources, &layout, &data, ParseFailureMode::Skip)
    }

    pub fn html_with(self, renderer: &Renderer, status: u16) -> Response {
        let layout = self.layout.clone();
        match self.render_with(renderer) {
            Ok(body) => htmlresponse(status, body),
            Err(e) => errorresponse(&format!("rendering {layout:?}"), &e),
        }
    }

    pub fn html(self, status: u16) -> Response {
        self.html_with(&Renderer::default(), status)
    }
}


#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::funcs::Arity;
    use crate::value_map;
    use crate::webutils::response_header;
    use crate::webutils::tests::body_string;
    use super::*;

    /// A fresh directory with `files` written into it.
    fn fixture_dir(tag: &str, files: &[(&str, &str)]) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("htmlrender-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        for (name, text) in files {
            std::fs::write(dir.join(name), text).unwrap();
        }
        dir
    }

    fn renderer_in(dir: PathBuf) -> Renderer {
        Renderer::new().with_config(RenderConfig::default().with_templates_root(dir))
    }

    #[test]
    fn t_html_from_files() {
        let dir = fixture_dir("files", &[
            ("page.html", "{% include 'header' %}<p>{{ upper(name) }}</p>"),
            ("header.html", "<h1>{{ title }}</h1>"),
        ]);
        let r = renderer_in(dir).html(
            201, &value_map!{"name" => "ann", "title" => "T&C"}, "page", &["header"]);
        assert_eq!(r.status_code, 201);
        assert_eq!(response_header(&r, "Content-Type"), Some("text/html"));
        assert_eq!(body_string(r), "<h1>T&amp;C</h1><p>ANN</p>");
    }

    #[test]
    fn t_html_failures() {
        let dir = fixture_dir("failures", &[
            ("ok.html", "{{ index(s, 10) }}"),
            ("broken.html", "{% if %}"),
            ("fine.html", "fine"),
        ]);
        let renderer = renderer_in(dir);
        let data = value_map!{"s" => vec![Value::Int(1), Value::Int(2), Value::Int(3)]};

        let r = renderer.html(200, &data, "ok", &[]);
        assert_eq!(r.status_code, 500);
        assert_eq!(response_header(&r, "content-type"), Some("text/plain; charset=utf-8"));
        let body = body_string(r);
        assert!(body.contains("index out of range [10] with length 3"));
        assert!(body.contains("executing template \"ok\""), "{body}");
        assert!(!body.contains("Inline"));

        // a broken or missing extension fails the single-call form
        assert_eq!(renderer.html(200, &data, "fine", &["broken"]).status_code, 500);
        let r = renderer.html(200, &data, "fine", &["missing"]);
        assert_eq!(r.status_code, 500);
        assert!(body_string(r).contains("missing"));
        assert_eq!(renderer.html(200, &data, "fine", &[]).status_code, 200);
    }

    #[test]
    fn t_template_skips_bad_sources() {
        let dir = fixture_dir("skip", &[("broken.html", "{% for %}")]);
        let r = Template::new("main")
            .source(TemplateSource::file(dir.join("broken.html")).unwrap())
            .source(TemplateSource::file(dir.join("absent.html")).unwrap())
            .source(TemplateSource::embedded("main", "hello {{ who }}"))
            .data(value_map!{"who" => "you"})
            .html(200);
        assert_eq!(r.status_code, 200);
        assert_eq!(body_string(r), "hello you");

        // but the layout has to exist
        let r = Template::new("main")
            .source(TemplateSource::embedded("main", "{% if %}"))
            .html(200);
        assert_eq!(r.status_code, 500);
    }

    #[test]
    fn t_last_write_wins() {
        let out = Template::new("main")
            .source(TemplateSource::embedded("part", "first part"))
            .source(TemplateSource::embedded("main", "first main {% include 'part' %}"))
            .source(TemplateSource::embedded("main", "second main {% include 'part' %}"))
            .source(TemplateSource::embedded("part", "second part"))
            .render_with(&Renderer::new())
            .unwrap();
        assert_eq!(out, "second main second part");
    }

    #[test]
    fn t_extension_helpers() {
        let renderer = Renderer::new()
            .with_function("upper", Helper::total(Arity::Variadic, |_| Value::str("shadowed")))
            .with_function("answer", Helper::total(Arity::Exact(0), |_| Value::Int(42)));
        let out = Template::new("t")
            .source(TemplateSource::embedded("t", "{{ upper('x') }} {{ answer() }} {{ lower('Y') }}"))
            .render_with(&renderer)
            .unwrap();
        assert_eq!(out, "shadowed 42 y");
        // names need not be static
        let name = format!("{}{}", "gre", "et");
        let out = Template::new("t")
            .source(TemplateSource::embedded("t", "{{ greet() }}"))
            .render_with(&Renderer::new()
                         .with_function(&name, Helper::total(Arity::Exact(0), |_| Value::str("hi"))))
            .unwrap();
        assert_eq!(out, "hi");
        // the base table is unaffected for other renderers
        let out = Template::new("t")
            .source(TemplateSource::embedded("t", "{{ upper('x') }}"))
            .render_with(&Renderer::new())
            .unwrap();
        assert_eq!(out, "X");
    }

    #[test]
    fn t_partial_and_reader_sources() {
        let out = Template::new("page")
            .source(TemplateSource::reader("item", std::io::Cursor::new(b"<li>{{ x }}</li>".to_vec())))
            .source(TemplateSource::embedded(
                "page", "<ul>{% for x in xs %}{{ partial('item', {'x': x}) }}{% endfor %}</ul>"))
            .data(value_map!{"xs" => vec![Value::str("a"), Value::str("<b>")]})
            .render_with(&Renderer::new())
            .unwrap();
        assert_eq!(out, "<ul><li>a</li><li>&lt;b&gt;</li></ul>");
    }

    #[test]
    fn t_json() {
        let r = json(202, &value_map!{"a" => 1i32, "b" => vec![Value::Bool(true), Value::Nil]});
        assert_eq!(r.status_code, 202);
        assert_eq!(response_header(&r, "Content-Type"), Some("application/json"));
        assert_eq!(body_string(r), r#"{"a":1,"b":[true,null]}"#);

        let r = json(200, &Value::Complex(1., 1.));
        assert_eq!(r.status_code, 500);
        assert!(body_string(r).contains("unsupported type: complex128"));
    }
}
