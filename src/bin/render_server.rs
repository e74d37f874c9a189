use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, anyhow, Context};
use clap::Parser as ClapParser;
use rouille::{Request, Response, Server};

use htmlrender::config::RenderConfig;
use htmlrender::render::Renderer;
use htmlrender::value::Value;
use htmlrender::warn;

#[derive(clap::Parser, Debug)]
/// Serve the templates of a directory: `/<name>` renders template
/// `<name>` as HTML, `/<name>.json` gives the data as JSON, `/` is
/// `/index`.
struct Args {
    /// Address to listen on
    #[clap(long, default_value = "127.0.0.1:3000")]
    listen: String,

    /// Templates directory (default: $RENDER_TEMPLATES_ROOT or
    /// "templates")
    #[clap(long)]
    templates: Option<PathBuf>,

    /// Template file suffix (default: $RENDER_TEMPLATE_SUFFIX or
    /// ".html")
    #[clap(long)]
    suffix: Option<String>,

    /// JSON file with the data passed to every render
    #[clap(long)]
    data: Option<PathBuf>,

    /// Additional templates parsed along with each page, e.g. shared
    /// headers (can be given multiple times)
    #[clap(long)]
    with: Vec<String>,
}

fn load_data(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| anyhow!("reading data file {path:?}"))?;
    let json: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| anyhow!("parsing data file {path:?}"))?;
    Ok(json.into())
}

/// Template name from a request path, `None` for anything that isn't
/// a plain name.
fn page_name(url: &str) -> Option<&str> {
    let name = url.strip_prefix('/')?;
    let name = if name.is_empty() { "index" } else { name };
    if name.split('/').any(|seg| seg.is_empty() || seg.starts_with('.')) {
        return None
    }
    Some(name)
}

fn handle(request: &Request, renderer: &Renderer, data: &Value, with: &[&str]) -> Response {
    if request.method() != "GET" {
        return Response::empty_406()
    }
    let url = request.url();
    match page_name(&url) {
        None => Response::empty_404(),
        Some(name) => match name.strip_suffix(".json") {
            Some(_) => renderer.json(200, data),
            None => renderer.html(200, data, name, with),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = RenderConfig::from_env()?;
    if let Some(templates) = args.templates {
        config = config.with_templates_root(templates);
    }
    if let Some(suffix) = args.suffix {
        config = config.with_suffix(suffix);
    }
    let data = match &args.data {
        Some(path) => load_data(path)?,
        None => Value::Map(Default::default()),
    };
    let renderer = Arc::new(Renderer::new().with_config(config));
    let data = Arc::new(data);
    let with: Arc<Vec<String>> = Arc::new(args.with);

    warn!("serving templates from {:?} on {}",
          renderer.config().templates_root(), args.listen);
    let server = Server::new(args.listen.clone(), move |request| {
        let with: Vec<&str> = with.iter().map(String::as_str).collect();
        handle(request, &renderer, &data, &with)
    }).map_err(|e| anyhow!("can't listen on {}: {e}", args.listen))?;
    server.run();
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_page_name() {
        assert_eq!(page_name("/"), Some("index"));
        assert_eq!(page_name("/about"), Some("about"));
        assert_eq!(page_name("/blog/post.json"), Some("blog/post.json"));
        assert_eq!(page_name("/../etc/passwd"), None);
        assert_eq!(page_name("/a//b"), None);
        assert_eq!(page_name("/.hidden"), None);
        assert_eq!(page_name("nope"), None);
    }
}
