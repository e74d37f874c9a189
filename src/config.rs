//! Where the single-call render form looks for templates.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow, Context};
use kstring::KString;

use crate::util::getenv_or;

pub const TEMPLATES_ROOT_VAR: &str = "RENDER_TEMPLATES_ROOT";
pub const TEMPLATE_SUFFIX_VAR: &str = "RENDER_TEMPLATE_SUFFIX";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Directory that template names are resolved in.
    pub templates_root: PathBuf,
    /// Appended to a template name to get its file name, e.g. `.html`.
    pub suffix: KString,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            templates_root: PathBuf::from("templates"),
            suffix: KString::from_static(".html"),
        }
    }
}

impl RenderConfig {
    /// The defaults, overridden by `RENDER_TEMPLATES_ROOT` and
    /// `RENDER_TEMPLATE_SUFFIX` where set.
    pub fn from_env() -> Result<Self> {
        let dflt = RenderConfig::default();
        let root = getenv_or(TEMPLATES_ROOT_VAR, dflt.templates_root.to_str())
            .with_context(|| anyhow!("reading render configuration"))?;
        let suffix = getenv_or(TEMPLATE_SUFFIX_VAR, Some(dflt.suffix.as_str()))
            .with_context(|| anyhow!("reading render configuration"))?;
        Ok(RenderConfig {
            templates_root: root.into(),
            suffix: suffix.into(),
        })
    }

    pub fn with_templates_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.templates_root = root.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<KString>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// `<root>/<name><suffix>`
    pub fn template_path(&self, name: &str) -> PathBuf {
        self.templates_root.join(format!("{name}{}", self.suffix))
    }

    pub fn templates_root(&self) -> &Path {
        &self.templates_root
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_template_path() {
        let c = RenderConfig::default();
        assert_eq!(c.template_path("base"), PathBuf::from("templates/base.html"));
        let c = c.with_templates_root("/srv/t").with_suffix(".tmpl");
        assert_eq!(c.template_path("page"), PathBuf::from("/srv/t/page.tmpl"));
    }

    #[test]
    fn t_from_env_defaults() {
        // neither variable is set by the test environment
        if std::env::var_os(TEMPLATES_ROOT_VAR).is_none()
            && std::env::var_os(TEMPLATE_SUFFIX_VAR).is_none()
        {
            assert_eq!(RenderConfig::from_env().unwrap(), RenderConfig::default());
        }
    }
}
