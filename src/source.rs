//! Where template text comes from. Every source is read completely
//! (and any file handle closed) before anything is parsed.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use kstring::KString;

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("reading template \"{name}\" from {path:?}: {error}")]
    File { name: KString, path: PathBuf, error: std::io::Error },
    #[error("reading template \"{name}\": {error}")]
    Reader { name: KString, error: std::io::Error },
    #[error("template file path {0:?} has no usable file name")]
    NoName(PathBuf),
}

enum Origin {
    File(PathBuf),
    Embedded(&'static str),
    Reader(Box<dyn Read + Send>),
}

/// A named piece of template text, not yet read.
pub struct TemplateSource {
    name: KString,
    origin: Origin,
}

impl fmt::Debug for TemplateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = match &self.origin {
            Origin::File(path) => format!("file {path:?}"),
            Origin::Embedded(_) => "embedded".into(),
            Origin::Reader(_) => "reader".into(),
        };
        write!(f, "TemplateSource({:?}, {origin})", self.name.as_str())
    }
}

impl TemplateSource {
    /// An OS file; the template is named after the file stem
    /// (`templates/base.html` is `base`).
    pub fn file(path: impl Into<PathBuf>) -> Result<Self, SourceError> {
        let path = path.into();
        let name = path.file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SourceError::NoName(path.clone()))?;
        Ok(TemplateSource { name: KString::from_ref(name), origin: Origin::File(path) })
    }

    /// An OS file under an explicit name.
    pub fn named_file(name: &str, path: impl Into<PathBuf>) -> Self {
        TemplateSource { name: KString::from_ref(name), origin: Origin::File(path.into()) }
    }

    /// Text compiled into the binary, e.g. via `include_str!`.
    pub fn embedded(name: &str, text: &'static str) -> Self {
        TemplateSource { name: KString::from_ref(name), origin: Origin::Embedded(text) }
    }

    /// Anything readable; it is read to the end on `read`.
    pub fn reader(name: &str, reader: impl Read + Send + 'static) -> Self {
        TemplateSource { name: KString::from_ref(name), origin: Origin::Reader(Box::new(reader)) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.origin {
            Origin::File(path) => Some(path),
            _ => None,
        }
    }

    /// Consume the source, giving its name and full text.
    pub fn read(self) -> Result<(KString, String), SourceError> {
        let TemplateSource { name, origin } = self;
        let text = match origin {
            Origin::File(path) => match std::fs::read_to_string(&path) {
                Ok(s) => s,
                Err(error) => return Err(SourceError::File { name, path, error }),
            },
            Origin::Embedded(s) => s.to_owned(),
            Origin::Reader(mut r) => {
                let mut s = String::new();
                if let Err(error) = r.read_to_string(&mut s) {
                    return Err(SourceError::Reader { name, error })
                }
                s
            }
        };
        Ok((name, text))
    }
}
