use std::{fs, path::Path};

use crate::ProtocolError;

/// Named index template document, installed once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTemplate {
    name: String,
    source: String,
}

impl IndexTemplate {
    /// Build a template from an inline JSON document.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Result<Self, ProtocolError> {
        let name = name.into();
        let source = source.into();

        if name.trim().is_empty() {
            return Err(ProtocolError::EmptyTemplateName);
        }
        if source.trim().is_empty() {
            return Err(ProtocolError::EmptyTemplateSource(name));
        }
        if let Err(source_err) = serde_json::from_str::<serde_json::Value>(&source) {
            return Err(ProtocolError::InvalidTemplateSource {
                name,
                source: source_err,
            });
        }

        Ok(Self { name, source })
    }

    /// Build a template whose document is read from `path`.
    pub fn from_path(name: impl Into<String>, path: &Path) -> Result<Self, ProtocolError> {
        let source = fs::read_to_string(path).map_err(|source| ProtocolError::TemplateRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(name, source)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
