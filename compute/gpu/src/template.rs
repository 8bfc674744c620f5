//! Minimal text templates with named placeholders
//!
//! Placeholders are written `${NAME}`, where `NAME` is made of ASCII letters,
//! digits and underscores. A template is checked for well-formedness when it
//! is parsed, and rendering only succeeds when every placeholder is bound to a
//! value and every bound value is used. This catches generator bugs before the
//! output ever reaches a compiler.

use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Parsed template
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Template {
    pieces: Vec<Piece>,
}
//
#[derive(Clone, Debug, Eq, PartialEq)]
enum Piece {
    Text(String),
    Placeholder(String),
}
//
impl Template {
    /// Parse a template
    pub fn parse(source: &str) -> Result<Self> {
        let mut pieces = Vec::new();
        let mut rest = source;
        while let Some(start) = rest.find("${") {
            let offset = source.len() - rest.len() + start;
            if start > 0 {
                pieces.push(Piece::Text(rest[..start].to_owned()));
            }
            let after_open = &rest[start + 2..];
            let end = after_open
                .find('}')
                .ok_or(TemplateError::Unterminated { offset })?;
            let name = &after_open[..end];
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(TemplateError::BadName {
                    offset,
                    name: name.to_owned(),
                });
            }
            pieces.push(Piece::Placeholder(name.to_owned()));
            rest = &after_open[end + 1..];
        }
        if !rest.is_empty() {
            pieces.push(Piece::Text(rest.to_owned()));
        }
        Ok(Self { pieces })
    }

    /// Names of the placeholders that this template contains
    pub fn placeholders(&self) -> BTreeSet<&str> {
        self.pieces
            .iter()
            .filter_map(|piece| match piece {
                Piece::Placeholder(name) => Some(name.as_str()),
                Piece::Text(_) => None,
            })
            .collect()
    }

    /// Substitute every placeholder with its bound value
    pub fn render(&self, bindings: &Bindings) -> Result<String> {
        let placeholders = self.placeholders();
        if let Some(unused) = bindings
            .values
            .keys()
            .find(|name| !placeholders.contains(name.as_str()))
        {
            return Err(TemplateError::Unused(unused.clone()));
        }
        let mut output = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Text(text) => output.push_str(text),
                Piece::Placeholder(name) => output.push_str(
                    bindings
                        .values
                        .get(name)
                        .ok_or_else(|| TemplateError::Unresolved(name.clone()))?,
                ),
            }
        }
        Ok(output)
    }
}

/// Values of template placeholders
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    values: HashMap<String, String>,
}
//
impl Bindings {
    /// Start with no binding
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a placeholder to a value, which must not have been bound before
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        if self.values.contains_key(&name) {
            return Err(TemplateError::Duplicate(name));
        }
        self.values.insert(name, value.into());
        Ok(())
    }
}

/// Structural errors in templates or their bindings
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TemplateError {
    #[error("placeholder starting at byte {offset} is not terminated")]
    Unterminated { offset: usize },

    #[error("placeholder at byte {offset} has invalid name {name:?}")]
    BadName { offset: usize, name: String },

    #[error("placeholder {0:?} was not bound to a value")]
    Unresolved(String),

    #[error("binding {0:?} does not match any placeholder")]
    Unused(String),

    #[error("placeholder {0:?} was bound twice")]
    Duplicate(String),
}
//
pub type Result<T, E = TemplateError> = std::result::Result<T, E>;
