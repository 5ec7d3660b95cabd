//! Dot-delimited paths into a JSON document, e.g. `additionalProperties.yearPublished`.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterPathError {
    #[error("filter path must not be empty")]
    Empty,
    #[error("filter path {0:?} contains an empty segment")]
    EmptySegment(String),
    #[error("filter path {0:?} must not contain '\"'")]
    Quote(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPath {
    segments: Vec<String>,
}

impl FilterPath {
    pub fn parse(raw: &str) -> Result<Self, FilterPathError> {
        if raw.is_empty() {
            return Err(FilterPathError::Empty);
        }
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(FilterPathError::EmptySegment(raw.to_string()));
        }
        if raw.contains('"') {
            return Err(FilterPathError::Quote(raw.to_string()));
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Render as a SQLite JSON path with every segment quoted, so keys
    /// containing `$`, `[`, `\` or spaces address the literal member.
    /// Quoted labels have no escape syntax, hence `"` is refused at parse time.
    pub fn to_json_path(&self) -> String {
        let mut out = String::from("$");
        for seg in &self.segments {
            out.push_str(".\"");
            out.push_str(seg);
            out.push('"');
        }
        out
    }
}

impl fmt::Display for FilterPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}
