//! Structured error records handed to the reporting layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::action::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingProperty,
    UnknownProperty,
    TypeMismatch,
    InvalidProperty,
    MissingField,
    InvalidField,
    Api,
    Script,
}

/// One problem, pinned to the script line whose builder call caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub kind: ErrorKind,
    pub message: String,
}

impl Diagnostic {
    pub fn at(location: &SourceLocation, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            file: location.file.clone(),
            line: location.line,
            column: location.column,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.file, self.line, self.message)
    }
}

/// Group diagnostics by source file, keeping dispatch order within a file.
pub fn group_by_file(diagnostics: &[Diagnostic]) -> BTreeMap<&str, Vec<&Diagnostic>> {
    let mut groups: BTreeMap<&str, Vec<&Diagnostic>> = BTreeMap::new();
    for d in diagnostics {
        groups.entry(d.file.as_str()).or_default().push(d);
    }
    groups
}

/// The lines of `source` within `radius` of the 1-indexed `line`, numbered.
pub fn source_context(source: &str, line: u32, radius: u32) -> Vec<(u32, &str)> {
    let first = line.saturating_sub(radius).max(1);
    let last = line.saturating_add(radius);
    source
        .lines()
        .enumerate()
        .map(|(i, text)| (i as u32 + 1, text))
        .filter(|(n, _)| (first..=last).contains(n))
        .collect()
}
