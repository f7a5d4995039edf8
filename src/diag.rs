//! Path-qualified findings collected while matching a document against a spec.
//!
//! Diagnostics are plain data: the matcher appends them, the caller decides
//! what to do with them. Nothing in here is an `Err` — a validation run
//! always completes and returns the full list.

use std::fmt;

use serde::Serialize;

// ————————————————————————————————————————————————————————————————————————————
// PATHS
// ————————————————————————————————————————————————————————————————————————————

/// One step into the data tree: a mapping key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Dotted render of a path, e.g. `caches.osm.sources[0]`.
pub fn render_path(path: &[PathSegment]) -> String {
    let mut out = String::new();
    for segment in path {
        match segment {
            PathSegment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            PathSegment::Index(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
        }
    }
    out
}

// ————————————————————————————————————————————————————————————————————————————
// DIAGNOSTICS
// ————————————————————————————————————————————————————————————————————————————

/// Whether a finding blocks the configuration or is merely advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Hard,
    Informal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Data kind disagrees with the expected scalar/sequence/mapping kind.
    StructuralMismatch,
    MissingRequiredField,
    /// Data key absent from the declared fields and no wildcard to catch it.
    UnrecognizedField,
    /// Discriminator key absent, non-string, or naming no declared variant.
    UnknownDiscriminator,
    /// Every branch of a one-of failed.
    NoAlternativeMatched,
}

impl DiagnosticKind {
    /// Severity is fixed per kind: only unrecognized fields are advisory.
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::UnrecognizedField => Severity::Informal,
            _ => Severity::Hard,
        }
    }
}

/// A single finding, located by its path into the data tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub path: Vec<PathSegment>,
    pub kind: DiagnosticKind,
    pub message: String,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, path: Vec<PathSegment>, message: impl Into<String>) -> Self {
        Self {
            path,
            kind,
            message: message.into(),
            severity: kind.severity(),
        }
    }

    pub fn is_hard(&self) -> bool {
        self.severity == Severity::Hard
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", render_path(&self.path), self.message)
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RESULT
// ————————————————————————————————————————————————————————————————————————————

/// Everything one validation run found, in traversal order.
///
/// `informal_only` is true iff the list is empty or every entry is advisory;
/// callers treat `informal_only == false` as grounds to refuse the config.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub informal_only: bool,
}

impl ValidationResult {
    pub(crate) fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        let informal_only = !diagnostics.iter().any(Diagnostic::is_hard);
        Self { diagnostics, informal_only }
    }

    /// No findings at all, not even advisory ones.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
