//! Generic schema engine for map-tile proxy configuration.
//!
//! Build a spec tree once with the DSL, then match arbitrary parsed
//! configuration data against it and get back a full, ordered report.
//!
//! Design goals:
//! - Specs are inert data: built once, immutable, shared across threads.
//! - Validation never fails early; one pass reports every defect found.
//! - Broken schemas abort at construction, never at validate time.
//! - Recursive (tree-shaped) specs resolve by arena id, no ownership cycles.

pub mod cli;
pub mod diag;
pub mod matcher;
pub mod schema;
pub mod spec;

pub use diag::{Diagnostic, DiagnosticKind, PathSegment, Severity, ValidationResult};
pub use matcher::validate;
pub use spec::{MalformedSpec, MappingSpec, ScalarKind, Spec, SpecBuilder, SpecId};
