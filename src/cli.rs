//! Thin CLI: resolve inputs → parse YAML/JSON → validate → print findings.
//!
//! All validation logic lives in the library; this module only feeds it
//! files and renders the report.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde_json::Value;

use crate::diag::{Diagnostic, Severity};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// check tile proxy configuration files against the built-in schema
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// validate configuration files and report every finding
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(num_args = 1.., required = true)]
    input: Vec<String>,

    /// emit the report as a JSON document instead of plain lines
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(serde::Serialize)]
struct FileReport {
    file: String,
    informal_only: bool,
    diagnostics: Vec<Diagnostic>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<ExitCode> {
        match &self.cmd {
            Command::Check(args) => args.run(),
        }
    }
}

impl CheckArgs {
    fn run(&self) -> Result<ExitCode> {
        let spec = crate::schema::config_spec();
        let paths = resolve_file_path_patterns(&self.input)?;

        let mut any_hard = false;
        let mut reports = Vec::new();
        for path in &paths {
            let file = path.to_string_lossy().to_string();
            let data = load_document(path)
                .with_context(|| format!("failed to load {file}"))?;
            let result = crate::matcher::validate(spec, &data);
            if !result.informal_only {
                any_hard = true;
            }
            if self.json {
                reports.push(FileReport {
                    file,
                    informal_only: result.informal_only,
                    diagnostics: result.diagnostics,
                });
            } else {
                for diag in &result.diagnostics {
                    let line = format!("{file}: {diag}");
                    match diag.severity {
                        Severity::Hard => println!("{}", line.red()),
                        Severity::Informal => println!("{}", line.yellow()),
                    }
                }
            }
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }

        if any_hard {
            Ok(ExitCode::FAILURE)
        } else {
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Read a document as YAML or JSON depending on its extension. Either way
/// the validator sees the same generic data tree.
fn load_document(path: &std::path::Path) -> Result<Value> {
    let source = std::fs::read_to_string(path)?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "yaml" | "yml" => {
            let yaml: serde_yaml::Value =
                serde_yaml::from_str(&source).context("invalid YAML")?;
            yaml_to_json(&yaml)
        }
        _ => serde_json::from_str(&source).context("invalid JSON"),
    }
}

/// YAML has a richer value space than the validator's data model (tags,
/// non-string keys); configs use only the JSON-compatible subset, anything
/// else is an input error.
fn yaml_to_json(yaml: &serde_yaml::Value) -> Result<Value> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(v) => Ok(Value::Bool(*v)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(serde_json::Number::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(serde_json::Number::from(u)))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| anyhow::anyhow!("cannot represent float {f}"))
            } else {
                bail!("unsupported YAML number: {n:?}")
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => {
            let items: Result<Vec<Value>> = seq.iter().map(yaml_to_json).collect();
            Ok(Value::Array(items?))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut object = serde_json::Map::new();
            for (key, value) in map {
                let key = match key {
                    serde_yaml::Value::String(s) => s.clone(),
                    other => bail!("unsupported YAML map key: {other:?}"),
                };
                object.insert(key, yaml_to_json(value)?);
            }
            Ok(Value::Object(object))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
