//! Recursive-descent matcher: walks a spec and a data tree in lockstep.
//!
//! The traversal is pure — it mutates neither the spec nor the data — and it
//! never stops at the first failure: every defect found in one pre-order pass
//! lands in the result, Hard and Informal interleaved in traversal order.
//! Depth is bounded by the input data; recursion references resolve by id
//! lookup into the arena and cannot loop (the builder refuses cyclic specs).

use indexmap::IndexMap;
use serde_json::Value;

use crate::diag::{Diagnostic, DiagnosticKind, PathSegment, ValidationResult};
use crate::spec::{FieldSpec, ScalarKind, Spec, SpecId, SpecNode};

/// Validate `data` against `spec`. Always returns the full report; nothing
/// about the data is ever an `Err`.
pub fn validate(spec: &Spec, data: &Value) -> ValidationResult {
    let mut matcher = Matcher {
        spec,
        path: Vec::new(),
        diags: Vec::new(),
    };
    matcher.match_node(spec.root(), data, None);
    ValidationResult::from_diagnostics(matcher.diags)
}

struct Matcher<'s> {
    spec: &'s Spec,
    path: Vec<PathSegment>,
    diags: Vec<Diagnostic>,
}

impl<'s> Matcher<'s> {
    fn report(&mut self, kind: DiagnosticKind, message: String) {
        self.diags.push(Diagnostic::new(kind, self.path.clone(), message));
    }

    /// `exempt` is the discriminator key currently being delegated through,
    /// if any; the first mapping reached consumes it.
    fn match_node(&mut self, id: SpecId, data: &Value, exempt: Option<&str>) {
        let spec = self.spec;
        match spec.node(id) {
            SpecNode::Scalar(kind) => self.match_scalar(*kind, data),
            SpecNode::List(element) => self.match_list(*element, data),
            SpecNode::Mapping { fields, wildcard } => {
                self.match_mapping(fields, *wildcard, data, exempt)
            }
            SpecNode::OneOf(alternatives) => self.match_one_of(alternatives, data, exempt),
            SpecNode::Discriminated { key, variants } => {
                self.match_discriminated(key, variants, data)
            }
            // recursion reference: follow without extending the path
            SpecNode::Ref(target) => self.match_node(*target, data, exempt),
        }
    }

    fn match_scalar(&mut self, kind: ScalarKind, data: &Value) {
        let ok = match kind {
            ScalarKind::Any => true,
            ScalarKind::String => data.is_string(),
            ScalarKind::Boolean => data.is_boolean(),
            ScalarKind::Number => data.is_number(),
            ScalarKind::Integer => matches!(data, Value::Number(n) if is_whole(n)),
        };
        if !ok {
            self.report(
                DiagnosticKind::StructuralMismatch,
                format!("expected {}, found {}", kind.name(), data_kind(data)),
            );
        }
    }

    fn match_list(&mut self, element: SpecId, data: &Value) {
        let Some(items) = data.as_array() else {
            self.report(
                DiagnosticKind::StructuralMismatch,
                format!("expected sequence, found {}", data_kind(data)),
            );
            return;
        };
        for (index, item) in items.iter().enumerate() {
            self.path.push(PathSegment::Index(index));
            self.match_node(element, item, None);
            self.path.pop();
        }
    }

    fn match_mapping(
        &mut self,
        fields: &'s IndexMap<String, FieldSpec>,
        wildcard: Option<SpecId>,
        data: &Value,
        exempt: Option<&str>,
    ) {
        let Some(object) = data.as_object() else {
            // single finding, no descent into a non-mapping
            self.report(
                DiagnosticKind::StructuralMismatch,
                format!("expected mapping, found {}", data_kind(data)),
            );
            return;
        };

        // declared fields first, in spec order
        for (key, field) in fields {
            match object.get(key) {
                Some(value) => {
                    self.path.push(PathSegment::Key(key.clone()));
                    self.match_node(field.node, value, None);
                    self.path.pop();
                }
                None if field.required => {
                    self.report(
                        DiagnosticKind::MissingRequiredField,
                        format!("missing required field '{key}'"),
                    );
                }
                None => {}
            }
        }

        // then data keys the spec does not declare, in data order
        for (key, value) in object {
            if fields.contains_key(key) || exempt == Some(key.as_str()) {
                continue;
            }
            self.path.push(PathSegment::Key(key.clone()));
            match wildcard {
                // matching through the wildcard is itself silent
                Some(node) => self.match_node(node, value, None),
                None => self.report(
                    DiagnosticKind::UnrecognizedField,
                    "unrecognized field".to_string(),
                ),
            }
            self.path.pop();
        }
    }

    fn match_one_of(&mut self, alternatives: &[SpecId], data: &Value, exempt: Option<&str>) {
        let mut best: Option<(usize, Vec<Diagnostic>)> = None;
        for &alternative in alternatives {
            let attempt = self.attempt(alternative, data, exempt);
            let hard = attempt.iter().filter(|d| d.is_hard()).count();
            if hard == 0 {
                // first alternative without a hard finding wins and
                // contributes nothing
                return;
            }
            if best.as_ref().is_none_or(|(fewest, _)| hard < *fewest) {
                best = Some((hard, attempt));
            }
        }
        if let Some((_, closest)) = best {
            self.diags.extend(closest);
            self.report(
                DiagnosticKind::NoAlternativeMatched,
                "no alternative matched".to_string(),
            );
        }
    }

    /// Run one sub-match into a fresh accumulator, leaving the shared path
    /// buffer as it was.
    fn attempt(&mut self, id: SpecId, data: &Value, exempt: Option<&str>) -> Vec<Diagnostic> {
        let saved = std::mem::take(&mut self.diags);
        let depth = self.path.len();
        self.match_node(id, data, exempt);
        self.path.truncate(depth);
        std::mem::replace(&mut self.diags, saved)
    }

    fn match_discriminated(
        &mut self,
        key: &'s str,
        variants: &'s IndexMap<String, SpecId>,
        data: &Value,
    ) {
        let Some(object) = data.as_object() else {
            self.report(
                DiagnosticKind::StructuralMismatch,
                format!("expected mapping, found {}", data_kind(data)),
            );
            return;
        };
        match object.get(key) {
            None => self.report(
                DiagnosticKind::UnknownDiscriminator,
                format!("missing discriminator '{key}'"),
            ),
            Some(Value::String(name)) => match variants.get(name) {
                Some(&variant) => self.match_node(variant, data, Some(key)),
                None => self.report(
                    DiagnosticKind::UnknownDiscriminator,
                    format!("unknown type '{name}'"),
                ),
            },
            Some(other) => self.report(
                DiagnosticKind::UnknownDiscriminator,
                format!("discriminator '{key}' must be a string, found {}", data_kind(other)),
            ),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// KIND PROBES
// ————————————————————————————————————————————————————————————————————————————

fn is_whole(n: &serde_json::Number) -> bool {
    n.as_i64().is_some()
        || n.as_u64().is_some()
        || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}

fn data_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if is_whole(n) => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Severity;
    use crate::spec::{MalformedSpec, MappingSpec, SpecBuilder};
    use serde_json::json;

    /// `mapping({required("sources"): sequence(scalar(string))})`
    fn sources_spec() -> Spec {
        let mut b = SpecBuilder::new();
        let string = b.string();
        let sources = b.list(string);
        let root = b.mapping(MappingSpec::new().required("sources", sources));
        b.finish(root).unwrap()
    }

    #[test]
    fn conforming_mapping_is_clean() {
        let spec = sources_spec();
        let result = validate(&spec, &json!({"sources": ["a", "b"]}));
        assert!(result.is_clean());
        assert!(result.informal_only);
    }

    #[test]
    fn missing_required_field_is_hard() {
        let spec = sources_spec();
        let result = validate(&spec, &json!({}));
        assert_eq!(result.diagnostics.len(), 1);
        let d = &result.diagnostics[0];
        assert_eq!(d.kind, DiagnosticKind::MissingRequiredField);
        assert_eq!(d.severity, Severity::Hard);
        assert_eq!(d.message, "missing required field 'sources'");
        assert!(!result.informal_only);
    }

    #[test]
    fn unknown_key_is_informal_only() {
        let spec = sources_spec();
        let result = validate(&spec, &json!({"sources": ["a"], "extra": 1}));
        assert_eq!(result.diagnostics.len(), 1);
        let d = &result.diagnostics[0];
        assert_eq!(d.kind, DiagnosticKind::UnrecognizedField);
        assert_eq!(d.to_string(), "extra: unrecognized field");
        assert!(result.informal_only);
    }

    #[test]
    fn one_missing_diagnostic_per_absent_required_key() {
        let mut b = SpecBuilder::new();
        let string = b.string();
        let root = b.mapping(MappingSpec::new()
            .required("title", string)
            .required("url", string)
            .required("name", string));
        let spec = b.finish(root).unwrap();
        let result = validate(&spec, &json!({"name": "ok"}));
        let missing: Vec<&Diagnostic> = result
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::MissingRequiredField)
            .collect();
        assert_eq!(missing.len(), 2);
        // spec declaration order, not data order
        assert_eq!(missing[0].message, "missing required field 'title'");
        assert_eq!(missing[1].message, "missing required field 'url'");
    }

    #[test]
    fn non_mapping_data_yields_single_finding_without_descent() {
        let spec = sources_spec();
        let result = validate(&spec, &json!(["not", "a", "mapping"]));
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::StructuralMismatch);
        assert_eq!(
            result.diagnostics[0].message,
            "expected mapping, found sequence"
        );
    }

    #[test]
    fn list_elements_carry_their_index() {
        let spec = sources_spec();
        let result = validate(&spec, &json!({"sources": ["a", 7, "c", false]}));
        assert_eq!(result.diagnostics.len(), 2);
        assert_eq!(result.diagnostics[0].to_string(), "sources[1]: expected string, found integer");
        assert_eq!(result.diagnostics[1].to_string(), "sources[3]: expected string, found boolean");
    }

    #[test]
    fn empty_sequence_is_always_valid() {
        let spec = sources_spec();
        assert!(validate(&spec, &json!({"sources": []})).is_clean());
    }

    #[test]
    fn integer_accepts_whole_floats_only() {
        let mut b = SpecBuilder::new();
        let integer = b.integer();
        let root = b.mapping(MappingSpec::new().field("levels", integer));
        let spec = b.finish(root).unwrap();

        assert!(validate(&spec, &json!({"levels": 8})).is_clean());
        assert!(validate(&spec, &json!({"levels": 8.0})).is_clean());
        let result = validate(&spec, &json!({"levels": 8.5}));
        assert_eq!(result.diagnostics[0].message, "expected integer, found number");
        // booleans are not numbers
        let result = validate(&spec, &json!({"levels": true}));
        assert_eq!(result.diagnostics[0].message, "expected integer, found boolean");
    }

    #[test]
    fn number_accepts_integer_and_float() {
        let mut b = SpecBuilder::new();
        let number = b.number();
        let root = b.list(number);
        let spec = b.finish(root).unwrap();
        assert!(validate(&spec, &json!([1, 2.5, -3])).is_clean());
        let result = validate(&spec, &json!(["1"]));
        assert_eq!(result.diagnostics[0].message, "expected number, found string");
    }

    #[test]
    fn any_matches_every_kind() {
        let mut b = SpecBuilder::new();
        let any = b.any();
        let root = b.list(any);
        let spec = b.finish(root).unwrap();
        let data = json!([null, true, 1, 2.5, "s", [], {"k": "v"}]);
        assert!(validate(&spec, &data).is_clean());
    }

    #[test]
    fn wildcard_checks_unknown_keys_silently() {
        let mut b = SpecBuilder::new();
        let string = b.string();
        let number = b.number();
        let root = b.mapping(MappingSpec::new().field("name", string).wildcard(number));
        let spec = b.finish(root).unwrap();

        assert!(validate(&spec, &json!({"name": "n", "anything": 4})).is_clean());
        let result = validate(&spec, &json!({"other": "not a number"}));
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].to_string(), "other: expected number, found string");
    }

    #[test]
    fn one_of_takes_first_matching_alternative_without_residue() {
        let mut b = SpecBuilder::new();
        let string = b.string();
        let number = b.number();
        let numbers = b.list(number);
        let root = b.one_of([string, numbers]).unwrap();
        let spec = b.finish(root).unwrap();

        assert!(validate(&spec, &json!("-180,-90,180,90")).is_clean());
        assert!(validate(&spec, &json!([-180.0, -90.0, 180.0, 90.0])).is_clean());
    }

    #[test]
    fn one_of_success_drops_informal_residue_from_the_branch() {
        let mut b = SpecBuilder::new();
        let string = b.string();
        let with_extra = b.mapping(MappingSpec::new().field("name", string));
        let root = b.one_of([with_extra]).unwrap();
        let spec = b.finish(root).unwrap();
        // the branch would collect an informal unrecognized-field finding,
        // but a matching alternative contributes nothing
        let result = validate(&spec, &json!({"name": "n", "stray": 1}));
        assert!(result.is_clean());
    }

    #[test]
    fn one_of_failure_reports_closest_alternative_plus_summary() {
        let mut b = SpecBuilder::new();
        let string = b.string();
        let two_required = b.mapping(MappingSpec::new()
            .required("a", string)
            .required("b", string));
        let root = b.one_of([two_required, string]).unwrap();
        let spec = b.finish(root).unwrap();

        // mapping branch: one hard finding; string branch: one hard finding.
        // tie breaks to the first declared alternative.
        let result = validate(&spec, &json!({"a": "present"}));
        assert_eq!(result.diagnostics.len(), 2);
        assert_eq!(result.diagnostics[0].message, "missing required field 'b'");
        assert_eq!(result.diagnostics[1].kind, DiagnosticKind::NoAlternativeMatched);
        assert_eq!(result.diagnostics[1].message, "no alternative matched");
        assert!(result.diagnostics[1].path.is_empty());
    }

    #[test]
    fn one_of_failure_prefers_fewest_hard_findings() {
        let mut b = SpecBuilder::new();
        let string = b.string();
        let two_required = b.mapping(MappingSpec::new()
            .required("a", string)
            .required("b", string));
        let one_required = b.mapping(MappingSpec::new().required("title", string));
        let root = b.one_of([two_required, one_required]).unwrap();
        let spec = b.finish(root).unwrap();

        let result = validate(&spec, &json!({}));
        // closest is the second alternative with a single missing field
        assert_eq!(result.diagnostics.len(), 2);
        assert_eq!(result.diagnostics[0].message, "missing required field 'title'");
        assert_eq!(result.diagnostics[1].kind, DiagnosticKind::NoAlternativeMatched);
    }

    #[test]
    fn merged_required_sets_union() {
        let mut b = SpecBuilder::new();
        let string = b.string();
        let left = b.mapping(MappingSpec::new().required("x", string));
        let right = b.mapping(MappingSpec::new().required("y", string));
        let root = b.merged([left, right]).unwrap();
        let spec = b.finish(root).unwrap();

        let result = validate(&spec, &json!({}));
        assert_eq!(result.diagnostics.len(), 2);
        assert_eq!(result.diagnostics[0].message, "missing required field 'x'");
        assert_eq!(result.diagnostics[1].message, "missing required field 'y'");
    }

    #[test]
    fn merged_later_component_overrides_field_node() {
        let mut b = SpecBuilder::new();
        let string = b.string();
        let integer = b.integer();
        let base = b.mapping(MappingSpec::new().field("timeout", string));
        let layer = b.mapping(MappingSpec::new().field("timeout", integer));
        let root = b.merged([base, layer]).unwrap();
        let spec = b.finish(root).unwrap();

        assert!(validate(&spec, &json!({"timeout": 30})).is_clean());
        let result = validate(&spec, &json!({"timeout": "30s"}));
        assert_eq!(result.diagnostics[0].message, "expected integer, found string");
    }

    fn source_spec() -> Spec {
        let mut b = SpecBuilder::new();
        let string = b.string();
        let boolean = b.boolean();
        let wms = b.mapping(MappingSpec::new()
            .required("url", string)
            .field("transparent", boolean));
        let tile = b.mapping(MappingSpec::new().required("grid", string));
        let root = b.discriminated("type", [("wms", wms), ("tile", tile)]).unwrap();
        b.finish(root).unwrap()
    }

    #[test]
    fn discriminated_delegates_and_exempts_the_key() {
        let spec = source_spec();
        // "type" must not be flagged unrecognized by the delegated mapping
        let result = validate(
            &spec,
            &json!({"type": "wms", "url": "http://example.org/service", "transparent": true}),
        );
        assert!(result.is_clean());
        // the delegated variant still reports its own defects
        let result = validate(&spec, &json!({"type": "wms", "transparent": "yes"}));
        assert_eq!(result.diagnostics.len(), 2);
        assert_eq!(result.diagnostics[0].message, "missing required field 'url'");
        assert_eq!(
            result.diagnostics[1].to_string(),
            "transparent: expected boolean, found string"
        );
    }

    #[test]
    fn discriminated_missing_key_is_hard() {
        let spec = source_spec();
        let result = validate(&spec, &json!({"url": "http://example.org"}));
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::UnknownDiscriminator);
        assert_eq!(result.diagnostics[0].message, "missing discriminator 'type'");
    }

    #[test]
    fn discriminated_unknown_value_is_hard() {
        let spec = source_spec();
        let result = validate(&spec, &json!({"type": "mapserver"}));
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].message, "unknown type 'mapserver'");
    }

    #[test]
    fn discriminated_non_string_value_is_hard() {
        let spec = source_spec();
        let result = validate(&spec, &json!({"type": 3}));
        assert_eq!(
            result.diagnostics[0].message,
            "discriminator 'type' must be a string, found integer"
        );
    }

    #[test]
    fn discriminated_non_mapping_data_is_structural() {
        let spec = source_spec();
        let result = validate(&spec, &json!("wms"));
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::StructuralMismatch);
    }

    fn tree_spec() -> Spec {
        let mut b = SpecBuilder::new();
        let string = b.string();
        let node = b
            .recursive(|b, me| {
                let children = b.list(me);
                Ok(b.mapping(MappingSpec::new()
                    .required("name", string)
                    .field("children", children)))
            })
            .unwrap();
        b.finish(node).unwrap()
    }

    #[test]
    fn recursive_schema_validates_arbitrary_nesting() {
        let spec = tree_spec();
        let data = json!({
            "name": "root",
            "children": [
                {"name": "a", "children": []},
                {"name": "b", "children": [
                    {"name": "b1", "children": [
                        {"name": "b1a"}
                    ]}
                ]}
            ]
        });
        assert!(validate(&spec, &data).is_clean());
    }

    #[test]
    fn recursive_schema_locates_deep_defects() {
        let spec = tree_spec();
        let data = json!({
            "name": "root",
            "children": [
                {"name": "a", "children": [
                    {"children": []}
                ]}
            ]
        });
        let result = validate(&spec, &data);
        assert_eq!(result.diagnostics.len(), 1);
        // the Ref hop itself does not extend the path
        assert_eq!(
            result.diagnostics[0].to_string(),
            "children[0].children[0]: missing required field 'name'"
        );
    }

    #[test]
    fn hard_and_informal_interleave_in_traversal_order() {
        let mut b = SpecBuilder::new();
        let string = b.string();
        let inner = b.mapping(MappingSpec::new().required("title", string));
        let root = b.mapping(MappingSpec::new()
            .field("first", inner)
            .field("second", string));
        let spec = b.finish(root).unwrap();

        let result = validate(&spec, &json!({"first": {"stray": 1}, "second": 9, "tail": null}));
        let kinds: Vec<DiagnosticKind> = result.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            [
                DiagnosticKind::MissingRequiredField,
                DiagnosticKind::UnrecognizedField,
                DiagnosticKind::StructuralMismatch,
                DiagnosticKind::UnrecognizedField,
            ]
        );
        assert!(!result.informal_only);
    }

    #[test]
    fn builder_rejects_malformed_specs_before_any_validation() {
        let mut b = SpecBuilder::new();
        let err = b.discriminated("type", Vec::<(&str, SpecId)>::new()).unwrap_err();
        assert_eq!(err, MalformedSpec::NoVariants("type".to_string()));
    }
}
