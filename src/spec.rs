//! Spec AST and the builder DSL that produces it.
//!
//! A [`Spec`] is an arena of nodes addressed by stable [`SpecId`]; children
//! point at each other by id, never by owning box, so tree-shaped recursive
//! schemas need no ownership cycles. Once [`SpecBuilder::finish`] returns,
//! the spec is immutable for the life of the process and can be shared across
//! concurrent validations freely.
//!
//! Anything wrong with the schema itself — an unbound recursion slot, a
//! discriminated node with no variants, merging a non-mapping — surfaces here
//! as [`MalformedSpec`], at build time. The matcher never sees a broken spec.

use indexmap::IndexMap;
use indexmap::map::Entry;
use thiserror::Error;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Stable handle to a node inside one builder/spec arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpecId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    /// Whole-valued numbers only; `2.0` counts, `2.5` does not.
    Integer,
    /// Integer or floating value.
    Number,
    Boolean,
    /// Matches any data node, including sequences and mappings.
    Any,
}

impl ScalarKind {
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Integer => "integer",
            ScalarKind::Number => "number",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Any => "anything",
        }
    }
}

/// A declared mapping field: the node it must match and whether the key
/// has to be present. `required` keys are always declared fields, by
/// construction of [`MappingSpec`].
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub node: SpecId,
    pub required: bool,
}

/// Closed sum of schema node kinds. Merged specs do not appear here: the
/// builder reduces them to a plain `Mapping` eagerly (see
/// [`SpecBuilder::merged`]).
#[derive(Debug, Clone)]
pub enum SpecNode {
    Scalar(ScalarKind),
    List(SpecId),
    Mapping {
        /// Declared fields, in declaration order. The matcher walks this
        /// order, not the data's key order, for deterministic output.
        fields: IndexMap<String, FieldSpec>,
        /// Spec for data keys not declared above, if any.
        wildcard: Option<SpecId>,
    },
    OneOf(Vec<SpecId>),
    Discriminated {
        key: String,
        variants: IndexMap<String, SpecId>,
    },
    /// Recursion reference, resolved by id lookup. Entering one does not
    /// extend the diagnostic path.
    Ref(SpecId),
}

// ————————————————————————————————————————————————————————————————————————————
// BUILD-TIME ERRORS
// ————————————————————————————————————————————————————————————————————————————

/// Defects in the schema declaration itself. These abort spec construction;
/// they are never deferred into validate-time behavior.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedSpec {
    #[error("recursion slot {0} was reserved but never bound")]
    UnresolvedRef(usize),
    #[error("recursion references starting at node {0} never reach a concrete node")]
    RefCycle(usize),
    #[error("discriminated spec on '{0}' declares no variants")]
    NoVariants(String),
    #[error("one-of spec declares no alternatives")]
    NoAlternatives,
    #[error("merged component {0} is not a mapping")]
    NotMergeable(usize),
}

// ————————————————————————————————————————————————————————————————————————————
// SPEC
// ————————————————————————————————————————————————————————————————————————————

/// A finished, immutable schema. Built once, validated against many times.
#[derive(Debug, Clone)]
pub struct Spec {
    nodes: Vec<SpecNode>,
    root: SpecId,
}

impl Spec {
    pub fn root(&self) -> SpecId {
        self.root
    }

    pub(crate) fn node(&self, id: SpecId) -> &SpecNode {
        &self.nodes[id.0]
    }
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDER
// ————————————————————————————————————————————————————————————————————————————

/// Ordered field collection for [`SpecBuilder::mapping`].
///
/// Children are built first (they are just ids), then listed here:
///
/// ```
/// use tileconf::spec::{MappingSpec, SpecBuilder};
///
/// let mut b = SpecBuilder::new();
/// let string = b.string();
/// let sources = b.list(string);
/// let root = b.mapping(MappingSpec::new()
///     .required("sources", sources)
///     .field("name", string));
/// let spec = b.finish(root).unwrap();
/// # let _ = spec;
/// ```
#[derive(Debug, Default)]
pub struct MappingSpec {
    fields: IndexMap<String, FieldSpec>,
    wildcard: Option<SpecId>,
}

impl MappingSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an optional field.
    pub fn field(mut self, key: impl Into<String>, node: SpecId) -> Self {
        self.fields.insert(key.into(), FieldSpec { node, required: false });
        self
    }

    /// Declare a field that must be present.
    pub fn required(mut self, key: impl Into<String>, node: SpecId) -> Self {
        self.fields.insert(key.into(), FieldSpec { node, required: true });
        self
    }

    /// Spec applied to any data key not declared above. Matching through the
    /// wildcard is silent; without one, unknown keys are advisory findings.
    pub fn wildcard(mut self, node: SpecId) -> Self {
        self.wildcard = Some(node);
        self
    }
}

/// Arena-backed constructor for [`Spec`] nodes.
#[derive(Debug, Default)]
pub struct SpecBuilder {
    nodes: Vec<Option<SpecNode>>,
}

impl SpecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, node: SpecNode) -> SpecId {
        let id = SpecId(self.nodes.len());
        self.nodes.push(Some(node));
        id
    }

    // ---- scalars ---- //

    pub fn string(&mut self) -> SpecId {
        self.push(SpecNode::Scalar(ScalarKind::String))
    }

    pub fn integer(&mut self) -> SpecId {
        self.push(SpecNode::Scalar(ScalarKind::Integer))
    }

    pub fn number(&mut self) -> SpecId {
        self.push(SpecNode::Scalar(ScalarKind::Number))
    }

    pub fn boolean(&mut self) -> SpecId {
        self.push(SpecNode::Scalar(ScalarKind::Boolean))
    }

    pub fn any(&mut self) -> SpecId {
        self.push(SpecNode::Scalar(ScalarKind::Any))
    }

    // ---- containers ---- //

    /// Sequence whose every element matches `element`. Empty sequences are
    /// always valid.
    pub fn list(&mut self, element: SpecId) -> SpecId {
        self.push(SpecNode::List(element))
    }

    pub fn mapping(&mut self, mapping: MappingSpec) -> SpecId {
        self.push(SpecNode::Mapping {
            fields: mapping.fields,
            wildcard: mapping.wildcard,
        })
    }

    /// Alternatives tried in declaration order against the same data.
    pub fn one_of(
        &mut self,
        alternatives: impl IntoIterator<Item = SpecId>,
    ) -> Result<SpecId, MalformedSpec> {
        let alternatives: Vec<SpecId> = alternatives.into_iter().collect();
        if alternatives.is_empty() {
            return Err(MalformedSpec::NoAlternatives);
        }
        Ok(self.push(SpecNode::OneOf(alternatives)))
    }

    /// Tagged union: the string value under `key` selects the variant to
    /// delegate to. The key itself is exempt from unrecognized-field checks
    /// inside the chosen variant.
    pub fn discriminated<S: Into<String>>(
        &mut self,
        key: impl Into<String>,
        variants: impl IntoIterator<Item = (S, SpecId)>,
    ) -> Result<SpecId, MalformedSpec> {
        let key = key.into();
        let variants: IndexMap<String, SpecId> = variants
            .into_iter()
            .map(|(name, node)| (name.into(), node))
            .collect();
        if variants.is_empty() {
            return Err(MalformedSpec::NoVariants(key));
        }
        Ok(self.push(SpecNode::Discriminated { key, variants }))
    }

    /// Union of mapping components, reduced right here: fields union with the
    /// later component winning on key collision, required flags union, and
    /// the wildcard is the last non-empty one. Downstream schemas layer
    /// common blocks this way, so the override order is load-bearing.
    pub fn merged(
        &mut self,
        components: impl IntoIterator<Item = SpecId>,
    ) -> Result<SpecId, MalformedSpec> {
        let mut fields: IndexMap<String, FieldSpec> = IndexMap::new();
        let mut wildcard = None;
        for id in components {
            let Some(SpecNode::Mapping { fields: part, wildcard: part_wildcard }) =
                self.nodes[id.0].clone()
            else {
                // unbound recursion slots are not mergeable either
                return Err(MalformedSpec::NotMergeable(id.0));
            };
            for (key, field) in part {
                match fields.entry(key) {
                    Entry::Occupied(mut slot) => {
                        let merged = slot.get_mut();
                        merged.node = field.node;
                        merged.required |= field.required;
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(field);
                    }
                }
            }
            if part_wildcard.is_some() {
                wildcard = part_wildcard;
            }
        }
        Ok(self.push(SpecNode::Mapping { fields, wildcard }))
    }

    // ---- recursion ---- //

    /// Reserve a slot to be bound later. Unbound slots fail [`finish`].
    ///
    /// [`finish`]: SpecBuilder::finish
    pub fn reserve(&mut self) -> SpecId {
        let id = SpecId(self.nodes.len());
        self.nodes.push(None);
        id
    }

    /// Bind a reserved slot to an already-built node.
    pub fn bind(&mut self, slot: SpecId, target: SpecId) -> Result<(), MalformedSpec> {
        if slot == target {
            return Err(MalformedSpec::RefCycle(slot.0));
        }
        self.nodes[slot.0] = Some(SpecNode::Ref(target));
        Ok(())
    }

    /// Recursion scope: the closure receives a handle to the node being
    /// defined and may reference it anywhere inside, enabling tree-shaped
    /// schemas (a node holding a sequence of nodes of the same shape).
    pub fn recursive(
        &mut self,
        build: impl FnOnce(&mut Self, SpecId) -> Result<SpecId, MalformedSpec>,
    ) -> Result<SpecId, MalformedSpec> {
        let me = self.reserve();
        let body = build(self, me)?;
        self.bind(me, body)?;
        Ok(me)
    }

    // ---- finish ---- //

    /// Freeze the arena. Fails if any reserved slot was never bound or if a
    /// chain of recursion references never reaches a concrete node — either
    /// would otherwise turn into validate-time infinite recursion.
    pub fn finish(self, root: SpecId) -> Result<Spec, MalformedSpec> {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (index, slot) in self.nodes.into_iter().enumerate() {
            nodes.push(slot.ok_or(MalformedSpec::UnresolvedRef(index))?);
        }
        let count = nodes.len();
        for start in 0..count {
            let mut current = start;
            let mut hops = 0;
            while let SpecNode::Ref(next) = &nodes[current] {
                current = next.0;
                hops += 1;
                if hops > count {
                    return Err(MalformedSpec::RefCycle(start));
                }
            }
        }
        Ok(Spec { nodes, root })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
