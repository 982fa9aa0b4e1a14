use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use url::Url;

use super::{Binding, ElementType, Invariant, ProfileReference, SlicingDefinition};

/// A parsed profile document: a versioned constraint set narrowing a base
/// type or another profile. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDefinition {
    pub url: Url,
    pub version: String,
    pub name: Option<String>,

    /// Core type this profile ultimately constrains, e.g. `Patient`.
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Base of the derivation chain. `None` for root type definitions.
    pub base: Option<ProfileReference>,

    /// Ordered differential: only the constraints this profile explicitly
    /// declares relative to its base.
    #[serde(default)]
    pub differential: Vec<ElementConstraint>,
}

/// One differential entry. Only explicitly present fields override the
/// base snapshot during merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementConstraint {
    pub path: String,

    pub min: Option<u32>,
    /// FHIR-style max: a number rendered as a string, or `"*"` for
    /// unbounded.
    pub max: Option<String>,

    pub types: Option<Vec<ElementType>>,
    pub binding: Option<Binding>,
    pub fixed: Option<Value>,
    pub pattern: Option<Value>,
    pub slicing: Option<SlicingDefinition>,
    pub invariants: Option<Vec<Invariant>>,
}

impl ProfileDefinition {
    pub fn new(url: Url, version: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            url,
            version: version.into(),
            name: None,
            resource_type: resource_type.into(),
            base: None,
            differential: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_base(mut self, base: ProfileReference) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_constraint(mut self, constraint: ElementConstraint) -> Self {
        self.differential.push(constraint);
        self
    }

    pub fn reference(&self) -> ProfileReference {
        ProfileReference::new(self.url.clone()).with_version(&self.version)
    }
}

impl fmt::Display for ProfileDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{} ({})", self.url, self.version, self.resource_type)
    }
}

impl ElementConstraint {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            min: None,
            max: None,
            types: None,
            binding: None,
            fixed: None,
            pattern: None,
            slicing: None,
            invariants: None,
        }
    }

    pub fn with_cardinality(mut self, min: u32, max: impl Into<String>) -> Self {
        self.min = Some(min);
        self.max = Some(max.into());
        self
    }

    pub fn with_min(mut self, min: u32) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: impl Into<String>) -> Self {
        self.max = Some(max.into());
        self
    }

    pub fn with_types(mut self, types: Vec<ElementType>) -> Self {
        self.types = Some(types);
        self
    }

    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.binding = Some(binding);
        self
    }

    pub fn with_fixed(mut self, value: Value) -> Self {
        self.fixed = Some(value);
        self
    }

    pub fn with_pattern(mut self, value: Value) -> Self {
        self.pattern = Some(value);
        self
    }

    pub fn with_slicing(mut self, slicing: SlicingDefinition) -> Self {
        self.slicing = Some(slicing);
        self
    }

    pub fn with_invariants(mut self, invariants: Vec<Invariant>) -> Self {
        self.invariants = Some(invariants);
        self
    }
}
