use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::{Severity, SlicingDefinition};

/// A fully resolved snapshot node: one element of a profile's flattened
/// element tree after the whole derivation chain has been merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDefinition {
    /// Dotted path, e.g. `Patient.name.given`. Choice elements end in `[x]`.
    pub path: String,

    pub cardinality: Cardinality,

    /// Allowed types. Empty means unconstrained.
    #[serde(default)]
    pub types: Vec<ElementType>,

    pub binding: Option<Binding>,

    /// Exact-equality value constraint.
    pub fixed: Option<Value>,

    /// Subset-equality value constraint over populated fields.
    pub pattern: Option<Value>,

    pub slicing: Option<SlicingDefinition>,

    #[serde(default)]
    pub invariants: Vec<Invariant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cardinality {
    pub min: u32,
    /// `None` means unbounded.
    pub max: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementType {
    /// Primitive or complex type name, e.g. `string`, `CodeableConcept`.
    pub code: String,
    /// Profile the value must additionally conform to.
    pub target_profile: Option<ProfileReference>,
}

/// Canonical reference to a profile, optionally versioned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileReference {
    pub url: Url,
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub value_set: String,
    pub strength: BindingStrength,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingStrength {
    Required,
    Extensible,
    Preferred,
    Example,
}

/// Declarative boolean constraint over an element's subtree, evaluated by
/// the external expression evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invariant {
    pub key: String,
    pub severity: Severity,
    pub human: Option<String>,
    pub expression: String,
}

impl ElementDefinition {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            cardinality: Cardinality::default(),
            types: Vec::new(),
            binding: None,
            fixed: None,
            pattern: None,
            slicing: None,
            invariants: Vec::new(),
        }
    }

    pub fn with_cardinality(mut self, min: u32, max: Option<u32>) -> Self {
        self.cardinality = Cardinality { min, max };
        self
    }

    pub fn with_type(mut self, element_type: ElementType) -> Self {
        self.types.push(element_type);
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

    pub fn with_invariant(mut self, invariant: Invariant) -> Self {
        self.invariants.push(invariant);
        self
    }

    /// Final path segment, e.g. `given` for `Patient.name.given`.
    pub fn name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }

    /// Parent path, or `None` for a root element.
    pub fn parent_path(&self) -> Option<&str> {
        self.path.rsplit_once('.').map(|(parent, _)| parent)
    }

    pub fn is_root(&self) -> bool {
        !self.path.contains('.')
    }

    pub fn is_required(&self) -> bool {
        self.cardinality.min > 0
    }

    pub fn is_choice(&self) -> bool {
        self.path.ends_with("[x]")
    }

    pub fn is_sliced(&self) -> bool {
        self.slicing.is_some()
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.path.is_empty() {
            return Err(crate::FhirGuardError::invalid_constraint(
                "<root>",
                "element path cannot be empty",
            ));
        }
        if let Some(max) = self.cardinality.max
            && self.cardinality.min > max
        {
            return Err(crate::FhirGuardError::invalid_constraint(
                &self.path,
                format!(
                    "cardinality min {} exceeds max {}",
                    self.cardinality.min, max
                ),
            ));
        }
        if let Some(slicing) = &self.slicing {
            slicing.validate(&self.path)?;
        }
        Ok(())
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Self {
            min: 0,
            max: Some(1),
        }
    }
}

impl Cardinality {
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, count: usize) -> bool {
        count as u32 >= self.min && self.max.is_none_or(|max| count as u32 <= max)
    }

    pub fn max_display(&self) -> String {
        match self.max {
            Some(max) => max.to_string(),
            None => "*".to_string(),
        }
    }
}

impl ElementType {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            target_profile: None,
        }
    }

    pub fn with_target_profile(mut self, reference: ProfileReference) -> Self {
        self.target_profile = Some(reference);
        self
    }
}

impl ProfileReference {
    pub fn new(url: Url) -> Self {
        Self { url, version: None }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

impl std::fmt::Display for ProfileReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}|{}", self.url, version),
            None => write!(f, "{}", self.url),
        }
    }
}

impl Binding {
    pub fn new(value_set: impl Into<String>, strength: BindingStrength) -> Self {
        Self {
            value_set: value_set.into(),
            strength,
            description: None,
        }
    }
}

impl Invariant {
    pub fn new(key: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            severity: Severity::Error,
            human: None,
            expression: expression.into(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_human(mut self, human: impl Into<String>) -> Self {
        self.human = Some(human.into());
        self
    }
}
