use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ProfileReference;

/// Name of the implicit catch-all slice. Under open slicing, occurrences
/// matching no named slice fall into this slice when it is declared.
pub const DEFAULT_SLICE: &str = "@default";

/// Partitioning rule for a repeating element's occurrences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlicingDefinition {
    pub discriminator: Vec<Discriminator>,
    #[serde(default)]
    pub ordered: bool,
    pub rules: SlicingRules,
    pub slices: Vec<SliceDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discriminator {
    pub kind: DiscriminatorKind,
    /// Dotted projection path relative to the occurrence; empty or `$this`
    /// means the occurrence itself.
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscriminatorKind {
    /// Projected value must equal the slice's expected value.
    Value,
    /// Projected value's runtime type must equal the expected type name.
    Type,
    /// Projected value must conform to the expected profile.
    Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlicingRules {
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "closed")]
    Closed,
    #[serde(rename = "openAtEnd")]
    OpenAtEnd,
}

/// One named slice: discriminator expectations plus its own constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceDefinition {
    pub name: String,
    #[serde(default)]
    pub min: u32,
    /// `None` means unbounded.
    pub max: Option<u32>,
    /// Expected discriminator keys, aligned by position with the slicing's
    /// discriminator list. A missing entry matches anything.
    #[serde(default)]
    pub expected: Vec<DiscriminatorKey>,
    pub fixed: Option<Value>,
    pub pattern: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscriminatorKey {
    Value(Value),
    Type(String),
    Profile(ProfileReference),
}

impl SlicingDefinition {
    pub fn new(rules: SlicingRules) -> Self {
        Self {
            discriminator: Vec::new(),
            ordered: false,
            rules,
            slices: Vec::new(),
        }
    }

    pub fn with_ordered(mut self, ordered: bool) -> Self {
        self.ordered = ordered;
        self
    }

    pub fn with_discriminator(mut self, kind: DiscriminatorKind, path: impl Into<String>) -> Self {
        self.discriminator.push(Discriminator {
            kind,
            path: path.into(),
        });
        self
    }

    pub fn with_slice(mut self, slice: SliceDefinition) -> Self {
        self.slices.push(slice);
        self
    }

    pub fn is_closed(&self) -> bool {
        self.rules == SlicingRules::Closed
    }

    pub fn default_slice(&self) -> Option<&SliceDefinition> {
        self.slices.iter().find(|s| s.name == DEFAULT_SLICE)
    }

    /// Named slices in declaration order, excluding the default slice.
    pub fn named_slices(&self) -> impl Iterator<Item = &SliceDefinition> {
        self.slices.iter().filter(|s| s.name != DEFAULT_SLICE)
    }

    pub fn validate(&self, path: &str) -> crate::Result<()> {
        if self.discriminator.is_empty() {
            return Err(crate::FhirGuardError::invalid_constraint(
                path,
                "slicing must have at least one discriminator",
            ));
        }
        for slice in &self.slices {
            if slice.name.is_empty() {
                return Err(crate::FhirGuardError::invalid_constraint(
                    path,
                    "slice name cannot be empty",
                ));
            }
            if let Some(max) = slice.max
                && slice.min > max
            {
                return Err(crate::FhirGuardError::invalid_constraint(
                    path,
                    format!("slice '{}' min {} exceeds max {}", slice.name, slice.min, max),
                ));
            }
        }
        Ok(())
    }
}

impl SliceDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min: 0,
            max: None,
            expected: Vec::new(),
            fixed: None,
            pattern: None,
        }
    }

    pub fn with_cardinality(mut self, min: u32, max: Option<u32>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_expected(mut self, key: DiscriminatorKey) -> Self {
        self.expected.push(key);
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
}
