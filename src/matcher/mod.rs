//! Element path matching: enumerating the concrete instance nodes that
//! correspond to each abstract snapshot element.
//!
//! Matching never mutates the instance and never hard-fails; absence of a
//! match yields an empty occurrence list, which the constraint evaluator
//! interprets against cardinality.

pub mod choice;
pub mod slicing;

use serde_json::Value;

use crate::types::{ElementDefinition, Issue};

/// One concrete instance node matched to a snapshot element.
#[derive(Debug, Clone)]
pub struct Occurrence<'a> {
    /// Concrete dotted path with array indices, e.g. `Patient.name[0].given[1]`.
    pub path: String,
    pub value: &'a Value,
    /// For choice elements: the type code the present suffix resolved to.
    pub resolved_type: Option<String>,
}

impl<'a> Occurrence<'a> {
    pub fn new(path: impl Into<String>, value: &'a Value) -> Self {
        Self {
            path: path.into(),
            value,
            resolved_type: None,
        }
    }
}

/// Occurrences matched under one parent occurrence. Cardinality is judged
/// per parent context, so groups are kept apart.
#[derive(Debug, Clone)]
pub struct ParentMatch<'a> {
    /// Abstract path of the element under this parent, without an index for
    /// the element itself, e.g. `Patient.name[0].given`.
    pub base_path: String,
    pub occurrences: Vec<Occurrence<'a>>,
}

#[derive(Debug, Clone, Default)]
pub struct MatchOutcome<'a> {
    pub groups: Vec<ParentMatch<'a>>,
    pub issues: Vec<Issue>,
}

impl<'a> MatchOutcome<'a> {
    pub fn occurrences(&self) -> impl Iterator<Item = &Occurrence<'a>> {
        self.groups.iter().flat_map(|g| g.occurrences.iter())
    }

    pub fn into_occurrences(self) -> Vec<Occurrence<'a>> {
        self.groups
            .into_iter()
            .flat_map(|g| g.occurrences)
            .collect()
    }
}

/// Matches a snapshot element against the occurrences of its parent path.
pub fn match_element<'a>(
    element: &ElementDefinition,
    parents: &[Occurrence<'a>],
) -> MatchOutcome<'a> {
    if element.is_choice() {
        return choice::match_choice(element, parents);
    }

    let segment = element.name();
    let mut outcome = MatchOutcome::default();

    for parent in parents {
        let base_path = format!("{}.{}", parent.path, segment);
        let occurrences = match parent.value.as_object().and_then(|o| o.get(segment)) {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| Occurrence::new(format!("{base_path}[{i}]"), item))
                .collect(),
            Some(value) => vec![Occurrence::new(base_path.clone(), value)],
            None => Vec::new(),
        };
        outcome.groups.push(ParentMatch {
            base_path,
            occurrences,
        });
    }

    outcome
}
