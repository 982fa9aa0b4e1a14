//! Slice partitioning: distributing a repeating element's occurrences into
//! named slices by discriminator, declaration order, first match wins.

use serde_json::Value;

use super::{Occurrence, ParentMatch};
use crate::evaluator::primitives;
use crate::provider::ProfileProbe;
use crate::types::{
    Discriminator, DiscriminatorKey, DiscriminatorKind, Issue, IssueCode, SliceDefinition,
    SlicingDefinition, DEFAULT_SLICE,
};

/// Occurrences assigned to one slice.
#[derive(Debug, Clone)]
pub struct SlicePartition<'a> {
    pub name: String,
    pub occurrences: Vec<Occurrence<'a>>,
}

#[derive(Debug, Clone, Default)]
pub struct PartitionOutcome<'a> {
    pub partitions: Vec<SlicePartition<'a>>,
    /// Occurrences matching no slice under open slicing with no default
    /// slice. Not a defect; they count only toward the base element.
    pub unmatched: Vec<Occurrence<'a>>,
    pub issues: Vec<Issue>,
}

impl<'a> PartitionOutcome<'a> {
    pub fn partition(&self, name: &str) -> Option<&SlicePartition<'a>> {
        self.partitions.iter().find(|p| p.name == name)
    }
}

/// Partitions one parent group's occurrences.
pub async fn partition<'a>(
    slicing: &SlicingDefinition,
    group: &ParentMatch<'a>,
    probe: &dyn ProfileProbe,
) -> PartitionOutcome<'a> {
    let mut outcome = PartitionOutcome {
        partitions: slicing
            .slices
            .iter()
            .map(|s| SlicePartition {
                name: s.name.clone(),
                occurrences: Vec::new(),
            })
            .collect(),
        ..Default::default()
    };

    let mut last_assigned: Option<usize> = None;
    for occurrence in &group.occurrences {
        let mut assigned = None;
        for (index, slice) in slicing.named_slices().enumerate() {
            if matches_slice(&slicing.discriminator, slice, occurrence.value, probe).await {
                let partition = outcome
                    .partitions
                    .iter_mut()
                    .find(|p| p.name == slice.name)
                    .expect("partition exists for every declared slice");
                partition.occurrences.push(occurrence.clone());
                assigned = Some(index);
                break;
            }
        }
        if let Some(index) = assigned {
            // Ordered slicing: assigned occurrences must appear grouped in
            // slice declaration order.
            if slicing.ordered && last_assigned.is_some_and(|last| index < last) {
                outcome.issues.push(Issue::error(
                    IssueCode::Structure,
                    &occurrence.path,
                    "occurrence out of declared slice order",
                ));
            }
            last_assigned = Some(index);
            continue;
        }

        if slicing.is_closed() {
            outcome.issues.push(Issue::error(
                IssueCode::Structure,
                &occurrence.path,
                "occurrence does not match any slice of closed slicing",
            ));
        } else if slicing.default_slice().is_some() {
            let partition = outcome
                .partitions
                .iter_mut()
                .find(|p| p.name == DEFAULT_SLICE)
                .expect("default partition exists when default slice declared");
            partition.occurrences.push(occurrence.clone());
        } else {
            outcome.unmatched.push(occurrence.clone());
        }
    }

    outcome
}

/// All discriminators must agree for an occurrence to enter a slice; a
/// slice with no expectation for a discriminator matches it wildcard.
async fn matches_slice(
    discriminators: &[Discriminator],
    slice: &SliceDefinition,
    value: &Value,
    probe: &dyn ProfileProbe,
) -> bool {
    for (i, discriminator) in discriminators.iter().enumerate() {
        let Some(expected) = slice.expected.get(i) else {
            continue;
        };
        let projected = project(value, &discriminator.path);
        let matched = match (discriminator.kind, expected) {
            (DiscriminatorKind::Value, DiscriminatorKey::Value(expected)) => {
                projected.iter().any(|v| *v == expected)
            }
            (DiscriminatorKind::Type, DiscriminatorKey::Type(expected)) => projected
                .iter()
                .any(|v| primitives::value_matches_type(expected, v)),
            (DiscriminatorKind::Profile, DiscriminatorKey::Profile(expected)) => {
                let mut any = false;
                for v in &projected {
                    if probe.conforms(v, expected).await {
                        any = true;
                        break;
                    }
                }
                any
            }
            // Discriminator kind and expected key disagree; fail closed.
            _ => false,
        };
        if !matched {
            return false;
        }
    }
    true
}

/// Projects a dotted sub-path from an occurrence, fanning out over arrays.
/// An empty path or `$this` projects the occurrence itself.
pub fn project<'a>(value: &'a Value, path: &str) -> Vec<&'a Value> {
    if path.is_empty() || path == "$this" {
        return vec![value];
    }
    let mut current = vec![value];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for v in current {
            if let Some(child) = v.as_object().and_then(|o| o.get(segment)) {
                match child {
                    Value::Array(items) => next.extend(items.iter()),
                    _ => next.push(child),
                }
            }
        }
        current = next;
    }
    current
}
