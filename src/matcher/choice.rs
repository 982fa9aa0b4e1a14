//! Polymorphic ("choice") element matching.
//!
//! A choice element's path ends in `[x]`; the instance carries exactly one
//! type-suffixed field, e.g. `deceasedBoolean` for `Patient.deceased[x]`.

use serde_json::Value;

use super::{MatchOutcome, Occurrence, ParentMatch};
use crate::types::{ElementDefinition, Issue, IssueCode};

/// Field suffix for a type code: first letter upper-cased, e.g.
/// `boolean` -> `Boolean`, `CodeableConcept` -> `CodeableConcept`.
pub fn type_suffix(code: &str) -> String {
    let mut chars = code.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub(crate) fn match_choice<'a>(
    element: &ElementDefinition,
    parents: &[Occurrence<'a>],
) -> MatchOutcome<'a> {
    let name = element.name();
    let base = name.strip_suffix("[x]").unwrap_or(name);
    let mut outcome = MatchOutcome::default();

    for parent in parents {
        let base_path = format!("{}.{}", parent.path, name);
        let mut present: Vec<(String, String, &'a Value)> = Vec::new();

        if let Some(object) = parent.value.as_object() {
            for element_type in &element.types {
                let field = format!("{base}{}", type_suffix(&element_type.code));
                if let Some(value) = object.get(&field) {
                    present.push((field, element_type.code.clone(), value));
                }
            }
        }

        // Choice elements are mutually exclusive by construction; more than
        // one populated suffix is unrecoverable for this element.
        if present.len() > 1 {
            let fields = present
                .iter()
                .map(|(f, _, _)| f.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            outcome.issues.push(Issue::fatal(
                IssueCode::Structure,
                format!("{}.{base}", parent.path),
                format!("choice element has multiple populated types: {fields}"),
            ));
            outcome.groups.push(ParentMatch {
                base_path,
                occurrences: Vec::new(),
            });
            continue;
        }

        let occurrences = match present.pop() {
            Some((field, code, Value::Array(items))) => items
                .iter()
                .enumerate()
                .map(|(i, item)| Occurrence {
                    path: format!("{}.{field}[{i}]", parent.path),
                    value: item,
                    resolved_type: Some(code.clone()),
                })
                .collect(),
            Some((field, code, value)) => vec![Occurrence {
                path: format!("{}.{field}", parent.path),
                value,
                resolved_type: Some(code),
            }],
            None => Vec::new(),
        };

        outcome.groups.push(ParentMatch {
            base_path,
            occurrences,
        });
    }

    outcome
}
