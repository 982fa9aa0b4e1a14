//! Differential merging: applying a profile's differential constraints onto
//! its base snapshot. Child constraints narrow, never widen, ancestor
//! constraints.

use crate::types::{Cardinality, ElementConstraint, ElementDefinition, ElementType};
use crate::{FhirGuardError, Result};

/// Applies each differential constraint, by path, onto the base element
/// list. Returns the merged element list in tree order.
pub fn apply_differential(
    mut elements: Vec<ElementDefinition>,
    differential: &[ElementConstraint],
) -> Result<Vec<ElementDefinition>> {
    for constraint in differential {
        match elements.iter().position(|e| e.path == constraint.path) {
            Some(i) => merge_element(&mut elements[i], constraint)?,
            None => {
                let element = new_element(constraint)?;
                let at = insertion_point(&elements, constraint)?;
                elements.insert(at, element);
            }
        }
    }
    Ok(elements)
}

fn merge_element(element: &mut ElementDefinition, constraint: &ElementConstraint) -> Result<()> {
    let min = constraint.min.unwrap_or(element.cardinality.min);
    let max = match &constraint.max {
        Some(max) => parse_max(&constraint.path, max)?,
        None => element.cardinality.max,
    };

    if min < element.cardinality.min {
        return Err(FhirGuardError::invalid_constraint(
            &constraint.path,
            format!(
                "cardinality min {} widens inherited min {}",
                min, element.cardinality.min
            ),
        ));
    }
    match (max, element.cardinality.max) {
        (None, Some(inherited)) => {
            return Err(FhirGuardError::invalid_constraint(
                &constraint.path,
                format!("cardinality max * widens inherited max {inherited}"),
            ));
        }
        (Some(new), Some(inherited)) if new > inherited => {
            return Err(FhirGuardError::invalid_constraint(
                &constraint.path,
                format!("cardinality max {new} widens inherited max {inherited}"),
            ));
        }
        _ => {}
    }
    if let Some(max) = max
        && min > max
    {
        return Err(FhirGuardError::invalid_constraint(
            &constraint.path,
            format!("cardinality min {min} exceeds max {max}"),
        ));
    }
    element.cardinality = Cardinality::new(min, max);

    if let Some(types) = &constraint.types {
        element.types = intersect_types(&constraint.path, &element.types, types)?;
    }

    // Override-only fields: applied only when explicitly present.
    if let Some(binding) = &constraint.binding {
        element.binding = Some(binding.clone());
    }
    if let Some(fixed) = &constraint.fixed {
        element.fixed = Some(fixed.clone());
    }
    if let Some(pattern) = &constraint.pattern {
        element.pattern = Some(pattern.clone());
    }
    if let Some(slicing) = &constraint.slicing {
        element.slicing = Some(slicing.clone());
    }
    if let Some(invariants) = &constraint.invariants {
        element.invariants = invariants.clone();
    }

    Ok(())
}

/// Restricts the inherited type set to the intersection with the
/// differential's types. An unconstrained (empty) inherited set accepts the
/// differential set as-is; the differential entry wins within the
/// intersection so it can add target-profile restrictions.
fn intersect_types(
    path: &str,
    inherited: &[ElementType],
    narrowed: &[ElementType],
) -> Result<Vec<ElementType>> {
    if inherited.is_empty() {
        return Ok(narrowed.to_vec());
    }

    let intersection: Vec<ElementType> = narrowed
        .iter()
        .filter(|t| inherited.iter().any(|i| i.code == t.code))
        .cloned()
        .collect();

    if intersection.is_empty() {
        return Err(FhirGuardError::invalid_constraint(
            path,
            format!(
                "type constraint [{}] has no overlap with inherited types [{}]",
                codes(narrowed),
                codes(inherited)
            ),
        ));
    }
    Ok(intersection)
}

fn codes(types: &[ElementType]) -> String {
    types
        .iter()
        .map(|t| t.code.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builds a snapshot element for a path the base does not define (e.g. a
/// freshly sliced extension child).
fn new_element(constraint: &ElementConstraint) -> Result<ElementDefinition> {
    let max = match &constraint.max {
        Some(max) => parse_max(&constraint.path, max)?,
        None => Some(1),
    };
    let mut element = ElementDefinition::new(&constraint.path)
        .with_cardinality(constraint.min.unwrap_or(0), max);
    if let Some(types) = &constraint.types {
        element.types = types.clone();
    }
    element.binding = constraint.binding.clone();
    element.fixed = constraint.fixed.clone();
    element.pattern = constraint.pattern.clone();
    element.slicing = constraint.slicing.clone();
    element.invariants = constraint.invariants.clone().unwrap_or_default();
    Ok(element)
}

/// New paths must extend the existing tree; they are inserted directly
/// after their parent's subtree to keep tree order.
fn insertion_point(elements: &[ElementDefinition], constraint: &ElementConstraint) -> Result<usize> {
    let parent = constraint.path.rsplit_once('.').map(|(p, _)| p).ok_or_else(|| {
        FhirGuardError::invalid_constraint(
            &constraint.path,
            "differential cannot introduce a new root element",
        )
    })?;

    let parent_index = elements
        .iter()
        .position(|e| e.path == parent)
        .ok_or_else(|| {
            FhirGuardError::invalid_constraint(
                &constraint.path,
                format!("parent path '{parent}' not present in base snapshot"),
            )
        })?;

    let subtree_prefix = format!("{parent}.");
    let mut at = parent_index + 1;
    while at < elements.len() && elements[at].path.starts_with(&subtree_prefix) {
        at += 1;
    }
    Ok(at)
}

/// FHIR-style max cardinality: a non-negative integer rendered as a string,
/// or `*` for unbounded.
fn parse_max(path: &str, max: &str) -> Result<Option<u32>> {
    if max == "*" {
        return Ok(None);
    }
    max.parse::<u32>().map(Some).map_err(|_| {
        FhirGuardError::invalid_constraint(path, format!("invalid max cardinality '{max}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Vec<ElementDefinition> {
        vec![
            ElementDefinition::new("Patient").with_cardinality(0, None),
            ElementDefinition::new("Patient.name")
                .with_cardinality(0, None)
                .with_type(ElementType::new("HumanName")),
            ElementDefinition::new("Patient.name.given")
                .with_cardinality(0, None)
                .with_type(ElementType::new("string")),
            ElementDefinition::new("Patient.gender")
                .with_cardinality(0, Some(1))
                .with_type(ElementType::new("code")),
        ]
    }

    #[test]
    fn empty_differential_is_identity() {
        let merged = apply_differential(base(), &[]).unwrap();
        assert_eq!(merged, base());
    }

    #[test]
    fn narrows_cardinality() {
        let differential = [ElementConstraint::new("Patient.name").with_cardinality(1, "1")];
        let merged = apply_differential(base(), &differential).unwrap();
        let name = merged.iter().find(|e| e.path == "Patient.name").unwrap();
        assert_eq!(name.cardinality, Cardinality::new(1, Some(1)));
    }

    #[test]
    fn widening_min_fails() {
        let narrowed = apply_differential(
            base(),
            &[ElementConstraint::new("Patient.name").with_cardinality(1, "2")],
        )
        .unwrap();
        let widened = apply_differential(
            narrowed,
            &[ElementConstraint::new("Patient.name").with_min(0)],
        );
        assert!(matches!(
            widened,
            Err(FhirGuardError::InvalidConstraint { .. })
        ));
    }

    #[test]
    fn widening_max_fails() {
        let result = apply_differential(
            base(),
            &[ElementConstraint::new("Patient.gender").with_max("*")],
        );
        assert!(matches!(
            result,
            Err(FhirGuardError::InvalidConstraint { .. })
        ));
    }

    #[test]
    fn type_intersection_narrows() {
        let base = vec![
            ElementDefinition::new("Observation").with_cardinality(0, None),
            ElementDefinition::new("Observation.value[x]")
                .with_cardinality(0, Some(1))
                .with_type(ElementType::new("Quantity"))
                .with_type(ElementType::new("string")),
        ];
        let differential =
            [ElementConstraint::new("Observation.value[x]")
                .with_types(vec![ElementType::new("Quantity")])];
        let merged = apply_differential(base, &differential).unwrap();
        let value = merged
            .iter()
            .find(|e| e.path == "Observation.value[x]")
            .unwrap();
        assert_eq!(value.types.len(), 1);
        assert_eq!(value.types[0].code, "Quantity");
    }

    #[test]
    fn empty_type_intersection_fails() {
        let differential = [ElementConstraint::new("Patient.gender")
            .with_types(vec![ElementType::new("boolean")])];
        let result = apply_differential(base(), &differential);
        assert!(matches!(
            result,
            Err(FhirGuardError::InvalidConstraint { .. })
        ));
    }

    #[test]
    fn new_path_inserted_after_parent_subtree() {
        let differential = [ElementConstraint::new("Patient.name.family")
            .with_types(vec![ElementType::new("string")])];
        let merged = apply_differential(base(), &differential).unwrap();
        let paths: Vec<&str> = merged.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "Patient",
                "Patient.name",
                "Patient.name.given",
                "Patient.name.family",
                "Patient.gender",
            ]
        );
    }

    #[test]
    fn new_path_without_parent_fails() {
        let differential = [ElementConstraint::new("Patient.contact.name")];
        assert!(apply_differential(base(), &differential).is_err());
    }
}
