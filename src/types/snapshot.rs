use std::collections::HashMap;

use super::{ElementDefinition, ProfileReference};

/// The fully resolved, flattened element list of one profile after merging
/// its entire derivation chain. Element paths are unique and form a tree:
/// every non-root path's parent path is also present.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSnapshot {
    profile: ProfileReference,
    resource_type: String,
    elements: Vec<ElementDefinition>,
    index: HashMap<String, usize>,
}

impl ResolvedSnapshot {
    /// Builds a snapshot, enforcing the path-uniqueness and tree invariants.
    pub fn new(
        profile: ProfileReference,
        resource_type: impl Into<String>,
        elements: Vec<ElementDefinition>,
    ) -> crate::Result<Self> {
        let resource_type = resource_type.into();
        let mut index = HashMap::with_capacity(elements.len());

        for (i, element) in elements.iter().enumerate() {
            element.validate()?;
            if index.insert(element.path.clone(), i).is_some() {
                return Err(crate::FhirGuardError::invalid_constraint(
                    &element.path,
                    "duplicate element path in snapshot",
                ));
            }
        }

        for element in &elements {
            if let Some(parent) = element.parent_path()
                && !index.contains_key(parent)
            {
                return Err(crate::FhirGuardError::invalid_constraint(
                    &element.path,
                    format!("parent path '{parent}' missing from snapshot"),
                ));
            }
        }

        Ok(Self {
            profile,
            resource_type,
            elements,
            index,
        })
    }

    pub fn profile(&self) -> &ProfileReference {
        &self.profile
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Elements in tree order.
    pub fn elements(&self) -> &[ElementDefinition] {
        &self.elements
    }

    pub fn get(&self, path: &str) -> Option<&ElementDefinition> {
        self.index.get(path).map(|&i| &self.elements[i])
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn profile_ref() -> ProfileReference {
        ProfileReference::new(Url::parse("http://example.org/fhir/StructureDefinition/p").unwrap())
    }

    #[test]
    fn rejects_duplicate_paths() {
        let elements = vec![
            ElementDefinition::new("Patient"),
            ElementDefinition::new("Patient.name"),
            ElementDefinition::new("Patient.name"),
        ];
        assert!(ResolvedSnapshot::new(profile_ref(), "Patient", elements).is_err());
    }

    #[test]
    fn rejects_orphan_paths() {
        let elements = vec![
            ElementDefinition::new("Patient"),
            ElementDefinition::new("Patient.name.given"),
        ];
        assert!(ResolvedSnapshot::new(profile_ref(), "Patient", elements).is_err());
    }

    #[test]
    fn indexes_by_path() {
        let elements = vec![
            ElementDefinition::new("Patient"),
            ElementDefinition::new("Patient.name").with_cardinality(0, None),
        ];
        let snapshot = ResolvedSnapshot::new(profile_ref(), "Patient", elements).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.get("Patient.name").is_some());
        assert!(snapshot.get("Patient.gender").is_none());
    }
}
