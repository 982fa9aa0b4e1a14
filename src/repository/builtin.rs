//! Built-in intrinsic element tables for core resource types.
//!
//! A profile with no base reference takes its snapshot from this table
//! rather than re-deriving it. Embedders can register further core types on
//! the repository.

use std::collections::HashMap;

use crate::types::{Binding, BindingStrength, ElementDefinition, ElementType};

const ADMINISTRATIVE_GENDER: &str = "http://hl7.org/fhir/ValueSet/administrative-gender";
const OBSERVATION_STATUS: &str = "http://hl7.org/fhir/ValueSet/observation-status";
const MARITAL_STATUS: &str = "http://hl7.org/fhir/ValueSet/marital-status";

pub fn core_type_table() -> HashMap<String, Vec<ElementDefinition>> {
    let mut table = HashMap::new();
    table.insert("Patient".to_string(), patient_elements());
    table.insert("Observation".to_string(), observation_elements());
    table
}

fn patient_elements() -> Vec<ElementDefinition> {
    vec![
        ElementDefinition::new("Patient").with_cardinality(0, None),
        ElementDefinition::new("Patient.id")
            .with_cardinality(0, Some(1))
            .with_type(ElementType::new("id")),
        ElementDefinition::new("Patient.extension")
            .with_cardinality(0, None)
            .with_type(ElementType::new("Extension")),
        ElementDefinition::new("Patient.identifier")
            .with_cardinality(0, None)
            .with_type(ElementType::new("Identifier")),
        ElementDefinition::new("Patient.identifier.system")
            .with_cardinality(0, Some(1))
            .with_type(ElementType::new("uri")),
        ElementDefinition::new("Patient.identifier.value")
            .with_cardinality(0, Some(1))
            .with_type(ElementType::new("string")),
        ElementDefinition::new("Patient.active")
            .with_cardinality(0, Some(1))
            .with_type(ElementType::new("boolean")),
        ElementDefinition::new("Patient.name")
            .with_cardinality(0, None)
            .with_type(ElementType::new("HumanName")),
        ElementDefinition::new("Patient.name.use")
            .with_cardinality(0, Some(1))
            .with_type(ElementType::new("code")),
        ElementDefinition::new("Patient.name.family")
            .with_cardinality(0, Some(1))
            .with_type(ElementType::new("string")),
        ElementDefinition::new("Patient.name.given")
            .with_cardinality(0, None)
            .with_type(ElementType::new("string")),
        ElementDefinition::new("Patient.telecom")
            .with_cardinality(0, None)
            .with_type(ElementType::new("ContactPoint")),
        ElementDefinition::new("Patient.gender")
            .with_cardinality(0, Some(1))
            .with_type(ElementType::new("code"))
            .with_binding(Binding::new(ADMINISTRATIVE_GENDER, BindingStrength::Required)),
        ElementDefinition::new("Patient.birthDate")
            .with_cardinality(0, Some(1))
            .with_type(ElementType::new("date")),
        ElementDefinition::new("Patient.deceased[x]")
            .with_cardinality(0, Some(1))
            .with_type(ElementType::new("boolean"))
            .with_type(ElementType::new("dateTime")),
        ElementDefinition::new("Patient.maritalStatus")
            .with_cardinality(0, Some(1))
            .with_type(ElementType::new("CodeableConcept"))
            .with_binding(Binding::new(MARITAL_STATUS, BindingStrength::Extensible)),
        ElementDefinition::new("Patient.multipleBirth[x]")
            .with_cardinality(0, Some(1))
            .with_type(ElementType::new("boolean"))
            .with_type(ElementType::new("integer")),
    ]
}

fn observation_elements() -> Vec<ElementDefinition> {
    vec![
        ElementDefinition::new("Observation").with_cardinality(0, None),
        ElementDefinition::new("Observation.id")
            .with_cardinality(0, Some(1))
            .with_type(ElementType::new("id")),
        ElementDefinition::new("Observation.extension")
            .with_cardinality(0, None)
            .with_type(ElementType::new("Extension")),
        ElementDefinition::new("Observation.status")
            .with_cardinality(1, Some(1))
            .with_type(ElementType::new("code"))
            .with_binding(Binding::new(OBSERVATION_STATUS, BindingStrength::Required)),
        ElementDefinition::new("Observation.code")
            .with_cardinality(1, Some(1))
            .with_type(ElementType::new("CodeableConcept")),
        ElementDefinition::new("Observation.subject")
            .with_cardinality(0, Some(1))
            .with_type(ElementType::new("Reference")),
        ElementDefinition::new("Observation.value[x]")
            .with_cardinality(0, Some(1))
            .with_type(ElementType::new("Quantity"))
            .with_type(ElementType::new("CodeableConcept"))
            .with_type(ElementType::new("string"))
            .with_type(ElementType::new("boolean"))
            .with_type(ElementType::new("integer"))
            .with_type(ElementType::new("Range")),
        ElementDefinition::new("Observation.component")
            .with_cardinality(0, None)
            .with_type(ElementType::new("BackboneElement")),
        ElementDefinition::new("Observation.component.code")
            .with_cardinality(1, Some(1))
            .with_type(ElementType::new("CodeableConcept")),
        ElementDefinition::new("Observation.component.value[x]")
            .with_cardinality(0, Some(1))
            .with_type(ElementType::new("Quantity"))
            .with_type(ElementType::new("CodeableConcept"))
            .with_type(ElementType::new("string")),
    ]
}
