#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use url::Url;

use fhirguard::{
    Binding, BindingStrength, ElementConstraint, ExpressionEvaluator, ProfileDefinition,
    ProfileReference, ProfileRepository, Result, StaticProfileSource, TerminologyResolver,
    ValidationEngine,
};

pub const PATIENT_CORE_URL: &str = "http://hl7.org/fhir/StructureDefinition/Patient";
pub const PATIENT_BASIC_URL: &str = "http://example.org/fhir/StructureDefinition/Patient-basic";
pub const ADMINISTRATIVE_GENDER: &str = "http://hl7.org/fhir/ValueSet/administrative-gender";

pub fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

/// Root profile for the core Patient type: empty differential, snapshot
/// taken from the built-in table.
pub fn patient_core() -> ProfileDefinition {
    ProfileDefinition::new(url(PATIENT_CORE_URL), "4.0.1", "Patient")
}

/// `Patient-basic`: derives from core Patient, constrains `Patient.name`
/// to 1..1 and binds `Patient.gender` (required) to administrative-gender.
pub fn patient_basic() -> ProfileDefinition {
    ProfileDefinition::new(url(PATIENT_BASIC_URL), "1.0.0", "Patient")
        .with_base(ProfileReference::new(url(PATIENT_CORE_URL)).with_version("4.0.1"))
        .with_constraint(ElementConstraint::new("Patient.name").with_cardinality(1, "1"))
        .with_constraint(ElementConstraint::new("Patient.gender").with_binding(Binding::new(
            ADMINISTRATIVE_GENDER,
            BindingStrength::Required,
        )))
}

pub async fn repository_with(profiles: Vec<ProfileDefinition>) -> Arc<ProfileRepository> {
    let source = StaticProfileSource::new();
    for profile in profiles {
        source.register(profile).await;
    }
    Arc::new(ProfileRepository::new(Arc::new(source)))
}

pub async fn engine_with(profiles: Vec<ProfileDefinition>) -> ValidationEngine {
    ValidationEngine::new(repository_with(profiles).await)
}

/// Terminology resolver backed by a fixed membership table.
#[derive(Debug, Default)]
pub struct StaticTerminology {
    members: HashSet<(String, String)>,
}

impl StaticTerminology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_member(mut self, value_set: &str, code: &str) -> Self {
        self.members
            .insert((value_set.to_string(), code.to_string()));
        self
    }
}

#[async_trait]
impl TerminologyResolver for StaticTerminology {
    async fn is_member_of(
        &self,
        value_set: &str,
        code: &str,
        _system: Option<&str>,
    ) -> Result<bool> {
        Ok(self
            .members
            .contains(&(value_set.to_string(), code.to_string())))
    }
}

/// Expression evaluator answering from a fixed table; unknown expressions
/// evaluate to true.
#[derive(Debug, Default)]
pub struct StaticExpressions {
    results: HashMap<String, bool>,
}

impl StaticExpressions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(mut self, expression: &str, result: bool) -> Self {
        self.results.insert(expression.to_string(), result);
        self
    }
}

#[async_trait]
impl ExpressionEvaluator for StaticExpressions {
    async fn evaluate(&self, expression: &str, _context: &Value) -> Result<bool> {
        Ok(*self.results.get(expression).unwrap_or(&true))
    }
}

/// Gender terminology with the standard administrative-gender codes.
pub fn gender_terminology() -> StaticTerminology {
    StaticTerminology::new()
        .with_member(ADMINISTRATIVE_GENDER, "male")
        .with_member(ADMINISTRATIVE_GENDER, "female")
        .with_member(ADMINISTRATIVE_GENDER, "other")
        .with_member(ADMINISTRATIVE_GENDER, "unknown")
}
