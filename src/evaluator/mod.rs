//! Constraint evaluation: cardinality, type conformance, fixed/pattern
//! values, value-set bindings, and declarative invariants.
//!
//! Evaluation never short-circuits: all applicable checks run and every
//! resulting issue is collected, so one validation call surfaces the
//! complete defect set.

pub mod primitives;

use serde_json::Value;
use std::sync::Arc;

use crate::matcher::slicing::PartitionOutcome;
use crate::matcher::{MatchOutcome, Occurrence, ParentMatch};
use crate::provider::{ExpressionEvaluator, ProfileProbe, TerminologyResolver};
use crate::types::{
    Binding, BindingStrength, ElementDefinition, Issue, IssueCode, SlicingDefinition,
};

#[derive(Default, Clone)]
pub struct ConstraintEvaluator {
    terminology: Option<Arc<dyn TerminologyResolver>>,
    expressions: Option<Arc<dyn ExpressionEvaluator>>,
}

impl ConstraintEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_terminology(mut self, terminology: Arc<dyn TerminologyResolver>) -> Self {
        self.terminology = Some(terminology);
        self
    }

    pub fn with_expressions(mut self, expressions: Arc<dyn ExpressionEvaluator>) -> Self {
        self.expressions = Some(expressions);
        self
    }

    /// Evaluates every applicable constraint of one snapshot element against
    /// its matched occurrences. `partitions` aligns with `outcome.groups`
    /// for sliced elements and is empty otherwise.
    pub async fn evaluate<'a>(
        &self,
        element: &ElementDefinition,
        outcome: &MatchOutcome<'a>,
        partitions: &[PartitionOutcome<'a>],
        probe: &dyn ProfileProbe,
    ) -> Vec<Issue> {
        let mut issues = Vec::new();

        for group in &outcome.groups {
            check_cardinality(element, group, &mut issues);
        }

        for occurrence in outcome.occurrences() {
            self.check_types(element, occurrence, probe, &mut issues)
                .await;
            check_fixed_and_pattern(
                element.fixed.as_ref(),
                element.pattern.as_ref(),
                occurrence,
                &mut issues,
            );
            if let Some(binding) = &element.binding {
                self.check_binding(binding, occurrence, &mut issues).await;
            }
            self.check_invariants(element, occurrence, &mut issues)
                .await;
        }

        if let Some(slicing) = &element.slicing {
            for (group, partition) in outcome.groups.iter().zip(partitions) {
                check_slices(slicing, group, partition, &mut issues);
            }
        }

        issues
    }

    async fn check_types(
        &self,
        element: &ElementDefinition,
        occurrence: &Occurrence<'_>,
        probe: &dyn ProfileProbe,
        issues: &mut Vec<Issue>,
    ) {
        if element.types.is_empty() {
            return;
        }

        let matched = match &occurrence.resolved_type {
            // Choice occurrences already carry the type their suffix named;
            // the value must still inhabit it.
            Some(code) => element
                .types
                .iter()
                .find(|t| &t.code == code)
                .filter(|t| primitives::value_matches_type(&t.code, occurrence.value)),
            None => element
                .types
                .iter()
                .find(|t| primitives::value_matches_type(&t.code, occurrence.value)),
        };

        match matched {
            None => {
                let allowed = element
                    .types
                    .iter()
                    .map(|t| t.code.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                issues.push(Issue::error(
                    IssueCode::Structure,
                    &occurrence.path,
                    format!(
                        "value of type '{}' is not permitted here (allowed: {allowed})",
                        primitives::runtime_type_name(occurrence.value)
                    ),
                ));
            }
            Some(element_type) => {
                if let Some(target) = &element_type.target_profile
                    && !probe.conforms(occurrence.value, target).await
                {
                    issues.push(Issue::error(
                        IssueCode::Structure,
                        &occurrence.path,
                        format!("value does not conform to profile '{target}'"),
                    ));
                }
            }
        }
    }

    async fn check_binding(
        &self,
        binding: &Binding,
        occurrence: &Occurrence<'_>,
        issues: &mut Vec<Issue>,
    ) {
        if matches!(
            binding.strength,
            BindingStrength::Preferred | BindingStrength::Example
        ) {
            return;
        }

        let codings = extract_codings(occurrence.value);
        if codings.is_empty() {
            return;
        }

        let Some(terminology) = &self.terminology else {
            issues.push(Issue::information(
                IssueCode::CodeInvalid,
                &occurrence.path,
                "binding could not be evaluated: no terminology resolver configured",
            ));
            return;
        };

        let mut member = false;
        for (system, code) in &codings {
            match terminology
                .is_member_of(&binding.value_set, code, system.as_deref())
                .await
            {
                Ok(true) => {
                    member = true;
                    break;
                }
                Ok(false) => {}
                Err(error) => {
                    issues.push(Issue::information(
                        IssueCode::CodeInvalid,
                        &occurrence.path,
                        format!("binding could not be evaluated: {error}"),
                    ));
                    return;
                }
            }
        }
        if member {
            return;
        }

        let codes = codings
            .iter()
            .map(|(_, code)| format!("'{code}'"))
            .collect::<Vec<_>>()
            .join(", ");
        let message = format!("code {codes} not found in value set '{}'", binding.value_set);
        match binding.strength {
            BindingStrength::Required => {
                issues.push(Issue::error(IssueCode::CodeInvalid, &occurrence.path, message));
            }
            BindingStrength::Extensible => {
                issues.push(Issue::warning(IssueCode::CodeInvalid, &occurrence.path, message));
            }
            BindingStrength::Preferred | BindingStrength::Example => {}
        }
    }

    async fn check_invariants(
        &self,
        element: &ElementDefinition,
        occurrence: &Occurrence<'_>,
        issues: &mut Vec<Issue>,
    ) {
        if element.invariants.is_empty() {
            return;
        }

        let Some(expressions) = &self.expressions else {
            for invariant in &element.invariants {
                issues.push(Issue::information(
                    IssueCode::Invariant,
                    &occurrence.path,
                    format!(
                        "invariant '{}' could not be evaluated: no expression evaluator configured",
                        invariant.key
                    ),
                ));
            }
            return;
        };

        for invariant in &element.invariants {
            match expressions
                .evaluate(&invariant.expression, occurrence.value)
                .await
            {
                Ok(true) => {}
                Ok(false) => {
                    let human = invariant
                        .human
                        .as_deref()
                        .unwrap_or(&invariant.expression);
                    issues.push(Issue::new(
                        invariant.severity,
                        IssueCode::Invariant,
                        &occurrence.path,
                        format!("{}: {human}", invariant.key),
                    ));
                }
                Err(error) => {
                    issues.push(Issue::information(
                        IssueCode::Invariant,
                        &occurrence.path,
                        format!("invariant '{}' could not be evaluated: {error}", invariant.key),
                    ));
                }
            }
        }
    }
}

fn check_cardinality(element: &ElementDefinition, group: &ParentMatch<'_>, issues: &mut Vec<Issue>) {
    let count = group.occurrences.len() as u32;
    if count < element.cardinality.min {
        issues.push(Issue::error(
            IssueCode::Cardinality,
            &group.base_path,
            format!(
                "too few occurrences: expected at least {}, found {count}",
                element.cardinality.min
            ),
        ));
    }
    if let Some(max) = element.cardinality.max
        && count > max
    {
        issues.push(Issue::error(
            IssueCode::Cardinality,
            &group.base_path,
            format!("too many occurrences: expected at most {max}, found {count}"),
        ));
    }
}

fn check_fixed_and_pattern(
    fixed: Option<&Value>,
    pattern: Option<&Value>,
    occurrence: &Occurrence<'_>,
    issues: &mut Vec<Issue>,
) {
    if let Some(fixed) = fixed
        && occurrence.value != fixed
    {
        issues.push(Issue::error(
            IssueCode::Value,
            &occurrence.path,
            format!("value does not equal fixed value {fixed}"),
        ));
    }
    if let Some(pattern) = pattern
        && !matches_pattern(pattern, occurrence.value)
    {
        issues.push(Issue::error(
            IssueCode::Value,
            &occurrence.path,
            format!("value does not match pattern {pattern}"),
        ));
    }
}

fn check_slices(
    slicing: &SlicingDefinition,
    group: &ParentMatch<'_>,
    partition: &PartitionOutcome<'_>,
    issues: &mut Vec<Issue>,
) {
    for slice in &slicing.slices {
        let occurrences = partition
            .partition(&slice.name)
            .map(|p| p.occurrences.as_slice())
            .unwrap_or(&[]);
        let count = occurrences.len() as u32;

        if count < slice.min {
            issues.push(Issue::error(
                IssueCode::Cardinality,
                &group.base_path,
                format!(
                    "slice '{}': too few occurrences: expected at least {}, found {count}",
                    slice.name, slice.min
                ),
            ));
        }
        if let Some(max) = slice.max
            && count > max
        {
            issues.push(Issue::error(
                IssueCode::Cardinality,
                &group.base_path,
                format!(
                    "slice '{}': too many occurrences: expected at most {max}, found {count}",
                    slice.name
                ),
            ));
        }

        for occurrence in occurrences {
            check_fixed_and_pattern(
                slice.fixed.as_ref(),
                slice.pattern.as_ref(),
                occurrence,
                issues,
            );
        }
    }
}

/// Structural subset equality: every populated field of the pattern must be
/// present and match; array pattern items must each be matched by some
/// instance item.
pub(crate) fn matches_pattern(pattern: &Value, value: &Value) -> bool {
    match (pattern, value) {
        (Value::Object(pattern), Value::Object(value)) => pattern
            .iter()
            .all(|(k, p)| value.get(k).is_some_and(|v| matches_pattern(p, v))),
        (Value::Array(pattern), Value::Array(value)) => pattern
            .iter()
            .all(|p| value.iter().any(|v| matches_pattern(p, v))),
        _ => pattern == value,
    }
}

/// Pulls coded values out of an occurrence for binding checks: a bare code
/// string, a Coding object, or a CodeableConcept's coding list.
fn extract_codings(value: &Value) -> Vec<(Option<String>, String)> {
    match value {
        Value::String(code) => vec![(None, code.clone())],
        Value::Object(object) => {
            if let Some(Value::Array(codings)) = object.get("coding") {
                codings.iter().flat_map(extract_codings).collect()
            } else if let Some(Value::String(code)) = object.get("code") {
                let system = object
                    .get("system")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                vec![(system, code.clone())]
            } else {
                Vec::new()
            }
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher;
    use crate::types::{ElementType, ProfileReference, Severity};
    use async_trait::async_trait;
    use serde_json::json;

    struct NoProbe;

    #[async_trait]
    impl ProfileProbe for NoProbe {
        async fn conforms(&self, _value: &Value, _target: &ProfileReference) -> bool {
            false
        }
    }

    struct FixedTerminology(bool);

    #[async_trait]
    impl TerminologyResolver for FixedTerminology {
        async fn is_member_of(
            &self,
            _value_set: &str,
            _code: &str,
            _system: Option<&str>,
        ) -> crate::Result<bool> {
            Ok(self.0)
        }
    }

    struct FailingTerminology;

    #[async_trait]
    impl TerminologyResolver for FailingTerminology {
        async fn is_member_of(
            &self,
            _value_set: &str,
            _code: &str,
            _system: Option<&str>,
        ) -> crate::Result<bool> {
            Err(crate::FhirGuardError::Source {
                message: "terminology service unavailable".to_string(),
            })
        }
    }

    async fn evaluate<'a>(
        evaluator: &ConstraintEvaluator,
        element: &ElementDefinition,
        resource: &'a Value,
    ) -> Vec<Issue> {
        let parents = [matcher::Occurrence::new("Patient", resource)];
        let outcome = matcher::match_element(element, &parents);
        evaluator.evaluate(element, &outcome, &[], &NoProbe).await
    }

    #[tokio::test]
    async fn missing_required_element_is_cardinality_error() {
        let element = ElementDefinition::new("Patient.name").with_cardinality(1, Some(1));
        let resource = json!({});
        let issues = evaluate(&ConstraintEvaluator::new(), &element, &resource).await;

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::Cardinality);
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[0].path, "Patient.name");
    }

    #[tokio::test]
    async fn too_many_occurrences_reported() {
        let element = ElementDefinition::new("Patient.name").with_cardinality(0, Some(1));
        let resource = json!({"name": [{"family": "a"}, {"family": "b"}]});
        let issues = evaluate(&ConstraintEvaluator::new(), &element, &resource).await;

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::Cardinality);
        assert!(issues[0].message.contains("too many"));
    }

    #[tokio::test]
    async fn type_mismatch_is_structure_error() {
        let element = ElementDefinition::new("Patient.active")
            .with_type(ElementType::new("boolean"));
        let resource = json!({"active": "yes"});
        let issues = evaluate(&ConstraintEvaluator::new(), &element, &resource).await;

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::Structure);
    }

    #[tokio::test]
    async fn fixed_value_mismatch_reported() {
        let element = ElementDefinition::new("Patient.gender").with_fixed(json!("female"));
        let resource = json!({"gender": "male"});
        let issues = evaluate(&ConstraintEvaluator::new(), &element, &resource).await;

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::Value);
    }

    #[tokio::test]
    async fn pattern_is_subset_equality() {
        let element = ElementDefinition::new("Patient.maritalStatus")
            .with_pattern(json!({"coding": [{"code": "M"}]}));
        let ok = json!({"maritalStatus": {
            "coding": [{"system": "http://x", "code": "M", "display": "Married"}],
            "text": "Married"
        }});
        let issues = evaluate(&ConstraintEvaluator::new(), &element, &ok).await;
        assert!(issues.is_empty());

        let bad = json!({"maritalStatus": {"coding": [{"code": "S"}]}});
        let issues = evaluate(&ConstraintEvaluator::new(), &element, &bad).await;
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::Value);
    }

    #[tokio::test]
    async fn required_binding_miss_is_error_extensible_is_warning() {
        let resource = json!({"gender": "unknown-code"});
        let evaluator =
            ConstraintEvaluator::new().with_terminology(Arc::new(FixedTerminology(false)));

        let required = ElementDefinition::new("Patient.gender").with_binding(Binding::new(
            "http://hl7.org/fhir/ValueSet/administrative-gender",
            BindingStrength::Required,
        ));
        let issues = evaluate(&evaluator, &required, &resource).await;
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[0].code, IssueCode::CodeInvalid);

        let extensible = ElementDefinition::new("Patient.gender").with_binding(Binding::new(
            "http://hl7.org/fhir/ValueSet/administrative-gender",
            BindingStrength::Extensible,
        ));
        let issues = evaluate(&evaluator, &extensible, &resource).await;
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[tokio::test]
    async fn preferred_binding_never_raises() {
        let resource = json!({"gender": "whatever"});
        let evaluator =
            ConstraintEvaluator::new().with_terminology(Arc::new(FixedTerminology(false)));
        let element = ElementDefinition::new("Patient.gender").with_binding(Binding::new(
            "http://hl7.org/fhir/ValueSet/administrative-gender",
            BindingStrength::Preferred,
        ));
        let issues = evaluate(&evaluator, &element, &resource).await;
        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn terminology_failure_downgrades_to_information() {
        let resource = json!({"gender": "female"});
        let evaluator =
            ConstraintEvaluator::new().with_terminology(Arc::new(FailingTerminology));
        let element = ElementDefinition::new("Patient.gender").with_binding(Binding::new(
            "http://hl7.org/fhir/ValueSet/administrative-gender",
            BindingStrength::Required,
        ));
        let issues = evaluate(&evaluator, &element, &resource).await;

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Information);
        assert!(issues[0].message.contains("could not be evaluated"));
    }

    #[tokio::test]
    async fn codeable_concept_codings_extracted() {
        let value = json!({
            "coding": [
                {"system": "http://loinc.org", "code": "1234-5"},
                {"code": "alt"}
            ],
            "text": "x"
        });
        let codings = extract_codings(&value);
        assert_eq!(codings.len(), 2);
        assert_eq!(codings[0].0.as_deref(), Some("http://loinc.org"));
        assert_eq!(codings[1], (None, "alt".to_string()));
    }
}
