mod common;

use std::sync::Arc;

use fhirguard::repository::builtin;
use fhirguard::{ElementConstraint, FhirGuardError, ProfileDefinition, ProfileReference};

use common::{patient_basic, patient_core, repository_with, url, PATIENT_BASIC_URL, PATIENT_CORE_URL};

#[tokio::test]
async fn empty_differential_resolves_to_intrinsic_snapshot() {
    let repository = repository_with(vec![patient_core()]).await;
    let snapshot = repository
        .resolve(&url(PATIENT_CORE_URL), Some("4.0.1"))
        .await
        .unwrap();

    let intrinsic = &builtin::core_type_table()["Patient"];
    assert_eq!(snapshot.elements(), intrinsic.as_slice());
    assert_eq!(snapshot.resource_type(), "Patient");
}

#[tokio::test]
async fn differential_narrowing_is_reflected() {
    let repository = repository_with(vec![patient_core(), patient_basic()]).await;
    let snapshot = repository
        .resolve(&url(PATIENT_BASIC_URL), Some("1.0.0"))
        .await
        .unwrap();

    let name = snapshot.get("Patient.name").unwrap();
    assert_eq!(name.cardinality.min, 1);
    assert_eq!(name.cardinality.max, Some(1));

    // Untouched elements keep the intrinsic definition.
    let birth_date = snapshot.get("Patient.birthDate").unwrap();
    assert_eq!(birth_date.cardinality.min, 0);
}

#[tokio::test]
async fn widening_fails_with_invalid_constraint() {
    let widened = ProfileDefinition::new(
        url("http://example.org/fhir/StructureDefinition/Patient-wide"),
        "1.0.0",
        "Patient",
    )
    .with_base(ProfileReference::new(url(PATIENT_BASIC_URL)).with_version("1.0.0"))
    .with_constraint(ElementConstraint::new("Patient.name").with_cardinality(0, "*"));

    let repository = repository_with(vec![patient_core(), patient_basic(), widened]).await;
    let result = repository
        .resolve(
            &url("http://example.org/fhir/StructureDefinition/Patient-wide"),
            Some("1.0.0"),
        )
        .await;

    assert!(matches!(
        result,
        Err(FhirGuardError::InvalidConstraint { .. })
    ));
}

#[tokio::test]
async fn three_level_chain_accumulates_narrowing() {
    let strict = ProfileDefinition::new(
        url("http://example.org/fhir/StructureDefinition/Patient-strict"),
        "1.0.0",
        "Patient",
    )
    .with_base(ProfileReference::new(url(PATIENT_BASIC_URL)).with_version("1.0.0"))
    .with_constraint(ElementConstraint::new("Patient.gender").with_min(1))
    .with_constraint(ElementConstraint::new("Patient.identifier").with_cardinality(1, "2"));

    let repository = repository_with(vec![patient_core(), patient_basic(), strict]).await;
    let snapshot = repository
        .resolve(
            &url("http://example.org/fhir/StructureDefinition/Patient-strict"),
            Some("1.0.0"),
        )
        .await
        .unwrap();

    // Ancestor narrowing survives.
    assert_eq!(snapshot.get("Patient.name").unwrap().cardinality.min, 1);
    // Own narrowing applies.
    assert_eq!(snapshot.get("Patient.gender").unwrap().cardinality.min, 1);
    assert_eq!(
        snapshot.get("Patient.identifier").unwrap().cardinality.max,
        Some(2)
    );
}

#[tokio::test]
async fn concurrent_resolution_shares_one_snapshot() {
    let repository = repository_with(vec![patient_core(), patient_basic()]).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let repository = Arc::clone(&repository);
        handles.push(tokio::spawn(async move {
            repository
                .resolve(&common::url(common::PATIENT_BASIC_URL), Some("1.0.0"))
                .await
                .unwrap()
        }));
    }

    let mut snapshots = Vec::new();
    for handle in handles {
        snapshots.push(handle.await.unwrap());
    }
    for snapshot in &snapshots[1..] {
        assert!(Arc::ptr_eq(&snapshots[0], snapshot));
    }
}

#[tokio::test]
async fn unversioned_reference_resolves() {
    let repository = repository_with(vec![patient_core(), patient_basic()]).await;
    let snapshot = repository
        .resolve(&url(PATIENT_BASIC_URL), None)
        .await
        .unwrap();
    assert_eq!(snapshot.profile().version.as_deref(), Some("1.0.0"));
}
