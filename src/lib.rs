//! # FHIRGuard
//!
//! A Rust library for validating FHIR resource instances against
//! conformance profiles: versioned constraint sets that narrow a base
//! type's cardinalities, types, value-set bindings, and invariants.
//!
//! ## Features
//!
//! - **Snapshot Resolution**: Merge a profile's differential onto its base
//!   through the full derivation chain, with cycle detection and caching
//! - **Structural Validation**: Walk a resource against the resolved
//!   element tree, including choice types and discriminator-based slicing
//! - **Complete Reports**: Every defect collected in one pass into an
//!   ordered, deduplicated, path-addressed report
//! - **Pluggable Collaborators**: Profile retrieval, terminology lookup,
//!   and invariant evaluation stay behind async traits
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fhirguard::{ProfileRepository, StaticProfileSource, ValidationEngine};
//!
//! # async fn example() -> fhirguard::Result<()> {
//! let source = Arc::new(StaticProfileSource::new());
//! let repository = Arc::new(ProfileRepository::new(source));
//! let engine = ValidationEngine::new(repository);
//!
//! let resource = serde_json::json!({"resourceType": "Patient", "id": "example"});
//! let url = url::Url::parse("http://example.org/fhir/StructureDefinition/Patient-basic")?;
//! let report = engine.validate(&resource, &url, Some("1.0.0")).await?;
//! assert!(report.valid);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod evaluator;
pub mod matcher;
pub mod provider;
pub mod report;
pub mod repository;
pub mod types;

pub use engine::{MAX_PROFILE_DEPTH, ValidationEngine};
pub use error::{FhirGuardError, Result};
pub use evaluator::ConstraintEvaluator;
pub use provider::{
    ExpressionEvaluator, ProfileProbe, ProfileSource, StaticProfileSource, TerminologyResolver,
};
pub use report::ReportBuilder;
pub use repository::ProfileRepository;
pub use types::{
    Binding, BindingStrength, Cardinality, ElementConstraint, ElementDefinition, ElementType,
    Invariant, Issue, IssueCode, ProfileDefinition, ProfileReference, ResolvedSnapshot, Severity,
    SliceDefinition, SlicingDefinition, SlicingRules, ValidationReport,
};
