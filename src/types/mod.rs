pub mod element;
pub mod issue;
pub mod profile;
pub mod slicing;
pub mod snapshot;

pub use element::{
    Binding, BindingStrength, Cardinality, ElementDefinition, ElementType, Invariant,
    ProfileReference,
};
pub use issue::{Issue, IssueCode, Severity, ValidationReport};
pub use profile::{ElementConstraint, ProfileDefinition};
pub use slicing::{
    DEFAULT_SLICE, Discriminator, DiscriminatorKey, DiscriminatorKind, SliceDefinition,
    SlicingDefinition, SlicingRules,
};
pub use snapshot::ResolvedSnapshot;
