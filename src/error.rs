use thiserror::Error;

/// Setup/configuration failures.
///
/// These mean validation could not even begin: the profile graph itself is
/// unusable. Instance-conformance defects are never errors; they are
/// collected as [`crate::Issue`] values in the report.
#[derive(Error, Debug)]
pub enum FhirGuardError {
    #[error("Profile not found: {url}|{version}")]
    ProfileNotFound { url: String, version: String },

    #[error("Cyclic profile derivation: {chain}")]
    CyclicDerivation { chain: String },

    #[error("Invalid constraint at '{path}': {message}")]
    InvalidConstraint { path: String, message: String },

    #[error("Unknown core type: {name}")]
    UnknownCoreType { name: String },

    #[error("Profile source error: {message}")]
    Source { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl FhirGuardError {
    pub fn profile_not_found(url: impl Into<String>, version: Option<&str>) -> Self {
        Self::ProfileNotFound {
            url: url.into(),
            version: version.unwrap_or("*").to_string(),
        }
    }

    pub fn invalid_constraint(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConstraint {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FhirGuardError>;
