//! Lexical conformance checks for FHIR primitive types.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}(-\d{2}(-\d{2})?)?$").unwrap());

static DATE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\d{4}(-\d{2}(-\d{2}(T\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:\d{2})?)?)?)?$",
    )
    .unwrap()
});

static INSTANT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})$").unwrap()
});

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}(\.\d+)?$").unwrap());

static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^\s]+( [^\s]+)*$").unwrap());

static ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9\-.]{1,64}$").unwrap());

/// Runtime type name of a JSON node, for diagnostics and type
/// discriminators.
pub fn runtime_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "decimal",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Complex type names are upper-camel-cased; primitives are lower-cased.
pub fn is_complex(code: &str) -> bool {
    code.chars().next().is_some_and(|c| c.is_uppercase())
}

/// Whether a JSON node can inhabit the given FHIR type. Primitives are
/// checked lexically; complex types accept any object (their fields are
/// judged by the element tree, not here).
pub fn value_matches_type(code: &str, value: &Value) -> bool {
    match code {
        "boolean" => value.is_boolean(),
        "integer" => value.as_i64().is_some(),
        "positiveInt" => value.as_u64().is_some_and(|n| n >= 1),
        "unsignedInt" => value.as_u64().is_some(),
        "decimal" => value.is_number(),
        "date" => value.as_str().is_some_and(|s| DATE_RE.is_match(s)),
        "dateTime" => value.as_str().is_some_and(|s| DATE_TIME_RE.is_match(s)),
        "instant" => value.as_str().is_some_and(|s| INSTANT_RE.is_match(s)),
        "time" => value.as_str().is_some_and(|s| TIME_RE.is_match(s)),
        "code" => value.as_str().is_some_and(|s| CODE_RE.is_match(s)),
        "id" => value.as_str().is_some_and(|s| ID_RE.is_match(s)),
        "string" | "markdown" | "base64Binary" | "xhtml" | "uri" | "url" | "canonical"
        | "oid" | "uuid" => value.is_string(),
        other if is_complex(other) => value.is_object(),
        // Unknown primitive type name: don't reject what we cannot judge.
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn runtime_names() {
        assert_eq!(runtime_type_name(&json!(true)), "boolean");
        assert_eq!(runtime_type_name(&json!(3)), "integer");
        assert_eq!(runtime_type_name(&json!(3.5)), "decimal");
        assert_eq!(runtime_type_name(&json!("x")), "string");
        assert_eq!(runtime_type_name(&json!({})), "object");
    }

    #[test]
    fn date_formats() {
        assert!(value_matches_type("date", &json!("2020")));
        assert!(value_matches_type("date", &json!("2020-03")));
        assert!(value_matches_type("date", &json!("2020-03-01")));
        assert!(!value_matches_type("date", &json!("01/03/2020")));
        assert!(!value_matches_type("date", &json!(2020)));
    }

    #[test]
    fn date_time_formats() {
        assert!(value_matches_type("dateTime", &json!("2020-03-01T12:30:00Z")));
        assert!(value_matches_type("dateTime", &json!("2020-03-01T12:30:00+01:00")));
        assert!(value_matches_type("dateTime", &json!("2020")));
        assert!(!value_matches_type("dateTime", &json!("noon")));
    }

    #[test]
    fn code_rejects_surrounding_whitespace() {
        assert!(value_matches_type("code", &json!("final")));
        assert!(value_matches_type("code", &json!("two words")));
        assert!(!value_matches_type("code", &json!(" padded")));
        assert!(!value_matches_type("code", &json!("")));
    }

    #[test]
    fn complex_types_accept_objects_only() {
        assert!(value_matches_type("CodeableConcept", &json!({"text": "x"})));
        assert!(!value_matches_type("CodeableConcept", &json!("x")));
    }

    #[test]
    fn bounded_integers() {
        assert!(value_matches_type("positiveInt", &json!(1)));
        assert!(!value_matches_type("positiveInt", &json!(0)));
        assert!(value_matches_type("unsignedInt", &json!(0)));
        assert!(!value_matches_type("unsignedInt", &json!(-1)));
    }
}
