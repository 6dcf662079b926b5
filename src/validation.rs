//! Validation System - Schema Is the Contract
//!
//! Resume data is checked against a JSON Schema document. The schema engine
//! does all of the work; violations come back structured.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema document itself could not be compiled.
    #[error("invalid JSON schema: {0}")]
    InvalidSchema(String),

    #[error("resume data is invalid against the schema: {}", summarize(.0))]
    Violations(Vec<ValidationViolation>),
}

fn summarize(violations: &[ValidationViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationViolation {
    /// JSON pointer into the resume data, empty for the root.
    pub instance_path: String,
    /// JSON pointer to the schema keyword that failed.
    pub schema_path: String,
    pub message: String,
}

impl std::fmt::Display for ValidationViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let at = if self.instance_path.is_empty() {
            "/"
        } else {
            self.instance_path.as_str()
        };
        write!(f, "at {at}: {} (schema {})", self.message, self.schema_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationReport {
    pub fn success() -> Self {
        Self {
            valid: true,
            violations: vec![],
        }
    }

    pub fn failure(violations: Vec<ValidationViolation>) -> Self {
        Self {
            valid: false,
            violations,
        }
    }

    pub fn into_result(self) -> Result<(), SchemaError> {
        if self.valid {
            Ok(())
        } else {
            Err(SchemaError::Violations(self.violations))
        }
    }
}

/// Compiled schema, reusable across documents.
pub struct SchemaValidator {
    inner: jsonschema::Validator,
}

impl SchemaValidator {
    pub fn new(schema: &Value) -> Result<Self, SchemaError> {
        let inner = jsonschema::validator_for(schema)
            .map_err(|e| SchemaError::InvalidSchema(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Collect every violation, not just the first one.
    pub fn check(&self, resume: &Value) -> ValidationReport {
        let violations: Vec<_> = self
            .inner
            .iter_errors(resume)
            .map(|e| ValidationViolation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if violations.is_empty() {
            ValidationReport::success()
        } else {
            ValidationReport::failure(violations)
        }
    }
}

/// One-shot `validate(resume_data, schema)`.
pub fn validate(resume: &Value, schema: &Value) -> Result<(), SchemaError> {
    let validator = SchemaValidator::new(schema)?;
    let report = validator.check(resume);
    tracing::info!(
        op = "validation::validate",
        valid = report.valid,
        violations = report.violations.len(),
        "resume checked against schema"
    );
    report.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["name", "experience"],
            "properties": {
                "name": {"type": "string"},
                "experience": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["company"],
                        "properties": {"company": {"type": "string"}}
                    }
                }
            }
        })
    }

    #[test]
    fn test_conformant_data_passes() {
        let data = json!({"name": "Ada", "experience": [{"company": "Analytical Engines"}]});
        assert!(validate(&data, &schema()).is_ok());
    }

    #[test]
    fn test_missing_required_field() {
        let data = json!({"name": "Ada"});
        let err = validate(&data, &schema()).unwrap_err();
        match err {
            SchemaError::Violations(v) => {
                assert_eq!(v.len(), 1);
                assert!(v[0].message.contains("experience"));
                assert!(v[0].schema_path.contains("required"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_nested_violation_has_instance_path() {
        let data = json!({"name": "Ada", "experience": [{"company": 42}]});
        let report = SchemaValidator::new(&schema()).unwrap().check(&data);
        assert!(!report.valid);
        assert_eq!(report.violations[0].instance_path, "/experience/0/company");
    }

    #[test]
    fn test_all_violations_collected() {
        let data = json!({"name": 7, "experience": "none"});
        let report = SchemaValidator::new(&schema()).unwrap().check(&data);
        assert_eq!(report.violations.len(), 2);
    }

    #[test]
    fn test_invalid_schema_is_distinct() {
        let bad = json!({"type": "not-a-type"});
        let err = validate(&json!({}), &bad).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSchema(_)));
    }
}
