//! Schema validation gate.
//!
//! Rule evaluation sits behind the [`RuleSet`] trait so callers can plug in any
//! rule engine. [`JsonSchemaRules`] is the bundled engine: a JSON-Schema
//! document compiled once with the `jsonschema` crate, then evaluated
//! read-only.

use crate::error::{EnvelopeError, Result};
use jsonschema::error::ValidationErrorKind;
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// One failed rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON-pointer style location; empty for the root
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// A compiled rule set; must be side-effect free
pub trait RuleSet: Send + Sync {
    fn violations(&self, value: &Value) -> Vec<Violation>;
}

impl<F> RuleSet for F
where
    F: Fn(&Value) -> Vec<Violation> + Send + Sync,
{
    fn violations(&self, value: &Value) -> Vec<Violation> {
        self(value)
    }
}

/// Rejects values that break its rule set
pub struct SchemaValidator {
    rules: Box<dyn RuleSet>,
}

impl SchemaValidator {
    pub fn new(rules: impl RuleSet + 'static) -> Self {
        Self {
            rules: Box::new(rules),
        }
    }

    /// Compile a JSON-Schema document with the bundled engine
    pub fn compile(schema: &Value) -> Result<Self> {
        Ok(Self::new(JsonSchemaRules::compile(schema)?))
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        let violations = self.rules.violations(value);
        if violations.is_empty() {
            Ok(())
        } else {
            debug!(count = violations.len(), "Value rejected by schema");
            Err(EnvelopeError::Schema { violations })
        }
    }
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator").finish_non_exhaustive()
    }
}

/// JSON-Schema document compiled once by the `jsonschema` engine
///
/// The draft is detected from `$schema`, defaulting to the latest the engine
/// supports. The document itself is checked against its meta-schema.
pub struct JsonSchemaRules {
    validator: jsonschema::Validator,
}

impl JsonSchemaRules {
    /// Compile a schema document; an invalid document is a `Config` error
    pub fn compile(schema: &Value) -> Result<Self> {
        let validator = jsonschema::validator_for(schema)
            .map_err(|e| EnvelopeError::Config(format!("Invalid schema: {e}")))?;
        Ok(Self { validator })
    }
}

impl RuleSet for JsonSchemaRules {
    fn violations(&self, value: &Value) -> Vec<Violation> {
        let mut out = Vec::new();
        for error in self.validator.iter_errors(value) {
            let path = error.instance_path.to_string();
            match &error.kind {
                // Point at the missing or unexpected member, not its parent
                ValidationErrorKind::Required { property } => {
                    let name = property.as_str().map_or_else(|| property.to_string(), str::to_string);
                    out.push(Violation::new(
                        child_path(&path, &name),
                        "required property missing",
                    ));
                }
                ValidationErrorKind::AdditionalProperties { unexpected } => {
                    for name in unexpected {
                        out.push(Violation::new(
                            child_path(&path, name),
                            "additional property not allowed",
                        ));
                    }
                }
                _ => out.push(Violation::new(path, error.to_string())),
            }
        }
        out
    }
}

impl fmt::Debug for JsonSchemaRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaRules").finish_non_exhaustive()
    }
}

/// Append one JSON-pointer segment, escaping `~` and `/`
fn child_path(parent: &str, name: &str) -> String {
    format!("{parent}/{}", name.replace('~', "~0").replace('/', "~1"))
}
