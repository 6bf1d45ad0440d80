//! Error model.
//!
//! Registration-time problems are typed exceptions ([`SchemaError`]); a
//! failed registration always leaves the registry as it was before the call.
//! Evaluation-time violations are plain data ([`ValidationError`]) collected
//! into a [`ValidationOutcome`] — `validate` never fails because of schema
//! content, only for programmer errors ([`ValidateError`]).

use crate::providers::JsonParseError;
use crate::uri::InvalidReference;
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by `register_schema` and friends.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema document failed validation against its meta-schema.
    #[error("schema with uri '{uri}' failed meta-schema validation ({} errors)", errors.len())]
    InvalidSchema {
        uri: String,
        errors: Vec<ValidationError>,
    },

    /// The meta-schema itself could not be obtained or parsed.
    #[error("couldn't resolve meta-schema with uri '{uri}'")]
    MetaSchemaResolving {
        uri: String,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A `$id` or reference was not a usable URI.
    #[error(transparent)]
    InvalidReference(#[from] InvalidReference),

    /// A registration tried to mutate a read-only alias entry.
    #[error("registry entry for uri '{uri}' is a read-only alias")]
    ReadOnlyRegistry { uri: String },

    /// The schema document was not valid JSON.
    #[error(transparent)]
    Json(#[from] JsonParseError),

    /// A user-supplied evaluator factory failed; passed through verbatim.
    #[error("{0}")]
    EvaluatorFactory(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors surfaced by `validate` before any evaluation happens.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("couldn't find schema with uri '{reference}'")]
    SchemaNotFound { reference: String },

    /// The instance document was not valid JSON.
    #[error(transparent)]
    Json(#[from] JsonParseError),

    /// Registration failed inside a register-and-validate convenience call.
    #[error(transparent)]
    Registration(#[from] SchemaError),
}

impl ValidateError {
    /// The URI that had no registered schema, if that is what went wrong.
    pub fn reference(&self) -> Option<&str> {
        match self {
            ValidateError::SchemaNotFound { reference } => Some(reference),
            _ => None,
        }
    }
}

/// One failed assertion, with the locations needed to trace it.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    /// Keyword that produced the failure, when one did.
    pub keyword: Option<String>,
    /// Dynamic path of keywords and applicator segments taken to get here.
    pub evaluation_path: String,
    /// Absolute URI of the keyword location in the schema document.
    pub schema_location: String,
    /// JSON Pointer into the instance.
    pub instance_location: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at instance location '{}' (schema '{}')",
            self.message, self.instance_location, self.schema_location
        )
    }
}

/// Non-failure side output of an evaluator, e.g. the set of property names
/// matched by `properties`, or the value of an unknown keyword.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationAnnotation {
    pub keyword: String,
    pub evaluation_path: String,
    pub schema_location: String,
    pub instance_location: String,
    pub annotation: serde_json::Value,
}

/// The result of evaluating an instance against a schema.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    valid: bool,
    errors: Vec<ValidationError>,
    annotations: Vec<ValidationAnnotation>,
}

impl ValidationOutcome {
    pub(crate) fn new(
        valid: bool,
        errors: Vec<ValidationError>,
        annotations: Vec<ValidationAnnotation>,
    ) -> Self {
        Self {
            valid,
            errors,
            annotations,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn annotations(&self) -> &[ValidationAnnotation] {
        &self.annotations
    }
}
