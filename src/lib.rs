//! JSON Schema validation for Draft 2020-12 and Draft 2019-09.
//!
//! This crate provides schema-based validation of JSON instances, built
//! around a URI-addressable schema registry with transactional
//! registration: schemas are validated against their dialect's meta-schema
//! before they are committed, and any failure rolls the registry back to
//! its previous state.
//!
//! Supported core machinery includes `$id`/`$anchor` scoping, embedded
//! schema resources, `$ref`, the dynamic references (`$dynamicRef`,
//! `$recursiveRef`) with caller-scope anchor resolution, annotation-driven
//! `unevaluatedItems`/`unevaluatedProperties`, and infinite-loop detection
//! for self-referential schema/instance pairs.
//!
//! # Example
//!
//! ```
//! use json_schema_validation::Validator;
//!
//! let mut validator = Validator::new();
//! let uri = validator
//!     .register_schema(r#"{"type": "object", "required": ["name"]}"#)
//!     .unwrap();
//! assert!(validator.validate(&uri, r#"{"name": "x"}"#).unwrap().is_valid());
//! assert!(!validator.validate(&uri, "{}").unwrap().is_valid());
//! ```

mod context;
mod dialect;
mod error;
mod evaluator;
mod node;
mod providers;
mod resolver;
mod schema;
mod uri;
mod validator;

pub use context::EvaluationContext;
pub use dialect::{
    default_vocabularies_for, vocabulary, Dialect, Draft2019Dialect, Draft2020Dialect,
    SpecificationVersion,
};
pub use error::{
    SchemaError, ValidateError, ValidationAnnotation, ValidationError, ValidationOutcome,
};
pub use evaluator::{
    Draft2019EvaluatorFactory, Draft2020EvaluatorFactory, EvaluationOutcome, Evaluator,
    EvaluatorFactory, FactoryError,
};
pub use node::{JsonNode, JsonNumber, NodeType};
pub use providers::{node_from_value, JsonNodeFactory, JsonParseError, SerdeNodeFactory};
pub use resolver::{ResolutionResult, SchemaResolver};
pub use schema::{KeywordContext, Schema};
pub use uri::{CompoundUri, InvalidReference};
pub use validator::{Validator, ValidatorBuilder};
