//! The validator façade: parse → register → validate, with transactional
//! registration.
//!
//! A `Validator` owns exactly one registry. Registration snapshots the
//! registry at entry and restores it on any failure, so a rejected document
//! never leaves partial state behind. Validation is read-only.

use crate::context::EvaluationContext;
use crate::dialect::{Dialect, Draft2020Dialect};
use crate::error::{SchemaError, ValidateError, ValidationOutcome};
use crate::evaluator::EvaluatorFactory;
use crate::node::JsonNode;
use crate::providers::{JsonNodeFactory, SerdeNodeFactory};
use crate::resolver::SchemaResolver;
use crate::schema::{SchemaParser, SchemaRegistry};
use crate::uri::{normalize_base, CompoundUri};
use std::sync::Arc;

/// Configures and builds a [`Validator`].
pub struct ValidatorBuilder {
    dialect: Box<dyn Dialect>,
    node_factory: Box<dyn JsonNodeFactory>,
    factories: Vec<Arc<dyn EvaluatorFactory>>,
    resolvers: Vec<Arc<dyn SchemaResolver>>,
    disabled_schema_validation: bool,
}

impl Default for ValidatorBuilder {
    fn default() -> Self {
        Self {
            dialect: Box::new(Draft2020Dialect),
            node_factory: Box::new(SerdeNodeFactory),
            factories: Vec::new(),
            resolvers: Vec::new(),
            disabled_schema_validation: false,
        }
    }
}

impl ValidatorBuilder {
    /// Select the default dialect (Draft 2020-12 if never called).
    pub fn with_dialect(mut self, dialect: impl Dialect + 'static) -> Self {
        self.dialect = Box::new(dialect);
        self
    }

    /// Select the JSON parser backend.
    pub fn with_node_factory(mut self, factory: impl JsonNodeFactory + 'static) -> Self {
        self.node_factory = Box::new(factory);
        self
    }

    /// Prepend a custom evaluator factory; it is consulted before the
    /// dialect's builtin factory.
    pub fn with_evaluator_factory(mut self, factory: impl EvaluatorFactory + 'static) -> Self {
        self.factories.push(Arc::new(factory));
        self
    }

    /// Prepend a custom schema resolver; it is consulted after the registry
    /// and the builtin specification resolver.
    pub fn with_schema_resolver(mut self, resolver: impl SchemaResolver + 'static) -> Self {
        self.resolvers.push(Arc::new(resolver));
        self
    }

    /// Skip meta-schema validation during registration.
    pub fn with_disabled_schema_validation(mut self, disabled: bool) -> Self {
        self.disabled_schema_validation = disabled;
        self
    }

    pub fn build(self) -> Validator {
        Validator {
            dialect: self.dialect,
            node_factory: self.node_factory,
            factories: self.factories,
            resolvers: self.resolvers,
            registry: SchemaRegistry::default(),
            schema_validation: !self.disabled_schema_validation,
            anonymous_counter: 0,
        }
    }
}

/// Registers schemas and evaluates instances against them.
pub struct Validator {
    dialect: Box<dyn Dialect>,
    node_factory: Box<dyn JsonNodeFactory>,
    factories: Vec<Arc<dyn EvaluatorFactory>>,
    resolvers: Vec<Arc<dyn SchemaResolver>>,
    registry: SchemaRegistry,
    schema_validation: bool,
    anonymous_counter: u64,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// A validator with the default Draft 2020-12 dialect and `serde_json`
    /// node factory.
    pub fn new() -> Self {
        ValidatorBuilder::default().build()
    }

    pub fn builder() -> ValidatorBuilder {
        ValidatorBuilder::default()
    }

    /// Register a schema document under an anonymous URI (or under its own
    /// root `$id`). Returns the URI the document was registered under.
    pub fn register_schema(&mut self, raw_schema: &str) -> Result<String, SchemaError> {
        let node = self.node_factory.create(raw_schema)?;
        let uri = self.next_anonymous_uri();
        self.register_node(&uri, &node)
    }

    /// Register a schema document under the given URI. If the document also
    /// declares a root `$id`, it is registered under the `$id` and the given
    /// URI becomes a read-only alias.
    pub fn register_schema_with_uri(
        &mut self,
        uri: &str,
        raw_schema: &str,
    ) -> Result<String, SchemaError> {
        let node = self.node_factory.create(raw_schema)?;
        self.register_node(&normalize_base(uri), &node)
    }

    fn register_node(&mut self, uri: &str, node: &JsonNode) -> Result<String, SchemaError> {
        let snapshot = self.registry.create_snapshot();
        tracing::debug!(uri = %uri, "registering schema");
        let result = SchemaParser::new(
            &mut self.registry,
            self.dialect.as_ref(),
            self.node_factory.as_ref(),
            &self.factories,
            &self.resolvers,
            self.schema_validation,
        )
        .register(uri, node);
        if result.is_err() {
            tracing::debug!(uri = %uri, "registration failed, restoring registry snapshot");
            self.registry.restore_snapshot(snapshot);
        }
        result
    }

    /// Validate a raw JSON instance against the schema registered under
    /// `uri`.
    pub fn validate(&self, uri: &str, raw_instance: &str) -> Result<ValidationOutcome, ValidateError> {
        let instance = self.node_factory.create(raw_instance)?;
        self.validate_node(uri, &instance)
    }

    /// Validate an already-parsed instance against the schema registered
    /// under `uri`.
    pub fn validate_node(
        &self,
        uri: &str,
        instance: &JsonNode,
    ) -> Result<ValidationOutcome, ValidateError> {
        let compound = CompoundUri::parse(uri).map_err(|_| ValidateError::SchemaNotFound {
            reference: uri.to_string(),
        })?;
        let schema = self
            .registry
            .get(&compound)
            .ok_or_else(|| ValidateError::SchemaNotFound {
                reference: uri.to_string(),
            })?;
        let mut ctx = EvaluationContext::new(&self.registry);
        let valid = ctx.validate_schema(&schema, instance);
        Ok(ctx.into_outcome(valid))
    }

    /// Register an anonymous schema and validate an instance against it in
    /// one call.
    pub fn validate_raw(
        &mut self,
        raw_schema: &str,
        raw_instance: &str,
    ) -> Result<ValidationOutcome, ValidateError> {
        let uri = self.register_schema(raw_schema)?;
        self.validate(&uri, raw_instance)
    }

    fn next_anonymous_uri(&mut self) -> String {
        self.anonymous_counter += 1;
        format!("urn:anonymous-schema:{}", self.anonymous_counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_uris_are_distinct() {
        let mut validator = Validator::builder()
            .with_disabled_schema_validation(true)
            .build();
        let first = validator.register_schema("{}").unwrap();
        let second = validator.register_schema("{}").unwrap();
        assert_ne!(first, second);
        assert!(validator.validate(&first, "null").unwrap().is_valid());
    }

    #[test]
    fn test_unknown_uri_is_schema_not_found() {
        let validator = Validator::new();
        let error = validator.validate("urn:missing", "{}").unwrap_err();
        match error {
            ValidateError::SchemaNotFound { reference } => assert_eq!(reference, "urn:missing"),
            other => panic!("expected SchemaNotFound, got {other}"),
        }
    }

    #[test]
    fn test_invalid_schema_json_is_rejected() {
        let mut validator = Validator::new();
        assert!(matches!(
            validator.register_schema("{"),
            Err(SchemaError::Json(_))
        ));
    }
}
