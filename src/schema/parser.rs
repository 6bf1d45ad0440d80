//! Compiles JSON trees into registered schemas.
//!
//! Parsing walks the document post-order so that, by the time a node
//! carrying `$id` is registered, all of its descendants are present under
//! the document base and can be copied under the embedded base. Reference
//! keywords get their targets resolved lexically against the enclosing
//! `$id` scope; external targets are prefetched through the resolver chain
//! while registration is still running, so `validate` never performs I/O.
//!
//! Meta-schema validation is deferred: every parsed document (and every
//! subtree that declares `$schema`) is scheduled and checked only after the
//! whole batch of documents is registered. This is what makes a schema whose
//! `$schema` equals its own `$id` validate against itself.

use crate::context::EvaluationContext;
use crate::dialect::{factory_for, Dialect, SpecificationVersion};
use crate::error::{SchemaError, ValidationError};
use crate::evaluator::{
    boolean_schema_evaluator, is_structural_keyword, AnnotationEvaluator, Evaluator,
    EvaluatorFactory, EvaluatorWrapper,
};
use crate::node::JsonNode;
use crate::providers::JsonNodeFactory;
use crate::resolver::{ResolutionResult, SchemaResolver, SpecificationResolver};
use crate::schema::SchemaRegistry;
use crate::uri::{escape_pointer_token, CompoundUri, InvalidReference};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Parse-side context handed to evaluator factories.
pub struct KeywordContext<'a> {
    pub(crate) base_uri: &'a str,
    pub(crate) parent_uri: &'a str,
    pub(crate) schema_object: &'a JsonNode,
    pub(crate) active_vocabularies: &'a HashSet<String>,
    pub(crate) version: SpecificationVersion,
}

impl<'a> KeywordContext<'a> {
    /// URI the current document is registered under.
    pub fn base_uri(&self) -> &str {
        self.base_uri
    }

    /// The enclosing `$id` scope; references resolve against this.
    pub fn parent_uri(&self) -> &str {
        self.parent_uri
    }

    /// The schema object whose keywords are being compiled; factories use it
    /// to inspect sibling keywords.
    pub fn schema_object(&self) -> &JsonNode {
        self.schema_object
    }

    pub fn active_vocabularies(&self) -> &HashSet<String> {
        self.active_vocabularies
    }

    pub fn specification_version(&self) -> SpecificationVersion {
        self.version
    }

    /// Registry address of a subschema of the current document.
    pub fn schema_ref(&self, subschema: &JsonNode) -> CompoundUri {
        CompoundUri::new(self.base_uri, subschema.json_pointer())
    }

    /// Resolve a reference string against the enclosing `$id` scope.
    pub fn resolve_reference(&self, reference: &str) -> Result<CompoundUri, InvalidReference> {
        CompoundUri::resolve(self.parent_uri, reference)
    }
}

struct PendingMetaValidation {
    meta: CompoundUri,
    document_uri: String,
    node: JsonNode,
}

struct DocumentFrame {
    base_uri: String,
    version: SpecificationVersion,
    builtin: Arc<dyn EvaluatorFactory>,
}

/// One registration batch. Created per `register_schema` call; the caller
/// owns the snapshot/restore bracket around it.
pub(crate) struct SchemaParser<'a> {
    registry: &'a mut SchemaRegistry,
    dialect: &'a dyn Dialect,
    node_factory: &'a dyn JsonNodeFactory,
    user_factories: &'a [Arc<dyn EvaluatorFactory>],
    user_resolvers: &'a [Arc<dyn SchemaResolver>],
    schema_validation: bool,
    pending_meta: VecDeque<PendingMetaValidation>,
    in_progress: HashSet<String>,
}

impl<'a> SchemaParser<'a> {
    pub(crate) fn new(
        registry: &'a mut SchemaRegistry,
        dialect: &'a dyn Dialect,
        node_factory: &'a dyn JsonNodeFactory,
        user_factories: &'a [Arc<dyn EvaluatorFactory>],
        user_resolvers: &'a [Arc<dyn SchemaResolver>],
        schema_validation: bool,
    ) -> Self {
        Self {
            registry,
            dialect,
            node_factory,
            user_factories,
            user_resolvers,
            schema_validation,
            pending_meta: VecDeque::new(),
            in_progress: HashSet::new(),
        }
    }

    /// Register `node` under `register_uri` (or under its root `$id`, with
    /// `register_uri` as a read-only alias), then run all deferred
    /// meta-schema validations. Returns the base URI the document ended up
    /// under.
    pub(crate) fn register(
        &mut self,
        register_uri: &str,
        node: &JsonNode,
    ) -> Result<String, SchemaError> {
        let base = self.parse_document(register_uri, node)?;
        if self.schema_validation {
            self.process_pending_validations()?;
        }
        Ok(base)
    }

    fn parse_document(
        &mut self,
        register_uri: &str,
        node: &JsonNode,
    ) -> Result<String, SchemaError> {
        if !node.is_object() && !node.is_boolean() {
            return Err(SchemaError::InvalidSchema {
                uri: register_uri.to_string(),
                errors: vec![ValidationError {
                    keyword: None,
                    evaluation_path: String::new(),
                    schema_location: register_uri.to_string(),
                    instance_location: String::new(),
                    message: format!(
                        "Schema must be an object or a boolean, got {}",
                        node.node_type().name()
                    ),
                }],
            });
        }

        let declared_id = node.member("$id").and_then(JsonNode::as_str);
        let base = match declared_id {
            Some(id) => {
                let resolved = CompoundUri::resolve(register_uri, id)?;
                if !resolved.fragment.is_empty() {
                    return Err(InvalidReference {
                        reference: id.to_string(),
                    }
                    .into());
                }
                resolved.uri
            }
            None => register_uri.to_string(),
        };
        self.in_progress.insert(base.clone());
        self.in_progress.insert(register_uri.to_string());

        let declared_schema = node.member("$schema").and_then(JsonNode::as_str);
        // A document naming a known specification version switches to that
        // draft's keyword set; anything else keeps the configured dialect.
        let (version, builtin) = match declared_schema.and_then(SpecificationVersion::from_id) {
            Some(version) => (version, factory_for(version)),
            None => (
                self.dialect.specification_version(),
                self.dialect.evaluator_factory(),
            ),
        };
        let frame = DocumentFrame {
            base_uri: base.clone(),
            version,
            builtin,
        };
        let vocabularies =
            declared_vocabularies(node).unwrap_or_else(|| self.dialect.default_vocabularies());

        self.parse_node(&frame, &base, node, true, &vocabularies)?;
        if register_uri != base {
            self.registry.register_alias(&base, register_uri)?;
        }

        let meta = match declared_schema {
            Some(reference) => CompoundUri::resolve(&base, reference)?,
            None => CompoundUri::parse(&self.dialect.meta_schema_uri())?,
        };
        self.pending_meta.push_back(PendingMetaValidation {
            meta,
            document_uri: base.clone(),
            node: node.clone(),
        });
        tracing::debug!(uri = %base, "registered schema document");
        Ok(base)
    }

    fn parse_node(
        &mut self,
        frame: &DocumentFrame,
        parent_uri: &str,
        node: &JsonNode,
        is_root: bool,
        vocabularies: &HashSet<String>,
    ) -> Result<(), SchemaError> {
        if let Some(value) = node.as_bool() {
            let wrapper = EvaluatorWrapper::new(
                if value { "true" } else { "false" },
                node.json_pointer(),
                boolean_schema_evaluator(value),
            );
            self.registry.register_schema(
                &frame.base_uri,
                parent_uri,
                node,
                vec![wrapper],
                vocabularies,
            )?;
            return Ok(());
        }
        let Some(members) = node.as_object() else {
            // Not a schema; with validation enabled the meta-schema rejects
            // the document before this matters.
            return Ok(());
        };

        let mut scope_parent = parent_uri.to_string();
        let mut embedded_id = None;
        if !is_root {
            if let Some(id) = node.member("$id").and_then(JsonNode::as_str) {
                let resolved = CompoundUri::resolve(parent_uri, id)?;
                if !resolved.fragment.is_empty() {
                    return Err(InvalidReference {
                        reference: id.to_string(),
                    }
                    .into());
                }
                scope_parent = resolved.uri.clone();
                embedded_id = Some(resolved.uri);
            }
            if let Some(reference) = node.member("$schema").and_then(JsonNode::as_str) {
                let meta = CompoundUri::resolve(&scope_parent, reference)?;
                self.pending_meta.push_back(PendingMetaValidation {
                    meta,
                    document_uri: embedded_id.clone().unwrap_or_else(|| frame.base_uri.clone()),
                    node: node.clone(),
                });
            }
        }

        let vocabulary_override = declared_vocabularies(node);
        let active_vocabularies = vocabulary_override.as_ref().unwrap_or(vocabularies);

        for (keyword, value) in members {
            match subschema_shape(frame.version, keyword) {
                Shape::None => {}
                Shape::Single => {
                    self.parse_node(frame, &scope_parent, value, false, active_vocabularies)?;
                }
                Shape::Array => {
                    if let Some(items) = value.as_array() {
                        for item in items {
                            self.parse_node(frame, &scope_parent, item, false, active_vocabularies)?;
                        }
                    }
                }
                Shape::Map => {
                    if let Some(entries) = value.as_object() {
                        for (_, subschema) in entries {
                            self.parse_node(
                                frame,
                                &scope_parent,
                                subschema,
                                false,
                                active_vocabularies,
                            )?;
                        }
                    }
                }
                Shape::SingleOrArray => {
                    if let Some(items) = value.as_array() {
                        for item in items {
                            self.parse_node(frame, &scope_parent, item, false, active_vocabularies)?;
                        }
                    } else {
                        self.parse_node(frame, &scope_parent, value, false, active_vocabularies)?;
                    }
                }
            }
        }

        for (keyword, value) in members {
            if matches!(keyword.as_str(), "$ref" | "$dynamicRef") {
                if let Some(reference) = value.as_str() {
                    if let Ok(target) = CompoundUri::resolve(&scope_parent, reference) {
                        self.prefetch(&target.uri)?;
                    }
                }
            }
        }

        let kctx = KeywordContext {
            base_uri: &frame.base_uri,
            parent_uri: &scope_parent,
            schema_object: node,
            active_vocabularies,
            version: frame.version,
        };
        let mut evaluators = Vec::new();
        for (keyword, value) in members {
            let mut created = None;
            for factory in self.user_factories {
                if let Some(evaluator) = create_evaluator(factory.as_ref(), &kctx, keyword, value)?
                {
                    created = Some(evaluator);
                    break;
                }
            }
            if created.is_none() {
                created = create_evaluator(frame.builtin.as_ref(), &kctx, keyword, value)?;
            }
            if created.is_none() && !is_structural_keyword(keyword) {
                // Unknown keywords are preserved as annotations.
                created = Some(AnnotationEvaluator::boxed(value));
            }
            if let Some(evaluator) = created {
                let location =
                    format!("{}/{}", node.json_pointer(), escape_pointer_token(keyword));
                evaluators.push(EvaluatorWrapper::new(keyword.clone(), location, evaluator));
            }
        }

        match embedded_id {
            Some(id) => {
                self.registry.register_embedded_schema(
                    &frame.base_uri,
                    &id,
                    node,
                    evaluators,
                    active_vocabularies,
                )?;
            }
            None => {
                self.registry.register_schema(
                    &frame.base_uri,
                    &scope_parent,
                    node,
                    evaluators,
                    active_vocabularies,
                )?;
            }
        }
        Ok(())
    }

    /// Pull a referenced external document through the resolver chain while
    /// we are still inside `register_schema`. Unknown URIs are left alone
    /// and surface as evaluation failures.
    fn prefetch(&mut self, uri: &str) -> Result<(), SchemaError> {
        if self.in_progress.contains(uri) || self.registry.has_document(uri) {
            return Ok(());
        }
        match self.resolve_uri(uri) {
            Err(parse_error) => Err(SchemaError::Json(parse_error)),
            Ok(None) => Ok(()),
            Ok(Some(node)) => {
                tracing::debug!(uri = %uri, "prefetching referenced document");
                self.parse_document(uri, &node).map(|_| ())
            }
        }
    }

    fn resolve_uri(
        &self,
        uri: &str,
    ) -> Result<Option<JsonNode>, crate::providers::JsonParseError> {
        let mut result = SpecificationResolver.resolve(uri).materialize();
        if result.is_empty() {
            for resolver in self.user_resolvers {
                result = resolver.resolve(uri).materialize();
                if !result.is_empty() {
                    break;
                }
            }
        }
        match result {
            ResolutionResult::Empty | ResolutionResult::FromProvider(_) => Ok(None),
            ResolutionResult::FromString(raw) => self.node_factory.create(&raw).map(Some),
            ResolutionResult::FromNode(node) => Ok(Some(node)),
        }
    }

    fn process_pending_validations(&mut self) -> Result<(), SchemaError> {
        while let Some(pending) = self.pending_meta.pop_front() {
            self.ensure_meta_schema(&pending.meta)?;
            let Some(meta_schema) = self.registry.get(&pending.meta) else {
                return Err(SchemaError::MetaSchemaResolving {
                    uri: pending.meta.to_string(),
                    cause: None,
                });
            };
            let mut ctx = EvaluationContext::new(self.registry);
            let valid = ctx.validate_schema(&meta_schema, &pending.node);
            let outcome = ctx.into_outcome(valid);
            if !outcome.is_valid() {
                tracing::debug!(
                    uri = %pending.document_uri,
                    meta = %pending.meta,
                    "schema failed meta-schema validation"
                );
                return Err(SchemaError::InvalidSchema {
                    uri: pending.document_uri,
                    errors: outcome.errors().to_vec(),
                });
            }
        }
        Ok(())
    }

    fn ensure_meta_schema(&mut self, meta: &CompoundUri) -> Result<(), SchemaError> {
        if self.registry.get(meta).is_some() {
            return Ok(());
        }
        match self.resolve_uri(&meta.uri) {
            Err(parse_error) => Err(SchemaError::MetaSchemaResolving {
                uri: meta.uri.clone(),
                cause: Some(Box::new(parse_error)),
            }),
            Ok(None) => Err(SchemaError::MetaSchemaResolving {
                uri: meta.uri.clone(),
                cause: None,
            }),
            Ok(Some(node)) => {
                tracing::debug!(uri = %meta.uri, "resolving meta-schema");
                self.parse_document(&meta.uri, &node)?;
                if self.registry.get(meta).is_some() {
                    Ok(())
                } else {
                    Err(SchemaError::MetaSchemaResolving {
                        uri: meta.to_string(),
                        cause: None,
                    })
                }
            }
        }
    }
}

fn create_evaluator(
    factory: &dyn EvaluatorFactory,
    ctx: &KeywordContext<'_>,
    keyword: &str,
    node: &JsonNode,
) -> Result<Option<Box<dyn Evaluator>>, SchemaError> {
    factory
        .create(ctx, keyword, node)
        .map_err(|error| match error.downcast::<InvalidReference>() {
            Ok(invalid) => SchemaError::InvalidReference(*invalid),
            Err(other) => SchemaError::EvaluatorFactory(other),
        })
}

fn declared_vocabularies(node: &JsonNode) -> Option<HashSet<String>> {
    let members = node.member("$vocabulary")?.as_object()?;
    Some(members.iter().map(|(uri, _)| uri.clone()).collect())
}

enum Shape {
    None,
    Single,
    Array,
    Map,
    SingleOrArray,
}

/// Which members of a schema object carry subschemas, per draft.
fn subschema_shape(version: SpecificationVersion, keyword: &str) -> Shape {
    match keyword {
        "additionalProperties" | "propertyNames" | "contains" | "if" | "then" | "else" | "not"
        | "unevaluatedItems" | "unevaluatedProperties" | "contentSchema" => Shape::Single,
        "properties" | "patternProperties" | "dependentSchemas" | "$defs" | "definitions" => {
            Shape::Map
        }
        "allOf" | "anyOf" | "oneOf" => Shape::Array,
        "items" => match version {
            SpecificationVersion::Draft2020_12 => Shape::Single,
            SpecificationVersion::Draft2019_09 => Shape::SingleOrArray,
        },
        "prefixItems" => match version {
            SpecificationVersion::Draft2020_12 => Shape::Array,
            SpecificationVersion::Draft2019_09 => Shape::None,
        },
        "additionalItems" => match version {
            SpecificationVersion::Draft2019_09 => Shape::Single,
            SpecificationVersion::Draft2020_12 => Shape::None,
        },
        _ => Shape::None,
    }
}
