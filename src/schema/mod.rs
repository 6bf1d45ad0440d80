//! Compiled schemas and the URI-addressable registry.
//!
//! Every registered document gets one `Fragments` entry per base URI, with
//! three lookup maps:
//!
//! - `schemas`: JSON Pointer → schema, for every schema object in the
//!   document, keyed by its location pointer;
//! - `additional_schemas`: plain-name anchors, plus the re-based pointers of
//!   subtrees embedded under a nested `$id`;
//! - `dynamic_schemas`: `$dynamicAnchor` names (and `""` for a
//!   `$recursiveAnchor` root), consulted only by dynamic references.
//!
//! Schemas are shared `Arc`s; snapshots deep-copy the maps only, so restore
//! swaps the whole state back without touching compiled schemas.

mod parser;

pub(crate) use parser::SchemaParser;
pub use parser::KeywordContext;

use crate::error::SchemaError;
use crate::evaluator::EvaluatorWrapper;
use crate::node::JsonNode;
use crate::uri::{absolute_uri, CompoundUri};
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

/// The compiled form of one schema object (or boolean schema).
#[derive(Debug)]
pub struct Schema {
    parent_uri: String,
    absolute_uri: String,
    evaluators: Vec<EvaluatorWrapper>,
    active_vocabularies: HashSet<String>,
}

impl Schema {
    pub(crate) fn new(
        parent_uri: String,
        absolute_uri: String,
        mut evaluators: Vec<EvaluatorWrapper>,
        active_vocabularies: HashSet<String>,
    ) -> Self {
        // Runtime order is the keyword priority; stable sort keeps source
        // order within a priority tier.
        evaluators.sort_by_key(EvaluatorWrapper::priority);
        Self {
            parent_uri,
            absolute_uri,
            evaluators,
            active_vocabularies,
        }
    }

    /// The `$id` scope this schema was declared under.
    pub fn parent_uri(&self) -> &str {
        &self.parent_uri
    }

    /// Absolute URI of this schema: the document base plus the location
    /// pointer fragment.
    pub fn absolute_uri(&self) -> &str {
        &self.absolute_uri
    }

    pub fn active_vocabularies(&self) -> &HashSet<String> {
        &self.active_vocabularies
    }

    pub(crate) fn evaluators(&self) -> &[EvaluatorWrapper] {
        &self.evaluators
    }
}

#[derive(Debug, Default, Clone)]
struct Fragments {
    schemas: HashMap<String, Arc<Schema>>,
    additional_schemas: HashMap<String, Arc<Schema>>,
    dynamic_schemas: HashMap<String, Arc<Schema>>,
}

#[derive(Debug, Clone)]
enum Entry {
    Owned(Fragments),
    /// Read-only view of another base URI's fragments. Registering the same
    /// URI twice through an alias would silently mutate the aliased document,
    /// so mutation through an alias is rejected instead.
    Alias(String),
}

/// Deep-copied registry state, as handed out by [`SchemaRegistry::create_snapshot`].
#[derive(Debug, Default, Clone)]
pub(crate) struct State {
    entries: HashMap<String, Entry>,
}

impl State {
    fn fragments(&self, uri: &str) -> Option<&Fragments> {
        match self.entries.get(uri)? {
            Entry::Owned(fragments) => Some(fragments),
            Entry::Alias(target) => match self.entries.get(target)? {
                Entry::Owned(fragments) => Some(fragments),
                Entry::Alias(_) => None,
            },
        }
    }

    fn fragments_mut(&mut self, uri: &str) -> Result<&mut Fragments, SchemaError> {
        match self
            .entries
            .entry(uri.to_string())
            .or_insert_with(|| Entry::Owned(Fragments::default()))
        {
            Entry::Owned(fragments) => Ok(fragments),
            Entry::Alias(_) => Err(SchemaError::ReadOnlyRegistry {
                uri: uri.to_string(),
            }),
        }
    }
}

/// URI → schema store backing one `Validator`.
#[derive(Debug, Default)]
pub(crate) struct SchemaRegistry {
    state: State,
}

impl SchemaRegistry {
    pub(crate) fn get(&self, uri: &CompoundUri) -> Option<Arc<Schema>> {
        let fragments = self.state.fragments(&uri.uri)?;
        fragments
            .schemas
            .get(&uri.fragment)
            .or_else(|| fragments.additional_schemas.get(&uri.fragment))
            .cloned()
    }

    pub(crate) fn get_dynamic(&self, uri: &CompoundUri) -> Option<Arc<Schema>> {
        self.state
            .fragments(&uri.uri)?
            .dynamic_schemas
            .get(&uri.fragment)
            .cloned()
    }

    /// Whether any document (owned or aliased) occupies `uri`.
    pub(crate) fn has_document(&self, uri: &str) -> bool {
        self.state.entries.contains_key(uri)
    }

    /// Register the schema at `node` under the document base URI, keyed by
    /// the node's location pointer, and register its anchors under the
    /// current `$id` scope.
    pub(crate) fn register_schema(
        &mut self,
        base_uri: &str,
        parent_uri: &str,
        node: &JsonNode,
        evaluators: Vec<EvaluatorWrapper>,
        vocabularies: &HashSet<String>,
    ) -> Result<Arc<Schema>, SchemaError> {
        let schema = Arc::new(Schema::new(
            parent_uri.to_string(),
            absolute_uri(base_uri, node.json_pointer()),
            evaluators,
            vocabularies.clone(),
        ));
        self.state
            .fragments_mut(base_uri)?
            .schemas
            .insert(node.json_pointer().to_string(), Arc::clone(&schema));
        self.register_anchors(parent_uri, node, &schema)?;
        Ok(schema)
    }

    /// Register a subtree that declares its own `$id`. The subtree's
    /// pointer-keyed descendants stay addressable under the outer base URI
    /// and are additionally copied under the embedded base with re-based
    /// pointers; the embedded base gets the subtree as its root schema.
    pub(crate) fn register_embedded_schema(
        &mut self,
        base_uri: &str,
        id: &str,
        node: &JsonNode,
        evaluators: Vec<EvaluatorWrapper>,
        vocabularies: &HashSet<String>,
    ) -> Result<Arc<Schema>, SchemaError> {
        let node_pointer = node.json_pointer();
        let descendants: Vec<(String, Arc<Schema>)> = self
            .state
            .fragments(base_uri)
            .map(|fragments| {
                fragments
                    .schemas
                    .iter()
                    .filter(|(pointer, _)| pointer.starts_with(node_pointer))
                    .map(|(pointer, schema)| {
                        (pointer[node_pointer.len()..].to_string(), Arc::clone(schema))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let schema = Arc::new(Schema::new(
            id.to_string(),
            absolute_uri(base_uri, node_pointer),
            evaluators,
            vocabularies.clone(),
        ));

        let id_fragments = self.state.fragments_mut(id)?;
        for (pointer, descendant) in descendants {
            id_fragments.additional_schemas.insert(pointer, descendant);
        }
        id_fragments
            .schemas
            .insert(String::new(), Arc::clone(&schema));

        self.state
            .fragments_mut(base_uri)?
            .schemas
            .insert(node_pointer.to_string(), Arc::clone(&schema));
        self.register_anchors(id, node, &schema)?;
        tracing::debug!(base = %base_uri, id = %id, "registered embedded schema");
        Ok(schema)
    }

    fn register_anchors(
        &mut self,
        scope_uri: &str,
        node: &JsonNode,
        schema: &Arc<Schema>,
    ) -> Result<(), SchemaError> {
        if !node.is_object() {
            return Ok(());
        }
        if let Some(anchor) = node.member("$anchor").and_then(JsonNode::as_str) {
            self.state
                .fragments_mut(scope_uri)?
                .additional_schemas
                .insert(anchor.to_string(), Arc::clone(schema));
        }
        if let Some(anchor) = node.member("$dynamicAnchor").and_then(JsonNode::as_str) {
            // A dynamic anchor is also addressable by plain $ref.
            let fragments = self.state.fragments_mut(scope_uri)?;
            fragments
                .additional_schemas
                .insert(anchor.to_string(), Arc::clone(schema));
            fragments
                .dynamic_schemas
                .insert(anchor.to_string(), Arc::clone(schema));
        }
        if node.member("$recursiveAnchor").and_then(JsonNode::as_bool) == Some(true) {
            self.state
                .fragments_mut(scope_uri)?
                .dynamic_schemas
                .insert(String::new(), Arc::clone(schema));
        }
        Ok(())
    }

    /// Make `alias_uri` a read-only view of `original_uri`.
    pub(crate) fn register_alias(
        &mut self,
        original_uri: &str,
        alias_uri: &str,
    ) -> Result<(), SchemaError> {
        if original_uri == alias_uri {
            return Ok(());
        }
        self.state
            .entries
            .insert(alias_uri.to_string(), Entry::Alias(original_uri.to_string()));
        Ok(())
    }

    pub(crate) fn create_snapshot(&self) -> State {
        self.state.clone()
    }

    pub(crate) fn restore_snapshot(&mut self, state: State) {
        self.state = state;
    }
}
