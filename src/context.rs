//! Per-validation transient state.
//!
//! The context threads four things through recursive evaluation: the dynamic
//! scope (for `$dynamicRef`/`$recursiveRef` anchor walks), the evaluation
//! stack of `(schema URI, instance pointer)` pairs (for loop detection), the
//! collected errors and annotations, and the evaluated-property/item records
//! consumed by `unevaluatedProperties`/`unevaluatedItems`.
//!
//! Errors and annotations support checkpoint/rollback so speculative branch
//! evaluation (`anyOf`, `oneOf`, `not`, `if`, `contains`) can retract what a
//! failed branch contributed.

use crate::error::{ValidationAnnotation, ValidationError, ValidationOutcome};
use crate::evaluator::{EvaluationOutcome, EvaluatorWrapper};
use crate::node::JsonNode;
use crate::schema::{Schema, SchemaRegistry};
use crate::uri::{escape_pointer_token, split_absolute, CompoundUri};
use std::collections::HashSet;
use std::sync::Arc;

/// Rollback point for annotations and evaluated-item records.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AnnotationCheckpoint {
    annotations: usize,
    properties: usize,
    items: usize,
}

/// Rollback point for collected errors.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ErrorCheckpoint(usize);

/// Transient state of one `validate` call.
pub struct EvaluationContext<'a> {
    registry: &'a SchemaRegistry,
    dynamic_scope: Vec<String>,
    evaluation_stack: Vec<(String, String)>,
    evaluation_path: Vec<String>,
    errors: Vec<ValidationError>,
    annotations: Vec<ValidationAnnotation>,
    evaluated_properties: Vec<(String, String)>,
    evaluated_items: Vec<(String, usize)>,
}

impl<'a> EvaluationContext<'a> {
    pub(crate) fn new(registry: &'a SchemaRegistry) -> Self {
        Self {
            registry,
            dynamic_scope: Vec::new(),
            evaluation_stack: Vec::new(),
            evaluation_path: Vec::new(),
            errors: Vec::new(),
            annotations: Vec::new(),
            evaluated_properties: Vec::new(),
            evaluated_items: Vec::new(),
        }
    }

    /// Run every evaluator of `schema` against `instance`, in keyword
    /// priority order. A failing schema retracts its annotation
    /// contributions; its errors stay for reporting.
    pub(crate) fn validate_schema(&mut self, schema: &Schema, instance: &JsonNode) -> bool {
        let stack_key = (
            schema.absolute_uri().to_string(),
            instance.json_pointer().to_string(),
        );
        if self.evaluation_stack.contains(&stack_key) {
            let message = format!(
                "Infinite evaluation loop detected for schema '{}' at instance location '{}'",
                stack_key.0, stack_key.1
            );
            self.push_schema_error(schema, instance, message);
            return false;
        }
        self.evaluation_stack.push(stack_key);
        self.dynamic_scope.push(schema.parent_uri().to_string());

        let checkpoint = self.annotation_checkpoint();
        let mut valid = true;
        for wrapper in schema.evaluators() {
            self.evaluation_path
                .push(escape_pointer_token(wrapper.keyword()));
            let outcome = wrapper.evaluate(self, instance);
            match outcome {
                EvaluationOutcome::Valid(Some(value)) => {
                    self.push_annotation(wrapper, schema, instance, value);
                }
                EvaluationOutcome::Valid(None) => {}
                EvaluationOutcome::Invalid(message) => {
                    valid = false;
                    self.push_keyword_error(wrapper, schema, instance, message);
                }
            }
            self.evaluation_path.pop();
        }
        if !valid {
            self.rollback_annotations(checkpoint);
        }

        self.dynamic_scope.pop();
        self.evaluation_stack.pop();
        valid
    }

    /// Resolve `reference` through the registry and validate `instance`
    /// against the target. A missing target is an evaluation failure, not an
    /// exception.
    pub(crate) fn apply_reference(
        &mut self,
        reference: &CompoundUri,
        instance: &JsonNode,
    ) -> bool {
        match self.registry.get(reference) {
            Some(schema) => self.validate_schema(&schema, instance),
            None => {
                let message = format!("Couldn't find schema with uri '{reference}'");
                self.push_detached_error(instance, message);
                false
            }
        }
    }

    pub(crate) fn lookup(&self, reference: &CompoundUri) -> Option<Arc<Schema>> {
        self.registry.get(reference)
    }

    pub(crate) fn lookup_dynamic(&self, reference: &CompoundUri) -> Option<Arc<Schema>> {
        self.registry.get_dynamic(reference)
    }

    /// Walk the dynamic scope from the outermost schema inward and return
    /// the first schema whose base URI declares `fragment` as a dynamic
    /// anchor.
    pub(crate) fn resolve_dynamic_anchor(&self, fragment: &str) -> Option<Arc<Schema>> {
        self.dynamic_scope.iter().find_map(|scope_uri| {
            self.registry
                .get_dynamic(&CompoundUri::new(scope_uri.clone(), fragment))
        })
    }

    /// Walk the dynamic scope for the outermost `$recursiveAnchor: true`
    /// root.
    pub(crate) fn resolve_recursive_root(&self) -> Option<Arc<Schema>> {
        self.resolve_dynamic_anchor("")
    }

    /// Run `f` with `segment` appended to the evaluation path.
    pub(crate) fn in_path<R>(&mut self, segment: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        self.evaluation_path.push(escape_pointer_token(segment));
        let result = f(self);
        self.evaluation_path.pop();
        result
    }

    pub(crate) fn record_evaluated_property(&mut self, instance_pointer: &str, name: &str) {
        self.evaluated_properties
            .push((instance_pointer.to_string(), name.to_string()));
    }

    pub(crate) fn record_evaluated_item(&mut self, instance_pointer: &str, index: usize) {
        self.evaluated_items
            .push((instance_pointer.to_string(), index));
    }

    /// Property names already evaluated at `instance_pointer` by applicators
    /// that passed.
    pub(crate) fn evaluated_properties_at(&self, instance_pointer: &str) -> HashSet<String> {
        self.evaluated_properties
            .iter()
            .filter(|(pointer, _)| pointer == instance_pointer)
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub(crate) fn evaluated_items_at(&self, instance_pointer: &str) -> HashSet<usize> {
        self.evaluated_items
            .iter()
            .filter(|(pointer, _)| pointer == instance_pointer)
            .map(|(_, index)| *index)
            .collect()
    }

    pub(crate) fn annotation_checkpoint(&self) -> AnnotationCheckpoint {
        AnnotationCheckpoint {
            annotations: self.annotations.len(),
            properties: self.evaluated_properties.len(),
            items: self.evaluated_items.len(),
        }
    }

    pub(crate) fn rollback_annotations(&mut self, checkpoint: AnnotationCheckpoint) {
        self.annotations.truncate(checkpoint.annotations);
        self.evaluated_properties.truncate(checkpoint.properties);
        self.evaluated_items.truncate(checkpoint.items);
    }

    pub(crate) fn error_checkpoint(&self) -> ErrorCheckpoint {
        ErrorCheckpoint(self.errors.len())
    }

    pub(crate) fn rollback_errors(&mut self, checkpoint: ErrorCheckpoint) {
        self.errors.truncate(checkpoint.0);
    }

    pub(crate) fn into_outcome(self, valid: bool) -> ValidationOutcome {
        ValidationOutcome::new(
            valid,
            if valid { Vec::new() } else { self.errors },
            self.annotations,
        )
    }

    fn current_path(&self) -> String {
        if self.evaluation_path.is_empty() {
            String::new()
        } else {
            format!("/{}", self.evaluation_path.join("/"))
        }
    }

    fn push_keyword_error(
        &mut self,
        wrapper: &EvaluatorWrapper,
        schema: &Schema,
        instance: &JsonNode,
        message: String,
    ) {
        let (base, _) = split_absolute(schema.absolute_uri());
        self.errors.push(ValidationError {
            keyword: Some(wrapper.keyword().to_string()),
            evaluation_path: self.current_path(),
            schema_location: format!("{base}#{}", wrapper.location()),
            instance_location: instance.json_pointer().to_string(),
            message,
        });
    }

    fn push_schema_error(&mut self, schema: &Schema, instance: &JsonNode, message: String) {
        self.errors.push(ValidationError {
            keyword: None,
            evaluation_path: self.current_path(),
            schema_location: schema.absolute_uri().to_string(),
            instance_location: instance.json_pointer().to_string(),
            message,
        });
    }

    fn push_detached_error(&mut self, instance: &JsonNode, message: String) {
        self.errors.push(ValidationError {
            keyword: None,
            evaluation_path: self.current_path(),
            schema_location: String::new(),
            instance_location: instance.json_pointer().to_string(),
            message,
        });
    }

    fn push_annotation(
        &mut self,
        wrapper: &EvaluatorWrapper,
        schema: &Schema,
        instance: &JsonNode,
        value: serde_json::Value,
    ) {
        let (base, _) = split_absolute(schema.absolute_uri());
        self.annotations.push(ValidationAnnotation {
            keyword: wrapper.keyword().to_string(),
            evaluation_path: self.current_path(),
            schema_location: format!("{base}#{}", wrapper.location()),
            instance_location: instance.json_pointer().to_string(),
            annotation: value,
        });
    }
}
