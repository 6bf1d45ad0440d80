//! `unevaluatedItems` and `unevaluatedProperties`.
//!
//! Both run after every other keyword of their schema object (keyword
//! priority) and consume the evaluated-item records contributed by passing
//! applicators at the same instance location, including contributions made
//! through `$ref` and through passing `allOf`/`anyOf`/`oneOf` branches.

use super::{EvaluationOutcome, Evaluator};
use crate::context::EvaluationContext;
use crate::node::JsonNode;
use crate::schema::KeywordContext;
use crate::uri::CompoundUri;
use serde_json::json;

struct UnevaluatedPropertiesEvaluator {
    target: CompoundUri,
}

impl Evaluator for UnevaluatedPropertiesEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let Some(members) = instance.as_object() else {
            return EvaluationOutcome::valid();
        };
        let evaluated = ctx.evaluated_properties_at(instance.json_pointer());
        let checkpoint = ctx.annotation_checkpoint();
        let mut matched = Vec::new();
        let mut failing = Vec::new();
        for (name, child) in members {
            if evaluated.contains(name) {
                continue;
            }
            if ctx.in_path(name, |c| c.apply_reference(&self.target, child)) {
                ctx.record_evaluated_property(instance.json_pointer(), name);
                matched.push(name.clone());
            } else {
                failing.push(name.clone());
            }
        }
        if failing.is_empty() {
            EvaluationOutcome::annotated(json!(matched))
        } else {
            ctx.rollback_annotations(checkpoint);
            EvaluationOutcome::invalid(format!(
                "Unevaluated properties {} do not match the schema",
                failing
                    .iter()
                    .map(|name| format!("'{name}'"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        }
    }
}

pub(super) fn unevaluated_properties_evaluator(
    ctx: &KeywordContext<'_>,
    node: &JsonNode,
) -> Option<Box<dyn Evaluator>> {
    if !node.is_object() && !node.is_boolean() {
        return None;
    }
    Some(Box::new(UnevaluatedPropertiesEvaluator {
        target: ctx.schema_ref(node),
    }))
}

struct UnevaluatedItemsEvaluator {
    target: CompoundUri,
}

impl Evaluator for UnevaluatedItemsEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let Some(items) = instance.as_array() else {
            return EvaluationOutcome::valid();
        };
        let evaluated = ctx.evaluated_items_at(instance.json_pointer());
        let checkpoint = ctx.annotation_checkpoint();
        let mut applied = false;
        let mut valid = true;
        for (index, item) in items.iter().enumerate() {
            if evaluated.contains(&index) {
                continue;
            }
            applied = true;
            let segment = index.to_string();
            if ctx.in_path(&segment, |c| c.apply_reference(&self.target, item)) {
                ctx.record_evaluated_item(instance.json_pointer(), index);
            } else {
                valid = false;
            }
        }
        if !valid {
            ctx.rollback_annotations(checkpoint);
            return EvaluationOutcome::invalid("Unevaluated array items do not match the schema");
        }
        if applied {
            EvaluationOutcome::annotated(json!(true))
        } else {
            EvaluationOutcome::valid()
        }
    }
}

pub(super) fn unevaluated_items_evaluator(
    ctx: &KeywordContext<'_>,
    node: &JsonNode,
) -> Option<Box<dyn Evaluator>> {
    if !node.is_object() && !node.is_boolean() {
        return None;
    }
    Some(Box::new(UnevaluatedItemsEvaluator {
        target: ctx.schema_ref(node),
    }))
}
