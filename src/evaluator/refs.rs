//! Reference evaluators: `$ref`, `$dynamicRef`, and the Draft 2019-09
//! `$recursiveRef`.
//!
//! References are resolved lexically at parse time (against the enclosing
//! `$id` scope) and looked up through the registry at evaluation time. The
//! dynamic variants additionally walk the evaluation's dynamic scope from
//! the outermost schema inward.

use super::{EvaluationOutcome, Evaluator, FactoryError};
use crate::context::EvaluationContext;
use crate::node::JsonNode;
use crate::schema::KeywordContext;
use crate::uri::CompoundUri;

struct RefEvaluator {
    target: CompoundUri,
}

impl Evaluator for RefEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        match ctx.lookup(&self.target) {
            None => EvaluationOutcome::invalid(format!(
                "Couldn't find schema with uri '{}'",
                self.target
            )),
            Some(schema) => {
                if ctx.validate_schema(&schema, instance) {
                    EvaluationOutcome::valid()
                } else {
                    EvaluationOutcome::invalid(format!(
                        "Value does not match the schema referenced as '{}'",
                        self.target
                    ))
                }
            }
        }
    }
}

pub(super) fn ref_evaluator(
    ctx: &KeywordContext<'_>,
    node: &JsonNode,
) -> Result<Option<Box<dyn Evaluator>>, FactoryError> {
    let Some(reference) = node.as_str() else {
        return Ok(None);
    };
    let target = ctx
        .resolve_reference(reference)
        .map_err(|e| Box::new(e) as FactoryError)?;
    Ok(Some(Box::new(RefEvaluator { target })))
}

struct DynamicRefEvaluator {
    target: CompoundUri,
}

impl Evaluator for DynamicRefEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        // The dynamic walk only happens when the lexically resolved target
        // base declares the fragment as a dynamic anchor; otherwise this
        // behaves exactly like $ref.
        let schema = if !self.target.has_pointer_fragment()
            && ctx.lookup_dynamic(&self.target).is_some()
        {
            ctx.resolve_dynamic_anchor(&self.target.fragment)
                .or_else(|| ctx.lookup(&self.target))
        } else {
            ctx.lookup(&self.target)
        };
        match schema {
            None => EvaluationOutcome::invalid(format!(
                "Couldn't find schema with uri '{}'",
                self.target
            )),
            Some(schema) => {
                if ctx.validate_schema(&schema, instance) {
                    EvaluationOutcome::valid()
                } else {
                    EvaluationOutcome::invalid(format!(
                        "Value does not match the schema dynamically referenced as '{}'",
                        self.target
                    ))
                }
            }
        }
    }
}

pub(super) fn dynamic_ref_evaluator(
    ctx: &KeywordContext<'_>,
    node: &JsonNode,
) -> Result<Option<Box<dyn Evaluator>>, FactoryError> {
    let Some(reference) = node.as_str() else {
        return Ok(None);
    };
    let target = ctx
        .resolve_reference(reference)
        .map_err(|e| Box::new(e) as FactoryError)?;
    Ok(Some(Box::new(DynamicRefEvaluator { target })))
}

struct RecursiveRefEvaluator {
    target: CompoundUri,
}

impl Evaluator for RecursiveRefEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let schema = ctx
            .resolve_recursive_root()
            .or_else(|| ctx.lookup(&self.target));
        match schema {
            None => EvaluationOutcome::invalid(format!(
                "Couldn't find schema with uri '{}'",
                self.target
            )),
            Some(schema) => {
                if ctx.validate_schema(&schema, instance) {
                    EvaluationOutcome::valid()
                } else {
                    EvaluationOutcome::invalid(
                        "Value does not match the recursively referenced schema",
                    )
                }
            }
        }
    }
}

pub(super) fn recursive_ref_evaluator(
    ctx: &KeywordContext<'_>,
    node: &JsonNode,
) -> Result<Option<Box<dyn Evaluator>>, FactoryError> {
    if node.as_str() != Some("#") {
        return Ok(None);
    }
    Ok(Some(Box::new(RecursiveRefEvaluator {
        target: CompoundUri::new(ctx.parent_uri(), ""),
    })))
}
