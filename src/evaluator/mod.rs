//! Keyword evaluators.
//!
//! A schema object compiles into one evaluator per keyword. At validation
//! time the evaluators of a schema run in keyword-priority order (source
//! order within a tier), so keywords that consume annotations run after the
//! keywords that produce them regardless of how the schema text orders its
//! members.

mod applicators;
mod format;
mod primitive;
mod refs;
mod unevaluated;

use crate::context::EvaluationContext;
use crate::node::JsonNode;
use crate::schema::KeywordContext;
use serde_json::Value;

pub(crate) use primitive::{boolean_schema_evaluator, AnnotationEvaluator};

/// What a single evaluator produced: success with an optional annotation
/// value, or a failure message.
#[derive(Debug)]
pub enum EvaluationOutcome {
    Valid(Option<Value>),
    Invalid(String),
}

impl EvaluationOutcome {
    pub fn valid() -> Self {
        EvaluationOutcome::Valid(None)
    }

    pub fn annotated(value: Value) -> Self {
        EvaluationOutcome::Valid(Some(value))
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        EvaluationOutcome::Invalid(message.into())
    }
}

/// A compiled keyword check.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome;
}

/// Error type user factories report; passed through to the caller verbatim.
pub type FactoryError = Box<dyn std::error::Error + Send + Sync>;

/// Creates evaluators for keywords it recognizes. Returning `Ok(None)` means
/// "not my keyword" and hands the keyword to the next factory in the chain.
pub trait EvaluatorFactory: Send + Sync {
    fn create(
        &self,
        ctx: &KeywordContext<'_>,
        keyword: &str,
        node: &JsonNode,
    ) -> Result<Option<Box<dyn Evaluator>>, FactoryError>;
}

impl<F> EvaluatorFactory for F
where
    F: Fn(&KeywordContext<'_>, &str, &JsonNode) -> Result<Option<Box<dyn Evaluator>>, FactoryError>
        + Send
        + Sync,
{
    fn create(
        &self,
        ctx: &KeywordContext<'_>,
        keyword: &str,
        node: &JsonNode,
    ) -> Result<Option<Box<dyn Evaluator>>, FactoryError> {
        self(ctx, keyword, node)
    }
}

/// An evaluator bound to its keyword, its location in the schema document,
/// and its runtime priority.
pub struct EvaluatorWrapper {
    keyword: String,
    location: String,
    priority: u32,
    evaluator: Box<dyn Evaluator>,
}

impl EvaluatorWrapper {
    pub(crate) fn new(
        keyword: impl Into<String>,
        location: impl Into<String>,
        evaluator: Box<dyn Evaluator>,
    ) -> Self {
        let keyword = keyword.into();
        let priority = keyword_priority(&keyword);
        Self {
            keyword,
            location: location.into(),
            priority,
            evaluator,
        }
    }

    pub(crate) fn keyword(&self) -> &str {
        &self.keyword
    }

    /// JSON Pointer of the keyword value within its schema document.
    pub(crate) fn location(&self) -> &str {
        &self.location
    }

    pub(crate) fn priority(&self) -> u32 {
        self.priority
    }

    pub(crate) fn evaluate(
        &self,
        ctx: &mut EvaluationContext<'_>,
        instance: &JsonNode,
    ) -> EvaluationOutcome {
        self.evaluator.evaluate(ctx, instance)
    }
}

impl std::fmt::Debug for EvaluatorWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatorWrapper")
            .field("keyword", &self.keyword)
            .field("location", &self.location)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Runtime order of keywords within one schema object, lowest first.
/// References run before everything, `unevaluated*` after everything.
pub(crate) fn keyword_priority(keyword: &str) -> u32 {
    match keyword {
        "$ref" => 0,
        "$dynamicRef" => 1,
        "$recursiveRef" => 2,
        "type" => 10,
        "enum" => 11,
        "const" => 12,
        "multipleOf" | "maximum" | "exclusiveMaximum" | "minimum" | "exclusiveMinimum"
        | "maxLength" | "minLength" | "pattern" | "maxItems" | "minItems" | "uniqueItems"
        | "maxProperties" | "minProperties" | "required" => 20,
        "format" => 25,
        "properties" => 30,
        "patternProperties" => 31,
        "additionalProperties" => 32,
        "propertyNames" => 33,
        "items" => 34,
        "prefixItems" => 35,
        "additionalItems" => 36,
        "contains" => 37,
        "allOf" => 40,
        "anyOf" => 41,
        "oneOf" => 42,
        "not" => 43,
        "if" => 44,
        "dependentSchemas" => 50,
        "dependentRequired" => 51,
        "unevaluatedItems" => 60,
        "unevaluatedProperties" => 61,
        // Annotation and unknown keywords.
        _ => 28,
    }
}

/// Keywords consumed structurally by the parser or by sibling evaluators;
/// they never produce an evaluator of their own, not even an annotation.
pub(crate) fn is_structural_keyword(keyword: &str) -> bool {
    matches!(
        keyword,
        "$id"
            | "$schema"
            | "$anchor"
            | "$dynamicAnchor"
            | "$recursiveAnchor"
            | "$vocabulary"
            | "$comment"
            | "$defs"
            | "definitions"
            | "then"
            | "else"
            | "minContains"
            | "maxContains"
    )
}

/// Builtin factory for Draft 2020-12 keywords.
#[derive(Debug, Default, Clone, Copy)]
pub struct Draft2020EvaluatorFactory;

impl EvaluatorFactory for Draft2020EvaluatorFactory {
    fn create(
        &self,
        ctx: &KeywordContext<'_>,
        keyword: &str,
        node: &JsonNode,
    ) -> Result<Option<Box<dyn Evaluator>>, FactoryError> {
        match keyword {
            "$ref" => refs::ref_evaluator(ctx, node),
            "$dynamicRef" => refs::dynamic_ref_evaluator(ctx, node),
            "$recursiveRef" => refs::recursive_ref_evaluator(ctx, node),
            "items" => Ok(applicators::items_evaluator(ctx, node)),
            "prefixItems" => Ok(applicators::prefix_items_evaluator(ctx, node)),
            _ => create_common(ctx, keyword, node),
        }
    }
}

/// Builtin factory for Draft 2019-09 keywords: `items` takes its legacy
/// schema-or-array form, `additionalItems` applies past a tuple `items`, and
/// `prefixItems` is not a keyword.
#[derive(Debug, Default, Clone, Copy)]
pub struct Draft2019EvaluatorFactory;

impl EvaluatorFactory for Draft2019EvaluatorFactory {
    fn create(
        &self,
        ctx: &KeywordContext<'_>,
        keyword: &str,
        node: &JsonNode,
    ) -> Result<Option<Box<dyn Evaluator>>, FactoryError> {
        match keyword {
            "$ref" => refs::ref_evaluator(ctx, node),
            "$recursiveRef" => refs::recursive_ref_evaluator(ctx, node),
            "items" => Ok(applicators::legacy_items_evaluator(ctx, node)),
            "additionalItems" => Ok(applicators::additional_items_evaluator(ctx, node)),
            _ => create_common(ctx, keyword, node),
        }
    }
}

fn create_common(
    ctx: &KeywordContext<'_>,
    keyword: &str,
    node: &JsonNode,
) -> Result<Option<Box<dyn Evaluator>>, FactoryError> {
    let evaluator = match keyword {
        "type" => primitive::type_evaluator(node),
        "enum" => primitive::enum_evaluator(node),
        "const" => primitive::const_evaluator(node),
        "multipleOf" => primitive::multiple_of_evaluator(node),
        "maximum" => primitive::maximum_evaluator(node, false),
        "exclusiveMaximum" => primitive::maximum_evaluator(node, true),
        "minimum" => primitive::minimum_evaluator(node, false),
        "exclusiveMinimum" => primitive::minimum_evaluator(node, true),
        "maxLength" => primitive::max_length_evaluator(node),
        "minLength" => primitive::min_length_evaluator(node),
        "pattern" => return primitive::pattern_evaluator(node),
        "maxItems" => primitive::max_items_evaluator(node),
        "minItems" => primitive::min_items_evaluator(node),
        "uniqueItems" => primitive::unique_items_evaluator(node),
        "maxProperties" => primitive::max_properties_evaluator(node),
        "minProperties" => primitive::min_properties_evaluator(node),
        "required" => primitive::required_evaluator(node),
        "dependentRequired" => primitive::dependent_required_evaluator(node),
        "properties" => applicators::properties_evaluator(ctx, node),
        "patternProperties" => return applicators::pattern_properties_evaluator(ctx, node),
        "additionalProperties" => applicators::additional_properties_evaluator(ctx, node),
        "propertyNames" => applicators::property_names_evaluator(ctx, node),
        "contains" => applicators::contains_evaluator(ctx, node),
        "allOf" => applicators::all_of_evaluator(ctx, node),
        "anyOf" => applicators::any_of_evaluator(ctx, node),
        "oneOf" => applicators::one_of_evaluator(ctx, node),
        "not" => applicators::not_evaluator(ctx, node),
        "if" => applicators::if_then_else_evaluator(ctx, node),
        "dependentSchemas" => applicators::dependent_schemas_evaluator(ctx, node),
        "unevaluatedItems" => unevaluated::unevaluated_items_evaluator(ctx, node),
        "unevaluatedProperties" => unevaluated::unevaluated_properties_evaluator(ctx, node),
        "format" => format::format_evaluator(ctx, node),
        "title" | "description" | "default" | "deprecated" | "readOnly" | "writeOnly"
        | "examples" | "contentEncoding" | "contentMediaType" | "contentSchema" => {
            Some(AnnotationEvaluator::boxed(node))
        }
        _ => None,
    };
    Ok(evaluator)
}
