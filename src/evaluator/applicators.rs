//! Applicator evaluators: keywords that apply subschemas to parts of the
//! instance (or to the instance itself) and contribute evaluated-item
//! annotations for the `unevaluated*` keywords.
//!
//! Subschemas are never owned; each evaluator stores the absolute URIs of
//! its subschemas and fetches them through the registry at evaluation time,
//! which keeps cyclic schema graphs free of owning cycles.

use super::{EvaluationOutcome, Evaluator, FactoryError};
use crate::context::EvaluationContext;
use crate::node::JsonNode;
use crate::schema::KeywordContext;
use crate::uri::CompoundUri;
use regex::Regex;
use serde_json::json;

fn quoted_list<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|name| format!("'{}'", name.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_schema_node(node: &JsonNode) -> bool {
    node.is_object() || node.is_boolean()
}

struct PropertiesEvaluator {
    refs: Vec<(String, CompoundUri)>,
}

impl Evaluator for PropertiesEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let Some(members) = instance.as_object() else {
            return EvaluationOutcome::valid();
        };
        let checkpoint = ctx.annotation_checkpoint();
        let mut matched = Vec::new();
        let mut failing = Vec::new();
        for (name, child) in members {
            let Some((_, reference)) = self.refs.iter().find(|(known, _)| known == name) else {
                continue;
            };
            if ctx.in_path(name, |c| c.apply_reference(reference, child)) {
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
                "Properties {} do not match their schemas",
                quoted_list(&failing)
            ))
        }
    }
}

pub(super) fn properties_evaluator(
    ctx: &KeywordContext<'_>,
    node: &JsonNode,
) -> Option<Box<dyn Evaluator>> {
    let refs = node
        .as_object()?
        .iter()
        .map(|(name, subschema)| (name.clone(), ctx.schema_ref(subschema)))
        .collect();
    Some(Box::new(PropertiesEvaluator { refs }))
}

struct PatternPropertiesEvaluator {
    patterns: Vec<(String, Regex, CompoundUri)>,
}

impl Evaluator for PatternPropertiesEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let Some(members) = instance.as_object() else {
            return EvaluationOutcome::valid();
        };
        let checkpoint = ctx.annotation_checkpoint();
        let mut matched = Vec::new();
        let mut failing = Vec::new();
        for (name, child) in members {
            for (_, regex, reference) in &self.patterns {
                if !regex.is_match(name) {
                    continue;
                }
                if ctx.in_path(name, |c| c.apply_reference(reference, child)) {
                    ctx.record_evaluated_property(instance.json_pointer(), name);
                    if !matched.contains(name) {
                        matched.push(name.clone());
                    }
                } else {
                    failing.push(name.clone());
                }
            }
        }
        if failing.is_empty() {
            EvaluationOutcome::annotated(json!(matched))
        } else {
            ctx.rollback_annotations(checkpoint);
            EvaluationOutcome::invalid(format!(
                "Properties {} do not match their pattern schemas",
                quoted_list(&failing)
            ))
        }
    }
}

pub(super) fn pattern_properties_evaluator(
    ctx: &KeywordContext<'_>,
    node: &JsonNode,
) -> Result<Option<Box<dyn Evaluator>>, FactoryError> {
    let Some(members) = node.as_object() else {
        return Ok(None);
    };
    let mut patterns = Vec::new();
    for (source, subschema) in members {
        let regex = Regex::new(source)
            .map_err(|e| format!("invalid property pattern '{source}': {e}"))?;
        patterns.push((source.clone(), regex, ctx.schema_ref(subschema)));
    }
    Ok(Some(Box::new(PatternPropertiesEvaluator { patterns })))
}

struct AdditionalPropertiesEvaluator {
    target: CompoundUri,
    sibling_names: Vec<String>,
    sibling_patterns: Vec<Regex>,
}

impl Evaluator for AdditionalPropertiesEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let Some(members) = instance.as_object() else {
            return EvaluationOutcome::valid();
        };
        let checkpoint = ctx.annotation_checkpoint();
        let mut matched = Vec::new();
        let mut failing = Vec::new();
        for (name, child) in members {
            if self.sibling_names.iter().any(|known| known == name)
                || self.sibling_patterns.iter().any(|regex| regex.is_match(name))
            {
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
                "Additional properties {} do not match the schema",
                quoted_list(&failing)
            ))
        }
    }
}

pub(super) fn additional_properties_evaluator(
    ctx: &KeywordContext<'_>,
    node: &JsonNode,
) -> Option<Box<dyn Evaluator>> {
    if !is_schema_node(node) {
        return None;
    }
    let sibling_names = ctx
        .schema_object()
        .member("properties")
        .and_then(JsonNode::as_object)
        .map(|members| members.iter().map(|(name, _)| name.clone()).collect())
        .unwrap_or_default();
    let sibling_patterns = ctx
        .schema_object()
        .member("patternProperties")
        .and_then(JsonNode::as_object)
        .map(|members| {
            members
                .iter()
                .filter_map(|(source, _)| Regex::new(source).ok())
                .collect()
        })
        .unwrap_or_default();
    Some(Box::new(AdditionalPropertiesEvaluator {
        target: ctx.schema_ref(node),
        sibling_names,
        sibling_patterns,
    }))
}

struct PropertyNamesEvaluator {
    target: CompoundUri,
}

impl Evaluator for PropertyNamesEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let Some(members) = instance.as_object() else {
            return EvaluationOutcome::valid();
        };
        let mut failing = Vec::new();
        for (name, _) in members {
            let name_node = JsonNode::string(
                name.clone(),
                format!(
                    "{}/{}",
                    instance.json_pointer(),
                    crate::uri::escape_pointer_token(name)
                ),
            );
            if !ctx.in_path(name, |c| c.apply_reference(&self.target, &name_node)) {
                failing.push(name.clone());
            }
        }
        if failing.is_empty() {
            EvaluationOutcome::valid()
        } else {
            EvaluationOutcome::invalid(format!(
                "Property names {} do not match the schema",
                quoted_list(&failing)
            ))
        }
    }
}

pub(super) fn property_names_evaluator(
    ctx: &KeywordContext<'_>,
    node: &JsonNode,
) -> Option<Box<dyn Evaluator>> {
    if !is_schema_node(node) {
        return None;
    }
    Some(Box::new(PropertyNamesEvaluator {
        target: ctx.schema_ref(node),
    }))
}

struct PrefixItemsEvaluator {
    refs: Vec<CompoundUri>,
}

impl Evaluator for PrefixItemsEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let Some(items) = instance.as_array() else {
            return EvaluationOutcome::valid();
        };
        let applied = items.len().min(self.refs.len());
        if applied == 0 {
            return EvaluationOutcome::valid();
        }
        let checkpoint = ctx.annotation_checkpoint();
        let mut valid = true;
        for index in 0..applied {
            let segment = index.to_string();
            if ctx.in_path(&segment, |c| c.apply_reference(&self.refs[index], &items[index])) {
                ctx.record_evaluated_item(instance.json_pointer(), index);
            } else {
                valid = false;
            }
        }
        if !valid {
            ctx.rollback_annotations(checkpoint);
            return EvaluationOutcome::invalid("Array items do not match their positional schemas");
        }
        if applied == items.len() {
            EvaluationOutcome::annotated(json!(true))
        } else {
            EvaluationOutcome::annotated(json!(applied - 1))
        }
    }
}

pub(super) fn prefix_items_evaluator(
    ctx: &KeywordContext<'_>,
    node: &JsonNode,
) -> Option<Box<dyn Evaluator>> {
    let refs = node.as_array()?.iter().map(|item| ctx.schema_ref(item)).collect();
    Some(Box::new(PrefixItemsEvaluator { refs }))
}

struct ItemsEvaluator {
    target: CompoundUri,
    start: usize,
}

impl Evaluator for ItemsEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let Some(items) = instance.as_array() else {
            return EvaluationOutcome::valid();
        };
        if items.len() <= self.start {
            return EvaluationOutcome::valid();
        }
        let checkpoint = ctx.annotation_checkpoint();
        let mut valid = true;
        for (index, item) in items.iter().enumerate().skip(self.start) {
            let segment = index.to_string();
            if ctx.in_path(&segment, |c| c.apply_reference(&self.target, item)) {
                ctx.record_evaluated_item(instance.json_pointer(), index);
            } else {
                valid = false;
            }
        }
        if valid {
            EvaluationOutcome::annotated(json!(true))
        } else {
            ctx.rollback_annotations(checkpoint);
            EvaluationOutcome::invalid("Array items do not match the schema")
        }
    }
}

/// Draft 2020-12 `items`: applies to the indices past the sibling
/// `prefixItems`.
pub(super) fn items_evaluator(
    ctx: &KeywordContext<'_>,
    node: &JsonNode,
) -> Option<Box<dyn Evaluator>> {
    if !is_schema_node(node) {
        return None;
    }
    let start = ctx
        .schema_object()
        .member("prefixItems")
        .and_then(JsonNode::as_array)
        .map(<[JsonNode]>::len)
        .unwrap_or(0);
    Some(Box::new(ItemsEvaluator {
        target: ctx.schema_ref(node),
        start,
    }))
}

/// Draft 2019-09 `items`: a single schema for every item, or a tuple of
/// positional schemas.
pub(super) fn legacy_items_evaluator(
    ctx: &KeywordContext<'_>,
    node: &JsonNode,
) -> Option<Box<dyn Evaluator>> {
    if let Some(tuple) = node.as_array() {
        let refs = tuple.iter().map(|item| ctx.schema_ref(item)).collect();
        return Some(Box::new(PrefixItemsEvaluator { refs }));
    }
    Some(Box::new(ItemsEvaluator {
        target: ctx.schema_ref(node),
        start: 0,
    }))
}

/// Draft 2019-09 `additionalItems`: only meaningful when the sibling `items`
/// is a tuple.
pub(super) fn additional_items_evaluator(
    ctx: &KeywordContext<'_>,
    node: &JsonNode,
) -> Option<Box<dyn Evaluator>> {
    if !is_schema_node(node) {
        return None;
    }
    let start = ctx
        .schema_object()
        .member("items")
        .and_then(JsonNode::as_array)
        .map(<[JsonNode]>::len)?;
    Some(Box::new(ItemsEvaluator {
        target: ctx.schema_ref(node),
        start,
    }))
}

struct ContainsEvaluator {
    target: CompoundUri,
    min: usize,
    max: Option<usize>,
}

impl Evaluator for ContainsEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let Some(items) = instance.as_array() else {
            return EvaluationOutcome::valid();
        };
        let mut matched = Vec::new();
        for (index, item) in items.iter().enumerate() {
            let errors = ctx.error_checkpoint();
            let segment = index.to_string();
            if ctx.in_path(&segment, |c| c.apply_reference(&self.target, item)) {
                matched.push(index);
            } else {
                ctx.rollback_errors(errors);
            }
        }
        if matched.len() < self.min {
            return EvaluationOutcome::invalid(format!(
                "Array contains {} matching items, expected at least {}",
                matched.len(),
                self.min
            ));
        }
        if let Some(max) = self.max {
            if matched.len() > max {
                return EvaluationOutcome::invalid(format!(
                    "Array contains {} matching items, expected at most {}",
                    matched.len(),
                    max
                ));
            }
        }
        for index in &matched {
            ctx.record_evaluated_item(instance.json_pointer(), *index);
        }
        EvaluationOutcome::annotated(json!(matched))
    }
}

pub(super) fn contains_evaluator(
    ctx: &KeywordContext<'_>,
    node: &JsonNode,
) -> Option<Box<dyn Evaluator>> {
    if !is_schema_node(node) {
        return None;
    }
    let sibling_count = |keyword: &str| {
        ctx.schema_object()
            .member(keyword)
            .and_then(JsonNode::as_number)
            .filter(|n| n.is_integral() && n.as_f64() >= 0.0)
            .map(|n| n.as_f64() as usize)
    };
    Some(Box::new(ContainsEvaluator {
        target: ctx.schema_ref(node),
        min: sibling_count("minContains").unwrap_or(1),
        max: sibling_count("maxContains"),
    }))
}

struct AllOfEvaluator {
    refs: Vec<CompoundUri>,
}

impl Evaluator for AllOfEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let checkpoint = ctx.annotation_checkpoint();
        let mut failed = 0;
        for (index, reference) in self.refs.iter().enumerate() {
            let segment = index.to_string();
            if !ctx.in_path(&segment, |c| c.apply_reference(reference, instance)) {
                failed += 1;
            }
        }
        if failed == 0 {
            EvaluationOutcome::valid()
        } else {
            ctx.rollback_annotations(checkpoint);
            EvaluationOutcome::invalid(format!(
                "{failed} of {} subschemas did not match",
                self.refs.len()
            ))
        }
    }
}

pub(super) fn all_of_evaluator(
    ctx: &KeywordContext<'_>,
    node: &JsonNode,
) -> Option<Box<dyn Evaluator>> {
    let refs = node.as_array()?.iter().map(|item| ctx.schema_ref(item)).collect();
    Some(Box::new(AllOfEvaluator { refs }))
}

struct AnyOfEvaluator {
    refs: Vec<CompoundUri>,
}

impl Evaluator for AnyOfEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let errors = ctx.error_checkpoint();
        let mut any_passed = false;
        // Every branch runs even after a pass, so annotations for
        // unevaluated* are collected from all passing branches.
        for (index, reference) in self.refs.iter().enumerate() {
            let segment = index.to_string();
            if ctx.in_path(&segment, |c| c.apply_reference(reference, instance)) {
                any_passed = true;
            }
        }
        if any_passed {
            ctx.rollback_errors(errors);
            EvaluationOutcome::valid()
        } else {
            EvaluationOutcome::invalid("None of the subschemas matched")
        }
    }
}

pub(super) fn any_of_evaluator(
    ctx: &KeywordContext<'_>,
    node: &JsonNode,
) -> Option<Box<dyn Evaluator>> {
    let refs = node.as_array()?.iter().map(|item| ctx.schema_ref(item)).collect();
    Some(Box::new(AnyOfEvaluator { refs }))
}

struct OneOfEvaluator {
    refs: Vec<CompoundUri>,
}

impl Evaluator for OneOfEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let errors = ctx.error_checkpoint();
        let checkpoint = ctx.annotation_checkpoint();
        // No short-circuit: uniqueness can only be established by running
        // every branch.
        let mut passed = 0;
        for (index, reference) in self.refs.iter().enumerate() {
            let segment = index.to_string();
            if ctx.in_path(&segment, |c| c.apply_reference(reference, instance)) {
                passed += 1;
            }
        }
        if passed == 1 {
            ctx.rollback_errors(errors);
            EvaluationOutcome::valid()
        } else {
            ctx.rollback_annotations(checkpoint);
            EvaluationOutcome::invalid(format!(
                "Expected exactly one subschema to match, {passed} matched"
            ))
        }
    }
}

pub(super) fn one_of_evaluator(
    ctx: &KeywordContext<'_>,
    node: &JsonNode,
) -> Option<Box<dyn Evaluator>> {
    let refs = node.as_array()?.iter().map(|item| ctx.schema_ref(item)).collect();
    Some(Box::new(OneOfEvaluator { refs }))
}

struct NotEvaluator {
    target: CompoundUri,
}

impl Evaluator for NotEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let errors = ctx.error_checkpoint();
        let checkpoint = ctx.annotation_checkpoint();
        let passed = ctx.apply_reference(&self.target, instance);
        // A negated schema contributes neither errors nor annotations.
        ctx.rollback_errors(errors);
        ctx.rollback_annotations(checkpoint);
        if passed {
            EvaluationOutcome::invalid("Value must not match the schema")
        } else {
            EvaluationOutcome::valid()
        }
    }
}

pub(super) fn not_evaluator(
    ctx: &KeywordContext<'_>,
    node: &JsonNode,
) -> Option<Box<dyn Evaluator>> {
    if !is_schema_node(node) {
        return None;
    }
    Some(Box::new(NotEvaluator {
        target: ctx.schema_ref(node),
    }))
}

struct IfThenElseEvaluator {
    condition: CompoundUri,
    then_target: Option<CompoundUri>,
    else_target: Option<CompoundUri>,
}

impl Evaluator for IfThenElseEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let errors = ctx.error_checkpoint();
        let condition = ctx.apply_reference(&self.condition, instance);
        if !condition {
            // The condition is speculative; its failures never surface.
            ctx.rollback_errors(errors);
        }
        let branch = if condition {
            self.then_target.as_ref()
        } else {
            self.else_target.as_ref()
        };
        match branch {
            None => EvaluationOutcome::valid(),
            Some(target) => {
                if ctx.apply_reference(target, instance) {
                    EvaluationOutcome::valid()
                } else if condition {
                    EvaluationOutcome::invalid("Value does not match the 'then' schema")
                } else {
                    EvaluationOutcome::invalid("Value does not match the 'else' schema")
                }
            }
        }
    }
}

pub(super) fn if_then_else_evaluator(
    ctx: &KeywordContext<'_>,
    node: &JsonNode,
) -> Option<Box<dyn Evaluator>> {
    if !is_schema_node(node) {
        return None;
    }
    Some(Box::new(IfThenElseEvaluator {
        condition: ctx.schema_ref(node),
        then_target: ctx.schema_object().member("then").map(|n| ctx.schema_ref(n)),
        else_target: ctx.schema_object().member("else").map(|n| ctx.schema_ref(n)),
    }))
}

struct DependentSchemasEvaluator {
    refs: Vec<(String, CompoundUri)>,
}

impl Evaluator for DependentSchemasEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        if instance.as_object().is_none() {
            return EvaluationOutcome::valid();
        }
        let checkpoint = ctx.annotation_checkpoint();
        let mut failing = Vec::new();
        for (property, reference) in &self.refs {
            if instance.member(property).is_none() {
                continue;
            }
            if !ctx.in_path(property, |c| c.apply_reference(reference, instance)) {
                failing.push(property.clone());
            }
        }
        if failing.is_empty() {
            EvaluationOutcome::valid()
        } else {
            ctx.rollback_annotations(checkpoint);
            EvaluationOutcome::invalid(format!(
                "Dependent schemas for {} did not match",
                quoted_list(&failing)
            ))
        }
    }
}

pub(super) fn dependent_schemas_evaluator(
    ctx: &KeywordContext<'_>,
    node: &JsonNode,
) -> Option<Box<dyn Evaluator>> {
    let refs = node
        .as_object()?
        .iter()
        .map(|(property, subschema)| (property.clone(), ctx.schema_ref(subschema)))
        .collect();
    Some(Box::new(DependentSchemasEvaluator { refs }))
}
