//! Assertion evaluators for primitive constraints, plus boolean schemas and
//! annotation passthrough.
//!
//! Constructors return `None` when the keyword value does not have the shape
//! the keyword requires; with meta-schema validation enabled such schemas
//! are rejected earlier, and with it disabled the keyword is simply inert.

use super::{EvaluationOutcome, Evaluator, FactoryError};
use crate::context::EvaluationContext;
use crate::node::{JsonNode, NodeType};
use regex::Regex;

pub(crate) struct AnnotationEvaluator {
    value: serde_json::Value,
}

impl AnnotationEvaluator {
    pub(crate) fn boxed(node: &JsonNode) -> Box<dyn Evaluator> {
        Box::new(Self {
            value: node.to_value(),
        })
    }
}

impl Evaluator for AnnotationEvaluator {
    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>, _instance: &JsonNode) -> EvaluationOutcome {
        EvaluationOutcome::annotated(self.value.clone())
    }
}

struct TrueSchemaEvaluator;

impl Evaluator for TrueSchemaEvaluator {
    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>, _instance: &JsonNode) -> EvaluationOutcome {
        EvaluationOutcome::valid()
    }
}

struct FalseSchemaEvaluator;

impl Evaluator for FalseSchemaEvaluator {
    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>, _instance: &JsonNode) -> EvaluationOutcome {
        EvaluationOutcome::invalid("Schema 'false' always fails validation")
    }
}

pub(crate) fn boolean_schema_evaluator(value: bool) -> Box<dyn Evaluator> {
    if value {
        Box::new(TrueSchemaEvaluator)
    } else {
        Box::new(FalseSchemaEvaluator)
    }
}

struct TypeEvaluator {
    types: Vec<String>,
}

impl Evaluator for TypeEvaluator {
    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let actual = instance.node_type();
        let matched = self.types.iter().any(|name| type_matches(name, actual));
        if matched {
            EvaluationOutcome::valid()
        } else if self.types.len() == 1 {
            EvaluationOutcome::invalid(format!(
                "Expected {}, got {}",
                self.types[0],
                actual.name()
            ))
        } else {
            EvaluationOutcome::invalid(format!(
                "Expected one of [{}], got {}",
                self.types.join(", "),
                actual.name()
            ))
        }
    }
}

fn type_matches(name: &str, actual: NodeType) -> bool {
    match name {
        "number" => matches!(actual, NodeType::Number | NodeType::Integer),
        other => other == actual.name(),
    }
}

pub(super) fn type_evaluator(node: &JsonNode) -> Option<Box<dyn Evaluator>> {
    let types = if let Some(single) = node.as_str() {
        vec![single.to_string()]
    } else {
        node.as_array()?
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()?
    };
    Some(Box::new(TypeEvaluator { types }))
}

struct ConstEvaluator {
    value: JsonNode,
}

impl Evaluator for ConstEvaluator {
    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        if *instance == self.value {
            EvaluationOutcome::valid()
        } else {
            EvaluationOutcome::invalid(format!(
                "Value must be the constant {}",
                self.value.to_value()
            ))
        }
    }
}

pub(super) fn const_evaluator(node: &JsonNode) -> Option<Box<dyn Evaluator>> {
    Some(Box::new(ConstEvaluator {
        value: node.clone(),
    }))
}

struct EnumEvaluator {
    values: Vec<JsonNode>,
}

impl Evaluator for EnumEvaluator {
    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        if self.values.iter().any(|value| value == instance) {
            EvaluationOutcome::valid()
        } else {
            EvaluationOutcome::invalid(format!(
                "Value must be one of: {}",
                self.values
                    .iter()
                    .map(|value| value.to_value().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        }
    }
}

pub(super) fn enum_evaluator(node: &JsonNode) -> Option<Box<dyn Evaluator>> {
    Some(Box::new(EnumEvaluator {
        values: node.as_array()?.to_vec(),
    }))
}

struct MultipleOfEvaluator {
    factor: f64,
}

impl Evaluator for MultipleOfEvaluator {
    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let Some(number) = instance.as_number() else {
            return EvaluationOutcome::valid();
        };
        let value = number.as_f64();
        let remainder = (value % self.factor).abs();
        if remainder < f64::EPSILON || (self.factor - remainder).abs() < f64::EPSILON {
            EvaluationOutcome::valid()
        } else {
            EvaluationOutcome::invalid(format!(
                "Number {} is not a multiple of {}",
                value, self.factor
            ))
        }
    }
}

pub(super) fn multiple_of_evaluator(node: &JsonNode) -> Option<Box<dyn Evaluator>> {
    let factor = node.as_number()?.as_f64();
    if factor <= 0.0 {
        return None;
    }
    Some(Box::new(MultipleOfEvaluator { factor }))
}

struct BoundEvaluator {
    limit: f64,
    upper: bool,
    exclusive: bool,
}

impl Evaluator for BoundEvaluator {
    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let Some(number) = instance.as_number() else {
            return EvaluationOutcome::valid();
        };
        let value = number.as_f64();
        let within = match (self.upper, self.exclusive) {
            (true, false) => value <= self.limit,
            (true, true) => value < self.limit,
            (false, false) => value >= self.limit,
            (false, true) => value > self.limit,
        };
        if within {
            EvaluationOutcome::valid()
        } else {
            let relation = match (self.upper, self.exclusive) {
                (true, false) => "greater than maximum",
                (true, true) => "not less than",
                (false, false) => "less than minimum",
                (false, true) => "not greater than",
            };
            EvaluationOutcome::invalid(format!("Number {} is {} {}", value, relation, self.limit))
        }
    }
}

pub(super) fn maximum_evaluator(node: &JsonNode, exclusive: bool) -> Option<Box<dyn Evaluator>> {
    Some(Box::new(BoundEvaluator {
        limit: node.as_number()?.as_f64(),
        upper: true,
        exclusive,
    }))
}

pub(super) fn minimum_evaluator(node: &JsonNode, exclusive: bool) -> Option<Box<dyn Evaluator>> {
    Some(Box::new(BoundEvaluator {
        limit: node.as_number()?.as_f64(),
        upper: false,
        exclusive,
    }))
}

struct LengthEvaluator {
    limit: usize,
    upper: bool,
}

impl Evaluator for LengthEvaluator {
    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let Some(text) = instance.as_str() else {
            return EvaluationOutcome::valid();
        };
        let length = text.chars().count();
        let within = if self.upper {
            length <= self.limit
        } else {
            length >= self.limit
        };
        if within {
            EvaluationOutcome::valid()
        } else if self.upper {
            EvaluationOutcome::invalid(format!(
                "String length {} is greater than maximum {}",
                length, self.limit
            ))
        } else {
            EvaluationOutcome::invalid(format!(
                "String length {} is less than minimum {}",
                length, self.limit
            ))
        }
    }
}

pub(super) fn max_length_evaluator(node: &JsonNode) -> Option<Box<dyn Evaluator>> {
    Some(Box::new(LengthEvaluator {
        limit: non_negative_integer(node)?,
        upper: true,
    }))
}

pub(super) fn min_length_evaluator(node: &JsonNode) -> Option<Box<dyn Evaluator>> {
    Some(Box::new(LengthEvaluator {
        limit: non_negative_integer(node)?,
        upper: false,
    }))
}

struct PatternEvaluator {
    source: String,
    regex: Regex,
}

impl Evaluator for PatternEvaluator {
    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let Some(text) = instance.as_str() else {
            return EvaluationOutcome::valid();
        };
        if self.regex.is_match(text) {
            EvaluationOutcome::valid()
        } else {
            EvaluationOutcome::invalid(format!(
                "String '{}' does not match pattern '{}'",
                text, self.source
            ))
        }
    }
}

pub(super) fn pattern_evaluator(
    node: &JsonNode,
) -> Result<Option<Box<dyn Evaluator>>, FactoryError> {
    let Some(source) = node.as_str() else {
        return Ok(None);
    };
    let regex = Regex::new(source)
        .map_err(|e| format!("invalid regex pattern '{source}': {e}"))?;
    Ok(Some(Box::new(PatternEvaluator {
        source: source.to_string(),
        regex,
    })))
}

struct ItemCountEvaluator {
    limit: usize,
    upper: bool,
}

impl Evaluator for ItemCountEvaluator {
    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let Some(items) = instance.as_array() else {
            return EvaluationOutcome::valid();
        };
        let within = if self.upper {
            items.len() <= self.limit
        } else {
            items.len() >= self.limit
        };
        if within {
            EvaluationOutcome::valid()
        } else if self.upper {
            EvaluationOutcome::invalid(format!(
                "Array length {} is greater than maximum {}",
                items.len(),
                self.limit
            ))
        } else {
            EvaluationOutcome::invalid(format!(
                "Array length {} is less than minimum {}",
                items.len(),
                self.limit
            ))
        }
    }
}

pub(super) fn max_items_evaluator(node: &JsonNode) -> Option<Box<dyn Evaluator>> {
    Some(Box::new(ItemCountEvaluator {
        limit: non_negative_integer(node)?,
        upper: true,
    }))
}

pub(super) fn min_items_evaluator(node: &JsonNode) -> Option<Box<dyn Evaluator>> {
    Some(Box::new(ItemCountEvaluator {
        limit: non_negative_integer(node)?,
        upper: false,
    }))
}

struct UniqueItemsEvaluator;

impl Evaluator for UniqueItemsEvaluator {
    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let Some(items) = instance.as_array() else {
            return EvaluationOutcome::valid();
        };
        for (index, item) in items.iter().enumerate() {
            if items[..index].iter().any(|earlier| earlier == item) {
                return EvaluationOutcome::invalid("Array items must be unique");
            }
        }
        EvaluationOutcome::valid()
    }
}

pub(super) fn unique_items_evaluator(node: &JsonNode) -> Option<Box<dyn Evaluator>> {
    match node.as_bool()? {
        true => Some(Box::new(UniqueItemsEvaluator)),
        false => None,
    }
}

struct PropertyCountEvaluator {
    limit: usize,
    upper: bool,
}

impl Evaluator for PropertyCountEvaluator {
    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let Some(members) = instance.as_object() else {
            return EvaluationOutcome::valid();
        };
        let within = if self.upper {
            members.len() <= self.limit
        } else {
            members.len() >= self.limit
        };
        if within {
            EvaluationOutcome::valid()
        } else if self.upper {
            EvaluationOutcome::invalid(format!(
                "Object has {} properties, maximum is {}",
                members.len(),
                self.limit
            ))
        } else {
            EvaluationOutcome::invalid(format!(
                "Object has {} properties, minimum is {}",
                members.len(),
                self.limit
            ))
        }
    }
}

pub(super) fn max_properties_evaluator(node: &JsonNode) -> Option<Box<dyn Evaluator>> {
    Some(Box::new(PropertyCountEvaluator {
        limit: non_negative_integer(node)?,
        upper: true,
    }))
}

pub(super) fn min_properties_evaluator(node: &JsonNode) -> Option<Box<dyn Evaluator>> {
    Some(Box::new(PropertyCountEvaluator {
        limit: non_negative_integer(node)?,
        upper: false,
    }))
}

struct RequiredEvaluator {
    names: Vec<String>,
}

impl Evaluator for RequiredEvaluator {
    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let Some(_) = instance.as_object() else {
            return EvaluationOutcome::valid();
        };
        let missing: Vec<&str> = self
            .names
            .iter()
            .filter(|name| instance.member(name).is_none())
            .map(String::as_str)
            .collect();
        match missing.as_slice() {
            [] => EvaluationOutcome::valid(),
            [name] => EvaluationOutcome::invalid(format!("Missing required property '{name}'")),
            names => EvaluationOutcome::invalid(format!(
                "Missing required properties {}",
                names
                    .iter()
                    .map(|name| format!("'{name}'"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

pub(super) fn required_evaluator(node: &JsonNode) -> Option<Box<dyn Evaluator>> {
    let names = string_array(node)?;
    Some(Box::new(RequiredEvaluator { names }))
}

struct DependentRequiredEvaluator {
    dependencies: Vec<(String, Vec<String>)>,
}

impl Evaluator for DependentRequiredEvaluator {
    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        let Some(_) = instance.as_object() else {
            return EvaluationOutcome::valid();
        };
        for (property, required) in &self.dependencies {
            if instance.member(property).is_none() {
                continue;
            }
            for name in required {
                if instance.member(name).is_none() {
                    return EvaluationOutcome::invalid(format!(
                        "Property '{name}' is required when '{property}' is present"
                    ));
                }
            }
        }
        EvaluationOutcome::valid()
    }
}

pub(super) fn dependent_required_evaluator(node: &JsonNode) -> Option<Box<dyn Evaluator>> {
    let dependencies = node
        .as_object()?
        .iter()
        .map(|(property, names)| Some((property.clone(), string_array(names)?)))
        .collect::<Option<Vec<_>>>()?;
    Some(Box::new(DependentRequiredEvaluator { dependencies }))
}

fn non_negative_integer(node: &JsonNode) -> Option<usize> {
    let number = node.as_number()?;
    if !number.is_integral() || number.as_f64() < 0.0 {
        return None;
    }
    Some(number.as_f64() as usize)
}

fn string_array(node: &JsonNode) -> Option<Vec<String>> {
    node.as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}
