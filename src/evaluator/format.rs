//! The `format` keyword.
//!
//! By default `format` is an annotation: the format name is reported and
//! nothing is asserted. When the schema's active vocabularies include the
//! Draft 2020-12 format-assertion vocabulary, known formats assert and
//! unknown formats stay annotations.

use super::{EvaluationOutcome, Evaluator};
use crate::context::EvaluationContext;
use crate::dialect::vocabulary::FORMAT_ASSERTION_2020;
use crate::node::JsonNode;
use crate::schema::KeywordContext;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use url::Url;

static DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static regex"));
static TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{2}:\d{2}:\d{2}(\.\d+)?([Zz]|[+-]\d{2}:\d{2})$").expect("static regex")
});
static DATE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[Tt]\d{2}:\d{2}:\d{2}(\.\d+)?([Zz]|[+-]\d{2}:\d{2})$")
        .expect("static regex")
});
static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(\d+W|(\d+Y)?(\d+M)?(\d+D)?(T(\d+H)?(\d+M)?(\d+(\.\d+)?S)?)?)$")
        .expect("static regex")
});
static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("static regex"));
static HOSTNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$")
        .expect("static regex")
});
static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("static regex")
});
static JSON_POINTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(/([^~/]|~[01])*)*$").expect("static regex"));

fn check_format(format: &str, value: &str) -> bool {
    match format {
        "date" => DATE.is_match(value),
        "time" => TIME.is_match(value),
        "date-time" => DATE_TIME.is_match(value),
        "duration" => value != "P" && DURATION.is_match(value),
        "email" | "idn-email" => EMAIL.is_match(value),
        "hostname" => HOSTNAME.is_match(value),
        "ipv4" => value.parse::<std::net::Ipv4Addr>().is_ok(),
        "ipv6" => value.parse::<std::net::Ipv6Addr>().is_ok(),
        "uuid" => UUID.is_match(value),
        "uri" | "iri" => Url::parse(value).is_ok(),
        "uri-reference" | "iri-reference" => {
            static BASE: Lazy<Url> =
                Lazy::new(|| Url::parse("https://example.com/").expect("static url"));
            Url::options().base_url(Some(&BASE)).parse(value).is_ok()
        }
        "regex" => Regex::new(value).is_ok(),
        "json-pointer" => JSON_POINTER.is_match(value),
        // Unknown formats never assert.
        _ => true,
    }
}

struct FormatEvaluator {
    format: String,
    assert: bool,
}

impl Evaluator for FormatEvaluator {
    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>, instance: &JsonNode) -> EvaluationOutcome {
        if self.assert {
            if let Some(value) = instance.as_str() {
                if !check_format(&self.format, value) {
                    return EvaluationOutcome::invalid(format!(
                        "String '{}' does not match format '{}'",
                        value, self.format
                    ));
                }
            }
        }
        EvaluationOutcome::annotated(json!(self.format))
    }
}

pub(super) fn format_evaluator(
    ctx: &KeywordContext<'_>,
    node: &JsonNode,
) -> Option<Box<dyn Evaluator>> {
    Some(Box::new(FormatEvaluator {
        format: node.as_str()?.to_string(),
        assert: ctx.active_vocabularies().contains(FORMAT_ASSERTION_2020),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_time_checks() {
        assert!(check_format("date", "2023-10-05"));
        assert!(!check_format("date", "2023-13-05T00:00:00Z"));
        assert!(check_format("date-time", "2023-10-05T12:30:00.5+02:00"));
        assert!(!check_format("date-time", "2023-10-05"));
    }

    #[test]
    fn test_network_checks() {
        assert!(check_format("ipv4", "192.168.0.1"));
        assert!(!check_format("ipv4", "300.1.1.1"));
        assert!(check_format("ipv6", "::1"));
        assert!(check_format("hostname", "example.com"));
        assert!(!check_format("hostname", "-bad-.example"));
    }

    #[test]
    fn test_uri_checks() {
        assert!(check_format("uri", "https://example.com/a?b=c"));
        assert!(!check_format("uri", "not a uri"));
        assert!(check_format("uri-reference", "relative/path#frag"));
    }

    #[test]
    fn test_unknown_format_never_asserts() {
        assert!(check_format("made-up-format", "anything"));
    }
}
