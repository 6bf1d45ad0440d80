//! Specification versions and dialects.
//!
//! A dialect bundles a meta-schema URI, the evaluator factory implementing
//! that draft's keywords, and the vocabularies the draft defines. Custom
//! dialects typically override only the meta-schema URI; the engine resolves
//! it through the regular resolver chain.

use crate::evaluator::{Draft2019EvaluatorFactory, Draft2020EvaluatorFactory, EvaluatorFactory};
use std::collections::HashSet;
use std::sync::Arc;

pub mod vocabulary {
    pub const CORE_2020: &str = "https://json-schema.org/draft/2020-12/vocab/core";
    pub const APPLICATOR_2020: &str = "https://json-schema.org/draft/2020-12/vocab/applicator";
    pub const UNEVALUATED_2020: &str = "https://json-schema.org/draft/2020-12/vocab/unevaluated";
    pub const VALIDATION_2020: &str = "https://json-schema.org/draft/2020-12/vocab/validation";
    pub const META_DATA_2020: &str = "https://json-schema.org/draft/2020-12/vocab/meta-data";
    pub const FORMAT_ANNOTATION_2020: &str =
        "https://json-schema.org/draft/2020-12/vocab/format-annotation";
    pub const FORMAT_ASSERTION_2020: &str =
        "https://json-schema.org/draft/2020-12/vocab/format-assertion";
    pub const CONTENT_2020: &str = "https://json-schema.org/draft/2020-12/vocab/content";

    pub const CORE_2019: &str = "https://json-schema.org/draft/2019-09/vocab/core";
    pub const APPLICATOR_2019: &str = "https://json-schema.org/draft/2019-09/vocab/applicator";
    pub const VALIDATION_2019: &str = "https://json-schema.org/draft/2019-09/vocab/validation";
    pub const META_DATA_2019: &str = "https://json-schema.org/draft/2019-09/vocab/meta-data";
    pub const FORMAT_2019: &str = "https://json-schema.org/draft/2019-09/vocab/format";
    pub const CONTENT_2019: &str = "https://json-schema.org/draft/2019-09/vocab/content";
}

/// Supported JSON Schema specification versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecificationVersion {
    Draft2020_12,
    Draft2019_09,
}

impl SpecificationVersion {
    /// The URI that identifies this version's meta-schema.
    pub fn id(&self) -> &'static str {
        match self {
            SpecificationVersion::Draft2020_12 => "https://json-schema.org/draft/2020-12/schema",
            SpecificationVersion::Draft2019_09 => "https://json-schema.org/draft/2019-09/schema",
        }
    }

    pub fn base_uri(&self) -> &'static str {
        match self {
            SpecificationVersion::Draft2020_12 => "https://json-schema.org/draft/2020-12",
            SpecificationVersion::Draft2019_09 => "https://json-schema.org/draft/2019-09",
        }
    }

    pub fn from_id(uri: &str) -> Option<Self> {
        [
            SpecificationVersion::Draft2020_12,
            SpecificationVersion::Draft2019_09,
        ]
        .into_iter()
        .find(|version| version.id() == uri)
    }

    /// Embedded meta-schema text for any resource URI under this version's
    /// base, or `None` when the URI is not one of ours.
    pub fn resolve_resource(&self, uri: &str) -> Option<&'static str> {
        self.resources()
            .iter()
            .find(|(resource_uri, _)| *resource_uri == uri)
            .map(|(_, text)| *text)
    }

    fn resources(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            SpecificationVersion::Draft2020_12 => &[
                (
                    "https://json-schema.org/draft/2020-12/schema",
                    include_str!("draft/2020-12/schema.json"),
                ),
                (
                    "https://json-schema.org/draft/2020-12/meta/core",
                    include_str!("draft/2020-12/meta/core.json"),
                ),
                (
                    "https://json-schema.org/draft/2020-12/meta/applicator",
                    include_str!("draft/2020-12/meta/applicator.json"),
                ),
                (
                    "https://json-schema.org/draft/2020-12/meta/unevaluated",
                    include_str!("draft/2020-12/meta/unevaluated.json"),
                ),
                (
                    "https://json-schema.org/draft/2020-12/meta/validation",
                    include_str!("draft/2020-12/meta/validation.json"),
                ),
                (
                    "https://json-schema.org/draft/2020-12/meta/meta-data",
                    include_str!("draft/2020-12/meta/meta-data.json"),
                ),
                (
                    "https://json-schema.org/draft/2020-12/meta/format-annotation",
                    include_str!("draft/2020-12/meta/format-annotation.json"),
                ),
                (
                    "https://json-schema.org/draft/2020-12/meta/content",
                    include_str!("draft/2020-12/meta/content.json"),
                ),
            ],
            SpecificationVersion::Draft2019_09 => &[
                (
                    "https://json-schema.org/draft/2019-09/schema",
                    include_str!("draft/2019-09/schema.json"),
                ),
                (
                    "https://json-schema.org/draft/2019-09/meta/core",
                    include_str!("draft/2019-09/meta/core.json"),
                ),
                (
                    "https://json-schema.org/draft/2019-09/meta/applicator",
                    include_str!("draft/2019-09/meta/applicator.json"),
                ),
                (
                    "https://json-schema.org/draft/2019-09/meta/validation",
                    include_str!("draft/2019-09/meta/validation.json"),
                ),
                (
                    "https://json-schema.org/draft/2019-09/meta/meta-data",
                    include_str!("draft/2019-09/meta/meta-data.json"),
                ),
                (
                    "https://json-schema.org/draft/2019-09/meta/format",
                    include_str!("draft/2019-09/meta/format.json"),
                ),
                (
                    "https://json-schema.org/draft/2019-09/meta/content",
                    include_str!("draft/2019-09/meta/content.json"),
                ),
            ],
        }
    }
}

/// A meta-schema URI plus the machinery to parse and evaluate schemas
/// governed by it. Custom dialects usually override only
/// [`Dialect::meta_schema_uri`]; the engine resolves that URI through the
/// regular resolver chain.
pub trait Dialect: Send + Sync {
    fn specification_version(&self) -> SpecificationVersion;

    /// URI of the meta-schema user schemas are validated against.
    fn meta_schema_uri(&self) -> String {
        self.specification_version().id().to_string()
    }

    /// The factory implementing this draft's keywords.
    fn evaluator_factory(&self) -> Arc<dyn EvaluatorFactory> {
        factory_for(self.specification_version())
    }

    /// Vocabularies active for schemas that do not declare `$vocabulary`.
    fn default_vocabularies(&self) -> HashSet<String> {
        default_vocabularies_for(self.specification_version())
    }
}

/// Draft 2020-12, the default dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct Draft2020Dialect;

impl Dialect for Draft2020Dialect {
    fn specification_version(&self) -> SpecificationVersion {
        SpecificationVersion::Draft2020_12
    }
}

/// Draft 2019-09, for documents that still use `$recursiveRef`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Draft2019Dialect;

impl Dialect for Draft2019Dialect {
    fn specification_version(&self) -> SpecificationVersion {
        SpecificationVersion::Draft2019_09
    }
}

pub(crate) fn factory_for(version: SpecificationVersion) -> Arc<dyn EvaluatorFactory> {
    match version {
        SpecificationVersion::Draft2020_12 => Arc::new(Draft2020EvaluatorFactory),
        SpecificationVersion::Draft2019_09 => Arc::new(Draft2019EvaluatorFactory),
    }
}

/// The vocabularies a draft defines, used when a schema document has no
/// `$vocabulary` of its own.
pub fn default_vocabularies_for(version: SpecificationVersion) -> HashSet<String> {
    let uris: &[&str] = match version {
        SpecificationVersion::Draft2020_12 => &[
            vocabulary::CORE_2020,
            vocabulary::APPLICATOR_2020,
            vocabulary::UNEVALUATED_2020,
            vocabulary::VALIDATION_2020,
            vocabulary::META_DATA_2020,
            vocabulary::FORMAT_ANNOTATION_2020,
            vocabulary::CONTENT_2020,
        ],
        SpecificationVersion::Draft2019_09 => &[
            vocabulary::CORE_2019,
            vocabulary::APPLICATOR_2019,
            vocabulary::VALIDATION_2019,
            vocabulary::META_DATA_2019,
            vocabulary::FORMAT_2019,
            vocabulary::CONTENT_2019,
        ],
    };
    uris.iter().map(|uri| uri.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_resources_resolve() {
        let version = SpecificationVersion::Draft2020_12;
        assert!(version.resolve_resource(version.id()).is_some());
        assert!(version
            .resolve_resource("https://json-schema.org/draft/2020-12/meta/core")
            .is_some());
        assert!(version.resolve_resource("https://example.com/other").is_none());
    }

    #[test]
    fn test_version_from_id() {
        assert_eq!(
            SpecificationVersion::from_id("https://json-schema.org/draft/2019-09/schema"),
            Some(SpecificationVersion::Draft2019_09)
        );
        assert_eq!(SpecificationVersion::from_id("custom"), None);
    }
}
