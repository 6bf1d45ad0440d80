//! Pluggable resolution of external schema documents.
//!
//! The engine consults, in order: already-registered URIs, the builtin
//! resolver for the embedded specification meta-schemas, then user-supplied
//! resolvers. The first non-empty result wins. All resolver I/O happens
//! during schema registration.

use crate::dialect::SpecificationVersion;
use crate::node::JsonNode;
use std::sync::Arc;

/// What a resolver knows about a URI.
#[derive(Clone)]
pub enum ResolutionResult {
    /// Not this resolver's URI.
    Empty,
    /// Raw schema text to be parsed by the node factory.
    FromString(String),
    /// An already-parsed schema document.
    FromNode(JsonNode),
    /// A lazy supplier, invoked only when the document is actually needed.
    FromProvider(Arc<dyn Fn() -> ResolutionResult + Send + Sync>),
}

impl ResolutionResult {
    pub fn empty() -> Self {
        ResolutionResult::Empty
    }

    pub fn from_string(raw: impl Into<String>) -> Self {
        ResolutionResult::FromString(raw.into())
    }

    pub fn from_node(node: JsonNode) -> Self {
        ResolutionResult::FromNode(node)
    }

    pub fn from_provider(provider: impl Fn() -> ResolutionResult + Send + Sync + 'static) -> Self {
        ResolutionResult::FromProvider(Arc::new(provider))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ResolutionResult::Empty)
    }

    /// Chase providers until a concrete result (or `Empty`) comes out.
    pub(crate) fn materialize(self) -> ResolutionResult {
        let mut current = self;
        while let ResolutionResult::FromProvider(provider) = current {
            current = provider();
        }
        current
    }
}

impl std::fmt::Debug for ResolutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionResult::Empty => write!(f, "Empty"),
            ResolutionResult::FromString(_) => write!(f, "FromString(..)"),
            ResolutionResult::FromNode(_) => write!(f, "FromNode(..)"),
            ResolutionResult::FromProvider(_) => write!(f, "FromProvider(..)"),
        }
    }
}

/// Maps an external URI to a schema document source.
pub trait SchemaResolver: Send + Sync {
    fn resolve(&self, uri: &str) -> ResolutionResult;
}

impl<F> SchemaResolver for F
where
    F: Fn(&str) -> ResolutionResult + Send + Sync,
{
    fn resolve(&self, uri: &str) -> ResolutionResult {
        self(uri)
    }
}

/// Serves the embedded meta-schema resources of every supported draft.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SpecificationResolver;

impl SchemaResolver for SpecificationResolver {
    fn resolve(&self, uri: &str) -> ResolutionResult {
        for version in [
            SpecificationVersion::Draft2020_12,
            SpecificationVersion::Draft2019_09,
        ] {
            if let Some(text) = version.resolve_resource(uri) {
                return ResolutionResult::from_string(text);
            }
        }
        ResolutionResult::Empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specification_resolver_serves_both_drafts() {
        let resolver = SpecificationResolver;
        assert!(!resolver
            .resolve("https://json-schema.org/draft/2020-12/schema")
            .is_empty());
        assert!(!resolver
            .resolve("https://json-schema.org/draft/2019-09/meta/core")
            .is_empty());
        assert!(resolver.resolve("urn:unknown").is_empty());
    }

    #[test]
    fn test_provider_materializes_lazily() {
        let result = ResolutionResult::from_provider(|| ResolutionResult::from_string("true"));
        match result.materialize() {
            ResolutionResult::FromString(text) => assert_eq!(text, "true"),
            other => panic!("expected FromString, got {other:?}"),
        }
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |uri: &str| {
            if uri == "urn:known" {
                ResolutionResult::from_string("{}")
            } else {
                ResolutionResult::empty()
            }
        };
        assert!(!SchemaResolver::resolve(&resolver, "urn:known").is_empty());
        assert!(SchemaResolver::resolve(&resolver, "urn:other").is_empty());
    }
}
