//! URI plumbing for schema identifiers and references.
//!
//! Registry keys are absolute URIs without fragments; references carry an
//! optional fragment which is either a JSON Pointer (`#/foo/0`) or a
//! plain-name anchor (`#foo`). Schema identifiers are frequently URNs, which
//! `url::Url` treats as opaque (cannot-be-a-base), so reference resolution
//! needs an explicit fallback for opaque bases: the reference stands alone.

use percent_encoding::percent_decode_str;
use thiserror::Error;
use url::Url;

/// A reference that could not be interpreted as a URI.
#[derive(Debug, Clone, Error)]
#[error("malformed URI reference '{reference}'")]
pub struct InvalidReference {
    pub reference: String,
}

/// An absolute URI split into its fragment-free base and its fragment.
///
/// The fragment is stored percent-decoded. An empty fragment and an absent
/// fragment are not distinguished; both address the root of the resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompoundUri {
    pub uri: String,
    pub fragment: String,
}

impl CompoundUri {
    pub fn new(uri: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            fragment: fragment.into(),
        }
    }

    /// Interpret `reference` on its own, without a base.
    pub fn parse(reference: &str) -> Result<Self, InvalidReference> {
        let (uri, fragment) = split_fragment(reference);
        Ok(Self {
            uri: normalize_base(uri),
            fragment: decode_fragment(fragment, reference)?,
        })
    }

    /// Resolve `reference` against `base` per RFC 3986, with the opaque-base
    /// fallback described in the module docs.
    pub fn resolve(base: &str, reference: &str) -> Result<Self, InvalidReference> {
        let (ref_uri, raw_fragment) = split_fragment(reference);
        let fragment = decode_fragment(raw_fragment, reference)?;

        if ref_uri.is_empty() {
            return Ok(Self {
                uri: normalize_base(base),
                fragment,
            });
        }
        if let Ok(absolute) = Url::parse(ref_uri) {
            return Ok(Self {
                uri: strip_fragment(absolute),
                fragment,
            });
        }
        if let Ok(base_url) = Url::parse(base) {
            if !base_url.cannot_be_a_base() {
                let joined = base_url
                    .join(ref_uri)
                    .map_err(|_| InvalidReference {
                        reference: reference.to_string(),
                    })?;
                return Ok(Self {
                    uri: strip_fragment(joined),
                    fragment,
                });
            }
        }
        // Opaque or non-URL base: the reference identifies the resource by
        // itself, matching opaque-URI resolution in RFC 3986 implementations.
        Ok(Self {
            uri: ref_uri.to_string(),
            fragment,
        })
    }

    /// True when the fragment addresses a location by JSON Pointer rather
    /// than by plain-name anchor.
    pub fn has_pointer_fragment(&self) -> bool {
        is_json_pointer(&self.fragment)
    }
}

impl std::fmt::Display for CompoundUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.fragment.is_empty() {
            write!(f, "{}", self.uri)
        } else {
            write!(f, "{}#{}", self.uri, self.fragment)
        }
    }
}

/// Normalize an identifier used as a registry key. Parseable URIs go through
/// `url` normalization; anything else (opaque relative identifiers) is kept
/// verbatim so registration and lookup agree.
pub(crate) fn normalize_base(uri: &str) -> String {
    let (without_fragment, _) = split_fragment(uri);
    match Url::parse(without_fragment) {
        Ok(url) => strip_fragment(url),
        Err(_) => without_fragment.to_string(),
    }
}

fn strip_fragment(mut url: Url) -> String {
    url.set_fragment(None);
    url.to_string()
}

fn split_fragment(reference: &str) -> (&str, &str) {
    match reference.split_once('#') {
        Some((uri, fragment)) => (uri, fragment),
        None => (reference, ""),
    }
}

fn decode_fragment(fragment: &str, reference: &str) -> Result<String, InvalidReference> {
    percent_decode_str(fragment)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| InvalidReference {
            reference: reference.to_string(),
        })
}

/// A fragment is a JSON Pointer when empty or starting with `/`; anything
/// else is a plain-name anchor.
pub(crate) fn is_json_pointer(fragment: &str) -> bool {
    fragment.is_empty() || fragment.starts_with('/')
}

/// RFC 6901 token escape: `~` becomes `~0`, `/` becomes `~1`.
pub(crate) fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

pub(crate) fn unescape_pointer_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Build the absolute URI of a schema located at `pointer` inside the
/// document registered under `base`.
pub(crate) fn absolute_uri(base: &str, pointer: &str) -> String {
    if pointer.is_empty() {
        base.to_string()
    } else {
        format!("{base}#{pointer}")
    }
}

/// Split an absolute schema URI back into its document base and fragment.
pub(crate) fn split_absolute(uri: &str) -> (&str, &str) {
    split_fragment(uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_fragment_only() {
        let resolved = CompoundUri::resolve("urn:example", "#/defs/a").unwrap();
        assert_eq!(resolved.uri, "urn:example");
        assert_eq!(resolved.fragment, "/defs/a");
        assert!(resolved.has_pointer_fragment());
    }

    #[test]
    fn test_resolve_anchor_fragment() {
        let resolved = CompoundUri::resolve("https://example.com/root", "#meta").unwrap();
        assert_eq!(resolved.uri, "https://example.com/root");
        assert_eq!(resolved.fragment, "meta");
        assert!(!resolved.has_pointer_fragment());
    }

    #[test]
    fn test_resolve_relative_against_hierarchical_base() {
        let resolved =
            CompoundUri::resolve("https://json-schema.org/draft/2020-12/schema", "meta/core")
                .unwrap();
        assert_eq!(resolved.uri, "https://json-schema.org/draft/2020-12/meta/core");
    }

    #[test]
    fn test_resolve_absolute_reference() {
        let resolved = CompoundUri::resolve("urn:base", "urn:other#anchor").unwrap();
        assert_eq!(resolved.uri, "urn:other");
        assert_eq!(resolved.fragment, "anchor");
    }

    #[test]
    fn test_resolve_relative_against_opaque_base() {
        // URN bases are opaque; a bare relative reference stands alone.
        let resolved = CompoundUri::resolve("urn:anonymous-schema:1", "x").unwrap();
        assert_eq!(resolved.uri, "x");
        assert_eq!(resolved.fragment, "");
    }

    #[test]
    fn test_percent_decoded_pointer_fragment() {
        let resolved = CompoundUri::resolve("urn:example", "#/a%20b").unwrap();
        assert_eq!(resolved.fragment, "/a b");
    }

    #[test]
    fn test_pointer_token_escaping() {
        assert_eq!(escape_pointer_token("a/b~c"), "a~1b~0c");
        assert_eq!(unescape_pointer_token("a~1b~0c"), "a/b~c");
        // ~01 must decode to ~1, not /.
        assert_eq!(unescape_pointer_token("~01"), "~1");
    }

    #[test]
    fn test_normalize_is_stable() {
        let once = normalize_base("https://example.com");
        let twice = normalize_base(&once);
        assert_eq!(once, twice);
        assert_eq!(normalize_base("urn:passing"), "urn:passing");
        assert_eq!(normalize_base("x"), "x");
    }

    #[test]
    fn test_absolute_uri_roundtrip() {
        let uri = absolute_uri("urn:doc", "/properties/a");
        assert_eq!(uri, "urn:doc#/properties/a");
        let (base, fragment) = split_absolute(&uri);
        assert_eq!(base, "urn:doc");
        assert_eq!(fragment, "/properties/a");
        assert_eq!(absolute_uri("urn:doc", ""), "urn:doc");
    }
}
