//! Canonical identity module
//!
//! Source identifiers embed a domain-qualified path of the shape
//! `.../<category>/<8-digit-date>/<hash>[/index.html][/]`. Resolving one
//! yields a [`CanonicalKey`], which is both the dedup key and the output path.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trailing segment ignored when resolving identifiers
const INDEX_SEGMENT: &str = "index.html";

/// Canonical identity of an article
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CanonicalKey {
    category: String,
    date: String,
    hash: String,
    #[serde(skip)]
    host: String,
}

impl CanonicalKey {
    /// Category segment (e.g. `entertainment`)
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Eight-digit date segment
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Article hash segment
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Canonical rewritten URL, always with a trailing slash
    ///
    /// # Examples
    ///
    /// ```
    /// use morgue_domain::Resolver;
    ///
    /// let resolver = Resolver::default();
    /// let key = resolver
    ///     .resolve("https://x.appledaily.com/entertainment/20230101/abc123/index.html")
    ///     .unwrap();
    /// assert_eq!(key.canonical_url(), "https://tw.appledaily.com/entertainment/20230101/abc123/");
    /// ```
    pub fn canonical_url(&self) -> String {
        format!(
            "https://{}/{}/{}/{}/",
            self.host, self.category, self.date, self.hash
        )
    }

    /// Relative storage path segments `[category, date, hash]`
    pub fn path_segments(&self) -> [&str; 3] {
        [&self.category, &self.date, &self.hash]
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.category, self.date, self.hash)
    }
}

/// Domains used by the resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Domain the identifier must be qualified with (any subdomain matches)
    #[serde(default = "default_source_domain")]
    pub source_domain: String,

    /// Host used in canonical URLs regardless of the input subdomain
    #[serde(default = "default_canonical_host")]
    pub canonical_host: String,
}

fn default_source_domain() -> String {
    "appledaily.com".to_string()
}

fn default_canonical_host() -> String {
    "tw.appledaily.com".to_string()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            source_domain: default_source_domain(),
            canonical_host: default_canonical_host(),
        }
    }
}

/// Canonical Identity Resolver
///
/// Pure and stateless apart from its configuration; safe to share across workers.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    config: ResolverConfig,
}

impl Resolver {
    /// Create a resolver with the given domains
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Get the resolver configuration
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve an identifier into its canonical key
    ///
    /// Returns `None` when the identifier does not have the expected shape.
    /// That is a normal "not applicable" result, not an error.
    pub fn resolve(&self, id: &str) -> Option<CanonicalKey> {
        let path = self.path_after_domain(strip_query(id.trim()))?;

        let path = path.strip_suffix('/').unwrap_or(path);
        let path = path
            .strip_suffix(INDEX_SEGMENT)
            .and_then(|p| p.strip_suffix('/'))
            .unwrap_or(path);

        let mut segments = path.rsplit('/');
        let hash = segments.next()?;
        let date = segments.next()?;
        let category = segments.next()?;

        if !is_plain_segment(category) || !is_plain_segment(hash) || hash == INDEX_SEGMENT {
            return None;
        }
        if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        Some(CanonicalKey {
            category: category.to_string(),
            date: date.to_string(),
            hash: hash.to_string(),
            host: self.config.canonical_host.clone(),
        })
    }

    /// Path portion following the first occurrence of the source domain
    ///
    /// The domain must start the string or follow a `.` or `/`, and must be
    /// followed by `/`.
    fn path_after_domain<'a>(&self, id: &'a str) -> Option<&'a str> {
        let domain = self.config.source_domain.as_str();
        if domain.is_empty() {
            return None;
        }

        id.match_indices(domain).find_map(|(start, _)| {
            let qualified = start == 0 || matches!(id.as_bytes()[start - 1], b'.' | b'/');
            let rest = &id[start + domain.len()..];
            match rest.strip_prefix('/') {
                Some(path) if qualified => Some(path),
                _ => None,
            }
        })
    }
}

/// A segment that stays a single directory level when joined onto a path
fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.bytes().all(|b| b == b'.')
        && !segment.contains(['\\', ':', '\0'])
}

fn strip_query(id: &str) -> &str {
    match id.find(['?', '#']) {
        Some(pos) => &id[..pos],
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn resolve(id: &str) -> Option<CanonicalKey> {
        Resolver::default().resolve(id)
    }

    #[test]
    fn test_resolve_index_html() {
        let key = resolve("https://x.appledaily.com/entertainment/20230101/abc123/index.html").unwrap();
        assert_eq!(key.category(), "entertainment");
        assert_eq!(key.date(), "20230101");
        assert_eq!(key.hash(), "abc123");
        assert_eq!(
            key.canonical_url(),
            "https://tw.appledaily.com/entertainment/20230101/abc123/"
        );
    }

    #[test]
    fn test_trailing_variants_are_equivalent() {
        let variants = [
            "https://tw.appledaily.com/local/20200505/HASH",
            "https://tw.appledaily.com/local/20200505/HASH/",
            "https://hk.appledaily.com/local/20200505/HASH/index.html",
            "https://hk.appledaily.com/local/20200505/HASH/index.html/",
            "tw.appledaily.com/local/20200505/HASH",
            "https://tw.appledaily.com/local/20200505/HASH/?utm_source=x",
        ];
        let keys: Vec<CanonicalKey> = variants.iter().map(|v| resolve(v).unwrap()).collect();
        assert!(keys.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(keys[0].to_string(), "local/20200505/HASH");
    }

    #[test]
    fn test_anchors_on_last_three_segments() {
        let key = resolve("https://tw.appledaily.com/realtime/new/20210617/XYZ/").unwrap();
        assert_eq!(key.category(), "new");
        assert_eq!(key.hash(), "XYZ");
    }

    #[test]
    fn test_rejects_bad_dates() {
        assert!(resolve("https://tw.appledaily.com/local/2020050/HASH/").is_none());
        assert!(resolve("https://tw.appledaily.com/local/202005051/HASH/").is_none());
        assert!(resolve("https://tw.appledaily.com/local/2020O505/HASH/").is_none());
    }

    #[test]
    fn test_rejects_unqualified_or_short_ids() {
        assert!(resolve("https://example.com/local/20200505/HASH/").is_none());
        assert!(resolve("https://notappledaily.com/local/20200505/HASH/").is_none());
        assert!(resolve("https://tw.appledaily.com/20200505/HASH/").is_none());
        assert!(resolve("https://tw.appledaily.com/local/20200505/index.html").is_none());
        assert!(resolve("").is_none());
    }

    #[test]
    fn test_rejects_traversal_segments() {
        for id in [
            "https://tw.appledaily.com/../20230101/escape/",
            "https://tw.appledaily.com/./20230101/escape/",
            "https://tw.appledaily.com/local/20230101/../",
            "https://tw.appledaily.com/local/20230101/.../",
            "https://tw.appledaily.com/..\\../20230101/escape/",
            "https://tw.appledaily.com/local/20230101/a\\b/",
            "https://tw.appledaily.com/C:/20230101/escape/",
        ] {
            assert!(resolve(id).is_none(), "{} should not resolve", id);
        }
    }

    #[test]
    fn test_dots_inside_segments_are_kept() {
        let key = resolve("https://tw.appledaily.com/local/20230101/v1.2..3/").unwrap();
        assert_eq!(key.hash(), "v1.2..3");
    }

    #[test]
    fn test_custom_hosts() {
        let resolver = Resolver::new(ResolverConfig {
            source_domain: "example.org".to_string(),
            canonical_host: "archive.example.org".to_string(),
        });
        let key = resolver.resolve("http://www.example.org/sport/19991231/zz/").unwrap();
        assert_eq!(key.canonical_url(), "https://archive.example.org/sport/19991231/zz/");
    }

    proptest! {
        #[test]
        fn prop_canonical_url_ignores_trailing_shape(
            category in "[a-z]{1,12}",
            date in "[0-9]{8}",
            hash in "[A-Z0-9]{4,26}",
            sub in "[a-z]{2,3}",
            suffix in prop::sample::select(vec!["", "/", "/index.html", "/index.html/"]),
        ) {
            let id = format!("https://{sub}.appledaily.com/{category}/{date}/{hash}{suffix}");
            let key = resolve(&id).unwrap();
            prop_assert_eq!(
                key.canonical_url(),
                format!("https://tw.appledaily.com/{category}/{date}/{hash}/")
            );
        }

        #[test]
        fn prop_non_eight_digit_dates_never_match(
            date in "[0-9]{1,7}|[0-9]{9,12}",
            hash in "[A-Z0-9]{4,26}",
        ) {
            let id = format!("https://tw.appledaily.com/news/{date}/{hash}/");
            prop_assert!(resolve(&id).is_none());
        }
    }
}
