//! Tag selection over raw HTML
//!
//! Only the embedded `<script>` blocks matter here, so this is a tolerant
//! scanner rather than a DOM parser: find opening tags, match the tag name
//! and one attribute, and return the raw inner text up to the closing tag.

use morgue_domain::traits::{DocumentQuery, ElementSelector};
use regex::Regex;
use std::sync::OnceLock;

/// Elements whose content is raw text and must be skipped as a whole
const RAW_TEXT_TAGS: [&str; 2] = ["script", "style"];

fn open_tag_regex() -> &'static Regex {
    static OPEN_TAG: OnceLock<Regex> = OnceLock::new();
    OPEN_TAG.get_or_init(|| {
        Regex::new(r"<([A-Za-z][A-Za-z0-9-]*)((?:\s[^>]*)?)>").expect("valid open tag regex")
    })
}

fn attribute_regex() -> &'static Regex {
    static ATTRIBUTE: OnceLock<Regex> = OnceLock::new();
    ATTRIBUTE.get_or_init(|| {
        Regex::new(r#"([^\s=/>]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
            .expect("valid attribute regex")
    })
}

/// Regex-backed [`DocumentQuery`] for embedded script blocks
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptBlockQuery;

impl ScriptBlockQuery {
    /// Create a new query
    pub fn new() -> Self {
        Self
    }
}

impl DocumentQuery for ScriptBlockQuery {
    fn select_all(&self, document: &str, selector: &ElementSelector) -> Vec<String> {
        let mut found = Vec::new();
        let mut pos = 0;

        while let Some(caps) = open_tag_regex().captures_at(document, pos) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                break;
            };
            let attrs = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            let name = name.as_str();
            pos = whole.end();

            let is_raw_text = RAW_TEXT_TAGS.iter().any(|t| t.eq_ignore_ascii_case(name));
            let is_match = name.eq_ignore_ascii_case(&selector.tag)
                && selector
                    .attribute
                    .as_ref()
                    .is_none_or(|(key, value)| has_attribute(attrs, key, value));

            if !is_match && !is_raw_text {
                continue;
            }

            let content_start = whole.end();
            let (content_end, next) = match find_closing_tag(document, content_start, name) {
                Some(span) => span,
                None => (document.len(), document.len()),
            };

            if is_match {
                found.push(document[content_start..content_end].to_string());
            }
            pos = next;
        }

        found
    }
}

/// Whether an attribute list contains `key="value"` (key case-insensitive)
fn has_attribute(attrs: &str, key: &str, value: &str) -> bool {
    attribute_regex().captures_iter(attrs).any(|caps| {
        let name_matches = caps
            .get(1)
            .is_some_and(|m| m.as_str().eq_ignore_ascii_case(key));
        let actual = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str())
            .unwrap_or("");
        name_matches && actual.trim() == value
    })
}

/// Locate `</tag>` after `from`; returns (content end, position after the tag)
fn find_closing_tag(document: &str, from: usize, tag: &str) -> Option<(usize, usize)> {
    let bytes = document.as_bytes();
    let tag = tag.as_bytes();
    let mut i = from;

    while i + 2 + tag.len() <= bytes.len() {
        if bytes[i] == b'<'
            && bytes[i + 1] == b'/'
            && bytes[i + 2..i + 2 + tag.len()].eq_ignore_ascii_case(tag)
        {
            let after_name = i + 2 + tag.len();
            let close = bytes[after_name..].iter().position(|&b| b == b'>')?;
            let between = &bytes[after_name..after_name + close];
            if between.iter().all(u8::is_ascii_whitespace) {
                return Some((i, after_name + close + 1));
            }
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ld_json() -> ElementSelector {
        ElementSelector::tag("script").with_attribute("type", "application/ld+json")
    }

    #[test]
    fn test_select_by_type_attribute() {
        let html = r#"<html><head>
            <script src="app.js"></script>
            <script type="application/ld+json">{"a":1}</script>
            </head></html>"#;
        let found = ScriptBlockQuery.select_all(html, &ld_json());
        assert_eq!(found, vec![r#"{"a":1}"#.to_string()]);
    }

    #[test]
    fn test_select_by_id_any_quoting_and_case() {
        let html = "<SCRIPT type=application/javascript id='fusion-metadata'>var x = 1;</Script >";
        let selector = ElementSelector::tag("script").with_attribute("id", "fusion-metadata");
        assert_eq!(
            ScriptBlockQuery.select_first(html, &selector).as_deref(),
            Some("var x = 1;")
        );
    }

    #[test]
    fn test_tags_inside_scripts_are_not_matched() {
        let html = r#"<script>document.write('<script type="application/ld+json">{}</scr' + 'ipt>')</script>
            <script type="application/ld+json">{"real":true}</script>"#;
        let found = ScriptBlockQuery.select_all(html, &ld_json());
        assert_eq!(found, vec![r#"{"real":true}"#.to_string()]);
    }

    #[test]
    fn test_multiple_matches_in_document_order() {
        let html = r#"<script type="application/ld+json">1</script><p>x</p><script type="application/ld+json">2</script>"#;
        assert_eq!(ScriptBlockQuery.select_all(html, &ld_json()), vec!["1", "2"]);
    }

    #[test]
    fn test_missing_element() {
        let html = "<html><body><p>nothing here</p></body></html>";
        assert!(ScriptBlockQuery.select_first(html, &ld_json()).is_none());
    }

    #[test]
    fn test_unclosed_element_runs_to_end() {
        let html = r#"<script type="application/ld+json">{"a":"#;
        assert_eq!(
            ScriptBlockQuery.select_first(html, &ld_json()).as_deref(),
            Some(r#"{"a":"#)
        );
    }
}
