//! Body content elements: collection and cleaning

use crate::literal::read_string;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn markup_regex() -> &'static Regex {
    static MARKUP: OnceLock<Regex> = OnceLock::new();
    MARKUP.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid markup regex"))
}

/// Collect `content` of every element whose `type` is one of `kinds`
///
/// Reads `Fusion.globalContent.content_elements` from an evaluated global
/// scope, falling back to a top-level `globalContent`. Only the top level of
/// the element list is considered.
pub fn collect_content_elements(graph: &Value, kinds: &[String]) -> Vec<String> {
    let elements = graph
        .pointer("/Fusion/globalContent/content_elements")
        .or_else(|| graph.pointer("/globalContent/content_elements"))
        .and_then(Value::as_array);

    let Some(elements) = elements else {
        return Vec::new();
    };

    elements
        .iter()
        .filter(|element| {
            element
                .get("type")
                .and_then(Value::as_str)
                .is_some_and(|kind| kinds.iter().any(|k| k == kind))
        })
        .filter_map(|element| element.get("content").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

/// State of one open `{...}` or `[...]` while scanning
enum Frame {
    Object {
        start: usize,
        key: Option<String>,
        awaiting_value: bool,
        kind: Option<String>,
        content: Option<String>,
    },
    Array,
}

impl Frame {
    fn object(start: usize) -> Self {
        Frame::Object {
            start,
            key: None,
            awaiting_value: false,
            kind: None,
            content: None,
        }
    }

    /// A non-string value ended the current property
    fn settle(&mut self) {
        if let Frame::Object {
            key,
            awaiting_value,
            ..
        } = self
        {
            *key = None;
            *awaiting_value = false;
        }
    }
}

/// Scan script text for object literals carrying `type` and `content` strings
///
/// Never evaluates anything. Each object literal is matched on its own-level
/// string properties in either order; nested objects and arrays do not leak
/// into their parent. Results are in document order of the objects.
pub fn scan_content_elements(script: &str, kinds: &[String]) -> Vec<String> {
    let bytes = script.as_bytes();
    let mut stack: Vec<Frame> = Vec::new();
    let mut found: Vec<(usize, String)> = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            quote @ (b'"' | b'\'') => {
                let Ok((text, end)) = read_string(script, pos, quote) else {
                    break;
                };
                pos = end;
                let is_key = next_significant(bytes, pos) == Some(b':');
                if let Some(frame) = stack.last_mut() {
                    on_string(frame, text, is_key);
                }
            }
            b'{' => {
                if let Some(parent) = stack.last_mut() {
                    parent.settle();
                }
                stack.push(Frame::object(pos));
                pos += 1;
            }
            b'[' => {
                if let Some(parent) = stack.last_mut() {
                    parent.settle();
                }
                stack.push(Frame::Array);
                pos += 1;
            }
            b'}' | b']' => {
                if let Some(Frame::Object {
                    start,
                    kind: Some(kind),
                    content: Some(content),
                    ..
                }) = stack.pop()
                {
                    if kinds.iter().any(|k| *k == kind) {
                        found.push((start, content));
                    }
                }
                pos += 1;
            }
            b':' => {
                if let Some(Frame::Object {
                    key: Some(_),
                    awaiting_value,
                    ..
                }) = stack.last_mut()
                {
                    *awaiting_value = true;
                }
                pos += 1;
            }
            b',' => {
                if let Some(frame) = stack.last_mut() {
                    frame.settle();
                }
                pos += 1;
            }
            b'/' if matches!(bytes.get(pos + 1), Some(b'/') | Some(b'*')) => {
                pos = skip_comment(script, pos);
            }
            b if b.is_ascii_whitespace() => pos += 1,
            b if b.is_ascii_alphabetic() || b == b'_' || b == b'$' => {
                let end = bytes[pos..]
                    .iter()
                    .position(|&c| !(c.is_ascii_alphanumeric() || c == b'_' || c == b'$'))
                    .map_or(bytes.len(), |n| pos + n);
                let ident = &script[pos..end];
                pos = end;
                let is_key = next_significant(bytes, pos) == Some(b':');
                if let Some(frame) = stack.last_mut() {
                    match *frame {
                        Frame::Object {
                            ref mut key,
                            awaiting_value: false,
                            ..
                        } if is_key => *key = Some(ident.to_string()),
                        _ => frame.settle(),
                    }
                }
            }
            _ => {
                if let Some(frame) = stack.last_mut() {
                    frame.settle();
                }
                pos += script[pos..].chars().next().map_or(1, char::len_utf8);
            }
        }
    }

    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, content)| content).collect()
}

fn on_string(frame: &mut Frame, text: String, is_key: bool) {
    let Frame::Object {
        key,
        awaiting_value,
        kind,
        content,
        ..
    } = frame
    else {
        return;
    };

    if *awaiting_value {
        match key.as_deref() {
            Some("type") => *kind = Some(text),
            Some("content") => *content = Some(text),
            _ => {}
        }
        *key = None;
        *awaiting_value = false;
    } else if is_key {
        *key = Some(text);
    }
}

fn next_significant(bytes: &[u8], from: usize) -> Option<u8> {
    bytes[from..]
        .iter()
        .copied()
        .find(|b| !b.is_ascii_whitespace())
}

fn skip_comment(script: &str, pos: usize) -> usize {
    let rest = &script[pos + 2..];
    if script.as_bytes()[pos + 1] == b'/' {
        rest.find('\n').map_or(script.len(), |n| pos + 2 + n)
    } else {
        rest.find("*/").map_or(script.len(), |n| pos + 2 + n + 2)
    }
}

/// Clean raw body fragments into `rawContent`
///
/// Strips `<...>` spans and trailing carriage returns, then drops sentinel
/// fragments and fragments left empty.
pub fn clean_fragments<I>(fragments: I, sentinels: &[String]) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let is_sentinel = |text: &str| sentinels.iter().any(|s| s == text);

    fragments
        .into_iter()
        .filter(|raw| !is_sentinel(raw))
        .map(|raw| {
            markup_regex()
                .replace_all(&raw, "")
                .trim_end_matches('\r')
                .to_string()
        })
        .filter(|cleaned| !cleaned.is_empty() && !is_sentinel(cleaned))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kinds() -> Vec<String> {
        vec!["raw_html".to_string(), "text".to_string()]
    }

    fn sentinels() -> Vec<String> {
        vec!["在APP內訂閱".to_string(), "<div style=\\".to_string()]
    }

    #[test]
    fn test_clean_round_trip() {
        let graph = json!({
            "Fusion": {"globalContent": {"content_elements": [
                {"type": "raw_html", "content": "<p>Hello</p>"},
                {"type": "text", "content": "World\r"},
                {"type": "raw_html", "content": "在APP內訂閱"}
            ]}}
        });
        let raw = collect_content_elements(&graph, &kinds());
        assert_eq!(raw.len(), 3);
        assert_eq!(clean_fragments(raw, &sentinels()), vec!["Hello", "World"]);
    }

    #[test]
    fn test_collect_skips_other_kinds() {
        let graph = json!({
            "globalContent": {"content_elements": [
                {"type": "image", "url": "x.jpg"},
                {"type": "text", "content": "kept"},
                {"type": "text"}
            ]}
        });
        assert_eq!(collect_content_elements(&graph, &kinds()), vec!["kept"]);
    }

    #[test]
    fn test_collect_without_content_model() {
        assert!(collect_content_elements(&json!({"Fusion": {}}), &kinds()).is_empty());
    }

    #[test]
    fn test_scan_either_key_order() {
        let script = r#"Fusion.globalContent={"content_elements":[
            {"type":"raw_html","content":"<p>A</p>"},
            { "content" : "B\"quoted\"" , "_id": "x", "type" : "text" },
            {"type":"image","content":"skip"}
        ]};"#;
        assert_eq!(
            scan_content_elements(script, &kinds()),
            vec!["<p>A</p>", "B\"quoted\""]
        );
    }

    #[test]
    fn test_scan_nested_values_do_not_leak() {
        let script = r#"{"type":"text","additional":{"content":"inner"},"content":"outer"}
            {"type":"gallery","items":[{"type":"text","content":"nested"}]}"#;
        assert_eq!(scan_content_elements(script, &kinds()), vec!["outer", "nested"]);
    }

    #[test]
    fn test_scan_unquoted_keys() {
        let script = r#"x = {type: 'text', content: '中文'};"#;
        assert_eq!(scan_content_elements(script, &kinds()), vec!["中文"]);
    }

    #[test]
    fn test_scan_stops_at_unterminated_string() {
        let script = r#"{"type":"text","content":"ok"} {"type":"text","content":"bro"#;
        assert_eq!(scan_content_elements(script, &kinds()), vec!["ok"]);
    }

    #[test]
    fn test_clean_drops_markup_leftover() {
        let fragments = vec!["<div style=\\".to_string(), "<br/>".to_string(), "Text".to_string()];
        assert_eq!(clean_fragments(fragments, &sentinels()), vec!["Text"]);
    }
}
