//! Parse the JSON-LD article block into metadata fields

use crate::error::ExtractorError;
use morgue_domain::TextValue;
use serde_json::{Map, Value};

/// Article metadata from a linked-data block
///
/// Every field is optional; `source_id` is required only for the metadata
/// identifier to win over the path-derived one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkedDataMetadata {
    /// `mainEntityOfPage.@id`
    pub source_id: Option<String>,
    /// `articleSection`
    pub section: Option<TextValue>,
    /// `description`, trimmed
    pub description: Option<TextValue>,
    /// `dateModified`
    pub date_modified: Option<TextValue>,
    /// `datePublished`
    pub date_published: Option<TextValue>,
    /// `headline`
    pub headline: Option<TextValue>,
    /// `keywords`
    pub keywords: Option<TextValue>,
    /// Author names from `author`
    pub author: Option<TextValue>,
}

impl LinkedDataMetadata {
    /// Non-empty identifier, if the block carried one
    pub fn identifier(&self) -> Option<&str> {
        self.source_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Parse one linked-data block
///
/// Accepts a single object, an array of objects, or an `@graph` container;
/// in the latter two cases the first node with `mainEntityOfPage` is used,
/// falling back to the first object node.
pub fn parse_linked_data(json: &str) -> Result<LinkedDataMetadata, ExtractorError> {
    let value: Value = serde_json::from_str(json.trim())?;
    let node = select_article_node(&value).ok_or_else(|| {
        ExtractorError::MalformedMetadata("Expected a JSON object".to_string())
    })?;

    Ok(LinkedDataMetadata {
        source_id: main_entity_id(node),
        section: node.get("articleSection").and_then(text_value),
        description: node
            .get("description")
            .and_then(text_value)
            .map(|v| v.trimmed()),
        date_modified: node.get("dateModified").and_then(text_value),
        date_published: node.get("datePublished").and_then(text_value),
        headline: node.get("headline").and_then(text_value),
        keywords: node.get("keywords").and_then(text_value),
        author: node.get("author").and_then(author_names),
    })
}

fn select_article_node(value: &Value) -> Option<&Map<String, Value>> {
    let nodes: Vec<&Map<String, Value>> = match value {
        Value::Object(obj) => match obj.get("@graph") {
            Some(Value::Array(graph)) => graph.iter().filter_map(Value::as_object).collect(),
            _ => return Some(obj),
        },
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        _ => return None,
    };

    nodes
        .iter()
        .find(|node| node.contains_key("mainEntityOfPage"))
        .or_else(|| nodes.first())
        .copied()
}

fn main_entity_id(node: &Map<String, Value>) -> Option<String> {
    match node.get("mainEntityOfPage")? {
        Value::Object(entity) => entity.get("@id")?.as_str().map(str::to_string),
        Value::String(id) => Some(id.clone()),
        _ => None,
    }
}

/// A string, or the string elements of an array
fn text_value(value: &Value) -> Option<TextValue> {
    match value {
        Value::String(s) => Some(TextValue::Text(s.clone())),
        Value::Array(items) => {
            let strings: Vec<String> = items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
            (!strings.is_empty()).then_some(TextValue::List(strings))
        }
        _ => None,
    }
}

fn author_names(value: &Value) -> Option<TextValue> {
    fn name_of(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj.get("name")?.as_str().map(str::to_string),
            _ => None,
        }
    }

    match value {
        Value::Array(items) => {
            let names: Vec<String> = items.iter().filter_map(name_of).collect();
            match names.len() {
                0 => None,
                1 => names.into_iter().next().map(TextValue::Text),
                _ => Some(TextValue::List(names)),
            }
        }
        other => name_of(other).map(TextValue::Text),
    }
}
