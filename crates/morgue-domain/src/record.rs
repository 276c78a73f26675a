//! Record module - source documents and the normalized article record

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One archived input file, owned and consumed by a single worker
#[derive(Debug, Clone)]
pub struct SourceDocument {
    path: PathBuf,
    raw_text: String,
}

impl SourceDocument {
    /// Create a document from its path and full text
    pub fn new(path: impl Into<PathBuf>, raw_text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            raw_text: raw_text.into(),
        }
    }

    /// Path the document was read from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw document text
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }
}

/// A pass-through metadata value: either a single string or a list of strings
///
/// Linked-data blocks are inconsistent about this (`keywords` in particular
/// shows up in both shapes), so both are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextValue {
    /// A single string
    Text(String),
    /// A list of strings
    List(Vec<String>),
}

impl TextValue {
    /// Whether the value carries no text at all
    pub fn is_empty(&self) -> bool {
        match self {
            TextValue::Text(s) => s.is_empty(),
            TextValue::List(items) => items.iter().all(|s| s.is_empty()),
        }
    }

    /// Copy with surrounding whitespace removed from every string
    pub fn trimmed(&self) -> Self {
        match self {
            TextValue::Text(s) => TextValue::Text(s.trim().to_string()),
            TextValue::List(items) => {
                TextValue::List(items.iter().map(|s| s.trim().to_string()).collect())
            }
        }
    }

    /// First string of the value, if any
    pub fn first(&self) -> Option<&str> {
        match self {
            TextValue::Text(s) => Some(s.as_str()),
            TextValue::List(items) => items.first().map(String::as_str),
        }
    }
}

impl From<&str> for TextValue {
    fn from(value: &str) -> Self {
        TextValue::Text(value.to_string())
    }
}

impl From<String> for TextValue {
    fn from(value: String) -> Self {
        TextValue::Text(value)
    }
}

impl From<Vec<String>> for TextValue {
    fn from(value: Vec<String>) -> Self {
        TextValue::List(value)
    }
}

impl fmt::Display for TextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextValue::Text(s) => write!(f, "{}", s),
            TextValue::List(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

/// The unit of output: one normalized article
///
/// Field order here is the serialized key order of the stored JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedRecord {
    /// Canonical URL once materialized; metadata or path-derived id before that
    pub id: String,

    /// Article section (`articleSection`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<TextValue>,

    /// Description, whitespace-trimmed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<TextValue>,

    /// Last modification date as published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<TextValue>,

    /// Original publication date as published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_published: Option<TextValue>,

    /// Headline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<TextValue>,

    /// Keywords, string or list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<TextValue>,

    /// Cleaned body fragments in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raw_content: Vec<String>,

    /// Author names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<TextValue>,
}

impl ExtractedRecord {
    /// Create a record carrying only an identifier
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Number of fields that carry information, `id` included
    ///
    /// # Examples
    ///
    /// ```
    /// use morgue_domain::ExtractedRecord;
    ///
    /// let mut record = ExtractedRecord::with_id("https://example.com/a/20230101/x/");
    /// assert_eq!(record.populated_fields(), 1);
    ///
    /// record.raw_content.push("Hello".to_string());
    /// assert_eq!(record.populated_fields(), 2);
    /// ```
    pub fn populated_fields(&self) -> usize {
        let optional = [
            &self.section,
            &self.description,
            &self.date_modified,
            &self.date_published,
            &self.headline,
            &self.keywords,
            &self.author,
        ];

        let mut count = optional
            .iter()
            .filter(|field| matches!(field, Some(v) if !v.is_empty()))
            .count();
        if !self.id.is_empty() {
            count += 1;
        }
        if !self.raw_content.is_empty() {
            count += 1;
        }
        count
    }

    /// An id-only record carries nothing worth persisting
    pub fn is_worth_persisting(&self) -> bool {
        self.populated_fields() >= 2
    }

    /// Serialize with two-space indentation and a trailing newline
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }
}
