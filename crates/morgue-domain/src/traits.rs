//! Trait definitions for external capabilities
//!
//! HTML element selection and script evaluation are infrastructure concerns.
//! The extractor depends only on these interfaces.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Which embedded element to select from a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSelector {
    /// Tag name, matched case-insensitively (e.g. `script`)
    pub tag: String,
    /// Required attribute `name="value"`, if any
    pub attribute: Option<(String, String)>,
}

impl ElementSelector {
    /// Select every element with the given tag
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attribute: None,
        }
    }

    /// Additionally require an attribute value
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attribute = Some((name.into(), value.into()));
        self
    }
}

/// Structured document query capability
pub trait DocumentQuery {
    /// Inner text of every matching element, in document order
    fn select_all(&self, document: &str, selector: &ElementSelector) -> Vec<String>;

    /// Inner text of the first matching element
    fn select_first(&self, document: &str, selector: &ElementSelector) -> Option<String> {
        self.select_all(document, selector).into_iter().next()
    }
}

/// Typed failure of a script evaluation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// Script text is outside the accepted grammar
    #[error("parse error at byte {offset}: {message}")]
    Parse {
        /// Byte offset into the script
        offset: usize,
        /// What was expected
        message: String,
    },

    /// Script is well-formed but cannot be executed
    #[error("runtime error: {0}")]
    Runtime(String),

    /// Evaluation exceeded its time budget
    #[error("evaluation exceeded {0:?}")]
    Timeout(Duration),
}

/// Sandboxed script evaluation capability
///
/// Evaluates script text with only `globals` pre-bound (each as an empty
/// object) and returns the resulting global scope as an object graph.
pub trait ScriptEvaluator {
    /// Evaluate `script` within `budget`
    fn evaluate(
        &self,
        script: &str,
        globals: &[&str],
        budget: Duration,
    ) -> Result<Value, EvaluationError>;
}
