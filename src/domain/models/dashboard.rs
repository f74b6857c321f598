//! Dashboard definitions and the tagged reply returned for each turn.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::errors::{DomainError, DomainResult};

/// Sentinel the template uses for the dataset identifier until post-processing.
pub const DATASET_PLACEHOLDER: &str = "Do_not_change_this_value";

/// A dashboard definition document.
///
/// Documents built through [`DashboardDefinition::new`] carry a top-level
/// `Definition` object. Documents recovered from reply text by
/// [`TurnReply::sniff`] are kept as parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DashboardDefinition(Value);

impl DashboardDefinition {
    /// Wrap a JSON value, requiring an object with a `Definition` key.
    pub fn new(value: Value) -> DomainResult<Self> {
        match value.get("Definition") {
            Some(Value::Object(_)) => Ok(Self(value)),
            Some(_) => Err(DomainError::MalformedOutput(
                "'Definition' must be a JSON object".to_string(),
            )),
            None => Err(DomainError::MalformedOutput(
                "document has no top-level 'Definition' key".to_string(),
            )),
        }
    }

    /// The whole document.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Unwrap into the whole document.
    pub fn into_value(self) -> Value {
        self.0
    }

    /// The inner `Definition` object sent to the hosting service.
    pub fn body(&self) -> &Value {
        &self.0["Definition"]
    }

    /// Occurrences of the sentinel anywhere in the serialized document.
    pub fn placeholder_count(&self) -> usize {
        self.0.to_string().matches(DATASET_PLACEHOLDER).count()
    }

    /// Indented JSON rendering.
    pub fn to_pretty_string(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| self.0.to_string())
    }
}

/// What a turn hands back to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnReply {
    /// Conversational reply
    Text(String),
    /// Document to render as JSON
    Definition(DashboardDefinition),
}

impl TurnReply {
    /// Recover the tag from plain text.
    ///
    /// Trimmed text starting with `{`, ending with `}` and parsing as JSON,
    /// or as a literal structure with single-quoted strings, is a
    /// `Definition`; anything else is `Text`.
    pub fn sniff(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            let parsed = serde_json::from_str::<Value>(trimmed)
                .ok()
                .or_else(|| parse_literal(trimmed));
            if let Some(value) = parsed {
                return Self::Definition(DashboardDefinition(value));
            }
        }
        Self::Text(text.to_string())
    }

    /// Plain-text rendering for transcripts and terminals.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Definition(definition) => definition.to_pretty_string(),
        }
    }
}

/// Parse a literal structure: single-quoted strings and `True`, `False`,
/// `None` are rewritten to JSON before parsing.
fn parse_literal(text: &str) -> Option<Value> {
    let mut json = String::with_capacity(text.len());
    let mut chars = text.chars();
    let mut word = String::new();

    let flush_word = |word: &mut String, json: &mut String| {
        match word.as_str() {
            "True" => json.push_str("true"),
            "False" => json.push_str("false"),
            "None" => json.push_str("null"),
            other => json.push_str(other),
        }
        word.clear();
    };

    while let Some(ch) = chars.next() {
        match ch {
            '\'' | '"' => {
                flush_word(&mut word, &mut json);
                json.push('"');
                while let Some(inner) = chars.next() {
                    match inner {
                        '\\' => {
                            let escaped = chars.next()?;
                            if escaped == '\'' {
                                json.push('\'');
                            } else {
                                json.push('\\');
                                json.push(escaped);
                            }
                        }
                        c if c == ch => break,
                        '"' => json.push_str("\\\""),
                        c => json.push(c),
                    }
                }
                json.push('"');
            }
            c if c.is_alphanumeric() || c == '_' => word.push(c),
            c => {
                flush_word(&mut word, &mut json);
                json.push(c);
            }
        }
    }
    flush_word(&mut word, &mut json);
    serde_json::from_str(&json).ok()
}
