//! Wire shapes of the knowledge base's retrieve-and-generate call.

use serde::{Deserialize, Serialize};

/// Response body of a retrieve-and-generate call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrieveAndGenerateResponse {
    /// Generated answer
    pub output: GeneratedOutput,
    /// Sources the answer cites
    #[serde(default)]
    pub citations: Vec<Citation>,
    /// Retrieval session assigned by the service
    #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Generated answer text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedOutput {
    /// Answer text
    pub text: String,
}

/// One citation of the generated answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// References backing the citation
    #[serde(rename = "retrievedReferences", default)]
    pub retrieved_references: Vec<RetrievedReference>,
}

/// A retrieved source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedReference {
    /// Where the source lives
    #[serde(default)]
    pub location: Option<ReferenceLocation>,
}

/// Location of a retrieved source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceLocation {
    /// Location kind, `SQL` for structured stores
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub location_type: Option<String>,
    /// Set for SQL locations
    #[serde(rename = "sqlLocation", default, skip_serializing_if = "Option::is_none")]
    pub sql_location: Option<SqlLocation>,
}

/// SQL a structured knowledge base executed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlLocation {
    /// Executed query
    pub query: String,
}

impl RetrieveAndGenerateResponse {
    /// Query of the first citation reference that carries an SQL location.
    pub fn first_sql(&self) -> Option<&str> {
        self.citations
            .iter()
            .flat_map(|c| &c.retrieved_references)
            .find_map(|r| r.location.as_ref()?.sql_location.as_ref())
            .map(|loc| loc.query.as_str())
    }
}

/// Outcome of a retrieval call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RetrievalResult {
    /// Generated answer with the SQL the knowledge base ran, if cited.
    Answer {
        /// Generated text
        answer: String,
        /// Query of the first SQL citation
        sql: Option<String>,
    },
    /// Error body for a failed or rejected call.
    Error {
        /// Error description
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sql_skips_references_without_sql() {
        let response: RetrieveAndGenerateResponse = serde_json::from_value(serde_json::json!({
            "output": {"text": "Electronics leads revenue."},
            "citations": [
                {"retrievedReferences": [{"location": {"type": "S3"}}]},
                {"retrievedReferences": [
                    {"location": {"type": "SQL", "sqlLocation": {"query": "SELECT 1"}}},
                    {"location": {"type": "SQL", "sqlLocation": {"query": "SELECT 2"}}}
                ]}
            ]
        }))
        .unwrap();
        assert_eq!(response.first_sql(), Some("SELECT 1"));
    }

    #[test]
    fn test_first_sql_none_without_citations() {
        let response: RetrieveAndGenerateResponse =
            serde_json::from_value(serde_json::json!({"output": {"text": "x"}})).unwrap();
        assert_eq!(response.first_sql(), None);
    }
}
