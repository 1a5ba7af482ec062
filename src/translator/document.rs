use serde::{Deserialize, Serialize};

use crate::errors::SubmissionError;

/// The only storage type the batch API accepts for single documents
pub const STORAGE_TYPE_FILE: &str = "File";

/// Batch document translation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Documents to translate
    pub inputs: Vec<BatchInput>,
}

/// One source document and where its translations go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInput {
    /// Kind of source the URLs point to
    pub storage_type: String,

    /// Document to translate
    pub source: SourceDocument,

    /// Where each translation is written
    pub targets: Vec<TargetDocument>,
}

/// Source document location and optional language hint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDocument {
    /// Signed URL the service reads the document from
    pub source_url: String,

    /// Source language; the service detects it when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Target document location and language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDocument {
    /// Signed URL the service writes the translation to
    pub target_url: String,

    /// Target language code
    pub language: String,
}

impl BatchRequest {
    /// Build a request translating one document into one target language
    ///
    /// An empty `source_language` is treated as absent so the service auto-detects it.
    pub fn single(
        source_url: impl Into<String>,
        target_url: impl Into<String>,
        source_language: Option<&str>,
        target_language: impl Into<String>,
    ) -> Self {
        let language = source_language
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
            .map(str::to_string);

        Self {
            inputs: vec![BatchInput {
                storage_type: STORAGE_TYPE_FILE.to_string(),
                source: SourceDocument {
                    source_url: source_url.into(),
                    language,
                },
                targets: vec![TargetDocument {
                    target_url: target_url.into(),
                    language: target_language.into(),
                }],
            }],
        }
    }

    /// Serialize as 2-space indented JSON
    pub fn to_pretty_json(&self) -> Result<String, SubmissionError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SubmissionError::InvalidDocument(format!("error marshaling JSON: {}", e)))
    }

    /// URL of the first target, if any
    pub fn first_target_url(&self) -> Option<&str> {
        self.inputs
            .first()
            .and_then(|input| input.targets.first())
            .map(|target| target.target_url.as_str())
    }
}
