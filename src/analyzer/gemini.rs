// Gemini adapter for structured document extraction
// API reference: https://ai.google.dev/api/generate-content
//
// Documents are sent inline (base64) next to the instruction text, so this
// works for images and PDFs alike without a separate file-upload step.

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::analyzer::DocumentAnalyzer;
use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::models::{InvoiceRecord, UploadPayload};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default extraction model. Flash is fast and cheap enough to sit in the
/// synchronous upload path.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub struct GeminiAnalyzer {
    client: Client,
    api_key: String,
    model: String,
    api_base: String,
}

// Request types for the generateContent API
#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

// Response types for the generateContent API
#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Deserialize)]
struct GeminiError {
    message: String,
}

impl GeminiAnalyzer {
    pub fn new(api_key: &str) -> Self {
        Self::with_api_base(api_key, GEMINI_API_BASE)
    }

    /// Point the client at a different API root. Tests use this to target
    /// a local mock server.
    pub fn with_api_base(api_key: &str, api_base: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn from_config(config: &AnalyzerConfig) -> Self {
        let analyzer = match &config.api_base {
            Some(base) => Self::with_api_base(&config.api_key, base),
            None => Self::new(&config.api_key),
        };
        analyzer.with_model(&config.model)
    }
}

/// Trims everything outside the outermost JSON object. Gemini sometimes
/// wraps its answer in markdown fences or a short preamble despite the
/// prompt forbidding both.
fn clean_model_json(response: &str) -> &str {
    let start = response.find('{');
    let end = response.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => response,
    }
}

#[async_trait]
impl DocumentAnalyzer for GeminiAnalyzer {
    async fn analyze(
        &self,
        payload: &UploadPayload,
        instructions: &str,
    ) -> Result<InvoiceRecord, AnalyzerError> {
        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);

        let encoded = base64::engine::general_purpose::STANDARD.encode(&payload.data);
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: Some(instructions.to_string()),
                        inline_data: None,
                    },
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: payload.content_type.clone(),
                            data: encoded,
                        }),
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalyzerError::Transport(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            // The API nests the useful message inside an error object
            if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(&error_text) {
                return Err(AnalyzerError::Api {
                    status: status.as_u16(),
                    message: error_response.error.message,
                });
            }

            return Err(AnalyzerError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AnalyzerError::MalformedOutput(format!("response decode failed: {e}")))?;

        let text = body
            .candidates
            .first()
            .and_then(|candidate| candidate.content.parts.first())
            .map(|part| part.text.as_str())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(AnalyzerError::EmptyResponse);
        }

        serde_json::from_str(clean_model_json(text))
            .map_err(|e| AnalyzerError::MalformedOutput(e.to_string()))
    }
}
