/// LLM Client — the single point of entry for all Gemini API calls in Salarylens.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// All model interactions MUST go through this module.
///
/// Model: gemini-2.0-flash (hardcoded — do not make configurable to prevent drift)
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// The model used for all LLM calls in Salarylens.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("AI service temporarily unavailable (status {status})")]
    Unavailable { status: u16 },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Model returned empty content")]
    EmptyContent,

    #[error("AI service is not properly configured: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Configuration errors (missing or rejected credential) are never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(self, LlmError::Configuration(_))
    }
}

/// One generation request: an inline base64 document, a natural-language
/// instruction, and an optional response schema for the backend to enforce.
pub struct GenerateRequest<'a> {
    pub media_type: &'a str,
    pub media_base64: &'a str,
    pub prompt: &'a str,
    pub response_schema: Option<&'a Value>,
}

/// What a backend produced: a schema-validated structured value, or raw text
/// the caller must parse itself (possibly wrapped in Markdown code fences).
#[derive(Debug, Clone)]
pub enum GenerateOutput {
    Structured(Value),
    Text(String),
}

/// The generative backend seam. `AppState` carries `Arc<dyn GenerativeModel>`
/// so tests can substitute a stub without touching handler or invoker code.
///
/// A `generate` call is exactly one attempt — retry lives in the caller.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<GenerateOutput, LlmError>;
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// The production `GenerativeModel` backed by the Gemini `generateContent`
/// REST endpoint. Constructed once at startup and shared across requests.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::Configuration(
                "GOOGLE_API_KEY is empty".to_string(),
            ));
        }
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            api_key,
        })
    }

    /// Makes a single call to the Gemini API and returns the model's text.
    /// Exactly one HTTP request per call; no retry here.
    async fn call(&self, request: &GenerateRequest<'_>) -> Result<String, LlmError> {
        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {
                        "inline_data": {
                            "mime_type": request.media_type,
                            "data": request.media_base64,
                        }
                    },
                    { "text": request.prompt }
                ]
            }]
        });

        if let Some(schema) = request.response_schema {
            body["generationConfig"] = json!({
                "response_mime_type": "application/json",
                "response_schema": schema,
            });
        }

        let url = format!("{GEMINI_API_BASE}/{MODEL}:generateContent");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if status.as_u16() == 401 || status.as_u16() == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Configuration(parse_api_message(&body)));
        }

        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini API returned {}: {}", status, body);
            return Err(LlmError::Unavailable {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: parse_api_message(&body),
            });
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let text = extract_text(&gemini_response)?;

        debug!("Gemini call succeeded: {} chars of output", text.len());

        Ok(text)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<GenerateOutput, LlmError> {
        let text = self.call(&request).await?;

        // With response_schema set the API returns bare JSON; surface it
        // structured. If it is not valid JSON, hand the raw text back and let
        // the caller apply its fence-stripping parse path.
        if request.response_schema.is_some() {
            if let Ok(value) = serde_json::from_str::<Value>(&text) {
                return Ok(GenerateOutput::Structured(value));
            }
        }

        Ok(GenerateOutput::Text(text))
    }
}

/// Extracts the first text part from the first candidate.
fn extract_text(response: &GeminiResponse) -> Result<String, LlmError> {
    response
        .candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|c| c.parts.iter())
        .find_map(|p| p.text.clone())
        .ok_or(LlmError::EmptyContent)
}

/// Pulls the human-readable message out of a Gemini error body, falling back
/// to the raw body when it is not the expected JSON shape.
fn parse_api_message(body: &str) -> String {
    serde_json::from_str::<GeminiError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
