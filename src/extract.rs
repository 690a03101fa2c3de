//! Extraction Call: one LLM request per document, returning typed terms.
//!
//! Defines the [`Extractor`] trait and two HTTP implementations:
//! - **[`GeminiExtractor`]** calls `models/{model}:generateContent` with a
//!   JSON response schema.
//! - **[`OpenAiExtractor`]** calls `chat/completions` with a strict
//!   `json_schema` response format.
//!
//! Both request an array of objects with `id`, `title`, `summary`,
//! `details` (nullable) and `references`. The reply is deserialised into
//! [`Term`]s; a reply that does not fit that shape is an
//! [`ExtractError::InvalidResponse`].
//!
//! There is no retry here. A failed document stays un-checkpointed and is
//! picked up again by the next run.

use anyhow::bail;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::LlmConfig;
use crate::models::Term;

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const OPENAI_ENDPOINT: &str = "https://api.openai.com";

/// Why a single Extraction Call produced no usable terms.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("could not read document: {0}")]
    Unreadable(#[from] std::io::Error),
}

/// An LLM backend that turns a rendered prompt into glossary terms.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Short provider label used in logs (e.g. `"gemini"`).
    fn name(&self) -> &str;

    async fn extract(&self, prompt: &str) -> Result<Vec<Term>, ExtractError>;
}

/// Build the configured extractor. Fails if the API key is not set.
pub fn create_extractor(config: &LlmConfig) -> anyhow::Result<Arc<dyn Extractor>> {
    let key_env = config.key_env();
    let api_key = match std::env::var(key_env) {
        Ok(k) if !k.is_empty() => k,
        _ => bail!("{} environment variable not set", key_env),
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiExtractor {
            client,
            endpoint: endpoint_or(config, GEMINI_ENDPOINT),
            model: config.model.clone(),
            api_key,
        })),
        "openai" => Ok(Arc::new(OpenAiExtractor {
            client,
            endpoint: endpoint_or(config, OPENAI_ENDPOINT),
            model: config.model.clone(),
            api_key,
        })),
        other => bail!("Unknown llm provider: {}", other),
    }
}

fn endpoint_or(config: &LlmConfig, default: &str) -> String {
    config
        .endpoint
        .as_deref()
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

/// JSON schema of a single term, shared by both providers.
fn term_properties() -> Value {
    json!({
        "id": { "type": "string" },
        "title": { "type": "string" },
        "summary": { "type": "string" },
        "details": { "type": ["string", "null"] },
        "references": { "type": "array", "items": { "type": "string" } }
    })
}

const TERM_FIELDS: [&str; 5] = ["id", "title", "summary", "details", "references"];

// ============ Gemini ============

pub struct GeminiExtractor {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

/// Gemini's OpenAPI-subset schema for `list[Term]`.
pub fn gemini_response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "STRING" },
                "title": { "type": "STRING" },
                "summary": { "type": "STRING" },
                "details": { "type": "STRING", "nullable": true },
                "references": { "type": "ARRAY", "items": { "type": "STRING" } }
            },
            "required": TERM_FIELDS,
            "propertyOrdering": TERM_FIELDS
        }
    })
}

#[async_trait]
impl Extractor for GeminiExtractor {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn extract(&self, prompt: &str) -> Result<Vec<Term>, ExtractError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        );
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": gemini_response_schema()
            }
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let json = read_success_json(response).await?;
        parse_gemini_response(&json)
    }
}

/// Concatenate the text parts of the first candidate and parse them as terms.
fn parse_gemini_response(json: &Value) -> Result<Vec<Term>, ExtractError> {
    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| {
            let reason = json
                .pointer("/promptFeedback/blockReason")
                .and_then(|r| r.as_str())
                .unwrap_or("missing candidates[0].content.parts");
            ExtractError::InvalidResponse(reason.to_string())
        })?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    parse_terms(&text)
}

// ============ OpenAI ============

pub struct OpenAiExtractor {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

/// Strict structured-output schema. The root must be an object, so the
/// array is wrapped as `{ "terms": [...] }`.
pub fn openai_response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "glossary_terms",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "terms": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": term_properties(),
                            "required": TERM_FIELDS,
                            "additionalProperties": false
                        }
                    }
                },
                "required": ["terms"],
                "additionalProperties": false
            }
        }
    })
}

#[async_trait]
impl Extractor for OpenAiExtractor {
    fn name(&self) -> &str {
        "openai"
    }

    async fn extract(&self, prompt: &str) -> Result<Vec<Term>, ExtractError> {
        let url = format!("{}/v1/chat/completions", self.endpoint);
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "response_format": openai_response_format()
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let json = read_success_json(response).await?;
        parse_openai_response(&json)
    }
}

fn parse_openai_response(json: &Value) -> Result<Vec<Term>, ExtractError> {
    let message = json.pointer("/choices/0/message").ok_or_else(|| {
        ExtractError::InvalidResponse("missing choices[0].message".to_string())
    })?;

    if let Some(refusal) = message.get("refusal").and_then(|r| r.as_str()) {
        return Err(ExtractError::InvalidResponse(format!("refused: {}", refusal)));
    }

    let content = message
        .get("content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| ExtractError::InvalidResponse("missing message content".to_string()))?;

    let value: Value = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| ExtractError::InvalidResponse(format!("JSON parse error: {}", e)))?;

    // Accept the wrapped form and a bare array alike.
    let terms = match value {
        Value::Object(mut obj) => obj
            .remove("terms")
            .ok_or_else(|| ExtractError::InvalidResponse("missing 'terms' key".to_string()))?,
        other => other,
    };
    terms_from_value(terms)
}

// ============ Shared ============

async fn read_success_json(response: reqwest::Response) -> Result<Value, ExtractError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ExtractError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

/// Parse a JSON array of terms out of model text.
pub fn parse_terms(text: &str) -> Result<Vec<Term>, ExtractError> {
    let value: Value = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| ExtractError::InvalidResponse(format!("JSON parse error: {}", e)))?;
    terms_from_value(value)
}

fn terms_from_value(value: Value) -> Result<Vec<Term>, ExtractError> {
    if !value.is_array() {
        return Err(ExtractError::InvalidResponse(
            "expected a JSON array of terms".to_string(),
        ));
    }
    serde_json::from_value(value)
        .map_err(|e| ExtractError::InvalidResponse(format!("term shape mismatch: {}", e)))
}

/// Models sometimes wrap JSON in a markdown fence even when asked not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
