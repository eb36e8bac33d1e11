//! Gemini adapter (chat generation).
//!
//! Uses the `models/{model}:generateContent` REST endpoint. The client is
//! stateless; conversation history comes in with every request.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use gcb_core::{
    errors::{Error, UpstreamError},
    model::{
        client::ChatModel,
        types::{ChatTurn, GenerateRequest, GenerationConfig, Role},
    },
    Result,
};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone, Debug)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::External(format!("gemini http client build failed: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: API_BASE.to_string(),
            http,
        })
    }

    /// Point the client at a different API root (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        let model = self.model.strip_prefix("models/").unwrap_or(&self.model);
        format!("{}/models/{model}:generateContent", self.base_url)
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, req: GenerateRequest) -> std::result::Result<String, UpstreamError> {
        let body = WireRequest::from(&req);

        let resp = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: error_message(&text),
            });
        }

        let parsed: WireResponse =
            serde_json::from_str(&text).map_err(|e| UpstreamError::Decode(e.to_string()))?;
        let reply = extract_text(parsed)?;

        tracing::debug!(model = %self.model, chars = reply.len(), "gemini reply received");
        Ok(reply)
    }
}

// Wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    contents: Vec<WireContent<'a>>,
    generation_config: WireGenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct WireContent<'a> {
    role: &'static str,
    parts: Vec<WirePart<'a>>,
}

#[derive(Debug, Serialize)]
struct WirePart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig<'a> {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: &'a str,
}

impl<'a> From<&'a GenerateRequest> for WireRequest<'a> {
    fn from(req: &'a GenerateRequest) -> Self {
        Self {
            contents: req.contents.iter().map(wire_content).collect(),
            generation_config: wire_config(&req.config),
        }
    }
}

fn wire_content(turn: &ChatTurn) -> WireContent<'_> {
    WireContent {
        role: match turn.role {
            Role::User => "user",
            Role::Model => "model",
        },
        parts: vec![WirePart { text: &turn.text }],
    }
}

fn wire_config(cfg: &GenerationConfig) -> WireGenerationConfig<'_> {
    WireGenerationConfig {
        temperature: cfg.temperature,
        top_p: cfg.top_p,
        top_k: cfg.top_k,
        max_output_tokens: cfg.max_output_tokens,
        response_mime_type: &cfg.response_mime_type,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    prompt_feedback: Option<WirePromptFeedback>,
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    content: Option<WireCandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireCandidateContent {
    #[serde(default)]
    parts: Vec<WireResponsePart>,
}

#[derive(Debug, Deserialize)]
struct WireResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct WireErrorEnvelope {
    error: WireError,
}

/// Concatenate the text parts of the first candidate.
fn extract_text(resp: WireResponse) -> std::result::Result<String, UpstreamError> {
    if let Some(err) = resp.error {
        return Err(UpstreamError::Api(err.message));
    }
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(UpstreamError::Blocked(reason));
    }

    let Some(candidate) = resp.candidates.into_iter().next() else {
        return Err(UpstreamError::EmptyResponse(None));
    };

    let text = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(UpstreamError::EmptyResponse(candidate.finish_reason));
    }
    Ok(text)
}

/// Prefer the API's own error message over the raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<WireErrorEnvelope>(body) {
        Ok(env) => env.error.message,
        Err(_) => body.chars().take(200).collect(),
    }
}
