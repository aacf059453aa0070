//! Gemini REST client for the tasting
//!
//! Sends the persona prompt plus the image inline, asks for a JSON answer
//! matching [`response_schema`], and parses the first text part of the
//! reply as an [`AnalysisResult`].

use super::prompts::{response_schema, SOMMELIER_PROMPT};
use super::{AnalysisResult, AnalysisService};
use crate::capture::CapturedImage;
use crate::config::AnalysisConfig;
use crate::{Result, SommelierError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Analysis service backed by the Gemini `generateContent` endpoint
#[derive(Clone)]
pub struct GeminiAnalysisService {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiAnalysisService {
    /// Create a service from configuration
    ///
    /// # Errors
    /// `ConfigError` if no API key is configured or the HTTP client cannot
    /// be built.
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        if !config.has_api_key() {
            return Err(SommelierError::ConfigError(
                "no API key configured (set GEMINI_API_KEY)".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SommelierError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Model the service talks to
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }

    async fn send_request(&self, body: &GenerateContentRequest) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|err| {
                SommelierError::AnalysisFailure(format!("Gemini API request failed: {err}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, &body_text));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            SommelierError::AnalysisFailure(format!("Failed to parse Gemini response: {err}"))
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl AnalysisService for GeminiAnalysisService {
    async fn analyze(&self, image: &CapturedImage) -> Result<AnalysisResult> {
        info!(
            "[ANALYSIS] Sending {} ({} bytes) to {}",
            image.mime_type(),
            image.len(),
            self.model
        );

        let request = build_request(image);
        let text = self.send_request(&request).await?;
        debug!("[ANALYSIS] Raw response: {} chars", text.len());

        AnalysisResult::from_json(&text)
    }
}

/// Build the request body for one image
fn build_request(image: &CapturedImage) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: "user".to_string(),
            parts: vec![
                Part::Text {
                    text: SOMMELIER_PROMPT.to_string(),
                },
                Part::InlineData {
                    inline_data: InlineDataPayload {
                        mime_type: image.mime_type().to_string(),
                        data: image.to_base64(),
                    },
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: response_schema(),
        },
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataPayload,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataPayload {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn extract_text_response(response: GenerateContentResponse) -> Result<String> {
    response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
        .ok_or_else(|| {
            SommelierError::AnalysisFailure(
                "Gemini API returned no text in the response candidates".into(),
            )
        })
}

fn map_http_error(status: StatusCode, body: &str) -> SommelierError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.to_string());

    SommelierError::AnalysisFailure(format!("HTTP {}: {}", status.as_u16(), message))
}
