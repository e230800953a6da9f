//! Request executor: exactly one call to the generative service.
//!
//! [`GenerativeClient`] is the seam between the pipeline and the network.
//! Implementations perform one request per `generate` call and hand back the
//! failure untouched as a [`RawError`]; retrying and classification belong to
//! the caller.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::encoding::InlineData;
use crate::raw::RawError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// One content part of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    Text(String),
    InlineData(InlineData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: String,
    pub image_size: String,
}

/// A fully formed request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerateRequest {
    pub model: String,
    pub system_instruction: Option<String>,
    pub parts: Vec<Part>,
    pub response_mime_type: Option<String>,
    pub thinking_budget: Option<u32>,
    pub image_config: Option<ImageConfig>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(Part::Text(text.into()));
        self
    }

    pub fn inline(mut self, data: InlineData) -> Self {
        self.parts.push(Part::InlineData(data));
        self
    }

    /// Ask for JSON output.
    pub fn json(mut self) -> Self {
        self.response_mime_type = Some("application/json".to_string());
        self
    }

    pub fn thinking_budget(mut self, budget: u32) -> Self {
        self.thinking_budget = Some(budget);
        self
    }

    pub fn image(mut self, aspect_ratio: impl Into<String>, image_size: impl Into<String>) -> Self {
        self.image_config = Some(ImageConfig {
            aspect_ratio: aspect_ratio.into(),
            image_size: image_size.into(),
        });
        self
    }

    /// Wire body for `models/{model}:generateContent`.
    pub fn body(&self) -> Value {
        let mut body = json!({ "contents": [{ "parts": self.parts }] });

        if let Some(instruction) = &self.system_instruction {
            body["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
        }

        let mut config = Map::new();
        if let Some(mime) = &self.response_mime_type {
            config.insert("responseMimeType".into(), json!(mime));
        }
        if let Some(budget) = self.thinking_budget {
            config.insert("thinkingConfig".into(), json!({ "thinkingBudget": budget }));
        }
        if let Some(image) = &self.image_config {
            config.insert("imageConfig".into(), json!(image));
        }
        if !config.is_empty() {
            body["generationConfig"] = Value::Object(config);
        }
        body
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlinePayload>,
}

/// Inline output; the service may omit the MIME type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlinePayload {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub data: String,
}

impl GenerateResponse {
    /// Response carrying a single text part.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(Content {
                    parts: vec![ResponsePart {
                        text: Some(text.into()),
                        inline_data: None,
                    }],
                }),
            }],
        }
    }

    /// Response carrying a single inline image.
    pub fn from_inline(mime_type: Option<&str>, data: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(Content {
                    parts: vec![ResponsePart {
                        text: None,
                        inline_data: Some(InlinePayload {
                            mime_type: mime_type.map(str::to_string),
                            data: data.into(),
                        }),
                    }],
                }),
            }],
        }
    }

    fn first_parts(&self) -> &[ResponsePart] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    /// Text of the first candidate, or `None` when it has no text at all.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }

    /// First inline image of the first candidate as a data URI.
    pub fn first_inline_image(&self) -> Option<String> {
        self.first_parts()
            .iter()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|inline| !inline.data.is_empty())
            .map(|inline| {
                let mime = inline.mime_type.as_deref().unwrap_or("image/png");
                format!("data:{mime};base64,{}", inline.data)
            })
    }
}

/// The generative service, as the pipeline sees it.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Perform one request. No retries, no classification.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, RawError>;
}

/// HTTP client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, RawError> {
        let url = self.endpoint(&request.model);
        debug!(model = %request.model, parts = request.parts.len(), "generateContent");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request.body())
            .send()
            .await
            .map_err(|e| RawError::transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RawError::http(status.as_u16(), &body));
        }

        let body = response.text().await.map_err(|e| RawError::transport(&e))?;
        serde_json::from_str(&body).map_err(|e| {
            RawError::new(json!({
                "name": "ResponseParseError",
                "message": format!("invalid generateContent response body: {e}"),
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_includes_config_sections() {
        let request = GenerateRequest::new("gemini-2.5-flash")
            .system_instruction("be brief")
            .text("hello")
            .inline(InlineData {
                mime_type: "image/png".into(),
                data: "AAAA".into(),
            })
            .json()
            .thinking_budget(1024);
        let body = request.body();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["thinkingConfig"]["thinkingBudget"], 1024);
    }

    #[test]
    fn image_body_has_image_config_only() {
        let body = GenerateRequest::new("img").text("a lamp").image("3:4", "1K").body();
        assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "3:4");
        assert_eq!(body["generationConfig"]["imageConfig"]["imageSize"], "1K");
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn text_concatenates_parts() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] } }]
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn empty_response_has_no_text() {
        assert_eq!(GenerateResponse::default().text(), None);
        let blocked: GenerateResponse =
            serde_json::from_value(json!({ "candidates": [{ "finishReason": "SAFETY" }] })).unwrap();
        assert_eq!(blocked.text(), None);
    }

    #[test]
    fn inline_image_defaults_to_png() {
        let response = GenerateResponse::from_inline(None, "QUJD");
        assert_eq!(response.first_inline_image().as_deref(), Some("data:image/png;base64,QUJD"));
        let jpeg = GenerateResponse::from_inline(Some("image/jpeg"), "QUJD");
        assert_eq!(jpeg.first_inline_image().as_deref(), Some("data:image/jpeg;base64,QUJD"));
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let client =
            GeminiClient::new("AIzaSecret", "http://localhost:9/v1beta/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.endpoint("gemini-2.5-flash"),
            "http://localhost:9/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert!(!format!("{client:?}").contains("AIzaSecret"));
    }
}
