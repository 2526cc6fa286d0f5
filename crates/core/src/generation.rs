//! Generation service client.
//!
//! Every model interaction in the pipeline goes through the [`Generator`]
//! trait: topic selection, art direction, cover relevance judgment, article
//! drafting, cleanup and SEO. [`ChatClient`] implements it against any
//! OpenAI-compatible `chat/completions` endpoint (Gemini, Mistral, OpenRouter,
//! DeepSeek all speak this dialect).
//!
//! The service is untrusted. Callers treat a successful response as text of
//! unknown quality and validate it themselves (see [`crate::structured`]).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::fetch::map_request_error;
use crate::{QuillError, Result};

/// One request to the generation service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    /// User prompt.
    pub prompt: String,
    /// Ask the service to answer with a JSON object.
    pub structured: bool,
    /// Sampling temperature; the client default applies when `None`.
    pub temperature: Option<f32>,
    /// Image attached to the prompt, by URL.
    pub image_url: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), ..Default::default() }
    }

    pub fn structured(mut self) -> Self {
        self.structured = true;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

/// Text generation seam.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Sends one request and returns the generated text.
    ///
    /// # Errors
    ///
    /// Returns [`QuillError::GenerationError`] when the service answers with
    /// an error status or no usable text, and transport errors as-is.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Checks that the service accepts our credentials and model.
    async fn probe(&self) -> Result<()> {
        let request = GenerationRequest::new("Connection test. Reply with the single word OK.").temperature(0.0);
        self.generate(&request).await.map(|_| ())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// [`Generator`] speaking the OpenAI-compatible chat completions protocol.
pub struct ChatClient {
    client: Client,
    config: GenerationConfig,
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("client", &"<reqwest::Client>")
            .field("config", &self.config)
            .finish()
    }
}

impl ChatClient {
    pub fn new(config: GenerationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(QuillError::HttpError)?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn build_messages(request: &GenerationRequest) -> Vec<ChatMessage> {
        let content = match &request.image_url {
            Some(url) => MessageContent::Parts(vec![
                ContentPart::Text { text: request.prompt.clone() },
                ContentPart::ImageUrl { image_url: ImageUrl { url: url.clone() } },
            ]),
            None => MessageContent::Text(request.prompt.clone()),
        };
        vec![ChatMessage { role: "user", content }]
    }
}

#[async_trait]
impl Generator for ChatClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: Self::build_messages(request),
            temperature: request.temperature.unwrap_or(self.config.temperature),
            response_format: request.structured.then_some(ResponseFormat { kind: "json_object" }),
        };

        tracing::debug!(
            model = %self.config.model,
            prompt_chars = request.prompt.len(),
            structured = request.structured,
            "sending generation request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_request_error(e, self.config.timeout))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| map_request_error(e, self.config.timeout))?;

        if !status.is_success() {
            return Err(QuillError::GenerationError(format!(
                "service returned {}: {}",
                status,
                truncate_for_log(&text, 300)
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| QuillError::GenerationError(format!("unreadable response body: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| QuillError::GenerationError("response contained no choices".to_string()))?;

        if content.trim().is_empty() {
            return Err(QuillError::GenerationError("response text was empty".to_string()));
        }

        tracing::debug!(chars = content.len(), "generation response received");
        Ok(content)
    }
}

/// Shortens a response body for inclusion in an error message.
pub(crate) fn truncate_for_log(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = GenerationRequest::new("pick a topic").structured().temperature(0.0);
        assert_eq!(request.prompt, "pick a topic");
        assert!(request.structured);
        assert_eq!(request.temperature, Some(0.0));
        assert!(request.image_url.is_none());
    }

    #[test]
    fn test_plain_request_serialization() {
        let request = GenerationRequest::new("hello").structured();
        let body = ChatRequest {
            model: "m",
            messages: ChatClient::build_messages(&request),
            temperature: 0.7,
            response_format: Some(ResponseFormat { kind: "json_object" }),
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "m");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello");
        assert_eq!(json["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_image_request_serialization() {
        let request = GenerationRequest::new("keep or replace?").with_image("https://cdn.example.com/a.jpg");
        let messages = ChatClient::build_messages(&request);
        let json = serde_json::to_value(&messages).unwrap();

        assert_eq!(json.as_array().map(Vec::len), Some(1));
        assert_eq!(json[0]["role"], "user");
        assert_eq!(json[0]["content"][0]["type"], "text");
        assert_eq!(json[0]["content"][1]["type"], "image_url");
        assert_eq!(json[0]["content"][1]["image_url"]["url"], "https://cdn.example.com/a.jpg");
    }

    #[test]
    fn test_response_format_omitted_when_unstructured() {
        let body = ChatRequest {
            model: "m",
            messages: ChatClient::build_messages(&GenerationRequest::new("x")),
            temperature: 0.2,
            response_format: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Hi"},"finish_reason":"stop"}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Hi"));
    }

    #[test]
    fn test_endpoint_joins_cleanly() {
        let config = GenerationConfig { base_url: "https://api.example.com/v1/".to_string(), ..Default::default() };
        let client = ChatClient::new(config).unwrap();
        assert_eq!(client.endpoint(), "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn test_debug_hides_key() {
        let config = GenerationConfig { api_key: "secret".to_string(), ..Default::default() };
        let client = ChatClient::new(config).unwrap();
        assert!(!format!("{:?}", client).contains("secret"));
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("short", 10), "short");
        assert_eq!(truncate_for_log("abcdefghij", 4), "abcd...");
    }
}
