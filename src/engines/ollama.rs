use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_OLLAMA_URL, ENV_OLLAMA_MODEL, ENV_OLLAMA_URL};
use crate::pipeline::{EngineError, GenerativeEngine};

pub const DEFAULT_VISION_MODEL: &str = "llama3.2-vision";

const EXTRACTION_PROMPT: &str = "Read this restaurant menu photo and list every dish exactly as printed. \
Respond with JSON only, in the form {\"dishes\": [{\"name\": string, \"price\": number or null, \
\"currency\": string or null, \"category\": string or null, \"confidence\": number between 0 and 1}]}. \
Do not invent dishes, do not translate names, and use null for prices you cannot read.";

/// Secondary engine backed by a vision model on a local Ollama server.
pub struct OllamaGenerativeEngine {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl OllamaGenerativeEngine {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, EngineError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Unavailable(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout,
        })
    }

    /// Engine configured from `MENUSCAN_OLLAMA_URL` and `MENUSCAN_OLLAMA_MODEL`.
    /// `timeout` is the secondary stage budget, so the HTTP call gives up when
    /// the stage does.
    pub fn from_env(timeout: Duration) -> Result<Self, EngineError> {
        let base_url = std::env::var(ENV_OLLAMA_URL).unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string());
        let model = std::env::var(ENV_OLLAMA_MODEL).unwrap_or_else(|_| DEFAULT_VISION_MODEL.to_string());
        Self::new(&base_url, &model, timeout)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn chat_request<'a>(&'a self, image: &[u8]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: EXTRACTION_PROMPT,
                images: vec![base64::engine::general_purpose::STANDARD.encode(image)],
            }],
            stream: false,
            format: "json",
            options: ChatOptions { temperature: 0.0 },
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    format: &'a str,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
    images: Vec<String>,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl GenerativeEngine for OllamaGenerativeEngine {
    fn name(&self) -> &str {
        "ollama"
    }

    fn extract_dishes(&self, image: &[u8]) -> Result<String, EngineError> {
        let url = format!("{}/api/chat", self.base_url);
        tracing::debug!(model = %self.model, image_bytes = image.len(), "Sending menu to Ollama");

        let response = self
            .client
            .post(&url)
            .json(&self.chat_request(image))
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    EngineError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    EngineError::Timeout {
                        budget_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    EngineError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EngineError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| EngineError::ResponseParsing(e.to_string()))?;

        Ok(parsed.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline_config::PipelineConfig;

    fn engine(url: &str) -> OllamaGenerativeEngine {
        OllamaGenerativeEngine::new(url, DEFAULT_VISION_MODEL, Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn constructor_trims_trailing_slash() {
        let engine = engine("http://localhost:11434/");
        assert_eq!(engine.base_url, "http://localhost:11434");
        assert_eq!(engine.model(), DEFAULT_VISION_MODEL);
    }

    #[test]
    fn client_timeout_follows_stage_budget() {
        let budget = Duration::from_millis(PipelineConfig::default().stage_timeout_ms);
        let engine = OllamaGenerativeEngine::from_env(budget).unwrap();
        assert_eq!(engine.timeout(), budget);
    }

    #[test]
    fn request_carries_base64_image_and_json_format() {
        let engine = engine(DEFAULT_OLLAMA_URL);
        let body = serde_json::to_value(engine.chat_request(b"menu")).unwrap();

        assert_eq!(body["model"], DEFAULT_VISION_MODEL);
        assert_eq!(body["stream"], false);
        assert_eq!(body["format"], "json");
        assert_eq!(body["messages"][0]["images"][0], "bWVudQ==");
        assert!(body["messages"][0]["content"]
            .as_str()
            .unwrap()
            .contains("JSON only"));
    }

    #[test]
    fn response_content_is_extracted() {
        let raw = r#"{"model": "llama3.2-vision", "message": {"role": "assistant", "content": "{\"dishes\": []}"}, "done": true}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.message.content, r#"{"dishes": []}"#);
    }

    #[test]
    fn refused_connection_maps_to_connection_error() {
        let engine = engine("http://127.0.0.1:1");
        let err = engine.extract_dishes(b"menu").unwrap_err();
        assert_eq!(err, EngineError::Connection("http://127.0.0.1:1".into()));
    }
}
