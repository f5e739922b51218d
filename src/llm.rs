use async_trait::async_trait;
use log::debug;
use tokio_util::sync::CancellationToken;

use crate::error::GenerateError;

/// A prompt-to-text capability
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, system: &str, user: &str, cancel: &CancellationToken) -> Result<String, GenerateError>;

    /// Like [`Generator::generate`], asking the backend for a bare JSON reply
    /// where it supports one
    async fn generate_json(
        &self,
        system: &str,
        user: &str,
        cancel: &CancellationToken,
    ) -> Result<String, GenerateError> {
        self.generate(system, user, cancel).await
    }
}

/// Which API a model name routes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    Gemini,
    OpenAi,
}

impl Provider {
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("claude") {
            Provider::Anthropic
        } else if model.starts_with("gemini") {
            Provider::Gemini
        } else {
            Provider::OpenAi
        }
    }

    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::Gemini => "GOOGLE_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Provider::Anthropic => "Anthropic",
            Provider::Gemini => "Gemini",
            Provider::OpenAi => "OpenAI",
        }
    }
}

/// Generator backed by a hosted LLM API
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    model: String,
    provider: Provider,
    api_key: String,
    temperature: f32,
}

impl LlmClient {
    pub fn new(http: reqwest::Client, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            http,
            provider: Provider::for_model(&model),
            model,
            api_key: api_key.into(),
            temperature: 0.2,
        }
    }

    /// Build a client reading the provider's API key from the environment
    pub fn from_env(http: reqwest::Client, model: &str) -> Result<Self, GenerateError> {
        let env_var = Provider::for_model(model).api_key_env();
        let api_key = std::env::var(env_var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GenerateError::MissingApiKey {
                env_var,
                model: model.to_string(),
            })?;
        Ok(Self::new(http, model, api_key))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, system: &str, user: &str, json_mode: bool) -> reqwest::RequestBuilder {
        match self.provider {
            Provider::Anthropic => self
                .http
                .post("https://api.anthropic.com/v1/messages")
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .json(&serde_json::json!({
                    "model": self.model,
                    "max_tokens": 4096,
                    "temperature": self.temperature,
                    "system": system,
                    "messages": [{"role": "user", "content": user}]
                })),
            Provider::Gemini => {
                let mut generation_config = serde_json::json!({"temperature": self.temperature});
                if json_mode {
                    generation_config["responseMimeType"] = serde_json::json!("application/json");
                }
                self.http
                    .post(format!(
                        "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
                        self.model
                    ))
                    .header("x-goog-api-key", &self.api_key)
                    .json(&serde_json::json!({
                        "systemInstruction": {"parts": [{"text": system}]},
                        "contents": [{"role": "user", "parts": [{"text": user}]}],
                        "generationConfig": generation_config
                    }))
            }
            Provider::OpenAi => {
                let mut body = serde_json::json!({
                    "model": self.model,
                    "temperature": self.temperature,
                    "messages": [
                        {"role": "system", "content": system},
                        {"role": "user", "content": user}
                    ]
                });
                if json_mode {
                    body["response_format"] = serde_json::json!({"type": "json_object"});
                }
                self.http
                    .post("https://api.openai.com/v1/chat/completions")
                    .bearer_auth(&self.api_key)
                    .json(&body)
            }
        }
    }

    // Anthropic has no JSON switch; the prompt alone asks for JSON there
    async fn send(&self, system: &str, user: &str, json_mode: bool) -> Result<String, GenerateError> {
        let provider = self.provider.name();
        debug!("Generating via {provider} API with model {}", self.model);

        let resp = self
            .request(system, user, json_mode)
            .send()
            .await
            .map_err(|source| GenerateError::Request { provider, source })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerateError::Status { provider, status, body });
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|source| GenerateError::Request { provider, source })?;

        let text = match self.provider {
            Provider::Anthropic => extract_anthropic_text(&json),
            Provider::Gemini => extract_gemini_text(&json),
            Provider::OpenAi => extract_openai_text(&json),
        };
        text.ok_or(GenerateError::UnexpectedResponse { provider })
    }
}

#[async_trait]
impl Generator for LlmClient {
    async fn generate(&self, system: &str, user: &str, cancel: &CancellationToken) -> Result<String, GenerateError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GenerateError::Cancelled),
            out = self.send(system, user, false) => out,
        }
    }

    async fn generate_json(
        &self,
        system: &str,
        user: &str,
        cancel: &CancellationToken,
    ) -> Result<String, GenerateError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GenerateError::Cancelled),
            out = self.send(system, user, true) => out,
        }
    }
}

fn extract_anthropic_text(json: &serde_json::Value) -> Option<String> {
    let text: String = json
        .get("content")?
        .as_array()?
        .iter()
        .filter_map(|block| {
            if block.get("type")?.as_str()? == "text" {
                block.get("text")?.as_str()
            } else {
                None
            }
        })
        .collect();
    if text.is_empty() { None } else { Some(text) }
}

fn extract_gemini_text(json: &serde_json::Value) -> Option<String> {
    let text: String = json
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?
        .iter()
        .filter_map(|part| part.get("text")?.as_str())
        .collect();
    if text.is_empty() { None } else { Some(text) }
}

fn extract_openai_text(json: &serde_json::Value) -> Option<String> {
    json.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}
