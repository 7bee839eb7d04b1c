use crate::types::{GenerationConfig, MinerError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Text generation capability with a strict-JSON output contract
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn adapter_name(&self) -> String;

    /// Send a prompt and return the raw JSON text of the reply
    async fn complete_json(&self, prompt: &str) -> Result<String>;
}

/// Image generation capability
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    fn adapter_name(&self) -> String;

    /// Generate one image and return its (usually short-lived) URL
    async fn generate_image(&self, prompt: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    url: Option<String>,
}

/// OpenAI-compatible HTTP adapter for chat completions and image generation
pub struct OpenAiAdapter {
    client: Client,
    api_key: String,
    config: GenerationConfig,
}

impl OpenAiAdapter {
    pub fn new(api_key: String, config: GenerationConfig) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(MinerError::Config("OpenAI API key is required".to_string()));
        }
        Ok(Self {
            client: Client::builder().build()?,
            api_key,
            config,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base_url.trim_end_matches('/'), path)
    }
}

impl fmt::Debug for OpenAiAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiAdapter")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.config.api_base_url)
            .field("text_model", &self.config.text_model)
            .field("image_model", &self.config.image_model)
            .finish()
    }
}

#[async_trait]
impl TextGenerator for OpenAiAdapter {
    fn adapter_name(&self) -> String {
        format!("OpenAI ({})", self.config.text_model)
    }

    async fn complete_json(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.text_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MinerError::Generation(format!("completion API returned HTTP {}: {}", status, body)));
        }

        let completion: ChatResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| MinerError::Generation("completion API returned no message content".to_string()))
    }
}

#[async_trait]
impl ImageGenerator for OpenAiAdapter {
    fn adapter_name(&self) -> String {
        format!("OpenAI ({})", self.config.image_model)
    }

    async fn generate_image(&self, prompt: &str) -> Result<String> {
        let request = ImageRequest {
            model: &self.config.image_model,
            prompt,
            n: 1,
            size: &self.config.image_size,
        };

        let response = self
            .client
            .post(self.endpoint("images/generations"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MinerError::Illustration(format!("image API returned HTTP {}: {}", status, body)));
        }

        let generated: ImageResponse = response.json().await?;
        let url = generated
            .data
            .into_iter()
            .next()
            .and_then(|d| d.url)
            .ok_or_else(|| MinerError::Illustration("image API returned no URL".to_string()))?;

        info!("Image generated");
        Ok(url)
    }
}

/// Scripted adapter for development and testing
#[derive(Clone)]
pub struct MockLlmAdapter {
    name: String,
    completion: Option<String>,
    image_url: Option<String>,
    text_calls: Arc<AtomicUsize>,
    image_calls: Arc<AtomicUsize>,
    last_prompt: Arc<std::sync::Mutex<Option<String>>>,
}

impl MockLlmAdapter {
    pub fn new(name: String) -> Self {
        Self {
            name,
            completion: None,
            image_url: None,
            text_calls: Arc::new(AtomicUsize::new(0)),
            image_calls: Arc::new(AtomicUsize::new(0)),
            last_prompt: Arc::new(std::sync::Mutex::new(None)),
        }
    }

    /// Raw text returned by `complete_json`. Unset means the call fails.
    pub fn with_completion(mut self, completion: impl Into<String>) -> Self {
        self.completion = Some(completion.into());
        self
    }

    /// URL returned by `generate_image`. Unset means the call fails.
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }
}

#[async_trait]
impl TextGenerator for MockLlmAdapter {
    fn adapter_name(&self) -> String {
        format!("Mock LLM Adapter ({})", self.name)
    }

    async fn complete_json(&self, prompt: &str) -> Result<String> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }
        debug!("Mock completion requested ({} prompt bytes)", prompt.len());

        self.completion
            .clone()
            .ok_or_else(|| MinerError::Generation("mock completion unavailable".to_string()))
    }
}

#[async_trait]
impl ImageGenerator for MockLlmAdapter {
    fn adapter_name(&self) -> String {
        format!("Mock LLM Adapter ({})", self.name)
    }

    async fn generate_image(&self, _prompt: &str) -> Result<String> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.image_url
            .clone()
            .ok_or_else(|| MinerError::Illustration("mock image generation unavailable".to_string()))
    }
}
