// src/services/llm_service.rs
use crate::config::LlmProvider;
use crate::errors::StitchyError;
use crate::services::gateway::*;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{Value, json};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";
const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

const OPENAI_TEXT_MODEL: &str = "gpt-4o";
const OPENAI_IMAGE_MODEL: &str = "dall-e-3";
const ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";

/// HTTP-backed [`AiGateway`]. Image generation always goes to OpenAI;
/// analysis and text go to the configured provider.
pub struct LlmService {
    openai_key: String,
    anthropic_key: Option<String>,
    text_provider: LlmProvider,
    client: Client,
}

impl LlmService {
    pub fn new(
        openai_key: String,
        anthropic_key: Option<String>,
        text_provider: LlmProvider,
    ) -> Self {
        Self {
            openai_key,
            anthropic_key,
            text_provider,
            client: Client::new(),
        }
    }

    async fn openai_chat(&self, content: Value) -> Result<String, StitchyError> {
        let response = self
            .client
            .post(OPENAI_CHAT_URL)
            .header("Authorization", format!("Bearer {}", self.openai_key))
            .json(&json!({
                "model": OPENAI_TEXT_MODEL,
                "messages": [{
                    "role": "user",
                    "content": content
                }],
                "max_tokens": 4096
            }))
            .send()
            .await
            .map_err(|e| StitchyError::Llm(format!("OpenAI request failed: {}", e)))?;

        let result = read_json(response, "OpenAI").await?;

        result["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| StitchyError::Llm("No content in OpenAI response".to_string()))
    }

    async fn anthropic_messages(&self, content: Value) -> Result<String, StitchyError> {
        let api_key = self
            .anthropic_key
            .as_ref()
            .ok_or_else(|| StitchyError::Llm("Anthropic API key not configured".to_string()))?;

        let response = self
            .client
            .post(ANTHROPIC_MESSAGES_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": ANTHROPIC_MODEL,
                "max_tokens": 4096,
                "messages": [{
                    "role": "user",
                    "content": content
                }]
            }))
            .send()
            .await
            .map_err(|e| StitchyError::Llm(format!("Anthropic request failed: {}", e)))?;

        let result = read_json(response, "Anthropic").await?;

        result["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| StitchyError::Llm("No content in Anthropic response".to_string()))
    }
}

async fn read_json(response: reqwest::Response, vendor: &str) -> Result<Value, StitchyError> {
    if !response.status().is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(StitchyError::Llm(format!("{} error: {}", vendor, error_text)));
    }

    response
        .json()
        .await
        .map_err(|e| StitchyError::Llm(format!("Failed to parse {} response: {}", vendor, e)))
}

/// Anthropic takes inline images as base64 sources and remote ones as url sources.
fn anthropic_image_source(image_url: &str) -> Value {
    if let Some(rest) = image_url.strip_prefix("data:") {
        if let Some((media_type, data)) = rest.split_once(";base64,") {
            return json!({
                "type": "base64",
                "media_type": media_type,
                "data": data
            });
        }
    }
    json!({ "type": "url", "url": image_url })
}

/// Collects image references from an OpenAI images response.
fn image_references(result: &Value) -> Vec<String> {
    result["data"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    entry["url"]
                        .as_str()
                        .map(str::to_string)
                        .or_else(|| {
                            entry["b64_json"]
                                .as_str()
                                .map(|b64| format!("data:image/png;base64,{}", b64))
                        })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl AiGateway for LlmService {
    async fn analyze_image(&self, request: AnalyzeImageRequest) -> Result<String, StitchyError> {
        debug!("Analyzing image with {:?}", self.text_provider);
        match self.text_provider {
            LlmProvider::OpenAi => {
                self.openai_chat(json!([
                    { "type": "text", "text": request.prompt },
                    { "type": "image_url", "image_url": { "url": request.image_url } }
                ]))
                .await
            }
            LlmProvider::Anthropic => {
                self.anthropic_messages(json!([
                    { "type": "image", "source": anthropic_image_source(&request.image_url) },
                    { "type": "text", "text": request.prompt }
                ]))
                .await
            }
        }
    }

    async fn generate_image(
        &self,
        request: GenerateImageRequest,
    ) -> Result<GeneratedImages, StitchyError> {
        let response = self
            .client
            .post(OPENAI_IMAGES_URL)
            .header("Authorization", format!("Bearer {}", self.openai_key))
            .json(&json!({
                "model": OPENAI_IMAGE_MODEL,
                "prompt": request.prompt,
                "n": 1,
                "size": format!("{}x{}", request.width, request.height),
                "quality": "hd"
            }))
            .send()
            .await
            .map_err(|e| StitchyError::Llm(format!("Image generation request failed: {}", e)))?;

        let result = read_json(response, "Image generation").await?;

        Ok(GeneratedImages {
            images: image_references(&result),
        })
    }

    async fn generate_text(&self, request: GenerateTextRequest) -> Result<String, StitchyError> {
        match self.text_provider {
            LlmProvider::OpenAi => self.openai_chat(json!(request.prompt)).await,
            LlmProvider::Anthropic => self.anthropic_messages(json!(request.prompt)).await,
        }
    }
}
