//! Generation backend for the filing-QA pipeline.
//!
//! Speaks the OpenAI-compatible chat-completions protocol over blocking
//! HTTP, so any local inference server exposing that endpoint works. A fixed
//! fake is available via `APP_USE_FAKE_GENERATOR=1` for offline runs.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use filingrag_core::traits::Generator;

pub const DEFAULT_TEMPERATURE: f32 = 0.3;

pub struct ChatCompletionsGenerator {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
}

impl ChatCompletionsGenerator {
    pub fn new(
        endpoint: String,
        model: String,
        api_key: Option<String>,
        temperature: f32,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("failed to build generator HTTP client")?;
        Ok(Self { client, endpoint, model, api_key, temperature })
    }
}

impl Generator for ChatCompletionsGenerator {
    fn generate(&self, prompt: &str, max_tokens: usize) -> Result<String> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.api_key {
            let auth = format!("Bearer {}", key.trim());
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth).context("invalid generator API key")?,
            );
        }
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens,
            messages: vec![ChatMessage { role: "user", content: prompt }],
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .json(&body)
            .send()
            .with_context(|| format!("failed to call generator at {}", self.endpoint))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("generator returned {}: {}", status, text);
        }
        let parsed: ChatResponse = resp.json().context("failed to parse generator response")?;
        let answer = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();
        Ok(answer.trim().to_string())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

/// Offline stand-in that echoes a fixed acknowledgement. Useful for smoke
/// runs where no inference server is up.
pub struct FakeGenerator;

impl Generator for FakeGenerator {
    fn generate(&self, _prompt: &str, _max_tokens: usize) -> Result<String> {
        Ok("[offline generator] See the cited passages for the answer.".to_string())
    }
}

/// Builds the configured generator, honoring `APP_USE_FAKE_GENERATOR`.
pub fn get_default_generator(
    endpoint: String,
    model: String,
    api_key: Option<String>,
) -> Result<Box<dyn Generator>> {
    let use_fake = std::env::var("APP_USE_FAKE_GENERATOR")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake {
        tracing::info!("using FakeGenerator");
        return Ok(Box::new(FakeGenerator));
    }
    Ok(Box::new(ChatCompletionsGenerator::new(
        endpoint,
        model,
        api_key,
        DEFAULT_TEMPERATURE,
    )?))
}
