//! External classification model: the last, slowest fallback.

use crate::config::ModelConfig;
use crate::error::ModelError;
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

/// Confidence assumed when a free-text reply names a category but no number.
const DEFAULT_CONFIDENCE: f32 = 0.6;
/// Longest category taken from the first line of a free-text reply.
const FALLBACK_CATEGORY_CHARS: usize = 100;

/// What a model said about a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVerdict {
    pub category: String,
    /// Rescaled to `[0.0, 1.0]`.
    pub confidence: f32,
    pub reason: String,
}

/// A model that names a category for a page's text.
#[async_trait]
pub trait CategoryModel: Send + Sync {
    /// `known_categories` are offered as hints; the model may answer
    /// outside them.
    async fn categorize(
        &self,
        text: &str,
        known_categories: &[&str],
    ) -> Result<ModelVerdict, ModelError>;
}

/// Chat-completions client for an OpenAI-compatible endpoint.
pub struct OpenAiModel {
    client: Client,
    endpoint: String,
    model: String,
    prompt_chars: usize,
    max_tokens: u32,
}

impl OpenAiModel {
    /// Build a client using the API key from the configured environment
    /// variable.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ModelError> {
        let api_key = config.api_key().ok_or(ModelError::MissingCredentials)?;
        Self::with_api_key(config, &api_key)
    }

    pub fn with_api_key(config: &ModelConfig, api_key: &str) -> Result<Self, ModelError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| ModelError::MissingCredentials)?;
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            prompt_chars: config.prompt_chars,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl CategoryModel for OpenAiModel {
    async fn categorize(
        &self,
        text: &str,
        known_categories: &[&str],
    ) -> Result<ModelVerdict, ModelError> {
        let prompt = build_prompt(text, known_categories, self.prompt_chars);
        let body = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };

        let resp = self.client.post(&self.endpoint).json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ModelError::Status { status, body });
        }

        let parsed: ChatResponse = resp.json().await?;
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(ModelError::EmptyReply)?;

        debug!("model replied with {} chars", reply.len());
        parse_reply(&reply).ok_or(ModelError::Unparseable(reply))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
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
    content: Option<String>,
}

/// The instruction sent to the model, carrying at most `prompt_chars`
/// characters of page text.
pub fn build_prompt(text: &str, known_categories: &[&str], prompt_chars: usize) -> String {
    let excerpt: String = text.chars().take(prompt_chars).collect();
    let categories = known_categories
        .iter()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You are an assistant that classifies website pages into categories.\n\
         Predefined categories (if given): [{categories}]\n\
         If there is a clear category, return JSON: {{\"category\":\"...\", \"confidence\":0-100, \"reason\":\"short explanation\"}}\n\
         If multiple apply, return a comma-separated category string in \"category\".\n\
         Page text (first {prompt_chars} chars):\n\
         {excerpt}\n"
    )
}

/// Interpret a model reply.
///
/// The reply is read as a JSON object starting at its first `{`. Failing
/// that, `category: ...` and `confidence ... NN` patterns are looked for,
/// the first line standing in for a missing category. Confidence arrives as
/// 0-100 and is rescaled. `None` means the reply named no category.
pub fn parse_reply(reply: &str) -> Option<ModelVerdict> {
    match parse_json_reply(reply) {
        Some(verdict) => Some(verdict).filter(|v| !v.category.is_empty()),
        None => parse_loose_reply(reply),
    }
}

fn parse_json_reply(reply: &str) -> Option<ModelVerdict> {
    let start = reply.find('{')?;
    let mut stream = serde_json::Deserializer::from_str(&reply[start..]).into_iter::<Value>();
    let object = stream.next()?.ok()?;
    let object = object.as_object()?;

    let category = match object.get("category") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    };
    let confidence = match object.get("confidence") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0) as f32,
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    let reason = object
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(ModelVerdict {
        category,
        confidence: rescale(confidence),
        reason,
    })
}

fn loose_patterns() -> &'static (Option<Regex>, Option<Regex>) {
    static PATTERNS: OnceLock<(Option<Regex>, Option<Regex>)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        (
            Regex::new(r#"(?i)category["']?\s*[:\-]\s*["']?([A-Za-z0-9,/ \t]+)["']?"#).ok(),
            Regex::new(r"(?i)confidence.*?(\d{1,3})").ok(),
        )
    })
}

fn parse_loose_reply(reply: &str) -> Option<ModelVerdict> {
    let (category_re, confidence_re) = loose_patterns();

    let category = category_re
        .as_ref()
        .and_then(|re| re.captures(reply))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| {
            reply
                .lines()
                .next()
                .unwrap_or_default()
                .chars()
                .take(FALLBACK_CATEGORY_CHARS)
                .collect::<String>()
                .trim()
                .to_string()
        });
    if category.is_empty() {
        return None;
    }

    let confidence = confidence_re
        .as_ref()
        .and_then(|re| re.captures(reply))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f32>().ok())
        .map(rescale)
        .unwrap_or(DEFAULT_CONFIDENCE);

    Some(ModelVerdict {
        category,
        confidence,
        reason: reply.to_string(),
    })
}

fn rescale(percent: f32) -> f32 {
    if !percent.is_finite() {
        return 0.0;
    }
    (percent / 100.0).clamp(0.0, 1.0)
}
