//! Minimal Ollama chat client with JSON-only answers.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::AiError;
use crate::config::AiConfig;

const CONTEXT_LIMIT: usize = 8000;
const JSON_ONLY: &str = "Respond ONLY with valid JSON (no backticks, no comments).";
const JSON_REINFORCE: &str =
    "ATTENTION: respond ONLY with plain JSON (an object or an array), without ``` or explanations.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Deserialize, Default)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
}

impl OllamaClient {
    pub fn new(cfg: &AiConfig) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(AiError::Http)?;
        Ok(Self {
            http,
            base_url: cfg.host.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            max_retries: cfg.max_retries,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// `POST /api/chat`, non-streaming; returns the trimmed assistant content
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, AiError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(AiError::Http)?;
        let status = response.status();
        if !status.is_success() {
            return Err(AiError::Status(status.as_u16()));
        }
        let data: ChatResponse = response.json().await.map_err(AiError::Http)?;
        Ok(data
            .message
            .map(|m| m.content.trim().to_string())
            .unwrap_or_default())
    }

    /// Ask for a JSON answer; always yields an object.
    ///
    /// Unparseable answers are retried with a reinforced instruction; after
    /// the last attempt the raw text comes back flagged with `parse_error`.
    pub async fn ask_json(&self, prompt: &str, context: &str, system: Option<&str>) -> Map<String, Value> {
        let mut user_prompt = prompt.to_string();
        if !context.is_empty() {
            let ctx: String = context.chars().take(CONTEXT_LIMIT).collect();
            user_prompt.push_str(&format!("\n\nContext (JSON/Text):\n{ctx}"));
        }
        user_prompt.push_str("\n\n");
        user_prompt.push_str(JSON_ONLY);

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system.filter(|s| !s.is_empty()) {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(user_prompt));

        let mut last_text = String::new();
        for attempt in 0..=self.max_retries {
            match self.chat(&messages).await {
                Ok(text) => {
                    if let Some(value) = extract_json(&text) {
                        return coerce_to_object(value);
                    }
                    tracing::debug!(attempt, model = %self.model, "model answer is not JSON");
                    last_text = text;
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "ollama chat failed");
                    last_text = format!("LLM error: {e}");
                }
            }
            if attempt < self.max_retries {
                if let Some(last) = messages.last_mut() {
                    last.content.push_str("\n\n");
                    last.content.push_str(JSON_REINFORCE);
                }
            }
        }

        match json!({
            "text": last_text,
            "parse_error": true,
            "message": "The model answer could not be parsed as valid JSON.",
        }) {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

fn strip_code_fences(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = rest;
        if s.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) {
            s = &s[4..];
        }
    }
    if let Some(rest) = s.trim_end().strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

fn between<'a>(s: &'a str, open: char, close: char) -> Option<&'a str> {
    let start = s.find(open)?;
    let end = s.rfind(close)?;
    (end > start).then(|| &s[start..=end])
}

/// First JSON value found in a model answer.
///
/// Tries the fence-stripped text as a whole, then the widest `{...}` span,
/// then the widest `[...]` span.
pub fn extract_json(text: &str) -> Option<Value> {
    let s = strip_code_fences(text);
    if s.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(s) {
        return Some(value);
    }
    [('{', '}'), ('[', ']')]
        .into_iter()
        .filter_map(|(open, close)| between(s, open, close))
        .find_map(|candidate| serde_json::from_str(candidate).ok())
}

/// Objects pass through, arrays become `{data}`, strings `{text}`
pub fn coerce_to_object(value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    match value {
        Value::Object(obj) => return obj,
        Value::Array(_) => {
            map.insert("data".into(), value);
        }
        Value::String(s) => {
            map.insert("text".into(), Value::String(s));
        }
        Value::Null => {
            map.insert("text".into(), Value::String(String::new()));
        }
        other => {
            map.insert("data".into(), other);
        }
    }
    map
}
