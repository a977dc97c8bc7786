//! Configuration for the audits module

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Audits module configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Timeout of the static page download
    #[serde(default = "default_fetch_timeout", with = "humantime_serde")]
    pub fetch_timeout: Duration,

    /// User-Agent sent to audited sites
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Rendering service; RENDERED passes degrade to RAW without it
    #[serde(default)]
    pub renderer: RendererConfig,

    /// Language-model reviewer
    #[serde(default)]
    pub ai: AiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch_timeout: default_fetch_timeout(),
            user_agent: default_user_agent(),
            renderer: RendererConfig::default(),
            ai: AiConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RendererConfig {
    /// `POST` endpoint of the rendering service
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_render_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: default_render_timeout(),
        }
    }
}

/// Ollama connection and sampling settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_ai_host")]
    pub host: String,

    #[serde(default = "default_ai_model")]
    pub model: String,

    #[serde(default = "default_ai_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Extra attempts with a reinforced "JSON only" instruction
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Sent as `num_predict`
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Characters of page HTML handed to the reviewer
    #[serde(default = "default_html_snippet")]
    pub html_snippet_chars: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_ai_host(),
            model: default_ai_model(),
            timeout: default_ai_timeout(),
            max_retries: default_max_retries(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            html_snippet_chars: default_html_snippet(),
        }
    }
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_render_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_user_agent() -> String {
    crate::engine::DEFAULT_USER_AGENT.to_string()
}

fn default_true() -> bool {
    true
}

fn default_ai_host() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_ai_model() -> String {
    "llama3.1:latest".to_string()
}

fn default_ai_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_max_retries() -> u32 {
    2
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    800
}

fn default_html_snippet() -> usize {
    2000
}
