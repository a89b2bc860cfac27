//! Environment configuration

use crate::llm::Convention;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_ITERATIONS: u32 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4096;

/// Service configuration, read once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API
    pub gateway: Option<String>,
    pub model: String,
    pub port: u16,
    pub max_iterations: u32,
    pub request_timeout: Duration,
    pub convention: Convention,
    pub max_output_tokens: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            gateway: None,
            model: DEFAULT_MODEL.to_string(),
            port: DEFAULT_PORT,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            convention: Convention::Responses,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let convention = match get("SLIDEPILOT_CONVENTION").as_deref().map(str::trim) {
            None | Some("responses") => Convention::Responses,
            Some("chat" | "chat_completions") => Convention::ChatCompletions,
            Some(other) => {
                tracing::warn!(value = %other, "Unknown SLIDEPILOT_CONVENTION, using responses");
                Convention::Responses
            }
        };

        Self {
            api_key: get("OPENAI_API_KEY"),
            gateway: get("LLM_GATEWAY"),
            model: get("SLIDEPILOT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            port: parse_or("SLIDEPILOT_PORT", get("SLIDEPILOT_PORT"), DEFAULT_PORT),
            max_iterations: parse_or(
                "SLIDEPILOT_MAX_ITERATIONS",
                get("SLIDEPILOT_MAX_ITERATIONS"),
                DEFAULT_MAX_ITERATIONS,
            )
            .max(1),
            request_timeout: Duration::from_secs(parse_or(
                "SLIDEPILOT_REQUEST_TIMEOUT_SECS",
                get("SLIDEPILOT_REQUEST_TIMEOUT_SECS"),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            convention,
            max_output_tokens: parse_or(
                "SLIDEPILOT_MAX_OUTPUT_TOKENS",
                get("SLIDEPILOT_MAX_OUTPUT_TOKENS"),
                DEFAULT_MAX_OUTPUT_TOKENS,
            ),
        }
    }
}

fn parse_or<T: FromStr + Copy>(key: &str, value: Option<String>, default: T) -> T {
    match value {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Unparseable value, using default");
            default
        }),
    }
}
