//! `OpenAI` and `OpenAI`-compatible provider implementation
//!
//! Speaks both upstream calling conventions and normalizes each into
//! [`LlmResponse`]: the multi-item `v1/responses` endpoint and the single
//! assistant message `v1/chat/completions` endpoint.

use super::types::{ContentBlock, Convention, LlmMessage, LlmRequest, LlmResponse, Usage};
use super::{CredentialStore, LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible service implementation
pub struct OpenAIService {
    client: Client,
    credentials: CredentialStore,
    model: String,
    base_url: String,
}

impl OpenAIService {
    pub fn new(
        credentials: CredentialStore,
        model: impl Into<String>,
        gateway: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let base_url = gateway
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            credentials,
            model: model.into(),
            base_url,
        })
    }

    fn endpoint(&self, convention: Convention) -> String {
        match convention {
            Convention::Responses => format!("{}/responses", self.base_url),
            Convention::ChatCompletions => format!("{}/chat/completions", self.base_url),
        }
    }

    /// Models that use `max_completion_tokens` instead of `max_tokens`
    fn uses_max_completion_tokens(&self) -> bool {
        let model = self.model.as_str();
        model.starts_with("o1")
            || model.starts_with("o3")
            || model.starts_with("o4")
            || model.starts_with("gpt-5")
    }

    async fn post_json<B: Serialize + Sync>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<String, LlmError> {
        let api_key = self
            .credentials
            .get()
            .ok_or_else(|| LlmError::auth("No API key configured"))?;

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::timed_out(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &body));
        }
        Ok(body)
    }

    /// Complete using the chat/completions API
    async fn complete_chat_api(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let chat_request = self.translate_request(request);
        let body = self
            .post_json(&self.endpoint(Convention::ChatCompletions), &chat_request)
            .await?;

        let chat_response: OpenAIResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        normalize_response(chat_response)
    }

    /// Complete using the v1/responses API
    async fn complete_responses_api(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let responses_request = self.translate_to_responses_request(request);
        let body = self
            .post_json(&self.endpoint(Convention::Responses), &responses_request)
            .await?;

        let responses_response: ResponsesApiResponse =
            serde_json::from_str(&body).map_err(|e| {
                LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
            })?;

        normalize_responses_api_response(responses_response)
    }

    fn translate_request(&self, request: &LlmRequest) -> OpenAIRequest {
        let mut messages = Vec::new();

        if let Some(system_text) = request.system_text() {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: Some(system_text),
                tool_calls: None,
            });
        }

        messages.extend(request.messages.iter().map(translate_message));

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|t| OpenAITool {
                        r#type: "function".to_string(),
                        function: OpenAIFunction {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.input_schema.clone(),
                        },
                    })
                    .collect(),
            )
        };

        let (max_tokens, max_completion_tokens) = if self.uses_max_completion_tokens() {
            (None, request.max_tokens)
        } else {
            (request.max_tokens, None)
        };

        OpenAIRequest {
            model: self.model.clone(),
            messages,
            tools,
            max_tokens,
            max_completion_tokens,
            stream: false,
        }
    }

    /// Translate `LlmRequest` to `ResponsesApiRequest`
    fn translate_to_responses_request(&self, request: &LlmRequest) -> ResponsesApiRequest {
        let input = request
            .messages
            .iter()
            .map(|msg| ResponsesApiInputItem::Message {
                role: msg.role.as_str().to_string(),
                content: msg.text.clone(),
            })
            .collect();

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|t| ResponsesApiTool {
                        r#type: "function".to_string(),
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.input_schema.clone(),
                    })
                    .collect(),
            )
        };

        ResponsesApiRequest {
            model: self.model.clone(),
            input,
            instructions: request.system_text(),
            tools,
            max_output_tokens: request.max_tokens,
        }
    }
}

#[async_trait]
impl LlmService for OpenAIService {
    async fn complete(
        &self,
        request: &LlmRequest,
        convention: Convention,
    ) -> Result<LlmResponse, LlmError> {
        match convention {
            Convention::Responses => self.complete_responses_api(request).await,
            Convention::ChatCompletions => self.complete_chat_api(request).await,
        }
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

fn translate_message(msg: &LlmMessage) -> OpenAIMessage {
    OpenAIMessage {
        role: msg.role.as_str().to_string(),
        content: Some(msg.text.clone()),
        tool_calls: None,
    }
}

/// Map a non-success HTTP status to an error class.
///
/// 404/405/501, and 400s whose payload says the endpoint or a parameter is
/// unsupported, are `Unsupported` so the caller may switch conventions.
pub(crate) fn classify_error(status: u16, body: &str) -> LlmError {
    let parsed = serde_json::from_str::<OpenAIErrorResponse>(body).ok();
    let message = parsed
        .as_ref()
        .map_or_else(|| body.to_string(), |e| e.error.message.clone());
    let code = parsed
        .as_ref()
        .and_then(|e| e.error.code.as_ref())
        .map(ToString::to_string)
        .unwrap_or_default();

    match status {
        404 | 405 | 501 => LlmError::unsupported(format!("HTTP {status}: {message}")),
        400 if mentions_unsupported(&message) || mentions_unsupported(&code) => {
            LlmError::unsupported(format!("Unsupported request: {message}"))
        }
        401 | 403 => LlmError::auth(format!("Authentication failed: {message}")),
        429 => LlmError::rate_limit(format!("Rate limit exceeded: {message}")),
        400 => LlmError::invalid_request(format!("Invalid request: {message}")),
        500..=599 => LlmError::server_error(format!("Server error: {message}")),
        _ => LlmError::unknown(format!("HTTP {status}: {message}")),
    }
}

fn mentions_unsupported(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    ["unsupported", "not supported", "unrecognized request url", "unknown endpoint"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Decode a pre-serialized tool argument string.
///
/// Malformed JSON is kept as a raw string so argument validation reports it
/// back to the model instead of silently running with no arguments.
pub(crate) fn decode_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(serde_json::Map::new());
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, arguments = %raw, "Failed to parse function call arguments");
        Value::String(raw.to_string())
    })
}

fn normalize_response(resp: OpenAIResponse) -> Result<LlmResponse, LlmError> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::unknown("No choices in response"))?;

    let mut content = Vec::new();

    if let Some(text) = choice.message.content {
        if !text.is_empty() {
            content.push(ContentBlock::Text { text });
        }
    }

    for (i, tc) in choice.message.tool_calls.unwrap_or_default().into_iter().enumerate() {
        if tc.function.name.is_empty() {
            continue;
        }
        let id = tc.id.unwrap_or_else(|| format!("call_{i}"));
        content.push(ContentBlock::ToolUse {
            id,
            name: tc.function.name,
            input: decode_arguments(&tc.function.arguments),
        });
    }

    let usage = resp.usage.map_or_else(Usage::default, |u| Usage {
        input_tokens: u64::from(u.prompt_tokens),
        output_tokens: u64::from(u.completion_tokens),
    });

    Ok(LlmResponse {
        content,
        output_text: None,
        usage,
    })
}

/// Normalize `ResponsesApiResponse` to `LlmResponse`, preserving item order
fn normalize_responses_api_response(resp: ResponsesApiResponse) -> Result<LlmResponse, LlmError> {
    if resp.status.as_deref() == Some("failed") {
        let message = resp
            .error
            .map_or_else(|| "Response failed".to_string(), |e| e.message);
        return Err(LlmError::server_error(message));
    }

    let mut content = Vec::new();

    for (i, output) in resp.output.into_iter().enumerate() {
        match output.r#type.as_str() {
            "message" => {
                for item in output.content.unwrap_or_default() {
                    if item.r#type == "output_text" {
                        if let Some(text) = item.text.filter(|t| !t.is_empty()) {
                            content.push(ContentBlock::Text { text });
                        }
                    }
                }
            }
            "function_call" => {
                if let Some(name) = output.name {
                    let id = output
                        .call_id
                        .or(output.id)
                        .unwrap_or_else(|| format!("call_{i}"));
                    let arguments = output.arguments.unwrap_or_default();
                    content.push(ContentBlock::ToolUse {
                        id,
                        name,
                        input: decode_arguments(&arguments),
                    });
                }
            }
            "reasoning" => {}
            other => {
                tracing::debug!(output_type = %other, "Ignoring unknown output type");
            }
        }
    }

    let usage = resp.usage.map_or_else(Usage::default, |u| Usage {
        input_tokens: u64::from(u.input_tokens),
        output_tokens: u64::from(u.output_tokens),
    });

    Ok(LlmResponse {
        content,
        output_text: resp.output_text.filter(|t| !t.is_empty()),
        usage,
    })
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Debug, Serialize)]
struct OpenAITool {
    r#type: String,
    function: OpenAIFunction,
}

#[derive(Debug, Serialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIToolCall {
    #[serde(default)]
    id: Option<String>,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
    #[serde(default)]
    code: Option<Value>,
}

// Responses API types

#[derive(Debug, Serialize)]
struct ResponsesApiRequest {
    model: String,
    input: Vec<ResponsesApiInputItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ResponsesApiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

/// Input item for the Responses API conversation
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ResponsesApiInputItem {
    #[serde(rename = "message")]
    Message { role: String, content: String },
}

#[derive(Debug, Serialize)]
struct ResponsesApiTool {
    r#type: String,
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ResponsesApiResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output: Vec<ResponsesApiOutput>,
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    error: Option<ResponsesApiError>,
    #[serde(default)]
    usage: Option<ResponsesApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ResponsesApiOutput {
    r#type: String,
    #[serde(default)]
    id: Option<String>,
    /// For message outputs
    #[serde(default)]
    content: Option<Vec<ResponsesApiContent>>,
    /// For `function_call` outputs
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
    #[serde(default)]
    call_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponsesApiContent {
    r#type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponsesApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResponsesApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}
