use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use taskweave_core::api::{
    LlmConfig, LlmParams, Message, OracleError, OracleResponse, ReasoningOracle, TokenUsage,
};

const BODY_PREVIEW_LIMIT: usize = 512;

fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    let mut out: String = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect();
    if trimmed.chars().count() > BODY_PREVIEW_LIMIT {
        out.push_str("...");
    }
    out
}

fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> OracleError {
    if err.is_timeout() {
        OracleError::Timeout(std::time::Duration::from_millis(timeout_ms))
    } else {
        OracleError::Transport(err.to_string())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

/// Chat-completions client for OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct OpenAiChatOracle {
    http: reqwest::Client,
    api_key: String,
    timeout_ms: u64,
    // Pre-built to avoid a format! per call
    url_chat: String,
}

impl OpenAiChatOracle {
    pub fn new(base_url: &str, api_key: String, timeout_ms: u64) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()?;
        let normalized = base_url.trim_end_matches('/');
        Ok(Self {
            http,
            api_key,
            timeout_ms,
            url_chat: format!("{}/chat/completions", normalized),
        })
    }

    pub fn from_config(cfg: &LlmConfig) -> anyhow::Result<Self> {
        Self::new(&cfg.base_url, cfg.api_key.clone(), cfg.timeout_ms)
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.trim().is_empty() {
            req
        } else {
            req.bearer_auth(&self.api_key)
        }
    }
}

#[async_trait]
impl ReasoningOracle for OpenAiChatOracle {
    fn name(&self) -> &str {
        "openai"
    }

    async fn infer(
        &self,
        messages: Vec<Message>,
        params: LlmParams,
    ) -> Result<OracleResponse, OracleError> {
        let url = &self.url_chat;
        tracing::debug!(
            target: "taskweave.oracle",
            stage = "oracle.chat.in",
            url = %url,
            model = %params.model,
            messages = messages.len()
        );

        let body = ChatRequest {
            model: &params.model,
            messages: &messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };
        let resp = self
            .auth(self.http.post(url).json(&body))
            .send()
            .await
            .map_err(|err| from_reqwest(err, self.timeout_ms))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|err| from_reqwest(err, self.timeout_ms))?;
        if !status.is_success() {
            return Err(OracleError::Status {
                status: status.as_u16(),
                body: preview_body(&text),
            });
        }

        let decoded: ChatResponse = serde_json::from_str(&text).map_err(|err| {
            OracleError::Decode(format!("{err} | body={}", preview_body(&text)))
        })?;
        if let Some(api_err) = decoded.error {
            return Err(OracleError::Api(api_err.message));
        }
        let content = decoded
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OracleError::Decode("response has no choices".to_string()))?;

        let usage = decoded
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        tracing::debug!(
            target: "taskweave.oracle",
            stage = "oracle.chat.out",
            status = %status,
            total_tokens = usage.total_tokens
        );
        Ok(OracleResponse {
            content,
            model: if decoded.model.is_empty() {
                params.model
            } else {
                decoded.model
            },
            usage,
        })
    }
}
