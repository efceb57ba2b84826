use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::OracleError;
use crate::model::{LlmParams, Message, OracleResponse};

use super::traits::ReasoningOracle;

#[derive(Default)]
struct Script {
    queue: VecDeque<String>,
    last: Option<String>,
    failures: HashMap<usize, OracleError>,
    calls: Vec<Vec<Message>>,
}

/// Replays canned responses in order, repeating the last one when the queue runs dry.
///
/// Calls are numbered from 1; `fail_on` makes a given call return an error
/// instead of consuming a response. Every prompt is recorded.
pub struct ScriptedOracle {
    name: String,
    script: Mutex<Script>,
}

impl ScriptedOracle {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: "scripted".to_string(),
            script: Mutex::new(Script {
                queue: responses.into_iter().map(Into::into).collect(),
                ..Script::default()
            }),
        }
    }

    /// Single response served on every call.
    pub fn echo(response: impl Into<String>) -> Self {
        Self::new([response.into()])
    }

    pub fn fail_on(self, call: usize, err: OracleError) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.failures.insert(call, err);
        }
        self
    }

    pub fn push(&self, response: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.queue.push_back(response.into());
        }
    }

    pub fn call_count(&self) -> usize {
        self.script.lock().map(|s| s.calls.len()).unwrap_or(0)
    }

    /// Messages received so far, one entry per call.
    pub fn prompts(&self) -> Vec<Vec<Message>> {
        self.script
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    /// Concatenated user turns of every call, for substring assertions.
    pub fn user_prompts(&self) -> Vec<String> {
        self.prompts()
            .into_iter()
            .map(|msgs| {
                msgs.into_iter()
                    .filter(|m| m.role == "user")
                    .map(|m| m.content)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect()
    }
}

#[async_trait]
impl ReasoningOracle for ScriptedOracle {
    fn name(&self) -> &str {
        &self.name
    }

    async fn infer(
        &self,
        messages: Vec<Message>,
        params: LlmParams,
    ) -> Result<OracleResponse, OracleError> {
        let mut script = self
            .script
            .lock()
            .map_err(|_| OracleError::Scripted("script lock poisoned".to_string()))?;
        script.calls.push(messages);
        let call = script.calls.len();

        if let Some(err) = script.failures.remove(&call) {
            return Err(err);
        }

        let content = match script.queue.pop_front() {
            Some(next) => {
                script.last = Some(next.clone());
                next
            }
            None => script
                .last
                .clone()
                .ok_or_else(|| OracleError::Scripted("no scripted response".to_string()))?,
        };

        let completion_tokens = content.split_whitespace().count() as u32;
        Ok(OracleResponse {
            content,
            model: params.model,
            usage: crate::model::TokenUsage {
                prompt_tokens: 0,
                completion_tokens,
                total_tokens: completion_tokens,
            },
        })
    }
}
