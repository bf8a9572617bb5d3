//! Scripted provider that replays queued completions.
//!
//! Used for offline runs and for exercising the generate-then-grade pipeline
//! deterministically. Every request is recorded so callers can inspect the
//! prompts that were sent.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use ragcheck_core::{AppError, AppResult};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A queued reply: either a completion or a provider failure.
#[derive(Debug, Clone)]
enum Reply {
    Completion(String),
    Failure(String),
}

/// LLM client that answers from a fixed script.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedClient {
    /// Create a client that replays the given completions in order.
    pub fn new<I, S>(completions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(
                completions
                    .into_iter()
                    .map(|c| Reply::Completion(c.into()))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue another completion.
    pub fn push_completion(&self, completion: impl Into<String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Reply::Completion(completion.into()));
        }
    }

    /// Queue a provider failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Reply::Failure(message.into()));
        }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Number of replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let reply = self
            .replies
            .lock()
            .map_err(|_| AppError::GenerationFailed("scripted client poisoned".to_string()))?
            .pop_front();

        match reply {
            Some(Reply::Completion(content)) => Ok(LlmResponse {
                content,
                model: request.model.clone(),
                usage: LlmUsage::default(),
                done: true,
            }),
            Some(Reply::Failure(message)) => Err(AppError::GenerationFailed(message)),
            None => Err(AppError::GenerationFailed(
                "scripted client has no completions left".to_string(),
            )),
        }
    }
}
