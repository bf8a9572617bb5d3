//! Chain-of-thought predictor.
//!
//! Renders a task, sends it to the injected LLM client and parses the
//! completion. The rationale field is requested before the other outputs.

use crate::builder::build_prompt;
use crate::parser::parse_completion;
use crate::types::{TaskOutputs, TaskSpec};
use ragcheck_core::AppResult;
use ragcheck_llm::{LlmClient, LlmRequest};
use std::collections::HashMap;
use std::sync::Arc;

/// Reasoning-augmented call against one task specification.
#[derive(Clone)]
pub struct ChainOfThought {
    client: Arc<dyn LlmClient>,
    model: String,
    task: TaskSpec,
    temperature: Option<f32>,
}

impl ChainOfThought {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, task: TaskSpec) -> Self {
        Self {
            client,
            model: model.into(),
            task,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn task(&self) -> &TaskSpec {
        &self.task
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run the task once with the given inputs.
    ///
    /// A missing input is `InvalidArgument`; provider failures and
    /// completions lacking an output field are `GenerationFailed`.
    pub async fn call(&self, inputs: &HashMap<String, String>) -> AppResult<TaskOutputs> {
        let prompt = build_prompt(&self.task, inputs)?;

        let mut request = LlmRequest::new(prompt.user, &self.model).with_system(prompt.system);
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }

        let response = self.client.complete(&request).await?;
        tracing::debug!(
            task = %self.task.id,
            provider = self.client.provider_name(),
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "Completion received"
        );

        parse_completion(&self.task, &response.content)
    }
}
