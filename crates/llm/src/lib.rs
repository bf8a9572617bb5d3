//! LLM integration crate for ragcheck.
//!
//! Provider-agnostic access to language models. The rest of the workspace
//! only sees [`LlmClient`], which turns a prompt into text.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **OpenAI**: Any OpenAI-compatible chat completions endpoint
//! - **Scripted**: Replays queued completions, for offline runs and tests
//!
//! # Example
//! ```no_run
//! use ragcheck_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient, ScriptedClient};
pub use types::ProviderType;
