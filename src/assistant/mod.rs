//! HR assistant chat backed by a hosted text-generation API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use derive_more::{Display, Error};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult, FieldError};

pub mod gemini;

pub const MAX_MESSAGE_CHARS: usize = 4000;
const CACHE_CAPACITY: u64 = 1_000;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an HR assistant for an HR admin portal. \
Keep answers professional and concise. Only help with employee management, \
project and task management, salary and payroll, company policies and HR practice. \
Politely steer other topics back to HR matters and never disclose sensitive information.";

#[derive(Debug, Display, Error)]
pub enum GenerationError {
    #[display(fmt = "request failed: {}", _0)]
    Transport(#[error(not(source))] String),

    #[display(fmt = "upstream returned status {}", _0)]
    Status(#[error(not(source))] u16),

    #[display(fmt = "unexpected response: {}", _0)]
    Malformed(#[error(not(source))] String),

    #[display(fmt = "request timed out")]
    Timeout,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system_prompt: &str, message: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    #[schema(example = "How do I record a bonus for June?")]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChatReply {
    pub reply: String,
}

pub fn parse_chat(body: &Value) -> AppResult<String> {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();

    let count = message.chars().count();
    if count == 0 || count > MAX_MESSAGE_CHARS {
        return Err(AppError::Validation(vec![FieldError::new(
            "message",
            format!("must be between 1 and {MAX_MESSAGE_CHARS} characters"),
        )]));
    }
    Ok(message.to_string())
}

/// Lowercased with whitespace runs collapsed.
fn cache_key(message: &str) -> String {
    message
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Clone)]
pub struct AssistantService {
    generator: Option<Arc<dyn TextGenerator>>,
    system_prompt: Arc<str>,
    replies: Cache<String, String>,
}

impl AssistantService {
    pub fn new(
        generator: Option<Arc<dyn TextGenerator>>,
        system_prompt: impl Into<Arc<str>>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            generator,
            system_prompt: system_prompt.into(),
            replies: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(cache_ttl)
                .build(),
        }
    }

    pub async fn chat(&self, message: &str) -> AppResult<ChatReply> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| AppError::Unavailable("Assistant is not configured".into()))?;

        let key = cache_key(message);
        if let Some(reply) = self.replies.get(&key).await {
            info!(chars = message.len(), "Assistant reply served from cache");
            return Ok(ChatReply { reply });
        }

        let reply = generator
            .generate(&self.system_prompt, message)
            .await
            .map_err(|e| {
                error!(error = %e, "Assistant generation failed");
                AppError::Upstream(e.to_string())
            })?;

        self.replies.insert(key, reply.clone()).await;
        Ok(ChatReply { reply })
    }
}
