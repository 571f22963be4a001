//! Guardian chat.
//!
//! One chat exchange runs strictly in order: health-intent gate, moderation, completion. The
//! gate is local and free, so off-topic questions never reach the paid service.

mod openai;

pub use openai::OpenAiClient;

use crate::constants::{GUARDIAN_SYSTEM_PROMPT, MODERATION_INPUT_LIMIT, OFF_TOPIC_REPLY};
use crate::error::{AssistantError, AssistantResult};
use crate::intent;
use api_shared::{ChatMessage, ChatRole};
use std::sync::Arc;

pub const NOT_CONFIGURED_MESSAGE: &str =
    "OpenAI client not configured. Set OPENAI_API_KEY in environment.";
pub const MESSAGES_REQUIRED_MESSAGE: &str = "messages array required";

/// The conversational-AI capabilities Guardian needs.
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns `true` if the service flags `input`.
    async fn moderate(&self, input: &str) -> AssistantResult<bool>;

    /// Completes the conversation, `None` when the service produced no content.
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> AssistantResult<Option<String>>;
}

/// Text of the user turns only, joined by newlines and trimmed.
pub fn user_text(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .filter(|m| m.role == ChatRole::User)
        .map(ChatMessage::text)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// `role: text` lines for the whole conversation, cut to the moderation input limit.
pub fn moderation_input(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.text()))
        .collect::<Vec<_>>()
        .join("\n")
        .chars()
        .take(MODERATION_INPUT_LIMIT)
        .collect()
}

/// Chat front door shared by all requests.
#[derive(Clone)]
pub struct GuardianChat {
    model: Option<Arc<dyn LanguageModel>>,
}

impl GuardianChat {
    /// `None` means no AI service is configured; every exchange then fails with
    /// [`AssistantError::Configuration`].
    pub fn new(model: Option<Arc<dyn LanguageModel>>) -> Self {
        Self { model }
    }

    pub fn is_configured(&self) -> bool {
        self.model.is_some()
    }

    /// Produces the assistant's reply to `messages`.
    ///
    /// A conversation that is not about health gets a fixed one-line refusal as a normal
    /// reply, without any call to the service. Moderation is best-effort: if the moderation
    /// call itself fails the exchange continues.
    ///
    /// # Errors
    ///
    /// - [`AssistantError::Configuration`] when no service is configured
    /// - [`AssistantError::InvalidRequest`] for an empty conversation
    /// - [`AssistantError::ModerationFlagged`] when moderation flags the conversation
    /// - [`AssistantError::EmptyReply`] when the completion has no content
    /// - [`AssistantError::Upstream`] when the completion call fails
    pub async fn reply(&self, messages: &[ChatMessage]) -> AssistantResult<String> {
        let Some(model) = &self.model else {
            tracing::error!("chat requested but no AI service is configured");
            return Err(AssistantError::Configuration(
                NOT_CONFIGURED_MESSAGE.into(),
            ));
        };

        if messages.is_empty() {
            return Err(AssistantError::InvalidRequest(
                MESSAGES_REQUIRED_MESSAGE.into(),
            ));
        }

        let verdict = intent::evaluate(&user_text(messages));
        if !verdict.is_health() {
            tracing::info!("intent check rejected chat message: {:?}", verdict);
            return Ok(OFF_TOPIC_REPLY.to_string());
        }

        match model.moderate(&moderation_input(messages)).await {
            Ok(true) => return Err(AssistantError::ModerationFlagged),
            Ok(false) => {}
            Err(e) => tracing::warn!("moderation call failed, continuing: {}", e),
        }

        match model.complete(GUARDIAN_SYSTEM_PROMPT, messages).await? {
            Some(reply) if !reply.is_empty() => Ok(reply),
            _ => {
                tracing::error!("AI service returned no reply");
                Err(AssistantError::EmptyReply)
            }
        }
    }
}
