//! OpenAI-compatible HTTP client.

use super::LanguageModel;
use crate::config::AssistantConfig;
use crate::constants::{CHAT_MAX_TOKENS, CHAT_TEMPERATURE, MODERATION_MODEL};
use crate::error::{AssistantError, AssistantResult};
use api_shared::ChatMessage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ModerationRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ModerationResponse {
    #[serde(default)]
    results: Vec<ModerationResult>,
}

#[derive(Debug, Deserialize)]
struct ModerationResult {
    #[serde(default)]
    flagged: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client for `/moderations` and `/chat/completions` on an OpenAI-compatible API.
///
/// Built once at startup; the underlying `reqwest::Client` pools connections and applies the
/// configured request timeout to every call.
#[derive(Clone, Debug)]
pub struct OpenAiClient {
    http: reqwest::Client,
    config: AssistantConfig,
}

impl OpenAiClient {
    pub fn new(config: AssistantConfig) -> AssistantResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn post<B: Serialize>(&self, endpoint: &str, body: &B) -> AssistantResult<reqwest::Response> {
        let res = self
            .http
            .post(format!("{}/{}", self.config.base_url, endpoint))
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AssistantError::Upstream(format!(
                "{} request failed with status {}: {}",
                endpoint, status, body
            )));
        }

        Ok(res)
    }
}

#[async_trait::async_trait]
impl LanguageModel for OpenAiClient {
    async fn moderate(&self, input: &str) -> AssistantResult<bool> {
        let res = self
            .post(
                "moderations",
                &ModerationRequest {
                    model: MODERATION_MODEL,
                    input,
                },
            )
            .await?;

        let parsed: ModerationResponse = res.json().await?;
        Ok(parsed.results.first().is_some_and(|r| r.flagged))
    }

    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> AssistantResult<Option<String>> {
        let mut wire = Vec::with_capacity(messages.len() + 1);
        wire.push(WireMessage {
            role: "system",
            content: system_prompt,
        });
        wire.extend(messages.iter().map(|m| WireMessage {
            role: m.role.as_str(),
            content: m.text(),
        }));

        let res = self
            .post(
                "chat/completions",
                &CompletionRequest {
                    model: &self.config.model,
                    messages: wire,
                    max_tokens: CHAT_MAX_TOKENS,
                    temperature: CHAT_TEMPERATURE,
                },
            )
            .await?;

        let parsed: CompletionResponse = res.json().await?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_shared::ChatRole;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, timeout: Duration) -> OpenAiClient {
        OpenAiClient::new(AssistantConfig {
            api_key: "sk-test".into(),
            model: "gpt-test".into(),
            base_url: server.uri(),
            request_timeout: timeout,
        })
        .expect("client should build")
    }

    #[tokio::test]
    async fn test_client_reports_configured_model() {
        let mock_server = MockServer::start().await;
        assert_eq!(client(&mock_server, Duration::from_secs(5)).model(), "gpt-test");
    }

    #[tokio::test]
    async fn test_moderation_reads_flag() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/moderations"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "omni-moderation-latest",
                "input": "user: hello"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"results": [{"flagged": true}]})),
            )
            .mount(&mock_server)
            .await;

        let flagged = client(&mock_server, Duration::from_secs(5))
            .moderate("user: hello")
            .await
            .expect("moderation should succeed");
        assert!(flagged);
    }

    #[tokio::test]
    async fn test_moderation_without_results_is_not_flagged() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/moderations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .mount(&mock_server)
            .await;

        let flagged = client(&mock_server, Duration::from_secs(5))
            .moderate("x")
            .await
            .unwrap();
        assert!(!flagged);
    }

    #[tokio::test]
    async fn test_completion_sends_system_prompt_and_history() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "model": "gpt-test",
                "max_tokens": 700,
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "I have a cough"},
                    {"role": "assistant", "content": "How long?"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Rest and fluids."}}]
            })))
            .mount(&mock_server)
            .await;

        let history = vec![
            ChatMessage::new(ChatRole::User, "I have a cough"),
            ChatMessage::new(ChatRole::Assistant, "How long?"),
        ];
        let reply = client(&mock_server, Duration::from_secs(5))
            .complete("be brief", &history)
            .await
            .expect("completion should succeed");

        assert_eq!(reply.as_deref(), Some("Rest and fluids."));
    }

    #[tokio::test]
    async fn test_completion_without_choices_is_none() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&mock_server)
            .await;

        let reply = client(&mock_server, Duration::from_secs(5))
            .complete("p", &[ChatMessage::new(ChatRole::User, "fever")])
            .await
            .unwrap();
        assert_eq!(reply, None);
    }

    #[tokio::test]
    async fn test_error_status_is_upstream_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&mock_server)
            .await;

        let err = client(&mock_server, Duration::from_secs(5))
            .complete("p", &[ChatMessage::new(ChatRole::User, "fever")])
            .await
            .unwrap_err();

        match err {
            AssistantError::Upstream(msg) => {
                assert!(msg.contains("429"));
                assert!(msg.contains("rate limited"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_request_timeout_is_enforced() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(2))
                    .set_body_json(json!({"choices": []})),
            )
            .mount(&mock_server)
            .await;

        let err = client(&mock_server, Duration::from_millis(200))
            .complete("p", &[ChatMessage::new(ChatRole::User, "fever")])
            .await
            .unwrap_err();

        assert!(matches!(err, AssistantError::Upstream(ref m) if m.contains("timed out")));
    }
}
