//! OpenAI-compatible chat completions backend
//!
//! Works against any server exposing `POST {base_url}/chat/completions`.
//! The client is blocking; each call is bounded by the configured timeout
//! and never retried.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::BackendConfig;
use crate::error::{DocError, DocResult, SummarizerError};
use crate::summarizer::SummaryBackend;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiBackend {
    http: Client,
    endpoint: String,
    config: BackendConfig,
}

impl OpenAiBackend {
    pub fn new(config: BackendConfig) -> DocResult<Self> {
        if config.timeout.is_zero() {
            return Err(DocError::Config("timeout must be positive".to_string()));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DocError::Config(format!("cannot build HTTP client: {}", e)))?;
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        Ok(Self {
            http,
            endpoint,
            config,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SummaryBackend for OpenAiBackend {
    fn complete(&self, prompt: &str) -> Result<String, SummarizerError> {
        let request = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.config.system_message,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let mut builder = self.http.post(&self.endpoint).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        debug!(model = %self.config.model, bytes = prompt.len(), "completion request");
        let response = builder.send().map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SummarizerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().map_err(|e| {
            if e.is_timeout() {
                SummarizerError::Timeout
            } else {
                SummarizerError::Other(format!("invalid response: {}", e))
            }
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(SummarizerError::EmptyResponse)
    }
}

fn transport_error(e: reqwest::Error) -> SummarizerError {
    if e.is_timeout() {
        SummarizerError::Timeout
    } else {
        SummarizerError::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> BackendConfig {
        BackendConfig {
            base_url: server.uri(),
            api_key: Some("test-key".to_string()),
            model: "test-model".to_string(),
            ..Default::default()
        }
    }

    /// The blocking client must not be created or dropped on a runtime thread
    async fn complete_blocking(config: BackendConfig, prompt: &str) -> Result<String, SummarizerError> {
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || {
            let backend = OpenAiBackend::new(config).unwrap();
            backend.complete(&prompt)
        })
        .await
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_complete_sends_chat_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "test-model",
                "messages": [
                    {"role": "system"},
                    {"role": "user", "content": "Summarize the following codebase:\nx"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "  A summary.\n"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let summary = complete_blocking(config_for(&server), "Summarize the following codebase:\nx")
            .await
            .unwrap();
        assert_eq!(summary, "A summary.");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = complete_blocking(config_for(&server), "p").await.unwrap_err();
        match err {
            SummarizerError::Status { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = complete_blocking(config_for(&server), "p").await.unwrap_err();
        assert!(matches!(err, SummarizerError::EmptyResponse));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(3))
                    .set_body_json(json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let config = BackendConfig {
            timeout: Duration::from_millis(200),
            ..config_for(&server)
        };
        let err = complete_blocking(config, "p").await.unwrap_err();
        assert!(matches!(err, SummarizerError::Timeout));
    }

    #[test]
    fn test_endpoint_and_zero_timeout() {
        let backend = OpenAiBackend::new(BackendConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(backend.endpoint(), "http://localhost:8080/v1/chat/completions");

        let zero = OpenAiBackend::new(BackendConfig {
            timeout: Duration::ZERO,
            ..Default::default()
        });
        assert!(matches!(zero, Err(DocError::Config(_))));
    }
}
