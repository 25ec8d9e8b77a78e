//! Ollama chat adapter with a JSON-schema constrained response format.

use async_trait::async_trait;
use clarity_coordination::{WorkItemCollection, PROMPT_VERSION};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, info_span, Instrument, Span};

use super::{GenerationClient, GenerationError};
use crate::config::{trim_url, OllamaEndpoint};

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ChatMessage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Local Ollama model behind `POST /api/chat`.
pub struct OllamaAgent {
    base_url: String,
    model: String,
    client: reqwest::Client,
    span: Span,
}

impl OllamaAgent {
    pub fn new(endpoint: &OllamaEndpoint, client: reqwest::Client) -> Self {
        Self {
            base_url: trim_url(&endpoint.url),
            model: endpoint.model.clone(),
            client,
            span: info_span!("generation", backend = "ollama", model = %endpoint.model),
        }
    }

    /// Request body: system + user messages, schema-constrained format,
    /// deterministic sampling, no streaming.
    pub fn request_body(&self, system_prompt: &str, transcript: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": transcript},
            ],
            "format": WorkItemCollection::json_schema(),
            "stream": false,
            "options": {"temperature": 0},
        })
    }

    async fn chat(&self, system_prompt: &str, transcript: &str) -> Result<String, GenerationError> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&self.request_body(system_prompt, transcript))
            .send()
            .await
            .map_err(|e| GenerationError::Unreachable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        let parsed: Option<ChatResponse> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let message = parsed
                .and_then(|r| r.error)
                .unwrap_or_else(|| body.chars().take(200).collect());
            return Err(GenerationError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let parsed = parsed.ok_or_else(|| {
            GenerationError::Malformed(format!(
                "response is not a chat object: {}",
                body.chars().take(200).collect::<String>()
            ))
        })?;

        if let Some(message) = parsed.error {
            return Err(GenerationError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        parsed
            .message
            .map(|m| m.content.trim().to_string())
            .ok_or_else(|| GenerationError::Malformed("response has no message".to_string()))
    }
}

#[async_trait]
impl GenerationClient for OllamaAgent {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, system_prompt: &str, transcript: &str) -> String {
        async {
            info!(
                prompt_version = PROMPT_VERSION,
                transcript_chars = transcript.chars().count(),
                "Sending transcript for analysis"
            );

            match self.chat(system_prompt, transcript).await {
                Ok(content) => {
                    info!(response_chars = content.len(), "Model analysis completed");
                    content
                }
                Err(e @ GenerationError::Unreachable(_)) => {
                    error!(
                        url = %self.base_url,
                        "Could not connect to Ollama; ensure it is running and the port is reachable: {e}"
                    );
                    String::new()
                }
                Err(e) => {
                    error!("Ollama call failed with a response error: {e}");
                    String::new()
                }
            }
        }
        .instrument(self.span.clone())
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> OllamaAgent {
        OllamaAgent::new(
            &OllamaEndpoint {
                url: "http://localhost:11434/".to_string(),
                model: "llama3:latest".to_string(),
            },
            reqwest::Client::new(),
        )
    }

    #[test]
    fn test_request_body_shape() {
        let body = agent().request_body("SYSTEM", "TRANSCRIPT");
        assert_eq!(body["model"], "llama3:latest");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "SYSTEM");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "TRANSCRIPT");
        assert_eq!(body["options"]["temperature"], 0);
        assert_eq!(body["stream"], false);
        assert_eq!(body["format"], WorkItemCollection::json_schema());
    }

    #[test]
    fn test_base_url_trimmed() {
        assert_eq!(agent().base_url, "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_unreachable_backend_soft_fails() {
        // Port 9 (discard) is closed on test hosts; connection is refused.
        let agent = OllamaAgent::new(
            &OllamaEndpoint {
                url: "http://127.0.0.1:9".to_string(),
                model: "m".to_string(),
            },
            reqwest::Client::new(),
        );
        assert_eq!(agent.generate("p", "t").await, "");
    }
}
