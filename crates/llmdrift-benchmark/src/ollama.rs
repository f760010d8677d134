use async_trait::async_trait;
use llmdrift_core::{DriftError, OracleConfig, RequestId, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::oracle::{Oracle, OracleResponse};

#[derive(Debug, Clone)]
pub struct OllamaClient {
    host: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub role: String,
    pub content: String,
}

impl OllamaClient {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.host);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DriftError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(DriftError::Oracle(format!(
                "Failed to list models: {}",
                resp.status()
            )));
        }

        let tags: TagsResponse = resp
            .json()
            .await
            .map_err(|e| DriftError::Http(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    pub async fn chat(
        &self,
        model: &str,
        prompt: &str,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<ChatResponse> {
        let url = format!("{}/api/chat", self.host);

        let options = if temperature.is_some() || max_tokens.is_some() {
            Some(ChatOptions {
                temperature,
                num_predict: max_tokens,
            })
        } else {
            None
        };

        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
            options,
        };

        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DriftError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(DriftError::Oracle(format!(
                "Chat failed: {} - {}",
                status, body
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| DriftError::Http(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| {
            DriftError::Http(format!(
                "Failed to parse response: {} - Body: {}",
                e,
                truncate(&body, 500)
            ))
        })
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Oracle backed by an Ollama chat endpoint. Each submission runs as its own
/// task and its reply is pushed onto the response channel.
pub struct OllamaOracle {
    client: OllamaClient,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    responses: mpsc::Sender<OracleResponse>,
}

impl OllamaOracle {
    pub fn new(config: &OracleConfig, responses: mpsc::Sender<OracleResponse>) -> Self {
        Self {
            client: OllamaClient::new(&config.host),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            responses,
        }
    }
}

#[async_trait]
impl Oracle for OllamaOracle {
    async fn submit(&self, request_id: RequestId, prompt: &str) -> Result<()> {
        if self.responses.is_closed() {
            return Err(DriftError::Oracle("response channel closed".to_string()));
        }

        let client = self.client.clone();
        let model = self.model.clone();
        let prompt = prompt.to_string();
        let temperature = self.temperature;
        let max_tokens = self.max_tokens;
        let tx = self.responses.clone();

        tokio::spawn(async move {
            let reply = client
                .chat(&model, &prompt, Some(temperature), max_tokens)
                .await;
            let content = match reply {
                Ok(resp) => resp.message.content,
                Err(e) => {
                    // No retry: the request stays pending.
                    warn!(%request_id, "Oracle chat failed: {}", e);
                    return;
                }
            };

            debug!(%request_id, len = content.len(), "Oracle replied");
            if tx.send(OracleResponse { request_id, content }).await.is_err() {
                debug!(%request_id, "Response receiver dropped");
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[test]
    fn test_chat_request_omits_empty_options() {
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![],
            stream: false,
            options: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("options").is_none());
    }

    #[tokio::test]
    async fn test_submit_fails_when_channel_closed() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let oracle = OllamaOracle::new(&OracleConfig::default(), tx);

        let err = oracle.submit(RequestId(0), "hi").await.unwrap_err();
        assert!(matches!(err, DriftError::Oracle(_)));
    }
}
