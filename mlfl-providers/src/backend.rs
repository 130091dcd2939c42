//! HTTP client for the MLFL retrieval backend

use async_trait::async_trait;
use mlfl_core::config::BackendConfig;
use mlfl_core::session::{Citation, GeneratedAnswer, GenerationRequest, HistoryTurn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::base::{AnswerProvider, ProviderError, ProviderResult};

/// `POST /chat` request body
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    history: &'a [HistoryTurn],
}

/// `POST /chat` response body
#[derive(Debug, Deserialize)]
struct ChatResponse {
    response: String,
    #[serde(default)]
    sources: Vec<Citation>,
}

/// Client for the RAG backend's chat endpoint
pub struct BackendClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
}

impl BackendClient {
    /// Create a new backend client
    pub fn new(api_base: impl Into<String>, api_key: Option<String>) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        Self {
            client: Client::builder()
                .http1_only()
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_base,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(config.api_base.clone(), config.api_key.clone())
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Check that the backend answers on `GET /health`
    pub async fn health(&self) -> ProviderResult<()> {
        let url = format!("{}/health", self.api_base);
        let response = self.apply_headers(self.client.get(&url)).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::Api(format!("HTTP {}", response.status())))
        }
    }

    fn apply_headers(&self, req_builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(api_key) => req_builder.header("Authorization", format!("Bearer {}", api_key)),
            None => req_builder,
        }
    }
}

#[async_trait]
impl AnswerProvider for BackendClient {
    async fn answer(&self, request: GenerationRequest) -> ProviderResult<GeneratedAnswer> {
        let url = format!("{}/chat", self.api_base);
        let body = ChatRequest {
            message: &request.message,
            history: &request.history,
        };

        debug!(
            "Sending question to {} with {} history turns",
            url,
            request.history.len()
        );

        let response = self
            .apply_headers(self.client.post(&url).json(&body))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let detail = if text.trim().is_empty() {
                "Unknown error".to_string()
            } else {
                text
            };
            return Err(ProviderError::Api(format!("HTTP {}: {}", status, detail)));
        }

        let data: ChatResponse = serde_json::from_str(&text)?;
        debug!("Received answer with {} sources", data.sources.len());

        Ok(GeneratedAnswer {
            content: data.response,
            citations: data.sources,
        })
    }

    fn name(&self) -> &str {
        "backend"
    }
}
