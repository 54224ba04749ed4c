use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::TranslateConfig;
use crate::error::{MedBridgeError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub options: GenerateOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateOptions {
    /// Output-length budget for the call
    pub num_predict: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
}

/// Thin client for the Ollama generate API used by the translation legs.
/// Carries its own, deliberately short timeout so a slow translation model
/// can never stall primary response delivery.
pub struct OllamaClient {
    client: Client,
    config: TranslateConfig,
}

impl OllamaClient {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                MedBridgeError::Config(format!("Failed to build translation HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    /// One bounded, non-streaming generate call. Returns the raw model text.
    pub async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: GenerateOptions {
                num_predict: max_tokens,
            },
        };

        let url = format!("{}/api/generate", self.config.endpoint);
        debug!("Sending translation request to: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| MedBridgeError::Translation(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(MedBridgeError::Translation(format!(
                "Ollama API error {}: {}",
                status, error_text
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| MedBridgeError::Translation(format!("Failed to parse response: {}", e)))?;

        let raw = body.response.trim().to_string();
        if raw.is_empty() {
            return Err(MedBridgeError::Translation(
                "Empty translation received".to_string(),
            ));
        }

        Ok(raw)
    }

    /// Verify the endpoint is reachable and the model is pulled.
    pub async fn check_availability(&self) -> Result<()> {
        check_model_availability(&self.client, &self.config.endpoint, &self.config.model).await
    }
}

/// Check that an Ollama endpoint serves the named model.
pub async fn check_model_availability(client: &Client, endpoint: &str, model: &str) -> Result<()> {
    let url = format!("{}/api/show", endpoint);
    let request = json!({ "name": model });

    let response = client
        .post(&url)
        .json(&request)
        .send()
        .await
        .map_err(|e| MedBridgeError::Translation(format!("Failed to connect to Ollama: {}", e)))?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(MedBridgeError::Translation(format!(
            "Ollama model '{}' not found. Please pull the model first: ollama pull {}",
            model, model
        )))
    }
}
