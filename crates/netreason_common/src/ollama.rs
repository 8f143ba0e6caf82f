//! Ollama generation client.
//!
//! Endpoints used:
//! - GET / - health check
//! - POST /api/generate - streaming generation (NDJSON)
//!
//! The stream is accumulated into one string; callers never see chunks.

use crate::config::ModelConfig;
use crate::error::GenerateError;
use crate::llm_trait::GenerationClient;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout for health checks (ms)
pub const HEALTH_CHECK_TIMEOUT_MS: u64 = 2000;

/// Request for /api/generate
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub options: GenerateOptions,
}

/// Sampling options
#[derive(Debug, Clone, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub top_p: f32,
}

/// One NDJSON line of a streamed /api/generate response
#[derive(Debug, Clone, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Ollama client for a single model
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    top_p: f32,
}

impl OllamaClient {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.name.clone(),
            top_p: config.top_p as f32,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if Ollama is reachable
    pub async fn is_available(&self) -> bool {
        let result = self
            .http
            .get(&self.base_url)
            .timeout(Duration::from_millis(HEALTH_CHECK_TIMEOUT_MS))
            .send()
            .await;

        match result {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn map_request_error(e: reqwest::Error) -> GenerateError {
        if e.is_timeout() {
            GenerateError::Timeout
        } else if e.is_connect() {
            GenerateError::NotAvailable(e.to_string())
        } else {
            GenerateError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl GenerationClient for OllamaClient {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, GenerateError> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: true,
            options: GenerateOptions {
                temperature,
                top_p: self.top_p,
            },
        };

        let url = format!("{}/api/generate", self.base_url);
        debug!("POST {} ({} chars, t={})", url, prompt.len(), temperature);

        let resp = self
            .http
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/x-ndjson")
            .json(&request)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            if status.as_u16() == 404 {
                return Err(GenerateError::ModelNotFound(self.model.clone()));
            }
            return Err(GenerateError::Http(format!("Status {}: {}", status, body)));
        }

        let mut stream = resp.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut output = StreamAccumulator::default();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(Self::map_request_error)?;
            buffer.extend_from_slice(&bytes);

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                output.feed(&line)?;
            }
            if output.done {
                break;
            }
        }
        if !buffer.is_empty() {
            output.feed(&buffer)?;
        }

        Ok(output.text.trim().to_string())
    }
}

/// Joins `response` fragments from NDJSON lines
#[derive(Debug, Default)]
struct StreamAccumulator {
    text: String,
    done: bool,
}

impl StreamAccumulator {
    /// Feed one line. Malformed lines are skipped; an `error` field aborts.
    fn feed(&mut self, line: &[u8]) -> Result<(), GenerateError> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        match serde_json::from_str::<StreamChunk>(line) {
            Ok(chunk) => {
                if let Some(err) = chunk.error {
                    return Err(GenerateError::Stream(err));
                }
                if let Some(fragment) = chunk.response {
                    self.text.push_str(&fragment);
                }
                if chunk.done {
                    self.done = true;
                }
            }
            Err(e) => {
                warn!("Skipping malformed stream line: {}", e);
            }
        }
        Ok(())
    }
}
