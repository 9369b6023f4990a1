use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::{ExtractionOracle, VisionClient};
use super::OracleError;

/// Ollama HTTP client for local LLM inference.
///
/// One instance serves both the text oracle (with `model`) and OCR, which
/// names its own vision model per call.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, OracleError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OracleError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether a model with this name prefix is pulled locally.
    pub fn is_model_available(&self, model: &str) -> Result<bool, OracleError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaTagsResponse = response
            .json()
            .map_err(|e| OracleError::ResponseParsing(e.to_string()))?;
        Ok(parsed.models.iter().any(|m| m.name.starts_with(model)))
    }

    fn generate(&self, body: &OllamaGenerateRequest<'_>) -> Result<String, OracleError> {
        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .map_err(|e| OracleError::ResponseParsing(e.to_string()))?;
        Ok(parsed.response)
    }

    fn transport_error(&self, e: reqwest::Error) -> OracleError {
        if e.is_connect() {
            OracleError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            OracleError::Timeout(self.timeout_secs)
        } else {
            OracleError::HttpClient(e.to_string())
        }
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    images: &'a [String],
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// Response body from Ollama /api/tags
#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

impl ExtractionOracle for OllamaClient {
    fn invoke(&self, prompt: &str) -> Result<String, OracleError> {
        self.generate(&OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: Some("json"),
            images: &[],
            options: GenerateOptions { temperature: 0.0 },
        })
    }
}

impl VisionClient for OllamaClient {
    fn generate_with_images(
        &self,
        model: &str,
        prompt: &str,
        images: &[String],
    ) -> Result<String, OracleError> {
        self.generate(&OllamaGenerateRequest {
            model,
            prompt,
            stream: false,
            format: None,
            images,
            options: GenerateOptions { temperature: 0.0 },
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Mock oracle
// ────────────────────────────────────────────────────────────────────────────

enum Reply {
    Respond(String),
    Fail(String),
}

/// Scripted oracle for tests: the first rule whose needle occurs in the
/// prompt decides the reply. Every prompt is recorded.
pub struct MockOracle {
    rules: Vec<(String, Reply)>,
    fallback: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            fallback: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn respond_when(mut self, needle: &str, response: &str) -> Self {
        self.rules
            .push((needle.to_string(), Reply::Respond(response.to_string())));
        self
    }

    pub fn fail_when(mut self, needle: &str, reason: &str) -> Self {
        self.rules
            .push((needle.to_string(), Reply::Fail(reason.to_string())));
        self
    }

    /// Reply used when no rule matches. Without one, unmatched prompts fail.
    pub fn with_fallback(mut self, response: &str) -> Self {
        self.fallback = Some(response.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.recorded().len()
    }

    pub fn calls_matching(&self, needle: &str) -> usize {
        self.recorded().iter().filter(|p| p.contains(needle)).count()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.recorded().clone()
    }

    fn recorded(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.prompts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionOracle for MockOracle {
    fn invoke(&self, prompt: &str) -> Result<String, OracleError> {
        self.recorded().push(prompt.to_string());

        let rule = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()));
        match rule {
            Some((_, Reply::Respond(response))) => Ok(response.clone()),
            Some((_, Reply::Fail(reason))) => Err(OracleError::Scripted(reason.clone())),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| OracleError::Scripted("no canned response".into())),
        }
    }
}
