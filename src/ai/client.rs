use super::inferrer::{FieldShapeInferrer, GeneratedSignature};
use super::schema_utils;
use crate::config::ModelConfig;
use crate::error::SignatureError;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::sleep;

/// Gemini `generateContent` client.
pub struct GeminiClient {
    client: reqwest::Client,
    config: ModelConfig,
}

impl GeminiClient {
    pub fn new(config: ModelConfig) -> Result<Self, SignatureError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        response_schema: Option<Value>,
    ) -> Result<String, SignatureError> {
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self
                .generate_attempt(system_prompt, user_prompt, response_schema.clone())
                .await
            {
                Ok(text) => return Ok(text),
                Err(e) if attempt < max_attempts && is_transient(&e) => {
                    log::warn!("Attempt {attempt}/{max_attempts} failed: {e}");
                    sleep(self.config.retry_delay(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
        Err(SignatureError::GenerationFailed("Max retries exceeded".into()))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.config.api_base.trim_end_matches('/'),
            self.config.model,
            self.config.api_key
        )
    }

    fn transport_error(&self, e: reqwest::Error) -> SignatureError {
        if e.is_timeout() {
            SignatureError::ModelTimeout(self.config.timeout)
        } else {
            SignatureError::ApiError(e)
        }
    }

    async fn generate_attempt(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        response_schema: Option<Value>,
    ) -> Result<String, SignatureError> {
        let full_prompt = format!("{system_prompt}\n\n{user_prompt}");

        let mut payload = json!({
            "contents": [{
                "parts": [{ "text": full_prompt }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json"
            }
        });

        if let Some(schema) = response_schema {
            payload["generationConfig"]["responseSchema"] = schema;
        }

        let res = self
            .client
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = res.status();
        if !status.is_success() {
            let message = res.text().await.unwrap_or_default();
            log::error!("API Error {status}: {message}");
            return Err(SignatureError::ApiStatus {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = res.json().await.map_err(|e| self.transport_error(e))?;
        extract_text(&body)
    }
}

#[async_trait]
impl FieldShapeInferrer for GeminiClient {
    async fn infer(&self, meta_prompt: &str, task: &str) -> Result<String, SignatureError> {
        let schema = schema_utils::response_schema::<GeneratedSignature>()?;
        self.generate(meta_prompt, task, Some(schema)).await
    }
}

fn extract_text(body: &Value) -> Result<String, SignatureError> {
    body["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SignatureError::GenerationFailed("No text content returned".into()))
}

/// Only 429, 5xx and connect failures are retried. Timeouts are final.
fn is_transient(e: &SignatureError) -> bool {
    match e {
        SignatureError::ApiStatus { status, .. } => *status == 429 || *status >= 500,
        SignatureError::ApiError(e) => e.is_connect(),
        _ => false,
    }
}
