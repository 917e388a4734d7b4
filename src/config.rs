use crate::error::SignatureError;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Connection settings for the model provider.
#[derive(Clone)]
pub struct ModelConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    /// Limit for a single HTTP attempt.
    pub timeout: Duration,
    pub max_attempts: u32,
    /// Attempt `n` is followed by a wait of `backoff_base * 2^n`.
    pub backoff_base: Duration,
}

impl ModelConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }

    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Upper bound on one retried call: every attempt running to its timeout
    /// plus the waits between attempts.
    pub fn call_budget(&self) -> Duration {
        let attempts = self.max_attempts.max(1);
        (1..attempts).fold(self.timeout.saturating_mul(attempts), |total, attempt| {
            total.saturating_add(self.retry_delay(attempt))
        })
    }

    /// Reads `API_KEY` (or `GEMINI_API_KEY`), `API_BASE`, `MODEL_NAME`,
    /// `SIGNATURIZE_TIMEOUT_SECS` and `SIGNATURIZE_MAX_ATTEMPTS`.
    pub fn from_env() -> Result<Self, SignatureError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SignatureError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = non_empty("API_KEY")
            .or_else(|| non_empty("GEMINI_API_KEY"))
            .ok_or_else(|| SignatureError::Config("API_KEY must be set".into()))?;

        let mut config = Self::new(api_key);
        if let Some(base) = non_empty("API_BASE") {
            config.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(model) = non_empty("MODEL_NAME") {
            config.model = model;
        }
        if let Some(secs) = non_empty("SIGNATURIZE_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                SignatureError::Config(format!("SIGNATURIZE_TIMEOUT_SECS is not a number: {secs}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = non_empty("SIGNATURIZE_MAX_ATTEMPTS") {
            config.max_attempts = attempts.trim().parse().map_err(|_| {
                SignatureError::Config(format!(
                    "SIGNATURIZE_MAX_ATTEMPTS is not a number: {attempts}"
                ))
            })?;
        }
        Ok(config)
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_base", &self.backoff_base)
            .finish()
    }
}
