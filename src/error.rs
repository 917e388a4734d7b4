use crate::core::signature::FieldRole;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("Prompt is empty")]
    EmptyPrompt,

    #[error("Invalid return type '{0}': expected \"signature\" or \"string\"")]
    InvalidReturnType(String),

    #[error("Signature Inference Failed: {0}")]
    SignatureInference(String),

    #[error("Malformed signature text: {0}")]
    MalformedSignatureText(String),

    #[error("Duplicate {role} field name: '{name}'")]
    DuplicateFieldName { role: FieldRole, name: String },

    #[error("Signature has no {0} fields")]
    EmptyFieldList(FieldRole),

    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("Model call timed out after {0:?}")]
    ModelTimeout(Duration),

    #[error("API Error: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API Error {status}: {message}")]
    ApiStatus { status: u16, message: String },

    #[error("JSON Error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Generation Failed: {0}")]
    GenerationFailed(String),
}

impl SignatureError {
    pub(crate) fn malformed(line: usize, reason: impl std::fmt::Display) -> Self {
        SignatureError::MalformedSignatureText(format!("line {line}: {reason}"))
    }
}
