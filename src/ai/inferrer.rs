use crate::core::signature::FieldRole;
use crate::error::SignatureError;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Infers field shapes for a task description. Implementations talk to a
/// language model; the interpreter only sees the raw response text.
#[async_trait]
pub trait FieldShapeInferrer: Send + Sync {
    async fn infer(&self, meta_prompt: &str, task: &str) -> Result<String, SignatureError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedField {
    #[schemars(description = "The field name (snake_case, descriptive).")]
    pub name: String,
    #[serde(rename = "type")]
    #[schemars(description = "One of the allowed type tags.")]
    pub type_tag: String,
    #[schemars(description = "Whether this is an input or an output field.")]
    pub role: FieldRole,
    #[serde(default)]
    #[schemars(description = "What this field represents.")]
    pub description: String,
    #[serde(default)]
    #[schemars(description = "For the Literal type, the allowed values.")]
    pub literal_values: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedSignature {
    #[schemars(description = "Suggested class name for the signature (PascalCase).")]
    pub signature_name: String,
    #[schemars(description = "Clear description of what the signature accomplishes.")]
    pub task_description: String,
    #[schemars(description = "Input and output fields of the signature.")]
    pub signature_fields: Vec<GeneratedField>,
    #[serde(default)]
    #[schemars(description = "Optional explanation of the chosen fields.")]
    pub reasoning: Option<String>,
}
