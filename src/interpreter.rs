use crate::ai::inferrer::{FieldShapeInferrer, GeneratedField, GeneratedSignature};
use crate::ai::prompts;
use crate::core::signature::{is_identifier, Field, FieldType, Signature, TYPE_TAGS};
use crate::error::SignatureError;
use schemars::schema_for;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const FALLBACK_SIGNATURE_NAME: &str = "GeneratedSignature";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnType {
    Signature,
    String,
}

impl FromStr for ReturnType {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signature" => Ok(ReturnType::Signature),
            "string" => Ok(ReturnType::String),
            other => Err(SignatureError::InvalidReturnType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutput {
    Signature(Signature),
    Text(String),
}

impl PromptOutput {
    pub fn into_signature(self) -> Option<Signature> {
        match self {
            PromptOutput::Signature(sig) => Some(sig),
            PromptOutput::Text(_) => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            PromptOutput::Text(text) => Some(text),
            PromptOutput::Signature(_) => None,
        }
    }
}

impl fmt::Display for PromptOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptOutput::Signature(sig) => write!(f, "{sig}"),
            PromptOutput::Text(text) => f.write_str(text),
        }
    }
}

pub struct PromptInterpreter {
    inferrer: Box<dyn FieldShapeInferrer>,
    timeout: Duration,
}

impl PromptInterpreter {
    pub fn new(inferrer: impl FieldShapeInferrer + 'static) -> Self {
        Self {
            inferrer: Box::new(inferrer),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn from_prompt(
        &self,
        prompt: &str,
        return_type: &str,
    ) -> Result<PromptOutput, SignatureError> {
        from_prompt(self.inferrer.as_ref(), prompt, return_type, self.timeout).await
    }
}

/// Infers a signature for `prompt` and returns it as an object (`"signature"`)
/// or as canonical text (`"string"`). The model call is bounded by `timeout`.
pub async fn from_prompt(
    inferrer: &dyn FieldShapeInferrer,
    prompt: &str,
    return_type: &str,
    timeout: Duration,
) -> Result<PromptOutput, SignatureError> {
    let return_type: ReturnType = return_type.parse()?;
    let task = prompt.trim();
    if task.is_empty() {
        return Err(SignatureError::EmptyPrompt);
    }

    let meta_prompt = meta_prompt()?;
    log::info!("Inferring signature for: \"{}\"", truncate(task, 120));

    let raw = tokio::time::timeout(timeout, inferrer.infer(&meta_prompt, task))
        .await
        .map_err(|_| SignatureError::ModelTimeout(timeout))??;
    log::debug!("Model response: {raw}");

    let signature = validate_response(&raw)?;
    log::info!(
        "Inferred '{}': inputs={:?} outputs={:?}",
        signature.name(),
        signature.input_names(),
        signature.output_names()
    );

    Ok(match return_type {
        ReturnType::Signature => PromptOutput::Signature(signature),
        ReturnType::String => PromptOutput::Text(signature.to_canonical_string()),
    })
}

/// The fixed instructions sent ahead of every task description.
pub fn meta_prompt() -> Result<String, SignatureError> {
    let schema_text = serde_json::to_string_pretty(&schema_for!(GeneratedSignature))?;
    Ok(format!(
        "{}\nALLOWED TYPE TAGS: {}\n\nREQUIRED OUTPUT SCHEMA:\n{}",
        prompts::SIGNATURE_ARCHITECT_PROMPT,
        TYPE_TAGS.join(", "),
        schema_text
    ))
}

/// Decodes a model response and checks it against the signature invariants.
pub fn validate_response(raw: &str) -> Result<Signature, SignatureError> {
    let payload = extract_json_object(raw);
    let generated: GeneratedSignature = serde_json::from_str(payload).map_err(|e| {
        SignatureError::SignatureInference(format!("response is not a signature object: {e}"))
    })?;

    if let Some(reasoning) = &generated.reasoning {
        log::debug!("Model reasoning: {reasoning}");
    }

    let fields = generated
        .signature_fields
        .into_iter()
        .map(into_field)
        .collect::<Result<Vec<_>, _>>()?;

    Signature::new(
        signature_name(&generated.signature_name),
        generated.task_description.trim(),
        fields,
    )
    .map_err(|e| SignatureError::SignatureInference(e.to_string()))
}

fn into_field(generated: GeneratedField) -> Result<Field, SignatureError> {
    let name = generated.name.trim().to_string();
    let field_type = FieldType::from_tag(&generated.type_tag, generated.literal_values.as_deref())
        .ok_or_else(|| {
            let reason = if generated.type_tag.trim() == "Literal" {
                format!("Literal field '{name}' has no literal_values")
            } else {
                format!("field '{name}' has unrecognized type '{}'", generated.type_tag)
            };
            SignatureError::SignatureInference(reason)
        })?;

    let description = generated.description.trim();
    Ok(Field {
        name,
        field_type,
        description: (!description.is_empty()).then(|| description.to_string()),
        role: generated.role,
    })
}

/// Strips Markdown fences or surrounding prose down to the outermost object.
fn extract_json_object(text: &str) -> &str {
    let trimmed = text.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => trimmed,
    }
}

fn signature_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if is_identifier(trimmed) {
        return trimmed.to_string();
    }

    let pascal: String = trimmed
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();

    if is_identifier(&pascal) {
        pascal
    } else {
        FALLBACK_SIGNATURE_NAME.to_string()
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}... (len: {})", &s[..idx], s.len()),
        None => s.to_string(),
    }
}
