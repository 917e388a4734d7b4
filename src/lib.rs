//! Converts between free-text task descriptions, typed signatures and the
//! class-declaration text that describes them.

pub mod config;
pub mod error;
pub mod core {
    pub mod parser;
    pub mod render;
    pub mod signature;
}
pub mod ai {
    pub mod client;
    pub mod inferrer;
    pub mod prompts;
    pub mod schema_utils;
}
pub mod interpreter;

pub use crate::ai::inferrer::FieldShapeInferrer;
pub use crate::core::signature::{Field, FieldRole, FieldType, Signature};
pub use crate::error::SignatureError;
pub use crate::interpreter::{from_prompt, PromptInterpreter, PromptOutput, ReturnType};

/// Parses a signature class declaration back into a [`Signature`].
pub fn from_dspy_string(cls_string: &str) -> Result<Signature, SignatureError> {
    crate::core::parser::parse_signature(cls_string)
}
