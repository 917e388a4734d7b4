use crate::error::SignatureError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

/// Annotation tags the model may answer with, in the order they are offered.
pub const TYPE_TAGS: &[&str] = &[
    "str",
    "int",
    "float",
    "bool",
    "list[str]",
    "list[int]",
    "list[float]",
    "dict[str, str]",
    "dict[str, int]",
    "dict[str, Any]",
    "dspy.Image",
    "dspy.Audio",
    "Literal",
    "Optional[str]",
    "Optional[int]",
    "Optional[float]",
];

const RESERVED_WORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldRole {
    Input,
    Output,
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRole::Input => f.write_str("input"),
            FieldRole::Output => f.write_str("output"),
        }
    }
}

/// The type of a field. Annotations outside the known set are kept verbatim
/// as `Opaque` so vendor extensions survive a parse/render cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Integer,
    Float,
    Boolean,
    ListText,
    ListInteger,
    ListFloat,
    DictTextText,
    DictTextInteger,
    DictTextAny,
    Image,
    Audio,
    OptionalText,
    OptionalInteger,
    OptionalFloat,
    Literal(Vec<String>),
    Opaque(String),
}

impl FieldType {
    /// Maps a model-supplied tag onto a type. Unlike the text parser this is
    /// strict: unknown tags and a `Literal` without values yield `None`.
    pub fn from_tag(tag: &str, literal_values: Option<&[String]>) -> Option<FieldType> {
        if tag.trim() == "Literal" {
            return match literal_values {
                Some(values) if !values.is_empty() => Some(FieldType::Literal(values.to_vec())),
                _ => None,
            };
        }
        Self::from_simple_annotation(tag)
    }

    /// Recognizes every non-`Literal` annotation, ignoring whitespace and the
    /// capitalized `typing` aliases.
    pub(crate) fn from_simple_annotation(raw: &str) -> Option<FieldType> {
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        let ty = match compact.as_str() {
            "str" => FieldType::Text,
            "int" => FieldType::Integer,
            "float" => FieldType::Float,
            "bool" => FieldType::Boolean,
            "list[str]" | "List[str]" => FieldType::ListText,
            "list[int]" | "List[int]" => FieldType::ListInteger,
            "list[float]" | "List[float]" => FieldType::ListFloat,
            "dict[str,str]" | "Dict[str,str]" => FieldType::DictTextText,
            "dict[str,int]" | "Dict[str,int]" => FieldType::DictTextInteger,
            "dict[str,Any]" | "Dict[str,Any]" => FieldType::DictTextAny,
            "dspy.Image" | "Image" => FieldType::Image,
            "dspy.Audio" | "Audio" => FieldType::Audio,
            "Optional[str]" => FieldType::OptionalText,
            "Optional[int]" => FieldType::OptionalInteger,
            "Optional[float]" => FieldType::OptionalFloat,
            _ => return None,
        };
        Some(ty)
    }

    /// The `typing` name this annotation needs imported, if any.
    pub fn typing_import(&self) -> Option<&'static str> {
        match self {
            FieldType::Literal(_) => Some("Literal"),
            FieldType::OptionalText | FieldType::OptionalInteger | FieldType::OptionalFloat => {
                Some("Optional")
            }
            FieldType::DictTextAny => Some("Any"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub description: Option<String>,
    pub role: FieldRole,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType, role: FieldRole) -> Self {
        Self {
            name: name.into(),
            field_type,
            description: None,
            role,
        }
    }

    pub fn input(name: impl Into<String>, field_type: FieldType) -> Self {
        Self::new(name, field_type, FieldRole::Input)
    }

    pub fn output(name: impl Into<String>, field_type: FieldType) -> Self {
        Self::new(name, field_type, FieldRole::Output)
    }

    pub fn with_desc(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A typed input/output contract. Only constructible through [`Signature::new`],
/// which enforces identifier names, per-role uniqueness and non-empty groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    name: String,
    instruction: String,
    inputs: Vec<Field>,
    outputs: Vec<Field>,
}

impl Signature {
    pub fn new(
        name: impl Into<String>,
        instruction: impl Into<String>,
        fields: impl IntoIterator<Item = Field>,
    ) -> Result<Self, SignatureError> {
        let name = name.into();
        if !is_identifier(&name) {
            return Err(SignatureError::InvalidIdentifier(name));
        }

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        let mut seen: HashSet<(FieldRole, String)> = HashSet::new();

        for field in fields {
            if !is_identifier(&field.name) {
                return Err(SignatureError::InvalidIdentifier(field.name));
            }
            if !seen.insert((field.role, field.name.clone())) {
                return Err(SignatureError::DuplicateFieldName {
                    role: field.role,
                    name: field.name,
                });
            }
            match field.role {
                FieldRole::Input => inputs.push(field),
                FieldRole::Output => outputs.push(field),
            }
        }

        if inputs.is_empty() {
            return Err(SignatureError::EmptyFieldList(FieldRole::Input));
        }
        if outputs.is_empty() {
            return Err(SignatureError::EmptyFieldList(FieldRole::Output));
        }

        Ok(Self {
            name,
            instruction: instruction.into(),
            inputs,
            outputs,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn inputs(&self) -> &[Field] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Field] {
        &self.outputs
    }

    /// Inputs followed by outputs, each group in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    pub fn input_names(&self) -> Vec<&str> {
        self.inputs.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|f| f.name.as_str()).collect()
    }

    /// A JSON object with a `"..."` placeholder per input field, for callers
    /// that ask a user to fill in the inputs.
    pub fn input_template(&self) -> Value {
        let map: Map<String, Value> = self
            .inputs
            .iter()
            .map(|f| (f.name.clone(), Value::String("...".into())))
            .collect();
        Value::Object(map)
    }
}

pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let starts_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    starts_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED_WORDS.contains(&s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn qa_fields() -> Vec<Field> {
        vec![
            Field::input("question", FieldType::Text).with_desc("the question"),
            Field::input("context", FieldType::ListText),
            Field::output("answer", FieldType::Text).with_desc("the answer"),
        ]
    }

    #[test]
    fn new_splits_fields_by_role_in_order() {
        let sig = Signature::new("Qa", "Answer the question.", qa_fields()).unwrap();
        assert_eq!(sig.input_names(), vec!["question", "context"]);
        assert_eq!(sig.output_names(), vec!["answer"]);
        assert_eq!(sig.fields().count(), 3);
    }

    #[test]
    fn same_name_allowed_across_roles() {
        let sig = Signature::new(
            "Echo",
            "",
            vec![
                Field::input("text", FieldType::Text),
                Field::output("text", FieldType::Text),
            ],
        );
        assert!(sig.is_ok());
    }

    #[test]
    fn duplicate_name_within_role_is_rejected() {
        let err = Signature::new(
            "Qa",
            "",
            vec![
                Field::input("question", FieldType::Text),
                Field::output("answer", FieldType::Text),
                Field::output("answer", FieldType::Integer),
            ],
        )
        .unwrap_err();
        match err {
            SignatureError::DuplicateFieldName { role, name } => {
                assert_eq!(role, FieldRole::Output);
                assert_eq!(name, "answer");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_groups_are_rejected() {
        let no_outputs = Signature::new("Qa", "", vec![Field::input("q", FieldType::Text)]);
        assert!(matches!(
            no_outputs,
            Err(SignatureError::EmptyFieldList(FieldRole::Output))
        ));

        let no_inputs = Signature::new("Qa", "", vec![Field::output("a", FieldType::Text)]);
        assert!(matches!(
            no_inputs,
            Err(SignatureError::EmptyFieldList(FieldRole::Input))
        ));
    }

    #[test]
    fn invalid_identifiers_are_rejected() {
        let bad_field = Signature::new(
            "Qa",
            "",
            vec![
                Field::input("user question", FieldType::Text),
                Field::output("answer", FieldType::Text),
            ],
        );
        assert!(matches!(bad_field, Err(SignatureError::InvalidIdentifier(n)) if n == "user question"));

        let bad_name = Signature::new("2fast", "", qa_fields());
        assert!(matches!(bad_name, Err(SignatureError::InvalidIdentifier(_))));
    }

    #[test]
    fn identifier_rules() {
        assert!(is_identifier("answer"));
        assert!(is_identifier("_private2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("9lives"));
        assert!(!is_identifier("kebab-case"));
        assert!(!is_identifier("class"));
    }

    #[test]
    fn from_tag_is_strict() {
        assert_eq!(FieldType::from_tag("str", None), Some(FieldType::Text));
        assert_eq!(
            FieldType::from_tag("dict[str, Any]", None),
            Some(FieldType::DictTextAny)
        );
        assert_eq!(FieldType::from_tag("tensor", None), None);
        assert_eq!(FieldType::from_tag("Literal", None), None);
        assert_eq!(FieldType::from_tag("Literal", Some(&[][..])), None);

        let values = vec!["positive".to_string(), "negative".to_string()];
        assert_eq!(
            FieldType::from_tag("Literal", Some(values.as_slice())),
            Some(FieldType::Literal(values.clone()))
        );
    }

    #[test]
    fn every_offered_tag_except_literal_is_recognized() {
        for tag in TYPE_TAGS.iter().filter(|t| **t != "Literal") {
            assert!(FieldType::from_tag(tag, None).is_some(), "tag {tag} not recognized");
        }
    }

    #[test]
    fn input_template_lists_inputs_only() {
        let sig = Signature::new("Qa", "", qa_fields()).unwrap();
        assert_eq!(
            sig.input_template(),
            json!({ "question": "...", "context": "..." })
        );
    }
}
