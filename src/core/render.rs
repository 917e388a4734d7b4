use super::signature::{Field, FieldRole, FieldType, Signature};
use std::collections::BTreeSet;
use std::fmt::{self, Write};

const BODY_INDENT: &str = "    ";

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let simple = match self {
            FieldType::Text => "str",
            FieldType::Integer => "int",
            FieldType::Float => "float",
            FieldType::Boolean => "bool",
            FieldType::ListText => "list[str]",
            FieldType::ListInteger => "list[int]",
            FieldType::ListFloat => "list[float]",
            FieldType::DictTextText => "dict[str, str]",
            FieldType::DictTextInteger => "dict[str, int]",
            FieldType::DictTextAny => "dict[str, Any]",
            FieldType::Image => "dspy.Image",
            FieldType::Audio => "dspy.Audio",
            FieldType::OptionalText => "Optional[str]",
            FieldType::OptionalInteger => "Optional[int]",
            FieldType::OptionalFloat => "Optional[float]",
            FieldType::Literal(values) => {
                let quoted: Vec<String> = values.iter().map(|v| quote(v, '\'')).collect();
                return write!(f, "Literal[{}]", quoted.join(", "));
            }
            FieldType::Opaque(raw) => raw.as_str(),
        };
        f.write_str(simple)
    }
}

/// Canonical Text Form: bare `Signature` base and field constructors.
impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_class(self, f, "")
    }
}

/// The signature as a standalone module: imports followed by the class with
/// `dspy.`-qualified names.
pub struct ModuleForm<'a>(&'a Signature);

impl fmt::Display for ModuleForm<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "import dspy")?;

        let typing: BTreeSet<&str> = self
            .0
            .fields()
            .filter_map(|field| field.field_type.typing_import())
            .collect();
        if !typing.is_empty() {
            let names: Vec<&str> = typing.into_iter().collect();
            writeln!(f, "from typing import {}", names.join(", "))?;
        }

        writeln!(f)?;
        write_class(self.0, f, "dspy.")
    }
}

impl Signature {
    pub fn to_canonical_string(&self) -> String {
        self.to_string()
    }

    pub fn module_form(&self) -> ModuleForm<'_> {
        ModuleForm(self)
    }

    pub fn to_module_string(&self) -> String {
        self.module_form().to_string()
    }
}

fn write_class(sig: &Signature, out: &mut impl Write, qualifier: &str) -> fmt::Result {
    writeln!(out, "class {}({qualifier}Signature):", sig.name())?;
    if !sig.instruction().is_empty() {
        writeln!(out, "{BODY_INDENT}\"\"\"{}\"\"\"", docstring_body(sig.instruction()))?;
    }
    for field in sig.fields() {
        write_field(field, out, qualifier)?;
    }
    Ok(())
}

fn write_field(field: &Field, out: &mut impl Write, qualifier: &str) -> fmt::Result {
    let ctor = match field.role {
        FieldRole::Input => "InputField",
        FieldRole::Output => "OutputField",
    };
    write!(out, "{BODY_INDENT}{}: {} = {qualifier}{ctor}(", field.name, field.field_type)?;
    if let Some(desc) = &field.description {
        write!(out, "desc={}", quote(desc, '"'))?;
    }
    writeln!(out, ")")
}

/// Escapes the instruction so it cannot close the docstring early, and
/// indents continuation lines to the class body.
fn docstring_body(instruction: &str) -> String {
    let chars: Vec<char> = instruction.chars().collect();
    let mut escaped = String::with_capacity(instruction.len());
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\r' => escaped.push_str("\\r"),
            '"' => {
                let next_is_quote = chars.get(i + 1) == Some(&'"');
                let prev_is_quote = i > 0 && chars[i - 1] == '"';
                if next_is_quote || prev_is_quote || i + 1 == chars.len() {
                    escaped.push_str("\\\"");
                } else {
                    escaped.push('"');
                }
            }
            _ => escaped.push(c),
        }
    }

    let mut lines = escaped.split('\n');
    let mut body = lines.next().unwrap_or_default().to_string();
    for line in lines {
        body.push('\n');
        if !line.is_empty() {
            body.push_str(BODY_INDENT);
        }
        body.push_str(line);
    }
    body
}

pub(crate) fn quote(value: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push(delimiter);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delimiter);
    out
}
