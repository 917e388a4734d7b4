//! Reconstructs a [`Signature`] from its class-declaration text.
//!
//! Physical lines are first joined into logical lines (brackets and
//! triple-quoted strings may span lines, `#` comments are dropped), then a
//! scanner walks them: `Header` → `Instruction` → `Fields(Input)` →
//! `Fields(Output)`. The role switches exactly once.

use super::signature::{is_identifier, Field, FieldRole, FieldType, Signature};
use crate::error::SignatureError;

#[derive(Debug, Clone, PartialEq, Eq)]
struct LogicalLine {
    /// 1-based number of the first physical line.
    number: usize,
    indent: usize,
    text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Code,
    Quoted,
    Comment,
}

/// Tracks string literals, comments and bracket depth one character at a time.
#[derive(Debug, Default)]
struct Lexer {
    /// Open string: delimiter and whether it is triple-quoted.
    string: Option<(char, bool)>,
    /// Opening quote characters of a triple delimiter still to consume.
    skip: usize,
    escaped: bool,
    closing_run: usize,
    depth: usize,
    comment: bool,
}

impl Lexer {
    fn step(&mut self, c: char, ahead: &[char]) -> CharClass {
        if self.comment {
            return CharClass::Comment;
        }
        if self.skip > 0 {
            self.skip -= 1;
            return CharClass::Quoted;
        }
        if let Some((delim, triple)) = self.string {
            if self.escaped {
                self.escaped = false;
                self.closing_run = 0;
            } else if c == '\\' {
                self.escaped = true;
                self.closing_run = 0;
            } else if c == delim {
                self.closing_run += 1;
                if !triple || self.closing_run == 3 {
                    self.string = None;
                    self.closing_run = 0;
                }
            } else {
                self.closing_run = 0;
            }
            return CharClass::Quoted;
        }
        match c {
            '#' => {
                self.comment = true;
                CharClass::Comment
            }
            '"' | '\'' => {
                let triple = ahead.len() >= 2 && ahead[0] == c && ahead[1] == c;
                self.string = Some((c, triple));
                self.skip = if triple { 2 } else { 0 };
                CharClass::Quoted
            }
            '(' | '[' | '{' => {
                self.depth += 1;
                CharClass::Code
            }
            ')' | ']' | '}' => {
                self.depth = self.depth.saturating_sub(1);
                CharClass::Code
            }
            _ => CharClass::Code,
        }
    }

    fn end_line(&mut self) -> Result<(), &'static str> {
        self.comment = false;
        match self.string {
            Some((_, false)) => Err("unterminated string literal"),
            _ => Ok(()),
        }
    }

    /// True while the logical line must continue onto the next physical line.
    fn is_open(&self) -> bool {
        self.depth > 0 || matches!(self.string, Some((_, true)))
    }
}

fn logical_lines(src: &str) -> Result<Vec<LogicalLine>, SignatureError> {
    let mut lines = Vec::new();
    let mut lexer = Lexer::default();
    let mut pending: Option<LogicalLine> = None;

    for (idx, raw) in src.lines().enumerate() {
        let (mut line, body) = match pending.take() {
            Some(mut line) => {
                line.text.push('\n');
                (line, raw)
            }
            None => {
                let body = raw.trim_start();
                if body.is_empty() {
                    continue;
                }
                let line = LogicalLine {
                    number: idx + 1,
                    indent: raw.len() - body.len(),
                    text: String::new(),
                };
                (line, body)
            }
        };

        let chars: Vec<char> = body.chars().collect();
        for (i, &c) in chars.iter().enumerate() {
            if lexer.step(c, &chars[i + 1..]) != CharClass::Comment {
                line.text.push(c);
            }
        }
        lexer
            .end_line()
            .map_err(|reason| SignatureError::malformed(idx + 1, reason))?;

        if lexer.is_open() {
            pending = Some(line);
            continue;
        }

        let text = line.text.trim_end().to_string();
        if !text.is_empty() {
            lines.push(LogicalLine { text, ..line });
        }
    }

    if let Some(line) = pending {
        return Err(SignatureError::malformed(
            line.number,
            "unterminated bracket or triple-quoted string",
        ));
    }
    Ok(lines)
}

/// Byte offsets of `target` outside strings and brackets.
fn top_level_indices(s: &str, target: char) -> Vec<usize> {
    let indexed: Vec<(usize, char)> = s.char_indices().collect();
    let chars: Vec<char> = indexed.iter().map(|(_, c)| *c).collect();
    let mut lexer = Lexer::default();
    let mut found = Vec::new();
    for (pos, &(offset, c)) in indexed.iter().enumerate() {
        let class = lexer.step(c, &chars[pos + 1..]);
        if class == CharClass::Code && c == target && lexer.depth == 0 {
            found.push(offset);
        }
    }
    found
}

fn find_top_level(s: &str, target: char) -> Option<usize> {
    top_level_indices(s, target).into_iter().next()
}

fn split_top_level(s: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for idx in top_level_indices(s, separator) {
        parts.push(&s[start..idx]);
        start = idx + separator.len_utf8();
    }
    parts.push(&s[start..]);
    parts
}

/// Splits one string literal off the front of `s`, returning its raw
/// (still escaped) content and the remainder after the closing delimiter.
fn read_literal(s: &str) -> Option<(&str, &str)> {
    let delim = s.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let triple: String = [delim; 3].iter().collect();
    let open_len = if s.starts_with(&triple) { 3 } else { 1 };
    let body = &s[open_len..];

    let mut escaped = false;
    let mut run = 0;
    for (i, c) in body.char_indices() {
        if escaped {
            escaped = false;
            run = 0;
            continue;
        }
        match c {
            '\\' => {
                escaped = true;
                run = 0;
            }
            c if c == delim => {
                run += 1;
                if run == open_len {
                    let end = i + 1 - open_len;
                    return Some((&body[..end], &body[i + 1..]));
                }
            }
            '\n' if open_len == 1 => return None,
            _ => run = 0,
        }
    }
    None
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\n') => {}
            Some(other @ ('\\' | '"' | '\'')) => out.push(other),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// A single string literal spanning the whole of `s`, unescaped.
fn whole_literal(s: &str) -> Option<String> {
    let (raw, rest) = read_literal(s.trim())?;
    rest.trim().is_empty().then(|| unescape(raw))
}

fn parse_annotation(raw: &str) -> FieldType {
    let trimmed = raw.trim();
    let literal_body = trimmed
        .strip_prefix("typing.Literal")
        .or_else(|| trimmed.strip_prefix("Literal"))
        .map(str::trim_start)
        .and_then(|s| s.strip_prefix('['))
        .and_then(|s| s.strip_suffix(']'));

    if let Some(body) = literal_body {
        if let Some(values) = parse_literal_values(body) {
            return FieldType::Literal(values);
        }
        return FieldType::Opaque(trimmed.to_string());
    }

    FieldType::from_simple_annotation(trimmed)
        .unwrap_or_else(|| FieldType::Opaque(trimmed.to_string()))
}

fn parse_literal_values(body: &str) -> Option<Vec<String>> {
    let mut values = Vec::new();
    let mut rest = body.trim_start();
    while !rest.is_empty() {
        let (raw, after) = read_literal(rest)?;
        values.push(unescape(raw));
        let after = after.trim_start();
        rest = match after.strip_prefix(',') {
            Some(next) => next.trim_start(),
            None if after.is_empty() => after,
            None => return None,
        };
    }
    (!values.is_empty()).then_some(values)
}

fn parse_header(line: &LogicalLine) -> Result<String, SignatureError> {
    let malformed = |reason: &str| SignatureError::malformed(line.number, reason);

    let rest = line
        .text
        .strip_prefix("class")
        .filter(|r| r.starts_with(char::is_whitespace))
        .ok_or_else(|| malformed("expected a signature class header"))?;
    let (name, rest) = rest
        .split_once('(')
        .ok_or_else(|| malformed("class header has no base class"))?;
    let name = name.trim();
    if !is_identifier(name) {
        return Err(malformed(&format!("invalid class name '{name}'")));
    }
    let (base, tail) = rest
        .split_once(')')
        .ok_or_else(|| malformed("unclosed base class list"))?;
    if !matches!(base.trim(), "Signature" | "dspy.Signature") {
        return Err(malformed(&format!(
            "class '{name}' does not inherit from Signature"
        )));
    }
    if tail.trim() != ":" {
        return Err(malformed("expected ':' after the class header"));
    }
    Ok(name.to_string())
}

fn parse_docstring(line: &LogicalLine) -> Result<String, SignatureError> {
    let (raw, rest) = read_literal(&line.text)
        .ok_or_else(|| SignatureError::malformed(line.number, "unterminated docstring"))?;
    if !rest.trim().is_empty() {
        return Err(SignatureError::malformed(
            line.number,
            "unexpected text after the docstring",
        ));
    }

    let mut physical = raw.split('\n');
    let mut dedented = physical.next().unwrap_or_default().to_string();
    for next in physical {
        let strip = next
            .chars()
            .take(line.indent)
            .take_while(|c| *c == ' ' || *c == '\t')
            .count();
        dedented.push('\n');
        dedented.push_str(&next[strip..]);
    }
    Ok(unescape(&dedented).trim().to_string())
}

fn parse_field(line: &LogicalLine) -> Result<Field, SignatureError> {
    let text = line.text.as_str();
    let malformed = |reason: String| SignatureError::malformed(line.number, reason);

    let eq = find_top_level(text, '=').ok_or_else(|| {
        malformed(format!(
            "expected '<name>: <type> = InputField(...)', found '{text}'"
        ))
    })?;
    let colon = find_top_level(text, ':')
        .filter(|colon| *colon < eq)
        .ok_or_else(|| {
            malformed(format!(
                "field '{}' has no type annotation",
                text[..eq].trim()
            ))
        })?;

    let name = text[..colon].trim();
    if !is_identifier(name) {
        return Err(malformed(format!("invalid field name '{name}'")));
    }
    let annotation = text[colon + 1..eq].trim();
    if annotation.is_empty() {
        return Err(malformed(format!("field '{name}' has no type annotation")));
    }

    let value = text[eq + 1..].trim();
    let callee = value.strip_prefix("dspy.").unwrap_or(value);
    let (role, call) = if let Some(call) = callee.strip_prefix("InputField") {
        (FieldRole::Input, call)
    } else if let Some(call) = callee.strip_prefix("OutputField") {
        (FieldRole::Output, call)
    } else {
        return Err(malformed(format!(
            "field '{name}' must be an InputField or OutputField"
        )));
    };
    let args = call
        .trim()
        .strip_prefix('(')
        .and_then(|a| a.strip_suffix(')'))
        .ok_or_else(|| malformed(format!("field '{name}' has a malformed argument list")))?;

    let mut description = None;
    for arg in split_top_level(args, ',') {
        let arg = arg.trim();
        if arg.is_empty() {
            continue;
        }
        let eq = find_top_level(arg, '=').ok_or_else(|| {
            malformed(format!("field '{name}' has an unsupported positional argument"))
        })?;
        if arg[..eq].trim() == "desc" {
            if description.is_some() {
                return Err(malformed(format!("field '{name}' repeats the desc argument")));
            }
            let desc = whole_literal(&arg[eq + 1..]).ok_or_else(|| {
                malformed(format!("desc of field '{name}' must be a string literal"))
            })?;
            description = Some(desc);
        }
    }

    Ok(Field {
        name: name.to_string(),
        field_type: parse_annotation(annotation),
        description,
        role,
    })
}

fn is_import(text: &str) -> bool {
    text.starts_with("import ") || text.starts_with("from ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Header,
    Instruction,
    /// Class body after its first statement, before any field.
    Body,
    Fields(FieldRole),
}

struct Scanner {
    state: ScanState,
    name: String,
    instruction: Option<String>,
    fields: Vec<Field>,
}

impl Scanner {
    fn new() -> Self {
        Self {
            state: ScanState::Header,
            name: String::new(),
            instruction: None,
            fields: Vec::new(),
        }
    }

    fn step(&mut self, line: &LogicalLine) -> Result<(), SignatureError> {
        if self.state == ScanState::Header {
            if line.indent == 0 && is_import(&line.text) {
                return Ok(());
            }
            self.name = parse_header(line)?;
            self.state = ScanState::Instruction;
            return Ok(());
        }

        if line.indent == 0 {
            let reason = if line.text.starts_with("class ") {
                "more than one signature class"
            } else {
                "unexpected statement outside the class body"
            };
            return Err(SignatureError::malformed(line.number, reason));
        }

        if line.text == "pass" || line.text == "..." {
            if self.state == ScanState::Instruction {
                self.state = ScanState::Body;
            }
            return Ok(());
        }

        if line.text.starts_with('"') || line.text.starts_with('\'') {
            if self.state != ScanState::Instruction {
                return Err(SignatureError::malformed(
                    line.number,
                    "the docstring must be the first statement of the class",
                ));
            }
            self.instruction = Some(parse_docstring(line)?);
            self.state = ScanState::Body;
            return Ok(());
        }

        let field = parse_field(line)?;
        self.state = match (self.state, field.role) {
            (ScanState::Fields(FieldRole::Output), FieldRole::Input) => {
                return Err(SignatureError::malformed(
                    line.number,
                    format!("input field '{}' declared after the output fields", field.name),
                ));
            }
            (ScanState::Fields(_), role) => ScanState::Fields(role),
            (_, FieldRole::Input) => ScanState::Fields(FieldRole::Input),
            (_, FieldRole::Output) => {
                return Err(SignatureError::malformed(
                    line.number,
                    format!(
                        "output field '{}' declared before any input field",
                        field.name
                    ),
                ));
            }
        };
        self.fields.push(field);
        Ok(())
    }

    fn finish(self) -> Result<Signature, SignatureError> {
        let missing = match self.state {
            ScanState::Header => "no signature class header found",
            ScanState::Instruction | ScanState::Body => "no InputField declarations found",
            ScanState::Fields(FieldRole::Input) => "no OutputField declarations found",
            ScanState::Fields(FieldRole::Output) => {
                return Signature::new(
                    self.name,
                    self.instruction.unwrap_or_default(),
                    self.fields,
                );
            }
        };
        Err(SignatureError::MalformedSignatureText(missing.to_string()))
    }
}

/// Parses the text of a single signature class declaration.
pub fn parse_signature(src: &str) -> Result<Signature, SignatureError> {
    let mut scanner = Scanner::new();
    for line in logical_lines(src)? {
        scanner.step(&line)?;
    }
    let signature = scanner.finish()?;
    log::debug!(
        "Parsed signature '{}': inputs={:?} outputs={:?}",
        signature.name(),
        signature.input_names(),
        signature.output_names()
    );
    Ok(signature)
}
