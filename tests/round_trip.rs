use signaturize::{from_dspy_string, Field, FieldType, Signature, SignatureError};

fn round_trip(sig: &Signature) {
    let text = sig.to_canonical_string();
    let parsed = from_dspy_string(&text)
        .unwrap_or_else(|e| panic!("failed to parse rendered text:\n{text}\nerror: {e}"));
    assert_eq!(&parsed, sig, "canonical text was:\n{text}");

    let module = sig.to_module_string();
    let parsed = from_dspy_string(&module)
        .unwrap_or_else(|e| panic!("failed to parse module text:\n{module}\nerror: {e}"));
    assert_eq!(&parsed, sig, "module text was:\n{module}");
}

#[test]
fn qa_signature_round_trips() {
    let src = r#"class Qa(Signature):
    """Answer the question."""
    question: str = InputField(desc="the question")
    answer: str = OutputField(desc="the answer")
"#;
    let sig = from_dspy_string(src).unwrap();
    assert_eq!(sig.to_canonical_string(), src);
    round_trip(&sig);
}

#[test]
fn every_known_type_round_trips() {
    let types = vec![
        FieldType::Text,
        FieldType::Integer,
        FieldType::Float,
        FieldType::Boolean,
        FieldType::ListText,
        FieldType::ListInteger,
        FieldType::ListFloat,
        FieldType::DictTextText,
        FieldType::DictTextInteger,
        FieldType::DictTextAny,
        FieldType::Image,
        FieldType::Audio,
        FieldType::OptionalText,
        FieldType::OptionalInteger,
        FieldType::OptionalFloat,
        FieldType::Literal(vec!["yes".into(), "no".into(), "it's unclear".into()]),
        FieldType::Opaque("np.ndarray".into()),
    ];

    let mut fields: Vec<Field> = types
        .iter()
        .enumerate()
        .map(|(i, ty)| Field::input(format!("in_{i}"), ty.clone()).with_desc(format!("input {i}")))
        .collect();
    fields.extend(
        types
            .iter()
            .enumerate()
            .map(|(i, ty)| Field::output(format!("out_{i}"), ty.clone())),
    );

    let sig = Signature::new("Everything", "Exercise every annotation.", fields).unwrap();
    round_trip(&sig);
}

#[test]
fn field_order_is_preserved() {
    let sig = Signature::new(
        "Ordered",
        "Keep the order.",
        vec![
            Field::input("zeta", FieldType::Text),
            Field::input("alpha", FieldType::Text),
            Field::input("mu", FieldType::Integer),
            Field::output("omega", FieldType::Text),
            Field::output("beta", FieldType::Boolean),
        ],
    )
    .unwrap();

    let parsed = from_dspy_string(&sig.to_string()).unwrap();
    assert_eq!(parsed.input_names(), vec!["zeta", "alpha", "mu"]);
    assert_eq!(parsed.output_names(), vec!["omega", "beta"]);
}

#[test]
fn awkward_text_round_trips() {
    let sig = Signature::new(
        "Awkward",
        "Handle \"quoted\" text, back\\slashes and \"\"\"triples\"\"\".\n\n  Indented note.\r\nWindows line ending.\nEnds with a quote\"",
        vec![
            Field::input("raw", FieldType::Text)
                .with_desc("tabs\there, newlines\nthere, 'single' and \"double\" quotes, a # hash"),
            Field::input("empty_desc", FieldType::Text).with_desc(""),
            Field::output("cooked", FieldType::Text).with_desc("C:\\path\\to\\file"),
        ],
    )
    .unwrap();
    round_trip(&sig);
}

#[test]
fn escaped_carriage_return_in_docstring_round_trips() {
    let src = concat!(
        "class Crlf(Signature):\n",
        "    \"\"\"line one\\r\\nline two\"\"\"\n",
        "    a: str = InputField()\n",
        "    b: str = OutputField()\n",
    );
    let sig = from_dspy_string(src).unwrap();
    assert_eq!(sig.instruction(), "line one\r\nline two");
    round_trip(&sig);
}

#[test]
fn missing_instruction_round_trips_as_empty() {
    let sig = Signature::new(
        "Bare",
        "",
        vec![
            Field::input("a", FieldType::Integer),
            Field::output("b", FieldType::Integer),
        ],
    )
    .unwrap();
    round_trip(&sig);
    assert_eq!(from_dspy_string(&sig.to_string()).unwrap().instruction(), "");
}

#[test]
fn group_markers_are_required() {
    let no_fields = "class Qa(Signature):\n    \"\"\"Nothing here.\"\"\"\n";
    assert!(matches!(
        from_dspy_string(no_fields),
        Err(SignatureError::MalformedSignatureText(_))
    ));

    let duplicated = concat!(
        "class Qa(Signature):\n",
        "    context: str = InputField()\n",
        "    question: str = OutputField(desc=\"first\")\n",
        "    question: str = OutputField(desc=\"second\")\n",
    );
    assert!(matches!(
        from_dspy_string(duplicated),
        Err(SignatureError::DuplicateFieldName { .. })
    ));
}
