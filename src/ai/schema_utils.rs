use schemars::{schema_for, JsonSchema};
use serde_json::{json, Map, Value};

/// Keywords the provider's response-schema dialect rejects.
const STRIPPED_KEYS: &[&str] = &[
    "$schema",
    "$id",
    "title",
    "default",
    "examples",
    "additionalProperties",
    "definitions",
    "$defs",
];

const MAX_DEPTH: usize = 16;

/// JSON schema for `T` with every reference inlined and unsupported keywords
/// removed, suitable as a `responseSchema`.
pub fn response_schema<T: JsonSchema>() -> serde_json::Result<Value> {
    let mut root = serde_json::to_value(schema_for!(T))?;

    let definitions = match &mut root {
        Value::Object(map) => map.remove("definitions").or_else(|| map.remove("$defs")),
        _ => None,
    };
    let definitions = match definitions {
        Some(Value::Object(defs)) => defs,
        _ => Map::new(),
    };

    inline_node(&mut root, &definitions, 0);
    Ok(root)
}

fn inline_node(node: &mut Value, definitions: &Map<String, Value>, depth: usize) {
    if depth > MAX_DEPTH {
        *node = json!({ "type": "object", "nullable": true });
        return;
    }

    let map = match node {
        Value::Object(map) => map,
        Value::Array(items) => {
            for item in items {
                inline_node(item, definitions, depth + 1);
            }
            return;
        }
        _ => return,
    };

    // A described reference comes out as a single-entry `allOf`.
    if matches!(map.get("allOf"), Some(Value::Array(list)) if list.len() == 1) {
        if let Some(Value::Array(mut list)) = map.remove("allOf") {
            if let Some(Value::Object(inner)) = list.pop() {
                for (key, value) in inner {
                    map.entry(key).or_insert(value);
                }
            }
        }
    }

    if let Some(Value::String(reference)) = map.remove("$ref") {
        let name = reference.rsplit('/').next().unwrap_or_default();
        match definitions.get(name) {
            Some(Value::Object(def)) => {
                for (key, value) in def {
                    map.entry(key.clone()).or_insert_with(|| value.clone());
                }
            }
            _ => {
                map.insert("type".into(), json!("object"));
            }
        }
    }

    for key in STRIPPED_KEYS {
        map.remove(*key);
    }

    // ["string", "null"] becomes "string" plus `nullable`.
    let collapsed = match map.get("type") {
        Some(Value::Array(types)) => {
            let nullable = types.iter().any(|t| t == "null");
            types
                .iter()
                .find(|t| *t != "null")
                .cloned()
                .map(|concrete| (concrete, nullable))
        }
        _ => None,
    };
    if let Some((concrete, nullable)) = collapsed {
        map.insert("type".into(), concrete);
        if nullable {
            map.insert("nullable".into(), json!(true));
        }
    }

    if let Some(Value::Object(props)) = map.get_mut("properties") {
        for value in props.values_mut() {
            inline_node(value, definitions, depth + 1);
        }
    }
    for key in ["items", "anyOf", "oneOf", "allOf"] {
        if let Some(value) = map.get_mut(key) {
            inline_node(value, definitions, depth + 1);
        }
    }
}
