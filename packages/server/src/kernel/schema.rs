//! JSON schemas for OpenAI strict structured outputs and tool parameters.
//!
//! Strict mode wants every object closed (`additionalProperties: false`),
//! every property listed in `required`, and no `$ref` indirection.

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Types the model can be asked to produce.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    fn openai_schema() -> Value {
        strict_schema::<Self>()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Generate a strict-mode schema for any `JsonSchema` type.
pub fn strict_schema<T: JsonSchema + ?Sized>() -> Value {
    let mut value = serde_json::to_value(schema_for!(T)).unwrap_or_default();

    let definitions = value
        .as_object_mut()
        .and_then(|root| root.remove("definitions"))
        .unwrap_or(Value::Null);

    resolve(&mut value, &definitions);

    if let Value::Object(root) = &mut value {
        root.remove("$schema");
    }
    value
}

fn resolve(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(target) = ref_target(map, definitions) {
                *value = target;
                resolve(value, definitions);
                return;
            }
            close_object(map);
            for (_, child) in map.iter_mut() {
                resolve(child, definitions);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| resolve(v, definitions)),
        _ => {}
    }
}

fn ref_target(map: &Map<String, Value>, definitions: &Value) -> Option<Value> {
    let path = map.get("$ref")?.as_str()?;
    let name = path.strip_prefix("#/definitions/")?;
    definitions.get(name).cloned()
}

fn close_object(map: &mut Map<String, Value>) {
    if map.get("type").and_then(Value::as_str) != Some("object") {
        return;
    }
    map.insert("additionalProperties".into(), Value::Bool(false));

    let keys: Vec<Value> = map
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| props.keys().cloned().map(Value::String).collect())
        .unwrap_or_default();
    map.insert("required".into(), Value::Array(keys));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct Citation {
        law: String,
        article: Option<String>,
    }

    #[derive(Deserialize, JsonSchema)]
    struct Answer {
        text: String,
        citations: Vec<Citation>,
    }

    #[test]
    fn optional_fields_are_required() {
        let schema = Citation::openai_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();

        assert!(required.contains(&"law"));
        assert!(required.contains(&"article"));
        assert_eq!(schema["additionalProperties"], Value::Bool(false));
    }

    #[test]
    fn nested_types_are_inlined() {
        let schema = Answer::openai_schema();
        let text = serde_json::to_string(&schema).unwrap();

        assert!(!text.contains("$ref"));
        assert!(schema.get("definitions").is_none());
        assert!(schema.get("$schema").is_none());

        let item = &schema["properties"]["citations"]["items"];
        assert_eq!(item["type"], "object");
        assert_eq!(item["additionalProperties"], Value::Bool(false));
    }
}
