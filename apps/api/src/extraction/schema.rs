//! Declarative output schemas: rendered into prompts and enforced on responses.

use serde_json::{json, Map, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
enum SchemaKind {
    String,
    Number,
    Array(Box<ResponseSchema>),
    Object {
        properties: Vec<(String, ResponseSchema)>,
        required: Vec<String>,
    },
    /// Object with free-form keys, every value of one type.
    Map(Box<ResponseSchema>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSchema {
    kind: SchemaKind,
    description: Option<String>,
}

/// First place a value departs from its schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaViolation {
    pub path: String,
    pub reason: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

impl ResponseSchema {
    fn of(kind: SchemaKind) -> Self {
        Self {
            kind,
            description: None,
        }
    }

    pub fn string() -> Self {
        Self::of(SchemaKind::String)
    }

    pub fn number() -> Self {
        Self::of(SchemaKind::Number)
    }

    pub fn array(items: ResponseSchema) -> Self {
        Self::of(SchemaKind::Array(Box::new(items)))
    }

    pub fn string_array() -> Self {
        Self::array(Self::string())
    }

    pub fn map(values: ResponseSchema) -> Self {
        Self::of(SchemaKind::Map(Box::new(values)))
    }

    pub fn object<'a>(
        properties: impl IntoIterator<Item = (&'a str, ResponseSchema)>,
        required: &[&str],
    ) -> Self {
        Self::of(SchemaKind::Object {
            properties: properties
                .into_iter()
                .map(|(name, schema)| (name.to_string(), schema))
                .collect(),
            required: required.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Value an empty response stands for: `{}` for objects, `[]` for arrays.
    pub fn empty_value(&self) -> Value {
        match self.kind {
            SchemaKind::Object { .. } | SchemaKind::Map(_) => Value::Object(Map::new()),
            SchemaKind::Array(_) => Value::Array(Vec::new()),
            _ => Value::Null,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut value = match &self.kind {
            SchemaKind::String => json!({ "type": "string" }),
            SchemaKind::Number => json!({ "type": "number" }),
            SchemaKind::Array(items) => json!({ "type": "array", "items": items.to_json() }),
            SchemaKind::Object {
                properties,
                required,
            } => {
                let props: Map<String, Value> = properties
                    .iter()
                    .map(|(name, schema)| (name.clone(), schema.to_json()))
                    .collect();
                json!({ "type": "object", "properties": props, "required": required })
            }
            SchemaKind::Map(values) => {
                json!({ "type": "object", "additionalProperties": values.to_json() })
            }
        };
        if let (Some(desc), Some(obj)) = (&self.description, value.as_object_mut()) {
            obj.insert("description".to_string(), Value::String(desc.clone()));
        }
        value
    }

    pub fn to_prompt_json(&self) -> String {
        let value = self.to_json();
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
    }

    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolation> {
        self.validate_at(value, "$")
    }

    fn validate_at(&self, value: &Value, path: &str) -> Result<(), SchemaViolation> {
        let violation = |reason: String| SchemaViolation {
            path: path.to_string(),
            reason,
        };

        match &self.kind {
            SchemaKind::String if !value.is_string() => {
                Err(violation(format!("expected string, got {}", type_name(value))))
            }
            SchemaKind::Number if !value.is_number() => {
                Err(violation(format!("expected number, got {}", type_name(value))))
            }
            SchemaKind::Array(items) => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| violation(format!("expected array, got {}", type_name(value))))?;
                for (i, item) in arr.iter().enumerate() {
                    items.validate_at(item, &format!("{path}[{i}]"))?;
                }
                Ok(())
            }
            SchemaKind::Object {
                properties,
                required,
            } => {
                let obj = value.as_object().ok_or_else(|| {
                    violation(format!("expected object, got {}", type_name(value)))
                })?;
                for field in required {
                    if obj.get(field).map_or(true, Value::is_null) {
                        return Err(violation(format!("missing required field `{field}`")));
                    }
                }
                for (name, schema) in properties {
                    match obj.get(name) {
                        Some(v) if !v.is_null() => {
                            schema.validate_at(v, &format!("{path}.{name}"))?
                        }
                        _ => {}
                    }
                }
                Ok(())
            }
            SchemaKind::Map(values) => {
                let obj = value.as_object().ok_or_else(|| {
                    violation(format!("expected object, got {}", type_name(value)))
                })?;
                for (key, v) in obj {
                    values.validate_at(v, &format!("{path}.{key}"))?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> ResponseSchema {
        ResponseSchema::object(
            [
                ("name", ResponseSchema::string()),
                ("age", ResponseSchema::number()),
                ("tags", ResponseSchema::string_array()),
            ],
            &["name", "tags"],
        )
    }

    #[test]
    fn test_valid_object_passes() {
        let value = json!({"name": "Ada", "age": 36, "tags": ["math"]});
        assert!(person().validate(&value).is_ok());
    }

    #[test]
    fn test_optional_field_may_be_absent_or_null() {
        assert!(person().validate(&json!({"name": "Ada", "tags": []})).is_ok());
        assert!(person()
            .validate(&json!({"name": "Ada", "age": null, "tags": []}))
            .is_ok());
    }

    #[test]
    fn test_empty_object_reports_missing_required_field() {
        let err = person().validate(&person().empty_value()).unwrap_err();
        assert_eq!(err.path, "$");
        assert_eq!(err.reason, "missing required field `name`");
    }

    #[test]
    fn test_null_required_field_is_missing() {
        let err = person()
            .validate(&json!({"name": null, "tags": []}))
            .unwrap_err();
        assert!(err.reason.contains("`name`"));
    }

    #[test]
    fn test_nested_type_mismatch_reports_path() {
        let schema = ResponseSchema::array(person());
        let value = json!([
            {"name": "Ada", "tags": []},
            {"name": "Grace", "tags": ["navy", 7]}
        ]);
        let err = schema.validate(&value).unwrap_err();
        assert_eq!(err.path, "$[1].tags[1]");
        assert_eq!(err.reason, "expected string, got number");
    }

    #[test]
    fn test_number_accepts_integers_and_floats() {
        assert!(ResponseSchema::number().validate(&json!(5)).is_ok());
        assert!(ResponseSchema::number().validate(&json!(5.5)).is_ok());
        let err = ResponseSchema::number().validate(&json!(true)).unwrap_err();
        assert_eq!(err.reason, "expected number, got boolean");
    }

    #[test]
    fn test_map_validates_every_value() {
        let schema = ResponseSchema::map(ResponseSchema::string());
        assert!(schema.validate(&json!({"why_us": "..."})).is_ok());
        let err = schema.validate(&json!({"why_us": 3})).unwrap_err();
        assert_eq!(err.path, "$.why_us");
    }

    #[test]
    fn test_empty_value_by_root_kind() {
        assert_eq!(ResponseSchema::array(person()).empty_value(), json!([]));
        assert_eq!(person().empty_value(), json!({}));
        assert_eq!(ResponseSchema::string().empty_value(), Value::Null);
    }

    #[test]
    fn test_to_json_renders_required_and_descriptions() {
        let schema = ResponseSchema::object(
            [("url", ResponseSchema::string().describe("Direct listing URL"))],
            &["url"],
        );
        let json = schema.to_json();
        assert_eq!(json["type"], "object");
        assert_eq!(json["required"], json!(["url"]));
        assert_eq!(json["properties"]["url"]["description"], "Direct listing URL");
    }
}
