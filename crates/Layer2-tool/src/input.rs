//! Tool input - raw string or structured object
//!
//! 모델은 `"input": "Paris"` 와 `"input": {"city": "Paris"}` 를 섞어서 보낸다.
//! 심지어 `"input": "{\"city\": \"Paris\"}"` 처럼 문자열 안에 객체를 넣기도 한다.
//! 도구는 `field_str` / `to_object` 로 어느 쪽이든 같은 형태로 받는다.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Input passed to a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum ToolInput {
    Text(String),
    Object(Map<String, Value>),
}

impl Default for ToolInput {
    fn default() -> Self {
        ToolInput::Text(String::new())
    }
}

impl ToolInput {
    pub fn text(text: impl Into<String>) -> Self {
        ToolInput::Text(text.into())
    }

    /// 표시/로그용 텍스트 (객체는 compact JSON)
    pub fn as_text(&self) -> String {
        match self {
            ToolInput::Text(text) => text.clone(),
            ToolInput::Object(map) => Value::Object(map.clone()).to_string(),
        }
    }

    /// 객체 형태로 정규화
    ///
    /// - 객체는 그대로
    /// - 문자열에 담긴 JSON 객체는 파싱해서 사용
    /// - 그 외 문자열은 `{ default_key: text }`
    pub fn to_object(&self, default_key: &str) -> Map<String, Value> {
        match self {
            ToolInput::Object(map) => map.clone(),
            ToolInput::Text(text) => match serde_json::from_str::<Value>(text.trim()) {
                Ok(Value::Object(map)) => map,
                _ => {
                    let mut map = Map::new();
                    map.insert(default_key.to_string(), Value::String(text.clone()));
                    map
                }
            },
        }
    }

    /// 필드를 문자열로 꺼내기. 원시 문자열 입력은 `key` 필드로 취급한다
    ///
    /// 숫자나 불리언 필드는 텍스트로 바꾼다. 비어 있으면 `None`.
    pub fn field_str(&self, key: &str) -> Option<String> {
        let value = self.to_object(key).remove(key)?;
        let text = match value {
            Value::String(s) => s,
            Value::Null => return None,
            other => other.to_string(),
        };
        let text = text.trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}

impl From<Value> for ToolInput {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => ToolInput::Text(text),
            Value::Object(map) => ToolInput::Object(map),
            Value::Null => ToolInput::default(),
            other => ToolInput::Text(other.to_string()),
        }
    }
}

impl From<ToolInput> for Value {
    fn from(input: ToolInput) -> Self {
        match input {
            ToolInput::Text(text) => Value::String(text),
            ToolInput::Object(map) => Value::Object(map),
        }
    }
}

impl From<&str> for ToolInput {
    fn from(text: &str) -> Self {
        ToolInput::Text(text.to_string())
    }
}

impl std::fmt::Display for ToolInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_shapes() {
        assert_eq!(ToolInput::from(json!("Paris")), ToolInput::text("Paris"));
        assert_eq!(ToolInput::from(json!(null)), ToolInput::text(""));
        assert_eq!(ToolInput::from(json!(42)), ToolInput::text("42"));
        assert_eq!(ToolInput::from(json!(["a", "b"])), ToolInput::text(r#"["a","b"]"#));
        assert!(matches!(ToolInput::from(json!({ "city": "Paris" })), ToolInput::Object(_)));
    }

    #[test]
    fn test_field_str_accepts_all_shapes() {
        let raw = ToolInput::text("Paris");
        let object = ToolInput::from(json!({ "city": "Paris" }));
        let encoded = ToolInput::text(r#"{"city": "Paris"}"#);

        for input in [raw, object, encoded] {
            assert_eq!(input.field_str("city").as_deref(), Some("Paris"));
        }
    }

    #[test]
    fn test_field_str_missing_or_blank() {
        assert_eq!(ToolInput::text("   ").field_str("city"), None);
        assert_eq!(
            ToolInput::from(json!({ "town": "Paris" })).field_str("city"),
            None
        );
        assert_eq!(
            ToolInput::from(json!({ "count": 3 })).field_str("count").as_deref(),
            Some("3")
        );
    }

    #[test]
    fn test_to_object_default_key() {
        let map = ToolInput::text("ls -la").to_object("command");
        assert_eq!(map.get("command"), Some(&json!("ls -la")));
    }

    #[test]
    fn test_serde_transparent() {
        let input: ToolInput = serde_json::from_str(r#"{"path":"a.txt","content":"hi"}"#).unwrap();
        assert_eq!(serde_json::to_string(&input).unwrap(), r#"{"content":"hi","path":"a.txt"}"#);

        let input: ToolInput = serde_json::from_str(r#""Paris""#).unwrap();
        assert_eq!(serde_json::to_string(&input).unwrap(), r#""Paris""#);
    }
}
