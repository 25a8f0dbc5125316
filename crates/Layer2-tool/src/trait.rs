//! Tool trait and related types

use crate::{ToolError, ToolInput};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Definition of a tool, rendered into the system prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDef {
    /// Tool name (unique identifier)
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// Declared input fields
    pub params: Vec<ToolParam>,

    /// Whether a bare string is accepted in place of an object
    pub accepts_text: bool,
}

/// A declared input field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParam {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
    pub required: bool,
}

impl ToolDef {
    /// Create a new tool definition builder
    pub fn builder(name: impl Into<String>, description: impl Into<String>) -> ToolDefBuilder {
        ToolDefBuilder::new(name, description)
    }

    /// `getWeatherInfo(city: string): string` 형태의 시그니처
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                let optional = if p.required { "" } else { "?" };
                format!("{}{}: {}", p.name, optional, p.param_type)
            })
            .collect();
        format!("{}({}): string", self.name, params.join(", "))
    }

    /// 프롬프트에 넣을 입력 형태 설명
    pub fn input_hint(&self) -> String {
        match (self.accepts_text, self.params.as_slice()) {
            (_, []) => "\"input\": \"\"".to_string(),
            (true, [only]) => format!(
                "\"input\": \"<{}>\" or {{ \"{}\": \"...\" }}",
                only.name, only.name
            ),
            _ => {
                let fields: Vec<String> = self
                    .params
                    .iter()
                    .map(|p| format!("\"{}\": <{}>", p.name, p.param_type))
                    .collect();
                format!("\"input\": {{ {} }}", fields.join(", "))
            }
        }
    }
}

/// Builder for ToolDef
pub struct ToolDefBuilder {
    name: String,
    description: String,
    params: Vec<ToolParam>,
    accepts_text: bool,
}

impl ToolDefBuilder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: vec![],
            accepts_text: false,
        }
    }

    /// Add a string parameter
    pub fn string_param(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.param(name, "string", description, required)
    }

    /// Add an integer parameter
    pub fn integer_param(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.param(name, "integer", description, required)
    }

    fn param(
        mut self,
        name: impl Into<String>,
        param_type: &str,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.params.push(ToolParam {
            name: name.into(),
            param_type: param_type.to_string(),
            description: description.into(),
            required,
        });
        self
    }

    /// Accept a bare string as the first parameter
    pub fn accepts_text(mut self) -> Self {
        self.accepts_text = true;
        self
    }

    /// Build the ToolDef
    pub fn build(self) -> ToolDef {
        ToolDef {
            name: self.name,
            description: self.description,
            params: self.params,
            accepts_text: self.accepts_text,
        }
    }
}

/// Tool trait - implement this to create a new tool
///
/// 성공하면 텍스트 결과, 실패하면 사람이 읽을 수 있는 `ToolError`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool definition
    fn definition(&self) -> ToolDef;

    /// Execute the tool with the given input
    async fn execute(&self, input: ToolInput) -> Result<String, ToolError>;

    /// 이 입력에 대해 도구가 스스로 거는 실행 제한 시간
    ///
    /// 호출자의 기본 제한보다 길면 호출자는 이 값을 따라야 한다.
    fn time_limit(&self, _input: &ToolInput) -> Option<Duration> {
        None
    }

    /// Get the tool name (convenience method)
    fn name(&self) -> String {
        self.definition().name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature() {
        let def = ToolDef::builder("writeFile", "Write a file")
            .string_param("path", "Target path", true)
            .string_param("content", "File content", true)
            .integer_param("mode", "Unix mode", false)
            .build();
        assert_eq!(
            def.signature(),
            "writeFile(path: string, content: string, mode?: integer): string"
        );
    }

    #[test]
    fn test_input_hint() {
        let single = ToolDef::builder("getWeatherInfo", "Weather")
            .string_param("city", "City name", true)
            .accepts_text()
            .build();
        assert_eq!(
            single.input_hint(),
            r#""input": "<city>" or { "city": "..." }"#
        );

        let object = ToolDef::builder("writeFile", "Write")
            .string_param("path", "Target path", true)
            .string_param("content", "File content", true)
            .build();
        assert_eq!(
            object.input_hint(),
            r#""input": { "path": <string>, "content": <string> }"#
        );
    }
}
