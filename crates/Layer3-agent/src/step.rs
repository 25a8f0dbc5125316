//! Step - one unit of the JSON step protocol
//!
//! 모델은 매 턴마다 정확히 하나의 step을 출력한다:
//! - `{"step": "think", "content": "..."}`
//! - `{"step": "action", "tool": "getWeatherInfo", "input": "Paris"}`
//! - `{"step": "observe", "content": "..."}`  (도구 결과, 루프가 직접 만든다)
//! - `{"step": "output", "content": "..."}`

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use stepwise_tool::ToolInput;

/// A single protocol step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "lowercase")]
pub enum Step {
    /// Intermediate reasoning
    Think {
        #[serde(default)]
        content: String,
    },

    /// Tool invocation request
    Action {
        tool: String,
        #[serde(default)]
        input: ToolInput,
    },

    /// Tool result fed back to the model
    Observe {
        #[serde(default)]
        content: String,
    },

    /// Final answer, ends the turn
    Output { content: String },
}

/// Step tag without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    Think,
    Action,
    Observe,
    Output,
}

impl StepKind {
    pub const ALL: [StepKind; 4] = [
        StepKind::Think,
        StepKind::Action,
        StepKind::Observe,
        StepKind::Output,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Think => "think",
            StepKind::Action => "action",
            StepKind::Observe => "observe",
            StepKind::Output => "output",
        }
    }

    /// 태그 매칭은 대소문자/공백 무시
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(tag))
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Step {
    pub fn think(content: impl Into<String>) -> Self {
        Step::Think {
            content: content.into(),
        }
    }

    pub fn action(tool: impl Into<String>, input: impl Into<ToolInput>) -> Self {
        Step::Action {
            tool: tool.into(),
            input: input.into(),
        }
    }

    pub fn observe(content: impl Into<String>) -> Self {
        Step::Observe {
            content: content.into(),
        }
    }

    pub fn output(content: impl Into<String>) -> Self {
        Step::Output {
            content: content.into(),
        }
    }

    pub fn kind(&self) -> StepKind {
        match self {
            Step::Think { .. } => StepKind::Think,
            Step::Action { .. } => StepKind::Action,
            Step::Observe { .. } => StepKind::Observe,
            Step::Output { .. } => StepKind::Output,
        }
    }

    /// Wire form of the step
    pub fn to_value(&self) -> Value {
        match self {
            Step::Think { content } => json!({ "step": "think", "content": content }),
            Step::Action { tool, input } => {
                json!({ "step": "action", "tool": tool, "input": Value::from(input.clone()) })
            }
            Step::Observe { content } => json!({ "step": "observe", "content": content }),
            Step::Output { content } => json!({ "step": "output", "content": content }),
        }
    }

    /// Compact JSON text, the form appended to the conversation
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_tag() {
        assert_eq!(StepKind::from_tag("think"), Some(StepKind::Think));
        assert_eq!(StepKind::from_tag(" ACTION "), Some(StepKind::Action));
        assert_eq!(StepKind::from_tag("Output"), Some(StepKind::Output));
        assert_eq!(StepKind::from_tag("start"), None);
        assert_eq!(StepKind::from_tag(""), None);
    }

    #[test]
    fn test_observe_wire_form() {
        let step = Step::observe("Paris has 43 Degree C");
        assert_eq!(
            step.to_json(),
            r#"{"content":"Paris has 43 Degree C","step":"observe"}"#
        );
    }

    #[test]
    fn test_action_serde() {
        let step: Step = serde_json::from_value(json!({
            "step": "action",
            "tool": "writeFile",
            "input": { "path": "a.txt", "content": "x" }
        }))
        .unwrap();

        match &step {
            Step::Action { tool, input } => {
                assert_eq!(tool, "writeFile");
                assert_eq!(input.field_str("path").as_deref(), Some("a.txt"));
            }
            other => panic!("unexpected step: {:?}", other),
        }
        assert_eq!(serde_json::from_value::<Step>(step.to_value()).unwrap(), step);
    }

    #[test]
    fn test_action_without_input() {
        let step: Step =
            serde_json::from_str(r#"{"step":"action","tool":"getWeatherInfo"}"#).unwrap();
        assert_eq!(step, Step::action("getWeatherInfo", ""));
    }
}
