//! System prompt for the JSON step protocol
//!
//! 모델에게 한 번에 하나의 step만, JSON으로만 출력하라고 지시한다.
//! 도구 목록은 `ToolRegistry`의 정의에서 만든다.

use crate::step::Step;
use serde_json::Value;
use stepwise_tool::ToolDef;

/// 예시 대화 (few-shot)
#[derive(Debug, Clone)]
pub struct PromptExample {
    pub query: String,
    pub steps: Vec<Step>,
}

impl PromptExample {
    pub fn new(query: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            query: query.into(),
            steps,
        }
    }

    /// 날씨 도구 예시
    pub fn weather() -> Self {
        Self::new(
            "What is the weather of Patiala?",
            vec![
                Step::think("The user is asking for the weather of Patiala."),
                Step::think("From the available tools, I must call getWeatherInfo with patiala as input."),
                Step::action("getWeatherInfo", "patiala"),
                Step::observe("patiala has 43 Degree C"),
                Step::think("The output of getWeatherInfo for patiala is 43 Degree C."),
                Step::output("The weather of Patiala is 43 Degree C, which is quite hot."),
            ],
        )
    }
}

/// System prompt 생성기
#[derive(Debug, Clone)]
pub struct SystemPromptBuilder {
    /// 초기 지시문
    instruction: String,
    /// 추가 규칙
    rules: Vec<String>,
    /// 예시
    examples: Vec<PromptExample>,
    /// 도구 정의
    tools: Vec<ToolDef>,
}

impl Default for SystemPromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemPromptBuilder {
    pub fn new() -> Self {
        Self {
            instruction: Self::default_instruction(),
            rules: Self::default_rules(),
            examples: vec![PromptExample::weather()],
            tools: Vec::new(),
        }
    }

    fn default_instruction() -> String {
        r#"You are a helpful AI assistant that resolves the user's query step by step.
You work in THINK, ACTION, OBSERVE and OUTPUT steps.

The user gives you a query.
Then you THINK about how to resolve it, as many times as needed, until you are sure all inputs are known.
If a tool is needed, you emit an ACTION step with the tool name and its input.
After an ACTION, wait for the OBSERVE step that carries the tool's result.
Based on the OBSERVE, either continue thinking or emit the final OUTPUT."#
            .to_string()
    }

    fn default_rules() -> Vec<String> {
        vec![
            "Always output exactly one step, then wait for the next one.".to_string(),
            "Output must be a single strict JSON object with no text around it.".to_string(),
            "Only call tools listed under Available Tools.".to_string(),
            "Never emit an observe step yourself; observations come from the tools.".to_string(),
        ]
    }

    /// 커스텀 지시문 설정
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// 규칙 추가
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rules.push(rule.into());
        self
    }

    /// 예시 교체
    pub fn with_examples(mut self, examples: Vec<PromptExample>) -> Self {
        self.examples = examples;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDef>) -> Self {
        self.tools = tools;
        self
    }

    /// 전체 프롬프트 생성
    pub fn build(&self) -> String {
        let mut prompt = self.instruction.clone();

        prompt.push_str("\n\nRules:\n");
        for rule in &self.rules {
            prompt.push_str(&format!("- {}\n", rule));
        }

        prompt.push_str("\nAvailable Tools:\n");
        if self.tools.is_empty() {
            prompt.push_str("- (none)\n");
        }
        for tool in &self.tools {
            prompt.push_str(&format!("- {}\n", tool.signature()));
            prompt.push_str(&format!("  {}\n", tool.description));
            prompt.push_str(&format!("  {}\n", tool.input_hint()));
        }

        for example in &self.examples {
            prompt.push_str("\nExample:\n");
            prompt.push_str(&format!(
                "{{ \"role\": \"user\", \"content\": {} }}\n",
                quote(&example.query)
            ));
            for step in &example.steps {
                prompt.push_str(&render_step(step));
                prompt.push('\n');
            }
        }

        prompt.push_str("\nOutput Format:\n");
        prompt.push_str(STEP_FORMAT);
        prompt.push('\n');

        prompt
    }
}

/// Step JSON 형태
pub const STEP_FORMAT: &str =
    r#"{ "step": "think" | "action" | "observe" | "output", "tool": "string", "input": "string" | object, "content": "string" }"#;

/// JSON 복구 요청용 system prompt
///
/// 대화 기록 없이 단독으로 보낸다.
pub fn repair_prompt() -> String {
    format!(
        r#"You fix malformed JSON produced by another assistant.
Reply with exactly one JSON object and nothing else: no prose, no code fences.
The object must have this shape:
{}
"step" is required. "tool" is required when "step" is "action". "content" is required when "step" is "output".
Keep the original meaning; do not invent new content."#,
        STEP_FORMAT
    )
}

/// 복구 요청 본문
pub fn repair_request(invalid_output: &str, reason: &str) -> String {
    format!(
        "Your previous response could not be parsed: {}\n\nInvalid output:\n{}\n\nReply with the single corrected JSON object.",
        reason, invalid_output
    )
}

/// 모델이 observe를 직접 출력했을 때 다시 요청하는 메시지
pub const OBSERVE_NUDGE: &str =
    "Observe steps come only from tool results. Continue with a think, action or output step.";

/// step 필드를 앞에 두는 예시용 표현 (`to_json`은 키 순서가 정렬된다)
fn render_step(step: &Step) -> String {
    match step {
        Step::Think { content } => format!("{{ \"step\": \"think\", \"content\": {} }}", quote(content)),
        Step::Action { tool, input } => format!(
            "{{ \"step\": \"action\", \"tool\": {}, \"input\": {} }}",
            quote(tool),
            Value::from(input.clone())
        ),
        Step::Observe { content } => {
            format!("{{ \"step\": \"observe\", \"content\": {} }}", quote(content))
        }
        Step::Output { content } => {
            format!("{{ \"step\": \"output\", \"content\": {} }}", quote(content))
        }
    }
}

fn quote(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_tool::ToolRegistry;

    #[test]
    fn test_build_lists_tools() {
        let prompt = SystemPromptBuilder::new()
            .with_tools(ToolRegistry::with_builtins().definitions())
            .build();

        assert!(prompt.contains("Available Tools:"));
        assert!(prompt.contains("- getWeatherInfo(city: string): string"));
        assert!(prompt.contains("- writeFile(path: string, content: string): string"));
        assert!(prompt.contains(r#"{ "step": "action", "tool": "getWeatherInfo", "input": "patiala" }"#));
        assert!(prompt.ends_with(&format!("{}\n", STEP_FORMAT)));
    }

    #[test]
    fn test_build_without_tools() {
        let prompt = SystemPromptBuilder::new()
            .with_examples(vec![])
            .with_rule("Answer in English.")
            .build();

        assert!(prompt.contains("- (none)"));
        assert!(prompt.contains("- Answer in English."));
        assert!(!prompt.contains("Example:"));
    }

    #[test]
    fn test_repair_request() {
        let body = repair_request("{\"step\": \"think\"", "EOF while parsing");
        assert!(body.contains("EOF while parsing"));
        assert!(body.contains("{\"step\": \"think\""));
        assert!(repair_prompt().contains(STEP_FORMAT));
    }
}
