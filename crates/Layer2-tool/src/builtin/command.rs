//! executeCommand - run a shell command and capture its output

use crate::{Tool, ToolDef, ToolError, ToolInput};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

pub const COMMAND_TOOL: &str = "executeCommand";

/// Maximum output length before truncation
const MAX_OUTPUT_LENGTH: usize = 30000;

/// Default timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Maximum timeout in seconds
const MAX_TIMEOUT_SECS: u64 = 600;

/// Shell command tool
///
/// 자식 프로세스는 `kill_on_drop`으로 띄운다. 턴이 취소되어 future가 drop되면 프로세스도 종료된다.
pub struct ExecuteCommandTool {
    working_dir: Option<std::path::PathBuf>,
}

impl ExecuteCommandTool {
    pub fn new() -> Self {
        Self { working_dir: None }
    }

    /// Run commands in a fixed directory instead of the process cwd
    pub fn with_working_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// 입력의 `timeout` (초), 없으면 기본값. 1..=600으로 제한
    fn timeout_secs(input: &ToolInput) -> u64 {
        input
            .field_str("timeout")
            .and_then(|t| t.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .clamp(1, MAX_TIMEOUT_SECS)
    }

    fn shell() -> (&'static str, &'static str) {
        if cfg!(windows) {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        }
    }
}

impl Default for ExecuteCommandTool {
    fn default() -> Self {
        Self::new()
    }
}

/// 앞뒤 절반씩 남기고 가운데를 자른다 (char 경계 기준)
fn truncate_output(output: &str) -> String {
    let total = output.chars().count();
    if total <= MAX_OUTPUT_LENGTH {
        return output.to_string();
    }

    let half = MAX_OUTPUT_LENGTH / 2;
    let start: String = output.chars().take(half).collect();
    let end: String = output.chars().skip(total - half).collect();

    format!(
        "{}\n\n... [truncated {} characters] ...\n\n{}",
        start,
        total - MAX_OUTPUT_LENGTH,
        end
    )
}

#[async_trait]
impl Tool for ExecuteCommandTool {
    fn definition(&self) -> ToolDef {
        ToolDef::builder(
            COMMAND_TOOL,
            "Executes a shell command on the user's machine and returns stdout/stderr.",
        )
        .string_param("command", "The shell command to execute", true)
        .integer_param("timeout", "Timeout in seconds (default: 60, max: 600)", false)
        .accepts_text()
        .build()
    }

    fn time_limit(&self, input: &ToolInput) -> Option<Duration> {
        Some(Duration::from_secs(Self::timeout_secs(input)))
    }

    async fn execute(&self, input: ToolInput) -> Result<String, ToolError> {
        let command = input
            .field_str("command")
            .ok_or_else(|| ToolError::invalid_input(COMMAND_TOOL, "command is required"))?;

        let timeout_secs = Self::timeout_secs(&input);

        let (shell, shell_arg) = Self::shell();
        let mut cmd = Command::new(shell);
        cmd.arg(shell_arg)
            .arg(&command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        debug!("executeCommand: {}", command);

        let output = match timeout(Duration::from_secs(timeout_secs), cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ToolError::execution(
                    COMMAND_TOOL,
                    format!("Failed to execute command: {}", e),
                ))
            }
            Err(_) => {
                return Err(ToolError::Timeout {
                    tool: COMMAND_TOOL.to_string(),
                    secs: timeout_secs,
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        let mut content = String::new();
        if !stdout.is_empty() {
            content.push_str(&truncate_output(&stdout));
        }
        if !stderr.is_empty() {
            if !content.is_empty() {
                content.push_str("\n\n--- stderr ---\n");
            }
            content.push_str(&truncate_output(&stderr));
        }
        if content.is_empty() {
            content = "(no output)".to_string();
        }

        if output.status.success() {
            Ok(content)
        } else {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            Err(ToolError::execution(
                COMMAND_TOOL,
                format!("exit code {}\n{}", code, content),
            ))
        }
    }
}
