//! writeFile - create or overwrite a file

use crate::{Tool, ToolDef, ToolError, ToolInput};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;

pub const WRITE_TOOL: &str = "writeFile";

/// Write tool for creating/overwriting files
pub struct WriteFileTool {
    working_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct WriteParams {
    path: String,
    content: String,
}

impl WriteFileTool {
    pub fn new() -> Self {
        Self { working_dir: None }
    }

    /// Resolve relative paths against `dir` instead of the process cwd
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = PathBuf::from(path);
        match &self.working_dir {
            Some(dir) if !path.is_absolute() => dir.join(path),
            _ => path,
        }
    }
}

impl Default for WriteFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn definition(&self) -> ToolDef {
        ToolDef::builder(
            WRITE_TOOL,
            "Creates a file (and missing parent directories) or overwrites it with the given content.",
        )
        .string_param("path", "Path to the file to write (absolute or relative)", true)
        .string_param("content", "The complete content to write to the file", true)
        .build()
    }

    async fn execute(&self, input: ToolInput) -> Result<String, ToolError> {
        let params: WriteParams = serde_json::from_value(Value::Object(input.to_object("path")))
            .map_err(|e| {
                ToolError::invalid_input(WRITE_TOOL, format!("expected {{ path, content }}: {}", e))
            })?;

        if params.path.trim().is_empty() {
            return Err(ToolError::invalid_input(WRITE_TOOL, "path is empty"));
        }

        let file_path = self.resolve_path(params.path.trim());

        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ToolError::execution(WRITE_TOOL, format!("Failed to create directories: {}", e))
            })?;
        }

        let is_new = !file_path.exists();

        tokio::fs::write(&file_path, &params.content)
            .await
            .map_err(|e| ToolError::execution(WRITE_TOOL, format!("Failed to write file: {}", e)))?;

        Ok(format!(
            "{} file: {} ({} lines, {} bytes)",
            if is_new { "Created" } else { "Wrote" },
            file_path.display(),
            params.content.lines().count(),
            params.content.len()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let tool = WriteFileTool::new().with_working_dir(dir.path());

        let output = tool
            .execute(ToolInput::from(json!({
                "path": "site/index.html",
                "content": "<h1>hi</h1>\n"
            })))
            .await
            .unwrap();

        assert!(output.starts_with("Created file:"));
        assert!(output.ends_with("(1 lines, 12 bytes)"));
        let written = std::fs::read_to_string(dir.path().join("site/index.html")).unwrap();
        assert_eq!(written, "<h1>hi</h1>\n");
    }

    #[tokio::test]
    async fn test_write_string_encoded_object() {
        let dir = TempDir::new().unwrap();
        let tool = WriteFileTool::new().with_working_dir(dir.path());

        let encoded = json!({ "path": "notes.txt", "content": "a\nb" }).to_string();
        tool.execute(ToolInput::text(encoded)).await.unwrap();

        let output = tool
            .execute(ToolInput::from(json!({ "path": "notes.txt", "content": "c" })))
            .await
            .unwrap();
        assert!(output.starts_with("Wrote file:"));
        assert_eq!(std::fs::read_to_string(dir.path().join("notes.txt")).unwrap(), "c");
    }

    #[tokio::test]
    async fn test_write_rejects_bare_string() {
        let err = WriteFileTool::new()
            .execute(ToolInput::text("just some text"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput { .. }));
    }
}
