//! Tool Registry - manages available tools
//!
//! 프로세스당 한 번 만들어서 `Arc`로 Agent에 넘긴다. 전역 상태는 없다.

use crate::{Tool, ToolDef, ToolError, ToolInput};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of available tools (name → implementation)
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the builtin tools
    pub fn with_builtins() -> Self {
        let builtins: [Arc<dyn Tool>; 3] = [
            Arc::new(crate::builtin::weather::WeatherTool::new()),
            Arc::new(crate::builtin::command::ExecuteCommandTool::new()),
            Arc::new(crate::builtin::write::WriteFileTool::new()),
        ];

        let mut registry = Self::new();
        for tool in builtins {
            registry.tools.insert(tool.name(), tool);
        }
        registry
    }

    /// Register a tool. 이름이 겹치면 에러
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name();
        if self.tools.contains_key(&name) {
            return Err(ToolError::Duplicate(name));
        }
        debug!("Registered tool: {}", name);
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Builder-style register
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Result<Self, ToolError> {
        self.register(tool)?;
        Ok(self)
    }

    /// Resolve a tool by name
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::NotFound {
                name: name.to_string(),
                available: self.names(),
            })
    }

    /// Check if a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Invoke a tool by name
    pub async fn invoke(&self, name: &str, input: ToolInput) -> Result<String, ToolError> {
        let tool = self.resolve(name)?;
        tool.execute(input).await
    }

    /// All tool definitions, sorted by name
    pub fn definitions(&self) -> Vec<ToolDef> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    /// All tool names, sorted
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
