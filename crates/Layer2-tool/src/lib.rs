//! # stepwise-tool
//!
//! Tool system for Stepwise providing:
//! - Tool trait and registry (name → implementation, built once per process)
//! - Tool input normalization (raw string or structured object)
//! - Builtin tools (getWeatherInfo, executeCommand, writeFile)

pub mod builtin;
pub mod error;
pub mod input;
pub mod registry;
pub mod r#trait;

pub use error::ToolError;
pub use input::ToolInput;
pub use r#trait::{Tool, ToolDef, ToolParam};
pub use registry::ToolRegistry;

// Re-export builtin tools
pub use builtin::{command::ExecuteCommandTool, weather::WeatherTool, write::WriteFileTool};
