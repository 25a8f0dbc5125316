//! getWeatherInfo - canned weather lookup used by the demo prompt

use crate::{Tool, ToolDef, ToolError, ToolInput};
use async_trait::async_trait;

pub const WEATHER_TOOL: &str = "getWeatherInfo";

/// 도시 이름을 받아 고정된 기온 문자열을 돌려준다
pub struct WeatherTool;

impl WeatherTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn definition(&self) -> ToolDef {
        ToolDef::builder(WEATHER_TOOL, "Returns the current temperature for a city.")
            .string_param("city", "City name", true)
            .accepts_text()
            .build()
    }

    async fn execute(&self, input: ToolInput) -> Result<String, ToolError> {
        let city = input
            .field_str("city")
            .ok_or_else(|| ToolError::invalid_input(WEATHER_TOOL, "city is required"))?;
        Ok(format!("{} has 43 Degree C", city))
    }
}
