//! Tool contract and a closure-based tool for quick tool creation.

pub mod tool;
pub mod types;

pub use tool::{AgentTool, Tool, ToolError};
pub use types::{AgentToolParameters, ParameterBuilder, ToolContext, ToolInfo, ToolResponse};
