//! Tool system for function calling.

pub mod arguments;
pub mod registry;
pub mod remote;
pub mod tool;
pub mod types;
pub mod validation;

pub use arguments::ToolArguments;
pub use registry::ToolRegistry;
pub use remote::{RemoteSelection, RemoteToolProtocol};
pub use tool::{FunctionTool, Tool, ToolContext};
pub use types::{BriefInfo, ToolFunction, ToolParameters, RAW_INPUT_KEY, SESSION_KEY};
