//! Tools: named, typed operations the agent can start as jobs.
//!
//! A [`Tool`] declares its input type, schema and job settings. Tools are
//! collected once at startup into a [`ToolRegistry`] and dispatched through
//! the type-erased [`BoxTool`].

pub mod box_tool;
pub mod registry;

pub use box_tool::BoxTool;
pub use registry::{RESERVED_PARAMETER_NAMES, ToolRegistry};

use serde::de::DeserializeOwned;
use serde_json::Value;

use hookline_types::error::ToolError;
use hookline_types::tool::{JobSettings, ToolSchema};

use crate::job::JobContext;

/// A named operation with typed input.
///
/// Uses RPITIT (return-position `impl Trait` in traits) for `run`, so it is
/// not object safe on its own; see [`BoxTool`] for dynamic dispatch.
pub trait Tool: Send + Sync + 'static {
    /// Arguments the tool accepts, deserialized from the request body.
    type Input: DeserializeOwned + Send + 'static;

    /// Unique tool name used in routes and job records.
    fn name(&self) -> &str;

    fn schema(&self) -> ToolSchema;

    fn settings(&self) -> JobSettings {
        JobSettings::default()
    }

    /// Checks beyond what deserialization enforces. Runs before a job exists.
    fn validate(&self, _input: &Self::Input) -> Result<(), ToolError> {
        Ok(())
    }

    /// Do the work. Long-running tools should watch `ctx` for cancellation.
    fn run(
        &self,
        input: Self::Input,
        ctx: JobContext,
    ) -> impl std::future::Future<Output = Result<Value, ToolError>> + Send;

    /// Success `status_message` for a given result, if the default won't do.
    fn summarize(&self, _result: &Value) -> Option<String> {
        None
    }
}
