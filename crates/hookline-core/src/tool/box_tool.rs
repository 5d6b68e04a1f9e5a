//! BoxTool -- object-safe dynamic dispatch wrapper for Tool.
//!
//! 1. Define an object-safe `ToolDyn` trait that takes raw JSON input and
//!    returns a boxed future
//! 2. Blanket-impl `ToolDyn` for all `T: Tool`
//! 3. `BoxTool` wraps `Arc<dyn ToolDyn>` and delegates

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;

use hookline_types::error::ToolError;
use hookline_types::tool::{JobSettings, ToolSchema};

use crate::job::JobContext;

use super::Tool;

/// Object-safe version of [`Tool`] operating on untyped JSON input.
pub trait ToolDyn: Send + Sync {
    fn name(&self) -> &str;

    fn schema(&self) -> ToolSchema;

    fn settings(&self) -> JobSettings;

    fn validate_json(&self, input: &Value) -> Result<(), ToolError>;

    fn run_boxed<'a>(
        &'a self,
        input: Value,
        ctx: JobContext,
    ) -> BoxFuture<'a, Result<Value, ToolError>>;

    fn summarize(&self, result: &Value) -> Option<String>;
}

fn parse_input<T: Tool>(tool: &T, input: &Value) -> Result<T::Input, ToolError> {
    // Tools without parameters accept an absent body.
    let input = if input.is_null() {
        Value::Object(Default::default())
    } else {
        input.clone()
    };
    let parsed: T::Input = serde_json::from_value(input)
        .map_err(|e| ToolError::InvalidInput(format!("{} arguments: {e}", Tool::name(tool))))?;
    tool.validate(&parsed)?;
    Ok(parsed)
}

/// Blanket implementation: any `Tool` automatically implements `ToolDyn`.
impl<T: Tool> ToolDyn for T {
    fn name(&self) -> &str {
        Tool::name(self)
    }

    fn schema(&self) -> ToolSchema {
        Tool::schema(self)
    }

    fn settings(&self) -> JobSettings {
        Tool::settings(self)
    }

    fn validate_json(&self, input: &Value) -> Result<(), ToolError> {
        parse_input(self, input).map(|_| ())
    }

    fn run_boxed<'a>(
        &'a self,
        input: Value,
        ctx: JobContext,
    ) -> BoxFuture<'a, Result<Value, ToolError>> {
        Box::pin(async move {
            let input = parse_input(self, &input)?;
            self.run(input, ctx).await
        })
    }

    fn summarize(&self, result: &Value) -> Option<String> {
        Tool::summarize(self, result)
    }
}

/// Type-erased tool for runtime lookup by name.
///
/// Cheap to clone; clones share the underlying tool.
#[derive(Clone)]
pub struct BoxTool {
    inner: Arc<dyn ToolDyn>,
}

impl BoxTool {
    pub fn new<T: Tool>(tool: T) -> Self {
        Self {
            inner: Arc::new(tool),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn schema(&self) -> ToolSchema {
        self.inner.schema()
    }

    pub fn settings(&self) -> JobSettings {
        self.inner.settings()
    }

    /// Deserialize and validate `input` without running anything.
    pub fn validate(&self, input: &Value) -> Result<(), ToolError> {
        self.inner.validate_json(input)
    }

    /// Run the tool to completion on the current task.
    pub async fn run(&self, input: Value, ctx: JobContext) -> Result<Value, ToolError> {
        self.inner.run_boxed(input, ctx).await
    }

    pub fn summarize(&self, result: &Value) -> Option<String> {
        self.inner.summarize(result)
    }
}

impl std::fmt::Debug for BoxTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxTool").field("name", &self.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::job::JobRegistry;
    use hookline_types::tool::{ParameterType, ToolParameter};

    struct Echo;

    #[derive(Deserialize)]
    struct EchoInput {
        text: String,
    }

    impl Tool for Echo {
        type Input = EchoInput;

        fn name(&self) -> &str {
            "echo"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "echo".to_string(),
                description: "Repeats the text".to_string(),
                parameters: vec![ToolParameter::required(
                    "text",
                    ParameterType::String,
                    "What to repeat",
                )],
            }
        }

        fn validate(&self, input: &EchoInput) -> Result<(), ToolError> {
            if input.text.is_empty() {
                return Err(ToolError::InvalidInput("text must not be empty".to_string()));
            }
            Ok(())
        }

        async fn run(&self, input: EchoInput, _ctx: JobContext) -> Result<Value, ToolError> {
            Ok(Value::String(input.text))
        }

        fn summarize(&self, result: &Value) -> Option<String> {
            Some(format!("Echoed {result}"))
        }
    }

    fn ctx() -> JobContext {
        let registry = std::sync::Arc::new(JobRegistry::new());
        let record = registry.create("echo");
        JobContext::new(record.id, CancellationToken::new(), registry)
    }

    #[test]
    fn validate_reports_bad_input() {
        let tool = BoxTool::new(Echo);
        assert!(tool.validate(&serde_json::json!({"text": "hi"})).is_ok());

        let err = tool.validate(&serde_json::json!({"txt": "hi"})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(ref m) if m.contains("echo arguments")));

        let err = tool.validate(&serde_json::json!({"text": ""})).unwrap_err();
        assert_eq!(err, ToolError::InvalidInput("text must not be empty".to_string()));
    }

    #[tokio::test]
    async fn run_dispatches_through_box() {
        let tool = BoxTool::new(Echo);
        let out = tool.run(serde_json::json!({"text": "hi"}), ctx()).await.unwrap();
        assert_eq!(out, Value::String("hi".to_string()));
        assert_eq!(tool.summarize(&out).as_deref(), Some("Echoed \"hi\""));
        assert_eq!(tool.name(), "echo");
        assert!(tool.settings().cancelable);
    }
}
