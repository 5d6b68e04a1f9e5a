//! `fibonacci_calculate`: arbitrary-precision Fibonacci numbers.
//!
//! Large `n` takes long enough to be a useful demonstration of background
//! jobs, so the computation runs on the blocking pool and checks for
//! cancellation as it goes.

use num_bigint::BigUint;
use serde::Deserialize;
use serde_json::{Value, json};

use hookline_core::job::JobContext;
use hookline_core::tool::Tool;
use hookline_types::error::ToolError;
use hookline_types::tool::{JobSettings, ParameterType, ToolParameter, ToolSchema};

/// Largest index accepted.
pub const MAX_N: i64 = 100_000;

/// Iterations between cancellation checks.
const CANCEL_CHECK_INTERVAL: u64 = 1_000;

/// Results with more digits than this are summarized by length only.
const MAX_SPOKEN_DIGITS: usize = 30;

#[derive(Debug, Default, Clone, Copy)]
pub struct FibonacciTool;

#[derive(Debug, Deserialize)]
pub struct FibonacciInput {
    pub n: i64,
}

impl Tool for FibonacciTool {
    type Input = FibonacciInput;

    fn name(&self) -> &str {
        "fibonacci_calculate"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "fibonacci_calculate".to_string(),
            description: "Calculate the nth Fibonacci number.".to_string(),
            parameters: vec![ToolParameter::required(
                "n",
                ParameterType::Integer,
                "Which Fibonacci number to calculate, starting from 1. At most 100000.",
            )],
        }
    }

    fn settings(&self) -> JobSettings {
        JobSettings::default()
            .with_sync_threshold(5.0)
            .with_notification(
                "Fibonacci Calculation Complete",
                "Fibonacci calculation completed for n={n}",
            )
    }

    fn validate(&self, input: &FibonacciInput) -> Result<(), ToolError> {
        if input.n < 1 {
            return Err(ToolError::InvalidInput(
                "n must be a positive integer".to_string(),
            ));
        }
        if input.n > MAX_N {
            return Err(ToolError::InvalidInput(format!(
                "n is too large, please use n <= {MAX_N}"
            )));
        }
        Ok(())
    }

    async fn run(&self, input: FibonacciInput, ctx: JobContext) -> Result<Value, ToolError> {
        let n = input.n.unsigned_abs();
        let value = tokio::task::spawn_blocking(move || fibonacci(n, || ctx.is_cancelled()))
            .await
            .map_err(|e| ToolError::failed(format!("Fibonacci worker stopped: {e}")))??;

        let result = match u64::try_from(&value) {
            Ok(small) => json!(small),
            Err(_) => Value::String(value.to_string()),
        };
        Ok(json!({ "n": n, "result": result }))
    }

    fn summarize(&self, result: &Value) -> Option<String> {
        let digits = match &result["result"] {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            _ => return None,
        };
        if digits.len() <= MAX_SPOKEN_DIGITS {
            Some(format!("Fibonacci calculation completed. The result is {digits}"))
        } else {
            Some(format!(
                "Fibonacci calculation completed. Fibonacci number {} has {} digits",
                result["n"],
                digits.len()
            ))
        }
    }
}

/// The nth Fibonacci number with F(1) = F(2) = 1.
///
/// `cancelled` is polled every [`CANCEL_CHECK_INTERVAL`] iterations.
pub fn fibonacci(n: u64, cancelled: impl Fn() -> bool) -> Result<BigUint, ToolError> {
    let mut a = BigUint::from(0u32);
    let mut b = BigUint::from(1u32);
    for i in 0..n {
        if i % CANCEL_CHECK_INTERVAL == 0 && cancelled() {
            return Err(ToolError::Cancelled);
        }
        let next = &a + &b;
        a = std::mem::replace(&mut b, next);
    }
    Ok(a)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio_util::sync::CancellationToken;

    use super::*;
    use hookline_core::job::JobRegistry;
    use hookline_core::tool::BoxTool;

    fn ctx() -> (JobContext, CancellationToken) {
        let registry = Arc::new(JobRegistry::new());
        let record = registry.create("fibonacci_calculate");
        let token = CancellationToken::new();
        (JobContext::new(record.id, token.clone(), registry), token)
    }

    #[test]
    fn small_values() {
        let values: Vec<String> = (1..=10)
            .map(|n| fibonacci(n, || false).unwrap().to_string())
            .collect();
        assert_eq!(values, ["1", "1", "2", "3", "5", "8", "13", "21", "34", "55"]);
    }

    #[test]
    fn cancellation_is_observed() {
        assert_eq!(fibonacci(50_000, || true), Err(ToolError::Cancelled));
    }

    #[test]
    fn input_bounds() {
        let tool = BoxTool::new(FibonacciTool);
        assert!(tool.validate(&json!({"n": 10})).is_ok());
        assert!(tool.validate(&json!({"n": 100_000})).is_ok());
        assert!(tool.validate(&json!({"n": 0})).is_err());
        assert!(tool.validate(&json!({"n": -3})).is_err());
        let err = tool.validate(&json!({"n": 100_001})).unwrap_err();
        assert!(err.to_string().contains("n <= 100000"));
    }

    #[tokio::test]
    async fn tenth_number_is_55() {
        let (ctx, _token) = ctx();
        let result = FibonacciTool.run(FibonacciInput { n: 10 }, ctx).await.unwrap();
        assert_eq!(result, json!({"n": 10, "result": 55}));
        assert_eq!(
            FibonacciTool.summarize(&result).as_deref(),
            Some("Fibonacci calculation completed. The result is 55")
        );
    }

    #[tokio::test]
    async fn large_results_become_strings() {
        let (ctx, _token) = ctx();
        let result = FibonacciTool.run(FibonacciInput { n: 100 }, ctx).await.unwrap();
        assert_eq!(result["result"], json!("354224848179261915075"));
        assert_eq!(
            FibonacciTool.summarize(&result).as_deref(),
            Some("Fibonacci calculation completed. The result is 354224848179261915075")
        );
    }

    #[tokio::test]
    async fn huge_results_are_summarized_by_length() {
        let (ctx, _token) = ctx();
        let result = FibonacciTool.run(FibonacciInput { n: 1000 }, ctx).await.unwrap();
        let summary = FibonacciTool.summarize(&result).unwrap();
        assert!(summary.ends_with("Fibonacci number 1000 has 209 digits"));
    }

    #[tokio::test]
    async fn cancelled_context_stops_calculation() {
        let (ctx, token) = ctx();
        token.cancel();
        let err = FibonacciTool
            .run(FibonacciInput { n: 100_000 }, ctx)
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::Cancelled);
    }
}
