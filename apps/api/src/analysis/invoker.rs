//! The retrying analysis invoker.
//!
//! One `analyze` call runs a strictly sequential bounded retry loop around
//! the generative backend: a constant cooperative delay between attempts,
//! budget consumed only by failures, and a terminal fallback result instead
//! of an error when the budget runs out. Configuration failures short-circuit
//! the loop entirely.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::analysis::models::SalaryAnalysis;
use crate::analysis::prompts::{analysis_response_schema, ANALYSIS_PROMPT};
use crate::analysis::upload::EncodedPayload;
use crate::llm_client::{
    strip_json_fences, GenerateOutput, GenerateRequest, GenerativeModel, LlmError,
};

/// Client-facing message on a non-retryable configuration failure.
const CONFIGURATION_ERROR_MESSAGE: &str = "Service configuration error";
/// Client-facing message once the retry budget is exhausted.
const EXHAUSTED_ERROR_MESSAGE: &str = "Failed to analyze salary after multiple attempts";

/// Retry budget and inter-attempt delay. The delay is constant, not
/// exponential, and only failed attempts consume budget.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

/// Submits the encoded resume to the model and returns a `SalaryAnalysis`.
///
/// Never returns an error: exhausted retries and configuration failures both
/// produce a fallback result with a populated `error` field, so callers always
/// have a renderable response. Full failure detail goes to the log only.
pub async fn analyze(
    model: &dyn GenerativeModel,
    payload: &EncodedPayload,
    policy: RetryPolicy,
) -> SalaryAnalysis {
    let schema = analysis_response_schema();
    let mut last_error: Option<LlmError> = None;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            warn!(
                "analysis attempt {} failed, retrying after {}ms ({} attempts left)",
                attempt,
                policy.retry_delay.as_millis(),
                policy.max_retries - attempt + 1
            );
            tokio::time::sleep(policy.retry_delay).await;
        }

        match run_attempt(model, payload, &schema).await {
            Ok(analysis) => {
                debug!(
                    "analysis succeeded on attempt {}: estimated_salary={}",
                    attempt + 1,
                    analysis.estimated_salary
                );
                return analysis;
            }
            Err(e) if e.is_configuration() => {
                error!("analysis aborted, backend misconfigured: {e}");
                return SalaryAnalysis::fallback(CONFIGURATION_ERROR_MESSAGE);
            }
            Err(e) => {
                warn!("analysis attempt {} failed: {e}", attempt + 1);
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) => error!(
            "analysis failed after {} retries, returning fallback: {e}",
            policy.max_retries
        ),
        None => error!("analysis failed with no recorded error, returning fallback"),
    }

    SalaryAnalysis::fallback(EXHAUSTED_ERROR_MESSAGE)
}

/// One attempt: a single backend call, then JSON extraction. Structured
/// output deserializes directly; raw text is fence-stripped and parsed.
async fn run_attempt(
    model: &dyn GenerativeModel,
    payload: &EncodedPayload,
    schema: &Value,
) -> Result<SalaryAnalysis, LlmError> {
    let output = model
        .generate(GenerateRequest {
            media_type: payload.mime_type(),
            media_base64: payload.base64_data(),
            prompt: ANALYSIS_PROMPT,
            response_schema: Some(schema),
        })
        .await?;

    let analysis = match output {
        GenerateOutput::Structured(value) => serde_json::from_value(value)?,
        GenerateOutput::Text(text) => serde_json::from_str(strip_json_fences(&text))?,
    };

    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::models::{DemandLevel, ExperienceLevel};
    use crate::analysis::upload::{encode, UploadedDocument, PDF_MIME_TYPE};
    use async_trait::async_trait;
    use bytes::Bytes;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn sample_payload() -> EncodedPayload {
        encode(&UploadedDocument {
            content_type: PDF_MIME_TYPE.to_string(),
            bytes: Bytes::from_static(b"%PDF-1.7 sample resume"),
        })
    }

    fn sample_analysis_json() -> Value {
        json!({
            "estimatedSalary": 52000,
            "experience": {
                "level": "Senior",
                "years": 9,
                "keySkills": ["Rust", "Distributed systems"]
            },
            "marketDemand": {
                "level": "High",
                "reasons": ["Shortage of systems engineers"]
            },
            "location": "Stockholm",
            "industry": "Technology",
            "salaryFactors": ["Deep systems expertise"],
            "considerations": ["Company size"],
            "confidenceScore": 0.9
        })
    }

    /// Fails `failures` times with the given error, then succeeds with the
    /// given output. Counts every invocation.
    struct ScriptedModel {
        calls: AtomicU32,
        failures: u32,
        failure: fn() -> LlmError,
        success: fn() -> GenerateOutput,
    }

    impl ScriptedModel {
        fn new(failures: u32, failure: fn() -> LlmError, success: fn() -> GenerateOutput) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures,
                failure,
                success,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate(
            &self,
            _request: GenerateRequest<'_>,
        ) -> Result<GenerateOutput, LlmError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err((self.failure)())
            } else {
                Ok((self.success)())
            }
        }
    }

    fn transient() -> LlmError {
        LlmError::Unavailable { status: 503 }
    }

    fn structured_success() -> GenerateOutput {
        GenerateOutput::Structured(sample_analysis_json())
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_makes_one_call() {
        let model = ScriptedModel::new(0, transient, structured_success);
        let result = analyze(&model, &sample_payload(), RetryPolicy::default()).await;
        assert_eq!(model.calls(), 1);
        assert!(!result.is_fallback());
        assert_eq!(result.estimated_salary, 52000.0);
        assert_eq!(result.experience.level, ExperienceLevel::Senior);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_within_budget_then_success() {
        // k = 2 failures < b = 3: success after k + 1 = 3 invocations.
        let model = ScriptedModel::new(2, transient, structured_success);
        let result = analyze(&model, &sample_payload(), RetryPolicy::default()).await;
        assert_eq!(model.calls(), 3);
        assert!(!result.is_fallback());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_budget_returns_fallback_after_b_plus_one_calls() {
        // k >= b: fallback after b + 1 = 4 invocations.
        let model = ScriptedModel::new(u32::MAX, transient, structured_success);
        let result = analyze(&model, &sample_payload(), RetryPolicy::default()).await;
        assert_eq!(model.calls(), 4);
        assert!(result.is_fallback());
        assert_eq!(result.error.as_deref(), Some(EXHAUSTED_ERROR_MESSAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_configuration_error_is_never_retried() {
        let model = ScriptedModel::new(
            u32::MAX,
            || LlmError::Configuration("API key not valid".to_string()),
            structured_success,
        );
        let result = analyze(&model, &sample_payload(), RetryPolicy::default()).await;
        assert_eq!(model.calls(), 1);
        assert!(result.is_fallback());
        // Configuration message is distinct from the transient one and never
        // contains backend detail.
        assert_eq!(result.error.as_deref(), Some(CONFIGURATION_ERROR_MESSAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fenced_text_output_parses_to_unwrapped_object() {
        fn fenced() -> GenerateOutput {
            GenerateOutput::Text(format!("```json\n{}\n```", sample_analysis_json()))
        }
        let model = ScriptedModel::new(0, transient, fenced);
        let result = analyze(&model, &sample_payload(), RetryPolicy::default()).await;
        let expected: SalaryAnalysis = serde_json::from_value(sample_analysis_json()).unwrap();
        assert_eq!(result, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistently_invalid_json_exhausts_budget_into_fallback() {
        fn garbage() -> GenerateOutput {
            GenerateOutput::Text("I could not produce JSON, sorry!".to_string())
        }
        let model = ScriptedModel::new(0, transient, garbage);
        let result = analyze(&model, &sample_payload(), RetryPolicy::default()).await;
        assert_eq!(model.calls(), 4);
        assert!(result.is_fallback());
        assert_eq!(result.estimated_salary, 0.0);
        assert_eq!(result.confidence_score, 0.0);
        assert!(result.experience.key_skills.is_empty());
        assert!(result.market_demand.reasons.is_empty());
        assert!(result.salary_factors.is_empty());
        assert!(result.considerations.is_empty());
        assert_eq!(result.experience.level, ExperienceLevel::Junior);
        assert_eq!(result.market_demand.level, DemandLevel::Medium);
        assert!(!result.error.as_deref().unwrap_or_default().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retry_budget_means_single_attempt() {
        let model = ScriptedModel::new(u32::MAX, transient, structured_success);
        let policy = RetryPolicy {
            max_retries: 0,
            retry_delay: Duration::from_millis(1000),
        };
        let result = analyze(&model, &sample_payload(), policy).await;
        assert_eq!(model.calls(), 1);
        assert!(result.is_fallback());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_delay_is_constant_between_attempts() {
        let model = ScriptedModel::new(3, transient, structured_success);
        let start = tokio::time::Instant::now();
        let result = analyze(&model, &sample_payload(), RetryPolicy::default()).await;
        // Three failures → three constant 1s delays before the fourth attempt.
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
        assert!(!result.is_fallback());
    }

    #[test]
    fn test_default_policy_matches_contract() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.retry_delay, Duration::from_millis(1000));
    }
}
