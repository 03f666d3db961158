use crate::llm::error::UpstreamError;
use crate::llm::LlmClient;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Exponential backoff: the wait after failed attempt `n` (1-based) is
/// `multiplier * 2^(n-1)` seconds, clamped to `[min_wait, max_wait]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub multiplier: f64,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier: 2.0,
            min_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.max_attempts >= 1, "max_attempts must be at least 1");
        anyhow::ensure!(
            self.multiplier.is_finite() && self.multiplier > 0.0,
            "backoff multiplier must be a positive number (got {})",
            self.multiplier
        );
        anyhow::ensure!(
            self.min_wait <= self.max_wait,
            "backoff floor {:?} exceeds ceiling {:?}",
            self.min_wait,
            self.max_wait
        );
        Ok(())
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let secs = (self.multiplier * 2f64.powi(exponent))
            .min(self.max_wait.as_secs_f64())
            .max(0.0);
        Duration::from_secs_f64(secs).max(self.min_wait).min(self.max_wait)
    }
}

/// Wraps an `LlmClient` with bounded, sequential retries on transient
/// upstream failures.
#[derive(Clone)]
pub struct ResilientCaller {
    client: Arc<dyn LlmClient>,
    policy: RetryPolicy,
}

impl ResilientCaller {
    pub fn new(client: Arc<dyn LlmClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
        let provider = self.client.provider();
        let model = self.client.model();
        let max_attempts = self.policy.max_attempts.max(1);

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            tracing::debug!(attempt, %provider, model, prompt, "sending prompt to model");

            let started = Instant::now();
            let res = self.client.generate(prompt).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match res {
                Ok(reply) => {
                    tracing::info!(
                        attempt,
                        %provider,
                        model,
                        elapsed_ms,
                        prompt_chars = prompt.len(),
                        reply_chars = reply.len(),
                        "model call succeeded"
                    );
                    return Ok(reply);
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let backoff = self.policy.backoff(attempt);
                    tracing::warn!(
                        attempt,
                        %provider,
                        model,
                        elapsed_ms,
                        ?backoff,
                        error = %err,
                        "transient model failure; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => {
                    tracing::error!(
                        attempt,
                        %provider,
                        model,
                        elapsed_ms,
                        transient = err.is_transient(),
                        error = %err,
                        raw_output = err.raw_output.as_deref(),
                        "model call failed"
                    );
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::error::UpstreamErrorKind;
    use crate::llm::Provider;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedClient {
        script: Mutex<VecDeque<Result<String, UpstreamError>>>,
        calls: Mutex<Vec<tokio::time::Instant>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<Result<String, UpstreamError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn gaps(&self) -> Vec<Duration> {
            let calls = self.calls.lock().unwrap();
            calls.windows(2).map(|w| w[1] - w[0]).collect()
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedClient {
        fn provider(&self) -> Provider {
            Provider::Gemini
        }

        fn model(&self) -> &str {
            "test-model"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, UpstreamError> {
            self.calls.lock().unwrap().push(tokio::time::Instant::now());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(UpstreamError::fatal(Provider::Gemini, "test", "script exhausted")))
        }
    }

    fn transient() -> UpstreamError {
        UpstreamError::transient(Provider::Gemini, "http", "status=503")
    }

    #[test]
    fn backoff_grows_exponentially_and_is_clamped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(3), Duration::from_secs(8));
        assert_eq!(policy.backoff(4), Duration::from_secs(10));
        assert_eq!(policy.backoff(40), Duration::from_secs(10));

        let small = RetryPolicy {
            multiplier: 0.1,
            ..RetryPolicy::default()
        };
        assert_eq!(small.backoff(1), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_two_transient_failures() {
        let client = ScriptedClient::new(vec![
            Err(transient()),
            Err(transient()),
            Ok("the estimated price is $500 USD".to_string()),
        ]);
        let caller = ResilientCaller::new(client.clone(), RetryPolicy::default());

        let reply = caller.generate("prompt").await.unwrap();

        assert_eq!(reply, "the estimated price is $500 USD");
        assert_eq!(client.calls(), 3);
        assert_eq!(client.gaps(), vec![Duration::from_secs(2), Duration::from_secs(4)]);
    }

    #[tokio::test(start_paused = true)]
    async fn surfaces_last_error_when_attempts_are_exhausted() {
        let client = ScriptedClient::new(vec![Err(transient()), Err(transient()), Err(transient())]);
        let caller = ResilientCaller::new(client.clone(), RetryPolicy::default());

        let err = caller.generate("prompt").await.unwrap_err();
        assert_eq!(err.kind, UpstreamErrorKind::Transient);
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_errors_are_not_retried() {
        let client = ScriptedClient::new(vec![
            Err(UpstreamError::fatal(Provider::Gemini, "http", "status=401")),
            Ok("unreachable".to_string()),
        ]);
        let caller = ResilientCaller::new(client.clone(), RetryPolicy::default());

        let err = caller.generate("prompt").await.unwrap_err();
        assert_eq!(err.kind, UpstreamErrorKind::Fatal);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_keeps_raw_output() {
        let client = ScriptedClient::new(vec![Err(UpstreamError::fatal(
            Provider::Gemini,
            "decode",
            "missing candidates",
        )
        .with_raw_output("{\"promptFeedback\":{}}".to_string()))]);
        let caller = ResilientCaller::new(client.clone(), RetryPolicy::default());

        let err = caller.generate("prompt").await.unwrap_err();
        assert_eq!(err.stage, "decode");
        assert_eq!(err.raw_output.as_deref(), Some("{\"promptFeedback\":{}}"));
        assert!(client.gaps().is_empty());
    }
}
