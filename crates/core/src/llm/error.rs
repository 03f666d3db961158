use crate::llm::Provider;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    /// Rate limiting, timeouts, provider 5xx. Worth retrying.
    Transient,
    /// Auth, bad request, undecodable body. Retrying will not help.
    Fatal,
}

#[derive(Debug, Clone)]
pub struct UpstreamError {
    pub provider: Provider,
    pub kind: UpstreamErrorKind,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
}

impl UpstreamError {
    pub fn transient(provider: Provider, stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            provider,
            kind: UpstreamErrorKind::Transient,
            stage,
            detail: detail.into(),
            raw_output: None,
        }
    }

    pub fn fatal(provider: Provider, stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            provider,
            kind: UpstreamErrorKind::Fatal,
            stage,
            detail: detail.into(),
            raw_output: None,
        }
    }

    pub fn with_raw_output(mut self, raw: String) -> Self {
        self.raw_output = Some(raw);
        self
    }

    pub fn is_transient(&self) -> bool {
        self.kind == UpstreamErrorKind::Transient
    }

    /// Classifies a non-success HTTP status from a generation provider.
    pub fn from_status(provider: Provider, status: reqwest::StatusCode, body: String) -> Self {
        let retryable = status == reqwest::StatusCode::REQUEST_TIMEOUT
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status.is_server_error();
        let kind = if retryable {
            UpstreamErrorKind::Transient
        } else {
            UpstreamErrorKind::Fatal
        };
        Self {
            provider,
            kind,
            stage: "http",
            detail: format!("status={status}"),
            raw_output: Some(body),
        }
    }

    /// Classifies a transport-level failure (no usable HTTP response).
    pub fn from_transport(provider: Provider, err: &reqwest::Error) -> Self {
        let retryable = err.is_timeout() || err.is_connect() || err.is_request();
        let kind = if retryable {
            UpstreamErrorKind::Transient
        } else {
            UpstreamErrorKind::Fatal
        };
        Self {
            provider,
            kind,
            stage: "transport",
            detail: err.to_string(),
            raw_output: None,
        }
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM error (provider={}, stage={}, kind={:?}): {}",
            self.provider, self.stage, self.kind, self.detail
        )
    }
}

impl std::error::Error for UpstreamError {}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn rate_limits_and_server_errors_are_transient() {
        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::REQUEST_TIMEOUT,
        ] {
            let err = UpstreamError::from_status(Provider::Gemini, status, String::new());
            assert!(err.is_transient(), "{status} should be transient");
        }
    }

    #[test]
    fn auth_and_bad_request_are_fatal() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::NOT_FOUND,
        ] {
            let err = UpstreamError::from_status(Provider::Anthropic, status, "{}".to_string());
            assert_eq!(err.kind, UpstreamErrorKind::Fatal);
            assert_eq!(err.raw_output.as_deref(), Some("{}"));
        }
    }

    #[tokio::test]
    async fn refused_connection_is_transient() {
        // Nothing listens on port 1.
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:1/")
            .send()
            .await
            .unwrap_err();
        let classified = UpstreamError::from_transport(Provider::Gemini, &err);
        assert_eq!(classified.kind, UpstreamErrorKind::Transient);
        assert_eq!(classified.stage, "transport");
    }

    #[tokio::test]
    async fn unbuildable_request_is_fatal() {
        let err = reqwest::Client::new()
            .get("not a url")
            .send()
            .await
            .unwrap_err();
        let classified = UpstreamError::from_transport(Provider::Anthropic, &err);
        assert_eq!(classified.kind, UpstreamErrorKind::Fatal);
    }
}
