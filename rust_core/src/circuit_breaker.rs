//! Circuit breaker for the scoreboard API.
//!
//! The watcher loop never gives up on the scoreboard, but hammering a dead
//! endpoint every poll only adds a timeout to each cycle.
//! After enough consecutive failures the breaker opens and calls fail fast
//! until the recovery timeout elapses, then a few trial calls decide whether
//! to close it again.

use crate::error::{ApiError, ApiResult};
use parking_lot::RwLock;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// API circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiCircuitState {
    /// Normal operation - requests are allowed
    Closed,
    /// Circuit is open - requests are blocked
    Open,
    /// Testing if service is recovered
    HalfOpen,
}

/// Configuration for API circuit breaker
#[derive(Debug, Clone)]
pub struct ApiCircuitBreakerConfig {
    /// Number of consecutive failures to trip the circuit
    pub failure_threshold: u32,
    /// Duration to wait before attempting recovery
    pub recovery_timeout: Duration,
    /// Number of successful calls in half-open state to close circuit
    pub success_threshold: u32,
}

impl Default for ApiCircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

/// Consecutive-failure breaker for one external API.
///
/// # Example
/// ```ignore
/// let breaker = ApiCircuitBreaker::new("nhl", ApiCircuitBreakerConfig::default());
/// let board = breaker.call(fetch_scoreboard()).await?;
/// ```
pub struct ApiCircuitBreaker {
    name: &'static str,
    config: ApiCircuitBreakerConfig,
    state: RwLock<ApiCircuitState>,
    failure_count: AtomicU32,
    success_count: AtomicU32,
    last_failure_time: RwLock<Option<Instant>>,
}

impl std::fmt::Debug for ApiCircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("failure_count", &self.failure_count())
            .finish()
    }
}

impl ApiCircuitBreaker {
    pub fn new(name: &'static str, config: ApiCircuitBreakerConfig) -> Self {
        Self {
            name,
            config,
            state: RwLock::new(ApiCircuitState::Closed),
            failure_count: AtomicU32::new(0),
            success_count: AtomicU32::new(0),
            last_failure_time: RwLock::new(None),
        }
    }

    /// Check if the circuit breaker allows requests
    fn is_available(&self) -> bool {
        let mut state = self.state.write();

        match *state {
            ApiCircuitState::Closed => true,
            ApiCircuitState::Open => {
                let should_try = self
                    .last_failure_time
                    .read()
                    .map(|t| t.elapsed() >= self.config.recovery_timeout)
                    .unwrap_or(true);

                if should_try {
                    *state = ApiCircuitState::HalfOpen;
                    self.success_count.store(0, Ordering::SeqCst);
                    true
                } else {
                    false
                }
            }
            ApiCircuitState::HalfOpen => true,
        }
    }

    fn record_success(&self) {
        self.failure_count.store(0, Ordering::SeqCst);

        let mut state = self.state.write();
        match *state {
            ApiCircuitState::HalfOpen => {
                let successes = self.success_count.fetch_add(1, Ordering::SeqCst) + 1;
                if successes >= self.config.success_threshold {
                    *state = ApiCircuitState::Closed;
                    tracing::info!(
                        "API circuit breaker '{}' closed after {} successful calls",
                        self.name,
                        successes
                    );
                }
            }
            _ => {
                *state = ApiCircuitState::Closed;
            }
        }
    }

    fn record_failure(&self) {
        let failures = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_failure_time.write() = Some(Instant::now());

        let mut state = self.state.write();
        match *state {
            ApiCircuitState::Closed => {
                if failures >= self.config.failure_threshold {
                    *state = ApiCircuitState::Open;
                    tracing::warn!(
                        "API circuit breaker '{}' OPENED after {} consecutive failures",
                        self.name,
                        failures
                    );
                }
            }
            ApiCircuitState::HalfOpen => {
                *state = ApiCircuitState::Open;
                tracing::warn!(
                    "API circuit breaker '{}' re-OPENED during half-open test",
                    self.name
                );
            }
            ApiCircuitState::Open => {}
        }
    }

    /// Run one API call through the breaker.
    ///
    /// Transport errors and 5xx answers count as failures. A 4xx answer means
    /// the API is up and rejected this particular request, so it counts as a
    /// success for breaker purposes while the error is still returned.
    pub async fn call<T, F>(&self, request: F) -> ApiResult<T>
    where
        F: Future<Output = ApiResult<T>>,
    {
        if !self.is_available() {
            return Err(ApiError::CircuitOpen { api: self.name });
        }

        let result = request.await;
        match &result {
            Ok(_) => self.record_success(),
            Err(ApiError::Status { status, .. }) if status.is_client_error() => {
                self.record_success()
            }
            Err(_) => self.record_failure(),
        }
        result
    }

    pub fn state(&self) -> ApiCircuitState {
        *self.state.read()
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn status_error(status: StatusCode) -> ApiError {
        ApiError::Status {
            api: "nhl",
            status,
            body: String::new(),
        }
    }

    #[test]
    fn test_api_circuit_breaker_basic() {
        let cb = ApiCircuitBreaker::new(
            "nhl",
            ApiCircuitBreakerConfig {
                failure_threshold: 3,
                recovery_timeout: Duration::from_millis(100),
                success_threshold: 2,
            },
        );

        assert!(cb.is_available());
        assert_eq!(cb.state(), ApiCircuitState::Closed);

        cb.record_failure();
        cb.record_failure();
        assert!(cb.is_available());

        cb.record_failure();
        assert_eq!(cb.state(), ApiCircuitState::Open);
        assert!(!cb.is_available());
    }

    #[test]
    fn test_api_circuit_breaker_recovery() {
        let cb = ApiCircuitBreaker::new(
            "nhl",
            ApiCircuitBreakerConfig {
                failure_threshold: 2,
                recovery_timeout: Duration::from_millis(10),
                success_threshold: 2,
            },
        );

        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), ApiCircuitState::Open);

        std::thread::sleep(Duration::from_millis(20));

        assert!(cb.is_available());
        assert_eq!(cb.state(), ApiCircuitState::HalfOpen);

        cb.record_success();
        assert_eq!(cb.state(), ApiCircuitState::HalfOpen); // Need 2 successes

        cb.record_success();
        assert_eq!(cb.state(), ApiCircuitState::Closed);
    }

    #[test]
    fn test_api_circuit_breaker_half_open_failure() {
        let cb = ApiCircuitBreaker::new(
            "nhl",
            ApiCircuitBreakerConfig {
                failure_threshold: 1,
                recovery_timeout: Duration::from_millis(10),
                success_threshold: 1,
            },
        );

        cb.record_failure();
        assert_eq!(cb.state(), ApiCircuitState::Open);

        std::thread::sleep(Duration::from_millis(20));
        assert!(cb.is_available());

        cb.record_failure();
        assert_eq!(cb.state(), ApiCircuitState::Open);
    }

    #[tokio::test]
    async fn test_call_fails_fast_when_open() {
        let cb = ApiCircuitBreaker::new(
            "nhl",
            ApiCircuitBreakerConfig {
                failure_threshold: 1,
                recovery_timeout: Duration::from_secs(60),
                success_threshold: 1,
            },
        );

        let first: ApiResult<()> = cb
            .call(async { Err(status_error(StatusCode::BAD_GATEWAY)) })
            .await;
        assert!(first.is_err());
        assert_eq!(cb.state(), ApiCircuitState::Open);

        let second: ApiResult<u32> = cb.call(async { Ok(1) }).await;
        assert!(matches!(second, Err(ApiError::CircuitOpen { api: "nhl" })));
    }

    #[tokio::test]
    async fn test_client_errors_do_not_trip() {
        let cb = ApiCircuitBreaker::new(
            "nhl",
            ApiCircuitBreakerConfig {
                failure_threshold: 2,
                recovery_timeout: Duration::from_secs(60),
                success_threshold: 1,
            },
        );

        for _ in 0..3 {
            let result: ApiResult<()> = cb
                .call(async { Err(status_error(StatusCode::BAD_REQUEST)) })
                .await;
            assert!(result.unwrap_err().is_status());
        }
        assert_eq!(cb.state(), ApiCircuitState::Closed);
        assert_eq!(cb.failure_count(), 0);
    }
}
