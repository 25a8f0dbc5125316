//! Backend call retry with exponential backoff
//!
//! transport 실패만 재시도한다. provider가 응답했는데 내용이 잘못된 경우는
//! 같은 요청을 다시 보내도 나아지지 않으므로 바로 돌려준다.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use stepwise_foundation::AgentSettings;
use stepwise_provider::ProviderError;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry budget and backoff shape
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// 첫 시도를 제외한 재시도 횟수
    pub max_retries: u32,

    pub initial_delay_ms: u64,

    /// 시도마다 곱해지는 배수
    pub backoff_multiplier: f64,

    /// 대기 시간 상한 (rate limit 힌트에도 적용)
    pub max_delay_ms: u64,

    /// 대기 시간을 ±20% 흔든다
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from_settings(&AgentSettings::default())
    }
}

impl RetryConfig {
    pub fn from_settings(settings: &AgentSettings) -> Self {
        Self {
            max_retries: settings.transport_retries,
            initial_delay_ms: settings.retry_initial_delay_ms,
            backoff_multiplier: 2.0,
            max_delay_ms: settings.retry_max_delay_ms,
            jitter: true,
        }
    }

    /// 첫 실패에서 바로 포기
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// `retry`번째 재시도 전 대기 시간 (0부터)
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        let exp = self.backoff_multiplier.powi(retry.min(i32::MAX as u32) as i32);
        let mut ms = (self.initial_delay_ms as f64 * exp).min(self.max_delay_ms as f64);
        if self.jitter {
            ms *= 0.8 + jitter_fraction() * 0.4;
        }
        Duration::from_millis(ms as u64)
    }

    fn cap(&self, hint_ms: u64) -> Duration {
        Duration::from_millis(hint_ms.min(self.max_delay_ms))
    }
}

/// 0.0 ~ 1.0, 시계 나노초 기반
fn jitter_fraction() -> f64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    f64::from(nanos % 1000) / 1000.0
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// 영구 실패
    GiveUp,

    /// 일시적 실패, 지수 backoff
    Backoff,

    /// 서버가 알려준 시간만큼 대기
    WaitHint(u64),
}

/// Errors that know whether repeating the call can help
pub trait RetryableError {
    fn decision(&self) -> RetryDecision;
}

impl RetryableError for ProviderError {
    fn decision(&self) -> RetryDecision {
        match self {
            ProviderError::RateLimited {
                retry_after_ms: Some(ms),
            } => RetryDecision::WaitHint(*ms),
            ProviderError::RateLimited {
                retry_after_ms: None,
            } => RetryDecision::Backoff,
            e if e.is_transport() && e.is_retryable() => RetryDecision::Backoff,
            _ => RetryDecision::GiveUp,
        }
    }
}

/// Last error plus how many calls were made in total
#[derive(Debug, Clone, PartialEq)]
pub struct RetryError<E> {
    pub error: E,
    pub attempts: u32,
}

/// Run `operation` until it succeeds, fails permanently, or the budget runs out
///
/// `on_retry(retry, delay, error)`는 대기 직전에 호출된다. `retry`는 1부터.
pub async fn with_retry<T, E, F, Fut, R>(
    config: &RetryConfig,
    label: &str,
    mut operation: F,
    mut on_retry: R,
) -> Result<T, RetryError<E>>
where
    E: RetryableError + fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: FnMut(u32, Duration, &E),
{
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        let delay = match error.decision() {
            RetryDecision::GiveUp => {
                debug!("{}: giving up on attempt {}: {}", label, attempts, error);
                return Err(RetryError { error, attempts });
            }
            _ if attempts > config.max_retries => {
                warn!(
                    "{}: retry budget ({}) used up: {}",
                    label, config.max_retries, error
                );
                return Err(RetryError { error, attempts });
            }
            RetryDecision::WaitHint(ms) => config.cap(ms),
            RetryDecision::Backoff => config.delay_for_attempt(attempts - 1),
        };

        warn!(
            "{}: attempt {} failed, retrying in {:?}: {}",
            label, attempts, delay, error
        );
        on_retry(attempts, delay, &error);
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            jitter: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_backoff_doubles_until_cap() {
        let config = RetryConfig {
            jitter: false,
            ..Default::default()
        };

        let delays: Vec<u64> = (0..6)
            .map(|n| config.delay_for_attempt(n).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000, 30000]);
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let config = RetryConfig::default();
        for _ in 0..20 {
            let ms = config.delay_for_attempt(0).as_millis();
            assert!((800..=1200).contains(&ms), "{ms}");
        }
    }

    #[test]
    fn test_decisions() {
        assert_eq!(
            ProviderError::Network("reset".into()).decision(),
            RetryDecision::Backoff
        );
        assert_eq!(
            ProviderError::Authentication("bad key".into()).decision(),
            RetryDecision::GiveUp
        );
        assert_eq!(
            ProviderError::InvalidResponse("empty".into()).decision(),
            RetryDecision::GiveUp
        );
        assert_eq!(
            ProviderError::RateLimited {
                retry_after_ms: Some(10)
            }
            .decision(),
            RetryDecision::WaitHint(10)
        );
    }

    #[tokio::test]
    async fn test_retry_exhaustion_counts_attempts() {
        let calls = AtomicU32::new(0);
        let mut retries = Vec::new();

        let result: Result<(), _> = with_retry(
            &fast_config(2),
            "test",
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Timeout("slow".into()))
            },
            |retry, _, _| retries.push(retry),
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(retries, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);

        let result = with_retry(
            &fast_config(3),
            "test",
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ProviderError::ServerError("503".into()))
                } else {
                    Ok("ok")
                }
            },
            |_, _, _| {},
        )
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_hint_is_capped() {
        let mut delays = Vec::new();

        let result: Result<(), _> = with_retry(
            &fast_config(1),
            "test",
            || async {
                Err(ProviderError::RateLimited {
                    retry_after_ms: Some(60_000),
                })
            },
            |_, delay, _| delays.push(delay),
        )
        .await;

        assert_eq!(result.unwrap_err().attempts, 2);
        assert_eq!(delays, vec![Duration::from_millis(5)]);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry(
            &fast_config(3),
            "test",
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Authentication("401".into()))
            },
            |_, _, _| {},
        )
        .await;

        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
