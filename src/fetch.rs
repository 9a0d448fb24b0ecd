use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::Context;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("not found: {key}")]
    NotFound { key: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("fetch failed: {0}")]
    Fatal(String),
}

/// Fetch-by-key access to an external source.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, key: &str) -> Result<String, FetchError>;
}

/// Reads `<dir>/<key>` from a local copy of a remote repository.
pub struct LocalMirror {
    dir: PathBuf,
}

impl LocalMirror {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Fetcher for LocalMirror {
    fn fetch(&self, key: &str) -> Result<String, FetchError> {
        let path = self.dir.join(key);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(text.trim_start_matches('\u{FEFF}').to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FetchError::NotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(FetchError::Fatal(format!("{}: {e}", path.display()))),
        }
    }
}

/// At most `max_calls` acquisitions per sliding `window`.
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            window,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    /// Blocks until a call slot is free, then takes it.
    pub fn acquire(&self) {
        loop {
            let wait = {
                let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
                let now = Instant::now();
                while calls
                    .front()
                    .is_some_and(|t| now.duration_since(*t) >= self.window)
                {
                    calls.pop_front();
                }
                if calls.len() < self.max_calls {
                    calls.push_back(now);
                    return;
                }
                match calls.front() {
                    Some(oldest) => self.window.saturating_sub(now.duration_since(*oldest)),
                    None => Duration::ZERO,
                }
            };
            std::thread::sleep(wait);
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Rate-limited fetcher that retries throttled and transient failures.
/// `LocalMirror` only ever fails with `NotFound` or `Fatal`; the retry path
/// serves remote endpoints implementing `Fetcher`.
pub struct ThrottledFetcher<F> {
    inner: F,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
}

impl<F: Fetcher> ThrottledFetcher<F> {
    pub fn new(inner: F, limiter: Arc<RateLimiter>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            limiter,
            policy,
        }
    }
}

impl<F: Fetcher> Fetcher for ThrottledFetcher<F> {
    fn fetch(&self, key: &str) -> Result<String, FetchError> {
        let mut attempt = 0u32;
        loop {
            self.limiter.acquire();
            let err = match self.inner.fetch(key) {
                Ok(text) => return Ok(text),
                Err(e) => e,
            };
            let wait = match &err {
                FetchError::RateLimited { retry_after } => *retry_after,
                FetchError::Transient(_) => self.policy.backoff.saturating_mul(1 << attempt.min(16)),
                FetchError::NotFound { .. } | FetchError::Fatal(_) => return Err(err),
            };
            if attempt >= self.policy.max_retries {
                return Err(FetchError::Fatal(format!(
                    "{key}: giving up after {} attempts: {err}",
                    attempt + 1
                )));
            }
            attempt += 1;
            warn!(%key, attempt, wait_ms = wait.as_millis() as u64, error = %err, "retrying fetch");
            std::thread::sleep(wait);
        }
    }
}

/// Fetches and parses a JSON document. A missing key is `None`.
pub fn fetch_json<T: DeserializeOwned>(
    fetcher: &dyn Fetcher,
    key: &str,
) -> anyhow::Result<Option<T>> {
    let text = match fetcher.fetch(key) {
        Ok(text) => text,
        Err(FetchError::NotFound { .. }) => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("fetch {key}")),
    };
    let value = serde_json::from_str(&text).with_context(|| format!("parse {key}"))?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        replies: Mutex<VecDeque<Result<String, FetchError>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, FetchError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Fetcher for Scripted {
        fn fetch(&self, _key: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Fatal("script exhausted".into())))
        }
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff: Duration::from_millis(1),
        }
    }

    fn limiter() -> Arc<RateLimiter> {
        Arc::new(RateLimiter::new(100, Duration::from_millis(10)))
    }

    #[test]
    fn retries_rate_limited_and_transient_failures() {
        let inner = Scripted::new(vec![
            Err(FetchError::RateLimited {
                retry_after: Duration::from_millis(2),
            }),
            Err(FetchError::Transient("reset".into())),
            Ok("{}".into()),
        ]);
        let fetcher = ThrottledFetcher::new(inner, limiter(), policy(3));
        assert_eq!(fetcher.fetch("a.json").expect("fetch"), "{}");
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn gives_up_after_bounded_retries() {
        let inner = Scripted::new(
            (0..10)
                .map(|_| Err(FetchError::Transient("503".into())))
                .collect(),
        );
        let fetcher = ThrottledFetcher::new(inner, limiter(), policy(2));
        let err = fetcher.fetch("a.json").expect_err("must fail");
        assert!(matches!(err, FetchError::Fatal(_)));
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn not_found_is_not_retried() {
        let inner = Scripted::new(vec![Err(FetchError::NotFound { key: "x".into() })]);
        let fetcher = ThrottledFetcher::new(inner, limiter(), policy(5));
        assert!(matches!(fetcher.fetch("x"), Err(FetchError::NotFound { .. })));
        assert_eq!(fetcher.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn limiter_blocks_once_the_window_is_full() {
        let limiter = RateLimiter::new(2, Duration::from_millis(50));
        let start = Instant::now();
        limiter.acquire();
        limiter.acquire();
        assert!(start.elapsed() < Duration::from_millis(50));
        limiter.acquire();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn local_mirror_reports_missing_keys() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join("a.json"), "\u{FEFF}{\"k\": \"v\"}").expect("write");
        let mirror = LocalMirror::new(tmp.path());

        let value: Option<serde_json::Value> = fetch_json(&mirror, "a.json").expect("fetch");
        assert_eq!(value, Some(serde_json::json!({"k": "v"})));
        let missing: Option<serde_json::Value> = fetch_json(&mirror, "b.json").expect("fetch");
        assert!(missing.is_none());
    }
}
