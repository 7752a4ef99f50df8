//! Rate-limited corrector: wraps any [`CorrectionService`] and never fails.
//!
//! Behaviour per call:
//!
//! ```text
//! now - last_success < min_interval ──▶ return text (no request)
//! request ──▶ Ok(corrected)          ──▶ last_success = now, return corrected
//!         ──▶ Err(RateLimited)       ──▶ sleep base^n s, retry (n ≤ max_retries)
//!                                        retries exhausted ──▶ return text
//!         ──▶ Err(anything else)     ──▶ return text
//! ```
//!
//! Calls on one instance are serialized: a call arriving while another is
//! still talking to the service waits its turn, then goes through the gate.
//! A burst of results therefore costs at most one request per interval.
//!
//! Callers always get a string back; correction problems only show up in the
//! log.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::config::CorrectionConfig;
use crate::llm::client::LlmError;
use crate::llm::corrector::{CorrectionService, TextCorrector};

// ---------------------------------------------------------------------------
// CorrectionThrottle
// ---------------------------------------------------------------------------

/// Throttle state owned by one corrector instance.
#[derive(Debug, Clone)]
pub struct CorrectionThrottle {
    /// When the last correction succeeded; `None` until the first success.
    pub last_success_at: Option<Instant>,
    pub min_interval: Duration,
    pub max_retries: u32,
    pub backoff_base_secs: u64,
}

impl CorrectionThrottle {
    pub fn from_config(config: &CorrectionConfig) -> Self {
        Self {
            last_success_at: None,
            min_interval: config.min_interval(),
            max_retries: config.max_retries,
            backoff_base_secs: config.backoff_base_secs,
        }
    }

    /// `true` while `now` is still inside the minimum interval after the
    /// last success.
    pub fn is_gated(&self, now: Instant) -> bool {
        self.last_success_at
            .is_some_and(|last| now.saturating_duration_since(last) < self.min_interval)
    }

    /// Wait before retry number `retry` (1-based).
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        Duration::from_secs(self.backoff_base_secs.saturating_pow(retry))
    }
}

// ---------------------------------------------------------------------------
// RateLimitedCorrector
// ---------------------------------------------------------------------------

/// A [`TextCorrector`] that gates, retries and falls back around a
/// [`CorrectionService`].
///
/// `throttle` is only locked briefly; `turn` is held for a whole call.
///
/// # Example
/// ```rust
/// use dictation_composer::config::CorrectionConfig;
/// use dictation_composer::llm::{ApiCorrector, RateLimitedCorrector};
///
/// let config = CorrectionConfig::default();
/// let corrector = RateLimitedCorrector::new(
///     ApiCorrector::from_config(&config, "es-ES"),
///     &config,
/// );
/// assert!(corrector.last_success_at().is_none());
/// ```
pub struct RateLimitedCorrector<S: CorrectionService> {
    service: S,
    throttle: Mutex<CorrectionThrottle>,
    turn: tokio::sync::Mutex<()>,
}

impl<S: CorrectionService> RateLimitedCorrector<S> {
    pub fn new(service: S, config: &CorrectionConfig) -> Self {
        Self::with_throttle(service, CorrectionThrottle::from_config(config))
    }

    pub fn with_throttle(service: S, throttle: CorrectionThrottle) -> Self {
        Self {
            service,
            throttle: Mutex::new(throttle),
            turn: tokio::sync::Mutex::new(()),
        }
    }

    /// Return a reference to the wrapped service.
    pub fn inner(&self) -> &S {
        &self.service
    }

    pub fn last_success_at(&self) -> Option<Instant> {
        self.throttle.lock().unwrap().last_success_at
    }

    fn snapshot(&self) -> CorrectionThrottle {
        self.throttle.lock().unwrap().clone()
    }

    fn record_success(&self, at: Instant) {
        self.throttle.lock().unwrap().last_success_at = Some(at);
    }
}

#[async_trait]
impl<S: CorrectionService> TextCorrector for RateLimitedCorrector<S> {
    /// This implementation never fails; every degraded path returns `text`.
    async fn correct(&self, text: &str) -> String {
        let _turn = self.turn.lock().await;

        let throttle = self.snapshot();
        if throttle.is_gated(Instant::now()) {
            log::debug!("correction gated by min interval, passing text through");
            return text.to_string();
        }

        let mut retries = 0u32;
        loop {
            match self.service.request_correction(text).await {
                Ok(corrected) => {
                    self.record_success(Instant::now());
                    return corrected;
                }
                Err(LlmError::RateLimited) if retries < throttle.max_retries => {
                    retries += 1;
                    let wait = throttle.backoff_delay(retries);
                    log::warn!(
                        "correction rate limited, retry {retries}/{} in {}s",
                        throttle.max_retries,
                        wait.as_secs()
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(LlmError::RateLimited) => {
                    log::warn!(
                        "correction still rate limited after {retries} retries, returning raw text"
                    );
                    return text.to_string();
                }
                Err(err) => {
                    log::warn!(
                        "correction failed ({err}), returning raw text (len={})",
                        text.len()
                    );
                    return text.to_string();
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Replays a fixed script of responses, then answers with `fallback`.
    struct Scripted {
        script: Mutex<VecDeque<Result<String, LlmError>>>,
        fallback: fn() -> Result<String, LlmError>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(
            script: Vec<Result<String, LlmError>>,
            fallback: fn() -> Result<String, LlmError>,
        ) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CorrectionService for Scripted {
        async fn request_correction(&self, _text: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(self.fallback)
        }
    }

    fn always_ok() -> Result<String, LlmError> {
        Ok("Texto corregido.".into())
    }

    fn always_throttled() -> Result<String, LlmError> {
        Err(LlmError::RateLimited)
    }

    fn always_timeout() -> Result<String, LlmError> {
        Err(LlmError::Timeout)
    }

    /// Succeeds after a fixed delay.
    struct Slow {
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CorrectionService for Slow {
        async fn request_correction(&self, text: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(text.to_uppercase())
        }
    }

    fn corrector(service: Scripted) -> RateLimitedCorrector<Scripted> {
        RateLimitedCorrector::new(service, &CorrectionConfig::default())
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[test]
    fn backoff_is_exponential_in_base() {
        let throttle = CorrectionThrottle::from_config(&CorrectionConfig::default());
        assert_eq!(throttle.backoff_delay(1), Duration::from_secs(5));
        assert_eq!(throttle.backoff_delay(2), Duration::from_secs(25));
        assert_eq!(throttle.backoff_delay(3), Duration::from_secs(125));
    }

    #[tokio::test(start_paused = true)]
    async fn success_updates_throttle_timestamp() {
        let c = corrector(Scripted::new(vec![], always_ok));
        let before = Instant::now();

        assert_eq!(c.correct("texto corejido").await, "Texto corregido.");
        assert!(c.last_success_at().is_some_and(|t| t >= before));
    }

    #[tokio::test(start_paused = true)]
    async fn second_call_inside_min_interval_passes_through() {
        let c = corrector(Scripted::new(vec![], always_ok));

        assert_eq!(c.correct("uno").await, "Texto corregido.");
        tokio::time::advance(Duration::from_millis(4_999)).await;
        assert_eq!(c.correct("dos").await, "dos");
        assert_eq!(c.inner().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gate_reopens_after_min_interval() {
        let c = corrector(Scripted::new(vec![], always_ok));

        c.correct("uno").await;
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(c.correct("dos").await, "Texto corregido.");
        assert_eq!(c.inner().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_twice_then_success_waits_5s_then_25s() {
        let c = corrector(Scripted::new(
            vec![Err(LlmError::RateLimited), Err(LlmError::RateLimited)],
            always_ok,
        ));
        let start = Instant::now();

        let out = c.correct("hola mundo").await;

        assert_eq!(out, "Texto corregido.");
        assert_eq!(c.inner().calls(), 3);
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(30) && waited < Duration::from_secs(31));
        assert!(c.last_success_at().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn always_throttled_returns_input_after_max_retries() {
        let c = corrector(Scripted::new(vec![], always_throttled));
        let start = Instant::now();

        let out = c.correct("sin corregir").await;

        assert_eq!(out, "sin corregir");
        // Initial attempt plus three retries, waiting 5 + 25 + 125 s.
        assert_eq!(c.inner().calls(), 4);
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(155) && waited < Duration::from_secs(156));
        assert!(c.last_success_at().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_returns_input_without_retry() {
        let c = corrector(Scripted::new(vec![], always_timeout));
        let start = Instant::now();

        assert_eq!(c.correct("texto").await, "texto");
        assert_eq!(c.inner().calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(c.last_success_at().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_does_not_arm_the_gate() {
        let c = corrector(Scripted::new(
            vec![Err(LlmError::Status(500))],
            always_ok,
        ));

        assert_eq!(c.correct("uno").await, "uno");
        assert_eq!(c.correct("dos").await, "Texto corregido.");
        assert_eq!(c.inner().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_while_request_in_flight_issues_one_request() {
        let c = Arc::new(RateLimitedCorrector::new(
            Slow {
                delay: Duration::from_millis(800),
                calls: AtomicUsize::new(0),
            },
            &CorrectionConfig::default(),
        ));

        let mut tasks = Vec::new();
        for i in 0..5 {
            let c = Arc::clone(&c);
            tasks.push(tokio::spawn(async move {
                c.correct(&format!("trozo {i}")).await
            }));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let mut outputs = Vec::new();
        for task in tasks {
            outputs.push(task.await.unwrap());
        }

        assert_eq!(c.inner().calls.load(Ordering::SeqCst), 1);
        assert_eq!(outputs[0], "TROZO 0");
        assert_eq!(&outputs[1..], ["trozo 1", "trozo 2", "trozo 3", "trozo 4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn queued_call_after_failed_request_tries_again() {
        let c = Arc::new(corrector(Scripted::new(
            vec![Err(LlmError::Status(503))],
            always_ok,
        )));

        let first = {
            let c = Arc::clone(&c);
            tokio::spawn(async move { c.correct("uno").await })
        };
        let second = {
            let c = Arc::clone(&c);
            tokio::spawn(async move { c.correct("dos").await })
        };

        assert_eq!(first.await.unwrap(), "uno");
        assert_eq!(second.await.unwrap(), "Texto corregido.");
        assert_eq!(c.inner().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_max_retries_gives_up_immediately() {
        let config = CorrectionConfig {
            max_retries: 0,
            ..CorrectionConfig::default()
        };
        let c = RateLimitedCorrector::new(Scripted::new(vec![], always_throttled), &config);

        assert_eq!(c.correct("x").await, "x");
        assert_eq!(c.inner().calls(), 1);
    }

    #[test]
    fn rate_limited_corrector_is_object_safe() {
        let c = corrector(Scripted::new(vec![], always_ok));
        let _: Box<dyn TextCorrector> = Box::new(c);
    }
}
