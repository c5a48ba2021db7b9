//! Pauses between census requests.
//!
//! Census Reporter rate-limits aggressively, so every request is followed
//! by a pause: a short throttle after success, a longer backoff after
//! failure. The pause goes through [`Pacer`] so tests and dry runs can
//! skip the wait.

use std::time::Duration;

use async_trait::async_trait;

/// Strategy for waiting between requests.
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Waits for `delay` before the next request may be issued.
    async fn pause(&self, delay: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Returns immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPacer;

#[async_trait]
impl Pacer for NoopPacer {
    async fn pause(&self, _delay: Duration) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn tokio_pacer_waits_for_delay() {
        let start = tokio::time::Instant::now();
        TokioPacer.pause(Duration::from_secs(10)).await;
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test]
    async fn noop_pacer_returns_immediately() {
        let start = std::time::Instant::now();
        NoopPacer.pause(Duration::from_secs(3600)).await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
