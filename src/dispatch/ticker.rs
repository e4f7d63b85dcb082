//! Time source for poll loops, swappable for virtual time in tests

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

#[async_trait]
pub trait Ticker: Send + Sync {
    /// Suspend for one poll period
    async fn tick(&self, period: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTicker;

#[async_trait]
impl Ticker for TokioTicker {
    async fn tick(&self, period: Duration) {
        tokio::time::sleep(period).await;
    }
}

/// Returns immediately and advances a virtual clock by each requested period
#[derive(Debug, Default)]
pub struct VirtualTicker {
    state: Mutex<VirtualClock>,
}

#[derive(Debug, Default)]
struct VirtualClock {
    elapsed: Duration,
    ticks: usize,
}

impl VirtualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time that has passed
    pub fn elapsed(&self) -> Duration {
        self.state.lock().map(|s| s.elapsed).unwrap_or_default()
    }

    pub fn ticks(&self) -> usize {
        self.state.lock().map(|s| s.ticks).unwrap_or_default()
    }
}

#[async_trait]
impl Ticker for VirtualTicker {
    async fn tick(&self, period: Duration) {
        if let Ok(mut state) = self.state.lock() {
            state.elapsed += period;
            state.ticks += 1;
        }
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_virtual_ticker_advances_without_sleeping() {
        let ticker = VirtualTicker::new();
        for _ in 0..3 {
            ticker.tick(Duration::from_secs(2)).await;
        }
        assert_eq!(ticker.ticks(), 3);
        assert_eq!(ticker.elapsed(), Duration::from_secs(6));
    }

    #[test]
    fn test_virtual_ticker_on_a_blocking_executor() {
        let ticker = VirtualTicker::new();
        tokio_test::block_on(ticker.tick(Duration::from_millis(20)));
        assert_eq!(ticker.ticks(), 1);
        assert_eq!(ticker.elapsed(), Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_tokio_ticker_sleeps() {
        let start = std::time::Instant::now();
        TokioTicker.tick(Duration::from_millis(20)).await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
