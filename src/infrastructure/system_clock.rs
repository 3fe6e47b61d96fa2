//! Local wall clock backed by `chrono::Local` and `tokio::time`.

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use std::time::Duration;

use crate::domain::services::Clock;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sleep_advances_tokio_time() {
        let started = tokio::time::Instant::now();
        SystemClock.sleep(Duration::from_secs(600)).await;
        assert!(started.elapsed() >= Duration::from_secs(600));
    }
}
