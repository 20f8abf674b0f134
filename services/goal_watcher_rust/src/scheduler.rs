//! Time source for the watcher loop
//!
//! All waits (poll interval, pre-roll delay, hold duration, audio join
//! timeout) and the notion of "today" go through [`Clock`], so tests can run
//! the whole loop without sleeping.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use std::time::Duration;

#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);

    /// Local calendar date, matched against the scoreboard's date sections
    fn today(&self) -> NaiveDate;
}

/// Wall clock backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Format a duration the way the logs show waits: "5s", "1m30s"
pub fn format_wait(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else if secs == 0 && !duration.is_zero() {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{}s", secs)
    }
}
