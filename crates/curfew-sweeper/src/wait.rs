//! Polling for asynchronous provider-state transitions
//!
//! Stop actions on instances and databases only start a transition; the
//! executor polls the provider with exponential backoff until the resource
//! reports its terminal state or the wait times out.

use anyhow::Result;
use backon::{BackoffBuilder, ExponentialBuilder};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Backoff configuration for terminal-state polling
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Initial delay between checks
    pub initial_delay: Duration,
    /// Cap for the exponential growth of the delay
    pub max_delay: Duration,
    /// Maximum total time to wait before giving up
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(15),
            timeout: Duration::from_secs(600),
        }
    }
}

/// Poll `check` until it returns `Ok(true)`, with exponential backoff.
///
/// * `Ok(true)` - the resource reached its terminal state
/// * `Ok(false)` - not there yet, retry after the next delay
/// * `Err` - a check failed; propagated immediately
///
/// Times out with an error after `config.timeout`.
pub async fn wait_for_state<F, Fut>(config: WaitConfig, check: F, what: &str) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = std::time::Instant::now();
    let mut attempts = 0u32;

    let mut delays = ExponentialBuilder::default()
        .with_min_delay(config.initial_delay)
        .with_max_delay(config.max_delay)
        .with_factor(2.0)
        .with_jitter()
        .build();

    loop {
        attempts += 1;

        if start.elapsed() >= config.timeout {
            anyhow::bail!(
                "Timeout waiting for {} after {:?} ({} attempts)",
                what,
                config.timeout,
                attempts
            );
        }

        if check().await? {
            debug!(what = %what, attempts, "Terminal state reached");
            return Ok(());
        }

        let delay = delays.next().unwrap_or(config.max_delay);
        debug!(
            what = %what,
            attempt = attempts,
            delay_ms = delay.as_millis(),
            "Not in terminal state yet, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
