//! Bounded polling for "submit, then wait for a terminal status" interactions.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{timeout_at, Instant};

/// Interval and overall budget for a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Number of probes the budget allows; always at least one.
    pub fn max_attempts(&self) -> u32 {
        if self.interval.is_zero() {
            return 1;
        }
        let attempts = self.timeout.as_millis() / self.interval.as_millis().max(1);
        u32::try_from(attempts).unwrap_or(u32::MAX).max(1)
    }
}

impl Default for PollPolicy {
    /// One-second interval with a ten-second budget.
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(10))
    }
}

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus<T> {
    /// Terminal success
    Ready(T),
    /// Not terminal yet
    Pending,
    /// Terminal failure with a reason
    Failed(String),
}

#[derive(Debug, Error)]
pub enum PollError<E> {
    #[error("terminal failure: {0}")]
    Failed(String),
    #[error("no terminal status after {attempts} attempts")]
    TimedOut { attempts: u32 },
    #[error("probe failed: {0}")]
    Probe(E),
}

/// Probe until a terminal status, sleeping `policy.interval` between attempts.
///
/// The whole loop, including in-flight probes, is bounded by `policy.timeout`.
pub async fn poll_until<T, E, F, Fut>(policy: PollPolicy, mut probe: F) -> Result<T, PollError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PollStatus<T>, E>>,
{
    let max_attempts = policy.max_attempts();
    let deadline = Instant::now() + policy.timeout;
    let mut attempt = 0;

    loop {
        attempt += 1;
        let status = match timeout_at(deadline, probe(attempt)).await {
            Ok(status) => status.map_err(PollError::Probe)?,
            Err(_) => return Err(PollError::TimedOut { attempts: attempt }),
        };

        match status {
            PollStatus::Ready(value) => return Ok(value),
            PollStatus::Failed(reason) => return Err(PollError::Failed(reason)),
            PollStatus::Pending => {
                if attempt >= max_attempts || Instant::now() + policy.interval >= deadline {
                    return Err(PollError::TimedOut { attempts: attempt });
                }
                tokio::time::sleep(policy.interval).await;
            }
        }
    }
}
