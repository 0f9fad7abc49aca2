//! Bounded polling with exponential backoff.
//!
//! Used to wait out transient hub states such as `UNSCHEDULING`, where the
//! only way to observe progress is to fetch the resource again.

use hubsync_config::PollSettings;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// Total number of fetches before giving up.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::from(&PollSettings::default())
    }
}

impl From<&PollSettings> for PollConfig {
    fn from(settings: &PollSettings) -> Self {
        let factor = if settings.factor.is_finite() && settings.factor >= 1.0 {
            settings.factor
        } else {
            let fallback = PollSettings::default().factor;
            warn!(
                "Ignoring poll backoff factor {}, using {}",
                settings.factor, fallback
            );
            fallback
        };

        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            factor,
        }
    }
}

impl PollConfig {
    /// Minimal delays, for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            factor: 2.0,
        }
    }

    /// Delay after `current`, capped at `max_delay`. A factor that cannot
    /// produce a valid duration goes straight to `max_delay`.
    fn next_delay(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Call `fetch` until `ready` accepts its output.
///
/// Returns `Ok(None)` once `max_attempts` fetches have not produced a ready
/// value. A fetch error ends the poll immediately.
pub async fn poll_until<T, E, F, Fut, P>(
    operation_name: &str,
    config: &PollConfig,
    mut fetch: F,
    ready: P,
) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
{
    let mut delay = config.initial_delay;

    for attempt in 1..=config.max_attempts {
        let value = fetch().await?;
        if ready(&value) {
            if attempt > 1 {
                debug!("'{}' settled after {} attempts", operation_name, attempt);
            }
            return Ok(Some(value));
        }

        if attempt < config.max_attempts {
            debug!(
                "'{}' not settled (attempt {}/{}), checking again in {:?}",
                operation_name, attempt, config.max_attempts, delay
            );
            sleep(delay).await;
            delay = config.next_delay(delay);
        }
    }

    Ok(None)
}
