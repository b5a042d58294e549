//! Background refresh scheduler.
//!
//! Keeps the cache warm by forcing a refresh on a fixed, wall-clock aligned
//! interval. Each tick runs an independent retry sequence; a shared shutdown
//! channel cancels the tick loop and every pending retry at once. Retries
//! started by [`RefreshScheduler::force_update`] are coalesced so that at most
//! one background chain exists for manual refreshes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use fx_types::{RateError, RateProvider, RateSnapshot};

use crate::service::RateService;

/// Timing policy for [`RefreshScheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Tick period. Ticks land on UTC multiples of this value.
    pub interval: Duration,
    /// Retries after the first failed attempt of a tick.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2 * 60 * 60),
            max_retries: 3,
            retry_delay: Duration::from_secs(5 * 60),
        }
    }
}

struct SchedulerState {
    running: bool,
    shutdown: watch::Sender<bool>,
}

/// Periodically refreshes a [`RateService`] with bounded retry.
pub struct RefreshScheduler<P: RateProvider> {
    service: Arc<RateService<P>>,
    config: SchedulerConfig,
    state: Mutex<SchedulerState>,
    retry_pending: Arc<AtomicBool>,
}

/// Clears the pending flag when the background retry chain ends, however it ends.
struct PendingGuard(Arc<AtomicBool>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<P: RateProvider> RefreshScheduler<P> {
    pub fn new(service: Arc<RateService<P>>, config: SchedulerConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            service,
            config,
            state: Mutex::new(SchedulerState {
                running: false,
                shutdown,
            }),
            retry_pending: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn service(&self) -> &Arc<RateService<P>> {
        &self.service
    }

    pub fn is_running(&self) -> bool {
        self.lock_state().running
    }

    /// Whether a background retry chain from `force_update` is still alive.
    pub fn retry_pending(&self) -> bool {
        self.retry_pending.load(Ordering::Acquire)
    }

    /// Starts the tick loop. Returns `false` if it was already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> bool {
        let mut state = self.lock_state();
        if state.running {
            debug!("Exchange rate update scheduler already running");
            return false;
        }

        // A previous stop() left the channel signalled; start over with a fresh one.
        if *state.shutdown.borrow() {
            state.shutdown = watch::channel(false).0;
        }

        tokio::spawn(tick_loop(
            self.service.clone(),
            self.config.clone(),
            state.shutdown.subscribe(),
        ));
        state.running = true;

        info!(
            interval_secs = self.config.interval.as_secs(),
            "Exchange rate update scheduler started"
        );
        true
    }

    /// Stops the tick loop and cancels pending retries. Idempotent.
    ///
    /// An attempt already talking to the provider may complete, but nothing
    /// is rescheduled afterwards. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        let mut state = self.lock_state();
        state.shutdown.send_replace(true);

        let was_running = std::mem::replace(&mut state.running, false);
        if was_running {
            info!("Exchange rate update scheduler stopped");
        }
        was_running
    }

    /// Runs the retrying refresh immediately, independent of the timer.
    ///
    /// Returns the outcome of the first attempt. On failure the remaining
    /// retries continue in the background until they succeed or run out, or
    /// until the scheduler is stopped. A failure while a chain is already
    /// pending does not start another one.
    pub async fn force_update(&self) -> Result<Arc<RateSnapshot>, RateError> {
        info!("Forcing immediate exchange rate update");
        let shutdown = self.lock_state().shutdown.subscribe();

        match self.service.refresh().await {
            Ok(snapshot) => {
                info!("Successfully updated exchange rates");
                Ok(snapshot)
            }
            Err(err) => {
                error!(error = %err, "Failed to update exchange rates");
                if self.config.max_retries == 0 {
                    return Err(err);
                }
                if self.retry_pending.swap(true, Ordering::AcqRel) {
                    debug!("Background retry already pending; not scheduling another");
                    return Err(err);
                }

                log_retry(&self.config, 1);
                let guard = PendingGuard(self.retry_pending.clone());
                let service = self.service.clone();
                let config = self.config.clone();
                tokio::spawn(async move {
                    let _guard = guard;
                    refresh_with_retry(service, config, shutdown, 1).await;
                });
                Err(err)
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn tick_loop<P: RateProvider>(
    service: Arc<RateService<P>>,
    config: SchedulerConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let period = config.interval.max(Duration::from_secs(1));
    let first = next_tick_delay(Utc::now(), period);
    debug!(
        "Next scheduled exchange rate update in {} seconds",
        first.as_secs()
    );

    let mut ticker = tokio::time::interval_at(Instant::now() + first, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                if *shutdown.borrow() {
                    break;
                }
                debug!("Starting scheduled exchange rate update");
                tokio::spawn(refresh_with_retry(
                    service.clone(),
                    config.clone(),
                    shutdown.clone(),
                    0,
                ));
            }
        }
    }

    debug!("Exchange rate tick loop exited");
}

/// Attempts a refresh starting at `attempt` (0 is the initial try, anything
/// above waits `retry_delay` first), giving up after `max_retries` retries.
async fn refresh_with_retry<P: RateProvider>(
    service: Arc<RateService<P>>,
    config: SchedulerConfig,
    mut shutdown: watch::Receiver<bool>,
    mut attempt: u32,
) {
    loop {
        if attempt > 0 && !sleep_unless_shutdown(config.retry_delay, &mut shutdown).await {
            warn!(attempt, "Pending exchange rate retry cancelled by shutdown");
            return;
        }

        match service.refresh().await {
            Ok(_) => {
                info!("Successfully updated exchange rates");
                return;
            }
            Err(err) => {
                error!(attempt, error = %err, "Failed to update exchange rates");
                if attempt >= config.max_retries {
                    error!(
                        "Failed to update exchange rates after {} attempts",
                        attempt + 1
                    );
                    return;
                }
                attempt += 1;
                log_retry(&config, attempt);
            }
        }
    }
}

fn log_retry(config: &SchedulerConfig, attempt: u32) {
    info!(
        "Retrying update in {} seconds... (Attempt {}/{})",
        config.retry_delay.as_secs(),
        attempt,
        config.max_retries
    );
}

/// Sleeps for `delay`; returns `false` if shutdown was signalled first.
async fn sleep_unless_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow() {
        return false;
    }
    tokio::select! {
        biased;
        _ = shutdown.changed() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Time until the next UTC instant that is a whole multiple of `period`.
///
/// With a two hour period this fires at 00:00, 02:00, 04:00, ... regardless
/// of when the process started.
pub fn next_tick_delay(now: DateTime<Utc>, period: Duration) -> Duration {
    let period_ms = i64::try_from(period.as_millis()).unwrap_or(i64::MAX).max(1);
    let now_ms = now.timestamp_millis();
    let next_ms = (now_ms.div_euclid(period_ms) + 1).saturating_mul(period_ms);
    Duration::from_millis(u64::try_from(next_ms - now_ms).unwrap_or(0))
}
