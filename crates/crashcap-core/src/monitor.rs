use crate::alert::{AlertKind, AlertState, AlertStateMachine};
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::notify::Notifier;
use crate::sampler::{Sampler, SystemSampler};
use crate::types::MonitorStats;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Read-only view of the monitoring session, replaced wholesale once per tick.
///
/// Only the monitor loop writes it; everyone else reads through the watch
/// channel, so the foreground never races a mid-tick mutation.
#[derive(Debug, Clone)]
pub struct MonitorStatus {
    pub state: AlertState,
    pub last_used_percent: Option<f64>,
    pub last_transition: Option<DateTime<Utc>>,
    pub stats: MonitorStats,
}

impl MonitorStatus {
    fn initial() -> Self {
        Self {
            state: AlertState::Normal,
            last_used_percent: None,
            last_transition: None,
            stats: MonitorStats::new(),
        }
    }

    pub fn is_alerting(&self) -> bool {
        self.state.is_alerting()
    }
}

/// Handle to a running monitor loop.
pub struct MonitorHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
    status_rx: watch::Receiver<MonitorStatus>,
}

impl MonitorHandle {
    /// Latest status snapshot.
    pub fn status(&self) -> MonitorStatus {
        self.status_rx.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }

    /// Watch receiver for callers that want to await status changes.
    pub fn subscribe(&self) -> watch::Receiver<MonitorStatus> {
        self.status_rx.clone()
    }

    /// Stop the loop. Safe to call at any time, including mid-tick: an
    /// in-flight tick finishes first, and once this returns no further
    /// sample will be taken.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.join.await {
            error!("Monitor task did not shut down cleanly: {}", e);
        }
    }
}

/// Validate config and start the monitor loop against the live system.
///
/// Fails with a config error before any tick runs if the configuration is
/// out of bounds.
pub fn start_monitor(config: &MonitorConfig, notifier: Arc<dyn Notifier>) -> Result<MonitorHandle> {
    config.validate()?;

    Ok(start_monitor_with(
        Box::new(SystemSampler::new()),
        notifier,
        AlertStateMachine::from_config(config),
        Duration::from_secs(config.check_interval_secs),
    ))
}

/// Start the loop with explicit collaborators. Public so callers and tests
/// can substitute a scripted sampler or a custom cadence.
pub fn start_monitor_with(
    mut sampler: Box<dyn Sampler>,
    notifier: Arc<dyn Notifier>,
    mut machine: AlertStateMachine,
    period: Duration,
) -> MonitorHandle {
    let token = CancellationToken::new();
    let loop_token = token.child_token();
    let (status_tx, status_rx) = watch::channel(MonitorStatus::initial());

    let join = tokio::spawn(async move {
        let mut stats = MonitorStats::new();

        // Fixed-rate schedule measured from tick start; a tick that overruns
        // delays the next one by a full period instead of letting queued
        // ticks fire back-to-back.
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Monitor loop started, checking every {:?}", period);

        loop {
            tokio::select! {
                _ = loop_token.cancelled() => {
                    info!("Monitor loop stopped after {} ticks", stats.total_ticks);
                    break;
                }
                _ = ticker.tick() => {
                    let last_percent = tick(&mut *sampler, &mut machine, &*notifier, &mut stats);
                    let _ = status_tx.send(MonitorStatus {
                        state: machine.state(),
                        last_used_percent: last_percent,
                        last_transition: machine.last_transition(),
                        stats: stats.clone(),
                    });
                }
            }
        }
    });

    MonitorHandle {
        token,
        join,
        status_rx,
    }
}

/// One sample-then-evaluate cycle.
///
/// Every failure here is contained: a bad sample or a failed notification is
/// logged and the loop carries on. Returns the usage reading, if any.
fn tick(
    sampler: &mut dyn Sampler,
    machine: &mut AlertStateMachine,
    notifier: &dyn Notifier,
    stats: &mut MonitorStats,
) -> Option<f64> {
    stats.record_tick();

    let snapshot = match sampler.sample() {
        Ok(s) => s,
        Err(e) => {
            stats.record_failed_sample();
            warn!("Sampling failed, skipping tick: {}", e);
            return None;
        }
    };

    debug!(
        "Tick #{}: memory {:.1}%, swap {:.1}%, cpu {:.1}%",
        stats.total_ticks, snapshot.used_percent, snapshot.swap_used_percent, snapshot.cpu_percent
    );

    if let Some(event) = machine.observe(snapshot.used_percent) {
        match event.kind {
            AlertKind::HighMemory => stats.record_alert(),
            AlertKind::Recovered => stats.record_recovery(),
        }
        info!(
            "Alert state changed to {:?} at {:.1}% usage",
            machine.state(),
            event.used_percent
        );

        // The transition is already committed; failed delivery is logged,
        // never rolled back into the state machine.
        if let Err(e) = notifier.notify(event.severity(), "CrashCap memory monitor", &event.message())
        {
            stats.record_notification_failure();
            warn!("Notification delivery failed: {}", e);
        }
    }

    Some(snapshot.used_percent)
}
