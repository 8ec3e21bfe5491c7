// Integration tests for the monitor loop, driven through the public API
// with scripted collaborators instead of the live system.

use crashcap_core::{
    start_monitor, start_monitor_with, AlertStateMachine, Error, MemorySnapshot, MonitorConfig,
    Notifier, Result, Sampler,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct ScriptedSampler {
    readings: Vec<f64>,
    index: usize,
    calls: Arc<AtomicU64>,
}

impl ScriptedSampler {
    fn new(readings: &[f64], calls: Arc<AtomicU64>) -> Self {
        Self {
            readings: readings.to_vec(),
            index: 0,
            calls,
        }
    }
}

impl Sampler for ScriptedSampler {
    fn sample(&mut self) -> Result<MemorySnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reading = self
            .readings
            .get(self.index)
            .or_else(|| self.readings.last())
            .copied()
            .unwrap_or(0.0);
        if self.index < self.readings.len() {
            self.index += 1;
        }
        let used = (reading * 10.0).round() as u64;
        Ok(MemorySnapshot::new(1000, used, 1000 - used))
    }
}

#[derive(Default)]
struct RecordingNotifier {
    deliveries: std::sync::Mutex<Vec<(String, String)>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, severity: &str, _summary: &str, body: &str) -> Result<()> {
        self.deliveries
            .lock()
            .unwrap()
            .push((severity.to_string(), body.to_string()));
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn spec_sequence_produces_one_alert_per_crossing() {
    let calls = Arc::new(AtomicU64::new(0));
    let notifier = Arc::new(RecordingNotifier::default());

    // Threshold 80: alert at 85, recovery at 70, alert again at 82, then the
    // sampler keeps repeating 82 for every remaining tick.
    let handle = start_monitor_with(
        Box::new(ScriptedSampler::new(
            &[85.0, 90.0, 88.0, 95.0, 70.0, 50.0, 82.0],
            calls.clone(),
        )),
        notifier.clone(),
        AlertStateMachine::new(80.0),
        Duration::from_millis(10),
    );

    tokio::time::sleep(Duration::from_millis(600)).await;
    handle.stop().await;

    // Far more samples than notifications
    assert!(calls.load(Ordering::SeqCst) > 10);

    let deliveries = notifier.deliveries.lock().unwrap();
    let severities: Vec<&str> = deliveries.iter().map(|(s, _)| s.as_str()).collect();
    assert_eq!(severities, vec!["alert", "recovered", "alert"]);
}

#[tokio::test(start_paused = true)]
async fn stop_is_ordered_after_inflight_tick() {
    let calls = Arc::new(AtomicU64::new(0));

    let handle = start_monitor_with(
        Box::new(ScriptedSampler::new(&[50.0], calls.clone())),
        Arc::new(RecordingNotifier::default()),
        AlertStateMachine::new(80.0),
        Duration::from_millis(10),
    );

    tokio::time::sleep(Duration::from_millis(105)).await;
    handle.stop().await;
    let stabilized = calls.load(Ordering::SeqCst);

    // Long after stop() returned, not a single extra sample was taken
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(calls.load(Ordering::SeqCst), stabilized);
}

#[tokio::test(start_paused = true)]
async fn recovery_notification_can_be_disabled() {
    let calls = Arc::new(AtomicU64::new(0));
    let notifier = Arc::new(RecordingNotifier::default());

    let handle = start_monitor_with(
        Box::new(ScriptedSampler::new(&[90.0, 40.0, 40.0], calls)),
        notifier.clone(),
        AlertStateMachine::new(80.0).with_recovery_events(false),
        Duration::from_millis(10),
    );

    tokio::time::sleep(Duration::from_millis(200)).await;
    let status = handle.status();
    handle.stop().await;

    let deliveries = notifier.deliveries.lock().unwrap();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].0, "alert");

    // The machine still recovered; only the notification was suppressed
    assert!(!status.is_alerting());
}

#[tokio::test]
async fn invalid_config_never_starts_the_loop() {
    let notifier = Arc::new(RecordingNotifier::default());

    let mut config = MonitorConfig::default();
    config.memory_threshold = 150.0;
    assert!(matches!(
        start_monitor(&config, notifier.clone()),
        Err(Error::Config(_))
    ));

    let mut config = MonitorConfig::default();
    config.check_interval_secs = 0;
    assert!(matches!(
        start_monitor(&config, notifier.clone()),
        Err(Error::Config(_))
    ));

    assert!(notifier.deliveries.lock().unwrap().is_empty());
}
