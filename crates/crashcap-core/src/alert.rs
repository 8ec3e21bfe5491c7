use crate::config::MonitorConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert condition of the monitoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertState {
    Normal,
    Alerting,
}

impl AlertState {
    pub fn is_alerting(&self) -> bool {
        matches!(self, AlertState::Alerting)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    HighMemory,
    Recovered,
}

/// A single threshold crossing. Emitted once per transition, never per sample.
#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub used_percent: f64,
    pub threshold: f64,
    pub at: DateTime<Utc>,
}

impl AlertEvent {
    /// Severity tag handed to the notifier.
    pub fn severity(&self) -> &'static str {
        match self.kind {
            AlertKind::HighMemory => "alert",
            AlertKind::Recovered => "recovered",
        }
    }

    pub fn message(&self) -> String {
        match self.kind {
            AlertKind::HighMemory => format!(
                "Memory usage {:.1}% is at or above the {:.0}% threshold",
                self.used_percent, self.threshold
            ),
            AlertKind::Recovered => format!(
                "Memory usage back to {:.1}%, below the {:.0}% threshold",
                self.used_percent, self.threshold
            ),
        }
    }
}

/// Two-state threshold alert machine.
///
/// Feed it one aggregate usage reading per tick. It emits at most one event
/// per state transition: consecutive readings on the same side of the
/// threshold never repeat a notification, whatever the sampling interval.
#[derive(Debug)]
pub struct AlertStateMachine {
    state: AlertState,
    threshold: f64,
    hysteresis: f64,
    recovery_events: bool,
    last_transition: Option<DateTime<Utc>>,
}

impl AlertStateMachine {
    pub fn new(threshold: f64) -> Self {
        Self {
            state: AlertState::Normal,
            threshold,
            hysteresis: 0.0,
            recovery_events: true,
            last_transition: None,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.memory_threshold)
            .with_hysteresis(config.hysteresis_percent)
            .with_recovery_events(config.notify_on_recovery)
    }

    /// Require usage to drop `margin` percentage points below the threshold
    /// before recovering. Zero means the same threshold in both directions.
    pub fn with_hysteresis(mut self, margin: f64) -> Self {
        self.hysteresis = margin;
        self
    }

    /// Whether ALERTING -> NORMAL produces an event. The state transitions
    /// either way; this only gates the notification.
    pub fn with_recovery_events(mut self, enabled: bool) -> Self {
        self.recovery_events = enabled;
        self
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn last_transition(&self) -> Option<DateTime<Utc>> {
        self.last_transition
    }

    /// Evaluate one reading. Returns an event only on a state transition.
    pub fn observe(&mut self, used_percent: f64) -> Option<AlertEvent> {
        match self.state {
            AlertState::Normal if used_percent >= self.threshold => {
                self.transition(AlertState::Alerting);
                Some(self.event(AlertKind::HighMemory, used_percent))
            }
            AlertState::Alerting if used_percent < self.threshold - self.hysteresis => {
                self.transition(AlertState::Normal);
                if self.recovery_events {
                    Some(self.event(AlertKind::Recovered, used_percent))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn transition(&mut self, next: AlertState) {
        self.state = next;
        self.last_transition = Some(Utc::now());
    }

    fn event(&self, kind: AlertKind, used_percent: f64) -> AlertEvent {
        AlertEvent {
            kind,
            used_percent,
            threshold: self.threshold,
            at: self.last_transition.unwrap_or_else(Utc::now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(machine: &mut AlertStateMachine, readings: &[f64]) -> Vec<AlertEvent> {
        readings
            .iter()
            .filter_map(|&r| machine.observe(r))
            .collect()
    }

    #[test]
    fn test_initial_state_is_normal() {
        let machine = AlertStateMachine::new(80.0);
        assert_eq!(machine.state(), AlertState::Normal);
        assert!(machine.last_transition().is_none());
    }

    #[test]
    fn test_one_event_per_transition_not_per_sample() {
        // Threshold 80, seven readings, five of them over
        let mut machine = AlertStateMachine::new(80.0);
        let events = feed(&mut machine, &[85.0, 90.0, 88.0, 95.0, 70.0, 50.0, 82.0]);

        // Exactly: alert at 85, recovery at 70, alert again at 82
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, AlertKind::HighMemory);
        assert_eq!(events[0].used_percent, 85.0);
        assert_eq!(events[1].kind, AlertKind::Recovered);
        assert_eq!(events[1].used_percent, 70.0);
        assert_eq!(events[2].kind, AlertKind::HighMemory);
        assert_eq!(machine.state(), AlertState::Alerting);
    }

    #[test]
    fn test_no_storm_while_staying_over_threshold() {
        let mut machine = AlertStateMachine::new(80.0);
        let events = feed(&mut machine, &[99.0; 100]);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_no_events_while_staying_under_threshold() {
        let mut machine = AlertStateMachine::new(80.0);
        let events = feed(&mut machine, &[10.0, 50.0, 79.9, 0.0]);
        assert!(events.is_empty());
        assert_eq!(machine.state(), AlertState::Normal);
    }

    #[test]
    fn test_threshold_is_inclusive_on_entry() {
        let mut machine = AlertStateMachine::new(80.0);
        let event = machine.observe(80.0).expect("80.0 >= 80.0 must alert");
        assert_eq!(event.kind, AlertKind::HighMemory);
    }

    #[test]
    fn test_exact_threshold_does_not_recover() {
        let mut machine = AlertStateMachine::new(80.0);
        machine.observe(90.0);
        // Same threshold both directions: 80.0 is not < 80.0
        assert!(machine.observe(80.0).is_none());
        assert_eq!(machine.state(), AlertState::Alerting);
        // One tenth below does recover
        let event = machine.observe(79.9).expect("must recover below threshold");
        assert_eq!(event.kind, AlertKind::Recovered);
    }

    #[test]
    fn test_hysteresis_delays_recovery() {
        let mut machine = AlertStateMachine::new(80.0).with_hysteresis(5.0);
        machine.observe(85.0);

        // 78 is below the threshold but inside the 75..80 band
        assert!(machine.observe(78.0).is_none());
        assert_eq!(machine.state(), AlertState::Alerting);

        let event = machine.observe(74.0).expect("below band must recover");
        assert_eq!(event.kind, AlertKind::Recovered);
        assert_eq!(machine.state(), AlertState::Normal);
    }

    #[test]
    fn test_recovery_events_disabled_still_transitions() {
        let mut machine = AlertStateMachine::new(80.0).with_recovery_events(false);

        assert!(machine.observe(90.0).is_some());
        assert!(machine.observe(50.0).is_none());
        // State moved even though no event was emitted
        assert_eq!(machine.state(), AlertState::Normal);

        // And the next crossing alerts again
        assert!(machine.observe(95.0).is_some());
    }

    #[test]
    fn test_alert_count_equals_transition_count() {
        let mut machine = AlertStateMachine::new(80.0);
        let readings = [81.0, 82.0, 79.0, 83.0, 84.0, 85.0, 10.0, 90.0];
        let events = feed(&mut machine, &readings);

        let alerts = events
            .iter()
            .filter(|e| e.kind == AlertKind::HighMemory)
            .count();
        let recoveries = events
            .iter()
            .filter(|e| e.kind == AlertKind::Recovered)
            .count();

        // Three upward crossings, two downward
        assert_eq!(alerts, 3);
        assert_eq!(recoveries, 2);
    }

    #[test]
    fn test_last_transition_updates_on_crossing_only() {
        let mut machine = AlertStateMachine::new(80.0);

        machine.observe(50.0);
        assert!(machine.last_transition().is_none());

        machine.observe(85.0);
        let first = machine.last_transition().expect("transition recorded");

        machine.observe(90.0);
        assert_eq!(machine.last_transition(), Some(first));
    }

    #[test]
    fn test_event_message_and_severity() {
        let mut machine = AlertStateMachine::new(80.0);
        let event = machine.observe(91.5).unwrap();

        assert_eq!(event.severity(), "alert");
        assert!(event.message().contains("91.5"));
        assert!(event.message().contains("80"));

        let recovery = machine.observe(40.0).unwrap();
        assert_eq!(recovery.severity(), "recovered");
    }

    #[test]
    fn test_from_config() {
        let mut config = MonitorConfig::default();
        config.memory_threshold = 70.0;
        config.notify_on_recovery = false;
        config.hysteresis_percent = 3.0;

        let mut machine = AlertStateMachine::from_config(&config);
        assert!(machine.observe(70.0).is_some());
        assert!(machine.observe(68.0).is_none()); // inside band
        assert!(machine.observe(60.0).is_none()); // recovery events off
        assert_eq!(machine.state(), AlertState::Normal);
    }
}
