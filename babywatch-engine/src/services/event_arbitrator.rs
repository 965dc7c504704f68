//! Event Arbitration Service
//!
//! Turns per-frame pose observations into debounced events:
//! - movement events, rate limited by a movement cooldown
//! - wake events, once an upright posture has been held long enough
//!
//! Every candidate event must also pass an [`EventGate`] that suppresses
//! rapid repeats of the same label.

use chrono::{DateTime, Utc};

use crate::config::ArbitrationConfig;
use crate::models::{DetectedEvent, EventExtras, EventLabel, PoseObservation, Posture};
use crate::services::elapsed_secs;

/// Final registration step every event must pass before emission
pub trait EventGate: Send {
    /// Register `label` at `at`, returning false when it must be suppressed
    fn try_register(&mut self, label: EventLabel, at: DateTime<Utc>) -> bool;

    fn reset(&mut self);
}

/// Rejects an event only when it repeats the last accepted label within the cooldown
#[derive(Debug, Clone)]
pub struct LastEventGate {
    cooldown_secs: f64,
    last: Option<(EventLabel, DateTime<Utc>)>,
}

impl LastEventGate {
    pub fn new(cooldown_secs: f64) -> Self {
        Self {
            cooldown_secs,
            last: None,
        }
    }

    pub fn last_event(&self) -> Option<(EventLabel, DateTime<Utc>)> {
        self.last
    }
}

impl EventGate for LastEventGate {
    fn try_register(&mut self, label: EventLabel, at: DateTime<Utc>) -> bool {
        if let Some((last_label, last_at)) = self.last {
            if last_label == label && elapsed_secs(last_at, at) < self.cooldown_secs {
                return false;
            }
        }
        self.last = Some((label, at));
        true
    }

    fn reset(&mut self) {
        self.last = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct WakeCandidate {
    posture: Posture,
    since: DateTime<Utc>,
}

pub struct EventArbitrator<G = LastEventGate> {
    movement_cooldown_secs: f64,
    wake_min_duration_secs: f64,
    gate: G,
    last_movement: Option<DateTime<Utc>>,
    wake_candidate: Option<WakeCandidate>,
    is_awake: bool,
}

impl EventArbitrator<LastEventGate> {
    pub fn new(config: &ArbitrationConfig) -> Self {
        Self::with_gate(config, LastEventGate::new(config.event_cooldown_secs))
    }
}

impl<G: EventGate> EventArbitrator<G> {
    pub fn with_gate(config: &ArbitrationConfig, gate: G) -> Self {
        Self {
            movement_cooldown_secs: config.movement_cooldown_secs,
            wake_min_duration_secs: config.wake_min_duration_secs,
            gate,
            last_movement: None,
            wake_candidate: None,
            is_awake: false,
        }
    }

    /// Feed one observation, returning the events it triggers
    pub fn process(&mut self, observation: &PoseObservation) -> Vec<DetectedEvent> {
        let now = observation.timestamp;
        let mut events = Vec::new();

        if let Some(event) = self.check_movement(observation, now) {
            events.push(event);
        }
        if let Some(event) = self.check_wake(observation, now) {
            events.push(event);
        }

        events
    }

    fn check_movement(&mut self, observation: &PoseObservation, now: DateTime<Utc>) -> Option<DetectedEvent> {
        if !observation.movement_detected {
            return None;
        }
        if let Some(last) = self.last_movement {
            if elapsed_secs(last, now) < self.movement_cooldown_secs {
                return None;
            }
        }

        let extras = EventExtras::from_features(
            observation.posture,
            observation.movement_score,
            &observation.features,
        );
        let mut event = DetectedEvent::new(EventLabel::Movement, "movement", extras);

        tracing::info!(
            trace_id = %event.trace_id,
            score = observation.movement_score,
            posture = %observation.posture,
            "Movement detected ({})",
            feature_summary(observation)
        );

        if !self.register(&mut event, now) {
            return None;
        }
        self.last_movement = Some(now);
        Some(event)
    }

    fn check_wake(&mut self, observation: &PoseObservation, now: DateTime<Utc>) -> Option<DetectedEvent> {
        let posture = observation.posture;

        if !posture.is_upright() {
            self.wake_candidate = None;
            self.is_awake = false;
            return None;
        }
        if self.is_awake {
            self.wake_candidate = None;
            return None;
        }

        let since = match self.wake_candidate {
            Some(candidate) if candidate.posture == posture => candidate.since,
            _ => {
                self.wake_candidate = Some(WakeCandidate { posture, since: now });
                return None;
            }
        };

        let duration = elapsed_secs(since, now);
        if duration < self.wake_min_duration_secs {
            return None;
        }

        let mut extras = EventExtras::from_features(posture, observation.movement_score, &observation.features);
        extras.duration_secs = Some(duration);
        let mut event = DetectedEvent::new(EventLabel::Wake, format!("wake ({})", posture), extras);

        tracing::info!(
            trace_id = %event.trace_id,
            posture = %posture,
            duration_secs = duration,
            "Wake detected ({})",
            feature_summary(observation)
        );

        if !self.register(&mut event, now) {
            // candidate kept, retried on the next frame
            return None;
        }
        self.is_awake = true;
        self.wake_candidate = None;
        Some(event)
    }

    fn register(&mut self, event: &mut DetectedEvent, now: DateTime<Utc>) -> bool {
        if !self.gate.try_register(event.label, now) {
            tracing::debug!(trace_id = %event.trace_id, label = %event.label, "Event suppressed by gate");
            return false;
        }
        event.extras.event_timestamp = Some(now);
        true
    }

    pub fn is_awake(&self) -> bool {
        self.is_awake
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }

    pub fn reset(&mut self) {
        self.gate.reset();
        self.last_movement = None;
        self.wake_candidate = None;
        self.is_awake = false;
    }
}

fn feature_summary(observation: &PoseObservation) -> String {
    let features = &observation.features;
    let knee = features
        .avg_knee_angle
        .map(|k| format!("{:.1}°", k))
        .unwrap_or_else(|| "n/a".to_string());
    let leg = features
        .leg_extension
        .map(|l| format!("{:.2}", l))
        .unwrap_or_else(|| "n/a".to_string());
    format!("torso={:.1}°, knee={}, leg={}", features.torso_angle, knee, leg)
}
