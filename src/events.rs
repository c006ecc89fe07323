use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::monitor::ElementState;
use crate::plan::ElementId;

const CHANNEL_CAPACITY: usize = 256;

/// Where a preference mutation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackSource {
    Increase,
    Decrease,
    Inactivity,
    Direct,
}

impl FeedbackSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increase => "increase",
            Self::Decrease => "decrease",
            Self::Inactivity => "inactivity",
            Self::Direct => "direct",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceChangedPayload {
    pub multiplier: f64,
    pub latest_entry: f64,
    pub history_len: usize,
    pub source: FeedbackSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementAdaptedPayload {
    pub element: ElementId,
    pub state: ElementState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum LoopEvent {
    #[serde(rename = "PREFERENCE_CHANGED")]
    PreferenceChanged(PreferenceChangedPayload),

    #[serde(rename = "ELEMENT_ADAPTED")]
    ElementAdapted(ElementAdaptedPayload),
}

impl LoopEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            LoopEvent::PreferenceChanged(_) => "PREFERENCE_CHANGED",
            LoopEvent::ElementAdapted(_) => "ELEMENT_ADAPTED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub id: String,
    pub event: LoopEvent,
    pub created_at: DateTime<Utc>,
}

impl EventEnvelope {
    pub fn new(event: LoopEvent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event,
            created_at: Utc::now(),
        }
    }
}

/// Broadcast bus decoupling the knowledge layer from the orchestrator.
///
/// The weight engine publishes `PreferenceChanged` after it has recomputed its
/// cached multiplier, so any subscriber that reacts to the event observes the
/// updated value.
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: LoopEvent) {
        let envelope = EventEnvelope::new(event);
        let event_type = envelope.event.event_type();

        match self.sender.send(envelope) {
            Ok(sent_to) => debug!(event_type, sent_to, "Event published"),
            Err(_) => debug!(event_type, "Event published with no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
