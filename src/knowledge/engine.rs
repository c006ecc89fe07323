//! Weighted preference engine — the Knowledge element of the loop.
//!
//! Owns the preference history and the cached blended multiplier. Every
//! mutation goes through `record_preference`, which persists, recomputes and
//! only then publishes `PreferenceChanged`, so subscribers always observe the
//! updated multiplier.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::KnowledgeParams;
use crate::events::{EventBus, FeedbackSource, LoopEvent, PreferenceChangedPayload};
use crate::knowledge::history::PreferenceHistory;
use crate::knowledge::store::PreferenceRepository;
use crate::monitoring;

/// Read snapshot of the knowledge state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeSnapshot {
    pub history: Vec<f64>,
    pub multiplier: f64,
}

struct KnowledgeState {
    history: PreferenceHistory,
    multiplier: f64,
}

pub struct WeightEngine {
    params: KnowledgeParams,
    state: RwLock<KnowledgeState>,
    repository: PreferenceRepository,
    bus: Arc<EventBus>,
}

impl WeightEngine {
    /// Load the persisted history (defaulting on any failure) and derive the
    /// initial multiplier from it.
    pub fn new(params: KnowledgeParams, repository: PreferenceRepository, bus: Arc<EventBus>) -> Self {
        let history = repository.load_history(&params);
        let multiplier = history.weighted_multiplier(&params);
        debug!(
            history_len = history.len(),
            multiplier, "Weight engine initialized"
        );

        Self {
            params,
            state: RwLock::new(KnowledgeState {
                history,
                multiplier,
            }),
            repository,
            bus,
        }
    }

    pub fn params(&self) -> &KnowledgeParams {
        &self.params
    }

    pub async fn multiplier(&self) -> f64 {
        self.state.read().await.multiplier
    }

    pub async fn snapshot(&self) -> KnowledgeSnapshot {
        let state = self.state.read().await;
        KnowledgeSnapshot {
            history: state.history.values(),
            multiplier: state.multiplier,
        }
    }

    /// Validate and append a preference, persist it, recompute the cached
    /// multiplier and notify subscribers. Persistence failures are logged and
    /// swallowed; the in-memory state stays authoritative.
    pub async fn record_preference(&self, value: f64, source: FeedbackSource) {
        let payload = {
            let mut state = self.state.write().await;
            let stored = state.history.push(value, &self.params);
            state.multiplier = state.history.weighted_multiplier(&self.params);

            if let Err(e) = self.repository.save_history(&state.history) {
                warn!(error = %e, "Failed to persist preference history");
            }

            for violation in
                monitoring::check_knowledge(&state.history, state.multiplier, &self.params)
            {
                warn!(
                    field = %violation.field,
                    value = violation.value,
                    expected = %format!("[{}, {}]", violation.expected_min, violation.expected_max),
                    "Knowledge invariant violation detected"
                );
            }

            debug!(
                source = source.as_str(),
                stored,
                multiplier = state.multiplier,
                history_len = state.history.len(),
                "Preference recorded"
            );

            PreferenceChangedPayload {
                multiplier: state.multiplier,
                latest_entry: stored,
                history_len: state.history.len(),
                source,
            }
        };

        self.bus.publish(LoopEvent::PreferenceChanged(payload));
    }

    /// Explicit user feedback: one step up.
    pub async fn increase_preference(&self) {
        let latest = self.state.read().await.history.latest();
        self.record_preference(latest + self.params.feedback_step, FeedbackSource::Increase)
            .await;
    }

    /// Explicit user feedback: one step down.
    pub async fn decrease_preference(&self) {
        let latest = self.state.read().await.history.latest();
        self.record_preference(latest - self.params.feedback_step, FeedbackSource::Decrease)
            .await;
    }

    /// Automatic upward nudge: sustained unforced reading at the current scale
    /// under-utilizes the available preference range.
    pub async fn adapt_for_inactivity(&self) {
        let latest = self.state.read().await.history.latest();
        self.record_preference(
            latest + self.params.inactivity_step,
            FeedbackSource::Inactivity,
        )
        .await;
    }

    /// Target content scale for the renderer, rounded to 2 decimal places.
    pub async fn final_scale(&self) -> f64 {
        let multiplier = self.multiplier().await;
        (self.params.base_scale * multiplier * 100.0).round() / 100.0
    }

    /// The same scale in the `em` form the original rendering surface expects.
    pub async fn final_scale_em(&self) -> String {
        format!("{:.2}em", self.params.base_scale * self.multiplier().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::store::{KeyValueStore, MemoryStore, KEY_HISTORY};

    fn engine() -> WeightEngine {
        WeightEngine::new(
            KnowledgeParams::default(),
            PreferenceRepository::in_memory(),
            Arc::new(EventBus::new()),
        )
    }

    #[tokio::test]
    async fn starts_neutral_without_persisted_data() {
        let engine = engine();
        assert_eq!(engine.multiplier().await, 1.0);
        assert_eq!(engine.snapshot().await.history, vec![1.0]);
    }

    #[tokio::test]
    async fn increase_blends_toward_latest() {
        let engine = engine();
        engine.increase_preference().await;

        let snapshot = engine.snapshot().await;
        assert_eq!(snapshot.history, vec![1.0, 1.1]);
        assert!((snapshot.multiplier - 1.06).abs() < 1e-9);
    }

    #[tokio::test]
    async fn six_records_evict_the_oldest() {
        let engine = engine();
        for i in 0..6 {
            engine
                .record_preference(1.0 + i as f64 * 0.05, FeedbackSource::Direct)
                .await;
        }
        let snapshot = engine.snapshot().await;
        assert_eq!(snapshot.history.len(), 5);
        assert_eq!(snapshot.history[0], 1.05);
    }

    #[tokio::test]
    async fn saturated_history_stays_bounded_on_repeated_increase() {
        let engine = engine();
        for _ in 0..4 {
            engine.record_preference(1.0, FeedbackSource::Direct).await;
        }
        assert_eq!(engine.snapshot().await.history, vec![1.0; 5]);

        engine.increase_preference().await;
        engine.increase_preference().await;

        let snapshot = engine.snapshot().await;
        assert_eq!(snapshot.history, vec![1.0, 1.0, 1.0, 1.1, 1.2]);
    }

    #[tokio::test]
    async fn inactivity_nudges_by_half_step() {
        let engine = engine();
        engine.adapt_for_inactivity().await;
        assert_eq!(engine.snapshot().await.history, vec![1.0, 1.05]);
    }

    #[tokio::test]
    async fn recorded_values_are_clamped() {
        let engine = engine();
        engine.record_preference(5.0, FeedbackSource::Direct).await;
        assert_eq!(engine.snapshot().await.history, vec![1.0, 1.5]);
    }

    #[tokio::test]
    async fn final_scale_applies_base() {
        let engine = engine();
        engine.increase_preference().await;
        // 1.3 * 1.06 = 1.378 -> 1.38
        assert_eq!(engine.final_scale().await, 1.38);
        assert_eq!(engine.final_scale_em().await, "1.38em");
    }

    #[tokio::test]
    async fn publishes_after_recompute() {
        let bus = Arc::new(EventBus::new());
        let engine = WeightEngine::new(
            KnowledgeParams::default(),
            PreferenceRepository::in_memory(),
            Arc::clone(&bus),
        );
        let mut receiver = bus.subscribe();

        engine.increase_preference().await;

        let envelope = receiver.recv().await.unwrap();
        match envelope.event {
            LoopEvent::PreferenceChanged(p) => {
                assert!((p.multiplier - 1.06).abs() < 1e-9);
                assert_eq!(p.multiplier, engine.multiplier().await);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn mutations_are_persisted() {
        let store = Arc::new(MemoryStore::new());

        struct Shared(Arc<MemoryStore>);
        impl KeyValueStore for Shared {
            fn get(&self, key: &str) -> crate::error::StorageResult<Option<Vec<u8>>> {
                self.0.get(key)
            }
            fn set(&self, key: &str, value: &[u8]) -> crate::error::StorageResult<()> {
                self.0.set(key, value)
            }
        }

        let engine = WeightEngine::new(
            KnowledgeParams::default(),
            PreferenceRepository::new(Box::new(Shared(Arc::clone(&store)))),
            Arc::new(EventBus::new()),
        );
        engine.increase_preference().await;

        let bytes = store.get(KEY_HISTORY).unwrap().unwrap();
        let values: Vec<f64> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(values, vec![1.0, 1.1]);
    }
}
