//! Adaptive reading assistance loop.
//!
//! Observes how a reader engages with discrete text blocks, learns a personal
//! content-scaling preference from repeated feedback, classifies the current
//! situation, and decides which visual adaptations to apply or revert,
//! following the MAPE-K control pattern: the weight engine is the Knowledge,
//! the classifier Analyzes, the planner Plans, the orchestrator wires
//! Monitoring to Execution through the host's renderer.

pub mod analyze;
pub mod config;
pub mod error;
pub mod events;
pub mod execute;
pub mod knowledge;
pub mod logging;
pub mod monitor;
pub mod monitoring;
pub mod plan;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use analyze::{Classification, Classifier};
pub use config::LoopConfig;
pub use error::{StorageError, StorageResult};
pub use events::{EventBus, FeedbackSource, LoopEvent};
pub use execute::{Executor, NoopRenderer, Renderer};
pub use knowledge::{KeyValueStore, PreferenceRepository, WeightEngine};
pub use monitor::{ElementState, LoopOrchestrator, LoopSignal};
pub use plan::{Action, ElementId, Plan, Planner, VisibilityEvent};

const SIGNAL_CHANNEL_CAPACITY: usize = 64;

/// Fully wired loop: knowledge, analyze, plan and the orchestrator, sharing
/// one event bus.
pub struct AdaptiveLoop {
    pub engine: Arc<WeightEngine>,
    pub orchestrator: Arc<LoopOrchestrator>,
    pub bus: Arc<EventBus>,
}

impl AdaptiveLoop {
    pub fn new(
        config: LoopConfig,
        store: Box<dyn KeyValueStore>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        let bus = Arc::new(EventBus::new());
        let engine = Arc::new(WeightEngine::new(
            config.knowledge.clone(),
            PreferenceRepository::new(store),
            Arc::clone(&bus),
        ));
        let orchestrator = Arc::new(LoopOrchestrator::new(
            Arc::clone(&engine),
            Classifier::new(config.classifier.clone()),
            Planner::new(config.planner.clone()),
            Executor::new(renderer),
            Arc::clone(&bus),
            config.monitor.clone(),
        ));

        Self {
            engine,
            orchestrator,
            bus,
        }
    }

    /// Spawn the orchestrator's run loop. The returned sender delivers sensor
    /// batches, activity signals and explicit feedback; dropping it (or
    /// sending `Shutdown`) stops the loop.
    pub fn spawn(&self) -> (mpsc::Sender<LoopSignal>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(SIGNAL_CHANNEL_CAPACITY);
        let handle = tokio::spawn(Arc::clone(&self.orchestrator).run(rx));
        (tx, handle)
    }
}
