//! Loop orchestrator — the Monitor/Execute wiring of the loop.
//!
//! Owns the per-element adaptation state, consumes visibility batches from the
//! external sensor, drives the idle sub-loop, and replans every adapted
//! element whenever the knowledge layer announces a preference change.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::analyze::Classifier;
use crate::config::MonitorParams;
use crate::events::{ElementAdaptedPayload, EventBus, LoopEvent};
use crate::execute::Executor;
use crate::knowledge::WeightEngine;
use crate::plan::{Action, ElementId, Plan, Planner, VisibilityEvent};

/// Adaptation state of one tracked element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum ElementState {
    #[default]
    Normal,
    Zoomed,
    ZoomedHighContrast,
}

impl ElementState {
    pub fn is_zoomed(&self) -> bool {
        !matches!(self, Self::Normal)
    }
}

/// External inputs the run loop consumes.
#[derive(Debug)]
pub enum LoopSignal {
    /// A batch of sensor observations.
    Visibility(Vec<VisibilityEvent>),
    /// Pointer movement, key input, scroll — anything that re-arms the idle
    /// timer.
    Activity,
    /// Explicit user feedback.
    IncreasePreference,
    DecreasePreference,
    Shutdown,
}

pub struct LoopOrchestrator {
    engine: Arc<WeightEngine>,
    classifier: Classifier,
    planner: Planner,
    executor: Executor,
    bus: Arc<EventBus>,
    params: MonitorParams,
    elements: RwLock<HashMap<ElementId, ElementState>>,
    last_activity: RwLock<Option<Instant>>,
    idle_deadline: RwLock<Option<Instant>>,
}

impl LoopOrchestrator {
    pub fn new(
        engine: Arc<WeightEngine>,
        classifier: Classifier,
        planner: Planner,
        executor: Executor,
        bus: Arc<EventBus>,
        params: MonitorParams,
    ) -> Self {
        Self {
            engine,
            classifier,
            planner,
            executor,
            bus,
            params,
            elements: RwLock::new(HashMap::new()),
            last_activity: RwLock::new(None),
            idle_deadline: RwLock::new(None),
        }
    }

    /// Decide and execute a plan for every observation in the batch.
    pub async fn handle_visibility(&self, events: Vec<VisibilityEvent>) {
        let multiplier = self.engine.multiplier().await;
        let classification = self.classifier.classify(multiplier);

        for event in events {
            let plan = self.planner.decide(&event, multiplier, classification);
            if plan.is_empty() {
                debug!(target = %event.target, ratio = event.ratio, "Contradictory observation, no adaptation");
                continue;
            }
            self.apply_plan(&plan).await;
        }
    }

    /// Re-decide every currently adapted element against the current
    /// multiplier, as if it were fully visible. This is how a preference
    /// change propagates without waiting for new sensor events.
    pub async fn replan_active(&self) {
        let zoomed: Vec<ElementId> = {
            let elements = self.elements.read().await;
            elements
                .iter()
                .filter(|(_, state)| state.is_zoomed())
                .map(|(id, _)| id.clone())
                .collect()
        };

        if zoomed.is_empty() {
            return;
        }

        let multiplier = self.engine.multiplier().await;
        let classification = self.classifier.classify(multiplier);
        debug!(
            count = zoomed.len(),
            multiplier,
            classification = classification.as_str(),
            "Replanning adapted elements"
        );

        for id in zoomed {
            let event = VisibilityEvent::fully_visible(id);
            let plan = self.planner.decide(&event, multiplier, classification);
            if !plan.is_empty() {
                self.apply_plan(&plan).await;
            }
        }
    }

    async fn apply_plan(&self, plan: &Plan) {
        let Some(ref target) = plan.target else {
            return;
        };

        let previous = self
            .elements
            .read()
            .await
            .get(target)
            .copied()
            .unwrap_or_default();

        let next = if plan.has(Action::ApplyZoom) {
            if plan.has(Action::ApplyHighContrast) {
                ElementState::ZoomedHighContrast
            } else {
                ElementState::Zoomed
            }
        } else if plan.has(Action::RevertZoom) {
            ElementState::Normal
        } else {
            previous
        };

        // Downgrading from high contrast needs an explicit clear; the zoom
        // calls alone do not touch the contrast inversion.
        if previous == ElementState::ZoomedHighContrast && next != ElementState::ZoomedHighContrast
        {
            self.executor.clear_high_contrast(target);
        }

        let scale = self.engine.final_scale().await;
        let line_height = self.engine.params().line_height;
        self.executor.execute(plan, scale, line_height);

        self.elements.write().await.insert(target.clone(), next);

        if next != previous {
            debug!(element = %target, from = ?previous, to = ?next, "Element state changed");
            self.bus.publish(LoopEvent::ElementAdapted(ElementAdaptedPayload {
                element: target.clone(),
                state: next,
            }));
        }
    }

    /// Record an activity signal: remembers the time and re-arms the single
    /// idle deadline, which logically cancels any pending idle check.
    pub async fn record_activity(&self) {
        let now = Instant::now();
        *self.last_activity.write().await = Some(now);
        *self.idle_deadline.write().await =
            Some(now + Duration::from_millis(self.params.inactivity_timeout_ms));
    }

    /// Idle-deadline expiry handler. Nudges the preference upward when the
    /// user has genuinely been idle for the full timeout while at least one
    /// element is adapted. Does not re-arm; only new activity does.
    pub async fn check_inactivity(&self) {
        let Some(last) = *self.last_activity.read().await else {
            return;
        };

        let elapsed = last.elapsed();
        if elapsed < Duration::from_millis(self.params.inactivity_timeout_ms) {
            return;
        }

        if self.zoomed_count().await == 0 {
            debug!("Idle timeout with no adapted elements, skipping");
            return;
        }

        info!(
            elapsed_ms = elapsed.as_millis() as u64,
            "Sustained inactivity, nudging preference"
        );
        self.engine.adapt_for_inactivity().await;
    }

    pub async fn element_state(&self, id: &ElementId) -> ElementState {
        self.elements.read().await.get(id).copied().unwrap_or_default()
    }

    pub async fn zoomed_count(&self) -> usize {
        self.elements
            .read()
            .await
            .values()
            .filter(|state| state.is_zoomed())
            .count()
    }

    /// Single cooperative event loop: sensor batches, activity signals and
    /// explicit feedback arrive on `signals`; preference changes arrive on the
    /// bus subscription; the idle deadline fires in between. Handlers never
    /// overlap.
    pub async fn run(self: Arc<Self>, mut signals: mpsc::Receiver<LoopSignal>) {
        let mut bus_rx = self.bus.subscribe();
        // Arm the idle timer once at startup.
        self.record_activity().await;
        info!(
            inactivity_timeout_ms = self.params.inactivity_timeout_ms,
            "Adaptation loop started"
        );

        loop {
            let deadline = *self.idle_deadline.read().await;

            tokio::select! {
                maybe_signal = signals.recv() => {
                    match maybe_signal {
                        Some(LoopSignal::Visibility(events)) => {
                            self.handle_visibility(events).await;
                        }
                        Some(LoopSignal::Activity) => {
                            self.record_activity().await;
                        }
                        Some(LoopSignal::IncreasePreference) => {
                            self.engine.increase_preference().await;
                        }
                        Some(LoopSignal::DecreasePreference) => {
                            self.engine.decrease_preference().await;
                        }
                        Some(LoopSignal::Shutdown) | None => {
                            info!("Adaptation loop stopped");
                            break;
                        }
                    }
                }
                envelope = bus_rx.recv() => {
                    match envelope {
                        Ok(envelope) => {
                            if let LoopEvent::PreferenceChanged(_) = envelope.event {
                                self.replan_active().await;
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            // The latest multiplier is what matters; replan once.
                            warn!(skipped, "Event subscription lagged");
                            self.replan_active().await;
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                            info!("Event bus closed, stopping loop");
                            break;
                        }
                    }
                }
                _ = idle_wait(deadline) => {
                    *self.idle_deadline.write().await = None;
                    self.check_inactivity().await;
                }
            }
        }
    }
}

async fn idle_wait(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
