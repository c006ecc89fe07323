//! Adaptation planner — the Plan element of the loop.

use serde::{Deserialize, Serialize};

use crate::analyze::Classification;
use crate::config::PlannerParams;

/// Opaque handle for a tracked text block on the rendering surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(pub String);

impl ElementId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ElementId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ElementId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One sensor observation for one element. Consumed once per decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityEvent {
    pub is_intersecting: bool,
    pub ratio: f64,
    pub target: ElementId,
}

impl VisibilityEvent {
    /// A synthetic fully-visible observation, used when replanning elements
    /// that are already adapted.
    pub fn fully_visible(target: ElementId) -> Self {
        Self {
            is_intersecting: true,
            ratio: 1.0,
            target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    ApplyZoom,
    RevertZoom,
    ApplyHighContrast,
    RequestValidation,
}

/// The set of adaptation actions decided for one element. An empty action set
/// means no adaptation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<Action>,
    pub target: Option<ElementId>,
}

impl Plan {
    pub fn empty() -> Self {
        Self {
            actions: Vec::new(),
            target: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn has(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }
}

/// Decides which adaptations apply to an element given its visibility, the
/// current multiplier and the situation classification. Pure.
#[derive(Debug, Clone)]
pub struct Planner {
    params: PlannerParams,
}

impl Planner {
    pub fn new(params: PlannerParams) -> Self {
        Self { params }
    }

    pub fn visibility_threshold(&self) -> f64 {
        self.params.visibility_threshold
    }

    pub fn decide(
        &self,
        event: &VisibilityEvent,
        multiplier: f64,
        classification: Classification,
    ) -> Plan {
        if event.is_intersecting && event.ratio >= self.params.visibility_threshold {
            let mut actions = vec![Action::ApplyZoom];

            if classification == Classification::Complex {
                if multiplier > self.params.contrast_threshold {
                    actions.push(Action::ApplyHighContrast);
                } else {
                    // Human-in-the-loop hook; a no-op for the renderer today.
                    actions.push(Action::RequestValidation);
                }
            }

            return Plan {
                actions,
                target: Some(event.target.clone()),
            };
        }

        if event.ratio < self.params.visibility_threshold {
            return Plan {
                actions: vec![Action::RevertZoom],
                target: Some(event.target.clone()),
            };
        }

        // Not intersecting yet ratio at or above threshold: contradictory
        // under the sensor contract. Resolved as a no-op, never an error.
        Plan::empty()
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new(PlannerParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(is_intersecting: bool, ratio: f64) -> VisibilityEvent {
        VisibilityEvent {
            is_intersecting,
            ratio,
            target: ElementId::from("p-1"),
        }
    }

    #[test]
    fn visible_simple_zooms_only() {
        let plan = Planner::default().decide(&event(true, 0.5), 1.1, Classification::Simple);
        assert_eq!(plan.actions, vec![Action::ApplyZoom]);
        assert_eq!(plan.target, Some(ElementId::from("p-1")));
    }

    #[test]
    fn visible_complex_above_contrast_threshold_adds_contrast() {
        let plan = Planner::default().decide(&event(true, 0.5), 1.4, Classification::Complex);
        assert_eq!(plan.actions, vec![Action::ApplyZoom, Action::ApplyHighContrast]);
    }

    #[test]
    fn visible_complex_below_contrast_threshold_requests_validation() {
        let plan = Planner::default().decide(&event(true, 0.5), 1.25, Classification::Complex);
        assert_eq!(
            plan.actions,
            vec![Action::ApplyZoom, Action::RequestValidation]
        );
        assert!(!plan.has(Action::ApplyHighContrast));
    }

    #[test]
    fn low_ratio_reverts() {
        let plan = Planner::default().decide(&event(false, 0.1), 1.0, Classification::Simple);
        assert_eq!(plan.actions, vec![Action::RevertZoom]);
        assert_eq!(plan.target, Some(ElementId::from("p-1")));
    }

    #[test]
    fn boundary_ratio_while_intersecting_zooms() {
        let plan = Planner::default().decide(&event(true, 0.2), 1.0, Classification::Simple);
        assert_eq!(plan.actions, vec![Action::ApplyZoom]);
    }

    #[test]
    fn contradictory_event_yields_empty_plan() {
        let plan = Planner::default().decide(&event(false, 0.9), 1.0, Classification::Simple);
        assert!(plan.is_empty());
        assert_eq!(plan.target, None);
    }
}
