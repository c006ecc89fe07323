use serde::{Deserialize, Serialize};

/// Parameters of the knowledge layer (history + weighted multiplier).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeParams {
    /// Upper bound on the preference history length (FIFO beyond this).
    pub max_history: usize,
    /// Weight given to the most recent entry when blending.
    pub recency_weight: f64,
    /// Lower clamp for every multiplier.
    pub min_multiplier: f64,
    /// Upper clamp for every multiplier.
    pub max_multiplier: f64,
    /// Base scale the multiplier is applied to.
    pub base_scale: f64,
    /// Line height handed to the renderer alongside the scale.
    pub line_height: f64,
    /// Step applied on explicit +/- feedback.
    pub feedback_step: f64,
    /// Step applied on an inactivity nudge.
    pub inactivity_step: f64,
}

impl Default for KnowledgeParams {
    fn default() -> Self {
        Self {
            max_history: 5,
            recency_weight: 0.6,
            min_multiplier: 0.8,
            max_multiplier: 1.5,
            base_scale: 1.3,
            line_height: 1.8,
            feedback_step: 0.1,
            inactivity_step: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierParams {
    /// Deviation from neutral (1.0) above which the situation is complex.
    pub deviation_threshold: f64,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            deviation_threshold: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerParams {
    /// Visibility ratio at or above which an element counts as being read.
    pub visibility_threshold: f64,
    /// Multiplier above which a complex situation also gets high contrast.
    pub contrast_threshold: f64,
}

impl Default for PlannerParams {
    fn default() -> Self {
        Self {
            visibility_threshold: 0.2,
            contrast_threshold: 1.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorParams {
    /// Milliseconds of silence after the last activity signal before the
    /// idle adaptation check fires.
    pub inactivity_timeout_ms: u64,
}

impl Default for MonitorParams {
    fn default() -> Self {
        Self {
            inactivity_timeout_ms: 30_000,
        }
    }
}

/// Composite configuration for the whole loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoopConfig {
    pub knowledge: KnowledgeParams,
    pub classifier: ClassifierParams,
    pub planner: PlannerParams,
    pub monitor: MonitorParams,
}

impl LoopConfig {
    /// Defaults with environment overrides for the knobs hosts tune most.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ADAPTA_INACTIVITY_TIMEOUT_MS") {
            if let Ok(ms) = val.parse() {
                config.monitor.inactivity_timeout_ms = ms;
            }
        }
        if let Ok(val) = std::env::var("ADAPTA_RECENCY_WEIGHT") {
            if let Ok(w) = val.parse::<f64>() {
                config.knowledge.recency_weight = w.clamp(0.0, 1.0);
            }
        }
        if let Ok(val) = std::env::var("ADAPTA_BASE_SCALE") {
            if let Ok(s) = val.parse() {
                config.knowledge.base_scale = s;
            }
        }
        if let Ok(val) = std::env::var("ADAPTA_DEVIATION_THRESHOLD") {
            if let Ok(t) = val.parse() {
                config.classifier.deviation_threshold = t;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_policy() {
        let config = LoopConfig::default();
        assert_eq!(config.knowledge.max_history, 5);
        assert_eq!(config.knowledge.recency_weight, 0.6);
        assert_eq!(config.knowledge.min_multiplier, 0.8);
        assert_eq!(config.knowledge.max_multiplier, 1.5);
        assert_eq!(config.knowledge.base_scale, 1.3);
        assert_eq!(config.classifier.deviation_threshold, 0.2);
        assert_eq!(config.planner.visibility_threshold, 0.2);
        assert_eq!(config.planner.contrast_threshold, 1.3);
        assert_eq!(config.monitor.inactivity_timeout_ms, 30_000);
    }
}
