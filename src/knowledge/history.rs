//! Bounded history of user-validated scaling multipliers.
//!
//! Invariants:
//! - length in [1, max_history] (FIFO eviction past the bound)
//! - every entry in [min_multiplier, max_multiplier]
//! - defaults to a single neutral entry when nothing usable is persisted

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::KnowledgeParams;

pub const NEUTRAL_MULTIPLIER: f64 = 1.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceHistory {
    entries: VecDeque<f64>,
}

impl PreferenceHistory {
    /// A fresh history containing the single neutral entry.
    pub fn neutral() -> Self {
        Self {
            entries: VecDeque::from([NEUTRAL_MULTIPLIER]),
        }
    }

    /// Rebuild a history from persisted values, enforcing the invariants:
    /// non-finite entries are discarded, the rest are clamped, only the most
    /// recent `max_history` survive, and an empty result falls back to neutral.
    pub fn from_values(values: &[f64], params: &KnowledgeParams) -> Self {
        let mut entries: VecDeque<f64> = values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(params.min_multiplier, params.max_multiplier))
            .collect();

        while entries.len() > params.max_history {
            entries.pop_front();
        }

        if entries.is_empty() {
            return Self::neutral();
        }

        Self { entries }
    }

    /// Append a validated multiplier, evicting the oldest entry past the bound.
    /// Returns the value actually stored (after clamping).
    pub fn push(&mut self, value: f64, params: &KnowledgeParams) -> f64 {
        let validated = value.clamp(params.min_multiplier, params.max_multiplier);
        self.entries.push_back(validated);
        while self.entries.len() > params.max_history {
            self.entries.pop_front();
        }
        validated
    }

    /// Most recent entry.
    pub fn latest(&self) -> f64 {
        self.entries.back().copied().unwrap_or(NEUTRAL_MULTIPLIER)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().copied().collect()
    }

    /// Blend the history into a single multiplier.
    ///
    /// Length 1 returns that entry. Otherwise the mean of everything but the
    /// last entry is blended with the last one at `recency_weight`, so the
    /// latest feedback dominates while the smoothed past damps single-sample
    /// noise. The result is clamped to the multiplier domain.
    pub fn weighted_multiplier(&self, params: &KnowledgeParams) -> f64 {
        if self.entries.is_empty() {
            return NEUTRAL_MULTIPLIER;
        }
        if self.entries.len() == 1 {
            return self.entries[0];
        }

        let latest = self.latest();
        let historic_len = self.entries.len() - 1;
        let historic_sum: f64 = self.entries.iter().take(historic_len).sum();
        let historic_average = historic_sum / historic_len as f64;

        let weight_historic = 1.0 - params.recency_weight;
        let blended = historic_average * weight_historic + latest * params.recency_weight;

        blended.clamp(params.min_multiplier, params.max_multiplier)
    }
}

impl Default for PreferenceHistory {
    fn default() -> Self {
        Self::neutral()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> KnowledgeParams {
        KnowledgeParams::default()
    }

    #[test]
    fn neutral_history_blends_to_neutral() {
        let history = PreferenceHistory::neutral();
        assert_eq!(history.len(), 1);
        assert_eq!(history.weighted_multiplier(&params()), 1.0);
    }

    #[test]
    fn single_entry_returned_as_is() {
        let history = PreferenceHistory::from_values(&[1.25], &params());
        assert_eq!(history.weighted_multiplier(&params()), 1.25);
    }

    #[test]
    fn blend_favors_latest_entry() {
        let mut history = PreferenceHistory::neutral();
        history.push(1.1, &params());
        // 1.0 * 0.4 + 1.1 * 0.6
        let blended = history.weighted_multiplier(&params());
        assert!((blended - 1.06).abs() < 1e-9);
    }

    #[test]
    fn fifo_eviction_keeps_bound() {
        let p = params();
        let mut history = PreferenceHistory::neutral();
        for i in 0..6 {
            history.push(1.0 + i as f64 * 0.05, &p);
        }
        assert_eq!(history.len(), 5);
        // The initial neutral entry and the first push are both gone.
        assert!(!history.values().contains(&1.0));
    }

    #[test]
    fn push_clamps_to_domain() {
        let p = params();
        let mut history = PreferenceHistory::neutral();
        assert_eq!(history.push(9.0, &p), 1.5);
        assert_eq!(history.push(0.1, &p), 0.8);
    }

    #[test]
    fn from_values_discards_garbage() {
        let p = params();
        let history = PreferenceHistory::from_values(&[f64::NAN, f64::INFINITY], &p);
        assert_eq!(history.values(), vec![1.0]);

        let history = PreferenceHistory::from_values(&[2.0, 0.5, 1.2], &p);
        assert_eq!(history.values(), vec![1.5, 0.8, 1.2]);
    }

    #[test]
    fn from_values_truncates_to_most_recent() {
        let p = params();
        let history =
            PreferenceHistory::from_values(&[1.0, 1.05, 1.1, 1.15, 1.2, 1.25, 1.3], &p);
        assert_eq!(history.len(), 5);
        assert_eq!(history.values(), vec![1.1, 1.15, 1.2, 1.25, 1.3]);
    }
}
