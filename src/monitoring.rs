//! Invariant checks over the knowledge state.
//!
//! Clamping on every write path should make these unreachable; a violation
//! reaching this point is a programming defect, so the checks observe and log
//! rather than repair.

use serde::{Deserialize, Serialize};

use crate::config::KnowledgeParams;
use crate::knowledge::history::PreferenceHistory;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvariantViolation {
    pub field: String,
    pub value: f64,
    pub expected_min: f64,
    pub expected_max: f64,
}

pub fn check_knowledge(
    history: &PreferenceHistory,
    multiplier: f64,
    params: &KnowledgeParams,
) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    check_range(
        &mut violations,
        "multiplier",
        multiplier,
        params.min_multiplier,
        params.max_multiplier,
    );
    check_nan_inf(&mut violations, "multiplier", multiplier);

    check_range(
        &mut violations,
        "history.len",
        history.len() as f64,
        1.0,
        params.max_history as f64,
    );

    for (i, value) in history.values().into_iter().enumerate() {
        let field = format!("history[{i}]");
        check_range(
            &mut violations,
            &field,
            value,
            params.min_multiplier,
            params.max_multiplier,
        );
        check_nan_inf(&mut violations, &field, value);
    }

    violations
}

fn check_range(
    violations: &mut Vec<InvariantViolation>,
    field: &str,
    value: f64,
    min: f64,
    max: f64,
) {
    if value < min || value > max {
        violations.push(InvariantViolation {
            field: field.to_string(),
            value,
            expected_min: min,
            expected_max: max,
        });
    }
}

fn check_nan_inf(violations: &mut Vec<InvariantViolation>, field: &str, value: f64) {
    if value.is_nan() || value.is_infinite() {
        violations.push(InvariantViolation {
            field: field.to_string(),
            value,
            expected_min: f64::NEG_INFINITY,
            expected_max: f64::INFINITY,
        });
    }
}
