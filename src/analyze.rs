//! Situation classifier — the Analyze element of the loop.

use serde::{Deserialize, Serialize};

use crate::config::ClassifierParams;
use crate::knowledge::history::NEUTRAL_MULTIPLIER;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum Classification {
    #[default]
    Simple,
    Complex,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Complex => "complex",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "complex" => Self::Complex,
            _ => Self::Simple,
        }
    }
}

/// Labels the current multiplier's deviation from neutral. Stateless.
#[derive(Debug, Clone)]
pub struct Classifier {
    params: ClassifierParams,
}

impl Classifier {
    pub fn new(params: ClassifierParams) -> Self {
        Self { params }
    }

    pub fn classify(&self, multiplier: f64) -> Classification {
        let deviation = (multiplier - NEUTRAL_MULTIPLIER).abs();
        if deviation <= self.params.deviation_threshold {
            Classification::Simple
        } else {
            Classification::Complex
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ClassifierParams::default())
    }
}
