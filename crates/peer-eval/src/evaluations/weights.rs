use std::collections::BTreeMap;

use super::domain::{PositionId, PositionWeight};

/// Multiplier used when a position has no active weight entry.
pub const DEFAULT_POSITION_MULTIPLIER: f64 = 1.0;

/// Maps an evaluator's position to the multiplier applied to their raw scores.
#[derive(Debug, Clone, Default)]
pub struct WeightResolver {
    multipliers: BTreeMap<PositionId, f64>,
}

impl WeightResolver {
    pub fn from_weights<I>(weights: I) -> Self
    where
        I: IntoIterator<Item = PositionWeight>,
    {
        let multipliers = weights
            .into_iter()
            .filter(|weight| weight.active && weight.multiplier.is_finite())
            .map(|weight| (weight.position_id, weight.multiplier))
            .collect();
        Self { multipliers }
    }

    pub fn multiplier_for(&self, position: Option<PositionId>) -> f64 {
        position
            .and_then(|position| self.multipliers.get(&position).copied())
            .unwrap_or(DEFAULT_POSITION_MULTIPLIER)
    }
}
