//! Scheduling policy.
//!
//! One configuration object selects which optional constraints the model
//! builder emits and how preheat durations are derived, so a single builder
//! covers every variant of the kitchen rules.

use serde::{Deserialize, Serialize};

use crate::thermal::ReheatRule;

/// Constraint switches and thermal rule for model building.
///
/// # Example
/// ```
/// use u_kitchen::models::SchedulingPolicy;
/// use u_kitchen::thermal::ReheatRule;
///
/// let policy = SchedulingPolicy::default()
///     .with_reheat(ReheatRule::Disabled)
///     .with_preheat_blocks_oven(true);
/// assert!(policy.cross_temperature_exclusive);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingPolicy {
    /// How back-to-back preheats are shortened.
    pub reheat: ReheatRule,
    /// Forbid cooking-role and frying-role intervals overlapping on an oven.
    pub cook_fry_exclusive: bool,
    /// Forbid cooks of different recipes at different temperatures
    /// overlapping on an oven.
    pub cross_temperature_exclusive: bool,
    /// Forbid any other oven activity overlapping a preheat on its oven.
    pub preheat_blocks_oven: bool,
    /// Longest wait between a preheat's end and its paired step's start.
    pub max_preheat_gap: i64,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self {
            reheat: ReheatRule::default(),
            cook_fry_exclusive: true,
            cross_temperature_exclusive: true,
            preheat_blocks_oven: false,
            max_preheat_gap: 1,
        }
    }
}

impl SchedulingPolicy {
    /// Sets the reheat rule.
    pub fn with_reheat(mut self, reheat: ReheatRule) -> Self {
        self.reheat = reheat;
        self
    }

    /// Enables or disables cook/fry exclusivity.
    pub fn with_cook_fry_exclusive(mut self, enabled: bool) -> Self {
        self.cook_fry_exclusive = enabled;
        self
    }

    /// Enables or disables cross-temperature exclusivity.
    pub fn with_cross_temperature_exclusive(mut self, enabled: bool) -> Self {
        self.cross_temperature_exclusive = enabled;
        self
    }

    /// Enables or disables exclusive preheating.
    pub fn with_preheat_blocks_oven(mut self, enabled: bool) -> Self {
        self.preheat_blocks_oven = enabled;
        self
    }

    /// Sets the maximum preheat-to-cook gap (negative values become 0).
    pub fn with_max_preheat_gap(mut self, gap: i64) -> Self {
        self.max_preheat_gap = gap.max(0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = SchedulingPolicy::default();
        assert_eq!(p.reheat, ReheatRule::Fixed { duration: 3 });
        assert!(p.cook_fry_exclusive);
        assert!(p.cross_temperature_exclusive);
        assert!(!p.preheat_blocks_oven);
        assert_eq!(p.max_preheat_gap, 1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let p: SchedulingPolicy =
            serde_json::from_str(r#"{"preheat_blocks_oven": true, "reheat": {"rule": "disabled"}}"#)
                .unwrap();
        assert!(p.preheat_blocks_oven);
        assert_eq!(p.reheat, ReheatRule::Disabled);
        assert_eq!(p.max_preheat_gap, 1);
    }

    #[test]
    fn test_negative_gap_clamped() {
        assert_eq!(SchedulingPolicy::default().with_max_preheat_gap(-3).max_preheat_gap, 0);
    }
}
