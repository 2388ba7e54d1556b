//! Thermal duration policy for preheats.
//!
//! A preheat's duration is a decision output: it depends on what the oven
//! was doing right before. If another oven activity ends exactly when the
//! preheat starts (back-to-back), the oven is already warm and the preheat
//! can be shortened; otherwise it is a cold start and takes its nominal
//! duration.
//!
//! # Algorithm
//!
//! 1. Among the activities on the same oven that end at or before the
//!    preheat's start, select the one with the smallest gap. Ties go to
//!    the activity with the lowest model order.
//! 2. If there is none, or its gap is positive, the nominal duration applies.
//! 3. Otherwise the [`ReheatRule`] decides the shortened duration.

use serde::{Deserialize, Serialize};

/// Default duration of a warm preheat.
pub const DEFAULT_REHEAT_DURATION: i64 = 3;

/// Degrees per time unit of the temperature-difference formula.
pub const DEFAULT_DEGREES_PER_UNIT: i64 = 5;

/// How a back-to-back preheat is shortened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ReheatRule {
    /// Preheats always take their nominal duration.
    Disabled,
    /// A matching-temperature predecessor shortens the preheat to `duration`.
    Fixed { duration: i64 },
    /// Any predecessor shortens the preheat to the time needed to move
    /// between the two temperatures at `degrees_per_unit`.
    TemperatureDelta { degrees_per_unit: i64 },
}

impl Default for ReheatRule {
    fn default() -> Self {
        Self::Fixed {
            duration: DEFAULT_REHEAT_DURATION,
        }
    }
}

/// An activity already placed on an oven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OvenActivity {
    /// Target temperature of the activity.
    pub temperature: i64,
    /// End time.
    pub end: i64,
    /// Deterministic tie-break key (lower wins).
    pub order: usize,
}

/// Time to move an oven between two temperatures.
///
/// `round(|from - to| / degrees_per_unit)`, rounding halves to even.
pub fn transition_time(from: i64, to: i64, degrees_per_unit: i64) -> i64 {
    let step = degrees_per_unit.max(1);
    let delta = (from - to).abs();
    let (q, r) = (delta / step, delta % step);
    match (2 * r).cmp(&step) {
        std::cmp::Ordering::Less => q,
        std::cmp::Ordering::Greater => q + 1,
        std::cmp::Ordering::Equal => q + (q & 1),
    }
}

/// The activity ending closest before (or exactly at) `start`.
pub fn nearest_prior<I>(start: i64, activities: I) -> Option<OvenActivity>
where
    I: IntoIterator<Item = OvenActivity>,
{
    activities
        .into_iter()
        .filter(|a| a.end <= start)
        .min_by_key(|a| (start - a.end, a.order))
}

impl ReheatRule {
    /// Effective duration of a preheat starting at `start`.
    ///
    /// `prior` lists the other activities on the same oven; only those
    /// ending at or before `start` are considered.
    pub fn effective_duration<I>(&self, nominal: i64, temperature: i64, start: i64, prior: I) -> i64
    where
        I: IntoIterator<Item = OvenActivity>,
    {
        match nearest_prior(start, prior) {
            Some(previous) if previous.end == start => {
                self.back_to_back(nominal, previous.temperature, temperature)
            }
            _ => nominal,
        }
    }

    /// Duration of a preheat that directly follows an activity at `from` °C.
    pub fn back_to_back(&self, nominal: i64, from: i64, to: i64) -> i64 {
        match *self {
            ReheatRule::Disabled => nominal,
            ReheatRule::Fixed { duration } => {
                if from == to {
                    duration.clamp(1, nominal.max(1))
                } else {
                    nominal
                }
            }
            ReheatRule::TemperatureDelta { degrees_per_unit } => {
                transition_time(from, to, degrees_per_unit).clamp(1, nominal.max(1))
            }
        }
    }

    /// Shortest duration this rule can ever give a preheat.
    pub fn min_duration(&self, nominal: i64) -> i64 {
        match *self {
            ReheatRule::Disabled => nominal,
            ReheatRule::Fixed { duration } => duration.clamp(1, nominal.max(1)),
            ReheatRule::TemperatureDelta { .. } => nominal.min(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn act(temperature: i64, end: i64, order: usize) -> OvenActivity {
        OvenActivity {
            temperature,
            end,
            order,
        }
    }

    #[test]
    fn test_cold_start_without_prior() {
        let rule = ReheatRule::default();
        assert_eq!(rule.effective_duration(6, 120, 0, []), 6);
    }

    #[test]
    fn test_back_to_back_same_temperature() {
        let rule = ReheatRule::default();
        assert_eq!(rule.effective_duration(6, 120, 9, [act(120, 9, 0)]), 3);
    }

    #[test]
    fn test_gap_means_cold_start() {
        let rule = ReheatRule::default();
        assert_eq!(rule.effective_duration(6, 120, 10, [act(120, 9, 0)]), 6);
    }

    #[test]
    fn test_different_temperature_means_full_duration() {
        let rule = ReheatRule::default();
        assert_eq!(rule.effective_duration(6, 120, 9, [act(200, 9, 0)]), 6);
    }

    #[test]
    fn test_activities_ending_after_start_are_ignored() {
        let rule = ReheatRule::default();
        // Still running at start=9: not a prior activity.
        assert_eq!(rule.effective_duration(6, 120, 9, [act(120, 12, 0)]), 6);
    }

    #[test]
    fn test_nearest_prior_wins() {
        let rule = ReheatRule::default();
        // A closer activity at a different temperature hides an older match.
        let prior = [act(120, 5, 0), act(200, 9, 1)];
        assert_eq!(rule.effective_duration(6, 120, 9, prior), 6);

        let prior = [act(200, 5, 0), act(120, 9, 1)];
        assert_eq!(rule.effective_duration(6, 120, 9, prior), 3);
    }

    #[test]
    fn test_tie_broken_by_order() {
        let prior = [act(200, 9, 4), act(120, 9, 2)];
        assert_eq!(nearest_prior(9, prior).map(|a| a.order), Some(2));
        assert_eq!(ReheatRule::default().effective_duration(6, 120, 9, prior), 3);
    }

    #[test]
    fn test_fixed_rule_never_exceeds_nominal() {
        let rule = ReheatRule::Fixed { duration: 10 };
        assert_eq!(rule.effective_duration(4, 120, 9, [act(120, 9, 0)]), 4);
        assert_eq!(rule.min_duration(4), 4);
    }

    #[test]
    fn test_disabled_rule() {
        let rule = ReheatRule::Disabled;
        assert_eq!(rule.effective_duration(6, 120, 9, [act(120, 9, 0)]), 6);
        assert_eq!(rule.min_duration(6), 6);
    }

    #[test]
    fn test_temperature_delta_rule() {
        let rule = ReheatRule::TemperatureDelta {
            degrees_per_unit: 5,
        };
        // 150 → 180: 30 / 5 = 6, clamped to nominal 4.
        assert_eq!(rule.effective_duration(4, 180, 9, [act(150, 9, 0)]), 4);
        // 170 → 180: 10 / 5 = 2.
        assert_eq!(rule.effective_duration(4, 180, 9, [act(170, 9, 0)]), 2);
        // Same temperature: at least one unit.
        assert_eq!(rule.effective_duration(4, 180, 9, [act(180, 9, 0)]), 1);
        assert_eq!(rule.min_duration(4), 1);
    }

    #[test]
    fn test_transition_time_rounding() {
        assert_eq!(transition_time(100, 100, 5), 0);
        assert_eq!(transition_time(100, 112, 5), 2); // 2.4
        assert_eq!(transition_time(100, 113, 5), 3); // 2.6
        assert_eq!(transition_time(100, 112, 5), transition_time(112, 100, 5));
        assert_eq!(transition_time(0, 25, 10), 2); // 2.5 → 2
        assert_eq!(transition_time(0, 35, 10), 4); // 3.5 → 4
    }

    #[test]
    fn test_rule_serde() {
        let json = serde_json::to_string(&ReheatRule::default()).unwrap();
        assert_eq!(json, r#"{"rule":"fixed","duration":3}"#);

        let rule: ReheatRule =
            serde_json::from_str(r#"{"rule":"temperature_delta","degrees_per_unit":5}"#).unwrap();
        assert_eq!(
            rule,
            ReheatRule::TemperatureDelta {
                degrees_per_unit: 5
            }
        );
    }
}
