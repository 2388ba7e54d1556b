//! Step (operation) model.
//!
//! A step is the smallest schedulable unit of a recipe. Its kind decides
//! which machines can host it; oven steps carry a target temperature and a
//! preheat names the cook or fry step it prepares the oven for.

use serde::{Deserialize, Serialize};

/// A recipe step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Step identifier, unique within its recipe.
    pub id: String,
    /// Step kind and kind-specific attributes.
    pub kind: StepKind,
    /// Nominal duration in time units (> 0).
    pub duration: i64,
}

/// Step kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    /// Manual work by an operator.
    HumanStep,
    /// Oven cooking at a target temperature.
    OvenCook { temperature: i64 },
    /// Oven frying at a target temperature.
    OvenFry { temperature: i64 },
    /// Bringing an oven to temperature for `paired_step`.
    PreHeat {
        temperature: i64,
        /// ID of the `OvenCook`/`OvenFry` step in the same recipe.
        paired_step: String,
    },
    /// Blast chilling.
    Blast,
    /// Vacuum sealing.
    VacuumSeal,
}

impl Step {
    /// Creates a step.
    pub fn new(id: impl Into<String>, kind: StepKind, duration: i64) -> Self {
        Self {
            id: id.into(),
            kind,
            duration,
        }
    }

    /// Creates a manual step.
    pub fn human(id: impl Into<String>, duration: i64) -> Self {
        Self::new(id, StepKind::HumanStep, duration)
    }

    /// Creates an oven cooking step.
    pub fn oven_cook(id: impl Into<String>, duration: i64, temperature: i64) -> Self {
        Self::new(id, StepKind::OvenCook { temperature }, duration)
    }

    /// Creates an oven frying step.
    pub fn oven_fry(id: impl Into<String>, duration: i64, temperature: i64) -> Self {
        Self::new(id, StepKind::OvenFry { temperature }, duration)
    }

    /// Creates a preheat for the step `paired_step`.
    pub fn preheat(
        id: impl Into<String>,
        duration: i64,
        temperature: i64,
        paired_step: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            StepKind::PreHeat {
                temperature,
                paired_step: paired_step.into(),
            },
            duration,
        )
    }

    /// Creates a blast chilling step.
    pub fn blast(id: impl Into<String>, duration: i64) -> Self {
        Self::new(id, StepKind::Blast, duration)
    }

    /// Creates a vacuum sealing step.
    pub fn vacuum_seal(id: impl Into<String>, duration: i64) -> Self {
        Self::new(id, StepKind::VacuumSeal, duration)
    }

    /// Target temperature of oven steps.
    pub fn temperature(&self) -> Option<i64> {
        match self.kind {
            StepKind::OvenCook { temperature }
            | StepKind::OvenFry { temperature }
            | StepKind::PreHeat { temperature, .. } => Some(temperature),
            _ => None,
        }
    }

    /// Whether the step runs in an oven.
    pub fn is_oven_step(&self) -> bool {
        self.temperature().is_some()
    }

    /// Whether the step is a preheat.
    #[inline]
    pub fn is_preheat(&self) -> bool {
        matches!(self.kind, StepKind::PreHeat { .. })
    }

    /// Whether the step fries.
    #[inline]
    pub fn is_fry(&self) -> bool {
        matches!(self.kind, StepKind::OvenFry { .. })
    }

    /// Paired cook/fry step ID for preheats.
    pub fn paired_step(&self) -> Option<&str> {
        match &self.kind {
            StepKind::PreHeat { paired_step, .. } => Some(paired_step),
            _ => None,
        }
    }
}

impl StepKind {
    /// Kind name used in error messages and logs.
    pub fn label(&self) -> &'static str {
        match self {
            StepKind::HumanStep => "HumanStep",
            StepKind::OvenCook { .. } => "OvenCook",
            StepKind::OvenFry { .. } => "OvenFry",
            StepKind::PreHeat { .. } => "PreHeat",
            StepKind::Blast => "Blast",
            StepKind::VacuumSeal => "VacuumSeal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oven_step_attributes() {
        let cook = Step::oven_cook("c", 3, 120);
        assert_eq!(cook.temperature(), Some(120));
        assert!(cook.is_oven_step());
        assert!(!cook.is_fry());

        let ph = Step::preheat("p", 6, 120, "c");
        assert!(ph.is_preheat());
        assert_eq!(ph.paired_step(), Some("c"));
        assert_eq!(ph.temperature(), Some(120));
    }

    #[test]
    fn test_non_oven_steps() {
        for step in [Step::human("h", 2), Step::blast("b", 4), Step::vacuum_seal("v", 1)] {
            assert!(!step.is_oven_step());
            assert_eq!(step.temperature(), None);
            assert_eq!(step.paired_step(), None);
        }
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(Step::oven_fry("f", 2, 180).kind.label(), "OvenFry");
        assert_eq!(Step::human("h", 1).kind.label(), "HumanStep");
    }
}
