//! Error taxonomy for scheduling.
//!
//! Input problems (`InvalidRecipe`, `InvalidMachine`, `UnschedulableStep`)
//! are reported before any solving attempt. `InfeasibleModel` and
//! `UnboundedHorizon` come out of the optimizer. The remaining variants are
//! internal invariant violations between the model builder, the optimizer
//! and the extractor.

use thiserror::Error;

use crate::cp::ConstraintViolation;
use crate::models::SolveStatus;

/// Errors raised while scheduling recipes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    /// Malformed recipe graph.
    #[error("invalid recipe '{recipe_id}': {reason}")]
    InvalidRecipe { recipe_id: String, reason: String },

    /// Malformed machine configuration.
    #[error("invalid machine '{machine_id}': {reason}")]
    InvalidMachine { machine_id: String, reason: String },

    /// No machine satisfies the step's requirements.
    #[error("step '{step_id}' ({kind}) of recipe '{recipe_id}' has no compatible machine")]
    UnschedulableStep {
        recipe_id: String,
        step_id: String,
        kind: &'static str,
    },

    /// The constraints are jointly unsatisfiable.
    #[error("no assignment satisfies all constraints (status {status})")]
    InfeasibleModel { status: SolveStatus },

    /// The computed horizon does not contain the schedule.
    #[error("schedule ends at {makespan}, beyond the horizon {horizon}")]
    UnboundedHorizon { horizon: i64, makespan: i64 },

    /// More than one candidate interval is active for a step.
    #[error("step '{step_id}' of recipe '{recipe_id}' has {active} active candidates")]
    AmbiguousAssignment {
        recipe_id: String,
        step_id: String,
        active: usize,
    },

    /// No candidate interval is active for a step.
    #[error("step '{step_id}' of recipe '{recipe_id}' has no active candidate")]
    MissingAssignment { recipe_id: String, step_id: String },

    /// The optimizer returned an assignment that breaks a model constraint.
    #[error("solver result violates the model: {0}")]
    ConstraintViolated(#[from] ConstraintViolation),
}

impl ScheduleError {
    /// Shorthand for an [`ScheduleError::InvalidRecipe`].
    pub fn invalid_recipe(recipe_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRecipe {
            recipe_id: recipe_id.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error signals a defect inside the crate rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::AmbiguousAssignment { .. }
                | Self::MissingAssignment { .. }
                | Self::ConstraintViolated(_)
        )
    }
}
