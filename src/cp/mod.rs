//! Constraint-based scheduling formulation.
//!
//! Builds a [`ScheduleModel`] of optional candidate intervals from machines
//! and recipe graphs, solves it with a [`CpSolver`], and extracts the
//! resulting [`Schedule`](crate::models::Schedule).
//!
//! ```text
//! RecipeGraph[] + Machine[] ──ScheduleModelBuilder──▶ ScheduleModel
//!        ScheduleModel ──CpSolver──▶ CpSolution ──verify──▶ ScheduleExtractor ──▶ Schedule
//! ```
//!
//! # Reference
//! - Laborie et al. (2018), "IBM ILOG CP Optimizer for Scheduling"
//! - Baptiste et al. (2001), "Constraint-Based Scheduling"

mod builder;
mod extract;
mod model;
mod solver;

pub use builder::ScheduleModelBuilder;
pub use extract::ScheduleExtractor;
pub use model::{
    CandidateInterval, CandidateRole, ConstraintViolation, InactiveCause, IntervalValue,
    ModelAssignment, ModelConstraint, ModelStep, OverlapRule, ScheduleModel,
};
pub use solver::{BranchAndBoundSolver, CpSolution, CpSolver, SolverConfig};
