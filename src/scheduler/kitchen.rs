//! End-to-end recipe scheduler.
//!
//! # Pipeline
//!
//! 1. Validate machines and recipes; report the first problem.
//! 2. Build one [`RecipeGraph`] per recipe.
//! 3. Build the candidate-interval model (fails on steps without a
//!    compatible machine).
//! 4. Solve for minimum makespan.
//! 5. Verify the solver's assignment against the model, then extract the
//!    schedule.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cp::{
    BranchAndBoundSolver, CpSolver, ScheduleExtractor, ScheduleModelBuilder, SolverConfig,
};
use crate::error::ScheduleError;
use crate::models::{Machine, Recipe, RecipeGraph, Schedule, SchedulingPolicy, SolveStatus};
use crate::validation::validate_input;

/// Input container for scheduling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    /// Available machines.
    pub machines: Vec<Machine>,
    /// Recipes to schedule.
    pub recipes: Vec<Recipe>,
    /// Scheduling policy.
    #[serde(default)]
    pub policy: SchedulingPolicy,
    /// Optimizer budget.
    #[serde(default)]
    pub solver: SolverConfig,
}

impl ScheduleRequest {
    /// Creates a request with default policy and budget.
    pub fn new(machines: Vec<Machine>, recipes: Vec<Recipe>) -> Self {
        Self {
            machines,
            recipes,
            policy: SchedulingPolicy::default(),
            solver: SolverConfig::default(),
        }
    }

    /// Sets the policy.
    pub fn with_policy(mut self, policy: SchedulingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the optimizer budget.
    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }
}

/// Makespan-minimizing scheduler for kitchen recipes.
///
/// # Example
///
/// ```
/// use u_kitchen::models::{Machine, Recipe, Step};
/// use u_kitchen::scheduler::KitchenScheduler;
///
/// let machines = vec![Machine::oven("O1", 1, 300, false), Machine::blast_chiller("B1", 1)];
/// let recipes = vec![Recipe::chain(
///     "R1",
///     vec![Step::oven_cook("cook", 4, 180), Step::blast("chill", 2)],
/// )];
///
/// let schedule = KitchenScheduler::new().schedule(&machines, &recipes).unwrap();
/// assert!(schedule.is_optimal());
/// assert_eq!(schedule.makespan, Some(6));
/// ```
#[derive(Debug, Clone, Default)]
pub struct KitchenScheduler {
    policy: SchedulingPolicy,
    config: SolverConfig,
}

impl KitchenScheduler {
    /// Creates a scheduler with the default policy and budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the policy.
    pub fn with_policy(mut self, policy: SchedulingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the optimizer budget.
    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Schedules recipes on machines with the built-in optimizer.
    ///
    /// # Errors
    /// - Input problems: [`ScheduleError::InvalidRecipe`],
    ///   [`ScheduleError::InvalidMachine`], [`ScheduleError::UnschedulableStep`]
    /// - [`ScheduleError::InfeasibleModel`] when no schedule exists
    /// - [`ScheduleError::UnboundedHorizon`] if the schedule overruns the horizon
    ///
    /// Running out of budget before any schedule is found is not an error:
    /// the result has status `TIMEOUT_NO_SOLUTION` and no assignments.
    pub fn schedule(
        &self,
        machines: &[Machine],
        recipes: &[Recipe],
    ) -> Result<Schedule, ScheduleError> {
        self.schedule_with(&BranchAndBoundSolver, machines, recipes)
    }

    /// Schedules from a request, using its policy and budget.
    pub fn schedule_request(&self, request: &ScheduleRequest) -> Result<Schedule, ScheduleError> {
        let scheduler = Self {
            policy: request.policy.clone(),
            config: request.solver.clone(),
        };
        scheduler.schedule(&request.machines, &request.recipes)
    }

    /// Schedules with a caller-supplied solver.
    pub fn schedule_with<S: CpSolver>(
        &self,
        solver: &S,
        machines: &[Machine],
        recipes: &[Recipe],
    ) -> Result<Schedule, ScheduleError> {
        if let Err(errors) = validate_input(machines, recipes) {
            for err in &errors {
                warn!(entity = %err.entity_id, kind = ?err.kind, "{}", err.message);
            }
            if let Some(first) = errors.into_iter().next() {
                return Err(first.into());
            }
        }

        let graphs = recipes
            .iter()
            .map(RecipeGraph::build)
            .collect::<Result<Vec<_>, _>>()?;

        let (model, solution) = ScheduleModelBuilder::new(machines, &graphs)
            .with_policy(self.policy.clone())
            .solve(solver, &self.config)?;

        let assignment = match (solution.status, solution.assignment.as_ref()) {
            (SolveStatus::TimeoutNoSolution, _) => {
                warn!(
                    nodes = solution.nodes,
                    lower_bound = solution.lower_bound,
                    "budget exhausted before a schedule was found"
                );
                return Ok(Schedule::unsolved(
                    solution.status,
                    solution.lower_bound,
                    model.horizon,
                ));
            }
            (status, Some(assignment)) if status.has_solution() => assignment,
            (status, _) => {
                warn!(%status, "model has no feasible schedule");
                return Err(ScheduleError::InfeasibleModel { status });
            }
        };

        model.verify(assignment)?;
        let schedule = ScheduleExtractor::new(&model).extract(
            assignment,
            solution.status,
            solution.lower_bound,
        )?;

        if let Some(makespan) = schedule.makespan {
            if makespan > model.horizon {
                return Err(ScheduleError::UnboundedHorizon {
                    horizon: model.horizon,
                    makespan,
                });
            }
        }

        info!(
            status = %schedule.status,
            makespan = ?schedule.makespan,
            recipes = recipes.len(),
            "scheduled recipes"
        );
        Ok(schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{CpSolution, IntervalValue, ScheduleModel};
    use crate::models::{OperatingMode, Step};
    use crate::testing;

    fn no_overlaps_where_excluded(schedule: &Schedule) {
        for timeline in &schedule.timelines {
            for (i, a) in timeline.entries.iter().enumerate() {
                for b in &timeline.entries[i + 1..] {
                    if a.recipe_id == b.recipe_id || !a.overlaps(b) {
                        continue;
                    }
                    let fry = |m: OperatingMode| m == OperatingMode::Frying;
                    assert_eq!(fry(a.mode), fry(b.mode), "{} overlaps {}", a.label(), b.label());
                }
            }
        }
    }

    #[test]
    fn test_scenario_a_single_recipe() {
        testing::init_logging();
        let (machines, recipes) = testing::scenario_a();
        let schedule = KitchenScheduler::new().schedule(&machines, &recipes).unwrap();

        assert_eq!(schedule.status, SolveStatus::Optimal);
        assert_eq!(schedule.makespan, Some(9));
        let ph = schedule.assignment_for("R1", "ph").unwrap();
        let cook = schedule.assignment_for("R1", "cook").unwrap();
        assert_eq!((ph.start, ph.end), (0, 6));
        assert_eq!(ph.mode, OperatingMode::Preheating);
        assert_eq!(cook.start, 6);
    }

    #[test]
    fn test_scenario_b_shared_oven() {
        let (machines, recipes) = testing::scenario_b();
        let schedule = KitchenScheduler::new().schedule(&machines, &recipes).unwrap();

        assert_eq!(schedule.status, SolveStatus::Optimal);
        assert_eq!(schedule.makespan, Some(15));
        let mut preheats: Vec<i64> = ["R1", "R2"]
            .iter()
            .map(|r| schedule.assignment_for(r, "ph").unwrap().duration)
            .collect();
        preheats.sort_unstable();
        assert_eq!(preheats, vec![3, 6]);
        assert_eq!(schedule.timeline("O1").unwrap().peak_load(), 1);
    }

    #[test]
    fn test_scenario_c_unschedulable() {
        let (machines, recipes) = testing::scenario_c();
        let err = KitchenScheduler::new()
            .schedule(&machines, &recipes)
            .unwrap_err();
        assert_eq!(
            err,
            ScheduleError::UnschedulableStep {
                recipe_id: "R1".into(),
                step_id: "prep".into(),
                kind: "HumanStep",
            }
        );
    }

    #[test]
    fn test_scenario_d_cycle() {
        let (machines, recipes) = testing::scenario_d();
        let err = KitchenScheduler::new()
            .schedule(&machines, &recipes)
            .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidRecipe { ref recipe_id, .. } if recipe_id == "R1"));
    }

    #[test]
    fn test_scenario_e_cross_temperature() {
        let (machines, recipes) = testing::scenario_e();
        let schedule = KitchenScheduler::new().schedule(&machines, &recipes).unwrap();
        let a = schedule.assignment_for("R1", "cook").unwrap();
        let b = schedule.assignment_for("R2", "cook").unwrap();
        assert!(!a.overlaps(b));
        assert_eq!(schedule.makespan, Some(7));
    }

    #[test]
    fn test_infeasible_preheat_pairing() {
        let machines = vec![
            Machine::oven("HOT", 1, 300, false),
            Machine::oven("FRY", 1, 200, true),
        ];
        let recipes = vec![Recipe::chain(
            "R1",
            vec![Step::preheat("ph", 6, 250, "fry"), Step::oven_fry("fry", 2, 250)],
        )];
        let err = KitchenScheduler::new()
            .schedule(&machines, &recipes)
            .unwrap_err();
        assert_eq!(
            err,
            ScheduleError::InfeasibleModel {
                status: SolveStatus::Infeasible
            }
        );
    }

    #[test]
    fn test_invalid_machine() {
        let machines = vec![Machine::oven("O1", 0, 300, true)];
        let (_, recipes) = testing::scenario_a();
        let err = KitchenScheduler::new()
            .schedule(&machines, &recipes)
            .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidMachine { .. }));
    }

    #[test]
    fn test_timeout_returns_unsolved_schedule() {
        let (machines, recipes) = testing::scenario_b();
        let schedule = KitchenScheduler::new()
            .with_config(SolverConfig::default().with_node_limit(Some(1)))
            .schedule(&machines, &recipes)
            .unwrap();
        assert_eq!(schedule.status, SolveStatus::TimeoutNoSolution);
        assert_eq!(schedule.makespan, None);
        assert!(schedule.assignments.is_empty());
    }

    #[test]
    fn test_kitchen_service_properties() {
        let (machines, recipes) = testing::kitchen_service();
        let schedule = KitchenScheduler::new()
            .with_config(SolverConfig::default().with_node_limit(Some(300_000)))
            .schedule(&machines, &recipes)
            .unwrap();
        assert!(schedule.is_solved());

        let total_steps: usize = recipes.iter().map(|r| r.steps.len()).sum();
        assert_eq!(schedule.assignment_count(), total_steps);

        // Precedence.
        for recipe in &recipes {
            for (before, after) in &recipe.edges {
                let a = schedule.assignment_for(&recipe.id, before).unwrap();
                let b = schedule.assignment_for(&recipe.id, after).unwrap();
                assert!(a.end <= b.start, "{} -> {}", a.label(), b.label());
            }
        }

        // Capacity.
        for (timeline, machine) in schedule.timelines.iter().zip(&machines) {
            assert!(timeline.peak_load() <= machine.capacity as usize);
        }

        // Preheat linkage on the same machine.
        for recipe in &recipes {
            for step in &recipe.steps {
                if let Some(paired) = step.paired_step() {
                    let ph = schedule.assignment_for(&recipe.id, &step.id).unwrap();
                    let cook = schedule.assignment_for(&recipe.id, paired).unwrap();
                    assert_eq!(ph.machine_id, cook.machine_id);
                    assert!((0..=1).contains(&(cook.start - ph.end)));
                }
            }
        }

        no_overlaps_where_excluded(&schedule);
        assert!(schedule.makespan.unwrap() >= schedule.lower_bound);
        assert!(schedule.makespan.unwrap() <= schedule.horizon);
    }

    #[test]
    fn test_schedule_request_from_json() {
        let json = r#"{
            "machines": [
                {"id": "O1", "name": "", "kind": {"type": "oven", "max_temperature": 300, "can_fry": true}, "capacity": 1}
            ],
            "recipes": [
                {"id": "R1", "name": "", "steps": [
                    {"id": "ph", "kind": {"type": "pre_heat", "temperature": 120, "paired_step": "cook"}, "duration": 6},
                    {"id": "cook", "kind": {"type": "oven_cook", "temperature": 120}, "duration": 3}
                ], "edges": [["ph", "cook"]]}
            ],
            "policy": {"reheat": {"rule": "disabled"}}
        }"#;
        let request: ScheduleRequest = serde_json::from_str(json).unwrap();
        let schedule = KitchenScheduler::new().schedule_request(&request).unwrap();
        assert_eq!(schedule.makespan, Some(9));
    }

    /// Returns an assignment that breaks a precedence edge.
    struct BrokenSolver;

    impl CpSolver for BrokenSolver {
        fn solve(&self, model: &ScheduleModel, _config: &SolverConfig) -> CpSolution {
            let mut solution = BranchAndBoundSolver.solve(model, &SolverConfig::default());
            if let Some(assignment) = solution.assignment.as_mut() {
                for value in assignment.values.iter_mut().filter(|v| v.active) {
                    *value = IntervalValue::active(0, value.duration);
                }
            }
            solution
        }
    }

    #[test]
    fn test_solver_result_is_verified() {
        let (machines, recipes) = testing::scenario_a();
        let err = KitchenScheduler::new()
            .schedule_with(&BrokenSolver, &machines, &recipes)
            .unwrap_err();
        assert!(matches!(err, ScheduleError::ConstraintViolated(_)));
        assert!(err.is_internal());
    }
}
