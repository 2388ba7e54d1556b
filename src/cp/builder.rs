//! Translates machines and recipe graphs into a [`ScheduleModel`].
//!
//! # Construction
//!
//! 1. One candidate per (step, compatible machine, role). Ovens expose a
//!    cooking and a frying role, other machines a single role.
//! 2. Per step: exactly-one, duration identity, thermal duration for
//!    preheats, and consistency for each candidate.
//! 3. Precedence for every recipe edge, plus the implicit edge from a
//!    preheat to its paired step.
//! 4. Mode restriction: fry steps only in the frying role, cook and
//!    preheat steps only in the cooking role.
//! 5. Preheat linkage per oven; a preheat candidate whose paired step
//!    cannot run on that oven is forced inactive.
//! 6. Pairwise oven exclusions per policy, and one cumulative constraint
//!    per machine.

use tracing::debug;

use super::model::{
    CandidateInterval, CandidateRole, InactiveCause, ModelConstraint, ModelStep, OverlapRule,
    ScheduleModel,
};
use super::solver::{CpSolution, CpSolver, SolverConfig};
use crate::compat;
use crate::error::ScheduleError;
use crate::models::{Machine, RecipeGraph, SchedulingPolicy, StepKind};

/// Role an oven step must use.
fn required_role(kind: &StepKind) -> CandidateRole {
    match kind {
        StepKind::OvenFry { .. } => CandidateRole::Frying,
        StepKind::OvenCook { .. } | StepKind::PreHeat { .. } => CandidateRole::Cooking,
        _ => CandidateRole::Sole,
    }
}

/// Builds a [`ScheduleModel`] from domain objects.
///
/// # Example
/// ```
/// use u_kitchen::cp::ScheduleModelBuilder;
/// use u_kitchen::models::{Machine, Recipe, RecipeGraph, Step};
///
/// let machines = vec![Machine::oven("O1", 1, 300, true)];
/// let recipe = Recipe::chain(
///     "R1",
///     vec![Step::preheat("ph", 6, 120, "cook"), Step::oven_cook("cook", 3, 120)],
/// );
/// let graphs = vec![RecipeGraph::build(&recipe).unwrap()];
/// let model = ScheduleModelBuilder::new(&machines, &graphs).build().unwrap();
/// assert_eq!(model.candidate_count(), 4);
/// assert_eq!(model.horizon, 11);
/// ```
pub struct ScheduleModelBuilder<'a> {
    machines: &'a [Machine],
    recipes: &'a [RecipeGraph],
    policy: SchedulingPolicy,
}

impl<'a> ScheduleModelBuilder<'a> {
    /// Creates a builder with the default policy.
    pub fn new(machines: &'a [Machine], recipes: &'a [RecipeGraph]) -> Self {
        Self {
            machines,
            recipes,
            policy: SchedulingPolicy::default(),
        }
    }

    /// Sets the scheduling policy.
    pub fn with_policy(mut self, policy: SchedulingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builds the model.
    ///
    /// Fails with [`ScheduleError::InvalidMachine`] for a machine with
    /// capacity below 1, and with [`ScheduleError::UnschedulableStep`] if
    /// some step has no compatible machine. A negative `max_preheat_gap`
    /// is read as 0.
    pub fn build(&self) -> Result<ScheduleModel, ScheduleError> {
        if let Some(machine) = self.machines.iter().find(|m| m.capacity < 1) {
            return Err(ScheduleError::InvalidMachine {
                machine_id: machine.id.clone(),
                reason: format!("capacity {} is below 1", machine.capacity),
            });
        }
        let policy = self
            .policy
            .clone()
            .with_max_preheat_gap(self.policy.max_preheat_gap);

        let mut steps = Vec::new();
        let mut candidates = Vec::new();
        let mut constraints = Vec::new();
        let mut offsets = Vec::with_capacity(self.recipes.len());

        for (r, graph) in self.recipes.iter().enumerate() {
            offsets.push(steps.len());
            for i in 0..graph.len() {
                let step = graph.step(i);
                let eligible = compat::require_eligible(graph.id(), step, self.machines)?;
                let first = candidates.len();
                let global = steps.len();
                for m in eligible {
                    if self.machines[m].is_oven() {
                        for role in [CandidateRole::Cooking, CandidateRole::Frying] {
                            candidates.push(CandidateInterval {
                                step: global,
                                machine: m,
                                role,
                            });
                        }
                    } else {
                        candidates.push(CandidateInterval {
                            step: global,
                            machine: m,
                            role: CandidateRole::Sole,
                        });
                    }
                }
                steps.push(ModelStep {
                    recipe: r,
                    recipe_id: graph.id().to_string(),
                    step_id: step.id.clone(),
                    local_index: i,
                    kind: step.kind.clone(),
                    nominal: step.duration,
                    candidates: first..candidates.len(),
                    terminal: graph.is_terminal(i),
                });
            }
        }

        let mut forced = vec![false; candidates.len()];

        for (s, step) in steps.iter().enumerate() {
            constraints.push(ModelConstraint::ExactlyOne { step: s });
            let min = if step.is_preheat() {
                self.policy.reheat.min_duration(step.nominal)
            } else {
                step.nominal
            };
            constraints.push(ModelConstraint::DurationIdentity {
                step: s,
                min,
                max: step.nominal,
            });
            if step.is_preheat() {
                constraints.push(ModelConstraint::ThermalDuration { step: s });
            }

            let role = required_role(&step.kind);
            for c in step.candidates.clone() {
                constraints.push(ModelConstraint::Consistency { candidate: c });
                if candidates[c].role != role {
                    forced[c] = true;
                    constraints.push(ModelConstraint::ForcedInactive {
                        candidate: c,
                        cause: InactiveCause::ModeRestriction,
                    });
                }
            }
        }

        for (graph, &offset) in self.recipes.iter().zip(&offsets) {
            for u in 0..graph.len() {
                for &v in graph.successors(u) {
                    constraints.push(ModelConstraint::Precedence {
                        before: offset + u,
                        after: offset + v,
                    });
                }
                if let Some(v) = graph.paired_step(u) {
                    if !graph.predecessors(v).contains(&u) {
                        constraints.push(ModelConstraint::Precedence {
                            before: offset + u,
                            after: offset + v,
                        });
                    }
                }
            }
        }

        for (graph, &offset) in self.recipes.iter().zip(&offsets) {
            for u in 0..graph.len() {
                let Some(v) = graph.paired_step(u) else {
                    continue;
                };
                let (preheat, paired) = (offset + u, offset + v);
                let paired_role = required_role(&steps[paired].kind);
                for c in steps[preheat].candidates.clone() {
                    if forced[c] {
                        continue;
                    }
                    let machine = candidates[c].machine;
                    let target = steps[paired].candidates.clone().find(|&d| {
                        candidates[d].machine == machine && candidates[d].role == paired_role
                    });
                    match target {
                        Some(d) => constraints.push(ModelConstraint::PreheatLink {
                            preheat: c,
                            paired: d,
                            max_gap: policy.max_preheat_gap,
                        }),
                        None => {
                            forced[c] = true;
                            constraints.push(ModelConstraint::ForcedInactive {
                                candidate: c,
                                cause: InactiveCause::UnpairedOven,
                            });
                        }
                    }
                }
            }
        }

        for (m, machine) in self.machines.iter().enumerate() {
            let live: Vec<usize> = (0..candidates.len())
                .filter(|&c| candidates[c].machine == m && !forced[c])
                .collect();
            if live.is_empty() {
                continue;
            }
            if machine.is_oven() {
                self.oven_exclusions(&steps, &candidates, &live, &mut constraints);
            }
            constraints.push(ModelConstraint::Cumulative {
                machine: m,
                candidates: live,
                capacity: machine.capacity,
            });
        }

        let horizon = steps.iter().map(|s| s.nominal).sum::<i64>() + steps.len() as i64;

        debug!(
            steps = steps.len(),
            candidates = candidates.len(),
            constraints = constraints.len(),
            horizon,
            "built schedule model"
        );

        Ok(ScheduleModel {
            machines: self.machines.to_vec(),
            steps,
            candidates,
            constraints,
            horizon,
            policy,
        })
    }

    /// Pairwise exclusions among the live candidates of one oven.
    fn oven_exclusions(
        &self,
        steps: &[ModelStep],
        candidates: &[CandidateInterval],
        live: &[usize],
        constraints: &mut Vec<ModelConstraint>,
    ) {
        for (i, &a) in live.iter().enumerate() {
            for &b in &live[i + 1..] {
                let (ca, cb) = (candidates[a], candidates[b]);
                if ca.step == cb.step {
                    continue;
                }
                let (sa, sb) = (&steps[ca.step], &steps[cb.step]);

                if self.policy.cook_fry_exclusive && ca.role != cb.role {
                    constraints.push(ModelConstraint::NoOverlap {
                        first: a,
                        second: b,
                        rule: OverlapRule::CookFry,
                    });
                    continue;
                }

                if self.policy.preheat_blocks_oven
                    && (sa.is_preheat() || sb.is_preheat())
                    && !is_pair(sa, sb)
                {
                    constraints.push(ModelConstraint::NoOverlap {
                        first: a,
                        second: b,
                        rule: OverlapRule::PreheatExclusive,
                    });
                    continue;
                }

                if self.policy.cross_temperature_exclusive
                    && sa.recipe != sb.recipe
                    && matches!(sa.kind, StepKind::OvenCook { .. })
                    && matches!(sb.kind, StepKind::OvenCook { .. })
                    && sa.temperature() != sb.temperature()
                {
                    constraints.push(ModelConstraint::NoOverlap {
                        first: a,
                        second: b,
                        rule: OverlapRule::CrossTemperature,
                    });
                }
            }
        }
    }

    /// Builds the model and solves it.
    pub fn solve<S: CpSolver>(
        &self,
        solver: &S,
        config: &SolverConfig,
    ) -> Result<(ScheduleModel, CpSolution), ScheduleError> {
        let model = self.build()?;
        let solution = solver.solve(&model, config);
        Ok((model, solution))
    }
}

/// Whether one step is the preheat of the other.
fn is_pair(a: &ModelStep, b: &ModelStep) -> bool {
    let pairs = |p: &ModelStep, q: &ModelStep| {
        p.recipe == q.recipe
            && matches!(&p.kind, StepKind::PreHeat { paired_step, .. } if *paired_step == q.step_id)
    };
    pairs(a, b) || pairs(b, a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::BranchAndBoundSolver;
    use crate::models::{Recipe, Step};
    use crate::testing;

    fn build(
        machines: &[Machine],
        recipes: &[Recipe],
        policy: SchedulingPolicy,
    ) -> Result<ScheduleModel, ScheduleError> {
        let graphs: Vec<RecipeGraph> = recipes
            .iter()
            .map(|r| RecipeGraph::build(r).unwrap())
            .collect();
        ScheduleModelBuilder::new(machines, &graphs)
            .with_policy(policy)
            .build()
    }

    fn count_overlap(model: &ScheduleModel, rule: OverlapRule) -> usize {
        model.count_constraints(
            |c| matches!(c, ModelConstraint::NoOverlap { rule: r, .. } if *r == rule),
        )
    }

    #[test]
    fn test_candidate_arena_layout() {
        let (machines, recipes) = testing::scenario_a();
        let model = build(&machines, &recipes, SchedulingPolicy::default()).unwrap();

        assert_eq!(model.step_count(), 2);
        assert_eq!(model.candidate_count(), 4);
        assert_eq!(model.steps[0].candidates, 0..2);
        assert_eq!(model.steps[1].candidates, 2..4);
        assert_eq!(
            model.find_candidate(1, 0, CandidateRole::Cooking),
            Some(2)
        );
        assert!(!model.steps[0].terminal);
        assert!(model.steps[1].terminal);
        assert_eq!(model.horizon, 6 + 3 + 2);
    }

    #[test]
    fn test_mode_restriction() {
        let machines = vec![Machine::oven("O1", 1, 300, true)];
        let recipes = vec![Recipe::chain(
            "R1",
            vec![Step::oven_cook("c", 3, 120), Step::oven_fry("f", 2, 180)],
        )];
        let model = build(&machines, &recipes, SchedulingPolicy::default()).unwrap();

        let forced: Vec<usize> = model
            .constraints
            .iter()
            .filter_map(|c| match c {
                ModelConstraint::ForcedInactive {
                    candidate,
                    cause: InactiveCause::ModeRestriction,
                } => Some(*candidate),
                _ => None,
            })
            .collect();
        // Cook loses its frying candidate, fry loses its cooking one.
        assert_eq!(forced, vec![1, 2]);
    }

    #[test]
    fn test_preheat_link_and_implicit_precedence() {
        let machines = vec![
            Machine::oven("O1", 1, 300, false),
            Machine::oven("O2", 1, 300, false),
        ];
        // No explicit edge between preheat and cook.
        let recipes = vec![Recipe::new("R1")
            .with_step(Step::preheat("ph", 6, 120, "cook"))
            .with_step(Step::oven_cook("cook", 3, 120))];
        let model = build(&machines, &recipes, SchedulingPolicy::default()).unwrap();

        assert_eq!(
            model.count_constraints(|c| matches!(
                c,
                ModelConstraint::Precedence {
                    before: 0,
                    after: 1
                }
            )),
            1
        );
        let links: Vec<(usize, usize)> = model
            .constraints
            .iter()
            .filter_map(|c| match c {
                ModelConstraint::PreheatLink {
                    preheat, paired, ..
                } => Some((*preheat, *paired)),
                _ => None,
            })
            .collect();
        // Same oven, cooking role on both sides.
        assert_eq!(links, vec![(0, 4), (2, 6)]);
    }

    #[test]
    fn test_unpaired_oven_forced_inactive() {
        let machines = vec![
            Machine::oven("HOT", 1, 300, false),
            Machine::oven("FRY", 1, 200, true),
        ];
        let recipes = vec![Recipe::chain(
            "R1",
            vec![Step::preheat("ph", 6, 250, "f"), Step::oven_fry("f", 2, 250)],
        )];
        let model = build(&machines, &recipes, SchedulingPolicy::default()).unwrap();

        assert_eq!(
            model.count_constraints(|c| matches!(
                c,
                ModelConstraint::ForcedInactive {
                    cause: InactiveCause::UnpairedOven,
                    ..
                }
            )),
            1
        );
        assert_eq!(
            model.count_constraints(|c| matches!(c, ModelConstraint::PreheatLink { .. })),
            0
        );
    }

    #[test]
    fn test_oven_exclusions() {
        let machines = vec![Machine::oven("O1", 2, 300, true)];
        let recipes = vec![
            Recipe::chain("R1", vec![Step::oven_cook("c", 3, 150)]),
            Recipe::chain("R2", vec![Step::oven_cook("c", 3, 200)]),
            Recipe::chain("R3", vec![Step::oven_cook("c", 3, 150)]),
            Recipe::chain("R4", vec![Step::oven_fry("f", 2, 180)]),
        ];
        let model = build(&machines, &recipes, SchedulingPolicy::default()).unwrap();
        assert_eq!(count_overlap(&model, OverlapRule::CookFry), 3);
        assert_eq!(count_overlap(&model, OverlapRule::CrossTemperature), 2);

        let relaxed = SchedulingPolicy::default()
            .with_cook_fry_exclusive(false)
            .with_cross_temperature_exclusive(false);
        let model = build(&machines, &recipes, relaxed).unwrap();
        assert_eq!(count_overlap(&model, OverlapRule::CookFry), 0);
        assert_eq!(count_overlap(&model, OverlapRule::CrossTemperature), 0);
    }

    #[test]
    fn test_preheat_blocks_oven() {
        let machines = vec![Machine::oven("O1", 3, 300, false)];
        let recipes = vec![
            Recipe::chain(
                "R1",
                vec![Step::preheat("ph", 6, 120, "c"), Step::oven_cook("c", 3, 120)],
            ),
            Recipe::chain("R2", vec![Step::oven_cook("c", 3, 120)]),
        ];
        let policy = SchedulingPolicy::default().with_preheat_blocks_oven(true);
        let model = build(&machines, &recipes, policy).unwrap();
        // The preheat against R2's cook only; never against its own cook.
        assert_eq!(count_overlap(&model, OverlapRule::PreheatExclusive), 1);
    }

    #[test]
    fn test_cumulative_per_machine() {
        let machines = vec![
            Machine::oven("O1", 2, 300, true),
            Machine::blast_chiller("B1", 3),
            Machine::human("CHEF"),
        ];
        let recipes = vec![Recipe::chain(
            "R1",
            vec![Step::human("prep", 2), Step::oven_cook("c", 3, 120), Step::blast("b", 4)],
        )];
        let model = build(&machines, &recipes, SchedulingPolicy::default()).unwrap();
        let capacities: Vec<(usize, i32)> = model
            .constraints
            .iter()
            .filter_map(|c| match c {
                ModelConstraint::Cumulative {
                    machine, capacity, ..
                } => Some((*machine, *capacity)),
                _ => None,
            })
            .collect();
        assert_eq!(capacities, vec![(0, 2), (1, 3), (2, 1)]);
    }

    #[test]
    fn test_unschedulable_step() {
        let (machines, recipes) = testing::scenario_c();
        let err = build(&machines, &recipes, SchedulingPolicy::default()).unwrap_err();
        assert!(matches!(err, ScheduleError::UnschedulableStep { .. }));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let (_, recipes) = testing::scenario_a();
        let machines = vec![Machine::oven("O1", 1, 300, true).with_capacity(0)];
        let err = build(&machines, &recipes, SchedulingPolicy::default()).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidMachine { ref machine_id, .. } if machine_id == "O1"
        ));
    }

    #[test]
    fn test_negative_gap_from_json() {
        let (machines, recipes) = testing::scenario_a();
        let policy: SchedulingPolicy =
            serde_json::from_str(r#"{"max_preheat_gap": -3}"#).unwrap();
        assert_eq!(policy.max_preheat_gap, -3);

        let model = build(&machines, &recipes, policy).unwrap();
        assert_eq!(model.policy.max_preheat_gap, 0);
        assert!(model
            .constraints
            .iter()
            .any(|c| matches!(c, ModelConstraint::PreheatLink { max_gap: 0, .. })));

        let solution = BranchAndBoundSolver.solve(&model, &SolverConfig::default());
        assert_eq!(solution.status, crate::models::SolveStatus::Optimal);
        assert_eq!(solution.makespan, Some(9));
    }
}
