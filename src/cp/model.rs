//! Candidate-interval model.
//!
//! Every step gets one optional interval per (compatible machine, role).
//! Ovens expose two roles, cooking and frying, so a step eligible on an
//! oven owns two candidates there; other machines expose a single role.
//! Exactly one candidate per step is active in a solution.
//!
//! Constraints are declarative records over candidate and step indices.
//! [`ScheduleModel::verify`] checks an assignment against all of them,
//! independently of how the assignment was produced.
//!
//! # Reference
//! Laborie et al. (2018), "IBM ILOG CP Optimizer for Scheduling", optional
//! interval variables and `alternative` constraints

use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Machine, SchedulingPolicy, StepKind};
use crate::thermal::OvenActivity;

/// Role a candidate plays on its machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CandidateRole {
    /// Oven cooking role (also used by preheats).
    Cooking,
    /// Oven frying role.
    Frying,
    /// The only role of a non-oven machine.
    Sole,
}

/// One optional interval: a step on a machine in a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandidateInterval {
    /// Global step index.
    pub step: usize,
    /// Machine index.
    pub machine: usize,
    /// Role on the machine.
    pub role: CandidateRole,
}

/// A step as seen by the model.
#[derive(Debug, Clone)]
pub struct ModelStep {
    /// Index of the recipe in input order.
    pub recipe: usize,
    /// Recipe ID.
    pub recipe_id: String,
    /// Step ID.
    pub step_id: String,
    /// Stable index within the recipe.
    pub local_index: usize,
    /// Step kind.
    pub kind: StepKind,
    /// Nominal duration.
    pub nominal: i64,
    /// This step's candidates in the model arena.
    pub candidates: Range<usize>,
    /// Whether the step has no successor in its recipe.
    pub terminal: bool,
}

impl ModelStep {
    /// Target temperature of an oven step.
    pub fn temperature(&self) -> Option<i64> {
        match self.kind {
            StepKind::OvenCook { temperature }
            | StepKind::OvenFry { temperature }
            | StepKind::PreHeat { temperature, .. } => Some(temperature),
            _ => None,
        }
    }

    /// Whether the step is a preheat.
    pub fn is_preheat(&self) -> bool {
        matches!(self.kind, StepKind::PreHeat { .. })
    }
}

/// Why a candidate can never be active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InactiveCause {
    /// The step kind requires the other oven role.
    ModeRestriction,
    /// The paired step has no usable candidate on this oven.
    UnpairedOven,
}

/// Which rule a pairwise exclusion comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapRule {
    /// Cooking and frying never share an oven at the same time.
    CookFry,
    /// Cooks of different recipes at different temperatures.
    CrossTemperature,
    /// A preheat holds the oven alone.
    PreheatExclusive,
}

/// A declarative model constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelConstraint {
    /// An inactive candidate carries the sentinel values; an active one
    /// starts at or after 0 with a positive duration.
    Consistency { candidate: usize },
    /// Exactly one candidate of the step is active.
    ExactlyOne { step: usize },
    /// Summed duration over the step's candidates lies in `[min, max]`.
    DurationIdentity { step: usize, min: i64, max: i64 },
    /// A preheat's duration matches what the reheat rule gives at its start.
    ThermalDuration { step: usize },
    /// `before` ends no later than `after` starts.
    Precedence { before: usize, after: usize },
    /// The candidate is never active.
    ForcedInactive { candidate: usize, cause: InactiveCause },
    /// If `preheat` is active, `paired` is active on the same oven and
    /// starts within `max_gap` of the preheat's end.
    PreheatLink {
        preheat: usize,
        paired: usize,
        max_gap: i64,
    },
    /// Two candidates never overlap in time when both are active.
    NoOverlap {
        first: usize,
        second: usize,
        rule: OverlapRule,
    },
    /// Active candidates on a machine never exceed its capacity.
    Cumulative {
        machine: usize,
        candidates: Vec<usize>,
        capacity: i32,
    },
}

/// Value of one candidate interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalValue {
    /// Presence of the interval.
    pub active: bool,
    /// Start time, -1 when inactive.
    pub start: i64,
    /// Duration, 0 when inactive.
    pub duration: i64,
}

impl IntervalValue {
    /// Sentinel value of an inactive candidate.
    pub const INACTIVE: Self = Self {
        active: false,
        start: -1,
        duration: 0,
    };

    /// An active interval.
    pub fn active(start: i64, duration: i64) -> Self {
        Self {
            active: true,
            start,
            duration,
        }
    }

    /// End time (exclusive).
    #[inline]
    pub fn end(&self) -> i64 {
        self.start + self.duration
    }

    /// Whether both intervals are active and share an instant.
    #[inline]
    pub fn overlaps(&self, other: &IntervalValue) -> bool {
        self.active && other.active && self.start < other.end() && other.start < self.end()
    }
}

/// Values of every candidate in the arena.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelAssignment {
    /// One value per candidate, indexed like the arena.
    pub values: Vec<IntervalValue>,
}

impl ModelAssignment {
    /// All candidates inactive.
    pub fn inactive(candidates: usize) -> Self {
        Self {
            values: vec![IntervalValue::INACTIVE; candidates],
        }
    }

    /// Activates a candidate.
    pub fn activate(&mut self, candidate: usize, start: i64, duration: i64) {
        self.values[candidate] = IntervalValue::active(start, duration);
    }

    /// Active candidates within a range.
    pub fn active_in(&self, range: Range<usize>) -> Vec<usize> {
        range.filter(|&c| self.values[c].active).collect()
    }
}

/// An assignment breaks a model constraint.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ConstraintViolation {
    /// The broken constraint, if the failure is tied to one.
    pub constraint: Option<ModelConstraint>,
    /// Description.
    pub message: String,
}

impl ConstraintViolation {
    fn new(constraint: &ModelConstraint, message: impl Into<String>) -> Self {
        Self {
            constraint: Some(constraint.clone()),
            message: message.into(),
        }
    }
}

/// The complete scheduling model.
#[derive(Debug, Clone)]
pub struct ScheduleModel {
    /// Machines, in input order.
    pub machines: Vec<Machine>,
    /// Steps, recipe by recipe in input order.
    pub steps: Vec<ModelStep>,
    /// Candidate arena. A step's candidates are contiguous.
    pub candidates: Vec<CandidateInterval>,
    /// Constraints.
    pub constraints: Vec<ModelConstraint>,
    /// Upper bound on any end time: sum of nominal durations plus one
    /// unit of slack per step.
    pub horizon: i64,
    /// Policy the model was built with.
    pub policy: SchedulingPolicy,
}

impl ScheduleModel {
    /// Number of steps across all recipes.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Number of candidate intervals in the arena.
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Finds the candidate of `step` on `machine` in `role`.
    pub fn find_candidate(
        &self,
        step: usize,
        machine: usize,
        role: CandidateRole,
    ) -> Option<usize> {
        self.steps[step].candidates.clone().find(|&c| {
            let cand = &self.candidates[c];
            cand.machine == machine && cand.role == role
        })
    }

    /// Number of constraints matching a predicate.
    pub fn count_constraints<F>(&self, predicate: F) -> usize
    where
        F: Fn(&ModelConstraint) -> bool,
    {
        self.constraints.iter().filter(|c| predicate(c)).count()
    }

    /// Completion time of the last terminal step, if all of them are active.
    pub fn makespan(&self, assignment: &ModelAssignment) -> Option<i64> {
        let mut makespan = 0;
        for step in self.steps.iter().filter(|s| s.terminal) {
            let end = step
                .candidates
                .clone()
                .map(|c| assignment.values[c])
                .find(|v| v.active)?
                .end();
            makespan = makespan.max(end);
        }
        Some(makespan)
    }

    /// Duration the reheat rule gives an active preheat candidate.
    pub fn effective_preheat_duration(
        &self,
        assignment: &ModelAssignment,
        candidate: usize,
    ) -> i64 {
        let cand = self.candidates[candidate];
        let step = &self.steps[cand.step];
        let temperature = step.temperature().unwrap_or_default();
        let start = assignment.values[candidate].start;
        let prior = self
            .candidates
            .iter()
            .enumerate()
            .filter(|(c, other)| {
                other.machine == cand.machine
                    && other.step != cand.step
                    && assignment.values[*c].active
            })
            .map(|(c, other)| OvenActivity {
                temperature: self.steps[other.step].temperature().unwrap_or_default(),
                end: assignment.values[c].end(),
                order: other.step,
            });
        self.policy
            .reheat
            .effective_duration(step.nominal, temperature, start, prior)
    }

    /// The single active candidate of a step, if there is exactly one.
    fn active_candidate(&self, assignment: &ModelAssignment, step: usize) -> Option<usize> {
        match assignment.active_in(self.steps[step].candidates.clone()).as_slice() {
            [c] => Some(*c),
            _ => None,
        }
    }

    /// Checks an assignment against every constraint.
    ///
    /// Returns the first violation found, in constraint order.
    pub fn verify(&self, assignment: &ModelAssignment) -> Result<(), ConstraintViolation> {
        if assignment.values.len() != self.candidates.len() {
            return Err(ConstraintViolation {
                constraint: None,
                message: format!(
                    "assignment has {} values for {} candidates",
                    assignment.values.len(),
                    self.candidates.len()
                ),
            });
        }
        for constraint in &self.constraints {
            self.check(constraint, assignment)?;
        }
        Ok(())
    }

    fn check(
        &self,
        constraint: &ModelConstraint,
        assignment: &ModelAssignment,
    ) -> Result<(), ConstraintViolation> {
        let values = &assignment.values;
        let fail = |message: String| Err(ConstraintViolation::new(constraint, message));

        match constraint {
            ModelConstraint::Consistency { candidate } => {
                let v = values[*candidate];
                let ok = if v.active {
                    v.start >= 0 && v.duration > 0
                } else {
                    v == IntervalValue::INACTIVE
                };
                if !ok {
                    return fail(format!("candidate {candidate} has inconsistent value {v:?}"));
                }
            }
            ModelConstraint::ExactlyOne { step } => {
                let active = assignment.active_in(self.steps[*step].candidates.clone()).len();
                if active != 1 {
                    return fail(format!(
                        "step {} has {active} active candidates",
                        self.steps[*step].step_id
                    ));
                }
            }
            ModelConstraint::DurationIdentity { step, min, max } => {
                let total: i64 = self.steps[*step]
                    .candidates
                    .clone()
                    .map(|c| values[c].duration)
                    .sum();
                if total < *min || total > *max {
                    return fail(format!(
                        "step {} has duration {total}, expected [{min}, {max}]",
                        self.steps[*step].step_id
                    ));
                }
            }
            ModelConstraint::ThermalDuration { step } => {
                if let Some(c) = self.active_candidate(assignment, *step) {
                    let expected = self.effective_preheat_duration(assignment, c);
                    if values[c].duration != expected {
                        return fail(format!(
                            "preheat {} lasts {}, the reheat rule gives {expected}",
                            self.steps[*step].step_id, values[c].duration
                        ));
                    }
                }
            }
            ModelConstraint::Precedence { before, after } => {
                let b = self.active_candidate(assignment, *before);
                let a = self.active_candidate(assignment, *after);
                if let (Some(b), Some(a)) = (b, a) {
                    if values[b].end() > values[a].start {
                        return fail(format!(
                            "{} ends at {} after {} starts at {}",
                            self.steps[*before].step_id,
                            values[b].end(),
                            self.steps[*after].step_id,
                            values[a].start
                        ));
                    }
                }
            }
            ModelConstraint::ForcedInactive { candidate, .. } => {
                if values[*candidate].active {
                    return fail(format!("candidate {candidate} must stay inactive"));
                }
            }
            ModelConstraint::PreheatLink {
                preheat,
                paired,
                max_gap,
            } => {
                let p = values[*preheat];
                if p.active {
                    let q = values[*paired];
                    if !q.active {
                        return fail(format!(
                            "preheat candidate {preheat} is active but its paired candidate {paired} is not"
                        ));
                    }
                    let gap = q.start - p.end();
                    if gap < 0 || gap > *max_gap {
                        return fail(format!(
                            "paired candidate {paired} starts {gap} after its preheat ends"
                        ));
                    }
                }
            }
            ModelConstraint::NoOverlap { first, second, .. } => {
                if values[*first].overlaps(&values[*second]) {
                    return fail(format!("candidates {first} and {second} overlap"));
                }
            }
            ModelConstraint::Cumulative {
                machine,
                candidates,
                capacity,
            } => {
                let mut events: Vec<(i64, i32)> = candidates
                    .iter()
                    .map(|&c| values[c])
                    .filter(|v| v.active)
                    .flat_map(|v| [(v.start, 1), (v.end(), -1)])
                    .collect();
                events.sort_unstable();
                let mut load = 0;
                for (time, delta) in events {
                    load += delta;
                    if load > *capacity {
                        return fail(format!(
                            "machine {} runs {load} intervals at {time}, capacity {capacity}",
                            self.machines[*machine].id
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}
