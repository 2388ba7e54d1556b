//! Turns a solved model assignment into a [`Schedule`].

use tracing::error;

use super::model::{CandidateRole, ModelAssignment, ScheduleModel};
use crate::error::ScheduleError;
use crate::models::{
    MachineTimeline, OperatingMode, Schedule, ScheduleAssignment, SolveStatus, StepKind,
};

/// Reads the active candidate of every step back into domain terms.
pub struct ScheduleExtractor<'a> {
    model: &'a ScheduleModel,
}

impl<'a> ScheduleExtractor<'a> {
    /// Creates an extractor over `model`.
    pub fn new(model: &'a ScheduleModel) -> Self {
        Self { model }
    }

    /// Builds the schedule.
    ///
    /// Assignments follow recipe and step input order; each timeline is
    /// sorted by (start, recipe, step). The output only depends on the
    /// assignment, so extracting twice yields identical schedules.
    ///
    /// # Errors
    /// [`ScheduleError::MissingAssignment`] or
    /// [`ScheduleError::AmbiguousAssignment`] when a step does not have
    /// exactly one active candidate.
    pub fn extract(
        &self,
        assignment: &ModelAssignment,
        status: SolveStatus,
        lower_bound: i64,
    ) -> Result<Schedule, ScheduleError> {
        let model = self.model;
        let mut assignments = Vec::with_capacity(model.step_count());
        let mut placed: Vec<(usize, usize)> = Vec::with_capacity(model.step_count());

        for (s, step) in model.steps.iter().enumerate() {
            let active = assignment.active_in(step.candidates.clone());
            let c = match active.as_slice() {
                [c] => *c,
                [] => {
                    error!(recipe = %step.recipe_id, step = %step.step_id, "no active candidate");
                    return Err(ScheduleError::MissingAssignment {
                        recipe_id: step.recipe_id.clone(),
                        step_id: step.step_id.clone(),
                    });
                }
                many => {
                    error!(
                        recipe = %step.recipe_id,
                        step = %step.step_id,
                        active = many.len(),
                        "ambiguous candidates"
                    );
                    return Err(ScheduleError::AmbiguousAssignment {
                        recipe_id: step.recipe_id.clone(),
                        step_id: step.step_id.clone(),
                        active: many.len(),
                    });
                }
            };

            let candidate = model.candidates[c];
            let value = assignment.values[c];
            let mode = match (candidate.role, &step.kind) {
                (CandidateRole::Frying, _) => OperatingMode::Frying,
                (CandidateRole::Cooking, StepKind::PreHeat { .. }) => OperatingMode::Preheating,
                (CandidateRole::Cooking, _) => OperatingMode::Cooking,
                (CandidateRole::Sole, _) => OperatingMode::Standard,
            };
            assignments.push(ScheduleAssignment::new(
                &step.recipe_id,
                &step.step_id,
                &model.machines[candidate.machine].id,
                mode,
                value.start,
                value.duration,
            ));
            placed.push((candidate.machine, s));
        }

        let timelines = model
            .machines
            .iter()
            .enumerate()
            .map(|(m, machine)| {
                let mut entries: Vec<(i64, usize, usize, &ScheduleAssignment)> = placed
                    .iter()
                    .filter(|(on, _)| *on == m)
                    .map(|&(_, s)| {
                        let step = &model.steps[s];
                        (assignments[s].start, step.recipe, step.local_index, &assignments[s])
                    })
                    .collect();
                entries.sort_by_key(|&(start, recipe, local, _)| (start, recipe, local));
                MachineTimeline {
                    machine_id: machine.id.clone(),
                    kind: machine.kind_label().to_string(),
                    entries: entries.into_iter().map(|(.., a)| a.clone()).collect(),
                }
            })
            .collect();

        Ok(Schedule {
            status,
            makespan: model.makespan(assignment),
            lower_bound,
            horizon: model.horizon,
            assignments,
            timelines,
        })
    }
}
