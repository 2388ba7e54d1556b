//! Schedule (solution) model.
//!
//! A schedule assigns every step to one machine, an operating mode and a
//! time interval. Assignments are also grouped into per-machine timelines
//! ordered by start time.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of an optimizer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    /// Best possible makespan, proven.
    Optimal,
    /// Feasible, but the search stopped before proving optimality.
    Feasible,
    /// No assignment satisfies the constraints.
    Infeasible,
    /// The budget ran out before any feasible assignment was found.
    TimeoutNoSolution,
}

impl SolveStatus {
    /// Whether the status comes with an assignment.
    pub fn has_solution(&self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }

    /// Upper-case status name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SolveStatus::Optimal => "OPTIMAL",
            SolveStatus::Feasible => "FEASIBLE",
            SolveStatus::Infeasible => "INFEASIBLE",
            SolveStatus::TimeoutNoSolution => "TIMEOUT_NO_SOLUTION",
        }
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a step uses its machine.
///
/// Ovens run in a cooking or frying role; a preheat occupies the cooking
/// role but is reported separately. Non-oven machines have one mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    Cooking,
    Frying,
    Preheating,
    Standard,
}

/// A step placed on a machine over `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleAssignment {
    /// Recipe ID.
    pub recipe_id: String,
    /// Step ID within the recipe.
    pub step_id: String,
    /// Assigned machine ID.
    pub machine_id: String,
    /// Operating mode on the machine.
    pub mode: OperatingMode,
    /// Start time.
    pub start: i64,
    /// Actual duration (may be shorter than nominal for preheats).
    pub duration: i64,
    /// End time (`start + duration`).
    pub end: i64,
}

impl ScheduleAssignment {
    /// Creates an assignment; `end` is derived.
    pub fn new(
        recipe_id: impl Into<String>,
        step_id: impl Into<String>,
        machine_id: impl Into<String>,
        mode: OperatingMode,
        start: i64,
        duration: i64,
    ) -> Self {
        Self {
            recipe_id: recipe_id.into(),
            step_id: step_id.into(),
            machine_id: machine_id.into(),
            mode,
            start,
            duration,
            end: start + duration,
        }
    }

    /// Whether two assignments share at least one time instant.
    #[inline]
    pub fn overlaps(&self, other: &ScheduleAssignment) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Report label, e.g. `R1/cook`.
    pub fn label(&self) -> String {
        format!("{}/{}", self.recipe_id, self.step_id)
    }
}

/// Assignments of one machine, ordered by start time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineTimeline {
    /// Machine ID.
    pub machine_id: String,
    /// Report label of the machine kind.
    pub kind: String,
    /// Assignments sorted by (start, recipe, step).
    pub entries: Vec<ScheduleAssignment>,
}

impl MachineTimeline {
    /// Total busy time (sum of durations; overlapping entries count twice).
    pub fn busy_time(&self) -> i64 {
        self.entries.iter().map(|e| e.duration).sum()
    }

    /// Largest number of entries running at the same instant.
    pub fn peak_load(&self) -> usize {
        let mut events: Vec<(i64, i32)> = self
            .entries
            .iter()
            .flat_map(|e| [(e.start, 1), (e.end, -1)])
            .collect();
        // Ends sort before starts at the same instant.
        events.sort();
        let mut load = 0i32;
        let mut peak = 0i32;
        for (_, delta) in events {
            load += delta;
            peak = peak.max(load);
        }
        peak as usize
    }
}

/// A complete schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Solver status.
    pub status: SolveStatus,
    /// Completion time of the last recipe. `None` without a solution.
    pub makespan: Option<i64>,
    /// Lower bound known to the solver.
    pub lower_bound: i64,
    /// Planning horizon of the model.
    pub horizon: i64,
    /// One assignment per step, in recipe and step order.
    pub assignments: Vec<ScheduleAssignment>,
    /// Per-machine timelines, in machine input order.
    pub timelines: Vec<MachineTimeline>,
}

impl Schedule {
    /// A schedule without assignments, e.g. after a timeout.
    pub fn unsolved(status: SolveStatus, lower_bound: i64, horizon: i64) -> Self {
        Self {
            status,
            makespan: None,
            lower_bound,
            horizon,
            assignments: Vec::new(),
            timelines: Vec::new(),
        }
    }

    /// Whether the schedule carries assignments.
    pub fn is_solved(&self) -> bool {
        self.status.has_solution()
    }

    /// Whether optimality was proven.
    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// Finds the assignment of a step.
    pub fn assignment_for(&self, recipe_id: &str, step_id: &str) -> Option<&ScheduleAssignment> {
        self.assignments
            .iter()
            .find(|a| a.recipe_id == recipe_id && a.step_id == step_id)
    }

    /// All assignments of a recipe.
    pub fn assignments_for_recipe(&self, recipe_id: &str) -> Vec<&ScheduleAssignment> {
        self.assignments
            .iter()
            .filter(|a| a.recipe_id == recipe_id)
            .collect()
    }

    /// Timeline of a machine.
    pub fn timeline(&self, machine_id: &str) -> Option<&MachineTimeline> {
        self.timelines.iter().find(|t| t.machine_id == machine_id)
    }

    /// Latest end among a recipe's steps.
    pub fn recipe_completion_time(&self, recipe_id: &str) -> Option<i64> {
        self.assignments_for_recipe(recipe_id)
            .iter()
            .map(|a| a.end)
            .max()
    }

    /// Number of assignments.
    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }

    /// Renders one row per machine with its `[start,end]` intervals.
    ///
    /// Frying intervals carry an `_F` suffix.
    pub fn render_table(&self) -> String {
        const COLUMN: usize = 14;
        let mut out = String::new();
        out.push_str(&format!(
            "Status: {}  Makespan: {}\n\n",
            self.status,
            self.makespan
                .map(|m| m.to_string())
                .unwrap_or_else(|| "-".into())
        ));

        let width = self
            .timelines
            .iter()
            .map(|t| t.machine_id.len() + t.kind.len() + 3)
            .max()
            .unwrap_or(0);

        for timeline in &self.timelines {
            let head = format!("{} ({})", timeline.machine_id, timeline.kind);
            let mut steps = format!("{head:<width$} ");
            let mut spans = format!("{:<width$} ", "");
            for entry in &timeline.entries {
                let mut span = format!("[{},{}]", entry.start, entry.end);
                if entry.mode == OperatingMode::Frying {
                    span.push_str("_F");
                }
                steps.push_str(&format!("{:<COLUMN$}", entry.label()));
                spans.push_str(&format!("{span:<COLUMN$}"));
            }
            out.push_str(steps.trim_end());
            out.push('\n');
            out.push_str(spans.trim_end());
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_table())
    }
}
