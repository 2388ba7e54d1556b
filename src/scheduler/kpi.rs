//! Schedule quality metrics (KPIs).
//!
//! Computes performance indicators from a solved schedule and its input
//! machines and recipes.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Makespan (C_max) | Latest recipe completion time |
//! | Optimality gap | (makespan - lower bound) / makespan |
//! | Utilization | Busy time / (capacity × makespan), per machine |
//! | Preheat time saved | Sum of (nominal - actual) over preheats |
//! | Warm preheats | Preheats shortened by a back-to-back predecessor |
//! | Avg completion | Mean recipe completion time |
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use std::collections::HashMap;

use crate::models::{Machine, OperatingMode, Recipe, Schedule};

/// Schedule performance indicators.
#[derive(Debug, Clone)]
pub struct ScheduleKpi {
    /// Latest completion time (0 without a solution).
    pub makespan: i64,
    /// Lower bound reported by the optimizer.
    pub lower_bound: i64,
    /// Relative distance to the lower bound (0.0 when proven tight).
    pub optimality_gap: f64,
    /// Average machine utilization (0.0..1.0).
    pub avg_utilization: f64,
    /// Per-machine utilization.
    pub utilization_by_machine: HashMap<String, f64>,
    /// Time saved by reusing oven heat.
    pub preheat_time_saved: i64,
    /// Number of shortened preheats.
    pub warm_preheats: usize,
    /// Mean recipe completion time.
    pub avg_completion: f64,
}

impl ScheduleKpi {
    /// Computes KPIs from a schedule and its inputs.
    ///
    /// # Arguments
    /// * `schedule` - The schedule to evaluate.
    /// * `machines` - Machines (for capacities).
    /// * `recipes` - Recipes (for nominal preheat durations).
    pub fn calculate(schedule: &Schedule, machines: &[Machine], recipes: &[Recipe]) -> Self {
        let makespan = schedule.makespan.unwrap_or(0);

        let optimality_gap = if makespan > 0 {
            (makespan - schedule.lower_bound).max(0) as f64 / makespan as f64
        } else {
            0.0
        };

        let mut utilization_by_machine = HashMap::new();
        for machine in machines {
            let busy = schedule
                .timeline(&machine.id)
                .map(|t| t.busy_time())
                .unwrap_or(0);
            let available = machine.capacity.max(1) as i64 * makespan;
            let utilization = if available > 0 {
                busy as f64 / available as f64
            } else {
                0.0
            };
            utilization_by_machine.insert(machine.id.clone(), utilization);
        }
        let avg_utilization = if utilization_by_machine.is_empty() {
            0.0
        } else {
            utilization_by_machine.values().sum::<f64>() / utilization_by_machine.len() as f64
        };

        let mut preheat_time_saved = 0;
        let mut warm_preheats = 0;
        for a in schedule
            .assignments
            .iter()
            .filter(|a| a.mode == OperatingMode::Preheating)
        {
            let nominal = recipes
                .iter()
                .find(|r| r.id == a.recipe_id)
                .and_then(|r| r.step(&a.step_id))
                .map(|s| s.duration)
                .unwrap_or(a.duration);
            if a.duration < nominal {
                preheat_time_saved += nominal - a.duration;
                warm_preheats += 1;
            }
        }

        let completions: Vec<i64> = recipes
            .iter()
            .filter_map(|r| schedule.recipe_completion_time(&r.id))
            .collect();
        let avg_completion = if completions.is_empty() {
            0.0
        } else {
            completions.iter().sum::<i64>() as f64 / completions.len() as f64
        };

        Self {
            makespan,
            lower_bound: schedule.lower_bound,
            optimality_gap,
            avg_utilization,
            utilization_by_machine,
            preheat_time_saved,
            warm_preheats,
            avg_completion,
        }
    }

    /// Whether the schedule meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_gap: f64, min_utilization: f64) -> bool {
        self.optimality_gap <= max_gap && self.avg_utilization >= min_utilization
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MachineTimeline, ScheduleAssignment, SolveStatus, Step};

    fn sample() -> (Schedule, Vec<Machine>, Vec<Recipe>) {
        let machines = vec![Machine::oven("O1", 1, 300, false), Machine::human("CHEF")];
        let recipes = vec![
            Recipe::chain(
                "R1",
                vec![Step::preheat("ph", 6, 120, "cook"), Step::oven_cook("cook", 3, 120)],
            ),
            Recipe::chain(
                "R2",
                vec![Step::preheat("ph", 6, 120, "cook"), Step::oven_cook("cook", 3, 120)],
            ),
        ];
        let entries = vec![
            ScheduleAssignment::new("R1", "ph", "O1", OperatingMode::Preheating, 0, 6),
            ScheduleAssignment::new("R1", "cook", "O1", OperatingMode::Cooking, 6, 3),
            ScheduleAssignment::new("R2", "ph", "O1", OperatingMode::Preheating, 9, 3),
            ScheduleAssignment::new("R2", "cook", "O1", OperatingMode::Cooking, 12, 3),
        ];
        let schedule = Schedule {
            status: SolveStatus::Feasible,
            makespan: Some(15),
            lower_bound: 12,
            horizon: 22,
            assignments: entries.clone(),
            timelines: vec![
                MachineTimeline {
                    machine_id: "O1".into(),
                    kind: "Oven".into(),
                    entries,
                },
                MachineTimeline {
                    machine_id: "CHEF".into(),
                    kind: "Chef".into(),
                    entries: Vec::new(),
                },
            ],
        };
        (schedule, machines, recipes)
    }

    #[test]
    fn test_kpi_basic() {
        let (schedule, machines, recipes) = sample();
        let kpi = ScheduleKpi::calculate(&schedule, &machines, &recipes);
        assert_eq!(kpi.makespan, 15);
        assert!((kpi.optimality_gap - 0.2).abs() < 1e-10);
        assert!((kpi.avg_completion - 12.0).abs() < 1e-10); // (9 + 15) / 2
    }

    #[test]
    fn test_kpi_preheat_savings() {
        let (schedule, machines, recipes) = sample();
        let kpi = ScheduleKpi::calculate(&schedule, &machines, &recipes);
        assert_eq!(kpi.preheat_time_saved, 3);
        assert_eq!(kpi.warm_preheats, 1);
    }

    #[test]
    fn test_kpi_utilization() {
        let (schedule, machines, recipes) = sample();
        let kpi = ScheduleKpi::calculate(&schedule, &machines, &recipes);
        assert!((kpi.utilization_by_machine["O1"] - 1.0).abs() < 1e-10);
        assert!(kpi.utilization_by_machine["CHEF"].abs() < 1e-10);
        assert!((kpi.avg_utilization - 0.5).abs() < 1e-10);
        assert!(kpi.meets_thresholds(0.25, 0.5));
        assert!(!kpi.meets_thresholds(0.1, 0.5));
    }

    #[test]
    fn test_kpi_unsolved() {
        let (_, machines, recipes) = sample();
        let schedule = Schedule::unsolved(SolveStatus::TimeoutNoSolution, 12, 22);
        let kpi = ScheduleKpi::calculate(&schedule, &machines, &recipes);
        assert_eq!(kpi.makespan, 0);
        assert_eq!(kpi.optimality_gap, 0.0);
        assert_eq!(kpi.avg_utilization, 0.0);
        assert_eq!(kpi.warm_preheats, 0);
    }
}
