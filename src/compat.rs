//! Step-to-machine compatibility.
//!
//! | Step | Eligible machines |
//! |------|-------------------|
//! | `OvenCook`, `PreHeat` | ovens rated for the step temperature |
//! | `OvenFry` | ovens that can fry |
//! | `Blast` | blast chillers |
//! | `VacuumSeal` | vacuum machines |
//! | `HumanStep` | human operators |

use crate::error::ScheduleError;
use crate::models::{Machine, MachineKind, Step, StepKind};

/// Whether `machine` can host `step`.
pub fn is_compatible(step: &Step, machine: &Machine) -> bool {
    match (&step.kind, &machine.kind) {
        (
            StepKind::OvenCook { temperature } | StepKind::PreHeat { temperature, .. },
            MachineKind::Oven {
                max_temperature, ..
            },
        ) => max_temperature >= temperature,
        (StepKind::OvenFry { .. }, MachineKind::Oven { can_fry, .. }) => *can_fry,
        (StepKind::Blast, MachineKind::BlastChiller) => true,
        (StepKind::VacuumSeal, MachineKind::VacuumMachine) => true,
        (StepKind::HumanStep, MachineKind::HumanOperator) => true,
        _ => false,
    }
}

/// IDs of the machines that can host `step`, in machine order.
pub fn eligible_machines<'a>(step: &Step, machines: &'a [Machine]) -> Vec<&'a str> {
    machines
        .iter()
        .filter(|m| is_compatible(step, m))
        .map(|m| m.id.as_str())
        .collect()
}

/// Indices into `machines` of the machines that can host `step`.
pub fn eligible_machine_indices(step: &Step, machines: &[Machine]) -> Vec<usize> {
    machines
        .iter()
        .enumerate()
        .filter(|(_, m)| is_compatible(step, m))
        .map(|(i, _)| i)
        .collect()
}

/// Like [`eligible_machine_indices`], failing with
/// [`ScheduleError::UnschedulableStep`] when nothing qualifies.
pub fn require_eligible(
    recipe_id: &str,
    step: &Step,
    machines: &[Machine],
) -> Result<Vec<usize>, ScheduleError> {
    let eligible = eligible_machine_indices(step, machines);
    if eligible.is_empty() {
        return Err(ScheduleError::UnschedulableStep {
            recipe_id: recipe_id.to_string(),
            step_id: step.id.clone(),
            kind: step.kind.label(),
        });
    }
    Ok(eligible)
}
