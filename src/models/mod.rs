//! Kitchen scheduling domain models.
//!
//! Provides the input types (machines, steps, recipes, policy) and the
//! output types (schedule, assignments, timelines).
//!
//! # Domain Mappings
//!
//! | u-kitchen | Job-shop | Example |
//! |-----------|----------|---------|
//! | Recipe | Job | Roast chicken |
//! | Step | Operation | Preheat to 180 °C |
//! | Machine | Resource | Combi oven, blast chiller, chef |
//! | Schedule | Plan | Service prep plan |

mod machine;
mod policy;
mod recipe;
mod schedule;
mod step;

pub use machine::{Machine, MachineKind};
pub use policy::SchedulingPolicy;
pub use recipe::{Recipe, RecipeGraph};
pub use schedule::{MachineTimeline, OperatingMode, Schedule, ScheduleAssignment, SolveStatus};
pub use step::{Step, StepKind};
