//! Recipe scheduling for shared kitchen equipment.
//!
//! Schedules multi-step production recipes (preheat, cook, fry, blast chill,
//! vacuum seal, manual work) onto a pool of typed machines with finite
//! concurrent capacity, minimizing makespan.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Machine`, `Step`, `Recipe`, `RecipeGraph`,
//!   `SchedulingPolicy`, `Schedule`
//! - **`compat`**: Which machines can host a step
//! - **`thermal`**: Effective preheat duration from oven state
//! - **`validation`**: Input integrity checks (duplicate IDs, cycles, paired steps)
//! - **`cp`**: Constraint model, branch-and-bound optimizer, schedule extraction
//! - **`scheduler`**: End-to-end entry point and KPIs
//!
//! # Example
//!
//! ```
//! use u_kitchen::models::{Machine, Recipe, Step};
//! use u_kitchen::scheduler::KitchenScheduler;
//!
//! let machines = vec![Machine::oven("OVEN-1", 1, 300, true)];
//! let recipes = vec![Recipe::chain(
//!     "roast",
//!     vec![
//!         Step::preheat("ph", 6, 120, "cook"),
//!         Step::oven_cook("cook", 3, 120),
//!     ],
//! )];
//!
//! let schedule = KitchenScheduler::new().schedule(&machines, &recipes).unwrap();
//! assert_eq!(schedule.makespan, Some(9));
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Baptiste et al. (2001), "Constraint-Based Scheduling"

pub mod compat;
pub mod cp;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod thermal;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use error::ScheduleError;
