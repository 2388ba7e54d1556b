//! Scheduling entry point and KPI evaluation.
//!
//! # Algorithm
//!
//! `KitchenScheduler` validates the input, builds the candidate-interval
//! model, minimizes makespan with branch and bound, verifies the result
//! against the model, and extracts a [`Schedule`](crate::models::Schedule).
//!
//! # KPI
//!
//! `ScheduleKpi` computes makespan, optimality gap, machine utilization
//! and the preheat time saved by reusing oven heat.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3-4
//! - Baker & Trietsch (2019), "Principles of Sequencing and Scheduling"

mod kitchen;
mod kpi;

pub use kitchen::{KitchenScheduler, ScheduleRequest};
pub use kpi::ScheduleKpi;
