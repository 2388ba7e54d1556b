//! Shared test fixtures.

use crate::models::{Machine, Recipe, Step};

/// Installs a test-writer tracing subscriber; repeated calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn preheated_cook(id: &str, preheat: i64, cook: i64, temperature: i64) -> Recipe {
    Recipe::chain(
        id,
        vec![
            Step::preheat("ph", preheat, temperature, "cook"),
            Step::oven_cook("cook", cook, temperature),
        ],
    )
}

/// One oven, one recipe: preheat 6 then cook 3 at 120.
pub fn scenario_a() -> (Vec<Machine>, Vec<Recipe>) {
    (
        vec![Machine::oven("O1", 1, 300, true)],
        vec![preheated_cook("R1", 6, 3, 120)],
    )
}

/// Scenario A twice on the same single-slot oven.
pub fn scenario_b() -> (Vec<Machine>, Vec<Recipe>) {
    (
        vec![Machine::oven("O1", 1, 300, true)],
        vec![
            preheated_cook("R1", 6, 3, 120),
            preheated_cook("R2", 6, 3, 120),
        ],
    )
}

/// A manual step with no operator available.
pub fn scenario_c() -> (Vec<Machine>, Vec<Recipe>) {
    (
        vec![Machine::oven("O1", 1, 300, true)],
        vec![Recipe::chain(
            "R1",
            vec![Step::human("prep", 2), Step::oven_cook("cook", 3, 120)],
        )],
    )
}

/// A recipe whose edges form a cycle.
pub fn scenario_d() -> (Vec<Machine>, Vec<Recipe>) {
    (
        vec![Machine::oven("O1", 1, 300, true), Machine::human("CHEF")],
        vec![Recipe::new("R1")
            .with_step(Step::human("a", 1))
            .with_step(Step::human("b", 1))
            .with_step(Step::human("c", 1))
            .with_edge("a", "b")
            .with_edge("b", "c")
            .with_edge("c", "a")],
    )
}

/// Two cooks at different temperatures sharing a two-slot oven.
pub fn scenario_e() -> (Vec<Machine>, Vec<Recipe>) {
    (
        vec![Machine::oven("O1", 2, 300, false)],
        vec![
            Recipe::chain("R1", vec![Step::oven_cook("cook", 4, 150)]),
            Recipe::chain("R2", vec![Step::oven_cook("cook", 3, 200)]),
        ],
    )
}

/// A small service: three recipes over every machine kind.
pub fn kitchen_service() -> (Vec<Machine>, Vec<Recipe>) {
    let machines = vec![
        Machine::oven("O1", 1, 250, true),
        Machine::oven("O2", 2, 300, false),
        Machine::blast_chiller("B1", 2),
        Machine::vacuum_machine("V1", 1),
        Machine::human("CHEF"),
    ];
    let recipes = vec![
        Recipe::chain(
            "roast",
            vec![
                Step::human("prep", 2),
                Step::preheat("ph", 5, 180, "roast"),
                Step::oven_cook("roast", 6, 180),
                Step::blast("chill", 3),
                Step::vacuum_seal("seal", 1),
            ],
        ),
        Recipe::chain(
            "fries",
            vec![
                Step::preheat("ph", 4, 190, "fry"),
                Step::oven_fry("fry", 3, 190),
                Step::human("plate", 1),
            ],
        ),
        Recipe::chain(
            "veg",
            vec![
                Step::human("chop", 3),
                Step::oven_cook("cook", 4, 180),
                Step::vacuum_seal("seal", 2),
            ],
        ),
    ];
    (machines, recipes)
}
