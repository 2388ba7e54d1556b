//! Input validation for scheduling problems.
//!
//! Checks structural integrity of machines and recipes before any model is
//! built. Detects:
//! - Duplicate machine, recipe and step IDs
//! - Machines with capacity below 1
//! - Steps with non-positive durations
//! - Malformed recipe graphs (unknown edge endpoints, cycles, bad preheat pairing)
//! - Empty recipes
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::HashSet;

use crate::error::ScheduleError;
use crate::models::{Machine, Recipe, RecipeGraph};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// ID of the offending machine or recipe.
    pub entity_id: String,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two machines share the same ID.
    DuplicateMachineId,
    /// Two recipes share the same ID.
    DuplicateRecipeId,
    /// A machine cannot host anything.
    InvalidCapacity,
    /// A step has a non-positive duration.
    InvalidDuration,
    /// The recipe graph is malformed.
    MalformedRecipe,
}

impl ValidationError {
    fn new(
        kind: ValidationErrorKind,
        entity_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }

    /// Whether the error concerns a machine rather than a recipe.
    pub fn is_machine_error(&self) -> bool {
        matches!(
            self.kind,
            ValidationErrorKind::DuplicateMachineId | ValidationErrorKind::InvalidCapacity
        )
    }
}

impl From<ValidationError> for ScheduleError {
    fn from(err: ValidationError) -> Self {
        if err.is_machine_error() {
            ScheduleError::InvalidMachine {
                machine_id: err.entity_id,
                reason: err.message,
            }
        } else {
            ScheduleError::InvalidRecipe {
                recipe_id: err.entity_id,
                reason: err.message,
            }
        }
    }
}

/// Validates the input data for a scheduling problem.
///
/// Checks:
/// 1. No duplicate machine IDs
/// 2. Every machine capacity is at least 1
/// 3. No duplicate recipe IDs
/// 4. Every step duration is positive
/// 5. Every recipe builds into a [`RecipeGraph`]
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(machines: &[Machine], recipes: &[Recipe]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut machine_ids = HashSet::new();
    for m in machines {
        if !machine_ids.insert(m.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateMachineId,
                &m.id,
                format!("Duplicate machine ID: {}", m.id),
            ));
        }
        if m.capacity < 1 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidCapacity,
                &m.id,
                format!("Machine '{}' has capacity {}", m.id, m.capacity),
            ));
        }
    }

    let mut recipe_ids = HashSet::new();
    for recipe in recipes {
        if !recipe_ids.insert(recipe.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateRecipeId,
                &recipe.id,
                format!("Duplicate recipe ID: {}", recipe.id),
            ));
        }

        for step in &recipe.steps {
            if step.duration <= 0 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidDuration,
                    &recipe.id,
                    format!(
                        "Step '{}' of recipe '{}' has duration {}",
                        step.id, recipe.id, step.duration
                    ),
                ));
            }
        }

        if let Err(err) = RecipeGraph::build(recipe) {
            let message = match err {
                ScheduleError::InvalidRecipe { reason, .. } => reason,
                other => other.to_string(),
            };
            errors.push(ValidationError::new(
                ValidationErrorKind::MalformedRecipe,
                &recipe.id,
                message,
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
