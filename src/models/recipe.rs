//! Recipe model and its validated precedence graph.
//!
//! A recipe is a DAG of steps; an edge `(u, v)` means `u` must finish
//! before `v` starts. [`Recipe`] is the plain input container and
//! [`RecipeGraph`] the checked, indexed form used by the model builder.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use super::{Step, StepKind};
use crate::error::ScheduleError;

/// A recipe to be scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Unique recipe identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Steps, in input order. The position is the step's stable index.
    pub steps: Vec<Step>,
    /// Precedence edges `(before, after)` by step ID.
    pub edges: Vec<(String, String)>,
}

impl Recipe {
    /// Creates an empty recipe.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            steps: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Creates a linear recipe: each step precedes the next.
    pub fn chain(id: impl Into<String>, steps: Vec<Step>) -> Self {
        let edges = steps
            .windows(2)
            .map(|w| (w[0].id.clone(), w[1].id.clone()))
            .collect();
        Self {
            id: id.into(),
            name: String::new(),
            steps,
            edges,
        }
    }

    /// Sets the recipe name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a step.
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Adds a precedence edge.
    pub fn with_edge(mut self, before: impl Into<String>, after: impl Into<String>) -> Self {
        self.edges.push((before.into(), after.into()));
        self
    }

    /// Sum of nominal step durations.
    pub fn total_duration(&self) -> i64 {
        self.steps.iter().map(|s| s.duration).sum()
    }

    /// Finds a step by ID.
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }
}

/// Validated, indexed precedence graph of one recipe.
///
/// Step indices are positions in [`Recipe::steps`] and stay stable, so the
/// same step can be referenced across every candidate machine.
#[derive(Debug, Clone)]
pub struct RecipeGraph {
    recipe: Recipe,
    index: HashMap<String, usize>,
    predecessors: Vec<Vec<usize>>,
    successors: Vec<Vec<usize>>,
    topological: Vec<usize>,
    paired: Vec<Option<usize>>,
}

impl RecipeGraph {
    /// Builds and checks the graph.
    ///
    /// Fails with [`ScheduleError::InvalidRecipe`] when the recipe is empty,
    /// has duplicate step IDs, references unknown steps in an edge, contains
    /// a cycle, or has a preheat whose paired step is missing from this
    /// recipe, is not a cook/fry step, or is already claimed by another
    /// preheat.
    pub fn build(recipe: &Recipe) -> Result<Self, ScheduleError> {
        let invalid = |reason: String| ScheduleError::invalid_recipe(&recipe.id, reason);

        if recipe.steps.is_empty() {
            return Err(invalid("recipe has no steps".into()));
        }

        let mut index = HashMap::with_capacity(recipe.steps.len());
        for (i, step) in recipe.steps.iter().enumerate() {
            if index.insert(step.id.clone(), i).is_some() {
                return Err(invalid(format!("duplicate step ID '{}'", step.id)));
            }
        }

        let n = recipe.steps.len();
        let mut predecessors = vec![Vec::new(); n];
        let mut successors = vec![Vec::new(); n];
        for (before, after) in &recipe.edges {
            let u = *index
                .get(before)
                .ok_or_else(|| invalid(format!("edge references unknown step '{before}'")))?;
            let v = *index
                .get(after)
                .ok_or_else(|| invalid(format!("edge references unknown step '{after}'")))?;
            if !successors[u].contains(&v) {
                successors[u].push(v);
                predecessors[v].push(u);
            }
        }

        let topological = topological_order(&predecessors, &successors).map_err(|node| {
            invalid(format!(
                "precedence cycle involving step '{}'",
                recipe.steps[node].id
            ))
        })?;

        let mut paired = vec![None; n];
        let mut claimed: HashMap<usize, usize> = HashMap::new();
        for (i, step) in recipe.steps.iter().enumerate() {
            let Some(target) = step.paired_step() else {
                continue;
            };
            let &j = index.get(target).ok_or_else(|| {
                invalid(format!(
                    "preheat '{}' references step '{target}' outside the recipe",
                    step.id
                ))
            })?;
            if !matches!(
                recipe.steps[j].kind,
                StepKind::OvenCook { .. } | StepKind::OvenFry { .. }
            ) {
                return Err(invalid(format!(
                    "preheat '{}' is paired with '{target}', which is not a cook or fry step",
                    step.id
                )));
            }
            if let Some(&other) = claimed.get(&j) {
                return Err(invalid(format!(
                    "step '{target}' is prepared by both '{}' and '{}'",
                    recipe.steps[other].id, step.id
                )));
            }
            if reaches(&successors, j, i) {
                return Err(invalid(format!(
                    "preheat '{}' runs after its paired step '{target}'",
                    step.id
                )));
            }
            claimed.insert(j, i);
            paired[i] = Some(j);
        }

        Ok(Self {
            recipe: recipe.clone(),
            index,
            predecessors,
            successors,
            topological,
            paired,
        })
    }

    /// The underlying recipe.
    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    /// Recipe ID.
    pub fn id(&self) -> &str {
        &self.recipe.id
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.recipe.steps.len()
    }

    /// Whether the recipe has no steps (never true for a built graph).
    pub fn is_empty(&self) -> bool {
        self.recipe.steps.is_empty()
    }

    /// Step at a stable index.
    pub fn step(&self, index: usize) -> &Step {
        &self.recipe.steps[index]
    }

    /// Stable index of a step ID.
    pub fn index_of(&self, step_id: &str) -> Option<usize> {
        self.index.get(step_id).copied()
    }

    /// Direct predecessors of a step.
    pub fn predecessors(&self, index: usize) -> &[usize] {
        &self.predecessors[index]
    }

    /// Direct successors of a step.
    pub fn successors(&self, index: usize) -> &[usize] {
        &self.successors[index]
    }

    /// Steps in a topological order.
    pub fn topological_order(&self) -> &[usize] {
        &self.topological
    }

    /// Steps with no outgoing edge.
    pub fn terminal_steps(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&i| self.successors[i].is_empty())
            .collect()
    }

    /// Whether a step has no outgoing edge.
    pub fn is_terminal(&self, index: usize) -> bool {
        self.successors[index].is_empty()
    }

    /// For a preheat, the index of the step it prepares.
    pub fn paired_step(&self, index: usize) -> Option<usize> {
        self.paired[index]
    }

    /// For a cook/fry step, the index of the preheat preparing it.
    pub fn preheat_of(&self, index: usize) -> Option<usize> {
        self.paired.iter().position(|p| *p == Some(index))
    }

    /// Longest chain of nominal durations ending anywhere in the recipe.
    pub fn critical_path(&self) -> i64 {
        let mut finish = vec![0i64; self.len()];
        for &v in &self.topological {
            let ready = self.predecessors[v]
                .iter()
                .map(|&u| finish[u])
                .max()
                .unwrap_or(0);
            finish[v] = ready + self.recipe.steps[v].duration;
        }
        finish.into_iter().max().unwrap_or(0)
    }
}

/// Whether `to` is reachable from `from` along successor edges.
fn reaches(successors: &[Vec<usize>], from: usize, to: usize) -> bool {
    let mut seen = vec![false; successors.len()];
    let mut stack = vec![from];
    while let Some(u) = stack.pop() {
        if u == to {
            return true;
        }
        if std::mem::replace(&mut seen[u], true) {
            continue;
        }
        stack.extend(successors[u].iter().copied());
    }
    false
}

/// Kahn's algorithm. On a cycle returns the lowest-index step left over.
fn topological_order(
    predecessors: &[Vec<usize>],
    successors: &[Vec<usize>],
) -> Result<Vec<usize>, usize> {
    let n = predecessors.len();
    let mut in_degree: Vec<usize> = predecessors.iter().map(Vec::len).collect();
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while let Some(u) = queue.pop_front() {
        order.push(u);
        for &v in &successors[u] {
            in_degree[v] -= 1;
            if in_degree[v] == 0 {
                queue.push_back(v);
            }
        }
    }

    if order.len() == n {
        Ok(order)
    } else {
        Err((0..n).find(|&i| in_degree[i] > 0).unwrap_or(0))
    }
}
