//! Makespan optimizer over a [`ScheduleModel`].
//!
//! # Algorithm
//!
//! Depth-first branch and bound over chronological placements in two
//! phases.
//!
//! **Dives.** A few seeded randomized dives look for incumbents. They
//! branch on event times only: the earliest start allowed by the
//! predecessors and the end times of intervals already on the machine. A
//! preheat is placed in the same move as its paired step, anchored either
//! on the preheat side (earliest start, or an end time on the oven where
//! it can reuse heat) or on the paired side, so a preheat can be delayed
//! to meet a paired step that waits for other inputs.
//!
//! **Exhaustive pass.** Every interval, preheats included, is placed on
//! its own in (start, step index) order, so each schedule is reached
//! through exactly one sequence. When a preheat is placed, everything
//! that can end before it is already placed, so its reheat duration is
//! final. Oven steps try every integer start up to the cutoff, since
//! delaying one can line its end up with a later preheat. A step that
//! cannot touch a preheat duration (off the ovens, or on an oven with no
//! preheat left to place) only starts when it becomes ready or when an
//! interval on its machine ends: any schedule can be shifted left until
//! that holds without losing feasibility or makespan.
//!
//! A node is pruned when its lower bound (critical path with minimal
//! durations, and remaining load per single-machine step) reaches the
//! incumbent. The exhaustive pass proves optimality, or infeasibility,
//! when it finishes within the budget.
//!
//! # Reference
//! - Brucker (2007), "Scheduling Algorithms", Ch. 6 (branch and bound for job shops)
//! - Baptiste et al. (2001), "Constraint-Based Scheduling", Ch. 3

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::model::{ModelAssignment, ModelConstraint, ScheduleModel};
use crate::models::SolveStatus;
use crate::thermal::{OvenActivity, ReheatRule};

/// Nodes explored per randomized dive before giving up on it.
const DIVE_NODE_LIMIT: u64 = 20_000;

/// How often (in nodes) the wall clock is consulted.
const CLOCK_CHECK_INTERVAL: u64 = 256;

/// Optimizer budget and randomization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Wall-clock limit in milliseconds.
    pub time_limit_ms: Option<u64>,
    /// Limit on explored search nodes.
    pub node_limit: Option<u64>,
    /// Seed for the randomized dives.
    pub seed: u64,
    /// Number of randomized dives before the exhaustive pass.
    pub restarts: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: None,
            node_limit: Some(5_000_000),
            seed: 42,
            restarts: 8,
        }
    }
}

impl SolverConfig {
    /// Sets the wall-clock limit.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_ms = Some(limit.as_millis() as u64);
        self
    }

    /// Sets the node limit (`None` for unlimited).
    pub fn with_node_limit(mut self, limit: Option<u64>) -> Self {
        self.node_limit = limit;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the number of randomized dives.
    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts;
        self
    }
}

/// Result of an optimizer run.
#[derive(Debug, Clone)]
pub struct CpSolution {
    /// Solve status.
    pub status: SolveStatus,
    /// Best assignment found, present iff the status has a solution.
    pub assignment: Option<ModelAssignment>,
    /// Makespan of `assignment`.
    pub makespan: Option<i64>,
    /// Lower bound on the makespan of any feasible assignment.
    pub lower_bound: i64,
    /// Explored search nodes.
    pub nodes: u64,
    /// Wall-clock time spent.
    pub elapsed: Duration,
}

impl CpSolution {
    fn without_assignment(
        status: SolveStatus,
        lower_bound: i64,
        nodes: u64,
        elapsed: Duration,
    ) -> Self {
        Self {
            status,
            assignment: None,
            makespan: None,
            lower_bound,
            nodes,
            elapsed,
        }
    }

    /// Whether an assignment is available.
    pub fn is_solution_found(&self) -> bool {
        self.assignment.is_some()
    }
}

/// A makespan optimizer for schedule models.
pub trait CpSolver {
    /// Solves the model within the configured budget.
    fn solve(&self, model: &ScheduleModel, config: &SolverConfig) -> CpSolution;
}

/// Chronological branch and bound with randomized warm-up dives.
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchAndBoundSolver;

impl BranchAndBoundSolver {
    /// Creates the solver.
    pub fn new() -> Self {
        Self
    }
}

impl CpSolver for BranchAndBoundSolver {
    fn solve(&self, model: &ScheduleModel, config: &SolverConfig) -> CpSolution {
        let started = Instant::now();
        let compiled = Compiled::from_model(model);

        let Some(compiled) = compiled else {
            info!("precedence graph of the model is cyclic");
            return CpSolution::without_assignment(
                SolveStatus::Infeasible,
                0,
                0,
                started.elapsed(),
            );
        };

        let mut search = Search::new(model, compiled, config, started);
        let lower_bound = search.bound();
        search.lower_bound = lower_bound;
        debug!(
            steps = model.step_count(),
            candidates = model.candidate_count(),
            lower_bound,
            "starting branch and bound"
        );

        let mut rng = StdRng::seed_from_u64(config.seed);
        for dive in 0..config.restarts {
            if search.proven || search.aborted {
                break;
            }
            search.dive_key = Some(rng.random());
            search.dive_limit = Some(search.nodes + DIVE_NODE_LIMIT);
            search.descend();
            debug!(dive, best = ?search.best_makespan(), nodes = search.nodes, "dive finished");
        }
        search.dive_key = None;
        search.dive_limit = None;

        if !search.proven && !search.aborted {
            search.exact = true;
            search.descend();
        }

        let status = match (&search.best, search.aborted && !search.proven) {
            (Some(_), false) => SolveStatus::Optimal,
            (Some(_), true) => SolveStatus::Feasible,
            (None, false) => SolveStatus::Infeasible,
            (None, true) => SolveStatus::TimeoutNoSolution,
        };

        let elapsed = started.elapsed();
        let nodes = search.nodes;
        let solution = match search.best.take() {
            Some((makespan, placements)) => CpSolution {
                status,
                assignment: Some(to_assignment(model, &placements)),
                makespan: Some(makespan),
                lower_bound,
                nodes,
                elapsed,
            },
            None => CpSolution::without_assignment(status, lower_bound, nodes, elapsed),
        };

        info!(
            status = %solution.status,
            makespan = ?solution.makespan,
            lower_bound,
            nodes,
            elapsed_ms = elapsed.as_millis() as u64,
            "branch and bound finished"
        );
        solution
    }
}

fn to_assignment(model: &ScheduleModel, placements: &[Option<Placement>]) -> ModelAssignment {
    let mut assignment = ModelAssignment::inactive(model.candidate_count());
    for p in placements.iter().flatten() {
        assignment.activate(p.candidate, p.start, p.duration);
    }
    assignment
}

/// Constraint list compiled into per-step and per-candidate lookups.
struct Compiled {
    /// Candidate may become active.
    live: Vec<bool>,
    /// Preheat candidate -> (paired candidate, max gap).
    link: Vec<Option<(usize, i64)>>,
    /// Paired step -> its preheat step.
    preheat_of: Vec<Option<usize>>,
    /// Candidates that must not overlap each candidate.
    exclusions: Vec<Vec<usize>>,
    /// Capacity per machine.
    capacity: Vec<i32>,
    preds: Vec<Vec<usize>>,
    topo: Vec<usize>,
    min_duration: Vec<i64>,
    /// Shortest time from a step's start to the end of its recipe.
    tail: Vec<i64>,
    /// Preheat steps.
    thermal: Vec<bool>,
    /// The one machine a step can run on, if unique.
    sole_machine: Vec<Option<usize>>,
}

impl Compiled {
    /// `None` if the precedence graph has a cycle.
    fn from_model(model: &ScheduleModel) -> Option<Self> {
        let n = model.step_count();
        let nc = model.candidate_count();
        let mut live = vec![true; nc];
        let mut link = vec![None; nc];
        let mut preheat_of = vec![None; n];
        let mut exclusions = vec![Vec::new(); nc];
        let mut capacity: Vec<i32> = model.machines.iter().map(|m| m.capacity).collect();
        let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut min_duration: Vec<i64> = model.steps.iter().map(|s| s.nominal).collect();
        let mut thermal = vec![false; n];

        for constraint in &model.constraints {
            match constraint {
                ModelConstraint::ForcedInactive { candidate, .. } => live[*candidate] = false,
                ModelConstraint::PreheatLink {
                    preheat,
                    paired,
                    max_gap,
                } => {
                    link[*preheat] = Some((*paired, *max_gap));
                    let paired_step = model.candidates[*paired].step;
                    preheat_of[paired_step] = Some(model.candidates[*preheat].step);
                }
                ModelConstraint::NoOverlap { first, second, .. } => {
                    exclusions[*first].push(*second);
                    exclusions[*second].push(*first);
                }
                ModelConstraint::Cumulative {
                    machine, capacity: cap, ..
                } => capacity[*machine] = *cap,
                ModelConstraint::Precedence { before, after } => {
                    if !preds[*after].contains(before) {
                        preds[*after].push(*before);
                    }
                }
                ModelConstraint::DurationIdentity { step, min, .. } => {
                    min_duration[*step] = (*min).max(1);
                }
                ModelConstraint::ThermalDuration { step } => thermal[*step] = true,
                ModelConstraint::Consistency { .. } | ModelConstraint::ExactlyOne { .. } => {}
            }
        }

        let topo = topological_order(&preds)?;

        let mut tail = min_duration.clone();
        for &v in topo.iter().rev() {
            for &u in &preds[v] {
                tail[u] = tail[u].max(min_duration[u] + tail[v]);
            }
        }

        let sole_machine = model
            .steps
            .iter()
            .map(|step| {
                let mut machines = step
                    .candidates
                    .clone()
                    .filter(|&c| live[c])
                    .map(|c| model.candidates[c].machine);
                let first = machines.next()?;
                machines.all(|m| m == first).then_some(first)
            })
            .collect();

        Some(Self {
            live,
            link,
            preheat_of,
            exclusions,
            capacity,
            preds,
            topo,
            min_duration,
            tail,
            thermal,
            sole_machine,
        })
    }
}

fn topological_order(preds: &[Vec<usize>]) -> Option<Vec<usize>> {
    let n = preds.len();
    let mut succs = vec![Vec::new(); n];
    let mut indegree = vec![0usize; n];
    for (v, ps) in preds.iter().enumerate() {
        indegree[v] = ps.len();
        for &u in ps {
            succs[u].push(v);
        }
    }
    let mut ready: Vec<usize> = (0..n).filter(|&v| indegree[v] == 0).rev().collect();
    let mut order = Vec::with_capacity(n);
    while let Some(u) = ready.pop() {
        order.push(u);
        for &v in &succs[u] {
            indegree[v] -= 1;
            if indegree[v] == 0 {
                ready.push(v);
            }
        }
    }
    (order.len() == n).then_some(order)
}

#[derive(Debug, Clone, Copy)]
struct Placement {
    candidate: usize,
    start: i64,
    duration: i64,
}

impl Placement {
    #[inline]
    fn end(&self) -> i64 {
        self.start + self.duration
    }
}

/// One branching decision: a step, optionally with its preheat.
///
/// The preheat may start before the last placed start; everything else
/// is chronological.
#[derive(Debug, Clone, Copy)]
struct Move {
    step: usize,
    placement: Placement,
    preheat: Option<(usize, Placement)>,
    /// Random tie-break key during dives.
    key: u64,
}

impl Move {
    fn single(step: usize, placement: Placement) -> Self {
        Self {
            step,
            placement,
            preheat: None,
            key: 0,
        }
    }
}

struct Search<'m> {
    model: &'m ScheduleModel,
    c: Compiled,
    placed: Vec<Option<Placement>>,
    on_machine: Vec<Vec<usize>>,
    placed_count: usize,
    last_start: i64,
    last_step: Option<usize>,
    /// Whether the last move placed a preheat with its paired step.
    last_linked: bool,
    best: Option<(i64, Vec<Option<Placement>>)>,
    lower_bound: i64,
    nodes: u64,
    node_limit: Option<u64>,
    deadline: Option<Instant>,
    /// Seed of the current dive; `None` in the exhaustive pass.
    dive_key: Option<u64>,
    dive_limit: Option<u64>,
    /// One interval per move, every start; set for the exhaustive pass.
    exact: bool,
    proven: bool,
    aborted: bool,
}

impl<'m> Search<'m> {
    fn new(
        model: &'m ScheduleModel,
        c: Compiled,
        config: &SolverConfig,
        started: Instant,
    ) -> Self {
        let n = model.step_count();
        Self {
            model,
            c,
            placed: vec![None; n],
            on_machine: vec![Vec::new(); model.machines.len()],
            placed_count: 0,
            last_start: 0,
            last_step: None,
            last_linked: false,
            best: None,
            lower_bound: 0,
            nodes: 0,
            node_limit: config.node_limit,
            deadline: config
                .time_limit_ms
                .map(|ms| started + Duration::from_millis(ms)),
            dive_key: None,
            dive_limit: None,
            exact: false,
            proven: false,
            aborted: false,
        }
    }

    fn best_makespan(&self) -> Option<i64> {
        self.best.as_ref().map(|(m, _)| *m)
    }

    fn out_of_budget(&mut self) -> bool {
        if self.node_limit.is_some_and(|limit| self.nodes >= limit) {
            self.aborted = true;
        }
        if let Some(deadline) = self.deadline {
            if self.nodes % CLOCK_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
                self.aborted = true;
            }
        }
        self.aborted || self.dive_limit.is_some_and(|limit| self.nodes >= limit)
    }

    /// Returns `false` when the search must stop.
    fn descend(&mut self) -> bool {
        if self.out_of_budget() {
            return false;
        }
        self.nodes += 1;

        if self.placed_count == self.placed.len() {
            let makespan = self.leaf_makespan();
            if self.best_makespan().map_or(true, |best| makespan < best) {
                debug!(makespan, nodes = self.nodes, "improved incumbent");
                self.best = Some((makespan, self.placed.clone()));
            }
            if makespan <= self.lower_bound {
                self.proven = true;
                return false;
            }
            // A dive ends at its first leaf.
            return self.dive_key.is_none();
        }

        if let Some(best) = self.best_makespan() {
            if self.bound() >= best {
                return true;
            }
        }

        let mut moves = if self.exact {
            self.exact_moves()
        } else {
            self.moves()
        };
        match self.dive_key {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed ^ self.nodes);
                for mv in &mut moves {
                    mv.key = rng.random();
                }
                moves.sort_by_key(|mv| (mv.placement.start, mv.key));
            }
            None => moves.sort_by_key(|mv| {
                (
                    mv.placement.start,
                    mv.placement.candidate,
                    mv.preheat.map(|(_, p)| p.start),
                )
            }),
        }

        for mv in moves {
            let saved = self.apply(mv);
            let go_on = self.descend();
            self.undo(mv, saved);
            if !go_on {
                return false;
            }
        }
        true
    }

    fn leaf_makespan(&self) -> i64 {
        self.model
            .steps
            .iter()
            .zip(&self.placed)
            .filter(|(step, _)| step.terminal)
            .filter_map(|(_, p)| p.map(|p| p.end()))
            .max()
            .unwrap_or(0)
    }

    fn machine_of(&self, candidate: usize) -> usize {
        self.model.candidates[candidate].machine
    }

    fn place(&mut self, step: usize, placement: Placement) {
        let machine = self.machine_of(placement.candidate);
        self.placed[step] = Some(placement);
        self.on_machine[machine].push(step);
        self.placed_count += 1;
    }

    fn unplace(&mut self, step: usize, placement: Placement) {
        let machine = self.machine_of(placement.candidate);
        self.placed[step] = None;
        self.on_machine[machine].retain(|&s| s != step);
        self.placed_count -= 1;
    }

    fn apply(&mut self, mv: Move) -> (i64, Option<usize>, bool) {
        let saved = (self.last_start, self.last_step, self.last_linked);
        if let Some((step, placement)) = mv.preheat {
            self.place(step, placement);
        }
        self.place(mv.step, mv.placement);
        self.last_start = mv.placement.start;
        self.last_step = Some(mv.step);
        self.last_linked = mv.preheat.is_some();
        saved
    }

    fn undo(&mut self, mv: Move, saved: (i64, Option<usize>, bool)) {
        self.unplace(mv.step, mv.placement);
        if let Some((step, placement)) = mv.preheat {
            self.unplace(step, placement);
        }
        (self.last_start, self.last_step, self.last_linked) = saved;
    }

    /// Latest end among placed predecessors, or `None` if one is unplaced.
    fn ready_time(&self, step: usize, skip: Option<usize>) -> Option<i64> {
        let mut ready = 0;
        for &p in &self.c.preds[step] {
            if Some(p) == skip {
                continue;
            }
            ready = ready.max(self.placed[p]?.end());
        }
        Some(ready)
    }

    /// Distinct end times of placed intervals on a machine.
    fn machine_ends(&self, machine: usize) -> Vec<i64> {
        let mut ends: Vec<i64> = self.on_machine[machine]
            .iter()
            .filter_map(|&o| self.placed[o].map(|p| p.end()))
            .collect();
        ends.sort_unstable();
        ends.dedup();
        ends
    }

    /// All feasible moves of ready steps at or after the last start.
    fn moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        for s in 0..self.placed.len() {
            if self.placed[s].is_some() || self.c.thermal[s] {
                continue;
            }
            if let Some(pre) = self.c.preheat_of[s] {
                self.linked_moves(s, pre, &mut moves);
                continue;
            }
            let Some(ready) = self.ready_time(s, None) else {
                continue;
            };
            let earliest = ready.max(self.last_start);
            let nominal = self.model.steps[s].nominal;

            for candidate in self.model.steps[s].candidates.clone() {
                if !self.c.live[candidate] {
                    continue;
                }
                let starts = std::iter::once(earliest).chain(
                    self.machine_ends(self.machine_of(candidate))
                        .into_iter()
                        .filter(|&e| e > earliest),
                );
                for start in starts {
                    let placement = Placement {
                        candidate,
                        start,
                        duration: nominal,
                    };
                    if self.feasible(s, placement, false) {
                        moves.push(Move::single(s, placement));
                    }
                }
            }
        }
        moves
    }

    /// Every placement of one ready step, for the exhaustive pass.
    fn exact_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        let Some(latest) = self.latest_start() else {
            return moves;
        };

        for s in 0..self.placed.len() {
            if self.placed[s].is_some() {
                continue;
            }
            let Some(ready) = self.ready_time(s, None) else {
                continue;
            };
            let earliest = ready.max(self.last_start);
            if earliest > latest {
                continue;
            }
            // A paired step must use the candidate linked to its preheat.
            let linked = match self.c.preheat_of[s] {
                Some(pre) => match self.placed[pre].and_then(|p| self.c.link[p.candidate]) {
                    Some((paired, _)) => Some(paired),
                    None => continue,
                },
                None => None,
            };
            let nominal = self.model.steps[s].nominal;

            for candidate in self.model.steps[s].candidates.clone() {
                if !self.c.live[candidate] || linked.is_some_and(|c| c != candidate) {
                    continue;
                }
                if self.c.thermal[s] && self.c.link[candidate].is_none() {
                    continue;
                }
                let machine = self.machine_of(candidate);
                let starts: Vec<i64> = if self.left_justified(s, machine) {
                    std::iter::once(earliest)
                        .chain(
                            self.machine_ends(machine)
                                .into_iter()
                                .filter(|&e| e > earliest && e <= latest),
                        )
                        .collect()
                } else {
                    (earliest..=latest).collect()
                };
                for start in starts {
                    let duration = if self.c.thermal[s] {
                        self.preheat_duration(s, machine, start, None)
                    } else {
                        nominal
                    };
                    let placement = Placement {
                        candidate,
                        start,
                        duration,
                    };
                    if self.feasible(s, placement, false) {
                        moves.push(Move::single(s, placement));
                    }
                }
            }
        }
        moves
    }

    /// Latest start of the next placement in the exhaustive pass, or `None`
    /// when no completion can beat the incumbent.
    fn latest_start(&self) -> Option<i64> {
        let mut latest = self.model.horizon;
        // A placed preheat whose paired step is pending closes the window.
        for (pre, placed) in self.placed.iter().enumerate() {
            let Some(p) = placed else {
                continue;
            };
            if !self.c.thermal[pre] {
                continue;
            }
            if let Some((paired, gap)) = self.c.link[p.candidate] {
                if self.placed[self.model.candidates[paired].step].is_none() {
                    latest = latest.min(p.end() + gap);
                }
            }
        }
        // Every pending step starts at or after the next placement.
        if let Some(best) = self.best_makespan() {
            let reach = (0..self.placed.len())
                .filter(|&s| self.placed[s].is_none())
                .map(|s| self.c.tail[s])
                .max()
                .unwrap_or(0);
            latest = latest.min(best - 1 - reach);
        }
        (latest >= self.last_start).then_some(latest)
    }

    /// Whether `step` on `machine` only needs to start when it becomes
    /// ready or when an interval on the machine ends.
    ///
    /// Holds unless the step's end can decide the duration of a preheat on
    /// the same oven that starts at or after the last placement.
    fn left_justified(&self, step: usize, machine: usize) -> bool {
        if self.c.thermal[step] {
            return false;
        }
        if !self.model.machines[machine].is_oven()
            || self.model.policy.reheat == ReheatRule::Disabled
        {
            return true;
        }
        !(0..self.placed.len()).any(|q| {
            self.c.thermal[q]
                && match self.placed[q] {
                    Some(p) => {
                        self.machine_of(p.candidate) == machine && p.start >= self.last_start
                    }
                    None => self.model.steps[q].candidates.clone().any(|c| {
                        self.c.live[c] && self.c.link[c].is_some() && self.machine_of(c) == machine
                    }),
                }
        })
    }

    /// Moves placing `step` together with its preheat `pre`.
    ///
    /// The pair is anchored either by the preheat (earliest start or an end
    /// time on the oven) or by the paired step (earliest start or an end
    /// time on the oven, with the preheat finishing just before it).
    fn linked_moves(&self, step: usize, pre: usize, moves: &mut Vec<Move>) {
        let Some(pre_ready) = self.ready_time(pre, None) else {
            return;
        };
        let Some(ready) = self.ready_time(step, Some(pre)) else {
            return;
        };
        let earliest = ready.max(self.last_start);
        let pre_nominal = self.model.steps[pre].nominal;
        let nominal = self.model.steps[step].nominal;

        for pre_candidate in self.model.steps[pre].candidates.clone() {
            if !self.c.live[pre_candidate] {
                continue;
            }
            let Some((candidate, gap)) = self.c.link[pre_candidate] else {
                continue;
            };
            let machine = self.machine_of(pre_candidate);
            let ends = self.machine_ends(machine);

            // (preheat start, preheat duration, paired start)
            let mut options: Vec<(i64, i64, i64)> = Vec::new();
            let pre_anchors = ends.iter().copied().filter(|&e| e >= pre_ready);
            for ps in std::iter::once(pre_ready).chain(pre_anchors) {
                let d = self.preheat_duration(pre, machine, ps, None);
                options.extend((0..=gap).map(|g| (ps, d, ps + d + g)));
            }
            let anchors = ends.iter().copied().filter(|&e| e > earliest);
            for start in std::iter::once(earliest).chain(anchors) {
                for g in 0..=gap {
                    let ps = start - g - pre_nominal;
                    if ps >= pre_ready
                        && self.preheat_duration(pre, machine, ps, None) == pre_nominal
                    {
                        options.push((ps, pre_nominal, start));
                    }
                }
            }
            options.sort_unstable();
            options.dedup();

            for (ps, d, start) in options {
                if start < earliest || ps < pre_ready {
                    continue;
                }
                let preheat = Placement {
                    candidate: pre_candidate,
                    start: ps,
                    duration: d,
                };
                let placement = Placement {
                    candidate,
                    start,
                    duration: nominal,
                };
                if self.preheat_fits(pre, preheat) && self.feasible(step, placement, true) {
                    moves.push(Move {
                        step,
                        placement,
                        preheat: Some((pre, preheat)),
                        key: 0,
                    });
                }
            }
        }
    }

    /// Reheat-rule duration of a preheat at `start`, given the placed
    /// activities on the oven plus an optional extra one.
    fn preheat_duration(
        &self,
        step: usize,
        machine: usize,
        start: i64,
        extra: Option<OvenActivity>,
    ) -> i64 {
        let model_step = &self.model.steps[step];
        let prior = self.on_machine[machine]
            .iter()
            .filter(|&&o| o != step)
            .filter_map(|&o| {
                self.placed[o].map(|p| OvenActivity {
                    temperature: self.model.steps[o].temperature().unwrap_or_default(),
                    end: p.end(),
                    order: o,
                })
            })
            .chain(extra);
        self.model.policy.reheat.effective_duration(
            model_step.nominal,
            model_step.temperature().unwrap_or_default(),
            start,
            prior,
        )
    }

    fn overlaps_exclusion(&self, placement: Placement) -> bool {
        let end = placement.end();
        self.c.exclusions[placement.candidate].iter().any(|&x| {
            let other = self.model.candidates[x].step;
            self.placed[other]
                .is_some_and(|p| p.candidate == x && p.start < end && placement.start < p.end())
        })
    }

    /// Chronological placement check.
    ///
    /// `linked` marks a paired step placed together with its preheat.
    fn feasible(&self, step: usize, placement: Placement, linked: bool) -> bool {
        let start = placement.start;
        // Canonical order among equal starts. During dives it only binds
        // steps that were ready before the last move, and never two linked
        // moves, which may create each other's start times.
        if start == self.last_start
            && self.last_step.is_some_and(|last| step < last)
            && (self.exact
                || !(self.released_by_last_move(step) || (linked && self.last_linked)))
        {
            return false;
        }
        if placement.end() > self.model.horizon {
            return false;
        }

        let machine = self.machine_of(placement.candidate);
        let load = self.on_machine[machine]
            .iter()
            .filter(|&&o| self.placed[o].is_some_and(|p| p.end() > start))
            .count();
        if load as i64 >= self.c.capacity[machine] as i64 {
            return false;
        }

        !self.overlaps_exclusion(placement)
    }

    /// Whether a predecessor of `step` was placed by the last move.
    fn released_by_last_move(&self, step: usize) -> bool {
        let Some(last) = self.last_step else {
            return false;
        };
        let preheat = self.c.preheat_of[last];
        self.c.preds[step]
            .iter()
            .any(|&p| p == last || Some(p) == preheat)
    }

    /// Placement check for a preheat that may start before the last start.
    fn preheat_fits(&self, step: usize, preheat: Placement) -> bool {
        let (start, end) = (preheat.start, preheat.end());
        if start < 0 || end > self.model.horizon {
            return false;
        }
        let machine = self.machine_of(preheat.candidate);

        let mut events: Vec<(i64, i32)> = self.on_machine[machine]
            .iter()
            .filter_map(|&o| self.placed[o])
            .filter(|p| p.start < end && start < p.end())
            .flat_map(|p| [(p.start.max(start), 1), (p.end(), -1)])
            .collect();
        events.sort_unstable();
        let mut load = 0;
        for (_, delta) in events {
            load += delta;
            if load + 1 > self.c.capacity[machine] {
                return false;
            }
        }

        if self.overlaps_exclusion(preheat) {
            return false;
        }

        // Placed preheats after this one keep their reheat duration.
        let activity = OvenActivity {
            temperature: self.model.steps[step].temperature().unwrap_or_default(),
            end,
            order: step,
        };
        self.on_machine[machine].iter().all(|&o| {
            match self.placed[o] {
                Some(p) if self.c.thermal[o] && p.start >= end => {
                    self.preheat_duration(o, machine, p.start, Some(activity)) == p.duration
                }
                _ => true,
            }
        })
    }

    /// Lower bound on the makespan of any completion of the current node.
    fn bound(&self) -> i64 {
        let n = self.placed.len();
        let mut bound = self
            .placed
            .iter()
            .flatten()
            .map(|p| p.end())
            .max()
            .unwrap_or(0);

        let mut finish = vec![0i64; n];
        for &s in &self.c.topo {
            if let Some(p) = self.placed[s] {
                finish[s] = p.end();
                continue;
            }
            // During dives preheats can still slot in before the last start.
            let floor = if self.c.thermal[s] && !self.exact {
                0
            } else {
                self.last_start
            };
            let est = self.c.preds[s]
                .iter()
                .map(|&p| finish[p])
                .fold(floor, i64::max);
            finish[s] = est + self.c.min_duration[s];
            bound = bound.max(finish[s]);
        }

        let mut load = vec![0i64; self.model.machines.len()];
        for s in 0..n {
            if self.placed[s].is_none() && (self.exact || !self.c.thermal[s]) {
                if let Some(m) = self.c.sole_machine[s] {
                    load[m] += self.c.min_duration[s];
                }
            }
        }
        for (m, &work) in load.iter().enumerate() {
            if work == 0 {
                continue;
            }
            let capacity = self.c.capacity[m] as i64;
            let base = if capacity == 1 {
                self.on_machine[m]
                    .iter()
                    .filter_map(|&o| self.placed[o].map(|p| p.end()))
                    .fold(self.last_start, i64::max)
            } else {
                self.last_start
            };
            bound = bound.max(base + (work + capacity - 1) / capacity);
        }
        bound
    }
}
