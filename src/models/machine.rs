//! Machine (resource) model.
//!
//! Machines are the physical equipment and people that host recipe steps:
//! ovens, blast chillers, vacuum sealers and human operators. Each machine
//! has a kind and a capacity (how many steps it can host simultaneously).
//! Machines are immutable configuration, built once before scheduling.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 1.2

use serde::{Deserialize, Serialize};

/// A machine that can host recipe steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    /// Unique machine identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Machine classification and kind-specific capabilities.
    pub kind: MachineKind,
    /// Number of steps the machine can host simultaneously (≥ 1).
    pub capacity: i32,
}

/// Machine classification.
///
/// Ovens carry their temperature rating and whether they can fry; the
/// other kinds have no extra attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MachineKind {
    /// Combination oven (cooking, frying, preheating).
    Oven {
        /// Highest reachable temperature (°C).
        max_temperature: i64,
        /// Whether the oven supports frying.
        can_fry: bool,
    },
    /// Blast chiller.
    BlastChiller,
    /// Vacuum sealing machine.
    VacuumMachine,
    /// Kitchen staff.
    HumanOperator,
}

impl Machine {
    /// Creates a machine with capacity 1.
    pub fn new(id: impl Into<String>, kind: MachineKind) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            kind,
            capacity: 1,
        }
    }

    /// Creates an oven.
    pub fn oven(id: impl Into<String>, capacity: i32, max_temperature: i64, can_fry: bool) -> Self {
        Self::new(
            id,
            MachineKind::Oven {
                max_temperature,
                can_fry,
            },
        )
        .with_capacity(capacity)
    }

    /// Creates a blast chiller.
    pub fn blast_chiller(id: impl Into<String>, capacity: i32) -> Self {
        Self::new(id, MachineKind::BlastChiller).with_capacity(capacity)
    }

    /// Creates a vacuum machine.
    pub fn vacuum_machine(id: impl Into<String>, capacity: i32) -> Self {
        Self::new(id, MachineKind::VacuumMachine).with_capacity(capacity)
    }

    /// Creates a human operator.
    pub fn human(id: impl Into<String>) -> Self {
        Self::new(id, MachineKind::HumanOperator)
    }

    /// Sets the machine name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the capacity.
    pub fn with_capacity(mut self, capacity: i32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Whether this machine is an oven.
    #[inline]
    pub fn is_oven(&self) -> bool {
        matches!(self.kind, MachineKind::Oven { .. })
    }

    /// Oven temperature rating, if this is an oven.
    pub fn max_temperature(&self) -> Option<i64> {
        match self.kind {
            MachineKind::Oven {
                max_temperature, ..
            } => Some(max_temperature),
            _ => None,
        }
    }

    /// Whether this machine is an oven that can fry.
    pub fn can_fry(&self) -> bool {
        matches!(self.kind, MachineKind::Oven { can_fry: true, .. })
    }

    /// Short label used in reports.
    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            MachineKind::Oven { .. } => "Oven",
            MachineKind::BlastChiller => "Blast",
            MachineKind::VacuumMachine => "Vacuum",
            MachineKind::HumanOperator => "Chef",
        }
    }
}
