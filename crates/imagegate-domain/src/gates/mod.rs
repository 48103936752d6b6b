//! The closed set of gates and their triggers.
//!
//! Each [`Gate`] owns a static table of [`TriggerSpec`]s. [`GateRegistry`] flattens those tables
//! into a `(gate, trigger)` lookup once; the engine never dispatches on free-form strings beyond
//! that lookup.

use crate::model::{GateContext, RawFinding};
use imagegate_types::ids;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

mod dockerfile;
mod files;
mod image;
mod packages;
mod pkg_diff;
mod suid;
mod utils;

#[cfg(test)]
mod tests;

pub use utils::Params;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Gate {
    DockerfileCheck,
    PkgBlacklist,
    PkgDiff,
    SuidDiff,
    SuidCheck,
    FileCheck,
    ImageCheck,
}

impl Gate {
    pub const ALL: [Gate; 7] = [
        Gate::DockerfileCheck,
        Gate::PkgBlacklist,
        Gate::PkgDiff,
        Gate::SuidDiff,
        Gate::SuidCheck,
        Gate::FileCheck,
        Gate::ImageCheck,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Gate::DockerfileCheck => ids::GATE_DOCKERFILECHECK,
            Gate::PkgBlacklist => ids::GATE_PKGBLACKLIST,
            Gate::PkgDiff => ids::GATE_PKGDIFF,
            Gate::SuidDiff => ids::GATE_SUIDDIFF,
            Gate::SuidCheck => ids::GATE_SUIDCHECK,
            Gate::FileCheck => ids::GATE_FILECHECK,
            Gate::ImageCheck => ids::GATE_IMAGECHECK,
        }
    }

    pub fn parse(name: &str) -> Option<Gate> {
        Gate::ALL.into_iter().find(|g| g.name() == name)
    }

    pub fn triggers(self) -> &'static [TriggerSpec] {
        match self {
            Gate::DockerfileCheck => dockerfile::TRIGGERS,
            Gate::PkgBlacklist => packages::TRIGGERS,
            Gate::PkgDiff => pkg_diff::TRIGGERS,
            Gate::SuidDiff => suid::DIFF_TRIGGERS,
            Gate::SuidCheck => suid::CHECK_TRIGGERS,
            Gate::FileCheck => files::TRIGGERS,
            Gate::ImageCheck => image::TRIGGERS,
        }
    }
}

#[derive(Debug)]
pub struct ParamSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// Placeholder shown in policy templates.
    pub example: &'static str,
}

pub type TriggerFn = fn(&GateContext<'_>, &Params<'_>) -> Result<Vec<RawFinding>, TriggerError>;

#[derive(Debug)]
pub struct TriggerSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
    /// Compares against the base image; needs `GateContext::base`.
    pub needs_base: bool,
    pub eval: TriggerFn,
}

impl TriggerSpec {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TriggerError {
    #[error("invalid value '{value}' for parameter {param}: {reason}")]
    InvalidParam {
        param: String,
        value: String,
        reason: String,
    },

    #[error("base image report is not available")]
    MissingBase,
}

/// `(gate, trigger)` → spec lookup over every built-in gate.
#[derive(Debug)]
pub struct GateRegistry {
    entries: BTreeMap<&'static str, BTreeMap<&'static str, (Gate, &'static TriggerSpec)>>,
}

impl GateRegistry {
    pub fn new() -> Self {
        let mut entries: BTreeMap<&'static str, BTreeMap<_, _>> = BTreeMap::new();
        for gate in Gate::ALL {
            let triggers = entries.entry(gate.name()).or_default();
            for spec in gate.triggers() {
                triggers.insert(spec.name, (gate, spec));
            }
        }
        Self { entries }
    }

    /// The process-wide registry, built on first use.
    pub fn builtin() -> &'static GateRegistry {
        static REGISTRY: OnceLock<GateRegistry> = OnceLock::new();
        REGISTRY.get_or_init(GateRegistry::new)
    }

    pub fn lookup(&self, gate: &str, trigger: &str) -> Option<(Gate, &'static TriggerSpec)> {
        self.entries.get(gate)?.get(trigger).copied()
    }

    pub fn has_gate(&self, gate: &str) -> bool {
        self.entries.contains_key(gate)
    }

    /// Entries in `(gate, trigger)` name order.
    pub fn iter(&self) -> impl Iterator<Item = (Gate, &'static TriggerSpec)> + '_ {
        self.entries.values().flat_map(|t| t.values().copied())
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for GateRegistry {
    fn default() -> Self {
        Self::new()
    }
}
