//! Reference properties per node kind.
//!
//! Each reference can be written in a short form (`input`) or a legacy long
//! form (`input-signal`). Both resolve through the same label table into one
//! canonical property (`input-signal-id`).

use lq_core::NodeKind;

/// How many labels a reference holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    One,
    Many,
}

/// What a reference resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The signal identity the referenced node produces.
    Signal,
    /// The position of the referenced scale among all scale blocks.
    ScaleIndex,
}

/// One reference property of a node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefSpec {
    pub short: &'static str,
    pub long: &'static str,
    pub canonical: &'static str,
    pub arity: Arity,
    pub target: Target,
}

const fn signal(short: &'static str, long: &'static str, canonical: &'static str) -> RefSpec {
    RefSpec {
        short,
        long,
        canonical,
        arity: Arity::One,
        target: Target::Signal,
    }
}

const TRANSFORM: &[RefSpec] = &[signal("input", "input-signal", "input-signal-id")];

const PID: &[RefSpec] = &[
    signal("setpoint", "setpoint-signal", "setpoint-signal-id"),
    signal("measurement", "measurement-signal", "measurement-signal-id"),
];

const MERGE: &[RefSpec] = &[RefSpec {
    short: "inputs",
    long: "input-signals",
    canonical: "input-signal-ids",
    arity: Arity::Many,
    target: Target::Signal,
}];

const FAULT_MONITOR: &[RefSpec] = &[
    signal("input", "monitored-signal", "input-signal-id"),
    RefSpec {
        short: "limp-target",
        long: "limp-target-scale",
        canonical: "limp-target-scale-id",
        arity: Arity::One,
        target: Target::ScaleIndex,
    },
];

const CYCLIC_OUTPUT: &[RefSpec] = &[signal("source", "source-signal", "source-signal-id")];

const VERIFIED_OUTPUT: &[RefSpec] = &[
    signal("command", "command-signal", "command-signal-id"),
    signal("verification", "verification-signal", "verification-signal-id"),
    signal("output", "output-signal", "output-signal-id"),
];

/// Reference properties a node kind understands.
pub fn ref_specs(kind: &NodeKind) -> &'static [RefSpec] {
    match kind {
        NodeKind::Scale | NodeKind::Remap => TRANSFORM,
        NodeKind::Pid => PID,
        NodeKind::Merge => MERGE,
        NodeKind::FaultMonitor => FAULT_MONITOR,
        NodeKind::CyclicOutput => CYCLIC_OUTPUT,
        NodeKind::VerifiedOutput => VERIFIED_OUTPUT,
        NodeKind::Engine
        | NodeKind::HwInput(_)
        | NodeKind::CanopenDevice
        | NodeKind::CanopenPdo(_)
        | NodeKind::CanopenMapping
        | NodeKind::Other(_) => &[],
    }
}
