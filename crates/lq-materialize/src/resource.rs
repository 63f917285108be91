//! Exact static sizing of the generated engine.
//!
//! Every figure is an exact count over the resolved topology, never a
//! conservative estimate: the engine's fixed arrays are sized to the real
//! topology. The `LQ_MAX_*` array bounds are the counts raised to at least 1.

use std::fmt;

use log::{debug, warn};
use serde::Serialize;

use lq_core::Topology;

/// Ring-buffer depth used when no engine node overrides it.
pub const DEFAULT_RING_BUFFER_DEPTH: u32 = 64;

/// Lower bound on the output-event queue.
pub const MIN_OUTPUT_EVENTS: usize = 16;

/// Static bounds for one topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResourceCounts {
    /// One past the largest signal identity.
    pub signals: u32,
    pub hw_inputs: usize,
    pub scales: usize,
    pub remaps: usize,
    pub merges: usize,
    pub fault_monitors: usize,
    pub cyclic_outputs: usize,
    pub pids: usize,
    pub verified_outputs: usize,
    /// Largest input list of any merge block.
    pub max_merge_inputs: usize,
    /// Twice the cyclic outputs, at least [`MIN_OUTPUT_EVENTS`].
    pub max_output_events: usize,
    pub ring_buffer_depth: u32,
}

impl ResourceCounts {
    /// `(macro, value)` pairs in header order: the exact `LQ_NUM_*` counts,
    /// then the `LQ_MAX_*` array bounds.
    ///
    /// C has no zero-length arrays, so a bound whose count is zero is 1.
    pub fn macros(&self) -> Vec<(&'static str, u64)> {
        let bound = |n: u64| n.max(1);
        let mut macros = vec![
            ("LQ_NUM_SIGNALS", u64::from(self.signals)),
            ("LQ_NUM_HW_INPUTS", self.hw_inputs as u64),
            ("LQ_NUM_SCALES", self.scales as u64),
            ("LQ_NUM_REMAPS", self.remaps as u64),
            ("LQ_NUM_MERGES", self.merges as u64),
            ("LQ_NUM_FAULT_MONITORS", self.fault_monitors as u64),
            ("LQ_NUM_CYCLIC_OUTPUTS", self.cyclic_outputs as u64),
            ("LQ_NUM_PIDS", self.pids as u64),
            ("LQ_NUM_VERIFIED_OUTPUTS", self.verified_outputs as u64),
        ];
        macros.extend([
            ("LQ_MAX_SIGNALS", bound(u64::from(self.signals))),
            ("LQ_MAX_SCALES", bound(self.scales as u64)),
            ("LQ_MAX_REMAPS", bound(self.remaps as u64)),
            ("LQ_MAX_MERGES", bound(self.merges as u64)),
            ("LQ_MAX_FAULT_MONITORS", bound(self.fault_monitors as u64)),
            ("LQ_MAX_CYCLIC_OUTPUTS", bound(self.cyclic_outputs as u64)),
            ("LQ_MAX_PIDS", bound(self.pids as u64)),
            ("LQ_MAX_VERIFIED_OUTPUTS", bound(self.verified_outputs as u64)),
            ("LQ_MAX_MERGE_INPUTS", bound(self.max_merge_inputs as u64)),
            ("LQ_MAX_OUTPUT_EVENTS", bound(self.max_output_events as u64)),
            ("LQ_HW_RINGBUFFER_SIZE", bound(u64::from(self.ring_buffer_depth))),
        ]);
        macros
    }

    /// Value of one macro from [`ResourceCounts::macros`].
    pub fn macro_value(&self, name: &str) -> Option<u64> {
        self.macros()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }
}

impl fmt::Display for ResourceCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Resource Counts ===")?;
        writeln!(f, "  Signals:          {}", self.signals)?;
        writeln!(f, "  Hardware inputs:  {}", self.hw_inputs)?;
        writeln!(f, "  Scales:           {}", self.scales)?;
        writeln!(f, "  Remaps:           {}", self.remaps)?;
        writeln!(
            f,
            "  Merges:           {} (max fan-in {})",
            self.merges, self.max_merge_inputs
        )?;
        writeln!(f, "  Fault monitors:   {}", self.fault_monitors)?;
        writeln!(f, "  PID controllers:  {}", self.pids)?;
        writeln!(f, "  Verified outputs: {}", self.verified_outputs)?;
        writeln!(f, "  Cyclic outputs:   {}", self.cyclic_outputs)?;
        writeln!(f, "  Output events:    {}", self.max_output_events)?;
        writeln!(f, "  Ring buffer:      {}", self.ring_buffer_depth)?;
        Ok(())
    }
}

/// Compute the bounds of a resolved topology.
///
/// `default_ring_depth` applies when the topology has no engine node with
/// `ring-buffer-depth`.
pub fn analyze(topology: &Topology, default_ring_depth: u32) -> ResourceCounts {
    let merges = topology.merges();
    let max_merge_inputs = merges
        .iter()
        .map(|m| m.signal_refs("input-signal-ids").len())
        .max()
        .unwrap_or(0);
    let cyclic_outputs = topology.cyclic_outputs().len();

    let engine = topology.engine();
    let ring_buffer_depth = engine
        .and_then(|e| e.int("ring-buffer-depth"))
        .and_then(|d| u32::try_from(d).ok())
        .filter(|d| *d > 0)
        .unwrap_or(default_ring_depth);

    let counts = ResourceCounts {
        signals: topology.signal_count(),
        hw_inputs: topology.hw_inputs().len(),
        scales: topology.scales().len(),
        remaps: topology.remaps().len(),
        merges: merges.len(),
        fault_monitors: topology.fault_monitors().len(),
        cyclic_outputs,
        pids: topology.pids().len(),
        verified_outputs: topology.verified_outputs().len(),
        max_merge_inputs,
        max_output_events: (2 * cyclic_outputs).max(MIN_OUTPUT_EVENTS),
        ring_buffer_depth,
    };

    if let Some(declared) = engine.and_then(|e| e.int("max-signals")) {
        if declared < i64::from(counts.signals) {
            warn!(
                "engine declares max-signals = {declared} but the topology uses {} signal(s)",
                counts.signals
            );
        }
    }
    debug!(
        "resources: {} signal(s), {} input(s), {} merge(s), {} output(s)",
        counts.signals, counts.hw_inputs, counts.merges, counts.cyclic_outputs
    );
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(src: &str) -> ResourceCounts {
        let topo = lq_resolve::resolve(&lq_dts::parse_nodes(src).unwrap()).unwrap();
        analyze(&topo, DEFAULT_RING_BUFFER_DEPTH)
    }

    #[test]
    fn counts_match_declared_nodes() {
        let c = counts(
            r#"
            a: i0 { compatible = "lq,hw-adc-input"; };
            b: i1 { compatible = "lq,hw-adc-input"; };
            c: i2 { compatible = "lq,hw-spi-input"; };
            m1: m { compatible = "lq,mid-merge"; inputs = <&a &b &c>; };
            m2: n { compatible = "lq,merge"; inputs = <&a &b>; };
            s: x { compatible = "lq,scale"; input = <&m1>; };
            r: y { compatible = "lq,remap"; input = <&s>; };
            f: z { compatible = "lq,fault-monitor"; input = <&m1>; };
            o1 { compatible = "lq,cyclic-output"; source = <&s>; };
            o2 { compatible = "lq,cyclic-output"; source = <&r>; };
            "#,
        );
        assert_eq!(c.hw_inputs, 3);
        assert_eq!(c.merges, 2);
        assert_eq!(c.max_merge_inputs, 3);
        assert_eq!(c.scales, 1);
        assert_eq!(c.remaps, 1);
        assert_eq!(c.fault_monitors, 1);
        assert_eq!(c.cyclic_outputs, 2);
        assert_eq!(c.pids, 0);
        // 3 inputs + 2 merges + scale + remap + monitor
        assert_eq!(c.signals, 8);
        assert_eq!(c.max_output_events, MIN_OUTPUT_EVENTS);
        assert_eq!(c.ring_buffer_depth, DEFAULT_RING_BUFFER_DEPTH);
    }

    #[test]
    fn output_events_double_the_outputs_past_the_floor() {
        let mut src = String::from("a: i { compatible = \"lq,hw-adc-input\"; };\n");
        for i in 0..10 {
            src.push_str(&format!("o{i} {{ compatible = \"lq,cyclic-output\"; source = <&a>; }};\n"));
        }
        assert_eq!(counts(&src).max_output_events, 20);
    }

    #[test]
    fn engine_overrides_ring_depth() {
        let c = counts(r#"e { compatible = "lq,engine"; ring-buffer-depth = <128>; };"#);
        assert_eq!(c.ring_buffer_depth, 128);
        assert_eq!(c.signals, 0);
    }

    #[test]
    fn explicit_identity_sets_signal_count() {
        let c = counts(r#"a: i { compatible = "lq,hw-adc-input"; signal-id = <9>; };"#);
        assert_eq!(c.signals, 10);
        assert_eq!(c.macro_value("LQ_NUM_SIGNALS"), Some(10));
        assert_eq!(c.macro_value("LQ_MAX_SIGNALS"), Some(10));
    }

    #[test]
    fn array_bounds_are_never_zero() {
        let c = counts(r#"a: i { compatible = "lq,hw-adc-input"; };"#);
        assert_eq!(c.merges, 0);
        assert_eq!(c.macro_value("LQ_NUM_MERGES"), Some(0));
        assert_eq!(c.macro_value("LQ_MAX_MERGES"), Some(1));
        assert_eq!(c.macro_value("LQ_MAX_MERGE_INPUTS"), Some(1));
        for (name, value) in c.macros() {
            if name.starts_with("LQ_MAX_") || name == "LQ_HW_RINGBUFFER_SIZE" {
                assert!(value >= 1, "{name} = {value}");
            }
        }

        let empty = analyze(&Topology::default(), DEFAULT_RING_BUFFER_DEPTH);
        assert_eq!(empty.macro_value("LQ_NUM_SIGNALS"), Some(0));
        assert_eq!(empty.macro_value("LQ_MAX_SIGNALS"), Some(1));
    }

    #[test]
    fn report_lists_every_category() {
        let text = counts(r#"a: i { compatible = "lq,hw-adc-input"; };"#).to_string();
        assert!(text.starts_with("=== Resource Counts ==="));
        assert!(text.contains("Signals:          1"));
        assert!(text.contains("Ring buffer:      64"));
    }
}
