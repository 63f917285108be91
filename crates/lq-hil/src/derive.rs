//! Test topology derived from a resolved engine topology.
//!
//! Channels are hardware-input positions in declaration order. A merge,
//! fault monitor or output is stimulated on the channels that actually feed
//! it, found by walking its inputs upstream to the hardware inputs.

use log::debug;

use lq_core::{NodeKind, ResolvedNode, SignalId, Topology};

use crate::suite::{Action, HilTest};

/// Mid-scale stimulus for a 12-bit converter.
pub const NOMINAL: i64 = 2500;
/// Full-scale 12-bit sample.
pub const FULL_SCALE: i64 = 4095;

const DEFAULT_TOLERANCE: i64 = 50;
const DEFAULT_STALE_US: i64 = 10_000;
const DEFAULT_PERIOD_US: i64 = 100_000;

/// Knobs for derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeriveConfig {
    /// Budget for the latency case.
    pub max_latency_us: i64,
}

impl Default for DeriveConfig {
    fn default() -> Self {
        Self {
            max_latency_us: 10_000,
        }
    }
}

/// Every derived case, in a fixed order: nominal, per input, per merge, per
/// fault monitor, per output, boundaries, latency, per PID.
pub fn derive_tests(topology: &Topology, config: &DeriveConfig) -> Vec<HilTest> {
    let deriver = Deriver { topology };
    let inputs = topology.hw_inputs();

    let mut tests = vec![deriver.all_nominal()];
    for (channel, input) in inputs.iter().enumerate() {
        tests.push(single_input(input, channel as i64));
    }
    for merge in topology.merges() {
        tests.extend(deriver.merge_cases(merge));
    }
    for monitor in topology.fault_monitors() {
        tests.extend(deriver.fault_cases(monitor));
    }
    for output in topology.cyclic_outputs() {
        tests.push(deriver.output_timing(output));
    }
    tests.push(boundary("all-zero", "all inputs at zero", inputs.len(), 0));
    tests.push(boundary("all-max", "all inputs at maximum", inputs.len(), FULL_SCALE));
    tests.push(deriver.latency(config));
    for pid in topology.pids() {
        tests.extend(deriver.pid_cases(pid));
    }

    debug!(
        "derived {} HIL case(s) from {} input(s)",
        tests.len(),
        inputs.len()
    );
    tests
}

/// A node name as it appears inside a test name.
fn slug(node: &ResolvedNode) -> String {
    node.display_name()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}

fn inject(channel: i64, value: i64) -> Action {
    Action::InjectAdc {
        channel,
        value,
        delay_ms: 0,
    }
}

fn output_pgn(output: &ResolvedNode) -> i64 {
    output
        .int("target-id")
        .or_else(|| output.int("pgn"))
        .or_else(|| output.int("cob-id"))
        .unwrap_or(0)
}

fn single_input(input: &ResolvedNode, channel: i64) -> HilTest {
    HilTest::new(
        format!("hil-test-input-{}", slug(input)),
        format!("Input {} in isolation", input.display_name()),
        2000,
    )
    .step(inject(channel, 0))
    .step(inject(channel, FULL_SCALE))
    .step(inject(channel, 2048))
}

fn boundary(name: &str, what: &str, inputs: usize, value: i64) -> HilTest {
    (0..inputs as i64).fold(
        HilTest::new(format!("hil-test-boundary-{name}"), format!("Boundary: {what}"), 2000),
        |test, channel| test.step(inject(channel, value)),
    )
}

struct Deriver<'a> {
    topology: &'a Topology,
}

impl Deriver<'_> {
    /// Hardware-input position that feeds `signal`, following the first
    /// input of each block upstream.
    fn channel_of(&self, signal: SignalId) -> Option<i64> {
        let mut current = signal;
        // A resolved topology is acyclic; the bound only guards malformed input.
        for _ in 0..=self.topology.len() {
            let producer = self.topology.producer_of(current)?;
            if producer.kind.is_hw_input() {
                return self
                    .topology
                    .hw_inputs()
                    .iter()
                    .position(|n| n.index == producer.index)
                    .map(|p| p as i64);
            }
            current = match producer.kind {
                NodeKind::Merge => *producer.signal_refs("input-signal-ids").first()?,
                NodeKind::Pid => producer.signal_ref("measurement-signal-id")?,
                _ => producer.signal_ref("input-signal-id")?,
            };
        }
        None
    }

    fn channel_or_first(&self, signal: Option<SignalId>) -> i64 {
        signal.and_then(|s| self.channel_of(s)).unwrap_or(0)
    }

    fn all_nominal(&self) -> HilTest {
        let mut test = HilTest::new(
            "hil-test-all-nominal",
            "All inputs at nominal values",
            5000,
        );
        for (channel, input) in self.topology.hw_inputs().iter().enumerate() {
            // three samples spread over the staleness window keep the signal fresh
            let delay_ms = input.int_or("stale-us", DEFAULT_STALE_US) / 3 / 1000;
            for _ in 0..3 {
                test = test.step(Action::InjectAdc {
                    channel: channel as i64,
                    value: NOMINAL,
                    delay_ms,
                });
            }
        }
        for output in self.topology.cyclic_outputs() {
            test = test.step(Action::ExpectCanPgn {
                pgn: output_pgn(output),
                timeout_ms: output.int_or("period-us", DEFAULT_PERIOD_US) / 1000 + 100,
            });
        }
        test
    }

    fn merge_cases(&self, merge: &ResolvedNode) -> Vec<HilTest> {
        let name = slug(merge);
        let mut channels: Vec<i64> = Vec::new();
        for channel in merge
            .signal_refs("input-signal-ids")
            .into_iter()
            .filter_map(|s| self.channel_of(s))
        {
            if !channels.contains(&channel) {
                channels.push(channel);
            }
        }
        if channels.is_empty() {
            channels = vec![0, 1];
        }
        let tolerance = merge.int_or("tolerance", DEFAULT_TOLERANCE);
        let stale_ms = merge.int_or("stale-us", DEFAULT_STALE_US) / 1000;

        // first channel stays at nominal, the rest are offset
        let spread = |offset: i64| -> Vec<i64> {
            (0..channels.len())
                .map(|i| if i == 0 { NOMINAL } else { NOMINAL + offset })
                .collect()
        };
        let multi = |offset: i64| Action::InjectMultiAdc {
            channels: channels.clone(),
            values: spread(offset),
            delay_ms: 10,
        };

        let label = merge.display_name();
        let mut stale = HilTest::new(
            format!("hil-test-merge-{name}-stale"),
            format!("Merge {label}: one input stale"),
            stale_ms + 1000,
        )
        .step(inject(channels[0], NOMINAL))
        .step(Action::Delay {
            duration_ms: stale_ms + 100,
        });
        if let Some(second) = channels.get(1) {
            stale = stale.step(inject(*second, NOMINAL));
        }

        vec![
            HilTest::new(
                format!("hil-test-merge-{name}-agree"),
                format!("Merge {label}: all inputs agree"),
                2000,
            )
            .step(multi(0)),
            HilTest::new(
                format!("hil-test-merge-{name}-within-tolerance"),
                format!("Merge {label}: inputs within tolerance"),
                2000,
            )
            .step(multi(tolerance / 2)),
            HilTest::new(
                format!("hil-test-merge-{name}-fault"),
                format!("Merge {label}: inputs disagree beyond tolerance"),
                2000,
            )
            .step(multi(tolerance * 2)),
            stale,
        ]
    }

    fn fault_cases(&self, monitor: &ResolvedNode) -> Vec<HilTest> {
        let name = slug(monitor);
        let label = monitor.display_name();
        let channel = self.channel_or_first(monitor.signal_ref("input-signal-id"));
        let high = monitor
            .int("max-value")
            .or_else(|| monitor.int("high-threshold"))
            .unwrap_or(4000)
            + 100;
        let low = monitor
            .int("min-value")
            .or_else(|| monitor.int("low-threshold"))
            .unwrap_or(100)
            - 100;
        vec![
            HilTest::new(
                format!("hil-test-fault-{name}-high"),
                format!("Fault monitor {label}: above high threshold"),
                2000,
            )
            .step(inject(channel, high)),
            HilTest::new(
                format!("hil-test-fault-{name}-low"),
                format!("Fault monitor {label}: below low threshold"),
                2000,
            )
            .step(inject(channel, low)),
        ]
    }

    fn output_timing(&self, output: &ResolvedNode) -> HilTest {
        let period_ms = output.int_or("period-us", DEFAULT_PERIOD_US) / 1000;
        let expect = Action::ExpectCanPgn {
            pgn: output_pgn(output),
            timeout_ms: period_ms + 100,
        };
        HilTest::new(
            format!("hil-test-output-{}", slug(output)),
            format!("Cyclic output {} timing", output.display_name()),
            period_ms * 3 + 500,
        )
        .step(inject(
            self.channel_or_first(output.signal_ref("source-signal-id")),
            NOMINAL,
        ))
        .step(expect.clone())
        .step(expect)
    }

    fn latency(&self, config: &DeriveConfig) -> HilTest {
        let channel = self
            .topology
            .cyclic_outputs()
            .first()
            .map(|o| self.channel_or_first(o.signal_ref("source-signal-id")))
            .unwrap_or(0);
        HilTest::new(
            "hil-test-latency-measurement",
            "End-to-end latency measurement",
            1000,
        )
        .step(Action::MeasureLatency {
            channel,
            value: NOMINAL,
            max_latency_us: config.max_latency_us,
            timeout_ms: 500,
        })
    }

    fn pid_cases(&self, pid: &ResolvedNode) -> Vec<HilTest> {
        let name = slug(pid);
        let label = pid.display_name();
        let setpoint = self.channel_or_first(pid.signal_ref("setpoint-signal-id"));
        let measurement = pid
            .signal_ref("measurement-signal-id")
            .and_then(|s| self.channel_of(s))
            .unwrap_or(1);
        vec![
            HilTest::new(
                format!("hil-test-pid-{name}-proportional"),
                format!("PID {label}: proportional response"),
                2000,
            )
            .step(inject(setpoint, NOMINAL))
            .step(inject(measurement, 2000))
            .step(Action::Delay { duration_ms: 100 }),
            HilTest::new(
                format!("hil-test-pid-{name}-integral"),
                format!("PID {label}: integral accumulation"),
                5000,
            )
            .step(inject(setpoint, NOMINAL))
            .step(Action::InjectAdcPeriodic {
                channel: measurement,
                value: 2000,
                period_ms: 50,
                count: 20,
            }),
        ]
    }
}
