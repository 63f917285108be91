//! Test descriptions: `lq,hil-test` nodes and their step sequences.
//!
//! ```text
//! hil-test-rpm-output {
//!     compatible = "lq,hil-test";
//!     description = "RPM reaches the bus";
//!     timeout-ms = <2000>;
//!
//!     sequence {
//!         step@0 { action = "inject-adc"; channel = <0>; value = <2500>; };
//!         step@1 { action = "expect-can-pgn"; pgn = <65265>; timeout-ms = <200>; };
//!     };
//! };
//! ```
//!
//! Steps are read once into a typed [`Action`]; an action name outside the
//! closed set is an error, never a silently skipped step.

use lq_core::{Block, PropertyValue};
use serde::Serialize;

use crate::error::{HilError, Result};

pub const HIL_TEST_COMPATIBLE: &str = "lq,hil-test";

/// Case timeout when `timeout-ms` is absent.
pub const DEFAULT_TIMEOUT_MS: i64 = 5000;

/// Step timeout when `timeout-ms` is absent.
pub const DEFAULT_STEP_TIMEOUT_MS: i64 = 1000;

/// One test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HilTest {
    /// Node name, e.g. `hil-test-all-nominal`.
    pub name: String,
    pub description: String,
    pub timeout_ms: i64,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Step {
    /// The `N` of `step@N`.
    pub index: u32,
    pub action: Action,
}

/// Everything a harness step can do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Action {
    InjectAdc {
        channel: i64,
        value: i64,
        delay_ms: i64,
    },
    /// Several channels injected back to back.
    InjectMultiAdc {
        channels: Vec<i64>,
        values: Vec<i64>,
        delay_ms: i64,
    },
    /// `count` injections, `period_ms` apart.
    InjectAdcPeriodic {
        channel: i64,
        value: i64,
        period_ms: i64,
        count: i64,
    },
    InjectCan {
        can_id: i64,
        extended: bool,
        data: Vec<u8>,
    },
    /// A J1939 frame whose identifier is built from a PGN.
    InjectCanPgn {
        pgn: i64,
        priority: i64,
        source: i64,
        data: Vec<u8>,
    },
    WaitGpio {
        pin: i64,
        high: bool,
        timeout_ms: i64,
    },
    /// Any frame, optionally filtered by PGN.
    ExpectCan {
        pgn: Option<i64>,
        timeout_ms: i64,
    },
    ExpectCanPgn {
        pgn: i64,
        timeout_ms: i64,
    },
    /// Inject on `channel` and time the first frame that follows.
    MeasureLatency {
        channel: i64,
        value: i64,
        max_latency_us: i64,
        timeout_ms: i64,
    },
    Delay {
        duration_ms: i64,
    },
}

/// Every accepted `action` string.
pub const ACTIONS: &[&str] = &[
    "inject-adc",
    "inject-multi-adc",
    "inject-adc-periodic",
    "inject-can",
    "inject-can-pgn",
    "wait-gpio-high",
    "wait-gpio-low",
    "expect-can",
    "expect-can-pgn",
    "measure-latency",
    "delay",
];

impl Action {
    /// The `action = "..."` string.
    pub fn name(&self) -> &'static str {
        match self {
            Action::InjectAdc { .. } => "inject-adc",
            Action::InjectMultiAdc { .. } => "inject-multi-adc",
            Action::InjectAdcPeriodic { .. } => "inject-adc-periodic",
            Action::InjectCan { .. } => "inject-can",
            Action::InjectCanPgn { .. } => "inject-can-pgn",
            Action::WaitGpio { high: true, .. } => "wait-gpio-high",
            Action::WaitGpio { high: false, .. } => "wait-gpio-low",
            Action::ExpectCan { .. } => "expect-can",
            Action::ExpectCanPgn { .. } => "expect-can-pgn",
            Action::MeasureLatency { .. } => "measure-latency",
            Action::Delay { .. } => "delay",
        }
    }

    /// Step properties in write order, `action` first.
    fn properties(&self) -> Vec<(&'static str, PropertyValue)> {
        use PropertyValue::{Int, IntArray};
        let bytes = |data: &[u8]| IntArray(data.iter().map(|b| i64::from(*b)).collect());
        let mut props = vec![("action", PropertyValue::Str(self.name().to_string()))];
        match self {
            Action::InjectAdc {
                channel,
                value,
                delay_ms,
            } => {
                props.push(("channel", Int(*channel)));
                props.push(("value", Int(*value)));
                if *delay_ms > 0 {
                    props.push(("delay-ms", Int(*delay_ms)));
                }
            }
            Action::InjectMultiAdc {
                channels,
                values,
                delay_ms,
            } => {
                props.push(("channels", IntArray(channels.clone())));
                props.push(("values", IntArray(values.clone())));
                if *delay_ms > 0 {
                    props.push(("delay-ms", Int(*delay_ms)));
                }
            }
            Action::InjectAdcPeriodic {
                channel,
                value,
                period_ms,
                count,
            } => {
                props.push(("channel", Int(*channel)));
                props.push(("value", Int(*value)));
                props.push(("period-ms", Int(*period_ms)));
                props.push(("count", Int(*count)));
            }
            Action::InjectCan {
                can_id,
                extended,
                data,
            } => {
                props.push(("can-id", Int(*can_id)));
                props.push(("extended", Int(i64::from(*extended))));
                props.push(("data", bytes(data)));
            }
            Action::InjectCanPgn {
                pgn,
                priority,
                source,
                data,
            } => {
                props.push(("pgn", Int(*pgn)));
                props.push(("priority", Int(*priority)));
                props.push(("source-addr", Int(*source)));
                props.push(("data", bytes(data)));
            }
            Action::WaitGpio {
                pin, timeout_ms, ..
            } => {
                props.push(("pin", Int(*pin)));
                props.push(("timeout-ms", Int(*timeout_ms)));
            }
            Action::ExpectCan { pgn, timeout_ms } => {
                if let Some(pgn) = pgn {
                    props.push(("pgn", Int(*pgn)));
                }
                props.push(("timeout-ms", Int(*timeout_ms)));
            }
            Action::ExpectCanPgn { pgn, timeout_ms } => {
                props.push(("pgn", Int(*pgn)));
                props.push(("timeout-ms", Int(*timeout_ms)));
            }
            Action::MeasureLatency {
                channel,
                value,
                max_latency_us,
                timeout_ms,
            } => {
                props.push(("channel", Int(*channel)));
                props.push(("value", Int(*value)));
                props.push(("max-latency-us", Int(*max_latency_us)));
                props.push(("timeout-ms", Int(*timeout_ms)));
            }
            Action::Delay { duration_ms } => {
                props.push(("duration-ms", Int(*duration_ms)));
            }
        }
        props
    }
}

impl Step {
    pub fn new(index: u32, action: Action) -> Self {
        Self { index, action }
    }

    fn to_block(&self) -> Block {
        let mut block = Block::new("step");
        block.address = Some(self.index.to_string());
        for (name, value) in self.action.properties() {
            block.properties.insert(name, value);
        }
        block
    }

    fn from_block(test: &str, position: usize, block: &Block) -> Result<Step> {
        let index = block
            .address
            .as_deref()
            .and_then(|a| a.parse::<u32>().ok())
            .unwrap_or(position as u32);
        let reader = StepReader {
            test,
            step: index.to_string(),
            block,
        };
        Ok(Step {
            index,
            action: reader.action()?,
        })
    }
}

impl HilTest {
    pub fn new(name: impl Into<String>, description: impl Into<String>, timeout_ms: i64) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            timeout_ms,
            steps: Vec::new(),
        }
    }

    /// Append a step numbered after the last one.
    pub fn step(mut self, action: Action) -> Self {
        let index = self.steps.len() as u32;
        self.steps.push(Step::new(index, action));
        self
    }

    pub fn to_block(&self) -> Block {
        let mut block = Block::new(self.name.clone());
        block
            .properties
            .insert("compatible", PropertyValue::Str(HIL_TEST_COMPATIBLE.into()));
        block
            .properties
            .insert("description", PropertyValue::Str(self.description.clone()));
        block
            .properties
            .insert("timeout-ms", PropertyValue::Int(self.timeout_ms));
        let mut sequence = Block::new("sequence");
        sequence.children = self.steps.iter().map(Step::to_block).collect();
        block.children.push(sequence);
        block
    }

    pub fn from_block(block: &Block) -> Result<HilTest> {
        let steps = match block.child("sequence") {
            Some(sequence) => sequence
                .children
                .iter()
                .filter(|c| c.name == "step")
                .enumerate()
                .map(|(i, step)| Step::from_block(&block.name, i, step))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        Ok(HilTest {
            name: block.name.clone(),
            description: block.properties.str("description").unwrap_or_default().to_string(),
            timeout_ms: block.properties.int_or("timeout-ms", DEFAULT_TIMEOUT_MS),
            steps,
        })
    }
}

fn is_test(block: &Block) -> bool {
    match block.compatible() {
        Some(compatible) => compatible == HIL_TEST_COMPATIBLE,
        None => block.name.starts_with("hil-test-"),
    }
}

/// Every test case in a block tree, in document order.
pub fn tests_from_blocks(blocks: &[Block]) -> Result<Vec<HilTest>> {
    blocks
        .iter()
        .flat_map(Block::walk)
        .filter(|b| is_test(b))
        .map(HilTest::from_block)
        .collect()
}

/// Parse a test description.
pub fn parse_suite(src: &str) -> Result<Vec<HilTest>> {
    let blocks = lq_dts::parse_blocks(src)?;
    tests_from_blocks(&blocks)
}

/// Render tests as a description file under a root node.
pub fn write_suite(tests: &[HilTest]) -> String {
    let mut root = Block::new("/");
    root.children = tests.iter().map(HilTest::to_block).collect();
    format!("/dts-v1/;\n\n{}", lq_dts::write_blocks(&[root]))
}

/// Typed access to one step block's properties.
struct StepReader<'a> {
    test: &'a str,
    step: String,
    block: &'a Block,
}

impl StepReader<'_> {
    fn action(&self) -> Result<Action> {
        let Some(name) = self.block.properties.str("action") else {
            return Err(HilError::MissingAction {
                test: self.test.to_string(),
                step: self.step.clone(),
            });
        };
        Ok(match name {
            "inject-adc" => Action::InjectAdc {
                channel: self.int("channel", 0),
                value: self.int("value", 0),
                delay_ms: self.int("delay-ms", 0),
            },
            "inject-multi-adc" => {
                let channels = self.ints("channels")?;
                let values = self.ints("values")?;
                if channels.len() != values.len() {
                    return Err(self.invalid(format!(
                        "{} channel(s) but {} value(s)",
                        channels.len(),
                        values.len()
                    )));
                }
                Action::InjectMultiAdc {
                    channels,
                    values,
                    delay_ms: self.int("delay-ms", 0),
                }
            }
            "inject-adc-periodic" => Action::InjectAdcPeriodic {
                channel: self.int("channel", 0),
                value: self.int("value", 0),
                period_ms: self.int("period-ms", 100),
                count: self.int("count", 1),
            },
            "inject-can" => Action::InjectCan {
                can_id: self.int("can-id", 0),
                extended: self.bool("extended", true),
                data: self.bytes()?,
            },
            "inject-can-pgn" => Action::InjectCanPgn {
                pgn: self.int("pgn", 0),
                priority: self.int("priority", 6),
                source: self.int("source-addr", 0x28),
                data: self.bytes()?,
            },
            "wait-gpio-high" | "wait-gpio-low" => Action::WaitGpio {
                pin: self.int("pin", 0),
                high: name == "wait-gpio-high",
                timeout_ms: self.int("timeout-ms", DEFAULT_STEP_TIMEOUT_MS),
            },
            "expect-can" => Action::ExpectCan {
                pgn: self.block.properties.int("pgn"),
                timeout_ms: self.int("timeout-ms", DEFAULT_STEP_TIMEOUT_MS),
            },
            "expect-can-pgn" => Action::ExpectCanPgn {
                pgn: self.int("pgn", 0),
                timeout_ms: self.int("timeout-ms", DEFAULT_STEP_TIMEOUT_MS),
            },
            "measure-latency" => Action::MeasureLatency {
                channel: self.int("channel", 0),
                value: self.int("value", 2500),
                max_latency_us: self.int("max-latency-us", 50_000),
                timeout_ms: self.int("timeout-ms", DEFAULT_STEP_TIMEOUT_MS),
            },
            // `delay-ms` is the spelling older test files use
            "delay" => Action::Delay {
                duration_ms: self
                    .block
                    .properties
                    .int("duration-ms")
                    .unwrap_or_else(|| self.int("delay-ms", 100)),
            },
            other => {
                return Err(HilError::UnknownAction {
                    test: self.test.to_string(),
                    step: self.step.clone(),
                    action: other.to_string(),
                })
            }
        })
    }

    fn int(&self, name: &str, default: i64) -> i64 {
        self.block.properties.int_or(name, default)
    }

    fn bool(&self, name: &str, default: bool) -> bool {
        match self.block.properties.get(name) {
            Some(PropertyValue::Flag) => true,
            Some(value) => value.as_int().map_or(default, |v| v != 0),
            None => default,
        }
    }

    /// `<0 1 2>` or the string form `"0,1,2"`.
    fn ints(&self, name: &str) -> Result<Vec<i64>> {
        match self.block.properties.get(name) {
            None => Ok(Vec::new()),
            Some(PropertyValue::Str(list)) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    lq_dts::parse_int(s)
                        .ok_or_else(|| self.invalid(format!("'{name}': '{s}' is not an integer")))
                })
                .collect(),
            Some(value) => value
                .as_ints()
                .ok_or_else(|| self.invalid(format!("'{name}' must be a list of integers"))),
        }
    }

    /// Frame payload: at most eight bytes.
    fn bytes(&self) -> Result<Vec<u8>> {
        let values = self.ints("data")?;
        if values.len() > 8 {
            return Err(self.invalid(format!("data has {} bytes; a frame holds 8", values.len())));
        }
        values
            .into_iter()
            .map(|v| u8::try_from(v).map_err(|_| self.invalid(format!("data byte {v} is out of range"))))
            .collect()
    }

    fn invalid(&self, detail: String) -> HilError {
        HilError::InvalidStep {
            test: self.test.to_string(),
            step: self.step.clone(),
            detail,
        }
    }
}
