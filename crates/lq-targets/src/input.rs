//! Hardware-input view consumed by the backends.
//!
//! Backends never look at raw property maps. Each resolved hardware-input
//! node is read once into an [`HwInput`] carrying its bus, its signal and the
//! `hw-*` placement properties; absent properties stay `None` so that every
//! backend can apply its own vendor default.

use lq_core::{HwBus, PropertyValue, ResolvedNode, SignalId, Topology};

/// One hardware input bound to its signal identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HwInput {
    /// C-identifier form of the node's label.
    pub name: String,
    pub bus: HwBus,
    pub signal: SignalId,
    /// Peripheral instance (`hw-instance`), e.g. the `1` in `ADC1`.
    pub instance: Option<i64>,
    /// Converter channel (`hw-channel`).
    pub channel: Option<i64>,
    /// Pin number (`hw-pin`).
    pub pin: Option<i64>,
    /// Port letter (`hw-port`), e.g. `"A"`.
    pub port: Option<String>,
    /// 7-bit device address (`i2c-address`).
    pub i2c_address: Option<i64>,
    /// J1939 parameter group filtered for CAN inputs (`pgn`).
    pub pgn: Option<i64>,
}

impl HwInput {
    /// Read a resolved node. Non-inputs and inputs without an identity yield `None`.
    pub fn from_node(node: &ResolvedNode) -> Option<HwInput> {
        let lq_core::NodeKind::HwInput(bus) = node.kind else {
            return None;
        };
        Some(HwInput {
            name: node.c_ident(),
            bus,
            signal: node.signal?,
            instance: node.int("hw-instance"),
            channel: node.int("hw-channel"),
            pin: node.int("hw-pin"),
            port: port_letter(node),
            i2c_address: node.int("i2c-address"),
            pgn: node.int("pgn"),
        })
    }

    /// Every hardware input of a topology, in declaration order.
    pub fn collect(topology: &Topology) -> Vec<HwInput> {
        topology
            .hw_inputs()
            .into_iter()
            .filter_map(HwInput::from_node)
            .collect()
    }

    pub fn instance_or(&self, default: i64) -> i64 {
        self.instance.unwrap_or(default)
    }

    pub fn channel_or(&self, default: i64) -> i64 {
        self.channel.unwrap_or(default)
    }

    pub fn pin_or(&self, default: i64) -> i64 {
        self.pin.unwrap_or(default)
    }

    pub fn port_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.port.as_deref().unwrap_or(default)
    }

    pub fn pgn_or_zero(&self) -> i64 {
        self.pgn.unwrap_or(0)
    }
}

/// `hw-port = "B"` or the numeric form `hw-port = <1>` (A = 0).
fn port_letter(node: &ResolvedNode) -> Option<String> {
    match node.properties.get("hw-port")? {
        PropertyValue::Str(s) => Some(s.to_ascii_uppercase()),
        other => {
            let n = u8::try_from(other.as_int()?).ok().filter(|n| *n < 26)?;
            Some(char::from(b'A' + n).to_string())
        }
    }
}

/// The inputs on one bus.
pub fn on_bus(inputs: &[HwInput], bus: HwBus) -> Vec<&HwInput> {
    inputs.iter().filter(|i| i.bus == bus).collect()
}
