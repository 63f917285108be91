//! Raw blocks, parsed nodes, and node classification.
//!
//! The parser produces a tree of [`Block`]s. Blocks that declare a
//! `compatible` type are lifted into [`ParsedNode`]s and classified once into
//! a [`NodeKind`]; later stages match on the kind and never re-test type
//! strings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::property::{Properties, PropertyValue};

/// Byte range of a block in the source text, `start..end`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A brace block exactly as written: `[label:] name[@address] { ... };`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub label: Option<String>,
    pub name: String,
    pub address: Option<String>,
    pub properties: Properties,
    pub children: Vec<Block>,
    pub span: Span,
}

impl Block {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            label: None,
            name: name.into(),
            address: None,
            properties: Properties::new(),
            children: Vec::new(),
            span: Span::default(),
        }
    }

    /// The declared type, if any.
    pub fn compatible(&self) -> Option<&str> {
        self.properties.str("compatible")
    }

    /// First child with the given name (address ignored).
    pub fn child(&self, name: &str) -> Option<&Block> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Unit address read as hex, the description-language convention.
    pub fn unit_address(&self) -> Option<u64> {
        self.address
            .as_deref()
            .and_then(|a| u64::from_str_radix(a.trim_start_matches("0x"), 16).ok())
    }

    /// Walk this block and all descendants, parents first.
    pub fn walk(&self) -> Vec<&Block> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}

/// Peripheral family of a hardware input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HwBus {
    Adc,
    Spi,
    Can,
    Gpio,
    I2c,
    Uart,
    Sensor,
}

impl HwBus {
    pub const ALL: [HwBus; 7] = [
        HwBus::Adc,
        HwBus::Spi,
        HwBus::Can,
        HwBus::Gpio,
        HwBus::I2c,
        HwBus::Uart,
        HwBus::Sensor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HwBus::Adc => "adc",
            HwBus::Spi => "spi",
            HwBus::Can => "can",
            HwBus::Gpio => "gpio",
            HwBus::I2c => "i2c",
            HwBus::Uart => "uart",
            HwBus::Sensor => "sensor",
        }
    }

    /// The concrete `compatible` string for this family.
    pub fn compatible(self) -> String {
        format!("lq,hw-{}-input", self.as_str())
    }

    /// Pick a family from a device name such as `adc1` or `spi_flash`.
    pub fn from_device_name(name: &str) -> HwBus {
        let name = name.to_ascii_lowercase();
        if name.contains("adc") {
            HwBus::Adc
        } else if name.contains("spi") {
            HwBus::Spi
        } else if name.contains("i2c") {
            HwBus::I2c
        } else if name.contains("gpio") {
            HwBus::Gpio
        } else if name.contains("uart") || name.contains("usart") || name.contains("serial") {
            HwBus::Uart
        } else if name.contains("can") {
            HwBus::Can
        } else {
            HwBus::Sensor
        }
    }
}

impl fmt::Display for HwBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol family of a cyclic output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFamily {
    Can,
    J1939,
    Canopen,
    Gpio,
    Uart,
    Spi,
    I2c,
    Pwm,
    Dac,
    Modbus,
}

impl OutputFamily {
    pub const ALL: [OutputFamily; 10] = [
        OutputFamily::Can,
        OutputFamily::J1939,
        OutputFamily::Canopen,
        OutputFamily::Gpio,
        OutputFamily::Uart,
        OutputFamily::Spi,
        OutputFamily::I2c,
        OutputFamily::Pwm,
        OutputFamily::Dac,
        OutputFamily::Modbus,
    ];

    /// Parse an `output-type` value.
    pub fn parse(s: &str) -> Option<OutputFamily> {
        OutputFamily::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFamily::Can => "can",
            OutputFamily::J1939 => "j1939",
            OutputFamily::Canopen => "canopen",
            OutputFamily::Gpio => "gpio",
            OutputFamily::Uart => "uart",
            OutputFamily::Spi => "spi",
            OutputFamily::I2c => "i2c",
            OutputFamily::Pwm => "pwm",
            OutputFamily::Dac => "dac",
            OutputFamily::Modbus => "modbus",
        }
    }

    /// The engine's `LQ_OUTPUT_*` enumerator.
    pub fn c_enum(self) -> String {
        format!("LQ_OUTPUT_{}", self.as_str().to_ascii_uppercase())
    }

    /// Pick a family from a device name such as `can0` or `j1939_bus`.
    pub fn from_device_name(name: &str) -> Option<OutputFamily> {
        let name = name.to_ascii_lowercase();
        // Longer names first: "canopen" and "j1939" both contain "can"-ish text.
        let ordered = [
            OutputFamily::J1939,
            OutputFamily::Canopen,
            OutputFamily::Modbus,
            OutputFamily::Gpio,
            OutputFamily::Uart,
            OutputFamily::Spi,
            OutputFamily::I2c,
            OutputFamily::Pwm,
            OutputFamily::Dac,
            OutputFamily::Can,
        ];
        ordered.into_iter().find(|f| name.contains(f.as_str()))
    }
}

impl fmt::Display for OutputFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a CANopen process data object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PdoDirection {
    /// Device to master (TPDO).
    Transmit,
    /// Master to device (RPDO).
    Receive,
}

impl PdoDirection {
    pub fn prefix(self) -> &'static str {
        match self {
            PdoDirection::Transmit => "tpdo",
            PdoDirection::Receive => "rpdo",
        }
    }
}

/// Closed set of node categories the compiler understands.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Engine,
    HwInput(HwBus),
    Scale,
    Remap,
    Pid,
    Merge,
    FaultMonitor,
    CyclicOutput,
    VerifiedOutput,
    CanopenDevice,
    CanopenPdo(PdoDirection),
    CanopenMapping,
    /// Not an engine node; carried through and ignored by generators.
    Other(String),
}

impl NodeKind {
    /// Classify a `compatible` string.
    ///
    /// Generic `lq,input` nodes become a concrete hardware input based on the
    /// device they name.
    pub fn classify(compatible: &str, properties: &Properties) -> NodeKind {
        match compatible {
            "lq,engine" => NodeKind::Engine,
            "lq,hw-adc-input" => NodeKind::HwInput(HwBus::Adc),
            "lq,hw-spi-input" => NodeKind::HwInput(HwBus::Spi),
            "lq,hw-can-input" => NodeKind::HwInput(HwBus::Can),
            "lq,hw-gpio-input" => NodeKind::HwInput(HwBus::Gpio),
            "lq,hw-i2c-input" => NodeKind::HwInput(HwBus::I2c),
            "lq,hw-uart-input" => NodeKind::HwInput(HwBus::Uart),
            "lq,hw-sensor-input" => NodeKind::HwInput(HwBus::Sensor),
            "lq,input" => NodeKind::HwInput(
                device_name(properties)
                    .map(HwBus::from_device_name)
                    .unwrap_or(HwBus::Sensor),
            ),
            "lq,scale" | "lq-scale" => NodeKind::Scale,
            "lq,remap" | "lq-remap" => NodeKind::Remap,
            "lq,pid" | "lq-pid" => NodeKind::Pid,
            "lq,mid-merge" | "lq,merge" => NodeKind::Merge,
            "lq,fault-monitor" => NodeKind::FaultMonitor,
            "lq,cyclic-output" | "lq,output" => NodeKind::CyclicOutput,
            "lq,verified-output" => NodeKind::VerifiedOutput,
            "lq,protocol-canopen" => NodeKind::CanopenDevice,
            "lq,canopen-tpdo" => NodeKind::CanopenPdo(PdoDirection::Transmit),
            "lq,canopen-rpdo" => NodeKind::CanopenPdo(PdoDirection::Receive),
            "lq,canopen-mapping" => NodeKind::CanopenMapping,
            other => NodeKind::Other(other.to_string()),
        }
    }

    pub fn is_hw_input(&self) -> bool {
        matches!(self, NodeKind::HwInput(_))
    }

    /// Scale, remap, PID and merge blocks.
    pub fn is_transform(&self) -> bool {
        matches!(
            self,
            NodeKind::Scale | NodeKind::Remap | NodeKind::Pid | NodeKind::Merge
        )
    }

    /// Whether nodes of this kind own a signal identity.
    pub fn produces_signal(&self) -> bool {
        self.is_hw_input()
            || self.is_transform()
            || matches!(self, NodeKind::FaultMonitor | NodeKind::CanopenMapping)
    }

    /// Property names that pin a node's identity explicitly, in priority order.
    pub fn identity_properties(&self) -> &'static [&'static str] {
        match self {
            NodeKind::HwInput(_) | NodeKind::CanopenMapping => &["signal-id"],
            NodeKind::Scale | NodeKind::Remap | NodeKind::Pid | NodeKind::Merge => {
                &["signal-id", "output-signal-id"]
            }
            NodeKind::FaultMonitor => &["signal-id", "fault-output-signal-id"],
            _ => &[],
        }
    }

    /// Short category name used in reports.
    pub fn category(&self) -> &'static str {
        match self {
            NodeKind::Engine => "engine",
            NodeKind::HwInput(_) => "hw-input",
            NodeKind::Scale => "scale",
            NodeKind::Remap => "remap",
            NodeKind::Pid => "pid",
            NodeKind::Merge => "merge",
            NodeKind::FaultMonitor => "fault-monitor",
            NodeKind::CyclicOutput => "cyclic-output",
            NodeKind::VerifiedOutput => "verified-output",
            NodeKind::CanopenDevice => "canopen-device",
            NodeKind::CanopenPdo(_) => "canopen-pdo",
            NodeKind::CanopenMapping => "canopen-mapping",
            NodeKind::Other(_) => "other",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::HwInput(bus) => write!(f, "hw-input({bus})"),
            NodeKind::CanopenPdo(dir) => write!(f, "canopen-{}", dir.prefix()),
            NodeKind::Other(compatible) => write!(f, "other({compatible})"),
            kind => f.write_str(kind.category()),
        }
    }
}

/// Name of the device a generic node points at: `device-type = "adc"` or `device = <&adc1>`.
fn device_name(properties: &Properties) -> Option<&str> {
    if let Some(kind) = properties.str("device-type") {
        return Some(kind);
    }
    match properties.get("device") {
        Some(PropertyValue::Ref(label)) => Some(label),
        Some(PropertyValue::Str(name)) => Some(name),
        _ => None,
    }
}

/// A node that declared a `compatible` type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedNode {
    pub label: Option<String>,
    pub name: String,
    pub address: Option<String>,
    pub compatible: String,
    pub kind: NodeKind,
    pub properties: Properties,
    /// Nested blocks (PDO mappings, test sequences), kept opaque.
    pub children: Vec<Block>,
    pub span: Span,
}

impl ParsedNode {
    /// Lift a block into a node. Blocks without `compatible` yield `None`.
    pub fn from_block(block: &Block) -> Option<ParsedNode> {
        let compatible = block.compatible()?.to_string();
        let mut properties = block.properties.clone();
        let kind = NodeKind::classify(&compatible, &properties);

        // Generic outputs take their protocol family from the device they name.
        if compatible == "lq,output" && !properties.contains("output-type") {
            if let Some(family) = device_name(&properties).and_then(OutputFamily::from_device_name)
            {
                properties.insert("output-type", PropertyValue::Str(family.as_str().into()));
            }
        }

        Some(ParsedNode {
            label: block.label.clone(),
            name: block.name.clone(),
            address: block.address.clone(),
            compatible,
            kind,
            properties,
            children: block.children.clone(),
            span: block.span,
        })
    }

    /// Label if present, otherwise the node name.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(compatible: &str) -> Block {
        let mut b = Block::new("node");
        b.properties
            .insert("compatible", PropertyValue::Str(compatible.into()));
        b
    }

    #[test]
    fn classifies_known_types() {
        let props = Properties::new();
        assert_eq!(NodeKind::classify("lq,engine", &props), NodeKind::Engine);
        assert_eq!(
            NodeKind::classify("lq,hw-adc-input", &props),
            NodeKind::HwInput(HwBus::Adc)
        );
        assert_eq!(NodeKind::classify("lq-scale", &props), NodeKind::Scale);
        assert_eq!(NodeKind::classify("lq,mid-merge", &props), NodeKind::Merge);
        assert_eq!(
            NodeKind::classify("vendor,thing", &props),
            NodeKind::Other("vendor,thing".into())
        );
    }

    #[test]
    fn generic_input_normalizes_by_device() {
        let mut b = block("lq,input");
        b.properties
            .insert("device", PropertyValue::Ref("spi2".into()));
        let node = ParsedNode::from_block(&b).unwrap();
        assert_eq!(node.kind, NodeKind::HwInput(HwBus::Spi));

        let mut b = block("lq,input");
        b.properties
            .insert("device-type", PropertyValue::Str("adc".into()));
        assert_eq!(
            ParsedNode::from_block(&b).unwrap().kind,
            NodeKind::HwInput(HwBus::Adc)
        );

        let b = block("lq,input");
        assert_eq!(
            ParsedNode::from_block(&b).unwrap().kind,
            NodeKind::HwInput(HwBus::Sensor)
        );
    }

    #[test]
    fn generic_output_takes_family_from_device() {
        let mut b = block("lq,output");
        b.properties
            .insert("device", PropertyValue::Ref("j1939_bus".into()));
        let node = ParsedNode::from_block(&b).unwrap();
        assert_eq!(node.kind, NodeKind::CyclicOutput);
        assert_eq!(node.properties.str("output-type"), Some("j1939"));
    }

    #[test]
    fn block_without_compatible_is_not_a_node() {
        assert!(ParsedNode::from_block(&Block::new("chosen")).is_none());
    }

    #[test]
    fn output_family_parse() {
        assert_eq!(OutputFamily::parse("J1939"), Some(OutputFamily::J1939));
        assert_eq!(OutputFamily::parse("lin"), None);
        assert_eq!(OutputFamily::Modbus.c_enum(), "LQ_OUTPUT_MODBUS");
        assert_eq!(
            OutputFamily::from_device_name("canopen0"),
            Some(OutputFamily::Canopen)
        );
        assert_eq!(OutputFamily::from_device_name("can1"), Some(OutputFamily::Can));
    }

    #[test]
    fn identity_properties_by_kind() {
        assert_eq!(NodeKind::Merge.identity_properties(), &["signal-id", "output-signal-id"]);
        assert!(NodeKind::CyclicOutput.identity_properties().is_empty());
        assert!(NodeKind::FaultMonitor.produces_signal());
        assert!(!NodeKind::VerifiedOutput.produces_signal());
    }

    #[test]
    fn unit_address_is_hex() {
        let mut b = Block::new("adc");
        b.address = Some("4001".into());
        assert_eq!(b.unit_address(), Some(0x4001));
    }
}
