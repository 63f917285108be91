//! Projection of an imported device onto description blocks.
//!
//! The stub keeps its label and name; `eds-file` is dropped and one child
//! per non-empty PDO is added, each with one `mapping@i` child per entry.
//! Mapping children carry `compatible = "lq,canopen-mapping"` and their
//! reserved `signal-id`, so they enter the node collection as producers.

use lq_core::{Block, PdoDirection, PropertyValue};

use crate::dictionary::EdsDevice;
use crate::pdo::{Pdo, PdoLayout};

/// `transmission-type` of generated PDOs: event-driven, manufacturer specific.
pub const TRANSMISSION_EVENT_DRIVEN: i64 = 254;

/// `event-timer-ms` of generated transmit PDOs.
pub const TPDO_EVENT_TIMER_MS: i64 = 1000;

/// Label used to prefix generated PDO labels.
pub fn stub_label(stub: &Block) -> String {
    stub.label
        .clone()
        .unwrap_or_else(|| stub.name.clone())
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Build the expanded device block that replaces `stub`.
pub fn device_block(stub: &Block, device: &EdsDevice, layout: &PdoLayout) -> Block {
    let mut block = Block::new(stub.name.clone());
    block.label = stub.label.clone();
    block.address = stub.address.clone();

    for (name, value) in stub.properties.iter() {
        if name != "eds-file" {
            block.properties.insert(name, value.clone());
        }
    }
    block
        .properties
        .insert("node-id", PropertyValue::Int(i64::from(layout.node_id)));
    if !device.info.product_name.is_empty() {
        block.properties.insert(
            "product-name",
            PropertyValue::Str(device.info.product_name.clone()),
        );
    }
    if device.info.vendor_number != 0 {
        block.properties.insert(
            "vendor-id",
            PropertyValue::Int(i64::from(device.info.vendor_number)),
        );
    }
    if device.info.product_number != 0 {
        block.properties.insert(
            "product-code",
            PropertyValue::Int(i64::from(device.info.product_number)),
        );
    }

    let prefix = stub_label(stub);
    for pdo in layout.tpdos.iter().chain(layout.rpdos.iter()) {
        block.children.push(pdo_block(&prefix, pdo));
    }
    block
}

fn pdo_block(prefix: &str, pdo: &Pdo) -> Block {
    let name = pdo.name();
    let mut block = Block::new(name.clone());
    block.label = Some(format!("{prefix}_{name}"));
    block.address = Some(pdo.slot.to_string());

    let compatible = match pdo.direction {
        PdoDirection::Transmit => "lq,canopen-tpdo",
        PdoDirection::Receive => "lq,canopen-rpdo",
    };
    let props = &mut block.properties;
    props.insert("compatible", PropertyValue::Str(compatible.into()));
    props.insert("cob-id", PropertyValue::Int(i64::from(pdo.cob_id)));
    props.insert(
        "transmission-type",
        PropertyValue::Int(TRANSMISSION_EVENT_DRIVEN),
    );
    if pdo.direction == PdoDirection::Transmit {
        props.insert("event-timer-ms", PropertyValue::Int(TPDO_EVENT_TIMER_MS));
    }

    for (i, signal) in pdo.signals.iter().enumerate() {
        let mut mapping = Block::new("mapping");
        mapping.address = Some(i.to_string());
        let m = &mut mapping.properties;
        m.insert("compatible", PropertyValue::Str("lq,canopen-mapping".into()));
        m.insert("name", PropertyValue::Str(signal.name.clone()));
        m.insert("index", PropertyValue::Int(i64::from(signal.entry.index)));
        m.insert("subindex", PropertyValue::Int(i64::from(signal.entry.sub_index)));
        m.insert("length", PropertyValue::Int(i64::from(signal.entry.length)));
        m.insert("signal-id", PropertyValue::Int(i64::from(signal.signal.0)));
        block.children.push(mapping);
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use lq_core::{NodeKind, ParsedNode};

    const DRIVE_EDS: &str = include_str!("../testdata/drive.eds");

    fn stub() -> Block {
        let mut b = Block::new("canopen");
        b.label = Some("motor".into());
        b.address = Some("7".into());
        b.properties
            .insert("compatible", PropertyValue::Str("lq,protocol-canopen".into()));
        b.properties
            .insert("eds-file", PropertyValue::Str("drive.eds".into()));
        b.properties.insert("node-id", PropertyValue::Int(7));
        b
    }

    #[test]
    fn expanded_block_shape() {
        let device = EdsDevice::parse(DRIVE_EDS).unwrap();
        let layout = PdoLayout::new(&device, 7);
        let block = device_block(&stub(), &device, &layout);

        assert!(!block.properties.contains("eds-file"));
        assert_eq!(block.properties.int("vendor-id"), Some(0x1AB));
        assert_eq!(block.children.len(), 1);

        let tpdo = &block.children[0];
        assert_eq!(tpdo.label.as_deref(), Some("motor_tpdo1"));
        assert_eq!(tpdo.properties.int("cob-id"), Some(0x187));
        assert_eq!(tpdo.properties.int("event-timer-ms"), Some(1000));
        assert_eq!(tpdo.children.len(), 2);
        assert_eq!(tpdo.children[1].properties.int("signal-id"), Some(101));
    }

    #[test]
    fn mapping_children_become_producers() {
        let device = EdsDevice::parse(DRIVE_EDS).unwrap();
        let layout = PdoLayout::new(&device, 7);
        let block = device_block(&stub(), &device, &layout);
        let kinds: Vec<_> = block
            .walk()
            .into_iter()
            .filter_map(ParsedNode::from_block)
            .map(|n| n.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::CanopenDevice,
                NodeKind::CanopenPdo(PdoDirection::Transmit),
                NodeKind::CanopenMapping,
                NodeKind::CanopenMapping,
            ]
        );
    }
}
