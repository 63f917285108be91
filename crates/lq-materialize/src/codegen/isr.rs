//! Portable interrupt entry points, one per hardware input.
//!
//! Platform code calls `lq_<bus>_isr_<label>(value)` with a raw sample; the
//! entry point forwards it to the hardware-input ring buffer under the
//! input's signal identity.

use lq_core::HwBus;
use lq_targets::HwInput;

use super::item::{Function, Item, Stmt};

/// C type of the raw sample delivered by a bus.
pub fn sample_type(bus: HwBus) -> &'static str {
    match bus {
        HwBus::Adc | HwBus::I2c => "uint16_t",
        HwBus::Spi | HwBus::Can | HwBus::Sensor => "int32_t",
        HwBus::Gpio => "bool",
        HwBus::Uart => "uint8_t",
    }
}

/// `void lq_<bus>_isr_<name>(<type> value)`
pub fn signature(input: &HwInput) -> String {
    format!(
        "void lq_{}_isr_{}({} value)",
        input.bus,
        input.name,
        sample_type(input.bus)
    )
}

/// Prototypes for the generated header.
pub fn prototypes(inputs: &[HwInput]) -> Vec<Item> {
    if inputs.is_empty() {
        return Vec::new();
    }
    let mut items = vec![Item::Comment("Hardware input entry points".into())];
    items.extend(inputs.iter().map(|i| Item::Decl(signature(i))));
    items
}

/// Definitions for the generated source.
pub fn definitions(inputs: &[HwInput]) -> Vec<Item> {
    let mut items = Vec::new();
    for input in inputs {
        items.push(Item::Function(
            Function::new(signature(input))
                .doc(format!("{} sample for {}", input.bus.as_str().to_uppercase(), input.name))
                .body(vec![Stmt::line(format!(
                    "lq_hw_push({}, (uint32_t)value);",
                    input.signal.index()
                ))]),
        ));
        items.push(Item::Blank);
    }
    items
}
