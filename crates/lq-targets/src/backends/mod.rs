//! One backend per microcontroller family.

mod avr;
mod esp32;
mod nrf52;
mod samd;
mod stm32;

pub use avr::Avr;
pub use esp32::Esp32;
pub use nrf52::Nrf52;
pub use samd::Samd;
pub use stm32::Stm32;

use std::collections::BTreeMap;

use lq_core::HwBus;

use crate::input::HwInput;

/// The sample push every wrapper ends in.
pub(crate) fn push(input: &HwInput, expr: &str) -> String {
    format!("lq_hw_push({}, (uint32_t){expr});", input.signal)
}

/// Inputs on `bus` grouped by peripheral instance, ascending.
pub(crate) fn by_instance(
    inputs: &[HwInput],
    bus: HwBus,
    default: i64,
) -> BTreeMap<i64, Vec<&HwInput>> {
    let mut groups: BTreeMap<i64, Vec<&HwInput>> = BTreeMap::new();
    for input in inputs.iter().filter(|i| i.bus == bus) {
        groups.entry(input.instance_or(default)).or_default().push(input);
    }
    groups
}

/// Opening of `lq_platform_peripherals_init()`.
pub(crate) fn init_open(title: &str) -> String {
    format!("/* {title} peripheral initialization */\nvoid lq_platform_peripherals_init(void)\n{{\n")
}

/// A commented section inside the init function.
pub(crate) fn init_section(code: &mut String, title: &str) {
    if !code.ends_with("{\n") {
        code.push('\n');
    }
    code.push_str(&format!("    /* {title} */\n"));
}

/// Little-endian int32 assembled from four bytes of `buf` starting at `at`.
pub(crate) fn le_i32(buf: &str, at: usize) -> String {
    format!(
        "(int32_t)(((uint32_t){buf}[{}] << 24) | ((uint32_t){buf}[{}] << 16) | ((uint32_t){buf}[{}] << 8) | (uint32_t){buf}[{}])",
        at + 3,
        at + 2,
        at + 1,
        at
    )
}

#[cfg(test)]
pub(crate) mod fixtures {
    use lq_core::Topology;

    use crate::input::HwInput;

    /// Resolve a description and read its hardware inputs.
    pub fn inputs(src: &str) -> Vec<HwInput> {
        let topo: Topology =
            lq_resolve::resolve(&lq_dts::parse_nodes(src).unwrap()).unwrap();
        HwInput::collect(&topo)
    }

    /// One input of every bus, signals 0..=6 in this order.
    pub const EVERY_BUS: &str = r#"
        rpm: adc@0 { compatible = "lq,hw-adc-input"; hw-instance = <1>; hw-channel = <3>; };
        pressure: spi@0 { compatible = "lq,hw-spi-input"; hw-instance = <2>; };
        speed: can@0 { compatible = "lq,hw-can-input"; pgn = <65265>; };
        door: gpio@0 { compatible = "lq,hw-gpio-input"; hw-port = "C"; hw-pin = <7>; };
        temp: i2c@0 { compatible = "lq,hw-i2c-input"; i2c-address = <0x48>; };
        gps: uart@0 { compatible = "lq,hw-uart-input"; hw-instance = <3>; };
        virt: sensor@0 { compatible = "lq,hw-sensor-input"; };
    "#;

    /// Two ADC inputs only.
    pub const TWO_ADC: &str = r#"
        a: adc@0 { compatible = "lq,hw-adc-input"; hw-channel = <0>; };
        b: adc@1 { compatible = "lq,hw-adc-input"; hw-channel = <1>; };
    "#;
}
