//! `lq_generated.h`: declarations shared by application and platform code.

use lq_targets::HwInput;

use super::isr;
use super::item::{Banner, Item};

pub const GUARD: &str = "LQ_GENERATED_H_";

/// Signature of a fault-monitor wake callback.
pub fn wake_signature(name: &str) -> String {
    format!("void {name}(uint8_t monitor_id, int32_t input_value, enum lq_fault_level fault_level)")
}

pub fn generated_header(banner: &Banner, inputs: &[HwInput], wakes: &[String]) -> Vec<Item> {
    let mut items = vec![
        Item::Banner(banner.clone()),
        Item::Blank,
        Item::GuardOpen(GUARD.into()),
        Item::Blank,
        Item::Include {
            path: "lq_resource_bounds.h".into(),
            system: false,
        },
        Item::Include {
            path: "lq_engine.h".into(),
            system: false,
        },
        Item::Blank,
        Item::CppOpen,
        Item::Blank,
        Item::Comment("Engine instance".into()),
        Item::Decl("extern struct lq_engine g_lq_engine".into()),
        Item::Blank,
        Item::Decl("int lq_generated_init(void)".into()),
        Item::Decl("void lq_generated_dispatch_outputs(void)".into()),
        Item::Blank,
        Item::Comment("Provided by lq_platform_<name>.c when built with LQ_PLATFORM_INIT".into()),
        Item::Decl("void lq_platform_peripherals_init(void)".into()),
        Item::Blank,
    ];

    let prototypes = isr::prototypes(inputs);
    if !prototypes.is_empty() {
        items.extend(prototypes);
        items.push(Item::Blank);
    }

    if !wakes.is_empty() {
        items.push(Item::Comment("Fault wake callbacks (weak defaults in lq_generated.c)".into()));
        items.extend(wakes.iter().map(|w| Item::Decl(wake_signature(w))));
        items.push(Item::Blank);
    }

    items.push(Item::CppClose);
    items.push(Item::Blank);
    items.push(Item::GuardClose(GUARD.into()));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::render::render;
    use lq_core::{HwBus, SignalId};

    fn banner() -> Banner {
        Banner {
            source: "demo.dts".into(),
            fingerprint: "feedface00000000".into(),
        }
    }

    #[test]
    fn minimal_header_layout() {
        let text = render(&generated_header(&banner(), &[], &[]));
        assert!(text.starts_with("/*\n * AUTO-GENERATED FILE - DO NOT EDIT\n * Generated by lqc from demo.dts\n"));
        assert!(text.contains("#ifndef LQ_GENERATED_H_\n#define LQ_GENERATED_H_\n"));
        let bounds = text.find("#include \"lq_resource_bounds.h\"").unwrap();
        let engine = text.find("#include \"lq_engine.h\"").unwrap();
        assert!(bounds < engine);
        assert!(text.contains("extern struct lq_engine g_lq_engine;\n"));
        assert!(text.contains("int lq_generated_init(void);\n"));
        assert!(text.contains("void lq_generated_dispatch_outputs(void);\n"));
        assert!(!text.contains("isr"));
        assert!(text.ends_with("#endif /* LQ_GENERATED_H_ */\n"));
    }

    #[test]
    fn declares_entry_points_and_wakes() {
        let inputs = vec![HwInput {
            name: "rpm".into(),
            bus: HwBus::Spi,
            signal: SignalId(0),
            instance: None,
            channel: None,
            pin: None,
            port: None,
            i2c_address: None,
            pgn: None,
        }];
        let text = render(&generated_header(&banner(), &inputs, &["estop".to_string()]));
        assert!(text.contains("void lq_spi_isr_rpm(int32_t value);\n"));
        assert!(text.contains(
            "void estop(uint8_t monitor_id, int32_t input_value, enum lq_fault_level fault_level);\n"
        ));
    }
}
