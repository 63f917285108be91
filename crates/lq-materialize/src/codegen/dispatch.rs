//! Output dispatch: queued engine events to transport calls.
//!
//! Only the transports of protocol families the topology actually uses are
//! declared and switched on. A cyclic output whose `output-type` has no
//! encoding here is rejected at compile time instead of being dropped at
//! run time.

use std::collections::BTreeSet;

use lq_core::{OutputFamily, ResolvedNode, Topology};

use super::item::{Function, Item, Stmt};
use crate::error::{MaterializationError, Result};

/// Family of a cyclic output. Outputs without `output-type` are raw CAN.
pub fn output_family(node: &ResolvedNode) -> Result<OutputFamily> {
    match node.str("output-type") {
        None => Ok(OutputFamily::Can),
        Some(name) => {
            OutputFamily::parse(name).ok_or_else(|| MaterializationError::UnsupportedOutputFamily {
                node: node.display_name().to_string(),
                family: name.to_string(),
            })
        }
    }
}

/// Every family in use, in a fixed order.
pub fn families_used(topology: &Topology) -> Result<BTreeSet<OutputFamily>> {
    topology
        .cyclic_outputs()
        .into_iter()
        .map(output_family)
        .collect()
}

/// Headers needed by the encodings of `families`.
pub fn includes(families: &BTreeSet<OutputFamily>) -> Vec<Item> {
    let mut items = Vec::new();
    if families.contains(&OutputFamily::J1939) {
        items.push(Item::Include {
            path: "lq_j1939.h".into(),
            system: false,
        });
    }
    items
}

/// Transport prototypes for `families`, each declared once.
pub fn transport_decls(families: &BTreeSet<OutputFamily>) -> Vec<Item> {
    let mut decls: Vec<&str> = Vec::new();
    for family in families {
        let decl = match family {
            OutputFamily::Can | OutputFamily::J1939 | OutputFamily::Canopen => {
                "extern int lq_can_send(uint32_t can_id, bool is_extended, const uint8_t *data, uint8_t len)"
            }
            OutputFamily::Gpio => "extern int lq_gpio_set(uint8_t pin, bool value)",
            OutputFamily::Uart => {
                "extern int lq_uart_send(uint8_t port, const uint8_t *data, uint16_t length)"
            }
            OutputFamily::Spi => {
                "extern int lq_spi_send(uint8_t cs_pin, const uint8_t *data, uint16_t length)"
            }
            OutputFamily::I2c => {
                "extern int lq_i2c_write(uint8_t address, const uint8_t *data, uint16_t length)"
            }
            OutputFamily::Pwm => {
                "extern int lq_pwm_set(uint8_t channel, uint16_t duty_cycle, uint32_t frequency_hz)"
            }
            OutputFamily::Dac => "extern int lq_dac_write(uint8_t channel, uint16_t value)",
            OutputFamily::Modbus => {
                "extern int lq_modbus_write(uint8_t slave_id, uint16_t reg, uint16_t value)"
            }
        };
        if !decls.contains(&decl) {
            decls.push(decl);
        }
    }
    if decls.is_empty() {
        return Vec::new();
    }
    let mut items = vec![Item::Comment(
        "Transport calls, provided by the platform layer".into(),
    )];
    items.extend(decls.into_iter().map(|d| Item::Decl(d.to_string())));
    items
}

/// `lq_generated_dispatch_outputs()`.
pub fn dispatch_function(families: &BTreeSet<OutputFamily>) -> Function {
    let function = Function::new("void lq_generated_dispatch_outputs(void)")
        .doc("Forward queued output events to their transports");
    if families.is_empty() {
        return function.body(vec![Stmt::line("/* no cyclic outputs declared */")]);
    }

    let mut cases: Vec<Stmt> = families
        .iter()
        .map(|family| {
            let mut body = encoding(*family);
            body.push(Stmt::line("break;"));
            Stmt::block(format!("case {}:", family.c_enum()), body)
        })
        .collect();
    cases.push(Stmt::block("default:", vec![Stmt::line("break;")]));

    function.body(vec![Stmt::block(
        "for (size_t i = 0; i < g_lq_engine.out_event_count; i++)",
        vec![
            Stmt::line("const struct lq_output_event *evt = &g_lq_engine.out_events[i];"),
            Stmt::Blank,
            Stmt::block("switch (evt->type)", cases),
        ],
    )])
}

/// `value` split into four little-endian bytes of `buf`.
fn le32(buf: &str) -> Vec<Stmt> {
    (0..4)
        .map(|i| {
            let shift = if i == 0 {
                "evt->value".to_string()
            } else {
                format!("(evt->value >> {})", i * 8)
            };
            Stmt::line(format!("{buf}[{i}] = (uint8_t)({shift} & 0xFF);"))
        })
        .collect()
}

fn with_payload(len: usize, call: &str) -> Vec<Stmt> {
    let mut body = vec![Stmt::line(if len == 4 {
        "uint8_t data[4];".to_string()
    } else {
        format!("uint8_t data[{len}] = {{0}};")
    })];
    body.extend(le32("data"));
    body.push(Stmt::line(call));
    body
}

fn encoding(family: OutputFamily) -> Vec<Stmt> {
    match family {
        OutputFamily::Can => with_payload(
            4,
            "lq_can_send(evt->target_id & 0x7FF, false, data, 4);",
        ),
        OutputFamily::J1939 => {
            let mut body = with_payload(
                8,
                "lq_can_send(lq_j1939_build_id_from_pgn(evt->target_id, 6, 0), true, data, 8);",
            );
            body.insert(0, Stmt::line("/* 29-bit id from PGN, priority 6, source address 0 */"));
            body
        }
        OutputFamily::Canopen => with_payload(
            4,
            "lq_can_send(evt->target_id & 0x7FF, false, data, 4);  /* COB-ID */",
        ),
        OutputFamily::Gpio => vec![Stmt::line(
            "lq_gpio_set((uint8_t)evt->target_id, evt->value != 0);",
        )],
        OutputFamily::Uart => with_payload(4, "lq_uart_send((uint8_t)evt->target_id, data, 4);"),
        OutputFamily::Spi => with_payload(4, "lq_spi_send((uint8_t)evt->target_id, data, 4);"),
        OutputFamily::I2c => with_payload(4, "lq_i2c_write((uint8_t)evt->target_id, data, 4);"),
        OutputFamily::Pwm => vec![Stmt::line(
            "lq_pwm_set((uint8_t)evt->target_id, (uint16_t)evt->value, evt->flags);",
        )],
        OutputFamily::Dac => vec![Stmt::line(
            "lq_dac_write((uint8_t)evt->target_id, (uint16_t)evt->value);",
        )],
        OutputFamily::Modbus => vec![
            Stmt::line("/* slave id in bits 16..23, register in bits 0..15 */"),
            Stmt::line(
                "lq_modbus_write((uint8_t)((evt->target_id >> 16) & 0xFF), (uint16_t)(evt->target_id & 0xFFFF), (uint16_t)evt->value);",
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::render::render;

    fn topology(src: &str) -> Topology {
        lq_resolve::resolve(&lq_dts::parse_nodes(src).unwrap()).unwrap()
    }

    #[test]
    fn only_used_families_are_declared() {
        let topo = topology(
            r#"
            a: i { compatible = "lq,hw-adc-input"; };
            o1 { compatible = "lq,cyclic-output"; source = <&a>; output-type = "j1939"; };
            o2 { compatible = "lq,cyclic-output"; source = <&a>; output-type = "gpio"; };
            "#,
        );
        let families = families_used(&topo).unwrap();
        assert_eq!(
            families.iter().copied().collect::<Vec<_>>(),
            vec![OutputFamily::J1939, OutputFamily::Gpio]
        );

        let decls = render(&transport_decls(&families));
        assert!(decls.contains("lq_can_send"));
        assert!(decls.contains("lq_gpio_set"));
        assert!(!decls.contains("lq_uart_send"));
        assert!(!decls.contains("lq_modbus_write"));

        let dispatch = render(&[Item::Function(dispatch_function(&families))]);
        assert!(dispatch.contains("case LQ_OUTPUT_J1939: {"));
        assert!(dispatch.contains("lq_j1939_build_id_from_pgn(evt->target_id, 6, 0), true, data, 8"));
        assert!(dispatch.contains("evt->value != 0"));
        assert!(!dispatch.contains("LQ_OUTPUT_CAN:"));
    }

    #[test]
    fn can_shares_one_transport_declaration() {
        let families: BTreeSet<_> =
            [OutputFamily::Can, OutputFamily::J1939, OutputFamily::Canopen].into();
        let decls = render(&transport_decls(&families));
        assert_eq!(decls.matches("lq_can_send").count(), 1);
    }

    #[test]
    fn payload_is_little_endian() {
        let text = render(&[Item::Function(dispatch_function(
            &[OutputFamily::Uart].into(),
        ))]);
        assert!(text.contains("data[0] = (uint8_t)(evt->value & 0xFF);"));
        assert!(text.contains("data[3] = (uint8_t)((evt->value >> 24) & 0xFF);"));
    }

    #[test]
    fn unknown_family_is_a_compile_error() {
        let topo = topology(
            r#"a: i { compatible = "lq,hw-adc-input"; };
               beacon: o { compatible = "lq,cyclic-output"; source = <&a>; output-type = "lin"; };"#,
        );
        match families_used(&topo).unwrap_err() {
            MaterializationError::UnsupportedOutputFamily { node, family } => {
                assert_eq!(node, "beacon");
                assert_eq!(family, "lin");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn no_outputs_means_no_transports() {
        let families = BTreeSet::new();
        assert!(transport_decls(&families).is_empty());
        let text = render(&[Item::Function(dispatch_function(&families))]);
        assert!(text.contains("no cyclic outputs declared"));
        assert!(!text.contains("switch"));
    }
}
