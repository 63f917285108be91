//! C header of `SIG_<NAME>` identities for imported PDO signals.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::pdo::{Pdo, PdoLayout};

/// Upper-case a parameter name into a C identifier fragment.
///
/// Spaces and dashes become `_`; other non-alphanumerics are dropped.
pub fn sanitize_name(name: &str) -> String {
    name.to_uppercase()
        .chars()
        .filter_map(|c| match c {
            ' ' | '-' | '_' => Some('_'),
            c if c.is_ascii_alphanumeric() => Some(c),
            _ => None,
        })
        .collect()
}

/// Include guard for a header file name: `lq_signals.h` -> `LQ_SIGNALS_H`.
pub fn header_guard(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// One imported device as seen by the header: its label and layout.
#[derive(Debug, Clone, Copy)]
pub struct DeviceSignals<'a> {
    pub label: &'a str,
    pub product: &'a str,
    pub layout: &'a PdoLayout,
}

/// Render the header: per device, receive signals then transmit signals.
///
/// A name that repeats is suffixed with its identity so the header never
/// redefines a macro.
pub fn signals_header(guard: &str, devices: &[DeviceSignals<'_>]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "/* AUTO-GENERATED FILE - DO NOT EDIT */");
    let _ = writeln!(out, "/* CANopen PDO signal identities */");
    let _ = writeln!(out);
    let _ = writeln!(out, "#ifndef {guard}");
    let _ = writeln!(out, "#define {guard}");

    let mut used = BTreeSet::new();
    for device in devices {
        let _ = writeln!(out);
        if device.product.is_empty() {
            let _ = writeln!(out, "/* {} */", device.label);
        } else {
            let _ = writeln!(out, "/* {}: {} */", device.label, device.product);
        }
        let _ = writeln!(out, "/* RPDO signals (commands from master) */");
        define_all(&mut out, &mut used, &device.layout.rpdos);
        let _ = writeln!(out, "/* TPDO signals (status to master) */");
        define_all(&mut out, &mut used, &device.layout.tpdos);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "#endif /* {guard} */");
    out
}

fn define_all(out: &mut String, used: &mut BTreeSet<String>, pdos: &[Pdo]) {
    for pdo in pdos {
        for signal in &pdo.signals {
            let mut name = format!("SIG_{}", sanitize_name(&signal.name));
            if !used.insert(name.clone()) {
                name = format!("{name}_{}", signal.signal);
                used.insert(name.clone());
            }
            let _ = writeln!(
                out,
                "#define {name:<40} {:>3}  /* {}: {} */",
                signal.signal,
                pdo.name().to_uppercase(),
                signal.name
            );
        }
    }
}
