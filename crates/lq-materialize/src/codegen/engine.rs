//! The inline-initialized engine instance.
//!
//! Every array entry is built from resolved properties alone. Optional
//! properties fall back to fixed defaults, and every value is checked against
//! the width of the C field it lands in.

use lq_core::{ResolvedNode, SignalId, Topology};

use super::dispatch::output_family;
use super::item::{Fields, Init, Item};
use crate::error::{MaterializationError, Result};

/// Capacity of `lq_merge_ctx.input_signals`.
pub const MAX_MERGE_INPUTS: usize = 8;

/// `struct lq_engine g_lq_engine = { ... };`
pub fn engine_global(topology: &Topology) -> Result<Item> {
    let merges = topology.merges();
    let remaps = topology.remaps();
    let scales = topology.scales();
    let monitors = topology.fault_monitors();
    let verified = topology.verified_outputs();
    let pids = topology.pids();
    let cyclic = topology.cyclic_outputs();

    let signals = topology.signal_count();
    if signals > u32::from(u8::MAX) {
        return Err(MaterializationError::OutOfRange {
            node: "engine".into(),
            field: "num_signals",
            value: i64::from(signals),
            width: "uint8_t",
        });
    }

    let mut init = Fields::new()
        .expr("num_signals", signals)
        .expr("num_merges", count(&merges, "num_merges")?)
        .expr("num_remaps", count(&remaps, "num_remaps")?)
        .expr("num_scales", count(&scales, "num_scales")?)
        .expr("num_fault_monitors", count(&monitors, "num_fault_monitors")?)
        .expr("num_verified_outputs", count(&verified, "num_verified_outputs")?)
        .expr("num_pids", count(&pids, "num_pids")?)
        .expr("num_cyclic_outputs", count(&cyclic, "num_cyclic_outputs")?);

    init = array(init, "merges", &merges, merge)?;
    init = array(init, "remaps", &remaps, remap)?;
    init = array(init, "scales", &scales, scale)?;
    init = array(init, "fault_monitors", &monitors, fault_monitor)?;
    init = array(init, "verified_outputs", &verified, verified_output)?;
    init = array(init, "pids", &pids, pid)?;
    init = array(init, "cyclic_outputs", &cyclic, cyclic_output)?;

    Ok(Item::Global {
        decl: "struct lq_engine g_lq_engine".into(),
        init: init.build(),
    })
}

/// Wake callbacks named by fault monitors, first mention first, each once.
pub fn wake_callbacks(topology: &Topology) -> Result<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    for node in topology.fault_monitors() {
        if let Some(name) = wake(node)? {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}

fn count(nodes: &[&ResolvedNode], field: &'static str) -> Result<usize> {
    if nodes.len() > usize::from(u8::MAX) {
        return Err(MaterializationError::OutOfRange {
            node: "engine".into(),
            field,
            value: nodes.len() as i64,
            width: "uint8_t",
        });
    }
    Ok(nodes.len())
}

/// Appends `.name = { [i] = ... }` when `nodes` is non-empty.
fn array(
    init: Fields,
    name: &str,
    nodes: &[&ResolvedNode],
    entry: fn(&ResolvedNode) -> Result<Init>,
) -> Result<Fields> {
    if nodes.is_empty() {
        return Ok(init);
    }
    let entries = nodes.iter().map(|n| entry(n)).collect::<Result<Vec<_>>>()?;
    Ok(init.field(name, Init::Indexed(entries)))
}

fn merge(node: &ResolvedNode) -> Result<Init> {
    let inputs = node.signal_refs("input-signal-ids");
    if inputs.len() > MAX_MERGE_INPUTS {
        return Err(invalid(
            node,
            "inputs",
            format!("lists {} signals; at most {MAX_MERGE_INPUTS} are supported", inputs.len()),
        ));
    }
    let list = inputs
        .iter()
        .map(|id| signal_id(node, "input_signals", *id).map(|v| v.to_string()))
        .collect::<Result<Vec<_>>>()?;

    Ok(Fields::new()
        .field("input_signals", Init::List(list))
        .expr("num_inputs", inputs.len())
        .field("output_signal", own_signal(node)?)
        .expr("voting_method", voting_method(node)?)
        .field("tolerance", unsigned(node, "tolerance", "tolerance", 0, u32::MAX.into())?)
        .field("stale_us", unsigned(node, "stale-us", "stale_us", 0, i64::MAX)?)
        .flag("enabled", true)
        .build())
}

fn fault_monitor(node: &ResolvedNode) -> Result<Init> {
    let stale_timeout = unsigned_value(node, "stale-timeout-us", "stale_timeout_us", 0, i64::MAX)?;
    let check_range = node.properties.contains("min-value") || node.properties.contains("max-value");
    let level = node.int_or("fault-level", 1);
    if !(0..=3).contains(&level) {
        return Err(MaterializationError::OutOfRange {
            node: node.display_name().to_string(),
            field: "fault_level",
            value: level,
            width: "lq_fault_level (0..=3)",
        });
    }
    let has_limp = node.properties.contains("limp-target-scale-id");

    Ok(Fields::new()
        .field("input_signal", referenced(node, "input-signal-id", "input_signal")?)
        .field("fault_output_signal", own_signal(node)?)
        .flag("check_staleness", stale_timeout > 0)
        .expr("stale_timeout_us", stale_timeout)
        .flag("check_range", check_range)
        .field("min_value", int32(node, "min-value", "min_value", i64::from(i32::MIN))?)
        .field("max_value", int32(node, "max-value", "max_value", i64::from(i32::MAX))?)
        .flag("check_status", node.flag("check-status"))
        .expr("fault_level", format!("LQ_FAULT_LEVEL_{level}"))
        .expr("wake", wake(node)?.unwrap_or("NULL"))
        .flag("has_limp_action", has_limp)
        .field(
            "limp_target_scale_id",
            unsigned(node, "limp-target-scale-id", "limp_target_scale_id", 0, u8::MAX.into())?,
        )
        .field("limp_scale_factor", int32(node, "limp-scale-factor", "limp_scale_factor", i64::from(i32::MIN))?)
        .field("limp_clamp_max", int32(node, "limp-clamp-max", "limp_clamp_max", i64::from(i32::MIN))?)
        .field("limp_clamp_min", int32(node, "limp-clamp-min", "limp_clamp_min", i64::from(i32::MIN))?)
        .field(
            "restore_delay_ms",
            unsigned(node, "restore-delay-ms", "restore_delay_ms", 0, u32::MAX.into())?,
        )
        .flag("enabled", true)
        .build())
}

fn scale(node: &ResolvedNode) -> Result<Init> {
    Ok(Fields::new()
        .field("input_signal", referenced(node, "input-signal-id", "input_signal")?)
        .field("output_signal", own_signal(node)?)
        .field("scale_factor", int32(node, "scale-factor", "scale_factor", 1000)?)
        .field("offset", int32(node, "offset", "offset", 0)?)
        .field("clamp_min", int32(node, "clamp-min", "clamp_min", 0)?)
        .field("clamp_max", int32(node, "clamp-max", "clamp_max", 0)?)
        .flag("has_clamp_min", node.properties.contains("clamp-min"))
        .flag("has_clamp_max", node.properties.contains("clamp-max"))
        .flag("enabled", true)
        .build())
}

fn remap(node: &ResolvedNode) -> Result<Init> {
    Ok(Fields::new()
        .field("input_signal", referenced(node, "input-signal-id", "input_signal")?)
        .field("output_signal", own_signal(node)?)
        .flag("invert", node.flag("invert"))
        .field("deadzone", int32(node, "deadzone", "deadzone", 0)?)
        .flag("enabled", true)
        .build())
}

fn pid(node: &ResolvedNode) -> Result<Init> {
    let min = i64::from(i32::MIN);
    let max = i64::from(i32::MAX);
    Ok(Fields::new()
        .field("setpoint_signal", referenced(node, "setpoint-signal-id", "setpoint_signal")?)
        .field(
            "measurement_signal",
            referenced(node, "measurement-signal-id", "measurement_signal")?,
        )
        .field("output_signal", own_signal(node)?)
        .field("kp", int32(node, "kp", "kp", 0)?)
        .field("ki", int32(node, "ki", "ki", 0)?)
        .field("kd", int32(node, "kd", "kd", 0)?)
        .field("output_min", int32(node, "output-min", "output_min", min)?)
        .field("output_max", int32(node, "output-max", "output_max", max)?)
        .field("integral_min", int32(node, "integral-min", "integral_min", min)?)
        .field("integral_max", int32(node, "integral-max", "integral_max", max)?)
        .field("deadband", int32(node, "deadband", "deadband", 0)?)
        .field("sample_time_us", unsigned(node, "sample-time-us", "sample_time_us", 10_000, i64::MAX)?)
        .flag("reset_on_setpoint_change", node.flag("reset-on-setpoint-change"))
        .flag("enabled", true)
        .build())
}

fn verified_output(node: &ResolvedNode) -> Result<Init> {
    let output_type = match node.str("output-type").unwrap_or("gpio") {
        "gpio" => "LQ_VERIFIED_GPIO",
        "pwm" => "LQ_VERIFIED_PWM",
        "analog" => "LQ_VERIFIED_ANALOG",
        "position" => "LQ_VERIFIED_POSITION",
        "speed" => "LQ_VERIFIED_SPEED",
        other => {
            return Err(invalid(
                node,
                "output-type",
                format!("'{other}' is not one of gpio, pwm, analog, position, speed"),
            ))
        }
    };
    Ok(Fields::new()
        .field("command_signal", referenced(node, "command-signal-id", "command_signal")?)
        .field(
            "verification_signal",
            referenced(node, "verification-signal-id", "verification_signal")?,
        )
        .field("output_signal", referenced(node, "output-signal-id", "output_signal")?)
        .expr("output_type", output_type)
        .field("tolerance", int32(node, "tolerance", "tolerance", 0)?)
        .field(
            "verify_timeout_us",
            unsigned(node, "verify-timeout-us", "verify_timeout_us", 100_000, i64::MAX)?,
        )
        .flag("continuous_verify", node.flag("continuous-verify"))
        .flag("enabled", true)
        .build())
}

fn cyclic_output(node: &ResolvedNode) -> Result<Init> {
    let family = output_family(node)?;
    let target = node
        .int("target-id")
        .or_else(|| node.int("pgn"))
        .or_else(|| node.int("cob-id"))
        .unwrap_or(0);
    let target = within(node, "target_id", target, 0, u32::MAX.into(), "uint32_t")?;

    Ok(Fields::new()
        .expr("type", family.c_enum())
        .expr("target_id", target)
        .field("device_index", unsigned(node, "device-index", "device_index", 0, u8::MAX.into())?)
        .field("source_signal", referenced(node, "source-signal-id", "source_signal")?)
        .field("period_us", unsigned(node, "period-us", "period_us", 100_000, i64::MAX)?)
        .field("next_deadline", unsigned(node, "deadline-offset-us", "next_deadline", 0, i64::MAX)?)
        .field("flags", unsigned(node, "flags", "flags", 0, u32::MAX.into())?)
        .flag("enabled", true)
        .build())
}

fn voting_method(node: &ResolvedNode) -> Result<&'static str> {
    let method = match node.properties.get("voting-method") {
        None => return Ok("LQ_VOTE_MEDIAN"),
        Some(value) => match (value.as_str(), value.as_int()) {
            (Some(name), _) => name.to_string(),
            (None, Some(n)) => n.to_string(),
            _ => String::new(),
        },
    };
    match method.as_str() {
        "median" | "0" => Ok("LQ_VOTE_MEDIAN"),
        "average" | "1" => Ok("LQ_VOTE_AVERAGE"),
        "min" | "2" => Ok("LQ_VOTE_MIN"),
        "max" | "3" => Ok("LQ_VOTE_MAX"),
        other => Err(invalid(
            node,
            "voting-method",
            format!("'{other}' is not one of median, average, min, max"),
        )),
    }
}

fn wake(node: &ResolvedNode) -> Result<Option<&str>> {
    let Some(name) = node.str("wake") else {
        return Ok(None);
    };
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(invalid(node, "wake", format!("'{name}' is not a C identifier")));
    }
    Ok(Some(name))
}

fn own_signal(node: &ResolvedNode) -> Result<Init> {
    let id = node.signal.unwrap_or(SignalId(0));
    signal_id(node, "output_signal", id).map(Init::int)
}

fn referenced(node: &ResolvedNode, property: &str, field: &'static str) -> Result<Init> {
    let id = node.signal_ref(property).unwrap_or(SignalId(0));
    signal_id(node, field, id).map(Init::int)
}

fn signal_id(node: &ResolvedNode, field: &'static str, id: SignalId) -> Result<u32> {
    within(node, field, i64::from(id.index()), 0, u8::MAX.into(), "uint8_t").map(|v| v as u32)
}

fn int32(node: &ResolvedNode, property: &str, field: &'static str, default: i64) -> Result<Init> {
    let value = within(
        node,
        field,
        node.int_or(property, default),
        i32::MIN.into(),
        i32::MAX.into(),
        "int32_t",
    )?;
    Ok(Init::Expr(match value {
        v if v == i64::from(i32::MIN) => "INT32_MIN".to_string(),
        v if v == i64::from(i32::MAX) => "INT32_MAX".to_string(),
        v => v.to_string(),
    }))
}

fn unsigned(
    node: &ResolvedNode,
    property: &str,
    field: &'static str,
    default: i64,
    max: i64,
) -> Result<Init> {
    unsigned_value(node, property, field, default, max).map(Init::int)
}

fn unsigned_value(
    node: &ResolvedNode,
    property: &str,
    field: &'static str,
    default: i64,
    max: i64,
) -> Result<i64> {
    let width = match max {
        m if m == i64::from(u8::MAX) => "uint8_t",
        m if m == i64::from(u32::MAX) => "uint32_t",
        _ => "uint64_t",
    };
    within(node, field, node.int_or(property, default), 0, max, width)
}

fn within(
    node: &ResolvedNode,
    field: &'static str,
    value: i64,
    min: i64,
    max: i64,
    width: &'static str,
) -> Result<i64> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(MaterializationError::OutOfRange {
            node: node.display_name().to_string(),
            field,
            value,
            width,
        })
    }
}

fn invalid(node: &ResolvedNode, property: &str, detail: String) -> MaterializationError {
    MaterializationError::InvalidProperty {
        node: node.display_name().to_string(),
        property: property.to_string(),
        detail,
    }
}
