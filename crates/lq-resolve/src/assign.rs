//! Signal identity assignment.
//!
//! 1. Producers that declare an identity keep it. Two producers declaring the
//!    same identity is an error.
//! 2. The counter starts one past the largest explicit identity (0 if none).
//! 3. Hardware inputs, transforms and unpinned PDO mappings take the next
//!    counter value in declaration order.
//! 4. Fault monitors take the next values for their fault outputs, in
//!    declaration order.

use std::collections::BTreeMap;

use log::debug;

use lq_core::{NodeKind, ParsedNode, PropertyValue, SignalId};

use crate::error::{ResolveError, Result};

/// Assign an identity to every producer. Entry `i` belongs to `nodes[i]`.
pub fn assign_identities(nodes: &[ParsedNode]) -> Result<Vec<Option<SignalId>>> {
    let mut ids: Vec<Option<SignalId>> = vec![None; nodes.len()];
    let mut owners: BTreeMap<SignalId, usize> = BTreeMap::new();

    for (i, node) in nodes.iter().enumerate() {
        if !node.kind.produces_signal() {
            continue;
        }
        let Some(id) = explicit_identity(node)? else {
            continue;
        };
        if let Some(&first) = owners.get(&id) {
            return Err(ResolveError::DuplicateSignal {
                id: id.0,
                first: nodes[first].display_name().to_string(),
                second: node.display_name().to_string(),
            });
        }
        owners.insert(id, i);
        ids[i] = Some(id);
    }
    let explicit = owners.len();

    // `None` once the counter has run past `SignalId::MAX`.
    let mut next = match owners.keys().next_back() {
        Some(largest) => largest.checked_next(),
        None => Some(SignalId(0)),
    };

    let monitor = |k: &NodeKind| *k == NodeKind::FaultMonitor;
    for pass_is_monitor in [false, true] {
        for (i, node) in nodes.iter().enumerate() {
            if ids[i].is_some() || !node.kind.produces_signal() {
                continue;
            }
            if monitor(&node.kind) != pass_is_monitor {
                continue;
            }
            let Some(id) = next else {
                return Err(ResolveError::IdentityOverflow {
                    node: node.display_name().to_string(),
                    id: u64::from(SignalId::MAX.index()) + 1,
                    max: SignalId::MAX.index(),
                });
            };
            ids[i] = Some(id);
            next = id.checked_next();
        }
    }

    debug!(
        "assigned {} signal(s): {} explicit",
        ids.iter().flatten().count(),
        explicit
    );
    Ok(ids)
}

/// The identity a node pins for itself, if any.
fn explicit_identity(node: &ParsedNode) -> Result<Option<SignalId>> {
    for &name in node.kind.identity_properties() {
        let Some(value) = node.properties.get(name) else {
            continue;
        };
        let raw = value
            .as_int()
            .and_then(|v| u64::try_from(v).ok())
            .ok_or_else(|| ResolveError::WrongPropertyType {
                node: node.display_name().to_string(),
                property: name.to_string(),
                expected: "a non-negative integer",
                found: found_name(value),
            })?;
        let max = SignalId::MAX.index();
        return match u32::try_from(raw) {
            Ok(id) if id <= max => Ok(Some(SignalId(id))),
            _ => Err(ResolveError::IdentityOverflow {
                node: node.display_name().to_string(),
                id: raw,
                max,
            }),
        };
    }
    Ok(None)
}

fn found_name(value: &PropertyValue) -> &'static str {
    match value {
        PropertyValue::Int(_) | PropertyValue::IntArray(_) => "a negative integer",
        other => other.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(src: &str) -> Vec<Option<u32>> {
        let nodes = lq_dts::parse_nodes(src).unwrap();
        assign_identities(&nodes)
            .unwrap()
            .into_iter()
            .map(|id| id.map(|s| s.0))
            .collect()
    }

    #[test]
    fn declaration_order_from_zero() {
        let got = ids(
            "a { compatible = \"lq,hw-adc-input\"; };
             f { compatible = \"lq,fault-monitor\"; };
             b { compatible = \"lq,hw-adc-input\"; };
             o { compatible = \"lq,cyclic-output\"; };
             s { compatible = \"lq,scale\"; };",
        );
        // Monitors come after every input and transform.
        assert_eq!(got, vec![Some(0), Some(3), Some(1), None, Some(2)]);
    }

    #[test]
    fn counter_starts_past_explicit_identities() {
        let got = ids(
            "a { compatible = \"lq,hw-adc-input\"; };
             b { compatible = \"lq,hw-adc-input\"; signal-id = <10>; };
             m { compatible = \"lq,merge\"; output-signal-id = <4>; };
             c { compatible = \"lq,hw-adc-input\"; };",
        );
        assert_eq!(got, vec![Some(11), Some(10), Some(4), Some(12)]);
    }

    #[test]
    fn duplicate_explicit_identity() {
        let nodes = lq_dts::parse_nodes(
            "a: x { compatible = \"lq,hw-adc-input\"; signal-id = <3>; };
             b: y { compatible = \"lq,scale\"; signal-id = <3>; };",
        )
        .unwrap();
        assert_eq!(
            assign_identities(&nodes).unwrap_err(),
            ResolveError::DuplicateSignal {
                id: 3,
                first: "a".into(),
                second: "b".into()
            }
        );
    }

    #[test]
    fn identity_must_be_an_integer() {
        let nodes =
            lq_dts::parse_nodes("a: x { compatible = \"lq,hw-adc-input\"; signal-id = \"3\"; };")
                .unwrap();
        assert!(matches!(
            assign_identities(&nodes).unwrap_err(),
            ResolveError::WrongPropertyType { found: "string", .. }
        ));
    }

    #[test]
    fn identity_past_the_limit() {
        let nodes = lq_dts::parse_nodes(
            "a: x { compatible = \"lq,hw-adc-input\"; signal-id = <4294967295>; };",
        )
        .unwrap();
        assert_eq!(
            assign_identities(&nodes).unwrap_err(),
            ResolveError::IdentityOverflow {
                node: "a".into(),
                id: 4_294_967_295,
                max: 4_294_967_294,
            }
        );
    }

    #[test]
    fn counter_runs_out_after_the_largest_identity() {
        let nodes = lq_dts::parse_nodes(
            "a: x { compatible = \"lq,hw-adc-input\"; signal-id = <4294967293>; };
             b: y { compatible = \"lq,hw-adc-input\"; };
             c: z { compatible = \"lq,hw-adc-input\"; };",
        )
        .unwrap();
        assert!(matches!(
            assign_identities(&nodes).unwrap_err(),
            ResolveError::IdentityOverflow { ref node, .. } if node == "c"
        ));
    }

    #[test]
    fn non_producers_ignore_signal_id() {
        let got = ids("o { compatible = \"lq,cyclic-output\"; signal-id = <5>; };
                       a { compatible = \"lq,hw-adc-input\"; };");
        assert_eq!(got, vec![None, Some(0)]);
    }
}
