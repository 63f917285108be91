//! `ParsedNode -> ResolvedNode`.

use log::{debug, warn};
use serde::Serialize;

use lq_core::{NodeKind, ParsedNode, PropertyValue, ResolvedNode, SignalId, Topology};

use crate::assign::assign_identities;
use crate::error::{ResolveError, Result};
use crate::references::{ref_specs, Arity, RefSpec, Target};
use crate::symbol::SymbolTable;

/// Resolve a node collection into a topology.
///
/// Identities are assigned first, then every reference property is rewritten
/// into its canonical `*-id` / `*-ids` form. Any failure aborts the whole
/// resolution.
pub fn resolve(nodes: &[ParsedNode]) -> Result<Topology> {
    let table = SymbolTable::build(nodes)?;
    let ids = assign_identities(nodes)?;
    let ctx = Context {
        nodes,
        table: &table,
        ids: &ids,
    };

    let mut resolved = Vec::with_capacity(nodes.len());
    for (index, node) in nodes.iter().enumerate() {
        let mut properties = node.properties.clone();
        for spec in ref_specs(&node.kind) {
            if let Some(value) = ctx.resolve_ref(node, spec)? {
                properties.insert(spec.canonical, value);
            }
        }
        if node.kind == NodeKind::CyclicOutput && !properties.contains("source-signal-id") {
            warn!(
                "cyclic output '{}' has no source; it will read signal 0",
                node.display_name()
            );
        }
        if let NodeKind::Other(compatible) = &node.kind {
            debug!("'{}': unrecognized type '{compatible}' carried through", node.display_name());
        }

        resolved.push(ResolvedNode {
            index,
            label: node.label.clone(),
            name: node.name.clone(),
            address: node.address.clone(),
            kind: node.kind.clone(),
            signal: ids[index],
            properties,
            children: node.children.clone(),
        });
    }

    let topology = Topology::new(resolved);
    debug!(
        "resolved {} node(s), {} label(s), signal count {}",
        topology.len(),
        table.len(),
        topology.signal_count()
    );
    Ok(topology)
}

struct Context<'a> {
    nodes: &'a [ParsedNode],
    table: &'a SymbolTable,
    ids: &'a [Option<SignalId>],
}

impl Context<'_> {
    /// Resolved value for one reference, or `None` if the node omits it.
    fn resolve_ref(&self, node: &ParsedNode, spec: &RefSpec) -> Result<Option<PropertyValue>> {
        let (property, value) = match (
            node.properties.get(spec.short),
            node.properties.get(spec.long),
        ) {
            (Some(v), _) => (spec.short, v),
            (None, Some(v)) => (spec.long, v),
            (None, None) => return Ok(None),
        };

        let wrong = |expected: &'static str| ResolveError::WrongPropertyType {
            node: node.display_name().to_string(),
            property: property.to_string(),
            expected,
            found: value.type_name(),
        };

        let resolved: Vec<i64> = match value {
            PropertyValue::Ref(_) | PropertyValue::RefList(_) => {
                let labels = value.ref_labels().unwrap_or_default();
                if spec.arity == Arity::One && labels.len() != 1 {
                    return Err(wrong("a single reference"));
                }
                labels
                    .into_iter()
                    .map(|label| self.target_of(node, property, label, spec.target))
                    .collect::<Result<_>>()?
            }
            // Numeric forms are taken as already resolved.
            PropertyValue::Int(_) | PropertyValue::IntArray(_) => {
                let values = value.as_ints().unwrap_or_default();
                if values.iter().any(|v| *v < 0) {
                    return Err(wrong("non-negative identities"));
                }
                if spec.arity == Arity::One && values.len() != 1 {
                    return Err(wrong("a single reference"));
                }
                values
            }
            PropertyValue::Str(_) | PropertyValue::Flag => return Err(wrong("a reference")),
        };

        Ok(Some(match spec.arity {
            Arity::One => PropertyValue::Int(resolved[0]),
            Arity::Many => PropertyValue::IntArray(resolved),
        }))
    }

    fn target_of(
        &self,
        node: &ParsedNode,
        property: &str,
        label: &str,
        target: Target,
    ) -> Result<i64> {
        let index = self
            .table
            .lookup(label)
            .ok_or_else(|| ResolveError::UnknownLabel {
                label: label.to_string(),
                referenced_by: node.display_name().to_string(),
                property: property.to_string(),
            })?;

        match target {
            Target::Signal => self.ids[index]
                .map(|id| i64::from(id.0))
                .ok_or_else(|| ResolveError::NotASignal {
                    label: label.to_string(),
                    referenced_by: node.display_name().to_string(),
                    property: property.to_string(),
                }),
            Target::ScaleIndex => {
                if self.nodes[index].kind != NodeKind::Scale {
                    return Err(ResolveError::NotAScale {
                        label: label.to_string(),
                        referenced_by: node.display_name().to_string(),
                    });
                }
                let position = self.nodes[..index]
                    .iter()
                    .filter(|n| n.kind == NodeKind::Scale)
                    .count();
                Ok(position as i64)
            }
        }
    }
}

/// One row of the signal table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalEntry {
    pub id: SignalId,
    pub producer: String,
    pub kind: String,
}

/// Every produced signal, ordered by identity.
pub fn signal_table(topology: &Topology) -> Vec<SignalEntry> {
    let mut rows: Vec<_> = topology
        .nodes()
        .iter()
        .filter_map(|n| {
            n.signal.map(|id| SignalEntry {
                id,
                producer: n.display_name().to_string(),
                kind: n.kind.to_string(),
            })
        })
        .collect();
    rows.sort_by_key(|r| r.id);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_src(src: &str) -> Result<Topology> {
        resolve(&lq_dts::parse_nodes(src).unwrap())
    }

    const TOPOLOGY: &str = r#"
/ {
    rpm_a: adc@0 { compatible = "lq,hw-adc-input"; };
    rpm_b: adc@1 { compatible = "lq,hw-adc-input"; };
    rpm_c: adc@2 { compatible = "lq,hw-adc-input"; };

    rpm: merge@0 {
        compatible = "lq,mid-merge";
        inputs = <&rpm_a &rpm_b &rpm_c>;
        voting-method = "median";
    };

    rpm_scaled: scale@0 {
        compatible = "lq,scale";
        input_signal = <&rpm>;
    };

    overspeed: fault@0 {
        compatible = "lq,fault-monitor";
        monitored-signal = <&rpm>;
        limp-target = <&rpm_scaled>;
    };

    out: can@0 {
        compatible = "lq,cyclic-output";
        source = <&overspeed>;
        period-us = <100000>;
    };
};
"#;

    #[test]
    fn references_resolve_to_producer_identities() {
        let topo = resolve_src(TOPOLOGY).unwrap();
        let merge = topo.by_label("rpm").unwrap();
        assert_eq!(merge.signal, Some(SignalId(3)));
        assert_eq!(
            merge.signal_refs("input-signal-ids"),
            vec![SignalId(0), SignalId(1), SignalId(2)]
        );

        let scale = topo.by_label("rpm_scaled").unwrap();
        assert_eq!(scale.signal_ref("input-signal-id"), Some(SignalId(3)));

        let monitor = topo.by_label("overspeed").unwrap();
        assert_eq!(monitor.signal, Some(SignalId(5)));
        assert_eq!(monitor.signal_ref("input-signal-id"), Some(SignalId(3)));
        assert_eq!(monitor.int("limp-target-scale-id"), Some(0));

        let out = topo.by_label("out").unwrap();
        assert_eq!(out.signal, None);
        assert_eq!(out.signal_ref("source-signal-id"), Some(SignalId(5)));
        assert_eq!(topo.signal_count(), 6);
    }

    #[test]
    fn every_reference_matches_its_target() {
        let topo = resolve_src(TOPOLOGY).unwrap();
        for node in topo.nodes() {
            for spec in ref_specs(&node.kind) {
                if spec.target != Target::Signal {
                    continue;
                }
                let labels = node
                    .properties
                    .get(spec.short)
                    .or_else(|| node.properties.get(spec.long))
                    .and_then(|v| v.ref_labels())
                    .unwrap_or_default();
                let resolved = node.signal_refs(spec.canonical);
                assert_eq!(labels.len(), resolved.len());
                for (label, id) in labels.iter().zip(resolved) {
                    assert_eq!(topo.by_label(label).unwrap().signal, Some(id));
                }
            }
        }
    }

    #[test]
    fn unknown_label_names_label_and_referrer() {
        let err = resolve_src(
            "out: o { compatible = \"lq,cyclic-output\"; source = <&ghost>; };",
        )
        .unwrap_err();
        assert_eq!(
            err,
            ResolveError::UnknownLabel {
                label: "ghost".into(),
                referenced_by: "out".into(),
                property: "source".into(),
            }
        );
        assert!(err.to_string().contains("ghost"));
        assert!(err.to_string().contains("out"));
    }

    #[test]
    fn oversized_identity_is_an_error_not_a_wrap() {
        let err = resolve_src(
            "/ {
                a: adc@0 { compatible = \"lq,hw-adc-input\"; signal-id = <4294967295>; };
                b: adc@1 { compatible = \"lq,hw-adc-input\"; };
            };",
        )
        .unwrap_err();
        assert!(matches!(err, ResolveError::IdentityOverflow { ref node, .. } if node == "a"));
        assert!(err.to_string().contains("4294967295"));
    }

    #[test]
    fn reference_to_a_non_producer() {
        let err = resolve_src(
            "a: o { compatible = \"lq,cyclic-output\"; };
             s: x { compatible = \"lq,scale\"; input = <&a>; };",
        )
        .unwrap_err();
        assert!(matches!(err, ResolveError::NotASignal { .. }));
    }

    #[test]
    fn limp_target_must_be_a_scale() {
        let err = resolve_src(
            "a: i { compatible = \"lq,hw-adc-input\"; };
             f: m { compatible = \"lq,fault-monitor\"; input = <&a>; limp-target = <&a>; };",
        )
        .unwrap_err();
        assert!(matches!(err, ResolveError::NotAScale { .. }));
    }

    #[test]
    fn single_reference_with_list_is_rejected() {
        let err = resolve_src(
            "a: i { compatible = \"lq,hw-adc-input\"; };
             b: j { compatible = \"lq,hw-adc-input\"; };
             s: x { compatible = \"lq,scale\"; input = <&a &b>; };",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::WrongPropertyType {
                expected: "a single reference",
                ..
            }
        ));
    }

    #[test]
    fn legacy_numeric_forms_pass_through() {
        let topo = resolve_src(
            "m { compatible = \"lq,merge\"; input-signal-ids = <0 1>; };
             o { compatible = \"lq,cyclic-output\"; source-signal = <7>; };",
        )
        .unwrap();
        let merge = &topo.nodes()[0];
        assert_eq!(merge.signal_refs("input-signal-ids"), vec![SignalId(0), SignalId(1)]);
        assert_eq!(topo.nodes()[1].signal_ref("source-signal-id"), Some(SignalId(7)));
    }

    #[test]
    fn verified_output_drives_named_signal() {
        let topo = resolve_src(
            "cmd: a { compatible = \"lq,hw-adc-input\"; };
             fb: b { compatible = \"lq,hw-gpio-input\"; };
             v { compatible = \"lq,verified-output\"; command = <&cmd>; verification = <&fb>; output = <&cmd>; };",
        )
        .unwrap();
        let v = &topo.verified_outputs()[0];
        assert_eq!(v.signal, None);
        assert_eq!(v.signal_ref("output-signal-id"), Some(SignalId(0)));
        assert_eq!(v.signal_ref("verification-signal-id"), Some(SignalId(1)));
    }

    #[test]
    fn signal_table_is_sorted_and_unique() {
        let topo = resolve_src(TOPOLOGY).unwrap();
        let table = signal_table(&topo);
        let ids: Vec<_> = table.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(table[5].producer, "overspeed");
        assert_eq!(table[5].kind, "fault-monitor");
    }
}
