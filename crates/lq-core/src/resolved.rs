//! Resolved nodes and the topology they form.
//!
//! A [`ResolvedNode`] is built once by the resolver and never mutated: it
//! carries the node's own signal identity and every reference rewritten to the
//! identity of its target under a canonical `*-id` / `*-ids` property name.

use serde::{Deserialize, Serialize};

use crate::node::{Block, HwBus, NodeKind};
use crate::property::{Properties, PropertyValue};
use crate::signal::SignalId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedNode {
    /// Position in declaration order.
    pub index: usize,
    pub label: Option<String>,
    pub name: String,
    pub address: Option<String>,
    pub kind: NodeKind,
    /// The identity this node produces, if it is a producer.
    pub signal: Option<SignalId>,
    pub properties: Properties,
    pub children: Vec<Block>,
}

impl ResolvedNode {
    /// Label if present, otherwise the node name.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// A label usable inside a C identifier.
    pub fn c_ident(&self) -> String {
        self.display_name()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.properties.int(name)
    }

    pub fn int_or(&self, name: &str, default: i64) -> i64 {
        self.properties.int_or(name, default)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.properties.str(name)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.properties.flag(name)
    }

    /// A resolved single-signal property such as `source-signal-id`.
    pub fn signal_ref(&self, name: &str) -> Option<SignalId> {
        self.int(name)
            .and_then(|v| u32::try_from(v).ok())
            .map(SignalId)
    }

    /// A resolved signal-list property such as `input-signal-ids`.
    pub fn signal_refs(&self, name: &str) -> Vec<SignalId> {
        self.properties
            .get(name)
            .and_then(PropertyValue::as_ints)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| u32::try_from(v).ok())
            .map(SignalId)
            .collect()
    }
}

/// The fully resolved node collection, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    nodes: Vec<ResolvedNode>,
}

impl Topology {
    pub fn new(nodes: Vec<ResolvedNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[ResolvedNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes matching a predicate on their kind, in declaration order.
    pub fn of_kind<F>(&self, pred: F) -> Vec<&ResolvedNode>
    where
        F: Fn(&NodeKind) -> bool,
    {
        self.nodes.iter().filter(|n| pred(&n.kind)).collect()
    }

    pub fn engine(&self) -> Option<&ResolvedNode> {
        self.nodes.iter().find(|n| n.kind == NodeKind::Engine)
    }

    pub fn hw_inputs(&self) -> Vec<&ResolvedNode> {
        self.of_kind(NodeKind::is_hw_input)
    }

    pub fn hw_inputs_on(&self, bus: HwBus) -> Vec<&ResolvedNode> {
        self.of_kind(|k| *k == NodeKind::HwInput(bus))
    }

    pub fn scales(&self) -> Vec<&ResolvedNode> {
        self.of_kind(|k| *k == NodeKind::Scale)
    }

    pub fn remaps(&self) -> Vec<&ResolvedNode> {
        self.of_kind(|k| *k == NodeKind::Remap)
    }

    pub fn pids(&self) -> Vec<&ResolvedNode> {
        self.of_kind(|k| *k == NodeKind::Pid)
    }

    pub fn merges(&self) -> Vec<&ResolvedNode> {
        self.of_kind(|k| *k == NodeKind::Merge)
    }

    pub fn fault_monitors(&self) -> Vec<&ResolvedNode> {
        self.of_kind(|k| *k == NodeKind::FaultMonitor)
    }

    pub fn cyclic_outputs(&self) -> Vec<&ResolvedNode> {
        self.of_kind(|k| *k == NodeKind::CyclicOutput)
    }

    pub fn verified_outputs(&self) -> Vec<&ResolvedNode> {
        self.of_kind(|k| *k == NodeKind::VerifiedOutput)
    }

    /// Find a node by label.
    pub fn by_label(&self, label: &str) -> Option<&ResolvedNode> {
        self.nodes
            .iter()
            .find(|n| n.label.as_deref() == Some(label))
    }

    /// Find the producer of a signal.
    pub fn producer_of(&self, id: SignalId) -> Option<&ResolvedNode> {
        self.nodes.iter().find(|n| n.signal == Some(id))
    }

    /// Largest identity owned by any producer.
    pub fn max_signal(&self) -> Option<SignalId> {
        self.nodes.iter().filter_map(|n| n.signal).max()
    }

    /// One past the largest identity in use; zero for an empty topology.
    ///
    /// Resolution keeps identities at or below [`SignalId::MAX`], so the
    /// count is exact; a hand-built topology past that saturates.
    pub fn signal_count(&self) -> u32 {
        self.max_signal().map_or(0, |s| s.0.saturating_add(1))
    }
}
