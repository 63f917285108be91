//! Label lookup, built once per resolution and discarded afterwards.

use std::collections::HashMap;

use lq_core::ParsedNode;

use crate::error::{ResolveError, Result};

/// Label to node-position table.
#[derive(Debug, Default)]
pub struct SymbolTable {
    labels: HashMap<String, usize>,
}

impl SymbolTable {
    /// Build from the full post-import node collection.
    ///
    /// Each label may be declared once.
    pub fn build(nodes: &[ParsedNode]) -> Result<Self> {
        let mut labels = HashMap::with_capacity(nodes.len());
        for (index, node) in nodes.iter().enumerate() {
            let Some(label) = &node.label else { continue };
            if labels.insert(label.clone(), index).is_some() {
                return Err(ResolveError::DuplicateLabel {
                    label: label.clone(),
                });
            }
        }
        Ok(Self { labels })
    }

    /// Position of the node declaring `label`.
    pub fn lookup(&self, label: &str) -> Option<usize> {
        self.labels.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_label() {
        let nodes = lq_dts::parse_nodes(
            "a: x { compatible = \"lq,scale\"; }; y { compatible = \"lq,scale\"; }; b: z { compatible = \"lq,pid\"; };",
        )
        .unwrap();
        let table = SymbolTable::build(&nodes).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("a"), Some(0));
        assert_eq!(table.lookup("b"), Some(2));
        assert_eq!(table.lookup("y"), None);
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let nodes = lq_dts::parse_nodes(
            "a: x { compatible = \"lq,scale\"; }; a: y { compatible = \"lq,remap\"; };",
        )
        .unwrap();
        assert_eq!(
            SymbolTable::build(&nodes).unwrap_err(),
            ResolveError::DuplicateLabel { label: "a".into() }
        );
    }
}
