//! Mesh statistics reported after generation.

use std::fmt;

use tracing::info;

use crate::mesh::MeshModel;

/// Node, element and per-set counts of a meshed model.
#[derive(Clone, Debug)]
pub struct MeshStatistics {
    /// Total node count.
    pub nodes: usize,
    /// Total element count.
    pub elements: usize,
    /// Name and node count of every node set, in registration order.
    pub node_sets: Vec<(String, usize)>,
    /// Id and element count of every block, in registration order.
    pub blocks: Vec<(usize, usize)>,
}

impl MeshStatistics {
    /// Collect the counts from a meshed model.
    #[must_use]
    pub fn collect(model: &MeshModel) -> Self {
        Self {
            nodes: model.node_count(),
            elements: model.element_count(),
            node_sets: model
                .node_sets
                .iter()
                .map(|set| (set.name.clone(), set.nodes.len()))
                .collect(),
            blocks: model
                .blocks
                .iter()
                .map(|block| (block.id, block.elements.len()))
                .collect(),
        }
    }

    /// Emit the statistics through the tracing subscriber.
    pub fn log(&self) {
        info!(nodes = self.nodes, elements = self.elements, "meshed model");
        for (name, count) in &self.node_sets {
            info!(node_set = name.as_str(), nodes = count, "node set");
        }
        for (id, count) in &self.blocks {
            info!(block = id, elements = count, "element block");
        }
    }
}

impl fmt::Display for MeshStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "nodes:    {}", self.nodes)?;
        writeln!(f, "elements: {}", self.elements)?;
        for (name, count) in &self.node_sets {
            writeln!(f, "node set {name}: {count} nodes")?;
        }
        for (id, count) in &self.blocks {
            writeln!(f, "block {id}: {count} elements")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bc::{BoundaryCondition, DofConstraint};
    use crate::geometry::point;
    use crate::mesh::{Element, ElementBlock, ElementShape, EntityKind, Node, NodeSet};

    #[test]
    fn statistics_count_sets_and_blocks() {
        let model = MeshModel {
            dimension: 2,
            nodes: vec![Node { id: 1, position: point(0.0, 0.0, 0.0) }],
            elements: vec![Element {
                id: 1,
                shape: ElementShape::Quad4,
                nodes: vec![1, 1, 1, 1],
            }],
            node_sets: vec![NodeSet {
                id: 1,
                name: "clamped".to_owned(),
                source: EntityKind::Curve,
                condition: BoundaryCondition::Dirichlet(DofConstraint::fixed(2)),
                nodes: vec![1],
            }],
            blocks: vec![ElementBlock {
                id: 1,
                shape: ElementShape::Quad4,
                material: 1,
                description: String::new(),
                elements: vec![1],
            }],
        };

        let stats = MeshStatistics::collect(&model);
        assert_eq!(stats.nodes, 1);
        assert_eq!(stats.elements, 1);
        assert_eq!(stats.node_sets, vec![("clamped".to_owned(), 1)]);
        assert_eq!(stats.blocks, vec![(1, 1)]);

        let rendered = stats.to_string();
        assert!(rendered.contains("node set clamped: 1 nodes"));
    }
}
