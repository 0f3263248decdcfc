//! Mesh snapshot types shared between sessions and deck writers.

use serde::Serialize;
use std::fmt;

use crate::bc::BoundaryCondition;
use crate::geometry::Point;

/// The kinds of geometric entities a meshing session tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum EntityKind {
    /// A point in space.
    Vertex,
    /// A line or arc bounded by two vertices.
    Curve,
    /// A two dimensional region.
    Surface,
    /// A three dimensional region.
    Volume,
}

impl EntityKind {
    /// Parse the lowercase entity name used in commands and selectors.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "vertex" => Some(Self::Vertex),
            "curve" => Some(Self::Curve),
            "surface" => Some(Self::Surface),
            "volume" => Some(Self::Volume),
            _ => None,
        }
    }

    /// The design-topology prefix the solver uses for node sets tagged on
    /// this kind of entity (`DNODE`, `DLINE`, `DSURF`, `DVOL`).
    #[must_use]
    pub fn design_prefix(self) -> &'static str {
        match self {
            Self::Vertex => "DNODE",
            Self::Curve => "DLINE",
            Self::Surface => "DSURF",
            Self::Volume => "DVOL",
        }
    }

    /// The condition-section spelling for this kind (`POINT`, `LINE`,
    /// `SURF`, `VOL`).
    #[must_use]
    pub fn condition_keyword(self) -> &'static str {
        match self {
            Self::Vertex => "POINT",
            Self::Curve => "LINE",
            Self::Surface => "SURF",
            Self::Volume => "VOL",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Vertex => "vertex",
            Self::Curve => "curve",
            Self::Surface => "surface",
            Self::Volume => "volume",
        };
        f.write_str(name)
    }
}

/// Element shapes supported by the structured mesher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ElementShape {
    /// Four node quadrilateral.
    Quad4,
    /// Eight node hexahedron.
    Hex8,
}

impl ElementShape {
    /// Number of nodes in the connectivity of this shape.
    #[must_use]
    pub const fn node_count(self) -> usize {
        match self {
            Self::Quad4 => 4,
            Self::Hex8 => 8,
        }
    }

    /// The solver element family this shape belongs to.
    #[must_use]
    pub const fn family(self) -> &'static str {
        match self {
            Self::Quad4 => "WALL",
            Self::Hex8 => "SOLID",
        }
    }

    /// The solver cell name.
    #[must_use]
    pub const fn cell_name(self) -> &'static str {
        match self {
            Self::Quad4 => "QUAD4",
            Self::Hex8 => "HEX8",
        }
    }
}

impl fmt::Display for ElementShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cell_name())
    }
}

/// A mesh node.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Node {
    /// One-based node id.
    pub id: usize,
    /// Node position.
    pub position: Point,
}

/// A finite element with its connectivity.
#[derive(Clone, Debug, Serialize)]
pub struct Element {
    /// One-based element id.
    pub id: usize,
    /// Shape of the element.
    pub shape: ElementShape,
    /// Node ids in the solver's ordering.
    pub nodes: Vec<usize>,
}

/// A named set of nodes carrying a boundary condition.
#[derive(Clone, Debug)]
pub struct NodeSet {
    /// One-based node set id.
    pub id: usize,
    /// Human readable name.
    pub name: String,
    /// Kind of entity the set was collected from.
    pub source: EntityKind,
    /// Boundary condition attached to the set.
    pub condition: BoundaryCondition,
    /// Sorted, de-duplicated node ids.
    pub nodes: Vec<usize>,
}

/// A block of elements sharing a shape, material and solver description.
#[derive(Clone, Debug)]
pub struct ElementBlock {
    /// One-based block id.
    pub id: usize,
    /// Shape of every element in the block.
    pub shape: ElementShape,
    /// Material id referenced by the element lines.
    pub material: usize,
    /// Trailing solver description, e.g. `KINEM nonlinear`.
    pub description: String,
    /// Ids of the elements assigned to this block.
    pub elements: Vec<usize>,
}

/// Snapshot of a meshed model, ready for deck emission.
#[derive(Clone, Debug, Default)]
pub struct MeshModel {
    /// Spatial dimension of the problem (2 or 3).
    pub dimension: usize,
    /// All mesh nodes, ordered by id.
    pub nodes: Vec<Node>,
    /// All elements, ordered by id.
    pub elements: Vec<Element>,
    /// Node sets in registration order.
    pub node_sets: Vec<NodeSet>,
    /// Element blocks in registration order.
    pub blocks: Vec<ElementBlock>,
}

impl MeshModel {
    /// Total number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of elements.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Look up an element by id.
    #[must_use]
    pub fn element(&self, id: usize) -> Option<&Element> {
        self.elements.iter().find(|element| element.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_keywords_roundtrip() {
        for kind in [
            EntityKind::Vertex,
            EntityKind::Curve,
            EntityKind::Surface,
            EntityKind::Volume,
        ] {
            assert_eq!(EntityKind::from_keyword(&kind.to_string()), Some(kind));
        }
        assert_eq!(EntityKind::from_keyword("nodeset"), None);
    }

    #[test]
    fn shape_metadata_is_consistent() {
        assert_eq!(ElementShape::Quad4.node_count(), 4);
        assert_eq!(ElementShape::Hex8.node_count(), 8);
        assert_eq!(ElementShape::Quad4.family(), "WALL");
        assert_eq!(ElementShape::Hex8.cell_name(), "HEX8");
    }
}
