//! Solver input deck emission.
//!
//! A deck is the solver head (ordered sections of key/value settings)
//! followed by the design conditions, the node-set topology, the node
//! coordinates and the element connectivity. The same document renders
//! either as the classic text format or as YAML.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::bc::BoundaryCondition;
use crate::errors::DeckError;
use crate::mesh::{MeshModel, NodeSet};

/// Width of the dashed section separators in the text format.
const SECTION_WIDTH: usize = 79;

/// One entry of a head section.
#[derive(Clone, Debug)]
enum HeadEntry {
    /// An aligned `KEY value` setting.
    KeyValue { key: String, value: String },
    /// A line emitted verbatim, for sections with their own syntax.
    Raw(String),
}

/// A titled block of solver settings.
#[derive(Clone, Debug)]
pub struct HeadSection {
    title: String,
    entries: Vec<HeadEntry>,
}

impl HeadSection {
    /// Start an empty section.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            entries: Vec::new(),
        }
    }

    /// Append a `KEY value` entry.
    #[must_use]
    pub fn entry(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.entries.push(HeadEntry::KeyValue {
            key: key.into(),
            value: value.to_string(),
        });
        self
    }

    /// Append a verbatim line.
    #[must_use]
    pub fn raw(mut self, line: impl Into<String>) -> Self {
        self.entries.push(HeadEntry::Raw(line.into()));
        self
    }
}

/// The solver head: every section preceding the mesh data.
#[derive(Clone, Debug, Default)]
pub struct Head {
    sections: Vec<HeadSection>,
}

impl Head {
    /// Start an empty head.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section.
    #[must_use]
    pub fn section(mut self, section: HeadSection) -> Self {
        self.sections.push(section);
        self
    }
}

/// Dash-padded section separator, `----...----TITLE`.
fn section_header(title: &str) -> String {
    format!("{title:->width$}", width = SECTION_WIDTH)
}

/// Per-kind design ids: node sets tagged on curves count separately from
/// those tagged on surfaces, matching the solver's numbering.
fn design_ids(model: &MeshModel) -> HashMap<usize, usize> {
    let mut per_kind: HashMap<_, usize> = HashMap::new();
    let mut ids = HashMap::new();
    for set in &model.node_sets {
        let counter = per_kind.entry(set.source).or_default();
        *counter += 1;
        ids.insert(set.id, *counter);
    }
    ids
}

/// Node sets grouped into condition sections, preserving first-appearance
/// order.
fn condition_sections(model: &MeshModel) -> Vec<(String, Vec<&NodeSet>)> {
    let mut sections: Vec<(String, Vec<&NodeSet>)> = Vec::new();
    for set in &model.node_sets {
        let title = format!(
            "DESIGN {} {} CONDITIONS",
            set.source.condition_keyword(),
            set.condition.section_keyword()
        );
        match sections.iter_mut().find(|(existing, _)| *existing == title) {
            Some((_, sets)) => sets.push(set),
            None => sections.push((title, vec![set])),
        }
    }
    sections
}

/// Topology sections (`DLINE-NODE TOPOLOGY`, ...) grouped by source kind.
fn topology_sections(model: &MeshModel) -> Vec<(String, Vec<&NodeSet>)> {
    let mut sections: Vec<(String, Vec<&NodeSet>)> = Vec::new();
    for set in &model.node_sets {
        let title = format!("{}-NODE TOPOLOGY", set.source.design_prefix());
        match sections.iter_mut().find(|(existing, _)| *existing == title) {
            Some((_, sets)) => sets.push(set),
            None => sections.push((title, vec![set])),
        }
    }
    sections
}

/// Element connectivity lines of the STRUCTURE ELEMENTS section, in block
/// order.
fn element_lines(model: &MeshModel) -> Result<Vec<String>, DeckError> {
    let mut lines = Vec::new();
    for block in &model.blocks {
        for &element_id in &block.elements {
            let element =
                model
                    .element(element_id)
                    .ok_or(DeckError::DanglingElement {
                        block: block.id,
                        element: element_id,
                    })?;
            let connectivity = element
                .nodes
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            lines.push(format!(
                "{} {} {} {} MAT {} {}",
                element.id,
                element.shape.family(),
                element.shape.cell_name(),
                connectivity,
                block.material,
                block.description
            ));
        }
    }
    Ok(lines)
}

/// Render the deck in the classic text format.
///
/// # Errors
///
/// Returns [`DeckError::DanglingElement`] when a block references an element
/// the model does not contain.
pub fn render_dat(head: &Head, model: &MeshModel) -> Result<String, DeckError> {
    let mut out = String::new();
    for section in &head.sections {
        out.push_str(&section_header(&section.title));
        out.push('\n');
        for entry in &section.entries {
            match entry {
                HeadEntry::KeyValue { key, value } => {
                    let _ = writeln!(out, "{key:<32}{value}");
                }
                HeadEntry::Raw(line) => {
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
    }

    let ids = design_ids(model);
    for (title, sets) in condition_sections(model) {
        out.push_str(&section_header(&title));
        out.push('\n');
        for set in sets {
            let _ = writeln!(
                out,
                "E {} {} // {}",
                ids[&set.id],
                set.condition.description(),
                set.name
            );
        }
    }

    for (title, sets) in topology_sections(model) {
        out.push_str(&section_header(&title));
        out.push('\n');
        for set in sets {
            for node in &set.nodes {
                let _ = writeln!(
                    out,
                    "NODE {} {} {}",
                    node,
                    set.source.design_prefix(),
                    ids[&set.id]
                );
            }
        }
    }

    out.push_str(&section_header("NODE COORDS"));
    out.push('\n');
    for node in &model.nodes {
        let _ = writeln!(
            out,
            "NODE {} COORD {} {} {}",
            node.id, node.position.x, node.position.y, node.position.z
        );
    }

    out.push_str(&section_header("STRUCTURE ELEMENTS"));
    out.push('\n');
    for line in element_lines(model)? {
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(&section_header("END"));
    out.push('\n');
    Ok(out)
}

/// A head value as a YAML scalar; numbers stay numbers.
fn yaml_scalar(value: &str) -> Value {
    if let Ok(int) = value.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = value.parse::<f64>() {
        return Value::from(float);
    }
    Value::from(value)
}

/// Render the deck as an ordered YAML document.
///
/// # Errors
///
/// Returns [`DeckError::Yaml`] when serialization fails and
/// [`DeckError::DanglingElement`] when a block references an element the
/// model does not contain.
pub fn render_yaml(head: &Head, model: &MeshModel) -> Result<String, DeckError> {
    let mut document = Mapping::new();

    for section in &head.sections {
        let raw_only = section
            .entries
            .iter()
            .all(|entry| matches!(entry, HeadEntry::Raw(_)));
        let value = if raw_only && !section.entries.is_empty() {
            Value::Sequence(
                section
                    .entries
                    .iter()
                    .filter_map(|entry| match entry {
                        HeadEntry::Raw(line) => Some(Value::from(line.as_str())),
                        HeadEntry::KeyValue { .. } => None,
                    })
                    .collect(),
            )
        } else {
            let mut mapping = Mapping::new();
            for entry in &section.entries {
                match entry {
                    HeadEntry::KeyValue { key, value } => {
                        mapping.insert(Value::from(key.as_str()), yaml_scalar(value));
                    }
                    HeadEntry::Raw(line) => {
                        mapping.insert(Value::from(line.as_str()), Value::Null);
                    }
                }
            }
            Value::Mapping(mapping)
        };
        document.insert(Value::from(section.title.as_str()), value);
    }

    let ids = design_ids(model);
    for (title, sets) in condition_sections(model) {
        let mut lines = Vec::new();
        for set in sets {
            let mut mapping = Mapping::new();
            mapping.insert(Value::from("E"), Value::from(ids[&set.id] as u64));
            match &set.condition {
                BoundaryCondition::Dirichlet(constraint)
                | BoundaryCondition::Neumann(constraint) => {
                    mapping.insert(
                        Value::from("NUMDOF"),
                        Value::from(constraint.ndof() as u64),
                    );
                    mapping.insert(
                        Value::from("ONOFF"),
                        Value::Sequence(
                            constraint
                                .onoff()
                                .iter()
                                .map(|flag| Value::from(u64::from(*flag)))
                                .collect(),
                        ),
                    );
                    mapping.insert(
                        Value::from("VAL"),
                        Value::Sequence(
                            constraint.values().iter().copied().map(Value::from).collect(),
                        ),
                    );
                    mapping.insert(
                        Value::from("FUNCT"),
                        Value::Sequence(
                            constraint
                                .functions()
                                .iter()
                                .map(|id| Value::from(*id as u64))
                                .collect(),
                        ),
                    );
                }
                BoundaryCondition::Contact(contact) => {
                    mapping.insert(
                        Value::from("InterfaceID"),
                        Value::from(contact.interface_id as u64),
                    );
                    mapping.insert(Value::from("Side"), Value::from(contact.side.to_string()));
                    mapping.insert(
                        Value::from("Initialization"),
                        Value::from(contact.initialization.to_string()),
                    );
                }
            }
            lines.push(Value::Mapping(mapping));
        }
        document.insert(Value::from(title), Value::Sequence(lines));
    }

    for (title, sets) in topology_sections(model) {
        let mut lines = Vec::new();
        for set in sets {
            for node in &set.nodes {
                lines.push(Value::from(format!(
                    "NODE {} {} {}",
                    node,
                    set.source.design_prefix(),
                    ids[&set.id]
                )));
            }
        }
        document.insert(Value::from(title), Value::Sequence(lines));
    }

    let coords = model
        .nodes
        .iter()
        .map(|node| {
            Value::from(format!(
                "NODE {} COORD {} {} {}",
                node.id, node.position.x, node.position.y, node.position.z
            ))
        })
        .collect();
    document.insert(Value::from("NODE COORDS"), Value::Sequence(coords));

    let elements = element_lines(model)?
        .into_iter()
        .map(Value::from)
        .collect();
    document.insert(Value::from("STRUCTURE ELEMENTS"), Value::Sequence(elements));

    Ok(serde_yaml::to_string(&Value::Mapping(document))?)
}

/// Write the text deck to `path`.
///
/// # Errors
///
/// Returns [`DeckError::Io`] when the file cannot be written and
/// [`DeckError::DanglingElement`] on broken block references.
pub fn write_dat(path: &Path, head: &Head, model: &MeshModel) -> Result<(), DeckError> {
    let rendered = render_dat(head, model)?;
    fs::write(path, rendered).map_err(|source| DeckError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the YAML deck to `path`.
///
/// # Errors
///
/// Returns [`DeckError::Io`] on write failures and [`DeckError::Yaml`] on
/// serialization failures.
pub fn write_yaml(path: &Path, head: &Head, model: &MeshModel) -> Result<(), DeckError> {
    let rendered = render_yaml(head, model)?;
    fs::write(path, rendered).map_err(|source| DeckError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bc::{BoundaryCondition, DofConstraint};
    use crate::geometry::point;
    use crate::mesh::{Element, ElementBlock, ElementShape, EntityKind, Node};

    fn single_element_model() -> MeshModel {
        MeshModel {
            dimension: 2,
            nodes: vec![
                Node { id: 1, position: point(0.0, 0.0, 0.0) },
                Node { id: 2, position: point(1.0, 0.0, 0.0) },
                Node { id: 3, position: point(1.0, 1.0, 0.0) },
                Node { id: 4, position: point(0.0, 1.0, 0.0) },
            ],
            elements: vec![Element {
                id: 1,
                shape: ElementShape::Quad4,
                nodes: vec![1, 2, 3, 4],
            }],
            node_sets: vec![
                NodeSet {
                    id: 1,
                    name: "left".to_owned(),
                    source: EntityKind::Curve,
                    condition: BoundaryCondition::Dirichlet(DofConstraint::fixed(2)),
                    nodes: vec![1, 4],
                },
                NodeSet {
                    id: 2,
                    name: "right".to_owned(),
                    source: EntityKind::Curve,
                    condition: BoundaryCondition::Neumann(
                        DofConstraint::free(2).driven(1, -5.0, 1),
                    ),
                    nodes: vec![2, 3],
                },
            ],
            blocks: vec![ElementBlock {
                id: 1,
                shape: ElementShape::Quad4,
                material: 1,
                description: "KINEM nonlinear".to_owned(),
                elements: vec![1],
            }],
        }
    }

    fn sample_head() -> Head {
        Head::new().section(
            HeadSection::new("PROBLEM TYPE").entry("PROBLEMTYPE", "Structure"),
        )
    }

    #[test]
    fn section_headers_are_dash_padded() {
        let header = section_header("PROBLEM SIZE");
        assert_eq!(header.len(), SECTION_WIDTH);
        assert!(header.ends_with("PROBLEM SIZE"));
        assert!(header.starts_with("----"));
    }

    #[test]
    fn dat_contains_all_sections() {
        let deck = render_dat(&sample_head(), &single_element_model()).expect("renders");
        assert!(deck.contains("PROBLEM TYPE"));
        assert!(deck.contains(&format!("{:<32}{}", "PROBLEMTYPE", "Structure")));
        assert!(deck.contains("DESIGN LINE DIRICH CONDITIONS"));
        assert!(deck.contains("E 1 NUMDOF 2 ONOFF 1 1 VAL 0 0 FUNCT 0 0 // left"));
        assert!(deck.contains("DESIGN LINE NEUMANN CONDITIONS"));
        assert!(deck.contains("E 2 NUMDOF 2 ONOFF 0 1 VAL 0 -5 FUNCT 0 1 // right"));
        assert!(deck.contains("DLINE-NODE TOPOLOGY"));
        assert!(deck.contains("NODE 4 DLINE 1"));
        assert!(deck.contains("NODE COORDS"));
        assert!(deck.contains("NODE 3 COORD 1 1 0"));
        assert!(deck.contains("STRUCTURE ELEMENTS"));
        assert!(deck.contains("1 WALL QUAD4 1 2 3 4 MAT 1 KINEM nonlinear"));
    }

    #[test]
    fn design_ids_count_per_source_kind() {
        let mut model = single_element_model();
        model.node_sets.push(NodeSet {
            id: 3,
            name: "corner".to_owned(),
            source: EntityKind::Vertex,
            condition: BoundaryCondition::Dirichlet(DofConstraint::fixed(2)),
            nodes: vec![1],
        });
        let ids = design_ids(&model);
        assert_eq!(ids[&1], 1);
        assert_eq!(ids[&2], 2);
        // The vertex-tagged set starts its own numbering.
        assert_eq!(ids[&3], 1);
    }

    #[test]
    fn broken_block_references_fail_loudly() {
        let mut model = single_element_model();
        model.blocks[0].elements.push(99);

        let error =
            render_dat(&sample_head(), &model).expect_err("missing element rejected");
        assert!(matches!(
            error,
            DeckError::DanglingElement {
                block: 1,
                element: 99
            }
        ));
        assert!(render_yaml(&sample_head(), &model).is_err());
    }

    #[test]
    fn yaml_mirrors_the_dat_sections() {
        let rendered =
            render_yaml(&sample_head(), &single_element_model()).expect("serializes");
        assert!(rendered.contains("PROBLEM TYPE:"));
        assert!(rendered.contains("PROBLEMTYPE: Structure"));
        assert!(rendered.contains("DESIGN LINE NEUMANN CONDITIONS:"));
        assert!(rendered.contains("NODE COORDS:"));
        assert!(rendered.contains("STRUCTURE ELEMENTS:"));

        let parsed: serde_yaml::Value =
            serde_yaml::from_str(&rendered).expect("well-formed YAML");
        let conditions = parsed
            .get("DESIGN LINE DIRICH CONDITIONS")
            .and_then(Value::as_sequence)
            .expect("condition sequence present");
        assert_eq!(conditions.len(), 1);
        assert_eq!(
            conditions[0].get("NUMDOF").and_then(Value::as_u64),
            Some(2)
        );
    }
}
