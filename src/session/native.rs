//! The built-in meshing engine.
//!
//! [`NativeSession`] keeps a constructive geometry store (vertices, curves,
//! surfaces, volumes) and meshes it with structured schemes: curves are
//! divided into intervals, four-sided surfaces are filled with mapped
//! (transfinite) quad grids, and bricks become structured hex grids. Nodes
//! on shared vertices and curves are created once, so the merge semantics
//! the generators rely on hold by construction.

use std::collections::BTreeSet;

use nalgebra::Vector3;
use tracing::debug;

use crate::bc::BoundaryCondition;
use crate::command::{BiasGrading, Command, CoordClause, MeshTarget, Selector};
use crate::errors::SessionError;
use crate::geometry::Point;
use crate::mesh::{Element, ElementBlock, ElementShape, EntityKind, MeshModel, Node, NodeSet};
use crate::session::mapped::{bias_params, coons_grid, uniform_interval_count, uniform_params};
use crate::session::{BlockId, GroupId, MeshingSession, NodeSetId};

/// Fallback interval count for curves with no sizing information at all.
const DEFAULT_INTERVALS: usize = 10;

/// A geometry vertex and its mesh node, once one exists.
#[derive(Clone, Debug)]
struct VertexEnt {
    position: Point,
    node: Option<usize>,
}

/// Geometric definition of a curve.
#[derive(Clone, Copy, Debug)]
enum CurveGeom {
    Line {
        start: usize,
        end: usize,
    },
    Arc {
        center: usize,
        start: usize,
        end: usize,
        radius: f64,
    },
}

/// Interval scheme assigned to a curve.
#[derive(Clone, Copy, Debug)]
enum CurveScheme {
    Uniform { size: f64 },
    Bias { fine: f64, coarse: f64, start_vertex: usize },
    BiasFactor { fine: f64 },
}

#[derive(Clone, Debug)]
struct CurveEnt {
    geom: CurveGeom,
    scheme: Option<CurveScheme>,
    intervals: Option<usize>,
    /// Node ids from the geometric start to the geometric end; empty until
    /// the curve is meshed.
    nodes: Vec<usize>,
}

/// Geometric definition of a surface.
#[derive(Clone, Debug)]
enum SurfaceGeom {
    /// A region bounded by existing curves; meshed with the mapped scheme.
    Bounded { curves: Vec<usize> },
    /// An implicit boundary face of a brick volume.
    BrickFace { volume: usize, face: usize },
}

#[derive(Clone, Debug)]
struct SurfaceEnt {
    geom: SurfaceGeom,
    size: Option<f64>,
    nodes: Vec<usize>,
    elements: Vec<usize>,
}

#[derive(Clone, Debug)]
struct VolumeEnt {
    lengths: [f64; 3],
    center: Vector3<f64>,
    size: Option<f64>,
    faces: [usize; 6],
    nodes: Vec<usize>,
    elements: Vec<usize>,
}

#[derive(Clone, Debug)]
struct GroupEnt {
    name: Option<String>,
    members: Vec<(EntityKind, usize)>,
}

/// The built-in [`MeshingSession`] implementation.
#[derive(Debug, Default)]
pub struct NativeSession {
    vertices: Vec<VertexEnt>,
    curves: Vec<CurveEnt>,
    surfaces: Vec<SurfaceEnt>,
    volumes: Vec<VolumeEnt>,
    groups: Vec<GroupEnt>,
    nodes: Vec<Node>,
    elements: Vec<Element>,
    node_sets: Vec<NodeSet>,
    blocks: Vec<ElementBlock>,
    journal: Vec<String>,
    has_volumes: bool,
}

impl NativeSession {
    /// Create an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command executed so far, in order. Accepted no-ops such as
    /// `imprint all` are recorded too.
    #[must_use]
    pub fn journal(&self) -> &[String] {
        &self.journal
    }

    /// Spatial dimension of the model: 3 once a volume exists, 2 otherwise.
    #[must_use]
    pub fn dimension(&self) -> usize {
        if self.has_volumes {
            3
        } else {
            2
        }
    }

    fn vertex(&self, id: usize) -> Result<&VertexEnt, SessionError> {
        self.vertices.get(id.wrapping_sub(1)).ok_or(SessionError::UnknownEntity {
            kind: EntityKind::Vertex,
            id,
        })
    }

    fn curve(&self, id: usize) -> Result<&CurveEnt, SessionError> {
        self.curves.get(id.wrapping_sub(1)).ok_or(SessionError::UnknownEntity {
            kind: EntityKind::Curve,
            id,
        })
    }

    fn surface(&self, id: usize) -> Result<&SurfaceEnt, SessionError> {
        self.surfaces.get(id.wrapping_sub(1)).ok_or(SessionError::UnknownEntity {
            kind: EntityKind::Surface,
            id,
        })
    }

    fn volume(&self, id: usize) -> Result<&VolumeEnt, SessionError> {
        self.volumes.get(id.wrapping_sub(1)).ok_or(SessionError::UnknownEntity {
            kind: EntityKind::Volume,
            id,
        })
    }

    fn add_vertex(&mut self, position: Point) -> usize {
        self.vertices.push(VertexEnt {
            position,
            node: None,
        });
        self.vertices.len()
    }

    fn add_curve(&mut self, geom: CurveGeom) -> usize {
        self.curves.push(CurveEnt {
            geom,
            scheme: None,
            intervals: None,
            nodes: Vec::new(),
        });
        self.curves.len()
    }

    fn add_node(&mut self, position: Point) -> usize {
        let id = self.nodes.len() + 1;
        self.nodes.push(Node { id, position });
        id
    }

    fn vertex_node(&mut self, vertex: usize) -> Result<usize, SessionError> {
        let position = self.vertex(vertex)?.position;
        if let Some(node) = self.vertices[vertex - 1].node {
            return Ok(node);
        }
        let node = self.add_node(position);
        self.vertices[vertex - 1].node = Some(node);
        Ok(node)
    }

    fn curve_endpoints(&self, id: usize) -> Result<(usize, usize), SessionError> {
        match self.curve(id)?.geom {
            CurveGeom::Line { start, end } | CurveGeom::Arc { start, end, .. } => {
                Ok((start, end))
            }
        }
    }

    /// Point on a curve at normalized parameter `t` in `[0, 1]`.
    fn curve_point(&self, id: usize, t: f64) -> Result<Point, SessionError> {
        match self.curve(id)?.geom {
            CurveGeom::Line { start, end } => {
                let a = self.vertex(start)?.position.to_vector();
                let b = self.vertex(end)?.position.to_vector();
                Ok(Point::from(a + (b - a) * t))
            }
            CurveGeom::Arc {
                center,
                start,
                end,
                radius,
            } => {
                let c = self.vertex(center)?.position;
                let a0 = self.arc_angle(center, start)?;
                let a1 = self.arc_angle(center, end)?;
                let sweep = shortest_sweep(a1 - a0);
                let angle = a0 + sweep * t;
                Ok(Point::new(
                    c.x + radius * angle.cos(),
                    c.y + radius * angle.sin(),
                    c.z,
                ))
            }
        }
    }

    fn arc_angle(&self, center: usize, vertex: usize) -> Result<f64, SessionError> {
        let c = self.vertex(center)?.position;
        let v = self.vertex(vertex)?.position;
        Ok((v.y - c.y).atan2(v.x - c.x))
    }

    fn curve_length(&self, id: usize) -> Result<f64, SessionError> {
        match self.curve(id)?.geom {
            CurveGeom::Line { start, end } => {
                let a = self.vertex(start)?.position.to_vector();
                let b = self.vertex(end)?.position.to_vector();
                Ok((b - a).norm())
            }
            CurveGeom::Arc {
                center,
                start,
                end,
                radius,
            } => {
                let a0 = self.arc_angle(center, start)?;
                let a1 = self.arc_angle(center, end)?;
                Ok(radius * shortest_sweep(a1 - a0).abs())
            }
        }
    }

    /// Centroid used by coordinate-predicate selectors.
    fn centroid(&self, kind: EntityKind, id: usize) -> Result<Point, SessionError> {
        match kind {
            EntityKind::Vertex => Ok(self.vertex(id)?.position),
            EntityKind::Curve => self.curve_point(id, 0.5),
            EntityKind::Surface => match &self.surface(id)?.geom {
                SurfaceGeom::Bounded { curves } => {
                    let mut sum = Vector3::zeros();
                    for &curve in curves {
                        sum += self.curve_point(curve, 0.5)?.to_vector();
                    }
                    Ok(Point::from(sum / curves.len() as f64))
                }
                SurfaceGeom::BrickFace { volume, face } => {
                    let volume = self.volume(*volume)?;
                    let axis = face / 2;
                    let sign = if face % 2 == 0 { -1.0 } else { 1.0 };
                    let mut center = volume.center;
                    center[axis] += sign * 0.5 * volume.lengths[axis];
                    Ok(Point::from(center))
                }
            },
            EntityKind::Volume => Ok(Point::from(self.volume(id)?.center)),
        }
    }

    fn execute(&mut self, command: Command, raw: &str) -> Result<(), SessionError> {
        match command {
            Command::CreateVertex { position } => {
                self.add_vertex(position);
                Ok(())
            }
            Command::CreateCurve { start, end } => {
                self.vertex(start)?;
                self.vertex(end)?;
                self.add_curve(CurveGeom::Line { start, end });
                Ok(())
            }
            Command::CreateArc {
                center,
                start,
                end,
                radius,
            } => {
                self.vertex(center)?;
                self.vertex(start)?;
                self.vertex(end)?;
                self.add_curve(CurveGeom::Arc {
                    center,
                    start,
                    end,
                    radius,
                });
                Ok(())
            }
            Command::CreateSurface { curves } => {
                for &curve in &curves {
                    self.curve(curve)?;
                }
                self.surfaces.push(SurfaceEnt {
                    geom: SurfaceGeom::Bounded { curves },
                    size: None,
                    nodes: Vec::new(),
                    elements: Vec::new(),
                });
                Ok(())
            }
            Command::CreateRectangle { width, height } => {
                self.create_rectangle(width, height);
                Ok(())
            }
            Command::CreateBrick { x, y, z } => {
                self.create_brick([x, y, z]);
                Ok(())
            }
            Command::Move { kind, id, offset } => self.move_entity(kind, id, offset, raw),
            Command::SetSize { kind, id, size } => self.set_size(kind, id, size, raw),
            Command::SetBias {
                curve,
                fine,
                grading,
            } => {
                self.curve(curve)?;
                let scheme = match grading {
                    BiasGrading::Coarse { size, start_vertex } => CurveScheme::Bias {
                        fine,
                        coarse: size,
                        start_vertex,
                    },
                    // A unit growth factor is a uniform scheme at the fine
                    // size; other factors are not supported.
                    BiasGrading::Factor(factor) => {
                        if (factor - 1.0).abs() > 1.0e-9 {
                            return Err(SessionError::UnsupportedCommand {
                                command: raw.to_owned(),
                                reason: format!("bias factor {factor} is not supported"),
                            });
                        }
                        CurveScheme::BiasFactor { fine }
                    }
                };
                self.curves[curve - 1].scheme = Some(scheme);
                Ok(())
            }
            Command::Mesh { kind, target } => self.mesh(kind, target, raw),
            Command::ImprintAll | Command::MergeAll => Ok(()),
        }
    }

    /// Create an axis-aligned rectangle centred at the origin in the
    /// z-plane, expanded into four vertices, four curves and a bounded
    /// surface so that its edges are selectable entities.
    fn create_rectangle(&mut self, width: f64, height: f64) {
        let (hw, hh) = (0.5 * width, 0.5 * height);
        let v1 = self.add_vertex(Point::new(-hw, -hh, 0.0));
        let v2 = self.add_vertex(Point::new(hw, -hh, 0.0));
        let v3 = self.add_vertex(Point::new(hw, hh, 0.0));
        let v4 = self.add_vertex(Point::new(-hw, hh, 0.0));
        let bottom = self.add_curve(CurveGeom::Line { start: v1, end: v2 });
        let right = self.add_curve(CurveGeom::Line { start: v2, end: v3 });
        let top = self.add_curve(CurveGeom::Line { start: v3, end: v4 });
        let left = self.add_curve(CurveGeom::Line { start: v4, end: v1 });
        self.surfaces.push(SurfaceEnt {
            geom: SurfaceGeom::Bounded {
                curves: vec![bottom, right, top, left],
            },
            size: None,
            nodes: Vec::new(),
            elements: Vec::new(),
        });
    }

    /// Create an axis-aligned brick centred at the origin, together with
    /// its six boundary faces.
    fn create_brick(&mut self, lengths: [f64; 3]) {
        self.has_volumes = true;
        let volume_id = self.volumes.len() + 1;
        let mut faces = [0; 6];
        for (face, slot) in faces.iter_mut().enumerate() {
            self.surfaces.push(SurfaceEnt {
                geom: SurfaceGeom::BrickFace {
                    volume: volume_id,
                    face,
                },
                size: None,
                nodes: Vec::new(),
                elements: Vec::new(),
            });
            *slot = self.surfaces.len();
        }
        self.volumes.push(VolumeEnt {
            lengths,
            center: Vector3::zeros(),
            size: None,
            faces,
            nodes: Vec::new(),
            elements: Vec::new(),
        });
    }

    fn move_entity(
        &mut self,
        kind: EntityKind,
        id: usize,
        offset: Vector3<f64>,
        raw: &str,
    ) -> Result<(), SessionError> {
        match kind {
            EntityKind::Volume => {
                let volume = self.volume(id)?;
                if !volume.elements.is_empty() {
                    return Err(SessionError::UnsupportedCommand {
                        command: raw.to_owned(),
                        reason: "cannot move a meshed volume".to_owned(),
                    });
                }
                self.volumes[id - 1].center += offset;
                Ok(())
            }
            EntityKind::Surface => {
                let surface = self.surface(id)?;
                if !surface.elements.is_empty() {
                    return Err(SessionError::UnsupportedCommand {
                        command: raw.to_owned(),
                        reason: "cannot move a meshed surface".to_owned(),
                    });
                }
                let SurfaceGeom::Bounded { curves } = surface.geom.clone() else {
                    return Err(SessionError::UnsupportedCommand {
                        command: raw.to_owned(),
                        reason: "brick faces move with their volume".to_owned(),
                    });
                };
                let mut vertices = BTreeSet::new();
                for curve in curves {
                    match self.curve(curve)?.geom {
                        CurveGeom::Line { start, end } => {
                            vertices.insert(start);
                            vertices.insert(end);
                        }
                        CurveGeom::Arc {
                            center, start, end, ..
                        } => {
                            vertices.insert(center);
                            vertices.insert(start);
                            vertices.insert(end);
                        }
                    }
                }
                for vertex in vertices {
                    let moved = self.vertices[vertex - 1].position.translated(offset);
                    self.vertices[vertex - 1].position = moved;
                }
                Ok(())
            }
            _ => Err(SessionError::UnsupportedCommand {
                command: raw.to_owned(),
                reason: format!("cannot move {kind} entities"),
            }),
        }
    }

    fn set_size(
        &mut self,
        kind: EntityKind,
        id: usize,
        size: f64,
        raw: &str,
    ) -> Result<(), SessionError> {
        match kind {
            EntityKind::Curve => {
                self.curve(id)?;
                self.curves[id - 1].scheme = Some(CurveScheme::Uniform { size });
                Ok(())
            }
            EntityKind::Surface => {
                self.surface(id)?;
                self.surfaces[id - 1].size = Some(size);
                Ok(())
            }
            EntityKind::Volume => {
                self.volume(id)?;
                self.volumes[id - 1].size = Some(size);
                Ok(())
            }
            EntityKind::Vertex => Err(SessionError::UnsupportedCommand {
                command: raw.to_owned(),
                reason: "vertices have no interval size".to_owned(),
            }),
        }
    }

    fn mesh(
        &mut self,
        kind: EntityKind,
        target: MeshTarget,
        raw: &str,
    ) -> Result<(), SessionError> {
        match (kind, target) {
            (EntityKind::Volume, MeshTarget::Id(id)) => self.mesh_volume(id),
            (EntityKind::Volume, MeshTarget::All) => {
                for id in 1..=self.volumes.len() {
                    self.mesh_volume(id)?;
                }
                Ok(())
            }
            (EntityKind::Surface, MeshTarget::Id(id)) => self.mesh_surface(id),
            (EntityKind::Surface, MeshTarget::All) => {
                for id in 1..=self.surfaces.len() {
                    // Brick faces are meshed with their volume.
                    if matches!(self.surfaces[id - 1].geom, SurfaceGeom::Bounded { .. }) {
                        self.mesh_surface(id)?;
                    }
                }
                Ok(())
            }
            _ => Err(SessionError::UnsupportedCommand {
                command: raw.to_owned(),
                reason: format!("cannot mesh {kind} entities"),
            }),
        }
    }

    /// Mesh a curve into `params.len() - 1` intervals; endpoint nodes are
    /// shared through the vertices.
    fn mesh_curve_with_params(
        &mut self,
        id: usize,
        params: &[f64],
    ) -> Result<(), SessionError> {
        let (start, end) = self.curve_endpoints(id)?;
        let start_node = self.vertex_node(start)?;
        let end_node = self.vertex_node(end)?;
        let mut nodes = Vec::with_capacity(params.len());
        nodes.push(start_node);
        for &t in &params[1..params.len() - 1] {
            let position = self.curve_point(id, t)?;
            nodes.push(self.add_node(position));
        }
        nodes.push(end_node);
        self.curves[id - 1].intervals = Some(params.len() - 1);
        self.curves[id - 1].nodes = nodes;
        Ok(())
    }

    /// Mesh a curve from its assigned scheme, or from a fallback size.
    fn mesh_curve(&mut self, id: usize, fallback: Option<f64>) -> Result<(), SessionError> {
        if !self.curve(id)?.nodes.is_empty() {
            return Ok(());
        }
        let length = self.curve_length(id)?;
        let params = match self.curve(id)?.scheme {
            Some(CurveScheme::Uniform { size }) | Some(CurveScheme::BiasFactor { fine: size }) => {
                uniform_params(uniform_interval_count(length, size))
            }
            Some(CurveScheme::Bias {
                fine,
                coarse,
                start_vertex,
            }) => {
                let (start, end) = self.curve_endpoints(id)?;
                let reversed = if start_vertex == start {
                    false
                } else if start_vertex == end {
                    true
                } else {
                    return Err(SessionError::UnsupportedCommand {
                        command: format!("curve {id} scheme bias"),
                        reason: format!(
                            "start vertex {start_vertex} is not an endpoint of curve {id}"
                        ),
                    });
                };
                bias_params(length, fine, coarse, reversed)
            }
            None => match fallback {
                Some(size) => uniform_params(uniform_interval_count(length, size)),
                None => uniform_params(DEFAULT_INTERVALS),
            },
        };
        self.mesh_curve_with_params(id, &params)
    }

    /// Order the bounding curves of a surface into a closed loop; each entry
    /// carries whether the curve's geometric direction follows the loop.
    fn order_loop(
        &self,
        surface: usize,
        curves: &[usize],
    ) -> Result<Vec<(usize, bool)>, SessionError> {
        let not_closed = || SessionError::NotMappable {
            id: surface,
            reason: "bounding curves do not form a closed loop".to_owned(),
        };
        let first = *curves.first().ok_or_else(not_closed)?;
        let (origin, mut cursor) = self.curve_endpoints(first)?;
        let mut ordered = vec![(first, true)];
        let mut remaining: Vec<usize> = curves[1..].to_vec();
        while !remaining.is_empty() {
            let mut found = None;
            for (index, &candidate) in remaining.iter().enumerate() {
                let (start, end) = self.curve_endpoints(candidate)?;
                if start == cursor {
                    found = Some((index, true, end));
                    break;
                }
                if end == cursor {
                    found = Some((index, false, start));
                    break;
                }
            }
            let (index, forward, next) = found.ok_or_else(not_closed)?;
            ordered.push((remaining.remove(index), forward));
            cursor = next;
        }
        if cursor != origin {
            return Err(not_closed());
        }
        Ok(ordered)
    }

    /// Node row of a meshed curve, oriented along the loop direction.
    fn oriented_nodes(&self, curve: usize, forward: bool) -> Vec<usize> {
        let mut nodes = self.curves[curve - 1].nodes.clone();
        if !forward {
            nodes.reverse();
        }
        nodes
    }

    /// Mesh a bounded surface with the mapped scheme.
    fn mesh_surface(&mut self, id: usize) -> Result<(), SessionError> {
        if !self.surface(id)?.elements.is_empty() {
            return Ok(());
        }
        let SurfaceGeom::Bounded { curves } = self.surface(id)?.geom.clone() else {
            return Err(SessionError::NotMappable {
                id,
                reason: "brick faces are meshed with their volume".to_owned(),
            });
        };
        let ordered = self.order_loop(id, &curves)?;
        if ordered.len() != 4 {
            return Err(SessionError::NotMappable {
                id,
                reason: format!(
                    "the mapped scheme requires four bounding curves, found {}",
                    ordered.len()
                ),
            });
        }
        self.resolve_intervals(id, &ordered)?;
        let intervals: Vec<usize> = ordered
            .iter()
            .map(|&(curve, _)| self.curves[curve - 1].intervals.unwrap_or(0))
            .collect();
        for pair in [(0usize, 2usize), (1, 3)] {
            if intervals[pair.0] != intervals[pair.1] {
                return Err(SessionError::IntervalMismatch {
                    surface: id,
                    first: ordered[pair.0].0,
                    second: ordered[pair.1].0,
                    first_intervals: intervals[pair.0],
                    second_intervals: intervals[pair.1],
                });
            }
        }

        // Boundary rows in grid orientation: i runs along the first curve,
        // j along the second.
        let bottom = self.oriented_nodes(ordered[0].0, ordered[0].1);
        let right = self.oriented_nodes(ordered[1].0, ordered[1].1);
        let mut top = self.oriented_nodes(ordered[2].0, ordered[2].1);
        top.reverse();
        let mut left = self.oriented_nodes(ordered[3].0, ordered[3].1);
        left.reverse();

        let positions = |row: &[usize]| -> Vec<Point> {
            row.iter().map(|&n| self.nodes[n - 1].position).collect()
        };
        let grid_positions = coons_grid(
            &positions(&bottom),
            &positions(&right),
            &positions(&top),
            &positions(&left),
        );

        let m = bottom.len() - 1;
        let n = left.len() - 1;
        let mut grid = vec![vec![0usize; m + 1]; n + 1];
        grid[0].copy_from_slice(&bottom);
        grid[n].copy_from_slice(&top);
        for j in 0..=n {
            grid[j][0] = left[j];
            grid[j][m] = right[j];
        }
        for j in 1..n {
            for i in 1..m {
                grid[j][i] = self.add_node(grid_positions[j][i]);
            }
        }

        let mut elements = Vec::with_capacity(m * n);
        for j in 0..n {
            for i in 0..m {
                let id = self.elements.len() + 1;
                self.elements.push(Element {
                    id,
                    shape: ElementShape::Quad4,
                    nodes: vec![grid[j][i], grid[j][i + 1], grid[j + 1][i + 1], grid[j + 1][i]],
                });
                elements.push(id);
            }
        }

        let mut nodes: Vec<usize> = grid.into_iter().flatten().collect();
        nodes.sort_unstable();
        nodes.dedup();
        self.surfaces[id - 1].nodes = nodes;
        self.surfaces[id - 1].elements = elements;
        debug!(surface = id, intervals_u = m, intervals_v = n, "meshed surface");
        Ok(())
    }

    /// Mesh every bounding curve of a mapped surface, inheriting interval
    /// counts across opposite pairs and falling back to the surface size.
    fn resolve_intervals(
        &mut self,
        surface: usize,
        ordered: &[(usize, bool)],
    ) -> Result<(), SessionError> {
        let surface_size = self.surfaces[surface - 1].size;
        // Explicitly sized curves first; they anchor the inherited counts.
        for &(curve, _) in ordered {
            if self.curves[curve - 1].scheme.is_some() {
                self.mesh_curve(curve, None)?;
            }
        }
        for index in 0..ordered.len() {
            let curve = ordered[index].0;
            if self.curves[curve - 1].intervals.is_some() {
                continue;
            }
            let opposite = ordered[(index + 2) % ordered.len()].0;
            if let Some(count) = self.curves[opposite - 1].intervals {
                self.mesh_curve_with_params(curve, &uniform_params(count))?;
            } else {
                self.mesh_curve(curve, surface_size)?;
            }
        }
        Ok(())
    }

    /// Mesh a brick volume into a structured hex grid and record face
    /// memberships for the boundary surfaces.
    fn mesh_volume(&mut self, id: usize) -> Result<(), SessionError> {
        let volume = self.volume(id)?;
        if !volume.elements.is_empty() {
            return Ok(());
        }
        let lengths = volume.lengths;
        let center = volume.center;
        let faces = volume.faces;
        let size = volume.size.unwrap_or_else(|| {
            lengths.iter().copied().fold(f64::MIN, f64::max) / DEFAULT_INTERVALS as f64
        });
        let divisions = [
            uniform_interval_count(lengths[0], size),
            uniform_interval_count(lengths[1], size),
            uniform_interval_count(lengths[2], size),
        ];
        let [nx, ny, nz] = divisions;
        let origin = center - 0.5 * Vector3::new(lengths[0], lengths[1], lengths[2]);
        let spacing = [
            lengths[0] / nx as f64,
            lengths[1] / ny as f64,
            lengths[2] / nz as f64,
        ];

        let mut grid = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
        let mut face_nodes: [Vec<usize>; 6] = Default::default();
        for k in 0..=nz {
            for j in 0..=ny {
                for i in 0..=nx {
                    let position = Point::new(
                        origin.x + i as f64 * spacing[0],
                        origin.y + j as f64 * spacing[1],
                        origin.z + k as f64 * spacing[2],
                    );
                    let node = self.add_node(position);
                    grid.push(node);
                    if i == 0 {
                        face_nodes[0].push(node);
                    }
                    if i == nx {
                        face_nodes[1].push(node);
                    }
                    if j == 0 {
                        face_nodes[2].push(node);
                    }
                    if j == ny {
                        face_nodes[3].push(node);
                    }
                    if k == 0 {
                        face_nodes[4].push(node);
                    }
                    if k == nz {
                        face_nodes[5].push(node);
                    }
                }
            }
        }
        let index = |i: usize, j: usize, k: usize| grid[i + j * (nx + 1) + k * (nx + 1) * (ny + 1)];

        let mut elements = Vec::with_capacity(nx * ny * nz);
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let element_id = self.elements.len() + 1;
                    self.elements.push(Element {
                        id: element_id,
                        shape: ElementShape::Hex8,
                        nodes: vec![
                            index(i, j, k),
                            index(i + 1, j, k),
                            index(i + 1, j + 1, k),
                            index(i, j + 1, k),
                            index(i, j, k + 1),
                            index(i + 1, j, k + 1),
                            index(i + 1, j + 1, k + 1),
                            index(i, j + 1, k + 1),
                        ],
                    });
                    elements.push(element_id);
                }
            }
        }

        for (face, nodes) in faces.into_iter().zip(face_nodes) {
            self.surfaces[face - 1].nodes = nodes;
        }
        self.volumes[id - 1].nodes = grid;
        self.volumes[id - 1].elements = elements;
        debug!(
            volume = id,
            nx, ny, nz, "meshed volume"
        );
        Ok(())
    }

    /// Nodes of a meshed entity, for node-set resolution.
    fn entity_nodes(&self, kind: EntityKind, id: usize) -> Result<&[usize], SessionError> {
        let not_meshed = SessionError::NotMeshed { kind, id };
        match kind {
            EntityKind::Vertex => match &self.vertex(id)?.node {
                Some(node) => Ok(std::slice::from_ref(node)),
                None => Err(not_meshed),
            },
            EntityKind::Curve => {
                let nodes = &self.curve(id)?.nodes;
                if nodes.is_empty() {
                    Err(not_meshed)
                } else {
                    Ok(nodes)
                }
            }
            EntityKind::Surface => {
                let nodes = &self.surface(id)?.nodes;
                if nodes.is_empty() {
                    Err(not_meshed)
                } else {
                    Ok(nodes)
                }
            }
            EntityKind::Volume => {
                let nodes = &self.volume(id)?.nodes;
                if nodes.is_empty() {
                    Err(not_meshed)
                } else {
                    Ok(nodes)
                }
            }
        }
    }

    fn matches_clauses(
        &self,
        kind: EntityKind,
        id: usize,
        clauses: &[CoordClause],
    ) -> Result<bool, SessionError> {
        let centroid = self.centroid(kind, id)?;
        Ok(clauses
            .iter()
            .all(|clause| clause.matches(centroid.coord(clause.axis))))
    }
}

impl MeshingSession for NativeSession {
    fn cmd(&mut self, command: &str) -> Result<(), SessionError> {
        let parsed = Command::parse(command)?;
        debug!(command, "executing");
        self.journal.push(command.to_owned());
        self.execute(parsed, command)
    }

    fn entity_ids(&self, kind: EntityKind) -> Vec<usize> {
        let count = match kind {
            EntityKind::Vertex => self.vertices.len(),
            EntityKind::Curve => self.curves.len(),
            EntityKind::Surface => self.surfaces.len(),
            EntityKind::Volume => self.volumes.len(),
        };
        (1..=count).collect()
    }

    fn last_id(&self, kind: EntityKind) -> Option<usize> {
        self.entity_ids(kind).last().copied()
    }

    fn group(&mut self, selector: &str, name: Option<&str>) -> Result<GroupId, SessionError> {
        let parsed = Selector::parse(selector)?;
        let members = match parsed {
            Selector::Ids { kind, ids } => {
                for &id in &ids {
                    self.centroid(kind, id)?;
                }
                ids.into_iter().map(|id| (kind, id)).collect()
            }
            Selector::Predicate { kind, clauses } => {
                let mut members = Vec::new();
                for id in self.entity_ids(kind) {
                    if self.matches_clauses(kind, id, &clauses)? {
                        members.push((kind, id));
                    }
                }
                members
            }
            Selector::InGroup { kind, group } => {
                let source = self
                    .groups
                    .iter()
                    .find(|candidate| candidate.name.as_deref() == Some(group.as_str()))
                    .ok_or(SessionError::UnknownGroup(group))?;
                source
                    .members
                    .iter()
                    .copied()
                    .filter(|&(member_kind, _)| member_kind == kind)
                    .collect()
            }
        };
        self.groups.push(GroupEnt {
            name: name.map(str::to_owned),
            members,
        });
        Ok(GroupId(self.groups.len()))
    }

    fn add_node_set(
        &mut self,
        group: GroupId,
        name: &str,
        condition: BoundaryCondition,
    ) -> Result<NodeSetId, SessionError> {
        let members = self
            .groups
            .get(group.0.wrapping_sub(1))
            .ok_or(SessionError::UnknownGroupId(group.0))?
            .members
            .clone();
        let mut nodes = BTreeSet::new();
        let mut source = None;
        for (kind, id) in members {
            source.get_or_insert(kind);
            nodes.extend(self.entity_nodes(kind, id)?.iter().copied());
        }
        if nodes.is_empty() {
            return Err(SessionError::EmptyGroup(group.0));
        }
        let id = self.node_sets.len() + 1;
        self.node_sets.push(NodeSet {
            id,
            name: name.to_owned(),
            source: source.unwrap_or(EntityKind::Vertex),
            condition,
            nodes: nodes.into_iter().collect(),
        });
        Ok(NodeSetId(id))
    }

    fn add_element_block(
        &mut self,
        group: GroupId,
        shape: ElementShape,
        material: usize,
        description: &str,
    ) -> Result<BlockId, SessionError> {
        let members = self
            .groups
            .get(group.0.wrapping_sub(1))
            .ok_or(SessionError::UnknownGroupId(group.0))?
            .members
            .clone();
        let mut elements = Vec::new();
        for (kind, id) in members {
            let entity_elements = match kind {
                EntityKind::Surface => {
                    let surface = self.surface(id)?;
                    if surface.elements.is_empty() {
                        return Err(SessionError::NotMeshed { kind, id });
                    }
                    surface.elements.clone()
                }
                EntityKind::Volume => {
                    let volume = self.volume(id)?;
                    if volume.elements.is_empty() {
                        return Err(SessionError::NotMeshed { kind, id });
                    }
                    volume.elements.clone()
                }
                _ => {
                    return Err(SessionError::UnsupportedCommand {
                        command: format!("add element block over {kind} {id}"),
                        reason: "element blocks are formed from surfaces or volumes".to_owned(),
                    })
                }
            };
            for &element in &entity_elements {
                let found = self.elements[element - 1].shape;
                if found != shape {
                    return Err(SessionError::MixedBlockShapes {
                        expected: shape,
                        found,
                    });
                }
            }
            elements.extend(entity_elements);
        }
        if elements.is_empty() {
            return Err(SessionError::EmptyGroup(group.0));
        }
        let id = self.blocks.len() + 1;
        self.blocks.push(ElementBlock {
            id,
            shape,
            material,
            description: description.to_owned(),
            elements,
        });
        Ok(BlockId(id))
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn element_count(&self) -> usize {
        self.elements.len()
    }

    fn node_set_ids(&self) -> Vec<usize> {
        (1..=self.node_sets.len()).collect()
    }

    fn node_set_node_count(&self, id: usize) -> Result<usize, SessionError> {
        self.node_sets
            .get(id.wrapping_sub(1))
            .map(|set| set.nodes.len())
            .ok_or(SessionError::UnknownNodeSet(id))
    }

    fn mesh_model(&self) -> MeshModel {
        MeshModel {
            dimension: self.dimension(),
            nodes: self.nodes.clone(),
            elements: self.elements.clone(),
            node_sets: self.node_sets.clone(),
            blocks: self.blocks.clone(),
        }
    }
}

/// Normalize an angular sweep into `(-pi, pi]` so arcs follow the shorter
/// path between their endpoints.
fn shortest_sweep(mut sweep: f64) -> f64 {
    use std::f64::consts::PI;
    while sweep > PI {
        sweep -= 2.0 * PI;
    }
    while sweep <= -PI {
        sweep += 2.0 * PI;
    }
    sweep
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bc::DofConstraint;
    use approx::assert_relative_eq;

    fn meshed_rectangle(width: f64, height: f64, size: f64) -> NativeSession {
        let mut session = NativeSession::new();
        session
            .cmd(&format!(
                "create surface rectangle width {width} height {height} zplane"
            ))
            .expect("rectangle created");
        session
            .cmd(&format!("surface 1 size {size}"))
            .expect("size set");
        session.cmd("mesh surface 1").expect("surface meshed");
        session
    }

    #[test]
    fn rectangle_meshes_into_a_structured_grid() {
        let session = meshed_rectangle(20.0, 2.0, 0.1);
        assert_eq!(session.node_count(), 201 * 21);
        assert_eq!(session.element_count(), 200 * 20);
        assert_eq!(session.dimension(), 2);
    }

    #[test]
    fn rectangle_edges_are_selectable_curves() {
        let mut session = meshed_rectangle(20.0, 2.0, 0.5);
        let bottom = session
            .group("add curve with y_coord < -0.99999", None)
            .expect("group formed");
        let set = session
            .add_node_set(bottom, "bottom", BoundaryCondition::Dirichlet(DofConstraint::fixed(2)))
            .expect("node set registered");
        // 20 / 0.5 = 40 intervals, 41 nodes on the bottom edge.
        assert_eq!(session.node_set_node_count(set.0).expect("known set"), 41);
    }

    #[test]
    fn brick_meshes_into_a_structured_hex_grid() {
        let mut session = NativeSession::new();
        session.cmd("brick x 4 y 1 z 1").expect("brick created");
        session
            .cmd("move volume 1 x 2 y 0 z 0 include_merged")
            .expect("brick moved");
        session.cmd("volume 1 size 0.5").expect("size set");
        session.cmd("mesh volume 1").expect("volume meshed");

        assert_eq!(session.node_count(), 9 * 3 * 3);
        assert_eq!(session.element_count(), 8 * 2 * 2);
        assert_eq!(session.dimension(), 3);

        // After the move the brick spans x in [0, 4]; only one face sits at
        // the origin plane.
        let left = session
            .group("add surface with x_coord < 1e-5", None)
            .expect("group formed");
        let set = session
            .add_node_set(left, "rigid_left", BoundaryCondition::Dirichlet(DofConstraint::fixed(3)))
            .expect("node set registered");
        assert_eq!(session.node_set_node_count(set.0).expect("known set"), 9);
    }

    #[test]
    fn shared_curves_share_nodes() {
        let mut session = NativeSession::new();
        for command in [
            "create vertex 0 0 0",
            "create vertex 1 0 0",
            "create vertex 2 0 0",
            "create vertex 2 1 0",
            "create vertex 1 1 0",
            "create vertex 0 1 0",
            "create curve vertex 1 2",
            "create curve vertex 2 3",
            "create curve vertex 3 4",
            "create curve vertex 4 5",
            "create curve vertex 5 6",
            "create curve vertex 6 1",
            "create curve vertex 2 5",
            "create surface curve 1 7 5 6",
            "create surface curve 2 3 4 7",
            "imprint all",
            "merge all",
            "surface 1 size 0.5",
            "surface 2 size 0.5",
            "mesh surface all",
        ] {
            session.cmd(command).expect("command executes");
        }
        // Two 2x2 patches sharing one edge: 9 + 9 - 3 shared nodes.
        assert_eq!(session.element_count(), 8);
        assert_eq!(session.node_count(), 15);
    }

    #[test]
    fn mapped_scheme_rejects_mismatched_intervals() {
        let mut session = NativeSession::new();
        for command in [
            "create vertex 0 0 0",
            "create vertex 1 0 0",
            "create vertex 1 1 0",
            "create vertex 0 1 0",
            "create curve vertex 1 2",
            "create curve vertex 2 3",
            "create curve vertex 3 4",
            "create curve vertex 4 1",
            "create surface curve 1 2 3 4",
            "curve 1 size 0.5",
            "curve 3 size 0.25",
        ] {
            session.cmd(command).expect("command executes");
        }
        let error = session.cmd("mesh surface 1").expect_err("mismatch detected");
        assert!(matches!(error, SessionError::IntervalMismatch { .. }));
    }

    #[test]
    fn arc_curves_sample_on_the_circle() {
        let mut session = NativeSession::new();
        for command in [
            "create vertex 0 0 0",
            "create vertex 1 0 0",
            "create vertex 0 -1 0",
            "create curve arc center vertex 1 2 3 radius 1",
        ] {
            session.cmd(command).expect("command executes");
        }
        let mid = session.curve_point(1, 0.5).expect("point on curve");
        assert_relative_eq!(mid.x, std::f64::consts::FRAC_1_SQRT_2, epsilon = 1.0e-12);
        assert_relative_eq!(mid.y, -std::f64::consts::FRAC_1_SQRT_2, epsilon = 1.0e-12);
        assert_relative_eq!(
            session.curve_length(1).expect("length"),
            std::f64::consts::FRAC_PI_2,
            epsilon = 1.0e-12
        );
    }

    #[test]
    fn unknown_entities_are_rejected() {
        let mut session = NativeSession::new();
        assert!(matches!(
            session.cmd("mesh surface 7"),
            Err(SessionError::UnknownEntity {
                kind: EntityKind::Surface,
                id: 7
            })
        ));
        assert!(matches!(
            session.cmd("create curve vertex 1 2"),
            Err(SessionError::UnknownEntity {
                kind: EntityKind::Vertex,
                ..
            })
        ));
    }

    #[test]
    fn node_sets_require_meshed_entities() {
        let mut session = NativeSession::new();
        session
            .cmd("create surface rectangle width 2 height 1 zplane")
            .expect("rectangle created");

        // The edges exist as geometry but carry no nodes yet.
        let edges = session
            .group("add curve with y_coord < -0.49999", None)
            .expect("group formed");
        let error = session
            .add_node_set(
                edges,
                "bottom",
                BoundaryCondition::Dirichlet(DofConstraint::fixed(2)),
            )
            .expect_err("unmeshed curve rejected");
        assert!(matches!(
            error,
            SessionError::NotMeshed {
                kind: EntityKind::Curve,
                ..
            }
        ));

        let surface = session.group("add surface 1", None).expect("group formed");
        let error = session
            .add_element_block(surface, ElementShape::Quad4, 1, "KINEM nonlinear")
            .expect_err("unmeshed surface rejected");
        assert!(matches!(
            error,
            SessionError::NotMeshed {
                kind: EntityKind::Surface,
                id: 1
            }
        ));
    }

    #[test]
    fn empty_selections_are_rejected() {
        let mut session = meshed_rectangle(2.0, 1.0, 0.5);
        let nothing = session
            .group("add curve with y_coord < -100", None)
            .expect("group formed");
        let error = session
            .add_node_set(
                nothing,
                "void",
                BoundaryCondition::Dirichlet(DofConstraint::fixed(2)),
            )
            .expect_err("empty selection rejected");
        assert!(matches!(error, SessionError::EmptyGroup(_)));

        let error = session
            .add_element_block(nothing, ElementShape::Quad4, 1, "KINEM nonlinear")
            .expect_err("empty selection rejected");
        assert!(matches!(error, SessionError::EmptyGroup(_)));
    }

    #[test]
    fn groups_can_reference_named_groups() {
        let mut session = meshed_rectangle(2.0, 2.0, 1.0);
        session
            .group("add surface 1", Some("patch"))
            .expect("named group formed");
        let via_name = session
            .group("add surface in patch", None)
            .expect("group formed");
        let block = session
            .add_element_block(via_name, ElementShape::Quad4, 1, "KINEM nonlinear")
            .expect("block registered");
        assert_eq!(block, BlockId(1));
        let model = session.mesh_model();
        assert_eq!(model.blocks[0].elements.len(), 4);
    }
}
