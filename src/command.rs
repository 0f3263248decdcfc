//! Parser for the meshing session's command mini-language.
//!
//! Generators drive a session through short textual commands
//! (`brick x 4 y 1 z 1`, `curve 8 scheme bias fine size 0.02 ...`) and
//! selector expressions (`add surface with x_coord < 1e-5`). The parser
//! turns both into typed values so session implementations never touch the
//! raw strings.

use nalgebra::Vector3;

use crate::errors::SessionError;
use crate::geometry::Point;
use crate::mesh::EntityKind;

/// Target of a `mesh` command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshTarget {
    /// A single entity.
    Id(usize),
    /// Every entity of the kind.
    All,
}

/// Grading of a biased curve scheme.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BiasGrading {
    /// Geometric grading from a fine size at `start_vertex` to a coarse
    /// size at the other end.
    Coarse {
        /// Target interval size at the far end.
        size: f64,
        /// Vertex id carrying the fine end.
        start_vertex: usize,
    },
    /// Fixed growth factor between consecutive intervals.
    Factor(f64),
}

/// A parsed session command.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// `create vertex X Y Z`
    CreateVertex {
        /// Vertex position.
        position: Point,
    },
    /// `create curve vertex A B`
    CreateCurve {
        /// Start vertex id.
        start: usize,
        /// End vertex id.
        end: usize,
    },
    /// `create curve arc center vertex C A B radius R`
    CreateArc {
        /// Centre vertex id.
        center: usize,
        /// Start vertex id.
        start: usize,
        /// End vertex id.
        end: usize,
        /// Arc radius.
        radius: f64,
    },
    /// `create surface curve C1 C2 ...`
    CreateSurface {
        /// Bounding curve ids.
        curves: Vec<usize>,
    },
    /// `create surface rectangle width W height H zplane`
    CreateRectangle {
        /// Edge length along X.
        width: f64,
        /// Edge length along Y.
        height: f64,
    },
    /// `brick x LX y LY z LZ`
    CreateBrick {
        /// Edge length along X.
        x: f64,
        /// Edge length along Y.
        y: f64,
        /// Edge length along Z.
        z: f64,
    },
    /// `move surface|volume ID x DX y DY z DZ`
    Move {
        /// Kind of the moved entity.
        kind: EntityKind,
        /// Id of the moved entity.
        id: usize,
        /// Translation vector.
        offset: Vector3<f64>,
    },
    /// `volume|surface|curve ID size S`
    SetSize {
        /// Kind of the sized entity.
        kind: EntityKind,
        /// Id of the sized entity.
        id: usize,
        /// Approximate interval size.
        size: f64,
    },
    /// `curve ID scheme bias fine size F ...`
    SetBias {
        /// Id of the graded curve.
        curve: usize,
        /// Interval size at the fine end.
        fine: f64,
        /// How the intervals grow away from the fine end.
        grading: BiasGrading,
    },
    /// `mesh volume|surface ID|all`
    Mesh {
        /// Kind of the meshed entities.
        kind: EntityKind,
        /// Which entities to mesh.
        target: MeshTarget,
    },
    /// `imprint all`, a recorded no-op; the constructive geometry store
    /// already shares boundaries.
    ImprintAll,
    /// `merge all`, recorded no-op, same reason.
    MergeAll,
}

/// Comparison direction of a coordinate clause.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordOp {
    /// Centroid coordinate must be below the bound.
    Less,
    /// Centroid coordinate must be above the bound.
    Greater,
}

/// A single coordinate comparison against an entity centroid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordClause {
    /// Axis index (0 = x, 1 = y, 2 = z).
    pub axis: usize,
    /// Comparison direction.
    pub op: CoordOp,
    /// Comparison bound.
    pub bound: f64,
}

impl CoordClause {
    /// Evaluate the clause against a coordinate value.
    #[must_use]
    pub fn matches(&self, value: f64) -> bool {
        match self.op {
            CoordOp::Less => value < self.bound,
            CoordOp::Greater => value > self.bound,
        }
    }
}

/// A parsed group selector.
#[derive(Clone, Debug, PartialEq)]
pub enum Selector {
    /// `add <kind> ID...`
    Ids {
        /// Kind of the selected entities.
        kind: EntityKind,
        /// Explicit entity ids.
        ids: Vec<usize>,
    },
    /// `add <kind> with <clauses joined by and>`
    Predicate {
        /// Kind of the selected entities.
        kind: EntityKind,
        /// Conjunction of coordinate clauses over the entity centroid.
        clauses: Vec<CoordClause>,
    },
    /// `add <kind> in GROUP`
    InGroup {
        /// Kind of the selected entities.
        kind: EntityKind,
        /// Name of the group to draw entities from.
        group: String,
    },
}

/// Cursor over whitespace-separated tokens with contextual errors.
struct Tokens<'a> {
    source: &'a str,
    tokens: Vec<&'a str>,
    cursor: usize,
}

impl<'a> Tokens<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            tokens: source.split_whitespace().collect(),
            cursor: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> SessionError {
        SessionError::InvalidCommand {
            command: self.source.to_owned(),
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.cursor).copied()
    }

    fn next(&mut self) -> Option<&'a str> {
        let token = self.peek()?;
        self.cursor += 1;
        Some(token)
    }

    fn expect(&mut self, keyword: &str) -> Result<(), SessionError> {
        match self.next() {
            Some(token) if token == keyword => Ok(()),
            Some(token) => Err(self.error(format!("expected `{keyword}`, found `{token}`"))),
            None => Err(self.error(format!("expected `{keyword}`, found end of input"))),
        }
    }

    fn next_f64(&mut self, what: &str) -> Result<f64, SessionError> {
        match self.next() {
            Some(token) => token
                .parse()
                .map_err(|_| self.error(format!("expected a number for {what}, found `{token}`"))),
            None => Err(self.error(format!("missing value for {what}"))),
        }
    }

    fn next_id(&mut self, what: &str) -> Result<usize, SessionError> {
        match self.next() {
            Some(token) => token
                .parse()
                .map_err(|_| self.error(format!("expected an id for {what}, found `{token}`"))),
            None => Err(self.error(format!("missing id for {what}"))),
        }
    }

    fn finish(&mut self, parsed: Command) -> Result<Command, SessionError> {
        // A trailing `include_merged` is accepted on any command for parity
        // with the external tool's journal syntax.
        if self.peek() == Some("include_merged") {
            self.cursor += 1;
        }
        match self.peek() {
            None => Ok(parsed),
            Some(token) => Err(self.error(format!("unexpected trailing token `{token}`"))),
        }
    }
}

impl Command {
    /// Parse a command string.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidCommand`] when the string does not
    /// match the supported grammar.
    pub fn parse(input: &str) -> Result<Self, SessionError> {
        let mut tokens = Tokens::new(input);
        let head = tokens
            .next()
            .ok_or_else(|| tokens.error("empty command"))?;
        match head {
            "create" => Self::parse_create(&mut tokens),
            "brick" => Self::parse_brick(&mut tokens),
            "move" => Self::parse_move(&mut tokens),
            "mesh" => Self::parse_mesh(&mut tokens),
            "imprint" => {
                tokens.expect("all")?;
                tokens.finish(Self::ImprintAll)
            }
            "merge" => {
                tokens.expect("all")?;
                tokens.finish(Self::MergeAll)
            }
            "volume" | "surface" | "curve" => Self::parse_entity_setting(head, &mut tokens),
            other => Err(tokens.error(format!("unknown command `{other}`"))),
        }
    }

    fn parse_create(tokens: &mut Tokens<'_>) -> Result<Self, SessionError> {
        match tokens.next() {
            Some("vertex") => {
                let x = tokens.next_f64("vertex x")?;
                let y = tokens.next_f64("vertex y")?;
                let z = tokens.next_f64("vertex z")?;
                tokens.finish(Self::CreateVertex {
                    position: Point::new(x, y, z),
                })
            }
            Some("curve") => match tokens.peek() {
                Some("vertex") => {
                    tokens.expect("vertex")?;
                    let start = tokens.next_id("start vertex")?;
                    let end = tokens.next_id("end vertex")?;
                    tokens.finish(Self::CreateCurve { start, end })
                }
                Some("arc") => {
                    tokens.expect("arc")?;
                    tokens.expect("center")?;
                    tokens.expect("vertex")?;
                    let center = tokens.next_id("center vertex")?;
                    let start = tokens.next_id("start vertex")?;
                    let end = tokens.next_id("end vertex")?;
                    tokens.expect("radius")?;
                    let radius = tokens.next_f64("arc radius")?;
                    tokens.finish(Self::CreateArc {
                        center,
                        start,
                        end,
                        radius,
                    })
                }
                other => Err(tokens.error(format!(
                    "expected `vertex` or `arc` after `create curve`, found `{}`",
                    other.unwrap_or("end of input")
                ))),
            },
            Some("surface") => match tokens.next() {
                Some("curve") => {
                    let mut curves = Vec::new();
                    while tokens.peek().is_some() {
                        curves.push(tokens.next_id("bounding curve")?);
                    }
                    if curves.is_empty() {
                        return Err(tokens.error("`create surface curve` needs curve ids"));
                    }
                    Ok(Self::CreateSurface { curves })
                }
                Some("rectangle") => {
                    tokens.expect("width")?;
                    let width = tokens.next_f64("rectangle width")?;
                    tokens.expect("height")?;
                    let height = tokens.next_f64("rectangle height")?;
                    tokens.expect("zplane")?;
                    tokens.finish(Self::CreateRectangle { width, height })
                }
                other => Err(tokens.error(format!(
                    "expected `curve` or `rectangle` after `create surface`, found `{}`",
                    other.unwrap_or("end of input")
                ))),
            },
            other => Err(tokens.error(format!(
                "unknown create target `{}`",
                other.unwrap_or("end of input")
            ))),
        }
    }

    fn parse_brick(tokens: &mut Tokens<'_>) -> Result<Self, SessionError> {
        tokens.expect("x")?;
        let x = tokens.next_f64("brick x")?;
        // `brick x L` is a cube; omitted axes fall back to the x edge.
        let mut y = x;
        let mut z = x;
        if tokens.peek() == Some("y") {
            tokens.expect("y")?;
            y = tokens.next_f64("brick y")?;
        }
        if tokens.peek() == Some("z") {
            tokens.expect("z")?;
            z = tokens.next_f64("brick z")?;
        }
        tokens.finish(Self::CreateBrick { x, y, z })
    }

    fn parse_move(tokens: &mut Tokens<'_>) -> Result<Self, SessionError> {
        let kind = match tokens.next() {
            Some(token) => EntityKind::from_keyword(token)
                .ok_or_else(|| tokens.error(format!("cannot move `{token}` entities")))?,
            None => return Err(tokens.error("missing entity kind after `move`")),
        };
        let id = tokens.next_id("moved entity")?;
        let mut offset = Vector3::zeros();
        while let Some(token) = tokens.peek() {
            let axis = match token {
                "x" => 0,
                "y" => 1,
                "z" => 2,
                _ => break,
            };
            tokens.cursor += 1;
            // An axis keyword without a trailing number means zero; the
            // journal syntax allows `... z include_merged`.
            if let Some(next) = tokens.peek() {
                if let Ok(value) = next.parse::<f64>() {
                    tokens.cursor += 1;
                    offset[axis] = value;
                }
            }
        }
        tokens.finish(Self::Move { kind, id, offset })
    }

    fn parse_mesh(tokens: &mut Tokens<'_>) -> Result<Self, SessionError> {
        let kind = match tokens.next() {
            Some(token) => EntityKind::from_keyword(token)
                .ok_or_else(|| tokens.error(format!("cannot mesh `{token}` entities")))?,
            None => return Err(tokens.error("missing entity kind after `mesh`")),
        };
        let target = match tokens.next() {
            Some("all") => MeshTarget::All,
            Some(token) => MeshTarget::Id(token.parse().map_err(|_| {
                tokens.error(format!("expected an id or `all`, found `{token}`"))
            })?),
            None => return Err(tokens.error("missing mesh target")),
        };
        tokens.finish(Self::Mesh { kind, target })
    }

    fn parse_entity_setting(keyword: &str, tokens: &mut Tokens<'_>) -> Result<Self, SessionError> {
        let kind = EntityKind::from_keyword(keyword)
            .ok_or_else(|| tokens.error(format!("unknown entity kind `{keyword}`")))?;
        let id = tokens.next_id("sized entity")?;
        match tokens.next() {
            Some("size") => {
                let size = tokens.next_f64("interval size")?;
                tokens.finish(Self::SetSize { kind, id, size })
            }
            Some("scheme") if kind == EntityKind::Curve => {
                tokens.expect("bias")?;
                tokens.expect("fine")?;
                tokens.expect("size")?;
                let fine = tokens.next_f64("fine size")?;
                let grading = match tokens.next() {
                    Some("coarse") => {
                        tokens.expect("size")?;
                        let size = tokens.next_f64("coarse size")?;
                        tokens.expect("start")?;
                        tokens.expect("vertex")?;
                        let start_vertex = tokens.next_id("start vertex")?;
                        BiasGrading::Coarse { size, start_vertex }
                    }
                    Some("factor") => BiasGrading::Factor(tokens.next_f64("bias factor")?),
                    other => {
                        return Err(tokens.error(format!(
                            "expected `coarse` or `factor`, found `{}`",
                            other.unwrap_or("end of input")
                        )))
                    }
                };
                tokens.finish(Self::SetBias {
                    curve: id,
                    fine,
                    grading,
                })
            }
            other => Err(tokens.error(format!(
                "expected `size` or `scheme`, found `{}`",
                other.unwrap_or("end of input")
            ))),
        }
    }
}

impl Selector {
    /// Parse a group selector string.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSelector`] when the expression does
    /// not match the supported grammar.
    pub fn parse(input: &str) -> Result<Self, SessionError> {
        let error = |reason: String| SessionError::InvalidSelector {
            selector: input.to_owned(),
            reason,
        };
        let tokens: Vec<&str> = input.split_whitespace().collect();
        let mut cursor = tokens.iter();
        match cursor.next() {
            Some(&"add") => (),
            other => {
                return Err(error(format!(
                    "selectors start with `add`, found `{}`",
                    other.copied().unwrap_or("end of input")
                )))
            }
        }
        let kind = match cursor.next() {
            Some(token) => EntityKind::from_keyword(token)
                .ok_or_else(|| error(format!("unknown entity kind `{token}`")))?,
            None => return Err(error("missing entity kind".to_owned())),
        };
        let rest: Vec<&str> = cursor.copied().collect();
        match rest.first() {
            Some(&"with") => {
                let clauses = Self::parse_clauses(&rest[1..])
                    .map_err(|reason| error(reason))?;
                Ok(Self::Predicate { kind, clauses })
            }
            Some(&"in") => {
                if rest.len() != 2 {
                    return Err(error("`in` takes exactly one group name".to_owned()));
                }
                Ok(Self::InGroup {
                    kind,
                    group: rest[1].to_owned(),
                })
            }
            Some(_) => {
                let ids = rest
                    .iter()
                    .map(|token| {
                        token
                            .parse()
                            .map_err(|_| error(format!("expected an id, found `{token}`")))
                    })
                    .collect::<Result<Vec<usize>, SessionError>>()?;
                Ok(Self::Ids { kind, ids })
            }
            None => Err(error("selector has no body".to_owned())),
        }
    }

    /// Parse `x_coord < 0.5 and -0.5 < y_coord` style clause conjunctions.
    fn parse_clauses(tokens: &[&str]) -> Result<Vec<CoordClause>, String> {
        if tokens.is_empty() {
            return Err("predicate has no clauses".to_owned());
        }
        tokens
            .split(|token| *token == "and")
            .map(Self::parse_clause)
            .collect()
    }

    fn parse_clause(tokens: &[&str]) -> Result<CoordClause, String> {
        let [lhs, op, rhs] = tokens else {
            return Err(format!(
                "clauses have the form `<lhs> <op> <rhs>`, found `{}`",
                tokens.join(" ")
            ));
        };
        let op = match *op {
            "<" => CoordOp::Less,
            ">" => CoordOp::Greater,
            other => return Err(format!("unknown comparison `{other}`")),
        };
        match (Self::parse_axis(lhs), Self::parse_axis(rhs)) {
            (Some(axis), None) => {
                let bound: f64 = rhs
                    .parse()
                    .map_err(|_| format!("expected a number, found `{rhs}`"))?;
                Ok(CoordClause { axis, op, bound })
            }
            // Literal-first clauses flip the comparison: `v < x_coord` is
            // `x_coord > v`.
            (None, Some(axis)) => {
                let bound: f64 = lhs
                    .parse()
                    .map_err(|_| format!("expected a number, found `{lhs}`"))?;
                let op = match op {
                    CoordOp::Less => CoordOp::Greater,
                    CoordOp::Greater => CoordOp::Less,
                };
                Ok(CoordClause { axis, op, bound })
            }
            _ => Err(format!(
                "exactly one side must be a coordinate, found `{lhs} {rhs}`"
            )),
        }
    }

    fn parse_axis(token: &str) -> Option<usize> {
        match token {
            "x_coord" => Some(0),
            "y_coord" => Some(1),
            "z_coord" => Some(2),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point;

    #[test]
    fn parses_primitive_creation() {
        assert_eq!(
            Command::parse("brick x 4 y 1 z 1").expect("valid command"),
            Command::CreateBrick { x: 4.0, y: 1.0, z: 1.0 }
        );
        assert_eq!(
            Command::parse("brick x 2").expect("valid command"),
            Command::CreateBrick { x: 2.0, y: 2.0, z: 2.0 }
        );
        assert_eq!(
            Command::parse("create surface rectangle width 20 height 2 zplane")
                .expect("valid command"),
            Command::CreateRectangle { width: 20.0, height: 2.0 }
        );
    }

    #[test]
    fn parses_vertex_curve_surface_chain() {
        assert_eq!(
            Command::parse("create vertex 0.707 -0.707 0").expect("valid command"),
            Command::CreateVertex { position: point(0.707, -0.707, 0.0) }
        );
        assert_eq!(
            Command::parse("create curve vertex 2 3").expect("valid command"),
            Command::CreateCurve { start: 2, end: 3 }
        );
        assert_eq!(
            Command::parse("create curve arc center vertex 1 3 4 radius 1").expect("valid command"),
            Command::CreateArc { center: 1, start: 3, end: 4, radius: 1.0 }
        );
        assert_eq!(
            Command::parse("create surface curve 1 2 7 8").expect("valid command"),
            Command::CreateSurface { curves: vec![1, 2, 7, 8] }
        );
    }

    #[test]
    fn parses_move_with_missing_axis_value() {
        let command =
            Command::parse("move surface 5 x 0 y -1.05 z include_merged").expect("valid command");
        assert_eq!(
            command,
            Command::Move {
                kind: EntityKind::Surface,
                id: 5,
                offset: nalgebra::Vector3::new(0.0, -1.05, 0.0),
            }
        );
    }

    #[test]
    fn parses_sizing_and_bias_schemes() {
        assert_eq!(
            Command::parse("volume 1 size 0.1").expect("valid command"),
            Command::SetSize { kind: EntityKind::Volume, id: 1, size: 0.1 }
        );
        assert_eq!(
            Command::parse(
                "curve 8 scheme bias fine size 0.03 coarse size 0.1 start vertex 9"
            )
            .expect("valid command"),
            Command::SetBias {
                curve: 8,
                fine: 0.03,
                grading: BiasGrading::Coarse { size: 0.1, start_vertex: 9 },
            }
        );
        assert_eq!(
            Command::parse("curve 3 scheme bias fine size 0.02 factor 1.0").expect("valid command"),
            Command::SetBias { curve: 3, fine: 0.02, grading: BiasGrading::Factor(1.0) }
        );
    }

    #[test]
    fn parses_mesh_targets() {
        assert_eq!(
            Command::parse("mesh volume 1").expect("valid command"),
            Command::Mesh { kind: EntityKind::Volume, target: MeshTarget::Id(1) }
        );
        assert_eq!(
            Command::parse("mesh surface all").expect("valid command"),
            Command::Mesh { kind: EntityKind::Surface, target: MeshTarget::All }
        );
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(Command::parse("").is_err());
        assert!(Command::parse("destroy surface 1").is_err());
        assert!(Command::parse("brick y 1").is_err());
        assert!(Command::parse("curve 8 scheme bias fine size").is_err());
        assert!(Command::parse("mesh surface one").is_err());
    }

    #[test]
    fn parses_id_and_group_selectors() {
        assert_eq!(
            Selector::parse("add surface 1 2 3 4").expect("valid selector"),
            Selector::Ids { kind: EntityKind::Surface, ids: vec![1, 2, 3, 4] }
        );
        assert_eq!(
            Selector::parse("add surface in semicircle").expect("valid selector"),
            Selector::InGroup { kind: EntityKind::Surface, group: "semicircle".to_owned() }
        );
    }

    #[test]
    fn parses_predicate_selectors() {
        let selector =
            Selector::parse("add curve with y_coord < -0.99999").expect("valid selector");
        let Selector::Predicate { kind, clauses } = selector else {
            panic!("expected a predicate selector");
        };
        assert_eq!(kind, EntityKind::Curve);
        assert_eq!(clauses.len(), 1);
        assert!(clauses[0].matches(-1.0));
        assert!(!clauses[0].matches(0.0));
    }

    #[test]
    fn literal_first_clauses_flip_the_comparison() {
        let selector = Selector::parse("add curve with -1e-5 < y_coord and y_coord < 1e-5")
            .expect("valid selector");
        let Selector::Predicate { clauses, .. } = selector else {
            panic!("expected a predicate selector");
        };
        assert_eq!(clauses.len(), 2);
        assert!(clauses.iter().all(|clause| clause.matches(0.0)));
        assert!(!clauses[0].matches(-1.0));
        assert!(!clauses[1].matches(1.0));
    }
}
