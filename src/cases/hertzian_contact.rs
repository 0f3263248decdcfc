//! Two dimensional Hertzian-type contact under large deformation.
//!
//! A semicircle assembled from four mapped surfaces is pressed onto a rigid
//! obstacle below it. The mesh is bias-graded so elements shrink toward the
//! contact zone at the bottom of the arc while the bulk stays coarse.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::bc::{
    BoundaryCondition, ContactCondition, ContactInitialization, ContactSide, DofConstraint,
};
use crate::cases::{ensure_dir, GeneratedCase, Kinematics};
use crate::deck::{self, Head, HeadSection};
use crate::errors::{GenerateError, SessionError};
use crate::mesh::{ElementShape, EntityKind};
use crate::report::{Summary, SummarySection};
use crate::session::native::NativeSession;
use crate::session::{tracked_cmd_single, MeshingSession};
use crate::stats::MeshStatistics;

/// Parameters of the Hertzian contact case.
#[derive(Clone, Debug, Serialize)]
pub struct Params {
    /// Radius of the semicircle.
    pub radius: f64,
    /// Half width of the central helper block.
    pub helper_width: f64,
    /// Depth of the interior helper vertices.
    pub helper_height: f64,
    /// Arc location splitting the semicircle into mapped patches.
    pub helper_arc_location: f64,
    /// Element size in the contact region.
    pub mesh_size_contact: f64,
    /// Element size away from the contact region.
    pub mesh_size_coarse: f64,
    /// Coordinate tolerance for boundary identification.
    pub eps: f64,
    /// Strain-displacement relation.
    pub kinematics: Kinematics,
    /// Young's modulus.
    pub youngs_modulus: f64,
    /// Poisson's ratio.
    pub poisson_ratio: f64,
    /// Maximum pressure on the top boundary.
    pub pressure: f64,
    /// Number of load steps ramping the pressure.
    pub load_steps: usize,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            radius: 1.0,
            helper_width: 0.3,
            helper_height: 0.4,
            helper_arc_location: 0.5_f64.sqrt(),
            mesh_size_contact: 0.02,
            mesh_size_coarse: 0.1,
            eps: 1.0e-5,
            kinematics: Kinematics::Nonlinear,
            youngs_modulus: 1.33,
            poisson_ratio: 0.33,
            pressure: 5.0,
            load_steps: 50,
        }
    }
}

impl Params {
    /// Element size where the mapped patches join, halfway between the
    /// contact and coarse sizes, halved again.
    #[must_use]
    pub fn mesh_size_intermediate(&self) -> f64 {
        0.5 * (self.mesh_size_coarse + self.mesh_size_contact) / 2.0
    }

    /// Thickness of the rigid obstacle below the semicircle.
    #[must_use]
    pub fn obstacle_thickness(&self) -> f64 {
        0.1 * self.radius
    }
}

/// Drive a session through the semicircle, the obstacle, the graded mesh
/// and the boundary conditions.
///
/// # Errors
///
/// Returns [`SessionError`] when a command or node set fails.
pub fn build<S: MeshingSession + ?Sized>(
    session: &mut S,
    params: &Params,
) -> Result<(), SessionError> {
    let r = params.radius;
    let w = params.helper_width;
    let h = params.helper_height;
    let a = params.helper_arc_location;

    // Outline vertices clockwise from the origin, then the two interior
    // helpers; vertex 1 only serves as the arc centre.
    session.cmd("create vertex 0 0 0")?;
    session.cmd(&format!("create vertex {w} 0 0"))?;
    session.cmd(&format!("create vertex {r} 0 0"))?;
    session.cmd(&format!("create vertex {a} {} 0", -a))?;
    session.cmd(&format!("create vertex {} {} 0", -a, -a))?;
    session.cmd(&format!("create vertex {} 0 0", -r))?;
    session.cmd(&format!("create vertex {} 0 0", -w))?;
    session.cmd(&format!("create vertex {} {} 0", -0.75 * w, -h))?;
    session.cmd(&format!("create vertex {} {} 0", 0.75 * w, -h))?;

    // Outline curves first, then the internal ones.
    session.cmd("create curve vertex 2 3")?;
    session.cmd(&format!("create curve arc center vertex 1 3 4 radius {r}"))?;
    session.cmd(&format!("create curve arc center vertex 1 4 5 radius {r}"))?;
    session.cmd(&format!("create curve arc center vertex 1 5 6 radius {r}"))?;
    session.cmd("create curve vertex 6 7")?;
    session.cmd("create curve vertex 7 2")?;
    session.cmd("create curve vertex 4 9")?;
    session.cmd("create curve vertex 9 2")?;
    session.cmd("create curve vertex 5 8")?;
    session.cmd("create curve vertex 8 7")?;
    session.cmd("create curve vertex 8 9")?;

    // Four mapped patches covering the semicircle.
    session.cmd("create surface curve 1 2 7 8")?;
    session.cmd("create surface curve 7 3 9 11")?;
    session.cmd("create surface curve 10 9 4 5")?;
    session.cmd("create surface curve 6 8 11 10")?;
    session.group("add surface 1 2 3 4", Some("semicircle"))?;

    session.cmd("imprint all")?;
    session.cmd("merge all")?;

    // The rigid contact obstacle below the semicircle.
    let thickness = params.obstacle_thickness();
    let rigid = tracked_cmd_single(
        session,
        &format!(
            "create surface rectangle width {} height {thickness} zplane",
            2.0 * r
        ),
        EntityKind::Surface,
    )?;
    session.cmd(&format!(
        "move surface {rigid} x 0 y {} z include_merged",
        -r - 0.5 * thickness
    ))?;
    session.group(&format!("add surface {rigid}"), Some("obstacle"))?;

    // Grade the curves that control the refinement toward the contact zone.
    let fine = params.mesh_size_contact;
    let coarse = params.mesh_size_coarse;
    let intermediate = params.mesh_size_intermediate();
    session.cmd(&format!(
        "curve 8 scheme bias fine size {intermediate} coarse size {coarse} start vertex 9"
    ))?;
    session.cmd(&format!(
        "curve 10 scheme bias fine size {intermediate} coarse size {coarse} start vertex 8"
    ))?;
    session.cmd(&format!(
        "curve 7 scheme bias fine size {fine} coarse size {intermediate} start vertex 4"
    ))?;
    session.cmd(&format!(
        "curve 9 scheme bias fine size {fine} coarse size {intermediate} start vertex 5"
    ))?;
    session.cmd(&format!("curve 3 scheme bias fine size {fine} factor 1.0"))?;

    // One element is enough for the rigid plane.
    session.cmd(&format!("surface {rigid} size {}", 2.0 * r))?;

    session.cmd("mesh surface all")?;

    let top = session.group(
        &format!(
            "add curve with {} < y_coord and y_coord < {}",
            -params.eps, params.eps
        ),
        None,
    )?;
    session.add_node_set(
        top,
        "top_boundary_neumann",
        BoundaryCondition::Neumann(DofConstraint::free(2).driven(1, -params.pressure, 1)),
    )?;

    let bottom = session.group(
        &format!("add curve with y_coord < {}", -a + params.eps),
        None,
    )?;
    session.add_node_set(
        bottom,
        "bottom_boundary_contact",
        BoundaryCondition::Contact(ContactCondition {
            interface_id: 1,
            side: ContactSide::Slave,
            initialization: ContactInitialization::Inactive,
        }),
    )?;

    let semicircle = session.group("add surface in semicircle", None)?;
    session.add_element_block(
        semicircle,
        ElementShape::Quad4,
        1,
        &format!("KINEM {}", params.kinematics),
    )?;
    let obstacle = session.group("add surface in obstacle", None)?;
    session.add_element_block(
        obstacle,
        ElementShape::Quad4,
        1,
        &format!("KINEM {}", params.kinematics),
    )?;
    Ok(())
}

/// The solver head of the contact deck.
#[must_use]
pub fn head(params: &Params) -> Head {
    Head::new()
        .section(HeadSection::new("PROBLEM SIZE").entry("DIM", 2))
        .section(HeadSection::new("PROBLEM TYPE").entry("PROBLEMTYPE", "Structure"))
        .section(
            HeadSection::new("IO")
                .entry("OUTPUT_BIN", "no")
                .entry("STRUCT_DISP", "yes")
                .entry("FILESTEPS", 1000)
                .entry("VERBOSITY", "Standard")
                .entry("STRUCT_STRAIN", "gl")
                .entry("STRUCT_STRESS", "cauchy")
                .entry("WRITE_INITIAL_STATE", "yes"),
        )
        .section(
            HeadSection::new("IO/RUNTIME VTK OUTPUT")
                .entry("OUTPUT_DATA_FORMAT", "binary")
                .entry("INTERVAL_STEPS", 5)
                .entry("EVERY_ITERATION", "no"),
        )
        .section(
            HeadSection::new("IO/RUNTIME VTK OUTPUT/STRUCTURE")
                .entry("OUTPUT_STRUCTURE", "yes")
                .entry("DISPLACEMENT", "yes")
                .entry("ELEMENT_OWNER", "yes")
                .entry("STRESS_STRAIN", "yes"),
        )
        .section(
            HeadSection::new("STRUCTURAL DYNAMIC")
                .entry("INT_STRATEGY", "Standard")
                .entry("DYNAMICTYPE", "Statics")
                .entry("RESULTSEVERY", 5)
                .entry("RESTARTEVERY", params.load_steps)
                .entry("TIMESTEP", 1.0 / params.load_steps as f64)
                .entry("NUMSTEP", params.load_steps)
                .entry("MAXTIME", 1)
                .entry("PREDICT", "ConstDis")
                .entry("NORM_RESF", "Rel")
                .entry("TOLDISP", "1e-7")
                .entry("TOLRES", "1e-7")
                .entry("LINEAR_SOLVER", 1)
                .entry("NLNSOL", "fullnewton")
                .entry("MAXITER", 20),
        )
        .section(
            HeadSection::new("CONTACT DYNAMIC")
                .entry("LINEAR_SOLVER", 1)
                .entry("STRATEGY", "Penalty")
                .entry("PENALTYPARAM", 100),
        )
        .section(
            HeadSection::new("SOLVER 1")
                .entry("NAME", "Structure_Solver")
                .entry("SOLVER", "Superlu"),
        )
        .section(
            HeadSection::new("MATERIALS")
                .raw("MAT 1  MAT_ElastHyper NUMMAT 1 MATIDS 10 DENS 1")
                .raw(format!(
                    "MAT 10 ELAST_CoupLogNeoHooke MODE YN C1 {} C2 {}",
                    params.youngs_modulus, params.poisson_ratio
                )),
        )
        .section(HeadSection::new("FUNCT1").raw("SYMBOLIC_FUNCTION_OF_SPACE_TIME t"))
}

/// Markdown summary of the case parameters.
#[must_use]
pub fn summary(params: &Params) -> Summary {
    Summary::new(
        "Hertzian-type contact with large deformation",
        "We simulate a two-dimensional hertzian-type contact problem by \
         subjecting a 2D semicircle to a pressure on its top surface.",
    )
    .section(
        SummarySection::new("Geometry")
            .row("radius", params.radius)
            .row("h_width", params.helper_width)
            .row("h_height", params.helper_height)
            .row("h_arcloc", params.helper_arc_location),
    )
    .section(
        SummarySection::new("Mesh")
            .row("mesh_size_coarse", params.mesh_size_coarse)
            .row("mesh_size_intermediate", params.mesh_size_intermediate())
            .row("mesh_size_contact", params.mesh_size_contact),
    )
    .section(SummarySection::new("Model").row("kinematics", params.kinematics))
    .section(
        SummarySection::new("Material")
            .row("constitutive_law", "ELAST_CoupLogNeoHooke")
            .row("youngs_modulus", params.youngs_modulus)
            .row("poisson_ratio", params.poisson_ratio),
    )
    .section(
        SummarySection::new("Boundary conditions")
            .row("end_pressure", params.pressure)
            .row("load_steps", params.load_steps),
    )
}

/// Mesh the case and write `hertzian_contact.yaml` plus `README.md` into a
/// kinematics-named subdirectory of `out_dir`.
///
/// # Errors
///
/// Returns [`GenerateError`] when meshing or any file write fails.
pub fn write(params: &Params, out_dir: &Path) -> Result<GeneratedCase, GenerateError> {
    let case_dir = out_dir.join(params.kinematics.to_string());
    ensure_dir(&case_dir)?;
    let mut session = NativeSession::new();
    build(&mut session, params)?;
    let model = session.mesh_model();
    MeshStatistics::collect(&model).log();

    let deck_path = case_dir.join("hertzian_contact.yaml");
    deck::write_yaml(&deck_path, &head(params), &model)?;
    let readme = summary(params).write(&case_dir)?;
    info!(deck = %deck_path.display(), "generated hertzian contact case");
    Ok(GeneratedCase {
        deck: deck_path,
        readme,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn intermediate_size_sits_between_contact_and_coarse() {
        let params = Params::default();
        assert_relative_eq!(params.mesh_size_intermediate(), 0.03, epsilon = 1.0e-12);
        assert!(params.mesh_size_contact < params.mesh_size_intermediate());
        assert!(params.mesh_size_intermediate() < params.mesh_size_coarse);
    }

    #[test]
    fn default_contact_mesh_builds() {
        let params = Params::default();
        let mut session = NativeSession::new();
        build(&mut session, &params).expect("contact case builds");

        assert!(session.node_count() > 0);
        let model = session.mesh_model();
        assert_eq!(model.dimension, 2);
        assert_eq!(model.blocks.len(), 2);

        // The rigid plane is a single element; the semicircle holds the rest.
        assert_eq!(model.blocks[1].elements.len(), 1);
        assert_eq!(
            model.blocks[0].elements.len(),
            model.element_count() - 1
        );

        assert_eq!(model.node_sets.len(), 2);
        let top = &model.node_sets[0];
        assert_eq!(top.name, "top_boundary_neumann");
        assert!(!top.nodes.is_empty());
        // The contact set also sweeps up the obstacle boundary below the arc.
        let contact = &model.node_sets[1];
        assert!(!contact.nodes.is_empty());
        for id in &contact.nodes {
            let node = model
                .nodes
                .iter()
                .find(|node| node.id == *id)
                .expect("set node exists");
            assert!(node.position.y <= -params.helper_arc_location + params.eps);
        }
    }

    #[test]
    fn contact_nodes_lie_on_or_below_the_arc_split() {
        let params = Params::default();
        let mut session = NativeSession::new();
        build(&mut session, &params).expect("contact case builds");

        let model = session.mesh_model();
        let contact = &model.node_sets[1];
        assert!(matches!(
            contact.condition,
            BoundaryCondition::Contact(ContactCondition {
                interface_id: 1,
                side: ContactSide::Slave,
                initialization: ContactInitialization::Inactive,
            })
        ));
    }

    #[test]
    fn head_requests_a_contact_strategy() {
        let params = Params::default();
        let deck = deck::render_dat(&head(&params), &NativeSession::new().mesh_model())
            .expect("renders");
        assert!(deck.contains("CONTACT DYNAMIC"));
        assert!(deck.contains("STRATEGY"));
    }
}
