//! Hyperelastic bending beam under an end shear force.
//!
//! A two dimensional rectangle clamped at its left edge and sheared at the
//! right edge by a Neumann load that ramps linearly over the load steps.
//! The material is a coupled log-Neo-Hookean hyperelastic law given in Lame
//! parameters.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::bc::{BoundaryCondition, DofConstraint};
use crate::cases::{ensure_dir, GeneratedCase, Kinematics, StressStrain};
use crate::deck::{self, Head, HeadSection};
use crate::errors::{GenerateError, SessionError};
use crate::mesh::{ElementShape, EntityKind};
use crate::report::{Summary, SummarySection};
use crate::session::native::NativeSession;
use crate::session::{tracked_cmd_single, MeshingSession};
use crate::stats::MeshStatistics;

/// Parameters of the bending beam case.
#[derive(Clone, Debug, Serialize)]
pub struct Params {
    /// Beam length in meters.
    pub length: f64,
    /// Beam height in meters.
    pub height: f64,
    /// Approximate element edge length in meters.
    pub mesh_size: f64,
    /// Coordinate tolerance for boundary identification.
    pub eps: f64,
    /// Strain-displacement relation.
    pub kinematics: Kinematics,
    /// Stress closure of the wall elements.
    pub stress_strain: StressStrain,
    /// Shear modulus (first material constant) in pascal.
    pub shear_modulus: f64,
    /// Lame parameter lambda (second material constant) in pascal.
    pub lame_lambda: f64,
    /// Maximum shear traction at the right edge in pascal.
    pub shear_force: f64,
    /// Number of load steps ramping the shear force.
    pub load_steps: usize,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            length: 20.0,
            height: 2.0,
            mesh_size: 0.1,
            eps: 1.0e-5,
            kinematics: Kinematics::Nonlinear,
            stress_strain: StressStrain::PlaneStrain,
            shear_modulus: 4.17e9,
            lame_lambda: 2.78e9,
            shear_force: 10.0e6,
            load_steps: 50,
        }
    }
}

impl Params {
    /// Young's modulus derived from the Lame constants.
    #[must_use]
    pub fn youngs_modulus(&self) -> f64 {
        let mue = self.shear_modulus;
        let lambda = self.lame_lambda;
        mue * (3.0 * lambda + 2.0 * mue) / (lambda + mue)
    }

    /// Poisson's ratio derived from the Lame constants.
    #[must_use]
    pub fn poisson_ratio(&self) -> f64 {
        self.lame_lambda / (2.0 * (self.lame_lambda + self.shear_modulus))
    }
}

/// Drive a session through the beam geometry, mesh and boundary conditions.
///
/// # Errors
///
/// Returns [`SessionError`] when a command or node set fails.
pub fn build<S: MeshingSession + ?Sized>(
    session: &mut S,
    params: &Params,
) -> Result<(), SessionError> {
    let beam = tracked_cmd_single(
        session,
        &format!(
            "create surface rectangle width {} height {} zplane",
            params.length, params.height
        ),
        EntityKind::Surface,
    )?;

    session.cmd(&format!("surface {beam} size {}", params.mesh_size))?;
    session.cmd(&format!("mesh surface {beam}"))?;

    let bottom = session.group(
        &format!(
            "add curve with y_coord < {}",
            -params.height / 2.0 + params.eps
        ),
        None,
    )?;
    session.add_node_set(
        bottom,
        "bottom",
        BoundaryCondition::Dirichlet(DofConstraint::free(2)),
    )?;

    let left = session.group(
        &format!(
            "add curve with x_coord < {}",
            -params.length / 2.0 + params.eps
        ),
        None,
    )?;
    session.add_node_set(
        left,
        "left",
        BoundaryCondition::Dirichlet(DofConstraint::fixed(2)),
    )?;

    let top = session.group(
        &format!(
            "add curve with y_coord > {}",
            params.height / 2.0 - params.eps
        ),
        None,
    )?;
    session.add_node_set(
        top,
        "top",
        BoundaryCondition::Dirichlet(DofConstraint::free(2)),
    )?;

    let right = session.group(
        &format!(
            "add curve with x_coord > {}",
            params.length / 2.0 - params.eps
        ),
        None,
    )?;
    session.add_node_set(
        right,
        "right",
        BoundaryCondition::Neumann(DofConstraint::free(2).driven(1, -params.shear_force, 1)),
    )?;

    let block = session.group(&format!("add surface {beam}"), None)?;
    session.add_element_block(
        block,
        ElementShape::Quad4,
        1,
        &format!(
            "KINEM {} EAS none THICK 1 STRESS_STRAIN {} GP 2 2",
            params.kinematics, params.stress_strain
        ),
    )?;
    Ok(())
}

/// The solver head of the beam deck.
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
                .entry("OUTPUT_SPRING", "Yes")
                .entry("WRITE_INITIAL_STATE", "yes"),
        )
        .section(
            HeadSection::new("IO/RUNTIME VTK OUTPUT")
                .entry("OUTPUT_DATA_FORMAT", "binary")
                // The solver reads this as a float; keep the decimal even for
                // whole values.
                .entry("INTERVAL_STEPS", format!("{:?}", params.load_steps as f64 / 10.0))
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
                .entry("RESULTSEVERY", 1)
                .entry("RESTARTEVERY", 1)
                .entry("TIMESTEP", 1.0 / params.load_steps as f64)
                .entry("NUMSTEP", params.load_steps)
                .entry("MAXTIME", 1)
                .entry("PREDICT", "TangDis")
                .entry("NORM_RESF", "Rel")
                .entry("TOLDISP", "1e-7")
                .entry("TOLRES", "1e-7")
                .entry("LINEAR_SOLVER", 1)
                .entry("NLNSOL", "fullnewton")
                .entry("MAXITER", 50),
        )
        .section(
            HeadSection::new("SOLVER 1")
                .entry("NAME", "Structure_Solver")
                .entry("SOLVER", "Superlu"),
        )
        .section(
            HeadSection::new("STRUCT NOX/Printing")
                .raw("Outer Iteration                 = Yes")
                .raw("Inner Iteration                 = No")
                .raw("Outer Iteration StatusTest      = No"),
        )
        .section(
            HeadSection::new("MATERIALS")
                .raw("MAT 1  MAT_ElastHyper NUMMAT 1 MATIDS 10 DENS 0.1")
                .raw(format!(
                    "MAT 10 ELAST_CoupLogNeoHooke MODE Lame C1 {} C2 {}",
                    params.shear_modulus, params.lame_lambda
                )),
        )
        .section(HeadSection::new("FUNCT1").raw("SYMBOLIC_FUNCTION_OF_SPACE_TIME t"))
}

/// Markdown summary of the case parameters.
#[must_use]
pub fn summary(params: &Params) -> Summary {
    Summary::new(
        "Hyperelastic bending beam with nonlinear kinematics under shear force",
        "We simulate the large deformation of a hyperelastic bending beam by \
         prescribing a Neumann BC which increases with the load step.",
    )
    .section(
        SummarySection::new("Geometry")
            .row("length", params.length)
            .row("height", params.height),
    )
    .section(SummarySection::new("Mesh").row("mesh_size", params.mesh_size))
    .section(
        SummarySection::new("Model")
            .row("kinematics", params.kinematics)
            .row("stress_closure", params.stress_strain),
    )
    .section(
        SummarySection::new("Material")
            .row("constitutive_law", "ELAST_CoupLogNeoHooke")
            .row("shear_modulus", params.shear_modulus)
            .row("lame_parameter", params.lame_lambda),
    )
    .section(
        SummarySection::new("Boundary conditions")
            .row("max_shear_force", params.shear_force)
            .row("load_steps", params.load_steps),
    )
}

/// Mesh the case and write `hyperelastic_bending_beam.dat` plus `README.md`
/// into `out_dir`.
///
/// # Errors
///
/// Returns [`GenerateError`] when meshing or any file write fails.
pub fn write(params: &Params, out_dir: &Path) -> Result<GeneratedCase, GenerateError> {
    ensure_dir(out_dir)?;
    let mut session = NativeSession::new();
    build(&mut session, params)?;
    let model = session.mesh_model();
    MeshStatistics::collect(&model).log();

    let deck_path = out_dir.join("hyperelastic_bending_beam.dat");
    deck::write_dat(&deck_path, &head(params), &model)?;
    let readme = summary(params).write(out_dir)?;
    info!(deck = %deck_path.display(), "generated bending beam case");
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
    fn derived_material_constants() {
        let params = Params::default();
        assert_relative_eq!(params.poisson_ratio(), 0.2, epsilon = 1.0e-12);
        assert_relative_eq!(params.youngs_modulus(), 1.0008e10, max_relative = 1.0e-12);
    }

    #[test]
    fn default_beam_mesh_counts() {
        let params = Params::default();
        let mut session = NativeSession::new();
        build(&mut session, &params).expect("beam builds");

        // 200 x 20 elements over 20 x 2 at size 0.1.
        assert_eq!(session.node_count(), 201 * 21);
        assert_eq!(session.element_count(), 200 * 20);

        let sets = session.node_set_ids();
        assert_eq!(sets.len(), 4);
        let counts: Vec<usize> = sets
            .iter()
            .map(|id| session.node_set_node_count(*id).expect("set exists"))
            .collect();
        // bottom, left, top, right in registration order.
        assert_eq!(counts, vec![201, 21, 201, 21]);
    }

    #[test]
    fn head_names_the_material_constants() {
        let params = Params::default();
        let deck = deck::render_dat(&head(&params), &NativeSession::new().mesh_model())
            .expect("renders");
        assert!(deck.contains("MAT 10 ELAST_CoupLogNeoHooke MODE Lame C1 4170000000 C2 2780000000"));
        assert!(deck.contains("SYMBOLIC_FUNCTION_OF_SPACE_TIME t"));
    }

    #[test]
    fn output_interval_keeps_its_decimal() {
        let deck = deck::render_dat(&head(&Params::default()), &NativeSession::new().mesh_model())
            .expect("renders");
        assert!(deck.contains(&format!("{:<32}{}", "INTERVAL_STEPS", "5.0")));
    }

    #[test]
    fn summary_lists_the_load() {
        let markdown = summary(&Params::default()).to_markdown();
        assert!(markdown.contains("| max_shear_force | 10000000 |"));
        assert!(markdown.contains("| stress_closure | plane_strain |"));
    }
}
