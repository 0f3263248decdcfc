//! Torsion of a block with nonlinear kinematics.
//!
//! A brick clamped at its left face while the right face follows two
//! symbolic space-time functions that rotate it around the x axis up to a
//! prescribed end rotation.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::bc::{BoundaryCondition, DofConstraint};
use crate::cases::{ensure_dir, GeneratedCase, Kinematics};
use crate::deck::{self, Head, HeadSection};
use crate::errors::{GenerateError, SessionError};
use crate::mesh::{ElementShape, EntityKind};
use crate::report::{Summary, SummarySection};
use crate::session::native::NativeSession;
use crate::session::{tracked_cmd_single, MeshingSession};
use crate::stats::MeshStatistics;

/// Parameters of the block torsion case.
#[derive(Clone, Debug, Serialize)]
pub struct Params {
    /// Block length along x.
    pub length: f64,
    /// Block height along y.
    pub height: f64,
    /// Block depth along z.
    pub depth: f64,
    /// Approximate element edge length.
    pub mesh_size: f64,
    /// Coordinate tolerance for boundary identification.
    pub eps: f64,
    /// Strain-displacement relation.
    pub kinematics: Kinematics,
    /// Young's modulus.
    pub youngs_modulus: f64,
    /// Poisson's ratio.
    pub poisson_ratio: f64,
    /// Maximum prescribed end rotation in degrees.
    pub end_rotation: f64,
    /// Number of load steps ramping the rotation.
    pub load_steps: usize,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            length: 4.0,
            height: 1.0,
            depth: 1.0,
            mesh_size: 0.1,
            eps: 1.0e-5,
            kinematics: Kinematics::Nonlinear,
            youngs_modulus: 1.33,
            poisson_ratio: 0.33,
            end_rotation: 150.0,
            load_steps: 50,
        }
    }
}

impl Params {
    /// Fraction of a half turn reached at the end of the load ramp; the
    /// symbolic functions scale `pi*t` with this.
    #[must_use]
    pub fn rotation_fraction(&self) -> f64 {
        2.0 * self.end_rotation / 360.0
    }
}

/// Drive a session through the block geometry, mesh and boundary conditions.
///
/// # Errors
///
/// Returns [`SessionError`] when a command or node set fails.
pub fn build<S: MeshingSession + ?Sized>(
    session: &mut S,
    params: &Params,
) -> Result<(), SessionError> {
    let block = tracked_cmd_single(
        session,
        &format!(
            "brick x {} y {} z {}",
            params.length, params.height, params.depth
        ),
        EntityKind::Volume,
    )?;

    // Shift the block so x spans [0, length].
    session.cmd(&format!(
        "move volume {block} x {} y 0 z 0 include_merged",
        params.length / 2.0
    ))?;

    session.cmd(&format!("volume {block} size {}", params.mesh_size))?;
    session.cmd(&format!("mesh volume {block}"))?;

    let rigid_left = session.group(&format!("add surface with x_coord < {}", params.eps), None)?;
    session.add_node_set(
        rigid_left,
        "rigid_left",
        BoundaryCondition::Dirichlet(DofConstraint::fixed(3)),
    )?;

    let torsion_right = session.group(
        &format!(
            "add surface with x_coord > {}",
            params.length - params.eps
        ),
        None,
    )?;
    session.add_node_set(
        torsion_right,
        "torsion_right",
        BoundaryCondition::Dirichlet(
            DofConstraint::fixed(3).driven(1, 1.0, 1).driven(2, 1.0, 2),
        ),
    )?;

    let volume_group = session.group(&format!("add volume {block}"), None)?;
    session.add_element_block(
        volume_group,
        ElementShape::Hex8,
        1,
        &format!("KINEM {}", params.kinematics),
    )?;
    Ok(())
}

/// The solver head of the torsion deck.
#[must_use]
pub fn head(params: &Params) -> Head {
    let fraction = params.rotation_fraction();
    Head::new()
        .section(HeadSection::new("PROBLEM SIZE").entry("DIM", 3))
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
                .entry("NORMCOMBI_DISPPRES", "And")
                .entry("LINEAR_SOLVER", 1)
                .entry("NLNSOL", "fullnewton")
                .entry("MAXITER", 20),
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
                .raw("Outer Iteration StatusTest      = Yes"),
        )
        .section(
            HeadSection::new("MATERIALS")
                .raw("MAT 1  MAT_ElastHyper NUMMAT 1 MATIDS 10 DENS 1")
                .raw(format!(
                    "MAT 10 ELAST_CoupLogNeoHooke MODE YN C1 {} C2 {}",
                    params.youngs_modulus, params.poisson_ratio
                )),
        )
        .section(HeadSection::new("FUNCT1").raw(format!(
            "SYMBOLIC_FUNCTION_OF_SPACE_TIME y*cos({fraction}*pi*t)-z*sin({fraction}*pi*t)-y"
        )))
        .section(HeadSection::new("FUNCT2").raw(format!(
            "SYMBOLIC_FUNCTION_OF_SPACE_TIME y*sin({fraction}*pi*t)+z*cos({fraction}*pi*t)-z"
        )))
}

/// Markdown summary of the case parameters.
#[must_use]
pub fn summary(params: &Params) -> Summary {
    Summary::new(
        "Torsion of a block with non-linear kinematic behavior",
        "We simulate the torsion of a block by prescribing a Dirichlet BC \
         which increases with the load step.",
    )
    .section(
        SummarySection::new("Geometry")
            .row("length", params.length)
            .row("height", params.height)
            .row("depth", params.depth),
    )
    .section(SummarySection::new("Mesh").row("mesh_size", params.mesh_size))
    .section(SummarySection::new("Model").row("kinematics", params.kinematics))
    .section(
        SummarySection::new("Material")
            .row("constitutive_law", "ELAST_CoupLogNeoHooke")
            .row("youngs_modulus", params.youngs_modulus)
            .row("poisson_ratio", params.poisson_ratio),
    )
    .section(
        SummarySection::new("Boundary conditions")
            .row("end_rotation", params.end_rotation)
            .row("load_steps", params.load_steps),
    )
}

/// Mesh the case and write `block_torsion.dat` plus `README.md` into a
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

    let deck_path = case_dir.join("block_torsion.dat");
    deck::write_dat(&deck_path, &head(params), &model)?;
    let readme = summary(params).write(&case_dir)?;
    info!(deck = %deck_path.display(), "generated block torsion case");
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
    fn default_block_mesh_counts() {
        let params = Params::default();
        let mut session = NativeSession::new();
        build(&mut session, &params).expect("block builds");

        // 40 x 10 x 10 hex elements over 4 x 1 x 1 at size 0.1.
        assert_eq!(session.node_count(), 41 * 11 * 11);
        assert_eq!(session.element_count(), 40 * 10 * 10);

        let sets = session.node_set_ids();
        assert_eq!(sets.len(), 2);
        for id in sets {
            // Both end faces carry an 11 x 11 node grid.
            assert_eq!(
                session.node_set_node_count(id).expect("set exists"),
                11 * 11
            );
        }
    }

    #[test]
    fn rotation_fraction_scales_the_half_turn() {
        let params = Params::default();
        assert_relative_eq!(params.rotation_fraction(), 5.0 / 6.0, epsilon = 1.0e-12);
    }

    #[test]
    fn head_embeds_the_rotation_functions() {
        let params = Params::default();
        let deck = deck::render_dat(&head(&params), &NativeSession::new().mesh_model())
            .expect("renders");
        let fraction = params.rotation_fraction();
        assert!(deck.contains(&format!(
            "y*cos({fraction}*pi*t)-z*sin({fraction}*pi*t)-y"
        )));
        assert!(deck.contains("MAT 10 ELAST_CoupLogNeoHooke MODE YN C1 1.33 C2 0.33"));
        assert!(deck.contains("NORMCOMBI_DISPPRES"));
    }
}
