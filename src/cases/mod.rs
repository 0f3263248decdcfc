//! Ready-made input deck generators.
//!
//! Each case is a parameter struct with literature defaults, a `build`
//! function that drives any [`MeshingSession`](crate::session::MeshingSession)
//! through the geometry and boundary conditions, a solver [`Head`], a
//! [`Summary`](crate::report::Summary) and a `write` entry point that runs
//! the native session and drops the deck plus a `README.md`.

pub mod bending_beam;
pub mod block_torsion;
pub mod hertzian_contact;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::GenerateError;

/// Strain-displacement relation of a structural model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Kinematics {
    /// Large deformation kinematics.
    #[default]
    Nonlinear,
    /// Small deformation kinematics.
    Linear,
}

impl fmt::Display for Kinematics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nonlinear => f.write_str("nonlinear"),
            Self::Linear => f.write_str("linear"),
        }
    }
}

/// Stress closure of a two dimensional wall model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum StressStrain {
    /// Plane strain closure.
    #[default]
    PlaneStrain,
    /// Plane stress closure.
    PlaneStress,
}

impl fmt::Display for StressStrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlaneStrain => f.write_str("plane_strain"),
            Self::PlaneStress => f.write_str("plane_stress"),
        }
    }
}

/// Paths of the files a case generator wrote.
#[derive(Clone, Debug)]
pub struct GeneratedCase {
    /// The solver input deck.
    pub deck: PathBuf,
    /// The markdown summary next to it.
    pub readme: PathBuf,
}

/// Create the output directory for a case, parents included.
fn ensure_dir(dir: &Path) -> Result<(), GenerateError> {
    fs::create_dir_all(dir).map_err(|source| GenerateError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

/// Generate all cases with their default parameters into `out_dir`.
///
/// # Errors
///
/// Returns [`GenerateError`] when any case fails to mesh or write.
pub fn write_all(out_dir: &Path) -> Result<Vec<GeneratedCase>, GenerateError> {
    Ok(vec![
        bending_beam::write(
            &bending_beam::Params::default(),
            &out_dir.join("bending_beam"),
        )?,
        block_torsion::write(
            &block_torsion::Params::default(),
            &out_dir.join("block_torsion"),
        )?,
        hertzian_contact::write(
            &hertzian_contact::Params::default(),
            &out_dir.join("hertzian_contact"),
        )?,
    ])
}
