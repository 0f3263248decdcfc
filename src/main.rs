//! Command line front end for the deck generators.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use femgen::cases::{self, bending_beam, block_torsion, hertzian_contact, GeneratedCase};
use femgen::GenerateError;

#[derive(Parser)]
#[command(name = "femgen", version, about = "Generate structural solver input decks")]
struct Cli {
    /// Directory the generated files are written into.
    #[arg(short, long, default_value = ".", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    case: Case,
}

#[derive(Subcommand)]
enum Case {
    /// Hyperelastic bending beam under an end shear force (2D).
    BendingBeam,
    /// Torsion of a block driven by symbolic rotation functions (3D).
    BlockTorsion,
    /// Hertzian-type contact of a semicircle on a rigid plane (2D).
    HertzianContact,
    /// Generate every case into per-case subdirectories.
    All,
}

fn run(cli: &Cli) -> Result<Vec<GeneratedCase>, GenerateError> {
    match cli.case {
        Case::BendingBeam => Ok(vec![bending_beam::write(
            &bending_beam::Params::default(),
            &cli.output,
        )?]),
        Case::BlockTorsion => Ok(vec![block_torsion::write(
            &block_torsion::Params::default(),
            &cli.output,
        )?]),
        Case::HertzianContact => Ok(vec![hertzian_contact::write(
            &hertzian_contact::Params::default(),
            &cli.output,
        )?]),
        Case::All => cases::write_all(&cli.output),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(generated) => {
            for case in generated {
                println!("{}", case.deck.display());
                println!("{}", case.readme.display());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "generation failed");
            ExitCode::FAILURE
        }
    }
}
