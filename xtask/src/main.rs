// Desktop tooling crate: unwrap/expect/panic acceptable outside the device.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod metacache;
mod test;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Meshdeck development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run host tests (unit, scenario and doc tests)
    Test {
        /// Run only unit tests
        #[arg(long)]
        unit: bool,
        /// Run only the tests/ scenario suites
        #[arg(long)]
        integration: bool,
    },
    /// Write `.metacache` files for a local audiobook folder
    Metacache {
        /// Folder laid out like the card's /audiobooks
        #[arg(long)]
        dir: std::path::PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Test { unit, integration } => test::run(unit, integration),
        Commands::Metacache { dir } => metacache::run(&dir),
    }
}
