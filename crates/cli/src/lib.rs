mod ancestors;
pub mod remap;
mod versions;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "weft",
    version,
    about = "Inspect game-version mappings used by the weft hook framework",
    long_about = "Weft resolves symbolic class and member names to the obfuscated names of a \
                  specific game version. These commands query the mapping tables and class \
                  hierarchies the framework uses when splicing hooks."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a symbolic name for a game version
    Remap {
        /// Directory containing <version>.json mapping files
        #[arg(long, value_name = "DIR")]
        mappings: PathBuf,
        /// Game version to resolve against
        #[arg(long, value_name = "VERSION")]
        game_version: String,
        /// Directory of runtime .class files used for inherited members
        #[arg(long, value_name = "DIR")]
        classes: Option<PathBuf>,
        #[command(subcommand)]
        target: remap::Target,
    },
    /// List the transitive superclasses and interfaces of a class
    Ancestors {
        /// Directory of .class files laid out by internal name
        #[arg(long, value_name = "DIR")]
        classes: PathBuf,
        /// Internal or binary class name
        #[arg(value_name = "CLASS")]
        name: String,
    },
    /// List the game versions with mapping files
    Versions {
        #[arg(long, value_name = "DIR")]
        mappings: PathBuf,
    },
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = weft_core::WeftConfig::default().apply_env();
    let _guard = weft_core::logging::init_logging("cli", &config, true)?;
    execute(cli.command, &mut std::io::stdout())
}

pub fn execute(command: Commands, out: &mut dyn std::io::Write) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Remap {
            mappings,
            game_version,
            classes,
            target,
        } => remap::run(&mappings, &game_version, classes, target, out),
        Commands::Ancestors { classes, name } => ancestors::run(&classes, &name, out),
        Commands::Versions { mappings } => versions::run(&mappings, out),
    }
}
