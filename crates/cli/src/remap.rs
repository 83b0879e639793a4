use clap::Subcommand;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use weft_api::models::naming;
use weft_mapping::{
    ClassFileHierarchy, ClassHierarchy, DirectoryClassSource, InMemoryHierarchy, MappingProvider,
    SymbolResolver,
};

#[derive(Subcommand)]
pub enum Target {
    /// A class, e.g. net.game.Entity
    Class { name: String },
    /// A method by owner, name and JVM descriptor, e.g. net.game.Entity tick ()V
    Method {
        owner: String,
        name: String,
        descriptor: String,
    },
    /// A field by owner and name
    Field { owner: String, name: String },
}

pub fn run(
    mappings: &Path,
    version: &str,
    classes: Option<PathBuf>,
    target: Target,
    out: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let provider = MappingProvider::new(mappings);
    let set = provider.load(version)?;
    let hierarchy: Arc<dyn ClassHierarchy> = match classes {
        Some(dir) => Arc::new(ClassFileHierarchy::new(DirectoryClassSource::new(dir))),
        None => Arc::new(InMemoryHierarchy::new()),
    };
    let resolver = SymbolResolver::new(&set, hierarchy);

    let resolved = match target {
        Target::Class { name } => resolver.map_type_name(&naming::to_binary(&name)),
        Target::Method {
            owner,
            name,
            descriptor,
        } => resolver.map_method(&naming::to_internal(&owner), &name, &descriptor),
        Target::Field { owner, name } => resolver.map_field(&naming::to_internal(&owner), &name, ""),
    };
    tracing::debug!(version, resolved = %resolved, "Resolved");
    writeln!(out, "{resolved}")?;
    Ok(())
}
