use std::io::Write;
use std::path::Path;
use weft_mapping::MappingProvider;

pub fn run(mappings: &Path, out: &mut dyn Write) -> Result<(), Box<dyn std::error::Error>> {
    let versions = MappingProvider::new(mappings).available_versions()?;
    if versions.is_empty() {
        tracing::info!(dir = %mappings.display(), "No mapping files found");
    }
    for version in versions {
        writeln!(out, "{version}")?;
    }
    Ok(())
}
