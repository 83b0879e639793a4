use std::io::Write;
use std::path::Path;
use weft_api::models::naming;
use weft_mapping::hierarchy::ancestors;
use weft_mapping::{ClassFileHierarchy, DirectoryClassSource};

pub fn run(classes: &Path, name: &str, out: &mut dyn Write) -> Result<(), Box<dyn std::error::Error>> {
    let hierarchy = ClassFileHierarchy::new(DirectoryClassSource::new(classes));
    let found = ancestors(&hierarchy, &naming::to_internal(name));
    if found.is_empty() {
        tracing::info!(class = name, "No ancestors found");
    }
    for ancestor in found {
        writeln!(out, "{}", naming::to_binary(&ancestor))?;
    }
    Ok(())
}
