//! Class hierarchy lookups backed by raw class bytes.
//!
//! The remapper cannot rely on a class loader: obfuscated classes are often
//! not resolvable yet when their names are needed. Supertypes are therefore
//! read straight from class file bytes.

use ristretto_classfile::ClassFile;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Cursor;
use std::path::PathBuf;

/// Direct supertypes of a class, by internal name (`net/game/Entity`).
pub trait ClassHierarchy: Send + Sync {
    /// Superclass followed by implemented interfaces, or `None` if the class is unknown.
    fn supertypes(&self, internal_name: &str) -> Option<Vec<String>>;
}

/// Breadth-first transitive closure of superclasses and interfaces, excluding
/// `start`. Unknown classes simply contribute no ancestors.
pub fn ancestors_with(
    start: &str,
    mut supertypes: impl FnMut(&str) -> Option<Vec<String>>,
) -> Vec<String> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    let mut result = Vec::new();

    visited.insert(start.to_string());
    queue.push_back(start.to_string());

    while let Some(current) = queue.pop_front() {
        for parent in supertypes(&current).unwrap_or_default() {
            if visited.insert(parent.clone()) {
                result.push(parent.clone());
                queue.push_back(parent);
            }
        }
    }

    result
}

pub fn ancestors(hierarchy: &dyn ClassHierarchy, start: &str) -> Vec<String> {
    ancestors_with(start, |name| hierarchy.supertypes(name))
}

/// Supplies raw class file bytes by internal name.
pub trait ClassSource: Send + Sync {
    fn class_bytes(&self, internal_name: &str) -> Option<Vec<u8>>;
}

/// Reads `<root>/<internal name>.class`.
#[derive(Debug, Clone)]
pub struct DirectoryClassSource {
    root: PathBuf,
}

impl DirectoryClassSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ClassSource for DirectoryClassSource {
    fn class_bytes(&self, internal_name: &str) -> Option<Vec<u8>> {
        let path = self.root.join(format!("{internal_name}.class"));
        std::fs::read(path).ok()
    }
}

/// Hierarchy parsed from class files with `ristretto_classfile`.
pub struct ClassFileHierarchy<S> {
    source: S,
}

impl<S: ClassSource> ClassFileHierarchy<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    fn parse_supertypes(bytes: Vec<u8>) -> std::result::Result<Vec<String>, ristretto_classfile::Error> {
        let class = ClassFile::from_bytes(&mut Cursor::new(bytes))?;
        let mut supertypes = Vec::with_capacity(class.interfaces.len() + 1);
        if class.super_class != 0 {
            supertypes.push(class.constant_pool.try_get_class(class.super_class)?.to_string());
        }
        for &interface in &class.interfaces {
            supertypes.push(class.constant_pool.try_get_class(interface)?.to_string());
        }
        Ok(supertypes)
    }
}

impl<S: ClassSource> ClassHierarchy for ClassFileHierarchy<S> {
    fn supertypes(&self, internal_name: &str) -> Option<Vec<String>> {
        let bytes = self.source.class_bytes(internal_name)?;
        match Self::parse_supertypes(bytes) {
            Ok(supertypes) => Some(supertypes),
            Err(e) => {
                tracing::debug!(class = internal_name, "Unreadable class file: {e:?}");
                None
            }
        }
    }
}

/// Hierarchy declared up front.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHierarchy {
    classes: HashMap<String, Vec<String>>,
}

impl InMemoryHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        supertypes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.insert(name, supertypes);
        self
    }

    pub fn insert<S: Into<String>>(&mut self, name: impl Into<String>, supertypes: impl IntoIterator<Item = S>) {
        self.classes
            .insert(name.into(), supertypes.into_iter().map(Into::into).collect());
    }
}

impl ClassHierarchy for InMemoryHierarchy {
    fn supertypes(&self, internal_name: &str) -> Option<Vec<String>> {
        self.classes.get(internal_name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassMapping, MappingSet, MethodMapping};
    use crate::remap::SymbolResolver;
    use ristretto_classfile::{ClassAccessFlags, JAVA_21};
    use std::path::Path;
    use std::sync::Arc;

    fn write_class(root: &Path, name: &str, super_name: &str, interfaces: &[&str]) {
        let mut class = ClassFile {
            version: JAVA_21,
            access_flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            ..Default::default()
        };
        class.this_class = class.constant_pool.add_class(name).unwrap();
        class.super_class = class.constant_pool.add_class(super_name).unwrap();
        for interface in interfaces {
            let index = class.constant_pool.add_class(interface).unwrap();
            class.interfaces.push(index);
        }

        let mut bytes = Vec::new();
        class.to_bytes(&mut bytes).unwrap();
        let path = root.join(format!("{name}.class"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_ancestors_are_transitive_and_breadth_first() {
        let hierarchy = InMemoryHierarchy::new()
            .with_class("c/C", ["b/B", "i/Tickable"])
            .with_class("b/B", ["a/A"])
            .with_class("a/A", ["java/lang/Object"]);

        assert_eq!(
            ancestors(&hierarchy, "c/C"),
            vec!["b/B", "i/Tickable", "a/A", "java/lang/Object"]
        );
    }

    #[test]
    fn test_ancestors_of_unknown_class_is_empty() {
        let hierarchy = InMemoryHierarchy::new();
        assert!(ancestors(&hierarchy, "x/Unknown").is_empty());
    }

    #[test]
    fn test_ancestors_tolerate_cycles() {
        let hierarchy = InMemoryHierarchy::new()
            .with_class("a/A", ["b/B"])
            .with_class("b/B", ["a/A"]);
        assert_eq!(ancestors(&hierarchy, "a/A"), vec!["b/B"]);
    }

    #[test]
    fn test_supertypes_are_read_from_class_files() {
        let dir = tempfile::tempdir().unwrap();
        write_class(dir.path(), "net/game/Player", "net/game/e", &["net/game/Tickable"]);
        write_class(dir.path(), "net/game/e", "net/game/a", &[]);
        write_class(dir.path(), "net/game/a", "java/lang/Object", &[]);

        let hierarchy = ClassFileHierarchy::new(DirectoryClassSource::new(dir.path()));
        assert_eq!(
            hierarchy.supertypes("net/game/Player"),
            Some(vec!["net/game/e".to_string(), "net/game/Tickable".to_string()])
        );
        assert_eq!(
            ancestors(&hierarchy, "net/game/Player"),
            vec!["net/game/e", "net/game/Tickable", "net/game/a", "java/lang/Object"]
        );

        let set = MappingSet::new(
            "1.16.4",
            vec![
                ClassMapping::new("net.game.Entity", "net.game.a")
                    .with_method(MethodMapping::new("tick", "()V", "b")),
                ClassMapping::new("net.game.Living", "net.game.e"),
            ],
        );
        let resolver = SymbolResolver::new(&set, Arc::new(hierarchy));
        assert_eq!(resolver.map_method("net/game/Player", "tick", "()V"), "b");
    }

    #[test]
    fn test_directory_source_missing_and_garbage_classes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("net/game")).unwrap();
        std::fs::write(dir.path().join("net/game/Broken.class"), b"not a class").unwrap();

        let hierarchy = ClassFileHierarchy::new(DirectoryClassSource::new(dir.path()));
        assert!(hierarchy.supertypes("net/game/Missing").is_none());
        assert!(hierarchy.supertypes("net/game/Broken").is_none());
    }
}
