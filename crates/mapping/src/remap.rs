//! Symbolic → runtime name resolution for the active game version.

use crate::hierarchy::{ClassHierarchy, ancestors_with};
use crate::model::{MappingSet, descriptor_parameters};
use std::collections::HashMap;
use std::sync::Arc;
use weft_api::models::naming;

/// Flat lookup table built once per game version.
///
/// Keys are internal names for classes (`net/game/Entity`) and
/// `owner.name(params)` for methods / `owner.name` for fields. Default
/// mappings (symbolic == runtime) are not stored. The table is never mutated
/// after construction and is shared freely between threads.
pub struct SymbolResolver {
    version: String,
    mappings: HashMap<String, String>,
    reverse_classes: HashMap<String, String>,
    hierarchy: Arc<dyn ClassHierarchy>,
}

impl SymbolResolver {
    pub fn new(set: &MappingSet, hierarchy: Arc<dyn ClassHierarchy>) -> Self {
        let mut mappings = HashMap::new();
        let mut reverse_classes = HashMap::new();

        for class in &set.classes {
            let owner = naming::to_internal(&class.symbolic);
            if !class.is_default() {
                let runtime = naming::to_internal(&class.runtime);
                reverse_classes.insert(runtime.clone(), owner.clone());
                mappings.insert(owner.clone(), runtime);
            }

            for entry in class.methods() {
                if entry.method.is_default() {
                    continue;
                }
                let key = format!("{}.{}", owner, entry.method.symbolic_identifier());
                if mappings.contains_key(&key) {
                    tracing::trace!(key = %key, "Ignoring duplicate method mapping");
                    continue;
                }
                mappings.insert(key, entry.method.runtime_name.clone());
            }

            for field in class.fields.iter().filter(|f| !f.is_default()) {
                mappings
                    .entry(format!("{}.{}", owner, field.symbolic_name))
                    .or_insert_with(|| field.runtime_name.clone());
            }
        }

        tracing::info!(
            version = %set.version,
            entries = mappings.len(),
            "Built symbol table"
        );

        Self {
            version: set.version.clone(),
            mappings,
            reverse_classes,
            hierarchy,
        }
    }

    /// A resolver without mappings: every lookup falls back to identity.
    pub fn identity(version: impl Into<String>, hierarchy: Arc<dyn ClassHierarchy>) -> Self {
        Self::new(&MappingSet::new(version, Vec::new()), hierarchy)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Raw table lookup.
    pub fn map(&self, key: &str) -> Option<&str> {
        self.mappings.get(key).map(String::as_str)
    }

    /// Runtime internal name of a symbolic internal class name.
    pub fn map_class(&self, internal_name: &str) -> String {
        self.map(internal_name)
            .map(str::to_string)
            .unwrap_or_else(|| internal_name.to_string())
    }

    /// Symbolic internal name of a runtime internal class name.
    pub fn unmap_class(&self, internal_name: &str) -> String {
        self.reverse_classes
            .get(internal_name)
            .cloned()
            .unwrap_or_else(|| internal_name.to_string())
    }

    /// Like [`Self::map_class`] for binary type names, keeping primitives and arrays.
    pub fn map_type_name(&self, type_name: &str) -> String {
        naming::map_element_type(type_name, |element| {
            naming::to_binary(&self.map_class(&naming::to_internal(element)))
        })
    }

    /// Like [`Self::unmap_class`] for binary type names.
    pub fn unmap_type_name(&self, type_name: &str) -> String {
        naming::map_element_type(type_name, |element| {
            naming::to_binary(&self.unmap_class(&naming::to_internal(element)))
        })
    }

    /// Runtime name of method `name` declared in or inherited by `owner`.
    ///
    /// Looks up `owner.name(params)` first, then retries against every
    /// ancestor of `owner`. Returns `name` unchanged when nothing matches.
    pub fn map_method(&self, owner: &str, name: &str, descriptor: &str) -> String {
        let member = format!("{}{}", name, descriptor_parameters(descriptor));
        if let Some(mapped) = self.map(&format!("{owner}.{member}")) {
            return mapped.to_string();
        }

        for ancestor in self.ancestors(owner) {
            if let Some(mapped) = self.map(&format!("{ancestor}.{member}")) {
                tracing::trace!(owner, ancestor = %ancestor, name, "Resolved member through ancestor");
                return mapped.to_string();
            }
        }

        tracing::trace!(owner, name, descriptor, "No mapping, keeping name");
        name.to_string()
    }

    /// Fields share the owner-qualified lookup of methods.
    pub fn map_field(&self, owner: &str, name: &str, descriptor: &str) -> String {
        self.map_method(owner, name, descriptor)
    }

    /// Rewrites every class reference in a method or field descriptor.
    pub fn map_descriptor(&self, descriptor: &str) -> String {
        let mut out = String::with_capacity(descriptor.len());
        let mut rest = descriptor;
        while let Some(start) = rest.find('L') {
            out.push_str(&rest[..=start]);
            let tail = &rest[start + 1..];
            match tail.find(';') {
                Some(end) => {
                    out.push_str(&self.map_class(&tail[..end]));
                    out.push(';');
                    rest = &tail[end + 1..];
                }
                None => {
                    out.push_str(tail);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Transitive superclasses and interfaces of `owner`, as symbolic names.
    ///
    /// The hierarchy is asked for the symbolic name first and for the runtime
    /// name second, so it may be backed by either namespace. Classes that
    /// cannot be read contribute nothing.
    pub fn ancestors(&self, owner: &str) -> Vec<String> {
        ancestors_with(owner, |name| {
            let direct = self.hierarchy.supertypes(name).or_else(|| {
                let runtime = self.map_class(name);
                if runtime != name {
                    self.hierarchy.supertypes(&runtime)
                } else {
                    None
                }
            })?;
            Some(direct.iter().map(|n| self.unmap_class(n)).collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::InMemoryHierarchy;
    use crate::model::{ClassMapping, FieldMapping, MethodMapping};

    fn resolver(hierarchy: InMemoryHierarchy) -> SymbolResolver {
        let set = MappingSet::new(
            "1.16.4",
            vec![
                ClassMapping::new("net.game.Entity", "net.game.a")
                    .with_method(MethodMapping::new("tick", "()V", "b"))
                    .with_method(MethodMapping::new("move", "(DD)V", "c"))
                    .with_method(MethodMapping::new("hashCode", "()I", "hashCode"))
                    .with_field(FieldMapping::new("world", "d")),
                ClassMapping::new("net.game.World", "net.game.World"),
                ClassMapping::new("net.game.Tickable", "net.game.t")
                    .with_method(MethodMapping::new("onTick", "(I)V", "x")),
            ],
        );
        SymbolResolver::new(&set, Arc::new(hierarchy))
    }

    #[test]
    fn test_default_mappings_are_not_stored() {
        let r = resolver(InMemoryHierarchy::new());
        assert_eq!(r.map("net/game/World"), None);
        assert_eq!(r.map("net/game/Entity.hashCode()"), None);
        assert_eq!(r.map("net/game/Entity"), Some("net/game/a"));
    }

    #[test]
    fn test_direct_method_and_field_lookup() {
        let r = resolver(InMemoryHierarchy::new());
        assert_eq!(r.map_method("net/game/Entity", "tick", "()V"), "b");
        assert_eq!(r.map_method("net/game/Entity", "move", "(DD)V"), "c");
        assert_eq!(r.map_field("net/game/Entity", "world", "Lnet/game/World;"), "d");
    }

    #[test]
    fn test_missing_mapping_returns_input_name() {
        let r = resolver(InMemoryHierarchy::new());
        assert_eq!(r.map_method("net/game/Entity", "jump", "()V"), "jump");
        assert_eq!(r.map_method("net/game/Unknown", "tick", "()V"), "tick");
        assert_eq!(r.map_class("net/game/Unknown"), "net/game/Unknown");
    }

    #[test]
    fn test_inherited_method_resolves_through_superclass() {
        let hierarchy = InMemoryHierarchy::new().with_class("net/game/Player", ["net/game/Entity"]);
        let r = resolver(hierarchy);
        assert_eq!(r.map_method("net/game/Player", "tick", "()V"), "b");
    }

    #[test]
    fn test_inherited_method_resolves_through_interface_of_runtime_ancestor() {
        // Hierarchy known only by runtime names.
        let hierarchy = InMemoryHierarchy::new()
            .with_class("net/game/Player", ["net/game/a"])
            .with_class("net/game/a", ["java/lang/Object", "net/game/t"]);
        let r = resolver(hierarchy);
        assert_eq!(
            r.ancestors("net/game/Player"),
            vec!["net/game/Entity", "java/lang/Object", "net/game/Tickable"]
        );
        assert_eq!(r.map_method("net/game/Player", "onTick", "(I)V"), "x");
    }

    #[test]
    fn test_type_names_and_descriptors() {
        let r = resolver(InMemoryHierarchy::new());
        assert_eq!(r.map_type_name("net.game.Entity"), "net.game.a");
        assert_eq!(r.map_type_name("net.game.Entity[]"), "net.game.a[]");
        assert_eq!(r.map_type_name("int"), "int");
        assert_eq!(r.unmap_type_name("net.game.a"), "net.game.Entity");
        assert_eq!(
            r.map_descriptor("(Lnet/game/Entity;ILnet/game/World;)Lnet/game/Tickable;"),
            "(Lnet/game/a;ILnet/game/World;)Lnet/game/t;"
        );
    }

    #[test]
    fn test_identity_resolver() {
        let r = SymbolResolver::identity("1.15.2", Arc::new(InMemoryHierarchy::new()));
        assert!(r.is_empty());
        assert_eq!(r.version(), "1.15.2");
        assert_eq!(r.map_method("a/B", "c", "()V"), "c");
    }
}
