use dashmap::DashMap;
use std::sync::Arc;
use weft_api::models::{ClassNode, ClassPool, naming};
use weft_mapping::ClassHierarchy;

/// Classes defined in a context, by binary name.
///
/// Doubles as the runtime class hierarchy. Supertypes are declared before a
/// class is transformed, so lookups work for a class that is still being
/// defined.
#[derive(Default)]
pub struct ClassIndex {
    classes: DashMap<String, Arc<ClassNode>>,
    supertypes: DashMap<String, Vec<String>>,
}

impl ClassIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the superclass and interfaces of a class about to be defined.
    pub fn declare(&self, class: &ClassNode) {
        let supertypes = class
            .super_name
            .iter()
            .chain(class.interfaces.iter())
            .map(|name| naming::to_internal(name))
            .collect();
        self.supertypes
            .insert(naming::to_internal(&class.name), supertypes);
    }

    /// Returns the class previously defined under the same name, if any.
    pub fn insert(&self, class: Arc<ClassNode>) -> Option<Arc<ClassNode>> {
        self.declare(&class);
        self.classes.insert(class.name.clone(), class)
    }

    pub fn get(&self, name: &str) -> Option<Arc<ClassNode>> {
        self.classes.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ClassPool for ClassIndex {
    fn class(&self, name: &str) -> Option<Arc<ClassNode>> {
        self.get(name)
    }
}

impl ClassHierarchy for ClassIndex {
    fn supertypes(&self, internal_name: &str) -> Option<Vec<String>> {
        self.supertypes
            .get(internal_name)
            .map(|entry| entry.value().clone())
    }
}
