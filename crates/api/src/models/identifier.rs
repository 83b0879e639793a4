//! Locations of discoverable elements.
//!
//! Identifiers hold names only. They are re-resolved against a [`ClassPool`]
//! when used, so they can describe classes that are not loaded yet.

use super::class::{ClassNode, ClassPool, FieldNode, MethodNode};
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassIdentifier {
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodIdentifier {
    pub owner: String,
    pub name: String,
    pub parameters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldIdentifier {
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identifier {
    Class(ClassIdentifier),
    Method(MethodIdentifier),
    Field(FieldIdentifier),
}

fn locate_owner(pool: &dyn ClassPool, owner: &str) -> ApiResult<Arc<ClassNode>> {
    pool.class(owner)
        .ok_or_else(|| ApiError::NotFound(format!("class {owner}")))
}

impl ClassIdentifier {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
        }
    }

    pub fn locate(&self, pool: &dyn ClassPool) -> ApiResult<Arc<ClassNode>> {
        locate_owner(pool, &self.owner)
    }
}

impl MethodIdentifier {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, parameters: Vec<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            parameters,
        }
    }

    pub fn locate(&self, pool: &dyn ClassPool) -> ApiResult<MethodNode> {
        let class = locate_owner(pool, &self.owner)?;
        class
            .declared_method(&self.name, &self.parameters)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("method {self}")))
    }
}

impl FieldIdentifier {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn locate(&self, pool: &dyn ClassPool) -> ApiResult<FieldNode> {
        let class = locate_owner(pool, &self.owner)?;
        class
            .declared_field(&self.name)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("field {self}")))
    }
}

impl Identifier {
    pub fn owner(&self) -> &str {
        match self {
            Identifier::Class(id) => &id.owner,
            Identifier::Method(id) => &id.owner,
            Identifier::Field(id) => &id.owner,
        }
    }

    pub fn as_method(&self) -> Option<&MethodIdentifier> {
        match self {
            Identifier::Method(id) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for ClassIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.owner)
    }
}

impl fmt::Display for MethodIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}({})", self.owner, self.name, self.parameters.join(", "))
    }
}

impl fmt::Display for FieldIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.owner, self.name)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Class(id) => fmt::Display::fmt(id, f),
            Identifier::Method(id) => fmt::Display::fmt(id, f),
            Identifier::Field(id) => fmt::Display::fmt(id, f),
        }
    }
}

impl From<ClassIdentifier> for Identifier {
    fn from(id: ClassIdentifier) -> Self {
        Identifier::Class(id)
    }
}

impl From<MethodIdentifier> for Identifier {
    fn from(id: MethodIdentifier) -> Self {
        Identifier::Method(id)
    }
}

impl From<FieldIdentifier> for Identifier {
    fn from(id: FieldIdentifier) -> Self {
        Identifier::Field(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::class::Parameter;
    use std::collections::HashMap;

    struct MapPool(HashMap<String, Arc<ClassNode>>);

    impl ClassPool for MapPool {
        fn class(&self, name: &str) -> Option<Arc<ClassNode>> {
            self.0.get(name).cloned()
        }
    }

    fn pool() -> MapPool {
        let class = ClassNode::new("mod.Listener")
            .with_method(MethodNode::new("onTick", vec![Parameter::of("mod.TickEvent")], "void"))
            .with_field(FieldNode::new("enabled", "boolean"));
        MapPool(HashMap::from([(class.name.clone(), Arc::new(class))]))
    }

    #[test]
    fn test_method_identifier_locates_declared_method() {
        let id = MethodIdentifier::new("mod.Listener", "onTick", vec!["mod.TickEvent".to_string()]);
        let method = id.locate(&pool()).unwrap();
        assert_eq!(method.name, "onTick");
    }

    #[test]
    fn test_locate_fails_with_not_found_for_missing_class() {
        let id = MethodIdentifier::new("mod.Missing", "onTick", vec![]);
        assert!(matches!(id.locate(&pool()), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_locate_fails_with_not_found_for_wrong_signature() {
        let id = MethodIdentifier::new("mod.Listener", "onTick", vec!["int".to_string()]);
        assert!(matches!(id.locate(&pool()), Err(ApiError::NotFound(_))));
        let field = FieldIdentifier::new("mod.Listener", "enabled");
        assert_eq!(field.locate(&pool()).unwrap().field_type, "boolean");
    }

    #[test]
    fn test_display() {
        let id = Identifier::from(MethodIdentifier::new(
            "mod.Listener",
            "onTick",
            vec!["mod.TickEvent".to_string()],
        ));
        assert_eq!(id.to_string(), "mod.Listener#onTick(mod.TickEvent)");
        assert_eq!(id.owner(), "mod.Listener");
    }
}
