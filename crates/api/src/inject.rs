use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

/// A type-erased injected instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Type token plus optional qualifier, the unit of injection lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key {
    pub type_name: String,
    pub qualifier: Option<String>,
}

impl Key {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            qualifier: None,
        }
    }

    pub fn named(type_name: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            qualifier: Some(qualifier.into()),
        }
    }

    /// Key derived from a Rust type.
    pub fn of<T: ?Sized>() -> Self {
        Self::new(type_name::<T>())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{}@{}", self.type_name, qualifier),
            None => f.write_str(&self.type_name),
        }
    }
}

/// The dependency-injection boundary: resolves instances by key.
///
/// Singleton-scoped bindings must return the same instance on every call.
/// Implementations may load (and therefore discover) further classes while
/// resolving.
pub trait Injector: Send + Sync {
    fn get_instance(&self, key: &Key) -> ApiResult<Instance>;
}

impl<'a> dyn Injector + 'a {
    /// Resolve and downcast to a concrete type.
    pub fn resolve<T: Any + Send + Sync>(&self, key: &Key) -> ApiResult<Arc<T>> {
        self.get_instance(key)?.downcast::<T>().map_err(|_| {
            ApiError::Internal(format!("{key} is not bound to {}", type_name::<T>()))
        })
    }
}
