//! Per-version symbol mappings and the resolver that applies them.
//!
//! ```text
//! <mappings_dir>/<version>.json ──▶ MappingProvider ──▶ MappingSet
//!                                                          │
//!                     ClassHierarchy (class bytes) ──▶ SymbolResolver
//! ```

pub mod error;
pub mod hierarchy;
pub mod model;
pub mod provider;
pub mod remap;

pub use error::{MappingError, Result};
pub use hierarchy::{
    ClassFileHierarchy, ClassHierarchy, ClassSource, DirectoryClassSource, InMemoryHierarchy,
};
pub use model::{ClassMapping, FieldMapping, MappingSet, MethodMapping, OwnedMethod};
pub use provider::MappingProvider;
pub use remap::SymbolResolver;
