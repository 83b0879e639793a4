//! Name translation applied to `@Hook` targets at transform time.

use std::sync::Arc;
use weft_api::models::naming;
use weft_mapping::SymbolResolver;

/// Translates a symbolic binary type name. `None` means the name cannot be
/// resolved, and the hook is skipped.
pub trait NameResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<String>;

    /// Inverse of `resolve`, used to recover symbolic owners of transformed classes.
    fn unresolve(&self, name: &str) -> String {
        name.to_string()
    }
}

pub trait MethodNameResolver: Send + Sync {
    /// `owner` and `parameters` are symbolic binary names.
    fn resolve(&self, owner: &str, name: &str, parameters: &[String]) -> Option<String>;
}

pub struct IdentityResolver;

impl NameResolver for IdentityResolver {
    fn resolve(&self, name: &str) -> Option<String> {
        is_type_name(name).then(|| name.to_string())
    }
}

impl MethodNameResolver for IdentityResolver {
    fn resolve(&self, _owner: &str, name: &str, _parameters: &[String]) -> Option<String> {
        Some(name.to_string())
    }
}

pub struct ClassNameResolver {
    remapper: Arc<SymbolResolver>,
}

impl ClassNameResolver {
    pub fn new(remapper: Arc<SymbolResolver>) -> Self {
        Self { remapper }
    }
}

impl NameResolver for ClassNameResolver {
    fn resolve(&self, name: &str) -> Option<String> {
        if !is_type_name(name) {
            return None;
        }
        Some(self.remapper.map_type_name(name))
    }

    fn unresolve(&self, name: &str) -> String {
        self.remapper.unmap_type_name(name)
    }
}

/// Looks methods up by owner and symbolic parameter descriptor, so inherited
/// methods resolve through the owner's ancestors.
pub struct MappedMethodResolver {
    remapper: Arc<SymbolResolver>,
}

impl MappedMethodResolver {
    pub fn new(remapper: Arc<SymbolResolver>) -> Self {
        Self { remapper }
    }
}

impl MethodNameResolver for MappedMethodResolver {
    fn resolve(&self, owner: &str, name: &str, parameters: &[String]) -> Option<String> {
        if !parameters.iter().all(|p| is_type_name(p)) {
            return None;
        }
        let descriptor = naming::parameters_descriptor(parameters);
        Some(
            self.remapper
                .map_method(&naming::to_internal(owner), name, &descriptor),
        )
    }
}

/// The three resolvers a hook target passes through.
#[derive(Clone)]
pub struct HookResolvers {
    pub class: Arc<dyn NameResolver>,
    pub method: Arc<dyn MethodNameResolver>,
    pub parameter: Arc<dyn NameResolver>,
}

impl HookResolvers {
    pub fn identity() -> Self {
        Self {
            class: Arc::new(IdentityResolver),
            method: Arc::new(IdentityResolver),
            parameter: Arc::new(IdentityResolver),
        }
    }

    pub fn mapped(remapper: Arc<SymbolResolver>) -> Self {
        let class: Arc<dyn NameResolver> = Arc::new(ClassNameResolver::new(remapper.clone()));
        Self {
            parameter: class.clone(),
            class,
            method: Arc::new(MappedMethodResolver::new(remapper)),
        }
    }
}

/// Binary type name such as `int`, `a.b.C$D` or `a.B[]`.
fn is_type_name(name: &str) -> bool {
    let (element, _) = naming::element_type(name);
    !element.is_empty()
        && element.split('.').all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
                && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        })
}
