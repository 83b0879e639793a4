//! The root context wiring injector, registry, transformers and hooks.

use crate::config::WeftConfig;
use crate::error::Result;
use crate::executor::{AdapterCache, ExecutorFactory};
use crate::filter::FilterMapping;
use crate::hook::{HOOK_TRANSFORMER_CLASS, HookResolvers, HookTransformer, Trampoline};
use crate::inject::Container;
use crate::pool::ClassIndex;
use crate::service::ServiceRegistry;
use crate::transform::ClassTransformService;
use std::sync::Arc;
use weft_api::hook::HOOK;
use weft_api::models::ClassNode;
use weft_api::{HandlerType, Instance, Key};
use weft_mapping::{ClassHierarchy, MappingProvider, SymbolResolver};

/// Priority of the hook transformer among class transformers.
pub const HOOK_TRANSFORMER_PRIORITY: i32 = 0;

pub struct WeftBuilder {
    config: WeftConfig,
    container: Option<Arc<Container>>,
    resolver: Option<Arc<SymbolResolver>>,
    hierarchy: Option<Arc<dyn ClassHierarchy>>,
}

impl WeftBuilder {
    /// Use an existing container instead of a fresh one.
    pub fn container(mut self, container: Arc<Container>) -> Self {
        self.container = Some(container);
        self
    }

    /// Use a prepared resolver instead of loading mappings from the config.
    pub fn resolver(mut self, resolver: Arc<SymbolResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Hierarchy used for ancestor lookups when mappings are loaded. Defaults
    /// to the classes defined in the context.
    pub fn hierarchy(mut self, hierarchy: Arc<dyn ClassHierarchy>) -> Self {
        self.hierarchy = Some(hierarchy);
        self
    }

    pub fn build(self) -> Result<Weft> {
        self.config.validate()?;

        let container = self.container.unwrap_or_default();
        let classes = Arc::new(ClassIndex::new());
        let hierarchy = self
            .hierarchy
            .unwrap_or_else(|| classes.clone() as Arc<dyn ClassHierarchy>);

        let resolver = match (self.resolver, &self.config.game_version) {
            (Some(resolver), _) => resolver,
            (None, Some(version)) => {
                let provider = MappingProvider::new(self.config.mappings_dir.clone());
                let set = provider.load(version)?;
                Arc::new(SymbolResolver::new(&set, hierarchy.clone()))
            }
            (None, None) => {
                tracing::info!("No game version configured, names are used as declared");
                Arc::new(SymbolResolver::identity("unversioned", hierarchy.clone()))
            }
        };

        let resolvers = HookResolvers::mapped(resolver.clone());
        let hooks = Arc::new(HookTransformer::new(resolvers.clone()));
        container.bind_instance(Key::new(HOOK_TRANSFORMER_CLASS), hooks.clone() as Instance)?;

        let transforms = Arc::new(ClassTransformService::new());
        transforms.register(HOOK_TRANSFORMER_PRIORITY, hooks.clone())?;

        let registry = Arc::new(ServiceRegistry::new(container.clone()));
        registry.register_handler(HandlerType::service::<HookTransformer>(HOOK_TRANSFORMER_CLASS, &HOOK))?;

        let trampoline = Arc::new(
            Trampoline::new(container.clone(), classes.clone()).with_class_names(resolvers.class),
        );
        let cache = Arc::new(AdapterCache::new(
            self.config.adapter_namespace.clone(),
            self.config.adapter_cache_capacity,
        ));
        let executors = ExecutorFactory::new(cache, transforms.clone(), classes.clone());

        tracing::info!(version = %resolver.version(), mappings = resolver.len(), "Context ready");

        Ok(Weft {
            config: self.config,
            container,
            classes,
            registry,
            transforms,
            hooks,
            trampoline,
            executors,
            resolver,
            hierarchy,
        })
    }
}

/// One framework instance. Tests build as many as they like.
pub struct Weft {
    config: WeftConfig,
    container: Arc<Container>,
    classes: Arc<ClassIndex>,
    registry: Arc<ServiceRegistry>,
    transforms: Arc<ClassTransformService>,
    hooks: Arc<HookTransformer>,
    trampoline: Arc<Trampoline>,
    executors: ExecutorFactory,
    resolver: Arc<SymbolResolver>,
    hierarchy: Arc<dyn ClassHierarchy>,
}

impl Weft {
    pub fn builder(config: WeftConfig) -> WeftBuilder {
        WeftBuilder {
            config,
            container: None,
            resolver: None,
            hierarchy: None,
        }
    }

    /// Context with default settings and identity name resolution.
    pub fn new() -> Result<Self> {
        Self::builder(WeftConfig::default()).build()
    }

    /// Realizes pending service handlers. Classes defined before this call
    /// are replayed to them.
    pub fn initialize(&self) -> Result<()> {
        self.registry.flush_pending()
    }

    pub fn register_handler(&self, handler_type: HandlerType) -> Result<()> {
        self.registry.register_handler(handler_type)
    }

    /// Transforms and defines a class, then announces it to the registry.
    pub fn define_class(&self, mut class: ClassNode) -> Result<Arc<ClassNode>> {
        self.classes.declare(&class);
        self.transforms.transform(&mut class)?;
        let class = Arc::new(class);
        if self.classes.insert(class.clone()).is_some() {
            tracing::warn!(class = %class.name, "Class redefined");
        }
        self.registry.notify_class_loaded(&class)?;
        Ok(class)
    }

    pub fn class(&self, name: &str) -> Option<Arc<ClassNode>> {
        self.classes.get(name)
    }

    pub fn config(&self) -> &WeftConfig {
        &self.config
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn classes(&self) -> &Arc<ClassIndex> {
        &self.classes
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn transforms(&self) -> &Arc<ClassTransformService> {
        &self.transforms
    }

    pub fn hooks(&self) -> &Arc<HookTransformer> {
        &self.hooks
    }

    pub fn trampoline(&self) -> &Arc<Trampoline> {
        &self.trampoline
    }

    pub fn executors(&self) -> &ExecutorFactory {
        &self.executors
    }

    pub fn resolver(&self) -> &Arc<SymbolResolver> {
        &self.resolver
    }

    /// Event filter check against this context's class hierarchy, so a
    /// listener for a type also sees events raised for its subtypes.
    pub fn filter_matches(&self, required: &FilterMapping, provided: &FilterMapping) -> bool {
        FilterMapping::matches(required, provided, self.hierarchy.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterValue;

    #[test]
    fn test_filter_matches_defined_subtypes() {
        let weft = Weft::new().unwrap();
        weft.define_class(ClassNode::new("net.game.Monster").with_super("net.game.Entity"))
            .unwrap();
        weft.define_class(ClassNode::new("net.game.Zombie").with_super("net.game.Monster"))
            .unwrap();

        let required = FilterMapping::new().with("entity", FilterValue::Type("net.game.Entity".into()));
        let zombie = FilterMapping::new().with("entity", FilterValue::Type("net.game.Zombie".into()));
        let world = FilterMapping::new().with("entity", FilterValue::Type("net.game.World".into()));

        assert!(weft.filter_matches(&required, &zombie));
        assert!(!weft.filter_matches(&required, &world));
    }
}
