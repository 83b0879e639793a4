//! A small explicit injector: keys bound to instances, lazy singletons or
//! per-call providers.

use once_cell::sync::OnceCell;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use weft_api::{ApiError, ApiResult, Injector, Instance, Key};

type Factory = Box<dyn Fn(&dyn Injector) -> ApiResult<Instance> + Send + Sync>;

enum Binding {
    Instance(Instance),
    Singleton { factory: Factory, cell: OnceCell<Instance> },
    Provider(Factory),
}

#[derive(Default)]
pub struct Container {
    bindings: RwLock<HashMap<Key, Arc<Binding>>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    fn bind(&self, key: Key, binding: Binding) -> ApiResult<()> {
        let mut bindings = self
            .bindings
            .write()
            .map_err(|_| ApiError::Internal("Binding table lock poisoned".into()))?;
        if bindings.insert(key.clone(), Arc::new(binding)).is_some() {
            tracing::debug!(key = %key, "Replaced existing binding");
        }
        Ok(())
    }

    pub fn bind_instance(&self, key: Key, instance: Instance) -> ApiResult<()> {
        self.bind(key, Binding::Instance(instance))
    }

    pub fn bind_value<T: Any + Send + Sync>(&self, key: Key, value: T) -> ApiResult<()> {
        self.bind_instance(key, Arc::new(value))
    }

    /// Constructed on first lookup, then shared. The factory runs without any
    /// container lock held and may resolve other keys.
    pub fn bind_singleton(
        &self,
        key: Key,
        factory: impl Fn(&dyn Injector) -> ApiResult<Instance> + Send + Sync + 'static,
    ) -> ApiResult<()> {
        self.bind(
            key,
            Binding::Singleton {
                factory: Box::new(factory),
                cell: OnceCell::new(),
            },
        )
    }

    /// Constructed anew on every lookup.
    pub fn bind_provider(
        &self,
        key: Key,
        factory: impl Fn(&dyn Injector) -> ApiResult<Instance> + Send + Sync + 'static,
    ) -> ApiResult<()> {
        self.bind(key, Binding::Provider(Box::new(factory)))
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.bindings
            .read()
            .map(|bindings| bindings.contains_key(key))
            .unwrap_or(false)
    }

    fn binding(&self, key: &Key) -> ApiResult<Arc<Binding>> {
        let bindings = self
            .bindings
            .read()
            .map_err(|_| ApiError::Internal("Binding table lock poisoned".into()))?;
        bindings
            .get(key)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("no binding for {key}")))
    }
}

impl Injector for Container {
    fn get_instance(&self, key: &Key) -> ApiResult<Instance> {
        match &*self.binding(key)? {
            Binding::Instance(instance) => Ok(instance.clone()),
            Binding::Singleton { factory, cell } => cell
                .get_or_try_init(|| {
                    tracing::debug!(key = %key, "Constructing singleton");
                    factory(self)
                })
                .cloned(),
            Binding::Provider(factory) => factory(self),
        }
    }
}
