//! Listener adapters, generated once per (listener, method, event) shape.
//!
//! The cache holds adapters weakly: an adapter lives as long as some caller
//! keeps it, and is generated again on the next request after that. At most
//! one generation per key runs at a time; concurrent callers for the same key
//! wait for it and share its result, failures included.

use crate::error::{Result, WeftError};
use crate::pool::ClassIndex;
use crate::transform::ClassTransformService;
use dashmap::DashMap;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use uuid::Uuid;
use weft_api::models::{ClassPool, MethodIdentifier, MethodInvoker, naming};
use weft_api::{ApiError, ApiResult, Instance};

pub trait Executor: Send + Sync {
    fn invoke(&self, listener: &Instance, event: &Instance) -> ApiResult<Option<Instance>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdapterKey {
    pub listener: String,
    pub method: String,
    pub event: String,
}

impl AdapterKey {
    pub fn new(listener: impl Into<String>, method: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            listener: listener.into(),
            method: method.into(),
            event: event.into(),
        }
    }

    /// The event type is the method's first parameter.
    pub fn for_method(method: &MethodIdentifier) -> ApiResult<Self> {
        let event = method.parameters.first().ok_or_else(|| {
            ApiError::InvalidDeclaration(format!("listener method {method} takes no event parameter"))
        })?;
        Ok(Self::new(method.owner.clone(), method.name.clone(), event.clone()))
    }
}

impl fmt::Display for AdapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}({})", self.listener, self.method, self.event)
    }
}

pub struct GeneratedAdapter {
    name: String,
    key: AdapterKey,
    invoker: MethodInvoker,
}

impl GeneratedAdapter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &AdapterKey {
        &self.key
    }
}

impl Executor for GeneratedAdapter {
    fn invoke(&self, listener: &Instance, event: &Instance) -> ApiResult<Option<Instance>> {
        (self.invoker)(listener, std::slice::from_ref(event))
    }
}

impl fmt::Debug for GeneratedAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedAdapter")
            .field("name", &self.name)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

enum Slot {
    Empty,
    Ready(Weak<GeneratedAdapter>),
    Failed(String),
}

pub struct AdapterCache {
    slots: DashMap<AdapterKey, Arc<Mutex<Slot>>>,
    namespace: String,
    session: String,
    counter: AtomicU64,
    generations: AtomicUsize,
}

impl AdapterCache {
    pub fn new(namespace: impl Into<String>, capacity: usize) -> Self {
        Self {
            slots: DashMap::with_capacity(capacity),
            namespace: namespace.into(),
            session: session_token(),
            counter: AtomicU64::new(0),
            generations: AtomicUsize::new(0),
        }
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    /// Number of successful generations so far.
    pub fn generations(&self) -> usize {
        self.generations.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn next_name(&self, key: &AdapterKey) -> String {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        format!(
            "{}.{}.{}-{}-{}-{}",
            self.namespace,
            self.session,
            naming::simple_name(&key.listener),
            key.method,
            naming::simple_name(&key.event),
            id
        )
    }

    pub fn get_or_create(
        &self,
        key: &AdapterKey,
        generate: impl FnOnce(&AdapterKey) -> ApiResult<MethodInvoker>,
    ) -> Result<Arc<GeneratedAdapter>> {
        let cell = self
            .slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Slot::Empty)))
            .value()
            .clone();

        // Generators run under catch_unwind, so the slot state is intact even
        // if the lock reports poisoning.
        let mut slot = cell.lock().unwrap_or_else(PoisonError::into_inner);
        match &*slot {
            Slot::Ready(weak) => {
                if let Some(adapter) = weak.upgrade() {
                    return Ok(adapter);
                }
                tracing::debug!(key = %key, "Adapter was dropped, generating again");
            }
            Slot::Failed(reason) => return Err(WeftError::Generation(reason.clone())),
            Slot::Empty => {}
        }

        let generated = panic::catch_unwind(AssertUnwindSafe(|| generate(key))).unwrap_or_else(|payload| {
            Err(ApiError::Internal(format!(
                "generator panicked: {}",
                panic_message(payload.as_ref())
            )))
        });
        match generated {
            Ok(invoker) => {
                let adapter = Arc::new(GeneratedAdapter {
                    name: self.next_name(key),
                    key: key.clone(),
                    invoker,
                });
                *slot = Slot::Ready(Arc::downgrade(&adapter));
                self.generations.fetch_add(1, Ordering::SeqCst);
                tracing::debug!(key = %key, adapter = %adapter.name, "Generated adapter");
                Ok(adapter)
            }
            Err(e) => {
                let reason = format!("{key}: {e}");
                tracing::error!(key = %key, error = %e, "Adapter generation failed");
                *slot = Slot::Failed(reason.clone());
                Err(WeftError::Generation(reason))
            }
        }
    }

    /// Forgets a key, including a recorded failure.
    pub fn invalidate(&self, key: &AdapterKey) -> bool {
        self.slots.remove(key).is_some()
    }

    /// Drops entries whose adapter no longer has any holder. Entries being
    /// generated are left alone.
    pub fn purge_expired(&self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| match slot.try_lock() {
            Ok(slot) => !matches!(&*slot, Slot::Ready(weak) if weak.strong_count() == 0),
            Err(_) => true,
        });
        before.saturating_sub(self.slots.len())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload")
}

/// Random per-process token keeping adapter names of separate contexts apart.
fn session_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Hands out executors for listener methods defined in a context.
pub struct ExecutorFactory {
    cache: Arc<AdapterCache>,
    transforms: Arc<ClassTransformService>,
    classes: Arc<ClassIndex>,
}

/// Produces the executor of one listener method on demand.
#[derive(Clone)]
pub struct ExecutorSupplier {
    key: AdapterKey,
    method: MethodIdentifier,
    cache: Arc<AdapterCache>,
    classes: Arc<ClassIndex>,
}

impl ExecutorFactory {
    pub fn new(cache: Arc<AdapterCache>, transforms: Arc<ClassTransformService>, classes: Arc<ClassIndex>) -> Self {
        Self {
            cache,
            transforms,
            classes,
        }
    }

    pub fn cache(&self) -> &Arc<AdapterCache> {
        &self.cache
    }

    /// The listener class and method are made public when the class is
    /// defined, so adapters can call them directly.
    pub fn create(&self, method: &MethodIdentifier) -> Result<ExecutorSupplier> {
        let key = AdapterKey::for_method(method)?;

        if self.classes.contains(&method.owner) {
            tracing::debug!(listener = %method.owner, "Listener already defined, visibility left as is");
        } else {
            let target = method.clone();
            self.transforms
                .add_class_transformation(method.owner.clone(), move |class| {
                    class.make_public();
                    if let Some(node) = class.declared_method_mut(&target.name, &target.parameters) {
                        node.make_public();
                    }
                })?;
        }

        Ok(ExecutorSupplier {
            key,
            method: method.clone(),
            cache: self.cache.clone(),
            classes: self.classes.clone(),
        })
    }
}

impl ExecutorSupplier {
    pub fn key(&self) -> &AdapterKey {
        &self.key
    }

    pub fn get(&self) -> Result<Arc<GeneratedAdapter>> {
        self.cache.get_or_create(&self.key, |_| {
            let method = self.method.locate(self.classes.as_ref() as &dyn ClassPool)?;
            method
                .invoker
                .ok_or_else(|| ApiError::Internal(format!("listener method {} has no body", self.method)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoker() -> ApiResult<MethodInvoker> {
        Ok(Arc::new(
            |_: &Instance, args: &[Instance]| -> ApiResult<Option<Instance>> { Ok(args.first().cloned()) },
        ))
    }

    #[test]
    fn test_adapter_name_shape() {
        let cache = AdapterCache::new("weft.generated", 4);
        let key = AdapterKey::new("mod.feature.Fly", "onTick", "net.game.TickEvent");
        let adapter = cache.get_or_create(&key, |_| invoker()).unwrap();

        let prefix = format!("weft.generated.{}.Fly-onTick-TickEvent-", cache.session());
        assert!(adapter.name().starts_with(&prefix), "{}", adapter.name());
    }

    #[test]
    fn test_held_adapter_is_reused() {
        let cache = AdapterCache::new("weft.generated", 4);
        let key = AdapterKey::new("mod.Fly", "onTick", "mod.TickEvent");
        let first = cache.get_or_create(&key, |_| invoker()).unwrap();
        let second = cache.get_or_create(&key, |_| panic!("generated twice")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.generations(), 1);
    }

    #[test]
    fn test_dropped_adapter_is_regenerated_and_purged() {
        let cache = AdapterCache::new("weft.generated", 4);
        let key = AdapterKey::new("mod.Fly", "onTick", "mod.TickEvent");
        let first_name = cache.get_or_create(&key, |_| invoker()).unwrap().name().to_string();
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());

        let second = cache.get_or_create(&key, |_| invoker()).unwrap();
        assert_ne!(second.name(), first_name);
        assert_eq!(cache.generations(), 2);
    }

    #[test]
    fn test_failure_is_sticky_until_invalidated() {
        let cache = AdapterCache::new("weft.generated", 4);
        let key = AdapterKey::new("mod.Fly", "onTick", "mod.TickEvent");
        let err = cache
            .get_or_create(&key, |_| Err(ApiError::Internal("boom".into())))
            .unwrap_err();
        assert!(matches!(err, WeftError::Generation(_)));
        assert!(matches!(
            cache.get_or_create(&key, |_| invoker()),
            Err(WeftError::Generation(reason)) if reason.contains("boom")
        ));

        assert!(cache.invalidate(&key));
        assert!(cache.get_or_create(&key, |_| invoker()).is_ok());
    }

    #[test]
    fn test_panicking_generator_is_a_sticky_generation_failure() {
        let cache = AdapterCache::new("weft.generated", 4);
        let key = AdapterKey::new("mod.Fly", "onTick", "mod.TickEvent");
        let first = cache.get_or_create(&key, |_| panic!("bytecode writer crashed"));
        assert!(matches!(first, Err(WeftError::Generation(reason)) if reason.contains("bytecode writer crashed")));

        assert!(matches!(
            cache.get_or_create(&key, |_| invoker()),
            Err(WeftError::Generation(reason)) if reason.contains("panicked")
        ));
        assert!(cache.invalidate(&key));
        assert!(cache.get_or_create(&key, |_| invoker()).is_ok());
    }

    #[test]
    fn test_session_tokens_are_random_per_cache() {
        let first = AdapterCache::new("weft.generated", 4);
        let second = AdapterCache::new("weft.generated", 4);
        assert_eq!(first.session().len(), 32);
        assert!(first.session().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first.session(), second.session());
    }

    #[test]
    fn test_key_requires_event_parameter() {
        let method = MethodIdentifier::new("mod.Fly", "onTick", vec![]);
        assert!(AdapterKey::for_method(&method).is_err());
    }
}
