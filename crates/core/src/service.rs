//! Routes discovery records to the service handlers that declared interest.
//!
//! Handlers and classes may arrive in any order. Every record is kept for the
//! lifetime of the registry so a handler registered late still sees classes
//! loaded before it, and every realized handler sees classes loaded after it.
//! Each (handler, record) pair is delivered exactly once.

use crate::discovery::AnnotationIndex;
use crate::error::{Result, WeftError};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use weft_api::models::{ClassNode, DiscoveryRecord, RecordKey};
use weft_api::{HandlerType, Injector, Service, ServiceHandler};

struct RealizedHandler {
    handler_type: HandlerType,
    service: Service,
    handler: Arc<dyn ServiceHandler>,
}

#[derive(Default)]
struct RegistryState {
    initialized: bool,
    registered: HashSet<String>,
    pending: Vec<HandlerType>,
    /// Append-only; a handler's position is its identity in `delivered`.
    realized: Vec<Arc<RealizedHandler>>,
    records: Vec<Arc<DiscoveryRecord>>,
    record_keys: HashSet<RecordKey>,
    delivered: HashSet<(usize, RecordKey)>,
}

/// The state lock is never held while a handler runs, so handlers may load
/// classes or register further handlers from inside `discover`.
pub struct ServiceRegistry {
    injector: Arc<dyn Injector>,
    state: Mutex<RegistryState>,
}

impl ServiceRegistry {
    pub fn new(injector: Arc<dyn Injector>) -> Self {
        Self {
            injector,
            state: Mutex::new(RegistryState::default()),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, RegistryState>> {
        self.state
            .lock()
            .map_err(|_| WeftError::Internal("Service registry lock poisoned".into()))
    }

    /// Queues a handler. Once the registry is initialized the handler is
    /// realized immediately instead. Registering a handler twice is a no-op.
    pub fn register_handler(&self, handler_type: HandlerType) -> Result<()> {
        match handler_type.declared_service() {
            Some(service) if !service.annotations.is_empty() => {}
            Some(_) => {
                return Err(WeftError::InvalidHandlerDeclaration(format!(
                    "{} declares @Service without annotation types",
                    handler_type.class_name()
                )));
            }
            None => {
                return Err(WeftError::InvalidHandlerDeclaration(format!(
                    "{} is not annotated with @Service",
                    handler_type.class_name()
                )));
            }
        }

        let initialized = {
            let mut state = self.state()?;
            if !state.registered.insert(handler_type.class_name().to_string()) {
                tracing::debug!(handler = handler_type.class_name(), "Handler already registered");
                return Ok(());
            }
            if !state.initialized {
                state.pending.push(handler_type.clone());
            }
            state.initialized
        };

        if initialized {
            self.realize(handler_type)
        } else {
            tracing::debug!(handler = handler_type.class_name(), "Handler pending");
            Ok(())
        }
    }

    /// Realizes every pending handler and replays the indexed records to it.
    /// Marks the registry initialized.
    pub fn flush_pending(&self) -> Result<()> {
        let pending = {
            let mut state = self.state()?;
            state.initialized = true;
            std::mem::take(&mut state.pending)
        };

        if !pending.is_empty() {
            tracing::info!(handlers = pending.len(), "Flushing pending service handlers");
        }
        for handler_type in pending {
            self.realize(handler_type)?;
        }
        Ok(())
    }

    /// Indexes a freshly loaded class and delivers its records to every
    /// realized handler. A class that is itself a service handler is
    /// registered afterwards.
    pub fn notify_class_loaded(&self, class: &ClassNode) -> Result<()> {
        let scanned = AnnotationIndex::scan(class);

        let (fresh, handlers) = {
            let mut state = self.state()?;
            let mut fresh = Vec::new();
            for record in scanned {
                if state.record_keys.insert(record.key()) {
                    let record = Arc::new(record);
                    state.records.push(record.clone());
                    fresh.push(record);
                }
            }
            let handlers: Vec<(usize, Arc<RealizedHandler>)> =
                state.realized.iter().cloned().enumerate().collect();
            (fresh, handlers)
        };

        if !fresh.is_empty() {
            for (index, handler) in &handlers {
                self.deliver(*index, handler, &fresh)?;
            }
        }

        if let Some(handler_type) = class.handler.as_ref().filter(|h| h.declared_service().is_some()) {
            self.register_handler(handler_type.clone())?;
        }
        Ok(())
    }

    fn realize(&self, handler_type: HandlerType) -> Result<()> {
        let name = handler_type.class_name().to_string();
        let construction_error = |reason: String| WeftError::HandlerConstruction {
            handler: name.clone(),
            reason,
        };

        let instance = self
            .injector
            .get_instance(&handler_type.key())
            .map_err(|e| construction_error(e.to_string()))?;
        let handler = handler_type
            .cast(instance)
            .ok_or_else(|| construction_error("bound instance is not a service handler".into()))?;
        let service = handler_type
            .declared_service()
            .cloned()
            .ok_or_else(|| WeftError::InvalidHandlerDeclaration(name.clone()))?;

        let realized = Arc::new(RealizedHandler {
            handler_type,
            service,
            handler,
        });

        let (index, records) = {
            let mut state = self.state()?;
            state.realized.push(realized.clone());
            (state.realized.len() - 1, state.records.clone())
        };

        tracing::info!(handler = %name, known_records = records.len(), "Realized service handler");
        self.deliver(index, &realized, &records)
    }

    fn deliver(
        &self,
        index: usize,
        handler: &RealizedHandler,
        records: &[Arc<DiscoveryRecord>],
    ) -> Result<()> {
        for record in records {
            if !handler.service.accepts(&record.annotation_type()) {
                continue;
            }
            if !self.state()?.delivered.insert((index, record.key())) {
                continue;
            }
            tracing::trace!(
                handler = handler.handler_type.class_name(),
                element = %record.identifier(),
                "Delivering record"
            );
            handler.handler.discover(record)?;
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state().map(|s| s.initialized).unwrap_or(false)
    }

    pub fn pending_count(&self) -> usize {
        self.state().map(|s| s.pending.len()).unwrap_or(0)
    }

    pub fn handler_count(&self) -> usize {
        self.state().map(|s| s.realized.len()).unwrap_or(0)
    }

    /// Snapshot of the durable record index.
    pub fn records(&self) -> Vec<Arc<DiscoveryRecord>> {
        self.state().map(|s| s.records.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inject::Container;
    use weft_api::models::{AnnotationType, Marker, MethodNode};
    use weft_api::{ApiResult, Instance, Key};

    #[derive(Default)]
    struct Collector {
        seen: Mutex<Vec<String>>,
    }

    impl ServiceHandler for Collector {
        fn discover(&self, record: &DiscoveryRecord) -> ApiResult<()> {
            self.seen.lock().unwrap().push(record.identifier().to_string());
            Ok(())
        }
    }

    fn setup() -> (Arc<Container>, ServiceRegistry, Arc<Collector>, AnnotationType) {
        let container = Arc::new(Container::new());
        let collector = Arc::new(Collector::default());
        container
            .bind_instance(Key::new("mod.Collector"), collector.clone() as Instance)
            .unwrap();
        let registry = ServiceRegistry::new(container.clone());
        (container, registry, collector, AnnotationType::new("mod.Listener"))
    }

    #[test]
    fn test_handler_without_service_is_rejected() {
        let (_, registry, _, _) = setup();
        let err = registry
            .register_handler(HandlerType::new::<Collector>("mod.Collector", None))
            .unwrap_err();
        assert!(matches!(err, WeftError::InvalidHandlerDeclaration(_)));
    }

    #[test]
    fn test_unbound_handler_fails_construction() {
        let (_, registry, _, listener) = setup();
        registry
            .register_handler(HandlerType::service::<Collector>("mod.Unbound", &listener))
            .unwrap();
        assert!(matches!(
            registry.flush_pending(),
            Err(WeftError::HandlerConstruction { .. })
        ));
    }

    #[test]
    fn test_pending_until_flush() {
        let (_, registry, collector, listener) = setup();
        registry
            .register_handler(HandlerType::service::<Collector>("mod.Collector", &listener))
            .unwrap();
        registry
            .notify_class_loaded(
                &ClassNode::new("mod.A").with_annotation(Marker::new(&listener).into_ref()),
            )
            .unwrap();

        assert_eq!(registry.pending_count(), 1);
        assert!(collector.seen.lock().unwrap().is_empty());

        registry.flush_pending().unwrap();
        assert!(registry.is_initialized());
        assert_eq!(registry.pending_count(), 0);
        assert_eq!(*collector.seen.lock().unwrap(), vec!["mod.A"]);
    }

    #[test]
    fn test_unrelated_annotation_is_not_delivered() {
        let (_, registry, collector, listener) = setup();
        let other = AnnotationType::new("mod.Other");
        registry
            .register_handler(HandlerType::service::<Collector>("mod.Collector", &listener))
            .unwrap();
        registry.flush_pending().unwrap();
        registry
            .notify_class_loaded(&ClassNode::new("mod.B").with_method(
                MethodNode::new("run", vec![], "void").with_annotation(Marker::new(&other).into_ref()),
            ))
            .unwrap();
        assert!(collector.seen.lock().unwrap().is_empty());
        assert_eq!(registry.records().len(), 1);
    }

    #[test]
    fn test_duplicate_registration_is_ignored() {
        let (_, registry, collector, listener) = setup();
        let handler = HandlerType::service::<Collector>("mod.Collector", &listener);
        registry.flush_pending().unwrap();
        registry.register_handler(handler.clone()).unwrap();
        registry.register_handler(handler).unwrap();
        registry
            .notify_class_loaded(
                &ClassNode::new("mod.A").with_annotation(Marker::new(&listener).into_ref()),
            )
            .unwrap();
        assert_eq!(registry.handler_count(), 1);
        assert_eq!(collector.seen.lock().unwrap().len(), 1);
    }
}
