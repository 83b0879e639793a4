use crate::error::ApiResult;
use crate::inject::{Instance, Key};
use crate::models::{AnnotationType, DiscoveryRecord};
use std::fmt;
use std::sync::Arc;

/// Receives discovery records for the annotation types declared by its
/// [`Service`].
///
/// Calls for one handler are sequential. An error is a broken declaration and
/// aborts the discovery that triggered it.
pub trait ServiceHandler: Send + Sync {
    fn discover(&self, record: &DiscoveryRecord) -> ApiResult<()>;
}

/// The `@Service` declaration of a handler type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub annotations: Vec<AnnotationType>,
}

impl Service {
    pub fn new(annotation: &AnnotationType) -> Self {
        Self {
            annotations: vec![annotation.clone()],
        }
    }

    pub fn of(annotations: Vec<AnnotationType>) -> Self {
        Self { annotations }
    }

    /// Whether a record whose concrete annotation type is `concrete` belongs to this service.
    pub fn accepts(&self, concrete: &AnnotationType) -> bool {
        self.annotations
            .iter()
            .any(|declared| declared.is_assignable_from(concrete))
    }
}

/// A handler type token: the class name it is bound under in the injector,
/// its `@Service` declaration (if any) and a cast from the injected instance.
#[derive(Clone)]
pub struct HandlerType {
    class_name: String,
    service: Option<Service>,
    cast: fn(Instance) -> Option<Arc<dyn ServiceHandler>>,
}

fn cast_handler<H: ServiceHandler + 'static>(instance: Instance) -> Option<Arc<dyn ServiceHandler>> {
    instance
        .downcast::<H>()
        .ok()
        .map(|handler| handler as Arc<dyn ServiceHandler>)
}

impl HandlerType {
    pub fn new<H: ServiceHandler + 'static>(class_name: impl Into<String>, service: Option<Service>) -> Self {
        Self {
            class_name: class_name.into(),
            service,
            cast: cast_handler::<H>,
        }
    }

    /// Shorthand for a handler declaring `@Service(annotation)`.
    pub fn service<H: ServiceHandler + 'static>(
        class_name: impl Into<String>,
        annotation: &AnnotationType,
    ) -> Self {
        Self::new::<H>(class_name, Some(Service::new(annotation)))
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn key(&self) -> Key {
        Key::new(self.class_name.clone())
    }

    pub fn declared_service(&self) -> Option<&Service> {
        self.service.as_ref()
    }

    pub fn cast(&self, instance: Instance) -> Option<Arc<dyn ServiceHandler>> {
        (self.cast)(instance)
    }
}

impl PartialEq for HandlerType {
    fn eq(&self, other: &Self) -> bool {
        self.class_name == other.class_name
    }
}

impl Eq for HandlerType {}

impl fmt::Debug for HandlerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerType")
            .field("class_name", &self.class_name)
            .field("service", &self.service)
            .finish()
    }
}
