use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Runtime type of a marker annotation.
///
/// Two annotation types are equal when their names are equal. A type may list
/// supertypes, which is how generated or proxied annotation instances remain
/// assignable to the interface a handler declared interest in. A type that
/// belongs to a group is a *filter*: when it sits on the same element as an
/// annotation of its group type it is attached to that annotation's record
/// instead of producing a record of its own.
#[derive(Clone)]
pub struct AnnotationType(Arc<AnnotationTypeInner>);

struct AnnotationTypeInner {
    name: String,
    supertypes: Vec<AnnotationType>,
    group: Option<AnnotationType>,
}

impl AnnotationType {
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), Vec::new(), None)
    }

    pub fn with_supertypes(name: impl Into<String>, supertypes: Vec<AnnotationType>) -> Self {
        Self::build(name.into(), supertypes, None)
    }

    /// A filter annotation type grouped under `group`.
    pub fn filter(name: impl Into<String>, group: &AnnotationType) -> Self {
        Self::build(name.into(), Vec::new(), Some(group.clone()))
    }

    fn build(name: String, supertypes: Vec<AnnotationType>, group: Option<AnnotationType>) -> Self {
        Self(Arc::new(AnnotationTypeInner {
            name,
            supertypes,
            group,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn group(&self) -> Option<&AnnotationType> {
        self.0.group.as_ref()
    }

    pub fn is_filter(&self) -> bool {
        self.0.group.is_some()
    }

    pub fn supertypes(&self) -> &[AnnotationType] {
        &self.0.supertypes
    }

    /// `true` when `other` is this type or (transitively) one of its subtypes.
    pub fn is_assignable_from(&self, other: &AnnotationType) -> bool {
        if self == other {
            return true;
        }
        other
            .supertypes()
            .iter()
            .any(|supertype| self.is_assignable_from(supertype))
    }
}

impl PartialEq for AnnotationType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl Eq for AnnotationType {}

impl Hash for AnnotationType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl Debug for AnnotationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0.name)
    }
}

impl Display for AnnotationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0.name)
    }
}

/// A concrete annotation instance found on a class, method or field.
pub trait Annotation: Send + Sync + Debug {
    /// The concrete runtime type of this instance.
    fn annotation_type(&self) -> AnnotationType;

    /// Cast to Any for downcasting to concrete types.
    fn as_any(&self) -> &dyn Any;
}

pub type AnnotationRef = Arc<dyn Annotation>;

impl dyn Annotation {
    pub fn downcast_ref<T: Annotation + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Untyped annotation carrying string attributes.
#[derive(Debug, Clone)]
pub struct Marker {
    pub kind: AnnotationType,
    pub attributes: BTreeMap<String, String>,
}

impl Marker {
    pub fn new(kind: &AnnotationType) -> Self {
        Self {
            kind: kind.clone(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn into_ref(self) -> AnnotationRef {
        Arc::new(self)
    }
}

impl Annotation for Marker {
    fn annotation_type(&self) -> AnnotationType {
        self.kind.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
