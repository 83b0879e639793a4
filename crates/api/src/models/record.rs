use super::annotation::{Annotation, AnnotationRef, AnnotationType};
use super::identifier::Identifier;

/// A marker annotation found at an [`Identifier`], together with the filter
/// annotations of its group found on the same element.
#[derive(Debug, Clone)]
pub struct DiscoveryRecord {
    identifier: Identifier,
    annotation: AnnotationRef,
    filters: Vec<AnnotationRef>,
}

/// Identity of a record: the same annotation type at the same location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub identifier: Identifier,
    pub annotation: AnnotationType,
}

impl DiscoveryRecord {
    pub fn new(identifier: Identifier, annotation: AnnotationRef, filters: Vec<AnnotationRef>) -> Self {
        Self {
            identifier,
            annotation,
            filters,
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn annotation(&self) -> &AnnotationRef {
        &self.annotation
    }

    /// The concrete runtime type of the annotation.
    pub fn annotation_type(&self) -> AnnotationType {
        self.annotation.annotation_type()
    }

    /// Downcast the annotation to its concrete type.
    pub fn annotation_as<T: Annotation + 'static>(&self) -> Option<&T> {
        self.annotation.downcast_ref::<T>()
    }

    pub fn filters(&self) -> &[AnnotationRef] {
        &self.filters
    }

    pub fn filters_of<'a>(&'a self, kind: &'a AnnotationType) -> impl Iterator<Item = &'a AnnotationRef> + 'a {
        self.filters
            .iter()
            .filter(move |f| kind.is_assignable_from(&f.annotation_type()))
    }

    pub fn key(&self) -> RecordKey {
        RecordKey {
            identifier: self.identifier.clone(),
            annotation: self.annotation_type(),
        }
    }
}
