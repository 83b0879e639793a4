//! Turns annotated class elements into discovery records.

use weft_api::models::{
    AnnotationRef, ClassIdentifier, ClassNode, DiscoveryRecord, Identifier,
};

/// Scans classes for marker annotations. Scanning never touches the class.
pub struct AnnotationIndex;

impl AnnotationIndex {
    /// Records for the class itself, then its methods, then its fields.
    pub fn scan(class: &ClassNode) -> Vec<DiscoveryRecord> {
        let mut records = Vec::new();

        collect(
            ClassIdentifier::new(class.name.clone()).into(),
            &class.annotations,
            &mut records,
        );
        for method in &class.methods {
            collect(
                method.identifier(&class.name).into(),
                &method.annotations,
                &mut records,
            );
        }
        for field in &class.fields {
            collect(
                field.identifier(&class.name).into(),
                &field.annotations,
                &mut records,
            );
        }

        tracing::trace!(class = %class.name, records = records.len(), "Scanned class");
        records
    }
}

/// Filter annotations never form records of their own; they ride along on the
/// record of their group annotation on the same element.
fn collect(identifier: Identifier, annotations: &[AnnotationRef], out: &mut Vec<DiscoveryRecord>) {
    for annotation in annotations {
        let kind = annotation.annotation_type();
        if let Some(group) = kind.group() {
            let attached = annotations
                .iter()
                .any(|other| group.is_assignable_from(&other.annotation_type()));
            if !attached {
                tracing::debug!(
                    element = %identifier,
                    filter = %kind,
                    "Filter annotation without its group annotation, ignoring"
                );
            }
            continue;
        }

        let filters: Vec<AnnotationRef> = annotations
            .iter()
            .filter(|other| {
                other
                    .annotation_type()
                    .group()
                    .is_some_and(|group| group.is_assignable_from(&kind))
            })
            .cloned()
            .collect();

        tracing::trace!(element = %identifier, annotation = %kind, filters = filters.len(), "Found marker");
        out.push(DiscoveryRecord::new(
            identifier.clone(),
            annotation.clone(),
            filters,
        ));
    }
}
