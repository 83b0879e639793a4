//! Discovery delivery across handler registration and class load orders.

use std::sync::{Arc, Mutex};
use weft_api::models::{AnnotationType, ClassNode, DiscoveryRecord, FieldNode, Marker, MethodNode};
use weft_api::{ApiResult, HandlerType, Instance, Key, Service, ServiceHandler};
use weft_core::{Weft, WeftError};

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<String>>,
}

impl Recorder {
    fn seen(&self) -> Vec<String> {
        let mut seen = self.seen.lock().unwrap().clone();
        seen.sort();
        seen
    }
}

impl ServiceHandler for Recorder {
    fn discover(&self, record: &DiscoveryRecord) -> ApiResult<()> {
        self.seen
            .lock()
            .unwrap()
            .push(format!("{} {}", record.annotation_type(), record.identifier()));
        Ok(())
    }
}

fn listener() -> AnnotationType {
    AnnotationType::new("mod.event.Listener")
}

fn annotated_class(name: &str, kind: &AnnotationType) -> ClassNode {
    ClassNode::new(name)
        .with_method(
            MethodNode::new("onTick", vec![], "void").with_annotation(Marker::new(kind).into_ref()),
        )
        .with_field(FieldNode::new("enabled", "boolean").with_annotation(Marker::new(kind).into_ref()))
}

fn bind_recorder(weft: &Weft, class_name: &str) -> Arc<Recorder> {
    let recorder = Arc::new(Recorder::default());
    weft.container()
        .bind_instance(Key::new(class_name), recorder.clone() as Instance)
        .unwrap();
    recorder
}

fn expected() -> Vec<String> {
    vec![
        "@mod.event.Listener mod.A#enabled".to_string(),
        "@mod.event.Listener mod.A#onTick()".to_string(),
    ]
}

#[test]
fn test_handler_first_then_class() {
    let weft = Weft::new().unwrap();
    let recorder = bind_recorder(&weft, "mod.Recorder");
    weft.register_handler(HandlerType::service::<Recorder>("mod.Recorder", &listener()))
        .unwrap();
    weft.initialize().unwrap();

    weft.define_class(annotated_class("mod.A", &listener())).unwrap();
    assert_eq!(recorder.seen(), expected());
}

#[test]
fn test_class_first_then_handler() {
    let weft = Weft::new().unwrap();
    let recorder = bind_recorder(&weft, "mod.Recorder");
    weft.define_class(annotated_class("mod.A", &listener())).unwrap();

    weft.register_handler(HandlerType::service::<Recorder>("mod.Recorder", &listener()))
        .unwrap();
    assert!(recorder.seen().is_empty());

    weft.initialize().unwrap();
    assert_eq!(recorder.seen(), expected());
}

#[test]
fn test_renotification_does_not_duplicate() {
    let weft = Weft::new().unwrap();
    let recorder = bind_recorder(&weft, "mod.Recorder");
    weft.register_handler(HandlerType::service::<Recorder>("mod.Recorder", &listener()))
        .unwrap();
    weft.initialize().unwrap();

    let class = annotated_class("mod.A", &listener());
    weft.registry().notify_class_loaded(&class).unwrap();
    weft.registry().notify_class_loaded(&class).unwrap();
    weft.initialize().unwrap();

    assert_eq!(recorder.seen(), expected());
    assert_eq!(weft.registry().records().len(), 2);
}

#[test]
fn test_late_handler_sees_earlier_classes_once() {
    let weft = Weft::new().unwrap();
    weft.initialize().unwrap();
    weft.define_class(annotated_class("mod.A", &listener())).unwrap();

    let recorder = bind_recorder(&weft, "mod.Recorder");
    weft.register_handler(HandlerType::service::<Recorder>("mod.Recorder", &listener()))
        .unwrap();
    assert_eq!(recorder.seen(), expected());

    weft.define_class(annotated_class("mod.B", &listener())).unwrap();
    weft.initialize().unwrap();
    assert_eq!(recorder.seen().len(), 4);
}

#[test]
fn test_handler_class_registers_itself() {
    let weft = Weft::new().unwrap();
    let recorder = bind_recorder(&weft, "mod.Recorder");
    weft.initialize().unwrap();
    weft.define_class(annotated_class("mod.A", &listener())).unwrap();

    weft.define_class(
        ClassNode::new("mod.Recorder")
            .with_handler(HandlerType::service::<Recorder>("mod.Recorder", &listener())),
    )
    .unwrap();
    assert_eq!(recorder.seen(), expected());
}

#[test]
fn test_multi_annotation_service_and_proxied_annotations() {
    let weft = Weft::new().unwrap();
    let recorder = bind_recorder(&weft, "mod.Recorder");
    let setting = AnnotationType::new("mod.config.Setting");
    // Runtime proxy type implementing the declared annotation interface.
    let proxy = AnnotationType::with_supertypes("$Proxy12", vec![listener()]);

    weft.register_handler(HandlerType::new::<Recorder>(
        "mod.Recorder",
        Some(Service::of(vec![listener(), setting.clone()])),
    ))
    .unwrap();
    weft.initialize().unwrap();

    weft.define_class(ClassNode::new("mod.Proxied").with_annotation(Marker::new(&proxy).into_ref()))
        .unwrap();
    weft.define_class(ClassNode::new("mod.Configured").with_annotation(Marker::new(&setting).into_ref()))
        .unwrap();
    weft.define_class(
        ClassNode::new("mod.Other").with_annotation(Marker::new(&AnnotationType::new("mod.Other")).into_ref()),
    )
    .unwrap();

    assert_eq!(
        recorder.seen(),
        vec!["@$Proxy12 mod.Proxied", "@mod.config.Setting mod.Configured"]
    );
}

/// Loads another class from inside `discover`.
struct Loader {
    weft: Mutex<Option<Arc<Weft>>>,
    seen: Mutex<Vec<String>>,
}

impl ServiceHandler for Loader {
    fn discover(&self, record: &DiscoveryRecord) -> ApiResult<()> {
        self.seen.lock().unwrap().push(record.identifier().owner().to_string());
        let weft = self.weft.lock().unwrap().clone();
        if let Some(weft) = weft.filter(|_| record.identifier().owner() == "mod.A") {
            weft.define_class(ClassNode::new("mod.Nested").with_annotation(Marker::new(&listener()).into_ref()))
                .map_err(|e| weft_api::ApiError::Internal(e.to_string()))?;
        }
        Ok(())
    }
}

#[test]
fn test_reentrant_discovery() {
    let weft = Arc::new(Weft::new().unwrap());
    let loader = Arc::new(Loader {
        weft: Mutex::new(Some(weft.clone())),
        seen: Mutex::new(Vec::new()),
    });
    weft.container()
        .bind_instance(Key::new("mod.Loader"), loader.clone() as Instance)
        .unwrap();
    weft.register_handler(HandlerType::service::<Loader>("mod.Loader", &listener()))
        .unwrap();
    weft.initialize().unwrap();

    weft.define_class(ClassNode::new("mod.A").with_annotation(Marker::new(&listener()).into_ref()))
        .unwrap();

    assert_eq!(*loader.seen.lock().unwrap(), vec!["mod.A", "mod.Nested"]);
    // Break the context <-> handler cycle.
    loader.weft.lock().unwrap().take();
}

#[test]
fn test_handler_without_service_is_a_declaration_error() {
    let weft = Weft::new().unwrap();
    let err = weft
        .register_handler(HandlerType::new::<Recorder>("mod.Recorder", None))
        .unwrap_err();
    assert!(matches!(err, WeftError::InvalidHandlerDeclaration(_)));
}

#[test]
fn test_handler_error_aborts_discovery() {
    struct Strict;
    impl ServiceHandler for Strict {
        fn discover(&self, record: &DiscoveryRecord) -> ApiResult<()> {
            Err(weft_api::ApiError::InvalidDeclaration(record.identifier().to_string()))
        }
    }

    let weft = Weft::new().unwrap();
    weft.container()
        .bind_value(Key::new("mod.Strict"), Strict)
        .unwrap();
    weft.register_handler(HandlerType::service::<Strict>("mod.Strict", &listener()))
        .unwrap();
    weft.initialize().unwrap();

    let err = weft
        .define_class(ClassNode::new("mod.A").with_annotation(Marker::new(&listener()).into_ref()))
        .unwrap_err();
    assert!(matches!(err, WeftError::Api(_)));
}
