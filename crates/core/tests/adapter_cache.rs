//! Single-flight adapter generation and the executor factory.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use weft_api::models::{ClassNode, MethodAccessFlags, MethodIdentifier, MethodInvoker, MethodNode, Parameter};
use weft_api::{ApiResult, Instance};
use weft_core::executor::{AdapterCache, AdapterKey, Executor};
use weft_core::{Weft, WeftError};

fn echo() -> MethodInvoker {
    Arc::new(|_: &Instance, args: &[Instance]| -> ApiResult<Option<Instance>> { Ok(args.first().cloned()) })
}

#[test]
fn test_concurrent_first_use_generates_once() {
    const THREADS: usize = 8;
    let cache = Arc::new(AdapterCache::new("weft.generated", 16));
    let generated = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));
    let key = AdapterKey::new("mod.Fly", "onTick", "mod.TickEvent");

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let cache = cache.clone();
            let generated = generated.clone();
            let barrier = barrier.clone();
            let key = key.clone();
            thread::spawn(move || {
                barrier.wait();
                cache
                    .get_or_create(&key, |_| {
                        generated.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(20));
                        Ok(echo())
                    })
                    .unwrap()
            })
        })
        .collect();

    let adapters: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(generated.load(Ordering::SeqCst), 1);
    assert!(adapters.iter().all(|a| Arc::ptr_eq(a, &adapters[0])));
}

#[test]
fn test_concurrent_waiters_share_failure() {
    const THREADS: usize = 4;
    let cache = Arc::new(AdapterCache::new("weft.generated", 16));
    let generated = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));
    let key = AdapterKey::new("mod.Fly", "onTick", "mod.TickEvent");

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let cache = cache.clone();
            let generated = generated.clone();
            let barrier = barrier.clone();
            let key = key.clone();
            thread::spawn(move || {
                barrier.wait();
                cache
                    .get_or_create(&key, |_| {
                        generated.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(20));
                        Err(weft_api::ApiError::Internal("no bytecode".into()))
                    })
                    .map(|_| ())
            })
        })
        .collect();

    for handle in handles {
        assert!(matches!(handle.join().unwrap(), Err(WeftError::Generation(_))));
    }
    assert_eq!(generated.load(Ordering::SeqCst), 1);
}

#[test]
fn test_distinct_keys_generate_independently() {
    let cache = Arc::new(AdapterCache::new("weft.generated", 16));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let cache = cache.clone();
            thread::spawn(move || {
                let key = AdapterKey::new("mod.Fly", format!("on{i}"), "mod.TickEvent");
                cache.get_or_create(&key, |_| Ok(echo())).unwrap()
            })
        })
        .collect();
    let adapters: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(cache.generations(), 4);
    let mut names: Vec<&str> = adapters.iter().map(|a| a.name()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 4);
}

#[test]
fn test_executor_factory_end_to_end() {
    let weft = Weft::new().unwrap();
    let method = MethodIdentifier::new("mod.feature.Fly", "onTick", vec!["mod.TickEvent".into()]);
    let supplier = weft.executors().create(&method).unwrap();

    let listener = ClassNode::new("mod.feature.Fly").with_method(
        MethodNode::new("onTick", vec![Parameter::of("mod.TickEvent")], "void")
            .with_access(MethodAccessFlags::PRIVATE)
            .with_invoker(|listener, args| {
                let speed = listener.downcast_ref::<f64>().copied().unwrap_or_default();
                let tick = args[0].downcast_ref::<u64>().copied().unwrap_or_default();
                Ok(Some(Arc::new(speed * tick as f64) as Instance))
            }),
    );
    let defined = weft.define_class(listener).unwrap();
    assert!(defined.methods[0].is_public());

    let executor = supplier.get().unwrap();
    let again = supplier.get().unwrap();
    assert!(Arc::ptr_eq(&executor, &again));
    assert_eq!(weft.executors().cache().generations(), 1);

    let listener: Instance = Arc::new(1.5f64);
    let event: Instance = Arc::new(4u64);
    let result = executor.invoke(&listener, &event).unwrap().unwrap();
    assert_eq!(result.downcast_ref::<f64>(), Some(&6.0));
}

#[test]
fn test_executor_for_unknown_listener_fails_generation() {
    let weft = Weft::new().unwrap();
    let method = MethodIdentifier::new("mod.Missing", "onTick", vec!["mod.TickEvent".into()]);
    let supplier = weft.executors().create(&method).unwrap();
    assert!(matches!(supplier.get(), Err(WeftError::Generation(_))));
}
