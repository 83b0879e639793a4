//! The `@Hook` declaration and the call it splices into target methods.

use crate::inject::{Instance, Key};
use crate::models::{Annotation, AnnotationType, ClassNode, MethodIdentifier};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

pub const OBJECT_TYPE: &str = "java.lang.Object";
pub const ARGUMENTS_TYPE: &str = "java.lang.Object[]";
pub const EXECUTION_TIME_TYPE: &str = "weft.hook.ExecutionTime";
pub const INSTANCE_QUALIFIER: &str = "instance";
pub const ARGS_QUALIFIER: &str = "args";

pub static HOOK: Lazy<AnnotationType> = Lazy::new(|| AnnotationType::new("weft.hook.Hook"));
pub static HOOK_FILTER: Lazy<AnnotationType> =
    Lazy::new(|| AnnotationType::filter("weft.hook.HookFilter", &HOOK));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExecutionTime {
    Before,
    After,
}

impl ExecutionTime {
    pub fn key() -> Key {
        Key::new(EXECUTION_TIME_TYPE)
    }
}

impl fmt::Display for ExecutionTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionTime::Before => f.write_str("BEFORE"),
            ExecutionTime::After => f.write_str("AFTER"),
        }
    }
}

/// Requests a call to the annotated method around a target method.
///
/// All names are symbolic; they are resolved for the active game version when
/// the target class is transformed. An empty `class_name` selects targets
/// through the [`HookFilter`]s on the same method instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hook {
    pub class_name: String,
    pub method_name: String,
    pub parameters: Vec<String>,
    pub execution_time: Vec<ExecutionTime>,
}

impl Hook {
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            parameters: Vec::new(),
            execution_time: vec![ExecutionTime::Before],
        }
    }

    pub fn with_parameters<S: Into<String>>(mut self, parameters: impl IntoIterator<Item = S>) -> Self {
        self.parameters = parameters.into_iter().map(Into::into).collect();
        self
    }

    pub fn at(mut self, times: &[ExecutionTime]) -> Self {
        self.execution_time = times.to_vec();
        self
    }

    pub fn uses_filters(&self) -> bool {
        self.class_name.is_empty()
    }
}

impl Annotation for Hook {
    fn annotation_type(&self) -> AnnotationType {
        HOOK.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Predicate over `(class being transformed, resolved type name)`.
pub type ClassPredicate = Arc<dyn Fn(&ClassNode, &str) -> bool + Send + Sync>;

/// Selects hook targets dynamically. `type_name` is resolved like a class name
/// before it is handed to the predicate.
#[derive(Clone)]
pub struct HookFilter {
    pub type_name: String,
    pub predicate: ClassPredicate,
}

impl HookFilter {
    pub fn new(
        type_name: impl Into<String>,
        predicate: impl Fn(&ClassNode, &str) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn test(&self, class: &ClassNode, resolved_type: &str) -> bool {
        (self.predicate)(class, resolved_type)
    }
}

impl fmt::Debug for HookFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookFilter")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

impl Annotation for HookFilter {
    fn annotation_type(&self) -> AnnotationType {
        HOOK_FILTER.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Arguments captured at a hook call site, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Arguments(pub Vec<Instance>);

impl Arguments {
    pub fn get(&self, index: usize) -> Option<&Instance> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A spliced trampoline call. `callback` is resolved lazily when the call runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HookCall {
    pub target: String,
    pub time: ExecutionTime,
    pub callback: MethodIdentifier,
}

impl HookCall {
    /// Injector key of the handler declaring the callback.
    pub fn handler_key(&self) -> Key {
        Key::new(self.callback.owner.clone())
    }
}
