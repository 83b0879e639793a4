use crate::error::{Result, WeftError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use weft_api::models::ClassNode;
use weft_api::{ClassTransformer, TransformContext};

type Transformation = Box<dyn FnOnce(&mut ClassNode) + Send>;

struct Registered {
    priority: i32,
    transformer: Arc<dyn ClassTransformer>,
}

/// Runs registered transformers over every class before it is defined.
#[derive(Default)]
pub struct ClassTransformService {
    transformers: RwLock<Vec<Registered>>,
    transformations: Mutex<HashMap<String, Vec<Transformation>>>,
}

impl ClassTransformService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower priorities run first; equal priorities keep registration order.
    pub fn register(&self, priority: i32, transformer: Arc<dyn ClassTransformer>) -> Result<()> {
        let mut transformers = self
            .transformers
            .write()
            .map_err(|_| WeftError::Internal("Transformer list lock poisoned".into()))?;
        let position = transformers.partition_point(|r| r.priority <= priority);
        transformers.insert(
            position,
            Registered {
                priority,
                transformer,
            },
        );
        Ok(())
    }

    /// Queues a change for one class, applied the first time that class is
    /// transformed and then dropped.
    pub fn add_class_transformation(
        &self,
        class_name: impl Into<String>,
        transformation: impl FnOnce(&mut ClassNode) + Send + 'static,
    ) -> Result<()> {
        self.transformations
            .lock()
            .map_err(|_| WeftError::Internal("Class transformation lock poisoned".into()))?
            .entry(class_name.into())
            .or_default()
            .push(Box::new(transformation));
        Ok(())
    }

    pub fn pending_transformations(&self, class_name: &str) -> usize {
        self.transformations
            .lock()
            .map(|t| t.get(class_name).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Returns whether anything touched the class.
    pub fn transform(&self, class: &mut ClassNode) -> Result<bool> {
        let mut modified = false;

        let one_shot = self
            .transformations
            .lock()
            .map_err(|_| WeftError::Internal("Class transformation lock poisoned".into()))?
            .remove(&class.name)
            .unwrap_or_default();
        for transformation in one_shot {
            transformation(class);
            modified = true;
        }

        let transformers: Vec<Arc<dyn ClassTransformer>> = self
            .transformers
            .read()
            .map_err(|_| WeftError::Internal("Transformer list lock poisoned".into()))?
            .iter()
            .map(|r| r.transformer.clone())
            .collect();
        for transformer in transformers {
            let mut ctx = TransformContext::new(class);
            transformer.transform(&mut ctx)?;
            modified |= ctx.is_modified();
        }

        if modified {
            tracing::debug!(class = %class.name, "Transformed class");
        }
        Ok(modified)
    }
}
