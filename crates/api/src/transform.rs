use crate::error::ApiResult;
use crate::models::ClassNode;

/// Handed to transformers while a class is being defined.
pub struct TransformContext<'a> {
    class: &'a mut ClassNode,
    modified: bool,
}

impl<'a> TransformContext<'a> {
    pub fn new(class: &'a mut ClassNode) -> Self {
        Self {
            class,
            modified: false,
        }
    }

    pub fn class(&self) -> &ClassNode {
        self.class
    }

    /// Mutable access; marks the class as modified.
    pub fn class_mut(&mut self) -> &mut ClassNode {
        self.modified = true;
        self.class
    }

    pub fn name(&self) -> &str {
        &self.class.name
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }
}

/// A hook into the class loading pipeline, run before a class is defined.
pub trait ClassTransformer: Send + Sync {
    fn transform(&self, ctx: &mut TransformContext<'_>) -> ApiResult<()>;
}
