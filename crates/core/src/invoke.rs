use std::collections::HashMap;
use std::sync::Arc;
use weft_api::models::MethodNode;
use weft_api::{ApiError, ApiResult, Injector, Instance, Key};

/// Calls methods whose parameters are filled from a set of supplied values,
/// with the injector covering everything not supplied.
pub struct InvocationHelper {
    injector: Arc<dyn Injector>,
}

impl InvocationHelper {
    pub fn new(injector: Arc<dyn Injector>) -> Self {
        Self { injector }
    }

    pub fn arguments(&self, method: &MethodNode, available: &HashMap<Key, Instance>) -> ApiResult<Vec<Instance>> {
        method
            .parameters
            .iter()
            .map(|parameter| {
                let key = parameter.key();
                match available.get(&key) {
                    Some(value) => Ok(value.clone()),
                    None => self.injector.get_instance(&key),
                }
            })
            .collect()
    }

    pub fn invoke(
        &self,
        method: &MethodNode,
        target: &Instance,
        available: &HashMap<Key, Instance>,
    ) -> ApiResult<Option<Instance>> {
        let invoker = method
            .invoker
            .as_ref()
            .ok_or_else(|| ApiError::Internal(format!("method {} has no invoker", method.name)))?;
        let arguments = self.arguments(method, available)?;
        invoker(target, &arguments)
    }
}
