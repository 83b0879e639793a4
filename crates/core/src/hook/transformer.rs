use super::descriptor::{DescriptorKey, HookDescriptor};
use super::resolver::HookResolvers;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};
use weft_api::models::{ClassNode, DiscoveryRecord, Insn, MethodNode};
use weft_api::{
    ApiError, ApiResult, ClassTransformer, ExecutionTime, HookCall, ServiceHandler,
    TransformContext,
};

/// Injector key the hook transformer is bound under.
pub const HOOK_TRANSFORMER_CLASS: &str = "weft.hook.HookTransformer";

/// Collects `@Hook` declarations as a service handler and splices their
/// trampoline calls as a class transformer.
///
/// A descriptor is applied at most once per target class. Non-public target
/// classes and methods are widened to public when spliced.
pub struct HookTransformer {
    resolvers: HookResolvers,
    descriptors: RwLock<Vec<Arc<HookDescriptor>>>,
    applied: Mutex<HashSet<(DescriptorKey, String)>>,
}

/// A resolved splice location inside the class being transformed.
struct Target {
    method_name: String,
    parameters: Vec<String>,
}

impl HookTransformer {
    pub fn new(resolvers: HookResolvers) -> Self {
        Self {
            resolvers,
            descriptors: RwLock::new(Vec::new()),
            applied: Mutex::new(HashSet::new()),
        }
    }

    pub fn descriptors(&self) -> Vec<Arc<HookDescriptor>> {
        self.descriptors
            .read()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    pub fn is_applied(&self, key: &DescriptorKey, class_name: &str) -> bool {
        self.applied
            .lock()
            .map(|applied| applied.contains(&(key.clone(), class_name.to_string())))
            .unwrap_or(false)
    }

    fn selects(&self, descriptor: &HookDescriptor, class: &ClassNode) -> bool {
        if descriptor.hook.uses_filters() {
            return descriptor.filters.iter().any(|filter| {
                match self.resolvers.class.resolve(&filter.type_name) {
                    Some(resolved) => filter.test(class, &resolved),
                    None => {
                        tracing::debug!(
                            callback = %descriptor.callback,
                            type_name = %filter.type_name,
                            "Unresolvable @HookFilter type"
                        );
                        false
                    }
                }
            });
        }

        match self.resolvers.class.resolve(&descriptor.hook.class_name) {
            Some(resolved) => resolved == class.name,
            None => {
                tracing::debug!(
                    callback = %descriptor.callback,
                    class_name = %descriptor.hook.class_name,
                    "Unresolvable hook target class"
                );
                false
            }
        }
    }

    fn locate(&self, descriptor: &HookDescriptor, class: &ClassNode) -> Option<Target> {
        let hook = &descriptor.hook;
        let parameters: Option<Vec<String>> = hook
            .parameters
            .iter()
            .map(|p| self.resolvers.parameter.resolve(p))
            .collect();
        let Some(parameters) = parameters else {
            tracing::debug!(
                callback = %descriptor.callback,
                parameters = ?hook.parameters,
                "Unresolvable hook parameter type"
            );
            return None;
        };

        let owner = if hook.uses_filters() {
            self.resolvers.class.unresolve(&class.name)
        } else {
            hook.class_name.clone()
        };
        let method_name = self
            .resolvers
            .method
            .resolve(&owner, &hook.method_name, &hook.parameters)?;

        if class.declared_method(&method_name, &parameters).is_none() {
            tracing::debug!(
                class = %class.name,
                method = %method_name,
                parameters = ?parameters,
                callback = %descriptor.callback,
                "Hook target method not found, skipping"
            );
            return None;
        }

        Some(Target {
            method_name,
            parameters,
        })
    }

    fn splice(&self, descriptor: &HookDescriptor, target: &Target, class: &mut ClassNode) -> ApiResult<()> {
        let class_name = class.name.clone();
        if class.make_public() {
            tracing::debug!(class = %class_name, "Widened hook target class to public");
        }

        let method = class
            .declared_method_mut(&target.method_name, &target.parameters)
            .ok_or_else(|| ApiError::NotFound(format!("{class_name}#{}", target.method_name)))?;
        if method.make_public() {
            tracing::debug!(class = %class_name, method = %method.name, "Widened hook target method to public");
        }

        let location = format!("{class_name}#{}", method.name);
        for time in descriptor.times() {
            let call = HookCall {
                target: location.clone(),
                time,
                callback: descriptor.callback.clone(),
            };
            if insert_call(method, call) {
                tracing::info!(
                    target_method = %location,
                    callback = %descriptor.callback,
                    time = %time,
                    "Spliced hook"
                );
            }
        }
        Ok(())
    }
}

/// BEFORE calls go after previously spliced BEFORE calls at entry, AFTER calls
/// directly before every return. Returns false if the call is already present.
fn insert_call(method: &mut MethodNode, call: HookCall) -> bool {
    let present = method.body.iter().any(
        |insn| matches!(insn, Insn::Hook(existing) if existing.callback == call.callback && existing.time == call.time),
    );
    if present {
        return false;
    }

    match call.time {
        ExecutionTime::Before => {
            let position = method
                .body
                .iter()
                .take_while(|insn| matches!(insn, Insn::Hook(c) if c.time == ExecutionTime::Before))
                .count();
            method.body.insert(position, Insn::Hook(call));
        }
        ExecutionTime::After => {
            let mut body = Vec::with_capacity(method.body.len() + method.return_points());
            for insn in method.body.drain(..) {
                if insn.is_return() {
                    body.push(Insn::Hook(call.clone()));
                }
                body.push(insn);
            }
            method.body = body;
        }
    }
    true
}

impl ServiceHandler for HookTransformer {
    fn discover(&self, record: &DiscoveryRecord) -> ApiResult<()> {
        let descriptor = HookDescriptor::from_record(record)?;
        let key = descriptor.key();

        let mut descriptors = self
            .descriptors
            .write()
            .map_err(|_| ApiError::Internal("Hook descriptor lock poisoned".into()))?;
        if descriptors.iter().any(|d| d.key() == key) {
            tracing::debug!(callback = %descriptor.callback, "Hook already known");
            return Ok(());
        }
        tracing::debug!(
            callback = %descriptor.callback,
            class_name = %descriptor.hook.class_name,
            method_name = %descriptor.hook.method_name,
            "Discovered hook"
        );
        descriptors.push(Arc::new(descriptor));
        Ok(())
    }
}

impl ClassTransformer for HookTransformer {
    fn transform(&self, ctx: &mut TransformContext<'_>) -> ApiResult<()> {
        for descriptor in self.descriptors() {
            let applied_key = (descriptor.key(), ctx.name().to_string());
            let already_applied = self
                .applied
                .lock()
                .map_err(|_| ApiError::Internal("Applied hook lock poisoned".into()))?
                .contains(&applied_key);
            if already_applied || !self.selects(&descriptor, ctx.class()) {
                continue;
            }

            let Some(target) = self.locate(&descriptor, ctx.class()) else {
                continue;
            };
            self.splice(&descriptor, &target, ctx.class_mut())?;

            self.applied
                .lock()
                .map_err(|_| ApiError::Internal("Applied hook lock poisoned".into()))?
                .insert(applied_key);
        }
        Ok(())
    }
}
