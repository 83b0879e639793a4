//! Runtime side of a spliced hook call.

use super::resolver::{IdentityResolver, NameResolver};
use crate::invoke::InvocationHelper;
use std::collections::HashMap;
use std::sync::Arc;
use weft_api::hook::{ARGS_QUALIFIER, Arguments, EXECUTION_TIME_TYPE, INSTANCE_QUALIFIER};
use weft_api::models::{ClassPool, Insn, MethodNode};
use weft_api::{ApiResult, ExecutionTime, HookCall, Injector, Instance, Key};

/// Dispatches spliced calls to their callbacks.
///
/// A callback parameter is filled by qualifier first: `instance` receives the
/// instrumented object, `args` the captured arguments, `argN` the N-th
/// argument. An unqualified parameter typed as the instrumented class, under
/// its runtime or symbolic name, receives the instrumented object, and one of
/// the execution time type receives the time of the call. Everything else
/// comes from the injector.
pub struct Trampoline {
    injector: Arc<dyn Injector>,
    pool: Arc<dyn ClassPool>,
    invocation: InvocationHelper,
    class_names: Arc<dyn NameResolver>,
}

impl Trampoline {
    pub fn new(injector: Arc<dyn Injector>, pool: Arc<dyn ClassPool>) -> Self {
        Self {
            invocation: InvocationHelper::new(injector.clone()),
            injector,
            pool,
            class_names: Arc::new(IdentityResolver),
        }
    }

    /// Resolver used to recover the symbolic name of an instrumented class.
    pub fn with_class_names(mut self, class_names: Arc<dyn NameResolver>) -> Self {
        self.class_names = class_names;
        self
    }

    /// Never fails: resolution or callback errors are logged and yield `None`.
    pub fn notify(&self, call: &HookCall, instance: &Instance, args: &[Instance]) -> Option<Instance> {
        match self.dispatch(call, instance, args) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    target_method = %call.target,
                    callback = %call.callback,
                    time = %call.time,
                    error = %e,
                    "Hook callback failed"
                );
                None
            }
        }
    }

    fn dispatch(&self, call: &HookCall, instance: &Instance, args: &[Instance]) -> ApiResult<Option<Instance>> {
        let callback = call.callback.locate(self.pool.as_ref())?;
        let handler = self.injector.get_instance(&call.handler_key())?;
        let mut available = available_arguments(&callback, call.time, instance, args);
        if let Some((owner, _)) = call.target.split_once('#') {
            available.insert(Key::new(owner), instance.clone());
            available.insert(Key::new(self.class_names.unresolve(owner)), instance.clone());
        }
        self.invocation.invoke(&callback, &handler, &available)
    }

    /// Runs the spliced calls met when `method` exits through its `exit`-th
    /// return point: the calls at entry, then those directly before that return.
    /// Results are returned in call order.
    pub fn run(
        &self,
        method: &MethodNode,
        instance: &Instance,
        args: &[Instance],
        exit: usize,
    ) -> Vec<(ExecutionTime, Option<Instance>)> {
        let mut results = Vec::new();

        let entry = method
            .body
            .iter()
            .take_while(|insn| matches!(insn, Insn::Hook(c) if c.time == ExecutionTime::Before));
        for insn in entry {
            if let Insn::Hook(call) = insn {
                results.push((call.time, self.notify(call, instance, args)));
            }
        }

        let Some(position) = method
            .body
            .iter()
            .enumerate()
            .filter(|(_, insn)| insn.is_return())
            .nth(exit)
            .map(|(position, _)| position)
        else {
            tracing::debug!(method = %method.name, exit, "No such return point");
            return results;
        };

        let exit_calls: Vec<&HookCall> = method.body[..position]
            .iter()
            .rev()
            .map_while(|insn| match insn {
                Insn::Hook(call) if call.time == ExecutionTime::After => Some(call),
                _ => None,
            })
            .collect();
        for call in exit_calls.into_iter().rev() {
            results.push((call.time, self.notify(call, instance, args)));
        }
        results
    }
}

fn available_arguments(
    callback: &MethodNode,
    time: ExecutionTime,
    instance: &Instance,
    args: &[Instance],
) -> HashMap<Key, Instance> {
    let mut available = HashMap::new();
    for parameter in &callback.parameters {
        let value: Option<Instance> = match parameter.qualifier.as_deref() {
            Some(INSTANCE_QUALIFIER) => Some(instance.clone()),
            Some(ARGS_QUALIFIER) => Some(Arc::new(Arguments(args.to_vec()))),
            Some(qualifier) => qualifier
                .strip_prefix("arg")
                .and_then(|index| index.parse::<usize>().ok())
                .and_then(|index| args.get(index).cloned()),
            None if parameter.type_name == EXECUTION_TIME_TYPE => Some(Arc::new(time)),
            None => None,
        };
        if let Some(value) = value {
            available.insert(parameter.key(), value);
        }
    }
    available
}
