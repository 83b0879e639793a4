use weft_api::hook::HOOK_FILTER;
use weft_api::models::{DiscoveryRecord, MethodIdentifier};
use weft_api::{ApiError, ApiResult, ExecutionTime, Hook, HookFilter};

/// A validated `@Hook` declaration and the callback it sits on.
#[derive(Debug, Clone)]
pub struct HookDescriptor {
    pub hook: Hook,
    pub callback: MethodIdentifier,
    pub filters: Vec<HookFilter>,
}

/// Identity of a descriptor, independent of its filter predicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DescriptorKey {
    pub callback: MethodIdentifier,
    pub class_name: String,
    pub method_name: String,
    pub parameters: Vec<String>,
}

impl HookDescriptor {
    pub fn from_record(record: &DiscoveryRecord) -> ApiResult<Self> {
        let hook = record.annotation_as::<Hook>().ok_or_else(|| {
            ApiError::InvalidDeclaration(format!(
                "{} on {} is not a @Hook",
                record.annotation_type(),
                record.identifier()
            ))
        })?;
        let callback = record.identifier().as_method().ok_or_else(|| {
            ApiError::InvalidDeclaration(format!(
                "@Hook must annotate a method, found on {}",
                record.identifier()
            ))
        })?;

        if hook.method_name.is_empty() {
            return Err(ApiError::InvalidDeclaration(format!(
                "@Hook on {callback} has no method name"
            )));
        }
        if hook.execution_time.is_empty() {
            return Err(ApiError::InvalidDeclaration(format!(
                "@Hook on {callback} has no execution time"
            )));
        }

        let filters: Vec<HookFilter> = record
            .filters_of(&HOOK_FILTER)
            .filter_map(|f| f.downcast_ref::<HookFilter>().cloned())
            .collect();
        if hook.uses_filters() && filters.is_empty() {
            return Err(ApiError::InvalidDeclaration(format!(
                "@Hook on {callback} names no class and carries no @HookFilter"
            )));
        }

        Ok(Self {
            hook: hook.clone(),
            callback: callback.clone(),
            filters,
        })
    }

    pub fn key(&self) -> DescriptorKey {
        DescriptorKey {
            callback: self.callback.clone(),
            class_name: self.hook.class_name.clone(),
            method_name: self.hook.method_name.clone(),
            parameters: self.hook.parameters.clone(),
        }
    }

    /// Requested execution times without repetitions, in declaration order.
    pub fn times(&self) -> Vec<ExecutionTime> {
        let mut times = Vec::with_capacity(self.hook.execution_time.len());
        for time in &self.hook.execution_time {
            if !times.contains(time) {
                times.push(*time);
            }
        }
        times
    }
}
