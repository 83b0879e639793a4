pub mod error;
pub mod hook;
pub mod inject;
pub mod models;
pub mod service;
pub mod transform;

// Re-export commonly used types
pub use error::{ApiError, ApiResult};
pub use hook::{ExecutionTime, Hook, HookCall, HookFilter};
pub use inject::{Injector, Instance, Key};
pub use models::*;
pub use service::{HandlerType, Service, ServiceHandler};
pub use transform::{ClassTransformer, TransformContext};
