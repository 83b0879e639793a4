//! `@Hook` support: collecting hook declarations, splicing trampoline calls
//! into target methods and running those calls.

pub mod descriptor;
pub mod resolver;
pub mod trampoline;
pub mod transformer;

pub use descriptor::{DescriptorKey, HookDescriptor};
pub use resolver::{
    ClassNameResolver, HookResolvers, IdentityResolver, MappedMethodResolver, MethodNameResolver,
    NameResolver,
};
pub use trampoline::Trampoline;
pub use transformer::{HOOK_TRANSFORMER_CLASS, HookTransformer};
