pub mod annotation;
pub mod class;
pub mod identifier;
pub mod naming;
pub mod record;

pub use annotation::*;
pub use class::*;
pub use identifier::*;
pub use record::*;
