pub mod config;
pub mod context;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod filter;
pub mod hook;
pub mod inject;
pub mod invoke;
pub mod logging;
pub mod pool;
pub mod service;
pub mod transform;

pub use config::WeftConfig;
pub use context::{Weft, WeftBuilder};
pub use error::{Result, WeftError};
pub use filter::{FilterMapping, FilterValue};
