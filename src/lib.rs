pub mod cache;
pub mod commons;
pub mod errors;
pub mod hierarchy;
pub mod prefetch;
pub mod simulator;
pub mod stats;
pub mod utils;

pub use crate::commons::*;
pub use crate::errors::{ConfigError, SimError, SimResult};
pub use crate::hierarchy::MemoryHierarchy;
