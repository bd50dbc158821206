#![doc = include_str!("../README.md")]

mod backend;
mod coordinator;
mod error;

pub use backend::CompletionBackend;
pub use coordinator::{BatchHandle, Coordinator, CoordinatorConfig};
pub use error::{GenError, Result};
