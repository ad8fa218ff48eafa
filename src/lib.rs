extern crate self as stepflow;

pub mod components;
pub mod core;
pub mod engine;
pub mod observability;
pub mod registry;
pub mod resilience;

#[doc(hidden)]
pub use inventory;
pub use stepflow_macros::Component;
