pub mod definition;
pub mod pool;
pub mod runtime;
pub mod sink;
pub mod state;
pub mod unit_of_work;

pub use definition::{FlowDefinition, FlowLink, FlowStep, RuntimeConfig};
pub use pool::{FlowInput, FlowOutput, FlowPool};
pub use runtime::FlowRuntime;
pub use sink::StepSink;
pub use state::FlowState;
pub use unit_of_work::UnitOfWorkTracker;
