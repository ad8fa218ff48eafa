pub mod policy;
pub mod resilient_component;

pub use policy::ErrorPolicy;
pub use resilient_component::ResilientComponent;
