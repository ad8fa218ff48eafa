pub mod callback;
pub mod component;
pub mod error;
pub mod evaluator;
pub mod ids;
pub mod message;
pub mod model;
pub mod record;
pub mod settings;
pub mod value;

pub use callback::SendCallback;
pub use component::{ComponentContext, ComponentRuntime};
pub use error::ComponentError;
pub use evaluator::{Evaluation, ExpressionEvaluator, IdentityEvaluator};
pub use ids::{AttributeId, EntityId, StepId};
pub use message::{Message, MessageHeader, MessageKind, Payload};
pub use model::{Model, ModelAttribute, ModelDocument, ModelEntity};
pub use record::EntityRecord;
pub use settings::{AttributeSetting, Settings};
pub use value::Value;
