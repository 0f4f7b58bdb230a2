pub mod draft;
pub mod entity;
pub mod operation;

pub use draft::Draft;
pub use entity::{AttributeMap, AttributeValue, Entity};
pub use operation::OperationType;
