pub mod api;
pub mod entity;
pub mod error;
pub mod ids;
pub mod polymorphic;
pub mod value;
pub mod vertical;

pub use api::*;
pub use entity::*;
pub use error::{KnowledgeError, KnowledgeResult};
pub use ids::*;
pub use polymorphic::*;
pub use value::*;
pub use vertical::*;
