pub mod classify;
pub mod entity;
pub mod traversal;

mod error;

pub use classify::{QueryType, classify};
pub use entity::{Entity, EntityType, Properties, RelationEdge, SimilarityHit, Subgraph};
pub use error::{Error, Result};
