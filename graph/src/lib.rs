pub mod memory;
pub mod neo4j;
pub mod resolver;
pub mod store;

pub use memory::MemoryGraphStore;
pub use neo4j::Neo4jHttpStore;
pub use resolver::{NeighborhoodResolver, MAX_RELATED};
pub use store::{GraphStore, RelatedRecord, StoreError};
