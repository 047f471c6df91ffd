// Store layer: everything that talks to the graph store.
//
// The pipeline only sees the ThemeStore trait. SparqlThemeStore speaks the
// canonical schema to a SPARQL endpoint through a StoreGateway (normally
// SparqlClient); MemoryStore keeps everything in process.

pub mod error;
pub mod graph;
pub mod ids;
pub mod memory;
pub mod queries;
pub mod results;
pub mod sparql;
pub mod traits;

pub use error::{RowError, StoreError};
pub use graph::SparqlThemeStore;
pub use memory::MemoryStore;
pub use traits::{IdGenerator, StoreGateway, StoreStats, ThemeStore};
