//! Motor de recorrido del grafo.
//!
//! Un `Traversal` mantiene, por nodo, los valores de entrada resueltos, los
//! productores aún pendientes y un `NodeStatus`. Lo muta exclusivamente el
//! driver (síncrono en `traverse`/dry-run, asíncrono en el runner).

pub mod checkpoint;
pub mod dry_run;
pub mod engine;
pub mod node;
pub mod query;
pub mod status;

pub use checkpoint::{CompletedNode, TraversalCheckpoint};
pub use dry_run::{dry_run, dry_run_graph, DryRunError};
pub use engine::{traverse, IdentitySeed, Traversal};
pub use node::TraversalNode;
pub use query::{QueryPlan, Row};
pub use status::NodeStatus;
