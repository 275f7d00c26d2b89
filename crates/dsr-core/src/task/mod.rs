//! Ejecución de la tarea de cada nodo: lectura (access) y enmascaramiento
//! (erasure) contra el connector del nodo, con reintentos acotados.

pub mod access;
pub mod connector;
pub mod erasure;
pub mod resources;
pub mod retry;

pub use access::{filter_access_results, run_access_node, AccessRun};
pub use connector::{Connector, ConnectorFactory};
pub use erasure::{build_erasure_rules, run_erasure_node, ErasureOutcome, ErasureRule};
pub use resources::TaskResources;
pub use retry::with_retry;
