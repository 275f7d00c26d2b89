//! Grafo de datasets: nodos (colecciones) y aristas derivadas de las
//! referencias entre campos de todos los datasets incluidos.

mod address;
mod cache;
mod dataset;
mod dataset_graph;

pub use address::{CollectionAddress, FieldAddress};
pub use cache::DatasetGraphCache;
pub use dataset::{Collection, Dataset, Field, FieldReference, ReferenceDirection};
pub use dataset_graph::{DatasetGraph, Edge, GraphNode};
