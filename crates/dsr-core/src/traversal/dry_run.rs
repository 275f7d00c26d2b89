//! Vista previa sin efectos: mismo algoritmo de recorrido, pero `on_ready`
//! sólo renderiza el plan de cada nodo y devuelve una fila marcador para
//! que los dependientes reciban entradas.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use super::{traverse, IdentitySeed, Row};
use crate::constants::DRY_RUN_PLACEHOLDER;
use crate::errors::{TraversalError, ValidationError};
use crate::graph::{CollectionAddress, Dataset, DatasetGraph};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DryRunError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Traversal(#[from] TraversalError),
}

/// CollectionAddress -> texto de consulta para cada nodo alcanzable.
pub fn dry_run(datasets: &[Dataset], seed: &IdentitySeed) -> Result<BTreeMap<CollectionAddress, String>, DryRunError> {
    let graph = Arc::new(DatasetGraph::build(datasets)?);
    dry_run_graph(graph, seed)
}

pub fn dry_run_graph(graph: Arc<DatasetGraph>, seed: &IdentitySeed) -> Result<BTreeMap<CollectionAddress, String>, DryRunError> {
    let mut plans = BTreeMap::new();
    traverse::<_, DryRunError>(graph, seed, |tn| {
        plans.insert(tn.address().clone(), tn.plan().render());
        let placeholder: Row = tn.node
                                 .collection
                                 .fields
                                 .iter()
                                 .map(|f| (f.name.clone(), Value::String(DRY_RUN_PLACEHOLDER.to_string())))
                                 .collect();
        Ok(vec![placeholder])
    })?;
    Ok(plans)
}
