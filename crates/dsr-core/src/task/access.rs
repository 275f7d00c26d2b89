//! Tarea de lectura de un nodo y filtrado de resultados por regla.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::mpsc::UnboundedSender;

use super::{with_retry, TaskResources};
use crate::config::RetryPolicy;
use crate::errors::TaskError;
use crate::execution_log::NodeEvent;
use crate::graph::{CollectionAddress, DatasetGraph};
use crate::policy::{ActionType, Rule};
use crate::traversal::{NodeStatus, Row, TraversalNode};

/// Resultado de la tarea de lectura de un nodo.
#[derive(Debug)]
pub struct AccessRun {
    pub address: CollectionAddress,
    pub result: Result<Arc<Vec<Row>>, TaskError>,
}

/// Consulta el nodo con los filtros derivados de sus entradas y publica las
/// filas en `resources`. Un plan sin filtros no llega al connector.
pub async fn run_access_node(node: TraversalNode,
                             resources: Arc<TaskResources>,
                             retry: RetryPolicy,
                             timeout: Duration,
                             events: UnboundedSender<NodeEvent>)
                             -> AccessRun {
    let address = node.address().clone();
    let plan = node.plan();
    if plan.is_empty() {
        debug!("{address} has no input values, skipping query");
        let rows = resources.store_rows(address.clone(), vec![]);
        return AccessRun { address, result: Ok(rows) };
    }
    let result = match resources.connector(&node.node.connection_key) {
        Ok(connector) => {
            let graph_node = node.node.as_ref();
            with_retry(&retry,
                       timeout,
                       || connector.query(graph_node, &plan),
                       |attempt, err| {
                           let event = NodeEvent::new(address.clone(), ActionType::Access, NodeStatus::Retrying)
                               .with_message(format!("attempt {attempt} failed: {err}"));
                           let _ = events.send(event);
                       })
            .await
            .map(|rows| resources.store_rows(address.clone(), rows))
            .map_err(TaskError::from)
        }
        Err(e) => Err(TaskError::from(e)),
    };
    AccessRun { address, result }
}

/// Filas visibles para `rule`: sólo campos cuyas categorías cubre la regla.
/// Colecciones sin campos cubiertos no aparecen.
pub fn filter_access_results(graph: &DatasetGraph, resources: &TaskResources, rule: &Rule) -> BTreeMap<CollectionAddress, Vec<Row>> {
    let mut out = BTreeMap::new();
    if rule.action_type != ActionType::Access {
        return out;
    }
    for node in graph.nodes() {
        let allowed: Vec<&str> = node.collection
                                     .fields
                                     .iter()
                                     .filter(|f| rule.applies_to(f))
                                     .map(|f| f.name.as_str())
                                     .collect();
        if allowed.is_empty() {
            continue;
        }
        let Some(rows) = resources.rows(&node.address) else { continue };
        let filtered: Vec<Row> = rows.iter()
                                     .map(|row| {
                                         row.iter()
                                            .filter(|(k, _)| allowed.contains(&k.as_str()))
                                            .map(|(k, v)| (k.clone(), v.clone()))
                                            .collect::<Row>()
                                     })
                                     .filter(|row| !row.is_empty())
                                     .collect();
        out.insert(node.address.clone(), filtered);
    }
    out
}
