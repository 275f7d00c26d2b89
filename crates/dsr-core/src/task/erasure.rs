//! Tarea de borrado de un nodo: enmascara los campos cubiertos por reglas de
//! erasure en las filas encontradas durante el acceso y las actualiza por
//! clave primaria.

use std::sync::Arc;
use std::time::Duration;

use dsr_masking::{MaskingError, MaskingStrategy, MaskingStrategyRegistry};
use log::{debug, warn};
use rayon::prelude::*;
use tokio::sync::mpsc::UnboundedSender;

use super::{with_retry, TaskResources};
use crate::config::RetryPolicy;
use crate::errors::TaskError;
use crate::execution_log::NodeEvent;
use crate::graph::{Field, GraphNode};
use crate::policy::{ActionType, Policy, Rule};
use crate::repo::AccessLevel;
use crate::traversal::{NodeStatus, Row};

pub const NO_PRIMARY_KEYS_MESSAGE: &str = "No values were erased since no primary keys were defined for this collection";
pub const READ_ONLY_MESSAGE: &str = "Connection has read-only access; no values were erased";

/// Regla de borrado con su estrategia ya instanciada.
#[derive(Debug, Clone)]
pub struct ErasureRule {
    pub rule: Rule,
    pub strategy: Arc<dyn MaskingStrategy>,
}

pub fn build_erasure_rules(policy: &Policy, registry: &MaskingStrategyRegistry) -> Result<Vec<ErasureRule>, MaskingError> {
    policy.rules_for(ActionType::Erasure)
          .filter_map(|rule| rule.masking_strategy.as_ref().map(|spec| (rule, spec)))
          .map(|(rule, spec)| {
              Ok(ErasureRule { rule: rule.clone(),
                               strategy: registry.get_strategy(&spec.strategy, &spec.configuration)? })
          })
          .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErasureOutcome {
    /// Filas actualizadas, con mensaje opcional para el log.
    Masked { rows: usize, message: Option<String> },
    /// El nodo no se toca (conexión de sólo lectura).
    Skipped(String),
}

/// Campos a enmascarar y la estrategia de cada uno. Las claves primarias no
/// se enmascaran.
fn targeted_fields<'a>(node: &'a GraphNode, rules: &[ErasureRule]) -> Vec<(&'a Field, Arc<dyn MaskingStrategy>)> {
    node.collection
        .fields
        .iter()
        .filter(|f| !f.primary_key)
        .filter_map(|f| rules.iter().find(|r| r.rule.applies_to(f)).map(|r| (f, r.strategy.clone())))
        .filter(|(f, strategy)| {
            let supported = strategy.data_type_supported(f.data_type.as_deref());
            if !supported {
                warn!("{}: strategy {} does not support data type {:?} of field {}",
                      node.address,
                      strategy.name(),
                      f.data_type,
                      f.name);
            }
            supported
        })
        .collect()
}

/// Calcula `(filtros por clave primaria, valores enmascarados)` por fila.
/// Un valor cuyo tipo la estrategia no admite se omite sin fallar el nodo.
fn mask_rows(node: &GraphNode,
             rows: &[Row],
             fields: &[(&Field, Arc<dyn MaskingStrategy>)],
             resources: &TaskResources)
             -> Result<Vec<(Row, Row)>, MaskingError> {
    let primary_keys: Vec<&str> = node.collection.primary_keys().map(|f| f.name.as_str()).collect();
    let request_id = resources.privacy_request_id.as_str();
    let secrets = resources.secrets();
    let updates: Vec<Option<(Row, Row)>> =
        rows.par_iter()
            .map(|row| -> Result<Option<(Row, Row)>, MaskingError> {
                let mut values = Row::new();
                for (field, strategy) in fields {
                    let Some(v) = row.get(&field.name) else { continue };
                    match strategy.mask(v, request_id, secrets) {
                        Ok(masked) => {
                            values.insert(field.name.clone(), masked);
                        }
                        // el valor se deja intacto; el resto de la fila sigue
                        Err(MaskingError::UnsupportedValue { value_type, .. }) => {
                            warn!("{}: {} left unmasked, {} cannot mask a {value_type}",
                                  node.address,
                                  field.name,
                                  strategy.name());
                        }
                        Err(e) => return Err(e),
                    }
                }
                if values.is_empty() {
                    return Ok(None);
                }
                let filters: Row = primary_keys.iter()
                                               .filter_map(|pk| row.get(*pk).map(|v| (pk.to_string(), v.clone())))
                                               .collect();
                Ok((filters.len() == primary_keys.len()).then_some((filters, values)))
            })
            .collect::<Result<_, MaskingError>>()?;
    Ok(updates.into_iter().flatten().collect())
}

pub async fn run_erasure_node(node: Arc<GraphNode>,
                              resources: Arc<TaskResources>,
                              rules: &[ErasureRule],
                              retry: &RetryPolicy,
                              timeout: Duration,
                              events: &UnboundedSender<NodeEvent>)
                              -> Result<ErasureOutcome, TaskError> {
    let read_only = resources.connection_config(&node.connection_key)
                             .is_some_and(|c| c.access == AccessLevel::Read);
    if read_only {
        return Ok(ErasureOutcome::Skipped(READ_ONLY_MESSAGE.to_string()));
    }
    if node.collection.primary_keys().next().is_none() {
        return Ok(ErasureOutcome::Masked { rows: 0,
                                           message: Some(NO_PRIMARY_KEYS_MESSAGE.to_string()) });
    }
    let fields = targeted_fields(&node, rules);
    let rows = resources.rows(&node.address).unwrap_or_default();
    if fields.is_empty() || rows.is_empty() {
        return Ok(ErasureOutcome::Masked { rows: 0, message: None });
    }

    let updates = mask_rows(&node, &rows, &fields, &resources)?;
    let connector = resources.connector(&node.connection_key)?;
    let mut total = 0;
    for (filters, values) in &updates {
        total += with_retry(retry,
                            timeout,
                            || connector.update(&node, filters, values),
                            |attempt, err| {
                                let event = NodeEvent::new(node.address.clone(), ActionType::Erasure, NodeStatus::Retrying)
                                    .with_message(format!("attempt {attempt} failed: {err}"));
                                let _ = events.send(event);
                            })
                 .await?;
    }
    debug!("{}: {} rows masked", node.address, total);
    Ok(ErasureOutcome::Masked { rows: total, message: None })
}
