//! Planificación y avance del recorrido.
//!
//! Un nodo está listo cuando todos sus productores completaron. Un nodo sin
//! productores está listo desde el inicio salvo que declare campos de
//! identidad y ninguno venga sembrado: ese nodo queda varado.
//!
//! Antes de ejecutar nada se simula el recorrido completo (Kahn) y cualquier
//! nodo que nunca llegaría a estar listo produce `TraversalError::Unreachable`.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use log::debug;
use serde_json::Value;

use super::query::collect_values;
use super::{NodeStatus, Row, TraversalNode};
use crate::errors::TraversalError;
use crate::graph::{CollectionAddress, DatasetGraph};

/// Valores de identidad conocidos: identity key -> valor (escalar o array).
pub type IdentitySeed = BTreeMap<String, Value>;

#[derive(Debug)]
pub struct Traversal {
    graph: Arc<DatasetGraph>,
    nodes: BTreeMap<CollectionAddress, TraversalNode>,
    ready: BTreeSet<CollectionAddress>,
    completion_order: Vec<CollectionAddress>,
}

impl Traversal {
    pub fn new(graph: Arc<DatasetGraph>, seed: &IdentitySeed) -> Result<Self, TraversalError> {
        let mut nodes = BTreeMap::new();
        for node in graph.nodes() {
            let producers: BTreeSet<CollectionAddress> = graph.inbound_edges(&node.address)
                                                              .iter()
                                                              .map(|e| e.from.collection_address())
                                                              .filter(|p| p != &node.address)
                                                              .collect();
            nodes.insert(node.address.clone(), TraversalNode::new(node.clone(), producers));
        }

        for (field, key) in graph.identity_keys() {
            let values = match seed.get(key) {
                Some(Value::Array(items)) => items.iter().filter(|v| !v.is_null()).cloned().collect(),
                Some(Value::Null) | None => vec![],
                Some(v) => vec![v.clone()],
            };
            if values.is_empty() {
                continue;
            }
            if let Some(tn) = nodes.get_mut(&field.collection_address()) {
                tn.add_inputs(&field.field, values);
            }
        }

        let mut ready = BTreeSet::new();
        for (address, tn) in nodes.iter_mut() {
            if tn.unresolved.is_empty() && root_is_seeded(tn) {
                tn.status = NodeStatus::Ready;
                ready.insert(address.clone());
            }
        }

        let traversal = Self { graph,
                               nodes,
                               ready,
                               completion_order: Vec::new() };
        let stranded = traversal.stranded();
        if !stranded.is_empty() {
            return Err(TraversalError::Unreachable { nodes: stranded });
        }
        Ok(traversal)
    }

    pub fn graph(&self) -> &Arc<DatasetGraph> {
        &self.graph
    }

    /// Nodos que nunca alcanzarían `Ready` aunque todo complete.
    fn stranded(&self) -> Vec<CollectionAddress> {
        let mut unresolved: BTreeMap<CollectionAddress, BTreeSet<CollectionAddress>> =
            self.nodes.iter().map(|(a, tn)| (a.clone(), tn.unresolved.clone())).collect();
        let mut reached: BTreeSet<CollectionAddress> = self.ready.clone();
        let mut queue: VecDeque<CollectionAddress> = self.ready.iter().cloned().collect();
        while let Some(addr) = queue.pop_front() {
            for edge in self.graph.outbound_edges(&addr) {
                let target = edge.to.collection_address();
                let Some(pending) = unresolved.get_mut(&target) else { continue };
                pending.remove(&addr);
                if pending.is_empty() && reached.insert(target.clone()) {
                    queue.push_back(target);
                }
            }
        }
        self.nodes.keys().filter(|a| !reached.contains(*a)).cloned().collect()
    }

    pub fn node(&self, address: &CollectionAddress) -> Option<&TraversalNode> {
        self.nodes.get(address)
    }

    pub fn status(&self, address: &CollectionAddress) -> Option<NodeStatus> {
        self.nodes.get(address).map(|n| n.status)
    }

    pub fn statuses(&self) -> BTreeMap<CollectionAddress, NodeStatus> {
        self.nodes.iter().map(|(a, n)| (a.clone(), n.status)).collect()
    }

    pub fn completion_order(&self) -> &[CollectionAddress] {
        &self.completion_order
    }

    pub fn has_ready(&self) -> bool {
        !self.ready.is_empty()
    }

    /// Extrae hasta `limit` nodos listos y los marca `Running`.
    pub fn take_ready(&mut self, limit: usize) -> Vec<TraversalNode> {
        let picked: Vec<CollectionAddress> = self.ready.iter().take(limit).cloned().collect();
        picked.into_iter().filter_map(|a| self.start(&a)).collect()
    }

    pub fn pop_ready(&mut self) -> Option<TraversalNode> {
        let first = self.ready.iter().next().cloned()?;
        self.start(&first)
    }

    fn start(&mut self, address: &CollectionAddress) -> Option<TraversalNode> {
        self.ready.remove(address);
        let tn = self.nodes.get_mut(address)?;
        tn.status = NodeStatus::Running;
        Some(tn.clone())
    }

    /// Registra las filas de `address`, propaga sus valores por las aristas
    /// salientes y devuelve los nodos que pasan a `Ready`.
    pub fn complete(&mut self, address: &CollectionAddress, rows: &[Row]) -> Vec<CollectionAddress> {
        match self.nodes.get_mut(address) {
            Some(tn) if !tn.status.is_terminal() => tn.status = NodeStatus::Complete,
            _ => return vec![],
        }
        self.ready.remove(address);
        self.completion_order.push(address.clone());

        let mut newly_ready = Vec::new();
        for edge in self.graph.outbound_edges(address) {
            let target = edge.to.collection_address();
            if &target == address {
                continue;
            }
            let values = collect_values(rows, &edge.from.field);
            let Some(tn) = self.nodes.get_mut(&target) else { continue };
            if tn.status != NodeStatus::Pending {
                continue;
            }
            tn.add_inputs(&edge.to.field, values);
            tn.unresolved.remove(address);
            if tn.unresolved.is_empty() {
                tn.status = NodeStatus::Ready;
                self.ready.insert(target.clone());
                newly_ready.push(target);
            }
        }
        debug!("node {} complete, {} newly ready", address, newly_ready.len());
        newly_ready
    }

    /// Marca `address` en error y omite sus descendientes transitivos.
    pub fn mark_error(&mut self, address: &CollectionAddress) -> Vec<CollectionAddress> {
        self.set_status(address, NodeStatus::Error);
        self.skip_descendants(address)
    }

    pub fn mark_paused(&mut self, address: &CollectionAddress) {
        self.set_status(address, NodeStatus::Paused);
    }

    /// Sólo afecta a nodos en ejecución.
    pub fn mark_retrying(&mut self, address: &CollectionAddress) {
        if self.status(address) == Some(NodeStatus::Running) {
            self.set_status(address, NodeStatus::Retrying);
        }
    }

    fn set_status(&mut self, address: &CollectionAddress, status: NodeStatus) {
        self.ready.remove(address);
        if let Some(tn) = self.nodes.get_mut(address) {
            tn.status = status;
        }
    }

    fn skip_descendants(&mut self, address: &CollectionAddress) -> Vec<CollectionAddress> {
        let mut skipped = Vec::new();
        let mut queue = VecDeque::from([address.clone()]);
        while let Some(current) = queue.pop_front() {
            let targets: Vec<CollectionAddress> = self.graph
                                                      .outbound_edges(&current)
                                                      .iter()
                                                      .map(|e| e.to.collection_address())
                                                      .collect();
            for target in targets {
                let Some(tn) = self.nodes.get_mut(&target) else { continue };
                if matches!(tn.status, NodeStatus::Pending | NodeStatus::Ready) {
                    tn.status = NodeStatus::Skipped;
                    self.ready.remove(&target);
                    skipped.push(target.clone());
                    queue.push_back(target);
                }
            }
        }
        skipped
    }

    /// Omite todo nodo que aún no empezó.
    pub fn skip_remaining(&mut self) -> Vec<CollectionAddress> {
        self.ready.clear();
        let mut skipped = Vec::new();
        for (address, tn) in self.nodes.iter_mut() {
            if matches!(tn.status, NodeStatus::Pending | NodeStatus::Ready) {
                tn.status = NodeStatus::Skipped;
                skipped.push(address.clone());
            }
        }
        skipped
    }

    /// Todos los nodos en estado terminal.
    pub fn is_finished(&self) -> bool {
        self.nodes.values().all(|n| n.status.is_terminal())
    }

    pub fn nodes_with_status(&self, status: NodeStatus) -> Vec<CollectionAddress> {
        self.nodes.iter().filter(|(_, n)| n.status == status).map(|(a, _)| a.clone()).collect()
    }

    /// Recorrido síncrono: ejecuta `on_ready` en orden de dependencias hasta
    /// agotar los nodos listos. El primer error corta el recorrido.
    pub fn run<F, E>(&mut self, mut on_ready: F) -> Result<Vec<CollectionAddress>, E>
        where F: FnMut(&TraversalNode) -> Result<Vec<Row>, E>
    {
        while let Some(tn) = self.pop_ready() {
            let rows = on_ready(&tn)?;
            self.complete(tn.address(), &rows);
        }
        Ok(self.completion_order.clone())
    }
}

fn root_is_seeded(tn: &TraversalNode) -> bool {
    let mut identity = tn.node.collection.identity_fields().map(|(f, _)| f).peekable();
    identity.peek().is_none() || identity.any(|f| tn.inputs.get(&f.name).is_some_and(|v| !v.is_empty()))
}

/// Construye el recorrido para `graph` y lo ejecuta con `on_ready`.
pub fn traverse<F, E>(graph: Arc<DatasetGraph>, seed: &IdentitySeed, on_ready: F) -> Result<Vec<CollectionAddress>, E>
    where F: FnMut(&TraversalNode) -> Result<Vec<Row>, E>,
          E: From<TraversalError>
{
    let mut traversal = Traversal::new(graph, seed)?;
    traversal.run(on_ready)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Collection, Dataset, Field, FieldReference};
    use serde_json::json;

    fn users_orders() -> Arc<DatasetGraph> {
        let ds = vec![Dataset::new("a",
                                   "conn_a",
                                   vec![Collection::new("users",
                                                        vec![Field::new("user_id").identity("user_id"),
                                                             Field::new("email")])]),
                      Dataset::new("b",
                                   "conn_b",
                                   vec![Collection::new("orders",
                                                        vec![Field::new("id"),
                                                             Field::new("user_id").references(FieldReference::new("a", "users", "user_id"))]),
                                        Collection::new("items",
                                                        vec![Field::new("order_id").references(FieldReference::new("b", "orders", "id"))])])];
        Arc::new(DatasetGraph::build(&ds).expect("graph"))
    }

    fn seed() -> IdentitySeed {
        IdentitySeed::from([("user_id".to_string(), json!("u1"))])
    }

    fn row(v: serde_json::Value) -> Row {
        v.as_object().cloned().expect("object")
    }

    #[test]
    fn seeded_node_ready_and_dependents_wait() {
        let users = CollectionAddress::new("a", "users");
        let orders = CollectionAddress::new("b", "orders");
        let mut t = Traversal::new(users_orders(), &seed()).expect("traversal");
        assert_eq!(t.status(&users), Some(NodeStatus::Ready));
        assert_eq!(t.status(&orders), Some(NodeStatus::Pending));

        let first = t.pop_ready().expect("ready");
        assert_eq!(first.address(), &users);
        assert_eq!(first.inputs.get("user_id"), Some(&vec![json!("u1")]));
        assert!(t.pop_ready().is_none());

        let newly = t.complete(&users, &[row(json!({"user_id": "u1", "email": "x@y"}))]);
        assert_eq!(newly, vec![orders.clone()]);
        let next = t.pop_ready().expect("orders");
        assert_eq!(next.plan().filters.get("user_id"), Some(&vec![json!("u1")]));
    }

    #[test]
    fn retrying_applies_only_while_running() {
        let users = CollectionAddress::new("a", "users");
        let orders = CollectionAddress::new("b", "orders");
        let mut t = Traversal::new(users_orders(), &seed()).expect("traversal");
        t.mark_retrying(&orders);
        assert_eq!(t.status(&orders), Some(NodeStatus::Pending));

        t.pop_ready().expect("users");
        t.mark_retrying(&users);
        assert_eq!(t.status(&users), Some(NodeStatus::Retrying));
        assert_eq!(t.complete(&users, &[row(json!({"user_id": "u1"}))]), vec![orders]);
        assert_eq!(t.status(&users), Some(NodeStatus::Complete));
        t.mark_retrying(&users);
        assert_eq!(t.status(&users), Some(NodeStatus::Complete));
    }

    #[test]
    fn missing_seed_is_unreachable() {
        let err = Traversal::new(users_orders(), &IdentitySeed::new()).unwrap_err();
        match err {
            TraversalError::Unreachable { nodes } => assert_eq!(nodes.len(), 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cycle_is_unreachable() {
        let ds = vec![Dataset::new("d",
                                   "c",
                                   vec![Collection::new("root", vec![Field::new("id").identity("email")]),
                                        Collection::new("x",
                                                        vec![Field::new("id").references(FieldReference::new("d", "y", "id"))]),
                                        Collection::new("y",
                                                        vec![Field::new("id").references(FieldReference::new("d", "x", "id"))])])];
        let graph = Arc::new(DatasetGraph::build(&ds).expect("graph"));
        let seed = IdentitySeed::from([("email".to_string(), json!("e"))]);
        let mut calls = 0;
        let res: Result<_, TraversalError> = traverse(graph, &seed, |_| {
            calls += 1;
            Ok(vec![])
        });
        assert_eq!(res.unwrap_err(),
                   TraversalError::Unreachable { nodes: vec![CollectionAddress::new("d", "x"), CollectionAddress::new("d", "y")] });
        assert_eq!(calls, 0);
    }

    #[test]
    fn traverse_respects_dependencies() {
        let order: Result<_, TraversalError> =
            traverse(users_orders(), &seed(), |_| Ok(vec![row(json!({"user_id": "u1", "id": 7, "order_id": 7}))]));
        let order = order.expect("order");
        assert_eq!(order,
                   vec![CollectionAddress::new("a", "users"),
                        CollectionAddress::new("b", "orders"),
                        CollectionAddress::new("b", "items")]);
    }

    #[test]
    fn error_skips_descendants_only() {
        let mut t = Traversal::new(users_orders(), &seed()).expect("traversal");
        let users = t.pop_ready().expect("users");
        t.complete(users.address(), &[row(json!({"user_id": "u1"}))]);
        let orders = t.pop_ready().expect("orders");
        let skipped = t.mark_error(orders.address());
        assert_eq!(skipped, vec![CollectionAddress::new("b", "items")]);
        assert!(t.is_finished());
        assert_eq!(t.nodes_with_status(NodeStatus::Complete), vec![CollectionAddress::new("a", "users")]);
    }

    #[test]
    fn empty_upstream_yields_empty_plan() {
        let mut t = Traversal::new(users_orders(), &seed()).expect("traversal");
        let users = t.pop_ready().expect("users");
        t.complete(users.address(), &[]);
        let orders = t.pop_ready().expect("orders");
        assert!(orders.plan().is_empty());
    }
}
