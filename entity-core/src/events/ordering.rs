// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Handler ordering
//!
//! Handlers may declare that they run before or after handlers registered
//! under other [`OrderKey`]s. For each event type the resolver turns those
//! constraints into a rank per subscription:
//!
//! - constrained handlers come first, in an order satisfying every
//!   constraint (ties broken by registration order)
//! - unconstrained handlers follow in registration order
//! - constraints naming a key with no registered handler are ignored
//! - cycles are reported as [`EcsError::OrderingCycle`]
//!
//! Results are cached per event type until a new ordered subscription for
//! that type arrives.

use crate::error::{EcsError, EcsResult};
use std::any::TypeId;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

/// Symbolic name that ordering constraints refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderKey(&'static str);

impl OrderKey {
    /// Key named after a type, usually the subscribing system
    pub fn of<S: ?Sized + 'static>() -> Self {
        OrderKey(std::any::type_name::<S>())
    }

    /// Key with an explicit name
    pub const fn named(name: &'static str) -> Self {
        OrderKey(name)
    }

    /// The key's name
    pub fn name(&self) -> &'static str {
        self.0
    }
}

/// Ordering constraints of one subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerOrder {
    key: OrderKey,
    before: Vec<OrderKey>,
    after: Vec<OrderKey>,
}

impl HandlerOrder {
    /// Register under `key` with no constraints yet
    pub fn new(key: OrderKey) -> Self {
        HandlerOrder {
            key,
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Run before every handler registered under `key`
    pub fn before(mut self, key: OrderKey) -> Self {
        self.before.push(key);
        self
    }

    /// Run after every handler registered under `key`
    pub fn after(mut self, key: OrderKey) -> Self {
        self.after.push(key);
        self
    }

    /// The key this subscription is registered under
    pub fn key(&self) -> OrderKey {
        self.key
    }
}

/// Rank of every constrained subscription of one event type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedOrder {
    ranks: HashMap<u32, u32>,
}

impl ResolvedOrder {
    /// Position of the subscription with sequence number `seq`
    ///
    /// `None` for unconstrained subscriptions, which sort after every
    /// ranked one.
    pub fn rank(&self, seq: u32) -> Option<u32> {
        self.ranks.get(&seq).copied()
    }

    /// Sequence numbers in resolved order
    pub fn sequence(&self) -> Vec<u32> {
        let mut seqs: Vec<_> = self.ranks.iter().map(|(seq, rank)| (*rank, *seq)).collect();
        seqs.sort_unstable();
        seqs.into_iter().map(|(_, seq)| seq).collect()
    }
}

#[derive(Debug, Clone)]
struct OrderNode {
    seq: u32,
    order: HandlerOrder,
}

#[derive(Debug, Default)]
struct EventOrderings {
    name: &'static str,
    nodes: Vec<OrderNode>,
    cached: Option<Arc<ResolvedOrder>>,
}

/// Per-event-type cache of resolved handler orders
#[derive(Debug, Default)]
pub struct OrderingResolver {
    events: HashMap<TypeId, EventOrderings>,
}

impl OrderingResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an ordered subscription, invalidating the event's cache
    pub fn add(&mut self, event: TypeId, event_name: &'static str, seq: u32, order: HandlerOrder) {
        let entry = self.events.entry(event).or_default();
        entry.name = event_name;
        entry.nodes.push(OrderNode { seq, order });
        entry.cached = None;
    }

    /// Forget a subscription, invalidating the event's cache if it was ordered
    pub fn remove(&mut self, event: TypeId, seq: u32) {
        if let Some(entry) = self.events.get_mut(&event) {
            let before = entry.nodes.len();
            entry.nodes.retain(|node| node.seq != seq);
            if entry.nodes.len() != before {
                entry.cached = None;
            }
            if entry.nodes.is_empty() {
                self.events.remove(&event);
            }
        }
    }

    /// Whether the event type has any ordered subscription
    pub fn is_ordered(&self, event: TypeId) -> bool {
        self.events.contains_key(&event)
    }

    /// Whether a resolved order is cached for the event type
    pub fn is_cached(&self, event: TypeId) -> bool {
        self.events
            .get(&event)
            .map_or(false, |entry| entry.cached.is_some())
    }

    /// Resolved order for one event type
    ///
    /// `Ok(None)` if the type has no ordered subscription.
    pub fn resolve(&mut self, event: TypeId) -> EcsResult<Option<Arc<ResolvedOrder>>> {
        let Some(entry) = self.events.get_mut(&event) else {
            return Ok(None);
        };
        if let Some(cached) = &entry.cached {
            return Ok(Some(Arc::clone(cached)));
        }

        let resolved = Arc::new(resolve_nodes(entry.name, &entry.nodes)?);
        entry.cached = Some(Arc::clone(&resolved));
        Ok(Some(resolved))
    }

    /// Resolve every event type whose cache is stale
    ///
    /// With the `parallel` feature the event types are resolved on the
    /// rayon thread pool.
    pub fn resolve_all(&mut self) -> EcsResult<HashMap<TypeId, Arc<ResolvedOrder>>> {
        let stale: Vec<(TypeId, &'static str, &[OrderNode])> = self
            .events
            .iter()
            .filter(|(_, entry)| entry.cached.is_none())
            .map(|(event, entry)| (*event, entry.name, entry.nodes.as_slice()))
            .collect();

        #[cfg(feature = "parallel")]
        let results: Vec<(TypeId, EcsResult<ResolvedOrder>)> = {
            use rayon::prelude::*;
            stale
                .par_iter()
                .map(|&(event, name, nodes)| (event, resolve_nodes(name, nodes)))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let results: Vec<(TypeId, EcsResult<ResolvedOrder>)> = stale
            .iter()
            .map(|&(event, name, nodes)| (event, resolve_nodes(name, nodes)))
            .collect();

        for (event, result) in results {
            let resolved = result?;
            if let Some(entry) = self.events.get_mut(&event) {
                entry.cached = Some(Arc::new(resolved));
            }
        }

        Ok(self
            .events
            .iter()
            .filter_map(|(event, entry)| entry.cached.clone().map(|order| (*event, order)))
            .collect())
    }
}

fn resolve_nodes(event_name: &'static str, nodes: &[OrderNode]) -> EcsResult<ResolvedOrder> {
    // Registration order drives tie-breaking in the sort
    let mut sorted_nodes: Vec<&OrderNode> = nodes.iter().collect();
    sorted_nodes.sort_by_key(|node| node.seq);

    let mut by_key: HashMap<OrderKey, Vec<usize>> = HashMap::new();
    for (i, node) in sorted_nodes.iter().enumerate() {
        by_key.entry(node.order.key).or_default().push(i);
    }

    let mut edges = Vec::new();
    for (i, node) in sorted_nodes.iter().enumerate() {
        for key in &node.order.before {
            if *key == node.order.key {
                continue;
            }
            for &j in by_key.get(key).into_iter().flatten() {
                edges.push((i, j));
            }
        }
        for key in &node.order.after {
            if *key == node.order.key {
                continue;
            }
            for &j in by_key.get(key).into_iter().flatten() {
                edges.push((j, i));
            }
        }
    }

    let order = topological_sort(sorted_nodes.len(), &edges).map_err(|cycle| {
        tracing::error!(
            event = event_name,
            nodes = cycle.len(),
            "circular handler ordering constraints"
        );
        EcsError::OrderingCycle { event: event_name }
    })?;

    let ranks = order
        .into_iter()
        .enumerate()
        .map(|(rank, i)| (sorted_nodes[i].seq, rank as u32))
        .collect();
    Ok(ResolvedOrder { ranks })
}

/// Kahn's algorithm over nodes `0..node_count`
///
/// An edge `(a, b)` places `a` before `b`. Among nodes that are ready at the
/// same time the lowest index goes first, so the result is deterministic.
///
/// # Errors
///
/// Returns the nodes left on a cycle (or downstream of one) if the graph is
/// not acyclic.
pub fn topological_sort(node_count: usize, edges: &[(usize, usize)]) -> Result<Vec<usize>, Vec<usize>> {
    let mut in_degree = vec![0usize; node_count];
    let mut adj_list: Vec<Vec<usize>> = vec![Vec::new(); node_count];

    for &(from, to) in edges {
        adj_list[from].push(to);
        in_degree[to] += 1;
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &degree)| degree == 0)
        .map(|(node, _)| Reverse(node))
        .collect();

    let mut sorted = Vec::with_capacity(node_count);
    while let Some(Reverse(node)) = ready.pop() {
        sorted.push(node);
        for &neighbor in &adj_list[node] {
            in_degree[neighbor] -= 1;
            if in_degree[neighbor] == 0 {
                ready.push(Reverse(neighbor));
            }
        }
    }

    if sorted.len() != node_count {
        let remaining = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree > 0)
            .map(|(node, _)| node)
            .collect();
        return Err(remaining);
    }

    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Damage;

    const A: OrderKey = OrderKey::named("a");
    const B: OrderKey = OrderKey::named("b");
    const C: OrderKey = OrderKey::named("c");

    fn event() -> TypeId {
        TypeId::of::<Damage>()
    }

    #[test]
    fn test_topological_sort_simple() {
        // 2 -> 0 -> 1
        let order = topological_sort(3, &[(2, 0), (0, 1)]).unwrap();
        assert_eq!(order, vec![2, 0, 1]);
    }

    #[test]
    fn test_topological_sort_ties_by_index() {
        let order = topological_sort(4, &[(3, 0)]).unwrap();
        assert_eq!(order, vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_topological_sort_cycle() {
        let err = topological_sort(3, &[(0, 1), (1, 0), (1, 2)]).unwrap_err();
        assert!(err.contains(&0));
        assert!(err.contains(&1));
    }

    #[test]
    fn test_before_constraint() {
        let mut resolver = OrderingResolver::new();
        resolver.add(event(), "Damage", 0, HandlerOrder::new(B));
        resolver.add(event(), "Damage", 1, HandlerOrder::new(A).before(B));

        let order = resolver.resolve(event()).unwrap().unwrap();
        assert!(order.rank(1) < order.rank(0));
        assert_eq!(order.sequence(), vec![1, 0]);
    }

    #[test]
    fn test_after_constraint_and_unknown_key() {
        let mut resolver = OrderingResolver::new();
        resolver.add(event(), "Damage", 0, HandlerOrder::new(C).after(B));
        resolver.add(event(), "Damage", 1, HandlerOrder::new(A).after(OrderKey::named("missing")));
        resolver.add(event(), "Damage", 2, HandlerOrder::new(B));

        let order = resolver.resolve(event()).unwrap().unwrap();
        assert_eq!(order.sequence(), vec![1, 2, 0]);
    }

    #[test]
    fn test_shared_key() {
        let mut resolver = OrderingResolver::new();
        resolver.add(event(), "Damage", 0, HandlerOrder::new(B));
        resolver.add(event(), "Damage", 1, HandlerOrder::new(B));
        resolver.add(event(), "Damage", 2, HandlerOrder::new(A).before(B));

        let order = resolver.resolve(event()).unwrap().unwrap();
        assert_eq!(order.sequence(), vec![2, 0, 1]);
    }

    #[test]
    fn test_cycle_detected() {
        let mut resolver = OrderingResolver::new();
        resolver.add(event(), "Damage", 0, HandlerOrder::new(A).before(B));
        resolver.add(event(), "Damage", 1, HandlerOrder::new(B).before(A));

        assert_eq!(
            resolver.resolve(event()),
            Err(EcsError::OrderingCycle { event: "Damage" })
        );
        assert!(!resolver.is_cached(event()));
    }

    #[test]
    fn test_cache_invalidation() {
        let mut resolver = OrderingResolver::new();
        resolver.add(event(), "Damage", 0, HandlerOrder::new(A));
        let first = resolver.resolve(event()).unwrap().unwrap();
        assert!(resolver.is_cached(event()));

        let again = resolver.resolve(event()).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        resolver.add(event(), "Damage", 1, HandlerOrder::new(B).before(A));
        assert!(!resolver.is_cached(event()));
        let updated = resolver.resolve(event()).unwrap().unwrap();
        assert_eq!(updated.sequence(), vec![1, 0]);

        resolver.remove(event(), 1);
        assert!(!resolver.is_cached(event()));
        resolver.remove(event(), 0);
        assert!(!resolver.is_ordered(event()));
        assert_eq!(resolver.resolve(event()), Ok(None));
    }

    #[test]
    fn test_resolve_all() {
        struct Heal;
        let mut resolver = OrderingResolver::new();
        resolver.add(event(), "Damage", 0, HandlerOrder::new(A));
        resolver.add(TypeId::of::<Heal>(), "Heal", 1, HandlerOrder::new(B).after(C));

        let all = resolver.resolve_all().unwrap();
        assert_eq!(all.len(), 2);
        assert!(resolver.is_cached(TypeId::of::<Heal>()));
    }
}
