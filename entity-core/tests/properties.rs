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
//! Property-based tests using proptest
//!
//! Invariants that must hold for any sequence of operations:
//! - Storage: lookups agree with a simple presence model, and a second
//!   cull never does any work
//! - Ordering: declared before-constraints always hold at dispatch
//! - Topological sort: output respects every edge
//! - Type indices: dense, assigned in first-seen order, never reassigned

use entity_core::ecs::{CompIdx, Component, ComponentRegistry, TypeIndexRegistry, World};
use entity_core::events::{
    topological_sort, BusBuilder, Event, EventBus, EventSource, HandlerOrder, OrderKey,
    SubscriberId,
};
use entity_core::EntityUid;
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Default)]
struct Sprite;
impl Component for Sprite {}

#[derive(Debug, Clone)]
enum Op {
    Add(usize),
    Remove(usize),
    RemoveDeferred(usize),
    Cull,
}

fn op_strategy(entities: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..entities).prop_map(Op::Add),
        (0..entities).prop_map(Op::Remove),
        (0..entities).prop_map(Op::RemoveDeferred),
        Just(Op::Cull),
    ]
}

const ENTITIES: usize = 4;
const NAMES: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

struct Marker<const N: usize>;

fn index_of_marker(types: &TypeIndexRegistry, n: usize) -> CompIdx {
    match n {
        0 => types.index_of::<Marker<0>>(),
        1 => types.index_of::<Marker<1>>(),
        2 => types.index_of::<Marker<2>>(),
        3 => types.index_of::<Marker<3>>(),
        4 => types.index_of::<Marker<4>>(),
        _ => types.index_of::<Marker<5>>(),
    }
}

#[derive(Default)]
struct Trace {
    seen: Vec<usize>,
}
impl Event for Trace {}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_storage_matches_presence_model(ops in prop::collection::vec(op_strategy(ENTITIES), 1..40)) {
        let mut registry = ComponentRegistry::new();
        registry.register::<Sprite>().unwrap();
        let mut world = World::new(EventBus::empty(Arc::new(registry)));
        let uids: Vec<EntityUid> = (0..ENTITIES).map(|_| world.spawn_entity().unwrap()).collect();
        let mut present = [false; ENTITIES];

        for op in ops {
            match op {
                Op::Add(i) => {
                    let result = world.add_component(uids[i], Sprite);
                    prop_assert_eq!(result.is_ok(), !present[i]);
                    present[i] = true;
                }
                Op::Remove(i) => {
                    prop_assert_eq!(world.remove_component::<Sprite>(uids[i]).is_ok(), present[i]);
                    present[i] = false;
                }
                Op::RemoveDeferred(i) => {
                    prop_assert_eq!(
                        world.remove_component_deferred::<Sprite>(uids[i]).is_ok(),
                        present[i]
                    );
                    present[i] = false;
                }
                Op::Cull => {
                    world.cull();
                }
            }

            for (i, uid) in uids.iter().enumerate() {
                prop_assert_eq!(world.has::<Sprite>(*uid), present[i]);
            }
            prop_assert_eq!(world.count::<Sprite>(), present.iter().filter(|p| **p).count());
        }

        world.cull();
        prop_assert_eq!(world.cull(), 0);
        prop_assert_eq!(world.storage().pending_deletions(), 0);
    }

    #[test]
    fn prop_before_chain_holds(order in Just((0..NAMES.len()).collect::<Vec<_>>()).prop_shuffle()) {
        let mut bus = BusBuilder::new(Arc::new(ComponentRegistry::new()));

        // Handler i must run before the handler that follows it in `order`
        for i in 0..NAMES.len() {
            let position = order.iter().position(|&n| n == i).unwrap();
            let mut handler_order = HandlerOrder::new(OrderKey::named(NAMES[i]));
            if let Some(&next) = order.get(position + 1) {
                handler_order = handler_order.before(OrderKey::named(NAMES[next]));
            }
            bus.subscribe_event_ref_ordered::<Trace, _>(
                EventSource::ALL,
                SubscriberId::named(NAMES[i]),
                handler_order,
                move |_, trace| trace.seen.push(i),
            )
            .unwrap();
        }

        let mut world = World::new(bus.seal().unwrap());
        let mut trace = Trace::default();
        world.raise_event_ref(EventSource::LOCAL, &mut trace).unwrap();
        prop_assert_eq!(trace.seen, order);
    }

    #[test]
    fn prop_topological_sort_respects_edges(
        node_count in 1usize..12,
        raw_edges in prop::collection::vec((0usize..12, 0usize..12), 0..30),
    ) {
        // Only forward edges, so the graph is acyclic
        let edges: Vec<(usize, usize)> = raw_edges
            .into_iter()
            .filter(|&(a, b)| a < b && b < node_count)
            .collect();

        let sorted = topological_sort(node_count, &edges).unwrap();
        prop_assert_eq!(sorted.len(), node_count);

        let mut position = vec![0; node_count];
        for (rank, node) in sorted.iter().enumerate() {
            position[*node] = rank;
        }
        for (a, b) in &edges {
            prop_assert!(position[*a] < position[*b]);
        }

        if let Some(&(a, b)) = edges.first() {
            let mut cyclic = edges.clone();
            cyclic.push((b, a));
            prop_assert!(topological_sort(node_count, &cyclic).is_err());
        }
    }

    #[test]
    fn prop_type_indices_are_stable(lookups in prop::collection::vec(0usize..6, 1..50)) {
        let types = TypeIndexRegistry::new();
        let mut assigned: Vec<Option<CompIdx>> = vec![None; 6];
        let mut next = 0u32;

        for n in lookups {
            let idx = index_of_marker(&types, n);
            match assigned[n] {
                Some(previous) => prop_assert_eq!(idx, previous),
                None => {
                    prop_assert_eq!(idx, CompIdx::new(next));
                    assigned[n] = Some(idx);
                    next += 1;
                }
            }
            prop_assert_eq!(types.len(), next as usize);
        }
    }
}
