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
//! Component queries
//!
//! A query walks the smallest table among the requested component types
//! and probes the others for each entity. Removed components count as
//! absent, and entities whose metadata marks them paused are skipped
//! unless the query asks for them.

use crate::ecs::component::ErasedRc;
use crate::ecs::components::MetaDataComponent;
use crate::ecs::storage::ComponentStorage;
use crate::ecs::{CompIdx, Component, ComponentHandle, ComponentRegistry, EntityUid, World};
use smallvec::SmallVec;
use std::marker::PhantomData;
use std::rc::Rc;

/// Index list of a query, one per requested type
pub type QueryIndices = SmallVec<[CompIdx; 4]>;

/// A tuple of component types that can be queried together
pub trait QueryParam {
    /// Handles yielded per entity
    type Item;

    /// Storage indices of the requested types, or `None` if any is unregistered
    fn indices(registry: &ComponentRegistry) -> Option<QueryIndices>;

    /// Fetch the handles for one entity, or `None` if any is missing
    fn fetch(storage: &ComponentStorage, indices: &[CompIdx], uid: EntityUid) -> Option<Self::Item>;
}

fn fetch_one<T: Component>(
    storage: &ComponentStorage,
    idx: CompIdx,
    uid: EntityUid,
) -> Option<ComponentHandle<T>> {
    let component: &ErasedRc = storage.get_live(idx, uid)?;
    ComponentHandle::from_erased(Rc::clone(component))
}

macro_rules! impl_query_param {
    ($($ty:ident => $i:tt),+) => {
        impl<$($ty: Component),+> QueryParam for ($($ty,)+) {
            type Item = ($(ComponentHandle<$ty>,)+);

            fn indices(registry: &ComponentRegistry) -> Option<QueryIndices> {
                Some(SmallVec::from_iter([
                    $(registry.try_registration::<$ty>()?.idx()),+
                ]))
            }

            fn fetch(
                storage: &ComponentStorage,
                indices: &[CompIdx],
                uid: EntityUid,
            ) -> Option<Self::Item> {
                Some(($(fetch_one::<$ty>(storage, indices[$i], uid)?,)+))
            }
        }
    };
}

impl_query_param!(A => 0);
impl_query_param!(A => 0, B => 1);
impl_query_param!(A => 0, B => 1, C => 2);
impl_query_param!(A => 0, B => 1, C => 2, D => 3);

/// Lazy iterator over entities holding every type in `Q`
pub struct Query<'w, Q: QueryParam> {
    storage: &'w ComponentStorage,
    indices: QueryIndices,
    driver: &'w [EntityUid],
    position: usize,
    paused_filter: Option<CompIdx>,
    _marker: PhantomData<Q>,
}

impl<'w, Q: QueryParam> Query<'w, Q> {
    fn new(world: &'w World, include_paused: bool) -> Self {
        let storage = &world.storage;
        let indices = Q::indices(&world.registry).unwrap_or_default();

        let mut driver: &'w [EntityUid] = &[];
        if !indices.is_empty() {
            let tables: Option<SmallVec<[_; 4]>> =
                indices.iter().map(|idx| storage.table(*idx)).collect();
            if let Some(smallest) = tables
                .into_iter()
                .flatten()
                .min_by_key(|table| table.len())
            {
                driver = smallest.entities();
            }
        }

        let paused_filter = if include_paused {
            None
        } else {
            world
                .registry
                .try_registration::<MetaDataComponent>()
                .map(|r| r.idx())
        };

        Query {
            storage,
            indices,
            driver,
            position: 0,
            paused_filter,
            _marker: PhantomData,
        }
    }

    fn is_paused(&self, uid: EntityUid) -> bool {
        self.paused_filter
            .and_then(|idx| fetch_one::<MetaDataComponent>(self.storage, idx, uid))
            .map_or(false, |metadata| {
                metadata.try_borrow().map_or(false, |m| m.entity_paused)
            })
    }
}

impl<Q: QueryParam> Iterator for Query<'_, Q> {
    type Item = (EntityUid, Q::Item);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&uid) = self.driver.get(self.position) {
            self.position += 1;
            if self.is_paused(uid) {
                continue;
            }
            if let Some(item) = Q::fetch(self.storage, &self.indices, uid) {
                return Some((uid, item));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.driver.len() - self.position))
    }
}

impl World {
    /// Iterate entities that hold every component in `Q`
    ///
    /// `Q` is a tuple such as `(Sprite,)` or `(Sprite, Physics)`. Paused
    /// entities are skipped.
    pub fn query<Q: QueryParam>(&self) -> Query<'_, Q> {
        Query::new(self, false)
    }

    /// Like [`query`](Self::query), including paused entities
    pub fn query_including_paused<Q: QueryParam>(&self) -> Query<'_, Q> {
        Query::new(self, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use std::sync::Arc;

    #[derive(Default)]
    struct Sprite;
    impl Component for Sprite {}

    #[derive(Default)]
    struct Physics {
        mass: f32,
    }
    impl Component for Physics {}

    #[derive(Default)]
    struct Unused;
    impl Component for Unused {}

    fn world() -> World {
        let mut registry = ComponentRegistry::new();
        registry.register::<Sprite>().unwrap();
        registry.register::<Physics>().unwrap();
        World::new(EventBus::empty(Arc::new(registry)))
    }

    #[test]
    fn test_query_intersection() {
        let mut world = world();
        let e1 = world.spawn_entity().unwrap();
        let e2 = world.spawn_entity().unwrap();
        world.add_component(e1, Sprite).unwrap();
        world.add_component(e1, Physics { mass: 2.0 }).unwrap();
        world.add_component(e2, Physics::default()).unwrap();

        let pairs: Vec<_> = world.query::<(Sprite, Physics)>().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, e1);
        assert_eq!(pairs[0].1 .1.borrow().mass, 2.0);

        assert_eq!(world.query::<(Physics,)>().count(), 2);
    }

    #[test]
    fn test_query_skips_removed() {
        let mut world = world();
        let e1 = world.spawn_entity().unwrap();
        world.add_component(e1, Sprite).unwrap();
        world.remove_component::<Sprite>(e1).unwrap();
        assert_eq!(world.query::<(Sprite,)>().count(), 0);
    }

    #[test]
    fn test_query_paused() {
        let mut world = world();
        let e1 = world.spawn_entity().unwrap();
        world.add_component(e1, Sprite).unwrap();
        world.set_paused(e1, true).unwrap();

        assert_eq!(world.query::<(Sprite,)>().count(), 0);
        assert_eq!(world.query_including_paused::<(Sprite,)>().count(), 1);
    }

    #[test]
    fn test_query_unregistered_is_empty() {
        let mut world = world();
        let e1 = world.spawn_entity().unwrap();
        world.add_component(e1, Sprite).unwrap();
        assert_eq!(world.query::<(Sprite, Unused)>().count(), 0);
    }
}
