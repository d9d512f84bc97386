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
//! Component storage tables
//!
//! Each [`CompIdx`], including reference aliases, owns one dense
//! [`ComponentTable`]. A per-entity reverse index keeps insertion order for
//! whole-entity enumeration, and replicated components are additionally
//! keyed by network id. Removed components stay in the tables, flagged as
//! deleted, until the next cull pass deletes them physically.
//!
//! Storage does not drive lifecycles; [`World`](crate::ecs::World) does that
//! around these primitives.

use crate::ecs::component::ErasedRc;
use crate::ecs::registry::ComponentRegistration;
use crate::ecs::{CompIdx, EntityUid};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// Dense entity → component table for one index
///
/// Components live contiguously; the sparse map from entity to dense slot
/// supports O(1) insert, lookup and swap-removal without leaving gaps.
#[derive(Default)]
pub struct ComponentTable {
    /// Mapping from entity to dense array index
    entity_to_index: HashMap<EntityUid, usize>,
    /// Mapping from dense array index back to entity (for swap_remove)
    index_to_entity: Vec<EntityUid>,
    components: Vec<ErasedRc>,
}

impl ComponentTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored components, deleted ones included
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Entities in dense order
    pub fn entities(&self) -> &[EntityUid] {
        &self.index_to_entity
    }

    /// Whether the entity has an entry, deleted or not
    pub fn contains(&self, entity: EntityUid) -> bool {
        self.entity_to_index.contains_key(&entity)
    }

    pub(crate) fn get(&self, entity: EntityUid) -> Option<&ErasedRc> {
        let index = self.entity_to_index.get(&entity)?;
        Some(&self.components[*index])
    }

    /// Insert or replace the entry for `entity`
    pub(crate) fn insert(&mut self, entity: EntityUid, component: ErasedRc) -> Option<ErasedRc> {
        if let Some(&index) = self.entity_to_index.get(&entity) {
            return Some(std::mem::replace(&mut self.components[index], component));
        }

        let new_index = self.components.len();
        self.components.push(component);
        self.entity_to_index.insert(entity, new_index);
        self.index_to_entity.push(entity);

        debug_assert_eq!(self.entity_to_index.len(), self.index_to_entity.len());
        debug_assert_eq!(self.entity_to_index.len(), self.components.len());
        None
    }

    /// Remove the entry for `entity`
    pub(crate) fn remove(&mut self, entity: EntityUid) -> Option<ErasedRc> {
        let index = self.entity_to_index.remove(&entity)?;

        // Swap with last element to avoid shifting
        let last_index = self.components.len() - 1;
        if index != last_index {
            let swapped_entity = self.index_to_entity[last_index];
            self.entity_to_index.insert(swapped_entity, index);
        }
        self.index_to_entity.swap_remove(index);
        let component = self.components.swap_remove(index);

        debug_assert_eq!(self.entity_to_index.len(), self.index_to_entity.len());
        debug_assert_eq!(self.entity_to_index.len(), self.components.len());
        Some(component)
    }

    /// Remove the entry only if it is this exact instance
    pub(crate) fn remove_instance(&mut self, entity: EntityUid, component: &ErasedRc) -> bool {
        match self.get(entity) {
            Some(existing) if Rc::ptr_eq(existing, component) => {
                self.remove(entity);
                true
            }
            _ => false,
        }
    }
}

pub(crate) fn is_live(component: &ErasedRc) -> bool {
    !component.meta().life_stage().is_deleted() && !component.meta().pending_delete()
}

/// All component tables of a world
#[derive(Default)]
pub struct ComponentStorage {
    tables: Vec<ComponentTable>,
    entity_components: HashMap<EntityUid, Vec<ErasedRc>>,
    net_components: HashMap<EntityUid, BTreeMap<u16, ErasedRc>>,
    deleted: Vec<ErasedRc>,
}

impl ComponentStorage {
    /// Create empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Table for an index, if any component was ever stored under it
    pub fn table(&self, idx: CompIdx) -> Option<&ComponentTable> {
        self.tables.get(idx.as_usize())
    }

    fn table_mut(&mut self, idx: CompIdx) -> &mut ComponentTable {
        let index = idx.as_usize();
        if index >= self.tables.len() {
            self.tables.resize_with(index + 1, ComponentTable::new);
        }
        &mut self.tables[index]
    }

    /// Component under `idx` on `entity`, deleted or not
    pub(crate) fn get(&self, idx: CompIdx, entity: EntityUid) -> Option<&ErasedRc> {
        self.table(idx)?.get(entity)
    }

    /// Live component under `idx` on `entity`
    ///
    /// Components removed or queued for removal count as absent.
    pub(crate) fn get_live(&self, idx: CompIdx, entity: EntityUid) -> Option<&ErasedRc> {
        self.get(idx, entity).filter(|c| is_live(c))
    }

    /// Component with network id `net_id` on `entity`, deleted or not
    pub(crate) fn get_by_net_id(&self, entity: EntityUid, net_id: u16) -> Option<&ErasedRc> {
        self.net_components.get(&entity)?.get(&net_id)
    }

    /// Every component of `entity` in insertion order
    pub(crate) fn entity_components(&self, entity: EntityUid) -> &[ErasedRc] {
        self.entity_components
            .get(&entity)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Replicated components of `entity` in net id order
    pub(crate) fn net_components(
        &self,
        entity: EntityUid,
    ) -> impl Iterator<Item = (u16, &ErasedRc)> + '_ {
        self.net_components
            .get(&entity)
            .into_iter()
            .flat_map(|map| map.iter().map(|(id, c)| (*id, c)))
    }

    /// Insert into every table the registration is reachable under
    pub(crate) fn insert(
        &mut self,
        entity: EntityUid,
        registration: &ComponentRegistration,
        component: ErasedRc,
    ) {
        for idx in registration.indices() {
            self.table_mut(idx).insert(entity, component.clone());
        }
        if let Some(net_id) = registration.net_id() {
            self.net_components
                .entry(entity)
                .or_default()
                .insert(net_id, component.clone());
        }
        self.entity_components
            .entry(entity)
            .or_default()
            .push(component);
    }

    /// Remove one instance from every table it is stored in
    ///
    /// Table slots that were taken over by a newer instance are left alone.
    pub(crate) fn remove(
        &mut self,
        entity: EntityUid,
        registration: &ComponentRegistration,
        component: &ErasedRc,
    ) {
        for idx in registration.indices() {
            self.table_mut(idx).remove_instance(entity, component);
        }

        if let Some(net_id) = registration.net_id() {
            if let Some(map) = self.net_components.get_mut(&entity) {
                if map.get(&net_id).map_or(false, |c| Rc::ptr_eq(c, component)) {
                    map.remove(&net_id);
                }
                if map.is_empty() {
                    self.net_components.remove(&entity);
                }
            }
        }

        if let Some(list) = self.entity_components.get_mut(&entity) {
            list.retain(|c| !Rc::ptr_eq(c, component));
            if list.is_empty() {
                self.entity_components.remove(&entity);
            }
        }
    }

    /// Queue a component for physical deletion at the next cull
    pub(crate) fn mark_deleted(&mut self, component: ErasedRc) {
        if !component.meta().pending_delete() {
            component.meta().set_pending_delete(true);
            self.deleted.push(component);
        }
    }

    /// Take every queued component
    pub(crate) fn take_deleted(&mut self) -> Vec<ErasedRc> {
        std::mem::take(&mut self.deleted)
    }

    /// Take the queued components owned by `entity`
    pub(crate) fn take_deleted_of(&mut self, entity: EntityUid) -> Vec<ErasedRc> {
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.deleted)
            .into_iter()
            .partition(|c| c.meta().owner() == entity);
        self.deleted = kept;
        taken
    }

    /// Number of components waiting for the next cull
    pub fn pending_deletions(&self) -> usize {
        self.deleted.len()
    }

    /// Number of live components stored under `idx`
    pub fn count(&self, idx: CompIdx) -> usize {
        self.table(idx).map_or(0, |table| {
            table
                .components
                .iter()
                .filter(|c| is_live(c))
                .count()
        })
    }
}
