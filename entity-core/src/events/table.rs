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
//! Per-entity event subscription tables
//!
//! An [`EventTable`] records, for one entity, which component indices are
//! subscribed to which event types. Entries form singly-linked lists
//! threaded through one slot array; unused slots form a free list, so
//! adding and removing components reuses slots instead of allocating a node
//! per (component, event) pair. The array doubles when the free list runs
//! dry.

use crate::ecs::CompIdx;
use std::any::TypeId;
use std::collections::HashMap;

const NIL: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct Slot {
    next: u32,
    component: CompIdx,
}

#[derive(Debug, Clone, Copy)]
struct ListHead {
    start: u32,
    count: u32,
}

/// Subscription lists of one entity, keyed by event type
#[derive(Debug)]
pub struct EventTable {
    heads: HashMap<TypeId, ListHead>,
    slots: Vec<Slot>,
    free: u32,
}

impl EventTable {
    /// Create a table with `capacity` preallocated slots
    pub fn with_capacity(capacity: usize) -> Self {
        let mut table = EventTable {
            heads: HashMap::new(),
            slots: Vec::new(),
            free: NIL,
        };
        table.grow_to(capacity);
        table
    }

    fn grow_to(&mut self, new_len: usize) {
        let old_len = self.slots.len();
        if new_len <= old_len {
            return;
        }

        // Chain the new slots in front of the existing free list
        let tail = self.free;
        self.slots.extend((old_len..new_len).map(|i| Slot {
            next: if i + 1 == new_len { tail } else { (i + 1) as u32 },
            component: CompIdx::new(0),
        }));
        self.free = old_len as u32;
    }

    fn allocate(&mut self) -> u32 {
        if self.free == NIL {
            let len = self.slots.len();
            self.grow_to((len * 2).max(1));
        }
        let slot = self.free;
        self.free = self.slots[slot as usize].next;
        slot
    }

    /// Link `component` into the list for `event`
    ///
    /// New entries go to the front, so iteration visits the most recently
    /// added component first.
    pub(crate) fn insert(&mut self, event: TypeId, component: CompIdx) {
        let slot = self.allocate();
        let head = self.heads.entry(event).or_insert(ListHead {
            start: NIL,
            count: 0,
        });
        self.slots[slot as usize] = Slot {
            next: head.start,
            component,
        };
        head.start = slot;
        head.count += 1;
    }

    /// Unlink `component` from the list for `event`
    ///
    /// Returns `false` if it was not linked.
    pub(crate) fn remove(&mut self, event: TypeId, component: CompIdx) -> bool {
        let Some(head) = self.heads.get_mut(&event) else {
            return false;
        };

        let mut prev = NIL;
        let mut current = head.start;
        while current != NIL {
            let slot = self.slots[current as usize];
            if slot.component == component {
                if prev == NIL {
                    head.start = slot.next;
                } else {
                    self.slots[prev as usize].next = slot.next;
                }
                head.count -= 1;
                if head.count == 0 {
                    self.heads.remove(&event);
                }

                self.slots[current as usize].next = self.free;
                self.free = current;
                return true;
            }
            prev = current;
            current = slot.next;
        }
        false
    }

    /// Component indices subscribed to `event`, most recent first
    pub fn components(&self, event: TypeId) -> impl Iterator<Item = CompIdx> + '_ {
        let mut current = self.heads.get(&event).map_or(NIL, |head| head.start);
        std::iter::from_fn(move || {
            if current == NIL {
                return None;
            }
            let slot = self.slots[current as usize];
            current = slot.next;
            Some(slot.component)
        })
    }

    /// Number of linked entries for `event`
    pub fn node_count(&self, event: TypeId) -> usize {
        self.heads.get(&event).map_or(0, |head| head.count as usize)
    }

    /// Number of linked entries for event type `E`
    pub fn count_of<E: 'static>(&self) -> usize {
        self.node_count(TypeId::of::<E>())
    }

    /// Number of linked entries across all events
    pub fn total_nodes(&self) -> usize {
        self.heads.values().map(|head| head.count as usize).sum()
    }

    /// Number of event types with at least one entry
    pub fn event_count(&self) -> usize {
        self.heads.len()
    }

    /// Total slots, linked or free
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots on the free list
    pub fn free_len(&self) -> usize {
        let mut count = 0;
        let mut current = self.free;
        while current != NIL {
            count += 1;
            current = self.slots[current as usize].next;
        }
        count
    }
}

impl Default for EventTable {
    fn default() -> Self {
        Self::with_capacity(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Damage;
    struct Heal;

    fn idx(n: u32) -> CompIdx {
        CompIdx::new(n)
    }

    #[test]
    fn test_insert_push_front() {
        let mut table = EventTable::with_capacity(4);
        let damage = TypeId::of::<Damage>();
        table.insert(damage, idx(1));
        table.insert(damage, idx(2));
        table.insert(damage, idx(3));

        assert_eq!(table.components(damage).collect::<Vec<_>>(), vec![idx(3), idx(2), idx(1)]);
        assert_eq!(table.node_count(damage), 3);
        assert_eq!(table.free_len(), 1);
    }

    #[test]
    fn test_remove_returns_slot() {
        let mut table = EventTable::with_capacity(4);
        let damage = TypeId::of::<Damage>();
        let heal = TypeId::of::<Heal>();
        table.insert(damage, idx(1));
        table.insert(damage, idx(2));
        table.insert(heal, idx(2));

        assert!(table.remove(damage, idx(1)));
        assert!(!table.remove(damage, idx(1)));
        assert_eq!(table.components(damage).collect::<Vec<_>>(), vec![idx(2)]);
        assert_eq!(table.free_len(), 2);

        assert!(table.remove(damage, idx(2)));
        assert!(table.remove(heal, idx(2)));
        assert_eq!(table.total_nodes(), 0);
        assert_eq!(table.event_count(), 0);
        assert_eq!(table.free_len(), table.capacity());
    }

    #[test]
    fn test_growth_doubles() {
        let mut table = EventTable::with_capacity(2);
        let damage = TypeId::of::<Damage>();
        for n in 0..5 {
            table.insert(damage, idx(n));
        }
        assert_eq!(table.capacity(), 8);
        assert_eq!(table.node_count(damage), 5);
        assert_eq!(table.free_len(), 3);
    }

    #[test]
    fn test_zero_capacity() {
        let mut table = EventTable::with_capacity(0);
        assert_eq!(table.capacity(), 0);
        table.insert(TypeId::of::<Heal>(), idx(7));
        assert_eq!(table.capacity(), 1);
        assert_eq!(table.components(TypeId::of::<Heal>()).next(), Some(idx(7)));
    }

    #[test]
    fn test_reuse_after_remove() {
        let mut table = EventTable::with_capacity(2);
        let damage = TypeId::of::<Damage>();
        for round in 0..10 {
            table.insert(damage, idx(round));
            table.insert(damage, idx(round + 100));
            table.remove(damage, idx(round));
            table.remove(damage, idx(round + 100));
        }
        assert_eq!(table.capacity(), 2);
        assert_eq!(table.total_nodes(), 0);
    }
}
