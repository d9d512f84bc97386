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
//! Dense type indices
//!
//! Every component or reference type seen by a [`TypeIndexRegistry`] gets a
//! sequential [`CompIdx`] on first lookup. Indices are never reused or
//! reassigned, so they can key plain arrays in hot paths.

use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

/// Dense index identifying a component or reference type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompIdx(u32);

impl CompIdx {
    /// Create an index from a raw value
    pub const fn new(value: u32) -> Self {
        CompIdx(value)
    }

    /// Raw index value
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Index usable for array lookups
    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CompIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompIdx({})", self.0)
    }
}

/// Thread-safe allocator of [`CompIdx`] values
///
/// Lookups of known types take a shared read lock. Only the first lookup of
/// a type takes the write lock, and allocation re-checks under it so two
/// racing threads observe a single index.
#[derive(Default)]
pub struct TypeIndexRegistry {
    indices: RwLock<HashMap<TypeId, CompIdx>>,
}

impl TypeIndexRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `T`, allocating the next one if `T` is new
    pub fn index_of<T: ?Sized + 'static>(&self) -> CompIdx {
        self.index_of_id(TypeId::of::<T>())
    }

    /// Index of a type id, allocating the next one if it is new
    pub fn index_of_id(&self, type_id: TypeId) -> CompIdx {
        if let Some(idx) = self.indices.read().get(&type_id) {
            return *idx;
        }

        let mut indices = self.indices.write();
        let next = CompIdx(indices.len() as u32);
        *indices.entry(type_id).or_insert(next)
    }

    /// Index of `T` if it has been seen before
    pub fn get<T: ?Sized + 'static>(&self) -> Option<CompIdx> {
        self.indices.read().get(&TypeId::of::<T>()).copied()
    }

    /// Number of indices handed out
    pub fn len(&self) -> usize {
        self.indices.read().len()
    }

    /// Whether no index has been handed out
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for TypeIndexRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeIndexRegistry")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    struct A;
    struct B;
    trait Marker {}

    #[test]
    fn test_sequential_allocation() {
        let registry = TypeIndexRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.index_of::<A>(), CompIdx::new(0));
        assert_eq!(registry.index_of::<B>(), CompIdx::new(1));
        assert_eq!(registry.index_of::<dyn Marker>(), CompIdx::new(2));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_idempotent() {
        let registry = TypeIndexRegistry::new();
        let first = registry.index_of::<B>();
        registry.index_of::<A>();
        for _ in 0..10 {
            assert_eq!(registry.index_of::<B>(), first);
        }
        assert_eq!(registry.get::<A>(), Some(CompIdx::new(1)));
        assert_eq!(registry.get::<dyn Marker>(), None);
    }

    #[test]
    fn test_concurrent_allocation() {
        let registry = Arc::new(TypeIndexRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || (registry.index_of::<A>(), registry.index_of::<B>()))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(registry.len(), 2);
        let (a, b) = results[0];
        assert_ne!(a, b);
    }
}
