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
//! Entity Component System (ECS) core implementation
//!
//! This module provides:
//! - Entity handles and life stages
//! - Type indices and the component registry
//! - Dense per-type component tables
//! - The component lifecycle state machine
//! - Multi-component queries
//! - The [`World`] that ties them together

mod comp_idx;
pub(crate) mod component;
pub mod components;
mod entity;
mod lifecycle;
mod query;
mod registry;
pub(crate) mod storage;
mod world;

pub use comp_idx::{CompIdx, TypeIndexRegistry};
pub use component::{
    AnyComponentHandle, AsAny, Component, ComponentHandle, ComponentLifeStage, ComponentMeta,
};
pub use components::{MetaDataComponent, TransformComponent};
pub use entity::{EntityLifeStage, EntityUid, GameTick};
pub use query::{Query, QueryIndices, QueryParam};
pub use registry::{
    derive_name, ComponentAvailability, ComponentRegistration, ComponentRegistry, NetManifest,
    MANIFEST_FORMAT_VERSION,
};
pub use storage::{ComponentStorage, ComponentTable};
pub use world::World;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use std::sync::Arc;

    #[test]
    fn test_world_creation() {
        let world = World::new(EventBus::empty(Arc::new(ComponentRegistry::new())));
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn test_entity_creation() {
        let mut world = World::new(EventBus::empty(Arc::new(ComponentRegistry::new())));
        let entity = world.spawn_entity().unwrap();
        assert_eq!(world.entity_count(), 1);
        assert!(world.entity_exists(entity));
    }
}
