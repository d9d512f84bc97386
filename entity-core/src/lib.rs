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
//! # Entity Core
//!
//! Entity-component storage and event dispatch for a live simulation.
//!
//! ## Features
//!
//! - **Dense storage**: one swap-remove table per component type, O(1)
//!   add, remove and lookup
//! - **Lifecycle**: every component walks a fixed add, init, start, stop,
//!   remove sequence driven by the world
//! - **Event bus**: broadcast and per-entity directed events, by value or
//!   by reference, with optional before/after handler ordering
//! - **Parallelization**: optional Rayon integration for resolving handler
//!   orderings when the bus is sealed
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use entity_core::ecs::{Component, ComponentRegistry, World};
//! use entity_core::events::{BusBuilder, Event};
//!
//! #[derive(Default)]
//! struct Health(i32);
//! impl Component for Health {}
//!
//! struct Damage(i32);
//! impl Event for Damage {}
//!
//! let mut registry = ComponentRegistry::new();
//! registry.register::<Health>().unwrap();
//!
//! let mut bus = BusBuilder::new(Arc::new(registry));
//! bus.subscribe_local_event::<Health, Damage, _>(|_, _, health, damage| {
//!     health.0 -= damage.0;
//! })
//! .unwrap();
//!
//! let mut world = World::new(bus.seal().unwrap());
//! let entity = world.spawn_entity().unwrap();
//! let health = world.add_component(entity, Health(10)).unwrap();
//! world.raise_local_event(entity, Damage(3), false).unwrap();
//! assert_eq!(health.borrow().0, 7);
//! ```

#![warn(missing_docs)]

/// Runtime configuration
pub mod config;

/// Entity Component System implementation
pub mod ecs;

/// Crate-wide error type
pub mod error;

/// Event bus and dispatch
pub mod events;

pub use config::WorldConfig;
pub use ecs::{Component, ComponentHandle, ComponentRegistry, EntityUid, World};
pub use error::{EcsError, EcsResult};
pub use events::{BusBuilder, Event, EventBus, EventSource};
