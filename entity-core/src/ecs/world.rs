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
//! World management
//!
//! The [`World`] owns every entity, the component storage, each entity's
//! event table and the sealed event bus. It is the only place components
//! are attached and detached, so it is also where the lifecycle is driven
//! from.
//!
//! Removing a component runs its shutdown and removal events immediately
//! and queues it for physical deletion. [`World::cull`] later drops the
//! queued instances from every table.

use crate::config::WorldConfig;
use crate::ecs::component::ErasedRc;
use crate::ecs::components::{MetaDataComponent, TransformComponent};
use crate::ecs::storage::{is_live, ComponentStorage};
use crate::ecs::{
    AnyComponentHandle, CompIdx, Component, ComponentHandle, ComponentLifeStage,
    ComponentRegistration, ComponentRegistry, EntityLifeStage, EntityUid, GameTick,
};
use crate::error::{EcsError, EcsResult};
use crate::events::{EventBus, EventTable, QueuedEvent};
use smallvec::SmallVec;
use std::any::TypeId;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

/// The main ECS world container
///
/// A world is single-threaded: components live in shared cells and
/// handlers receive `&mut World` while they run.
pub struct World {
    pub(crate) registry: Arc<ComponentRegistry>,
    pub(crate) bus: Rc<EventBus>,
    pub(crate) storage: ComponentStorage,
    pub(crate) event_tables: HashMap<EntityUid, EventTable>,
    entities: BTreeMap<EntityUid, EntityLifeStage>,
    next_uid: u32,
    current_tick: GameTick,
    config: WorldConfig,
    pub(crate) event_queue: VecDeque<QueuedEvent>,
    /// Components whose own handler is currently running, innermost last
    pub(crate) handler_stack: SmallVec<[ErasedRc; 4]>,
}

/// Position of a component in the safe teardown order
fn teardown_rank(component: &ErasedRc) -> u8 {
    let type_id = component.component_type_id();
    if type_id == TypeId::of::<MetaDataComponent>() {
        0
    } else if type_id == TypeId::of::<TransformComponent>() {
        1
    } else {
        2
    }
}

impl World {
    /// Create a world around a sealed bus with default configuration
    pub fn new(bus: EventBus) -> Self {
        Self::with_config(bus, WorldConfig::default())
    }

    /// Create a world with explicit configuration
    pub fn with_config(bus: EventBus, config: WorldConfig) -> Self {
        World {
            registry: Arc::clone(bus.registry()),
            bus: Rc::new(bus),
            storage: ComponentStorage::new(),
            event_tables: HashMap::new(),
            entities: BTreeMap::new(),
            next_uid: config.first_entity_uid.max(1),
            current_tick: GameTick::default(),
            config,
            event_queue: VecDeque::new(),
            handler_stack: SmallVec::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The component registry
    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    /// The sealed event bus
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Raw component storage
    pub fn storage(&self) -> &ComponentStorage {
        &self.storage
    }

    /// Current simulation tick
    pub fn current_tick(&self) -> GameTick {
        self.current_tick
    }

    /// Move to the next simulation tick
    pub fn advance_tick(&mut self) -> GameTick {
        self.current_tick = self.current_tick.next();
        self.current_tick
    }

    /// Mark a networked component as modified in the current tick
    ///
    /// Components that do not replicate are left untouched.
    pub fn dirty<T: Component>(&self, component: &ComponentHandle<T>) {
        if component.meta().networked() {
            component.meta().set_last_modified_tick(self.current_tick);
        }
    }

    // ---- entities ----

    /// Create an entity with its metadata and transform attached
    pub fn spawn_entity(&mut self) -> EcsResult<EntityUid> {
        let uid = EntityUid::new(self.next_uid);
        self.next_uid += 1;

        self.entities.insert(uid, EntityLifeStage::PreInit);
        self.event_tables
            .insert(uid, EventTable::with_capacity(self.config.event_table_capacity));

        self.add_component(uid, MetaDataComponent::default())?;
        self.add_component(uid, TransformComponent::default())?;
        Ok(uid)
    }

    /// Check if an entity exists
    pub fn entity_exists(&self, uid: EntityUid) -> bool {
        self.entities.contains_key(&uid)
    }

    /// Current stage of an entity
    pub fn entity_life_stage(&self, uid: EntityUid) -> Option<EntityLifeStage> {
        self.entities.get(&uid).copied()
    }

    /// Get the number of entities
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Every entity in uid order
    pub fn entities(&self) -> impl Iterator<Item = EntityUid> + '_ {
        self.entities.keys().copied()
    }

    /// Tear an entity down and forget it
    ///
    /// Every component is disposed in safe order, including the protected
    /// ones, and culled right away. The entity's event table goes with it.
    ///
    /// If teardown fails the entity stays `Terminating` with the components
    /// not yet disposed still attached, and calling this again resumes it.
    pub fn delete_entity(&mut self, uid: EntityUid) -> EcsResult<()> {
        self.entity_stage(uid)?;
        self.set_entity_stage(uid, EntityLifeStage::Terminating);

        self.dispose_all(uid)?;
        let batch = self.storage.take_deleted_of(uid);
        self.cull_batch(batch);

        self.event_tables.remove(&uid);
        self.entities.remove(&uid);
        Ok(())
    }

    fn entity_stage(&self, uid: EntityUid) -> EcsResult<EntityLifeStage> {
        self.entity_life_stage(uid)
            .ok_or(EcsError::EntityNotFound(uid))
    }

    pub(crate) fn expect_entity_stage(
        &self,
        uid: EntityUid,
        expected: EntityLifeStage,
    ) -> EcsResult<()> {
        let stage = self.entity_stage(uid)?;
        if stage != expected {
            return Err(EcsError::EntityStage { entity: uid, stage });
        }
        Ok(())
    }

    pub(crate) fn set_entity_stage(&mut self, uid: EntityUid, stage: EntityLifeStage) {
        if let Some(current) = self.entities.get_mut(&uid) {
            *current = stage;
        }
    }

    // ---- adding ----

    /// Attach a new component to an entity
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotFound`] for an unknown entity
    /// - [`EcsError::UnregisteredType`] if `T` was never registered
    /// - [`EcsError::SlotOccupied`] if the entity already has a live `T` or
    ///   a live component under one of `T`'s reference types
    pub fn add_component<T: Component>(
        &mut self,
        uid: EntityUid,
        component: T,
    ) -> EcsResult<ComponentHandle<T>> {
        let handle = ComponentHandle::new(component);
        self.add_component_instance(uid, &handle, false)?;
        Ok(handle)
    }

    /// Attach an existing component instance
    ///
    /// With `overwrite`, live components in the slots the instance needs
    /// are removed first. Protected components are never overwritten.
    pub fn add_component_instance<T: Component>(
        &mut self,
        uid: EntityUid,
        component: &ComponentHandle<T>,
        overwrite: bool,
    ) -> EcsResult<()> {
        self.add_erased(uid, component.erased(), overwrite)
    }

    /// Attach a default instance of the type registered under `name`
    pub fn add_component_by_name(
        &mut self,
        uid: EntityUid,
        name: &str,
    ) -> EcsResult<AnyComponentHandle> {
        let component = self.registry.registration_by_name(name)?.construct();
        self.add_erased(uid, Rc::clone(&component), false)?;
        Ok(AnyComponentHandle::new(component))
    }

    /// Attach a default instance of the type with network id `net_id`
    pub fn add_component_by_net_id(
        &mut self,
        uid: EntityUid,
        net_id: u16,
    ) -> EcsResult<AnyComponentHandle> {
        let component = self.registry.registration_by_net_id(net_id)?.construct();
        self.add_erased(uid, Rc::clone(&component), false)?;
        Ok(AnyComponentHandle::new(component))
    }

    /// Get the live `T` of an entity, adding a default one if missing
    ///
    /// An instance queued for deferred removal is replaced.
    pub fn ensure_component<T: Component + Default>(
        &mut self,
        uid: EntityUid,
    ) -> EcsResult<ComponentHandle<T>> {
        if let Some(existing) = self.try_get::<T>(uid) {
            return Ok(existing);
        }
        self.add_component(uid, T::default())
    }

    fn add_erased(&mut self, uid: EntityUid, component: ErasedRc, overwrite: bool) -> EcsResult<()> {
        let stage = self.entity_stage(uid)?;
        if stage >= EntityLifeStage::Terminating {
            return Err(EcsError::EntityStage { entity: uid, stage });
        }

        let registry = Arc::clone(&self.registry);
        let registration = registry
            .try_registration_by_type_id(component.component_type_id())
            .ok_or(EcsError::UnregisteredType(component.type_name()))?;

        let owner = component.meta().owner();
        if owner.is_valid() && owner != uid {
            tracing::error!(
                component = registration.name(),
                %owner,
                entity = %uid,
                "component already owned by another entity"
            );
            return Err(EcsError::OwnershipViolation {
                component: registration.name().to_string(),
                owner,
                entity: uid,
            });
        }
        let from = component.meta().life_stage();
        if from != ComponentLifeStage::PreAdd {
            return Err(EcsError::LifeStageViolation {
                component: component.type_name(),
                from,
                to: ComponentLifeStage::Adding,
            });
        }

        let displaced = self.displaced_by(uid, registration, overwrite)?;
        for old in &displaced {
            self.remove_now(uid, old)?;
            self.detach(uid, old);
        }

        component.meta().set_owner(uid);
        self.storage.insert(uid, registration, Rc::clone(&component));
        if let Some(table) = self.event_tables.get_mut(&uid) {
            self.bus.on_component_added(table, registration);
        }

        if registration.networked() {
            component.meta().set_last_modified_tick(self.current_tick);
        }

        // A failing step leaves the component attached in the stage it reached.
        // Handlers may also remove it again before it catches up.
        self.life_add_to_entity(&component)?;
        if stage >= EntityLifeStage::Initializing
            && component.meta().life_stage() == ComponentLifeStage::Added
        {
            self.life_initialize(&component)?;
        }
        if stage >= EntityLifeStage::Started
            && component.meta().life_stage() == ComponentLifeStage::Initialized
        {
            self.life_startup(&component)?;
        }
        Ok(())
    }

    /// Components that must leave before `registration` can be attached
    ///
    /// Live occupants require `overwrite`. Instances waiting on a deferred
    /// removal always give way.
    fn displaced_by(
        &self,
        uid: EntityUid,
        registration: &ComponentRegistration,
        overwrite: bool,
    ) -> EcsResult<SmallVec<[ErasedRc; 2]>> {
        let mut displaced: SmallVec<[ErasedRc; 2]> = SmallVec::new();
        for idx in registration.indices() {
            let Some(existing) = self.storage.get(idx, uid) else {
                continue;
            };
            if existing.meta().life_stage().is_deleted()
                || displaced.iter().any(|d| Rc::ptr_eq(d, existing))
            {
                continue;
            }
            if is_live(existing) {
                let protected = registration.is_protected() || self.is_protected(existing);
                if !overwrite || protected {
                    return Err(EcsError::SlotOccupied {
                        entity: uid,
                        component: registration.name().to_string(),
                    });
                }
            }
            displaced.push(Rc::clone(existing));
        }
        Ok(displaced)
    }

    // ---- removing ----

    /// Remove the `T` of an entity
    ///
    /// Shutdown and removal events run now; the instance is physically
    /// dropped at the next [`cull`](Self::cull).
    ///
    /// # Errors
    ///
    /// [`EcsError::ProtectedComponent`] for metadata and transform; use
    /// [`remove_component_override`](Self::remove_component_override).
    pub fn remove_component<T: Component>(&mut self, uid: EntityUid) -> EcsResult<()> {
        let component = self.lookup_live(uid, self.registry.index::<T>()?)?;
        self.remove_erased(uid, &component, false, false)
    }

    /// Remove the `T` of an entity even if it is protected
    pub fn remove_component_override<T: Component>(&mut self, uid: EntityUid) -> EcsResult<()> {
        let component = self.lookup_live(uid, self.registry.index::<T>()?)?;
        self.remove_erased(uid, &component, true, false)
    }

    /// Remove the component with network id `net_id`
    pub fn remove_component_by_net_id(&mut self, uid: EntityUid, net_id: u16) -> EcsResult<()> {
        let component = self.lookup_net_id(uid, net_id)?;
        self.remove_erased(uid, &component, false, false)
    }

    /// Remove one specific instance from its owner
    pub fn remove_component_instance<T: Component>(
        &mut self,
        uid: EntityUid,
        component: &ComponentHandle<T>,
    ) -> EcsResult<()> {
        let owner = component.owner();
        if owner != uid {
            return Err(EcsError::OwnershipViolation {
                component: self.component_name(&component.erased()),
                owner,
                entity: uid,
            });
        }
        self.remove_erased(uid, &component.erased(), false, false)
    }

    /// Shut the `T` of an entity down now and remove it at the next cull
    ///
    /// Until then it counts as absent to lookups and queries.
    pub fn remove_component_deferred<T: Component>(&mut self, uid: EntityUid) -> EcsResult<()> {
        let component = self.lookup_live(uid, self.registry.index::<T>()?)?;
        self.remove_erased(uid, &component, false, true)
    }

    /// Remove every unprotected component of an entity
    ///
    /// Metadata and transform stay attached.
    pub fn remove_all(&mut self, uid: EntityUid) -> EcsResult<()> {
        for component in self.in_teardown_order(uid, false)? {
            if self.is_protected(&component) {
                continue;
            }
            self.remove_erased(uid, &component, false, false)?;
        }
        Ok(())
    }

    /// Remove every component of an entity, protected ones last
    ///
    /// Only meant for entities being destroyed. With exception tolerance
    /// enabled, failures are logged and the teardown continues.
    pub fn dispose_all(&mut self, uid: EntityUid) -> EcsResult<()> {
        for component in self.in_teardown_order(uid, true)? {
            if let Err(err) = self.remove_erased(uid, &component, true, false) {
                if !self.config.exception_tolerance {
                    return Err(err);
                }
                tracing::error!(
                    entity = %uid,
                    component = component.type_name(),
                    error = %err,
                    "failed to dispose component"
                );
                self.storage.mark_deleted(component);
            }
        }
        Ok(())
    }

    /// Physically delete every component removed since the last cull
    ///
    /// Returns the number of instances dropped. Calling it again without
    /// new removals does nothing.
    pub fn cull(&mut self) -> usize {
        let batch = self.storage.take_deleted();
        self.cull_batch(batch)
    }

    fn cull_batch(&mut self, mut batch: Vec<ErasedRc>) -> usize {
        if batch.is_empty() {
            return 0;
        }
        batch.sort_by_key(|c| std::cmp::Reverse(teardown_rank(c)));

        let registry = Arc::clone(&self.registry);
        let mut culled = 0;
        for component in batch {
            let uid = component.meta().owner();
            if !component.meta().life_stage().is_deleted() {
                if let Err(err) = self.remove_now(uid, &component) {
                    tracing::error!(
                        entity = %uid,
                        component = component.type_name(),
                        error = %err,
                        "deferred removal failed"
                    );
                }
            }

            match registry.try_registration_by_type_id(component.component_type_id()) {
                Some(registration) => self.storage.remove(uid, registration, &component),
                None => {
                    tracing::error!(component = component.type_name(), "culling unregistered component");
                    continue;
                }
            }
            culled += 1;
        }

        tracing::debug!(culled, pending = self.storage.pending_deletions(), "cull pass");
        culled
    }

    fn remove_erased(
        &mut self,
        uid: EntityUid,
        component: &ErasedRc,
        override_protected: bool,
        deferred: bool,
    ) -> EcsResult<()> {
        if !override_protected && self.is_protected(component) {
            tracing::error!(
                entity = %uid,
                component = component.type_name(),
                "protected component removal without override"
            );
            return Err(EcsError::ProtectedComponent {
                entity: uid,
                component: self.component_name(component),
            });
        }

        if component.meta().life_stage().is_deleted() {
            tracing::warn!(
                entity = %uid,
                component = component.type_name(),
                "component already removed"
            );
            return Ok(());
        }

        if deferred {
            if !component.meta().pending_delete() {
                self.life_stop(component)?;
                self.storage.mark_deleted(Rc::clone(component));
            }
            return Ok(());
        }

        let removed = self.remove_now(uid, component);
        if component.meta().life_stage().is_deleted() {
            self.storage.mark_deleted(Rc::clone(component));
        }
        removed
    }

    /// Run shutdown and removal, then unlink from the event table
    ///
    /// Once the removal event has been raised the component is unlinked
    /// even if a handler failed.
    fn remove_now(&mut self, uid: EntityUid, component: &ErasedRc) -> EcsResult<()> {
        self.life_stop(component)?;
        if component.meta().life_stage() != ComponentLifeStage::Stopped {
            // removed by one of its own shutdown handlers
            return Ok(());
        }
        let removed = self.life_remove_from_entity(component);

        let registry = Arc::clone(&self.registry);
        if let Some(registration) = registry.try_registration_by_type_id(component.component_type_id())
        {
            if let Some(table) = self.event_tables.get_mut(&uid) {
                self.bus.on_component_removed(table, registration);
            }
        }
        removed
    }

    /// Drop an instance from storage right away
    fn detach(&mut self, uid: EntityUid, component: &ErasedRc) {
        let registry = Arc::clone(&self.registry);
        if let Some(registration) = registry.try_registration_by_type_id(component.component_type_id())
        {
            self.storage.remove(uid, registration, component);
        }
    }

    fn in_teardown_order(&self, uid: EntityUid, dispose: bool) -> EcsResult<Vec<ErasedRc>> {
        self.entity_stage(uid)?;
        let mut components: Vec<ErasedRc> = self
            .storage
            .entity_components(uid)
            .iter()
            .filter(|c| !c.meta().life_stage().is_deleted())
            .cloned()
            .collect();
        if dispose {
            components.sort_by_key(|c| std::cmp::Reverse(teardown_rank(c)));
        } else {
            components.sort_by_key(teardown_rank);
        }
        Ok(components)
    }

    fn is_protected(&self, component: &ErasedRc) -> bool {
        self.registry
            .try_registration_by_type_id(component.component_type_id())
            .map_or(false, ComponentRegistration::is_protected)
    }

    fn component_name(&self, component: &ErasedRc) -> String {
        self.registry
            .try_registration_by_type_id(component.component_type_id())
            .map_or_else(|| component.type_name().to_string(), |r| r.name().to_string())
    }

    // ---- lookups ----

    fn lookup_live(&self, uid: EntityUid, idx: CompIdx) -> EcsResult<ErasedRc> {
        self.entity_stage(uid)?;
        let name = || {
            self.registry
                .try_registration_by_idx(idx)
                .map_or_else(|| idx.to_string(), |r| r.name().to_string())
        };
        match self.storage.get(idx, uid) {
            None => Err(EcsError::ComponentNotFound {
                entity: uid,
                component: name(),
            }),
            Some(component) if !is_live(component) => Err(EcsError::ComponentDeleted {
                entity: uid,
                component: name(),
            }),
            Some(component) => Ok(Rc::clone(component)),
        }
    }

    fn lookup_net_id(&self, uid: EntityUid, net_id: u16) -> EcsResult<ErasedRc> {
        self.entity_stage(uid)?;
        let name = || {
            self.registry
                .try_registration_by_net_id(net_id)
                .map_or_else(|| format!("net id {net_id}"), |r| r.name().to_string())
        };
        match self.storage.get_by_net_id(uid, net_id) {
            None => Err(EcsError::ComponentNotFound {
                entity: uid,
                component: name(),
            }),
            Some(component) if !is_live(component) => Err(EcsError::ComponentDeleted {
                entity: uid,
                component: name(),
            }),
            Some(component) => Ok(Rc::clone(component)),
        }
    }

    /// Get the live `T` of an entity
    ///
    /// # Errors
    ///
    /// [`EcsError::ComponentNotFound`] when the entity has no `T`, and
    /// [`EcsError::ComponentDeleted`] when it was removed but not yet culled.
    pub fn get<T: Component>(&self, uid: EntityUid) -> EcsResult<ComponentHandle<T>> {
        let component = self.lookup_live(uid, self.registry.index::<T>()?)?;
        ComponentHandle::from_erased(component)
            .ok_or(EcsError::UnregisteredType(std::any::type_name::<T>()))
    }

    /// Get the live `T` of an entity, if any
    pub fn try_get<T: Component>(&self, uid: EntityUid) -> Option<ComponentHandle<T>> {
        let idx = self.registry.try_registration::<T>()?.idx();
        let component = self.storage.get_live(idx, uid)?;
        ComponentHandle::from_erased(Rc::clone(component))
    }

    /// Whether the entity has a live `T`
    pub fn has<T: Component>(&self, uid: EntityUid) -> bool {
        self.registry
            .try_registration::<T>()
            .map_or(false, |r| self.storage.get_live(r.idx(), uid).is_some())
    }

    /// Get the live component stored under reference type `A`
    pub fn get_reference<A: ?Sized + 'static>(&self, uid: EntityUid) -> EcsResult<AnyComponentHandle> {
        let idx = self
            .registry
            .reference_index::<A>()
            .ok_or(EcsError::UnregisteredType(std::any::type_name::<A>()))?;
        self.lookup_live(uid, idx).map(AnyComponentHandle::new)
    }

    /// Whether the entity has a live component under reference type `A`
    pub fn has_reference<A: ?Sized + 'static>(&self, uid: EntityUid) -> bool {
        self.registry
            .reference_index::<A>()
            .map_or(false, |idx| self.storage.get_live(idx, uid).is_some())
    }

    /// Get the live component with network id `net_id`
    pub fn get_by_net_id(&self, uid: EntityUid, net_id: u16) -> EcsResult<AnyComponentHandle> {
        self.lookup_net_id(uid, net_id).map(AnyComponentHandle::new)
    }

    /// Get the live component with network id `net_id`, if any
    pub fn try_get_by_net_id(&self, uid: EntityUid, net_id: u16) -> Option<AnyComponentHandle> {
        self.storage
            .get_by_net_id(uid, net_id)
            .filter(|c| is_live(c))
            .map(|c| AnyComponentHandle::new(Rc::clone(c)))
    }

    /// Whether the entity has a live component with network id `net_id`
    pub fn has_net_id(&self, uid: EntityUid, net_id: u16) -> bool {
        self.try_get_by_net_id(uid, net_id).is_some()
    }

    /// Live components of an entity in the order they were added
    pub fn components_of(&self, uid: EntityUid) -> impl Iterator<Item = AnyComponentHandle> + '_ {
        self.storage
            .entity_components(uid)
            .iter()
            .filter(|c| is_live(c))
            .map(|c| AnyComponentHandle::new(Rc::clone(c)))
    }

    /// Live replicated components of an entity in net id order
    pub fn net_components_of(
        &self,
        uid: EntityUid,
    ) -> impl Iterator<Item = (u16, AnyComponentHandle)> + '_ {
        self.storage
            .net_components(uid)
            .filter(|(_, c)| is_live(c))
            .map(|(id, c)| (id, AnyComponentHandle::new(Rc::clone(c))))
    }

    /// Number of live `T` in the world
    pub fn count<T: Component>(&self) -> usize {
        self.registry
            .try_registration::<T>()
            .map_or(0, |r| self.storage.count(r.idx()))
    }

    /// Directed subscription table of an entity
    pub fn event_table(&self, uid: EntityUid) -> Option<&EventTable> {
        self.event_tables.get(&uid)
    }

    /// Metadata component of an entity
    pub fn metadata(&self, uid: EntityUid) -> EcsResult<ComponentHandle<MetaDataComponent>> {
        self.get::<MetaDataComponent>(uid)
    }

    /// Transform component of an entity
    pub fn transform(&self, uid: EntityUid) -> EcsResult<ComponentHandle<TransformComponent>> {
        self.get::<TransformComponent>(uid)
    }

    /// Pause or resume an entity; paused entities are skipped by queries
    pub fn set_paused(&mut self, uid: EntityUid, paused: bool) -> EcsResult<()> {
        let metadata = self.metadata(uid)?;
        metadata.try_borrow_mut()?.entity_paused = paused;
        self.dirty(&metadata);
        Ok(())
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entities.len())
            .field("current_tick", &self.current_tick)
            .field("pending_deletions", &self.storage.pending_deletions())
            .field("queued_events", &self.event_queue.len())
            .finish()
    }
}
