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
//! Bus construction and the sealed bus
//!
//! All subscriptions are made on a [`BusBuilder`]. [`BusBuilder::seal`]
//! resolves handler orderings and produces an [`EventBus`], which has no
//! subscription API at all: once the world holds it, the set of handlers
//! is fixed.
//!
//! The bus keeps only indices. Directed registrations are keyed by
//! [`CompIdx`]; components themselves are looked up in world storage at
//! dispatch time.

use crate::ecs::component::{ComponentBox, ErasedRc};
use crate::ecs::{CompIdx, Component, ComponentRegistration, ComponentRegistry, EntityUid, World};
use crate::error::{EcsError, EcsResult};
use crate::events::ordering::{HandlerOrder, OrderingResolver};
use crate::events::{Event, EventShape, EventSource, EventTable, SubscriberId};
use std::any::{type_name, Any, TypeId};
use std::cell::RefMut;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

pub(crate) type DirectedHandler =
    Box<dyn Fn(&mut World, EntityUid, &ErasedRc, &mut dyn Any) -> EcsResult<()>>;
pub(crate) type BroadcastHandler = Box<dyn Fn(&mut World, &mut dyn Any) -> EcsResult<()>>;

pub(crate) struct DirectedRegistration {
    pub(crate) handler: DirectedHandler,
    pub(crate) seq: u32,
    pub(crate) rank: Option<u32>,
}

pub(crate) struct BroadcastRegistration {
    pub(crate) subscriber: SubscriberId,
    pub(crate) source: EventSource,
    pub(crate) handler: BroadcastHandler,
    pub(crate) seq: u32,
    pub(crate) rank: Option<u32>,
}

pub(crate) struct EventData {
    pub(crate) name: &'static str,
    pub(crate) shape: EventShape,
    pub(crate) component_event: bool,
    pub(crate) ordered: bool,
    pub(crate) broadcast: Vec<BroadcastRegistration>,
}

impl EventData {
    pub(crate) fn check_shape(&self, actual: EventShape) -> EcsResult<()> {
        if self.shape == actual {
            return Ok(());
        }
        tracing::error!(
            event = self.name,
            expected = ?self.shape,
            actual = ?actual,
            "event delivery shape mismatch"
        );
        Err(EcsError::EventShapeMismatch {
            event: self.name,
            expected: self.shape,
            actual,
        })
    }
}

fn borrow_component<C: Component>(component: &ErasedRc) -> EcsResult<RefMut<'_, C>> {
    let boxed = component
        .erased_any()
        .downcast_ref::<ComponentBox<C>>()
        .ok_or(EcsError::UnregisteredType(type_name::<C>()))?;
    boxed
        .value
        .try_borrow_mut()
        .map_err(|_| EcsError::ComponentBorrowed(type_name::<C>()))
}

/// Whether one of `component`'s own handlers is already running
///
/// A handler holds its component borrowed, so nested deliveries to that
/// component are skipped rather than failing the whole dispatch.
fn reentered(world: &World, component: &ErasedRc) -> bool {
    let active = world.handler_stack.iter().any(|c| Rc::ptr_eq(c, component));
    if active {
        tracing::debug!(
            component = component.type_name(),
            owner = %component.meta().owner(),
            "skipping nested delivery to a component inside its own handler"
        );
    }
    active
}

fn within_handler<R>(
    world: &mut World,
    component: &ErasedRc,
    call: impl FnOnce(&mut World) -> R,
) -> R {
    world.handler_stack.push(Rc::clone(component));
    let result = call(world);
    world.handler_stack.pop();
    result
}

fn payload<E: Event>(event: &mut dyn Any) -> EcsResult<&mut E> {
    event
        .downcast_mut::<E>()
        .ok_or(EcsError::UnregisteredType(type_name::<E>()))
}

/// Mutable registration phase of the event bus
pub struct BusBuilder {
    registry: Arc<ComponentRegistry>,
    ignore_unregistered: bool,
    events: HashMap<TypeId, EventData>,
    directed: Vec<HashMap<TypeId, DirectedRegistration>>,
    entity_subs: Vec<Vec<TypeId>>,
    resolver: OrderingResolver,
    next_seq: u32,
}

impl BusBuilder {
    /// Start building a bus over a finished component registry
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        BusBuilder {
            registry,
            ignore_unregistered: false,
            events: HashMap::new(),
            directed: Vec::new(),
            entity_subs: Vec::new(),
            resolver: OrderingResolver::new(),
            next_seq: 0,
        }
    }

    /// Skip directed subscriptions for unregistered component types
    ///
    /// Meant for restricted harnesses that only register part of the game.
    pub fn ignore_unregistered_components(mut self) -> Self {
        self.ignore_unregistered = true;
        self
    }

    /// The registry this bus resolves component types against
    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    /// Subscribe a by-value handler to `E` raised at entities with `C`
    pub fn subscribe_local_event<C, E, F>(&mut self, handler: F) -> EcsResult<()>
    where
        C: Component,
        E: Event,
        F: Fn(&mut World, EntityUid, &mut C, &E) + 'static,
    {
        self.directed_by_value::<C, E, F>(None, handler)
    }

    /// Ordered variant of [`subscribe_local_event`](Self::subscribe_local_event)
    pub fn subscribe_local_event_ordered<C, E, F>(
        &mut self,
        order: HandlerOrder,
        handler: F,
    ) -> EcsResult<()>
    where
        C: Component,
        E: Event,
        F: Fn(&mut World, EntityUid, &mut C, &E) + 'static,
    {
        self.directed_by_value::<C, E, F>(Some(order), handler)
    }

    /// Subscribe a by-reference handler to `E` raised at entities with `C`
    pub fn subscribe_local_event_ref<C, E, F>(&mut self, handler: F) -> EcsResult<()>
    where
        C: Component,
        E: Event,
        F: Fn(&mut World, EntityUid, &mut C, &mut E) + 'static,
    {
        self.directed_by_ref::<C, E, F>(None, handler)
    }

    /// Ordered variant of [`subscribe_local_event_ref`](Self::subscribe_local_event_ref)
    pub fn subscribe_local_event_ref_ordered<C, E, F>(
        &mut self,
        order: HandlerOrder,
        handler: F,
    ) -> EcsResult<()>
    where
        C: Component,
        E: Event,
        F: Fn(&mut World, EntityUid, &mut C, &mut E) + 'static,
    {
        self.directed_by_ref::<C, E, F>(Some(order), handler)
    }

    /// Subscribe a by-value handler through a reference type
    ///
    /// The handler fires for every component registered as reachable under
    /// `A` and receives it as a trait object.
    pub fn subscribe_alias_event<A, E, F>(&mut self, handler: F) -> EcsResult<()>
    where
        A: ?Sized + 'static,
        E: Event,
        F: Fn(&mut World, EntityUid, &mut dyn Component, &E) + 'static,
    {
        let Some(idx) = self.reference_idx::<A>()? else {
            return Ok(());
        };
        let wrapped: DirectedHandler = Box::new(
            move |world: &mut World, uid: EntityUid, component: &ErasedRc, event: &mut dyn Any| -> EcsResult<()> {
                if reentered(world, component) {
                    return Ok(());
                }
                let event = payload::<E>(event)?;
                let mut value = component
                    .try_borrow_component_mut()
                    .map_err(|_| EcsError::ComponentBorrowed(component.type_name()))?;
                within_handler(world, component, |world| {
                    handler(world, uid, &mut *value, event)
                });
                Ok(())
            },
        );
        self.add_directed::<E>(idx, type_name::<A>(), EventShape::ByValue, None, wrapped)
    }

    /// Subscribe a by-reference handler through a reference type
    pub fn subscribe_alias_event_ref<A, E, F>(&mut self, handler: F) -> EcsResult<()>
    where
        A: ?Sized + 'static,
        E: Event,
        F: Fn(&mut World, EntityUid, &mut dyn Component, &mut E) + 'static,
    {
        let Some(idx) = self.reference_idx::<A>()? else {
            return Ok(());
        };
        let wrapped: DirectedHandler = Box::new(
            move |world: &mut World, uid: EntityUid, component: &ErasedRc, event: &mut dyn Any| -> EcsResult<()> {
                if reentered(world, component) {
                    return Ok(());
                }
                let event = payload::<E>(event)?;
                let mut value = component
                    .try_borrow_component_mut()
                    .map_err(|_| EcsError::ComponentBorrowed(component.type_name()))?;
                within_handler(world, component, |world| {
                    handler(world, uid, &mut *value, event)
                });
                Ok(())
            },
        );
        self.add_directed::<E>(idx, type_name::<A>(), EventShape::ByRef, None, wrapped)
    }

    /// Remove the directed handler for (`C`, `E`)
    ///
    /// Returns whether a handler was removed.
    pub fn unsubscribe_local_event<C: Component, E: Event>(&mut self) -> EcsResult<bool> {
        let Some(idx) = self.component_idx::<C>()? else {
            return Ok(false);
        };
        let event = TypeId::of::<E>();
        let removed = self
            .directed
            .get_mut(idx.as_usize())
            .and_then(|handlers| handlers.remove(&event));

        match removed {
            Some(registration) => {
                self.resolver.remove(event, registration.seq);
                if let Some(subs) = self.entity_subs.get_mut(idx.as_usize()) {
                    subs.retain(|e| *e != event);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Subscribe a by-value broadcast handler
    pub fn subscribe_event<E, F>(
        &mut self,
        source: EventSource,
        subscriber: SubscriberId,
        handler: F,
    ) -> EcsResult<()>
    where
        E: Event,
        F: Fn(&mut World, &E) + 'static,
    {
        self.broadcast_by_value::<E, F>(source, subscriber, None, handler)
    }

    /// Ordered variant of [`subscribe_event`](Self::subscribe_event)
    pub fn subscribe_event_ordered<E, F>(
        &mut self,
        source: EventSource,
        subscriber: SubscriberId,
        order: HandlerOrder,
        handler: F,
    ) -> EcsResult<()>
    where
        E: Event,
        F: Fn(&mut World, &E) + 'static,
    {
        self.broadcast_by_value::<E, F>(source, subscriber, Some(order), handler)
    }

    /// Subscribe a by-reference broadcast handler
    pub fn subscribe_event_ref<E, F>(
        &mut self,
        source: EventSource,
        subscriber: SubscriberId,
        handler: F,
    ) -> EcsResult<()>
    where
        E: Event,
        F: Fn(&mut World, &mut E) + 'static,
    {
        self.broadcast_by_ref::<E, F>(source, subscriber, None, handler)
    }

    /// Ordered variant of [`subscribe_event_ref`](Self::subscribe_event_ref)
    pub fn subscribe_event_ref_ordered<E, F>(
        &mut self,
        source: EventSource,
        subscriber: SubscriberId,
        order: HandlerOrder,
        handler: F,
    ) -> EcsResult<()>
    where
        E: Event,
        F: Fn(&mut World, &mut E) + 'static,
    {
        self.broadcast_by_ref::<E, F>(source, subscriber, Some(order), handler)
    }

    /// Remove `subscriber`'s broadcast handler for `E`
    pub fn unsubscribe_event<E: Event>(&mut self, subscriber: SubscriberId) -> bool {
        let event = TypeId::of::<E>();
        let Some(data) = self.events.get_mut(&event) else {
            return false;
        };
        let Some(position) = data.broadcast.iter().position(|b| b.subscriber == subscriber) else {
            return false;
        };
        let registration = data.broadcast.remove(position);
        self.resolver.remove(event, registration.seq);
        true
    }

    /// Remove every broadcast handler of `subscriber`
    ///
    /// Returns the number of handlers removed.
    pub fn unsubscribe_events(&mut self, subscriber: SubscriberId) -> usize {
        let mut removed = Vec::new();
        for (event, data) in self.events.iter_mut() {
            data.broadcast.retain(|b| {
                if b.subscriber == subscriber {
                    removed.push((*event, b.seq));
                    false
                } else {
                    true
                }
            });
        }
        for (event, seq) in &removed {
            self.resolver.remove(*event, *seq);
        }
        removed.len()
    }

    /// Resolve orderings and freeze the bus
    ///
    /// # Errors
    ///
    /// [`EcsError::OrderingCycle`] if any event type's constraints are cyclic.
    pub fn seal(mut self) -> EcsResult<EventBus> {
        let orders = self.resolver.resolve_all()?;

        for (event, data) in self.events.iter_mut() {
            let order = orders.get(event);
            data.ordered = order.is_some();
            for registration in data.broadcast.iter_mut() {
                registration.rank = order.and_then(|o| o.rank(registration.seq));
            }
        }
        for handlers in self.directed.iter_mut() {
            for (event, registration) in handlers.iter_mut() {
                registration.rank = orders.get(event).and_then(|o| o.rank(registration.seq));
            }
        }

        tracing::debug!(
            events = self.events.len(),
            ordered = orders.len(),
            "event bus sealed"
        );

        Ok(EventBus {
            registry: self.registry,
            events: self.events,
            directed: self.directed,
            entity_subs: self.entity_subs,
        })
    }

    fn component_idx<C: Component>(&self) -> EcsResult<Option<CompIdx>> {
        match self.registry.try_registration::<C>() {
            Some(registration) => Ok(Some(registration.idx())),
            None if self.ignore_unregistered => Ok(None),
            None => Err(EcsError::UnregisteredType(type_name::<C>())),
        }
    }

    fn reference_idx<A: ?Sized + 'static>(&self) -> EcsResult<Option<CompIdx>> {
        match self.registry.reference_index::<A>() {
            Some(idx) => Ok(Some(idx)),
            None if self.ignore_unregistered => Ok(None),
            None => Err(EcsError::UnregisteredType(type_name::<A>())),
        }
    }

    /// Event data for `E`, created with `shape` on first use
    fn event_data<E: Event>(&mut self, shape: EventShape) -> EcsResult<&mut EventData> {
        let name = type_name::<E>();
        if let Some(declared) = E::shape() {
            if declared != shape {
                return Err(EcsError::EventShapeMismatch {
                    event: name,
                    expected: declared,
                    actual: shape,
                });
            }
        }

        let data = self
            .events
            .entry(TypeId::of::<E>())
            .or_insert_with(|| EventData {
                name,
                shape,
                component_event: E::component_event(),
                ordered: false,
                broadcast: Vec::new(),
            });
        data.check_shape(shape)?;
        Ok(data)
    }

    fn directed_by_value<C, E, F>(&mut self, order: Option<HandlerOrder>, handler: F) -> EcsResult<()>
    where
        C: Component,
        E: Event,
        F: Fn(&mut World, EntityUid, &mut C, &E) + 'static,
    {
        let Some(idx) = self.component_idx::<C>()? else {
            return Ok(());
        };
        let wrapped: DirectedHandler = Box::new(
            move |world: &mut World, uid: EntityUid, component: &ErasedRc, event: &mut dyn Any| -> EcsResult<()> {
                if reentered(world, component) {
                    return Ok(());
                }
                let event = payload::<E>(event)?;
                let mut value = borrow_component::<C>(component)?;
                within_handler(world, component, |world| {
                    handler(world, uid, &mut *value, event)
                });
                Ok(())
            },
        );
        self.add_directed::<E>(idx, type_name::<C>(), EventShape::ByValue, order, wrapped)
    }

    fn directed_by_ref<C, E, F>(&mut self, order: Option<HandlerOrder>, handler: F) -> EcsResult<()>
    where
        C: Component,
        E: Event,
        F: Fn(&mut World, EntityUid, &mut C, &mut E) + 'static,
    {
        let Some(idx) = self.component_idx::<C>()? else {
            return Ok(());
        };
        let wrapped: DirectedHandler = Box::new(
            move |world: &mut World, uid: EntityUid, component: &ErasedRc, event: &mut dyn Any| -> EcsResult<()> {
                if reentered(world, component) {
                    return Ok(());
                }
                let event = payload::<E>(event)?;
                let mut value = borrow_component::<C>(component)?;
                within_handler(world, component, |world| {
                    handler(world, uid, &mut *value, event)
                });
                Ok(())
            },
        );
        self.add_directed::<E>(idx, type_name::<C>(), EventShape::ByRef, order, wrapped)
    }

    fn add_directed<E: Event>(
        &mut self,
        idx: CompIdx,
        target: &'static str,
        shape: EventShape,
        order: Option<HandlerOrder>,
        handler: DirectedHandler,
    ) -> EcsResult<()> {
        let event = TypeId::of::<E>();
        self.event_data::<E>(shape)?;

        let slot = idx.as_usize();
        if slot >= self.directed.len() {
            self.directed.resize_with(slot + 1, HashMap::new);
            self.entity_subs.resize_with(slot + 1, Vec::new);
        }
        if self.directed[slot].contains_key(&event) {
            return Err(EcsError::DuplicateSubscription {
                target: target.to_string(),
                event: type_name::<E>(),
            });
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        if let Some(order) = order {
            self.resolver.add(event, type_name::<E>(), seq, order);
        }
        self.directed[slot].insert(
            event,
            DirectedRegistration {
                handler,
                seq,
                rank: None,
            },
        );
        if !E::component_event() {
            self.entity_subs[slot].push(event);
        }
        Ok(())
    }

    fn broadcast_by_value<E, F>(
        &mut self,
        source: EventSource,
        subscriber: SubscriberId,
        order: Option<HandlerOrder>,
        handler: F,
    ) -> EcsResult<()>
    where
        E: Event,
        F: Fn(&mut World, &E) + 'static,
    {
        let wrapped: BroadcastHandler = Box::new(move |world: &mut World, event: &mut dyn Any| -> EcsResult<()> {
            handler(world, payload::<E>(event)?);
            Ok(())
        });
        self.add_broadcast::<E>(source, subscriber, EventShape::ByValue, order, wrapped)
    }

    fn broadcast_by_ref<E, F>(
        &mut self,
        source: EventSource,
        subscriber: SubscriberId,
        order: Option<HandlerOrder>,
        handler: F,
    ) -> EcsResult<()>
    where
        E: Event,
        F: Fn(&mut World, &mut E) + 'static,
    {
        let wrapped: BroadcastHandler = Box::new(move |world: &mut World, event: &mut dyn Any| -> EcsResult<()> {
            handler(world, payload::<E>(event)?);
            Ok(())
        });
        self.add_broadcast::<E>(source, subscriber, EventShape::ByRef, order, wrapped)
    }

    fn add_broadcast<E: Event>(
        &mut self,
        source: EventSource,
        subscriber: SubscriberId,
        shape: EventShape,
        order: Option<HandlerOrder>,
        handler: BroadcastHandler,
    ) -> EcsResult<()> {
        let event = TypeId::of::<E>();
        let seq = self.next_seq;

        let data = self.event_data::<E>(shape)?;
        if data.broadcast.iter().any(|b| b.subscriber == subscriber) {
            return Err(EcsError::DuplicateSubscription {
                target: subscriber.name().to_string(),
                event: type_name::<E>(),
            });
        }
        data.broadcast.push(BroadcastRegistration {
            subscriber,
            source,
            handler,
            seq,
            rank: None,
        });

        self.next_seq += 1;
        if let Some(order) = order {
            self.resolver.add(event, type_name::<E>(), seq, order);
        }
        Ok(())
    }
}

/// Sealed, immutable event bus
///
/// Built by [`BusBuilder::seal`] and owned by a [`World`].
pub struct EventBus {
    registry: Arc<ComponentRegistry>,
    pub(crate) events: HashMap<TypeId, EventData>,
    pub(crate) directed: Vec<HashMap<TypeId, DirectedRegistration>>,
    entity_subs: Vec<Vec<TypeId>>,
}

impl EventBus {
    /// A bus with no subscriptions
    pub fn empty(registry: Arc<ComponentRegistry>) -> Self {
        EventBus {
            registry,
            events: HashMap::new(),
            directed: Vec::new(),
            entity_subs: Vec::new(),
        }
    }

    /// The component registry
    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    /// Delivery shape of `E`, if anything subscribed to it
    pub fn shape_of<E: Event>(&self) -> Option<EventShape> {
        self.events.get(&TypeId::of::<E>()).map(|data| data.shape)
    }

    /// Whether `E` has ordering constraints
    pub fn is_ordered<E: Event>(&self) -> bool {
        self.events
            .get(&TypeId::of::<E>())
            .map_or(false, |data| data.ordered)
    }

    /// Number of broadcast handlers for `E`
    pub fn broadcast_count<E: Event>(&self) -> usize {
        self.events
            .get(&TypeId::of::<E>())
            .map_or(0, |data| data.broadcast.len())
    }

    /// Whether a directed handler exists for (`C`, `E`)
    pub fn is_subscribed<C: Component, E: Event>(&self) -> bool {
        self.registry
            .try_registration::<C>()
            .map_or(false, |r| self.directed_registration(r.idx(), TypeId::of::<E>()).is_some())
    }

    pub(crate) fn directed_registration(
        &self,
        idx: CompIdx,
        event: TypeId,
    ) -> Option<&DirectedRegistration> {
        self.directed.get(idx.as_usize())?.get(&event)
    }

    /// Link a newly attached component into its entity's event table
    pub(crate) fn on_component_added(&self, table: &mut EventTable, registration: &ComponentRegistration) {
        for idx in registration.indices() {
            if let Some(events) = self.entity_subs.get(idx.as_usize()) {
                for event in events {
                    table.insert(*event, idx);
                }
            }
        }
    }

    /// Unlink a removed component from its entity's event table
    pub(crate) fn on_component_removed(
        &self,
        table: &mut EventTable,
        registration: &ComponentRegistration,
    ) {
        for idx in registration.indices() {
            if let Some(events) = self.entity_subs.get(idx.as_usize()) {
                for event in events {
                    table.remove(*event, idx);
                }
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("events", &self.events.len())
            .finish()
    }
}
