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
//! Event dispatch
//!
//! Raising an event snapshots its targets before any handler runs, so
//! handlers may freely add or remove components and raise further events.
//! A nested raise takes its own fresh snapshot. Targets removed by an
//! earlier handler in the same dispatch are skipped.

use crate::ecs::component::ErasedRc;
use crate::ecs::{CompIdx, Component, ComponentHandle, EntityUid, World};
use crate::error::{EcsError, EcsResult};
use crate::events::bus::{BroadcastRegistration, DirectedRegistration, EventData};
use crate::events::{
    ComponentGetState, ComponentGetStateAttempt, Event, EventBus, EventShape, EventSource,
};
use smallvec::SmallVec;
use std::any::{type_name, Any, TypeId};
use std::rc::Rc;

/// A broadcast event waiting in the world's queue
pub(crate) struct QueuedEvent {
    source: EventSource,
    event: TypeId,
    name: &'static str,
    payload: Box<dyn Any>,
}

enum Target<'b> {
    Directed {
        registration: &'b DirectedRegistration,
        component: ErasedRc,
    },
    Broadcast(&'b BroadcastRegistration),
}

impl Target<'_> {
    fn sort_key(&self) -> (u32, u32) {
        let (rank, seq) = match self {
            Target::Directed { registration, .. } => (registration.rank, registration.seq),
            Target::Broadcast(registration) => (registration.rank, registration.seq),
        };
        (rank.unwrap_or(u32::MAX), seq)
    }
}

type Targets<'b> = SmallVec<[Target<'b>; 8]>;

impl EventBus {
    pub(crate) fn raise_directed(
        &self,
        world: &mut World,
        uid: EntityUid,
        event: TypeId,
        payload: &mut dyn Any,
        shape: EventShape,
        broadcast: bool,
    ) -> EcsResult<()> {
        let table = world
            .event_tables
            .get(&uid)
            .ok_or(EcsError::EntityNotFound(uid))?;
        let Some(data) = self.events.get(&event) else {
            return Ok(());
        };
        data.check_shape(shape)?;
        if data.component_event {
            return Err(EcsError::ComponentEventRaisedLocally(data.name));
        }

        let indices: SmallVec<[CompIdx; 8]> = table.components(event).collect();
        let mut targets = Targets::new();
        for idx in indices {
            let Some(component) = world.storage.get_live(idx, uid) else {
                continue;
            };
            if let Some(registration) = self.directed_registration(idx, event) {
                targets.push(Target::Directed {
                    registration,
                    component: Rc::clone(component),
                });
            }
        }
        if broadcast {
            collect_broadcast(data, EventSource::LOCAL, &mut targets);
        }

        run(world, uid, data, targets, payload, true)
    }

    pub(crate) fn raise_broadcast(
        &self,
        world: &mut World,
        source: EventSource,
        event: TypeId,
        payload: &mut dyn Any,
        shape: EventShape,
    ) -> EcsResult<()> {
        let Some(data) = self.events.get(&event) else {
            return Ok(());
        };
        data.check_shape(shape)?;

        let mut targets = Targets::new();
        collect_broadcast(data, source, &mut targets);
        run(world, EntityUid::INVALID, data, targets, payload, true)
    }

    pub(crate) fn raise_at_component(
        &self,
        world: &mut World,
        component: &ErasedRc,
        event: TypeId,
        payload: &mut dyn Any,
        shape: EventShape,
    ) -> EcsResult<()> {
        let Some(data) = self.events.get(&event) else {
            return Ok(());
        };
        data.check_shape(shape)?;
        let Some(registration) = self
            .registry()
            .try_registration_by_type_id(component.component_type_id())
        else {
            return Err(EcsError::UnregisteredType(component.type_name()));
        };

        let mut targets = Targets::new();
        for idx in registration.indices() {
            if let Some(directed) = self.directed_registration(idx, event) {
                targets.push(Target::Directed {
                    registration: directed,
                    component: Rc::clone(component),
                });
            }
        }

        run(world, component.meta().owner(), data, targets, payload, false)
    }
}

fn collect_broadcast<'b>(data: &'b EventData, source: EventSource, targets: &mut Targets<'b>) {
    targets.extend(
        data.broadcast
            .iter()
            .filter(|registration| registration.source.intersects(source))
            .map(Target::Broadcast),
    );
}

fn run(
    world: &mut World,
    uid: EntityUid,
    data: &EventData,
    mut targets: Targets<'_>,
    payload: &mut dyn Any,
    skip_deleted: bool,
) -> EcsResult<()> {
    if data.ordered {
        targets.sort_by_key(Target::sort_key);
    }

    for target in &targets {
        match target {
            Target::Directed {
                registration,
                component,
            } => {
                if skip_deleted && component.meta().life_stage().is_deleted() {
                    continue;
                }
                (registration.handler)(world, uid, component, &mut *payload)?;
            }
            Target::Broadcast(registration) => (registration.handler)(world, &mut *payload)?,
        }
    }
    Ok(())
}

impl World {
    /// Raise a by-value event at every subscribed component of `uid`
    ///
    /// With `broadcast` set, local broadcast handlers run as well.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotFound`] for an unknown entity
    /// - [`EcsError::EventShapeMismatch`] if `E` is delivered by reference;
    ///   no handler runs in that case
    /// - any error from a handler's component borrow
    pub fn raise_local_event<E: Event>(
        &mut self,
        uid: EntityUid,
        event: E,
        broadcast: bool,
    ) -> EcsResult<()> {
        let mut event = event;
        let bus = Rc::clone(&self.bus);
        bus.raise_directed(
            self,
            uid,
            TypeId::of::<E>(),
            &mut event,
            EventShape::ByValue,
            broadcast,
        )
    }

    /// Raise a by-reference event at every subscribed component of `uid`
    ///
    /// Handler mutations are visible in `event` afterwards.
    pub fn raise_local_event_ref<E: Event>(
        &mut self,
        uid: EntityUid,
        event: &mut E,
        broadcast: bool,
    ) -> EcsResult<()> {
        let bus = Rc::clone(&self.bus);
        bus.raise_directed(self, uid, TypeId::of::<E>(), event, EventShape::ByRef, broadcast)
    }

    /// Raise a by-value broadcast event
    pub fn raise_event<E: Event>(&mut self, source: EventSource, event: E) -> EcsResult<()> {
        let mut event = event;
        let bus = Rc::clone(&self.bus);
        bus.raise_broadcast(self, source, TypeId::of::<E>(), &mut event, EventShape::ByValue)
    }

    /// Raise a by-reference broadcast event
    pub fn raise_event_ref<E: Event>(&mut self, source: EventSource, event: &mut E) -> EcsResult<()> {
        let bus = Rc::clone(&self.bus);
        bus.raise_broadcast(self, source, TypeId::of::<E>(), event, EventShape::ByRef)
    }

    /// Raise a by-value event at one component only
    pub fn raise_component_event<C: Component, E: Event>(
        &mut self,
        component: &ComponentHandle<C>,
        event: E,
    ) -> EcsResult<()> {
        let mut event = event;
        self.raise_at_erased(&component.erased(), &mut event, EventShape::ByValue)
    }

    /// Raise a by-reference event at one component only
    pub fn raise_component_event_ref<C: Component, E: Event>(
        &mut self,
        component: &ComponentHandle<C>,
        event: &mut E,
    ) -> EcsResult<()> {
        self.raise_at_erased(&component.erased(), event, EventShape::ByRef)
    }

    pub(crate) fn raise_at_erased<E: Event>(
        &mut self,
        component: &ErasedRc,
        event: &mut E,
        shape: EventShape,
    ) -> EcsResult<()> {
        let bus = Rc::clone(&self.bus);
        bus.raise_at_component(self, component, TypeId::of::<E>(), event, shape)
    }

    /// Queue a by-value broadcast event for [`process_event_queue`](Self::process_event_queue)
    pub fn queue_event<E: Event>(&mut self, source: EventSource, event: E) {
        self.event_queue.push_back(QueuedEvent {
            source,
            event: TypeId::of::<E>(),
            name: type_name::<E>(),
            payload: Box::new(event),
        });
    }

    /// Number of queued events
    pub fn queued_events(&self) -> usize {
        self.event_queue.len()
    }

    /// Deliver queued events in FIFO order
    ///
    /// Events queued by handlers during processing are delivered in the
    /// same pass. Returns the number of events delivered.
    ///
    /// A failed delivery stops processing. That event is dropped and logged;
    /// the events behind it stay queued for the next call.
    pub fn process_event_queue(&mut self) -> EcsResult<usize> {
        let bus = Rc::clone(&self.bus);
        let mut delivered = 0;
        while let Some(mut queued) = self.event_queue.pop_front() {
            if let Err(err) = bus.raise_broadcast(
                self,
                queued.source,
                queued.event,
                &mut *queued.payload,
                EventShape::ByValue,
            ) {
                tracing::error!(
                    event = queued.name,
                    error = %err,
                    delivered,
                    remaining = self.event_queue.len(),
                    "dropping queued event after failed delivery"
                );
                return Err(err);
            }
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Ask subscribed handlers for a component's replicated state
    ///
    /// Returns `None` if a handler vetoed the attempt or nobody produced a
    /// state.
    pub fn component_state<C: Component>(
        &mut self,
        component: &ComponentHandle<C>,
    ) -> EcsResult<Option<Box<dyn Any>>> {
        let mut attempt = ComponentGetStateAttempt::default();
        self.raise_component_event_ref(component, &mut attempt)?;
        if attempt.cancelled {
            return Ok(None);
        }

        let mut get_state = ComponentGetState::default();
        self.raise_component_event_ref(component, &mut get_state)?;
        Ok(get_state.state)
    }
}
