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
//! Component lifecycle
//!
//! Every component moves through a fixed sequence of stages:
//!
//! ```text
//! PreAdd -> Adding -> Added -> Initializing -> Initialized -> Starting
//!        -> Running -> Stopping -> Stopped -> Removing -> Deleted
//! ```
//!
//! Entering an `-ing` stage raises the matching component event
//! ([`ComponentAdd`], [`ComponentInit`], [`ComponentStartup`],
//! [`ComponentShutdown`], [`ComponentRemove`]) at that component only. A
//! component that never started goes straight to `Stopped` without a
//! shutdown event. Any other out-of-order transition is an error.
//!
//! A step always leaves its `-ing` stage, even when a handler fails; the
//! error is returned afterwards. A component removed by one of its own
//! handlers has already moved past the stage and is left where it is.

use crate::ecs::component::ErasedRc;
use crate::ecs::components::TransformComponent;
use crate::ecs::{ComponentLifeStage, EntityLifeStage, EntityUid, World};
use crate::error::{EcsError, EcsResult};
use crate::events::{
    ComponentAdd, ComponentInit, ComponentRemove, ComponentShutdown, ComponentStartup, Event,
    EventShape,
};
use std::any::TypeId;

use ComponentLifeStage::*;

fn transition(
    component: &ErasedRc,
    allowed: &[ComponentLifeStage],
    to: ComponentLifeStage,
) -> EcsResult<()> {
    let from = component.meta().life_stage();
    if !allowed.contains(&from) {
        tracing::error!(
            component = component.type_name(),
            owner = %component.meta().owner(),
            ?from,
            ?to,
            "illegal component life stage transition"
        );
        return Err(EcsError::LifeStageViolation {
            component: component.type_name(),
            from,
            to,
        });
    }

    tracing::trace!(component = component.type_name(), ?from, ?to, "life stage");
    component.meta().set_life_stage(to);
    Ok(())
}

/// Leave `during` for `after` unless a nested call already moved on
fn finish(
    component: &ErasedRc,
    during: ComponentLifeStage,
    after: ComponentLifeStage,
) -> EcsResult<()> {
    if component.meta().life_stage() != during {
        return Ok(());
    }
    transition(component, &[during], after)
}

impl World {
    fn step<E: Event + Default>(
        &mut self,
        component: &ErasedRc,
        allowed: &[ComponentLifeStage],
        during: ComponentLifeStage,
        after: ComponentLifeStage,
    ) -> EcsResult<()> {
        transition(component, allowed, during)?;
        let raised = self.raise_at_erased(component, &mut E::default(), EventShape::ByValue);
        finish(component, during, after)?;
        raised
    }

    pub(crate) fn life_add_to_entity(&mut self, component: &ErasedRc) -> EcsResult<()> {
        transition(component, &[PreAdd], Adding)?;
        component.meta().set_creation_tick(self.current_tick());
        component.meta().set_last_modified_tick(self.current_tick());
        let raised = self.raise_at_erased(component, &mut ComponentAdd, EventShape::ByValue);
        finish(component, Adding, Added)?;
        raised
    }

    pub(crate) fn life_initialize(&mut self, component: &ErasedRc) -> EcsResult<()> {
        self.step::<ComponentInit>(component, &[Added], Initializing, Initialized)
    }

    pub(crate) fn life_startup(&mut self, component: &ErasedRc) -> EcsResult<()> {
        self.step::<ComponentStartup>(component, &[Initialized], Starting, Running)
    }

    pub(crate) fn life_shutdown(&mut self, component: &ErasedRc) -> EcsResult<()> {
        self.step::<ComponentShutdown>(component, &[Starting, Running], Stopping, Stopped)
    }

    /// Stop a component that never started, without a shutdown event
    pub(crate) fn life_skip_to_stopped(&mut self, component: &ErasedRc) -> EcsResult<()> {
        transition(component, &[Adding, Added, Initializing, Initialized], Stopped)
    }

    pub(crate) fn life_remove_from_entity(&mut self, component: &ErasedRc) -> EcsResult<()> {
        self.step::<ComponentRemove>(component, &[Stopped], Removing, Deleted)
    }

    /// Bring a component to `Stopped` from wherever it is
    ///
    /// `-ing` stages are only seen from inside the component's own handlers.
    pub(crate) fn life_stop(&mut self, component: &ErasedRc) -> EcsResult<()> {
        match component.meta().life_stage() {
            Starting | Running => self.life_shutdown(component),
            Adding | Added | Initializing | Initialized => self.life_skip_to_stopped(component),
            Stopping => transition(component, &[Stopping], Stopped),
            Stopped => Ok(()),
            _ => transition(component, &[Stopped], Stopped),
        }
    }

    /// Initialize every component of a freshly built entity
    ///
    /// Components are initialized in the order they were added, which puts
    /// metadata and transform first. An entity left `Initializing` by a
    /// failed call picks up where it stopped.
    pub fn initialize_all(&mut self, uid: EntityUid) -> EcsResult<()> {
        if self.entity_life_stage(uid) != Some(EntityLifeStage::Initializing) {
            self.expect_entity_stage(uid, EntityLifeStage::PreInit)?;
            self.set_entity_stage(uid, EntityLifeStage::Initializing);
        }

        let components: Vec<ErasedRc> = self.storage.entity_components(uid).to_vec();
        for component in &components {
            if component.meta().life_stage() == Added {
                self.life_initialize(component)?;
            }
        }

        self.set_entity_stage(uid, EntityLifeStage::Initialized);
        Ok(())
    }

    /// Start every initialized component of an entity, transform first
    pub fn start_all(&mut self, uid: EntityUid) -> EcsResult<()> {
        self.expect_entity_stage(uid, EntityLifeStage::Initialized)?;

        let mut components: Vec<ErasedRc> = self.storage.entity_components(uid).to_vec();
        if let Some(position) = components
            .iter()
            .position(|c| c.component_type_id() == TypeId::of::<TransformComponent>())
        {
            let transform = components.remove(position);
            components.insert(0, transform);
        }

        for component in &components {
            if component.meta().life_stage() == Initialized {
                self.life_startup(component)?;
            }
        }

        self.set_entity_stage(uid, EntityLifeStage::Started);
        Ok(())
    }

    /// Initialize and then start an entity
    pub fn initialize_and_start(&mut self, uid: EntityUid) -> EcsResult<()> {
        self.initialize_all(uid)?;
        self.start_all(uid)
    }
}
