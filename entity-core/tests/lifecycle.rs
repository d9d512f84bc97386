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
//! Lifecycle tests
//!
//! Component stages, the events raised at each stage and entity-level
//! initialization, startup and teardown.

use entity_core::ecs::{ComponentLifeStage, ComponentRegistry, EntityLifeStage, World};
use entity_core::events::{
    BusBuilder, ComponentAdd, ComponentInit, ComponentRemove, ComponentShutdown,
    ComponentStartup, Event,
};
use entity_core::{Component, ComponentHandle, EcsError, EntityUid, WorldConfig};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

#[derive(Default)]
struct Sprite;
impl Component for Sprite {}

#[derive(Default)]
struct Physics;
impl Component for Physics {}

struct Expire;
impl Event for Expire {}

type Log = Rc<RefCell<Vec<String>>>;

fn registry() -> Arc<ComponentRegistry> {
    let mut registry = ComponentRegistry::new();
    registry.register::<Sprite>().unwrap();
    registry.register::<Physics>().unwrap();
    Arc::new(registry)
}

/// Bus that logs every lifecycle event of `Sprite` and `Physics`
fn logging_bus(log: &Log) -> BusBuilder {
    let mut bus = BusBuilder::new(registry());
    macro_rules! record {
        ($comp:ty, $event:ty, $label:literal) => {{
            let log = Rc::clone(log);
            bus.subscribe_local_event::<$comp, $event, _>(move |_, _, _, _| {
                log.borrow_mut().push($label.to_string())
            })
            .unwrap();
        }};
    }
    record!(Sprite, ComponentAdd, "sprite:add");
    record!(Sprite, ComponentInit, "sprite:init");
    record!(Sprite, ComponentStartup, "sprite:startup");
    record!(Sprite, ComponentShutdown, "sprite:shutdown");
    record!(Sprite, ComponentRemove, "sprite:remove");
    record!(Physics, ComponentStartup, "physics:startup");
    record!(Physics, ComponentShutdown, "physics:shutdown");
    bus
}

fn started_entity(world: &mut World) -> EntityUid {
    let e = world.spawn_entity().unwrap();
    world.initialize_and_start(e).unwrap();
    e
}

#[test]
fn test_stages_follow_entity_progress() {
    let log = Log::default();
    let mut world = World::new(logging_bus(&log).seal().unwrap());
    let e = world.spawn_entity().unwrap();

    let sprite = world.add_component(e, Sprite).unwrap();
    assert_eq!(sprite.life_stage(), ComponentLifeStage::Added);

    world.initialize_all(e).unwrap();
    assert_eq!(sprite.life_stage(), ComponentLifeStage::Initialized);

    world.start_all(e).unwrap();
    assert_eq!(sprite.life_stage(), ComponentLifeStage::Running);
    assert!(sprite.is_running());

    assert_eq!(
        *log.borrow(),
        vec!["sprite:add", "sprite:init", "sprite:startup"]
    );
}

#[test]
fn test_late_add_catches_up() {
    let log = Log::default();
    let mut world = World::new(logging_bus(&log).seal().unwrap());
    let e = started_entity(&mut world);

    let sprite = world.add_component(e, Sprite).unwrap();
    assert_eq!(sprite.life_stage(), ComponentLifeStage::Running);
    assert_eq!(
        *log.borrow(),
        vec!["sprite:add", "sprite:init", "sprite:startup"]
    );
}

#[test]
fn test_remove_before_start_skips_shutdown() {
    let log = Log::default();
    let mut world = World::new(logging_bus(&log).seal().unwrap());
    let e = world.spawn_entity().unwrap();
    let sprite = world.add_component(e, Sprite).unwrap();
    world.initialize_all(e).unwrap();

    world.remove_component::<Sprite>(e).unwrap();
    assert_eq!(sprite.life_stage(), ComponentLifeStage::Deleted);
    assert_eq!(
        *log.borrow(),
        vec!["sprite:add", "sprite:init", "sprite:remove"]
    );
}

#[test]
fn test_entity_stage_is_enforced() {
    let mut world = World::new(BusBuilder::new(registry()).seal().unwrap());
    let e = world.spawn_entity().unwrap();

    world.initialize_all(e).unwrap();
    assert!(matches!(
        world.initialize_all(e),
        Err(EcsError::EntityStage {
            stage: EntityLifeStage::Initialized,
            ..
        })
    ));
    assert_eq!(
        world.start_all(EntityUid::new(999)).unwrap_err(),
        EcsError::EntityNotFound(EntityUid::new(999))
    );
}

#[test]
fn test_handler_can_mutate_world_during_lifecycle() {
    let mut bus = BusBuilder::new(registry());
    bus.subscribe_local_event::<Sprite, ComponentStartup, _>(|world, uid, _, _| {
        world.ensure_component::<Physics>(uid).unwrap();
    })
    .unwrap();

    let mut world = World::new(bus.seal().unwrap());
    let e = started_entity(&mut world);
    world.add_component(e, Sprite).unwrap();

    let physics = world.get::<Physics>(e).unwrap();
    assert_eq!(physics.life_stage(), ComponentLifeStage::Running);
}

#[test]
fn test_delete_entity_disposes_protected_last() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let mut bus = BusBuilder::new(registry());
    {
        let order = Rc::clone(&order);
        bus.subscribe_local_event::<Sprite, ComponentRemove, _>(move |world, uid, _, _| {
            let metadata = world.metadata(uid).map(|m| m.life_stage());
            order.borrow_mut().push(metadata);
        })
        .unwrap();
    }

    let mut world = World::new(bus.seal().unwrap());
    let e = started_entity(&mut world);
    let sprite = world.add_component(e, Sprite).unwrap();
    let transform = world.transform(e).unwrap();

    world.delete_entity(e).unwrap();
    assert!(!world.entity_exists(e));
    assert!(sprite.is_deleted());
    assert!(transform.is_deleted());
    assert_eq!(*order.borrow(), vec![Ok(ComponentLifeStage::Running)]);
}

#[test]
fn test_teardown_failure_aborts_without_tolerance() {
    let log = Log::default();
    let mut world = World::new(logging_bus(&log).seal().unwrap());
    let e = started_entity(&mut world);
    let sprite = world.add_component(e, Sprite).unwrap();

    let guard = sprite.borrow_mut();
    assert!(matches!(
        world.delete_entity(e),
        Err(EcsError::ComponentBorrowed(_))
    ));
    drop(guard);
    assert!(world.entity_exists(e));
    assert_eq!(world.entity_life_stage(e), Some(EntityLifeStage::Terminating));
    assert_eq!(sprite.life_stage(), ComponentLifeStage::Stopped);

    // a second attempt picks up where the first one stopped
    world.delete_entity(e).unwrap();
    assert!(!world.entity_exists(e));
    assert!(sprite.is_deleted());
    assert_eq!(world.count::<Sprite>(), 0);
    assert_eq!(
        log.borrow().iter().filter(|l| *l == "sprite:remove").count(),
        1
    );
}

#[test]
fn test_teardown_failure_tolerated() {
    let log = Log::default();
    let bus = logging_bus(&log).seal().unwrap();
    let mut world = World::with_config(bus, WorldConfig::new().with_exception_tolerance());
    let e = started_entity(&mut world);
    let sprite = world.add_component(e, Sprite).unwrap();
    world.add_component(e, Physics).unwrap();

    let guard = sprite.borrow_mut();
    world.delete_entity(e).unwrap();
    drop(guard);

    assert!(!world.entity_exists(e));
    assert_eq!(world.count::<Sprite>(), 0);
    assert_eq!(world.count::<Physics>(), 0);
    assert!(log.borrow().contains(&"physics:shutdown".to_string()));
}

#[test]
fn test_failed_add_leaves_component_added() {
    let log = Log::default();
    let mut world = World::new(logging_bus(&log).seal().unwrap());
    let e = world.spawn_entity().unwrap();

    let sprite = ComponentHandle::new(Sprite);
    let guard = sprite.borrow_mut();
    assert!(matches!(
        world.add_component_instance(e, &sprite, false),
        Err(EcsError::ComponentBorrowed(_))
    ));
    drop(guard);

    assert_eq!(sprite.life_stage(), ComponentLifeStage::Added);
    assert!(world.has::<Sprite>(e));
    world.remove_component::<Sprite>(e).unwrap();
    assert!(sprite.is_deleted());
    assert_eq!(world.cull(), 1);
}

#[test]
fn test_failed_startup_can_be_retried() {
    let log = Log::default();
    let mut world = World::new(logging_bus(&log).seal().unwrap());
    let e = world.spawn_entity().unwrap();
    let sprite = world.add_component(e, Sprite).unwrap();
    world.initialize_all(e).unwrap();

    let guard = sprite.borrow_mut();
    assert!(world.start_all(e).is_err());
    drop(guard);

    // the step still completed, so the component is not stuck in Starting
    assert_eq!(sprite.life_stage(), ComponentLifeStage::Running);
    assert_eq!(world.entity_life_stage(e), Some(EntityLifeStage::Initialized));
    world.start_all(e).unwrap();
    assert_eq!(world.entity_life_stage(e), Some(EntityLifeStage::Started));

    world.remove_component::<Sprite>(e).unwrap();
    assert!(log.borrow().contains(&"sprite:shutdown".to_string()));
}

#[test]
fn test_handler_removes_its_own_component() {
    let log = Log::default();
    let removed = Rc::new(RefCell::new(Vec::new()));
    let mut bus = logging_bus(&log);
    {
        let removed = Rc::clone(&removed);
        bus.subscribe_local_event::<Sprite, Expire, _>(move |world, uid, _, _| {
            removed
                .borrow_mut()
                .push(world.remove_component::<Sprite>(uid).is_ok());
        })
        .unwrap();
    }

    let mut world = World::new(bus.seal().unwrap());
    let e = started_entity(&mut world);
    let sprite = world.add_component(e, Sprite).unwrap();

    world.raise_local_event(e, Expire, false).unwrap();
    assert_eq!(*removed.borrow(), vec![true]);
    assert_eq!(sprite.life_stage(), ComponentLifeStage::Deleted);
    assert!(!world.has::<Sprite>(e));

    // the sprite was busy in its own handler, so its lifecycle handlers were skipped
    assert!(!log.borrow().contains(&"sprite:shutdown".to_string()));
    assert_eq!(world.cull(), 1);

    world.add_component(e, Sprite).unwrap();
    assert_eq!(world.count::<Sprite>(), 1);
}
