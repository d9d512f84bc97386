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
//! Component traits, metadata and handles
//!
//! Components are plain data attached to exactly one entity. Storage keeps
//! each instance in a shared cell next to its bookkeeping ([`ComponentMeta`]):
//! life stage, owner, tick markers and replication flag. Callers and event
//! handlers reach instances through cheap [`ComponentHandle`] clones.

use crate::ecs::{EntityUid, GameTick};
use crate::error::{EcsError, EcsResult};
use std::any::{Any, TypeId};
use std::cell::{BorrowError, BorrowMutError, Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// Upcast helper for trait objects
pub trait AsAny {
    /// Borrow as `&dyn Any`
    fn as_any(&self) -> &dyn Any;
    /// Borrow as `&mut dyn Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Trait that all components must implement
///
/// The associated functions tune registration: `name_override` replaces the
/// name derived from the type name, and `networked` opts the type into
/// network id assignment and replication tracking.
pub trait Component: AsAny + 'static {
    /// Registered name to use instead of the derived one
    fn name_override() -> Option<&'static str>
    where
        Self: Sized,
    {
        None
    }

    /// Whether instances replicate over the network
    fn networked() -> bool
    where
        Self: Sized,
    {
        false
    }
}

impl dyn Component {
    /// Downcast to a concrete component type
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        AsAny::as_any(self).downcast_ref::<T>()
    }

    /// Mutably downcast to a concrete component type
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        AsAny::as_any_mut(self).downcast_mut::<T>()
    }

    /// Whether the component is of type `T`
    pub fn is<T: Component>(&self) -> bool {
        AsAny::as_any(self).is::<T>()
    }
}

/// Life stage of a component instance
///
/// Stages only ever move forward. Each `-ing` stage fires one lifecycle
/// event before the component settles in the following stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComponentLifeStage {
    /// Constructed, not attached
    PreAdd,
    /// Firing the add event
    Adding,
    /// Attached to its owner
    Added,
    /// Firing the init event
    Initializing,
    /// Initialized
    Initialized,
    /// Firing the startup event
    Starting,
    /// Running
    Running,
    /// Firing the shutdown event
    Stopping,
    /// Stopped
    Stopped,
    /// Firing the remove event
    Removing,
    /// Removed, waiting to be culled
    Deleted,
}

impl ComponentLifeStage {
    /// Initialization has at least begun
    pub fn is_initialized(self) -> bool {
        self >= ComponentLifeStage::Initializing
    }

    /// Started and not yet shut down
    pub fn is_running(self) -> bool {
        matches!(
            self,
            ComponentLifeStage::Starting | ComponentLifeStage::Running
        )
    }

    /// Removal has at least begun
    pub fn is_deleted(self) -> bool {
        self >= ComponentLifeStage::Removing
    }
}

/// Bookkeeping stored next to every component instance
#[derive(Debug)]
pub struct ComponentMeta {
    stage: Cell<ComponentLifeStage>,
    owner: Cell<EntityUid>,
    creation_tick: Cell<GameTick>,
    last_modified_tick: Cell<GameTick>,
    networked: Cell<bool>,
    pending_delete: Cell<bool>,
}

impl ComponentMeta {
    fn new(networked: bool) -> Self {
        ComponentMeta {
            stage: Cell::new(ComponentLifeStage::PreAdd),
            owner: Cell::new(EntityUid::INVALID),
            creation_tick: Cell::new(GameTick::default()),
            last_modified_tick: Cell::new(GameTick::default()),
            networked: Cell::new(networked),
            pending_delete: Cell::new(false),
        }
    }

    /// Current life stage
    pub fn life_stage(&self) -> ComponentLifeStage {
        self.stage.get()
    }

    /// Owning entity, invalid until the component is added
    pub fn owner(&self) -> EntityUid {
        self.owner.get()
    }

    /// Tick at which the component was added
    pub fn creation_tick(&self) -> GameTick {
        self.creation_tick.get()
    }

    /// Tick of the last recorded modification
    pub fn last_modified_tick(&self) -> GameTick {
        self.last_modified_tick.get()
    }

    /// Whether the component replicates
    pub fn networked(&self) -> bool {
        self.networked.get()
    }

    /// Whether the component was modified at or after `tick`
    pub fn is_dirty_since(&self, tick: GameTick) -> bool {
        self.networked.get() && self.last_modified_tick.get() >= tick
    }

    pub(crate) fn set_life_stage(&self, stage: ComponentLifeStage) {
        self.stage.set(stage);
    }

    pub(crate) fn set_owner(&self, owner: EntityUid) {
        self.owner.set(owner);
    }

    pub(crate) fn set_creation_tick(&self, tick: GameTick) {
        self.creation_tick.set(tick);
    }

    pub(crate) fn set_last_modified_tick(&self, tick: GameTick) {
        self.last_modified_tick.set(tick);
    }

    pub(crate) fn pending_delete(&self) -> bool {
        self.pending_delete.get()
    }

    pub(crate) fn set_pending_delete(&self, pending: bool) {
        self.pending_delete.set(pending);
    }
}

/// A component value with its bookkeeping
pub(crate) struct ComponentBox<T> {
    pub(crate) meta: ComponentMeta,
    pub(crate) value: RefCell<T>,
}

/// Type-erased view of a stored component
pub(crate) trait ErasedComponent: Any {
    fn meta(&self) -> &ComponentMeta;
    fn erased_any(&self) -> &dyn Any;
    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any>;
    fn component_type_id(&self) -> TypeId;
    fn type_name(&self) -> &'static str;
    fn try_borrow_component(&self) -> Result<Ref<'_, dyn Component>, BorrowError>;
    fn try_borrow_component_mut(&self) -> Result<RefMut<'_, dyn Component>, BorrowMutError>;
}

impl<T: Component> ErasedComponent for ComponentBox<T> {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn erased_any(&self) -> &dyn Any {
        self
    }

    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }

    fn component_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn try_borrow_component(&self) -> Result<Ref<'_, dyn Component>, BorrowError> {
        self.value
            .try_borrow()
            .map(|value| Ref::map(value, |v| v as &dyn Component))
    }

    fn try_borrow_component_mut(&self) -> Result<RefMut<'_, dyn Component>, BorrowMutError> {
        self.value
            .try_borrow_mut()
            .map(|value| RefMut::map(value, |v| v as &mut dyn Component))
    }
}

pub(crate) type ErasedRc = Rc<dyn ErasedComponent>;

/// Factory function producing a default instance of a registered type
pub(crate) type ComponentConstructor = fn() -> ErasedRc;

pub(crate) fn construct<T: Component + Default>() -> ErasedRc {
    Rc::new(ComponentBox {
        meta: ComponentMeta::new(T::networked()),
        value: RefCell::new(T::default()),
    })
}

/// Shared handle to a component instance of type `T`
///
/// Handles stay valid after the component is removed; check
/// [`is_deleted`](Self::is_deleted) before trusting the data.
pub struct ComponentHandle<T: Component> {
    inner: Rc<ComponentBox<T>>,
}

impl<T: Component> ComponentHandle<T> {
    /// Wrap a fresh, unattached component
    pub fn new(value: T) -> Self {
        ComponentHandle {
            inner: Rc::new(ComponentBox {
                meta: ComponentMeta::new(T::networked()),
                value: RefCell::new(value),
            }),
        }
    }

    pub(crate) fn from_erased(erased: ErasedRc) -> Option<Self> {
        erased
            .into_any_rc()
            .downcast::<ComponentBox<T>>()
            .ok()
            .map(|inner| ComponentHandle { inner })
    }

    pub(crate) fn erased(&self) -> ErasedRc {
        self.inner.clone()
    }

    /// Immutably borrow the component data
    ///
    /// # Panics
    ///
    /// Panics if the component is mutably borrowed, for example by the
    /// handler currently receiving it.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.inner.value.borrow()
    }

    /// Mutably borrow the component data
    ///
    /// # Panics
    ///
    /// Panics if the component is already borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.inner.value.borrow_mut()
    }

    /// Immutably borrow without panicking
    pub fn try_borrow(&self) -> EcsResult<Ref<'_, T>> {
        self.inner
            .value
            .try_borrow()
            .map_err(|_| EcsError::ComponentBorrowed(std::any::type_name::<T>()))
    }

    /// Mutably borrow without panicking
    pub fn try_borrow_mut(&self) -> EcsResult<RefMut<'_, T>> {
        self.inner
            .value
            .try_borrow_mut()
            .map_err(|_| EcsError::ComponentBorrowed(std::any::type_name::<T>()))
    }

    /// Bookkeeping for this instance
    pub fn meta(&self) -> &ComponentMeta {
        &self.inner.meta
    }

    /// Owning entity
    pub fn owner(&self) -> EntityUid {
        self.inner.meta.owner()
    }

    /// Current life stage
    pub fn life_stage(&self) -> ComponentLifeStage {
        self.inner.meta.life_stage()
    }

    /// Whether removal has begun
    pub fn is_deleted(&self) -> bool {
        self.life_stage().is_deleted()
    }

    /// Whether the component is started and not shut down
    pub fn is_running(&self) -> bool {
        self.life_stage().is_running()
    }

    /// Whether both handles point at the same instance
    pub fn ptr_eq(&self, other: &ComponentHandle<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Component> Clone for ComponentHandle<T> {
    fn clone(&self) -> Self {
        ComponentHandle {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Component> fmt::Debug for ComponentHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("type", &std::any::type_name::<T>())
            .field("meta", &self.inner.meta)
            .finish()
    }
}

/// Handle to a component whose type is not known statically
#[derive(Clone)]
pub struct AnyComponentHandle {
    inner: ErasedRc,
}

impl AnyComponentHandle {
    pub(crate) fn new(inner: ErasedRc) -> Self {
        AnyComponentHandle { inner }
    }

    /// Bookkeeping for this instance
    pub fn meta(&self) -> &ComponentMeta {
        self.inner.meta()
    }

    /// Rust type name of the component
    pub fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    /// Type id of the component
    pub fn component_type_id(&self) -> TypeId {
        self.inner.component_type_id()
    }

    /// Whether the component is of type `T`
    pub fn is<T: Component>(&self) -> bool {
        self.component_type_id() == TypeId::of::<T>()
    }

    /// Recover a typed handle
    pub fn downcast<T: Component>(&self) -> Option<ComponentHandle<T>> {
        ComponentHandle::from_erased(self.inner.clone())
    }

    /// Borrow the data as a trait object
    pub fn try_borrow(&self) -> EcsResult<Ref<'_, dyn Component>> {
        self.inner
            .try_borrow_component()
            .map_err(|_| EcsError::ComponentBorrowed(self.inner.type_name()))
    }

    /// Mutably borrow the data as a trait object
    pub fn try_borrow_mut(&self) -> EcsResult<RefMut<'_, dyn Component>> {
        self.inner
            .try_borrow_component_mut()
            .map_err(|_| EcsError::ComponentBorrowed(self.inner.type_name()))
    }

    /// Whether both handles point at the same instance
    pub fn ptr_eq(&self, other: &AnyComponentHandle) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for AnyComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyComponentHandle")
            .field("type", &self.type_name())
            .field("meta", self.meta())
            .finish()
    }
}

impl<T: Component> From<ComponentHandle<T>> for AnyComponentHandle {
    fn from(handle: ComponentHandle<T>) -> Self {
        AnyComponentHandle::new(handle.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Health {
        value: i32,
    }

    impl Component for Health {}

    #[derive(Debug, Default)]
    struct Replicated;

    impl Component for Replicated {
        fn networked() -> bool {
            true
        }
    }

    #[test]
    fn test_handle_borrow() {
        let handle = ComponentHandle::new(Health { value: 5 });
        handle.borrow_mut().value += 1;
        assert_eq!(handle.borrow().value, 6);
        assert_eq!(handle.life_stage(), ComponentLifeStage::PreAdd);
        assert!(!handle.owner().is_valid());
    }

    #[test]
    fn test_try_borrow_conflict() {
        let handle = ComponentHandle::new(Health::default());
        let guard = handle.borrow_mut();
        assert!(matches!(
            handle.try_borrow(),
            Err(EcsError::ComponentBorrowed(_))
        ));
        drop(guard);
        assert!(handle.try_borrow_mut().is_ok());
    }

    #[test]
    fn test_erased_roundtrip() {
        let handle = ComponentHandle::new(Health { value: 9 });
        let any: AnyComponentHandle = handle.clone().into();
        assert!(any.is::<Health>());
        assert!(any.downcast::<Replicated>().is_none());

        let back = any.downcast::<Health>().unwrap();
        assert!(back.ptr_eq(&handle));

        let data = any.try_borrow().unwrap();
        assert_eq!(data.downcast_ref::<Health>(), Some(&Health { value: 9 }));
    }

    #[test]
    fn test_constructor_defaults() {
        let erased = construct::<Replicated>();
        assert!(erased.meta().networked());
        assert_eq!(erased.component_type_id(), TypeId::of::<Replicated>());

        let erased = construct::<Health>();
        assert!(!erased.meta().networked());
    }

    #[test]
    fn test_stage_predicates() {
        use ComponentLifeStage::*;
        assert!(!Added.is_initialized());
        assert!(Initializing.is_initialized());
        assert!(Starting.is_running());
        assert!(Running.is_running());
        assert!(!Stopping.is_running());
        assert!(Removing.is_deleted());
        assert!(!Stopped.is_deleted());
    }

    #[test]
    fn test_dirty_tracking() {
        let erased = construct::<Replicated>();
        erased.meta().set_last_modified_tick(GameTick(4));
        assert!(erased.meta().is_dirty_since(GameTick(4)));
        assert!(!erased.meta().is_dirty_since(GameTick(5)));
    }
}
