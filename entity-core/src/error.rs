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
//! Error types for the entity core
//!
//! Every fallible operation in the crate returns [`EcsResult`]. The variants
//! group into structural-lock violations, invariant violations, not-found
//! conditions, unregistered types and ordering conflicts.

use crate::ecs::{ComponentLifeStage, EntityLifeStage, EntityUid};
use crate::events::EventShape;
use thiserror::Error;

/// Errors raised by the registry, storage, lifecycle and event bus
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Structural registration attempted after the registry was locked
    #[error("Component registry is locked; network ids have already been assigned")]
    RegistryLocked,

    /// A network id lookup happened before ids were assigned
    #[error("Network ids have not been assigned yet")]
    NetIdsNotAssigned,

    /// A type or name was registered twice
    #[error("Component '{0}' is already registered")]
    DuplicateRegistration(String),

    /// A name collides with the ignore list
    #[error("Component name '{0}' conflicts with the ignore list")]
    IgnoredName(String),

    /// A second ignore-missing suffix was supplied
    #[error("An ignore-missing suffix is already set: '{0}'")]
    IgnoreSuffixConflict(String),

    /// No component is registered under the name
    #[error("Unknown component name '{0}'")]
    UnknownComponent(String),

    /// No component is registered under the network id
    #[error("Unknown component network id {0}")]
    UnknownNetId(u16),

    /// The type was never registered with the component registry
    #[error("Type '{0}' is not a registered component or reference")]
    UnregisteredType(&'static str),

    /// Protected components cannot be aliased or unregistered
    #[error("Protected component '{0}' cannot be aliased or unregistered")]
    ProtectedType(&'static str),

    /// More networked types than network ids
    #[error("{0} networked component types exceed the network id range")]
    TooManyNetworked(usize),

    /// The entity does not exist
    #[error("{0} does not exist")]
    EntityNotFound(EntityUid),

    /// The entity has no such component
    #[error("{entity} has no '{component}' component")]
    ComponentNotFound {
        /// Entity that was searched
        entity: EntityUid,
        /// Component name
        component: String,
    },

    /// The component exists but has already been removed
    #[error("'{component}' on {entity} has been deleted")]
    ComponentDeleted {
        /// Owning entity
        entity: EntityUid,
        /// Component name
        component: String,
    },

    /// A component instance is owned by a different entity
    #[error("'{component}' is owned by {owner} and cannot be added to {entity}")]
    OwnershipViolation {
        /// Component name
        component: String,
        /// Current owner
        owner: EntityUid,
        /// Entity the add targeted
        entity: EntityUid,
    },

    /// A component of the same type is already attached
    #[error("{entity} already has a '{component}' component")]
    SlotOccupied {
        /// Entity that was targeted
        entity: EntityUid,
        /// Component name
        component: String,
    },

    /// Protected component removal without the override path
    #[error("'{component}' on {entity} is protected and requires the override path")]
    ProtectedComponent {
        /// Owning entity
        entity: EntityUid,
        /// Component name
        component: String,
    },

    /// A component life stage transition was attempted out of order
    #[error("Illegal life stage transition for '{component}': {from:?} -> {to:?}")]
    LifeStageViolation {
        /// Component type name
        component: &'static str,
        /// Stage the component was in
        from: ComponentLifeStage,
        /// Stage that was requested
        to: ComponentLifeStage,
    },

    /// An entity operation was attempted in the wrong entity stage
    #[error("{entity} is in stage {stage:?}, which does not allow this operation")]
    EntityStage {
        /// Target entity
        entity: EntityUid,
        /// Its current stage
        stage: EntityLifeStage,
    },

    /// By-value and by-reference use mixed for one event type
    #[error("Event '{event}' is delivered {expected:?} but was used {actual:?}")]
    EventShapeMismatch {
        /// Event type name
        event: &'static str,
        /// Shape fixed for the event type
        expected: EventShape,
        /// Shape of the offending subscription or raise
        actual: EventShape,
    },

    /// A component event was raised through an entity's event table
    #[error("Component event '{0}' can only be raised at a single component")]
    ComponentEventRaisedLocally(&'static str),

    /// The same handler target subscribed twice to one event
    #[error("'{target}' is already subscribed to '{event}'")]
    DuplicateSubscription {
        /// Component or subscriber name
        target: String,
        /// Event type name
        event: &'static str,
    },

    /// Before/after constraints form a cycle
    #[error("Circular ordering constraints for event '{event}'")]
    OrderingCycle {
        /// Event type name
        event: &'static str,
    },

    /// A handler could not borrow its component
    #[error("Component '{0}' is already borrowed")]
    ComponentBorrowed(&'static str),

    /// Two network manifests disagree
    #[error("Incompatible network manifest: {0}")]
    IncompatibleManifest(String),
}

/// Result type used throughout the crate
pub type EcsResult<T> = Result<T, EcsError>;
