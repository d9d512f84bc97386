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
//! Event bus
//!
//! Events are plain Rust types implementing [`Event`]. Handlers are
//! registered on a [`BusBuilder`], which is sealed into an immutable
//! [`EventBus`] before the world starts simulating.
//!
//! Two routing shapes exist:
//!
//! - **Broadcast** handlers subscribe to an event type and an
//!   [`EventSource`] mask and see every matching raise.
//! - **Directed** handlers subscribe to a (component type, event type) pair
//!   and only see raises aimed at an entity that currently has that
//!   component.
//!
//! Each event type is delivered either by value (handlers get `&E`) or by
//! reference (handlers get `&mut E` and see earlier handlers' changes). The
//! first subscription fixes the shape; mixing the two is an error.

mod bus;
mod dispatch;
mod ordering;
mod table;

pub use bus::{BusBuilder, EventBus};
pub(crate) use dispatch::QueuedEvent;
pub use ordering::{topological_sort, HandlerOrder, OrderKey, OrderingResolver, ResolvedOrder};
pub use table::EventTable;

use std::any::Any;
use std::fmt;
use std::ops::BitOr;

/// Trait implemented by every event payload
pub trait Event: 'static {
    /// Delivery shape fixed by the type itself, if any
    ///
    /// Subscriptions with a different shape are rejected up front.
    fn shape() -> Option<EventShape> {
        None
    }

    /// Whether the event is only ever raised at one known component
    ///
    /// Component events skip the per-entity event tables entirely.
    fn component_event() -> bool {
        false
    }
}

/// How handlers receive an event payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventShape {
    /// Handlers receive `&E`
    ByValue,
    /// Handlers receive `&mut E`
    ByRef,
}

impl EventShape {
    pub(crate) fn from_by_ref(by_ref: bool) -> Self {
        if by_ref {
            EventShape::ByRef
        } else {
            EventShape::ByValue
        }
    }
}

/// Origin mask for broadcast events
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventSource(u8);

impl EventSource {
    /// Matches nothing
    pub const NONE: EventSource = EventSource(0);
    /// Raised by local simulation
    pub const LOCAL: EventSource = EventSource(1);
    /// Received from the network
    pub const NETWORK: EventSource = EventSource(1 << 1);
    /// Both origins
    pub const ALL: EventSource = EventSource(Self::LOCAL.0 | Self::NETWORK.0);

    /// Whether every bit of `other` is set
    pub fn contains(self, other: EventSource) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any bit is shared
    pub fn intersects(self, other: EventSource) -> bool {
        self.0 & other.0 != 0
    }

    /// Whether no bit is set
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for EventSource {
    type Output = EventSource;

    fn bitor(self, rhs: EventSource) -> EventSource {
        EventSource(self.0 | rhs.0)
    }
}

impl fmt::Debug for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            EventSource::NONE => write!(f, "EventSource(None)"),
            EventSource::LOCAL => write!(f, "EventSource(Local)"),
            EventSource::NETWORK => write!(f, "EventSource(Network)"),
            EventSource::ALL => write!(f, "EventSource(All)"),
            EventSource(bits) => write!(f, "EventSource({bits:#04b})"),
        }
    }
}

/// Identity of a broadcast subscriber, used for unsubscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(&'static str);

impl SubscriberId {
    /// Subscriber named after a type, usually the owning system
    pub fn of<S: ?Sized + 'static>() -> Self {
        SubscriberId(std::any::type_name::<S>())
    }

    /// Subscriber with an explicit name
    pub const fn named(name: &'static str) -> Self {
        SubscriberId(name)
    }

    /// The subscriber name
    pub fn name(&self) -> &'static str {
        self.0
    }
}

macro_rules! lifecycle_event {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl Event for $name {
            fn shape() -> Option<EventShape> {
                Some(EventShape::ByValue)
            }

            fn component_event() -> bool {
                true
            }
        }
    };
}

lifecycle_event!(
    /// Raised while a component enters `Adding`
    ComponentAdd
);
lifecycle_event!(
    /// Raised while a component enters `Initializing`
    ComponentInit
);
lifecycle_event!(
    /// Raised while a component enters `Starting`
    ComponentStartup
);
lifecycle_event!(
    /// Raised while a component enters `Stopping`
    ComponentShutdown
);
lifecycle_event!(
    /// Raised while a component enters `Removing`
    ComponentRemove
);

/// Asks handlers whether a component's state may be sent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentGetStateAttempt {
    /// Set by any handler to veto
    pub cancelled: bool,
}

impl Event for ComponentGetStateAttempt {
    fn shape() -> Option<EventShape> {
        Some(EventShape::ByRef)
    }

    fn component_event() -> bool {
        true
    }
}

/// Asks handlers to produce a component's replicated state
#[derive(Default)]
pub struct ComponentGetState {
    /// Filled in by the handler that owns the component's state
    pub state: Option<Box<dyn Any>>,
}

impl fmt::Debug for ComponentGetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentGetState")
            .field("has_state", &self.state.is_some())
            .finish()
    }
}

impl Event for ComponentGetState {
    fn shape() -> Option<EventShape> {
        Some(EventShape::ByRef)
    }

    fn component_event() -> bool {
        true
    }
}
