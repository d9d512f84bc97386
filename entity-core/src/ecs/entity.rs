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
//! Entity handles
//!
//! Entities are opaque identifiers that tie components together. The zero
//! handle is reserved and denotes "no entity".

use std::fmt;

/// Unique identifier for an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EntityUid(u32);

impl EntityUid {
    /// The invalid handle
    pub const INVALID: EntityUid = EntityUid(0);

    /// Create a handle from a raw value
    pub const fn new(id: u32) -> Self {
        EntityUid(id)
    }

    /// Get the raw value
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// Whether this handle can refer to an entity at all
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for EntityUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Stage of an entity in its own lifetime
///
/// Components attached to an entity are driven to match: components added
/// after `Initializing` are initialized immediately, and components added
/// after `Started` are started immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityLifeStage {
    /// Allocated, components may be attached
    PreInit,
    /// Components are being initialized
    Initializing,
    /// All components initialized
    Initialized,
    /// All components started
    Started,
    /// Being torn down
    Terminating,
}

/// Simulation tick used for creation and modification markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GameTick(pub u32);

impl GameTick {
    /// The tick after this one
    pub fn next(self) -> GameTick {
        GameTick(self.0.wrapping_add(1))
    }
}
