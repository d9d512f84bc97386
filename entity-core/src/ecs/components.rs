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
//! Built-in protected components
//!
//! Every live entity carries exactly one [`MetaDataComponent`] and one
//! [`TransformComponent`]. They are attached first when the entity is
//! spawned, removed last when it is destroyed, and cannot be removed through
//! the ordinary removal path.

use crate::ecs::{Component, EntityUid};

/// Descriptive data and the pause flag of an entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaDataComponent {
    /// Display name
    pub entity_name: String,
    /// Free-form description
    pub entity_description: String,
    /// Paused entities are skipped by default queries
    pub entity_paused: bool,
}

impl Component for MetaDataComponent {
    fn networked() -> bool {
        true
    }
}

/// Minimal spatial anchor of an entity
///
/// Spatial queries live outside the core; this only carries the data
/// other collaborators build on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformComponent {
    /// Parent entity, invalid for roots
    pub parent: EntityUid,
    /// Position relative to the parent
    pub local_position: [f32; 2],
    /// Rotation relative to the parent, in radians
    pub local_rotation: f32,
}

impl Component for TransformComponent {
    fn networked() -> bool {
        true
    }
}
