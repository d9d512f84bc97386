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
//! World configuration
//!
//! Settings that shape how a [`World`](crate::ecs::World) allocates entity
//! handles and event tables and how strictly it reacts to errors during
//! entity teardown.

/// Environment variable enabling exception-tolerant teardown
pub const EXCEPTION_TOLERANCE_ENV: &str = "ENTITY_CORE_EXCEPTION_TOLERANCE";

/// Environment variable overriding the initial event table capacity
pub const EVENT_TABLE_CAPACITY_ENV: &str = "ENTITY_CORE_EVENT_TABLE_CAPACITY";

/// Configuration for a world instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldConfig {
    /// Log and continue when removing a component fails during entity teardown
    pub exception_tolerance: bool,
    /// Initial slot count of every entity's event table
    pub event_table_capacity: usize,
    /// First entity uid handed out (0 is reserved as invalid)
    pub first_entity_uid: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            exception_tolerance: false,
            event_table_capacity: 8,
            first_entity_uid: 1,
        }
    }
}

impl WorldConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from the defaults overridden by the environment
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var(EXCEPTION_TOLERANCE_ENV) {
            match parse_flag(&value) {
                Some(flag) => config.exception_tolerance = flag,
                None => tracing::warn!(
                    variable = EXCEPTION_TOLERANCE_ENV,
                    value = %value,
                    "ignoring unparseable flag"
                ),
            }
        }

        if let Ok(value) = std::env::var(EVENT_TABLE_CAPACITY_ENV) {
            match value.trim().parse::<usize>() {
                Ok(capacity) => config.event_table_capacity = capacity,
                Err(_) => tracing::warn!(
                    variable = EVENT_TABLE_CAPACITY_ENV,
                    value = %value,
                    "ignoring unparseable capacity"
                ),
            }
        }

        config
    }

    /// Enable exception-tolerant teardown
    pub fn with_exception_tolerance(mut self) -> Self {
        self.exception_tolerance = true;
        self
    }

    /// Set the initial event table capacity
    pub fn with_event_table_capacity(mut self, capacity: usize) -> Self {
        self.event_table_capacity = capacity;
        self
    }

    /// Set the first entity uid
    pub fn with_first_entity_uid(mut self, uid: u32) -> Self {
        assert!(uid != 0, "Entity uid 0 is reserved");
        self.first_entity_uid = uid;
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorldConfig::default();
        assert!(!config.exception_tolerance);
        assert_eq!(config.event_table_capacity, 8);
        assert_eq!(config.first_entity_uid, 1);
    }

    #[test]
    fn test_builder_methods() {
        let config = WorldConfig::new()
            .with_exception_tolerance()
            .with_event_table_capacity(2)
            .with_first_entity_uid(100);
        assert!(config.exception_tolerance);
        assert_eq!(config.event_table_capacity, 2);
        assert_eq!(config.first_entity_uid, 100);
    }

    #[test]
    #[should_panic(expected = "reserved")]
    fn test_zero_uid_rejected() {
        let _ = WorldConfig::new().with_first_entity_uid(0);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
