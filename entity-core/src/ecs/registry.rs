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
//! Component registry and factory
//!
//! The registry maps component types to display names, dense indices,
//! reference aliases and optional network ids. It is built once, before
//! simulation starts. Assigning network ids locks it against further
//! structural changes so every process that registers the same types
//! agrees on the id table.
//!
//! # Naming
//!
//! A registration's name is derived from the Rust type name: the last path
//! segment, minus a trailing `Component` and a leading `Client`, `Server`
//! or `Shared` prefix. `SharedSpriteComponent` registers as `Sprite`.
//! [`Component::name_override`] replaces the derived name entirely.

use crate::ecs::component::{construct, ComponentConstructor, ErasedRc};
use crate::ecs::components::{MetaDataComponent, TransformComponent};
use crate::ecs::{CompIdx, Component, TypeIndexRegistry};
use crate::error::{EcsError, EcsResult};
use semver::Version;
use std::any::TypeId;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Version of the network manifest format
pub const MANIFEST_FORMAT_VERSION: &str = env!("CARGO_PKG_VERSION");

const SIDE_PREFIXES: [&str; 3] = ["Client", "Server", "Shared"];

/// Whether a name is known to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentAvailability {
    /// Registered
    Available,
    /// Intentionally absent from this deployment
    Ignore,
    /// Neither registered nor ignored
    Unknown,
}

/// Metadata describing one registered component type
#[derive(Debug, Clone)]
pub struct ComponentRegistration {
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    idx: CompIdx,
    aliases: Vec<CompIdx>,
    net_id: Option<u16>,
    networked: bool,
    protected: bool,
    constructor: ComponentConstructor,
}

impl ComponentRegistration {
    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type id of the concrete type
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name of the concrete type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Index of the concrete type
    pub fn idx(&self) -> CompIdx {
        self.idx
    }

    /// Reference indices this type is also reachable under
    pub fn aliases(&self) -> &[CompIdx] {
        &self.aliases
    }

    /// The concrete index followed by every alias index
    pub fn indices(&self) -> impl Iterator<Item = CompIdx> + '_ {
        std::iter::once(self.idx).chain(self.aliases.iter().copied())
    }

    /// Assigned network id
    pub fn net_id(&self) -> Option<u16> {
        self.net_id
    }

    /// Whether the type opted into replication
    pub fn networked(&self) -> bool {
        self.networked
    }

    /// Whether this is one of the protected per-entity components
    pub fn is_protected(&self) -> bool {
        self.protected
    }

    pub(crate) fn construct(&self) -> ErasedRc {
        (self.constructor)()
    }
}

/// Maps component types to names, indices and network ids
pub struct ComponentRegistry {
    types: TypeIndexRegistry,
    registrations: BTreeMap<CompIdx, ComponentRegistration>,
    by_type: HashMap<TypeId, CompIdx>,
    by_name: HashMap<String, CompIdx>,
    by_lower_name: HashMap<String, CompIdx>,
    by_net_id: Vec<CompIdx>,
    ignored: HashSet<String>,
    ignore_missing_suffix: Option<String>,
    locked: bool,
}

impl ComponentRegistry {
    /// Create a registry holding only the protected built-in components
    pub fn new() -> Self {
        let mut registry = ComponentRegistry {
            types: TypeIndexRegistry::new(),
            registrations: BTreeMap::new(),
            by_type: HashMap::new(),
            by_name: HashMap::new(),
            by_lower_name: HashMap::new(),
            by_net_id: Vec::new(),
            ignored: HashSet::new(),
            ignore_missing_suffix: None,
            locked: false,
        };
        registry.insert::<MetaDataComponent>(calculate_name::<MetaDataComponent>());
        registry.insert::<TransformComponent>(calculate_name::<TransformComponent>());
        registry
    }

    /// Register a component type
    ///
    /// # Errors
    ///
    /// - [`EcsError::RegistryLocked`] after network ids were assigned
    /// - [`EcsError::DuplicateRegistration`] if the type or its name (ignoring
    ///   case) is already registered
    /// - [`EcsError::IgnoredName`] if the name is on the ignore list
    pub fn register<T: Component + Default>(&mut self) -> EcsResult<&ComponentRegistration> {
        self.register_inner::<T>(false)
    }

    /// Register a component type, taking its name off the ignore list
    pub fn register_overwrite<T: Component + Default>(
        &mut self,
    ) -> EcsResult<&ComponentRegistration> {
        self.register_inner::<T>(true)
    }

    fn register_inner<T: Component + Default>(
        &mut self,
        overwrite: bool,
    ) -> EcsResult<&ComponentRegistration> {
        if self.locked {
            return Err(EcsError::RegistryLocked);
        }

        let name = calculate_name::<T>();
        if self.by_type.contains_key(&TypeId::of::<T>())
            || self.by_lower_name.contains_key(&name.to_lowercase())
        {
            return Err(EcsError::DuplicateRegistration(name));
        }

        if self.ignored.contains(&name) {
            if !overwrite {
                return Err(EcsError::IgnoredName(name));
            }
            self.ignored.remove(&name);
        }

        let idx = self.insert::<T>(name);
        Ok(&self.registrations[&idx])
    }

    fn insert<T: Component + Default>(&mut self, name: String) -> CompIdx {
        let type_id = TypeId::of::<T>();
        let idx = self.types.index_of::<T>();
        let registration = ComponentRegistration {
            name: name.clone(),
            type_id,
            type_name: std::any::type_name::<T>(),
            idx,
            aliases: Vec::new(),
            net_id: None,
            networked: T::networked(),
            protected: is_protected_type(type_id),
            constructor: construct::<T>,
        };

        self.by_type.insert(type_id, idx);
        self.by_lower_name.insert(name.to_lowercase(), idx);
        self.by_name.insert(name, idx);
        self.registrations.insert(idx, registration);
        idx
    }

    /// Make `C` also reachable under the reference type `A`
    ///
    /// `A` is usually a trait object type such as `dyn Damageable`. The
    /// returned index keys an extra storage table and directed event
    /// subscriptions made through `A`.
    pub fn register_reference<C: Component, A: ?Sized + 'static>(&mut self) -> EcsResult<CompIdx> {
        if self.locked {
            return Err(EcsError::RegistryLocked);
        }

        let concrete = TypeId::of::<C>();
        let alias = TypeId::of::<A>();
        if is_protected_type(concrete) {
            return Err(EcsError::ProtectedType(std::any::type_name::<C>()));
        }
        if is_protected_type(alias) {
            return Err(EcsError::ProtectedType(std::any::type_name::<A>()));
        }

        let idx = *self
            .by_type
            .get(&concrete)
            .ok_or(EcsError::UnregisteredType(std::any::type_name::<C>()))?;
        if concrete == alias {
            return Ok(idx);
        }
        if self.by_type.contains_key(&alias) {
            return Err(EcsError::DuplicateRegistration(
                std::any::type_name::<A>().to_string(),
            ));
        }

        let alias_idx = self.types.index_of::<A>();
        if let Some(registration) = self.registrations.get_mut(&idx) {
            if !registration.aliases.contains(&alias_idx) {
                registration.aliases.push(alias_idx);
            }
        }
        Ok(alias_idx)
    }

    /// Remove a component type
    ///
    /// Its index stays reserved; a later registration of the same type
    /// reuses it.
    pub fn unregister<T: Component>(&mut self) -> EcsResult<()> {
        if self.locked {
            return Err(EcsError::RegistryLocked);
        }

        let type_id = TypeId::of::<T>();
        if is_protected_type(type_id) {
            return Err(EcsError::ProtectedType(std::any::type_name::<T>()));
        }

        let idx = self
            .by_type
            .remove(&type_id)
            .ok_or(EcsError::UnregisteredType(std::any::type_name::<T>()))?;
        if let Some(registration) = self.registrations.remove(&idx) {
            self.by_lower_name.remove(&registration.name.to_lowercase());
            self.by_name.remove(&registration.name);
        }
        Ok(())
    }

    /// Mark names as intentionally absent
    ///
    /// # Errors
    ///
    /// [`EcsError::IgnoredName`] if a name is already registered.
    pub fn ignore<I, S>(&mut self, names: I) -> EcsResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.locked {
            return Err(EcsError::RegistryLocked);
        }

        for name in names {
            let name = name.into();
            if self.by_name.contains_key(&name) {
                return Err(EcsError::IgnoredName(name));
            }
            if self.ignored.contains(&name) {
                tracing::warn!(name = %name, "component name ignored twice");
                continue;
            }
            self.ignored.insert(name);
        }
        Ok(())
    }

    /// Treat every unregistered name ending in `suffix` as ignored
    ///
    /// Only one suffix may be set.
    pub fn ignore_missing(&mut self, suffix: impl Into<String>) -> EcsResult<()> {
        if self.locked {
            return Err(EcsError::RegistryLocked);
        }

        let suffix = suffix.into();
        match &self.ignore_missing_suffix {
            Some(existing) if *existing != suffix => {
                Err(EcsError::IgnoreSuffixConflict(existing.clone()))
            }
            _ => {
                self.ignore_missing_suffix = Some(suffix);
                Ok(())
            }
        }
    }

    /// Report whether a name is registered, ignored or unknown
    pub fn availability(&self, name: &str, ignore_case: bool) -> ComponentAvailability {
        let found = if ignore_case {
            self.by_lower_name.contains_key(&name.to_lowercase())
        } else {
            self.by_name.contains_key(name)
        };
        if found {
            return ComponentAvailability::Available;
        }

        let ignored = if ignore_case {
            self.ignored.iter().any(|n| n.eq_ignore_ascii_case(name))
        } else {
            self.ignored.contains(name)
        };
        let suffixed = self
            .ignore_missing_suffix
            .as_deref()
            .map_or(false, |suffix| name.ends_with(suffix));

        if ignored || suffixed {
            ComponentAvailability::Ignore
        } else {
            ComponentAvailability::Unknown
        }
    }

    /// Assign network ids and lock the registry
    ///
    /// Networked types are sorted by name (ordinal comparison) and numbered
    /// densely from zero, so processes registering the same set agree.
    pub fn finalize_network_ids(&mut self) -> EcsResult<()> {
        if self.locked {
            return Err(EcsError::RegistryLocked);
        }

        let mut networked: Vec<(String, CompIdx)> = self
            .registrations
            .values()
            .filter(|r| r.networked)
            .map(|r| (r.name.clone(), r.idx))
            .collect();
        if networked.len() > usize::from(u16::MAX) + 1 {
            return Err(EcsError::TooManyNetworked(networked.len()));
        }
        networked.sort();

        self.by_net_id.clear();
        for (net_id, (_, idx)) in networked.iter().enumerate() {
            if let Some(registration) = self.registrations.get_mut(idx) {
                registration.net_id = Some(net_id as u16);
            }
            self.by_net_id.push(*idx);
        }
        self.locked = true;

        tracing::debug!(
            networked = self.by_net_id.len(),
            registered = self.registrations.len(),
            "component network ids assigned"
        );
        Ok(())
    }

    /// Whether structural registration is locked
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Registration of `T`
    pub fn registration<T: Component>(&self) -> EcsResult<&ComponentRegistration> {
        self.try_registration::<T>()
            .ok_or(EcsError::UnregisteredType(std::any::type_name::<T>()))
    }

    /// Registration of `T`, if registered
    pub fn try_registration<T: Component>(&self) -> Option<&ComponentRegistration> {
        self.try_registration_by_type_id(TypeId::of::<T>())
    }

    /// Registration by concrete type id, if registered
    pub fn try_registration_by_type_id(&self, type_id: TypeId) -> Option<&ComponentRegistration> {
        self.by_type
            .get(&type_id)
            .and_then(|idx| self.registrations.get(idx))
    }

    /// Registration by exact name
    pub fn registration_by_name(&self, name: &str) -> EcsResult<&ComponentRegistration> {
        self.try_registration_by_name(name)
            .ok_or_else(|| EcsError::UnknownComponent(name.to_string()))
    }

    /// Registration by exact name, if registered
    pub fn try_registration_by_name(&self, name: &str) -> Option<&ComponentRegistration> {
        self.by_name
            .get(name)
            .and_then(|idx| self.registrations.get(idx))
    }

    /// Registration by name, ignoring case
    pub fn registration_by_name_ignore_case(&self, name: &str) -> EcsResult<&ComponentRegistration> {
        self.try_registration_by_name_ignore_case(name)
            .ok_or_else(|| EcsError::UnknownComponent(name.to_string()))
    }

    /// Registration by name ignoring case, if registered
    pub fn try_registration_by_name_ignore_case(&self, name: &str) -> Option<&ComponentRegistration> {
        self.by_lower_name
            .get(&name.to_lowercase())
            .and_then(|idx| self.registrations.get(idx))
    }

    /// Registration by concrete index
    pub fn registration_by_idx(&self, idx: CompIdx) -> EcsResult<&ComponentRegistration> {
        self.try_registration_by_idx(idx)
            .ok_or_else(|| EcsError::UnknownComponent(idx.to_string()))
    }

    /// Registration by concrete index, if registered
    pub fn try_registration_by_idx(&self, idx: CompIdx) -> Option<&ComponentRegistration> {
        self.registrations.get(&idx)
    }

    /// Registration by network id
    pub fn registration_by_net_id(&self, net_id: u16) -> EcsResult<&ComponentRegistration> {
        if !self.locked {
            return Err(EcsError::NetIdsNotAssigned);
        }
        self.try_registration_by_net_id(net_id)
            .ok_or(EcsError::UnknownNetId(net_id))
    }

    /// Registration by network id, if assigned
    pub fn try_registration_by_net_id(&self, net_id: u16) -> Option<&ComponentRegistration> {
        self.by_net_id
            .get(usize::from(net_id))
            .and_then(|idx| self.registrations.get(idx))
    }

    /// Concrete index of a registered component type
    pub fn index<T: Component>(&self) -> EcsResult<CompIdx> {
        self.registration::<T>().map(|r| r.idx)
    }

    /// Index of a registered component type or reference type
    pub fn reference_index<A: ?Sized + 'static>(&self) -> Option<CompIdx> {
        let type_id = TypeId::of::<A>();
        if let Some(idx) = self.by_type.get(&type_id) {
            return Some(*idx);
        }
        let idx = self.types.get::<A>()?;
        self.registrations
            .values()
            .any(|r| r.aliases.contains(&idx))
            .then_some(idx)
    }

    /// Concrete registrations whose index or aliases include `idx`
    pub fn registrations_reachable_by(
        &self,
        idx: CompIdx,
    ) -> impl Iterator<Item = &ComponentRegistration> + '_ {
        self.registrations
            .values()
            .filter(move |r| r.idx == idx || r.aliases.contains(&idx))
    }

    /// All registrations in index order
    pub fn registrations(&self) -> impl Iterator<Item = &ComponentRegistration> + '_ {
        self.registrations.values()
    }

    /// Number of registered component types
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Number of indices handed out, including reference aliases
    pub fn index_count(&self) -> usize {
        self.types.len()
    }

    /// Snapshot of the assigned network ids
    pub fn net_manifest(&self) -> EcsResult<NetManifest> {
        if !self.locked {
            return Err(EcsError::NetIdsNotAssigned);
        }
        let version = Version::parse(MANIFEST_FORMAT_VERSION)
            .map_err(|e| EcsError::IncompatibleManifest(e.to_string()))?;
        let entries = self
            .by_net_id
            .iter()
            .enumerate()
            .filter_map(|(net_id, idx)| {
                self.registrations
                    .get(idx)
                    .map(|r| (r.name.clone(), net_id as u16))
            })
            .collect();
        Ok(NetManifest::new(version, entries))
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("registered", &self.registrations.len())
            .field("locked", &self.locked)
            .finish()
    }
}

/// Network id table exchanged between processes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetManifest {
    version: Version,
    entries: Vec<(String, u16)>,
}

impl NetManifest {
    /// Create a manifest from a format version and (name, net id) pairs
    pub fn new(version: Version, entries: Vec<(String, u16)>) -> Self {
        NetManifest { version, entries }
    }

    /// Format version
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// (name, net id) pairs in net id order
    pub fn entries(&self) -> &[(String, u16)] {
        &self.entries
    }

    /// Verify that a remote manifest can talk to this one
    pub fn check_compatible(&self, remote: &NetManifest) -> EcsResult<()> {
        if !is_version_compatible(&remote.version, &self.version) {
            return Err(EcsError::IncompatibleManifest(format!(
                "remote format {} is not compatible with local format {}",
                remote.version, self.version
            )));
        }

        if self.entries.len() != remote.entries.len() {
            return Err(EcsError::IncompatibleManifest(format!(
                "local has {} networked components, remote has {}",
                self.entries.len(),
                remote.entries.len()
            )));
        }

        for (local, remote) in self.entries.iter().zip(&remote.entries) {
            if local != remote {
                return Err(EcsError::IncompatibleManifest(format!(
                    "net id {} is '{}' locally but '{}' remotely",
                    local.1, local.0, remote.0
                )));
            }
        }
        Ok(())
    }
}

/// Check if a remote manifest format is compatible with the local one
///
/// - Major version must match
/// - For major version 0.x.y, minor versions must match
/// - For major version >= 1, the remote minor may not exceed the local one
fn is_version_compatible(remote: &Version, local: &Version) -> bool {
    if remote.major != local.major {
        return false;
    }

    if remote.major != 0 {
        remote.minor <= local.minor
    } else {
        remote.minor == local.minor
    }
}

fn is_protected_type(type_id: TypeId) -> bool {
    type_id == TypeId::of::<MetaDataComponent>() || type_id == TypeId::of::<TransformComponent>()
}

fn calculate_name<T: Component>() -> String {
    match T::name_override() {
        Some(name) => name.to_string(),
        None => derive_name(std::any::type_name::<T>()),
    }
}

/// Derive a display name from a Rust type name
pub fn derive_name(type_name: &str) -> String {
    let base = type_name.split('<').next().unwrap_or(type_name);
    let mut name = base.rsplit("::").next().unwrap_or(base);

    if let Some(stripped) = name.strip_suffix("Component") {
        if !stripped.is_empty() {
            name = stripped;
        }
    }

    for prefix in SIDE_PREFIXES {
        if let Some(stripped) = name.strip_prefix(prefix) {
            if stripped.starts_with(|c: char| c.is_ascii_uppercase()) {
                name = stripped;
                break;
            }
        }
    }

    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct SpriteComponent;
    impl Component for SpriteComponent {
        fn networked() -> bool {
            true
        }
    }

    #[derive(Default)]
    struct ServerPhysicsComponent;
    impl Component for ServerPhysicsComponent {
        fn networked() -> bool {
            true
        }
    }

    #[derive(Default)]
    struct Renamed;
    impl Component for Renamed {
        fn name_override() -> Option<&'static str> {
            Some("Custom")
        }
    }

    #[derive(Default)]
    struct Sprite;
    impl Component for Sprite {}

    trait Damageable {}

    #[test]
    fn test_derive_name() {
        assert_eq!(derive_name("game::SpriteComponent"), "Sprite");
        assert_eq!(derive_name("game::ServerPhysicsComponent"), "Physics");
        assert_eq!(derive_name("Component"), "Component");
        assert_eq!(derive_name("a::Clientele"), "Clientele");
        assert_eq!(derive_name("a::Wrapper<b::Inner>"), "Wrapper");
    }

    #[test]
    fn test_protected_preregistered() {
        let registry = ComponentRegistry::new();
        assert_eq!(registry.len(), 2);
        let meta = registry.registration::<MetaDataComponent>().unwrap();
        assert_eq!(meta.name(), "MetaData");
        assert!(meta.is_protected());
        assert!(registry.try_registration_by_name("Transform").is_some());
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ComponentRegistry::new();
        let idx = registry.register::<SpriteComponent>().unwrap().idx();
        registry.register::<Renamed>().unwrap();

        assert_eq!(registry.registration_by_name("Sprite").unwrap().idx(), idx);
        assert!(registry.try_registration_by_name("sprite").is_none());
        assert_eq!(
            registry.registration_by_name_ignore_case("SPRITE").unwrap().idx(),
            idx
        );
        assert_eq!(registry.registration_by_idx(idx).unwrap().name(), "Sprite");
        assert!(registry.try_registration_by_name("Custom").is_some());
        assert!(matches!(
            registry.registration_by_name("Missing"),
            Err(EcsError::UnknownComponent(_))
        ));
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = ComponentRegistry::new();
        registry.register::<SpriteComponent>().unwrap();
        assert!(matches!(
            registry.register::<SpriteComponent>(),
            Err(EcsError::DuplicateRegistration(_))
        ));
        // Same derived name from a different type
        assert!(matches!(
            registry.register::<Sprite>(),
            Err(EcsError::DuplicateRegistration(_))
        ));
    }

    #[test]
    fn test_reference_aliases() {
        let mut registry = ComponentRegistry::new();
        let idx = registry.register::<SpriteComponent>().unwrap().idx();
        let alias = registry
            .register_reference::<SpriteComponent, dyn Damageable>()
            .unwrap();

        assert_ne!(alias, idx);
        let reg = registry.registration::<SpriteComponent>().unwrap();
        assert_eq!(reg.indices().collect::<Vec<_>>(), vec![idx, alias]);
        assert_eq!(registry.reference_index::<dyn Damageable>(), Some(alias));
        assert_eq!(registry.registrations_reachable_by(alias).count(), 1);
    }

    #[test]
    fn test_protected_alias_rejected() {
        let mut registry = ComponentRegistry::new();
        assert!(matches!(
            registry.register_reference::<TransformComponent, dyn Damageable>(),
            Err(EcsError::ProtectedType(_))
        ));
        registry.register::<Sprite>().unwrap();
        assert!(matches!(
            registry.register_reference::<Sprite, MetaDataComponent>(),
            Err(EcsError::ProtectedType(_))
        ));
        assert!(matches!(
            registry.unregister::<MetaDataComponent>(),
            Err(EcsError::ProtectedType(_))
        ));
    }

    #[test]
    fn test_unregister() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Sprite>().unwrap();
        registry.unregister::<Sprite>().unwrap();
        assert!(registry.try_registration::<Sprite>().is_none());
        assert!(matches!(
            registry.unregister::<Sprite>(),
            Err(EcsError::UnregisteredType(_))
        ));
    }

    #[test]
    fn test_ignore_and_availability() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Sprite>().unwrap();
        registry.ignore(["Light", "Sound"]).unwrap();
        registry.ignore_missing("Visuals").unwrap();

        assert_eq!(registry.availability("Sprite", false), ComponentAvailability::Available);
        assert_eq!(registry.availability("sprite", true), ComponentAvailability::Available);
        assert_eq!(registry.availability("sprite", false), ComponentAvailability::Unknown);
        assert_eq!(registry.availability("Light", false), ComponentAvailability::Ignore);
        assert_eq!(registry.availability("light", true), ComponentAvailability::Ignore);
        assert_eq!(
            registry.availability("DoorVisuals", false),
            ComponentAvailability::Ignore
        );
        assert_eq!(registry.availability("Door", false), ComponentAvailability::Unknown);

        assert!(matches!(
            registry.ignore(["Sprite"]),
            Err(EcsError::IgnoredName(_))
        ));
        assert!(matches!(
            registry.ignore_missing("Other"),
            Err(EcsError::IgnoreSuffixConflict(_))
        ));
    }

    #[test]
    fn test_register_ignored_name() {
        let mut registry = ComponentRegistry::new();
        registry.ignore(["Sprite"]).unwrap();
        assert!(matches!(
            registry.register::<Sprite>(),
            Err(EcsError::IgnoredName(_))
        ));
        registry.register_overwrite::<Sprite>().unwrap();
        assert_eq!(registry.availability("Sprite", false), ComponentAvailability::Available);
    }

    #[test]
    fn test_finalize_network_ids() {
        let mut registry = ComponentRegistry::new();
        registry.register::<SpriteComponent>().unwrap();
        registry.register::<ServerPhysicsComponent>().unwrap();
        registry.register::<Renamed>().unwrap();

        assert!(matches!(
            registry.registration_by_net_id(0),
            Err(EcsError::NetIdsNotAssigned)
        ));
        registry.finalize_network_ids().unwrap();

        // MetaData, Physics, Sprite, Transform in ordinal order
        let names: Vec<_> = (0..4)
            .map(|id| registry.registration_by_net_id(id).unwrap().name().to_string())
            .collect();
        assert_eq!(names, ["MetaData", "Physics", "Sprite", "Transform"]);
        assert_eq!(registry.registration::<Renamed>().unwrap().net_id(), None);
        assert!(matches!(
            registry.registration_by_net_id(9),
            Err(EcsError::UnknownNetId(9))
        ));
    }

    #[test]
    fn test_locked_after_finalize() {
        let mut registry = ComponentRegistry::new();
        registry.finalize_network_ids().unwrap();
        assert!(registry.is_locked());
        assert_eq!(registry.register::<Sprite>().err(), Some(EcsError::RegistryLocked));
        assert_eq!(
            registry.register_reference::<Sprite, dyn Damageable>(),
            Err(EcsError::RegistryLocked)
        );
        assert_eq!(registry.unregister::<Sprite>(), Err(EcsError::RegistryLocked));
        assert_eq!(registry.finalize_network_ids(), Err(EcsError::RegistryLocked));
    }

    #[test]
    fn test_version_compatibility() {
        let v = |s: &str| Version::parse(s).unwrap();
        assert!(is_version_compatible(&v("0.2.0"), &v("0.2.5")));
        assert!(!is_version_compatible(&v("0.1.0"), &v("0.2.0")));
        assert!(is_version_compatible(&v("1.1.0"), &v("1.2.0")));
        assert!(!is_version_compatible(&v("1.3.0"), &v("1.2.0")));
        assert!(!is_version_compatible(&v("2.0.0"), &v("1.0.0")));
    }

    #[test]
    fn test_manifest_compatibility() {
        let mut local = ComponentRegistry::new();
        local.register::<SpriteComponent>().unwrap();
        local.finalize_network_ids().unwrap();
        let local = local.net_manifest().unwrap();

        let mut remote = ComponentRegistry::new();
        remote.register::<SpriteComponent>().unwrap();
        remote.finalize_network_ids().unwrap();
        assert!(local.check_compatible(&remote.net_manifest().unwrap()).is_ok());

        let mut other = ComponentRegistry::new();
        other.register::<ServerPhysicsComponent>().unwrap();
        other.finalize_network_ids().unwrap();
        assert!(matches!(
            local.check_compatible(&other.net_manifest().unwrap()),
            Err(EcsError::IncompatibleManifest(_))
        ));

        let old = NetManifest::new(Version::new(9, 0, 0), local.entries().to_vec());
        assert!(local.check_compatible(&old).is_err());
    }
}
