//! Name-keyed factory of every registered service type.
//!
//! The registry maps an [`Identity`] to a constructor producing a brand-new
//! service instance. It holds factories only, never instances.
//!
//! # Populating a registry
//!
//! There are three ways in, from most to least explicit:
//!
//! 1. **Builder** (preferred): collect the types at startup and hand the
//!    table to whoever assembles the tree.
//!
//!    ```rust,ignore
//!    let registry = ServiceRegistry::builder()
//!        .with::<Greeter>()
//!        .with_static()
//!        .build();
//!    ```
//!
//! 2. **Static declaration**: `register_service!(Greeter);` anywhere in the
//!    binary contributes a [`ServiceType`] to the [`SERVICE_TYPES`] linkme
//!    slice, which [`ServiceRegistry::collect_all`] reads.
//!
//! 3. **Process-wide table**: [`global`] is seeded from the static slice on
//!    first use; [`register_service_type`] adds to it. Mutate it only before
//!    dispatch begins.
//!
//! Registering an identity twice keeps the first constructor.

use std::collections::HashMap;
use std::sync::LazyLock;

use linkme::distributed_slice;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::composable::{Behavior, Composable};
use crate::error::{RegistryError, RegistryResult};
use crate::service::{BoxedService, Identity, Service, identity_of};

/// Constructor stored in the registry.
pub type ServiceCtor = fn() -> BoxedService;

// =============================================================================
// Static declarations (linkme distributed slice)
// =============================================================================

/// A statically declared service type.
///
/// Built by [`register_service!`](crate::register_service); the identity is
/// a function because type names cannot be computed in a `static`.
#[derive(Clone, Copy)]
pub struct ServiceType {
    /// Returns the identity the constructor will be keyed by.
    pub identity: fn() -> Identity,
    /// Creates a fresh instance.
    pub create: ServiceCtor,
}

impl ServiceType {
    /// Declaration for a [`Behavior`] wrapped in a [`Composable`].
    pub const fn of<B: Behavior + Default>() -> Self {
        Self {
            identity: identity_of::<B>,
            create: create_composable::<B>,
        }
    }

    /// Declaration for a hand-written [`Service`].
    pub const fn service<S: Service + Default>() -> Self {
        Self {
            identity: identity_of::<S>,
            create: create_service::<S>,
        }
    }
}

fn create_composable<B: Behavior + Default>() -> BoxedService {
    Box::new(Composable::<B>::default())
}

fn create_service<S: Service + Default>() -> BoxedService {
    Box::new(S::default())
}

/// Every [`ServiceType`] declared with `register_service!` in this binary.
#[distributed_slice]
pub static SERVICE_TYPES: [ServiceType];

/// Declares a service type for static registration.
///
/// ```rust,ignore
/// register_service!(Greeter);            // Greeter: Behavior + Default
/// register_service!(service RawCounter); // RawCounter: Service + Default
/// ```
#[macro_export]
macro_rules! register_service {
    (service $service:ty) => {
        const _: () = {
            #[$crate::__linkme::distributed_slice($crate::registry::SERVICE_TYPES)]
            #[linkme(crate = $crate::__linkme)]
            static SERVICE_TYPE: $crate::registry::ServiceType =
                $crate::registry::ServiceType::service::<$service>();
        };
    };
    ($behavior:ty) => {
        const _: () = {
            #[$crate::__linkme::distributed_slice($crate::registry::SERVICE_TYPES)]
            #[linkme(crate = $crate::__linkme)]
            static SERVICE_TYPE: $crate::registry::ServiceType =
                $crate::registry::ServiceType::of::<$behavior>();
        };
    };
}

// =============================================================================
// ServiceRegistry
// =============================================================================

/// Identity-keyed table of service constructors.
#[derive(Default, Clone)]
pub struct ServiceRegistry {
    ctors: HashMap<Identity, ServiceCtor>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry builder.
    pub fn builder() -> ServiceRegistryBuilder {
        ServiceRegistryBuilder::new()
    }

    /// Builds a registry from every statically declared service type.
    pub fn collect_all() -> Self {
        let mut registry = Self::new();
        for ty in SERVICE_TYPES.iter() {
            registry.register((ty.identity)(), ty.create);
        }
        debug!(count = registry.len(), "Collected static service types");
        registry
    }

    /// Inserts `ctor` under `identity` unless one is already present.
    ///
    /// Returns `true` if the constructor was inserted.
    pub fn register(&mut self, identity: Identity, ctor: ServiceCtor) -> bool {
        if self.ctors.contains_key(identity) {
            warn!(
                service = identity,
                "Service type already registered, keeping the first constructor"
            );
            return false;
        }
        self.ctors.insert(identity, ctor);
        debug!(service = identity, "Registered service type");
        true
    }

    /// Registers a [`Behavior`] type under its own identity.
    pub fn register_type<B: Behavior + Default>(&mut self) -> bool {
        let ty = ServiceType::of::<B>();
        self.register((ty.identity)(), ty.create)
    }

    /// Creates a new, independent instance of `identity`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownService`] if `identity` was never registered.
    pub fn create(&self, identity: &str) -> RegistryResult<BoxedService> {
        self.ctors
            .get(identity)
            .map(|ctor| ctor())
            .ok_or_else(|| RegistryError::unknown(identity))
    }

    /// Returns `true` if `identity` has a constructor.
    pub fn contains(&self, identity: &str) -> bool {
        self.ctors.contains_key(identity)
    }

    /// Returns all registered identities, sorted.
    pub fn identities(&self) -> Vec<Identity> {
        let mut ids: Vec<_> = self.ctors.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the number of registered types.
    pub fn len(&self) -> usize {
        self.ctors.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.ctors.is_empty()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.identities()).finish()
    }
}

// =============================================================================
// ServiceRegistryBuilder
// =============================================================================

/// Collects `(identity, constructor)` pairs into a [`ServiceRegistry`].
#[derive(Default)]
pub struct ServiceRegistryBuilder {
    registry: ServiceRegistry,
}

impl ServiceRegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a [`Behavior`] type.
    pub fn with<B: Behavior + Default>(mut self) -> Self {
        self.registry.register_type::<B>();
        self
    }

    /// Adds a hand-written [`Service`] type.
    pub fn with_service<S: Service + Default>(mut self) -> Self {
        let ty = ServiceType::service::<S>();
        self.registry.register((ty.identity)(), ty.create);
        self
    }

    /// Adds an explicit constructor.
    pub fn with_ctor(mut self, identity: Identity, ctor: ServiceCtor) -> Self {
        self.registry.register(identity, ctor);
        self
    }

    /// Adds every statically declared service type.
    pub fn with_static(mut self) -> Self {
        for ty in SERVICE_TYPES.iter() {
            self.registry.register((ty.identity)(), ty.create);
        }
        self
    }

    /// Finishes the registry.
    pub fn build(self) -> ServiceRegistry {
        self.registry
    }
}

// =============================================================================
// Process-wide registry
// =============================================================================

static GLOBAL: LazyLock<RwLock<ServiceRegistry>> =
    LazyLock::new(|| RwLock::new(ServiceRegistry::collect_all()));

/// The process-wide registry, seeded from [`SERVICE_TYPES`] on first use.
pub fn global() -> &'static RwLock<ServiceRegistry> {
    &GLOBAL
}

/// Registers `ctor` under `identity` in the process-wide registry.
///
/// Returns `false` if the identity was already present.
pub fn register_service_type(identity: Identity, ctor: ServiceCtor) -> bool {
    GLOBAL.write().register(identity, ctor)
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use super::*;
    use crate::context::{BoxedBot, Event};
    use crate::manager::Manager;
    use crate::result::RunResult;

    #[derive(Default)]
    struct Greeter {
        greeted: u32,
    }

    impl Behavior for Greeter {}

    #[derive(Default)]
    struct Raw;

    impl Service for Raw {
        fn identity(&self) -> Identity {
            identity_of::<Self>()
        }

        fn install(&mut self, _: &BoxedBot, _: &mut Manager) {}

        fn uninstall(&mut self, _: &BoxedBot) {}

        fn serve(&mut self, _: &BoxedBot, _: &mut dyn Event) -> RunResult {
            RunResult::success()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn make_raw() -> BoxedService {
        Box::new(Raw)
    }

    #[test]
    fn test_create_unknown_identity() {
        let registry = ServiceRegistry::new();
        let err = registry.create("NoSuchService").err();
        assert_eq!(err, Some(RegistryError::unknown("NoSuchService")));
    }

    #[test]
    fn test_create_yields_independent_instances() {
        let registry = ServiceRegistry::builder().with::<Greeter>().build();
        let identity = identity_of::<Greeter>();

        let mut first = registry.create(identity).unwrap();
        let second = registry.create(identity).unwrap();
        first
            .downcast_mut::<Composable<Greeter>>()
            .unwrap()
            .behavior_mut()
            .greeted = 5;

        let second = second.downcast_ref::<Composable<Greeter>>().unwrap();
        assert_eq!(second.behavior().greeted, 0);
        assert_eq!(first.identity(), identity);
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        fn other() -> BoxedService {
            Box::new(Composable::<Greeter>::default())
        }

        let mut registry = ServiceRegistry::new();
        assert!(registry.register("raw", make_raw));
        assert!(!registry.register("raw", other));

        let service = registry.create("raw").unwrap();
        assert!(service.downcast_ref::<Raw>().is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_builder_variants() {
        let registry = ServiceRegistry::builder()
            .with::<Greeter>()
            .with_service::<Raw>()
            .with_ctor("custom.raw", make_raw)
            .build();

        assert_eq!(registry.len(), 3);
        assert!(registry.contains(identity_of::<Raw>()));
        assert!(registry.contains("custom.raw"));
        let ids = registry.identities();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_global_registration() {
        assert!(register_service_type("registry.tests.global_raw", make_raw));
        assert!(!register_service_type("registry.tests.global_raw", make_raw));

        let mut manager = Manager::new();
        manager.require("registry.tests.global_raw").unwrap();
        assert!(manager.contains(identity_of::<Raw>()));

        assert!(manager.require("registry.tests.never_registered").is_err());
    }
}
