//! Service resolution seam.
//!
//! View factories, typed navigation and flow conditions ask an external
//! resolver for services. Dependency-injection wiring is the host's concern;
//! this module defines the narrow lookup trait plus [`ServiceMap`], a plain
//! type-keyed map that is enough for most hosts and for tests.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Type-keyed service lookup.
pub trait ServiceResolver: Send + Sync {
    /// Return the service registered for `type_id`, if any.
    fn resolve_any(&self, type_id: TypeId) -> Option<Arc<dyn Any + Send + Sync>>;
}

/// Typed convenience over [`ServiceResolver`].
pub trait ResolveExt {
    /// Resolve a service of type `T`.
    fn resolve<T: Any + Send + Sync>(&self) -> Option<Arc<T>>;
}

impl<R: ServiceResolver + ?Sized> ResolveExt for R {
    fn resolve<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.resolve_any(TypeId::of::<T>())?.downcast::<T>().ok()
    }
}

/// Resolver with no services; every lookup misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoServices;

impl ServiceResolver for NoServices {
    fn resolve_any(&self, _type_id: TypeId) -> Option<Arc<dyn Any + Send + Sync>> {
        None
    }
}

/// A shared, type-keyed service map.
#[derive(Default)]
pub struct ServiceMap {
    services: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl ServiceMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with<T: Any + Send + Sync>(self, service: T) -> Self {
        self.insert(service);
        self
    }

    /// Register `service`, replacing any previous service of the same type.
    pub fn insert<T: Any + Send + Sync>(&self, service: T) {
        self.insert_shared(Arc::new(service));
    }

    /// Register an already shared service.
    pub fn insert_shared<T: Any + Send + Sync>(&self, service: Arc<T>) {
        self.services.write().insert(TypeId::of::<T>(), service);
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    /// True when no services are registered.
    pub fn is_empty(&self) -> bool {
        self.services.read().is_empty()
    }
}

impl ServiceResolver for ServiceMap {
    fn resolve_any(&self, type_id: TypeId) -> Option<Arc<dyn Any + Send + Sync>> {
        self.services.read().get(&type_id).cloned()
    }
}

impl std::fmt::Debug for ServiceMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceMap")
            .field("services", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Session {
        signed_in: bool,
    }

    #[test]
    fn resolves_by_type() {
        let map = ServiceMap::new().with(Session { signed_in: true });
        let session = map.resolve::<Session>().unwrap();
        assert!(session.signed_in);
        assert!(map.resolve::<String>().is_none());
    }

    #[test]
    fn insert_replaces_same_type() {
        let map = ServiceMap::new();
        map.insert(Session { signed_in: false });
        map.insert(Session { signed_in: true });
        assert_eq!(map.len(), 1);
        assert_eq!(*map.resolve::<Session>().unwrap(), Session { signed_in: true });
    }

    #[test]
    fn resolves_through_trait_object() {
        let map: Arc<dyn ServiceResolver> = Arc::new(ServiceMap::new().with(7_u32));
        assert_eq!(map.resolve::<u32>().as_deref(), Some(&7));
        assert!(NoServices.resolve::<u32>().is_none());
    }
}
