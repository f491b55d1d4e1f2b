//! View registry: maps view keys to lifetimes and factories.
//!
//! Registrations are plain data captured at configuration time. Typed
//! registration ([`ViewRegistry::register_type`]) captures a closure that
//! asks the resolver for `T` and falls back to `T::default()`, so no runtime
//! type lookup by name is ever needed.
//!
//! # Singleton cache
//!
//! `Singleton` views are memoized on first resolution and reused for the
//! registry's lifetime. Re-registering a key replaces its factory and
//! lifetime but keeps an already cached instance; call
//! [`ViewRegistry::evict`] to drop it explicitly.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::errors::{NavigationError, Result};
use crate::region::ViewInstance;
use crate::resolver::{ResolveExt, ServiceResolver};

/// Instance-sharing policy for a view key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    /// A fresh instance per resolution
    #[default]
    Transient,
    /// One instance, created on first resolution
    Singleton,
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Singleton => write!(f, "singleton"),
        }
    }
}

/// Factory producing a view instance from a resolution context.
pub type ViewFactory = Arc<dyn Fn(&dyn ServiceResolver) -> ViewInstance + Send + Sync>;

/// An immutable view registration.
#[derive(Clone)]
pub struct ViewRegistration {
    view_key: String,
    lifetime: Lifetime,
    factory: ViewFactory,
    view_type: Option<&'static str>,
}

impl ViewRegistration {
    /// Key this registration answers to.
    pub fn view_key(&self) -> &str {
        &self.view_key
    }

    /// Sharing policy.
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Concrete type name, for typed registrations.
    pub fn view_type(&self) -> Option<&'static str> {
        self.view_type
    }

    fn create(&self, resolver: &dyn ServiceResolver) -> ViewInstance {
        (self.factory)(resolver)
    }
}

impl fmt::Debug for ViewRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewRegistration")
            .field("view_key", &self.view_key)
            .field("lifetime", &self.lifetime)
            .field("view_type", &self.view_type)
            .finish_non_exhaustive()
    }
}

/// Registry of view keys plus the singleton instance cache.
#[derive(Default)]
pub struct ViewRegistry {
    registrations: RwLock<HashMap<String, ViewRegistration>>,
    singletons: Mutex<HashMap<String, ViewInstance>>,
}

impl ViewRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a view key with an explicit factory.
    pub fn register<F>(&self, view_key: impl Into<String>, lifetime: Lifetime, factory: F)
    where
        F: Fn(&dyn ServiceResolver) -> ViewInstance + Send + Sync + 'static,
    {
        self.insert(ViewRegistration {
            view_key: view_key.into(),
            lifetime,
            factory: Arc::new(factory),
            view_type: None,
        });
    }

    /// Register a typed view.
    ///
    /// The captured factory prefers an instance of `T` from the resolver and
    /// falls back to `T::default()`.
    pub fn register_type<T>(&self, view_key: impl Into<String>, lifetime: Lifetime)
    where
        T: Any + Default + Send + Sync,
    {
        let factory: ViewFactory = Arc::new(|resolver: &dyn ServiceResolver| {
            match resolver.resolve::<T>() {
                Some(service) => service as ViewInstance,
                None => Arc::new(T::default()) as ViewInstance,
            }
        });
        self.insert(ViewRegistration {
            view_key: view_key.into(),
            lifetime,
            factory,
            view_type: Some(std::any::type_name::<T>()),
        });
    }

    /// Register a pre-built instance as a singleton.
    pub fn register_instance(&self, view_key: impl Into<String>, instance: ViewInstance) {
        self.register(view_key, Lifetime::Singleton, move |_| instance.clone());
    }

    fn insert(&self, registration: ViewRegistration) {
        let key = registration.view_key.clone();
        let lifetime = registration.lifetime;
        let replaced = self
            .registrations
            .write()
            .insert(key.clone(), registration)
            .is_some();
        if replaced && self.singletons.lock().contains_key(&key) {
            tracing::debug!(
                view_key = %key,
                "view re-registered; keeping cached singleton until evicted"
            );
        } else {
            tracing::debug!(view_key = %key, %lifetime, replaced, "view registered");
        }
    }

    /// Produce an instance for `view_key`.
    ///
    /// `Singleton` keys return the memoized instance when present; otherwise
    /// the factory runs and its result is cached. Concurrent first
    /// resolutions agree on a single cached instance.
    pub fn resolve(&self, view_key: &str, resolver: &dyn ServiceResolver) -> Result<ViewInstance> {
        let registration = self
            .registrations
            .read()
            .get(view_key)
            .cloned()
            .ok_or_else(|| NavigationError::view_not_registered(view_key))?;

        match registration.lifetime() {
            Lifetime::Transient => Ok(registration.create(resolver)),
            Lifetime::Singleton => {
                if let Some(cached) = self.singletons.lock().get(view_key) {
                    tracing::trace!(view_key, "singleton cache hit");
                    return Ok(cached.clone());
                }
                // Factory runs unlocked: it may resolve other views.
                let created = registration.create(resolver);
                let mut cache = self.singletons.lock();
                let instance = cache.entry(view_key.to_string()).or_insert(created);
                tracing::debug!(view_key, "singleton created");
                Ok(instance.clone())
            }
        }
    }

    /// Registration for `view_key`, if any.
    pub fn registration(&self, view_key: &str) -> Option<ViewRegistration> {
        self.registrations.read().get(view_key).cloned()
    }

    /// True if `view_key` is registered.
    pub fn contains(&self, view_key: &str) -> bool {
        self.registrations.read().contains_key(view_key)
    }

    /// All registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.registrations.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// True if a singleton instance is cached for `view_key`.
    pub fn is_cached(&self, view_key: &str) -> bool {
        self.singletons.lock().contains_key(view_key)
    }

    /// Drop the cached singleton for `view_key`, returning it.
    pub fn evict(&self, view_key: &str) -> Option<ViewInstance> {
        self.singletons.lock().remove(view_key)
    }
}

impl fmt::Debug for ViewRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewRegistry")
            .field("keys", &self.keys())
            .field("cached", &self.singletons.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{NoServices, ServiceMap};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct HomeView;

    #[derive(Debug, PartialEq)]
    struct Banner(&'static str);

    impl Default for Banner {
        fn default() -> Self {
            Banner("fallback")
        }
    }

    #[test]
    fn singleton_resolves_to_same_instance() {
        let registry = ViewRegistry::new();
        registry.register_type::<HomeView>("Home", Lifetime::Singleton);

        let a = registry.resolve("Home", &NoServices).unwrap();
        let b = registry.resolve("Home", &NoServices).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(registry.is_cached("Home"));
    }

    #[test]
    fn transient_resolves_to_fresh_instances() {
        let registry = ViewRegistry::new();
        registry.register("Row", Lifetime::Transient, |_| Arc::new(String::from("row")));

        let a = registry.resolve("Row", &NoServices).unwrap();
        let b = registry.resolve("Row", &NoServices).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!registry.is_cached("Row"));
    }

    #[test]
    fn unknown_key_fails() {
        let registry = ViewRegistry::new();
        let err = registry.resolve("Missing", &NoServices).unwrap_err();
        assert_eq!(err, NavigationError::view_not_registered("Missing"));
    }

    #[test]
    fn typed_registration_prefers_resolver() {
        let registry = ViewRegistry::new();
        registry.register_type::<Banner>("Banner", Lifetime::Transient);

        let services = ServiceMap::new().with(Banner("from services"));
        let view = registry.resolve("Banner", &services).unwrap();
        assert_eq!(view.downcast_ref::<Banner>(), Some(&Banner("from services")));

        let view = registry.resolve("Banner", &NoServices).unwrap();
        assert_eq!(view.downcast_ref::<Banner>(), Some(&Banner("fallback")));
    }

    #[test]
    fn reregistration_keeps_cached_singleton_until_evicted() {
        let registry = ViewRegistry::new();
        registry.register("Shell", Lifetime::Singleton, |_| Arc::new(1_u32));
        let first = registry.resolve("Shell", &NoServices).unwrap();

        registry.register("Shell", Lifetime::Singleton, |_| Arc::new(2_u32));
        let again = registry.resolve("Shell", &NoServices).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(again.downcast_ref::<u32>(), Some(&1));

        assert!(registry.evict("Shell").is_some());
        let fresh = registry.resolve("Shell", &NoServices).unwrap();
        assert_eq!(fresh.downcast_ref::<u32>(), Some(&2));
    }

    #[test]
    fn singleton_factory_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let registry = ViewRegistry::new();
        registry.register("Counted", Lifetime::Singleton, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(())
        });

        for _ in 0..3 {
            registry.resolve("Counted", &NoServices).unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn register_instance_is_singleton() {
        let registry = ViewRegistry::new();
        let splash: ViewInstance = Arc::new("splash");
        registry.register_instance("Splash", splash.clone());

        let resolved = registry.resolve("Splash", &NoServices).unwrap();
        assert!(Arc::ptr_eq(&resolved, &splash));
        assert_eq!(
            registry.registration("Splash").map(|r| r.lifetime()),
            Some(Lifetime::Singleton)
        );
        assert_eq!(registry.keys(), vec!["Splash".to_string()]);
    }
}
