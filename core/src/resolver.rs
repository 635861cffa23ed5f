//! # RESOLVER ADAPTER
//!
//! **PURPOSE**: Permissive resolution contract for hosting frameworks
//!
//! A host asks for optional services and must never be aborted by a
//! misconfigured one, so every [`RegistryError`](crate::errors::RegistryError)
//! is downgraded to `None` here. The registry's own API keeps its typed
//! failures.

use crate::dependencies::{Service, ServiceKey, ServiceRegistry};
use std::sync::Arc;

/// Best-effort service lookup consumed by a hosting framework.
pub trait ServiceProvider: Send + Sync {
    /// Resolve `key`, or `None` on any failure.
    fn get_service(&self, key: &ServiceKey) -> Option<Service>;

    /// Every service answering to `key`. A key has at most one registration.
    fn get_services(&self, key: &ServiceKey) -> Vec<Service> {
        self.get_service(key).into_iter().collect()
    }
}

/// Typed helpers over any [`ServiceProvider`].
pub trait ServiceProviderExt: ServiceProvider {
    fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.resolve_key(&ServiceKey::of::<T>())
    }

    fn resolve_key<T: ?Sized + Send + Sync + 'static>(&self, key: &ServiceKey) -> Option<Arc<T>> {
        self.get_service(key)?.downcast::<T>()
    }
}

impl<P: ServiceProvider + ?Sized> ServiceProviderExt for P {}

/// [`ServiceProvider`] backed by a shared [`ServiceRegistry`].
#[derive(Clone)]
pub struct RegistryResolver {
    registry: Arc<ServiceRegistry>,
}

impl RegistryResolver {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }
}

impl ServiceProvider for RegistryResolver {
    fn get_service(&self, key: &ServiceKey) -> Option<Service> {
        match self.registry.resolve_service(key) {
            Ok(service) => Some(service),
            Err(err) => {
                log::debug!("resolver returning no service for {}: {}", key, err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependencies::{Binding, Constructor, Injectable};

    trait Droid: Send + Sync {
        fn primary_function(&self) -> &'static str;
    }

    struct Astromech;

    impl Droid for Astromech {
        fn primary_function(&self) -> &'static str {
            "Astromech"
        }
    }

    struct Protocol;

    impl Injectable for Protocol {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::nullary(|| Protocol)]
        }
    }

    fn resolver() -> RegistryResolver {
        let registry = Arc::new(ServiceRegistry::new());
        registry
            .register_singleton::<dyn Droid>(Arc::new(Astromech))
            .unwrap();
        registry.register_factory::<String, _>(|| panic!("broken factory")).unwrap();
        registry
            .bind(ServiceKey::named("episode"), Binding::instance(Arc::new(4i32)))
            .unwrap();
        RegistryResolver::new(registry)
    }

    #[test]
    fn test_get_service_success() {
        let resolver = resolver();
        let droid = resolver.resolve::<dyn Droid>().unwrap();
        assert_eq!(droid.primary_function(), "Astromech");
        assert_eq!(*resolver.resolve_key::<i32>(&ServiceKey::named("episode")).unwrap(), 4);
    }

    #[test]
    fn test_every_failure_becomes_none() {
        let resolver = resolver();
        // unregistered abstract identity
        assert!(resolver.resolve::<u64>().is_none());
        // construction failure
        assert!(resolver.resolve::<String>().is_none());
        // type mismatch
        assert!(resolver.resolve_key::<String>(&ServiceKey::named("episode")).is_none());
        // concrete types are not auto-constructed through the adapter
        assert!(resolver.resolve::<Protocol>().is_none());
    }

    #[test]
    fn test_get_services_yields_zero_or_one() {
        let resolver = resolver();
        assert_eq!(resolver.get_services(&ServiceKey::of::<dyn Droid>()).len(), 1);
        assert!(resolver.get_services(&ServiceKey::of::<u64>()).is_empty());
    }

    #[test]
    fn test_usable_as_trait_object() {
        let provider: Arc<dyn ServiceProvider> = Arc::new(resolver());
        assert!(provider.resolve::<dyn Droid>().is_some());
    }
}
