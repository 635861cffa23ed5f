use crate::config::{DuplicatePolicy, RegistryConfig};
use crate::dependencies::constructor::{self, Injectable};
use crate::dependencies::types::{Binding, BindingKind, BoxError, Lifetime, Service, ServiceKey};
use crate::errors::RegistryError;
use parking_lot::RwLock;
use serde::Serialize;
use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

pub(crate) type ActivateFn = fn(&mut Resolution<'_>) -> Result<Service, RegistryError>;

type Activator = dyn Fn(&mut Resolution<'_>) -> Result<Service, RegistryError> + Send + Sync;

fn activator<F>(f: F) -> Arc<Activator>
where
    F: Fn(&mut Resolution<'_>) -> Result<Service, RegistryError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Run `f`, turning a panic into `ConstructionFailure` for `service`.
pub(crate) fn catch_panic<R, F>(service: &str, f: F) -> Result<R, RegistryError>
where
    F: FnOnce() -> Result<R, RegistryError>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(RegistryError::construction(
            service,
            format!("panicked: {}", panic_message(&*payload)),
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

/// A registry error raised by a nested resolution inside a factory keeps its kind.
fn factory_error(service: &str, err: BoxError) -> RegistryError {
    match err.downcast::<RegistryError>() {
        Ok(inner) => *inner,
        Err(other) => RegistryError::construction(service, other.to_string()),
    }
}

#[derive(Clone)]
struct Registration {
    lifetime: Lifetime,
    type_name: &'static str,
    activator: Arc<Activator>,
}

impl Registration {
    fn from_binding<T: ?Sized + Send + Sync + 'static>(key: ServiceKey, binding: Binding<T>) -> Self {
        let lifetime = binding.lifetime();
        let activator = match binding.kind {
            BindingKind::Instance(instance) => {
                activator(move |_| Ok(Service::new(key.clone(), instance.clone())))
            }
            BindingKind::Factory(factory) => activator(move |_| {
                let instance = catch_panic(key.name(), || {
                    factory().map_err(|err| factory_error(key.name(), err))
                })?;
                Ok(Service::new(key.clone(), instance))
            }),
            BindingKind::Singleton(memo) => activator(move |_| {
                let instance = catch_panic(key.name(), || {
                    memo.get().map_err(|err| factory_error(key.name(), err))
                })?;
                Ok(Service::new(key.clone(), instance))
            }),
        };

        Self {
            lifetime,
            type_name: type_name::<T>(),
            activator,
        }
    }
}

thread_local! {
    // Identities under construction on this thread, tagged with their registry.
    static IN_FLIGHT: RefCell<Vec<(usize, ServiceKey)>> = const { RefCell::new(Vec::new()) };
}

/// Marks one identity as under construction; popped on drop, including unwinds.
pub(crate) struct Entered {
    _thread_bound: PhantomData<*const ()>,
}

impl Drop for Entered {
    fn drop(&mut self) {
        IN_FLIGHT.with(|in_flight| {
            in_flight.borrow_mut().pop();
        });
    }
}

/// State carried through one resolution.
///
/// The stack of identities under construction lives in a thread-local, so a
/// factory that calls back into the same registry still sees its callers and
/// a cycle fails instead of recursing or blocking on its own singleton memo.
pub(crate) struct Resolution<'r> {
    registry: &'r ServiceRegistry,
}

impl<'r> Resolution<'r> {
    fn new(registry: &'r ServiceRegistry) -> Self {
        Self { registry }
    }

    fn owner(&self) -> usize {
        self.registry as *const ServiceRegistry as usize
    }

    pub(crate) fn enter(&mut self, key: &ServiceKey) -> Result<Entered, RegistryError> {
        let owner = self.owner();
        let limit = self.registry.config.max_depth;
        IN_FLIGHT.with(|in_flight| {
            let mut in_flight = in_flight.borrow_mut();
            let active: Vec<&ServiceKey> = in_flight
                .iter()
                .filter(|(registry, _)| *registry == owner)
                .map(|(_, entry)| entry)
                .collect();

            if let Some(start) = active.iter().position(|entry| *entry == key) {
                let mut path: Vec<String> = active[start..]
                    .iter()
                    .map(|entry| entry.name().to_string())
                    .collect();
                path.push(key.name().to_string());
                return Err(RegistryError::CircularDependency { path });
            }
            if active.len() >= limit {
                return Err(RegistryError::DepthExceeded {
                    service: key.name().to_string(),
                    limit,
                });
            }

            in_flight.push((owner, key.clone()));
            Ok(Entered {
                _thread_bound: PhantomData,
            })
        })
    }

    fn invoke(&mut self, key: &ServiceKey, registration: Registration) -> Result<Service, RegistryError> {
        let _entered = self.enter(key)?;
        (registration.activator)(self)
    }

    fn resolve(&mut self, key: &ServiceKey) -> Result<Service, RegistryError> {
        match self.registry.lookup(key) {
            Some(registration) => self.invoke(key, registration),
            None => Err(RegistryError::UnregisteredAbstractType {
                service: key.name().to_string(),
            }),
        }
    }

    /// Resolve through a registration when one exists, otherwise fall back to
    /// `activate` if auto-construction is allowed.
    pub(crate) fn resolve_or_activate(
        &mut self,
        key: &ServiceKey,
        activate: Option<ActivateFn>,
    ) -> Result<Service, RegistryError> {
        if let Some(registration) = self.registry.lookup(key) {
            return self.invoke(key, registration);
        }
        match activate {
            Some(activate) if self.registry.config.auto_construct => activate(self),
            _ => Err(RegistryError::UnregisteredAbstractType {
                service: key.name().to_string(),
            }),
        }
    }
}

/// One row of a [`RegistrySnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceDescriptor {
    pub key: String,
    pub named: bool,
    pub lifetime: Lifetime,
    pub type_name: &'static str,
}

/// Serializable view of a registry's configuration and registrations.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrySnapshot {
    pub config: RegistryConfig,
    pub services: Vec<ServiceDescriptor>,
}

/// **SERVICE REGISTRY**
///
/// **PURPOSE**: Map service identities to factories and resolve instances on demand
/// **LIFECYCLE**: Register during bootstrap, resolve concurrently afterwards, `dispose` to tear down
/// **GUARANTEE**: Factories never run while the registration lock is held
pub struct ServiceRegistry {
    registrations: RwLock<HashMap<ServiceKey, Registration>>,
    config: RegistryConfig,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            registrations: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// **REGISTER BINDING**
    ///
    /// **PARAMETERS**:
    /// - `key: ServiceKey` - Identity the binding answers for
    /// - `binding: Binding<T>` - Instance, factory or memoized factory
    ///
    /// **ERRORS**: `DuplicateRegistration` when `key` exists under `DuplicatePolicy::Reject`
    pub fn bind<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: ServiceKey,
        binding: Binding<T>,
    ) -> Result<(), RegistryError> {
        let registration = Registration::from_binding(key.clone(), binding);
        self.insert(key, registration)
    }

    /// Resolve `T` by constructing a fresh instance every time.
    pub fn register_transient<T: Injectable>(&self) -> Result<(), RegistryError> {
        let key = ServiceKey::of::<T>();
        let service_key = key.clone();
        let activator = activator(move |resolution| {
            let instance = constructor::build::<T>(resolution)?;
            Ok(Service::new(service_key.clone(), instance))
        });
        self.insert(
            key,
            Registration {
                lifetime: Lifetime::Transient,
                type_name: type_name::<T>(),
                activator,
            },
        )
    }

    /// Resolve `S` by resolving the implementation `I` and upcasting it.
    ///
    /// `I` goes through the registry, so a registered `I` wins over
    /// auto-construction.
    pub fn register_transient_as<S, I>(&self, upcast: fn(Arc<I>) -> Arc<S>) -> Result<(), RegistryError>
    where
        S: ?Sized + Send + Sync + 'static,
        I: Injectable,
    {
        let key = ServiceKey::of::<S>();
        let service_key = key.clone();
        let activator = activator(move |resolution| {
            let implementation_key = ServiceKey::of::<I>();
            let implementation = resolution
                .resolve_or_activate(&implementation_key, Some(constructor::activate::<I>))?
                .downcast::<I>()
                .ok_or_else(|| RegistryError::TypeMismatch {
                    service: implementation_key.name().to_string(),
                    expected: type_name::<I>(),
                })?;
            Ok(Service::new(service_key.clone(), upcast(implementation)))
        });
        self.insert(
            key,
            Registration {
                lifetime: Lifetime::Transient,
                type_name: type_name::<I>(),
                activator,
            },
        )
    }

    pub fn register_factory<T, F>(&self, factory: F) -> Result<(), RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        self.bind(ServiceKey::of::<T>(), Binding::factory(factory))
    }

    pub fn register_singleton<T>(&self, instance: Arc<T>) -> Result<(), RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.bind(ServiceKey::of::<T>(), Binding::instance(instance))
    }

    pub fn register_singleton_factory<T, F>(&self, factory: F) -> Result<(), RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        self.bind(ServiceKey::of::<T>(), Binding::singleton_factory(factory))
    }

    /// Resolve a registered `T`.
    ///
    /// Unregistered identities fail with `UnregisteredAbstractType`; use
    /// [`construct`](Self::construct) for the auto-construction fallback.
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, RegistryError> {
        self.resolve_key(&ServiceKey::of::<T>())
    }

    pub fn resolve_key<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: &ServiceKey,
    ) -> Result<Arc<T>, RegistryError> {
        let service = self.resolve_service(key)?;
        downcast_service(&service)
    }

    /// Type-erased resolution used by the resolver adapter.
    pub fn resolve_service(&self, key: &ServiceKey) -> Result<Service, RegistryError> {
        log::debug!("resolving {}", key);
        Resolution::new(self).resolve(key)
    }

    /// Resolve `T`, auto-constructing it when it has no registration.
    ///
    /// Auto-constructed instances are never cached.
    pub fn construct<T: Injectable>(&self) -> Result<Arc<T>, RegistryError> {
        let key = ServiceKey::of::<T>();
        log::debug!("resolving {} with auto-construction", key);
        let service = Resolution::new(self).resolve_or_activate(&key, Some(constructor::activate::<T>))?;
        downcast_service(&service)
    }

    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.registrations.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.registrations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.read().is_empty()
    }

    pub fn keys(&self) -> Vec<ServiceKey> {
        self.registrations.read().keys().cloned().collect()
    }

    /// Snapshot of the configuration and every registration, sorted by key name.
    pub fn describe(&self) -> RegistrySnapshot {
        let mut services: Vec<ServiceDescriptor> = self
            .registrations
            .read()
            .iter()
            .map(|(key, registration)| ServiceDescriptor {
                key: key.name().to_string(),
                named: key.is_named(),
                lifetime: registration.lifetime,
                type_name: registration.type_name,
            })
            .collect();
        services.sort_by(|a, b| a.key.cmp(&b.key));
        RegistrySnapshot {
            config: self.config.clone(),
            services,
        }
    }

    /// **DISPOSE**
    ///
    /// Drops every registration. The registry then behaves as freshly built.
    pub fn dispose(&self) {
        let mut registrations = self.registrations.write();
        log::debug!("disposing registry with {} registrations", registrations.len());
        registrations.clear();
    }

    fn insert(&self, key: ServiceKey, registration: Registration) -> Result<(), RegistryError> {
        let mut registrations = self.registrations.write();
        if registrations.contains_key(&key) {
            match self.config.duplicate_policy {
                DuplicatePolicy::Reject => {
                    return Err(RegistryError::DuplicateRegistration {
                        service: key.name().to_string(),
                    });
                }
                DuplicatePolicy::Replace => {
                    log::warn!("replacing existing registration for {}", key);
                }
            }
        }
        log::debug!("registering {} as {:?}", key, registration.lifetime);
        registrations.insert(key, registration);
        Ok(())
    }

    fn lookup(&self, key: &ServiceKey) -> Option<Registration> {
        self.registrations.read().get(key).cloned()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ServiceRegistry {
    fn drop(&mut self) {
        log::debug!(
            "dropping ServiceRegistry with {} registrations",
            self.registrations.get_mut().len()
        );
    }
}

fn downcast_service<T: ?Sized + Send + Sync + 'static>(service: &Service) -> Result<Arc<T>, RegistryError> {
    service
        .downcast::<T>()
        .ok_or_else(|| RegistryError::TypeMismatch {
            service: service.key().name().to_string(),
            expected: type_name::<T>(),
        })
}
