use crate::dependencies::memo::SingletonMemo;
use serde::Serialize;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Boxed error returned by fallible factories.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub(crate) type FactoryFn<T> = dyn Fn() -> Result<Arc<T>, BoxError> + Send + Sync;

/// **SERVICE IDENTITY**
///
/// **PURPOSE**: Opaque key naming the capability being requested
/// **GUARANTEE**: Type keys compare by `TypeId` only; the name is diagnostic
#[derive(Clone)]
pub enum ServiceKey {
    /// Identity of a Rust type, possibly unsized (`dyn Trait`)
    Type { id: TypeId, name: &'static str },
    /// String identity for hosts that cannot name Rust types
    Named(Arc<str>),
}

impl ServiceKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn named(name: impl Into<Arc<str>>) -> Self {
        Self::Named(name.into())
    }

    /// Display name used in logs and error messages.
    pub fn name(&self) -> &str {
        match self {
            Self::Type { name, .. } => name,
            Self::Named(name) => name,
        }
    }

    pub fn is_named(&self) -> bool {
        matches!(self, Self::Named(_))
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Type { id: a, .. }, Self::Type { id: b, .. }) => a == b,
            (Self::Named(a), Self::Named(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Type { id, .. } => {
                state.write_u8(0);
                id.hash(state);
            }
            Self::Named(name) => {
                state.write_u8(1);
                name.hash(state);
            }
        }
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type { name, .. } => write!(f, "ServiceKey::Type({name})"),
            Self::Named(name) => write!(f, "ServiceKey::Named({name:?})"),
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// **RESOLVED SERVICE HANDLE**
///
/// **PURPOSE**: Type-erased instance crossing the resolver adapter boundary
///
/// The erased value is the `Arc<T>` itself, so unsized services survive the
/// round trip through `Any`.
#[derive(Clone)]
pub struct Service {
    key: ServiceKey,
    type_name: &'static str,
    instance: Arc<dyn Any + Send + Sync>,
}

impl Service {
    pub fn new<T: ?Sized + Send + Sync + 'static>(key: ServiceKey, instance: Arc<T>) -> Self {
        Self {
            key,
            type_name: type_name::<T>(),
            instance: Arc::new(instance),
        }
    }

    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    /// Name of the instance type the service was produced as.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Recover the typed instance. `None` when `T` is not the produced type.
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.instance.downcast_ref::<Arc<T>>().cloned()
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("key", &self.key)
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Lifetime of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
    /// Fresh instance per resolution, built from an `Injectable` type
    Transient,
    /// Fresh instance per resolution, produced by an explicit factory
    Factory,
    /// Pre-built instance shared by every resolution
    Singleton,
    /// Factory invoked once, result shared by every later resolution
    SingletonFactory,
}

/// How a keyed registration produces its instance.
pub struct Binding<T: ?Sized> {
    pub(crate) kind: BindingKind<T>,
}

pub(crate) enum BindingKind<T: ?Sized> {
    Instance(Arc<T>),
    Factory(Box<FactoryFn<T>>),
    Singleton(SingletonMemo<T>),
}

impl<T: ?Sized + Send + Sync + 'static> Binding<T> {
    pub fn instance(instance: Arc<T>) -> Self {
        Self {
            kind: BindingKind::Instance(instance),
        }
    }

    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        Self {
            kind: BindingKind::Factory(Box::new(move || -> Result<Arc<T>, BoxError> {
                Ok(factory())
            })),
        }
    }

    pub fn try_factory<F, E>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<T>, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self {
            kind: BindingKind::Factory(Box::new(move || -> Result<Arc<T>, BoxError> {
                factory().map_err(Into::into)
            })),
        }
    }

    pub fn singleton_factory<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        Self {
            kind: BindingKind::Singleton(SingletonMemo::new(Box::new(
                move || -> Result<Arc<T>, BoxError> { Ok(factory()) },
            ))),
        }
    }

    pub fn try_singleton_factory<F, E>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<T>, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self {
            kind: BindingKind::Singleton(SingletonMemo::new(Box::new(
                move || -> Result<Arc<T>, BoxError> { factory().map_err(Into::into) },
            ))),
        }
    }

    pub fn lifetime(&self) -> Lifetime {
        match self.kind {
            BindingKind::Instance(_) => Lifetime::Singleton,
            BindingKind::Factory(_) => Lifetime::Factory,
            BindingKind::Singleton(_) => Lifetime::SingletonFactory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    trait Character: Send + Sync {
        fn name(&self) -> &str;
    }

    struct Droid;

    impl Character for Droid {
        fn name(&self) -> &str {
            "R2-D2"
        }
    }

    #[test]
    fn test_type_keys_ignore_name_for_equality() {
        let a = ServiceKey::of::<String>();
        let b = ServiceKey::Type {
            id: TypeId::of::<String>(),
            name: "alias",
        };
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_named_and_type_keys_never_collide() {
        let named = ServiceKey::named(type_name::<String>());
        assert_ne!(named, ServiceKey::of::<String>());
        assert!(named.is_named());
        assert_eq!(named.name(), ServiceKey::of::<String>().name());
    }

    #[test]
    fn test_service_downcast_unsized() {
        let droid: Arc<dyn Character> = Arc::new(Droid);
        let service = Service::new(ServiceKey::of::<dyn Character>(), droid.clone());

        let back = service.downcast::<dyn Character>().unwrap();
        assert!(Arc::ptr_eq(&back, &droid));
        assert_eq!(back.name(), "R2-D2");
        assert!(service.downcast::<Droid>().is_none());
    }

    #[test]
    fn test_binding_lifetimes() {
        assert_eq!(Binding::instance(Arc::new(1u8)).lifetime(), Lifetime::Singleton);
        assert_eq!(Binding::factory(|| Arc::new(1u8)).lifetime(), Lifetime::Factory);
        assert_eq!(
            Binding::singleton_factory(|| Arc::new(1u8)).lifetime(),
            Lifetime::SingletonFactory
        );
    }
}
