//! # CONSTRUCTOR DECLARATIONS
//!
//! Concrete types opt into auto-construction by implementing [`Injectable`]
//! and listing their constructors. Each constructor declares its parameters
//! in order, then pulls the resolved arguments back out in the same order.
//!
//! ```rust
//! use holocron::dependencies::{Constructor, Injectable, ServiceRegistry};
//! use std::sync::Arc;
//!
//! struct StarWarsData;
//!
//! struct StarWarsQuery {
//!     data: Arc<StarWarsData>,
//! }
//!
//! impl Injectable for StarWarsQuery {
//!     fn constructors() -> Vec<Constructor<Self>> {
//!         vec![Constructor::builder()
//!             .service::<StarWarsData>()
//!             .build(|args| Ok(StarWarsQuery { data: args.take()? }))]
//!     }
//! }
//!
//! let registry = ServiceRegistry::new();
//! registry.register_singleton(Arc::new(StarWarsData)).unwrap();
//! let query = registry.construct::<StarWarsQuery>().unwrap();
//! assert!(Arc::ptr_eq(&query.data, &registry.resolve::<StarWarsData>().unwrap()));
//! ```

use crate::dependencies::registry::{catch_panic, ActivateFn, Resolution};
use crate::dependencies::types::{Service, ServiceKey};
use crate::errors::RegistryError;
use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

/// A concrete type the registry knows how to build.
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Candidate constructors in declaration order.
    ///
    /// The one with the most parameters is used; ties go to the earliest.
    fn constructors() -> Vec<Constructor<Self>>;
}

/// One declared constructor parameter.
pub struct Parameter {
    key: ServiceKey,
    activate: Option<ActivateFn>,
}

impl Parameter {
    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    /// Whether the parameter can be auto-constructed when unregistered.
    pub fn is_injectable(&self) -> bool {
        self.activate.is_some()
    }
}

type Body<T> = dyn Fn(&mut Arguments) -> Result<T, RegistryError> + Send + Sync;

/// A constructor: ordered parameters plus the body that consumes them.
pub struct Constructor<T> {
    parameters: Vec<Parameter>,
    body: Box<Body<T>>,
}

impl<T: 'static> Constructor<T> {
    pub fn builder() -> ConstructorBuilder<T> {
        ConstructorBuilder {
            parameters: Vec::new(),
            marker: PhantomData,
        }
    }

    /// Zero-argument constructor.
    pub fn nullary<F>(body: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            parameters: Vec::new(),
            body: Box::new(move |_: &mut Arguments| -> Result<T, RegistryError> { Ok(body()) }),
        }
    }
}

impl<T> Constructor<T> {
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }
}

impl<T: Default + 'static> Constructor<T> {
    pub fn default_ctor() -> Self {
        Self::nullary(T::default)
    }
}

/// Collects parameter declarations for a [`Constructor`].
pub struct ConstructorBuilder<T> {
    parameters: Vec<Parameter>,
    marker: PhantomData<fn() -> T>,
}

impl<T: 'static> ConstructorBuilder<T> {
    /// Parameter that must be registered (abstract identity).
    pub fn service<A: ?Sized + Send + Sync + 'static>(mut self) -> Self {
        self.parameters.push(Parameter {
            key: ServiceKey::of::<A>(),
            activate: None,
        });
        self
    }

    /// Parameter that falls back to auto-construction when unregistered.
    pub fn inject<A: Injectable>(mut self) -> Self {
        self.parameters.push(Parameter {
            key: ServiceKey::of::<A>(),
            activate: Some(activate::<A>),
        });
        self
    }

    pub fn build<F>(self, body: F) -> Constructor<T>
    where
        F: Fn(&mut Arguments) -> Result<T, RegistryError> + Send + Sync + 'static,
    {
        Constructor {
            parameters: self.parameters,
            body: Box::new(body),
        }
    }
}

/// Resolved arguments handed to a constructor body, in declaration order.
pub struct Arguments {
    service: &'static str,
    values: std::vec::IntoIter<Service>,
}

impl Arguments {
    /// Take the next argument as an `Arc<A>`.
    pub fn take<A: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Arc<A>, RegistryError> {
        let value = self.values.next().ok_or_else(|| {
            RegistryError::construction(
                self.service,
                "constructor body read more arguments than it declared",
            )
        })?;
        value
            .downcast::<A>()
            .ok_or_else(|| RegistryError::TypeMismatch {
                service: value.key().name().to_string(),
                expected: type_name::<A>(),
            })
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

/// Pick the constructor with the greatest arity, earliest on ties.
pub(crate) fn select<T: 'static>(constructors: Vec<Constructor<T>>) -> Option<Constructor<T>> {
    let mut best: Option<Constructor<T>> = None;
    for candidate in constructors {
        match &best {
            Some(current) if current.arity() >= candidate.arity() => {}
            _ => best = Some(candidate),
        }
    }
    best
}

/// Build a fresh `T`. The caller has already entered `T` on the resolution stack.
pub(crate) fn build<T: Injectable>(resolution: &mut Resolution<'_>) -> Result<Arc<T>, RegistryError> {
    let service = type_name::<T>();
    let constructor = catch_panic(service, || {
        select(T::constructors())
            .ok_or_else(|| RegistryError::construction(service, "no constructors declared"))
    })?;

    let mut values = Vec::with_capacity(constructor.arity());
    for parameter in &constructor.parameters {
        values.push(resolution.resolve_or_activate(&parameter.key, parameter.activate)?);
    }

    let mut arguments = Arguments {
        service,
        values: values.into_iter(),
    };
    let instance = catch_panic(service, || (constructor.body)(&mut arguments))?;
    Ok(Arc::new(instance))
}

/// Auto-construct an unregistered `T`, tracking it for cycle detection.
pub(crate) fn activate<T: Injectable>(resolution: &mut Resolution<'_>) -> Result<Service, RegistryError> {
    let key = ServiceKey::of::<T>();
    log::debug!("auto-constructing {}", key);
    let _entered = resolution.enter(&key)?;
    build::<T>(resolution).map(|instance| Service::new(key, instance))
}
