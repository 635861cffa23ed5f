pub use crate::config::{DuplicatePolicy, RegistryConfig};
pub use crate::dependencies::{
    Arguments, Binding, Constructor, Injectable, Lifetime, Service, ServiceKey, ServiceRegistry,
};
pub use crate::errors::RegistryError;
pub use crate::resolver::{RegistryResolver, ServiceProvider, ServiceProviderExt};
