pub mod constructor;
pub mod memo;
pub mod registry;
pub mod types;

pub use constructor::{Arguments, Constructor, ConstructorBuilder, Injectable, Parameter};
pub use memo::SingletonMemo;
pub use registry::{RegistrySnapshot, ServiceDescriptor, ServiceRegistry};
pub use types::{Binding, BoxError, Lifetime, Service, ServiceKey};
