//! # HOLOCRON CORE LIBRARY
//!
//! **SERVICE REGISTRY AND DEPENDENCY RESOLVER FOR THE STAR WARS GRAPHQL HOST**
//!
//! **ARCHITECTURE**: Explicit registry object owned by the composition root
//! **GUARANTEE**: Typed failures from the registry, permissive `Option`s at the host adapter
//! **COMPATIBILITY**: Python hosts through the `holocron-bindings` extension module
//!
//! ## USAGE
//!
//! ```rust
//! use holocron::api::*;
//! use std::sync::Arc;
//!
//! struct StarWarsData {
//!     heroes: Vec<&'static str>,
//! }
//!
//! let registry = ServiceRegistry::new();
//! registry
//!     .register_singleton(Arc::new(StarWarsData { heroes: vec!["Luke", "R2-D2"] }))
//!     .unwrap();
//!
//! let data = registry.resolve::<StarWarsData>().unwrap();
//! assert_eq!(data.heroes.len(), 2);
//!
//! let resolver = RegistryResolver::new(Arc::new(registry));
//! assert!(resolver.resolve::<String>().is_none());
//! ```

pub mod api;
pub mod config;
pub mod dependencies;
pub mod errors;
pub mod resolver;
