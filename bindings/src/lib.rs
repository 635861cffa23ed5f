//! Python bindings for the holocron service registry.
//!
//! Example:
//!     registry = ServiceRegistry()
//!     registry.register_singleton_factory("data", StarWarsData)
//!     registry.get_service("data")
//!
//! Raises:
//!     LookupError -- resolving an unregistered key through `resolve`
//!     ValueError -- invalid key, duplicate registration or bad config
//!     RuntimeError -- factory failure or Rust panic

use pyo3::prelude::*;

mod registry;

pub use registry::PyServiceRegistry;

#[pymodule]
fn _holocron(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Host controls verbosity through RUST_LOG; a second import keeps the first logger.
    let _ = env_logger::try_init();
    m.add_class::<PyServiceRegistry>()?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
