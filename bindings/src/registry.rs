use holocron::api::*;
use pyo3::exceptions::{PyLookupError, PyRuntimeError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// Object counter for tracking
static REGISTRY_COUNTER: AtomicU64 = AtomicU64::new(0);

const MAX_KEY_LEN: usize = 256;

/// Catch panics for registry operations
fn catch_panic_registry<F, R>(f: F) -> PyResult<R>
where
    F: FnOnce() -> PyResult<R>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(_) => Err(PyRuntimeError::new_err(
            "Rust panic occurred in registry module",
        )),
    }
}

/// Map a registry failure onto the closest Python exception.
fn to_py_err(err: &RegistryError) -> PyErr {
    let message = format!("{}: {}", err.code(), err);
    match err {
        RegistryError::UnregisteredAbstractType { .. } => PyLookupError::new_err(message),
        RegistryError::DuplicateRegistration { .. } => PyValueError::new_err(message),
        _ => PyRuntimeError::new_err(message),
    }
}

fn validate_key(key: &str) -> PyResult<()> {
    if key.is_empty() {
        return Err(PyValueError::new_err("Service key cannot be empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(PyValueError::new_err(format!(
            "Service key exceeds maximum length ({MAX_KEY_LEN})"
        )));
    }
    Ok(())
}

fn ensure_callable(py: Python<'_>, factory: &Py<PyAny>) -> PyResult<()> {
    if factory.bind(py).is_callable() {
        Ok(())
    } else {
        Err(PyTypeError::new_err("Service factory must be callable"))
    }
}

/// Wrap a Python callable as a registry factory. The GIL is taken per call.
fn python_factory(
    key: &str,
    factory: Py<PyAny>,
) -> impl Fn() -> Result<Arc<Py<PyAny>>, PyErr> + Send + Sync + 'static {
    let key = key.to_string();
    move || {
        Python::with_gil(|py| {
            factory.call0(py).map(Arc::new).map_err(|err| {
                log::error!("Failed to create service '{}': {}", key, err);
                err
            })
        })
    }
}

/// **PYTHON SERVICE REGISTRY**
///
/// **PURPOSE**: Expose the holocron registry to a Python hosting framework
/// **GUARANTEE**: Resolution releases the GIL, so Python factories racing on a
/// singleton cannot deadlock against the memo
#[pyclass(name = "ServiceRegistry", module = "holocron")]
pub struct PyServiceRegistry {
    inner: Arc<ServiceRegistry>,
    /// Unique ID for lifetime tracking
    #[pyo3(get)]
    id: u64,
}

impl PyServiceRegistry {
    fn bind(&self, key: &str, binding: Binding<Py<PyAny>>) -> PyResult<()> {
        #[cfg(debug_assertions)]
        log::debug!(
            "PyServiceRegistry {}: Registering {} as {:?}",
            self.id,
            key,
            binding.lifetime()
        );

        self.inner
            .bind(ServiceKey::named(key), binding)
            .map_err(|err| to_py_err(&err))
    }
}

#[pymethods]
impl PyServiceRegistry {
    /// **CONSTRUCTOR**
    ///
    /// **PARAMETERS**:
    /// - `config: Optional[str]` - JSON registry configuration; omitted fields keep defaults
    #[new]
    #[pyo3(signature = (config = None))]
    fn new(config: Option<&str>) -> PyResult<Self> {
        let config = match config {
            Some(raw) => RegistryConfig::from_json(raw)
                .map_err(|err| PyValueError::new_err(format!("Invalid registry config: {err}")))?,
            None => RegistryConfig::default(),
        };
        let id = REGISTRY_COUNTER.fetch_add(1, Ordering::SeqCst);

        #[cfg(debug_assertions)]
        log::debug!("Creating PyServiceRegistry {} with {:?}", id, config);

        Ok(Self {
            inner: Arc::new(ServiceRegistry::with_config(config)),
            id,
        })
    }

    /// **REGISTER FACTORY**
    ///
    /// **PARAMETERS**:
    /// - `key: &str` - Unique service identifier
    /// - `factory: PyObject` - Zero-argument callable, invoked on every resolution
    fn register_factory(&self, py: Python<'_>, key: &str, factory: Py<PyAny>) -> PyResult<()> {
        catch_panic_registry(|| {
            validate_key(key)?;
            ensure_callable(py, &factory)?;
            self.bind(key, Binding::try_factory(python_factory(key, factory)))
        })
    }

    /// **REGISTER SINGLETON**
    ///
    /// Binds `key` to `instance` for the registry's lifetime.
    fn register_singleton(&self, key: &str, instance: Py<PyAny>) -> PyResult<()> {
        catch_panic_registry(|| {
            validate_key(key)?;
            self.bind(key, Binding::instance(Arc::new(instance)))
        })
    }

    /// **REGISTER SINGLETON FACTORY**
    ///
    /// `factory` runs on first resolution only; every later resolution
    /// returns the same object.
    fn register_singleton_factory(
        &self,
        py: Python<'_>,
        key: &str,
        factory: Py<PyAny>,
    ) -> PyResult<()> {
        catch_panic_registry(|| {
            validate_key(key)?;
            ensure_callable(py, &factory)?;
            self.bind(
                key,
                Binding::try_singleton_factory(python_factory(key, factory)),
            )
        })
    }

    /// **RESOLVE SERVICE**
    ///
    /// **RAISES**: `LookupError` when unregistered, `RuntimeError` when the factory fails
    fn resolve(&self, py: Python<'_>, key: &str) -> PyResult<Py<PyAny>> {
        validate_key(key)?;

        #[cfg(debug_assertions)]
        log::debug!("PyServiceRegistry {}: Resolving {}", self.id, key);

        let registry = Arc::clone(&self.inner);
        let service_key = ServiceKey::named(key);
        let resolved = py
            .allow_threads(move || registry.resolve_key::<Py<PyAny>>(&service_key))
            .map_err(|err| to_py_err(&err))?;
        Ok(resolved.clone_ref(py))
    }

    /// **GET SERVICE**
    ///
    /// Best-effort resolution for the hosting framework: any failure,
    /// including an invalid key, yields `None`.
    fn get_service(&self, py: Python<'_>, key: &str) -> Option<Py<PyAny>> {
        if validate_key(key).is_err() {
            return None;
        }
        let resolver = RegistryResolver::new(Arc::clone(&self.inner));
        let service_key = ServiceKey::named(key);
        py.allow_threads(move || resolver.resolve_key::<Py<PyAny>>(&service_key))
            .map(|resolved| resolved.clone_ref(py))
    }

    /// Whether `key` has a registration.
    fn contains(&self, key: &str) -> bool {
        self.inner.contains(&ServiceKey::named(key))
    }

    /// **GET REGISTERED KEYS**
    ///
    /// **RETURNS**: Sorted list of registered service keys
    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .inner
            .keys()
            .iter()
            .map(|key| key.name().to_string())
            .collect();
        keys.sort();
        keys
    }

    /// **DISPOSE**
    ///
    /// **PURPOSE**: Drop every registration
    fn dispose(&self) {
        #[cfg(debug_assertions)]
        log::debug!("PyServiceRegistry {}: Disposing", self.id);

        self.inner.dispose();
    }

    /// Configuration and registrations as a JSON document.
    fn describe(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner.describe())
            .map_err(|err| PyRuntimeError::new_err(err.to_string()))
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __contains__(&self, key: &str) -> bool {
        self.contains(key)
    }

    /// String representation for debugging
    fn __repr__(&self) -> String {
        format!(
            "ServiceRegistry(id={}, services={})",
            self.id,
            self.inner.len()
        )
    }
}

/// Implement Drop to track object lifecycle
impl Drop for PyServiceRegistry {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        log::debug!(
            "Dropping PyServiceRegistry {} with {} services",
            self.id,
            self.inner.len()
        );
    }
}
