use thiserror::Error;

/// Failures surfaced by [`ServiceRegistry`](crate::dependencies::ServiceRegistry).
///
/// Every variant carries the display name of the service involved so that
/// bootstrap code can fail fast with a readable message.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("UNREGISTERED SERVICE: no registration for abstract type {service}")]
    UnregisteredAbstractType { service: String },

    #[error("CONSTRUCTION ERROR: {service} - {message}")]
    ConstructionFailure { service: String, message: String },

    #[error("DUPLICATE REGISTRATION: {service} is already registered")]
    DuplicateRegistration { service: String },

    #[error("CIRCULAR DEPENDENCY: {}", .path.join(" -> "))]
    CircularDependency { path: Vec<String> },

    #[error("DEPTH EXCEEDED: resolving {service} nested deeper than {limit}")]
    DepthExceeded { service: String, limit: usize },

    #[error("TYPE MISMATCH: {service} does not hold a {expected}")]
    TypeMismatch {
        service: String,
        expected: &'static str,
    },
}

impl RegistryError {
    /// Stable machine-readable code for host-side reporting.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnregisteredAbstractType { .. } => "HOLOCRON_UNREGISTERED_ABSTRACT_TYPE",
            Self::ConstructionFailure { .. } => "HOLOCRON_CONSTRUCTION_FAILURE",
            Self::DuplicateRegistration { .. } => "HOLOCRON_DUPLICATE_REGISTRATION",
            Self::CircularDependency { .. } => "HOLOCRON_CIRCULAR_DEPENDENCY",
            Self::DepthExceeded { .. } => "HOLOCRON_DEPTH_EXCEEDED",
            Self::TypeMismatch { .. } => "HOLOCRON_TYPE_MISMATCH",
        }
    }

    pub(crate) fn construction(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConstructionFailure {
            service: service.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circular_dependency_message_joins_path() {
        let err = RegistryError::CircularDependency {
            path: vec!["Query".into(), "Schema".into(), "Query".into()],
        };
        assert_eq!(
            err.to_string(),
            "CIRCULAR DEPENDENCY: Query -> Schema -> Query"
        );
        assert_eq!(err.code(), "HOLOCRON_CIRCULAR_DEPENDENCY");
    }

    #[test]
    fn test_construction_helper() {
        let err = RegistryError::construction("Droid", "boom");
        match err {
            RegistryError::ConstructionFailure { service, message } => {
                assert_eq!(service, "Droid");
                assert_eq!(message, "boom");
            }
            _ => panic!("Wrong error type"),
        }
    }
}
