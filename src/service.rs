#![allow(clippy::used_underscore_binding)]

use crate::Tag;
use derive_more::Display;
use std::{
    any::{Any, TypeId},
    error::Error,
    sync::{Arc, Weak},
};

/// A reference-counted pointer holding a service. Services are shared
/// between threads, so this is always an [`Arc<T>`].
pub type Svc<T> = Arc<T>;

/// A reference-counted service pointer holding an instance of `dyn Any`. This
/// is the uniform value produced by type-erased factories and returned by
/// [`Container::resolve_dyn`](crate::Container::resolve_dyn).
pub type DynSvc = Arc<dyn Any + Send + Sync>;

/// A non-owning pointer to a type-erased service.
pub type WeakDynSvc = Weak<dyn Any + Send + Sync>;

/// A result from attempting to resolve a service and construct an instance
/// of it.
pub type InjectResult<T> = Result<T, InjectError>;

/// Implemented automatically on types that are capable of being a service.
pub trait Service: Any + Send + Sync {}
impl<T: Any + Send + Sync> Service for T {}

/// Type information about a service.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct ServiceInfo {
    id: TypeId,
    name: &'static str,
}

impl ServiceInfo {
    /// Creates a [`ServiceInfo`] for the given type.
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + Any>() -> Self {
        ServiceInfo {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Gets the [`TypeId`] for this service.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Gets the type name of this service.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Checks whether a type-erased service actually holds this type.
    #[must_use]
    pub fn describes(&self, value: &DynSvc) -> bool {
        (**value).type_id() == self.id
    }
}

/// Downcasts a type-erased service pointer back into a typed one.
///
/// ```
/// use graph_injector::{downcast_svc, DynSvc, InjectError, Svc};
///
/// let value: DynSvc = Svc::new(4_u8);
/// let typed: Svc<u8> = downcast_svc(value.clone()).unwrap();
/// assert_eq!(4, *typed);
///
/// assert!(matches!(
///     downcast_svc::<u16>(value),
///     Err(InjectError::TypeMismatch { .. })
/// ));
/// ```
pub fn downcast_svc<T: Service>(value: DynSvc) -> InjectResult<Svc<T>> {
    value.downcast::<T>().map_err(|_| InjectError::TypeMismatch {
        service_info: ServiceInfo::of::<T>(),
    })
}

/// An error that has occurred during resolution of a service.
#[derive(Debug, Display)]
#[display(fmt = "an error occurred during resolution: {}")]
#[non_exhaustive]
pub enum InjectError {
    /// No definition anywhere in the visibility chain matches the request.
    #[display(
        fmt = "{}{} has no definition",
        "service_info.name()",
        "fmt_tag(tag.as_ref())"
    )]
    DefinitionNotFound {
        /// The service that was requested.
        service_info: ServiceInfo,

        /// The tag that was requested.
        tag: Option<Tag>,
    },

    /// Two or more auto-wiring candidates succeeded at the same priority.
    #[display(
        fmt = "{} has {} equally suitable definitions",
        "service_info.name()",
        candidates
    )]
    AmbiguousDefinitions {
        /// The service that was requested.
        service_info: ServiceInfo,

        /// The number of candidates that could have been used.
        candidates: usize,
    },

    /// Auto-wiring was attempted, but no candidate's dependencies could be
    /// resolved.
    #[display(
        fmt = "none of the {} definitions of {} could be auto-wired",
        candidates,
        "service_info.name()"
    )]
    AutoInjectionFailed {
        /// The service that was requested.
        service_info: ServiceInfo,

        /// The number of candidates that were attempted.
        candidates: usize,
    },

    /// The factory of a service returned an error.
    #[display(
        fmt = "the factory for {} failed: {}",
        "service_info.name()",
        inner
    )]
    FactoryFailed {
        /// The service that was requested.
        service_info: ServiceInfo,

        /// The error returned by the factory.
        inner: Box<dyn Error + Send + Sync + 'static>,
    },

    /// A service depends on itself through its factory arguments. Cycles
    /// must be closed through property hooks instead.
    #[display(
        fmt = "a cycle was detected during construction of {} [{}]",
        "service_info.name()",
        "fmt_cycle(cycle)"
    )]
    CycleDetected {
        /// The service that was requested.
        service_info: ServiceInfo,

        /// The chain of services under construction, innermost last.
        cycle: Vec<ServiceInfo>,
    },

    /// Resolution nested deeper than the container allows.
    #[display(
        fmt = "resolution of {} exceeded the maximum depth of {}",
        "service_info.name()",
        depth
    )]
    RecursionLimitExceeded {
        /// The service that was being resolved when the limit was hit.
        service_info: ServiceInfo,

        /// The configured depth limit.
        depth: usize,
    },

    /// A type-erased value did not have the expected type.
    #[display(
        fmt = "a value did not have the expected type {}",
        "service_info.name()"
    )]
    TypeMismatch {
        /// The type that was expected.
        service_info: ServiceInfo,
    },

    /// An unexpected error has occurred. This is usually caused by a bug in
    /// the library itself.
    #[display(
        fmt = "an unexpected error occurred (please report this): {}",
        _0
    )]
    InternalError(String),
}

impl InjectError {
    /// Wraps an error returned by a factory.
    pub fn factory_failed<T: ?Sized + Any>(
        inner: impl Into<Box<dyn Error + Send + Sync + 'static>>,
    ) -> Self {
        InjectError::FactoryFailed {
            service_info: ServiceInfo::of::<T>(),
            inner: inner.into(),
        }
    }
}

impl Error for InjectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InjectError::FactoryFailed { inner, .. } => Some(&**inner),
            _ => None,
        }
    }
}

fn fmt_tag(tag: Option<&Tag>) -> String {
    tag.map(|tag| format!(" (tag {})", tag)).unwrap_or_default()
}

fn fmt_cycle(cycle: &[ServiceInfo]) -> String {
    let mut joined = String::new();
    for item in cycle {
        if !joined.is_empty() {
            joined.push_str(" -> ");
        }
        joined.push_str(item.name());
    }
    joined
}
