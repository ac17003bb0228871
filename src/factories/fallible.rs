use crate::{DynSvc, Factory, InjectError, InjectResult, Service, ServiceInfo};
use std::{error::Error, marker::PhantomData};

/// A factory that may fail during construction with a custom error type. On
/// failure, [`InjectError::FactoryFailed`] is returned with the original
/// error kept as its source.
pub struct FallibleFactory<D, R, E, F>
where
    R: Service,
    E: Service + Error,
    F: Factory<D, Result<R, E>>,
{
    inner: F,
    marker: PhantomData<fn(D) -> Result<R, E>>,
}

impl<D, R, E, F> Factory<D, R> for FallibleFactory<D, R, E, F>
where
    D: 'static,
    R: Service,
    E: Service + Error,
    F: Factory<D, Result<R, E>>,
{
    fn arguments() -> Vec<ServiceInfo> {
        F::arguments()
    }

    fn invoke(&self, args: Vec<DynSvc>) -> InjectResult<R> {
        match self.inner.invoke(args)? {
            Ok(result) => Ok(result),
            Err(error) => Err(InjectError::FactoryFailed {
                service_info: ServiceInfo::of::<R>(),
                inner: Box::new(error),
            }),
        }
    }
}

/// Defines a conversion into a fallible factory. This trait is automatically
/// implemented for all factories that return a [`Result<T, E>`] with an
/// error type that implements [`Error`] + [`Service`].
pub trait IntoFallible<D, R, E, F>
where
    R: Service,
    E: Service + Error,
    F: Factory<D, Result<R, E>>,
{
    /// Marks a factory as fallible.
    ///
    /// ## Example
    ///
    /// ```
    /// use graph_injector::{Container, InjectError, IntoFallible, Scope, Svc};
    /// use std::fmt::{Display, Formatter};
    ///
    /// #[derive(Debug)]
    /// struct NoConnection;
    ///
    /// impl std::error::Error for NoConnection {}
    /// impl Display for NoConnection {
    ///     fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    ///         write!(f, "no connection available")
    ///     }
    /// }
    ///
    /// struct Database;
    /// fn connect() -> Result<Database, NoConnection> {
    ///     Err(NoConnection)
    /// }
    ///
    /// let container = Container::new(None);
    /// container.register(Scope::Shared, None, connect.fallible());
    ///
    /// match container.resolve::<Database>() {
    ///     Err(InjectError::FactoryFailed { .. }) => {}
    ///     Err(error) => Err(error).unwrap(),
    ///     Ok(_) => unreachable!("construction should have failed"),
    /// }
    /// ```
    #[must_use]
    fn fallible(self) -> FallibleFactory<D, R, E, F>;
}

impl<D, R, E, F> IntoFallible<D, R, E, F> for F
where
    R: Service,
    E: Service + Error,
    F: Factory<D, Result<R, E>>,
{
    fn fallible(self) -> FallibleFactory<D, R, E, F> {
        FallibleFactory {
            inner: self,
            marker: PhantomData,
        }
    }
}
