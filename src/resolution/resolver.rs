use crate::{
    downcast_svc, resolution, Container, DynSvc, InjectError, InjectResult,
    IntoArguments, Lookup, ResolutionContext, Service, Svc, Tag,
};

/// Resolves services on behalf of a factory or property hook that is
/// running as part of a larger resolve call.
///
/// Requests made through a resolver continue the resolve call that invoked
/// the hook, so the instances it is currently building stay visible and
/// cycles are detected across the whole call. Requests are made against the
/// container that owns the definition being built.
pub struct Resolver<'a> {
    container: &'a Container,
    context: &'a ResolutionContext,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(
        container: &'a Container,
        context: &'a ResolutionContext,
    ) -> Self {
        Resolver { container, context }
    }

    /// The container that owns the definition being built.
    #[must_use]
    pub fn container(&self) -> &Container {
        self.container
    }

    /// How many resolve calls are currently nested, including this one.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.context.depth()
    }

    /// Resolves an untagged service with no runtime arguments.
    pub fn resolve<T: Service>(&self) -> InjectResult<Svc<T>> {
        self.resolve_as(&Lookup::of::<T>())
    }

    /// Resolves a tagged service with no runtime arguments.
    pub fn resolve_tagged<T: Service>(
        &self,
        tag: impl Into<Tag>,
    ) -> InjectResult<Svc<T>> {
        self.resolve_as(&Lookup::of::<T>().tagged(tag))
    }

    /// Resolves a service with runtime arguments.
    pub fn resolve_with<T: Service>(
        &self,
        tag: Option<Tag>,
        arguments: impl IntoArguments,
    ) -> InjectResult<Svc<T>> {
        self.resolve_as(
            &Lookup::of::<T>().with_tag(tag).with_arguments(arguments),
        )
    }

    /// Resolves a service, returning `None` if it has no definition.
    pub fn try_resolve<T: Service>(&self) -> InjectResult<Option<Svc<T>>> {
        match self.resolve() {
            Ok(service) => Ok(Some(service)),
            Err(InjectError::DefinitionNotFound { .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Resolves a type-erased request.
    pub fn resolve_dyn(&self, lookup: &Lookup) -> InjectResult<DynSvc> {
        resolution::resolve(self.container, self.context, lookup)
    }

    fn resolve_as<T: Service>(&self, lookup: &Lookup) -> InjectResult<Svc<T>> {
        downcast_svc(self.resolve_dyn(lookup)?)
    }
}
