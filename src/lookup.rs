use crate::{Argument, Arguments, IntoArguments, Key, ServiceInfo, Tag};

/// A type-erased resolve request: the service to build, the tag to look it
/// up with, and the runtime arguments to pass to its factory.
///
/// ```
/// use graph_injector::{
///     downcast_svc, Container, Lookup, Scope, ServiceInfo, Svc,
/// };
///
/// let container = Container::new(None);
/// container.register(Scope::Transient, None, |n: Svc<u32>| *n * 2);
///
/// let lookup =
///     Lookup::new(ServiceInfo::of::<u32>()).with_arguments((21_u32,));
/// let value = container.resolve_dyn(&lookup).unwrap();
/// assert_eq!(42, *downcast_svc::<u32>(value).unwrap());
/// ```
#[derive(Clone, Debug)]
pub struct Lookup {
    service_info: ServiceInfo,
    tag: Option<Tag>,
    any_tag: bool,
    arguments: Arguments,
}

impl Lookup {
    /// Creates an untagged request for a service with no runtime arguments.
    #[must_use]
    pub fn new(service_info: ServiceInfo) -> Self {
        Lookup {
            service_info,
            tag: None,
            any_tag: false,
            arguments: Arguments::new(),
        }
    }

    /// Creates a request for the given type.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Lookup::new(ServiceInfo::of::<T>())
    }

    /// Sets the tag to look definitions up with.
    #[must_use]
    pub fn with_tag(mut self, tag: Option<Tag>) -> Self {
        self.tag = tag;
        self
    }

    /// Sets the tag to look definitions up with.
    #[must_use]
    pub fn tagged(self, tag: impl Into<Tag>) -> Self {
        self.with_tag(Some(tag.into()))
    }

    /// Lets auto-wiring consider definitions with any tag, not only those
    /// matching the requested one. Definitions matching the requested tag
    /// are still preferred.
    #[must_use]
    pub fn any_tag(mut self) -> Self {
        self.any_tag = true;
        self
    }

    /// Replaces the runtime arguments of the request.
    #[must_use]
    pub fn with_arguments(mut self, arguments: impl IntoArguments) -> Self {
        self.arguments = arguments.into_arguments();
        self
    }

    /// Appends a runtime argument.
    #[must_use]
    pub fn argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    /// The requested service.
    #[must_use]
    pub fn service_info(&self) -> ServiceInfo {
        self.service_info
    }

    /// The requested tag.
    #[must_use]
    pub fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }

    /// Whether definitions with any tag may be auto-wired.
    #[must_use]
    pub fn is_any_tag(&self) -> bool {
        self.any_tag
    }

    /// The runtime arguments of the request.
    #[must_use]
    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// The key a definition must have to match this request exactly.
    #[must_use]
    pub fn exact_key(&self) -> Key {
        Key::new(self.service_info, self.tag.clone(), self.arguments.shapes())
    }

    /// A request for one of a definition's dependencies. Dependencies are
    /// looked up with the tag of the request that needs them.
    pub(crate) fn dependency(&self, service_info: ServiceInfo) -> Self {
        Lookup::new(service_info).with_tag(self.tag.clone())
    }
}
