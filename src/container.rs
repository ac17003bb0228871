use crate::{
    downcast_svc, resolution, ContainerBuilder, Definition, DefinitionHandle,
    DynSvc, ErasedFactory, Factory, InjectError, InjectResult, IntoArguments,
    Key, Lookup, Registry, ResolutionContext, Resolver, Scope, ScopeCache,
    Service, ServiceInfo, Svc, Tag,
};
use derive_more::Display;
use parking_lot::ReentrantMutex;
use std::{
    cell::RefCell,
    fmt::{Debug, Formatter},
    mem,
    sync::{
        atomic::{AtomicU64, Ordering},
        Weak,
    },
};
use tracing::{debug, trace};

/// A process-wide unique identifier of a container.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
#[display(fmt = "#{}", _0)]
pub struct ContainerId(u64);

impl ContainerId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ContainerId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Everything a container guards with its lock.
pub(crate) struct ContainerState {
    pub registry: Registry,
    pub cache: ScopeCache,
    pub collaborators: Vec<Weak<ContainerInner>>,
}

pub(crate) struct ContainerInner {
    id: ContainerId,
    name: Option<String>,
    max_depth: usize,
    parent: Option<Weak<ContainerInner>>,
    state: ReentrantMutex<RefCell<ContainerState>>,
}

/// A dependency injection container. It holds definitions describing how to
/// build services, and caches the instances built from them according to
/// their [`Scope`].
///
/// Containers are cheap handles and can be cloned freely; clones refer to
/// the same registry and cache.
///
/// When a request cannot be satisfied locally, a container consults its
/// parent chain, nearest ancestor first, and then each of its collaborators.
/// Neither relation is ever followed in reverse: a parent cannot see its
/// children's definitions, and a container listed as a collaborator cannot
/// see the definitions of the container that listed it.
///
/// ```
/// use graph_injector::{Container, Scope, Svc};
///
/// struct Config(&'static str);
/// struct Client(Svc<Config>);
///
/// let root = Container::new(None);
/// root.register(Scope::Shared, None, || Config("production"));
///
/// let child = Container::new(Some(&root));
/// child.register(Scope::Transient, None, Client);
///
/// let client: Svc<Client> = child.resolve().unwrap();
/// assert_eq!("production", client.0 .0);
/// assert!(root.resolve::<Client>().is_err());
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Svc<ContainerInner>,
}

impl Container {
    /// Creates a container, optionally attached to a parent.
    #[must_use]
    pub fn new(parent: Option<&Container>) -> Self {
        let mut builder = Container::builder();
        if let Some(parent) = parent {
            builder.parent(parent);
        }
        builder.build()
    }

    /// Creates a builder for configuring a new container.
    #[must_use]
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::default()
    }

    pub(crate) fn from_parts(
        parent: Option<&Container>,
        name: Option<String>,
        max_depth: usize,
    ) -> Self {
        let container = Container {
            inner: Svc::new(ContainerInner {
                id: ContainerId::next(),
                name,
                max_depth,
                parent: parent.map(|parent| Svc::downgrade(&parent.inner)),
                state: ReentrantMutex::new(RefCell::new(ContainerState {
                    registry: Registry::default(),
                    cache: ScopeCache::default(),
                    collaborators: Vec::new(),
                })),
            }),
        };
        let parent = parent.map(Container::id);
        trace!(container = %container, ?parent, "created container");
        container
    }

    /// The unique identifier of this container.
    #[must_use]
    pub fn id(&self) -> ContainerId {
        self.inner.id
    }

    /// The name this container was built with, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// The deepest a resolve call started on this container may nest.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.inner.max_depth
    }

    /// The parent of this container, if it has one and it is still alive.
    #[must_use]
    pub fn parent(&self) -> Option<Container> {
        let inner = self.inner.parent.as_ref()?.upgrade()?;
        Some(Container { inner })
    }

    /// The collaborators of this container that are still alive, in the
    /// order they were added.
    #[must_use]
    pub fn collaborators(&self) -> Vec<Container> {
        self.with_state(|state| {
            state
                .collaborators
                .iter()
                .filter_map(Weak::upgrade)
                .map(|inner| Container { inner })
                .collect()
        })
    }

    /// Adds a collaborator: a peer container consulted when a request cannot
    /// be satisfied by this container or its ancestors. The relation is one
    /// way. `other` gains no visibility into this container.
    ///
    /// Adding a container as its own collaborator, or adding the same
    /// collaborator twice, has no effect.
    ///
    /// ```
    /// use graph_injector::{Container, InjectError, Scope};
    ///
    /// let shared = Container::new(None);
    /// shared.register(Scope::Shared, None, || 8_u16);
    ///
    /// let app = Container::new(None);
    /// app.register(Scope::Shared, None, || 3_u32);
    /// app.collaborate(&shared);
    ///
    /// assert_eq!(8, *app.resolve::<u16>().unwrap());
    /// assert!(matches!(
    ///     shared.resolve::<u32>(),
    ///     Err(InjectError::DefinitionNotFound { .. })
    /// ));
    /// ```
    pub fn collaborate(&self, other: &Container) {
        if Svc::ptr_eq(&self.inner, &other.inner) {
            return;
        }

        let added = self.with_state(|state| {
            state
                .collaborators
                .retain(|collaborator| collaborator.strong_count() > 0);
            let known = state.collaborators.iter().any(|collaborator| {
                std::ptr::eq(collaborator.as_ptr(), Svc::as_ptr(&other.inner))
            });
            if !known {
                state.collaborators.push(Svc::downgrade(&other.inner));
            }
            !known
        });
        if added {
            let collaborator = other.id();
            debug!(container = %self, %collaborator, "added collaborator");
        }
    }

    /// Registers a factory for `T`. The factory's parameter types, in order,
    /// become the argument shapes of the definition's key. Any definition
    /// previously registered in this container under an identical key is
    /// replaced.
    ///
    /// ```
    /// use graph_injector::{Container, Scope, Svc, Tag};
    ///
    /// struct Greeting(String);
    ///
    /// let container = Container::new(None);
    /// container.register(Scope::Shared, None, || Greeting("hello".into()));
    /// container.register(Scope::Shared, Some(Tag::from("fr")), || {
    ///     Greeting("bonjour".into())
    /// });
    /// container.register(Scope::Transient, None, |name: Svc<&'static str>| {
    ///     Greeting(format!("hello, {}", name))
    /// });
    ///
    /// let plain: Svc<Greeting> = container.resolve().unwrap();
    /// let french: Svc<Greeting> = container.resolve_tagged("fr").unwrap();
    /// let named: Svc<Greeting> =
    ///     container.resolve_with(None, ("Ada",)).unwrap();
    /// assert_eq!("hello", plain.0);
    /// assert_eq!("bonjour", french.0);
    /// assert_eq!("hello, Ada", named.0);
    /// ```
    pub fn register<T, D, F>(
        &self,
        scope: Scope,
        tag: Option<Tag>,
        factory: F,
    ) -> DefinitionHandle<T>
    where
        T: Service,
        D: 'static,
        F: Factory<D, T>,
    {
        let key = Key::new(ServiceInfo::of::<T>(), tag, F::arguments());
        let factory: Box<ErasedFactory> =
            Box::new(move |_: &Resolver<'_>, args: Vec<DynSvc>| {
                let value: DynSvc = Svc::new(factory.invoke(args)?);
                Ok(value)
            });
        DefinitionHandle::new(self.insert(key, scope, factory))
    }

    /// Registers a type-erased factory. The factory receives one value per
    /// entry of `args`, in order, and must produce a value of the type
    /// described by `service_info`. It may resolve further services through
    /// the given [`Resolver`].
    pub fn register_erased<F>(
        &self,
        scope: Scope,
        service_info: ServiceInfo,
        tag: Option<Tag>,
        args: Vec<ServiceInfo>,
        factory: F,
    ) -> DefinitionHandle
    where
        F: Fn(&Resolver<'_>, Vec<DynSvc>) -> InjectResult<DynSvc>
            + Send
            + Sync
            + 'static,
    {
        let key = Key::new(service_info, tag, args);
        DefinitionHandle::new(self.insert(key, scope, Box::new(factory)))
    }

    fn insert(
        &self,
        key: Key,
        scope: Scope,
        factory: Box<ErasedFactory>,
    ) -> Svc<Definition> {
        let (definition, replaced, stale, count) = self.with_state(|state| {
            let (definition, replaced) =
                state.registry.insert(key.clone(), scope, factory);
            // The old definition's instance must not answer for the new one
            let stale =
                replaced.as_ref().and_then(|_| state.cache.remove(&key));
            (definition, replaced, stale, state.registry.len())
        });

        if replaced.is_some() {
            let evicted = stale.is_some();
            debug!(
                container = %self,
                ?key,
                ?scope,
                evicted,
                "replaced definition"
            );
        } else {
            debug!(
                container = %self,
                ?key,
                ?scope,
                definitions = count,
                "registered definition"
            );
        }

        // Destructors may resolve from this container again
        drop((replaced, stale));
        definition
    }

    /// Resolves an untagged service with no runtime arguments.
    pub fn resolve<T: Service>(&self) -> InjectResult<Svc<T>> {
        self.resolve_as(&Lookup::of::<T>())
    }

    /// Resolves a service registered under a tag. Untagged definitions are
    /// used when no definition with the tag exists.
    pub fn resolve_tagged<T: Service>(
        &self,
        tag: impl Into<Tag>,
    ) -> InjectResult<Svc<T>> {
        self.resolve_as(&Lookup::of::<T>().tagged(tag))
    }

    /// Resolves a service, passing runtime arguments to its factory.
    pub fn resolve_with<T: Service>(
        &self,
        tag: Option<Tag>,
        arguments: impl IntoArguments,
    ) -> InjectResult<Svc<T>> {
        self.resolve_as(
            &Lookup::of::<T>().with_tag(tag).with_arguments(arguments),
        )
    }

    /// Resolves an untagged service with no runtime arguments, returning
    /// `None` if nothing visible to this container can build it.
    ///
    /// ```
    /// use graph_injector::Container;
    ///
    /// let container = Container::new(None);
    /// assert!(container.try_resolve::<u8>().unwrap().is_none());
    /// ```
    pub fn try_resolve<T: Service>(&self) -> InjectResult<Option<Svc<T>>> {
        match self.resolve() {
            Ok(service) => Ok(Some(service)),
            Err(InjectError::DefinitionNotFound { .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Resolves a type-erased request. Each call starts a new resolution
    /// context.
    pub fn resolve_dyn(&self, lookup: &Lookup) -> InjectResult<DynSvc> {
        let context = ResolutionContext::new(self.inner.max_depth);
        resolution::resolve(self, &context, lookup)
    }

    fn resolve_as<T: Service>(&self, lookup: &Lookup) -> InjectResult<Svc<T>> {
        downcast_svc(self.resolve_dyn(lookup)?)
    }

    /// Whether a definition is registered in this container under exactly
    /// this key. Ancestors and collaborators are not consulted.
    #[must_use]
    pub fn is_registered(&self, key: &Key) -> bool {
        self.with_state(|state| state.registry.contains(key))
    }

    /// Removes every definition registered in this container and drops
    /// every instance it has cached. Parent and collaborator links are kept.
    pub fn reset(&self) {
        let (registry, cache) = self.with_state(|state| {
            (mem::take(&mut state.registry), mem::take(&mut state.cache))
        });
        debug!(container = %self, definitions = registry.len(), "reset");

        // Destructors of cached instances may use this container again
        drop((registry, cache));
    }

    /// Runs `f` with this container's lock held. `f` must not run user code
    /// or touch another container.
    pub(crate) fn with_state<R>(
        &self,
        f: impl FnOnce(&mut ContainerState) -> R,
    ) -> R {
        let guard = self.inner.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "{}", self.id()),
        }
    }
}

impl Debug for Container {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.with_state(|state| {
            f.debug_struct("Container")
                .field("id", &self.id())
                .field("name", &self.name())
                .field("definitions", &state.registry)
                .field("cache", &state.cache)
                .field("collaborators", &state.collaborators.len())
                .finish()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = Container::new(None);
        let b = a.clone();
        let c = Container::new(None);
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn dropped_links_are_not_followed() {
        let child = {
            let parent = Container::new(None);
            let child = Container::new(Some(&parent));
            assert!(child.parent().is_some());

            let peer = Container::new(None);
            child.collaborate(&peer);
            assert_eq!(1, child.collaborators().len());
            child
        };

        assert!(child.parent().is_none());
        assert!(child.collaborators().is_empty());
    }

    #[test]
    fn collaborate_ignores_self_and_duplicates() {
        let container = Container::new(None);
        let peer = Container::new(None);
        container.collaborate(&container);
        container.collaborate(&peer);
        container.collaborate(&peer.clone());

        let collaborators = container.collaborators();
        assert_eq!(1, collaborators.len());
        assert_eq!(peer.id(), collaborators[0].id());
    }

    #[test]
    fn is_registered_checks_the_exact_key() {
        let container = Container::new(None);
        let handle = container.register(Scope::Shared, None, |n: Svc<u8>| {
            u16::from(*n)
        });

        assert!(container.is_registered(handle.key()));
        assert!(!container.is_registered(&Key::new(
            ServiceInfo::of::<u16>(),
            None,
            Vec::new()
        )));

        container.reset();
        assert!(!container.is_registered(handle.key()));
    }
}
