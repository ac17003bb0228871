use crate::{downcast_svc, DynSvc, InjectResult, Key, Resolver, Service, Svc};
use parking_lot::RwLock;
use std::{
    any::Any,
    fmt::{Debug, Formatter},
    marker::PhantomData,
};

/// Controls how long a constructed service lives and whether later requests
/// receive the same instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum Scope {
    /// A new instance is created for every request. Never cached.
    Transient,

    /// One instance is created per top-level resolve call and reused by
    /// everything built during that call, including property hooks. The
    /// next call creates a new instance.
    ObjectGraph,

    /// A single instance is created on first request and cached for as long
    /// as the container owning the definition lives.
    #[default]
    Shared,

    /// A single instance is reused for as long as something outside the
    /// container holds a strong reference to it. Once every reference has
    /// been released, the next request creates a new instance.
    WeakSingleton,
}

impl Scope {
    /// Whether instances of this scope are kept by the owning container
    /// across resolve calls.
    #[must_use]
    pub fn is_cached(self) -> bool {
        matches!(self, Scope::Shared | Scope::WeakSingleton)
    }
}

pub(crate) type ErasedFactory =
    dyn Fn(&Resolver<'_>, Vec<DynSvc>) -> InjectResult<DynSvc> + Send + Sync;

pub(crate) type ErasedHook =
    dyn Fn(&Resolver<'_>, &DynSvc) -> InjectResult<()> + Send + Sync;

/// A single registration: how to build a service, its scope, and what to do
/// once the built instance is cached.
pub(crate) struct Definition {
    key: Key,
    scope: Scope,
    order: u64,
    factory: Box<ErasedFactory>,
    hook: RwLock<Option<Svc<ErasedHook>>>,
}

impl Definition {
    pub fn new(
        key: Key,
        scope: Scope,
        order: u64,
        factory: Box<ErasedFactory>,
    ) -> Self {
        Definition {
            key,
            scope,
            order,
            factory,
            hook: RwLock::new(None),
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Position of this definition in its registry's registration sequence.
    pub fn order(&self) -> u64 {
        self.order
    }

    pub fn invoke(
        &self,
        resolver: &Resolver<'_>,
        args: Vec<DynSvc>,
    ) -> InjectResult<DynSvc> {
        (self.factory)(resolver, args)
    }

    pub fn hook(&self) -> Option<Svc<ErasedHook>> {
        self.hook.read().clone()
    }

    pub fn set_hook(&self, hook: Svc<ErasedHook>) {
        *self.hook.write() = Some(hook);
    }
}

impl Debug for Definition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Definition")
            .field("key", &self.key)
            .field("scope", &self.scope)
            .field("order", &self.order)
            .field("has_hook", &self.hook.read().is_some())
            .finish()
    }
}

/// A handle to a registered definition, returned by
/// [`Container::register`](crate::Container::register). It is used to attach
/// a property hook after registration.
pub struct DefinitionHandle<T: ?Sized = dyn Any + Send + Sync> {
    definition: Svc<Definition>,
    marker: PhantomData<fn() -> Svc<T>>,
}

impl<T: ?Sized> DefinitionHandle<T> {
    pub(crate) fn new(definition: Svc<Definition>) -> Self {
        DefinitionHandle {
            definition,
            marker: PhantomData,
        }
    }

    /// The key the definition was registered under.
    #[must_use]
    pub fn key(&self) -> &Key {
        self.definition.key()
    }

    /// The scope of the definition.
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.definition.scope()
    }

    /// Attaches a property hook that receives the type-erased instance.
    pub fn resolving_properties_dyn<H>(self, hook: H) -> Self
    where
        H: Fn(&Resolver<'_>, &DynSvc) -> InjectResult<()>
            + Send
            + Sync
            + 'static,
    {
        self.definition.set_hook(Svc::new(hook));
        self
    }
}

impl<T: Service> DefinitionHandle<T> {
    /// Attaches a property hook to the definition. The hook runs after each
    /// newly constructed instance has been cached, so anything it resolves
    /// can refer back to that same instance. This is how object cycles are
    /// closed: fields holding back-references are assigned here instead of
    /// in the factory.
    ///
    /// ## Example
    ///
    /// ```
    /// use graph_injector::{Container, Scope, Svc};
    /// use parking_lot::RwLock;
    /// use std::sync::Weak;
    ///
    /// struct Parent {
    ///     child: RwLock<Option<Svc<Child>>>,
    /// }
    ///
    /// struct Child {
    ///     parent: RwLock<Weak<Parent>>,
    /// }
    ///
    /// let container = Container::new(None);
    /// container
    ///     .register(Scope::Shared, None, || Parent {
    ///         child: RwLock::new(None),
    ///     })
    ///     .resolving_properties(|resolver, parent| {
    ///         *parent.child.write() = Some(resolver.resolve()?);
    ///         Ok(())
    ///     });
    /// container
    ///     .register(Scope::Shared, None, || Child {
    ///         parent: RwLock::new(Weak::new()),
    ///     })
    ///     .resolving_properties(|resolver, child| {
    ///         *child.parent.write() = Svc::downgrade(&resolver.resolve()?);
    ///         Ok(())
    ///     });
    ///
    /// let parent: Svc<Parent> = container.resolve().unwrap();
    /// let child = parent.child.read().clone().unwrap();
    /// let back = child.parent.read().upgrade().unwrap();
    /// assert!(Svc::ptr_eq(&parent, &back));
    /// ```
    pub fn resolving_properties<H>(self, hook: H) -> Self
    where
        H: Fn(&Resolver<'_>, &Svc<T>) -> InjectResult<()>
            + Send
            + Sync
            + 'static,
    {
        self.resolving_properties_dyn(move |resolver, value| {
            let value = downcast_svc::<T>(value.clone())?;
            hook(resolver, &value)
        })
    }
}

impl<T: ?Sized> Clone for DefinitionHandle<T> {
    fn clone(&self) -> Self {
        DefinitionHandle::new(self.definition.clone())
    }
}

impl<T: ?Sized> Debug for DefinitionHandle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DefinitionHandle")
            .field(&self.definition)
            .finish()
    }
}
