use crate::{
    resolution::search::Match, BuildSlot, CacheLookup, Container, Definition,
    DynSvc, InjectError, InjectResult, Key, ResolutionContext, Resolver, Scope,
    Svc,
};
use tracing::{debug, trace};

/// Produces an instance from a matched definition, honouring its scope.
pub(crate) fn construct(
    context: &ResolutionContext,
    found: Match,
) -> InjectResult<DynSvc> {
    let Match {
        owner,
        definition,
        args,
        prebuilt,
    } = found;
    if let Some(value) = prebuilt {
        trace!(container = %owner, key = ?definition.key(), "cache hit");
        return Ok(value);
    }

    if definition.scope().is_cached() {
        build_cached(&owner, context, &definition, args)
    } else {
        build_uncached(&owner, context, &definition, args)
    }
}

/// Builds a transient or object-graph instance. Object-graph instances are
/// remembered by the context before their hook runs, so the hook and
/// everything after it in the same call reuse them.
fn build_uncached(
    owner: &Container,
    context: &ResolutionContext,
    definition: &Definition,
    args: Vec<DynSvc>,
) -> InjectResult<DynSvc> {
    let key = definition.key();
    let per_graph = definition.scope() == Scope::ObjectGraph;
    if per_graph {
        if let Some(value) = context.reused(key, owner.id()) {
            trace!(container = %owner, ?key, "reused within object graph");
            return Ok(value);
        }
    }
    if context.is_building(key, owner.id()) {
        return Err(context.cycle(key.service_info()));
    }

    let value = {
        let _building = context.begin(key, owner.id());
        invoke(owner, context, definition, args)?
    };
    if per_graph {
        context.remember(key, owner.id(), &value);
    }

    if let Err(error) = run_hook(owner, context, definition, &value) {
        if per_graph {
            context.forget(key, owner.id());
        }
        return Err(error);
    }
    Ok(value)
}

/// The outcome of checking the owner's cache under its lock.
enum Claim {
    Ready(DynSvc),
    Wait(Svc<BuildSlot>),
    Cycle,
    Build(Svc<BuildSlot>),
}

fn build_cached(
    owner: &Container,
    context: &ResolutionContext,
    definition: &Definition,
    args: Vec<DynSvc>,
) -> InjectResult<DynSvc> {
    let key = definition.key();
    let slot = loop {
        let claim = owner.with_state(|state| match state.cache.lookup(key) {
            CacheLookup::Ready(value) => Claim::Ready(value),
            CacheLookup::Building(slot)
                if slot.is_owned_by_current_thread() =>
            {
                Claim::Cycle
            }
            CacheLookup::Building(slot) => Claim::Wait(slot),
            CacheLookup::Vacant => Claim::Build(state.cache.begin(key.clone())),
        });

        match claim {
            Claim::Ready(value) => {
                trace!(container = %owner, ?key, "cache hit");
                return Ok(value);
            }
            Claim::Cycle => return Err(context.cycle(key.service_info())),
            Claim::Wait(slot) => {
                trace!(container = %owner, ?key, "waiting for another thread");
                slot.wait();
            }
            Claim::Build(slot) => break slot,
        }
    };

    let pending = PendingBuild {
        owner,
        key,
        slot,
        published: false,
    };
    let value = {
        let _building = context.begin(key, owner.id());
        invoke(owner, context, definition, args)?
    };
    let scope = definition.scope();
    if pending.publish(scope, &value) {
        debug!(container = %owner, ?key, ?scope, "constructed");
    } else {
        debug!(
            container = %owner,
            ?key,
            "definition replaced during construction, instance not cached"
        );
    }

    if let Err(error) = run_hook(owner, context, definition, &value) {
        owner.with_state(|state| state.cache.evict(key, &value));
        return Err(error);
    }
    Ok(value)
}

fn invoke(
    owner: &Container,
    context: &ResolutionContext,
    definition: &Definition,
    args: Vec<DynSvc>,
) -> InjectResult<DynSvc> {
    let value = definition.invoke(&Resolver::new(owner, context), args)?;
    let service_info = definition.key().service_info();
    if !service_info.describes(&value) {
        return Err(InjectError::TypeMismatch { service_info });
    }

    Ok(value)
}

fn run_hook(
    owner: &Container,
    context: &ResolutionContext,
    definition: &Definition,
    value: &DynSvc,
) -> InjectResult<()> {
    match definition.hook() {
        Some(hook) => hook(&Resolver::new(owner, context), value),
        None => Ok(()),
    }
}

/// A building marker in the owner's cache. Unless the value is published,
/// the marker is removed on drop, including when the factory fails or
/// panics. Waiting threads are released either way.
struct PendingBuild<'a> {
    owner: &'a Container,
    key: &'a Key,
    slot: Svc<BuildSlot>,
    published: bool,
}

impl PendingBuild<'_> {
    /// Stores the built value. Returns `false` if the building marker was
    /// dropped in the meantime.
    fn publish(mut self, scope: Scope, value: &DynSvc) -> bool {
        let (key, slot) = (self.key.clone(), &self.slot);
        self.published = self
            .owner
            .with_state(|state| state.cache.publish(key, slot, scope, value));
        self.published
    }
}

impl Drop for PendingBuild<'_> {
    fn drop(&mut self) {
        if !self.published {
            let (key, slot) = (self.key, &self.slot);
            self.owner.with_state(|state| state.cache.abandon(key, slot));
        }
        self.slot.finish();
    }
}
