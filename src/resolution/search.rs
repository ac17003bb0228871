use crate::{
    resolution, Container, Definition, DynSvc, InjectError, InjectResult,
    Lookup, ResolutionContext, ServiceInfo, Svc,
};
use std::cmp::Reverse;
use tracing::{debug, trace};

/// A definition chosen to satisfy a request, together with the container
/// that owns it and the arguments its factory will receive.
pub(crate) struct Match {
    pub owner: Container,
    pub definition: Svc<Definition>,
    pub args: Vec<DynSvc>,

    /// An instance already published in the owner's cache, found while
    /// evaluating auto-wiring candidates.
    pub prebuilt: Option<DynSvc>,
}

/// How a declared factory parameter gets its value.
enum Binding {
    /// Bound to the runtime argument at this index.
    Provided(usize),

    /// Resolved from the owning container.
    Resolve(ServiceInfo),
}

/// What the search learned from candidates that did not work out.
#[derive(Default)]
struct Attempts {
    /// Auto-wiring candidates evaluated anywhere in the search.
    evaluated: usize,

    /// The first cycle a candidate ran into. Reported when nothing else
    /// satisfies the request.
    cycle: Option<InjectError>,
}

/// Finds the definition that should satisfy a request. The container itself
/// is searched first, then its ancestors, then each collaborator along with
/// the collaborator's ancestors.
pub(crate) fn find(
    container: &Container,
    context: &ResolutionContext,
    lookup: &Lookup,
) -> InjectResult<Match> {
    let mut attempts = Attempts::default();
    if let Some(found) =
        search_hierarchy(container, context, lookup, &mut attempts)?
    {
        return Ok(found);
    }

    for collaborator in container.collaborators() {
        trace!(
            container = %container,
            collaborator = %collaborator,
            service = lookup.service_info().name(),
            "falling back to collaborator"
        );
        if let Some(found) =
            search_hierarchy(&collaborator, context, lookup, &mut attempts)?
        {
            return Ok(found);
        }
    }

    if let Some(cycle) = attempts.cycle {
        Err(cycle)
    } else if attempts.evaluated > 0 {
        Err(InjectError::AutoInjectionFailed {
            service_info: lookup.service_info(),
            candidates: attempts.evaluated,
        })
    } else {
        Err(InjectError::DefinitionNotFound {
            service_info: lookup.service_info(),
            tag: lookup.tag().cloned(),
        })
    }
}

fn search_hierarchy(
    container: &Container,
    context: &ResolutionContext,
    lookup: &Lookup,
    attempts: &mut Attempts,
) -> InjectResult<Option<Match>> {
    let mut current = Some(container.clone());
    while let Some(scope) = current {
        if let Some(found) = search_local(&scope, context, lookup, attempts)? {
            return Ok(Some(found));
        }
        current = scope.parent();
    }

    Ok(None)
}

fn search_local(
    container: &Container,
    context: &ResolutionContext,
    lookup: &Lookup,
    attempts: &mut Attempts,
) -> InjectResult<Option<Match>> {
    let key = lookup.exact_key();
    let exact = container.with_state(|state| state.registry.find_exact(&key));
    if let Some(definition) = exact {
        let key = definition.key();
        trace!(container = %container, ?key, "exact match");
        return Ok(Some(Match {
            owner: container.clone(),
            definition,
            args: lookup.arguments().clone().into_values(),
            prebuilt: None,
        }));
    }

    auto_wire(container, context, lookup, attempts)
}

/// Binds the provided runtime arguments, in order, to the declared
/// parameters of a factory. Each argument takes the first remaining
/// parameter of its exact type. Fails unless every argument is bound.
fn bind(
    params: &[ServiceInfo],
    provided: &[ServiceInfo],
) -> Option<Vec<Binding>> {
    let mut next = 0;
    let mut bindings = Vec::with_capacity(params.len());
    for &param in params {
        if provided.get(next) == Some(&param) {
            bindings.push(Binding::Provided(next));
            next += 1;
        } else {
            bindings.push(Binding::Resolve(param));
        }
    }

    (next == provided.len()).then_some(bindings)
}

fn auto_wire(
    container: &Container,
    context: &ResolutionContext,
    lookup: &Lookup,
    attempts: &mut Attempts,
) -> InjectResult<Option<Match>> {
    let shapes = lookup.arguments().shapes();
    let mut candidates: Vec<_> = container
        .with_state(|state| {
            state.registry.candidates(
                lookup.service_info(),
                lookup.tag(),
                lookup.is_any_tag(),
            )
        })
        .into_iter()
        .filter_map(|definition| {
            let bindings = bind(definition.key().args(), &shapes)?;
            Some((definition, bindings))
        })
        .collect();
    if candidates.is_empty() {
        return Ok(None);
    }

    // A nested request for a service already being auto-wired here must not
    // settle on one of its sibling candidates
    let id = container.id();
    let nested = candidates
        .iter()
        .any(|(definition, _)| context.is_building(definition.key(), id));
    if nested {
        let cycle = context.cycle(lookup.service_info());
        trace!(container = %container, %cycle, "auto-wiring re-entered");
        attempts.cycle.get_or_insert(cycle);
        return Ok(None);
    }

    // Stable, so registration order is kept inside each group
    let group = |definition: &Svc<Definition>| {
        let tag_priority = usize::from(definition.key().tag() != lookup.tag());
        (Reverse(definition.key().arity()), tag_priority)
    };
    candidates.sort_by_key(|(definition, _)| group(definition));

    let provided: Vec<DynSvc> = lookup
        .arguments()
        .iter()
        .map(|argument| argument.value().clone())
        .collect();

    let mut start = 0;
    while start < candidates.len() {
        let current = group(&candidates[start].0);
        let end = candidates[start..]
            .iter()
            .position(|(definition, _)| group(definition) != current)
            .map_or(candidates.len(), |offset| start + offset);

        let mut successes = Vec::new();
        for (definition, bindings) in &candidates[start..end] {
            attempts.evaluated += 1;
            let error = match evaluate(
                container, context, lookup, definition, bindings, &provided,
            ) {
                Ok(found) => {
                    successes.push(found);
                    continue;
                }
                Err(error @ InjectError::RecursionLimitExceeded { .. }) => {
                    return Err(error)
                }
                Err(error) => error,
            };

            debug!(
                container = %container,
                key = ?definition.key(),
                %error,
                "auto-wiring candidate disqualified"
            );
            if let InjectError::CycleDetected { .. } = error {
                attempts.cycle.get_or_insert(error);
            }
        }

        match successes.len() {
            0 => start = end,
            1 => {
                let service = lookup.service_info().name();
                trace!(container = %container, service, "auto-wired");
                return Ok(successes.pop());
            }
            count => {
                return Err(InjectError::AmbiguousDefinitions {
                    service_info: lookup.service_info(),
                    candidates: count,
                })
            }
        }
    }

    Ok(None)
}

/// Tries to satisfy every parameter of a candidate. A candidate whose
/// instance is already cached, or already built earlier in this call, needs
/// no arguments at all.
fn evaluate(
    container: &Container,
    context: &ResolutionContext,
    lookup: &Lookup,
    definition: &Svc<Definition>,
    bindings: &[Binding],
    provided: &[DynSvc],
) -> InjectResult<Match> {
    let key = definition.key();
    let ready = context
        .reused(key, container.id())
        .or_else(|| container.with_state(|state| state.cache.ready(key)));
    if let Some(value) = ready {
        return Ok(Match {
            owner: container.clone(),
            definition: definition.clone(),
            args: Vec::new(),
            prebuilt: Some(value),
        });
    }

    if context.is_building(key, container.id()) {
        return Err(context.cycle(key.service_info()));
    }

    let _building = context.begin(key, container.id());
    let args = bindings
        .iter()
        .map(|binding| match *binding {
            Binding::Provided(index) => Ok(provided[index].clone()),
            Binding::Resolve(service_info) => resolution::resolve(
                container,
                context,
                &lookup.dependency(service_info),
            ),
        })
        .collect::<InjectResult<Vec<_>>>()?;

    Ok(Match {
        owner: container.clone(),
        definition: definition.clone(),
        args,
        prebuilt: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_arguments_bind_as_an_ordered_subsequence() {
        let a = ServiceInfo::of::<u8>();
        let b = ServiceInfo::of::<u16>();
        let c = ServiceInfo::of::<u32>();

        let bindings = bind(&[a, b, c], &[a, c]).unwrap();
        assert!(matches!(
            bindings.as_slice(),
            [Binding::Provided(0), Binding::Resolve(_), Binding::Provided(1)]
        ));

        assert!(bind(&[a, b], &[b, a]).is_none());
        assert!(bind(&[], &[a]).is_none());
        assert!(bind(&[a, a], &[a]).is_some());
    }
}
