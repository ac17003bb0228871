mod construct;
mod context;
mod resolver;
mod search;

pub(crate) use context::*;
pub use resolver::*;

use crate::{Container, DynSvc, InjectResult, Lookup};

/// Resolves a request against a container as part of an ongoing resolve
/// call.
pub(crate) fn resolve(
    container: &Container,
    context: &ResolutionContext,
    lookup: &Lookup,
) -> InjectResult<DynSvc> {
    let _depth = context.enter(lookup.service_info())?;
    let found = search::find(container, context, lookup)?;
    construct::construct(context, found)
}
