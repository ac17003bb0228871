use crate::{
    ContainerId, DynSvc, InjectError, InjectResult, Key, ServiceInfo,
};
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
};

/// Tracks a single top-level resolve call: how deeply it has nested, which
/// definitions are currently inside their factory, and the object-graph
/// instances built so far.
pub(crate) struct ResolutionContext {
    max_depth: usize,
    depth: Cell<usize>,
    building: RefCell<Vec<(Key, ContainerId)>>,
    graph: RefCell<HashMap<(Key, ContainerId), DynSvc>>,
}

impl ResolutionContext {
    pub fn new(max_depth: usize) -> Self {
        ResolutionContext {
            max_depth,
            depth: Cell::new(0),
            building: RefCell::new(Vec::new()),
            graph: RefCell::new(HashMap::new()),
        }
    }

    /// Enters one level of nested resolution.
    pub fn enter(
        &self,
        service_info: ServiceInfo,
    ) -> InjectResult<DepthGuard<'_>> {
        let depth = self.depth.get();
        if depth >= self.max_depth {
            return Err(InjectError::RecursionLimitExceeded {
                service_info,
                depth: self.max_depth,
            });
        }

        self.depth.set(depth + 1);
        Ok(DepthGuard { context: self })
    }

    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    /// Whether the factory of a definition owned by `container` is running
    /// somewhere up the current call stack.
    pub fn is_building(&self, key: &Key, container: ContainerId) -> bool {
        self.building
            .borrow()
            .iter()
            .any(|(k, c)| *c == container && k == key)
    }

    /// Records that a factory is about to run. The record is dropped once
    /// the factory returns.
    pub fn begin(
        &self,
        key: &Key,
        container: ContainerId,
    ) -> BuildingGuard<'_> {
        self.building.borrow_mut().push((key.clone(), container));
        BuildingGuard { context: self }
    }

    /// Gets the instance already built during this call for an
    /// object-graph definition.
    pub fn reused(&self, key: &Key, container: ContainerId) -> Option<DynSvc> {
        self.graph.borrow().get(&(key.clone(), container)).cloned()
    }

    pub fn remember(&self, key: &Key, container: ContainerId, value: &DynSvc) {
        self.graph
            .borrow_mut()
            .insert((key.clone(), container), value.clone());
    }

    pub fn forget(&self, key: &Key, container: ContainerId) -> Option<DynSvc> {
        self.graph.borrow_mut().remove(&(key.clone(), container))
    }

    /// Creates the error reported when a service is needed by its own
    /// factory.
    pub fn cycle(&self, service_info: ServiceInfo) -> InjectError {
        let mut cycle: Vec<_> = self
            .building
            .borrow()
            .iter()
            .map(|(key, _)| key.service_info())
            .collect();
        cycle.push(service_info);
        InjectError::CycleDetected {
            service_info,
            cycle,
        }
    }
}

pub(crate) struct DepthGuard<'a> {
    context: &'a ResolutionContext,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        let depth = self.context.depth.get();
        self.context.depth.set(depth.saturating_sub(1));
    }
}

pub(crate) struct BuildingGuard<'a> {
    context: &'a ResolutionContext,
}

impl Drop for BuildingGuard<'_> {
    fn drop(&mut self) {
        self.context.building.borrow_mut().pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Svc;

    fn key<T: 'static>() -> Key {
        Key::new(ServiceInfo::of::<T>(), None, Vec::new())
    }

    #[test]
    fn depth_is_restored_when_guards_drop() {
        let context = ResolutionContext::new(2);
        {
            let _outer = context.enter(ServiceInfo::of::<u8>()).unwrap();
            let _inner = context.enter(ServiceInfo::of::<u8>()).unwrap();
            assert_eq!(2, context.depth());

            match context.enter(ServiceInfo::of::<u16>()) {
                Err(InjectError::RecursionLimitExceeded { depth: 2, .. }) => {}
                Err(error) => Err(error).unwrap(),
                Ok(_) => panic!("depth limit was not enforced"),
            }
        }
        assert_eq!(0, context.depth());
    }

    #[test]
    fn building_records_are_scoped_to_their_guard() {
        let context = ResolutionContext::new(8);
        let owner = ContainerId::next();
        let other = ContainerId::next();
        {
            let _building = context.begin(&key::<u8>(), owner);
            assert!(context.is_building(&key::<u8>(), owner));
            assert!(!context.is_building(&key::<u8>(), other));
            assert!(!context.is_building(&key::<u16>(), owner));
        }
        assert!(!context.is_building(&key::<u8>(), owner));
    }

    #[test]
    fn graph_instances_are_kept_per_owner() {
        let context = ResolutionContext::new(8);
        let owner = ContainerId::next();
        let other = ContainerId::next();
        let value: DynSvc = Svc::new(1_u8);

        context.remember(&key::<u8>(), owner, &value);
        let reused = context.reused(&key::<u8>(), owner).unwrap();
        assert!(Svc::ptr_eq(&value, &reused));
        assert!(context.reused(&key::<u8>(), other).is_none());
        assert!(context.reused(&key::<u16>(), owner).is_none());

        assert!(context.forget(&key::<u8>(), owner).is_some());
        assert!(context.reused(&key::<u8>(), owner).is_none());
    }

    #[test]
    fn cycle_lists_the_construction_chain() {
        let context = ResolutionContext::new(8);
        let owner = ContainerId::next();
        let _a = context.begin(&key::<u8>(), owner);
        let _b = context.begin(&key::<u16>(), owner);

        match context.cycle(ServiceInfo::of::<u8>()) {
            InjectError::CycleDetected { cycle, .. } => assert_eq!(
                vec![
                    ServiceInfo::of::<u8>(),
                    ServiceInfo::of::<u16>(),
                    ServiceInfo::of::<u8>(),
                ],
                cycle
            ),
            error => panic!("unexpected error: {}", error),
        }
    }
}
