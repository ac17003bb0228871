use crate::{Definition, ErasedFactory, Key, Scope, ServiceInfo, Svc, Tag};
use std::{
    collections::HashMap,
    fmt::{Debug, Formatter},
};

/// Stores the definitions registered directly in one container.
#[derive(Default)]
pub(crate) struct Registry {
    definitions: HashMap<Key, Svc<Definition>>,
    next_order: u64,
}

impl Registry {
    /// Adds a definition, replacing any definition registered under an
    /// identical key. The replaced definition is returned.
    pub fn insert(
        &mut self,
        key: Key,
        scope: Scope,
        factory: Box<ErasedFactory>,
    ) -> (Svc<Definition>, Option<Svc<Definition>>) {
        let order = self.next_order;
        self.next_order += 1;

        let definition =
            Svc::new(Definition::new(key.clone(), scope, order, factory));
        let replaced = self.definitions.insert(key, definition.clone());
        (definition, replaced)
    }

    pub fn get(&self, key: &Key) -> Option<Svc<Definition>> {
        self.definitions.get(key).cloned()
    }

    /// Finds the definition matching a key exactly. A tagged key falls back
    /// to the untagged definition with the same shape.
    pub fn find_exact(&self, key: &Key) -> Option<Svc<Definition>> {
        self.get(key).or_else(|| match key.tag() {
            Some(_) => self.get(&key.untagged()),
            None => None,
        })
    }

    /// Lists every definition of a service whose tag is compatible with the
    /// requested one. Untagged definitions are always compatible. Tagged
    /// definitions are compatible with a request for the same tag, or with
    /// any request when `any_tag` is set.
    pub fn candidates(
        &self,
        service_info: ServiceInfo,
        tag: Option<&Tag>,
        any_tag: bool,
    ) -> Vec<Svc<Definition>> {
        let mut candidates: Vec<_> = self
            .definitions
            .values()
            .filter(|definition| {
                let key = definition.key();
                key.service_info() == service_info
                    && match key.tag() {
                        None => true,
                        Some(_) if any_tag => true,
                        Some(own) => Some(own) == tag,
                    }
            })
            .cloned()
            .collect();
        candidates.sort_by_key(|definition| definition.order());
        candidates
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.definitions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }
}

impl Debug for Registry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.definitions.keys()).finish()
    }
}
