use crate::Container;

/// How deeply a single resolve call may nest before it is stopped with
/// [`InjectError::RecursionLimitExceeded`].
///
/// [`InjectError::RecursionLimitExceeded`]:
///     crate::InjectError::RecursionLimitExceeded
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// A builder for a [`Container`].
///
/// ```
/// use graph_injector::Container;
///
/// let root = Container::new(None);
///
/// let mut builder = Container::builder();
/// builder.parent(&root).name("requests").max_depth(32);
///
/// let container = builder.build();
/// assert_eq!(Some("requests"), container.name());
/// assert_eq!(32, container.max_depth());
/// assert_eq!(Some(root.id()), container.parent().map(|p| p.id()));
/// ```
#[derive(Debug)]
pub struct ContainerBuilder {
    parent: Option<Container>,
    name: Option<String>,
    max_depth: usize,
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        ContainerBuilder {
            parent: None,
            name: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ContainerBuilder {
    /// Sets the parent consulted when a request cannot be satisfied by the
    /// new container. The parent is not kept alive by its children.
    pub fn parent(&mut self, parent: &Container) -> &mut Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Sets the name used for the container in logs.
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Sets how deeply a resolve call started on the container may nest.
    pub fn max_depth(&mut self, max_depth: usize) -> &mut Self {
        self.max_depth = max_depth;
        self
    }

    /// Builds the container.
    #[must_use]
    pub fn build(self) -> Container {
        Container::from_parts(self.parent.as_ref(), self.name, self.max_depth)
    }
}
