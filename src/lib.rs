//! Runtime object-graph construction.
//!
//! A [`Container`] holds *definitions*: factories that know how to build a
//! value of some type, registered under a [`Key`] made of the produced type,
//! an optional [`Tag`], and the ordered types of the factory's arguments.
//! Resolving a type finds the best matching definition, builds its
//! dependencies, and caches the result according to the definition's
//! [`Scope`].
//!
//! Services are held in [`Svc<T>`] pointers, which are always [`Arc<T>`].
//! Containers can be shared between threads, and a service with a cached
//! scope is only ever constructed once, even when several threads request it
//! at the same time.
//!
//! [`Arc<T>`]: std::sync::Arc
//!
//! # Resolution
//!
//! A request for a type is answered by the first of these that succeeds:
//!
//! 1. A definition in the container whose key matches the request exactly.
//!    A tagged request falls back to the untagged definition.
//! 2. *Auto-wiring*: a definition of the requested type whose arguments can
//!    all be satisfied, either by the runtime arguments passed with the
//!    request or by resolving them from the container. Definitions taking
//!    more arguments are preferred, and if two equally preferred
//!    definitions both succeed the request fails as ambiguous.
//! 3. The same search in the container's parent, then its parent's parent.
//! 4. The same search in each collaborator of the container, along with the
//!    collaborator's ancestors.
//!
//! A service with a cached scope always belongs to the container whose
//! definition produced it, no matter which container it was requested from.
//!
//! # Cycles
//!
//! Factories receive their dependencies as arguments, so a factory can never
//! depend on its own result. Object graphs with back-references are built in
//! two phases instead: the factory builds the object with its back-reference
//! fields empty, and a property hook attached with
//! [`DefinitionHandle::resolving_properties`] fills them in once the
//! instance has been cached.
//!
//! # Example
//!
//! ```
//! use graph_injector::{Container, InjectResult, Scope, Svc};
//! use parking_lot::RwLock;
//! use std::sync::Weak;
//!
//! // Shared by every part of the application
//! struct Database {
//!     url: String,
//! }
//!
//! // A server knows about the clients connected to it, and each client knows
//! // about its server. Neither can receive the other in its constructor, so
//! // the server's back-reference is assigned after construction.
//! struct Server {
//!     database: Svc<Database>,
//!     client: RwLock<Weak<Client>>,
//! }
//!
//! struct Client {
//!     server: RwLock<Option<Svc<Server>>>,
//! }
//!
//! fn main() -> InjectResult<()> {
//!     let root = Container::new(None);
//!     root.register(Scope::Shared, None, || Database {
//!         url: "postgres://localhost".into(),
//!     });
//!
//!     // Definitions in a child container can use everything in its parent,
//!     // but the parent never sees the child's definitions.
//!     let app = Container::new(Some(&root));
//!     app.register(Scope::Shared, None, |database: Svc<Database>| Server {
//!         database,
//!         client: RwLock::new(Weak::new()),
//!     })
//!     .resolving_properties(|resolver, server| {
//!         *server.client.write() = Svc::downgrade(&resolver.resolve()?);
//!         Ok(())
//!     });
//!     app.register(Scope::Shared, None, || Client {
//!         server: RwLock::new(None),
//!     })
//!     .resolving_properties(|resolver, client| {
//!         *client.server.write() = Some(resolver.resolve()?);
//!         Ok(())
//!     });
//!
//!     let client: Svc<Client> = app.resolve()?;
//!     let server = client.server.read().clone().unwrap();
//!     assert!(Svc::ptr_eq(&client, &server.client.read().upgrade().unwrap()));
//!     assert_eq!("postgres://localhost", server.database.url);
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::needless_pass_by_value
)]

mod arguments;
mod builder;
mod container;
mod definitions;
mod factories;
mod key;
mod lookup;
mod resolution;
mod scope_cache;
mod service;

pub use arguments::*;
pub use builder::*;
pub use container::*;
pub use definitions::*;
pub use factories::*;
pub use key::*;
pub use lookup::*;
pub use resolution::*;
pub(crate) use scope_cache::*;
pub use service::*;
