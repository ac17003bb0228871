mod definition;
mod registry;

pub use definition::*;
pub(crate) use registry::*;
