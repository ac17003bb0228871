mod fallible;
mod factory;

pub use fallible::*;
pub use factory::*;
