mod builtin;
#[allow(clippy::module_inception)]
mod executor;
mod external;
mod redirect;

pub use executor::{Executor, Outcome};
