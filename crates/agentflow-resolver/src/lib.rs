mod error;
mod resolver;

pub use error::ResolveError;
pub use resolver::{BranchPolicy, DepthFirstResolver, Resolver};
