pub mod assembler;
pub mod extractor;
pub mod mapping;
pub mod merger;
pub mod normalizer;
pub mod resolver;
pub mod stages;
pub mod store;
pub mod traits;
pub mod ttd;

pub use resolver::{AddressCache, AddressResolver, ResolveFailure, ResolveOutcome};
pub use traits::{AddressLookup, IssueSource};
