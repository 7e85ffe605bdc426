pub mod address;
pub mod config;
pub mod error;
pub mod registry;
pub mod types;

pub use address::{is_address_id, is_address_key, is_valid_address, AddressKind};
pub use config::{Config, DataPaths, ResolverSettings};
pub use error::NotaryError;
pub use registry::*;
pub use types::*;
