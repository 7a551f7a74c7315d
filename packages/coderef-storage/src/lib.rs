pub mod cache;
pub mod qdrant;
pub mod registry;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
