//! Infrastructure layer: I/O implementations and DI container
//!
//! This layer implements I/O boundary traits and wires up services.

pub mod decoder;
pub mod di;
pub mod discovery;
pub mod error;
pub mod metadata;
pub mod traits;

pub use decoder::JsonPodDecoder;
pub use discovery::PodLocator;
pub use error::{DecodeError, InfraError};
pub use metadata::EnvMetadataSource;
