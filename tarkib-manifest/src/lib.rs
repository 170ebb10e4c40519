//! Resolution engine for compile-time dependency injection.
//!
//! Given a provider's service declarations and a [`TypeOracle`] that
//! answers structural questions about types, the engine decides for every
//! service how it is constructed and which registration satisfies each
//! constructor parameter. The resulting [`ServiceManifest`] is what a code
//! emitter turns into a container.

pub mod error;
pub mod extractor;
pub mod generator;
mod graph;
pub mod key;
pub mod lifetime;
pub mod manifest;
pub mod model;
pub mod oracle;
pub mod registration;
pub mod settings;
pub mod types;

pub use error::{Result, TarkibError};
pub use generator::{Generator, prelude};
pub use key::TypeKey;
pub use lifetime::Lifetime;
pub use manifest::ServiceManifest;
pub use oracle::{FallbackResolver, TypeOracle};
pub use settings::Settings;
pub use types::TypeRef;
