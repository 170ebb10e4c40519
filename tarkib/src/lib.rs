//! # Tarkib: compile-time dependency injection resolution
//!
//! Tarkib works out, ahead of time, how every service of a provider is
//! built: which constructor or factory member is used, which registration
//! satisfies each parameter, how open generics are specialized and how
//! collections of a service are assembled. Structural defects (missing or
//! ambiguous registrations, constructor ambiguity, dependency cycles) are
//! reported before any code is generated.
//!
//! ```
//! use tarkib::prelude::*;
//!
//! let clock = TypeRef::interface("app::Clock");
//! let provider = TypeRef::class("app::Provider");
//! let model = TypeModel::new()
//!     .define(TypeDefinition::new(clock.clone()))
//!     .define(TypeDefinition::new(TypeRef::class("app::SystemClock")).inherits(clock.clone()))
//!     .define(TypeDefinition::new(provider.clone()).declare(Declaration::Dependency {
//!         lifetime: Lifetime::Singleton,
//!         service: clock.clone(),
//!         implementation: Some(TypeRef::class("app::SystemClock")),
//!         key: None,
//!     }));
//!
//! let manifest = Generator::new(&model).run(&provider)?;
//! assert_eq!(manifest.services_for(&clock).len(), 1);
//! # Ok::<(), TarkibError>(())
//! ```

pub use tarkib_manifest::*;
pub use tarkib_support::*;
