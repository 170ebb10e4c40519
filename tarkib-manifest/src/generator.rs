//! Generation driver.
//!
//! One [`Generator::run`] call processes one provider:
//!
//! ```text
//! declarations ─extract─> descriptors ─add_service─> manifest
//!     ─check_constructor_dependencies (closed services)─> resolutions
//!     ─validate_dependency_graph─> manifest handed to the emitter
//! ```
//!
//! The first error stops the provider and is returned as is.

use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::extractor::DependencyExtractor;
use crate::manifest::ServiceManifest;
use crate::oracle::{FallbackResolver, TypeOracle};
use crate::registration::RegistrationId;
use crate::settings::{DEFAULT_SETTINGS, Settings};
use crate::types::TypeRef;

/// Runs resolution passes against one type oracle.
///
/// # Examples
/// ```
/// use tarkib_manifest::prelude::*;
///
/// let provider = TypeRef::class("app::Provider");
/// let model = TypeModel::new()
///     .define(TypeDefinition::new(TypeRef::class("app::SystemClock")))
///     .define(TypeDefinition::new(provider.clone()).declare(Declaration::Dependency {
///         lifetime: Lifetime::Singleton,
///         service: TypeRef::class("app::SystemClock"),
///         implementation: None,
///         key: None,
///     }));
///
/// let manifest = Generator::new(&model).run(&provider).unwrap();
/// assert_eq!(manifest.get_all_services().count(), 1);
/// ```
pub struct Generator<'a> {
    oracle: &'a dyn TypeOracle,
    settings: &'a Settings,
    fallback: Option<&'a dyn FallbackResolver>,
}

impl<'a> Generator<'a> {
    pub fn new(oracle: &'a dyn TypeOracle) -> Self {
        Self {
            oracle,
            settings: &DEFAULT_SETTINGS,
            fallback: None,
        }
    }

    pub fn settings(mut self, settings: &'a Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Attaches a runtime fallback to every manifest this generator builds.
    pub fn fallback(mut self, fallback: &'a dyn FallbackResolver) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Extracts, registers, resolves and validates the services of `provider`.
    ///
    /// # Errors
    /// Any [`TarkibError`](crate::error::TarkibError) raised by extraction,
    /// constructor checks or cycle detection.
    #[instrument(skip_all, name = "generate", fields(provider = %provider))]
    pub fn run(&self, provider: &TypeRef) -> Result<ServiceManifest<'a>> {
        let descriptors = DependencyExtractor::new(self.oracle).extract(provider)?;
        info!(declared = descriptors.len(), "Resolving provider");

        let mut manifest = ServiceManifest::with_settings(self.oracle, self.settings);
        if let Some(fallback) = self.fallback {
            manifest = manifest.with_fallback(fallback);
        }

        let declared: Vec<RegistrationId> = descriptors
            .into_iter()
            .map(|descriptor| manifest.add_service(descriptor))
            .collect();

        for id in declared {
            if manifest.registration(id).resolved_type().is_open() {
                debug!(id = %id, "Skipping open generic registration");
                continue;
            }
            manifest.check_constructor_dependencies(id)?;
        }

        manifest.validate_dependency_graph()?;

        info!(
            services = manifest.get_all_services().count(),
            resolutions = manifest.get_all_constructor_resolutions().len(),
            "Provider resolved"
        );
        Ok(manifest)
    }
}

/// Everything needed to describe a provider and run a generator over it.
pub mod prelude {
    pub use super::Generator;
    pub use crate::error::{Result, TarkibError};
    pub use crate::extractor::Declaration;
    pub use crate::key::TypeKey;
    pub use crate::lifetime::Lifetime;
    pub use crate::manifest::ServiceManifest;
    pub use crate::model::{TypeDefinition, TypeModel};
    pub use crate::oracle::{FallbackResolver, PrefixFallback, TypeOracle};
    pub use crate::registration::{
        ConstructorResolution, ParameterResolution, RegistrationId, ServiceDescriptor,
        ServiceRegistration,
    };
    pub use crate::settings::Settings;
    pub use crate::types::{AssociatedSymbol, MethodInfo, ParameterInfo, TypeRef};
}
