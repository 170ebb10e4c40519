//! Dependency extraction.
//!
//! A provider declares its services with markers of four kinds, modelled
//! as [`Declaration`]. The extractor turns them into plain
//! [`ServiceDescriptor`]s; the manifest never sees declaration kinds.
//!
//! ```text
//! Dependency  → service (+ implementation), constructed through its constructor
//! Factory     → service built by a member method of the declaring type
//! Instance    → singleton read from a member property or field
//! Import      → declarations of a module, expanded in place
//! ```

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::error::{Result, TarkibError};
use crate::key::TypeKey;
use crate::lifetime::Lifetime;
use crate::oracle::TypeOracle;
use crate::registration::ServiceDescriptor;
use crate::types::{AssociatedSymbol, TypeRef};

/// A service declaration attached to a provider or module.
#[derive(Debug, Clone)]
pub enum Declaration {
    Dependency {
        lifetime: Lifetime,
        service: TypeRef,
        implementation: Option<TypeRef>,
        key: Option<String>,
    },
    Factory {
        lifetime: Lifetime,
        service: TypeRef,
        key: Option<String>,
        /// Method on the declaring type.
        member: String,
    },
    Instance {
        service: TypeRef,
        key: Option<String>,
        /// Property or field on the declaring type.
        member: String,
    },
    Import {
        module: TypeRef,
    },
}

/// Walks provider declarations and produces service descriptors.
pub struct DependencyExtractor<'a> {
    oracle: &'a dyn TypeOracle,
}

impl<'a> DependencyExtractor<'a> {
    pub fn new(oracle: &'a dyn TypeOracle) -> Self {
        Self { oracle }
    }

    /// Collects the descriptors of `provider` in declaration order.
    ///
    /// Imported modules are expanded where the import appears; a module
    /// imported more than once contributes only the first time.
    ///
    /// # Errors
    /// - [`TarkibError::MemberNotFound`]: factory or instance member missing
    /// - [`TarkibError::AmbiguousMember`]: member name is overloaded
    /// - [`TarkibError::InvalidImport`]: import target is not a module
    pub fn extract(&self, provider: &TypeRef) -> Result<Vec<ServiceDescriptor>> {
        let mut descriptors = Vec::new();
        let mut imported = HashSet::new();
        imported.insert(TypeKey::new(provider));
        self.extract_from(provider, &mut imported, &mut descriptors)?;
        debug!(provider = %provider, count = descriptors.len(), "Extracted service declarations");
        Ok(descriptors)
    }

    fn extract_from(
        &self,
        owner: &TypeRef,
        imported: &mut HashSet<TypeKey>,
        out: &mut Vec<ServiceDescriptor>,
    ) -> Result<()> {
        for declaration in self.oracle.declarations(owner) {
            match declaration {
                Declaration::Dependency {
                    lifetime,
                    service,
                    implementation,
                    key,
                } => {
                    let mut descriptor = ServiceDescriptor::new(service, lifetime).keyed(key);
                    descriptor.implementation = implementation;
                    out.push(descriptor);
                }
                Declaration::Factory {
                    lifetime,
                    service,
                    key,
                    member,
                } => {
                    let symbol = self.find_member(owner, &member)?;
                    out.push(
                        ServiceDescriptor::new(service, lifetime)
                            .keyed(key)
                            .with_symbol(Some(symbol)),
                    );
                }
                Declaration::Instance {
                    service,
                    key,
                    member,
                } => {
                    let symbol = self.find_member(owner, &member)?;
                    out.push(
                        ServiceDescriptor::new(service, Lifetime::Singleton)
                            .keyed(key)
                            .with_symbol(Some(symbol)),
                    );
                }
                Declaration::Import { module } => {
                    if !self.oracle.is_module(&module) {
                        return Err(TarkibError::InvalidImport { ty: module });
                    }
                    if !imported.insert(TypeKey::new(&module)) {
                        trace!(module = %module, "Module already imported, skipping");
                        continue;
                    }
                    trace!(module = %module, "Importing module");
                    self.extract_from(&module, imported, out)?;
                }
            }
        }
        Ok(())
    }

    fn find_member(&self, owner: &TypeRef, name: &str) -> Result<AssociatedSymbol> {
        let mut members = self.oracle.members(owner, name);
        match members.len() {
            0 => Err(TarkibError::MemberNotFound {
                owner: owner.clone(),
                member: name.to_string(),
            }),
            1 => Ok(members.remove(0)),
            count => Err(TarkibError::AmbiguousMember {
                owner: owner.clone(),
                member: name.to_string(),
                count,
            }),
        }
    }
}
