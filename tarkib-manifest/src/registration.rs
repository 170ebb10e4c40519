//! Registration and resolution records.
//!
//! The [`ServiceManifest`](crate::manifest::ServiceManifest) owns every
//! record defined here. Registrations live in an arena and refer to each
//! other through [`RegistrationId`]s, so the only mutation after insertion
//! (appending to a collection's members) never needs shared ownership.

use std::fmt;

use crate::lifetime::Lifetime;
use crate::types::{AssociatedSymbol, MethodInfo, ParameterInfo, TypeRef};

/// Index of a registration in its manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(pub(crate) usize);

impl RegistrationId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Input to [`ServiceManifest::add_service`](crate::manifest::ServiceManifest::add_service).
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub ty: TypeRef,
    pub lifetime: Lifetime,
    pub implementation: Option<TypeRef>,
    pub symbol: Option<AssociatedSymbol>,
    pub key: Option<String>,
    pub collected: Option<Vec<RegistrationId>>,
}

impl ServiceDescriptor {
    pub fn new(ty: TypeRef, lifetime: Lifetime) -> Self {
        Self {
            ty,
            lifetime,
            implementation: None,
            symbol: None,
            key: None,
            collected: None,
        }
    }

    pub fn implemented_by(mut self, implementation: TypeRef) -> Self {
        self.implementation = Some(implementation);
        self
    }

    pub fn with_symbol(mut self, symbol: Option<AssociatedSymbol>) -> Self {
        self.symbol = symbol;
        self
    }

    pub fn keyed(mut self, key: Option<String>) -> Self {
        self.key = key;
        self
    }

    pub fn collecting(mut self, members: Vec<RegistrationId>) -> Self {
        self.collected = Some(members);
        self
    }
}

/// One addressable service binding.
#[derive(Debug, Clone)]
pub struct ServiceRegistration {
    pub(crate) id: RegistrationId,
    pub(crate) ty: TypeRef,
    pub(crate) key: Option<String>,
    pub(crate) lifetime: Lifetime,
    pub(crate) implementation: Option<TypeRef>,
    pub(crate) index_for_type: usize,
    pub(crate) symbol: Option<AssociatedSymbol>,
    pub(crate) collected: Option<Vec<RegistrationId>>,
    pub(crate) is_disposable: bool,
    pub(crate) is_async_disposable: bool,
}

impl ServiceRegistration {
    #[inline]
    pub fn id(&self) -> RegistrationId {
        self.id
    }

    /// Declared service type.
    #[inline]
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    #[inline]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Implementation type of an interface-to-impl mapping.
    #[inline]
    pub fn implementation(&self) -> Option<&TypeRef> {
        self.implementation.as_ref()
    }

    /// The type actually constructed: implementation if any, else the service type.
    #[inline]
    pub fn resolved_type(&self) -> &TypeRef {
        self.implementation.as_ref().unwrap_or(&self.ty)
    }

    /// Position among earlier registrations of the same type, not counting
    /// open generic placeholders. Emitters use it to name storage slots.
    #[inline]
    pub fn index_for_type(&self) -> usize {
        self.index_for_type
    }

    #[inline]
    pub fn associated_symbol(&self) -> Option<&AssociatedSymbol> {
        self.symbol.as_ref()
    }

    /// Members of a synthesized collection registration.
    #[inline]
    pub fn collected_services(&self) -> Option<&[RegistrationId]> {
        self.collected.as_deref()
    }

    #[inline]
    pub fn is_disposable(&self) -> bool {
        self.is_disposable
    }

    #[inline]
    pub fn is_async_disposable(&self) -> bool {
        self.is_async_disposable
    }
}

/// The member a resolution constructs its service through.
#[derive(Debug, Clone)]
pub enum Constructible {
    Constructor(MethodInfo),
    Symbol(AssociatedSymbol),
}

impl Constructible {
    pub fn parameters(&self) -> &[ParameterInfo] {
        match self {
            Constructible::Constructor(constructor) => &constructor.parameters,
            Constructible::Symbol(symbol) => symbol.parameters(),
        }
    }
}

/// How one concrete service type is built.
#[derive(Debug, Clone)]
pub struct ConstructorResolution {
    pub(crate) ty: TypeRef,
    pub(crate) lifetime: Lifetime,
    pub(crate) constructor: Constructible,
    pub(crate) parameters: Vec<ParameterResolution>,
}

impl ConstructorResolution {
    #[inline]
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// Lifetime of the registration this resolution was computed for.
    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    #[inline]
    pub fn constructor(&self) -> &Constructible {
        &self.constructor
    }

    #[inline]
    pub fn parameters(&self) -> &[ParameterResolution] {
        &self.parameters
    }
}

/// Outcome of resolving one constructor or factory parameter.
#[derive(Debug, Clone)]
pub struct ParameterResolution {
    pub(crate) parameter: ParameterInfo,
    pub(crate) parameter_type: TypeRef,
    pub(crate) key: Option<String>,
    pub(crate) is_nullable: bool,
    pub(crate) deferred: bool,
    pub(crate) selected_service: Option<RegistrationId>,
    pub(crate) resolved_by_fallback: bool,
    pub(crate) has_no_declaration: bool,
    pub(crate) has_multiple_registrations: bool,
    pub(crate) multiple_services: Vec<RegistrationId>,
}

impl ParameterResolution {
    pub(crate) fn new(
        parameter: ParameterInfo,
        parameter_type: TypeRef,
        is_nullable: bool,
        deferred: bool,
    ) -> Self {
        let key = parameter.service_key().map(str::to_owned);
        Self {
            parameter,
            parameter_type,
            key,
            is_nullable,
            deferred,
            selected_service: None,
            resolved_by_fallback: false,
            has_no_declaration: false,
            has_multiple_registrations: false,
            multiple_services: Vec::new(),
        }
    }

    #[inline]
    pub fn parameter(&self) -> &ParameterInfo {
        &self.parameter
    }

    /// Parameter type with any nullable wrapper removed.
    #[inline]
    pub fn parameter_type(&self) -> &TypeRef {
        &self.parameter_type
    }

    #[inline]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.is_nullable
    }

    /// The parameter is wrapped in a deferred reference such as `Lazy<T>`.
    #[inline]
    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    #[inline]
    pub fn selected_service(&self) -> Option<RegistrationId> {
        self.selected_service
    }

    #[inline]
    pub fn default_value(&self) -> Option<&str> {
        self.parameter.default_value.as_deref()
    }

    #[inline]
    pub fn resolved_by_fallback(&self) -> bool {
        self.resolved_by_fallback
    }

    #[inline]
    pub fn has_no_declaration(&self) -> bool {
        self.has_no_declaration
    }

    #[inline]
    pub fn has_multiple_registrations(&self) -> bool {
        self.has_multiple_registrations
    }

    #[inline]
    pub fn multiple_services(&self) -> &[RegistrationId] {
        &self.multiple_services
    }

    /// Resolved, or allowed to stay unresolved because the parameter is
    /// nullable or has a literal default.
    pub fn is_satisfied(&self) -> bool {
        self.selected_service.is_some()
            || self.resolved_by_fallback
            || self.is_nullable
            || self.parameter.default_value.is_some()
    }

    /// Whether this parameter is a construction-order edge for cycle checks.
    pub(crate) fn is_hard_dependency(&self) -> bool {
        self.selected_service.is_some()
            && !self.is_nullable
            && self.parameter.default_value.is_none()
    }
}
