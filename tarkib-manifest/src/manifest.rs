//! # The service manifest
//!
//! The manifest is the registry of every service a provider can build and
//! the place where each service's construction is worked out.
//!
//! ```text
//! add_service ──> registrations ──check_constructor_dependencies──> resolutions
//!                      ▲                        │
//!                      └── specializations, ────┘
//!                          collections
//! ```
//!
//! Resolving a parameter may register new services: closed forms of open
//! generics (`Repo<User>` from `Repo<T>`) and the four collection shapes
//! over an element type. Specializations are checked eagerly, so by the
//! time a consumer's resolution returns, everything it selected has been
//! resolved too.

use std::collections::HashMap;

use tarkib_support::rendering::{shorten_type_name, suggest_similar};
use tracing::{debug, instrument, trace, warn};

use crate::error::{
    Candidate, Result, TarkibError, UnresolvedCause, UnresolvedDependenciesError,
    UnresolvedParameter,
};
use crate::graph::GraphValidator;
use crate::key::{TypeKey, same_type};
use crate::lifetime::Lifetime;
use crate::oracle::{FallbackResolver, TypeOracle};
use crate::registration::{
    Constructible, ConstructorResolution, ParameterResolution, RegistrationId, ServiceDescriptor,
    ServiceRegistration,
};
use crate::settings::{DEFAULT_SETTINGS, Settings};
use crate::types::{MethodInfo, ParameterInfo, TypeKind, TypeRef};

/// The four registrations synthesized for one collection element type.
#[derive(Debug, Clone, Copy)]
struct CollectionFamily {
    array: RegistrationId,
    read_only_list: RegistrationId,
    read_only_collection: RegistrationId,
    enumerable: RegistrationId,
}

impl CollectionFamily {
    fn contains(&self, id: RegistrationId) -> bool {
        [
            self.array,
            self.read_only_list,
            self.read_only_collection,
            self.enumerable,
        ]
        .contains(&id)
    }
}

/// Registry of services and their resolved constructions for one provider.
///
/// A manifest lives for one generation pass and is mutated in place by a
/// single thread.
pub struct ServiceManifest<'a> {
    oracle: &'a dyn TypeOracle,
    settings: &'a Settings,
    fallback: Option<&'a dyn FallbackResolver>,
    registrations: Vec<ServiceRegistration>,
    by_type: HashMap<TypeKey, Vec<RegistrationId>>,
    resolutions: Vec<ConstructorResolution>,
    resolution_index: HashMap<TypeKey, usize>,
    collections: HashMap<TypeKey, CollectionFamily>,
    specialization_depth: usize,
}

impl<'a> ServiceManifest<'a> {
    /// Creates an empty manifest with default settings.
    pub fn new(oracle: &'a dyn TypeOracle) -> Self {
        Self::with_settings(oracle, &DEFAULT_SETTINGS)
    }

    pub fn with_settings(oracle: &'a dyn TypeOracle, settings: &'a Settings) -> Self {
        Self {
            oracle,
            settings,
            fallback: None,
            registrations: Vec::new(),
            by_type: HashMap::new(),
            resolutions: Vec::new(),
            resolution_index: HashMap::new(),
            collections: HashMap::new(),
            specialization_depth: 0,
        }
    }

    /// Attaches a runtime fallback, consulted only when no declaration exists.
    pub fn with_fallback(mut self, fallback: &'a dyn FallbackResolver) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn settings(&self) -> &Settings {
        self.settings
    }

    // ── Registration ──

    /// Registers a service and returns its id.
    ///
    /// Never fails: duplicate `(type, key)` pairs are accepted here and only
    /// become an error if a parameter later asks for them ambiguously.
    pub fn add_service(&mut self, descriptor: ServiceDescriptor) -> RegistrationId {
        let ServiceDescriptor {
            ty,
            lifetime,
            implementation,
            symbol,
            key,
            collected,
        } = descriptor;

        let id = RegistrationId(self.registrations.len());
        let type_key = TypeKey::new(&ty);
        let index_for_type = self.by_type.get(&type_key).map_or(0, |ids| {
            ids.iter()
                .filter(|prior| !self.registrations[prior.0].resolved_type().is_open())
                .count()
        });
        let (is_disposable, is_async_disposable) =
            self.disposal_of(implementation.as_ref().unwrap_or(&ty));

        debug!(
            id = %id,
            ty = %ty,
            implementation = ?implementation.as_ref().map(ToString::to_string),
            key = ?key,
            lifetime = %lifetime,
            index_for_type,
            "Registered service"
        );

        self.by_type.entry(type_key).or_default().push(id);
        self.registrations.push(ServiceRegistration {
            id,
            ty,
            key,
            lifetime,
            implementation,
            index_for_type,
            symbol,
            collected,
            is_disposable,
            is_async_disposable,
        });
        id
    }

    fn disposal_of(&self, ty: &TypeRef) -> (bool, bool) {
        let known = &self.settings.well_known;
        let bases = self.oracle.base_types(ty);
        let implements =
            |name: &str| ty.name() == name || bases.iter().any(|base| base.name() == name);
        (implements(&known.disposable), implements(&known.async_disposable))
    }

    // ── Queries ──

    /// # Panics
    /// If `id` was not issued by this manifest.
    pub fn registration(&self, id: RegistrationId) -> &ServiceRegistration {
        &self.registrations[id.0]
    }

    /// Registrations whose declared type is `ty`, in insertion order.
    pub fn services_for(&self, ty: &TypeRef) -> Vec<&ServiceRegistration> {
        self.by_type
            .get(&TypeKey::new(ty))
            .map(|ids| ids.iter().map(|id| &self.registrations[id.0]).collect())
            .unwrap_or_default()
    }

    pub fn constructor_resolution(&self, ty: &TypeRef) -> Option<&ConstructorResolution> {
        self.resolution_index
            .get(&TypeKey::new(ty))
            .map(|&index| &self.resolutions[index])
    }

    /// Every registration whose constructed type is closed, in insertion order.
    pub fn get_all_services(&self) -> impl Iterator<Item = &ServiceRegistration> {
        self.registrations
            .iter()
            .filter(|r| !r.resolved_type().is_open())
    }

    pub fn get_services_by_lifetime(
        &self,
        lifetime: Lifetime,
    ) -> impl Iterator<Item = &ServiceRegistration> {
        self.get_all_services()
            .filter(move |r| r.lifetime == lifetime)
    }

    pub fn get_all_constructor_resolutions(&self) -> &[ConstructorResolution] {
        &self.resolutions
    }

    /// Number of registrations, including open generic ones.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    // ── Constructor resolution ──

    /// Works out how to build the service registered as `id`.
    ///
    /// The resolution is stored (replacing any earlier one for the same
    /// type) before an unresolved-parameter error is returned, so
    /// diagnostics and the cycle detector see every parameter.
    ///
    /// # Errors
    /// - [`TarkibError::NotNamedType`]: the constructed type is not nominal
    /// - [`TarkibError::InvalidFactory`]: the factory member is void or
    ///   returns a non-named type
    /// - [`TarkibError::AmbiguousConstructor`]: several explicit public constructors
    /// - [`TarkibError::UnresolvedDependencies`]: parameters left unsatisfied
    /// - any error raised while specializing a generic dependency
    #[instrument(level = "debug", skip(self))]
    pub fn check_constructor_dependencies(&mut self, id: RegistrationId) -> Result<()> {
        let registration = &self.registrations[id.0];
        let ty = registration.resolved_type().clone();
        let lifetime = registration.lifetime;
        let symbol = registration.symbol.clone();

        if !ty.is_named() {
            return Err(TarkibError::NotNamedType { ty });
        }

        let constructor = match symbol {
            Some(symbol) => {
                if !symbol.produced_type().is_some_and(TypeRef::is_named) {
                    return Err(TarkibError::InvalidFactory {
                        ty,
                        member: symbol.name().to_string(),
                    });
                }
                Constructible::Symbol(symbol)
            }
            None => match self.select_constructor(&ty)? {
                Some(constructor) => Constructible::Constructor(constructor),
                None => {
                    trace!(ty = %ty, "No constructible member, nothing to resolve");
                    return Ok(());
                }
            },
        };

        let mut parameters = Vec::with_capacity(constructor.parameters().len());
        for parameter in constructor.parameters() {
            parameters.push(self.resolve_parameter(parameter)?);
        }

        let unresolved: Vec<UnresolvedParameter> = parameters
            .iter()
            .filter(|p| !p.is_satisfied())
            .map(|p| self.describe_unresolved(p))
            .collect();

        self.store_resolution(ConstructorResolution {
            ty: ty.clone(),
            lifetime,
            constructor,
            parameters,
        });

        if unresolved.is_empty() {
            debug!(ty = %ty, "Resolved constructor dependencies");
            return Ok(());
        }

        warn!(ty = %ty, unresolved = unresolved.len(), "Unresolved constructor dependencies");
        Err(TarkibError::UnresolvedDependencies(
            UnresolvedDependenciesError {
                service: ty.display_name(),
                parameters: unresolved,
            },
        ))
    }

    /// The unique explicit public constructor, else the implicit default
    /// constructor, else nothing.
    fn select_constructor(&self, ty: &TypeRef) -> Result<Option<MethodInfo>> {
        let constructors = self.oracle.constructors(ty);
        let explicit: Vec<&MethodInfo> = constructors
            .iter()
            .filter(|c| c.is_public() && !c.implicitly_declared)
            .collect();

        match explicit.as_slice() {
            [] => Ok(constructors
                .iter()
                .find(|c| c.is_public() && c.implicitly_declared)
                .cloned()),
            [only] => Ok(Some((*only).clone())),
            many => Err(TarkibError::AmbiguousConstructor {
                ty: ty.clone(),
                count: many.len(),
            }),
        }
    }

    fn store_resolution(&mut self, resolution: ConstructorResolution) {
        let key = TypeKey::new(&resolution.ty);
        match self.resolution_index.get(&key) {
            Some(&index) => self.resolutions[index] = resolution,
            None => {
                self.resolution_index.insert(key, self.resolutions.len());
                self.resolutions.push(resolution);
            }
        }
    }

    fn resolve_parameter(&mut self, parameter: &ParameterInfo) -> Result<ParameterResolution> {
        let settings: &'a Settings = self.settings;
        let known = &settings.well_known;

        let (unwrapped, is_nullable) = known.unwrap_nullable(&parameter.ty);
        let deferred_inner = known.deferred_inner(&unwrapped).cloned();
        let deferred = deferred_inner.is_some();
        let target = deferred_inner.unwrap_or_else(|| unwrapped.clone());

        let mut resolution =
            ParameterResolution::new(parameter.clone(), unwrapped, is_nullable, deferred);
        let key = resolution.key.clone();

        self.can_resolve(
            key.as_deref(),
            &target,
            parameter.requires_non_empty(),
            &mut resolution,
        )?;

        if resolution.has_no_declaration {
            if let Some(fallback) = self.fallback {
                if fallback.can_provide(key.as_deref(), &target) {
                    trace!(
                        parameter = %parameter.name,
                        ty = %target,
                        "Deferring to runtime fallback"
                    );
                    resolution.has_no_declaration = false;
                    resolution.resolved_by_fallback = true;
                }
            }
        }

        trace!(
            parameter = %parameter.name,
            ty = %target,
            selected = ?resolution.selected_service,
            satisfied = resolution.is_satisfied(),
            "Resolved parameter"
        );
        Ok(resolution)
    }

    /// Looks for a registration that satisfies `(key, target)`.
    ///
    /// Outcomes are recorded on `resolution`; only errors from nested
    /// specialization are returned.
    fn can_resolve(
        &mut self,
        key: Option<&str>,
        target: &TypeRef,
        require_non_empty: bool,
        resolution: &mut ParameterResolution,
    ) -> Result<()> {
        let candidates = self
            .by_type
            .get(&TypeKey::new(target))
            .cloned()
            .unwrap_or_default();

        if !candidates.is_empty() {
            let matching: Vec<RegistrationId> = candidates
                .iter()
                .copied()
                .filter(|id| self.registrations[id.0].key.as_deref() == key)
                .collect();

            match matching.as_slice() {
                [] => resolution.has_no_declaration = true,
                [single] => {
                    let selected = self.concrete_of(*single);
                    if require_non_empty && self.is_empty_collection(selected) {
                        resolution.has_no_declaration = true;
                    } else {
                        resolution.selected_service = Some(selected);
                    }
                }
                _ => {
                    resolution.has_multiple_registrations = true;
                    resolution.multiple_services = matching.clone();
                }
            }
            return Ok(());
        }

        if key.is_none() {
            let settings: &'a Settings = self.settings;
            if let Some(element) = settings.well_known.collection_element(target) {
                self.synthesize_collection(element, require_non_empty, resolution);
                return Ok(());
            }
            if target.is_generic() {
                return self.specialize(target, resolution);
            }
        }

        resolution.has_no_declaration = true;
        Ok(())
    }

    /// Follows a registration's implementation type one level: when the
    /// implementation has exactly one registration of its own under the
    /// same key, that registration is used instead. The substitute is not
    /// followed further.
    fn concrete_of(&self, id: RegistrationId) -> RegistrationId {
        if let Some(family) = self.family_of(id) {
            return family.enumerable;
        }

        let registration = &self.registrations[id.0];
        let Some(implementation) = &registration.implementation else {
            return id;
        };
        if same_type(implementation, &registration.ty) {
            return id;
        }
        let Some(ids) = self.by_type.get(&TypeKey::new(implementation)) else {
            return id;
        };

        let mut same_key = ids
            .iter()
            .copied()
            .filter(|c| self.registrations[c.0].key == registration.key);
        match (same_key.next(), same_key.next()) {
            (Some(concrete), None) => concrete,
            _ => id,
        }
    }

    fn family_of(&self, id: RegistrationId) -> Option<CollectionFamily> {
        let ty = &self.registrations[id.0].ty;
        let element = self.settings.well_known.collection_element(ty)?;
        self.collections
            .get(&TypeKey::new(element))
            .copied()
            .filter(|family| family.contains(id))
    }

    fn is_empty_collection(&self, id: RegistrationId) -> bool {
        self.registrations[id.0]
            .collected
            .as_ref()
            .is_some_and(Vec::is_empty)
    }

    // ── Collections ──

    /// Selects (synthesizing on first use) the enumerable registration over
    /// every current registration of `element`.
    fn synthesize_collection(
        &mut self,
        element: &TypeRef,
        require_non_empty: bool,
        resolution: &mut ParameterResolution,
    ) {
        let element_key = TypeKey::new(element);

        if let Some(family) = self.collections.get(&element_key).copied() {
            if require_non_empty && self.is_empty_collection(family.enumerable) {
                resolution.has_no_declaration = true;
            } else {
                resolution.selected_service = Some(family.enumerable);
            }
            return;
        }

        let members: Vec<RegistrationId> = self
            .by_type
            .get(&element_key)
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|id| !self.registrations[id.0].resolved_type().is_open())
                    .map(|id| self.concrete_of(id))
                    .collect()
            })
            .unwrap_or_default();

        if require_non_empty && members.is_empty() {
            resolution.has_no_declaration = true;
            return;
        }

        let settings: &'a Settings = self.settings;
        let known = &settings.well_known;
        let array_ty = TypeRef::array(element.clone());
        let member_count = members.len();

        let array = self.add_service(ServiceDescriptor::new(array_ty.clone(), Lifetime::Transient));
        let read_only_list = self.add_service(
            ServiceDescriptor::new(known.read_only_list_of(element), Lifetime::Transient)
                .implemented_by(array_ty.clone()),
        );
        let read_only_collection = self.add_service(
            ServiceDescriptor::new(known.read_only_collection_of(element), Lifetime::Transient)
                .implemented_by(array_ty.clone()),
        );
        let enumerable = self.add_service(
            ServiceDescriptor::new(known.enumerable_of(element), Lifetime::Transient)
                .implemented_by(array_ty)
                .collecting(members),
        );

        self.collections.insert(
            element_key,
            CollectionFamily {
                array,
                read_only_list,
                read_only_collection,
                enumerable,
            },
        );
        debug!(element = %element, members = member_count, "Synthesized collection registrations");

        resolution.selected_service = Some(enumerable);
    }

    /// Adds `member` to the synthesized collection over `ty`, if there is one.
    fn append_to_collection(&mut self, ty: &TypeRef, member: RegistrationId) {
        let Some(family) = self.collections.get(&TypeKey::new(ty)).copied() else {
            return;
        };
        let members = self.registrations[family.enumerable.0]
            .collected
            .get_or_insert_with(Vec::new);
        if !members.contains(&member) {
            members.push(member);
            trace!(collection = %ty, member = %member, "Appended specialization to collection");
        }
    }

    // ── Generic specialization ──

    /// Builds a closed registration for `target` from an open generic one.
    fn specialize(&mut self, target: &TypeRef, resolution: &mut ParameterResolution) -> Result<()> {
        let Some(definition) = self.oracle.generic_definition(target) else {
            resolution.has_no_declaration = true;
            return Ok(());
        };

        let candidates = self
            .by_type
            .get(&TypeKey::new(&definition))
            .cloned()
            .unwrap_or_default();
        let matching: Vec<RegistrationId> = candidates
            .iter()
            .copied()
            .filter(|id| self.registrations[id.0].key.is_none())
            .collect();

        let open = match matching.as_slice() {
            [] => {
                resolution.has_no_declaration = true;
                return Ok(());
            }
            [single] => *single,
            _ => {
                resolution.has_multiple_registrations = true;
                resolution.multiple_services = matching.clone();
                return Ok(());
            }
        };

        let source = &self.registrations[self.concrete_of(open).0];
        let implementation = source.resolved_type().clone();
        let lifetime = source.lifetime;
        let key = source.key.clone();

        if implementation.args().len() != target.args().len() {
            warn!(
                target = %target,
                implementation = %implementation,
                "Open generic implementation arity does not match the requested type"
            );
            resolution.has_no_declaration = true;
            return Ok(());
        }

        let bindings: Vec<(String, TypeRef)> = implementation
            .args()
            .iter()
            .zip(target.args())
            .filter(|(param, _)| param.kind() == TypeKind::TypeParameter)
            .map(|(param, arg)| (param.name().to_string(), arg.clone()))
            .collect();
        let symbol = source.symbol.as_ref().map(|s| s.substitute(&bindings));
        let closed = implementation.construct(target.args());

        let existing = self.by_type.get(&TypeKey::new(&closed)).and_then(|ids| {
            ids.iter()
                .copied()
                .find(|id| self.registrations[id.0].key == key)
        });
        if let Some(existing) = existing {
            // Built before under another name; alias the request to it.
            if !same_type(&closed, target) {
                self.add_service(
                    ServiceDescriptor::new(target.clone(), lifetime)
                        .implemented_by(closed)
                        .keyed(key),
                );
            }
            resolution.selected_service = Some(existing);
            return Ok(());
        }

        let limit = self.settings.max_specialization_depth;
        if self.specialization_depth >= limit {
            warn!(ty = %closed, limit, "Generic specialization nested too deeply");
            return Err(TarkibError::SpecializationDepthExceeded { ty: closed, limit });
        }

        let specialized = self.add_service(
            ServiceDescriptor::new(closed.clone(), lifetime)
                .keyed(key.clone())
                .with_symbol(symbol.clone()),
        );
        debug!(target = %target, specialized = %closed, "Specialized open generic registration");

        let settings: &'a Settings = self.settings;
        for base in self.oracle.base_types(&closed) {
            if settings.well_known.is_ignored_base(&base) || same_type(&base, &closed) {
                continue;
            }
            self.add_service(
                ServiceDescriptor::new(base.clone(), lifetime)
                    .implemented_by(closed.clone())
                    .keyed(key.clone())
                    .with_symbol(symbol.clone()),
            );
            self.append_to_collection(&base, specialized);
        }
        self.append_to_collection(&closed, specialized);

        self.specialization_depth += 1;
        let checked = self.check_constructor_dependencies(specialized);
        self.specialization_depth -= 1;
        checked?;

        resolution.selected_service = Some(specialized);
        Ok(())
    }

    // ── Diagnostics ──

    fn describe_unresolved(&self, parameter: &ParameterResolution) -> UnresolvedParameter {
        let cause = if parameter.has_multiple_registrations {
            UnresolvedCause::MultipleRegistrations {
                candidates: parameter
                    .multiple_services
                    .iter()
                    .map(|id| {
                        let registration = &self.registrations[id.0];
                        Candidate {
                            implementation: registration.resolved_type().display_name(),
                            key: registration.key.clone(),
                        }
                    })
                    .collect(),
            }
        } else {
            let requested = self
                .settings
                .well_known
                .deferred_inner(&parameter.parameter_type)
                .unwrap_or(&parameter.parameter_type);
            UnresolvedCause::NoDeclaration {
                suggestions: self.suggestions_for(requested),
            }
        };

        UnresolvedParameter {
            name: parameter.parameter.name.clone(),
            requested: parameter.parameter_type.display_name(),
            key: parameter.key.clone(),
            cause,
        }
    }

    fn suggestions_for(&self, requested: &TypeRef) -> Vec<String> {
        let names: Vec<String> = self
            .by_type
            .keys()
            .filter(|k| !k.ty().is_open())
            .map(ToString::to_string)
            .collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();

        suggest_similar(&requested.to_string(), &names, self.settings.max_suggestions)
            .iter()
            .map(|name| shorten_type_name(name))
            .collect()
    }

    // ── Validation ──

    /// Fails on any cycle of hard dependencies, and on deferred cycles
    /// between transient services.
    ///
    /// # Errors
    /// - [`TarkibError::CircularDependency`]
    /// - [`TarkibError::LazyTransientCycle`]
    pub fn validate_dependency_graph(&self) -> Result<()> {
        GraphValidator::from_manifest(self).validate()
    }
}

impl std::fmt::Debug for ServiceManifest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceManifest")
            .field("registrations", &self.registrations.len())
            .field("resolutions", &self.resolutions.len())
            .field("collections", &self.collections.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TypeDefinition, TypeModel};
    use crate::oracle::PrefixFallback;
    use crate::types::{AssociatedSymbol, MethodInfo};

    // === Types used across the tests ===

    fn clock() -> TypeRef {
        TypeRef::interface("app::Clock")
    }

    fn system_clock() -> TypeRef {
        TypeRef::class("app::SystemClock")
    }

    fn store() -> TypeRef {
        TypeRef::interface("app::Store")
    }

    fn user() -> TypeRef {
        TypeRef::class("app::User")
    }

    fn t() -> TypeRef {
        TypeRef::parameter("T")
    }

    fn generic(name: &str, arg: TypeRef) -> TypeRef {
        TypeRef::class(name).with_args([arg])
    }

    fn repo(arg: TypeRef) -> TypeRef {
        generic("app::Repo", arg)
    }

    fn store_of(arg: TypeRef) -> TypeRef {
        TypeRef::interface("app::GenericStore").with_args([arg])
    }

    fn param(name: &str, ty: TypeRef) -> ParameterInfo {
        ParameterInfo::new(name, ty)
    }

    fn class_with(ty: TypeRef, parameters: Vec<ParameterInfo>) -> TypeDefinition {
        TypeDefinition::new(ty).constructor(MethodInfo::constructor(parameters))
    }

    fn base_model() -> TypeModel {
        TypeModel::new()
            .define(TypeDefinition::new(clock()))
            .define(TypeDefinition::new(system_clock()).inherits(clock()))
            .define(TypeDefinition::new(store()))
            .define(TypeDefinition::new(TypeRef::class("app::SqlStore")).inherits(store()))
            .define(TypeDefinition::new(TypeRef::class("app::MemoryStore")).inherits(store()))
            .define(TypeDefinition::new(user()))
    }

    fn add(manifest: &mut ServiceManifest<'_>, ty: TypeRef, lifetime: Lifetime) -> RegistrationId {
        manifest.add_service(ServiceDescriptor::new(ty, lifetime))
    }

    fn map(
        manifest: &mut ServiceManifest<'_>,
        service: TypeRef,
        implementation: TypeRef,
        key: Option<&str>,
    ) -> RegistrationId {
        manifest.add_service(
            ServiceDescriptor::new(service, Lifetime::Singleton)
                .implemented_by(implementation)
                .keyed(key.map(str::to_string)),
        )
    }

    fn selected(
        manifest: &ServiceManifest<'_>,
        consumer: &TypeRef,
        index: usize,
    ) -> Option<RegistrationId> {
        manifest
            .constructor_resolution(consumer)
            .and_then(|r| r.parameters().get(index))
            .and_then(ParameterResolution::selected_service)
    }

    // === Registration ===

    #[test]
    fn index_for_type_counts_only_closed_registrations() {
        let model = base_model();
        let mut manifest = ServiceManifest::new(&model);

        let first = map(&mut manifest, clock(), system_clock(), None);
        let open = map(&mut manifest, clock(), generic("app::WrappedClock", t()), None);
        let second = map(&mut manifest, clock(), TypeRef::class("app::UtcClock"), None);

        assert_eq!(manifest.registration(first).index_for_type(), 0);
        assert_eq!(manifest.registration(open).index_for_type(), 1);
        assert_eq!(manifest.registration(second).index_for_type(), 1);

        let listed: Vec<RegistrationId> = manifest.get_all_services().map(|r| r.id()).collect();
        assert_eq!(listed, vec![first, second]);
    }

    #[test]
    fn duplicate_registrations_are_accepted() {
        let model = base_model();
        let mut manifest = ServiceManifest::new(&model);
        add(&mut manifest, system_clock(), Lifetime::Singleton);
        add(&mut manifest, system_clock(), Lifetime::Singleton);
        assert_eq!(manifest.services_for(&system_clock()).len(), 2);
    }

    #[test]
    fn disposal_flags_come_from_base_types() {
        let model = base_model().define(
            TypeDefinition::new(TypeRef::class("app::Connection"))
                .inherits(TypeRef::interface("core::AsyncDisposable")),
        );
        let mut manifest = ServiceManifest::new(&model);
        let id = add(&mut manifest, TypeRef::class("app::Connection"), Lifetime::Scoped);

        assert!(manifest.registration(id).is_async_disposable());
        assert!(!manifest.registration(id).is_disposable());
    }

    #[test]
    #[should_panic]
    fn foreign_registration_id_panics() {
        let model = base_model();
        let mut other = ServiceManifest::new(&model);
        add(&mut other, system_clock(), Lifetime::Singleton);
        let foreign = add(&mut other, user(), Lifetime::Singleton);

        let manifest = ServiceManifest::new(&model);
        let _ = manifest.registration(foreign);
    }

    #[test]
    fn services_by_lifetime() {
        let model = base_model();
        let mut manifest = ServiceManifest::new(&model);
        add(&mut manifest, system_clock(), Lifetime::Singleton);
        add(&mut manifest, user(), Lifetime::Transient);

        let singletons: Vec<String> = manifest
            .get_services_by_lifetime(Lifetime::Singleton)
            .map(|r| r.ty().to_string())
            .collect();
        assert_eq!(singletons, vec!["app::SystemClock"]);
        assert_eq!(manifest.get_services_by_lifetime(Lifetime::Scoped).count(), 0);
    }

    // === Constructor selection ===

    #[test]
    fn ambiguous_public_constructors_fail() {
        let checkout = TypeRef::class("app::Checkout");
        let model = base_model().define(
            TypeDefinition::new(checkout.clone())
                .constructor(MethodInfo::constructor([]))
                .constructor(MethodInfo::constructor([param("clock", clock())])),
        );
        let mut manifest = ServiceManifest::new(&model);
        let id = add(&mut manifest, checkout, Lifetime::Transient);

        match manifest.check_constructor_dependencies(id).unwrap_err() {
            TarkibError::AmbiguousConstructor { count, .. } => assert_eq!(count, 2),
            other => panic!("Expected AmbiguousConstructor, got: {other:?}"),
        }
    }

    #[test]
    fn private_constructors_are_ignored() {
        let checkout = TypeRef::class("app::Checkout");
        let model = base_model().define(
            TypeDefinition::new(checkout.clone())
                .constructor(
                    MethodInfo::constructor([param("store", store())])
                        .with_accessibility(crate::types::Accessibility::Private),
                )
                .constructor(MethodInfo::constructor([param("clock", clock())])),
        );
        let mut manifest = ServiceManifest::new(&model);
        map(&mut manifest, clock(), system_clock(), None);
        let id = add(&mut manifest, checkout.clone(), Lifetime::Transient);

        manifest.check_constructor_dependencies(id).unwrap();
        let resolution = manifest.constructor_resolution(&checkout).unwrap();
        assert_eq!(resolution.parameters().len(), 1);
        assert_eq!(resolution.parameters()[0].parameter().name, "clock");
    }

    #[test]
    fn implicit_constructor_is_used() {
        let model = base_model();
        let mut manifest = ServiceManifest::new(&model);
        let id = add(&mut manifest, system_clock(), Lifetime::Singleton);

        manifest.check_constructor_dependencies(id).unwrap();
        let resolution = manifest.constructor_resolution(&system_clock()).unwrap();
        assert!(resolution.parameters().is_empty());
        assert!(matches!(
            resolution.constructor(),
            Constructible::Constructor(c) if c.implicitly_declared
        ));
    }

    #[test]
    fn types_without_constructors_are_a_no_op() {
        let model = base_model();
        let mut manifest = ServiceManifest::new(&model);
        let id = add(&mut manifest, clock(), Lifetime::Singleton);

        manifest.check_constructor_dependencies(id).unwrap();
        assert!(manifest.constructor_resolution(&clock()).is_none());
    }

    #[test]
    fn type_parameters_and_arrays_are_not_named() {
        let model = base_model();
        let mut manifest = ServiceManifest::new(&model);
        let parameter = add(&mut manifest, t(), Lifetime::Transient);
        let array = add(&mut manifest, TypeRef::array(user()), Lifetime::Transient);

        for id in [parameter, array] {
            match manifest.check_constructor_dependencies(id).unwrap_err() {
                TarkibError::NotNamedType { .. } => {}
                other => panic!("Expected NotNamedType, got: {other:?}"),
            }
        }
    }

    // === Factories ===

    #[test]
    fn void_or_unnamed_factories_are_invalid() {
        let model = base_model();
        let mut manifest = ServiceManifest::new(&model);

        let void = AssociatedSymbol::Method(MethodInfo::method("Configure", None, []));
        let array = AssociatedSymbol::Method(MethodInfo::method(
            "Users",
            Some(TypeRef::array(user())),
            [],
        ));

        for symbol in [void, array] {
            let id = manifest.add_service(
                ServiceDescriptor::new(user(), Lifetime::Transient).with_symbol(Some(symbol)),
            );
            match manifest.check_constructor_dependencies(id).unwrap_err() {
                TarkibError::InvalidFactory { .. } => {}
                other => panic!("Expected InvalidFactory, got: {other:?}"),
            }
        }
    }

    #[test]
    fn factory_parameters_are_resolved() {
        let model = base_model();
        let mut manifest = ServiceManifest::new(&model);
        let clock_id = map(&mut manifest, clock(), system_clock(), None);

        let factory = AssociatedSymbol::Method(MethodInfo::method(
            "CreateUser",
            Some(user()),
            [param("clock", clock())],
        ));
        let id = manifest.add_service(
            ServiceDescriptor::new(user(), Lifetime::Scoped).with_symbol(Some(factory)),
        );

        manifest.check_constructor_dependencies(id).unwrap();
        let resolution = manifest.constructor_resolution(&user()).unwrap();
        assert!(matches!(resolution.constructor(), Constructible::Symbol(_)));
        assert_eq!(selected(&manifest, &user(), 0), Some(clock_id));
    }

    #[test]
    fn instance_members_resolve_without_parameters() {
        let model = base_model();
        let mut manifest = ServiceManifest::new(&model);
        let id = manifest.add_service(
            ServiceDescriptor::new(clock(), Lifetime::Singleton).with_symbol(Some(
                AssociatedSymbol::Property {
                    name: "Clock".to_string(),
                    ty: system_clock(),
                },
            )),
        );

        manifest.check_constructor_dependencies(id).unwrap();
        assert!(manifest.constructor_resolution(&clock()).unwrap().parameters().is_empty());
    }

    // === Parameter resolution ===

    #[test]
    fn keyed_parameter_selects_keyed_registration() {
        let checkout = TypeRef::class("app::Checkout");
        let model = base_model().define(class_with(
            checkout.clone(),
            vec![param("primary", store()), param("cache", store()).keyed("memory")],
        ));
        let mut manifest = ServiceManifest::new(&model);
        let sql = map(&mut manifest, store(), TypeRef::class("app::SqlStore"), None);
        let memory =
            map(&mut manifest, store(), TypeRef::class("app::MemoryStore"), Some("memory"));
        let id = add(&mut manifest, checkout.clone(), Lifetime::Transient);

        manifest.check_constructor_dependencies(id).unwrap();
        assert_eq!(selected(&manifest, &checkout, 0), Some(sql));
        assert_eq!(selected(&manifest, &checkout, 1), Some(memory));
    }

    #[test]
    fn two_unkeyed_registrations_are_ambiguous() {
        let checkout = TypeRef::class("app::Checkout");
        let model =
            base_model().define(class_with(checkout.clone(), vec![param("store", store())]));
        let mut manifest = ServiceManifest::new(&model);
        map(&mut manifest, store(), TypeRef::class("app::SqlStore"), None);
        map(&mut manifest, store(), TypeRef::class("app::MemoryStore"), None);
        let id = add(&mut manifest, checkout.clone(), Lifetime::Transient);

        let err = manifest.check_constructor_dependencies(id).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("multiple registrations found: 2"), "{msg}");
        assert!(msg.contains("SqlStore"));
        assert!(msg.contains("MemoryStore"));

        let parameter = &manifest.constructor_resolution(&checkout).unwrap().parameters()[0];
        assert!(parameter.has_multiple_registrations());
        assert_eq!(parameter.multiple_services().len(), 2);
        assert!(parameter.selected_service().is_none());
    }

    #[test]
    fn keyed_registrations_are_not_ambiguous_candidates() {
        let checkout = TypeRef::class("app::Checkout");
        let model =
            base_model().define(class_with(checkout.clone(), vec![param("store", store())]));
        let mut manifest = ServiceManifest::new(&model);
        map(&mut manifest, store(), TypeRef::class("app::SqlStore"), None);
        map(&mut manifest, store(), TypeRef::class("app::MemoryStore"), None);
        map(&mut manifest, store(), TypeRef::class("app::ArchiveStore"), Some("archive"));
        let id = add(&mut manifest, checkout.clone(), Lifetime::Transient);

        let msg = manifest.check_constructor_dependencies(id).unwrap_err().to_string();
        assert!(msg.contains("multiple registrations found: 2"), "{msg}");
        assert!(!msg.contains("ArchiveStore"), "{msg}");

        let parameter = &manifest.constructor_resolution(&checkout).unwrap().parameters()[0];
        assert_eq!(parameter.multiple_services().len(), 2);
    }

    #[test]
    fn missing_key_is_no_declaration() {
        let checkout = TypeRef::class("app::Checkout");
        let model = base_model()
            .define(class_with(checkout.clone(), vec![param("store", store()).keyed("archive")]));
        let mut manifest = ServiceManifest::new(&model);
        map(&mut manifest, store(), TypeRef::class("app::SqlStore"), None);
        let id = add(&mut manifest, checkout.clone(), Lifetime::Transient);

        match manifest.check_constructor_dependencies(id).unwrap_err() {
            TarkibError::UnresolvedDependencies(err) => {
                assert_eq!(err.parameters.len(), 1);
                assert!(matches!(err.parameters[0].cause, UnresolvedCause::NoDeclaration { .. }));
                assert_eq!(err.parameters[0].key.as_deref(), Some("archive"));
            }
            other => panic!("Expected UnresolvedDependencies, got: {other:?}"),
        }
    }

    #[test]
    fn unresolved_parameters_are_all_reported_with_suggestions() {
        let checkout = TypeRef::class("app::Checkout");
        let model = base_model().define(class_with(
            checkout.clone(),
            vec![param("clock", clock()), param("store", store()), param("user", user())],
        ));
        let mut manifest = ServiceManifest::new(&model);
        add(&mut manifest, system_clock(), Lifetime::Singleton);
        add(&mut manifest, user(), Lifetime::Transient);
        let id = add(&mut manifest, checkout.clone(), Lifetime::Transient);

        match manifest.check_constructor_dependencies(id).unwrap_err() {
            TarkibError::UnresolvedDependencies(err) => {
                assert_eq!(err.service, "Checkout");
                let names: Vec<&str> = err.parameters.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(names, vec!["clock", "store"]);
                match &err.parameters[0].cause {
                    UnresolvedCause::NoDeclaration { suggestions } => {
                        assert_eq!(suggestions, &vec!["SystemClock".to_string()]);
                    }
                    other => panic!("Expected NoDeclaration, got: {other:?}"),
                }
            }
            other => panic!("Expected UnresolvedDependencies, got: {other:?}"),
        }

        // stored before failing, with every parameter
        let resolution = manifest.constructor_resolution(&checkout).unwrap();
        assert_eq!(resolution.parameters().len(), 3);
        assert!(resolution.parameters()[2].selected_service().is_some());
    }

    #[test]
    fn nullable_and_defaulted_parameters_may_stay_unresolved() {
        let checkout = TypeRef::class("app::Checkout");
        let model = base_model().define(class_with(
            checkout.clone(),
            vec![
                param("clock", clock().nullable()),
                param(
                    "retries",
                    TypeRef::structure("core::Nullable")
                        .with_args([TypeRef::structure("core::Int")]),
                ),
                param("store", store()).with_default("null"),
            ],
        ));
        let mut manifest = ServiceManifest::new(&model);
        let id = add(&mut manifest, checkout.clone(), Lifetime::Transient);

        manifest.check_constructor_dependencies(id).unwrap();
        let parameters = manifest.constructor_resolution(&checkout).unwrap().parameters();
        assert!(parameters[0].is_nullable());
        assert!(parameters[1].is_nullable());
        assert_eq!(parameters[1].parameter_type().to_string(), "core::Int");
        assert_eq!(parameters[2].default_value(), Some("null"));
        assert!(parameters.iter().all(|p| p.selected_service().is_none()));
    }

    #[test]
    fn implementation_is_followed_one_level() {
        let checkout = TypeRef::class("app::Checkout");
        let utc_clock = TypeRef::class("app::UtcClock");
        let model = base_model()
            .define(TypeDefinition::new(utc_clock.clone()).inherits(system_clock()))
            .define(class_with(checkout.clone(), vec![param("clock", clock())]));
        let mut manifest = ServiceManifest::new(&model);

        map(&mut manifest, clock(), system_clock(), None);
        let system_to_utc = map(&mut manifest, system_clock(), utc_clock.clone(), None);
        add(&mut manifest, utc_clock, Lifetime::Singleton);
        let id = add(&mut manifest, checkout.clone(), Lifetime::Transient);

        manifest.check_constructor_dependencies(id).unwrap();
        // Clock → SystemClock is followed; SystemClock → UtcClock is not.
        assert_eq!(selected(&manifest, &checkout, 0), Some(system_to_utc));
    }

    #[test]
    fn self_registered_implementation_is_shared() {
        let checkout = TypeRef::class("app::Checkout");
        let model =
            base_model().define(class_with(checkout.clone(), vec![param("clock", clock())]));
        let mut manifest = ServiceManifest::new(&model);
        map(&mut manifest, clock(), system_clock(), None);
        let concrete = add(&mut manifest, system_clock(), Lifetime::Singleton);
        let id = add(&mut manifest, checkout.clone(), Lifetime::Transient);

        manifest.check_constructor_dependencies(id).unwrap();
        assert_eq!(selected(&manifest, &checkout, 0), Some(concrete));
    }

    #[test]
    fn deferred_parameter_resolves_inner_type() {
        let checkout = TypeRef::class("app::Checkout");
        let lazy_clock = TypeRef::class("core::Lazy").with_args([clock()]);
        let model =
            base_model().define(class_with(checkout.clone(), vec![param("clock", lazy_clock)]));
        let mut manifest = ServiceManifest::new(&model);
        let clock_id = map(&mut manifest, clock(), system_clock(), None);
        let id = add(&mut manifest, checkout.clone(), Lifetime::Transient);

        manifest.check_constructor_dependencies(id).unwrap();
        let parameter = &manifest.constructor_resolution(&checkout).unwrap().parameters()[0];
        assert!(parameter.is_deferred());
        assert_eq!(parameter.parameter_type().to_string(), "core::Lazy<app::Clock>");
        assert_eq!(parameter.selected_service(), Some(clock_id));
    }

    #[test]
    fn checking_twice_replaces_the_resolution() {
        let checkout = TypeRef::class("app::Checkout");
        let model =
            base_model().define(class_with(checkout.clone(), vec![param("clock", clock())]));
        let mut manifest = ServiceManifest::new(&model);
        map(&mut manifest, clock(), system_clock(), None);
        let id = add(&mut manifest, checkout.clone(), Lifetime::Transient);

        manifest.check_constructor_dependencies(id).unwrap();
        let first = selected(&manifest, &checkout, 0);
        manifest.check_constructor_dependencies(id).unwrap();

        assert_eq!(manifest.get_all_constructor_resolutions().len(), 1);
        assert_eq!(manifest.constructor_resolution(&checkout).unwrap().parameters().len(), 1);
        assert_eq!(selected(&manifest, &checkout, 0), first);
    }

    // === Runtime fallback ===

    #[test]
    fn fallback_satisfies_undeclared_parameters_only() {
        let checkout = TypeRef::class("app::Checkout");
        let configuration = TypeRef::interface("host::Configuration");
        let model = base_model().define(class_with(
            checkout.clone(),
            vec![param("configuration", configuration)],
        ));

        let mut strict = ServiceManifest::new(&model);
        let id = add(&mut strict, checkout.clone(), Lifetime::Transient);
        assert!(strict.check_constructor_dependencies(id).is_err());

        let fallback = PrefixFallback::new(["host::"]);
        let mut manifest = ServiceManifest::new(&model).with_fallback(&fallback);
        let id = add(&mut manifest, checkout.clone(), Lifetime::Transient);
        manifest.check_constructor_dependencies(id).unwrap();

        let parameter = &manifest.constructor_resolution(&checkout).unwrap().parameters()[0];
        assert!(parameter.resolved_by_fallback());
        assert!(!parameter.has_no_declaration());
    }

    #[test]
    fn fallback_does_not_break_ambiguity() {
        let checkout = TypeRef::class("app::Checkout");
        let model =
            base_model().define(class_with(checkout.clone(), vec![param("store", store())]));
        let fallback = PrefixFallback::new(["app::"]);
        let mut manifest = ServiceManifest::new(&model).with_fallback(&fallback);
        map(&mut manifest, store(), TypeRef::class("app::SqlStore"), None);
        map(&mut manifest, store(), TypeRef::class("app::MemoryStore"), None);
        let id = add(&mut manifest, checkout, Lifetime::Transient);

        assert!(manifest.check_constructor_dependencies(id).is_err());
    }

    // === Generic specialization ===

    fn generic_model() -> TypeModel {
        base_model()
            .define(TypeDefinition::new(store_of(t())))
            .define(
                class_with(repo(t()), vec![param("clock", clock())])
                    .inherits(store_of(t()))
                    .inherits(TypeRef::class("core::Object")),
            )
            .define(class_with(
                TypeRef::class("app::UserService"),
                vec![param("users", repo(user()))],
            ))
            .define(class_with(
                TypeRef::class("app::UserQueries"),
                vec![param("users", store_of(user()))],
            ))
    }

    #[test]
    fn open_generic_is_specialized_and_resolved_eagerly() {
        let model = generic_model();
        let mut manifest = ServiceManifest::new(&model);
        let clock_id = map(&mut manifest, clock(), system_clock(), None);
        add(&mut manifest, repo(t()), Lifetime::Scoped);
        let service = TypeRef::class("app::UserService");
        let id = add(&mut manifest, service.clone(), Lifetime::Transient);

        manifest.check_constructor_dependencies(id).unwrap();

        let specialized = manifest.services_for(&repo(user()));
        assert_eq!(specialized.len(), 1);
        assert_eq!(specialized[0].lifetime(), Lifetime::Scoped);
        assert_eq!(selected(&manifest, &service, 0), Some(specialized[0].id()));

        // the specialization's own dependencies were resolved first
        assert_eq!(selected(&manifest, &repo(user()), 0), Some(clock_id));

        // base mappings, without the ignored root
        let mapped = manifest.services_for(&store_of(user()));
        assert_eq!(mapped.len(), 1);
        assert_eq!(
            mapped[0].implementation().map(ToString::to_string),
            Some("app::Repo<app::User>".to_string())
        );
        assert!(manifest.services_for(&TypeRef::class("core::Object")).is_empty());
    }

    #[test]
    fn open_interface_mapping_specializes_implementation() {
        let model = generic_model();
        let mut manifest = ServiceManifest::new(&model);
        map(&mut manifest, clock(), system_clock(), None);
        map(&mut manifest, store_of(t()), repo(t()), None);

        let queries = TypeRef::class("app::UserQueries");
        let first = add(&mut manifest, queries.clone(), Lifetime::Transient);
        manifest.check_constructor_dependencies(first).unwrap();

        let specialized = manifest.services_for(&repo(user()));
        assert_eq!(specialized.len(), 1);
        assert_eq!(specialized[0].lifetime(), Lifetime::Singleton);

        // a second consumer reuses the specialization through the base mapping
        let service = TypeRef::class("app::UserService");
        let second = add(&mut manifest, service.clone(), Lifetime::Transient);
        manifest.check_constructor_dependencies(second).unwrap();
        assert_eq!(manifest.services_for(&repo(user())).len(), 1);
        assert_eq!(selected(&manifest, &queries, 0), selected(&manifest, &service, 0));
    }

    #[test]
    fn specialization_failure_propagates() {
        let model = generic_model();
        let mut manifest = ServiceManifest::new(&model);
        add(&mut manifest, repo(t()), Lifetime::Scoped);
        let id = add(&mut manifest, TypeRef::class("app::UserService"), Lifetime::Transient);

        match manifest.check_constructor_dependencies(id).unwrap_err() {
            TarkibError::UnresolvedDependencies(err) => assert_eq!(err.service, "Repo<User>"),
            other => panic!("Expected UnresolvedDependencies, got: {other:?}"),
        }
    }

    #[test]
    fn existing_closed_registration_is_reused_through_an_alias() {
        let reports = TypeRef::class("app::UserReports");
        let model = generic_model()
            .define(class_with(reports.clone(), vec![param("users", store_of(user()))]));
        let mut manifest = ServiceManifest::new(&model);
        map(&mut manifest, clock(), system_clock(), None);
        map(&mut manifest, store_of(t()), repo(t()), None);
        let explicit = add(&mut manifest, repo(user()), Lifetime::Scoped);

        let queries = TypeRef::class("app::UserQueries");
        let id = add(&mut manifest, queries.clone(), Lifetime::Transient);
        manifest.check_constructor_dependencies(id).unwrap();

        assert_eq!(selected(&manifest, &queries, 0), Some(explicit));
        assert_eq!(manifest.services_for(&repo(user())).len(), 1);

        let aliases = manifest.services_for(&store_of(user()));
        assert_eq!(aliases.len(), 1);
        assert_eq!(
            aliases[0].implementation().map(ToString::to_string),
            Some("app::Repo<app::User>".to_string())
        );

        // later requests go through the alias to the same registration
        let id = add(&mut manifest, reports.clone(), Lifetime::Transient);
        manifest.check_constructor_dependencies(id).unwrap();
        assert_eq!(selected(&manifest, &reports, 0), Some(explicit));
        assert_eq!(manifest.services_for(&repo(user())).len(), 1);
        assert_eq!(manifest.services_for(&store_of(user())).len(), 1);
    }

    #[test]
    fn keyed_request_never_specializes() {
        let service = TypeRef::class("app::KeyedService");
        let model = generic_model()
            .define(class_with(service.clone(), vec![param("users", repo(user())).keyed("main")]));
        let mut manifest = ServiceManifest::new(&model);
        add(&mut manifest, repo(t()), Lifetime::Scoped);
        let id = add(&mut manifest, service, Lifetime::Transient);

        assert!(manifest.check_constructor_dependencies(id).is_err());
        assert!(manifest.services_for(&repo(user())).is_empty());
    }

    #[test]
    fn self_nesting_generics_hit_the_depth_limit() {
        let wrapper = |arg: TypeRef| generic("app::Wrapper", arg);
        let service = TypeRef::class("app::Wrapped");
        let model = TypeModel::new()
            .define(class_with(wrapper(t()), vec![param("inner", wrapper(wrapper(t())))]))
            .define(class_with(service.clone(), vec![param("wrapper", wrapper(user()))]));

        let settings = Settings {
            max_specialization_depth: 4,
            ..Settings::default()
        };
        let mut manifest = ServiceManifest::with_settings(&model, &settings);
        add(&mut manifest, wrapper(t()), Lifetime::Transient);
        let id = add(&mut manifest, service, Lifetime::Transient);

        match manifest.check_constructor_dependencies(id).unwrap_err() {
            TarkibError::SpecializationDepthExceeded { limit, .. } => assert_eq!(limit, 4),
            other => panic!("Expected SpecializationDepthExceeded, got: {other:?}"),
        }
    }

    // === Collections ===

    fn plugin() -> TypeRef {
        TypeRef::interface("app::Plugin")
    }

    fn collection_model() -> TypeModel {
        let known = Settings::default().well_known;
        base_model()
            .define(TypeDefinition::new(plugin()))
            .define(TypeDefinition::new(TypeRef::class("app::AuditPlugin")).inherits(plugin()))
            .define(TypeDefinition::new(TypeRef::class("app::MetricsPlugin")).inherits(plugin()))
            .define(class_with(
                TypeRef::class("app::Host"),
                vec![param("plugins", known.enumerable_of(&plugin()))],
            ))
            .define(class_with(
                TypeRef::class("app::Admin"),
                vec![
                    param("list", known.read_only_list_of(&plugin())),
                    param("array", TypeRef::array(plugin())),
                ],
            ))
            .define(class_with(
                TypeRef::class("app::Strict"),
                vec![
                    param("plugins", known.read_only_collection_of(&plugin())).require_non_empty(),
                ],
            ))
    }

    #[test]
    fn collection_shapes_are_synthesized_once() {
        let model = collection_model();
        let known = Settings::default().well_known;
        let mut manifest = ServiceManifest::new(&model);
        let audit = map(&mut manifest, plugin(), TypeRef::class("app::AuditPlugin"), None);
        let metrics = map(&mut manifest, plugin(), TypeRef::class("app::MetricsPlugin"), None);

        let host = TypeRef::class("app::Host");
        let id = add(&mut manifest, host.clone(), Lifetime::Singleton);
        manifest.check_constructor_dependencies(id).unwrap();

        let enumerable = selected(&manifest, &host, 0).unwrap();
        let registration = manifest.registration(enumerable);
        assert_eq!(registration.ty().to_string(), "collections::Enumerable<app::Plugin>");
        assert_eq!(registration.collected_services(), Some(&[audit, metrics][..]));

        // every shape points at the same backing array
        let array = TypeRef::array(plugin());
        assert_eq!(manifest.services_for(&array).len(), 1);
        for shape in [
            known.enumerable_of(&plugin()),
            known.read_only_list_of(&plugin()),
            known.read_only_collection_of(&plugin()),
        ] {
            let registrations = manifest.services_for(&shape);
            assert_eq!(registrations.len(), 1);
            assert_eq!(registrations[0].lifetime(), Lifetime::Transient);
            assert_eq!(
                registrations[0].implementation().map(ToString::to_string),
                Some(array.to_string())
            );
        }

        // later requests for any shape reuse the family
        let before = manifest.len();
        let admin = TypeRef::class("app::Admin");
        let id = add(&mut manifest, admin.clone(), Lifetime::Singleton);
        manifest.check_constructor_dependencies(id).unwrap();
        assert_eq!(manifest.len(), before + 1);
        assert_eq!(selected(&manifest, &admin, 0), Some(enumerable));
        assert_eq!(selected(&manifest, &admin, 1), Some(enumerable));
    }

    #[test]
    fn empty_collection_is_allowed_unless_required_non_empty() {
        let model = collection_model();
        let mut manifest = ServiceManifest::new(&model);

        let strict = add(&mut manifest, TypeRef::class("app::Strict"), Lifetime::Singleton);
        assert!(manifest.check_constructor_dependencies(strict).is_err());
        assert!(manifest.services_for(&TypeRef::array(plugin())).is_empty());

        let host = TypeRef::class("app::Host");
        let id = add(&mut manifest, host.clone(), Lifetime::Singleton);
        manifest.check_constructor_dependencies(id).unwrap();
        let enumerable = selected(&manifest, &host, 0).unwrap();
        assert_eq!(manifest.registration(enumerable).collected_services(), Some(&[][..]));

        // the family now exists but is still empty
        assert!(manifest.check_constructor_dependencies(strict).is_err());
    }

    #[test]
    fn open_generic_registrations_are_not_collected() {
        let model = collection_model();
        let mut manifest = ServiceManifest::new(&model);
        let audit = map(&mut manifest, plugin(), TypeRef::class("app::AuditPlugin"), None);
        map(&mut manifest, plugin(), generic("app::GenericPlugin", t()), None);

        let host = TypeRef::class("app::Host");
        let id = add(&mut manifest, host.clone(), Lifetime::Singleton);
        manifest.check_constructor_dependencies(id).unwrap();

        let enumerable = selected(&manifest, &host, 0).unwrap();
        assert_eq!(
            manifest.registration(enumerable).collected_services(),
            Some(&[audit][..])
        );
    }

    #[test]
    fn collection_members_follow_one_level_of_indirection() {
        let model = collection_model();
        let mut manifest = ServiceManifest::new(&model);
        map(&mut manifest, plugin(), TypeRef::class("app::AuditPlugin"), None);
        let concrete = add(&mut manifest, TypeRef::class("app::AuditPlugin"), Lifetime::Singleton);

        let host = TypeRef::class("app::Host");
        let id = add(&mut manifest, host.clone(), Lifetime::Singleton);
        manifest.check_constructor_dependencies(id).unwrap();

        let enumerable = selected(&manifest, &host, 0).unwrap();
        assert_eq!(manifest.registration(enumerable).collected_services(), Some(&[concrete][..]));
    }

    #[test]
    fn later_specializations_join_existing_collections() {
        let known = Settings::default().well_known;
        let listing = TypeRef::class("app::StoreListing");
        let model = generic_model().define(class_with(
            listing.clone(),
            vec![param("stores", known.enumerable_of(&store_of(user())))],
        ));
        let mut manifest = ServiceManifest::new(&model);
        map(&mut manifest, clock(), system_clock(), None);
        map(&mut manifest, store_of(t()), repo(t()), None);

        let first = add(&mut manifest, listing.clone(), Lifetime::Singleton);
        manifest.check_constructor_dependencies(first).unwrap();
        let enumerable = selected(&manifest, &listing, 0).unwrap();
        assert_eq!(manifest.registration(enumerable).collected_services(), Some(&[][..]));

        let queries = add(&mut manifest, TypeRef::class("app::UserQueries"), Lifetime::Transient);
        manifest.check_constructor_dependencies(queries).unwrap();

        let specialized = manifest.services_for(&repo(user()))[0].id();
        assert_eq!(
            manifest.registration(enumerable).collected_services(),
            Some(&[specialized][..])
        );
    }
}
