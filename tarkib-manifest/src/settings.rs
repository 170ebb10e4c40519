//! Engine settings.
//!
//! Settings are plain data, deserializable from TOML:
//!
//! ```toml
//! max_specialization_depth = 8
//!
//! [well_known]
//! deferred = ["core::Lazy", "core::Deferred"]
//! ```
//!
//! Every field has a default, so an empty document is valid.

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::error::{Result, TarkibError};
use crate::types::TypeRef;

/// Settings shared by manifests created without explicit settings.
pub(crate) static DEFAULT_SETTINGS: Lazy<Settings> = Lazy::new(Settings::default);

/// Tunables for one resolution pass.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// How many generic specializations may nest inside each other before
    /// the pass gives up (guards `Wrapper<Wrapper<T>>` style expansion).
    pub max_specialization_depth: usize,
    /// How many "did you mean" suggestions an unresolved parameter lists.
    pub max_suggestions: usize,
    pub well_known: WellKnownTypes,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_specialization_depth: 16,
            max_suggestions: 3,
            well_known: WellKnownTypes::default(),
        }
    }
}

impl Settings {
    /// Parses settings from a TOML document.
    ///
    /// # Errors
    /// [`TarkibError::InvalidSettings`] on malformed TOML or unknown keys.
    pub fn from_toml(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(TarkibError::InvalidSettings)
    }
}

/// Names of the types the engine treats specially.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WellKnownTypes {
    pub enumerable: String,
    pub read_only_collection: String,
    pub read_only_list: String,
    /// Wrappers whose construction is postponed until first use.
    pub deferred: Vec<String>,
    /// Generic wrapper used for nullable value types.
    pub nullable: String,
    pub disposable: String,
    pub async_disposable: String,
    /// Roots never registered as specialization aliases.
    pub ignored_base_types: Vec<String>,
}

impl Default for WellKnownTypes {
    fn default() -> Self {
        Self {
            enumerable: "collections::Enumerable".to_string(),
            read_only_collection: "collections::ReadOnlyCollection".to_string(),
            read_only_list: "collections::ReadOnlyList".to_string(),
            deferred: vec!["core::Lazy".to_string()],
            nullable: "core::Nullable".to_string(),
            disposable: "core::Disposable".to_string(),
            async_disposable: "core::AsyncDisposable".to_string(),
            ignored_base_types: vec!["core::Object".to_string(), "core::ValueType".to_string()],
        }
    }
}

impl WellKnownTypes {
    fn single_arg<'t>(ty: &'t TypeRef, name: &str) -> Option<&'t TypeRef> {
        match ty.args() {
            [arg] if ty.is_named() && ty.name() == name => Some(arg),
            _ => None,
        }
    }

    /// Element type when `ty` is one of the four collection shapes:
    /// enumerable, read-only collection, read-only list or a fixed array.
    pub fn collection_element<'t>(&self, ty: &'t TypeRef) -> Option<&'t TypeRef> {
        ty.element_type()
            .or_else(|| Self::single_arg(ty, &self.enumerable))
            .or_else(|| Self::single_arg(ty, &self.read_only_collection))
            .or_else(|| Self::single_arg(ty, &self.read_only_list))
    }

    pub fn enumerable_of(&self, element: &TypeRef) -> TypeRef {
        TypeRef::interface(self.enumerable.clone()).with_args([element.clone()])
    }

    pub fn read_only_collection_of(&self, element: &TypeRef) -> TypeRef {
        TypeRef::interface(self.read_only_collection.clone()).with_args([element.clone()])
    }

    pub fn read_only_list_of(&self, element: &TypeRef) -> TypeRef {
        TypeRef::interface(self.read_only_list.clone()).with_args([element.clone()])
    }

    /// Inner type of a deferred wrapper such as `Lazy<T>`.
    pub fn deferred_inner<'t>(&self, ty: &'t TypeRef) -> Option<&'t TypeRef> {
        self.deferred
            .iter()
            .find_map(|name| Self::single_arg(ty, name))
    }

    /// Splits a parameter type into its underlying type and nullability.
    pub fn unwrap_nullable(&self, ty: &TypeRef) -> (TypeRef, bool) {
        match Self::single_arg(ty, &self.nullable) {
            Some(inner) => (inner.without_annotation(), true),
            None => (ty.without_annotation(), ty.is_nullable()),
        }
    }

    pub fn is_ignored_base(&self, ty: &TypeRef) -> bool {
        self.ignored_base_types.iter().any(|name| name == ty.name())
    }
}
