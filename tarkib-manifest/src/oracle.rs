//! The type oracle: everything the engine asks the host compiler.
//!
//! The engine never inspects source code. It asks structural questions
//! through [`TypeOracle`] and treats the answers as facts. Hosts with a
//! real compiler implement the trait over their symbol tables; everything
//! else can use the in-memory [`TypeModel`](crate::model::TypeModel).

use crate::extractor::Declaration;
use crate::types::{AssociatedSymbol, MethodInfo, TypeRef};

/// Structural queries about types.
///
/// All answers for a closed generic type must already have the type
/// arguments substituted: the constructors of `Repo<User>` take
/// `Store<User>`, not `Store<T>`.
pub trait TypeOracle {
    /// The open definition a constructed generic type was built from,
    /// e.g. `Repo<T>` for `Repo<User>`. `None` for non-generic types.
    fn generic_definition(&self, ty: &TypeRef) -> Option<TypeRef>;

    /// Every superclass and implemented interface, transitively.
    fn base_types(&self, ty: &TypeRef) -> Vec<TypeRef>;

    /// Declared and implicit constructors of all accessibilities.
    fn constructors(&self, ty: &TypeRef) -> Vec<MethodInfo>;

    /// Methods, properties and fields named `name` on `owner`.
    fn members(&self, owner: &TypeRef, name: &str) -> Vec<AssociatedSymbol>;

    /// Service declarations attached to a provider or module type, in
    /// source order.
    fn declarations(&self, provider: &TypeRef) -> Vec<Declaration>;

    /// Whether `ty` is marked as an importable module.
    fn is_module(&self, ty: &TypeRef) -> bool;
}

/// Last-resort resolver for services only known at run time.
///
/// Consulted strictly after the engine found no declaration for a
/// parameter. It is never asked to break ambiguity between several
/// registrations.
pub trait FallbackResolver {
    /// Whether the runtime can supply `ty` (under `key`).
    fn can_provide(&self, key: Option<&str>, ty: &TypeRef) -> bool;
}

/// A fallback that accepts every type whose name starts with one of the
/// given prefixes.
#[derive(Debug, Clone, Default)]
pub struct PrefixFallback {
    prefixes: Vec<String>,
}

impl PrefixFallback {
    pub fn new(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }
}

impl FallbackResolver for PrefixFallback {
    fn can_provide(&self, _key: Option<&str>, ty: &TypeRef) -> bool {
        self.prefixes.iter().any(|p| ty.name().starts_with(p.as_str()))
    }
}
