//! Type identity keys.
//!
//! [`TypeKey`] is the single equality/hash strategy for service types.
//! Two keys are equal when their types are structurally identical: same
//! name, same kind, and pairwise identical type arguments. Nullable
//! annotations are ignored at every level, so `Repo<Clock?>` and
//! `Repo<Clock>` index the same registrations.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::types::TypeRef;

/// Identifies a service type inside the manifest's maps and sets.
///
/// # Examples
/// ```
/// use tarkib_manifest::key::TypeKey;
/// use tarkib_manifest::types::TypeRef;
///
/// let repo = TypeRef::class("app::Repo");
/// let a = TypeKey::new(&repo.clone().with_args([TypeRef::class("app::User")]));
/// let b = TypeKey::new(&repo.with_args([TypeRef::class("app::User").nullable()]));
/// assert_eq!(a, b);
/// ```
#[derive(Clone)]
pub struct TypeKey(TypeRef);

impl TypeKey {
    #[inline]
    pub fn new(ty: &TypeRef) -> Self {
        Self(ty.clone())
    }

    /// Returns the type this key was built from.
    #[inline]
    pub fn ty(&self) -> &TypeRef {
        &self.0
    }
}

impl From<TypeRef> for TypeKey {
    fn from(ty: TypeRef) -> Self {
        Self(ty)
    }
}

/// Structural identity of two types, ignoring nullable annotations.
pub fn same_type(a: &TypeRef, b: &TypeRef) -> bool {
    a.kind() == b.kind()
        && a.name() == b.name()
        && a.args().len() == b.args().len()
        && a.args().iter().zip(b.args()).all(|(x, y)| same_type(x, y))
}

fn hash_type<H: Hasher>(ty: &TypeRef, state: &mut H) {
    ty.kind().hash(state);
    ty.name().hash(state);
    ty.args().len().hash(state);
    for arg in ty.args() {
        hash_type(arg, state);
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        same_type(&self.0, &other.0)
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_type(&self.0, state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.0.without_annotation())
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.without_annotation())
    }
}
