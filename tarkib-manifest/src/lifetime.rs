//! Service lifetimes.
//!
//! A lifetime decides how often the generated container builds a service:
//! - [`Lifetime::Singleton`]: once per container
//! - [`Lifetime::Scoped`]: once per logical scope
//! - [`Lifetime::Transient`]: on every request
//!
//! Lifetimes are ordered `Singleton > Scoped > Transient` by how long an
//! instance lives.

use std::fmt;

/// How long a resolved service instance lives.
///
/// # Examples
/// ```
/// use tarkib_manifest::lifetime::Lifetime;
///
/// assert!(Lifetime::Singleton > Lifetime::Scoped);
/// assert!(Lifetime::Scoped > Lifetime::Transient);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// One instance for the whole container, built lazily under a once guard.
    Singleton,
    /// One instance per scope.
    Scoped,
    /// A new instance per request.
    Transient,
}

impl Lifetime {
    /// Singleton and Scoped instances are memoized; a deferred reference to
    /// one of them can never re-enter its own construction.
    #[inline]
    pub fn is_memoized(&self) -> bool {
        matches!(self, Lifetime::Singleton | Lifetime::Scoped)
    }

    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, Lifetime::Transient)
    }

    #[inline]
    fn rank(&self) -> u8 {
        match self {
            Lifetime::Singleton => 2,
            Lifetime::Scoped => 1,
            Lifetime::Transient => 0,
        }
    }
}

impl PartialOrd for Lifetime {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Lifetime {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Singleton => write!(f, "Singleton"),
            Lifetime::Scoped => write!(f, "Scoped"),
            Lifetime::Transient => write!(f, "Transient"),
        }
    }
}
