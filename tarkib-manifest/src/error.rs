//! Error types for resolution passes.
//!
//! Every error is a structural defect in the declarations. The driver
//! reports it to the user and abandons generation for that provider, so
//! messages carry everything needed to fix the declaration without
//! re-running anything.

use std::fmt;

use tarkib_support::rendering::{ChainLink, key_suffix, render_chain, render_chain_vertical};

use crate::types::TypeRef;

/// Main error type for all Tarkib operations.
#[derive(Debug, thiserror::Error)]
pub enum TarkibError {
    /// The registered type is a type parameter, array or unbound type.
    #[error("{ty} is not a named type; only classes, interfaces and structs can be constructed")]
    NotNamedType { ty: TypeRef },

    /// More than one explicit public constructor.
    #[error("{ty} has {count} public constructors; declare exactly one or register a factory")]
    AmbiguousConstructor { ty: TypeRef, count: usize },

    /// Factory or instance member is void or returns a non-named type.
    #[error("Member `{member}` cannot construct {ty}: it must return a named type")]
    InvalidFactory { ty: TypeRef, member: String },

    /// One or more parameters could not be satisfied.
    #[error("{}", .0)]
    UnresolvedDependencies(UnresolvedDependenciesError),

    /// A chain of hard dependencies returns to its start.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// A cycle through deferred references between transient services.
    #[error("{}", .0)]
    LazyTransientCycle(LazyTransientCycleError),

    /// Generic specialization kept nesting, e.g. `Wrapper<Wrapper<T>>`.
    #[error("Specializing {ty} exceeded the maximum nesting depth of {limit}")]
    SpecializationDepthExceeded { ty: TypeRef, limit: usize },

    /// A factory or instance declaration names a missing member.
    #[error("{owner} has no member named `{member}`")]
    MemberNotFound { owner: TypeRef, member: String },

    /// A factory or instance declaration names an overloaded member.
    #[error("{owner} has {count} members named `{member}`; factory members must be unique")]
    AmbiguousMember {
        owner: TypeRef,
        member: String,
        count: usize,
    },

    /// An import names a type that is not a module.
    #[error("{ty} cannot be imported: it is not marked as a module")]
    InvalidImport { ty: TypeRef },

    /// Settings document could not be parsed.
    #[error("Invalid settings: {0}")]
    InvalidSettings(#[source] toml::de::Error),
}

/// Why a single parameter could not be satisfied.
#[derive(Debug, Clone)]
pub enum UnresolvedCause {
    /// Nothing is registered for the requested type and key.
    NoDeclaration {
        /// Registered type names that look like the requested one.
        suggestions: Vec<String>,
    },
    /// Several registrations match and none is preferred.
    MultipleRegistrations { candidates: Vec<Candidate> },
}

/// One of several ambiguous registrations.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub implementation: String,
    pub key: Option<String>,
}

/// Diagnostic for one failing parameter.
#[derive(Debug, Clone)]
pub struct UnresolvedParameter {
    pub name: String,
    pub requested: String,
    pub key: Option<String>,
    pub cause: UnresolvedCause,
}

impl fmt::Display for UnresolvedParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parameter `{}` requires {}{}",
            self.name,
            self.requested,
            key_suffix(self.key.as_deref())
        )?;

        match &self.cause {
            UnresolvedCause::NoDeclaration { suggestions } => {
                write!(f, ": no registration found")?;
                if !suggestions.is_empty() {
                    write!(f, " (did you mean {}?)", suggestions.join(", "))?;
                }
            }
            UnresolvedCause::MultipleRegistrations { candidates } => {
                write!(f, ": multiple registrations found: {}", candidates.len())?;
                for candidate in candidates {
                    write!(
                        f,
                        "\n      {}{}",
                        candidate.implementation,
                        key_suffix(candidate.key.as_deref())
                    )?;
                }
            }
        }
        Ok(())
    }
}

/// Error listing every unsatisfied parameter of one service.
#[derive(Debug, Clone)]
pub struct UnresolvedDependenciesError {
    /// The service whose constructor or factory was being resolved.
    pub service: String,
    pub parameters: Vec<UnresolvedParameter>,
}

impl UnresolvedDependenciesError {
    /// One rendered line (plus candidate continuation lines) per parameter.
    pub fn lines(&self) -> Vec<String> {
        self.parameters.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for UnresolvedDependenciesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unable to resolve dependencies of {}:", self.service)?;
        for line in self.lines() {
            write!(f, "\n  - {line}")?;
        }
        Ok(())
    }
}

/// Error when hard dependencies form a cycle.
#[derive(Debug, Clone)]
pub struct CircularDependencyError {
    /// Display names from the repeated service back to itself.
    /// Example: ["A", "B", "C", "A"]
    pub chain: Vec<String>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circular dependency detected:\n  {}", render_chain(&self.chain))?;
        write!(
            f,
            "\n  Hint: take one of these dependencies as a deferred reference (Lazy<T>) \
             from a Singleton or Scoped service"
        )
    }
}

/// Error when deferred references close a cycle between transient services.
#[derive(Debug, Clone)]
pub struct LazyTransientCycleError {
    pub links: Vec<ChainLink>,
}

impl LazyTransientCycleError {
    pub fn chain(&self) -> Vec<String> {
        self.links.iter().map(|l| l.display_name.clone()).collect()
    }
}

impl fmt::Display for LazyTransientCycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Deferred dependency cycle between transient services:\n  {}\n",
            render_chain(&self.chain())
        )?;
        write!(f, "{}", render_chain_vertical(&self.links))?;
        write!(
            f,
            "  Hint: a transient deferred factory builds a new instance each time and \
             re-enters its own construction; make one side Singleton or Scoped"
        )
    }
}

/// Convenient Result type for Tarkib operations.
pub type Result<T> = std::result::Result<T, TarkibError>;
