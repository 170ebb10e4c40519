//! Structural type model.
//!
//! [`TypeRef`] is the engine's view of a type as reported by the host
//! compiler: a path-qualified name, a kind, ordered type arguments and a
//! nullable annotation. Identity comparisons go through
//! [`TypeKey`](crate::key::TypeKey); `TypeRef` itself has no
//! `PartialEq`.

use std::fmt;

use tarkib_support::rendering::shorten_type_name;

/// What sort of type a [`TypeRef`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
    Struct,
    /// `E[]`, always with exactly one argument
    Array,
    /// A generic parameter such as `T`
    TypeParameter,
    /// A type the host could not bind
    Error,
}

/// A reference to a (possibly generic) type.
#[derive(Debug, Clone)]
pub struct TypeRef {
    name: String,
    kind: TypeKind,
    args: Vec<TypeRef>,
    nullable: bool,
}

impl TypeRef {
    fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            args: Vec::new(),
            nullable: false,
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Class)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    pub fn structure(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Struct)
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::TypeParameter)
    }

    pub fn error(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Error)
    }

    /// The fixed array type `element[]`.
    pub fn array(element: TypeRef) -> Self {
        Self {
            name: String::new(),
            kind: TypeKind::Array,
            args: vec![element],
            nullable: false,
        }
    }

    /// Returns this type with the given type arguments.
    pub fn with_args(mut self, args: impl IntoIterator<Item = TypeRef>) -> Self {
        self.args = args.into_iter().collect();
        self
    }

    /// Returns this type with a nullable annotation.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Returns this type with the nullable annotation removed.
    pub fn without_annotation(&self) -> Self {
        let mut ty = self.clone();
        ty.nullable = false;
        ty
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    #[inline]
    pub fn args(&self) -> &[TypeRef] {
        &self.args
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Class, interface or struct.
    pub fn is_named(&self) -> bool {
        matches!(self.kind, TypeKind::Class | TypeKind::Interface | TypeKind::Struct)
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        self.kind == TypeKind::Array
    }

    /// A named type carrying type arguments.
    pub fn is_generic(&self) -> bool {
        self.is_named() && !self.args.is_empty()
    }

    /// True when a type parameter occurs anywhere in this type.
    pub fn is_open(&self) -> bool {
        self.kind == TypeKind::TypeParameter || self.args.iter().any(TypeRef::is_open)
    }

    /// Element type of an array.
    pub fn element_type(&self) -> Option<&TypeRef> {
        if self.is_array() { self.args.first() } else { None }
    }

    /// Builds the same generic type over different arguments.
    pub fn construct(&self, args: &[TypeRef]) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            args: args.to_vec(),
            nullable: false,
        }
    }

    /// Replaces type parameters by their bound arguments.
    ///
    /// Parameters without a binding are left in place.
    pub fn substitute(&self, bindings: &[(String, TypeRef)]) -> Self {
        if self.kind == TypeKind::TypeParameter {
            if let Some((_, bound)) = bindings.iter().find(|(name, _)| *name == self.name) {
                let mut bound = bound.clone();
                bound.nullable |= self.nullable;
                return bound;
            }
            return self.clone();
        }

        Self {
            name: self.name.clone(),
            kind: self.kind,
            args: self.args.iter().map(|a| a.substitute(bindings)).collect(),
            nullable: self.nullable,
        }
    }

    /// Short human-readable name used in diagnostics.
    pub fn display_name(&self) -> String {
        shorten_type_name(&self.to_string())
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == TypeKind::Array {
            match self.args.first() {
                Some(element) => write!(f, "{element}[]")?,
                None => write!(f, "?[]")?,
            }
        } else {
            write!(f, "{}", self.name)?;
            if !self.args.is_empty() {
                write!(f, "<")?;
                for (i, arg) in self.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")?;
            }
        }
        if self.nullable {
            write!(f, "?")?;
        }
        Ok(())
    }
}

/// Marker attributes a parameter may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterAttribute {
    /// Resolve this parameter against the registration with the given key.
    FromKeyedService(String),
    /// A collection parameter that must not resolve to an empty set.
    RequireNonEmpty,
    /// Any attribute the engine does not interpret.
    Other(String),
}

/// A constructor or factory parameter.
#[derive(Debug, Clone)]
pub struct ParameterInfo {
    pub name: String,
    pub ty: TypeRef,
    pub attributes: Vec<ParameterAttribute>,
    /// Literal default value in source form, e.g. `"null"` or `"30"`.
    pub default_value: Option<String>,
}

impl ParameterInfo {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            attributes: Vec::new(),
            default_value: None,
        }
    }

    pub fn keyed(mut self, key: impl Into<String>) -> Self {
        self.attributes.push(ParameterAttribute::FromKeyedService(key.into()));
        self
    }

    pub fn require_non_empty(mut self) -> Self {
        self.attributes.push(ParameterAttribute::RequireNonEmpty);
        self
    }

    pub fn with_default(mut self, literal: impl Into<String>) -> Self {
        self.default_value = Some(literal.into());
        self
    }

    /// Key from a keyed-service marker, if present.
    pub fn service_key(&self) -> Option<&str> {
        self.attributes.iter().find_map(|a| match a {
            ParameterAttribute::FromKeyedService(key) => Some(key.as_str()),
            _ => None,
        })
    }

    pub fn requires_non_empty(&self) -> bool {
        self.attributes.contains(&ParameterAttribute::RequireNonEmpty)
    }

    pub(crate) fn substitute(&self, bindings: &[(String, TypeRef)]) -> Self {
        Self {
            ty: self.ty.substitute(bindings),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessibility {
    Public,
    Internal,
    Protected,
    Private,
}

/// A constructor or method.
#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub name: String,
    pub accessibility: Accessibility,
    /// Compiler-provided default constructor.
    pub implicitly_declared: bool,
    pub parameters: Vec<ParameterInfo>,
    /// `None` for void.
    pub return_type: Option<TypeRef>,
}

impl MethodInfo {
    /// An explicitly declared public constructor.
    pub fn constructor(parameters: impl IntoIterator<Item = ParameterInfo>) -> Self {
        Self {
            name: ".ctor".to_string(),
            accessibility: Accessibility::Public,
            implicitly_declared: false,
            parameters: parameters.into_iter().collect(),
            return_type: None,
        }
    }

    /// The parameterless constructor a compiler supplies when none is declared.
    pub fn implicit_constructor() -> Self {
        Self {
            implicitly_declared: true,
            ..Self::constructor([])
        }
    }

    pub fn method(
        name: impl Into<String>,
        return_type: Option<TypeRef>,
        parameters: impl IntoIterator<Item = ParameterInfo>,
    ) -> Self {
        Self {
            name: name.into(),
            accessibility: Accessibility::Public,
            implicitly_declared: false,
            parameters: parameters.into_iter().collect(),
            return_type,
        }
    }

    pub fn with_accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    #[inline]
    pub fn is_public(&self) -> bool {
        self.accessibility == Accessibility::Public
    }

    pub(crate) fn substitute(&self, bindings: &[(String, TypeRef)]) -> Self {
        Self {
            name: self.name.clone(),
            accessibility: self.accessibility,
            implicitly_declared: self.implicitly_declared,
            parameters: self.parameters.iter().map(|p| p.substitute(bindings)).collect(),
            return_type: self.return_type.as_ref().map(|t| t.substitute(bindings)),
        }
    }
}

/// A factory method or instance member a registration is built from.
#[derive(Debug, Clone)]
pub enum AssociatedSymbol {
    Method(MethodInfo),
    Property { name: String, ty: TypeRef },
    Field { name: String, ty: TypeRef },
}

impl AssociatedSymbol {
    pub fn name(&self) -> &str {
        match self {
            AssociatedSymbol::Method(method) => &method.name,
            AssociatedSymbol::Property { name, .. } | AssociatedSymbol::Field { name, .. } => name,
        }
    }

    /// Type produced by invoking or reading the member; `None` for void methods.
    pub fn produced_type(&self) -> Option<&TypeRef> {
        match self {
            AssociatedSymbol::Method(method) => method.return_type.as_ref(),
            AssociatedSymbol::Property { ty, .. } | AssociatedSymbol::Field { ty, .. } => Some(ty),
        }
    }

    pub fn parameters(&self) -> &[ParameterInfo] {
        match self {
            AssociatedSymbol::Method(method) => &method.parameters,
            _ => &[],
        }
    }

    pub(crate) fn substitute(&self, bindings: &[(String, TypeRef)]) -> Self {
        match self {
            AssociatedSymbol::Method(method) => {
                AssociatedSymbol::Method(method.substitute(bindings))
            }
            AssociatedSymbol::Property { name, ty } => AssociatedSymbol::Property {
                name: name.clone(),
                ty: ty.substitute(bindings),
            },
            AssociatedSymbol::Field { name, ty } => AssociatedSymbol::Field {
                name: name.clone(),
                ty: ty.substitute(bindings),
            },
        }
    }
}
