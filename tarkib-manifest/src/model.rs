//! In-memory type oracle.
//!
//! [`TypeModel`] answers [`TypeOracle`] queries from a set of hand-built
//! [`TypeDefinition`]s. It performs type parameter substitution, so a model
//! that defines `Repo<T> : Store<T>` answers `base_types(Repo<User>)` with
//! `Store<User>`.
//!
//! # Examples
//! ```
//! use tarkib_manifest::model::{TypeDefinition, TypeModel};
//! use tarkib_manifest::oracle::TypeOracle;
//! use tarkib_manifest::types::{MethodInfo, ParameterInfo, TypeRef};
//!
//! let t = TypeRef::parameter("T");
//! let model = TypeModel::new()
//!     .define(TypeDefinition::new(TypeRef::interface("app::Store").with_args([t.clone()])))
//!     .define(
//!         TypeDefinition::new(TypeRef::class("app::Repo").with_args([t.clone()]))
//!             .inherits(TypeRef::interface("app::Store").with_args([t.clone()]))
//!             .constructor(MethodInfo::constructor([
//!                 ParameterInfo::new("clock", TypeRef::class("app::Clock")),
//!             ])),
//!     );
//!
//! let closed = TypeRef::class("app::Repo").with_args([TypeRef::class("app::User")]);
//! let bases = model.base_types(&closed);
//! assert_eq!(bases[0].to_string(), "app::Store<app::User>");
//! ```

use std::collections::{HashMap, HashSet};

use crate::extractor::Declaration;
use crate::key::TypeKey;
use crate::oracle::TypeOracle;
use crate::types::{AssociatedSymbol, MethodInfo, TypeKind, TypeRef};

/// Everything the model knows about one type.
#[derive(Debug, Clone)]
pub struct TypeDefinition {
    /// Declared form; generic definitions list their parameters as arguments.
    ty: TypeRef,
    bases: Vec<TypeRef>,
    constructors: Vec<MethodInfo>,
    members: Vec<AssociatedSymbol>,
    declarations: Vec<Declaration>,
    module: bool,
}

impl TypeDefinition {
    pub fn new(ty: TypeRef) -> Self {
        Self {
            ty,
            bases: Vec::new(),
            constructors: Vec::new(),
            members: Vec::new(),
            declarations: Vec::new(),
            module: false,
        }
    }

    /// Adds a direct superclass or interface.
    pub fn inherits(mut self, base: TypeRef) -> Self {
        self.bases.push(base);
        self
    }

    pub fn constructor(mut self, constructor: MethodInfo) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn member(mut self, member: AssociatedSymbol) -> Self {
        self.members.push(member);
        self
    }

    pub fn declare(mut self, declaration: Declaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// Marks the type as an importable module.
    pub fn module(mut self) -> Self {
        self.module = true;
        self
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// Parameter bindings that turn this definition into `target`.
    fn bindings(&self, target: &TypeRef) -> Vec<(String, TypeRef)> {
        self.ty
            .args()
            .iter()
            .zip(target.args())
            .filter(|(param, _)| param.kind() == TypeKind::TypeParameter)
            .map(|(param, arg)| (param.name().to_string(), arg.clone()))
            .collect()
    }
}

/// An in-memory [`TypeOracle`].
#[derive(Debug, Clone, Default)]
pub struct TypeModel {
    definitions: HashMap<String, TypeDefinition>,
}

impl TypeModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the definition for a type name.
    pub fn define(mut self, definition: TypeDefinition) -> Self {
        self.definitions
            .insert(definition.ty.name().to_string(), definition);
        self
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn definition(&self, ty: &TypeRef) -> Option<&TypeDefinition> {
        if !ty.is_named() {
            return None;
        }
        self.definitions.get(ty.name())
    }

    fn collect_bases(&self, ty: &TypeRef, seen: &mut HashSet<TypeKey>, out: &mut Vec<TypeRef>) {
        let Some(definition) = self.definition(ty) else {
            return;
        };
        let bindings = definition.bindings(ty);

        for base in &definition.bases {
            let base = base.substitute(&bindings);
            if seen.insert(TypeKey::new(&base)) {
                out.push(base.clone());
                self.collect_bases(&base, seen, out);
            }
        }
    }
}

impl TypeOracle for TypeModel {
    fn generic_definition(&self, ty: &TypeRef) -> Option<TypeRef> {
        if !ty.is_generic() {
            return None;
        }
        self.definition(ty)
            .filter(|d| d.ty.args().len() == ty.args().len())
            .map(|d| d.ty.clone())
    }

    fn base_types(&self, ty: &TypeRef) -> Vec<TypeRef> {
        let mut seen = HashSet::new();
        seen.insert(TypeKey::new(ty));
        let mut bases = Vec::new();
        self.collect_bases(ty, &mut seen, &mut bases);
        bases
    }

    fn constructors(&self, ty: &TypeRef) -> Vec<MethodInfo> {
        let Some(definition) = self.definition(ty) else {
            return Vec::new();
        };

        if definition.constructors.is_empty() {
            // Classes and structs get a compiler-supplied default constructor.
            return match ty.kind() {
                TypeKind::Class | TypeKind::Struct => vec![MethodInfo::implicit_constructor()],
                _ => Vec::new(),
            };
        }

        let bindings = definition.bindings(ty);
        definition
            .constructors
            .iter()
            .map(|c| c.substitute(&bindings))
            .collect()
    }

    fn members(&self, owner: &TypeRef, name: &str) -> Vec<AssociatedSymbol> {
        let Some(definition) = self.definition(owner) else {
            return Vec::new();
        };
        let bindings = definition.bindings(owner);
        definition
            .members
            .iter()
            .filter(|m| m.name() == name)
            .map(|m| m.substitute(&bindings))
            .collect()
    }

    fn declarations(&self, provider: &TypeRef) -> Vec<Declaration> {
        self.definition(provider)
            .map(|d| d.declarations.clone())
            .unwrap_or_default()
    }

    fn is_module(&self, ty: &TypeRef) -> bool {
        self.definition(ty).is_some_and(|d| d.module)
    }
}
