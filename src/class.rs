//! Constructor and method descriptions
//!
//! Rust has no runtime reflection over constructors, so every autowirable
//! type describes itself once through a [`Class`] builder: its parameters
//! (names, declared types, defaults, variadic tail), the body that builds
//! it from resolved [`Args`], the interfaces it satisfies, and the
//! properties and methods the container may use afterwards. Interfaces and
//! other abstract identifiers are described with [`Interface`].
//!
//! # Example
//!
//! ```rust
//! use autowire::{Class, Interface, Param, Container};
//! use std::sync::Arc;
//!
//! trait Engine: Send + Sync {
//!     fn power(&self) -> i64;
//! }
//!
//! struct V8;
//! impl Engine for V8 {
//!     fn power(&self) -> i64 { 450 }
//! }
//!
//! struct Car {
//!     engine: Arc<dyn Engine>,
//!     wheels: i64,
//! }
//!
//! let container = Container::new();
//! container.describe_interface(Interface::new("Engine"));
//! container.describe(
//!     Class::<V8>::new("V8")
//!         .implements::<dyn Engine>("Engine", |v8| v8 as Arc<dyn Engine>)
//!         .construct(|_| Ok(V8)),
//! );
//! container.describe(
//!     Class::<Car>::new("Car")
//!         .param(Param::new("engine").typed("Engine"))
//!         .param(Param::new("wheels").typed("int").default(4))
//!         .construct(|args| {
//!             Ok(Car {
//!                 engine: args.interface::<dyn Engine>(0)?,
//!                 wheels: args.take(1)?,
//!             })
//!         }),
//! );
//! container.set("Engine", "V8").unwrap();
//!
//! let car = container.get_as::<Car>("Car").unwrap();
//! assert_eq!(car.engine.power(), 450);
//! assert_eq!(car.wheels, 4);
//! ```

use crate::{Args, DiError, Injectable, Instance, Result, Value};
use ahash::RandomState;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

// =============================================================================
// Declared Types
// =============================================================================

/// Builtin (non class-shaped) type names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Int,
    Float,
    String,
    Bool,
    Array,
    Object,
    Callable,
    Mixed,
}

impl Builtin {
    fn parse(name: &str) -> Option<Self> {
        let builtin = match name.to_ascii_lowercase().as_str() {
            "int" => Self::Int,
            "float" => Self::Float,
            "string" => Self::String,
            "bool" | "true" | "false" => Self::Bool,
            "array" | "iterable" => Self::Array,
            "object" => Self::Object,
            "callable" => Self::Callable,
            "mixed" => Self::Mixed,
            _ => return None,
        };
        Some(builtin)
    }

    /// Canonical spelling of the type
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Bool => "bool",
            Self::Array => "array",
            Self::Object => "object",
            Self::Callable => "callable",
            Self::Mixed => "mixed",
        }
    }

    /// Whether a (non-null) value is acceptable for this type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Int => matches!(value, Value::Int(_)),
            Self::Float => matches!(value, Value::Int(_) | Value::Float(_)),
            Self::String => matches!(value, Value::Str(_)),
            Self::Bool => matches!(value, Value::Bool(_)),
            Self::Array => matches!(value, Value::List(_) | Value::Map(_)),
            Self::Object => matches!(value, Value::Object(_)),
            Self::Callable => matches!(value, Value::Callable(_)),
            Self::Mixed => true,
        }
    }
}

/// One member of a declared type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeHint {
    Builtin(Builtin),
    /// A class or interface identifier
    Class(String),
}

impl TypeHint {
    fn parse(raw: &str) -> Self {
        match Builtin::parse(raw) {
            Some(builtin) => Self::Builtin(builtin),
            None => Self::Class(raw.to_string()),
        }
    }

    /// The class name, if this member is class-shaped
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Self::Class(name) => Some(name),
            Self::Builtin(_) => None,
        }
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(builtin) => f.write_str(builtin.name()),
            Self::Class(name) => f.write_str(name),
        }
    }
}

/// A parameter's declared type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeclaredType {
    Single(TypeHint),
    /// Any one of the members, in declared order
    Union(Vec<TypeHint>),
    /// Every one of the members at once
    Intersection(Vec<String>),
}

impl DeclaredType {
    /// Parse a type declaration such as `?Foo`, `A|B|null` or `A&B`.
    ///
    /// Returns the declared type (absent for a bare `null`) and whether the
    /// declaration itself admits null.
    pub fn parse(raw: &str) -> (Option<Self>, bool) {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix('?') {
            let (declared, _) = Self::parse(rest);
            return (declared, true);
        }
        if raw.contains('&') && !raw.contains('|') {
            let members = raw
                .split('&')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect();
            return (Some(Self::Intersection(members)), false);
        }

        let mut nullable = false;
        let mut members = Vec::new();
        for part in raw.split('|').map(str::trim).filter(|p| !p.is_empty()) {
            if part.eq_ignore_ascii_case("null") {
                nullable = true;
                continue;
            }
            let hint = TypeHint::parse(part);
            if hint == TypeHint::Builtin(Builtin::Mixed) {
                nullable = true;
            }
            if !members.contains(&hint) {
                members.push(hint);
            }
        }

        match members.len() {
            0 => (None, nullable),
            1 => (members.pop().map(Self::Single), nullable),
            _ => (Some(Self::Union(members)), nullable),
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(hint) => write!(f, "{hint}"),
            Self::Union(members) => {
                let names: Vec<String> = members.iter().map(ToString::to_string).collect();
                f.write_str(&names.join("|"))
            }
            Self::Intersection(members) => f.write_str(&members.join("&")),
        }
    }
}

// =============================================================================
// Parameters and Signatures
// =============================================================================

/// Descriptor of one constructor or callable parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    declared: Option<DeclaredType>,
    nullable: bool,
    default: Option<Value>,
    variadic: bool,
    position: usize,
}

impl Param {
    /// An untyped, required parameter
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared: None,
            nullable: false,
            default: None,
            variadic: false,
            position: 0,
        }
    }

    /// Declare the parameter type, e.g. `"int"`, `"?Logger"`, `"A|B"`, `"A&B"`
    pub fn typed(mut self, declaration: &str) -> Self {
        let (declared, nullable) = DeclaredType::parse(declaration);
        self.declared = declared;
        self.nullable = self.nullable || nullable;
        self
    }

    /// Give the parameter a default value; a default of null makes it nullable
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        if value.is_null() {
            self.nullable = true;
        }
        self.default = Some(value);
        self
    }

    /// Allow null even though the declared type does not say so
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Collect every remaining positional argument into this parameter
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn declared(&self) -> Option<&DeclaredType> {
        self.declared.as_ref()
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    #[inline]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    #[inline]
    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    /// Zero-based position in the owning signature
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// The class name when the parameter has exactly one class-shaped type
    pub fn class_type(&self) -> Option<&str> {
        match &self.declared {
            Some(DeclaredType::Single(hint)) => hint.class_name(),
            _ => None,
        }
    }

    /// Descriptor of one element collected by a variadic parameter
    pub(crate) fn element(&self) -> Param {
        Param {
            variadic: false,
            default: None,
            ..self.clone()
        }
    }

    /// Human readable type, `?` prefixed when nullable
    pub fn type_display(&self) -> String {
        match (&self.declared, self.nullable) {
            (None, _) => "mixed".to_string(),
            (Some(union @ DeclaredType::Union(_)), true) => format!("{union}|null"),
            (Some(declared), true) => format!("?{declared}"),
            (Some(declared), false) => declared.to_string(),
        }
    }
}

/// Ordered parameter list of a constructor or callable
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    params: Vec<Param>,
    defect: Option<String>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter
    pub fn param(mut self, mut param: Param) -> Self {
        if self.defect.is_none() {
            if let Some(last) = self.params.last().filter(|p| p.variadic) {
                self.defect = Some(format!(
                    "only the last parameter may be variadic, \"{}\" is followed by \"{}\"",
                    last.name, param.name
                ));
            }
        }
        param.position = self.params.len();
        self.params.push(param);
        self
    }

    #[inline]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Why this signature cannot be used, if it is malformed
    #[inline]
    pub fn defect(&self) -> Option<&str> {
        self.defect.as_deref()
    }
}

// =============================================================================
// Class Metadata (type-erased)
// =============================================================================

type ConstructFn = Arc<dyn Fn(Args) -> Result<Arc<dyn Any + Send + Sync>> + Send + Sync>;
type SetterFn = Arc<dyn Fn(&mut (dyn Any + Send + Sync), Value) -> Result<()> + Send + Sync>;
type CastFn = Arc<dyn Fn(Arc<dyn Any + Send + Sync>) -> Option<Box<dyn Any>> + Send + Sync>;
pub(crate) type MethodFn = Arc<dyn Fn(&Instance, Args) -> Result<Value> + Send + Sync>;
pub(crate) type StaticFn = Arc<dyn Fn(Args) -> Result<Value> + Send + Sync>;

/// Whether an identifier can be built directly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Concrete,
    /// Interfaces and abstract types; only reachable through a binding
    Interface,
}

struct Supertype {
    name: String,
    /// `(TypeId::of::<Arc<dyn I>>(), caster)` for trait object access
    cast: Option<(TypeId, CastFn)>,
}

/// An instance method callable through `[object, method]`
#[derive(Clone)]
pub struct Method {
    pub(crate) signature: Signature,
    pub(crate) body: MethodFn,
}

/// A static method callable through `[class, method]`
#[derive(Clone)]
pub struct StaticMethod {
    pub(crate) signature: Signature,
    pub(crate) body: StaticFn,
}

/// Type-erased description of a class or interface
pub struct ClassInfo {
    name: String,
    type_id: Option<TypeId>,
    kind: ClassKind,
    signature: Signature,
    body: Option<ConstructFn>,
    supertypes: Vec<Supertype>,
    properties: HashMap<String, SetterFn, RandomState>,
    methods: HashMap<String, Method, RandomState>,
    static_methods: HashMap<String, StaticMethod, RandomState>,
}

impl ClassInfo {
    fn empty(name: String, type_id: Option<TypeId>, kind: ClassKind) -> Self {
        Self {
            name,
            type_id,
            kind,
            signature: Signature::new(),
            body: None,
            supertypes: Vec::new(),
            properties: HashMap::default(),
            methods: HashMap::default(),
            static_methods: HashMap::default(),
        }
    }

    /// Metadata for a value nobody described: named after its Rust type
    pub(crate) fn bare<T: Injectable>() -> Self {
        Self::empty(
            std::any::type_name::<T>().to_string(),
            Some(TypeId::of::<T>()),
            ClassKind::Concrete,
        )
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    #[inline]
    pub fn type_id(&self) -> Option<TypeId> {
        self.type_id
    }

    /// Concrete and carrying a constructor body
    #[inline]
    pub fn is_instantiable(&self) -> bool {
        self.kind == ClassKind::Concrete && self.body.is_some()
    }

    /// The constructor's parameter list
    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Whether instances of this class satisfy the type `name`
    pub fn is_a(&self, name: &str) -> bool {
        self.name == name || self.supertypes.iter().any(|s| s.name == name)
    }

    /// Names of every interface or base this class satisfies
    pub fn supertypes(&self) -> impl Iterator<Item = &str> {
        self.supertypes.iter().map(|s| s.name.as_str())
    }

    pub(crate) fn construct(&self, args: Args) -> Result<Arc<dyn Any + Send + Sync>> {
        match &self.body {
            Some(body) => body(args),
            None => Err(DiError::not_instantiable(
                &self.name,
                "no constructor has been described",
            )),
        }
    }

    pub(crate) fn cast<I: ?Sized + 'static>(
        &self,
        value: &Arc<dyn Any + Send + Sync>,
    ) -> Option<Arc<I>> {
        let target = TypeId::of::<Arc<I>>();
        self.supertypes
            .iter()
            .filter_map(|s| s.cast.as_ref())
            .find(|(id, _)| *id == target)
            .and_then(|(_, cast)| cast(Arc::clone(value)))
            .and_then(|boxed| boxed.downcast::<Arc<I>>().ok())
            .map(|boxed| *boxed)
    }

    pub(crate) fn set_property(
        &self,
        target: &mut (dyn Any + Send + Sync),
        name: &str,
        value: Value,
    ) -> Result<()> {
        let setter = self
            .properties
            .get(name)
            .ok_or_else(|| DiError::UnknownProperty {
                class: self.name.clone(),
                property: name.to_string(),
            })?;
        setter(target, value)
    }

    pub(crate) fn method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    pub(crate) fn static_method(&self, name: &str) -> Option<&StaticMethod> {
        self.static_methods.get(name)
    }
}

impl fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInfo")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("params", &self.signature.len())
            .field("supertypes", &self.supertypes().collect::<Vec<_>>())
            .finish()
    }
}

// =============================================================================
// Builders
// =============================================================================

/// Builder describing how the container constructs a `T`
pub struct Class<T: Injectable> {
    info: ClassInfo,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> Class<T> {
    /// Describe `T` under the identifier `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: ClassInfo::empty(name.into(), Some(TypeId::of::<T>()), ClassKind::Concrete),
            _marker: PhantomData,
        }
    }

    /// Describe `T` under its Rust type name
    pub fn typed() -> Self {
        Self::new(std::any::type_name::<T>())
    }

    /// Append a constructor parameter
    pub fn param(mut self, param: Param) -> Self {
        self.info.signature = self.info.signature.param(param);
        self
    }

    /// Provide the constructor body, called with the resolved arguments
    pub fn construct<F>(mut self, body: F) -> Self
    where
        F: Fn(Args) -> Result<T> + Send + Sync + 'static,
    {
        self.info.body = Some(Arc::new(move |args| {
            body(args).map(|value| Arc::new(value) as Arc<dyn Any + Send + Sync>)
        }));
        self
    }

    /// Declare that `T` satisfies interface `name`, reachable as `Arc<I>`
    pub fn implements<I: ?Sized + 'static>(
        mut self,
        name: impl Into<String>,
        cast: fn(Arc<T>) -> Arc<I>,
    ) -> Self {
        let caster: CastFn = Arc::new(move |any| {
            let typed = any.downcast::<T>().ok()?;
            Some(Box::new(cast(typed)) as Box<dyn Any>)
        });
        self.info.supertypes.push(Supertype {
            name: name.into(),
            cast: Some((TypeId::of::<Arc<I>>(), caster)),
        });
        self
    }

    /// Declare that `T` satisfies type `name` without a trait object cast
    pub fn extends(mut self, name: impl Into<String>) -> Self {
        self.info.supertypes.push(Supertype {
            name: name.into(),
            cast: None,
        });
        self
    }

    /// Expose a property the container may set after construction
    pub fn property<F>(mut self, name: impl Into<String>, setter: F) -> Self
    where
        F: Fn(&mut T, Value) -> Result<()> + Send + Sync + 'static,
    {
        let class = self.info.name.clone();
        let setter: SetterFn = Arc::new(move |target, value| match target.downcast_mut::<T>() {
            Some(target) => setter(target, value),
            None => Err(DiError::creation_failed(&class, "property target has a foreign type")),
        });
        self.info.properties.insert(name.into(), setter);
        self
    }

    /// Expose an instance method for `[object, method]` invocation
    pub fn method<F>(mut self, name: impl Into<String>, signature: Signature, body: F) -> Self
    where
        F: Fn(&T, Args) -> Result<Value> + Send + Sync + 'static,
    {
        let body: MethodFn = Arc::new(move |instance, args| match instance.downcast::<T>() {
            Some(target) => body(&*target, args),
            None => Err(DiError::creation_failed(
                instance.class_name(),
                "method receiver has a foreign type",
            )),
        });
        self.info.methods.insert(name.into(), Method { signature, body });
        self
    }

    /// Expose a static method for `[class, method]` invocation
    pub fn static_method<F>(mut self, name: impl Into<String>, signature: Signature, body: F) -> Self
    where
        F: Fn(Args) -> Result<Value> + Send + Sync + 'static,
    {
        self.info.static_methods.insert(
            name.into(),
            StaticMethod {
                signature,
                body: Arc::new(body),
            },
        );
        self
    }

    /// The identifier this class is described under
    #[inline]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Finish the description
    pub fn into_info(self) -> ClassInfo {
        self.info
    }
}

/// Builder describing an interface or abstract identifier
#[derive(Debug, Clone)]
pub struct Interface {
    name: String,
}

impl Interface {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Name the interface after a trait object type, e.g. `Interface::of::<dyn Engine>()`
    pub fn of<I: ?Sized + 'static>() -> Self {
        Self::new(std::any::type_name::<I>())
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn into_info(self) -> ClassInfo {
        ClassInfo::empty(self.name, None, ClassKind::Interface)
    }
}
