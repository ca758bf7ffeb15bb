//! Dynamic values passed through the container
//!
//! Constructor arguments, property overrides and definitions are all
//! expressed as [`Value`]s. Built objects travel as [`Instance`]s and lazy
//! pointers to other identifiers as [`Reference`]s.

use crate::class::ClassInfo;
use crate::{Callable, Container, DiError, Injectable, Result};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Instance
// =============================================================================

/// A built object together with the description of its class.
///
/// Cloning an `Instance` clones the `Arc`, so clones are the same object.
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    class: Arc<ClassInfo>,
}

impl Instance {
    /// Wrap a value nobody described; its class name is its Rust type name
    pub fn new<T: Injectable>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an already shared value
    pub fn from_arc<T: Injectable>(value: Arc<T>) -> Self {
        Self {
            value,
            class: Arc::new(ClassInfo::bare::<T>()),
        }
    }

    pub(crate) fn with_class(value: Arc<dyn Any + Send + Sync>, class: Arc<ClassInfo>) -> Self {
        Self { value, class }
    }

    /// Identifier of the class that built this instance
    #[inline]
    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    #[inline]
    pub fn class(&self) -> &ClassInfo {
        &self.class
    }

    /// `TypeId` of the wrapped value (not of the `Arc`)
    #[inline]
    pub fn value_type_id(&self) -> TypeId {
        let value: &(dyn Any + Send + Sync) = &*self.value;
        value.type_id()
    }

    /// Shared access to the concrete value
    pub fn downcast<T: Injectable>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// Access the value through an interface declared with `Class::implements`
    pub fn cast<I: ?Sized + 'static>(&self) -> Option<Arc<I>> {
        self.class.cast::<I>(&self.value)
    }

    pub(crate) fn erased(&self) -> Arc<dyn Any + Send + Sync> {
        Arc::clone(&self.value)
    }

    /// Whether both handles point at the same object
    #[inline]
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.value), Arc::as_ptr(&other.value))
    }

    /// Set a described property; only possible while nobody else holds the object
    pub(crate) fn set_property(&mut self, name: &str, value: Value) -> Result<()> {
        let class = Arc::clone(&self.class);
        match Arc::get_mut(&mut self.value) {
            Some(target) => class.set_property(target, name, value),
            None => Err(DiError::creation_failed(
                class.name(),
                format!("cannot set property \"{name}\" on a shared instance"),
            )),
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class_name())
            .field("ptr", &Arc::as_ptr(&self.value))
            .finish()
    }
}

// =============================================================================
// Reference
// =============================================================================

/// A lazy pointer to another identifier.
///
/// Nothing happens when a reference is created or registered; it is only
/// resolved, through [`Container::get`], at the moment its value is needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    id: String,
}

impl Reference {
    pub fn to(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Resolve the target through the container
    pub fn resolve(&self, container: &Container) -> Result<Instance> {
        container.get(&self.id)
    }
}

impl AsRef<str> for Reference {
    fn as_ref(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reference({})", self.id)
    }
}

// =============================================================================
// Value
// =============================================================================

/// A dynamically typed argument, property or definition value
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// String-keyed entries in insertion order
    Map(Vec<(String, Value)>),
    Object(Instance),
    Reference(Reference),
    Callable(Callable),
}

impl Value {
    /// Build a map value from key/value pairs
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a list value
    pub fn list<V: Into<Value>, I: IntoIterator<Item = V>>(items: I) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Instance> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }

    /// Look up a key of a map value
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Short description of the value's type, used in error messages
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".into(),
            Value::Bool(_) => "bool".into(),
            Value::Int(_) => "int".into(),
            Value::Float(_) => "float".into(),
            Value::Str(_) => "string".into(),
            Value::List(_) | Value::Map(_) => "array".into(),
            Value::Object(instance) => instance.class_name().to_string(),
            Value::Reference(r) => format!("reference to {}", r.id()),
            Value::Callable(_) => "callable".into(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Reference(a), Value::Reference(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            Value::Object(instance) => f.debug_tuple("Object").field(instance).finish(),
            Value::Reference(r) => f.debug_tuple("Reference").field(&r.id()).finish(),
            Value::Callable(c) => f.debug_tuple("Callable").field(c).finish(),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(value: $ty) -> Self {
                    Value::$variant(value.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i64 => Int,
    i32 => Int,
    u32 => Int,
    f64 => Float,
    f32 => Float,
    String => Str,
    &str => Str,
    Vec<Value> => List,
    Instance => Object,
    Reference => Reference,
    Callable => Callable,
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

// =============================================================================
// FromValue
// =============================================================================

/// Conversion out of a [`Value`], used by [`crate::Args::take`].
pub trait FromValue: Sized {
    /// The builtin type declaration matching this Rust type
    const TYPE_HINT: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for Value {
    const TYPE_HINT: &'static str = "mixed";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for i64 {
    const TYPE_HINT: &'static str = "int";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int()
    }
}

impl FromValue for i32 {
    const TYPE_HINT: &'static str = "int";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int().and_then(|i| i32::try_from(i).ok())
    }
}

impl FromValue for u32 {
    const TYPE_HINT: &'static str = "int";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int().and_then(|i| u32::try_from(i).ok())
    }
}

impl FromValue for usize {
    const TYPE_HINT: &'static str = "int";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int().and_then(|i| usize::try_from(i).ok())
    }
}

impl FromValue for f64 {
    const TYPE_HINT: &'static str = "float";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_float()
    }
}

impl FromValue for bool {
    const TYPE_HINT: &'static str = "bool";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for String {
    const TYPE_HINT: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for Vec<Value> {
    const TYPE_HINT: &'static str = "array";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_list().map(<[Value]>::to_vec)
    }
}

impl FromValue for Instance {
    const TYPE_HINT: &'static str = "object";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_object().cloned()
    }
}
