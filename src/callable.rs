//! Invocable units: closures, methods, static methods and named functions

use crate::class::{MethodFn, StaticFn};
use crate::registry::Registry;
use crate::{Args, Container, DiError, Instance, Param, Params, Properties, Result, Signature, Value};
use std::fmt;
use std::sync::Arc;

/// Factory closure receiving `(container, params, config)`
pub type FactoryFn =
    Arc<dyn Fn(&Container, &Params, &Properties) -> Result<Instance> + Send + Sync>;

/// A described closure or free function
pub struct Function {
    name: String,
    signature: Signature,
    body: StaticFn,
}

impl Function {
    /// Describe a function known under `name`
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(Args) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature: Signature::new(),
            body: Arc::new(body),
        }
    }

    /// Describe an anonymous closure
    pub fn closure<F>(body: F) -> Self
    where
        F: Fn(Args) -> Result<Value> + Send + Sync + 'static,
    {
        Self::new("{closure}", body)
    }

    /// Append a parameter
    pub fn param(mut self, param: Param) -> Self {
        self.signature = self.signature.param(param);
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("params", &self.signature.len())
            .finish()
    }
}

/// Anything `Container::invoke` can call
#[derive(Clone)]
pub enum Callable {
    /// A closure or free function carrying its own signature
    Function(Arc<Function>),
    /// `[object, method]`
    Method(Instance, String),
    /// `[class, staticMethod]`
    Static(String, String),
    /// A globally defined function, or `"Class::method"`
    Named(String),
    /// A raw factory, called with `(container, params, config)`
    Factory(FactoryFn),
}

impl Callable {
    pub fn function(function: Function) -> Self {
        Callable::Function(Arc::new(function))
    }

    pub fn method(instance: Instance, method: impl Into<String>) -> Self {
        Callable::Method(instance, method.into())
    }

    pub fn static_method(class: impl Into<String>, method: impl Into<String>) -> Self {
        Callable::Static(class.into(), method.into())
    }

    pub fn named(name: impl Into<String>) -> Self {
        Callable::Named(name.into())
    }

    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(&Container, &Params, &Properties) -> Result<Instance> + Send + Sync + 'static,
    {
        Callable::Factory(Arc::new(factory))
    }

    /// Name used in diagnostics
    pub fn display_name(&self) -> String {
        match self {
            Callable::Function(function) => function.name().to_string(),
            Callable::Method(instance, method) => format!("{}::{method}()", instance.class_name()),
            Callable::Static(class, method) => format!("{class}::{method}()"),
            Callable::Named(name) => name.clone(),
            Callable::Factory(_) => "{factory}".to_string(),
        }
    }

    /// Whether both values are the same callable
    pub fn ptr_eq(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Function(a), Callable::Function(b)) => Arc::ptr_eq(a, b),
            (Callable::Method(a, m), Callable::Method(b, n)) => a.ptr_eq(b) && m == n,
            (Callable::Static(a, m), Callable::Static(b, n)) => a == b && m == n,
            (Callable::Named(a), Callable::Named(b)) => a == b,
            (Callable::Factory(a), Callable::Factory(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }

    /// Look up the signature and body behind this callable
    pub(crate) fn prepare(&self, registry: &Registry) -> Result<Prepared> {
        match self {
            Callable::Function(function) => Ok(Prepared::Body {
                target: function.name.clone(),
                signature: function.signature.clone(),
                body: Arc::clone(&function.body),
            }),
            Callable::Method(instance, name) => {
                let instance = registry.enrich(instance.clone());
                let (signature, body) = instance
                    .class()
                    .method(name)
                    .map(|method| (method.signature.clone(), Arc::clone(&method.body)))
                    .ok_or_else(|| DiError::UnknownCallable {
                        name: self.display_name(),
                    })?;
                Ok(Prepared::Method {
                    target: self.display_name(),
                    signature,
                    body,
                    receiver: instance,
                })
            }
            Callable::Static(class, name) => {
                let method = registry
                    .class(class)
                    .and_then(|info| info.static_method(name).cloned())
                    .ok_or_else(|| DiError::UnknownCallable {
                        name: self.display_name(),
                    })?;
                Ok(Prepared::Body {
                    target: self.display_name(),
                    signature: method.signature,
                    body: method.body,
                })
            }
            Callable::Named(name) => {
                if let Some(function) = registry.function(name) {
                    return Callable::Function(function).prepare(registry);
                }
                match name.split_once("::") {
                    Some((class, method)) => {
                        Callable::static_method(class, method).prepare(registry)
                    }
                    None => Err(DiError::UnknownCallable { name: name.clone() }),
                }
            }
            Callable::Factory(factory) => Ok(Prepared::Factory(Arc::clone(factory))),
        }
    }
}

impl From<Function> for Callable {
    fn from(function: Function) -> Self {
        Callable::function(function)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self.display_name())
    }
}

/// A callable with its signature looked up
pub(crate) enum Prepared {
    Body {
        target: String,
        signature: Signature,
        body: StaticFn,
    },
    Method {
        target: String,
        signature: Signature,
        body: MethodFn,
        receiver: Instance,
    },
    Factory(FactoryFn),
}

impl Prepared {
    pub(crate) fn target(&self) -> &str {
        match self {
            Prepared::Body { target, .. } | Prepared::Method { target, .. } => target,
            Prepared::Factory(_) => "{factory}",
        }
    }
}
