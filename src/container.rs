//! Dependency injection container with autowiring
//!
//! The `Container` maps identifiers to definitions, builds object graphs on
//! request (caching singletons), and invokes callables with resolved
//! arguments.

use crate::callable::Prepared;
use crate::definition::Registered;
use crate::guard::ResolutionGuard;
use crate::params::Key;
use crate::registry::Registry;
use crate::resolver::{Mode, Resolver};
use crate::storage::DefinitionStore;
use crate::{
    Args, Autowired, Callable, Class, Definition, DiError, Function, Injectable, Instance,
    Interface, Lifetime, Params, Properties, Result, Value,
};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Named services consulted while resolving `invoke` arguments.
///
/// A class-typed parameter with no container binding may be satisfied by
/// the service registered under the parameter's name, when that service is
/// an instance of the declared type. Container bindings always win.
pub trait ServiceLocator: Send + Sync {
    fn locate(&self, name: &str) -> Option<Instance>;
}

struct Inner {
    registry: Registry,
    store: DefinitionStore,
    resolve_arrays: bool,
    locator: Option<Arc<dyn ServiceLocator>>,
}

/// Dependency injection container.
///
/// Cloning is cheap: clones share definitions, descriptions and cached
/// singletons.
///
/// # Examples
///
/// ```rust
/// use autowire::{Class, Container, Param, Properties, Value};
///
/// struct Mailer {
///     host: String,
///     port: i64,
/// }
///
/// let container = Container::new();
/// container.describe(
///     Class::<Mailer>::new("Mailer")
///         .param(Param::new("host").typed("string"))
///         .param(Param::new("port").typed("int").default(25))
///         .property("port", |m: &mut Mailer, v| {
///             m.port = v.as_int().unwrap_or(m.port);
///             Ok(())
///         })
///         .construct(|args| Ok(Mailer { host: args.take(0)?, port: args.take(1)? })),
/// );
/// container
///     .set_singleton("mailer", Value::map([("class", Value::from("Mailer")), ("port", Value::from(587))]))
///     .unwrap();
///
/// let mailer = container
///     .get_with("mailer", autowire::params!["host" => "smtp.local"], Properties::new())
///     .unwrap();
/// let mailer = mailer.downcast::<Mailer>().unwrap();
/// assert_eq!(mailer.host, "smtp.local");
/// assert_eq!(mailer.port, 587);
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Container {
    /// Create an empty container with default settings.
    #[inline]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a container with pre-allocated capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::builder().with_capacity(capacity).build()
    }

    /// Configure a container before creating it.
    #[inline]
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::default()
    }

    // =========================================================================
    // Descriptions
    // =========================================================================

    /// Describe how to construct a class.
    pub fn describe<T: Injectable>(&self, class: Class<T>) {
        #[cfg(feature = "logging")]
        debug!(
            target: "autowire",
            class = class.name(),
            rust_type = std::any::type_name::<T>(),
            "Describing class"
        );

        self.inner.registry.describe(class.into_info());
    }

    /// Describe an interface or abstract identifier.
    pub fn describe_interface(&self, interface: Interface) {
        #[cfg(feature = "logging")]
        debug!(target: "autowire", interface = interface.name(), "Describing interface");

        self.inner.registry.describe(interface.into_info());
    }

    /// Describe a type that knows its own constructor.
    #[inline]
    pub fn autowire<T: Autowired>(&self) {
        self.describe(T::describe());
    }

    /// Make a function invocable by name.
    pub fn define_function(&self, name: impl Into<String>, function: Function) {
        let name = name.into();

        #[cfg(feature = "logging")]
        debug!(target: "autowire", function = %name, "Defining function");

        self.inner.registry.define_function(name, function);
    }

    /// Wrap a value, attaching the description registered for its type.
    pub fn instance<T: Injectable>(&self, value: T) -> Instance {
        self.inner.registry.enrich(Instance::new(value))
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a transient definition.
    ///
    /// Accepted shapes: a class name, a config map (`class`/`__class`,
    /// `arguments`/`__construct()`, `properties`, `$name` or bare property
    /// keys), a callable, a built object, a [`crate::Reference`], or null to
    /// build the identifier itself.
    #[inline]
    pub fn set(&self, id: impl Into<String>, definition: impl Into<Value>) -> Result<()> {
        self.set_with_params(id, definition, Params::new())
    }

    /// Register a transient definition with constructor params.
    pub fn set_with_params(
        &self,
        id: impl Into<String>,
        definition: impl Into<Value>,
        params: Params,
    ) -> Result<()> {
        self.register(id.into(), definition.into(), params, Lifetime::Transient)
    }

    /// Register a singleton definition.
    #[inline]
    pub fn set_singleton(&self, id: impl Into<String>, definition: impl Into<Value>) -> Result<()> {
        self.set_singleton_with_params(id, definition, Params::new())
    }

    /// Register a singleton definition with constructor params.
    pub fn set_singleton_with_params(
        &self,
        id: impl Into<String>,
        definition: impl Into<Value>,
        params: Params,
    ) -> Result<()> {
        self.register(id.into(), definition.into(), params, Lifetime::Singleton)
    }

    /// Register an already normalized definition.
    pub fn define(
        &self,
        id: impl Into<String>,
        definition: Definition,
        lifetime: Lifetime,
    ) -> Result<()> {
        self.store(id.into(), definition, Params::new(), lifetime)
    }

    /// Register many transient definitions.
    ///
    /// A two-element list value is read as `[definition, params]`. An empty
    /// collection changes nothing.
    pub fn set_definitions<I, K, V>(&self, definitions: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (id, definition) in definitions {
            self.register_entry(id.into(), definition.into(), Lifetime::Transient)?;
        }
        Ok(())
    }

    /// Register many singleton definitions; see [`Container::set_definitions`].
    pub fn set_singletons<I, K, V>(&self, definitions: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (id, definition) in definitions {
            self.register_entry(id.into(), definition.into(), Lifetime::Singleton)?;
        }
        Ok(())
    }

    fn register_entry(&self, id: String, value: Value, lifetime: Lifetime) -> Result<()> {
        match value {
            Value::List(items) if items.len() == 2 => {
                let mut items = items.into_iter();
                let definition = items.next().unwrap_or_default();
                let params = Params::from_value(items.next().unwrap_or_default())?;
                self.register(id, definition, params, lifetime)
            }
            value => self.register(id, value, Params::new(), lifetime),
        }
    }

    fn register(&self, id: String, value: Value, params: Params, lifetime: Lifetime) -> Result<()> {
        let definition = Definition::from_value(&id, value, &self.inner.registry)?;
        self.store(id, definition, params, lifetime)
    }

    fn store(
        &self,
        id: String,
        definition: Definition,
        params: Params,
        lifetime: Lifetime,
    ) -> Result<()> {
        let entry = Registered::new(definition, params)?;

        #[cfg(feature = "logging")]
        debug!(
            target: "autowire",
            id = %id,
            kind = entry.definition.kind(),
            lifetime = %lifetime,
            definition_count = self.inner.store.len() + 1,
            "Registering definition"
        );

        match lifetime {
            Lifetime::Singleton => self.inner.store.set_singleton(id, entry),
            Lifetime::Transient => self.inner.store.set(id, entry),
        }
        Ok(())
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Build or fetch the instance for an identifier.
    ///
    /// A [`crate::Reference`] may be passed in place of a plain identifier.
    #[inline]
    pub fn get(&self, id: impl AsRef<str>) -> Result<Instance> {
        self.resolve(id.as_ref(), &Params::new(), Params::new(), Properties::new())
    }

    /// Build or fetch an instance with constructor params and property overrides.
    ///
    /// `params` target the constructor's own parameters only. `config` wins
    /// over properties set at registration. A cached singleton is returned
    /// as is.
    pub fn get_with(
        &self,
        id: impl AsRef<str>,
        params: Params,
        config: Properties,
    ) -> Result<Instance> {
        self.resolve(id.as_ref(), &params, Params::new(), config)
    }

    /// Build or fetch an instance as its concrete Rust type.
    pub fn get_as<T: Injectable>(&self, id: impl AsRef<str>) -> Result<Arc<T>> {
        let id = id.as_ref();
        let instance = self.get(id)?;
        instance.downcast::<T>().ok_or_else(|| DiError::Downcast {
            id: id.to_string(),
            class: instance.class_name().to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    fn resolve(
        &self,
        id: &str,
        supplied: &Params,
        predefined: Params,
        config: Properties,
    ) -> Result<Instance> {
        if let Some(instance) = self.inner.store.cached(id) {
            #[cfg(feature = "logging")]
            trace!(target: "autowire", id, "Singleton cache hit");

            return Ok(instance);
        }

        let _guard = ResolutionGuard::enter(self.key(), id)?;

        let instance = match self.inner.store.lookup(id) {
            Some(entry) => self.from_entry(id, &entry, supplied, predefined, config)?,
            None => {
                #[cfg(feature = "logging")]
                trace!(target: "autowire", id, "No definition, autowiring");

                self.build(id, supplied, &predefined, &config)?
            }
        };

        if self.inner.store.is_singleton(id) {
            #[cfg(feature = "logging")]
            debug!(target: "autowire", id, class = instance.class_name(), "Caching singleton");

            Ok(self.inner.store.cache(id, instance))
        } else {
            Ok(instance)
        }
    }

    fn from_entry(
        &self,
        id: &str,
        entry: &Registered,
        supplied: &Params,
        predefined: Params,
        config: Properties,
    ) -> Result<Instance> {
        match &entry.definition {
            Definition::Class {
                class, properties, ..
            } => {
                let predefined = predefined.overlay(entry.predefined())?;
                let config = config.overlay(properties);
                if class == id {
                    self.build(id, supplied, &predefined, &config)
                } else {
                    self.resolve(class, supplied, predefined, config)
                }
            }
            Definition::Alias(reference) => {
                let predefined = predefined.overlay(entry.predefined())?;
                self.resolve(reference.id(), supplied, predefined, config)
            }
            Definition::Object(instance) => {
                supplied.style()?;
                Ok(instance.clone())
            }
            Definition::Factory(callable) => {
                let predefined = predefined.overlay(entry.predefined())?;
                self.produce(id, callable, supplied, &predefined, &config)
            }
        }
    }

    /// Autowire a described class
    fn build(
        &self,
        id: &str,
        supplied: &Params,
        predefined: &Params,
        config: &Properties,
    ) -> Result<Instance> {
        let info = self.inner.registry.class(id).ok_or_else(|| {
            DiError::not_instantiable(
                id,
                "no definition is registered and no class is described under this identifier",
            )
        })?;
        if !info.is_instantiable() {
            return Err(DiError::not_instantiable(
                id,
                "an interface or abstract type cannot be built without a binding",
            ));
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "autowire",
            id,
            params = info.signature().len(),
            depth = ResolutionGuard::depth(),
            "Building instance"
        );

        let args = Resolver::new(self, id, Mode::Construct).resolve(
            info.signature(),
            supplied,
            predefined,
        )?;
        let value = info.construct(args)?;
        let mut instance = Instance::with_class(value, Arc::clone(&info));
        self.configure(&mut instance, config)?;
        Ok(instance)
    }

    /// Run a factory definition
    fn produce(
        &self,
        id: &str,
        callable: &Callable,
        supplied: &Params,
        predefined: &Params,
        config: &Properties,
    ) -> Result<Instance> {
        match callable.prepare(&self.inner.registry)? {
            Prepared::Factory(factory) => {
                let params = self.resolve_params(&supplied.overlay(predefined)?)?;
                let config = self.resolve_properties(config)?;
                factory(self, &params, &config).map(|instance| self.inner.registry.enrich(instance))
            }
            prepared => {
                let target = prepared.target().to_string();
                match self.call(prepared, Mode::Construct, supplied, predefined)? {
                    Value::Object(instance) => {
                        let mut instance = self.inner.registry.enrich(instance);
                        self.configure(&mut instance, config)?;
                        Ok(instance)
                    }
                    other => Err(DiError::creation_failed(
                        id,
                        format!("{target} returned {} instead of an object", other.type_name()),
                    )),
                }
            }
        }
    }

    /// Apply property overrides in order
    fn configure(&self, instance: &mut Instance, config: &Properties) -> Result<()> {
        for (name, value) in config.iter() {
            let value = self.resolve_value(value)?;
            instance.set_property(name, value)?;
        }
        Ok(())
    }

    // =========================================================================
    // Invocation
    // =========================================================================

    /// Call a callable with its parameters resolved.
    ///
    /// Class-typed parameters without a supplied value are resolved through
    /// the container, then through the [`ServiceLocator`] if one is set.
    pub fn invoke(&self, callable: &Callable, params: Params) -> Result<Value> {
        #[cfg(feature = "logging")]
        debug!(
            target: "autowire",
            callable = %callable.display_name(),
            supplied = params.len(),
            "Invoking callable"
        );

        let prepared = callable.prepare(&self.inner.registry)?;
        self.call(prepared, Mode::Invoke, &params, &Params::new())
    }

    /// Resolve a callable's arguments without calling it.
    pub fn resolve_callable_dependencies(&self, callable: &Callable, params: Params) -> Result<Args> {
        match callable.prepare(&self.inner.registry)? {
            Prepared::Body {
                target, signature, ..
            }
            | Prepared::Method {
                target, signature, ..
            } => Resolver::new(self, &target, Mode::Invoke).resolve(&signature, &params, &Params::new()),
            Prepared::Factory(_) => {
                let params = self.resolve_params(&params)?;
                params.style()?;
                let entries = params.iter().map(|(key, value)| {
                    let name = match key {
                        Key::Index(i) => format!("#{i}"),
                        Key::Name(name) => name.clone(),
                    };
                    (name, value.clone())
                });
                Ok(Args::new(callable.display_name(), entries))
            }
        }
    }

    fn call(
        &self,
        prepared: Prepared,
        mode: Mode,
        supplied: &Params,
        predefined: &Params,
    ) -> Result<Value> {
        match prepared {
            Prepared::Body {
                target,
                signature,
                body,
            } => {
                let args = Resolver::new(self, &target, mode).resolve(&signature, supplied, predefined)?;
                body(args)
            }
            Prepared::Method {
                target,
                signature,
                body,
                receiver,
            } => {
                let args = Resolver::new(self, &target, mode).resolve(&signature, supplied, predefined)?;
                body(&receiver, args)
            }
            Prepared::Factory(factory) => {
                let params = self.resolve_params(&supplied.overlay(predefined)?)?;
                factory(self, &params, &Properties::new()).map(Value::Object)
            }
        }
    }

    // =========================================================================
    // References
    // =========================================================================

    /// Resolve references in a value.
    ///
    /// A top-level reference is always resolved; references nested in lists
    /// and maps only when array resolution is enabled.
    pub(crate) fn resolve_value(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Reference(reference) => reference.resolve(self).map(Value::Object),
            Value::List(items) if self.inner.resolve_arrays => items
                .iter()
                .map(|item| self.resolve_value(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            Value::Map(entries) if self.inner.resolve_arrays => entries
                .iter()
                .map(|(key, item)| Ok((key.clone(), self.resolve_value(item)?)))
                .collect::<Result<Vec<_>>>()
                .map(Value::Map),
            other => Ok(other.clone()),
        }
    }

    fn resolve_params(&self, params: &Params) -> Result<Params> {
        params.map_values(|value| self.resolve_value(value))
    }

    fn resolve_properties(&self, config: &Properties) -> Result<Properties> {
        let resolved = config
            .iter()
            .map(|(name, value)| Ok((name.clone(), self.resolve_value(value)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(resolved.into_iter().collect())
    }

    // =========================================================================
    // Queries and Maintenance
    // =========================================================================

    /// Whether a definition (or singleton marker) exists for `id`.
    #[inline]
    pub fn has(&self, id: impl AsRef<str>) -> bool {
        self.inner.store.has(id.as_ref())
    }

    /// Whether `id` is a singleton; with `check_instance`, whether it is also built.
    #[inline]
    pub fn has_singleton(&self, id: impl AsRef<str>, check_instance: bool) -> bool {
        self.inner.store.has_singleton(id.as_ref(), check_instance)
    }

    /// Whether `id` is being built on this thread right now.
    #[inline]
    pub fn is_resolving(&self, id: impl AsRef<str>) -> bool {
        ResolutionGuard::is_active(self.key(), id.as_ref())
    }

    /// Remove the definition and any cached instance of `id`.
    pub fn clear(&self, id: impl AsRef<str>) {
        #[cfg(feature = "logging")]
        debug!(target: "autowire", id = id.as_ref(), "Clearing definition");

        self.inner.store.clear(id.as_ref());
    }

    /// Drop every cached singleton; definitions stay registered.
    pub fn reset(&self) {
        #[cfg(feature = "logging")]
        debug!(target: "autowire", "Resetting singleton instances");

        self.inner.store.reset();
    }

    /// Identifiers with a registered definition, sorted.
    #[inline]
    pub fn definitions(&self) -> Vec<String> {
        self.inner.store.ids()
    }

    /// Number of registered definitions.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    /// Whether references nested in arrays are resolved.
    #[inline]
    pub fn resolves_arrays(&self) -> bool {
        self.inner.resolve_arrays
    }

    #[inline]
    pub(crate) fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    #[inline]
    pub(crate) fn locator(&self) -> Option<&Arc<dyn ServiceLocator>> {
        self.inner.locator.as_ref()
    }

    /// Identity of the shared state, for the cycle guard
    #[inline]
    fn key(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("classes", &self.inner.registry.len())
            .field("store", &self.inner.store)
            .field("resolve_arrays", &self.inner.resolve_arrays)
            .field("locator", &self.inner.locator.is_some())
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Runtime configuration of a [`Container`].
///
/// ```rust
/// use autowire::Container;
///
/// let container = Container::builder()
///     .resolve_arrays(true)
///     .with_capacity(64)
///     .build();
/// assert!(container.resolves_arrays());
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    capacity: usize,
    resolve_arrays: bool,
    locator: Option<Arc<dyn ServiceLocator>>,
}

impl ContainerBuilder {
    /// Resolve references nested inside list and map arguments
    pub fn resolve_arrays(mut self, enabled: bool) -> Self {
        self.resolve_arrays = enabled;
        self
    }

    /// Named services for `invoke`
    pub fn locator(mut self, locator: Arc<dyn ServiceLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Expected number of definitions
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn build(self) -> Container {
        #[cfg(feature = "logging")]
        debug!(
            target: "autowire",
            capacity = self.capacity,
            resolve_arrays = self.resolve_arrays,
            locator = self.locator.is_some(),
            "Creating container"
        );

        Container {
            inner: Arc::new(Inner {
                registry: Registry::new(),
                store: DefinitionStore::with_capacity(self.capacity),
                resolve_arrays: self.resolve_arrays,
                locator: self.locator,
            }),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{params, ErrorKind, Param, Reference, Signature};
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait QuxInterface: Send + Sync {
        fn a(&self) -> i64;
    }

    struct Qux {
        a: i64,
    }

    impl QuxInterface for Qux {
        fn a(&self) -> i64 {
            self.a
        }
    }

    struct Bar {
        qux: Arc<dyn QuxInterface>,
    }

    struct MaybeBar {
        qux: Option<Arc<dyn QuxInterface>>,
    }

    struct Counter {
        value: i64,
    }

    fn qux_class() -> Class<Qux> {
        Class::<Qux>::new("Qux")
            .implements::<dyn QuxInterface>("QuxInterface", |q| q as Arc<dyn QuxInterface>)
            .property("a", |q: &mut Qux, v| {
                q.a = v.as_int().ok_or_else(|| DiError::invalid_config("a must be an int"))?;
                Ok(())
            })
            .static_method(
                "create",
                Signature::new().param(Param::new("a").typed("int")),
                |args| Ok(Value::from(Instance::new(Qux { a: args.take(0)? }))),
            )
            .construct(|_| Ok(Qux { a: 1 }))
    }

    fn container() -> Container {
        let container = Container::new();
        container.describe_interface(Interface::new("QuxInterface"));
        container.describe(qux_class());
        container.describe(
            Class::<Bar>::new("Bar")
                .param(Param::new("qux").typed("QuxInterface"))
                .construct(|args| Ok(Bar { qux: args.interface::<dyn QuxInterface>(0)? })),
        );
        container.describe(
            Class::<MaybeBar>::new("MaybeBar")
                .param(Param::new("qux").typed("?QuxInterface"))
                .construct(|args| {
                    Ok(MaybeBar {
                        qux: args.optional_interface::<dyn QuxInterface>(0)?,
                    })
                }),
        );
        container.describe(
            Class::<Counter>::new("Counter")
                .property("value", |c: &mut Counter, v| {
                    c.value = v.as_int().unwrap_or(c.value);
                    Ok(())
                })
                .construct(|_| Ok(Counter { value: 1 })),
        );
        container
    }

    fn a_greater_than_b() -> Callable {
        Callable::function(
            Function::closure(|args| Ok(Value::Bool(args.take::<i64>(0)? > args.take::<i64>(1)?)))
                .param(Param::new("a"))
                .param(Param::new("b"))
                .param(Param::new("x").default(5)),
        )
    }

    #[test]
    fn test_unbound_interface_is_not_instantiable() {
        let container = container();
        let err = container.get("Bar").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInstantiable);
    }

    #[test]
    fn test_interface_binding() {
        let container = container();
        container.set("QuxInterface", "Qux").unwrap();

        let bar = container.get_as::<Bar>("Bar").unwrap();
        assert_eq!(bar.qux.a(), 1);
    }

    #[test]
    fn test_singleton_alias_with_property_override() {
        let container = container();
        container
            .set_singletons([
                ("qux", Value::from("Qux")),
                ("Qux", Value::map([("a", 42)])),
            ])
            .unwrap();

        let qux = container.get_as::<Qux>("qux").unwrap();
        assert_eq!(qux.a, 42);
        assert!(container.get("qux").unwrap().ptr_eq(&container.get("Qux").unwrap()));
    }

    #[test]
    fn test_named_arguments_bind_by_name() {
        let container = container();
        let gt = a_greater_than_b();

        let result = container.invoke(&gt, params!["b" => 5, "a" => 1]).unwrap();
        assert_eq!(result, Value::Bool(false));
        let result = container.invoke(&gt, params!["b" => 1, "a" => 5]).unwrap();
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn test_variadic_only_callable_gets_empty_list() {
        let container = container();
        let count = Callable::function(
            Function::closure(|args| Ok(Value::Int(args.variadic(0).len() as i64)))
                .param(Param::new("numbers").typed("int").variadic()),
        );

        assert_eq!(container.invoke(&count, Params::new()).unwrap(), Value::Int(0));
        assert_eq!(container.invoke(&count, params![1, 2, 3]).unwrap(), Value::Int(3));

        let err = container.invoke(&count, params![1, "two"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvocationType);
    }

    #[test]
    fn test_variadic_collects_remaining_positionals() {
        let container = container();
        let join = Callable::function(
            Function::closure(|args| {
                let head: String = args.take(0)?;
                let rest: Vec<String> = args
                    .variadic(1)
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                Ok(Value::from(format!("{head}:{}", rest.join(","))))
            })
            .param(Param::new("head").typed("string"))
            .param(Param::new("rest").typed("string").variadic()),
        );

        let result = container.invoke(&join, params!["a", "b", "c"]).unwrap();
        assert_eq!(result, Value::from("a:b,c"));
    }

    #[test]
    fn test_variadic_collects_unmatched_names() {
        let container = container();
        let sum = Callable::function(
            Function::closure(|args| {
                let head: i64 = args.take(0)?;
                let rest: i64 = args.variadic(1).iter().filter_map(Value::as_int).sum();
                Ok(Value::Int(head * 100 + rest))
            })
            .param(Param::new("a").typed("int"))
            .param(Param::new("rest").typed("int").variadic()),
        );

        let result = container
            .invoke(&sum, params!["a" => 1, "x" => 2, "y" => 3])
            .unwrap();
        assert_eq!(result, Value::Int(105));

        let err = container
            .invoke(&sum, params!["a" => 1, "x" => "two"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvocationType);
    }

    #[test]
    fn test_singleton_identity_and_transient_freshness() {
        let container = container();
        container.set_singleton("shared", "Counter").unwrap();
        container.set("fresh", "Counter").unwrap();

        let a = container.get("shared").unwrap();
        assert!(a.ptr_eq(&container.get("shared").unwrap()));

        let b = container.get("fresh").unwrap();
        assert!(!b.ptr_eq(&container.get("fresh").unwrap()));

        let c = container.get("Counter").unwrap();
        assert!(!c.ptr_eq(&container.get("Counter").unwrap()));
    }

    #[test]
    fn test_alias_chain_shares_singleton() {
        let container = container();
        container.set_singleton("Qux", Value::Null).unwrap();
        container.set_singleton("a", Reference::to("Qux")).unwrap();
        container.set("c", Reference::to("a")).unwrap();

        let b = container.get("Qux").unwrap();
        assert!(container.get("a").unwrap().ptr_eq(&b));
        assert!(container.get("c").unwrap().ptr_eq(&b));
        assert!(container.get(Reference::to("c")).unwrap().ptr_eq(&b));
    }

    #[test]
    fn test_mixed_params_rejected_before_construction() {
        static BUILT: AtomicUsize = AtomicUsize::new(0);
        struct Probe;

        let container = Container::new();
        container.describe(
            Class::<Probe>::new("Probe")
                .param(Param::new("a").default(1))
                .param(Param::new("b").default(2))
                .construct(|_| {
                    BUILT.fetch_add(1, Ordering::SeqCst);
                    Ok(Probe)
                }),
        );

        let mixed = Params::new().push(1).named("b", 2);
        let err = container.get_with("Probe", mixed.clone(), Properties::new()).unwrap_err();
        assert!(err.is_configuration());

        let err = container.invoke(&a_greater_than_b(), mixed).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(BUILT.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_circular_dependency() {
        struct X;
        struct Y;

        let container = Container::new();
        container.describe(
            Class::<X>::new("X")
                .param(Param::new("y").typed("Y"))
                .construct(|_| Ok(X)),
        );
        container.describe(
            Class::<Y>::new("Y")
                .param(Param::new("x").typed("X"))
                .construct(|_| Ok(Y)),
        );

        match container.get("X").unwrap_err() {
            DiError::CircularDependency { id, chain } => {
                assert_eq!(id, "X");
                assert_eq!(chain, vec!["X", "Y", "X"]);
            }
            other => panic!("expected a cycle, got {other}"),
        }
        assert!(!container.is_resolving("X"));
    }

    #[test]
    fn test_circular_definitions() {
        let container = Container::new();
        container.set("x", Reference::to("y")).unwrap();
        container.set("y", Reference::to("x")).unwrap();

        let err = container.get("x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInstantiable);
    }

    #[test]
    fn test_nullable_short_circuit() {
        let container = container();
        let maybe = container.get_as::<MaybeBar>("MaybeBar").unwrap();
        assert!(maybe.qux.is_none());

        container.set("QuxInterface", "Qux").unwrap();
        let maybe = container.get_as::<MaybeBar>("MaybeBar").unwrap();
        assert_eq!(maybe.qux.as_ref().map(|q| q.a()), Some(1));
    }

    #[test]
    fn test_zero_config_defaults() {
        let container = container();
        let first = container.get_as::<Counter>("Counter").unwrap();
        let second = container.get_as::<Counter>("Counter").unwrap();
        assert_eq!(first.value, 1);
        assert_eq!(second.value, 1);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_config_overrides_registration_properties() {
        let container = container();
        container
            .set("Counter", Value::map([("value", 10)]))
            .unwrap();

        let counter = container.get_as::<Counter>("Counter").unwrap();
        assert_eq!(counter.value, 10);

        let counter = container
            .get_with("Counter", Params::new(), Properties::new().set("value", 20))
            .unwrap();
        assert_eq!(counter.downcast::<Counter>().unwrap().value, 20);
    }

    #[test]
    fn test_unknown_property_is_configuration_error() {
        let container = container();
        let err = container
            .get_with("Counter", Params::new(), Properties::new().set("missing", 1))
            .unwrap_err();
        assert!(matches!(err, DiError::UnknownProperty { .. }));
    }

    #[test]
    fn test_undescribed_identifier() {
        let container = Container::new();
        assert!(container.get("Nope").unwrap_err().is_not_instantiable());
    }

    #[test]
    fn test_object_definition() {
        let container = container();
        let qux = container.instance(Qux { a: 7 });
        container.set("qux", qux.clone()).unwrap();

        assert!(container.get("qux").unwrap().ptr_eq(&qux));
        assert_eq!(container.get_as::<Qux>("qux").unwrap().a, 7);
        assert!(qux.class().is_a("QuxInterface"));

        let err = container
            .get_with("qux", Params::new().push(1).named("a", 2), Properties::new())
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_supplied_and_predefined_styles_must_match() {
        let container = container();
        container.set_with_params("bar", "Bar", params![Reference::to("Qux")]).unwrap();
        container
            .set_with_params(
                "made",
                Callable::factory(|_c: &Container, _p: &Params, _cfg: &Properties| {
                    Ok(Instance::new(Qux { a: 0 }))
                }),
                params![1],
            )
            .unwrap();

        for id in ["bar", "made"] {
            let err = container
                .get_with(id, params!["qux" => Reference::to("Qux")], Properties::new())
                .unwrap_err();
            assert!(err.is_configuration(), "{id}: {err}");
        }

        // Same style overlays the predefined value
        let bar = container
            .get_with("bar", params![container.instance(Qux { a: 3 })], Properties::new())
            .unwrap();
        assert_eq!(bar.downcast::<Bar>().unwrap().qux.a(), 3);
    }

    #[test]
    fn test_supplied_params_stay_at_top_level() {
        struct Engine {
            power: i64,
        }
        struct Car {
            engine: Arc<Engine>,
            power: i64,
        }

        let container = Container::new();
        container.describe(
            Class::<Engine>::new("Engine")
                .param(Param::new("power").typed("int").default(100))
                .construct(|args| Ok(Engine { power: args.take(0)? })),
        );
        container.describe(
            Class::<Car>::new("Car")
                .param(Param::new("engine").typed("Engine"))
                .param(Param::new("power").typed("int").default(1))
                .construct(|args| {
                    Ok(Car {
                        engine: args.object(0)?,
                        power: args.take(1)?,
                    })
                }),
        );

        let car = container
            .get_with("Car", params!["power" => 250], Properties::new())
            .unwrap()
            .downcast::<Car>()
            .unwrap();
        assert_eq!(car.power, 250);
        assert_eq!(car.engine.power, 100);
    }

    #[test]
    fn test_property_on_shared_instance_fails_creation() {
        let container = container();
        let shared = container.instance(Qux { a: 1 });
        let held = shared.clone();
        container
            .set(
                "shared",
                Callable::function(Function::closure(move |_| Ok(Value::Object(held.clone())))),
            )
            .unwrap();

        assert!(container.get("shared").unwrap().ptr_eq(&shared));
        let err = container
            .get_with("shared", Params::new(), Properties::new().set("a", 5))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Creation);
    }

    #[test]
    fn test_factory_receives_params_and_config() {
        let container = container();
        container
            .set_with_params(
                "made",
                Callable::factory(|_c: &Container, params: &Params, config: &Properties| {
                    let a = params.by_index(0).and_then(Value::as_int).unwrap_or(0);
                    let bonus = config.get("bonus").and_then(Value::as_int).unwrap_or(0);
                    Ok(Instance::new(Qux { a: a + bonus }))
                }),
                params![40],
            )
            .unwrap();

        let made = container
            .get_with("made", Params::new(), Properties::new().set("bonus", 2))
            .unwrap();
        assert_eq!(made.downcast::<Qux>().unwrap().a, 42);
        assert_eq!(made.class_name(), "Qux");
    }

    #[test]
    fn test_static_method_factory() {
        let container = container();
        container
            .set_with_params("made", Callable::named("Qux::create"), params![9])
            .unwrap();
        assert_eq!(container.get_as::<Qux>("made").unwrap().a, 9);

        container
            .set("bad", Callable::static_method("Qux", "missing"))
            .unwrap();
        assert!(matches!(
            container.get("bad").unwrap_err(),
            DiError::UnknownCallable { .. }
        ));
    }

    #[test]
    fn test_predefined_reference_arguments() {
        let container = container();
        container
            .set(
                "bar",
                Value::map([
                    ("class", Value::from("Bar")),
                    ("arguments", Value::list([Reference::to("Qux")])),
                ]),
            )
            .unwrap();

        let bar = container.get_as::<Bar>("bar").unwrap();
        assert_eq!(bar.qux.a(), 1);
    }

    #[test]
    fn test_supplied_object_must_satisfy_type() {
        let container = container();
        let counter = container.instance(Counter { value: 1 });
        let err = container
            .get_with("Bar", params![counter], Properties::new())
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_scalar_mismatch_is_invocation_type() {
        struct Port;
        let container = Container::new();
        container.describe(
            Class::<Port>::new("Port")
                .param(Param::new("port").typed("int"))
                .construct(|_| Ok(Port)),
        );

        let err = container
            .get_with("Port", params!["port" => "eighty"], Properties::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvocationType);

        let err = container.get("Port").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvocationType);
    }

    #[test]
    fn test_untyped_required_parameter_is_missing() {
        let container = Container::new();
        let f = Callable::function(Function::closure(|_| Ok(Value::Null)).param(Param::new("x")));
        let err = container.invoke(&f, Params::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingDependency);
    }

    #[test]
    fn test_unknown_named_parameter() {
        let container = Container::new();
        let err = container
            .invoke(&a_greater_than_b(), params!["a" => 1, "b" => 2, "zzz" => 3])
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_defective_signature() {
        struct Broken;
        let container = Container::new();
        container.describe(
            Class::<Broken>::new("Broken")
                .param(Param::new("rest").variadic())
                .param(Param::new("tail"))
                .construct(|_| Ok(Broken)),
        );
        assert!(container.get("Broken").unwrap_err().is_not_instantiable());
    }

    #[test]
    fn test_union_uses_first_binding() {
        let container = container();
        let f = Callable::function(
            Function::closure(|args| Ok(Value::Bool(args.get(0).is_some_and(|v| !v.is_null()))))
                .param(Param::new("dep").typed("Missing|QuxInterface")),
        );

        let err = container.invoke(&f, Params::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvocationType);

        container.set("QuxInterface", "Qux").unwrap();
        assert_eq!(container.invoke(&f, Params::new()).unwrap(), Value::Bool(true));

        let nullable = Callable::function(
            Function::closure(|args| Ok(Value::Bool(args.get(0).is_some_and(Value::is_null))))
                .param(Param::new("dep").typed("Missing|Other|null")),
        );
        assert_eq!(container.invoke(&nullable, Params::new()).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_intersection_requires_every_member() {
        struct Both;
        struct OnlyOne;

        let container = Container::new();
        container.describe(
            Class::<Both>::new("Both")
                .extends("Countable")
                .extends("Iterable")
                .construct(|_| Ok(Both)),
        );
        container.describe(
            Class::<OnlyOne>::new("OnlyOne")
                .extends("Countable")
                .construct(|_| Ok(OnlyOne)),
        );
        let f = Callable::function(
            Function::closure(|args| Ok(Value::from(args.instance(0)?.class_name())))
                .param(Param::new("items").typed("Countable&Iterable")),
        );

        container.set("Countable", "OnlyOne").unwrap();
        assert_eq!(
            container.invoke(&f, Params::new()).unwrap_err().kind(),
            ErrorKind::InvocationType
        );

        container.set("Iterable", "Both").unwrap();
        assert_eq!(container.invoke(&f, Params::new()).unwrap(), Value::from("Both"));

        container.set("Countable&Iterable", "Both").unwrap();
        assert_eq!(container.invoke(&f, Params::new()).unwrap(), Value::from("Both"));
    }

    struct Services {
        qux: Instance,
    }

    impl ServiceLocator for Services {
        fn locate(&self, name: &str) -> Option<Instance> {
            (name == "qux").then(|| self.qux.clone())
        }
    }

    #[test]
    fn test_locator_is_fallback_during_invoke() {
        let located = Instance::new(Qux { a: 99 });
        let container = Container::builder()
            .locator(Arc::new(Services {
                qux: located.clone(),
            }))
            .build();
        container.describe_interface(Interface::new("QuxInterface"));
        container.describe(qux_class());

        let f = Callable::function(
            Function::closure(|args| Ok(Value::Int(args.interface::<dyn QuxInterface>(0)?.a())))
                .param(Param::new("qux").typed("QuxInterface")),
        );
        assert_eq!(container.invoke(&f, Params::new()).unwrap(), Value::Int(99));

        // Construction does not consult the locator
        container.describe(
            Class::<Bar>::new("Bar")
                .param(Param::new("qux").typed("QuxInterface"))
                .construct(|args| Ok(Bar { qux: args.interface::<dyn QuxInterface>(0)? })),
        );
        assert!(container.get("Bar").unwrap_err().is_not_instantiable());

        // A container binding takes precedence
        container.set("QuxInterface", "Qux").unwrap();
        assert_eq!(container.invoke(&f, Params::new()).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_invoke_method_and_named_function() {
        let container = container();
        container.describe(
            Class::<Counter>::new("Counter")
                .method(
                    "add",
                    Signature::new().param(Param::new("n").typed("int")),
                    |c: &Counter, args| Ok(Value::Int(c.value + args.take::<i64>(0)?)),
                )
                .construct(|_| Ok(Counter { value: 1 })),
        );
        let counter = container.get("Counter").unwrap();

        let add = Callable::method(counter, "add");
        assert_eq!(container.invoke(&add, params![41]).unwrap(), Value::Int(42));

        // A bare instance picks up the description of its type
        let bare = Callable::method(Instance::new(Counter { value: 2 }), "add");
        assert_eq!(container.invoke(&bare, params![40]).unwrap(), Value::Int(42));

        container.define_function(
            "double",
            Function::new("double", |args| Ok(Value::Int(args.take::<i64>(0)? * 2)))
                .param(Param::new("n").typed("int")),
        );
        let double = Callable::named("double");
        assert_eq!(container.invoke(&double, params!["n" => 21]).unwrap(), Value::Int(42));

        let missing = Callable::named("nowhere");
        assert!(matches!(
            container.invoke(&missing, Params::new()).unwrap_err(),
            DiError::UnknownCallable { .. }
        ));
    }

    #[test]
    fn test_resolve_callable_dependencies_without_calling() {
        static CALLED: AtomicUsize = AtomicUsize::new(0);
        let container = container();
        container.set("QuxInterface", "Qux").unwrap();

        let f = Callable::function(
            Function::closure(|_| {
                CALLED.fetch_add(1, Ordering::SeqCst);
                Ok(Value::Null)
            })
            .param(Param::new("qux").typed("QuxInterface"))
            .param(Param::new("limit").typed("int").default(10)),
        );

        let args = container.resolve_callable_dependencies(&f, Params::new()).unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(args.instance(0).unwrap().class_name(), "Qux");
        assert_eq!(args.by_name("limit"), Some(&Value::Int(10)));
        assert_eq!(CALLED.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_array_resolution() {
        struct Bag {
            items: Vec<Value>,
        }

        let describe = |container: &Container| {
            container.describe(qux_class());
            container.describe(
                Class::<Bag>::new("Bag")
                    .param(Param::new("items").typed("array"))
                    .construct(|args| Ok(Bag { items: args.take(0)? })),
            );
            container
                .set_with_params(
                    "Bag",
                    Value::Null,
                    params![Value::list([Value::from(Reference::to("Qux"))])],
                )
                .unwrap();
        };

        let lazy = Container::new();
        describe(&lazy);
        let bag = lazy.get_as::<Bag>("Bag").unwrap();
        assert!(matches!(bag.items[0], Value::Reference(_)));

        let eager = Container::builder().resolve_arrays(true).build();
        describe(&eager);
        let bag = eager.get_as::<Bag>("Bag").unwrap();
        assert_eq!(bag.items[0].as_object().map(Instance::class_name), Some("Qux"));
    }

    #[test]
    fn test_two_element_list_registers_params() {
        let container = container();
        container
            .set_definitions([(
                "made",
                Value::list([Value::from(Callable::named("Qux::create")), Value::list([5])]),
            )])
            .unwrap();
        assert_eq!(container.get_as::<Qux>("made").unwrap().a, 5);
    }

    #[test]
    fn test_empty_batch_keeps_definitions() {
        let container = container();
        container.set("q", "Qux").unwrap();
        container.set_definitions(Vec::<(String, Value)>::new()).unwrap();
        container.set_singletons(Vec::<(String, Value)>::new()).unwrap();
        assert_eq!(container.definitions(), vec!["q".to_string()]);
    }

    #[test]
    fn test_config_map_without_class() {
        let container = container();
        assert!(container.set("unknown", Value::map([("a", 1)])).unwrap_err().is_configuration());
        assert!(container.set("Qux", Value::map([("a", 1)])).is_ok());
    }

    #[test]
    fn test_has_clear_and_reset() {
        let container = container();
        assert!(!container.has("Qux"));

        container.set_singleton("Qux", Value::Null).unwrap();
        assert!(container.has("Qux"));
        assert!(container.has_singleton("Qux", false));
        assert!(!container.has_singleton("Qux", true));

        let first = container.get("Qux").unwrap();
        assert!(container.has_singleton("Qux", true));

        container.reset();
        assert!(container.has_singleton("Qux", false));
        assert!(!first.ptr_eq(&container.get("Qux").unwrap()));

        container.clear("Qux");
        assert!(!container.has("Qux"));
        assert!(container.is_empty());
    }

    #[test]
    fn test_failed_singleton_is_not_cached() {
        static ATTEMPTS: AtomicUsize = AtomicUsize::new(0);
        struct Flaky;

        let container = Container::new();
        container.describe(Class::<Flaky>::new("Flaky").construct(|_| {
            if ATTEMPTS.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(DiError::creation_failed("Flaky", "first attempt fails"))
            } else {
                Ok(Flaky)
            }
        }));
        container.set_singleton("Flaky", Value::Null).unwrap();

        assert_eq!(container.get("Flaky").unwrap_err().kind(), ErrorKind::Creation);
        assert!(!container.has_singleton("Flaky", true));
        assert!(container.get("Flaky").is_ok());
        assert!(container.has_singleton("Flaky", true));
    }

    #[test]
    fn test_get_as_wrong_type() {
        let container = container();
        assert!(matches!(
            container.get_as::<Bar>("Qux"),
            Err(DiError::Downcast { .. })
        ));
    }

    #[test]
    fn test_define_typed_definition() {
        let container = container();
        container
            .define(
                "counter",
                Definition::class("Counter").with_properties(Properties::new().set("value", 3)),
                Lifetime::Singleton,
            )
            .unwrap();
        assert_eq!(container.get_as::<Counter>("counter").unwrap().value, 3);
        assert!(container.has_singleton("counter", true));
    }

    #[test]
    fn test_concurrent_singleton_resolution() {
        use std::thread;

        let container = container();
        container.set_singleton("Qux", Value::Null).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let c = container.clone();
                thread::spawn(move || c.get("Qux").unwrap())
            })
            .collect();
        let instances: Vec<Instance> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let cached = container.get("Qux").unwrap();
        assert!(instances.iter().all(|i| i.ptr_eq(&cached)));
    }
}
