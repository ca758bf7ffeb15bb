//! Registered recipes and the normalization of definition values
//!
//! Every shape accepted at registration time (a class name, a config map in
//! either key dialect, a callable, a built object, a reference) is turned
//! into a [`Definition`] immediately, so resolution only ever matches on the
//! canonical variants.

use crate::registry::Registry;
use crate::{Callable, DiError, Instance, Params, Properties, Reference, Result, Value};

/// Key selecting the class to build
const CLASS_KEY: &str = "class";
const LEGACY_CLASS_KEY: &str = "__class";
/// Key holding constructor arguments
const ARGUMENTS_KEY: &str = "arguments";
const LEGACY_ARGUMENTS_KEY: &str = "__construct()";
/// Key holding an explicit property map
const PROPERTIES_KEY: &str = "properties";

/// How an identifier is turned into an instance
#[derive(Debug, Clone)]
pub enum Definition {
    /// Build `class`, with predefined constructor arguments and property overrides
    Class {
        class: String,
        args: Params,
        properties: Properties,
    },
    /// Call a factory; closures receive `(container, params, config)`
    Factory(Callable),
    /// Hand out the same pre-built object every time
    Object(Instance),
    /// Resolve another identifier instead
    Alias(Reference),
}

impl Definition {
    pub fn class(class: impl Into<String>) -> Self {
        Definition::Class {
            class: class.into(),
            args: Params::new(),
            properties: Properties::new(),
        }
    }

    pub fn factory(callable: impl Into<Callable>) -> Self {
        Definition::Factory(callable.into())
    }

    pub fn object(instance: Instance) -> Self {
        Definition::Object(instance)
    }

    pub fn alias(id: impl Into<String>) -> Self {
        Definition::Alias(Reference::to(id))
    }

    /// Predefined constructor arguments; only meaningful for class definitions
    pub fn with_args(mut self, params: Params) -> Self {
        if let Definition::Class { args, .. } = &mut self {
            *args = params;
        }
        self
    }

    /// Property overrides; only meaningful for class definitions
    pub fn with_properties(mut self, props: Properties) -> Self {
        if let Definition::Class { properties, .. } = &mut self {
            *properties = props;
        }
        self
    }

    /// Short variant name for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Definition::Class { .. } => "class",
            Definition::Factory(_) => "factory",
            Definition::Object(_) => "object",
            Definition::Alias(_) => "alias",
        }
    }

    /// Normalize a definition value registered under `id`
    pub(crate) fn from_value(id: &str, value: Value, registry: &Registry) -> Result<Self> {
        match value {
            Value::Null => Ok(Definition::class(id)),
            Value::Str(class) => Ok(Definition::class(class)),
            Value::Object(instance) => Ok(Definition::Object(instance)),
            Value::Reference(reference) => Ok(Definition::Alias(reference)),
            Value::Callable(callable) => Ok(Definition::Factory(callable)),
            Value::Map(entries) => Self::from_map(id, entries, registry),
            other => Err(DiError::invalid_config(format!(
                "Unsupported definition type for \"{id}\": {}",
                other.type_name()
            ))),
        }
    }

    fn from_map(id: &str, entries: Vec<(String, Value)>, registry: &Registry) -> Result<Self> {
        let mut class = None;
        let mut args = None;
        let mut properties = Properties::new();

        for (key, value) in entries {
            match key.as_str() {
                CLASS_KEY | LEGACY_CLASS_KEY => {
                    if class.is_some() {
                        return Err(duplicate(id, CLASS_KEY, LEGACY_CLASS_KEY));
                    }
                    match value {
                        Value::Str(name) => class = Some(name),
                        other => {
                            return Err(DiError::invalid_config(format!(
                                "The \"{key}\" member of \"{id}\" must be a string, {} given",
                                other.type_name()
                            )));
                        }
                    }
                }
                ARGUMENTS_KEY | LEGACY_ARGUMENTS_KEY => {
                    if args.is_some() {
                        return Err(duplicate(id, ARGUMENTS_KEY, LEGACY_ARGUMENTS_KEY));
                    }
                    args = Some(Params::from_value(value)?);
                }
                PROPERTIES_KEY => match value {
                    Value::Map(props) => {
                        for (name, value) in props {
                            properties.insert(name, value);
                        }
                    }
                    other => {
                        return Err(DiError::invalid_config(format!(
                            "The \"properties\" member of \"{id}\" must be a map, {} given",
                            other.type_name()
                        )));
                    }
                },
                _ => {
                    let name = key.strip_prefix('$').unwrap_or(&key).to_string();
                    properties.insert(name, value);
                }
            }
        }

        let class = match class {
            Some(class) => class,
            None if registry.is_described(id) => id.to_string(),
            None => {
                return Err(DiError::invalid_config(format!(
                    "A class definition requires a \"class\" member, none given for \"{id}\""
                )));
            }
        };

        Ok(Definition::Class {
            class,
            args: args.unwrap_or_default(),
            properties,
        })
    }
}

impl PartialEq for Definition {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Definition::Class {
                    class: a,
                    args: a_args,
                    properties: a_props,
                },
                Definition::Class {
                    class: b,
                    args: b_args,
                    properties: b_props,
                },
            ) => a == b && a_args == b_args && a_props == b_props,
            (Definition::Factory(a), Definition::Factory(b)) => a.ptr_eq(b),
            (Definition::Object(a), Definition::Object(b)) => a.ptr_eq(b),
            (Definition::Alias(a), Definition::Alias(b)) => a == b,
            _ => false,
        }
    }
}

fn duplicate(id: &str, modern: &str, legacy: &str) -> DiError {
    DiError::invalid_config(format!(
        "Definition of \"{id}\" sets both \"{modern}\" and \"{legacy}\""
    ))
}

/// A definition as stored, together with its registration-time params
#[derive(Debug, Clone)]
pub(crate) struct Registered {
    pub definition: Definition,
    /// Params for non-class definitions; class definitions fold them into `args`
    pub params: Params,
}

impl Registered {
    pub fn new(definition: Definition, params: Params) -> Result<Self> {
        match definition {
            Definition::Class {
                class,
                args,
                properties,
            } => Ok(Self {
                definition: Definition::Class {
                    class,
                    args: params.overlay(&args)?,
                    properties,
                },
                params: Params::new(),
            }),
            definition => {
                params.style()?;
                Ok(Self { definition, params })
            }
        }
    }

    /// Arguments this entry predefines for the next step of resolution
    pub fn predefined(&self) -> &Params {
        match &self.definition {
            Definition::Class { args, .. } => args,
            _ => &self.params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Class;

    struct Qux;

    fn registry() -> Registry {
        let registry = Registry::new();
        registry.describe(Class::<Qux>::new("Qux").construct(|_| Ok(Qux)).into_info());
        registry
    }

    #[test]
    fn test_string_is_class() {
        let def = Definition::from_value("q", Value::from("Qux"), &registry()).unwrap();
        assert_eq!(def, Definition::class("Qux"));
    }

    #[test]
    fn test_null_builds_itself() {
        let def = Definition::from_value("Qux", Value::Null, &registry()).unwrap();
        assert_eq!(def, Definition::class("Qux"));
    }

    #[test]
    fn test_modern_and_legacy_dialects_agree() {
        let registry = registry();
        let modern = Definition::from_value(
            "q",
            Value::map([
                ("class", Value::from("Qux")),
                ("arguments", Value::list([1, 2])),
                ("a", Value::Int(42)),
            ]),
            &registry,
        )
        .unwrap();
        let legacy = Definition::from_value(
            "q",
            Value::map([
                ("__class", Value::from("Qux")),
                ("__construct()", Value::list([1, 2])),
                ("$a", Value::Int(42)),
            ]),
            &registry,
        )
        .unwrap();
        assert_eq!(modern, legacy);

        match modern {
            Definition::Class {
                class,
                args,
                properties,
            } => {
                assert_eq!(class, "Qux");
                assert_eq!(args, crate::params![1, 2]);
                assert_eq!(properties.get("a"), Some(&Value::Int(42)));
            }
            other => panic!("unexpected {}", other.kind()),
        }
    }

    #[test]
    fn test_properties_member() {
        let def = Definition::from_value(
            "Qux",
            Value::map([("properties", Value::map([("a", 1)]))]),
            &registry(),
        )
        .unwrap();
        assert_eq!(
            def,
            Definition::class("Qux").with_properties(Properties::new().set("a", 1))
        );
    }

    #[test]
    fn test_map_without_class_needs_described_id() {
        let registry = registry();
        assert!(Definition::from_value("Qux", Value::map([("a", 1)]), &registry).is_ok());

        let err = Definition::from_value("unknown", Value::map([("a", 1)]), &registry).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_both_dialects_at_once_is_rejected() {
        let err = Definition::from_value(
            "q",
            Value::map([("class", "Qux"), ("__class", "Qux")]),
            &registry(),
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unsupported_shapes() {
        let registry = registry();
        assert!(Definition::from_value("q", Value::Int(1), &registry).is_err());
        assert!(Definition::from_value("q", Value::list([1]), &registry).is_err());
        assert!(
            Definition::from_value("q", Value::map([("class", 1)]), &registry)
                .unwrap_err()
                .is_configuration()
        );
    }

    #[test]
    fn test_registered_folds_params_into_args() {
        let def = Definition::class("Qux").with_args(crate::params![1, 2]);
        let registered = Registered::new(def, Params::new().at(1, 20)).unwrap();
        assert_eq!(registered.predefined(), &crate::params![1, 20]);
        assert!(registered.params.is_empty());

        let mixed = Registered::new(
            Definition::class("Qux").with_args(crate::params![1]),
            crate::params!["a" => 1],
        );
        assert!(mixed.is_err());
    }
}
