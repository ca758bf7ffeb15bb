//! Argument resolution for constructors and callables
//!
//! For each declared parameter, in order, the first source that applies
//! wins:
//!
//! 1. a value the caller supplied, by name or by position;
//! 2. a value the definition predefined at registration;
//! 3. a class-typed parameter resolved through the container (named
//!    services may satisfy it during `invoke`);
//! 4. a union type, trying each member's binding in declared order;
//! 5. an intersection type, accepting only values satisfying every member;
//! 6. the declared default;
//! 7. null, when the parameter admits it;
//!
//! otherwise resolution fails. A trailing variadic parameter collects every
//! remaining positional value, and receives an empty list when none remain.

use crate::class::{DeclaredType, TypeHint};
use crate::params::{Key, Style};
use crate::{Args, Container, DiError, Instance, Param, Params, Result, Signature, Value};

#[cfg(feature = "logging")]
use tracing::trace;

/// Whether named services may satisfy class-typed parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Construct,
    Invoke,
}

pub(crate) struct Resolver<'a> {
    container: &'a Container,
    target: &'a str,
    mode: Mode,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(container: &'a Container, target: &'a str, mode: Mode) -> Self {
        Self {
            container,
            target,
            mode,
        }
    }

    /// Produce one argument per declared parameter
    pub(crate) fn resolve(
        &self,
        signature: &Signature,
        supplied: &Params,
        predefined: &Params,
    ) -> Result<Args> {
        if let Some(defect) = signature.defect() {
            return Err(DiError::not_instantiable(self.target, defect));
        }

        let supplied_style = supplied.style()?;
        let predefined_style = predefined.style()?;
        supplied_style.combine(predefined_style)?;
        self.reject_unknown_names(signature, supplied)?;
        self.reject_unknown_names(signature, predefined)?;

        let mut entries = Vec::with_capacity(signature.len());
        for param in signature.params() {
            let value = if param.is_variadic() {
                self.variadic(signature, param, supplied, supplied_style, predefined, predefined_style)?
            } else if let Some(value) = lookup(supplied, supplied_style, param) {
                self.trace(param, "supplied");
                self.explicit(param, value)?
            } else if let Some(value) = lookup(predefined, predefined_style, param) {
                self.trace(param, "predefined");
                self.explicit(param, value)?
            } else {
                self.autowire(param)?
            };
            entries.push((param.name().to_string(), value));
        }

        Ok(Args::new(self.target, entries))
    }

    fn reject_unknown_names(&self, signature: &Signature, params: &Params) -> Result<()> {
        if signature.params().last().is_some_and(Param::is_variadic) {
            return Ok(());
        }
        match params
            .names()
            .find(|name| !signature.params().iter().any(|p| p.name() == *name))
        {
            Some(name) => Err(DiError::invalid_config(format!(
                "\"{}\" has no parameter named \"{name}\"",
                self.target
            ))),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Explicit values
    // =========================================================================

    fn explicit(&self, param: &Param, value: &Value) -> Result<Value> {
        let value = self.container.resolve_value(value)?;
        self.check(param, value)
    }

    /// Validate a value against the declared type
    fn check(&self, param: &Param, value: Value) -> Result<Value> {
        if value.is_null() {
            if param.is_nullable() || param.declared().is_none() {
                return Ok(value);
            }
            return Err(self.type_error(param, "null"));
        }

        let Some(declared) = param.declared() else {
            return Ok(value);
        };
        if self.accepts(declared, &value) {
            return Ok(value);
        }

        let class_shaped = matches!(
            declared,
            DeclaredType::Single(TypeHint::Class(_)) | DeclaredType::Intersection(_)
        );
        match &value {
            Value::Object(instance) if class_shaped => Err(DiError::invalid_config(format!(
                "Argument \"{}\" of \"{}\" must satisfy {}, an instance of \"{}\" was provided",
                param.name(),
                self.target,
                param.type_display(),
                instance.class_name()
            ))),
            _ => Err(self.type_error(param, &value.type_name())),
        }
    }

    fn accepts(&self, declared: &DeclaredType, value: &Value) -> bool {
        match declared {
            DeclaredType::Single(hint) => self.accepts_hint(hint, value),
            DeclaredType::Union(members) => {
                members.iter().any(|hint| self.accepts_hint(hint, value))
            }
            DeclaredType::Intersection(members) => match value {
                Value::Object(instance) => self.satisfies_all(instance, members),
                _ => false,
            },
        }
    }

    fn accepts_hint(&self, hint: &TypeHint, value: &Value) -> bool {
        match (hint, value) {
            (TypeHint::Builtin(builtin), value) => builtin.accepts(value),
            (TypeHint::Class(class), Value::Object(instance)) => {
                self.container.registry().satisfies(instance, class)
            }
            (TypeHint::Class(_), _) => false,
        }
    }

    fn satisfies_all(&self, instance: &Instance, members: &[String]) -> bool {
        let registry = self.container.registry();
        members.iter().all(|member| registry.satisfies(instance, member))
    }

    // =========================================================================
    // Variadic tail
    // =========================================================================

    fn variadic(
        &self,
        signature: &Signature,
        param: &Param,
        supplied: &Params,
        supplied_style: Style,
        predefined: &Params,
        predefined_style: Style,
    ) -> Result<Value> {
        let mut items = tail(signature, supplied, supplied_style, param);
        if items.is_empty() {
            items = tail(signature, predefined, predefined_style, param);
        }
        if items.is_empty() {
            if let Some(Value::List(default)) = param.default_value() {
                items = default.clone();
            }
        }

        let element = param.element();
        let collected = items
            .iter()
            .map(|item| self.explicit(&element, item))
            .collect::<Result<Vec<_>>>()?;

        #[cfg(feature = "logging")]
        trace!(
            target: "autowire",
            target_name = self.target,
            parameter = param.name(),
            count = collected.len(),
            "Collected variadic arguments"
        );

        Ok(Value::List(collected))
    }

    // =========================================================================
    // Type-driven resolution
    // =========================================================================

    fn autowire(&self, param: &Param) -> Result<Value> {
        match param.declared() {
            Some(DeclaredType::Single(TypeHint::Class(class))) => self.class_typed(param, class),
            Some(DeclaredType::Union(members)) => self.union(param, members),
            Some(DeclaredType::Intersection(members)) => self.intersection(param, members),
            _ => self.fallback(param),
        }
    }

    fn class_typed(&self, param: &Param, class: &str) -> Result<Value> {
        if self.container.has(class) {
            self.trace(param, "binding");
            return self.get_satisfying(param, class, class);
        }

        if let Some(found) = self.located(param, |instance| {
            self.container.registry().satisfies(instance, class)
        }) {
            self.trace(param, "named service");
            return Ok(Value::Object(found));
        }

        if !self.container.registry().is_instantiable(class) {
            if let Some(default) = param.default_value() {
                self.trace(param, "default");
                return Ok(default.clone());
            }
            if param.is_nullable() {
                self.trace(param, "null");
                return Ok(Value::Null);
            }
            return Err(DiError::not_instantiable(
                self.target,
                format!(
                    "parameter \"{}\" requires \"{class}\", which is not instantiable and has no binding",
                    param.name()
                ),
            ));
        }

        self.trace(param, "autowired");
        self.get_satisfying(param, class, class)
    }

    fn union(&self, param: &Param, members: &[TypeHint]) -> Result<Value> {
        for class in members.iter().filter_map(TypeHint::class_name) {
            if self.container.has(class) {
                self.trace(param, "union binding");
                return self.get_satisfying(param, class, class);
            }
        }

        let registry = self.container.registry();
        if let Some(found) = self.located(param, |instance| {
            members
                .iter()
                .filter_map(TypeHint::class_name)
                .any(|class| registry.satisfies(instance, class))
        }) {
            self.trace(param, "named service");
            return Ok(Value::Object(found));
        }

        self.fallback_typed(param)
    }

    fn intersection(&self, param: &Param, members: &[String]) -> Result<Value> {
        let key = members.join("&");
        if self.container.has(&key) {
            self.trace(param, "intersection binding");
            let instance = self.container.get(&key)?;
            return self.check(param, Value::Object(instance));
        }

        for member in members {
            if self.container.has(member) {
                let instance = self.container.get(member)?;
                if self.satisfies_all(&instance, members) {
                    self.trace(param, "member binding");
                    return Ok(Value::Object(instance));
                }
            }
        }

        if let Some(found) = self.located(param, |instance| self.satisfies_all(instance, members)) {
            self.trace(param, "named service");
            return Ok(Value::Object(found));
        }

        self.fallback_typed(param)
    }

    /// Default, then null, then a type error
    fn fallback_typed(&self, param: &Param) -> Result<Value> {
        if let Some(default) = param.default_value() {
            return Ok(default.clone());
        }
        if param.is_nullable() {
            return Ok(Value::Null);
        }
        Err(self.type_error(param, "no value"))
    }

    /// Default, then null; untyped parameters are missing, typed ones mismatched
    fn fallback(&self, param: &Param) -> Result<Value> {
        if let Some(default) = param.default_value() {
            self.trace(param, "default");
            return Ok(default.clone());
        }
        if param.is_nullable() {
            self.trace(param, "null");
            return Ok(Value::Null);
        }
        match param.declared() {
            Some(_) => Err(self.type_error(param, "no value")),
            None => Err(DiError::missing(param.name(), self.target)),
        }
    }

    fn get_satisfying(&self, param: &Param, id: &str, class: &str) -> Result<Value> {
        let instance = self.container.get(id)?;
        if self.container.registry().satisfies(&instance, class) {
            Ok(Value::Object(instance))
        } else {
            Err(DiError::invalid_config(format!(
                "Argument \"{}\" of \"{}\" must be of type {class}, \"{id}\" resolved to an instance of \"{}\"",
                param.name(),
                self.target,
                instance.class_name()
            )))
        }
    }

    /// A named service matching the parameter name, only during `invoke`
    fn located<F>(&self, param: &Param, accept: F) -> Option<Instance>
    where
        F: Fn(&Instance) -> bool,
    {
        if self.mode != Mode::Invoke {
            return None;
        }
        self.container
            .locator()
            .and_then(|locator| locator.locate(param.name()))
            .map(|instance| self.container.registry().enrich(instance))
            .filter(|instance| accept(instance))
    }

    fn type_error(&self, param: &Param, given: &str) -> DiError {
        DiError::InvocationType {
            parameter: param.name().to_string(),
            target: self.target.to_string(),
            expected: param.type_display(),
            given: given.to_string(),
        }
    }

    #[inline]
    fn trace(&self, _param: &Param, _source: &'static str) {
        #[cfg(feature = "logging")]
        trace!(
            target: "autowire",
            target_name = self.target,
            parameter = _param.name(),
            source = _source,
            "Resolved parameter"
        );
    }
}

fn lookup<'p>(params: &'p Params, style: Style, param: &Param) -> Option<&'p Value> {
    match style {
        Style::Empty => None,
        Style::Positional => params.by_index(param.position()),
        Style::Named => params.by_name(param.name()),
    }
}

/// Values a variadic parameter collects from one collection.
///
/// In named style it takes its own entry plus every entry whose name
/// matches no other parameter.
fn tail(signature: &Signature, params: &Params, style: Style, param: &Param) -> Vec<Value> {
    match style {
        Style::Empty => Vec::new(),
        Style::Positional => params
            .positional_from(param.position())
            .into_iter()
            .cloned()
            .collect(),
        Style::Named => {
            let mut items = match params.by_name(param.name()) {
                Some(Value::List(items)) => items.clone(),
                Some(value) => vec![value.clone()],
                None => Vec::new(),
            };
            let declared = |name: &str| signature.params().iter().any(|p| p.name() == name);
            items.extend(params.iter().filter_map(|(key, value)| match key {
                Key::Name(name) if !declared(name) => Some(value.clone()),
                _ => None,
            }));
            items
        }
    }
}
