//! Resolved argument lists handed to constructor and callable bodies

use crate::{DiError, FromValue, Injectable, Instance, Result, Value};
use std::sync::Arc;

/// Arguments resolved for one call, one entry per declared parameter.
///
/// A variadic parameter occupies a single slot holding a list.
#[derive(Debug, Clone, Default)]
pub struct Args {
    target: String,
    names: Vec<String>,
    values: Vec<Value>,
}

impl Args {
    /// Build an argument list for `target` from `(parameter, value)` pairs
    pub fn new<I, S>(target: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let (names, values) = entries
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .unzip();
        Self {
            target: target.into(),
            names,
            values,
        }
    }

    /// What is being built or called
    #[inline]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn by_name(&self, name: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.values.get(i))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Convert the argument at `index`
    pub fn take<T: FromValue>(&self, index: usize) -> Result<T> {
        let value = self.slot(index)?;
        T::from_value(value).ok_or_else(|| self.mismatch(index, T::TYPE_HINT, value))
    }

    /// The object at `index`
    pub fn instance(&self, index: usize) -> Result<Instance> {
        match self.slot(index)? {
            Value::Object(instance) => Ok(instance.clone()),
            other => Err(self.mismatch(index, "object", other)),
        }
    }

    /// The object at `index` as its concrete type
    pub fn object<T: Injectable>(&self, index: usize) -> Result<Arc<T>> {
        let instance = self.instance(index)?;
        instance
            .downcast::<T>()
            .ok_or_else(|| self.mismatch(index, std::any::type_name::<T>(), &Value::Object(instance)))
    }

    /// Like [`Args::object`], with null mapped to `None`
    pub fn optional<T: Injectable>(&self, index: usize) -> Result<Option<Arc<T>>> {
        match self.slot(index)? {
            Value::Null => Ok(None),
            _ => self.object(index).map(Some),
        }
    }

    /// The object at `index` through an interface declared with `Class::implements`
    pub fn interface<I: ?Sized + 'static>(&self, index: usize) -> Result<Arc<I>> {
        let instance = self.instance(index)?;
        instance
            .cast::<I>()
            .ok_or_else(|| self.mismatch(index, std::any::type_name::<I>(), &Value::Object(instance)))
    }

    /// Like [`Args::interface`], with null mapped to `None`
    pub fn optional_interface<I: ?Sized + 'static>(&self, index: usize) -> Result<Option<Arc<I>>> {
        match self.slot(index)? {
            Value::Null => Ok(None),
            _ => self.interface(index).map(Some),
        }
    }

    /// The collected values of a variadic parameter
    pub fn variadic(&self, index: usize) -> &[Value] {
        self.values
            .get(index)
            .and_then(Value::as_list)
            .unwrap_or(&[])
    }

    fn slot(&self, index: usize) -> Result<&Value> {
        self.values.get(index).ok_or_else(|| {
            DiError::missing(
                self.names
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| format!("#{index}")),
                &self.target,
            )
        })
    }

    fn mismatch(&self, index: usize, expected: &str, given: &Value) -> DiError {
        DiError::InvocationType {
            parameter: self
                .names
                .get(index)
                .cloned()
                .unwrap_or_else(|| format!("#{index}")),
            target: self.target.clone(),
            expected: expected.to_string(),
            given: given.type_name(),
        }
    }
}
