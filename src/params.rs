//! Caller-supplied arguments and property overrides

use crate::{DiError, Result, Value};

/// Key of a supplied argument
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Index(usize),
    Name(String),
}

/// How a [`Params`] collection addresses parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Empty,
    Positional,
    Named,
}

impl Style {
    /// Style of two collections used for the same call
    pub(crate) fn combine(self, other: Style) -> Result<Style> {
        match (self, other) {
            (style, Style::Empty) | (Style::Empty, style) => Ok(style),
            (a, b) if a == b => Ok(a),
            _ => Err(DiError::invalid_config(
                "Dependencies indexed by name and by position in the same array are not allowed.",
            )),
        }
    }
}

/// Arguments supplied for a constructor or callable.
///
/// Entries are keyed either by position or by parameter name. A single
/// collection must use one style only; mixing is rejected when the
/// collection is used.
///
/// ```rust
/// use autowire::{params, Params};
///
/// let positional = params![1, "two"];
/// let named = params!["b" => 5, "a" => 1];
/// assert_eq!(positional.len(), 2);
/// assert_eq!(named.by_name("a"), Some(&autowire::Value::Int(1)));
///
/// let manual = Params::new().push(1).push(2);
/// assert_eq!(manual, params![1, 2]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(Key, Value)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument after the highest index so far
    pub fn push(mut self, value: impl Into<Value>) -> Self {
        let next = self
            .entries
            .iter()
            .filter_map(|(key, _)| match key {
                Key::Index(i) => Some(*i + 1),
                Key::Name(_) => None,
            })
            .max()
            .unwrap_or(0);
        self.insert(Key::Index(next), value.into());
        self
    }

    /// Set the argument at a position
    pub fn at(mut self, index: usize, value: impl Into<Value>) -> Self {
        self.insert(Key::Index(index), value.into());
        self
    }

    /// Set an argument by parameter name
    pub fn named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(Key::Name(name.into()), value.into());
        self
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, key: Key, value: Value) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Key, Value)> {
        self.entries.iter()
    }

    /// Determine the addressing style, rejecting mixed collections
    pub fn style(&self) -> Result<Style> {
        let mut positional = false;
        let mut named = false;
        for (key, _) in &self.entries {
            match key {
                Key::Index(_) => positional = true,
                Key::Name(_) => named = true,
            }
        }
        match (positional, named) {
            (false, false) => Ok(Style::Empty),
            (true, false) => Ok(Style::Positional),
            (false, true) => Ok(Style::Named),
            (true, true) => Err(DiError::invalid_config(
                "Dependencies indexed by name and by position in the same array are not allowed.",
            )),
        }
    }

    pub fn by_index(&self, index: usize) -> Option<&Value> {
        self.entries.iter().find_map(|(key, value)| match key {
            Key::Index(i) if *i == index => Some(value),
            _ => None,
        })
    }

    pub fn by_name(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find_map(|(key, value)| match key {
            Key::Name(n) if n == name => Some(value),
            _ => None,
        })
    }

    /// Positional entries at or after `start`, in index order
    pub fn positional_from(&self, start: usize) -> Vec<&Value> {
        let mut tail: Vec<(usize, &Value)> = self
            .entries
            .iter()
            .filter_map(|(key, value)| match key {
                Key::Index(i) if *i >= start => Some((*i, value)),
                _ => None,
            })
            .collect();
        tail.sort_by_key(|(i, _)| *i);
        tail.into_iter().map(|(_, value)| value).collect()
    }

    /// Names of every named entry
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|(key, _)| match key {
            Key::Name(n) => Some(n.as_str()),
            Key::Index(_) => None,
        })
    }

    /// Entries of `self` take precedence over entries of `base`.
    ///
    /// Both collections must share one addressing style (or be empty).
    pub fn overlay(&self, base: &Params) -> Result<Params> {
        let (top, bottom) = (self.style()?, base.style()?);
        top.combine(bottom)?;
        match (top, bottom) {
            (_, Style::Empty) => Ok(self.clone()),
            (Style::Empty, _) => Ok(base.clone()),
            _ => {
                let mut merged = base.clone();
                for (key, value) in &self.entries {
                    merged.insert(key.clone(), value.clone());
                }
                Ok(merged)
            }
        }
    }

    /// Convert a list (positional) or map (named) value
    pub fn from_value(value: Value) -> Result<Params> {
        match value {
            Value::Null => Ok(Params::new()),
            Value::List(items) => Ok(Params {
                entries: items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (Key::Index(i), v))
                    .collect(),
            }),
            Value::Map(entries) => Ok(Params {
                entries: entries.into_iter().map(|(k, v)| (Key::Name(k), v)).collect(),
            }),
            other => Err(DiError::invalid_config(format!(
                "constructor arguments must be a list or a map, {} given",
                other.type_name()
            ))),
        }
    }

    pub(crate) fn map_values<F>(&self, mut f: F) -> Result<Params>
    where
        F: FnMut(&Value) -> Result<Value>,
    {
        let entries = self
            .entries
            .iter()
            .map(|(key, value)| Ok((key.clone(), f(value)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Params { entries })
    }
}

impl<V: Into<Value>> FromIterator<V> for Params {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        iter.into_iter().fold(Params::new(), |params, value| params.push(value))
    }
}

/// Post-construction property overrides, applied in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    entries: Vec<(String, Value)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) a property value
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: String, value: Value) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Value)> {
        self.entries.iter()
    }

    /// Entries of `self` win over entries of `base`; `base` order comes first
    pub fn overlay(&self, base: &Properties) -> Properties {
        let mut merged = base.clone();
        for (name, value) in &self.entries {
            merged.insert(name.clone(), value.clone());
        }
        merged
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Properties::new(), |props, (k, v)| props.set(k, v))
    }
}

/// Build a [`Params`] collection.
///
/// `params![a, b]` is positional, `params!["name" => value]` is named.
#[macro_export]
macro_rules! params {
    () => {
        $crate::Params::new()
    };
    ($($name:literal => $value:expr),+ $(,)?) => {
        $crate::Params::new()$(.named($name, $value))+
    };
    ($($value:expr),+ $(,)?) => {
        $crate::Params::new()$(.push($value))+
    };
}
