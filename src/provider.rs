//! Marker traits for autowirable types
//!
//! These traits define what types can be built by the container and how a
//! registration behaves across requests.

use crate::Class;

/// Marker trait for types the container can hold.
///
/// This is automatically implemented for all types that are `Send + Sync + 'static`.
/// You never need to implement this manually.
pub trait Injectable: Send + Sync + 'static {}

// Blanket implementation - everything that's Send + Sync + 'static is Injectable
impl<T: Send + Sync + 'static> Injectable for T {}

/// A type that can describe its own constructor.
///
/// Usually generated with `#[derive(Autowire)]` (feature `derive`), but it
/// is a plain trait and can be written by hand:
///
/// ```rust
/// use autowire::{Autowired, Class, Container, Param};
///
/// struct Counter {
///     start: i64,
/// }
///
/// impl Autowired for Counter {
///     fn describe() -> Class<Self> {
///         Class::typed()
///             .param(Param::new("start").typed("int").default(1))
///             .construct(|args| Ok(Counter { start: args.take(0)? }))
///     }
/// }
///
/// let container = Container::new();
/// container.autowire::<Counter>();
///
/// let counter = container.get_as::<Counter>(std::any::type_name::<Counter>()).unwrap();
/// assert_eq!(counter.start, 1);
/// ```
pub trait Autowired: Injectable + Sized {
    /// Build the constructor description of `Self`
    fn describe() -> Class<Self>;
}

/// Registration lifetime of an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// New instance built on every request
    #[default]
    Transient,

    /// Built on first request, then cached for the life of the container
    Singleton,
}

impl Lifetime {
    #[inline]
    pub fn is_singleton(&self) -> bool {
        matches!(self, Lifetime::Singleton)
    }
}

impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lifetime::Transient => f.write_str("transient"),
            Lifetime::Singleton => f.write_str("singleton"),
        }
    }
}
