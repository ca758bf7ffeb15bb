//! # Autowire - Autowiring Dependency Injection for Rust
//!
//! A dependency injection container keyed by string identifiers. It builds
//! object graphs from constructor descriptions, caches singletons, resolves
//! lazy references, and invokes arbitrary callables with their arguments
//! filled in.
//!
//! ## Features
//!
//! - **Autowiring** - Class-typed constructor parameters are resolved through the container
//! - **Flexible definitions** - Class names, config maps, factories, objects and aliases
//! - **Lazy references** - [`Reference`]s resolve only when their value is needed
//! - **Union and intersection types** - `A|B` and `A&B` parameters
//! - **Cycle detection** - Circular graphs fail with the full chain
//! - **Lock-free** - `DashMap` storage shared across threads
//! - **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use autowire::{Class, Container, Interface, Param};
//! use std::sync::Arc;
//!
//! trait Mailer: Send + Sync {
//!     fn send(&self, to: &str) -> String;
//! }
//!
//! struct Smtp {
//!     host: String,
//! }
//!
//! impl Mailer for Smtp {
//!     fn send(&self, to: &str) -> String {
//!         format!("{to} via {}", self.host)
//!     }
//! }
//!
//! struct Signup {
//!     mailer: Arc<dyn Mailer>,
//! }
//!
//! let container = Container::new();
//! container.describe_interface(Interface::new("Mailer"));
//! container.describe(
//!     Class::<Smtp>::new("Smtp")
//!         .implements::<dyn Mailer>("Mailer", |s| s as Arc<dyn Mailer>)
//!         .param(Param::new("host").typed("string").default("localhost"))
//!         .construct(|args| Ok(Smtp { host: args.take(0)? })),
//! );
//! container.describe(
//!     Class::<Signup>::new("Signup")
//!         .param(Param::new("mailer").typed("Mailer"))
//!         .construct(|args| Ok(Signup { mailer: args.interface::<dyn Mailer>(0)? })),
//! );
//!
//! // Bind the interface, then let the container wire the rest
//! container.set_singleton("Mailer", "Smtp").unwrap();
//!
//! let signup = container.get_as::<Signup>("Signup").unwrap();
//! assert_eq!(signup.mailer.send("ada"), "ada via localhost");
//! ```
//!
//! ## Definitions
//!
//! ```rust
//! use autowire::{Callable, Container, Class, Instance, Params, Properties, Reference, Value};
//!
//! struct Pool {
//!     size: i64,
//! }
//!
//! let container = Container::new();
//! container.describe(
//!     Class::<Pool>::new("Pool")
//!         .property("size", |p: &mut Pool, v| {
//!             p.size = v.as_int().unwrap_or(p.size);
//!             Ok(())
//!         })
//!         .construct(|_| Ok(Pool { size: 4 })),
//! );
//!
//! // Config map: class plus property overrides
//! container.set("big", Value::map([("class", Value::from("Pool")), ("size", Value::from(64))])).unwrap();
//! // Alias
//! container.set("default", Reference::to("big")).unwrap();
//! // Factory
//! container
//!     .set(
//!         "tiny",
//!         Callable::factory(|_c: &Container, _p: &Params, _cfg: &Properties| {
//!             Ok(Instance::new(Pool { size: 1 }))
//!         }),
//!     )
//!     .unwrap();
//!
//! assert_eq!(container.get_as::<Pool>("default").unwrap().size, 64);
//! assert_eq!(container.get_as::<Pool>("tiny").unwrap().size, 1);
//! ```
//!
//! ## Invoking Callables
//!
//! ```rust
//! use autowire::{params, Callable, Container, Function, Param, Value};
//!
//! let container = Container::new();
//! let greater = Callable::function(
//!     Function::closure(|args| Ok(Value::Bool(args.take::<i64>(0)? > args.take::<i64>(1)?)))
//!         .param(Param::new("a").typed("int"))
//!         .param(Param::new("b").typed("int")),
//! );
//!
//! let result = container.invoke(&greater, params!["b" => 1, "a" => 5]).unwrap();
//! assert_eq!(result, Value::Bool(true));
//! ```

mod args;
mod callable;
mod class;
mod container;
mod definition;
mod error;
mod guard;
#[cfg(feature = "logging")]
pub mod logging;
mod params;
mod provider;
mod registry;
mod resolver;
mod storage;
mod value;

pub use args::Args;
pub use callable::{Callable, FactoryFn, Function};
pub use class::{
    Builtin, Class, ClassInfo, ClassKind, DeclaredType, Interface, Method, Param, Signature,
    StaticMethod, TypeHint,
};
pub use container::{Container, ContainerBuilder, ServiceLocator};
pub use definition::Definition;
pub use error::*;
pub use params::{Key, Params, Properties, Style};
pub use provider::*;
pub use value::{FromValue, Instance, Reference, Value};

#[cfg(feature = "derive")]
pub use autowire_derive::Autowire;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Args, Autowired, Callable, Class, Container, Definition, DiError, Function, Injectable,
        Instance, Interface, Lifetime, Param, Params, Properties, Reference, Result, Signature,
        Value,
    };
    #[cfg(feature = "derive")]
    pub use crate::Autowire;
    pub use std::sync::Arc;
}
