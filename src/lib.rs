//! # service-container - Dependency Injection with an Ahead-of-Time Compiler
//!
//! A string-keyed dependency injection container. Services are described by
//! bindings (plain values, arrays, factory closures, classes, lazy classes and
//! aliases), resolved on demand by the runtime [`Container`], and optionally
//! compiled into per-service resolver methods that a [`CompiledContainer`]
//! executes without walking the binding graph.
//!
//! ## Features
//!
//! - **Lock-free** - `DashMap` storage for bindings, classes and instance caches
//! - **Autowiring** - Classes are built from their constructor metadata
//! - **Compiler** - Deterministic generated code, loadable as Rust source
//! - **Cycle detection** - Re-entrant resolution fails with the full chain
//! - **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use service_container::{Binding, ClassInfo, Container, Param, Value, argument};
//!
//! struct Mailer {
//!     host: String,
//! }
//!
//! let container = Container::new();
//! container.register_class(
//!     ClassInfo::new("Mailer")
//!         .param(Param::of::<String>("host"))
//!         .constructor(|args| {
//!             let host = argument(args, 0).as_str().unwrap_or_default().to_string();
//!             Ok(Value::object("Mailer", Mailer { host }))
//!         }),
//! );
//! container.set_parameter("host", "smtp.local");
//! container.singleton("mailer", Binding::object("Mailer"));
//!
//! let mailer = container.get("mailer").unwrap();
//! assert_eq!(mailer.downcast_ref::<Mailer>().unwrap().host, "smtp.local");
//! ```
//!
//! ## Compiling
//!
//! ```rust
//! use service_container::{Binding, Container, Value};
//!
//! let container = Container::new();
//! container.set_parameter("debug", true);
//! container.bind("config", Binding::array([
//!     ("debug", service_container::Argument::parameter("debug")),
//! ]));
//!
//! // Compilation locks the container
//! let compiled = container.compile().unwrap();
//! assert!(container.is_locked());
//! assert_eq!(compiled.get("config").unwrap(), Value::array([("debug", true)]));
//! ```
//!
//! ## Derived metadata
//!
//! With the `derive` feature, `#[derive(Reflect)]` generates the constructor
//! metadata from the struct fields:
//!
//! ```rust,ignore
//! use service_container::{Container, Reflect};
//! use std::sync::Arc;
//!
//! #[derive(Reflect)]
//! struct Logger;
//!
//! #[derive(Reflect)]
//! struct Mailer {
//!     #[param(default = 25)]
//!     port: i64,
//!     logger: Arc<Logger>,
//! }
//!
//! let container = Container::new();
//! container.register::<Logger>();
//! container.register::<Mailer>();
//! let mailer = container.get("Mailer").unwrap();
//! ```

mod autowire;
mod binding;
mod build_stack;
mod compiled;
pub mod compiler;
mod container;
mod error;
mod factory;
#[cfg(feature = "logging")]
pub mod logging;
mod reflection;
mod storage;
mod value;

pub use binding::{Argument, Binding, BindingType, BindingValue, ServiceId};
pub use compiled::{CompiledContainer, GeneratedContainer, MethodFn};
pub use compiler::{CompiledArtifact, Compiler, CompilerOptions};
pub use container::{CONTAINER_CLASS, CONTAINER_ID, Container, Resolver};
pub use error::*;
pub use factory::{Constructor, Extender, Factory, Invoker, LazyProxy};
pub use reflection::{
    BuiltinType, ClassInfo, ClassRegistry, FromValue, MethodInfo, Param, ParamKind, ParamType, Reflect,
    argument,
};
pub use value::{Array, ArrayKey, Object, Value};

#[cfg(feature = "derive")]
pub use service_container_derive::Reflect;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Argument, Binding, ClassInfo, CompiledContainer, Compiler, CompilerOptions, Container, ContainerError,
        Param, Reflect, Resolver, Result, Value, argument,
    };
    pub use std::sync::Arc;
}
