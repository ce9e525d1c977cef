//! Closure wrappers and lazy proxies
//!
//! Everything the container calls back into user code through lives here:
//! service factories, extenders, class constructors and invokers. All are
//! type-erased `Arc<dyn Fn>` so bindings stay cheap to clone out of storage.
//!
//! Factories and extenders receive the [`Resolver`] that is performing the
//! resolution, so a closure running under a compiled container pulls its
//! dependencies from that compiled container's instance cache.

use crate::{Resolver, Result, Value};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

// =============================================================================
// Factory
// =============================================================================

type FactoryFn = dyn Fn(&dyn Resolver) -> Result<Value> + Send + Sync;

/// Closure that builds a service from the resolver
#[derive(Clone)]
pub struct Factory(Arc<FactoryFn>);

impl Factory {
    #[inline]
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&dyn Resolver) -> Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(factory))
    }

    #[inline]
    pub fn call(&self, resolver: &dyn Resolver) -> Result<Value> {
        (self.0)(resolver)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Factory")
    }
}

// =============================================================================
// Extender
// =============================================================================

type ExtenderFn = dyn Fn(Value, &dyn Resolver) -> Result<Value> + Send + Sync;

/// Decorator applied to a resolved service, `(resolved, resolver) -> resolved'`
#[derive(Clone)]
pub struct Extender(Arc<ExtenderFn>);

impl Extender {
    #[inline]
    pub fn new<F>(extender: F) -> Self
    where
        F: Fn(Value, &dyn Resolver) -> Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(extender))
    }

    #[inline]
    pub fn apply(&self, resolved: Value, resolver: &dyn Resolver) -> Result<Value> {
        (self.0)(resolved, resolver)
    }
}

impl fmt::Debug for Extender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Extender")
    }
}

// =============================================================================
// Constructor / Invoker
// =============================================================================

type ConstructorFn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// Builds an instance of a class from its positional constructor arguments
#[derive(Clone)]
pub struct Constructor(Arc<ConstructorFn>);

impl Constructor {
    #[inline]
    pub fn new<F>(constructor: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(constructor))
    }

    #[inline]
    pub fn construct(&self, args: &[Value]) -> Result<Value> {
        (self.0)(args)
    }
}

type InvokerFn = dyn Fn(&Value, &dyn Resolver) -> Result<Value> + Send + Sync;

/// Calls a method on an already constructed instance
#[derive(Clone)]
pub struct Invoker(Arc<InvokerFn>);

impl Invoker {
    #[inline]
    pub fn new<F>(invoker: F) -> Self
    where
        F: Fn(&Value, &dyn Resolver) -> Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(invoker))
    }

    #[inline]
    pub fn invoke(&self, instance: &Value, resolver: &dyn Resolver) -> Result<Value> {
        (self.0)(instance, resolver)
    }
}

// =============================================================================
// Lazy Proxy
// =============================================================================

type LazyInitFn = dyn Fn() -> Result<Value> + Send + Sync;

/// Stand-in for a service whose construction is deferred until first access.
///
/// Clones share the same target: the initializer runs at most once.
#[derive(Clone)]
pub struct LazyProxy {
    class: Arc<str>,
    proxy_class: Arc<str>,
    instance: Arc<OnceCell<Value>>,
    init: Arc<LazyInitFn>,
}

impl LazyProxy {
    pub fn new<F>(class: impl Into<Arc<str>>, proxy_class: impl Into<Arc<str>>, init: F) -> Self
    where
        F: Fn() -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            class: class.into(),
            proxy_class: proxy_class.into(),
            instance: Arc::new(OnceCell::new()),
            init: Arc::new(init),
        }
    }

    /// Class of the deferred target
    #[inline]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Generated name of the proxy class
    #[inline]
    pub fn proxy_class(&self) -> &str {
        &self.proxy_class
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.instance.get().is_some()
    }

    /// Get the target, constructing it on first access
    pub fn target(&self) -> Result<&Value> {
        #[cfg(feature = "logging")]
        if self.instance.get().is_some() {
            trace!(
                target: "service_container",
                class = &*self.class,
                "Lazy proxy already initialized, returning target"
            );
        }

        self.instance.get_or_try_init(|| {
            #[cfg(feature = "logging")]
            debug!(
                target: "service_container",
                class = &*self.class,
                proxy = &*self.proxy_class,
                "Lazy proxy initializing target on first access"
            );

            (self.init)()
        })
    }

    /// Whether both proxies defer to the same target slot
    #[inline]
    pub fn ptr_eq(&self, other: &LazyProxy) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

impl fmt::Debug for LazyProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyProxy")
            .field("class", &self.class)
            .field("proxy_class", &self.proxy_class)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct Report {
        rows: u32,
    }

    #[test]
    fn test_lazy_proxy_defers_construction() {
        static CREATED: AtomicU32 = AtomicU32::new(0);

        let proxy = LazyProxy::new("Report", "ReportProxy_0", || {
            CREATED.fetch_add(1, Ordering::SeqCst);
            Ok(Value::object("Report", Report { rows: 3 }))
        });

        assert!(!proxy.is_initialized());
        assert_eq!(CREATED.load(Ordering::SeqCst), 0);

        let rows = proxy.target().unwrap().downcast_ref::<Report>().unwrap().rows;
        assert_eq!(rows, 3);
        assert!(proxy.is_initialized());

        let copy = proxy.clone();
        copy.target().unwrap();
        assert_eq!(CREATED.load(Ordering::SeqCst), 1);
        assert!(copy.ptr_eq(&proxy));
    }

    #[test]
    fn test_lazy_proxy_failure_is_retried_on_next_access() {
        static ATTEMPTS: AtomicU32 = AtomicU32::new(0);

        let proxy = LazyProxy::new("Report", "ReportProxy_0", || {
            if ATTEMPTS.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(crate::ContainerError::creation_failed("report", "offline"))
            } else {
                Ok(Value::Int(1))
            }
        });

        assert!(proxy.target().is_err());
        assert!(!proxy.is_initialized());
        assert_eq!(proxy.target().unwrap(), &Value::Int(1));
    }
}
