//! Runtime service container
//!
//! The `Container` stores bindings and resolves them on demand by walking the
//! definition graph. It is also the reference behaviour the compiler
//! reproduces: a [`CompiledContainer`](crate::CompiledContainer) must hand out
//! the same values for the same bindings.

use crate::autowire::{Activator, PlanLookup, activate, resolve_argument};
use crate::binding::{Argument, Binding, BindingValue, ServiceId};
use crate::build_stack::BuildGuard;
use crate::compiler::{Compiler, helper};
use crate::factory::{Extender, LazyProxy};
use crate::reflection::{ClassInfo, ClassRegistry, Reflect};
use crate::storage::{BindingStorage, InstanceCache};
use crate::value::{Object, Value};
use crate::{CompileError, CompiledContainer, ContainerError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Id under which every container resolves to itself
pub const CONTAINER_ID: &str = "container";

/// Class name of the self-registered container object
pub const CONTAINER_CLASS: &str = "service_container::Container";

/// Resolution interface shared by the runtime and the compiled container.
///
/// Factories and extenders receive the resolver performing the resolution.
pub trait Resolver: Send + Sync {
    /// Resolve a service by id
    fn get(&self, id: &str) -> Result<Value>;

    /// Whether `get(id)` can succeed without `NotFound`
    fn has(&self, id: &str) -> bool;

    /// Look up a container parameter
    fn parameter(&self, name: &str) -> Result<Value>;
}

pub(crate) struct ContainerInner {
    storage: BindingStorage,
    classes: ClassRegistry,
    /// Shared instances
    services: InstanceCache,
    /// Private instances of invokable classes
    privates: InstanceCache,
    parameters: InstanceCache,
    locked: AtomicBool,
}

/// Runtime dependency injection container.
///
/// Cheap to clone: clones share the same bindings and instance cache.
///
/// # Examples
///
/// ```rust
/// use service_container::{Binding, Container, Value};
///
/// let container = Container::new();
/// container.bind("greeting", Binding::value("hello"));
/// container.bind("words", Binding::closure(|c| {
///     let greeting = c.get("greeting")?;
///     Ok(Value::list([greeting, Value::from("world")]))
/// }));
///
/// let words = container.get("words").unwrap();
/// assert_eq!(words.lookup(1).and_then(Value::as_str), Some("world"));
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    /// Create an empty container.
    #[inline]
    pub fn new() -> Self {
        #[cfg(feature = "logging")]
        debug!(target: "service_container", "Creating new service container");

        Self {
            inner: Arc::new(ContainerInner {
                storage: BindingStorage::new(),
                classes: ClassRegistry::new(),
                services: InstanceCache::new(),
                privates: InstanceCache::new(),
                parameters: InstanceCache::new(),
                locked: AtomicBool::new(false),
            }),
        }
    }

    /// Identity of this container on the build stack
    #[inline]
    pub(crate) fn owner(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    // =========================================================================
    // Registration Methods
    // =========================================================================

    /// Register a binding, replacing any previous binding and cached instance.
    pub fn bind(&self, id: impl Into<ServiceId>, binding: Binding) {
        self.check_not_locked();
        let id = id.into();

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            service = %id,
            binding_type = ?binding.binding_type(),
            shared = binding.is_shared(),
            extenders = binding.extenders().len(),
            service_count = self.inner.storage.len() + 1,
            "Registering service"
        );

        self.inner.services.remove(&id);
        self.inner.storage.insert(id, binding);
    }

    /// Register a shared binding.
    #[inline]
    pub fn singleton(&self, id: impl Into<ServiceId>, binding: Binding) {
        self.bind(id, binding.shared());
    }

    /// Register an existing value or object instance.
    #[inline]
    pub fn instance(&self, id: impl Into<ServiceId>, value: impl Into<Value>) {
        self.bind(id, Binding::value(value).shared());
    }

    /// Register `alias` as a reference to `target`.
    #[inline]
    pub fn alias(&self, alias: impl Into<ServiceId>, target: impl Into<ServiceId>) {
        self.bind(alias, Binding::reference(target));
    }

    /// Register a factory closure, called on every resolution.
    #[inline]
    pub fn factory<F>(&self, id: impl Into<ServiceId>, factory: F)
    where
        F: Fn(&dyn Resolver) -> Result<Value> + Send + Sync + 'static,
    {
        self.bind(id, Binding::closure(factory));
    }

    /// Register a shared class whose construction is deferred behind a proxy.
    #[inline]
    pub fn lazy(&self, id: impl Into<ServiceId>, class: impl Into<String>) {
        self.bind(id, Binding::lazy(class).shared());
    }

    /// Register constructor metadata for a class.
    pub fn register_class(&self, info: ClassInfo) {
        self.check_not_locked();

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            class = info.name(),
            params = info.params().len(),
            instantiable = info.is_instantiable(),
            "Registering class metadata"
        );

        self.inner.classes.register(info);
    }

    /// Register the metadata of a [`Reflect`] type.
    #[inline]
    pub fn register<T: Reflect>(&self) {
        self.register_class(T::class_info());
    }

    /// Set a container parameter.
    pub fn set_parameter(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.check_not_locked();
        let name = name.into();

        #[cfg(feature = "logging")]
        debug!(target: "service_container", parameter = %name, "Setting parameter");

        self.inner.parameters.replace(name, value.into());
    }

    /// Add `tag` to every listed binding.
    pub fn tag<I, S>(&self, tag: &str, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.check_not_locked();
        for id in ids {
            let id = id.as_ref();
            if !self.inner.storage.update(id, |b| b.add_tag(tag)) {
                return Err(ContainerError::not_found(id));
            }
        }
        Ok(())
    }

    /// Append an extender to a binding.
    ///
    /// If the service is shared and already resolved, the extender is applied
    /// to the cached instance right away.
    pub fn extend<F>(&self, id: &str, extender: F) -> Result<()>
    where
        F: Fn(Value, &dyn Resolver) -> Result<Value> + Send + Sync + 'static,
    {
        self.check_not_locked();
        let extender = Extender::new(extender);

        if !self.inner.storage.update(id, |b| b.push_extender(extender.clone())) {
            return Err(ContainerError::not_found(id));
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            service = id,
            resolved = self.inner.services.contains(id),
            "Extending service"
        );

        if let Some(resolved) = self.inner.services.get(id) {
            let extended = extender.apply(resolved, self)?;
            self.inner.services.replace(id, extended);
        }
        Ok(())
    }

    // =========================================================================
    // Resolution Methods
    // =========================================================================

    /// Resolve a service by id.
    ///
    /// Shared bindings are built once and cached. An id with no binding that
    /// names a registered, instantiable class is autowired.
    pub fn get(&self, id: &str) -> Result<Value> {
        if id.is_empty() {
            return Err(ContainerError::InvalidId);
        }

        if let Some(cached) = self.inner.services.get(id) {
            #[cfg(feature = "logging")]
            trace!(
                target: "service_container",
                service = id,
                location = "services",
                "Service resolved from shared instance cache"
            );
            return Ok(cached);
        }

        if let Some(binding) = self.inner.storage.get(id) {
            let _guard = BuildGuard::enter(self.owner(), id)?;

            #[cfg(feature = "logging")]
            trace!(
                target: "service_container",
                service = id,
                binding_type = ?binding.binding_type(),
                "Building service"
            );

            let value = self.build(id, &binding)?;
            return Ok(if binding.is_shared() {
                self.inner.services.insert_if_absent(id, value)
            } else {
                value
            });
        }

        if id == CONTAINER_ID {
            return Ok(Value::Object(Object::new(CONTAINER_CLASS, self.clone())));
        }

        if let Some(info) = self.autowirable(id) {
            let _guard = BuildGuard::enter(self.owner(), id)?;

            #[cfg(feature = "logging")]
            trace!(target: "service_container", class = id, "Autowiring unbound class");

            return activate(self, &info, &[]);
        }

        #[cfg(feature = "logging")]
        debug!(target: "service_container", service = id, "Service not found");

        Err(ContainerError::not_found(id))
    }

    /// Check if `id` can be resolved. Never constructs anything.
    #[inline]
    pub fn has(&self, id: &str) -> bool {
        self.inner.storage.contains(id) || id == CONTAINER_ID || self.autowirable(id).is_some()
    }

    fn autowirable(&self, class: &str) -> Option<Arc<ClassInfo>> {
        self.inner
            .classes
            .get(class)
            .filter(|info| info.is_instantiable())
    }

    fn build(&self, id: &str, binding: &Binding) -> Result<Value> {
        let mut value = match binding.value_ref() {
            BindingValue::Value(value) => value.clone(),
            BindingValue::Array(entries) => resolve_argument(self, &Argument::Array(entries.clone()))?,
            BindingValue::Closure(factory) => factory.call(self)?,
            BindingValue::Class(class) => {
                let info = self
                    .inner
                    .classes
                    .get(class)
                    .ok_or_else(|| ContainerError::ClassNotFound { class: class.clone() })?;
                if !info.is_instantiable() {
                    return Err(ContainerError::NotInstantiable { class: class.clone() });
                }
                if binding.is_lazy() {
                    self.lazy_proxy(id, info, binding.arguments())
                } else {
                    activate(self, &info, binding.arguments())?
                }
            }
            BindingValue::Reference(target) => self.get(target)?,
        };

        for extender in binding.extenders() {
            value = extender.apply(value, self)?;
        }
        Ok(value)
    }

    fn lazy_proxy(&self, id: &str, info: Arc<ClassInfo>, arguments: &[(String, Argument)]) -> Value {
        let container: Weak<ContainerInner> = Arc::downgrade(&self.inner);
        let arguments = arguments.to_vec();
        let class = info.name().to_string();
        let proxy_class = helper::proxy_class_name(&class);

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            service = id,
            class = %class,
            proxy = %proxy_class,
            "Creating lazy proxy"
        );
        #[cfg(not(feature = "logging"))]
        let _ = id;

        Value::Lazy(LazyProxy::new(class, proxy_class, move || {
            let inner = container.upgrade().ok_or(ContainerError::ContainerDropped)?;
            activate(&Container { inner }, &info, &arguments)
        }))
    }

    // =========================================================================
    // Inspection Methods
    // =========================================================================

    /// Look up a container parameter.
    #[inline]
    pub fn parameter(&self, name: &str) -> Result<Value> {
        self.inner
            .parameters
            .get(name)
            .ok_or_else(|| ContainerError::ParameterNotFound { name: name.to_string() })
    }

    #[inline]
    pub fn has_parameter(&self, name: &str) -> bool {
        self.inner.parameters.contains(name)
    }

    /// All parameters sorted by name
    #[inline]
    pub fn parameters(&self) -> Vec<(String, Value)> {
        self.inner.parameters.snapshot()
    }

    /// Clone of the binding registered under `id`
    #[inline]
    pub fn binding(&self, id: &str) -> Option<Binding> {
        self.inner.storage.get(id)
    }

    /// All bindings sorted by id
    #[inline]
    pub fn bindings(&self) -> Vec<(ServiceId, Binding)> {
        self.inner.storage.snapshot()
    }

    #[inline]
    pub fn class_info(&self, class: &str) -> Option<Arc<ClassInfo>> {
        self.inner.classes.get(class)
    }

    /// Whether a shared instance is cached for `id`
    #[inline]
    pub fn is_resolved(&self, id: &str) -> bool {
        self.inner.services.contains(id)
    }

    /// Drop every cached shared and private instance.
    pub fn reset(&self) {
        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            services_dropped = self.inner.services.len(),
            privates_dropped = self.inner.privates.len(),
            "Resetting resolved instances"
        );

        self.inner.services.clear();
        self.inner.privates.clear();
    }

    /// Ids carrying `tag`, sorted
    pub fn tagged(&self, tag: &str) -> Vec<ServiceId> {
        self.inner
            .storage
            .snapshot()
            .into_iter()
            .filter(|(_, binding)| binding.has_tag(tag))
            .map(|(id, _)| id)
            .collect()
    }

    /// Resolve every service carrying `tag`, in id order
    pub fn get_tagged(&self, tag: &str) -> Result<Vec<Value>> {
        self.tagged(tag).iter().map(|id| self.get(id)).collect()
    }

    /// Number of bindings
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.storage.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.storage.is_empty()
    }

    // =========================================================================
    // Lifecycle Methods
    // =========================================================================

    /// Lock the container to prevent further registrations.
    ///
    /// The compiler locks the container it compiles.
    #[inline]
    pub fn lock(&self) {
        self.inner.locked.store(true, Ordering::Release);

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            service_count = self.inner.storage.len(),
            "Container locked - no further registrations allowed"
        );
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.inner.locked.load(Ordering::Acquire)
    }

    #[inline]
    fn check_not_locked(&self) {
        if self.inner.locked.load(Ordering::Relaxed) {
            panic!("Cannot register services: container is locked");
        }
    }

    /// Compile with default options and wrap the result.
    #[inline]
    pub fn compile(&self) -> std::result::Result<CompiledContainer, CompileError> {
        Compiler::default().build(self)
    }
}

impl PlanLookup for Container {
    #[inline]
    fn has_binding(&self, id: &str) -> bool {
        self.inner.storage.contains(id)
    }

    #[inline]
    fn has_parameter(&self, name: &str) -> bool {
        self.inner.parameters.contains(name)
    }

    #[inline]
    fn class_info(&self, class: &str) -> Option<Arc<ClassInfo>> {
        self.inner.classes.get(class)
    }
}

impl Activator for Container {
    #[inline]
    fn owner(&self) -> usize {
        Container::owner(self)
    }

    #[inline]
    fn privates(&self) -> &InstanceCache {
        &self.inner.privates
    }
}

impl Resolver for Container {
    #[inline]
    fn get(&self, id: &str) -> Result<Value> {
        Container::get(self, id)
    }

    #[inline]
    fn has(&self, id: &str) -> bool {
        Container::has(self, id)
    }

    #[inline]
    fn parameter(&self, name: &str) -> Result<Value> {
        Container::parameter(self, name)
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
            .field("service_count", &self.len())
            .field("class_count", &self.inner.classes.len())
            .field("resolved", &self.inner.services.len())
            .field("locked", &self.is_locked())
            .finish()
    }
}
