//! Compiled container
//!
//! A `CompiledContainer` resolves services through the methods produced by the
//! [`Compiler`](crate::Compiler) instead of walking the binding graph. Methods
//! either come straight from a [`CompiledArtifact`] or from a generated Rust
//! module loaded through [`GeneratedContainer`].
//!
//! Closures, extenders, constructors and live objects cannot be written out
//! as source, so they are looked up by id in the runtime container the
//! compiled container wraps. Unbound classes are autowired by the compiled
//! container itself, so their dependencies come from its own caches.

use crate::autowire::{Activator, PlanLookup, activate};
use crate::binding::BindingValue;
use crate::build_stack::BuildGuard;
use crate::compiler::{Block, CompiledArtifact, Expr, Stmt};
use crate::factory::LazyProxy;
use crate::reflection::ClassInfo;
use crate::storage::InstanceCache;
use crate::value::Value;
use crate::{Container, ContainerError, Resolver, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Weak};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Signature of a generated resolver method
pub type MethodFn = fn(&CompiledContainer) -> Result<Value>;

/// Static description of a generated container module
#[derive(Debug)]
pub struct GeneratedContainer {
    pub name: &'static str,
    pub method_mapping: &'static [(&'static str, &'static str)],
    pub methods: &'static [(&'static str, MethodFn)],
    pub removed_ids: &'static [&'static str],
    pub synthetic_ids: &'static [&'static str],
    pub uninitialized_services: &'static [&'static str],
    pub parameters: fn() -> Vec<(&'static str, Value)>,
}

enum Methods {
    Interpreted(CompiledArtifact),
    Native(HashMap<&'static str, MethodFn>),
}

struct CompiledInner {
    name: String,
    method_mapping: BTreeMap<String, String>,
    removed_ids: BTreeSet<String>,
    synthetic_ids: BTreeSet<String>,
    methods: Methods,
    runtime: Container,
    services: InstanceCache,
    privates: InstanceCache,
    parameters: InstanceCache,
}

/// Container resolving through compiled methods.
///
/// Cheap to clone: clones share the same instance cache.
#[derive(Clone)]
pub struct CompiledContainer {
    inner: Arc<CompiledInner>,
}

impl CompiledContainer {
    /// Execute `artifact` against the closures and classes of `runtime`
    pub fn new(artifact: CompiledArtifact, runtime: Container) -> Self {
        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            container = %artifact.container_name,
            services = artifact.method_mapping.len(),
            "Creating compiled container"
        );

        let parameters = InstanceCache::new();
        for (name, value) in &artifact.parameters {
            parameters.replace(name.clone(), value.clone());
        }

        Self {
            inner: Arc::new(CompiledInner {
                name: artifact.container_name.clone(),
                method_mapping: artifact.method_mapping.clone(),
                removed_ids: artifact.removed_ids.clone(),
                synthetic_ids: artifact.synthetic_ids.clone(),
                methods: Methods::Interpreted(artifact),
                runtime,
                services: InstanceCache::new(),
                privates: InstanceCache::new(),
                parameters,
            }),
        }
    }

    /// Load a generated module
    pub fn from_generated(generated: &GeneratedContainer, runtime: Container) -> Self {
        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            container = generated.name,
            services = generated.method_mapping.len(),
            "Loading generated container"
        );

        let parameters = InstanceCache::new();
        for (name, value) in (generated.parameters)() {
            parameters.replace(name, value);
        }

        let owned = |ids: &[&str]| ids.iter().map(|id| id.to_string()).collect::<BTreeSet<_>>();

        Self {
            inner: Arc::new(CompiledInner {
                name: generated.name.to_string(),
                method_mapping: generated
                    .method_mapping
                    .iter()
                    .map(|(id, name)| (id.to_string(), name.to_string()))
                    .collect(),
                removed_ids: owned(generated.removed_ids),
                synthetic_ids: owned(generated.synthetic_ids),
                methods: Methods::Native(generated.methods.iter().copied().collect()),
                runtime,
                services: InstanceCache::new(),
                privates: InstanceCache::new(),
                parameters,
            }),
        }
    }

    #[inline]
    fn owner(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve a service.
    ///
    /// Order: cached instance, compiled method, removed id (not found), then
    /// autowiring of an unbound class.
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
                "Compiled service resolved from cache"
            );
            return Ok(cached);
        }

        if let Some(method) = self.inner.method_mapping.get(id) {
            let _guard = BuildGuard::enter(self.owner(), id)?;

            #[cfg(feature = "logging")]
            trace!(target: "service_container", service = id, method = %method, "Calling compiled method");

            return self.call(method);
        }

        if self.inner.removed_ids.contains(id) {
            return Err(ContainerError::not_found(id));
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

    /// Check if `id` can be resolved. Removed ids are hidden unless set again.
    pub fn has(&self, id: &str) -> bool {
        self.inner.method_mapping.contains_key(id)
            || self.inner.services.contains(id)
            || (!self.inner.removed_ids.contains(id) && self.autowirable(id).is_some())
    }

    fn autowirable(&self, class: &str) -> Option<Arc<ClassInfo>> {
        self.inner
            .runtime
            .class_info(class)
            .filter(|info| info.is_instantiable())
    }

    /// Set or override a service instance, typically a synthetic one.
    pub fn set(&self, id: impl Into<String>, value: impl Into<Value>) {
        let id = id.into();

        #[cfg(feature = "logging")]
        debug!(
            target: "service_container",
            service = %id,
            synthetic = self.inner.synthetic_ids.contains(&id),
            "Setting service instance"
        );

        self.inner.services.replace(id, value.into());
    }

    /// Whether an instance is cached for `id`
    #[inline]
    pub fn initialized(&self, id: &str) -> bool {
        self.inner.services.contains(id)
    }

    /// Ids that existed only at compile time
    #[inline]
    pub fn get_removed_ids(&self) -> &BTreeSet<String> {
        &self.inner.removed_ids
    }

    #[inline]
    pub fn synthetic_ids(&self) -> &BTreeSet<String> {
        &self.inner.synthetic_ids
    }

    /// Service id to generated method name
    #[inline]
    pub fn method_mapping(&self) -> &BTreeMap<String, String> {
        &self.inner.method_mapping
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The artifact being executed, when not loaded from generated source
    pub fn artifact(&self) -> Option<&CompiledArtifact> {
        match &self.inner.methods {
            Methods::Interpreted(artifact) => Some(artifact),
            Methods::Native(_) => None,
        }
    }

    #[inline]
    pub fn runtime(&self) -> &Container {
        &self.inner.runtime
    }

    fn call(&self, method: &str) -> Result<Value> {
        match &self.inner.methods {
            Methods::Interpreted(artifact) => {
                let method = artifact
                    .methods
                    .get(method)
                    .ok_or_else(|| ContainerError::Internal(format!("missing compiled method {method}")))?;
                self.eval_block(&method.body)
            }
            Methods::Native(methods) => {
                let method = methods
                    .get(method)
                    .ok_or_else(|| ContainerError::Internal(format!("missing generated method {method}")))?;
                method(self)
            }
        }
    }

    // =========================================================================
    // Operations used by compiled methods
    // =========================================================================

    /// Container parameter, from the compiled table or the runtime container
    pub fn parameter(&self, name: &str) -> Result<Value> {
        match self.inner.parameters.get(name) {
            Some(value) => Ok(value),
            None => self.inner.runtime.parameter(name),
        }
    }

    /// Run the constructor of a registered class
    pub fn construct(&self, class: &str, args: Vec<Value>) -> Result<Value> {
        let info = self
            .inner
            .runtime
            .class_info(class)
            .ok_or_else(|| ContainerError::ClassNotFound { class: class.to_string() })?;
        info.construct(&args)
    }

    /// Call `method` of `class` on `target`
    pub fn invoke(&self, class: &str, method: &str, target: &Value) -> Result<Value> {
        let info = self
            .inner
            .runtime
            .class_info(class)
            .ok_or_else(|| ContainerError::ClassNotFound { class: class.to_string() })?;
        let method = info
            .method_named(method)
            .ok_or_else(|| ContainerError::Internal(format!("{class} has no method {method}")))?;
        method.invoke(target, self)
    }

    /// Private instance cached under `key`, built by `init` the first time
    pub fn private<F>(&self, key: &str, init: F) -> Result<Value>
    where
        F: FnOnce(&CompiledContainer) -> Result<Value>,
    {
        if let Some(instance) = self.inner.privates.get(key) {
            return Ok(instance);
        }
        let instance = init(self)?;
        Ok(self.inner.privates.insert_if_absent(key, instance))
    }

    /// Lazy proxy whose target is built by `init` on first access
    pub fn proxy<F>(&self, class: &str, proxy_class: &str, init: F) -> Value
    where
        F: Fn(&CompiledContainer) -> Result<Value> + Send + Sync + 'static,
    {
        let container: Weak<CompiledInner> = Arc::downgrade(&self.inner);
        Value::Lazy(LazyProxy::new(class, proxy_class, move || {
            let inner = container.upgrade().ok_or(ContainerError::ContainerDropped)?;
            init(&CompiledContainer { inner })
        }))
    }

    /// Call the factory closure bound to `id`
    pub fn factory(&self, id: &str) -> Result<Value> {
        match self.inner.runtime.binding(id).map(|b| b.value_ref().clone()) {
            Some(BindingValue::Closure(factory)) => factory.call(self),
            _ => Err(ContainerError::Internal(format!("{id} is not bound to a factory"))),
        }
    }

    /// Live value of a synthetic service
    pub fn instance(&self, id: &str) -> Result<Value> {
        match self.inner.runtime.binding(id).map(|b| b.value_ref().clone()) {
            Some(BindingValue::Value(value)) => Ok(value),
            _ => Err(ContainerError::SyntheticNotSet { id: id.to_string() }),
        }
    }

    /// Apply extender `index` of `id` to `value`
    pub fn extend(&self, id: &str, index: usize, value: Value) -> Result<Value> {
        let extender = self
            .inner
            .runtime
            .binding(id)
            .and_then(|b| b.extenders().get(index).cloned())
            .ok_or_else(|| ContainerError::Internal(format!("{id} has no extender {index}")))?;
        extender.apply(value, self)
    }

    /// Cache a shared instance; returns the instance every caller will observe
    #[inline]
    pub fn share(&self, id: &str, value: Value) -> Value {
        self.inner.services.insert_if_absent(id, value)
    }

    // =========================================================================
    // IR evaluation
    // =========================================================================

    fn eval_block(&self, block: &Block) -> Result<Value> {
        let mut locals: HashMap<&str, Value> = HashMap::new();

        for stmt in &block.stmts {
            match stmt {
                Stmt::Let { name, value, .. } | Stmt::Assign { name, value } => {
                    let value = self.eval(value, &locals)?;
                    locals.insert(name, value);
                }
                Stmt::Share { id, name } => {
                    let value = local(&locals, name)?;
                    locals.insert(name, self.share(id, value));
                }
                Stmt::Return(expr) => return self.eval(expr, &locals),
            }
        }

        Err(ContainerError::Internal("compiled block has no return".to_string()))
    }

    fn eval(&self, expr: &Expr, locals: &HashMap<&str, Value>) -> Result<Value> {
        match expr {
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(i) => Ok(Value::Int(*i)),
            Expr::Float(x) => Ok(Value::Float(*x)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Array(entries) => entries
                .iter()
                .map(|(key, value)| Ok((key.clone(), self.eval(value, locals)?)))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Expr::Var(name) => local(locals, name),
            Expr::Service(id) => self.get(id),
            Expr::Parameter(name) => self.parameter(name),
            Expr::Instance(id) => self.instance(id),
            Expr::Factory(id) => self.factory(id),
            Expr::New { class, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, locals))
                    .collect::<Result<Vec<_>>>()?;
                self.construct(class, args)
            }
            Expr::Invoke { class, method, target } => {
                let target = self.eval(target, locals)?;
                self.invoke(class, method, &target)
            }
            Expr::Private { key, init } => self.private(key, |c| c.eval_block(init)),
            Expr::Proxy { class, proxy_class, init } => {
                let init = init.clone();
                Ok(self.proxy(class, proxy_class, move |c| c.eval_block(&init)))
            }
            Expr::Extend { id, index, value } => {
                let value = self.eval(value, locals)?;
                self.extend(id, *index, value)
            }
        }
    }
}

fn local(locals: &HashMap<&str, Value>, name: &str) -> Result<Value> {
    locals
        .get(name)
        .cloned()
        .ok_or_else(|| ContainerError::Internal(format!("undeclared local {name}")))
}

impl PlanLookup for CompiledContainer {
    /// Bindings compiled from the runtime container, plus instances set later
    #[inline]
    fn has_binding(&self, id: &str) -> bool {
        self.inner.services.contains(id) || PlanLookup::has_binding(&self.inner.runtime, id)
    }

    #[inline]
    fn has_parameter(&self, name: &str) -> bool {
        self.inner.parameters.contains(name) || self.inner.runtime.has_parameter(name)
    }

    #[inline]
    fn class_info(&self, class: &str) -> Option<Arc<ClassInfo>> {
        self.inner.runtime.class_info(class)
    }
}

impl Activator for CompiledContainer {
    #[inline]
    fn owner(&self) -> usize {
        CompiledContainer::owner(self)
    }

    #[inline]
    fn privates(&self) -> &InstanceCache {
        &self.inner.privates
    }
}

impl Resolver for CompiledContainer {
    #[inline]
    fn get(&self, id: &str) -> Result<Value> {
        CompiledContainer::get(self, id)
    }

    #[inline]
    fn has(&self, id: &str) -> bool {
        CompiledContainer::has(self, id)
    }

    #[inline]
    fn parameter(&self, name: &str) -> Result<Value> {
        CompiledContainer::parameter(self, name)
    }
}

impl std::fmt::Debug for CompiledContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledContainer")
            .field("name", &self.inner.name)
            .field("service_count", &self.inner.method_mapping.len())
            .field("resolved", &self.inner.services.len())
            .field("native", &matches!(self.inner.methods, Methods::Native(_)))
            .finish()
    }
}
