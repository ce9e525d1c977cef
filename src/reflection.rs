//! Class metadata
//!
//! The container builds OBJECT bindings from constructor metadata registered
//! up front, the way a reflective language would read it off the class. The
//! compiler reads the same metadata once, at compile time.
//!
//! Metadata is either written by hand with [`ClassInfo`] or derived with
//! `#[derive(Reflect)]` (feature `derive`).

use crate::factory::{Constructor, Invoker};
use crate::value::{Array, Value};
use crate::{ContainerError, Resolver, Result};
use ahash::RandomState;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// Scalar and structural parameter types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Bool,
    Int,
    Float,
    Str,
    Array,
    Mixed,
}

/// Declared type of a constructor parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamType {
    Builtin(BuiltinType),
    Class(String),
}

/// One constructor parameter
#[derive(Debug, Clone)]
pub struct Param {
    name: String,
    ty: ParamType,
    nullable: bool,
    default: Option<Value>,
}

impl Param {
    pub fn builtin(name: impl Into<String>, ty: BuiltinType) -> Self {
        Self {
            name: name.into(),
            ty: ParamType::Builtin(ty),
            nullable: false,
            default: None,
        }
    }

    pub fn class(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ParamType::Class(class.into()),
            nullable: false,
            default: None,
        }
    }

    /// Parameter typed after a Rust field type
    pub fn of<T: ParamKind>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: T::param_type(),
            nullable: T::nullable(),
            default: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn ty(&self) -> &ParamType {
        &self.ty
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    #[inline]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    #[inline]
    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }
}

/// A method callable on constructed instances
#[derive(Clone)]
pub struct MethodInfo {
    name: String,
    public: bool,
    invoker: Invoker,
}

impl MethodInfo {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is_public(&self) -> bool {
        self.public
    }

    #[inline]
    pub fn invoke(&self, instance: &Value, resolver: &dyn Resolver) -> Result<Value> {
        self.invoker.invoke(instance, resolver)
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInfo")
            .field("name", &self.name)
            .field("public", &self.public)
            .finish()
    }
}

/// Constructor signature and entry points of a class
///
/// ```rust
/// use service_container::{BuiltinType, ClassInfo, Param, Value};
///
/// struct Mailer {
///     host: String,
///     port: i64,
/// }
///
/// let info = ClassInfo::new("App\\Mailer")
///     .param(Param::builtin("host", BuiltinType::Str))
///     .param(Param::builtin("port", BuiltinType::Int).with_default(25))
///     .constructor(|args| {
///         Ok(Value::object("App\\Mailer", Mailer {
///             host: args[0].as_str().unwrap_or_default().to_string(),
///             port: args[1].as_int().unwrap_or(25),
///         }))
///     });
///
/// assert!(info.is_instantiable());
/// assert_eq!(info.params().len(), 2);
/// ```
#[derive(Clone)]
pub struct ClassInfo {
    name: String,
    params: Vec<Param>,
    constructor: Option<Constructor>,
    anonymous: bool,
    is_abstract: bool,
    methods: Vec<MethodInfo>,
}

impl ClassInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            constructor: None,
            anonymous: false,
            is_abstract: false,
            methods: Vec::new(),
        }
    }

    /// Append a constructor parameter
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.constructor = Some(Constructor::new(constructor));
        self
    }

    /// Mark the class anonymous; anonymous classes are never constructed by the container
    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Register a public method
    pub fn method<F>(self, name: impl Into<String>, invoker: F) -> Self
    where
        F: Fn(&Value, &dyn Resolver) -> Result<Value> + Send + Sync + 'static,
    {
        self.push_method(name.into(), true, invoker)
    }

    /// Register a non-public method
    pub fn private_method<F>(self, name: impl Into<String>, invoker: F) -> Self
    where
        F: Fn(&Value, &dyn Resolver) -> Result<Value> + Send + Sync + 'static,
    {
        self.push_method(name.into(), false, invoker)
    }

    fn push_method<F>(mut self, name: String, public: bool, invoker: F) -> Self
    where
        F: Fn(&Value, &dyn Resolver) -> Result<Value> + Send + Sync + 'static,
    {
        self.methods.push(MethodInfo {
            name,
            public,
            invoker: Invoker::new(invoker),
        });
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Why the class cannot be constructed, if it cannot
    pub fn non_instantiable_reason(&self) -> Option<&'static str> {
        if self.anonymous {
            Some("anonymous")
        } else if self.is_abstract {
            Some("abstract")
        } else if self.constructor.is_none() {
            Some("missing a constructor")
        } else {
            None
        }
    }

    #[inline]
    pub fn is_instantiable(&self) -> bool {
        self.non_instantiable_reason().is_none()
    }

    /// The single public method of a callable class
    pub fn invokable(&self) -> Option<&MethodInfo> {
        let mut public = self.methods.iter().filter(|m| m.public);
        match (public.next(), public.next()) {
            (Some(method), None) => Some(method),
            _ => None,
        }
    }

    pub fn method_named(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Run the constructor with positional arguments
    pub fn construct(&self, args: &[Value]) -> Result<Value> {
        match (&self.constructor, self.non_instantiable_reason()) {
            (Some(constructor), None) => constructor.construct(args),
            _ => Err(ContainerError::NotInstantiable {
                class: self.name.clone(),
            }),
        }
    }
}

impl fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInfo")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("instantiable", &self.is_instantiable())
            .field("methods", &self.methods)
            .finish()
    }
}

/// Registry of class metadata keyed by class name
pub struct ClassRegistry {
    classes: DashMap<String, Arc<ClassInfo>, RandomState>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self {
            classes: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
        }
    }

    #[inline]
    pub fn register(&self, info: ClassInfo) {
        self.classes.insert(info.name.clone(), Arc::new(info));
    }

    #[inline]
    pub fn get(&self, class: &str) -> Option<Arc<ClassInfo>> {
        self.classes.get(class).map(|entry| Arc::clone(entry.value()))
    }

    #[inline]
    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("count", &self.len())
            .finish()
    }
}

// =============================================================================
// Typed metadata
// =============================================================================

/// Types that describe their own constructor metadata.
///
/// Usually derived with `#[derive(Reflect)]`.
pub trait Reflect: Send + Sync + Sized + 'static {
    fn class_name() -> &'static str;

    fn class_info() -> ClassInfo;
}

/// Maps a Rust field type to a constructor parameter type
pub trait ParamKind {
    fn param_type() -> ParamType;

    fn nullable() -> bool {
        false
    }
}

/// Converts a resolved argument into a constructor field
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

static NULL: Value = Value::Null;

/// Positional argument or `Null` when the caller passed fewer arguments
#[inline]
pub fn argument(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&NULL)
}

macro_rules! impl_builtin_param {
    ($ty:ty, $builtin:expr, $expected:literal, |$v:ident| $convert:expr) => {
        impl ParamKind for $ty {
            fn param_type() -> ParamType {
                ParamType::Builtin($builtin)
            }
        }

        impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<Self> {
                let $v = value;
                $convert.ok_or_else(|| ContainerError::type_mismatch($expected, value.type_name()))
            }
        }
    };
}

impl_builtin_param!(bool, BuiltinType::Bool, "bool", |v| v.as_bool());
impl_builtin_param!(i64, BuiltinType::Int, "int", |v| v.as_int());
impl_builtin_param!(i32, BuiltinType::Int, "int", |v| v.as_int().and_then(|i| i32::try_from(i).ok()));
impl_builtin_param!(u32, BuiltinType::Int, "int", |v| v.as_int().and_then(|i| u32::try_from(i).ok()));
impl_builtin_param!(u64, BuiltinType::Int, "int", |v| v.as_int().and_then(|i| u64::try_from(i).ok()));
impl_builtin_param!(usize, BuiltinType::Int, "int", |v| v.as_int().and_then(|i| usize::try_from(i).ok()));
impl_builtin_param!(f64, BuiltinType::Float, "float", |v| v.as_float());
impl_builtin_param!(String, BuiltinType::Str, "string", |v| v.as_str().map(str::to_string));
impl_builtin_param!(Array, BuiltinType::Array, "array", |v| v.as_array().cloned());

impl ParamKind for Value {
    fn param_type() -> ParamType {
        ParamType::Builtin(BuiltinType::Mixed)
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl<T: ParamKind> ParamKind for Option<T> {
    fn param_type() -> ParamType {
        T::param_type()
    }

    fn nullable() -> bool {
        true
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: Reflect> ParamKind for Arc<T> {
    fn param_type() -> ParamType {
        ParamType::Class(T::class_name().to_string())
    }
}

impl<T: Reflect> FromValue for Arc<T> {
    fn from_value(value: &Value) -> Result<Self> {
        let object = match value {
            Value::Object(object) => object,
            Value::Lazy(proxy) => match proxy.target()? {
                Value::Object(object) => object,
                other => return Err(ContainerError::type_mismatch("object", other.type_name())),
            },
            other => return Err(ContainerError::type_mismatch("object", other.type_name())),
        };
        object
            .downcast_arc::<T>()
            .ok_or_else(|| ContainerError::type_mismatch(T::class_name(), "object of another class"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Clock;

    impl Reflect for Clock {
        fn class_name() -> &'static str {
            "App\\Clock"
        }

        fn class_info() -> ClassInfo {
            ClassInfo::new("App\\Clock").constructor(|_| Ok(Value::object("App\\Clock", Clock)))
        }
    }

    #[test]
    fn test_instantiable_reasons() {
        let ok = ClassInfo::new("A").constructor(|_| Ok(Value::Null));
        assert!(ok.is_instantiable());

        assert_eq!(ClassInfo::new("B").non_instantiable_reason(), Some("missing a constructor"));
        assert_eq!(
            ClassInfo::new("C").constructor(|_| Ok(Value::Null)).anonymous().non_instantiable_reason(),
            Some("anonymous")
        );
        assert!(ClassInfo::new("D").abstract_class().construct(&[]).is_err());
    }

    #[test]
    fn test_invokable_requires_exactly_one_public_method() {
        let one = ClassInfo::new("Factory")
            .method("create", |_, _| Ok(Value::Int(1)))
            .private_method("helper", |_, _| Ok(Value::Null));
        assert_eq!(one.invokable().map(MethodInfo::name), Some("create"));

        let two = ClassInfo::new("Factory")
            .method("create", |_, _| Ok(Value::Null))
            .method("destroy", |_, _| Ok(Value::Null));
        assert!(two.invokable().is_none());
        assert!(ClassInfo::new("Empty").invokable().is_none());
    }

    #[test]
    fn test_param_of_rust_types() {
        let p = Param::of::<Option<Arc<Clock>>>("clock");
        assert_eq!(p.ty(), &ParamType::Class("App\\Clock".into()));
        assert!(p.is_nullable());

        let port = Param::of::<i64>("port").with_default(80);
        assert_eq!(port.ty(), &ParamType::Builtin(BuiltinType::Int));
        assert!(port.is_optional());
    }

    #[test]
    fn test_from_value_conversions() {
        assert_eq!(i32::from_value(&Value::Int(7)).unwrap(), 7);
        assert!(u32::from_value(&Value::Int(-1)).is_err());
        assert_eq!(Option::<String>::from_value(&Value::Null).unwrap(), None);
        assert_eq!(f64::from_value(&Value::Int(2)).unwrap(), 2.0);

        let clock = Value::object("App\\Clock", Clock);
        assert!(Arc::<Clock>::from_value(&clock).is_ok());
        assert!(Arc::<Clock>::from_value(&Value::Int(1)).is_err());
    }

    #[test]
    fn test_argument_defaults_to_null() {
        let args = [Value::Int(1)];
        assert_eq!(argument(&args, 0), &Value::Int(1));
        assert!(argument(&args, 3).is_null());
    }

    #[test]
    fn test_registry() {
        let registry = ClassRegistry::new();
        registry.register(Clock::class_info());
        assert!(registry.contains("App\\Clock"));
        assert_eq!(registry.get("App\\Clock").unwrap().name(), "App\\Clock");
        assert!(registry.get("App\\Missing").is_none());
    }
}
