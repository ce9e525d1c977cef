//! Dynamic service values
//!
//! Every service resolves to a [`Value`]. Scalars and arrays have value
//! semantics: each resolution of a non-shared binding hands out a fresh deep
//! copy. Objects are reference counted and keep their identity, which is
//! what makes a shared binding observable as a singleton.

use crate::factory::LazyProxy;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Ordered key/value sequence, the container's array type
pub type Array = Vec<(ArrayKey, Value)>;

/// Key of an array entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArrayKey {
    Index(i64),
    Name(String),
}

impl From<i64> for ArrayKey {
    fn from(index: i64) -> Self {
        ArrayKey::Index(index)
    }
}

impl From<i32> for ArrayKey {
    fn from(index: i32) -> Self {
        ArrayKey::Index(i64::from(index))
    }
}

impl From<usize> for ArrayKey {
    fn from(index: usize) -> Self {
        ArrayKey::Index(index as i64)
    }
}

impl From<&str> for ArrayKey {
    fn from(name: &str) -> Self {
        ArrayKey::Name(name.to_string())
    }
}

impl From<String> for ArrayKey {
    fn from(name: String) -> Self {
        ArrayKey::Name(name)
    }
}

impl fmt::Display for ArrayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayKey::Index(index) => write!(f, "{index}"),
            ArrayKey::Name(name) => write!(f, "{name}"),
        }
    }
}

/// A constructed object together with the class it was built as.
///
/// Cloning an `Object` clones the handle, not the instance.
#[derive(Clone)]
pub struct Object {
    class: Arc<str>,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Object {
    /// Wrap a freshly constructed instance
    #[inline]
    pub fn new<T: Any + Send + Sync>(class: impl Into<Arc<str>>, instance: T) -> Self {
        Self {
            class: class.into(),
            inner: Arc::new(instance),
        }
    }

    /// Wrap an instance that is already behind an `Arc`
    #[inline]
    pub fn from_arc<T: Any + Send + Sync>(class: impl Into<Arc<str>>, instance: Arc<T>) -> Self {
        Self {
            class: class.into(),
            inner: instance,
        }
    }

    /// Class name the object was constructed as
    #[inline]
    pub fn class(&self) -> &str {
        &self.class
    }

    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    #[inline]
    pub fn downcast_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    /// Whether both handles point at the same instance
    #[inline]
    pub fn ptr_eq(&self, other: &Object) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.class)
            .field("ptr", &Arc::as_ptr(&self.inner))
            .finish()
    }
}

/// A resolved service value
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Array),
    Object(Object),
    Lazy(LazyProxy),
}

impl Value {
    /// Build an array value from key/value pairs
    ///
    /// ```rust
    /// use service_container::Value;
    ///
    /// let value = Value::array([("a", 1), ("b", 2)]);
    /// assert_eq!(value.lookup("b").and_then(Value::as_int), Some(2));
    /// ```
    pub fn array<K, V, I>(entries: I) -> Self
    where
        K: Into<ArrayKey>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Array(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a sequentially indexed array value
    pub fn list<V, I>(items: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (ArrayKey::from(i), v.into()))
                .collect(),
        )
    }

    /// Wrap an instance as an object value
    #[inline]
    pub fn object<T: Any + Send + Sync>(class: impl Into<Arc<str>>, instance: T) -> Self {
        Value::Object(Object::new(class, instance))
    }

    /// Short name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Lazy(_) => "lazy proxy",
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Array> {
        match self {
            Value::Array(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_lazy(&self) -> Option<&LazyProxy> {
        match self {
            Value::Lazy(proxy) => Some(proxy),
            _ => None,
        }
    }

    /// Look up an array entry by key
    pub fn lookup(&self, key: impl Into<ArrayKey>) -> Option<&Value> {
        let key = key.into();
        self.as_array()?
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    /// Downcast an object value to a concrete instance
    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_object()?.downcast_ref::<T>()
    }

    /// Whether the value can be written out as source (no live objects)
    pub fn is_literal(&self) -> bool {
        match self {
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_) => true,
            Value::Array(entries) => entries.iter().all(|(_, v)| v.is_literal()),
            Value::Object(_) | Value::Lazy(_) => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Lazy(a), Value::Lazy(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x:?})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Array(entries) => f
                .debug_map()
                .entries(entries.iter().map(|(k, v)| (k, v)))
                .finish(),
            Value::Object(object) => object.fmt(f),
            Value::Lazy(proxy) => proxy.fmt(f),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Array> for Value {
    fn from(entries: Array) -> Self {
        Value::Array(entries)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
