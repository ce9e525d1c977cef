//! Service definitions
//!
//! A [`Binding`] describes how one service id is constructed. Its
//! [`BindingType`] is derived from the shape of the value, so the two can
//! never disagree.

use crate::factory::{Extender, Factory};
use crate::value::{ArrayKey, Value};
use crate::{Resolver, Result};
use std::collections::BTreeSet;

/// Key identifying a service within one container
pub type ServiceId = String;

/// How a binding's value must be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingType {
    /// A plain value handed out as-is
    Value,
    /// An array whose entries may reference other services
    Array,
    /// A factory closure
    Closure,
    /// A class constructed from its constructor metadata, or a live instance
    Object,
    /// A class whose construction is deferred behind a proxy
    Lazy,
    /// An alias of another service id
    Reference,
}

/// Argument passed to a constructor or stored in an array binding
#[derive(Debug, Clone)]
pub enum Argument {
    Value(Value),
    Reference(ServiceId),
    Parameter(String),
    Array(Vec<(ArrayKey, Argument)>),
}

impl Argument {
    #[inline]
    pub fn service(id: impl Into<ServiceId>) -> Self {
        Argument::Reference(id.into())
    }

    #[inline]
    pub fn parameter(name: impl Into<String>) -> Self {
        Argument::Parameter(name.into())
    }
}

macro_rules! impl_argument_from_value {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for Argument {
                fn from(value: $ty) -> Self {
                    Argument::Value(Value::from(value))
                }
            }
        )+
    };
}

impl_argument_from_value!(Value, bool, i32, i64, f64, &str, String);

/// Construction strategy of a binding
#[derive(Debug, Clone)]
pub enum BindingValue {
    Value(Value),
    Array(Vec<(ArrayKey, Argument)>),
    Closure(Factory),
    Class(String),
    Reference(ServiceId),
}

/// Definition of a single service
#[derive(Debug, Clone)]
pub struct Binding {
    value: BindingValue,
    lazy: bool,
    shared: bool,
    arguments: Vec<(String, Argument)>,
    extenders: Vec<Extender>,
    tags: BTreeSet<String>,
}

impl Binding {
    fn with_value(value: BindingValue) -> Self {
        Self {
            value,
            lazy: false,
            shared: false,
            arguments: Vec::new(),
            extenders: Vec::new(),
            tags: BTreeSet::new(),
        }
    }

    /// A plain value, or a live object instance
    pub fn value(value: impl Into<Value>) -> Self {
        Self::with_value(BindingValue::Value(value.into()))
    }

    /// An array whose entries are resolved on every construction
    pub fn array<K, A, I>(entries: I) -> Self
    where
        K: Into<ArrayKey>,
        A: Into<Argument>,
        I: IntoIterator<Item = (K, A)>,
    {
        Self::with_value(BindingValue::Array(
            entries
                .into_iter()
                .map(|(k, a)| (k.into(), a.into()))
                .collect(),
        ))
    }

    /// A factory closure
    pub fn closure<F>(factory: F) -> Self
    where
        F: Fn(&dyn Resolver) -> Result<Value> + Send + Sync + 'static,
    {
        Self::with_value(BindingValue::Closure(Factory::new(factory)))
    }

    /// A class built from its registered constructor metadata
    pub fn object(class: impl Into<String>) -> Self {
        Self::with_value(BindingValue::Class(class.into()))
    }

    /// A class built behind a lazy proxy on first access
    pub fn lazy(class: impl Into<String>) -> Self {
        Self {
            lazy: true,
            ..Self::with_value(BindingValue::Class(class.into()))
        }
    }

    /// An alias of another service
    pub fn reference(target: impl Into<ServiceId>) -> Self {
        Self::with_value(BindingValue::Reference(target.into()))
    }

    /// Mark the binding shared: the first resolution is cached and reused
    pub fn shared(mut self) -> Self {
        self.shared = true;
        self
    }

    /// Set the shared flag explicitly
    pub fn set_shared(mut self, shared: bool) -> Self {
        self.shared = shared;
        self
    }

    /// Supply a named constructor argument
    pub fn with_argument(mut self, name: impl Into<String>, argument: impl Into<Argument>) -> Self {
        let name = name.into();
        let argument = argument.into();
        match self.arguments.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = argument,
            None => self.arguments.push((name, argument)),
        }
        self
    }

    /// Append a decorator; extenders run in registration order
    pub fn with_extender<F>(mut self, extender: F) -> Self
    where
        F: Fn(Value, &dyn Resolver) -> Result<Value> + Send + Sync + 'static,
    {
        self.extenders.push(Extender::new(extender));
        self
    }

    pub(crate) fn push_extender(&mut self, extender: Extender) {
        self.extenders.push(extender);
    }

    /// Add a tag label
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub(crate) fn add_tag(&mut self, tag: &str) {
        self.tags.insert(tag.to_string());
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn binding_type(&self) -> BindingType {
        match &self.value {
            BindingValue::Value(Value::Object(_) | Value::Lazy(_)) => BindingType::Object,
            BindingValue::Value(_) => BindingType::Value,
            BindingValue::Array(_) => BindingType::Array,
            BindingValue::Closure(_) => BindingType::Closure,
            BindingValue::Class(_) if self.lazy => BindingType::Lazy,
            BindingValue::Class(_) => BindingType::Object,
            BindingValue::Reference(_) => BindingType::Reference,
        }
    }

    #[inline]
    pub fn value_ref(&self) -> &BindingValue {
        &self.value
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        self.binding_type() == BindingType::Array
    }

    #[inline]
    pub fn is_closure(&self) -> bool {
        self.binding_type() == BindingType::Closure
    }

    #[inline]
    pub fn is_object(&self) -> bool {
        self.binding_type() == BindingType::Object
    }

    #[inline]
    pub fn is_lazy(&self) -> bool {
        self.binding_type() == BindingType::Lazy
    }

    #[inline]
    pub fn is_reference(&self) -> bool {
        self.binding_type() == BindingType::Reference
    }

    #[inline]
    pub fn is_shared(&self) -> bool {
        self.shared
    }

    /// Class name for OBJECT and LAZY bindings built from metadata
    pub fn class(&self) -> Option<&str> {
        match &self.value {
            BindingValue::Class(class) => Some(class),
            _ => None,
        }
    }

    #[inline]
    pub fn arguments(&self) -> &[(String, Argument)] {
        &self.arguments
    }

    #[inline]
    pub fn extenders(&self) -> &[Extender] {
        &self.extenders
    }

    #[inline]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    #[inline]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}
