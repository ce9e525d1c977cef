//! Intermediate representation of compiled service methods
//!
//! Every compiled service is a [`Method`] whose body is a small block of
//! statements. The same tree is executed by
//! [`CompiledContainer`](crate::CompiledContainer) and printed as Rust source
//! by the printer, so the two can never drift apart.

use crate::value::{ArrayKey, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Expression producing a [`Value`]
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<(ArrayKey, Expr)>),
    /// A local declared earlier in the same block
    Var(String),
    /// Resolve another service through the container
    Service(String),
    /// Container parameter
    Parameter(String),
    /// Live value of a synthetic service
    Instance(String),
    /// Call the factory closure bound to an id
    Factory(String),
    /// Run a class constructor
    New { class: String, args: Vec<Expr> },
    /// Call a method of a class on `target`
    Invoke {
        class: String,
        method: String,
        target: Box<Expr>,
    },
    /// Private instance cached under `key`, built by `init` on first use
    Private { key: String, init: Block },
    /// Lazy proxy whose target is built by `init` on first access
    Proxy {
        class: String,
        proxy_class: String,
        init: Block,
    },
    /// Apply extender `index` of service `id` to `value`
    Extend {
        id: String,
        index: usize,
        value: Box<Expr>,
    },
}

impl Expr {
    /// Literal expression for a value, if it has no live objects
    pub fn literal(value: &Value) -> Option<Expr> {
        Some(match value {
            Value::Null => Expr::Null,
            Value::Bool(b) => Expr::Bool(*b),
            Value::Int(i) => Expr::Int(*i),
            Value::Float(x) => Expr::Float(*x),
            Value::Str(s) => Expr::Str(s.clone()),
            Value::Array(entries) => Expr::Array(
                entries
                    .iter()
                    .map(|(k, v)| Some((k.clone(), Expr::literal(v)?)))
                    .collect::<Option<_>>()?,
            ),
            Value::Object(_) | Value::Lazy(_) => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let {
        name: String,
        mutable: bool,
        value: Expr,
    },
    Assign {
        name: String,
        value: Expr,
    },
    /// Cache the local under `id` as a shared instance and rebind it to the cached value
    Share {
        id: String,
        name: String,
    },
    Return(Expr),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self { stmts }
    }
}

/// One generated resolver method
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub id: String,
    pub shared: bool,
    pub body: Block,
}

/// Output of a compilation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledArtifact {
    pub container_name: String,
    /// Service id to generated method name
    pub method_mapping: BTreeMap<String, String>,
    /// Generated method name to method
    pub methods: BTreeMap<String, Method>,
    /// Parameters that could be written out as literals
    pub parameters: BTreeMap<String, Value>,
    /// Ids that exist only at compile time
    pub removed_ids: BTreeSet<String>,
    /// Ids whose value is a live object supplied at run time
    pub synthetic_ids: BTreeSet<String>,
    /// Shared ids whose instance slot starts empty
    pub uninitialized_services: BTreeSet<String>,
}

impl CompiledArtifact {
    /// Method compiled for `id`
    pub fn method_for(&self, id: &str) -> Option<&Method> {
        self.methods.get(self.method_mapping.get(id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_of_nested_array() {
        let value = Value::array([("a", Value::list([1, 2])), ("b", Value::from("x"))]);
        let expr = Expr::literal(&value).unwrap();
        assert_eq!(
            expr,
            Expr::Array(vec![
                (
                    ArrayKey::from("a"),
                    Expr::Array(vec![(ArrayKey::Index(0), Expr::Int(1)), (ArrayKey::Index(1), Expr::Int(2))])
                ),
                (ArrayKey::from("b"), Expr::Str("x".into())),
            ])
        );
    }

    #[test]
    fn test_literal_rejects_objects() {
        assert!(Expr::literal(&Value::list([Value::object("Clock", ())])).is_none());
    }
}
