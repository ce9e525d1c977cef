//! Compilation state threaded through every strategy
//!
//! A context belongs to one service method. It tracks the locals declared so
//! far, the classes being autowired, and which ids turned out to be
//! synthetic. Nested blocks (private initializers, proxy initializers) get a
//! fresh scope of their own.

use super::helper::{self, RESOLVED};
use super::ir::{Block, Expr, Stmt};
use super::CompilerOptions;
use crate::reflection::ClassInfo;
use crate::{CompileError, Container};
use std::collections::{BTreeSet, HashMap};
use std::mem;
use std::sync::Arc;

#[derive(Debug)]
struct Scope {
    used_variables: BTreeSet<String>,
    /// Autowired class to the local holding it
    declared: HashMap<String, String>,
    /// Classes currently being autowired, outermost first
    chain: Vec<String>,
    stmts: Vec<Stmt>,
}

impl Scope {
    fn new() -> Self {
        Self {
            used_variables: BTreeSet::from([RESOLVED.to_string()]),
            declared: HashMap::new(),
            chain: Vec::new(),
            stmts: Vec::new(),
        }
    }
}

pub struct CompilationContext<'a> {
    container: &'a Container,
    options: &'a CompilerOptions,
    id: String,
    synthetic: BTreeSet<String>,
    scope: Scope,
}

impl<'a> CompilationContext<'a> {
    pub fn new(container: &'a Container, options: &'a CompilerOptions, id: &str) -> Self {
        Self {
            container,
            options,
            id: id.to_string(),
            synthetic: BTreeSet::new(),
            scope: Scope::new(),
        }
    }

    #[inline]
    pub fn container(&self) -> &'a Container {
        self.container
    }

    #[inline]
    pub fn options(&self) -> &'a CompilerOptions {
        self.options
    }

    /// Id of the service being compiled
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mark_synthetic(&mut self, id: &str) {
        self.synthetic.insert(id.to_string());
    }

    /// Metadata of an instantiable class
    pub fn instantiable_class(&self, class: &str) -> Result<Arc<ClassInfo>, CompileError> {
        let info = self
            .container
            .class_info(class)
            .ok_or_else(|| CompileError::ClassNotFound {
                id: self.id.clone(),
                class: class.to_string(),
            })?;
        match info.non_instantiable_reason() {
            Some(reason) => Err(CompileError::NotInstantiable {
                id: self.id.clone(),
                class: class.to_string(),
                reason,
            }),
            None => Ok(info),
        }
    }

    /// Local already holding an autowired instance of `class`
    #[inline]
    pub fn declared(&self, class: &str) -> Option<Expr> {
        self.scope.declared.get(class).cloned().map(Expr::Var)
    }

    /// Start autowiring `class`, failing if it is already on the chain
    pub fn enter_autowire(&mut self, class: &str) -> Result<(), CompileError> {
        if let Some(start) = self.scope.chain.iter().position(|c| c == class) {
            let mut path = self.scope.chain[start..].to_vec();
            path.push(class.to_string());
            return Err(CompileError::CircularAutowire {
                id: self.id.clone(),
                path,
            });
        }
        self.scope.chain.push(class.to_string());
        Ok(())
    }

    #[inline]
    pub fn leave_autowire(&mut self) {
        self.scope.chain.pop();
    }

    /// Bind an autowired construction to a fresh local and return it
    pub fn declare(&mut self, class: &str, value: Expr) -> Expr {
        let name = helper::next_available_variable_name(
            &helper::variable_name_for(class),
            &self.scope.used_variables,
        );
        self.scope.used_variables.insert(name.clone());
        self.scope.declared.insert(class.to_string(), name.clone());
        self.scope.stmts.push(Stmt::Let {
            name: name.clone(),
            mutable: false,
            value,
        });
        Expr::Var(name)
    }

    /// Compile `f` in a fresh scope and return it as a block
    pub fn nested<F>(&mut self, f: F) -> Result<Block, CompileError>
    where
        F: FnOnce(&mut Self) -> Result<Expr, CompileError>,
    {
        let outer = mem::replace(&mut self.scope, Scope::new());
        let result = f(self);
        let inner = mem::replace(&mut self.scope, outer);
        Ok(helper::block_returning(inner.stmts, result?))
    }

    /// Method body: declarations made so far followed by `tail`
    pub fn finish(self, tail: Vec<Stmt>) -> (Block, BTreeSet<String>) {
        let mut stmts = self.scope.stmts;
        stmts.extend(tail);
        (Block::new(stmts), self.synthetic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_avoids_collisions() {
        let container = Container::new();
        let options = CompilerOptions::default();
        let mut ctx = CompilationContext::new(&container, &options, "svc");

        assert_eq!(ctx.declare("App\\Mailer", Expr::Null), Expr::Var("mailer".into()));
        assert_eq!(ctx.declare("Other\\Mailer", Expr::Null), Expr::Var("mailer1".into()));
        assert_eq!(ctx.declare("Resolved", Expr::Null), Expr::Var("resolved1".into()));
        assert_eq!(ctx.declared("App\\Mailer"), Some(Expr::Var("mailer".into())));

        let (block, _) = ctx.finish(vec![Stmt::Return(Expr::Null)]);
        assert_eq!(block.stmts.len(), 4);
    }

    #[test]
    fn test_autowire_chain_detects_cycle() {
        let container = Container::new();
        let options = CompilerOptions::default();
        let mut ctx = CompilationContext::new(&container, &options, "svc");

        ctx.enter_autowire("A").unwrap();
        ctx.enter_autowire("B").unwrap();
        match ctx.enter_autowire("A") {
            Err(CompileError::CircularAutowire { path, .. }) => assert_eq!(path, vec!["A", "B", "A"]),
            other => panic!("unexpected {other:?}"),
        }
        ctx.leave_autowire();
        ctx.leave_autowire();
        assert!(ctx.enter_autowire("A").is_ok());
    }

    #[test]
    fn test_nested_scope_is_isolated() {
        let container = Container::new();
        let options = CompilerOptions::default();
        let mut ctx = CompilationContext::new(&container, &options, "svc");
        ctx.declare("Mailer", Expr::Null);

        let block = ctx
            .nested(|inner| {
                assert!(inner.declared("Mailer").is_none());
                Ok(inner.declare("Mailer", Expr::Int(1)))
            })
            .unwrap();

        assert_eq!(block.stmts.len(), 2);
        assert_eq!(ctx.declared("Mailer"), Some(Expr::Var("mailer".into())));
    }

    #[test]
    fn test_missing_class_is_compile_error() {
        let container = Container::new();
        container.register_class(ClassInfo::new("Shape").abstract_class());
        let options = CompilerOptions::default();
        let ctx = CompilationContext::new(&container, &options, "svc");

        assert!(matches!(ctx.instantiable_class("Ghost"), Err(CompileError::ClassNotFound { .. })));
        assert!(matches!(
            ctx.instantiable_class("Shape"),
            Err(CompileError::NotInstantiable { reason: "abstract", .. })
        ));
    }
}
