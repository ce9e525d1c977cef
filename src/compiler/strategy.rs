//! Per-binding code generation strategies
//!
//! Exactly one [`Strategy`] claims each binding, chosen by its
//! [`BindingType`]. Every strategy emits the expression that reproduces what
//! the runtime container does for the same binding.

use super::context::CompilationContext;
use super::helper;
use super::ir::Expr;
use crate::autowire::{ParamSource, plan_constructor};
use crate::binding::{Argument, Binding, BindingType, BindingValue};
use crate::reflection::ClassInfo;
use crate::value::{ArrayKey, Value};
use crate::CompileError;

#[cfg(feature = "logging")]
use tracing::trace;

/// Code generation strategy of a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Value,
    Array,
    Closure,
    Object,
    Lazy,
    Reference,
}

impl Strategy {
    pub fn for_binding(binding: &Binding) -> Self {
        match binding.binding_type() {
            BindingType::Value => Strategy::Value,
            BindingType::Array => Strategy::Array,
            BindingType::Closure => Strategy::Closure,
            BindingType::Object => Strategy::Object,
            BindingType::Lazy => Strategy::Lazy,
            BindingType::Reference => Strategy::Reference,
        }
    }

    /// Base expression of the binding, before extenders and sharing
    pub fn compile(self, binding: &Binding, ctx: &mut CompilationContext<'_>) -> Result<Expr, CompileError> {
        #[cfg(feature = "logging")]
        trace!(
            target: "service_container",
            service = ctx.id(),
            strategy = ?self,
            "Compiling binding"
        );

        match (self, binding.value_ref()) {
            (Strategy::Value | Strategy::Object, BindingValue::Value(value)) => Ok(compile_value(value, ctx)),
            (Strategy::Array, BindingValue::Array(entries)) => compile_array(entries, ctx),
            (Strategy::Closure, BindingValue::Closure(_)) => Ok(Expr::Factory(ctx.id().to_string())),
            (Strategy::Object, BindingValue::Class(class)) => {
                let info = ctx.instantiable_class(class)?;
                compile_object(&info, binding.arguments(), ctx)
            }
            (Strategy::Lazy, BindingValue::Class(class)) => {
                let info = ctx.instantiable_class(class)?;
                let init = ctx.nested(|ctx| compile_object(&info, binding.arguments(), ctx))?;
                Ok(Expr::Proxy {
                    class: info.name().to_string(),
                    proxy_class: helper::proxy_class_name(info.name()),
                    init,
                })
            }
            (Strategy::Reference, BindingValue::Reference(target)) => Ok(Expr::Service(target.clone())),
            (strategy, _) => Err(CompileError::UnsupportedValue {
                id: ctx.id().to_string(),
                reason: format!("{strategy:?} strategy does not match the binding value"),
            }),
        }
    }
}

/// Literal, or the live value rehydrated at run time
fn compile_value(value: &Value, ctx: &mut CompilationContext<'_>) -> Expr {
    Expr::literal(value).unwrap_or_else(|| {
        let id = ctx.id().to_string();
        ctx.mark_synthetic(&id);
        Expr::Instance(id)
    })
}

fn compile_array(entries: &[(ArrayKey, Argument)], ctx: &mut CompilationContext<'_>) -> Result<Expr, CompileError> {
    entries
        .iter()
        .map(|(key, argument)| Ok((key.clone(), compile_argument(argument, ctx)?)))
        .collect::<Result<Vec<_>, _>>()
        .map(Expr::Array)
}

fn compile_argument(argument: &Argument, ctx: &CompilationContext<'_>) -> Result<Expr, CompileError> {
    match argument {
        Argument::Value(value) => literal(value, ctx),
        Argument::Reference(id) => Ok(Expr::Service(id.clone())),
        Argument::Parameter(name) => Ok(Expr::Parameter(name.clone())),
        Argument::Array(entries) => entries
            .iter()
            .map(|(key, argument)| Ok((key.clone(), compile_argument(argument, ctx)?)))
            .collect::<Result<Vec<_>, _>>()
            .map(Expr::Array),
    }
}

fn literal(value: &Value, ctx: &CompilationContext<'_>) -> Result<Expr, CompileError> {
    Expr::literal(value).ok_or_else(|| CompileError::UnsupportedValue {
        id: ctx.id().to_string(),
        reason: format!("{} argument cannot be written as a literal", value.type_name()),
    })
}

/// Construction of a class, or the call of its single public method
fn compile_object(
    info: &ClassInfo,
    arguments: &[(String, Argument)],
    ctx: &mut CompilationContext<'_>,
) -> Result<Expr, CompileError> {
    let Some(method) = info.invokable() else {
        return compile_construction(info, arguments, ctx);
    };

    let init = ctx.nested(|ctx| compile_construction(info, arguments, ctx))?;
    Ok(Expr::Invoke {
        class: info.name().to_string(),
        method: method.name().to_string(),
        target: Box::new(Expr::Private {
            key: helper::private_key(info.name(), arguments),
            init,
        }),
    })
}

fn compile_construction(
    info: &ClassInfo,
    arguments: &[(String, Argument)],
    ctx: &mut CompilationContext<'_>,
) -> Result<Expr, CompileError> {
    let plan = plan_constructor(info, arguments, ctx.container()).map_err(|e| {
        CompileError::UnresolvableParameter {
            id: ctx.id().to_string(),
            class: e.class,
            param: e.param,
            reason: e.reason,
        }
    })?;

    let mut args = Vec::with_capacity(plan.len());
    for source in plan {
        args.push(match source {
            ParamSource::Argument(argument) => compile_argument(&argument, ctx)?,
            ParamSource::Parameter(name) => Expr::Parameter(name),
            ParamSource::Service(id) => Expr::Service(id),
            ParamSource::Autowire(class) => compile_autowire(&class, ctx)?,
            ParamSource::Default(value) => literal(&value, ctx)?,
            ParamSource::Null => Expr::Null,
        });
    }

    Ok(Expr::New {
        class: info.name().to_string(),
        args,
    })
}

/// Inline construction of an unbound class, declared once per method
fn compile_autowire(class: &str, ctx: &mut CompilationContext<'_>) -> Result<Expr, CompileError> {
    if let Some(local) = ctx.declared(class) {
        return Ok(local);
    }

    ctx.enter_autowire(class)?;
    let construction = ctx
        .instantiable_class(class)
        .and_then(|info| compile_construction(&info, &[], ctx));
    ctx.leave_autowire();

    Ok(ctx.declare(class, construction?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompilerOptions;
    use crate::reflection::{BuiltinType, Param};
    use crate::Container;

    fn compile(container: &Container, id: &str) -> Result<Expr, CompileError> {
        let options = CompilerOptions::default();
        let binding = container.binding(id).unwrap();
        let mut ctx = CompilationContext::new(container, &options, id);
        Strategy::for_binding(&binding).compile(&binding, &mut ctx)
    }

    fn class(name: &str) -> ClassInfo {
        ClassInfo::new(name).constructor(|_| Ok(Value::Null))
    }

    #[test]
    fn test_strategy_selection() {
        assert_eq!(Strategy::for_binding(&Binding::value(1)), Strategy::Value);
        assert_eq!(Strategy::for_binding(&Binding::array([("a", 1)])), Strategy::Array);
        assert_eq!(Strategy::for_binding(&Binding::closure(|_| Ok(Value::Null))), Strategy::Closure);
        assert_eq!(Strategy::for_binding(&Binding::object("A")), Strategy::Object);
        assert_eq!(Strategy::for_binding(&Binding::value(Value::object("A", ()))), Strategy::Object);
        assert_eq!(Strategy::for_binding(&Binding::lazy("A")), Strategy::Lazy);
        assert_eq!(Strategy::for_binding(&Binding::reference("a")), Strategy::Reference);
    }

    #[test]
    fn test_array_entries_compile_to_references() {
        let container = Container::new();
        container.bind(
            "config",
            Binding::array([("port", Argument::from(25)), ("db", Argument::service("db"))]),
        );
        assert_eq!(
            compile(&container, "config").unwrap(),
            Expr::Array(vec![
                ("port".into(), Expr::Int(25)),
                ("db".into(), Expr::Service("db".into())),
            ])
        );
    }

    #[test]
    fn test_live_object_is_synthetic() {
        let container = Container::new();
        container.instance("clock", Value::object("Clock", ()));
        assert_eq!(compile(&container, "clock").unwrap(), Expr::Instance("clock".into()));
    }

    #[test]
    fn test_object_with_defaults_and_autowiring() {
        let container = Container::new();
        container.register_class(class("Logger"));
        container.register_class(
            class("Mailer")
                .param(Param::class("logger", "Logger"))
                .param(Param::class("backup", "Logger"))
                .param(Param::builtin("port", BuiltinType::Int).with_default(25)),
        );
        container.bind("mailer", Binding::object("Mailer"));

        let options = CompilerOptions::default();
        let binding = container.binding("mailer").unwrap();
        let mut ctx = CompilationContext::new(&container, &options, "mailer");
        let expr = Strategy::Object.compile(&binding, &mut ctx).unwrap();
        assert_eq!(
            expr,
            Expr::New {
                class: "Mailer".into(),
                args: vec![Expr::Var("logger".into()), Expr::Var("logger".into()), Expr::Int(25)],
            }
        );

        let (block, _) = ctx.finish(vec![]);
        assert_eq!(block.stmts.len(), 1);
    }

    #[test]
    fn test_invokable_class_uses_private_instance() {
        let container = Container::new();
        container.register_class(class("TokenFactory").method("create", |_, _| Ok(Value::Null)));
        container.bind("token", Binding::object("TokenFactory"));

        match compile(&container, "token").unwrap() {
            Expr::Invoke { method, target, .. } => {
                assert_eq!(method, "create");
                assert!(matches!(*target, Expr::Private { ref key, .. } if key == "TokenFactory"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_invokable_private_key_includes_arguments() {
        let container = Container::new();
        container.register_class(
            class("Greeter")
                .param(Param::builtin("name", BuiltinType::Str))
                .method("greet", |_, _| Ok(Value::Null)),
        );
        container.bind("plain", Binding::object("Greeter").with_argument("name", "x"));
        container.bind("other", Binding::object("Greeter").with_argument("name", "y"));

        let key = |id| match compile(&container, id).unwrap() {
            Expr::Invoke { target, .. } => match *target {
                Expr::Private { key, .. } => key,
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        };
        assert!(key("plain").starts_with("Greeter#"));
        assert_ne!(key("plain"), key("other"));
    }

    #[test]
    fn test_lazy_wraps_construction_in_proxy() {
        let container = Container::new();
        container.register_class(class("Report"));
        container.lazy("report", "Report");

        match compile(&container, "report").unwrap() {
            Expr::Proxy { class, proxy_class, init } => {
                assert_eq!(class, "Report");
                assert!(proxy_class.starts_with("ReportProxy_"));
                assert_eq!(init.stmts.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_circular_autowiring_fails() {
        let container = Container::new();
        container.register_class(class("A").param(Param::class("b", "B")));
        container.register_class(class("B").param(Param::class("a", "A")));
        container.bind("svc", Binding::object("A"));

        match compile(&container, "svc") {
            Err(CompileError::CircularAutowire { path, .. }) => assert_eq!(path, vec!["B", "A", "B"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_compile_errors() {
        let container = Container::new();
        container.bind("ghost", Binding::object("Ghost"));
        assert!(matches!(compile(&container, "ghost"), Err(CompileError::ClassNotFound { .. })));

        container.register_class(class("NeedsLogger").param(Param::class("logger", "Logger")));
        container.bind("needs", Binding::object("NeedsLogger"));
        assert!(matches!(
            compile(&container, "needs"),
            Err(CompileError::UnresolvableParameter { .. })
        ));

        container.register_class(class("Anon").anonymous());
        container.bind("anon", Binding::object("Anon"));
        assert!(matches!(compile(&container, "anon"), Err(CompileError::NotInstantiable { .. })));
    }

    #[test]
    fn test_object_argument_is_unsupported() {
        let container = Container::new();
        container.register_class(class("Mailer").param(Param::builtin("transport", BuiltinType::Mixed)));
        container.bind(
            "mailer",
            Binding::object("Mailer").with_argument("transport", Value::object("Smtp", ())),
        );
        assert!(matches!(compile(&container, "mailer"), Err(CompileError::UnsupportedValue { .. })));
    }
}
