//! Constructor parameter planning and class activation
//!
//! Both the runtime container and the compiler decide where each constructor
//! argument comes from through [`plan_constructor`], so a compiled service is
//! built from exactly the sources the runtime would have used.
//!
//! [`activate`] runs a plan against a live container. Dependencies are
//! resolved through that same container, so the shared instances a class
//! receives are the ones its owner hands out.

use crate::binding::Argument;
use crate::build_stack::BuildGuard;
use crate::compiler::helper;
use crate::reflection::{ClassInfo, ParamType};
use crate::storage::InstanceCache;
use crate::value::Value;
use crate::{ContainerError, Resolver, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// Where a single constructor argument is taken from
#[derive(Debug, Clone)]
pub enum ParamSource {
    /// Named argument supplied on the binding
    Argument(Argument),
    /// Container parameter with the same name as the constructor parameter
    Parameter(String),
    /// A binding exists for the parameter's class
    Service(String),
    /// Unbound but registered class, constructed inline
    Autowire(String),
    /// Declared default value
    Default(Value),
    Null,
}

/// Read-only view of whatever owns the bindings
pub trait PlanLookup {
    fn has_binding(&self, id: &str) -> bool;

    fn has_parameter(&self, name: &str) -> bool;

    fn class_info(&self, class: &str) -> Option<Arc<ClassInfo>>;
}

/// A required parameter with no source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanError {
    pub class: String,
    pub param: String,
    pub reason: String,
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${} of {}: {}", self.param, self.class, self.reason)
    }
}

/// Plan every constructor argument of `info` in declaration order.
///
/// Per parameter: a named argument wins. A class-typed parameter then takes
/// the binding for its class, an autowired construction of the class, its
/// default, or null when nullable. A builtin-typed parameter takes the
/// container parameter of the same name, its default, or null when nullable.
pub fn plan_constructor(
    info: &ClassInfo,
    arguments: &[(String, Argument)],
    lookup: &dyn PlanLookup,
) -> std::result::Result<Vec<ParamSource>, PlanError> {
    info.params()
        .iter()
        .map(|param| {
            if let Some((_, argument)) = arguments.iter().find(|(name, _)| name == param.name()) {
                return Ok(ParamSource::Argument(argument.clone()));
            }

            let fallback = || match (param.default_value(), param.is_nullable()) {
                (Some(default), _) => Some(ParamSource::Default(default.clone())),
                (None, true) => Some(ParamSource::Null),
                (None, false) => None,
            };

            let unresolvable = |reason: String| PlanError {
                class: info.name().to_string(),
                param: param.name().to_string(),
                reason,
            };

            match param.ty() {
                ParamType::Class(class) => {
                    if lookup.has_binding(class) {
                        return Ok(ParamSource::Service(class.clone()));
                    }
                    match lookup.class_info(class) {
                        Some(dep) if dep.is_instantiable() => Ok(ParamSource::Autowire(class.clone())),
                        Some(dep) => fallback().ok_or_else(|| {
                            unresolvable(format!(
                                "class {class} is {}",
                                dep.non_instantiable_reason().unwrap_or("not instantiable")
                            ))
                        }),
                        None => fallback().ok_or_else(|| unresolvable(format!("class {class} not found"))),
                    }
                }
                ParamType::Builtin(_) => {
                    if lookup.has_parameter(param.name()) {
                        return Ok(ParamSource::Parameter(param.name().to_string()));
                    }
                    fallback().ok_or_else(|| {
                        unresolvable("builtin parameter has no argument, parameter or default".to_string())
                    })
                }
            }
        })
        .collect()
}

/// Container able to build classes on its own resolution path
pub(crate) trait Activator: Resolver + PlanLookup + Sized {
    /// Identity on the build stack
    fn owner(&self) -> usize;

    /// Private instances of invokable classes
    fn privates(&self) -> &InstanceCache;
}

/// Build a class, or call the single public method of an invokable class
pub(crate) fn activate<A: Activator>(
    container: &A,
    info: &ClassInfo,
    arguments: &[(String, Argument)],
) -> Result<Value> {
    let Some(method) = info.invokable() else {
        return build_class(container, info, arguments, &mut HashMap::new());
    };

    let key = helper::private_key(info.name(), arguments);
    let instance = match container.privates().get(&key) {
        Some(instance) => instance,
        None => {
            let instance = build_class(container, info, arguments, &mut HashMap::new())?;
            container.privates().insert_if_absent(&key, instance)
        }
    };

    #[cfg(feature = "logging")]
    trace!(
        target: "service_container",
        class = info.name(),
        method = method.name(),
        key = %key,
        "Invoking callable class"
    );

    method.invoke(&instance, container)
}

/// Run a constructor. Classes autowired more than once within the same
/// construction are built once and reused through `autowired`.
fn build_class<A: Activator>(
    container: &A,
    info: &ClassInfo,
    arguments: &[(String, Argument)],
    autowired: &mut HashMap<String, Value>,
) -> Result<Value> {
    let plan = plan_constructor(info, arguments, container).map_err(|e| {
        ContainerError::UnresolvableParameter {
            class: e.class,
            param: e.param,
            reason: e.reason,
        }
    })?;

    let mut args = Vec::with_capacity(plan.len());
    for source in plan {
        args.push(match source {
            ParamSource::Argument(argument) => resolve_argument(container, &argument)?,
            ParamSource::Parameter(name) => container.parameter(&name)?,
            ParamSource::Service(id) => container.get(&id)?,
            ParamSource::Autowire(class) => match autowired.get(&class) {
                Some(value) => value.clone(),
                None => {
                    let dep = container
                        .class_info(&class)
                        .ok_or_else(|| ContainerError::ClassNotFound { class: class.clone() })?;
                    let _guard = BuildGuard::enter(container.owner(), &class)?;
                    let value = build_class(container, &dep, &[], autowired)?;
                    autowired.insert(class, value.clone());
                    value
                }
            },
            ParamSource::Default(value) => value,
            ParamSource::Null => Value::Null,
        });
    }

    info.construct(&args)
}

/// Resolve a binding argument, recursing into arrays
pub(crate) fn resolve_argument<R: Resolver + ?Sized>(resolver: &R, argument: &Argument) -> Result<Value> {
    match argument {
        Argument::Value(value) => Ok(value.clone()),
        Argument::Reference(id) => resolver.get(id),
        Argument::Parameter(name) => resolver.parameter(name),
        Argument::Array(entries) => entries
            .iter()
            .map(|(key, arg)| Ok((key.clone(), resolve_argument(resolver, arg)?)))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::{BuiltinType, Param};
    use std::collections::HashMap;

    #[derive(Default)]
    struct Lookup {
        bindings: Vec<&'static str>,
        parameters: Vec<&'static str>,
        classes: HashMap<String, Arc<ClassInfo>>,
    }

    impl Lookup {
        fn class(mut self, info: ClassInfo) -> Self {
            self.classes.insert(info.name().to_string(), Arc::new(info));
            self
        }
    }

    impl PlanLookup for Lookup {
        fn has_binding(&self, id: &str) -> bool {
            self.bindings.contains(&id)
        }

        fn has_parameter(&self, name: &str) -> bool {
            self.parameters.contains(&name)
        }

        fn class_info(&self, class: &str) -> Option<Arc<ClassInfo>> {
            self.classes.get(class).cloned()
        }
    }

    fn constructible(name: &str) -> ClassInfo {
        ClassInfo::new(name).constructor(|_| Ok(Value::Null))
    }

    #[test]
    fn test_named_argument_wins() {
        let info = ClassInfo::new("Mailer").param(Param::builtin("host", BuiltinType::Str));
        let lookup = Lookup {
            parameters: vec!["host"],
            ..Default::default()
        };
        let plan = plan_constructor(&info, &[("host".into(), Argument::from("smtp"))], &lookup).unwrap();
        assert!(matches!(&plan[0], ParamSource::Argument(Argument::Value(v)) if v.as_str() == Some("smtp")));
    }

    #[test]
    fn test_class_sources_in_order() {
        let info = ClassInfo::new("Service")
            .param(Param::class("bound", "Bound"))
            .param(Param::class("auto", "Auto"))
            .param(Param::class("missing", "Missing").nullable())
            .param(Param::class("abstract", "Shape").with_default(1));

        let lookup = Lookup {
            bindings: vec!["Bound"],
            ..Default::default()
        }
        .class(constructible("Auto"))
        .class(ClassInfo::new("Shape").abstract_class());

        let plan = plan_constructor(&info, &[], &lookup).unwrap();
        assert!(matches!(&plan[0], ParamSource::Service(c) if c == "Bound"));
        assert!(matches!(&plan[1], ParamSource::Autowire(c) if c == "Auto"));
        assert!(matches!(plan[2], ParamSource::Null));
        assert!(matches!(&plan[3], ParamSource::Default(Value::Int(1))));
    }

    #[test]
    fn test_default_preferred_over_null() {
        let info = ClassInfo::new("Service").param(Param::builtin("port", BuiltinType::Int).nullable().with_default(80));
        let plan = plan_constructor(&info, &[], &Lookup::default()).unwrap();
        assert!(matches!(plan[0], ParamSource::Default(Value::Int(80))));
    }

    #[test]
    fn test_builtin_uses_container_parameter() {
        let info = ClassInfo::new("Service").param(Param::builtin("dsn", BuiltinType::Str));
        let lookup = Lookup {
            parameters: vec!["dsn"],
            ..Default::default()
        };
        let plan = plan_constructor(&info, &[], &lookup).unwrap();
        assert!(matches!(&plan[0], ParamSource::Parameter(p) if p == "dsn"));
    }

    #[test]
    fn test_required_class_missing_is_error() {
        let info = ClassInfo::new("Service").param(Param::class("logger", "Logger"));
        let err = plan_constructor(&info, &[], &Lookup::default()).unwrap_err();
        assert_eq!(err.param, "logger");
        assert_eq!(err.reason, "class Logger not found");
    }

    #[test]
    fn test_required_builtin_is_error() {
        let info = ClassInfo::new("Service").param(Param::builtin("x", BuiltinType::Array));
        assert!(plan_constructor(&info, &[], &Lookup::default()).is_err());
    }
}
