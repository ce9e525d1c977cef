// @generated by service-container. Do not edit.

#[allow(unused_imports)]
use service_container::{ArrayKey, CompiledContainer, Container, GeneratedContainer, MethodFn, Result, Value};

pub static CONTAINER: GeneratedContainer = GeneratedContainer {
    name: "CompiledServiceContainer",
    method_mapping: &[
        ("clock", "get9d47717795b7bace"),
        ("config", "getb756e64ea90c4036"),
        ("counter", "get8f8d724ea76b395a"),
        ("greeting", "getf454281569de1efc"),
        ("mail", "geta5d56811b40efd34"),
        ("mailer", "get9d741b72aa20b62e"),
        ("report", "get31f27cf7db1e7900"),
    ],
    methods: &[
        ("get31f27cf7db1e7900", get31f27cf7db1e7900 as MethodFn),
        ("get8f8d724ea76b395a", get8f8d724ea76b395a as MethodFn),
        ("get9d47717795b7bace", get9d47717795b7bace as MethodFn),
        ("get9d741b72aa20b62e", get9d741b72aa20b62e as MethodFn),
        ("geta5d56811b40efd34", geta5d56811b40efd34 as MethodFn),
        ("getb756e64ea90c4036", getb756e64ea90c4036 as MethodFn),
        ("getf454281569de1efc", getf454281569de1efc as MethodFn),
    ],
    removed_ids: &["container"],
    synthetic_ids: &["clock"],
    uninitialized_services: &["clock", "mailer", "report"],
    parameters,
};

fn parameters() -> Vec<(&'static str, Value)> {
    vec![
        ("host", Value::from("smtp.local")),
    ]
}

/// Compiled container backed by `runtime` for closures, classes and synthetic ids
pub fn load(runtime: Container) -> CompiledContainer {
    CompiledContainer::from_generated(&CONTAINER, runtime)
}

/// Service "report", shared
fn get31f27cf7db1e7900(c: &CompiledContainer) -> Result<Value> {
    let resolved = c.proxy("Report", "ReportProxy_07d32c56981a0694", |c| {
        Ok(c.construct("Report", vec![])?)
    });
    let resolved = c.share("report", resolved);
    Ok(resolved)
}

/// Service "counter"
fn get8f8d724ea76b395a(c: &CompiledContainer) -> Result<Value> {
    let mut resolved = Value::Int(1);
    resolved = c.extend("counter", 0, resolved)?;
    Ok(resolved)
}

/// Service "clock", shared
fn get9d47717795b7bace(c: &CompiledContainer) -> Result<Value> {
    let resolved = c.instance("clock")?;
    let resolved = c.share("clock", resolved);
    Ok(resolved)
}

/// Service "mailer", shared
fn get9d741b72aa20b62e(c: &CompiledContainer) -> Result<Value> {
    let logger = c.construct("Logger", vec![])?;
    let resolved = c.construct("Mailer", vec![c.parameter("host")?, logger.clone()])?;
    let resolved = c.share("mailer", resolved);
    Ok(resolved)
}

/// Service "mail"
fn geta5d56811b40efd34(c: &CompiledContainer) -> Result<Value> {
    Ok(c.get("mailer")?)
}

/// Service "config"
fn getb756e64ea90c4036(c: &CompiledContainer) -> Result<Value> {
    Ok(Value::Array(vec![(ArrayKey::from("host"), c.parameter("host")?), (ArrayKey::from("port"), Value::Int(25))]))
}

/// Service "greeting"
fn getf454281569de1efc(c: &CompiledContainer) -> Result<Value> {
    Ok(c.invoke("Greeter", "greet", &c.private("Greeter#70c30d8d94a3e454", |c| {
        Ok(c.construct("Greeter", vec![Value::from("ada")])?)
    })?)?)
}
