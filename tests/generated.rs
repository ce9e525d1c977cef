//! The printer's output for a representative graph, checked in and compiled.
//!
//! Set `SERVICE_CONTAINER_BLESS=1` to rewrite the fixture after an intended
//! change to the generated source.

use service_container::{
    Argument, Binding, BuiltinType, ClassInfo, CompiledContainer, Compiler, Container, Param, Value, argument,
};

#[allow(clippy::all, dead_code)]
mod app_container {
    include!("fixtures/app_container.rs");
}

const FIXTURE: &str = include_str!("fixtures/app_container.rs");

struct Logger;

struct Mailer {
    host: String,
    logger: Value,
}

fn app() -> Container {
    let container = Container::new();
    container.register_class(ClassInfo::new("Logger").constructor(|_| Ok(Value::object("Logger", Logger))));
    container.register_class(
        ClassInfo::new("Mailer")
            .param(Param::builtin("host", BuiltinType::Str))
            .param(Param::class("logger", "Logger"))
            .constructor(|args| {
                Ok(Value::object(
                    "Mailer",
                    Mailer {
                        host: argument(args, 0).as_str().unwrap_or_default().to_string(),
                        logger: argument(args, 1).clone(),
                    },
                ))
            }),
    );
    container.register_class(
        ClassInfo::new("Greeter")
            .param(Param::builtin("name", BuiltinType::Str))
            .constructor(|args| Ok(Value::object("Greeter", argument(args, 0).as_str().unwrap_or_default().to_string())))
            .method("greet", |this, _| {
                let name = this.downcast_ref::<String>().cloned().unwrap_or_default();
                Ok(Value::from(format!("hello {name}")))
            }),
    );
    container.register_class(ClassInfo::new("Report").constructor(|_| Ok(Value::object("Report", ()))));

    container.set_parameter("host", "smtp.local");
    container.instance("clock", Value::object("Clock", ()));
    container.bind(
        "config",
        Binding::array([
            ("host", Argument::parameter("host")),
            ("port", Argument::from(25)),
        ]),
    );
    container.bind("counter", Binding::value(1));
    container
        .extend("counter", |v, _| Ok(Value::Int(v.as_int().unwrap_or_default() + 1)))
        .unwrap();
    container.bind("greeting", Binding::object("Greeter").with_argument("name", "ada"));
    container.singleton("mailer", Binding::object("Mailer"));
    container.alias("mail", "mailer");
    container.lazy("report", "Report");
    container
}

#[test]
fn test_render_matches_fixture() {
    let compiler = Compiler::new();
    let source = compiler.dump(&compiler.compile(&app()).unwrap());

    if std::env::var_os("SERVICE_CONTAINER_BLESS").is_some() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/app_container.rs");
        std::fs::write(path, &source).unwrap();
        return;
    }
    assert_eq!(source, FIXTURE);
}

#[test]
fn test_fixture_agrees_with_interpreted_container() {
    let runtime = app();
    let interpreted = Compiler::new().build(&runtime).unwrap();
    let native = app_container::load(runtime.clone());

    assert!(native.artifact().is_none());
    assert_eq!(native.method_mapping(), interpreted.method_mapping());
    assert_eq!(native.get_removed_ids(), interpreted.get_removed_ids());
    assert_eq!(native.synthetic_ids(), interpreted.synthetic_ids());

    for id in ["clock", "config", "counter", "greeting"] {
        assert_eq!(native.get(id).unwrap(), interpreted.get(id).unwrap(), "{id}");
    }
    assert_eq!(native.get("counter").unwrap(), Value::Int(2));
    assert_eq!(native.get("greeting").unwrap(), Value::from("hello ada"));
    assert_eq!(
        native.get("config").unwrap(),
        Value::array([("host", Value::from("smtp.local")), ("port", Value::Int(25))])
    );
}

#[test]
fn test_fixture_shares_services() {
    let native: CompiledContainer = app_container::load(app());

    let mailer = native.get("mailer").unwrap();
    assert_eq!(native.get("mail").unwrap(), mailer);
    assert!(native.initialized("mailer"));

    let inner = mailer.downcast_ref::<Mailer>().unwrap();
    assert_eq!(inner.host, "smtp.local");
    assert_eq!(inner.logger.as_object().unwrap().class(), "Logger");

    let report = native.get("report").unwrap();
    let proxy = report.as_lazy().unwrap();
    assert!(proxy.proxy_class().starts_with("ReportProxy_"));
    assert_eq!(proxy.target().unwrap().as_object().unwrap().class(), "Report");
    assert_eq!(native.get("report").unwrap(), report);

    assert!(!native.has("container"));
}
