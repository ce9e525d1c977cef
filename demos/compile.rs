//! Example compiling a container to Rust source
//!
//! Run with:
//!   cargo run --example compile
//!
//! The generated module is printed and written to the temp directory. Include
//! it in a build and call `load(runtime)` to get the same compiled container
//! without re-running the compiler.

use service_container::{
    Argument, Binding, ClassInfo, Compiler, CompilerOptions, Container, Param, Value, argument,
};

#[allow(dead_code)]
struct Transport {
    host: String,
    port: i64,
}

#[allow(dead_code)]
struct Mailer {
    transport: Value,
    from: String,
}

fn main() {
    let container = Container::new();
    container.register_class(
        ClassInfo::new("App\\Transport")
            .param(Param::of::<String>("host"))
            .param(Param::of::<i64>("port").with_default(25))
            .constructor(|args| {
                Ok(Value::object(
                    "App\\Transport",
                    Transport {
                        host: argument(args, 0).as_str().unwrap_or_default().to_string(),
                        port: argument(args, 1).as_int().unwrap_or_default(),
                    },
                ))
            }),
    );
    container.register_class(
        ClassInfo::new("App\\Mailer")
            .param(Param::class("transport", "App\\Transport"))
            .param(Param::of::<String>("from"))
            .constructor(|args| {
                Ok(Value::object(
                    "App\\Mailer",
                    Mailer {
                        transport: argument(args, 0).clone(),
                        from: argument(args, 1).as_str().unwrap_or_default().to_string(),
                    },
                ))
            }),
    );

    container.set_parameter("host", "smtp.local");
    container.bind(
        "mail.config",
        Binding::array([
            ("host", Argument::parameter("host")),
            ("retries", Argument::from(3)),
        ]),
    );
    container.singleton(
        "mailer",
        Binding::object("App\\Mailer").with_argument("from", "noreply@example.com"),
    );
    container.alias("app.mailer", "mailer");
    container.factory("request_id", |_| Ok(Value::Int(42)));
    container.extend("mail.config", |config, _| Ok(Value::list([config]))).unwrap();

    let output = std::env::temp_dir().join("compiled_container.rs");
    let compiler = Compiler::with_options(
        CompilerOptions::new()
            .container_name("AppContainer")
            .remove_id("request_id")
            .output(&output),
    );

    let compiled = compiler.build(&container).expect("Failed to compile container");
    if let Some(artifact) = compiled.artifact() {
        println!("{}", compiler.dump(artifact));
    }

    println!("Written to {}", output.display());
    println!("Method mapping:");
    for (id, method) in compiled.method_mapping() {
        println!("  {id:<12} -> {method}");
    }
    println!("Removed ids: {:?}", compiled.get_removed_ids());

    let mailer = compiled.get("app.mailer").expect("mailer");
    assert_eq!(mailer, compiled.get("mailer").expect("mailer"));
    println!("mail.config = {:?}", compiled.get("mail.config").expect("config"));
}
