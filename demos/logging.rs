//! Example demonstrating logging capabilities
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use service_container::{Binding, ClassInfo, Compiler, Container, Param, Value, argument};

#[allow(dead_code)]
struct Database {
    url: String,
}

fn main() {
    // JSON with logging-json, pretty with logging-pretty, nothing otherwise
    service_container::logging::builder().trace().container_only().from_env().init();

    println!("=== Service Container Logging Demo ===\n");

    // logs: "Creating new service container"
    let container = Container::new();

    // logs: "Registering class metadata"
    container.register_class(
        ClassInfo::new("Database")
            .param(Param::of::<String>("dsn"))
            .constructor(|args| {
                let url = argument(args, 0).as_str().unwrap_or_default().to_string();
                Ok(Value::object("Database", Database { url }))
            }),
    );

    // logs: "Setting parameter", "Registering service"
    container.set_parameter("dsn", "postgres://localhost/app");
    container.singleton("db", Binding::object("Database"));
    container.lazy("report", "Database");

    // logs: "Building service", then "Service resolved from shared instance cache"
    let _db = container.get("db").unwrap();
    let _db = container.get("db").unwrap();

    // logs: "Creating lazy proxy"; the target is built on first access
    let report = container.get("report").unwrap();
    let _target = report.as_lazy().map(|proxy| proxy.target());

    // logs: "Service not found"
    assert!(container.get("missing").is_err());

    // logs: "Container locked", one "Compiled service" per binding, "Container compiled"
    let compiled = Compiler::new().build(&container).unwrap();

    // logs: "Calling compiled method"
    let _db = compiled.get("db").unwrap();

    println!("\n=== Demo Complete ===");
    println!("Check the log output above to see structured logging in action!");
    println!("\nTip: Use --features logging-json for production (JSON output)");
    println!("     Use --features logging-pretty for development (colorful output)");
    println!("     Set RUST_LOG=service_container=debug to hide resolution traces");
}
