//! Example demonstrating the #[derive(Reflect)] macro
//!
//! Run with:
//!   cargo run --example derive --features derive

use service_container::{Binding, Container, Reflect};
use std::sync::Arc;

#[allow(dead_code)]
#[derive(Reflect)]
#[class(name = "App\\Database")]
struct Database {
    #[param(name = "database_url")]
    url: String,
}

#[derive(Reflect)]
struct Cache {
    #[param(default = 1024)]
    size: i64,
}

#[allow(dead_code)]
#[derive(Reflect)]
struct Logger {
    level: String,
}

#[derive(Reflect)]
struct UserService {
    db: Arc<Database>,
    cache: Arc<Cache>,
    // Nullable: resolved to None when no Logger can be built
    logger: Option<Arc<Logger>>,
    #[param(skip)]
    request_count: u64,
}

impl UserService {
    fn describe(&self) -> String {
        let logger_status = if self.logger.is_some() {
            "with logging"
        } else {
            "without logging"
        };
        format!(
            "UserService connected to {} with cache size {} ({}, requests: {})",
            self.db.url, self.cache.size, logger_status, self.request_count
        )
    }
}

fn main() {
    println!("=== Service Container Derive Macro Demo ===\n");

    let container = Container::new();
    container.register::<Database>();
    container.register::<Cache>();
    container.register::<UserService>();
    container.set_parameter("database_url", "postgres://localhost:5432/myapp");

    // Database is bound, Cache is autowired, Logger is not registered
    container.singleton(Database::class_name(), Binding::object(Database::class_name()));
    container.bind("users", Binding::object(UserService::class_name()));

    let users = container.get("users").expect("Failed to create UserService");
    let users = users.downcast_ref::<UserService>().expect("not a UserService");
    println!("Runtime:  {}", users.describe());

    let compiled = container.compile().expect("Failed to compile container");
    let users = compiled.get("users").expect("Failed to create UserService");
    let users = users.downcast_ref::<UserService>().expect("not a UserService");
    println!("Compiled: {}", users.describe());

    println!("\n=== Demo Complete ===");
    println!("\nThe #[derive(Reflect)] macro generated constructor metadata that:");
    println!("  - Declares one parameter per field, in order");
    println!("  - Marks Option<T> fields nullable and applies #[param(default = ...)]");
    println!("  - Uses Default::default() for #[param(skip)] fields");
}
