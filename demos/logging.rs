//! Example demonstrating logging capabilities
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging and per-parameter traces (development):
//! ```bash
//! AUTOWIRE_LOG=autowire=trace cargo run --example logging --features logging-pretty
//! ```

use autowire::{Class, Container, Param, Reference, Value};
use std::sync::Arc;

#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
struct UserService {
    db: Arc<Database>,
}

fn main() {
    // JSON if logging-json is enabled, pretty otherwise
    autowire::logging::init();

    println!("=== Autowire Logging Demo ===\n");

    // logs: "Creating container"
    let container = Container::new();

    // logs: "Describing class"
    container.describe(
        Class::<Database>::new("Database")
            .param(Param::new("url").typed("string").default("postgres://localhost/mydb"))
            .construct(|args| Ok(Database { url: args.take(0)? })),
    );
    container.describe(
        Class::<UserService>::new("UserService")
            .param(Param::new("db").typed("Database"))
            .construct(|args| Ok(UserService { db: args.object(0)? })),
    );

    // logs: "Registering definition"
    container.set_singleton("Database", Value::Null).unwrap();
    container.set("users", Reference::to("UserService")).unwrap();

    // logs: "Building instance", "Caching singleton", and at trace level
    // "Resolved parameter" for every argument
    let _users = container.get("users").unwrap();

    // logs: "Singleton cache hit"
    let _db = container.get("Database").unwrap();

    // Resolution errors are returned, not logged
    let missing = container.get("Nowhere");
    assert!(missing.is_err());

    // logs: "Resetting singleton instances", "Clearing definition"
    container.reset();
    container.clear("users");

    println!("\n=== Demo Complete ===");
    println!("Check the log output above to see structured logging in action!");
    println!("\nTip: Use --features logging-json for production (JSON output)");
    println!("     Use --features logging-pretty for development (readable output)");
}
