//! Example demonstrating the #[derive(Autowire)] macro
//!
//! Run with:
//!   cargo run --example derive --features derive

use autowire::{Autowire, Container, Interface, Properties, params};
use std::sync::Arc;

trait Logger: Send + Sync {
    fn level(&self) -> &str;
}

#[derive(Autowire)]
struct Database {
    #[param(default = "postgres://localhost:5432/myapp")]
    url: String,
}

#[derive(Autowire)]
struct StdoutLogger {
    #[param(default = "DEBUG")]
    level: String,
}

impl Logger for StdoutLogger {
    fn level(&self) -> &str {
        &self.level
    }
}

// Service with injected dependencies
#[derive(Autowire)]
struct UserService {
    #[inject]
    db: Arc<Database>,
    #[inject(class = "Logger")]
    logger: Option<Arc<dyn Logger>>,
    #[param(default = 20)]
    page_size: i64,
    // Non-injected field uses Default
    request_count: u64,
}

impl UserService {
    fn summary(&self) -> String {
        let logger_status = match &self.logger {
            Some(logger) => format!("logging at {}", logger.level()),
            None => "without logging".to_string(),
        };
        format!(
            "UserService connected to {} with page size {} ({}, requests: {})",
            self.db.url, self.page_size, logger_status, self.request_count
        )
    }
}

fn main() {
    println!("=== Autowire Derive Macro Demo ===\n");

    let container = Container::new();
    container.autowire::<Database>();
    container.autowire::<UserService>();
    container.describe_interface(Interface::new("Logger"));
    container.describe(
        <StdoutLogger as autowire::Autowired>::describe()
            .implements::<dyn Logger>("Logger", |l| l as Arc<dyn Logger>),
    );

    // Logger is not bound yet, so the optional dependency stays empty
    println!("Creating UserService from container...");
    let users = container
        .get_as::<UserService>("UserService")
        .expect("Failed to create UserService");
    println!("  {}", users.summary());
    println!();

    // Bind the interface and override a constructor parameter
    container.set_singleton("Logger", "StdoutLogger").unwrap();
    println!("Creating UserService with Logger...");
    let users = container
        .get_with("UserService", params!["page_size" => 50], Properties::new())
        .and_then(|instance| {
            instance.downcast::<UserService>().ok_or_else(|| {
                autowire::DiError::creation_failed("UserService", "unexpected instance type")
            })
        })
        .expect("Failed to create UserService");
    println!("  {}", users.summary());
    println!();

    println!("=== Demo Complete ===");
    println!("\nThe #[derive(Autowire)] macro generated an Autowired impl that:");
    println!("  - Declares #[inject] fields as class-typed constructor parameters");
    println!("  - Makes Option<Arc<T>> dependencies nullable");
    println!("  - Reads #[param] fields with their defaults");
    println!("  - Uses Default::default() for the remaining fields");
}
