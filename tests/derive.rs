//! `#[derive(Autowire)]` against a live container
//!
//! Run with: cargo test --features derive

use autowire::{Autowire, Autowired, Container, ErrorKind, Interface, Properties, params};
use std::sync::Arc;

trait Cache: Send + Sync {
    fn size(&self) -> usize;
}

#[derive(Autowire)]
struct Database {
    #[param(default = "postgres://localhost")]
    url: String,
}

#[derive(Autowire)]
#[autowire(name = "MemoryCache")]
struct MemoryCache {
    #[param(default = 128)]
    size: i64,
}

impl Cache for MemoryCache {
    fn size(&self) -> usize {
        self.size as usize
    }
}

#[derive(Autowire)]
#[autowire(name = "users", extends = "Service")]
struct UserService {
    #[inject]
    db: Arc<Database>,
    #[inject(class = "Cache")]
    cache: Option<Arc<dyn Cache>>,
    #[param(default = 10)]
    limit: i64,
    request_count: u64,
}

fn container() -> Container {
    let container = Container::new();
    container.autowire::<Database>();
    container.autowire::<UserService>();
    container.describe_interface(Interface::new("Cache"));
    container.describe(
        MemoryCache::describe().implements::<dyn Cache>("Cache", |c| c as Arc<dyn Cache>),
    );
    container
}

#[test]
fn test_generated_description() {
    let description = UserService::describe().into_info();
    assert_eq!(description.name(), "users");
    assert!(description.is_a("Service"));

    let params: Vec<_> = description
        .signature()
        .params()
        .iter()
        .map(|p| (p.name().to_string(), p.type_display()))
        .collect();
    assert_eq!(
        params,
        vec![
            ("db".to_string(), "Database".to_string()),
            ("cache".to_string(), "?Cache".to_string()),
            ("limit".to_string(), "int".to_string()),
        ]
    );
}

#[test]
fn test_optional_dependency_left_empty() {
    let container = container();
    let users = container.get_as::<UserService>("users").unwrap();

    assert_eq!(users.db.url, "postgres://localhost");
    assert!(users.cache.is_none());
    assert_eq!(users.limit, 10);
    assert_eq!(users.request_count, 0);
}

#[test]
fn test_bound_interface_is_injected() {
    let container = container();
    container.set_singleton("Cache", "MemoryCache").unwrap();
    container
        .set_with_params("Database", autowire::Value::Null, params!["url" => "sqlite::memory:"])
        .unwrap();

    let users = container
        .get_with("users", params!["limit" => 50], Properties::new())
        .unwrap()
        .downcast::<UserService>()
        .unwrap();

    assert_eq!(users.db.url, "sqlite::memory:");
    assert_eq!(users.cache.as_ref().map(|c| c.size()), Some(128));
    assert_eq!(users.limit, 50);
}

#[test]
fn test_param_type_is_checked() {
    let container = container();
    let err = container
        .get_with("users", params!["limit" => "many"], Properties::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvocationType);
}
