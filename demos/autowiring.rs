//! Walkthrough of definitions, autowiring and invocation
//!
//! Run with:
//!   cargo run --example autowiring

use autowire::{
    Callable, Class, Container, DiError, Function, Instance, Interface, Param, Params, Properties,
    Reference, ServiceLocator, Signature, Value, params,
};
use std::sync::Arc;

trait Storage: Send + Sync {
    fn describe(&self) -> String;
}

struct DiskStorage {
    root: String,
}

impl Storage for DiskStorage {
    fn describe(&self) -> String {
        format!("disk at {}", self.root)
    }
}

struct Uploader {
    storage: Arc<dyn Storage>,
    chunk: i64,
    retries: i64,
}

#[allow(dead_code)]
struct Node {
    next: Arc<Node>,
}

/// Request-scoped services looked up by parameter name during `invoke`
struct RequestServices {
    storage: Instance,
}

impl ServiceLocator for RequestServices {
    fn locate(&self, name: &str) -> Option<Instance> {
        (name == "storage").then(|| self.storage.clone())
    }
}

fn describe(container: &Container) {
    container.describe_interface(Interface::new("Storage"));
    container.describe(
        Class::<DiskStorage>::new("DiskStorage")
            .implements::<dyn Storage>("Storage", |s| s as Arc<dyn Storage>)
            .param(Param::new("root").typed("string").default("/var/data"))
            .construct(|args| Ok(DiskStorage { root: args.take(0)? }))
            .static_method(
                "temporary",
                Signature::new().param(Param::new("suffix").typed("string").default("tmp")),
                |args| {
                    let suffix: String = args.take(0)?;
                    Ok(Value::from(Instance::new(DiskStorage {
                        root: format!("/tmp/{suffix}"),
                    })))
                },
            ),
    );
    container.describe(
        Class::<Uploader>::new("Uploader")
            .param(Param::new("storage").typed("Storage"))
            .param(Param::new("chunk").typed("int").default(4096))
            .property("retries", |u: &mut Uploader, v| {
                u.retries = v
                    .as_int()
                    .ok_or_else(|| DiError::invalid_config("retries must be an int"))?;
                Ok(())
            })
            .construct(|args| {
                Ok(Uploader {
                    storage: args.interface::<dyn Storage>(0)?,
                    chunk: args.take(1)?,
                    retries: 0,
                })
            }),
    );
    container.describe(
        Class::<Node>::new("Node")
            .param(Param::new("next").typed("Node"))
            .construct(|args| Ok(Node { next: args.object(0)? })),
    );
}

fn print_uploader(label: &str, uploader: &Uploader) {
    println!(
        "  {label}: {} (chunk {}, retries {})",
        uploader.storage.describe(),
        uploader.chunk,
        uploader.retries
    );
}

fn main() -> autowire::Result<()> {
    println!("=== Autowire Walkthrough ===\n");

    let container = Container::new();
    describe(&container);

    // 1. An unbound interface cannot be autowired
    println!("1. Unbound interface");
    match container.get("Uploader") {
        Err(err) => println!("  error: {err}"),
        Ok(_) => unreachable!(),
    }

    // 2. Bind it with a singleton and let the container wire the rest
    println!("\n2. Interface binding");
    container.set_singleton("Storage", "DiskStorage")?;
    let uploader = container.get_as::<Uploader>("Uploader")?;
    print_uploader("autowired", &uploader);

    // 3. Both definition dialects, with constructor arguments and properties
    println!("\n3. Config maps");
    container.set_definitions([
        (
            "fast",
            Value::map([
                ("class", Value::from("Uploader")),
                ("arguments", Value::map([("chunk", 65536)])),
                ("retries", Value::from(3)),
            ]),
        ),
        (
            "legacy",
            Value::map([
                ("__class", Value::from("Uploader")),
                ("__construct()", Value::list([Value::from(Reference::to("scratch"))])),
                ("$retries", Value::from(1)),
            ]),
        ),
        // [definition, params]
        (
            "scratch",
            Value::list([
                Value::from(Callable::named("DiskStorage::temporary")),
                Value::list(["uploads"]),
            ]),
        ),
    ])?;
    print_uploader("fast", &*container.get_as::<Uploader>("fast")?);
    print_uploader("legacy", &*container.get_as::<Uploader>("legacy")?);

    // 4. Per-request overrides
    println!("\n4. Overrides");
    let tuned = container.get_with(
        "fast",
        params!["chunk" => 1024],
        Properties::new().set("retries", 9),
    )?;
    if let Some(tuned) = tuned.downcast::<Uploader>() {
        print_uploader("tuned", &tuned);
    }

    // 5. Factories receive the container, params and config
    println!("\n5. Factory");
    container.set_with_params(
        "mirror",
        Callable::factory(|container: &Container, params: &Params, _config: &Properties| {
            let primary = container.get("Storage")?;
            let label = params
                .by_name("label")
                .and_then(Value::as_str)
                .unwrap_or("mirror");
            let root = primary
                .downcast::<DiskStorage>()
                .map(|disk| format!("{}-{label}", disk.root))
                .unwrap_or_default();
            Ok(Instance::new(DiskStorage { root }))
        }),
        params!["label" => "backup"],
    )?;
    let mirror = container.get("mirror")?;
    let described = mirror.cast::<dyn Storage>().map(|s| s.describe());
    println!("  class {}, storage {described:?}", mirror.class_name());

    // 6. Invoke callables; named services fill in unbound parameters
    println!("\n6. Invoke");
    let request = Container::builder()
        .locator(Arc::new(RequestServices {
            storage: Instance::new(DiskStorage {
                root: "/srv/request".into(),
            }),
        }))
        .build();
    describe(&request);
    let report = Callable::function(
        Function::closure(|args| {
            let storage = args.interface::<dyn Storage>(0)?;
            let verbose: bool = args.take(1)?;
            Ok(Value::from(format!("{} (verbose: {verbose})", storage.describe())))
        })
        .param(Param::new("storage").typed("Storage"))
        .param(Param::new("verbose").typed("bool").default(false)),
    );
    println!("  {:?}", request.invoke(&report, params!["verbose" => true])?);

    let args = container.resolve_callable_dependencies(&report, Params::new())?;
    println!("  resolved {} arguments without calling", args.len());

    // 7. Cycles are reported with the full path
    println!("\n7. Circular dependency");
    if let Err(err) = container.get("Node") {
        println!("  error: {err}");
    }

    // 8. Singletons can be dropped without forgetting their definitions
    println!("\n8. Reset");
    let before = container.get("Storage")?;
    container.reset();
    let after = container.get("Storage")?;
    println!("  same instance after reset: {}", before.ptr_eq(&after));
    println!("  definitions: {:?}", container.definitions());

    println!("\n=== Demo Complete ===");
    Ok(())
}
