//! Basic example: resolve a small web-shop provider and print the plan.

use tarkib::prelude::*;
use tracing::info;

fn class(name: &str) -> TypeRef {
    TypeRef::class(format!("shop::{name}"))
}

fn interface(name: &str) -> TypeRef {
    TypeRef::interface(format!("shop::{name}"))
}

fn dependency(
    lifetime: Lifetime,
    service: TypeRef,
    implementation: Option<TypeRef>,
) -> Declaration {
    Declaration::Dependency {
        lifetime,
        service,
        implementation,
        key: None,
    }
}

// === Describe the types the compiler would report ===

fn model() -> (TypeModel, TypeRef) {
    let t = TypeRef::parameter("T");
    let repo = |arg: TypeRef| class("Repository").with_args([arg]);
    let provider = class("ShopProvider");

    let model = TypeModel::new()
        .define(TypeDefinition::new(interface("Logger")))
        .define(TypeDefinition::new(class("ConsoleLogger")).inherits(interface("Logger")))
        .define(TypeDefinition::new(class("Config")))
        .define(
            TypeDefinition::new(class("Database"))
                .inherits(TypeRef::interface("core::Disposable"))
                .constructor(MethodInfo::constructor([
                    ParameterInfo::new("config", class("Config")),
                    ParameterInfo::new("logger", interface("Logger")),
                ])),
        )
        .define(
            TypeDefinition::new(repo(t.clone())).constructor(MethodInfo::constructor([
                ParameterInfo::new("db", class("Database")),
            ])),
        )
        .define(TypeDefinition::new(class("User")))
        .define(TypeDefinition::new(class("UserService")).constructor(MethodInfo::constructor([
            ParameterInfo::new("users", repo(class("User"))),
            ParameterInfo::new("logger", interface("Logger")),
        ])))
        .define(
            TypeDefinition::new(provider.clone())
                .member(AssociatedSymbol::Property {
                    name: "Config".to_string(),
                    ty: class("Config"),
                })
                .declare(Declaration::Instance {
                    service: class("Config"),
                    key: None,
                    member: "Config".to_string(),
                })
                .declare(dependency(
                    Lifetime::Singleton,
                    interface("Logger"),
                    Some(class("ConsoleLogger")),
                ))
                .declare(dependency(Lifetime::Singleton, class("Database"), None))
                .declare(dependency(Lifetime::Scoped, repo(t), None))
                .declare(dependency(Lifetime::Transient, class("UserService"), None)),
        );
    (model, provider)
}

fn main() -> Result<()> {
    // Initialize tracing (logging)
    tracing_subscriber::fmt()
        .with_env_filter("tarkib_manifest=debug")
        .init();

    let (model, provider) = model();
    let manifest = Generator::new(&model).run(&provider)?;
    info!("Provider resolved");

    for service in manifest.get_all_services() {
        println!(
            "{:<12} {}{}",
            service.lifetime().to_string(),
            service.ty().display_name(),
            if service.is_disposable() { " (disposable)" } else { "" }
        );
    }

    for resolution in manifest.get_all_constructor_resolutions() {
        println!("\n{}", resolution.ty().display_name());
        for parameter in resolution.parameters() {
            let selected = parameter
                .selected_service()
                .map(|id| manifest.registration(id).resolved_type().display_name())
                .unwrap_or_else(|| "-".to_string());
            println!("  {} <- {selected}", parameter.parameter().name);
        }
    }
    Ok(())
}
