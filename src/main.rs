use anyhow::Context;
use samyama_ogm::{
    Cascade, Direction, DynamicEntity, EntityRef, FetchMode, FieldDescriptor, MappingConfig,
    MemoryStore, NamedNode, SemanticTemplate, StaticMetadataProvider, TypeDescriptor, ValueKind,
    XsdCalendar,
};
use std::path::Path;
use std::sync::Arc;

const WINE: &str = "http://example.org/wine#";

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("Samyama OGM v{}", samyama_ogm::version());
    println!("==========================================");
    println!();

    let store = Arc::new(MemoryStore::new());
    let template = SemanticTemplate::new(store.clone(), Arc::new(model()), MappingConfig::default())
        .context("failed to set up the mapping template")?;

    demo_save_and_find(&template)?;

    if let Some(file) = std::env::args().nth(1) {
        println!("\n=== Ingesting {} ===", file);
        let added = template
            .database()
            .add_statements_from_file(Path::new(&file))
            .with_context(|| format!("failed to ingest {}", file))?;
        println!("✓ Added {} statements", added);
    }

    println!("\nStore size: {} quads", template.database().count()?);
    Ok(())
}

fn model() -> StaticMetadataProvider {
    let mut provider = StaticMetadataProvider::new();
    provider
        .register_dynamic(
            TypeDescriptor::new("Winery")
                .with_namespace(WINE)
                .field(FieldDescriptor::id_field("uri"))
                .field(FieldDescriptor::simple("name", ValueKind::String))
                .field(
                    FieldDescriptor::association("wines", "Wine")
                        .with_direction(Direction::Incoming)
                        .mapped_by("maker")
                        .collection(),
                ),
        )
        .register_dynamic(
            TypeDescriptor::new("Wine")
                .with_namespace(WINE)
                .field(FieldDescriptor::id_field("uri"))
                .field(FieldDescriptor::simple("name", ValueKind::String).with_languages(["en", "fr"]))
                .field(FieldDescriptor::simple("vintage", ValueKind::Calendar))
                .field(
                    FieldDescriptor::association("maker", "Winery")
                        .with_fetch(FetchMode::Eager)
                        .with_cascade([Cascade::Save]),
                ),
        );
    provider
}

fn demo_save_and_find(template: &SemanticTemplate) -> anyhow::Result<()> {
    println!("=== Save and find ===");
    let winery_id = NamedNode::new(format!("{}chateau-margaux", WINE))?;
    let wine_id = NamedNode::new(format!("{}margaux-1996", WINE))?;

    let winery = EntityRef::new(
        DynamicEntity::new("Winery")
            .with("uri", winery_id.clone())
            .with("name", "Château Margaux"),
    );
    let wine = EntityRef::new(
        DynamicEntity::new("Wine")
            .with("uri", wine_id.clone())
            .with("name", "Margaux")
            .with("vintage", XsdCalendar::year(1996))
            .with("maker", winery),
    );
    template.save(&wine)?;
    println!("✓ Saved {} and its winery", wine_id);

    let loaded = template
        .find("Wine", &wine_id)?
        .context("saved wine not found")?;
    println!("  name:    {:?}", loaded.get("name")?);
    println!("  vintage: {:?}", loaded.get("vintage")?);
    if let Some(maker) = loaded.get("maker")?.as_entity() {
        println!("  maker:   {:?}", maker.get("name")?);
    }

    println!("✓ {} wineries, {} wines", template.count("Winery")?, template.count("Wine")?);
    Ok(())
}
