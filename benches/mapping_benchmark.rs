use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use samyama_ogm::{
    DynamicEntity, EntityRef, FieldDescriptor, MappingConfig, MemoryStore, NamedNode,
    SemanticTemplate, StaticMetadataProvider, TypeDescriptor, ValueKind, XsdCalendar,
};
use std::sync::Arc;

const NS: &str = "http://example.org/wine#";

fn template() -> SemanticTemplate {
    let mut provider = StaticMetadataProvider::new();
    provider.register_dynamic(
        TypeDescriptor::new("Wine")
            .with_namespace(NS)
            .field(FieldDescriptor::id_field("uri"))
            .field(FieldDescriptor::simple("name", ValueKind::String))
            .field(FieldDescriptor::simple("vintage", ValueKind::Calendar))
            .field(FieldDescriptor::simple("price", ValueKind::Float)),
    );
    SemanticTemplate::new(
        Arc::new(MemoryStore::new()),
        Arc::new(provider),
        MappingConfig::default(),
    )
    .unwrap()
}

fn wine(i: usize) -> EntityRef {
    EntityRef::new(
        DynamicEntity::new("Wine")
            .with("uri", NamedNode::new(format!("{}wine{}", NS, i)).unwrap())
            .with("name", format!("Wine {}", i))
            .with("vintage", XsdCalendar::year(1990 + (i % 30) as i64))
            .with("price", i as f64 * 1.5),
    )
}

/// Benchmark saving batches of entities in one unit of work
fn bench_save_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("save_all");

    for size in [100, 1000].iter() {
        let wines: Vec<EntityRef> = (0..*size).map(wine).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let template = template();
                template.save_all(&wines).unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark loading single entities by id
fn bench_find(c: &mut Criterion) {
    let template = template();
    let wines: Vec<EntityRef> = (0..1000).map(wine).collect();
    template.save_all(&wines).unwrap();
    let id = NamedNode::new(format!("{}wine500", NS)).unwrap();

    c.bench_function("find", |b| {
        b.iter(|| {
            let found = template.find("Wine", &id).unwrap();
            criterion::black_box(found);
        });
    });
}

/// Benchmark counting and paging over stored instances
fn bench_count_and_page(c: &mut Criterion) {
    let template = template();
    let wines: Vec<EntityRef> = (0..1000).map(wine).collect();
    template.save_all(&wines).unwrap();

    c.bench_function("count", |b| {
        b.iter(|| criterion::black_box(template.count("Wine").unwrap()));
    });

    c.bench_function("find_page_50", |b| {
        b.iter(|| criterion::black_box(template.find_page("Wine", 500, 50).unwrap()));
    });
}

criterion_group!(benches, bench_save_all, bench_find, bench_count_and_page);
criterion_main!(benches);
