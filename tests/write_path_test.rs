mod common;

use common::{entity, iri, template, template_with, wine};
use samyama_ogm::convert::{CreateHandler, DeleteHandler, EntityWriter, UpdateHandler};
use samyama_ogm::rdf::rdf_type;
use samyama_ogm::{
    Direction, DynamicEntity, EntityRef, FieldDescriptor, FieldValue, Literal, MappingConfig,
    MappingError, MappingPolicy, MemoryStore, Quad, SemanticError, SemanticTemplate,
    StatementStore, StaticMetadataProvider, TypeDescriptor,
};
use std::sync::Arc;

fn chain(type_name: &str) -> (EntityRef, EntityRef, EntityRef) {
    let c = entity(type_name, "c");
    let b = entity(type_name, "b");
    b.set("next", c.clone()).unwrap();
    let a = entity(type_name, "a");
    a.set("next", b.clone()).unwrap();
    (a, b, c)
}

#[test]
fn test_save_replaces_previous_values() {
    let (_, template) = template();
    template.save(&wine("merlot", "Merlot")).unwrap();

    let merlot = wine("merlot", "Merlot Reserve");
    merlot.set("price", 42.0).unwrap();
    template.save(&merlot).unwrap();

    let stored = template.database().statements_by_subject(iri("merlot")).unwrap();
    // type, name, price
    assert_eq!(stored.len(), 3);
    let names = template.database().statements_by_predicate(iri("name")).unwrap();
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].object.as_literal().unwrap().value(), "Merlot Reserve");
}

#[test]
fn test_unchanged_entity_produces_empty_diff() {
    let (store, template) = template();
    let merlot = wine("merlot", "Merlot");
    merlot.set("maker", entity("Winery", "margaux")).unwrap();
    template.save(&merlot).unwrap();

    let conn = store.connection().unwrap();
    let mut writer = EntityWriter::new(
        template.context(),
        conn.as_ref(),
        UpdateHandler { allow_empty: true },
    );
    writer.write(&merlot, &MappingPolicy::new()).unwrap();
    let diff = writer.finish();
    assert!(diff.is_empty(), "unexpected diff: {:?}", diff);
}

#[test]
fn test_loaded_lower_preference_language_is_written_back_unchanged() {
    let (store, template) = template();
    let merlot = iri("merlot");
    template
        .database()
        .add_statements(&[
            Quad::triple(merlot.clone(), rdf_type(), iri("Wine")),
            Quad::triple(
                merlot.clone(),
                iri("name"),
                Literal::new_language_tagged_literal("Rouge", "fr").unwrap(),
            ),
        ])
        .unwrap();

    let loaded = template.find("Wine", &merlot).unwrap().unwrap();
    assert_eq!(loaded.get("name").unwrap(), FieldValue::lang_string("Rouge", "fr"));

    let conn = store.connection().unwrap();
    let mut writer = EntityWriter::new(
        template.context(),
        conn.as_ref(),
        UpdateHandler { allow_empty: true },
    );
    writer.write(&loaded, &MappingPolicy::new()).unwrap();
    let diff = writer.finish();
    assert!(diff.is_empty(), "unexpected diff: {:?}", diff);
    drop(conn);

    template.save(&loaded).unwrap();
    let names = template.database().statements_by_predicate(iri("name")).unwrap();
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].object.as_literal().unwrap().language(), Some("fr"));
}

#[test]
fn test_changed_field_diff_touches_only_that_field() {
    let (store, template) = template();
    let merlot = wine("merlot", "Merlot");
    template.save(&merlot).unwrap();
    merlot.set("name", "Merlot Reserve").unwrap();

    let conn = store.connection().unwrap();
    let mut writer = EntityWriter::new(
        template.context(),
        conn.as_ref(),
        UpdateHandler { allow_empty: true },
    );
    writer.write(&merlot, &MappingPolicy::new()).unwrap();
    let diff = writer.finish();
    assert_eq!(diff.adds.len(), 1);
    assert_eq!(diff.deletes.len(), 1);
    assert_eq!(diff.adds[0].object.as_literal().unwrap().value(), "Merlot Reserve");
    assert_eq!(diff.deletes[0].object.as_literal().unwrap().value(), "Merlot");
}

#[test]
fn test_create_adds_without_removing() {
    let (store, template) = template();
    template.create(&wine("merlot", "Merlot")).unwrap();
    template.create(&wine("merlot", "Merlot Reserve")).unwrap();

    let names = template.database().statements_by_predicate(iri("name")).unwrap();
    assert_eq!(names.len(), 2);

    let conn = store.connection().unwrap();
    let mut writer = EntityWriter::new(
        template.context(),
        conn.as_ref(),
        CreateHandler { allow_empty: true },
    );
    writer.write(&wine("new", "New"), &MappingPolicy::new()).unwrap();
    let diff = writer.finish();
    assert_eq!(diff.adds.len(), 2);
    assert!(diff.deletes.is_empty());
}

#[test]
fn test_cascade_all_reaches_depth_three() {
    let (_, template) = template();
    let (a, _, _) = chain("Part");
    template.save(&a).unwrap();

    for local in ["a", "b", "c"] {
        assert!(template.exists("Part", &iri(local)).unwrap());
    }
    assert_eq!(template.count("Part").unwrap(), 3);

    template.delete(&a).unwrap();
    assert_eq!(template.count("Part").unwrap(), 0);
    assert_eq!(template.database().count().unwrap(), 0);
}

#[test]
fn test_save_cascade_stops_at_undeclared_association() {
    let (_, template) = template();
    let pinot = wine("pinot", "Pinot");
    let margaux = entity("Winery", "margaux");
    margaux.set("wines", FieldValue::List(vec![pinot.into()])).unwrap();
    let merlot = wine("merlot", "Merlot");
    merlot.set("maker", margaux).unwrap();

    template.save(&merlot).unwrap();

    assert!(template.exists("Wine", &iri("merlot")).unwrap());
    assert!(template.exists("Winery", &iri("margaux")).unwrap());
    assert!(!template.exists("Wine", &iri("pinot")).unwrap());
    assert!(template
        .database()
        .statements_by_predicate(iri("name"))
        .unwrap()
        .iter()
        .all(|q| q.subject.as_named_node() != Some(&iri("pinot"))));
}

#[test]
fn test_no_cascade_writes_only_the_link() {
    let (_, template) = template();
    let (a, _, _) = chain("Loose");
    template.save(&a).unwrap();

    assert!(template.exists("Loose", &iri("a")).unwrap());
    assert!(!template.exists("Loose", &iri("b")).unwrap());
    assert!(!template.exists("Loose", &iri("c")).unwrap());

    let links = template.database().statements_by_predicate(iri("next")).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].object.as_named_node(), Some(&iri("b")));
}

#[test]
fn test_cycle_writes_each_entity_once() {
    let (_, template) = template();
    let alice = entity("Person", "alice");
    let bob = entity("Person", "bob");
    alice.set("friend", bob.clone()).unwrap();
    bob.set("friend", alice.clone()).unwrap();

    template.save(&alice).unwrap();

    let types = template.database().statements_by_predicate(rdf_type()).unwrap();
    assert_eq!(types.len(), 2);
    let friends = template.database().statements_by_predicate(iri("friend")).unwrap();
    assert_eq!(friends.len(), 2);
}

#[test]
fn test_both_direction_writes_two_statements() {
    let (_, template) = template();
    let alice = entity("Person", "alice");
    alice
        .set("knows", FieldValue::List(vec![FieldValue::Iri(iri("bob"))]))
        .unwrap();
    template.save(&alice).unwrap();

    let knows = template.database().statements_by_predicate(iri("knows")).unwrap();
    assert_eq!(knows.len(), 2);
    assert!(knows.iter().any(|q| q.subject.as_named_node() == Some(&iri("alice"))
        && q.object.as_named_node() == Some(&iri("bob"))));
    assert!(knows.iter().any(|q| q.subject.as_named_node() == Some(&iri("bob"))
        && q.object.as_named_node() == Some(&iri("alice"))));

    let loaded = template.find("Person", &iri("alice")).unwrap().unwrap();
    let known = loaded.get("knows").unwrap();
    let known = known.as_list().unwrap();
    assert_eq!(known.len(), 1);
    assert_eq!(known[0].as_lazy().unwrap().id(), &iri("bob"));
}

#[test]
fn test_incoming_direction_writes_reverse_statement() {
    let (_, template) = template();
    let margaux = entity("Winery", "margaux");
    margaux
        .set("wines", FieldValue::List(vec![FieldValue::Iri(iri("merlot"))]))
        .unwrap();
    template.save(&margaux).unwrap();

    let makers = template.database().statements_by_predicate(iri("maker")).unwrap();
    assert_eq!(makers.len(), 1);
    assert_eq!(makers[0].subject.as_named_node(), Some(&iri("merlot")));
    assert_eq!(makers[0].object.as_named_node(), Some(&iri("margaux")));
    assert!(template.database().statements_by_predicate(iri("wines")).unwrap().is_empty());
}

#[test]
fn test_delete_leaves_uncascaded_relations() {
    let (_, template) = template();
    let merlot = wine("merlot", "Merlot");
    merlot.set("maker", entity("Winery", "margaux")).unwrap();
    template.save(&merlot).unwrap();

    template.delete(&merlot).unwrap();
    assert!(!template.exists("Wine", &iri("merlot")).unwrap());
    assert!(template.exists("Winery", &iri("margaux")).unwrap());
    assert!(template
        .database()
        .statements_by_subject(iri("merlot"))
        .unwrap()
        .is_empty());
}

#[test]
fn test_delete_removes_stored_values_missing_in_memory() {
    let (_, template) = template();
    template.save(&wine("merlot", "Merlot")).unwrap();

    // Only the id is known; the stored name still goes
    template.delete(&entity("Wine", "merlot")).unwrap();
    assert_eq!(template.database().count().unwrap(), 0);
}

#[test]
fn test_delete_cascades_through_lazy_reference() {
    let (_, template) = template();
    let (a, _, _) = chain("Part");
    template.save(&a).unwrap();

    let loaded = template.find("Part", &iri("a")).unwrap().unwrap();
    assert!(loaded.get("next").unwrap().as_lazy().is_some());
    template.delete(&loaded).unwrap();

    assert!(!template.exists("Part", &iri("a")).unwrap());
    assert!(!template.exists("Part", &iri("b")).unwrap());
}

#[test]
fn test_delete_by_id_and_delete_all() {
    let (_, template) = template();
    let wines: Vec<EntityRef> = ["a", "b", "c"].iter().map(|l| wine(l, l)).collect();
    template.save_all(&wines).unwrap();
    template.save(&entity("Winery", "margaux")).unwrap();

    template.delete_by_id("Wine", &iri("a")).unwrap();
    assert_eq!(template.count("Wine").unwrap(), 2);

    assert_eq!(template.delete_all("Wine").unwrap(), 2);
    assert_eq!(template.count("Wine").unwrap(), 0);
    assert_eq!(template.count("Winery").unwrap(), 1);
}

#[test]
fn test_delete_writer_records_only_deletions() {
    let (store, template) = template();
    let conn = store.connection().unwrap();
    let mut writer = EntityWriter::new(template.context(), conn.as_ref(), DeleteHandler);
    writer.write(&wine("merlot", "Merlot"), &MappingPolicy::new()).unwrap();
    let diff = writer.finish();
    assert!(diff.adds.is_empty());
    assert_eq!(diff.deletes.len(), 2);
}

#[test]
fn test_transient_fields_are_not_written() {
    let (_, template) = template();
    let merlot = wine("merlot", "Merlot");
    merlot.set("cellarNote", "Top shelf").unwrap();
    template.save(&merlot).unwrap();

    assert!(template
        .database()
        .statements_by_predicate(iri("cellarNote"))
        .unwrap()
        .is_empty());
}

#[test]
fn test_empty_entity_rejected_when_configured() {
    let config = MappingConfig {
        allow_empty_entities: false,
        ..MappingConfig::default()
    };
    let (_, template) = template_with(config);
    let err = template.save(&entity("Wine", "bare")).unwrap_err();
    assert!(matches!(
        err,
        SemanticError::Mapping(MappingError::EmptyEntity(_))
    ));
    assert_eq!(template.database().count().unwrap(), 0);

    // Allowed by default: only the type statement is written
    let (_, template) = common::template();
    template.save(&entity("Wine", "bare")).unwrap();
    assert_eq!(template.database().count().unwrap(), 1);
}

#[test]
fn test_missing_id_is_rejected() {
    let (_, template) = template();
    let nameless = EntityRef::new(DynamicEntity::new("Wine").with("name", "Unknown"));
    let err = template.save(&nameless).unwrap_err();
    assert!(matches!(
        err,
        SemanticError::Mapping(MappingError::InvalidId { .. })
    ));
}

#[test]
fn test_association_rejects_literal_values() {
    let (_, template) = template();
    let merlot = wine("merlot", "Merlot");
    merlot.set("maker", 7i64).unwrap();
    let err = template.save(&merlot).unwrap_err();
    assert!(matches!(
        err,
        SemanticError::Mapping(MappingError::FieldRejected { .. })
    ));
    // Nothing from the failed unit of work is visible
    assert_eq!(template.database().count().unwrap(), 0);
}

#[test]
fn test_incoming_link_with_broken_related_type_fails() {
    let mut provider = StaticMetadataProvider::new();
    provider
        .register_dynamic(
            TypeDescriptor::new("Cellar")
                .with_namespace(common::NS)
                .field(FieldDescriptor::id_field("uri"))
                .field(
                    FieldDescriptor::association("racks", "Rack")
                        .with_direction(Direction::Incoming)
                        .mapped_by("cellar")
                        .collection(),
                ),
        )
        .register_dynamic(
            TypeDescriptor::new("Rack")
                .with_namespace(common::NS)
                .field(FieldDescriptor::association("cellar", "Cellar")),
        );
    let template = SemanticTemplate::new(
        Arc::new(MemoryStore::new()),
        Arc::new(provider),
        MappingConfig::default(),
    )
    .unwrap();

    let cellar = entity("Cellar", "vault");
    cellar
        .set("racks", FieldValue::List(vec![FieldValue::Iri(iri("rack1"))]))
        .unwrap();
    let err = template.save(&cellar).unwrap_err();
    assert!(matches!(
        err,
        SemanticError::Mapping(MappingError::InvalidMetadata { .. })
    ));
    assert_eq!(template.database().count().unwrap(), 0);
}
