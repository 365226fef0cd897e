//! Store invariants: id indexing, structural equality across stores, and
//! cycle detection.

use tempeval::{Annotation, AnnotationStore, Error};

fn filled(ids: &[(&str, &str, (usize, usize))]) -> AnnotationStore {
    let mut store = AnnotationStore::new();
    for (id, type_name, (start, end)) in ids {
        store
            .append(Annotation::entity(*id, *type_name).with_span(*start, *end))
            .unwrap();
    }
    store
}

#[test]
fn select_id_returns_the_exact_annotation_inserted() {
    let store = filled(&[
        ("1@e@doc@gold", "EVENT", (0, 4)),
        ("2@e@doc@gold", "TIMEX3", (8, 12)),
        ("3@e@doc@gold", "EVENT", (20, 26)),
    ]);
    for id in ["1@e@doc@gold", "2@e@doc@gold", "3@e@doc@gold"] {
        let annotation = store.select_id(id).unwrap();
        assert_eq!(annotation.id, id);
    }
    assert!(matches!(
        store.select_id("9@e@doc@gold"),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn structural_equality_ignores_store_and_ids() {
    let mut first = AnnotationStore::new();
    first
        .append(Annotation::entity("a1", "EVENT").with_span(0, 4))
        .unwrap();
    first
        .append(
            Annotation::relation("a2", "TLINK")
                .with_reference("Source", "a1")
                .with_scalar("Type", "BEFORE"),
        )
        .unwrap();

    let mut second = AnnotationStore::new();
    second
        .append(Annotation::entity("b9", "EVENT").with_span(0, 4))
        .unwrap();
    second
        .append(
            Annotation::relation("b7", "TLINK")
                .with_reference("Source", "b9")
                .with_scalar("Type", "BEFORE"),
        )
        .unwrap();

    let first_relation = first.select_id("a2").unwrap();
    let second_relation = second.select_id("b7").unwrap();
    let first_key = first.key_of(first_relation).unwrap();
    let second_key = second.key_of(second_relation).unwrap();
    assert_eq!(first_key, second_key);

    // Equal keys hash identically: same single entry after set insertion.
    let mut set = std::collections::HashSet::new();
    set.insert(first_key);
    set.insert(second_key);
    assert_eq!(set.len(), 1);
}

#[test]
fn property_differences_break_structural_equality() {
    let mut first = AnnotationStore::new();
    first
        .append(
            Annotation::entity("a", "EVENT")
                .with_span(0, 4)
                .with_scalar("DocTimeRel", "BEFORE"),
        )
        .unwrap();
    let mut second = AnnotationStore::new();
    second
        .append(
            Annotation::entity("a", "EVENT")
                .with_span(0, 4)
                .with_scalar("DocTimeRel", "AFTER"),
        )
        .unwrap();
    let first_key = first.key_of(first.select_id("a").unwrap()).unwrap();
    let second_key = second.key_of(second.select_id("a").unwrap()).unwrap();
    assert_ne!(first_key, second_key);
}

#[test]
fn mutual_reference_cycle_is_found() {
    let mut store = AnnotationStore::new();
    store
        .append(Annotation::relation("a", "TLINK").with_reference("Target", "b"))
        .unwrap();
    store
        .append(Annotation::relation("b", "TLINK").with_reference("Target", "a"))
        .unwrap();
    assert!(store.find_self_referential().is_some());
}

#[test]
fn shared_target_without_cycle_is_not_flagged() {
    let mut store = AnnotationStore::new();
    store
        .append(Annotation::entity("c", "EVENT").with_span(0, 4))
        .unwrap();
    store
        .append(Annotation::relation("a", "TLINK").with_reference("Target", "c"))
        .unwrap();
    store
        .append(Annotation::relation("b", "TLINK").with_reference("Target", "c"))
        .unwrap();
    assert!(store.find_self_referential().is_none());
}

#[test]
fn direct_self_reference_is_found() {
    let mut store = AnnotationStore::new();
    store
        .append(Annotation::relation("r", "TLINK").with_reference("Target", "r"))
        .unwrap();
    let offender = store.find_self_referential().unwrap();
    assert_eq!(offender.id, "r");
}

#[test]
fn longer_cycles_are_found_too() {
    let mut store = AnnotationStore::new();
    store
        .append(Annotation::relation("a", "TLINK").with_reference("Target", "b"))
        .unwrap();
    store
        .append(Annotation::relation("b", "TLINK").with_reference("Target", "c"))
        .unwrap();
    store
        .append(Annotation::relation("c", "TLINK").with_reference("Target", "a"))
        .unwrap();
    assert!(store.find_self_referential().is_some());
}

#[test]
fn remove_then_reinsert_under_same_id() {
    let mut store = filled(&[("a", "EVENT", (0, 4))]);
    let removed = store.remove("a").unwrap();
    assert_eq!(removed.id, "a");
    assert!(store.is_empty());
    store.append(removed).unwrap();
    assert_eq!(store.len(), 1);
}

#[test]
fn identical_span_entities_are_grouped() {
    let mut store = AnnotationStore::new();
    store
        .append(Annotation::entity("a", "EVENT").with_span(0, 4))
        .unwrap();
    store
        .append(Annotation::entity("b", "TIMEX3").with_span(0, 4))
        .unwrap();
    store
        .append(Annotation::entity("c", "EVENT").with_span(9, 12))
        .unwrap();
    let groups = store.entities_with_identical_spans();
    assert_eq!(groups.len(), 1);
    let (spans, members) = &groups[0];
    assert_eq!(spans, &vec![(0, 4)]);
    let ids: Vec<&str> = members.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);
}
