use replset_catalog::IndexCatalog;
use replset_catalog::IndexDescriptor;
use replset_catalog::IndexIterator;
use replset_catalog::KeyPattern;
use replset_catalog::ReadSnapshot;
use replset_catalog::Timestamp;

fn names(
    catalog: &IndexCatalog,
    ru: &ReadSnapshot,
    include_unfinished: bool,
) -> Vec<String> {
    catalog
        .get_index_iterator(ru, include_unfinished)
        .map(|e| e.name().to_string())
        .collect()
}

#[test]
fn test_reader_pinned_before_commit_never_sees_new_index() {
    let mut catalog = IndexCatalog::with_id_index();
    let pinned = ReadSnapshot::at(Timestamp::new(100, 0));

    catalog
        .prepare_index_build(IndexDescriptor::new("email_1", KeyPattern::new([("email", 1)]), true))
        .unwrap();
    assert_eq!(names(&catalog, &pinned, false), vec!["_id_"]);
    assert_eq!(names(&catalog, &pinned, true), vec!["_id_", "email_1"]);

    catalog.commit_index_build("email_1", Some(Timestamp::new(120, 3))).unwrap();

    // Committed later in real time, still hidden from the old snapshot
    assert_eq!(names(&catalog, &pinned, false), vec!["_id_"]);
    assert_eq!(
        names(&catalog, &ReadSnapshot::at(Timestamp::new(120, 3)), false),
        vec!["_id_", "email_1"]
    );
    assert_eq!(names(&catalog, &ReadSnapshot::latest(), false), vec!["_id_", "email_1"]);
}

#[test]
fn test_iterator_protocol_through_trait_object() {
    let mut catalog = IndexCatalog::with_id_index();
    catalog
        .prepare_index_build(IndexDescriptor::new("a_1", KeyPattern::new([("a", 1)]), false))
        .unwrap();

    let ru = ReadSnapshot::latest();
    let mut it = catalog.get_index_iterator(&ru, true);
    assert!(it.more());
    assert_eq!(it.next().unwrap().name(), "_id_");
    assert!(it.more());
    assert_eq!(it.next().unwrap().name(), "a_1");
    assert!(!it.more());
    assert!(it.next().is_none());
    assert!(!it.more());
}
