use itemstore_core::{
    ConflictPolicy, DbError, ErrorKind, Item, ItemSnapshot, ItemStore, MissingRowPolicy, NewItem,
    RepoError, StoreConfig,
};

#[test]
fn insert_then_snapshot_roundtrips_field_values() {
    let store = ItemStore::open_in_memory().unwrap();
    let item = Item::new(1, "A").unwrap().with_description("first");

    store.insert(&item).unwrap();

    let snapshot = current(&store);
    assert_eq!(snapshot.items, vec![item]);
    assert_eq!(snapshot.sequence, 1);
}

#[test]
fn delete_removes_item_by_identity() {
    let store = ItemStore::open_in_memory().unwrap();
    let item = Item::new(5, "gone soon").unwrap();
    store.insert(&item).unwrap();

    // Only the identity is used to match.
    let stale_copy = Item::new(5, "different payload").unwrap();
    store.delete(&stale_copy).unwrap();

    assert!(current(&store).items.iter().all(|stored| stored.id != 5));
}

#[test]
fn duplicate_insert_fails_with_constraint_violation_by_default() {
    let store = ItemStore::open_in_memory().unwrap();
    let original = Item::new(1, "original").unwrap();
    store.insert(&original).unwrap();

    let err = store
        .insert(&Item::new(1, "duplicate").unwrap())
        .unwrap_err();
    assert!(matches!(err, RepoError::ConstraintViolation(1)));
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

    let snapshot = current(&store);
    assert_eq!(snapshot.items, vec![original]);
    assert_eq!(snapshot.sequence, 1);
}

#[test]
fn duplicate_insert_with_replace_policy_keeps_second_values() {
    let store = ItemStore::open(
        StoreConfig::in_memory().with_conflict_policy(ConflictPolicy::Replace),
    )
    .unwrap();

    for round in 0..5 {
        let item = Item::new(1, format!("round {round}")).unwrap();
        store.insert(&item).unwrap();
        assert_eq!(current(&store).items, vec![item]);
    }
}

#[test]
fn deleting_missing_identity_is_a_noop_by_default() {
    let store = ItemStore::open_in_memory().unwrap();
    store.insert(&Item::new(1, "A").unwrap()).unwrap();
    let before = current(&store);

    store.delete(&Item::new(99, "ghost").unwrap()).unwrap();

    assert_eq!(current(&store), before);
}

#[test]
fn deleting_missing_identity_can_be_reported_as_not_found() {
    let store = ItemStore::open(
        StoreConfig::in_memory().with_missing_row_policy(MissingRowPolicy::Error),
    )
    .unwrap();
    store.insert(&Item::new(1, "A").unwrap()).unwrap();
    let before = current(&store);

    let err = store.delete(&Item::new(2, "B").unwrap()).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(2)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(current(&store), before);
}

#[test]
fn insert_two_then_delete_first_scenario() {
    let store = ItemStore::open_in_memory().unwrap();
    let a = Item::new(1, "A").unwrap();
    let b = Item::new(2, "B").unwrap();

    store.insert(&b).unwrap();
    store.insert(&a).unwrap();
    assert_eq!(current(&store).items, vec![a.clone(), b.clone()]);

    store.delete(&a).unwrap();
    assert_eq!(current(&store).items, vec![b]);
}

#[test]
fn insert_new_assigns_increasing_ids() {
    let store = ItemStore::open_in_memory().unwrap();
    store.insert(&Item::new(10, "fixed").unwrap()).unwrap();

    let first = store.insert_new(&NewItem::new("auto one")).unwrap();
    let second = store
        .insert_new(&NewItem::new("auto two").with_description("more"))
        .unwrap();

    assert!(first > 10);
    assert!(second > first);
    let names: Vec<_> = current(&store)
        .items
        .into_iter()
        .map(|item| item.name)
        .collect();
    assert_eq!(names, vec!["fixed", "auto one", "auto two"]);
}

#[test]
fn invalid_item_is_rejected_before_storage() {
    let store = ItemStore::open_in_memory().unwrap();
    let invalid = Item {
        id: -1,
        name: "bad".to_string(),
        description: None,
    };

    let err = store.insert(&invalid).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(current(&store).items.is_empty());
}

#[test]
fn file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.db");

    {
        let store = ItemStore::open(StoreConfig::file(&path)).unwrap();
        store.insert(&Item::new(1, "A").unwrap()).unwrap();
        store.insert(&Item::new(2, "B").unwrap()).unwrap();
        store.delete(&Item::new(1, "A").unwrap()).unwrap();
    }

    let reopened = ItemStore::open(StoreConfig::file(&path)).unwrap();
    assert_eq!(current(&reopened).items, vec![Item::new(2, "B").unwrap()]);
}

#[test]
fn second_store_on_same_file_is_refused_while_first_is_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.db");

    let first = ItemStore::open(StoreConfig::file(&path)).unwrap();
    let err = match ItemStore::open(StoreConfig::file(&path)) {
        Err(err) => err,
        Ok(_) => panic!("second writer must be refused"),
    };
    assert!(matches!(err, RepoError::Db(DbError::StoreLocked(_))));
    assert_eq!(err.kind(), ErrorKind::Io);

    drop(first);
    ItemStore::open(StoreConfig::file(&path)).unwrap();
}

fn current(store: &ItemStore) -> ItemSnapshot {
    store.fetch_all().unwrap().recv().unwrap().unwrap()
}
