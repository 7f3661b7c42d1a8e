use gallery_core::db::open_db;
use gallery_core::db::open_db_in_memory;
use gallery_core::{
    import_seed_file, import_seed_json, CatalogRepository, SeedError, SqliteCatalogRepository,
};
use serde_json::json;
use std::fs;

fn seed_text() -> String {
    json!({
        "archetypes": ["Monk", "Sun", "  "],
        "items": [
            { "id": 1, "archetype": "Black Star" },
            { "id": 2, "archetype": "monk", "image": "two.gif", "likes": 4 },
            { "id": 3 }
        ]
    })
    .to_string()
}

#[test]
fn import_creates_archetypes_and_items() {
    let mut conn = open_db_in_memory().unwrap();
    let report = import_seed_json(&mut conn, &seed_text()).unwrap();
    assert_eq!(report.items_upserted, 3);
    assert_eq!(report.archetypes_created, 3);
    assert_eq!(report.archetypes_existing, 1);

    let repo = SqliteCatalogRepository::new(&conn);
    assert_eq!(repo.count_items().unwrap(), 3);
    let names = repo
        .list_archetypes()
        .unwrap()
        .into_iter()
        .map(|archetype| archetype.name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Black Star", "Monk", "Sun"]);

    let item = repo.get_item(2).unwrap().unwrap();
    assert_eq!(item.image.as_deref(), Some("two.gif"));
    assert_eq!(item.likes, 4);
}

#[test]
fn reimport_is_idempotent() {
    let mut conn = open_db_in_memory().unwrap();
    import_seed_json(&mut conn, &seed_text()).unwrap();
    let second = import_seed_json(&mut conn, &seed_text()).unwrap();

    assert_eq!(second.archetypes_created, 0);
    let repo = SqliteCatalogRepository::new(&conn);
    assert_eq!(repo.count_items().unwrap(), 3);
    assert_eq!(repo.list_archetypes().unwrap().len(), 3);
}

#[test]
fn invalid_item_aborts_whole_import() {
    let mut conn = open_db_in_memory().unwrap();
    let text = json!({
        "archetypes": ["Monk"],
        "items": [{ "id": 1 }, { "id": -5 }]
    })
    .to_string();

    let err = import_seed_json(&mut conn, &text).unwrap_err();
    assert!(matches!(err, SeedError::Repo(_)));

    let repo = SqliteCatalogRepository::new(&conn);
    assert_eq!(repo.count_items().unwrap(), 0);
    assert!(repo.list_archetypes().unwrap().is_empty());
}

#[test]
fn import_from_file_and_report_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let seed_path = dir.path().join("seed.json");
    fs::write(&seed_path, seed_text()).unwrap();

    let mut conn = open_db(dir.path().join("gallery.db")).unwrap();
    let report = import_seed_file(&mut conn, &seed_path).unwrap();
    assert_eq!(report.items_upserted, 3);

    let bad_path = dir.path().join("bad.json");
    fs::write(&bad_path, "{\"items\": [{\"id\": \"x\"}]}").unwrap();
    assert!(matches!(
        import_seed_file(&mut conn, &bad_path).unwrap_err(),
        SeedError::Parse(_)
    ));

    assert!(matches!(
        import_seed_file(&mut conn, dir.path().join("missing.json")).unwrap_err(),
        SeedError::Io { .. }
    ));
}
