use gallery_core::db::open_db_in_memory;
use gallery_core::{
    CatalogRepository, CatalogService, CatalogServiceError, GalleryConfig, GalleryQuery, Item,
    ItemListQuery, RepoError, SqliteCatalogRepository,
};
use rusqlite::Connection;

fn seed_items(conn: &Connection, count: i64) {
    let repo = SqliteCatalogRepository::new(conn);
    for id in 1..=count {
        let archetype = if id % 2 == 0 { "Monk" } else { "Black Star" };
        repo.upsert_item(&Item::new(id, Some(archetype.to_string())))
            .unwrap();
    }
}

#[test]
fn upsert_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCatalogRepository::new(&conn);

    let mut item = Item::new(42, Some("Black Star".to_string()));
    item.image = Some("custom.png".to_string());
    repo.upsert_item(&item).unwrap();

    let loaded = repo.get_item(42).unwrap().unwrap();
    assert_eq!(loaded, item);
    assert!(repo.get_item(43).unwrap().is_none());
}

#[test]
fn upsert_rejects_invalid_item() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCatalogRepository::new(&conn);

    let err = repo.upsert_item(&Item::new(-1, None)).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn list_items_is_sorted_by_id_and_filtered_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCatalogRepository::new(&conn);
    for id in [5, 1, 3] {
        repo.upsert_item(&Item::new(id, Some("Monk".to_string())))
            .unwrap();
    }
    repo.upsert_item(&Item::new(2, Some("Sun".to_string())))
        .unwrap();

    let all = repo.list_items(&ItemListQuery::default()).unwrap();
    let ids = all.iter().map(|item| item.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![1, 2, 3, 5]);

    let monks = repo
        .list_items(&ItemListQuery {
            archetypes: vec!["monk".to_string()],
            ..ItemListQuery::default()
        })
        .unwrap();
    assert_eq!(monks.len(), 3);

    let contradictory = repo
        .list_items(&ItemListQuery {
            archetypes: vec!["Monk".to_string(), "Sun".to_string()],
            ..ItemListQuery::default()
        })
        .unwrap();
    assert!(contradictory.is_empty());
}

#[test]
fn gallery_pages_are_one_based_with_has_more() {
    let conn = open_db_in_memory().unwrap();
    seed_items(&conn, 5);
    let service = CatalogService::new(SqliteCatalogRepository::new(&conn));

    let first = service
        .list_items(&GalleryQuery {
            page: 0,
            page_size: Some(2),
            ..GalleryQuery::default()
        })
        .unwrap();
    assert_eq!(first.page, 1);
    assert_eq!(
        first.items.iter().map(|item| item.id).collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert!(first.has_more);

    let last = service
        .list_items(&GalleryQuery {
            page: 3,
            page_size: Some(2),
            ..GalleryQuery::default()
        })
        .unwrap();
    assert_eq!(
        last.items.iter().map(|item| item.id).collect::<Vec<_>>(),
        vec![5]
    );
    assert!(!last.has_more);
}

#[test]
fn gallery_page_size_uses_config_default_and_cap() {
    let conn = open_db_in_memory().unwrap();
    seed_items(&conn, 12);
    let config = GalleryConfig {
        default_page_size: 4,
        max_page_size: 10,
        ..GalleryConfig::default()
    };
    let service = CatalogService::with_config(SqliteCatalogRepository::new(&conn), config);

    let defaulted = service.list_items(&GalleryQuery::default()).unwrap();
    assert_eq!(defaulted.page_size, 4);
    assert_eq!(defaulted.items.len(), 4);

    let capped = service
        .list_items(&GalleryQuery {
            page_size: Some(500),
            ..GalleryQuery::default()
        })
        .unwrap();
    assert_eq!(capped.page_size, 10);
    assert_eq!(capped.items.len(), 10);
    assert!(capped.has_more);
}

#[test]
fn gallery_filter_matches_primary_archetype() {
    let conn = open_db_in_memory().unwrap();
    seed_items(&conn, 6);
    let service = CatalogService::new(SqliteCatalogRepository::new(&conn));

    let page = service
        .list_items(&GalleryQuery {
            archetypes: vec!["  black star ".to_string()],
            ..GalleryQuery::default()
        })
        .unwrap();
    assert_eq!(
        page.items.iter().map(|item| item.id).collect::<Vec<_>>(),
        vec![1, 3, 5]
    );
}

#[test]
fn create_archetype_trims_and_rejects_duplicates() {
    let conn = open_db_in_memory().unwrap();
    let service = CatalogService::new(SqliteCatalogRepository::new(&conn));

    let created = service.create_archetype("  Monk ").unwrap();
    assert_eq!(created.name, "Monk");
    assert!(created.created_at.is_some());

    match service.create_archetype("MONK").unwrap_err() {
        CatalogServiceError::DuplicateArchetype(existing) => assert_eq!(existing.id, created.id),
        other => panic!("unexpected error: {other}"),
    }

    assert!(matches!(
        service.create_archetype("   ").unwrap_err(),
        CatalogServiceError::InvalidName(_)
    ));
}

#[test]
fn list_archetypes_is_sorted_by_name() {
    let conn = open_db_in_memory().unwrap();
    let service = CatalogService::new(SqliteCatalogRepository::new(&conn));
    for name in ["sun", "Alien", "Monk"] {
        service.create_archetype(name).unwrap();
    }

    let catalog = service.list_archetypes();
    assert!(!catalog.degraded);
    let names = catalog
        .archetypes
        .iter()
        .map(|archetype| archetype.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Alien", "Monk", "sun"]);
}

#[test]
fn votable_archetypes_exclude_primary() {
    let conn = open_db_in_memory().unwrap();
    let service = CatalogService::new(SqliteCatalogRepository::new(&conn));
    for name in ["Monk", "Sun", "Moon"] {
        service.create_archetype(name).unwrap();
    }

    let item = Item::new(1, Some("sun".to_string()));
    let names = service
        .votable_archetypes(&item)
        .into_iter()
        .map(|archetype| archetype.name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Monk", "Moon"]);

    let unclassified = Item::new(2, None);
    assert_eq!(service.votable_archetypes(&unclassified).len(), 3);
}

#[test]
fn like_item_increments_counter() {
    let conn = open_db_in_memory().unwrap();
    seed_items(&conn, 1);
    let service = CatalogService::new(SqliteCatalogRepository::new(&conn));

    assert_eq!(service.like_item(1).unwrap(), 1);
    assert_eq!(service.like_item(1).unwrap(), 2);
    assert_eq!(service.get_item(1).unwrap().likes, 2);

    assert!(matches!(
        service.like_item(99).unwrap_err(),
        CatalogServiceError::ItemNotFound(99)
    ));
}

#[test]
fn reseeding_never_lowers_likes() {
    let conn = open_db_in_memory().unwrap();
    seed_items(&conn, 1);
    let repo = SqliteCatalogRepository::new(&conn);
    repo.increment_likes(1).unwrap();
    repo.increment_likes(1).unwrap();

    repo.upsert_item(&Item::new(1, Some("Black Star".to_string())))
        .unwrap();
    assert_eq!(repo.get_item(1).unwrap().unwrap().likes, 2);
}
