use gallery_core::db::open_db_in_memory;
use gallery_core::{
    Archetype, CatalogRepository, Identity, Item, SqliteCatalogRepository, SqliteVoteRepository,
    Vote, VoteError, VoteOutcome, VoteRepository, VoteService,
};
use gallery_core::model::vote::VoteWrite;
use rusqlite::Connection;

struct Fixture {
    conn: Connection,
    monk: Archetype,
    sun: Archetype,
    black_star: Archetype,
}

fn fixture() -> Fixture {
    let conn = open_db_in_memory().unwrap();
    let (monk, sun, black_star) = {
        let repo = SqliteCatalogRepository::new(&conn);
        repo.upsert_item(&Item::new(7, Some("Black Star".to_string())))
            .unwrap();
        repo.upsert_item(&Item::new(8, None)).unwrap();
        (
            repo.create_archetype(&Archetype::new("Monk")).unwrap(),
            repo.create_archetype(&Archetype::new("Sun")).unwrap(),
            repo.create_archetype(&Archetype::new("Black Star")).unwrap(),
        )
    };
    Fixture {
        conn,
        monk,
        sun,
        black_star,
    }
}

#[test]
fn record_vote_creates_updates_and_skips_unchanged() {
    let mut fx = fixture();
    let mut repo = SqliteVoteRepository::new(&mut fx.conn);

    let write = repo.record_vote(&Vote::new(7, fx.monk.id, "a", 1)).unwrap();
    assert_eq!(write, VoteWrite::Created);
    assert_eq!(repo.total_for(7, fx.monk.id).unwrap(), 1);

    let write = repo.record_vote(&Vote::new(7, fx.monk.id, "a", 1)).unwrap();
    assert_eq!(write, VoteWrite::Unchanged);
    assert_eq!(repo.total_for(7, fx.monk.id).unwrap(), 1);

    let write = repo.record_vote(&Vote::new(7, fx.monk.id, "a", -1)).unwrap();
    assert_eq!(write, VoteWrite::Updated { old_value: 1 });
    assert_eq!(repo.total_for(7, fx.monk.id).unwrap(), -1);

    let stored = repo.find_vote(7, fx.monk.id, "a").unwrap().unwrap();
    assert_eq!(stored.value, -1);
    assert_eq!(repo.list_votes_for_item(7).unwrap().len(), 1);
}

#[test]
fn record_vote_rejects_unknown_targets() {
    let mut fx = fixture();
    let mut repo = SqliteVoteRepository::new(&mut fx.conn);

    let err = repo
        .record_vote(&Vote::new(404, fx.monk.id, "a", 1))
        .unwrap_err();
    assert!(matches!(err, gallery_core::RepoError::ItemNotFound(404)));
    assert_eq!(repo.total_for(404, fx.monk.id).unwrap(), 0);
}

#[test]
fn stored_secondary_set_excludes_primary_and_non_positive_totals() {
    let mut fx = fixture();
    let mut repo = SqliteVoteRepository::new(&mut fx.conn);
    repo.record_vote(&Vote::new(7, fx.monk.id, "a", 1)).unwrap();
    repo.record_vote(&Vote::new(7, fx.monk.id, "b", 1)).unwrap();
    repo.record_vote(&Vote::new(7, fx.sun.id, "a", 1)).unwrap();
    repo.record_vote(&Vote::new(7, fx.sun.id, "b", -1)).unwrap();
    repo.record_vote(&Vote::new(7, fx.black_star.id, "a", 1))
        .unwrap();

    let secondary = repo.list_secondary_archetypes(7).unwrap();
    assert_eq!(secondary.len(), 1);
    assert_eq!(secondary[0].name, "Monk");
    assert_eq!(secondary[0].weight, 2);
}

#[test]
fn monk_vote_then_retraction_updates_secondary_set() {
    let mut fx = fixture();
    let monk = fx.monk.id;
    let mut service = VoteService::new(SqliteVoteRepository::new(&mut fx.conn));
    let user_a = Identity::authenticated("user-a");

    let outcome = service.cast_vote(7, monk, &user_a, 1).unwrap();
    assert_eq!(
        outcome,
        VoteOutcome::Applied {
            previous: None,
            total: 1
        }
    );
    let secondary = service.secondary_archetypes(7);
    assert_eq!(secondary.len(), 1);
    assert_eq!(secondary[0].archetype_id, monk);
    assert_eq!(secondary[0].weight, 1);

    service.cast_vote(7, monk, &user_a, 0).unwrap();
    assert_eq!(service.total(7, monk), 0);
    assert!(service.secondary_archetypes(7).is_empty());
    assert!(service.stored_secondary_archetypes(7).unwrap().is_empty());
}

#[test]
fn negative_vote_at_zero_leaves_store_untouched() {
    let mut fx = fixture();
    let sun = fx.sun.id;
    {
        let mut service = VoteService::new(SqliteVoteRepository::new(&mut fx.conn));
        let outcome = service
            .cast_vote(7, sun, &Identity::authenticated("user-a"), -1)
            .unwrap();
        assert_eq!(outcome, VoteOutcome::BelowFloor);
    }

    let stored: i64 = fx
        .conn
        .query_row("SELECT COUNT(*) FROM archetype_votes;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(stored, 0);
}

#[test]
fn voting_on_primary_archetype_is_rejected() {
    let mut fx = fixture();
    let black_star = fx.black_star.id;
    let mut service = VoteService::new(SqliteVoteRepository::new(&mut fx.conn));

    let err = service
        .cast_vote(7, black_star, &Identity::authenticated("user-a"), 1)
        .unwrap_err();
    assert!(matches!(err, VoteError::PrimaryArchetype(id) if id == black_star));
}

#[test]
fn anonymous_identity_cannot_vote() {
    let mut fx = fixture();
    let monk = fx.monk.id;
    let mut service = VoteService::new(SqliteVoteRepository::new(&mut fx.conn));

    let err = service
        .cast_vote(7, monk, &Identity::anonymous("temp_abc123xyz"), 1)
        .unwrap_err();
    assert!(matches!(err, VoteError::Unauthorized));
}

#[test]
fn unknown_item_is_reported() {
    let mut fx = fixture();
    let monk = fx.monk.id;
    let mut service = VoteService::new(SqliteVoteRepository::new(&mut fx.conn));

    let err = service
        .cast_vote(404, monk, &Identity::authenticated("user-a"), 1)
        .unwrap_err();
    assert!(matches!(err, VoteError::ItemNotFound(404)));
}

#[test]
fn reopened_service_hydrates_from_store() {
    let mut fx = fixture();
    let monk = fx.monk.id;
    let sun = fx.sun.id;
    {
        let mut service = VoteService::new(SqliteVoteRepository::new(&mut fx.conn));
        for user in ["a", "b", "c"] {
            service
                .cast_vote(8, monk, &Identity::authenticated(user), 1)
                .unwrap();
        }
        service
            .cast_vote(8, sun, &Identity::authenticated("a"), 1)
            .unwrap();
        service
            .cast_vote(8, monk, &Identity::authenticated("b"), -1)
            .unwrap();
    }

    let mut service = VoteService::new(SqliteVoteRepository::new(&mut fx.conn));
    service.open_item(8).unwrap();
    assert_eq!(service.total(8, monk), 1);
    assert_eq!(service.total(8, sun), 1);
    assert_eq!(service.secondary_archetypes(8).len(), 2);

    let user_b = service.user_votes(8, &Identity::authenticated("b"));
    assert_eq!(user_b.get(&monk), Some(&-1));

    let stored = service.stored_secondary_archetypes(8).unwrap();
    let stored_names = stored
        .iter()
        .map(|entry| entry.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(stored_names, vec!["Monk", "Sun"]);
}

#[test]
fn stored_totals_match_sum_of_latest_votes() {
    let mut fx = fixture();
    let monk = fx.monk.id;
    let sequence = [("a", 1), ("b", 1), ("a", 0), ("c", 1), ("b", -1), ("a", 1)];
    {
        let mut service = VoteService::new(SqliteVoteRepository::new(&mut fx.conn));
        for (user, value) in sequence {
            service
                .cast_vote(8, monk, &Identity::authenticated(user), value)
                .unwrap();
        }
        assert_eq!(service.total(8, monk), 1);
    }

    let (stored_total, vote_sum): (i64, i64) = fx
        .conn
        .query_row(
            "SELECT
                (SELECT vote_count FROM item_archetype_totals WHERE item_id = 8),
                (SELECT SUM(vote_value) FROM archetype_votes WHERE item_id = 8);",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(stored_total, 1);
    assert_eq!(stored_total, vote_sum);
}
