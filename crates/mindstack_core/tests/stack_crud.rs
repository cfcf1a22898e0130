use mindstack_core::db::migrations::latest_version;
use mindstack_core::db::open_db_in_memory;
use mindstack_core::{Card, Group, RepoError, SqliteStackRepository, StackRepository};
use rusqlite::Connection;
use uuid::Uuid;

fn repo() -> SqliteStackRepository {
    SqliteStackRepository::try_new(open_db_in_memory().unwrap()).unwrap()
}

fn group_with_cards(texts: &[(&str, i64)]) -> Group {
    let cards = texts
        .iter()
        .enumerate()
        .map(|(seq, (text, ts))| Card::with_id(Uuid::new_v4(), *ts, seq as u32, *text).unwrap())
        .collect();
    Group::with_parts(Uuid::new_v4(), texts[0].1, "", false, cards)
}

#[test]
fn create_and_load_roundtrip() {
    let repo = repo();

    let group = group_with_cards(&[("first", 100), ("second", 200)]);
    repo.create_group(&group).unwrap();

    let loaded = repo.load_groups().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].uuid, group.uuid);
    let texts: Vec<_> = loaded[0]
        .cards()
        .iter()
        .map(|card| card.text.as_str())
        .collect();
    assert_eq!(texts, ["second", "first"]);
}

#[test]
fn append_card_to_missing_group_returns_not_found() {
    let repo = repo();

    let card = Card::with_id(Uuid::new_v4(), 100, 0, "orphan").unwrap();
    let missing = Uuid::new_v4();
    let err = repo.append_card(missing, &card).unwrap_err();
    assert!(matches!(err, RepoError::GroupNotFound(id) if id == missing));
}

#[test]
fn pop_newest_removes_display_first_card() {
    let repo = repo();

    let group = group_with_cards(&[("old", 100), ("new", 300), ("mid", 200)]);
    repo.create_group(&group).unwrap();

    let newest_uuid = group.newest_card().unwrap().uuid;
    let removed = repo.pop_newest(group.uuid).unwrap();
    assert_eq!(removed, Some(newest_uuid));

    let loaded = repo.load_groups().unwrap();
    assert_eq!(loaded[0].card_count(), 2);
    assert_eq!(loaded[0].newest_card().unwrap().text, "mid");
}

#[test]
fn popping_the_last_card_deletes_the_group() {
    let repo = repo();

    let group = group_with_cards(&[("only", 100)]);
    repo.create_group(&group).unwrap();

    repo.pop_newest(group.uuid).unwrap();
    assert!(repo.load_groups().unwrap().is_empty());

    // The cascade left no orphan cards behind either.
    let orphans: i64 = repo
        .connection()
        .query_row("SELECT COUNT(*) FROM cards;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(orphans, 0);
}

#[test]
fn pop_on_unknown_group_returns_none() {
    let repo = repo();
    assert_eq!(repo.pop_newest(Uuid::new_v4()).unwrap(), None);
}

#[test]
fn delete_group_removes_group_and_cards() {
    let repo = repo();

    let keep = group_with_cards(&[("keep", 100)]);
    let gone = group_with_cards(&[("gone-a", 100), ("gone-b", 200)]);
    repo.create_group(&keep).unwrap();
    repo.create_group(&gone).unwrap();

    repo.delete_group(gone.uuid).unwrap();

    let loaded = repo.load_groups().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].uuid, keep.uuid);

    let err = repo.delete_group(gone.uuid).unwrap_err();
    assert!(matches!(err, RepoError::GroupNotFound(_)));
}

#[test]
fn set_pinned_clears_other_pins_in_one_transaction() {
    let repo = repo();

    let first = group_with_cards(&[("first", 100)]);
    let second = group_with_cards(&[("second", 200)]);
    repo.create_group(&first).unwrap();
    repo.create_group(&second).unwrap();

    repo.set_pinned(first.uuid, true).unwrap();
    repo.set_pinned(second.uuid, true).unwrap();

    let pinned: Vec<_> = repo
        .load_groups()
        .unwrap()
        .into_iter()
        .filter(|group| group.pinned)
        .collect();
    assert_eq!(pinned.len(), 1);
    assert_eq!(pinned[0].uuid, second.uuid);

    repo.set_pinned(second.uuid, false).unwrap();
    assert!(repo.load_groups().unwrap().iter().all(|g| !g.pinned));
}

#[test]
fn load_orders_pinned_first_then_by_recency() {
    let repo = repo();

    let stale = group_with_cards(&[("stale", 100)]);
    let fresh = group_with_cards(&[("fresh", 900)]);
    let pinned = group_with_cards(&[("pinned", 50)]);
    repo.create_group(&stale).unwrap();
    repo.create_group(&fresh).unwrap();
    repo.create_group(&pinned).unwrap();
    repo.set_pinned(pinned.uuid, true).unwrap();

    let loaded = repo.load_groups().unwrap();
    let order: Vec<_> = loaded.iter().map(|group| group.uuid).collect();
    assert_eq!(order, [pinned.uuid, fresh.uuid, stale.uuid]);
}

#[test]
fn rename_group_persists() {
    let repo = repo();

    let group = group_with_cards(&[("note", 100)]);
    repo.create_group(&group).unwrap();
    repo.rename_group(group.uuid, "groceries").unwrap();

    let loaded = repo.load_groups().unwrap();
    assert_eq!(loaded[0].name, "groceries");
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqliteStackRepository::try_new(conn);
    match result {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE groups (
            uuid TEXT PRIMARY KEY NOT NULL,
            created_at INTEGER NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            pinned INTEGER NOT NULL DEFAULT 0,
            updated_at INTEGER NOT NULL DEFAULT 0
        );
        CREATE TABLE cards (
            uuid TEXT PRIMARY KEY NOT NULL,
            group_uuid TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            text TEXT NOT NULL
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteStackRepository::try_new(conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "cards",
            column: "seq"
        })
    ));
}
