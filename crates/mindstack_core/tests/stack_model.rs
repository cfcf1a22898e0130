use mindstack_core::db::open_db_in_memory;
use mindstack_core::{
    Card, CardValidationError, Group, RepoError, RepoResult, SqliteStackRepository, StackError,
    StackRepository, StackService, CARD_CAP,
};
use std::cell::Cell;
use uuid::Uuid;

fn service() -> StackService<SqliteStackRepository> {
    let repo = SqliteStackRepository::try_new(open_db_in_memory().unwrap()).unwrap();
    StackService::load(repo).unwrap()
}

#[test]
fn add_group_creates_group_with_first_card() {
    let mut stacks = service();

    let group_uuid = stacks.add_group("remember this").unwrap();
    let group = stacks.group(group_uuid).unwrap();
    assert_eq!(group.card_count(), 1);
    assert_eq!(group.newest_card().unwrap().text, "remember this");
    assert!(!group.pinned);
}

#[test]
fn blank_group_text_is_rejected() {
    let mut stacks = service();
    let err = stacks.add_group("   ").unwrap_err();
    assert!(matches!(
        err,
        StackError::Validation(CardValidationError::BlankText)
    ));
}

#[test]
fn append_beyond_cap_is_rejected_without_mutation() {
    let mut stacks = service();

    let group_uuid = stacks.add_group("base").unwrap();
    for n in 1..CARD_CAP {
        stacks.append(group_uuid, format!("card {n}")).unwrap();
    }
    assert_eq!(stacks.group(group_uuid).unwrap().card_count(), CARD_CAP);
    assert!(!stacks.can_append(group_uuid));

    let err = stacks.append(group_uuid, "one too many").unwrap_err();
    assert!(matches!(
        err,
        StackError::CapacityExceeded { cap, .. } if cap == CARD_CAP
    ));
    assert_eq!(stacks.group(group_uuid).unwrap().card_count(), CARD_CAP);
}

#[test]
fn pop_removes_newest_and_deletes_emptied_group() {
    let mut stacks = service();

    let group_uuid = stacks.add_group("first").unwrap();
    stacks.append(group_uuid, "second").unwrap();

    let removed = stacks.pop_newest(group_uuid).unwrap().unwrap();
    assert_eq!(removed.text, "second");
    assert_eq!(stacks.group(group_uuid).unwrap().card_count(), 1);

    stacks.pop_newest(group_uuid).unwrap();
    assert!(stacks.group(group_uuid).is_none());

    // Storage agrees after a reload.
    stacks.reload().unwrap();
    assert!(stacks.groups().is_empty());
}

#[test]
fn set_pinned_keeps_exactly_one_group_pinned() {
    let mut stacks = service();

    let first = stacks.add_group("first").unwrap();
    let second = stacks.add_group("second").unwrap();
    let third = stacks.add_group("third").unwrap();

    stacks.set_pinned(first, true).unwrap();
    stacks.set_pinned(second, true).unwrap();

    let pinned: Vec<_> = stacks
        .groups()
        .iter()
        .filter(|group| group.pinned)
        .map(|group| group.uuid)
        .collect();
    assert_eq!(pinned, [second]);

    // Pinned group leads the display order regardless of recency.
    stacks.append(third, "newer activity").unwrap();
    assert_eq!(stacks.groups()[0].uuid, second);

    stacks.set_pinned(second, false).unwrap();
    assert!(stacks.groups().iter().all(|group| !group.pinned));
}

#[test]
fn delete_group_removes_all_cards() {
    let mut stacks = service();

    let group_uuid = stacks.add_group("a").unwrap();
    stacks.append(group_uuid, "b").unwrap();
    stacks.delete_group(group_uuid).unwrap();

    assert!(stacks.group(group_uuid).is_none());
    stacks.reload().unwrap();
    assert!(stacks.groups().is_empty());
}

#[test]
fn unknown_group_is_reported_as_not_found() {
    let mut stacks = service();
    let missing = Uuid::new_v4();

    assert!(matches!(
        stacks.append(missing, "text").unwrap_err(),
        StackError::GroupNotFound(id) if id == missing
    ));
    assert!(matches!(
        stacks.pop_newest(missing).unwrap_err(),
        StackError::GroupNotFound(_)
    ));
    assert!(matches!(
        stacks.set_pinned(missing, true).unwrap_err(),
        StackError::GroupNotFound(_)
    ));
}

// Repository double that fails every commit, for the optimistic-mutation
// contract: memory keeps the change, the error surfaces, reload reconciles.
struct FailingRepo {
    commits_attempted: Cell<u32>,
}

impl FailingRepo {
    fn commit(&self) -> RepoResult<()> {
        self.commits_attempted.set(self.commits_attempted.get() + 1);
        Err(RepoError::InvalidData("simulated commit failure".into()))
    }
}

impl StackRepository for FailingRepo {
    fn create_group(&self, _group: &Group) -> RepoResult<()> {
        self.commit()
    }
    fn append_card(&self, _group_uuid: Uuid, _card: &Card) -> RepoResult<()> {
        self.commit()
    }
    fn pop_newest(&self, _group_uuid: Uuid) -> RepoResult<Option<Uuid>> {
        self.commit().map(|()| None)
    }
    fn delete_group(&self, _group_uuid: Uuid) -> RepoResult<()> {
        self.commit()
    }
    fn set_pinned(&self, _group_uuid: Uuid, _pinned: bool) -> RepoResult<()> {
        self.commit()
    }
    fn rename_group(&self, _group_uuid: Uuid, _name: &str) -> RepoResult<()> {
        self.commit()
    }
    fn load_groups(&self) -> RepoResult<Vec<Group>> {
        Ok(Vec::new())
    }
}

#[test]
fn commit_failure_surfaces_but_keeps_the_in_memory_mutation() {
    let repo = FailingRepo {
        commits_attempted: Cell::new(0),
    };
    let mut stacks = StackService::load(repo).unwrap();

    let err = stacks.add_group("optimistic").unwrap_err();
    assert!(matches!(err, StackError::Storage(_)));
    assert_eq!(stacks.groups().len(), 1);
    assert_eq!(stacks.groups()[0].newest_card().unwrap().text, "optimistic");

    // Reload reconciles with what storage actually holds.
    stacks.reload().unwrap();
    assert!(stacks.groups().is_empty());
}
