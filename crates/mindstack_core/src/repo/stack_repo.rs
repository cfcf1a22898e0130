//! Stack repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the durable-commit API the in-memory stack model writes
//!   through: create, append, pop, delete, pin.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - `set_pinned(_, true)` clears every other group's pin in the same
//!   transaction; observers never see two pinned groups.
//! - `pop_newest` deletes the owning group in the same transaction when
//!   the popped card was the last one.
//! - Group deletion removes the group's cards explicitly; the schema-level
//!   cascade is a second line of defense, not the mechanism.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::card::{Card, CardId, Group, GroupId};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const GROUP_SELECT_SQL: &str = "SELECT uuid, created_at, name, pinned FROM groups";
const CARD_SELECT_SQL: &str =
    "SELECT uuid, group_uuid, created_at, seq, text FROM cards";

const REQUIRED_TABLES: &[(&str, &[&str])] = &[
    ("groups", &["uuid", "created_at", "name", "pinned", "updated_at"]),
    ("cards", &["uuid", "group_uuid", "created_at", "seq", "text"]),
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for stack persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    GroupNotFound(GroupId),
    CardNotFound(CardId),
    /// Connection has not been migrated to the version this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::GroupNotFound(id) => write!(f, "group not found: {id}"),
            Self::CardNotFound(id) => write!(f, "card not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table missing: {table}")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column missing: {table}.{column}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted stack data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage collaborator contract for stack mutations and loads.
///
/// Each mutating call is transactional: it either commits fully or leaves
/// storage untouched and reports the failure.
pub trait StackRepository {
    /// Persists a new group together with its initial cards.
    fn create_group(&self, group: &Group) -> RepoResult<()>;
    /// Persists one appended card for an existing group.
    fn append_card(&self, group_uuid: GroupId, card: &Card) -> RepoResult<()>;
    /// Removes the newest card; removes the group too when it empties.
    ///
    /// Returns the removed card id, or `None` for an unknown group.
    fn pop_newest(&self, group_uuid: GroupId) -> RepoResult<Option<CardId>>;
    /// Removes a group and every card it owns.
    fn delete_group(&self, group_uuid: GroupId) -> RepoResult<()>;
    /// Sets or clears the pin; setting clears all other pins atomically.
    fn set_pinned(&self, group_uuid: GroupId, pinned: bool) -> RepoResult<()>;
    /// Renames a group.
    fn rename_group(&self, group_uuid: GroupId, name: &str) -> RepoResult<()>;
    /// Reads the full persisted state, display-ordered.
    fn load_groups(&self) -> RepoResult<Vec<Group>>;
}

/// SQLite-backed stack repository owning its connection.
pub struct SqliteStackRepository {
    conn: Connection,
}

impl SqliteStackRepository {
    /// Wraps a migrated connection after validating the schema shape.
    ///
    /// # Errors
    /// - `UninitializedConnection` when `PRAGMA user_version` does not
    ///   match the latest migration this binary knows.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema
    ///   does not contain the rows this repository queries.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version: u32 =
            conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        for &(table, columns) in REQUIRED_TABLES {
            validate_table(&conn, table, columns)?;
        }

        Ok(Self { conn })
    }

    /// Read-only access to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn immediate_tx(&self) -> RepoResult<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl StackRepository for SqliteStackRepository {
    fn create_group(&self, group: &Group) -> RepoResult<()> {
        let tx = self.immediate_tx()?;

        tx.execute(
            "INSERT INTO groups (uuid, created_at, name, pinned, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                group.uuid.to_string(),
                group.created_at,
                group.name.as_str(),
                bool_to_int(group.pinned),
                group.latest_activity(),
            ],
        )?;

        for card in group.cards() {
            insert_card(&tx, group.uuid, card)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn append_card(&self, group_uuid: GroupId, card: &Card) -> RepoResult<()> {
        let tx = self.immediate_tx()?;

        let changed = tx.execute(
            "UPDATE groups SET updated_at = ?1 WHERE uuid = ?2;",
            params![card.created_at, group_uuid.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::GroupNotFound(group_uuid));
        }

        insert_card(&tx, group_uuid, card)?;
        tx.commit()?;
        Ok(())
    }

    fn pop_newest(&self, group_uuid: GroupId) -> RepoResult<Option<CardId>> {
        let tx = self.immediate_tx()?;

        let newest: Option<String> = tx
            .query_row(
                "SELECT uuid FROM cards
                 WHERE group_uuid = ?1
                 ORDER BY created_at DESC, seq DESC
                 LIMIT 1;",
                [group_uuid.to_string()],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        let Some(card_uuid_text) = newest else {
            tx.commit()?;
            return Ok(None);
        };

        tx.execute("DELETE FROM cards WHERE uuid = ?1;", [&card_uuid_text])?;

        let remaining: i64 = tx.query_row(
            "SELECT COUNT(*) FROM cards WHERE group_uuid = ?1;",
            [group_uuid.to_string()],
            |row| row.get(0),
        )?;
        if remaining == 0 {
            tx.execute(
                "DELETE FROM groups WHERE uuid = ?1;",
                [group_uuid.to_string()],
            )?;
        } else {
            tx.execute(
                "UPDATE groups
                 SET updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?1;",
                [group_uuid.to_string()],
            )?;
        }

        tx.commit()?;

        let card_uuid = Uuid::parse_str(&card_uuid_text).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid uuid value `{card_uuid_text}` in cards.uuid"
            ))
        })?;
        Ok(Some(card_uuid))
    }

    fn delete_group(&self, group_uuid: GroupId) -> RepoResult<()> {
        let tx = self.immediate_tx()?;

        tx.execute(
            "DELETE FROM cards WHERE group_uuid = ?1;",
            [group_uuid.to_string()],
        )?;
        let changed = tx.execute(
            "DELETE FROM groups WHERE uuid = ?1;",
            [group_uuid.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::GroupNotFound(group_uuid));
        }

        tx.commit()?;
        Ok(())
    }

    fn set_pinned(&self, group_uuid: GroupId, pinned: bool) -> RepoResult<()> {
        let tx = self.immediate_tx()?;

        if pinned {
            tx.execute(
                "UPDATE groups SET pinned = 0 WHERE pinned = 1 AND uuid <> ?1;",
                [group_uuid.to_string()],
            )?;
        }

        let changed = tx.execute(
            "UPDATE groups SET pinned = ?1 WHERE uuid = ?2;",
            params![bool_to_int(pinned), group_uuid.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::GroupNotFound(group_uuid));
        }

        tx.commit()?;
        Ok(())
    }

    fn rename_group(&self, group_uuid: GroupId, name: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE groups SET name = ?1 WHERE uuid = ?2;",
            params![name, group_uuid.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::GroupNotFound(group_uuid));
        }
        Ok(())
    }

    fn load_groups(&self) -> RepoResult<Vec<Group>> {
        let mut cards_by_group: HashMap<GroupId, Vec<Card>> = HashMap::new();
        {
            let mut stmt = self.conn.prepare(CARD_SELECT_SQL)?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let (group_uuid, card) = parse_card_row(row)?;
                cards_by_group.entry(group_uuid).or_default().push(card);
            }
        }

        let mut groups = Vec::new();
        let mut stmt = self.conn.prepare(GROUP_SELECT_SQL)?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            groups.push(parse_group_row(row, &mut cards_by_group)?);
        }

        crate::model::card::sort_groups_for_display(&mut groups);
        Ok(groups)
    }
}

fn insert_card(tx: &Transaction<'_>, group_uuid: GroupId, card: &Card) -> RepoResult<()> {
    tx.execute(
        "INSERT INTO cards (uuid, group_uuid, created_at, seq, text)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            card.uuid.to_string(),
            group_uuid.to_string(),
            card.created_at,
            card.seq,
            card.text.as_str(),
        ],
    )?;
    Ok(())
}

fn parse_card_row(row: &Row<'_>) -> RepoResult<(GroupId, Card)> {
    let card_uuid = parse_uuid_column(row, "uuid", "cards.uuid")?;
    let group_uuid = parse_uuid_column(row, "group_uuid", "cards.group_uuid")?;

    let card = Card::with_id(
        card_uuid,
        row.get("created_at")?,
        row.get("seq")?,
        row.get::<_, String>("text")?,
    )
    .map_err(|err| RepoError::InvalidData(format!("cards.text: {err}")))?;

    Ok((group_uuid, card))
}

fn parse_group_row(
    row: &Row<'_>,
    cards_by_group: &mut HashMap<GroupId, Vec<Card>>,
) -> RepoResult<Group> {
    let uuid = parse_uuid_column(row, "uuid", "groups.uuid")?;

    let pinned = match row.get::<_, i64>("pinned")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid pinned value `{other}` in groups.pinned"
            )));
        }
    };

    Ok(Group::with_parts(
        uuid,
        row.get("created_at")?,
        row.get::<_, String>("name")?,
        pinned,
        cards_by_group.remove(&uuid).unwrap_or_default(),
    ))
}

fn parse_uuid_column(row: &Row<'_>, column: &str, qualified: &str) -> RepoResult<Uuid> {
    let text: String = row.get(column)?;
    Uuid::parse_str(&text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{text}` in {qualified}")))
}

fn validate_table(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> RepoResult<()> {
    let present: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1;",
        [table],
        |row| row.get(0),
    )?;
    if present == 0 {
        return Err(RepoError::MissingRequiredTable(table));
    }

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut found = Vec::new();
    while let Some(row) = rows.next()? {
        found.push(row.get::<_, String>("name")?);
    }

    for &column in columns {
        if !found.iter().any(|name| name.as_str() == column) {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
