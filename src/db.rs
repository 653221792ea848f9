use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

use crate::entities::account::{
    generate_account_number, Account, AccountUpdate, NewAccount, DEFAULT_STATUS,
};

/// Path value that selects a private in-memory database
pub const IN_MEMORY: &str = ":memory:";

/// Fresh account numbers tried before an insert gives up
const ACCOUNT_NUMBER_ATTEMPTS: usize = 5;

const ACCOUNT_COLUMNS: &str =
    "id, name, currency, country, account_number, balance, status, created_at";

/// Open (or create) the database at `path` and make sure the schema exists
pub fn open_database(path: &str) -> Result<Connection> {
    let conn = if path == IN_MEMORY {
        Connection::open_in_memory().context("Failed to open in-memory database")?
    } else {
        let conn = Connection::open(Path::new(path))
            .with_context(|| format!("Failed to open database at {}", path))?;
        // WAL for crash recovery; in-memory databases have no journal file
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(journal_mode = %mode, "journal mode set");
        conn
    };

    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // AUTOINCREMENT keeps deleted ids from being handed out again
    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            currency TEXT NOT NULL,
            country TEXT NOT NULL,
            account_number TEXT NOT NULL,
            balance REAL NOT NULL DEFAULT 0.0,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )
    .context("Failed to create accounts table")?;

    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_account_number ON accounts(account_number)",
        [],
    )?;

    Ok(())
}

fn row_to_account(row: &Row<'_>) -> rusqlite::Result<Account> {
    let created_at_str: String = row.get(7)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?
        .with_timezone(&Utc);

    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        currency: row.get(2)?,
        country: row.get(3)?,
        account_number: row.get(4)?,
        balance: row.get(5)?,
        status: row.get(6)?,
        created_at,
    })
}

/// Insert a new account; the database assigns the id
pub fn insert_account(conn: &Connection, new: &NewAccount) -> Result<Account> {
    insert_account_with(conn, new, generate_account_number)
}

fn insert_account_with<F>(conn: &Connection, new: &NewAccount, mut next_number: F) -> Result<Account>
where
    F: FnMut() -> String,
{
    let created_at = Utc::now().to_rfc3339();

    for attempt in 1..=ACCOUNT_NUMBER_ATTEMPTS {
        let account_number = next_number();

        let inserted = conn.execute(
            "INSERT INTO accounts (
                name, currency, country, account_number, balance, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                new.name,
                new.currency,
                new.country,
                account_number,
                0.0_f64,
                DEFAULT_STATUS,
                created_at,
            ],
        );

        match inserted {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                return get_account(conn, id)?
                    .with_context(|| format!("Account {} vanished after insert", id));
            }
            Err(e) if is_account_number_collision(&e) => {
                tracing::warn!(attempt, "account number collision, regenerating");
            }
            Err(e) => return Err(e).context("Failed to insert account"),
        }
    }

    anyhow::bail!(
        "Could not generate a unique account number after {} attempts",
        ACCOUNT_NUMBER_ATTEMPTS
    )
}

fn is_account_number_collision(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg)) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation && msg.contains("account_number")
        }
        _ => false,
    }
}

pub fn get_account(conn: &Connection, id: i64) -> Result<Option<Account>> {
    let account = conn
        .query_row(
            &format!("SELECT {} FROM accounts WHERE id = ?1", ACCOUNT_COLUMNS),
            params![id],
            row_to_account,
        )
        .optional()?;

    Ok(account)
}

/// All accounts, oldest first
pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM accounts ORDER BY id ASC",
        ACCOUNT_COLUMNS
    ))?;

    let accounts = stmt
        .query_map([], row_to_account)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(accounts)
}

/// Apply a partial update; `None` if the account does not exist
pub fn update_account(
    conn: &Connection,
    id: i64,
    update: &AccountUpdate,
) -> Result<Option<Account>> {
    let Some(mut account) = get_account(conn, id)? else {
        return Ok(None);
    };

    if update.is_empty() {
        return Ok(Some(account));
    }

    update.apply_to(&mut account);
    conn.execute(
        "UPDATE accounts SET name = ?1, currency = ?2, country = ?3 WHERE id = ?4",
        params![account.name, account.currency, account.country, id],
    )?;

    Ok(Some(account))
}

/// Remove an account, returning the removed record
pub fn delete_account(conn: &Connection, id: i64) -> Result<Option<Account>> {
    let Some(account) = get_account(conn, id)? else {
        return Ok(None);
    };

    conn.execute("DELETE FROM accounts WHERE id = ?1", params![id])?;

    Ok(Some(account))
}

pub fn count_accounts(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        open_database(IN_MEMORY).unwrap()
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = test_conn();
        setup_database(&conn).unwrap();
        setup_database(&conn).unwrap();
        assert_eq!(count_accounts(&conn).unwrap(), 0);
    }

    #[test]
    fn test_insert_assigns_id_and_defaults() {
        let conn = test_conn();
        let account = insert_account(&conn, &NewAccount::new("John Doe", "€", "Spain")).unwrap();

        assert!(account.id > 0);
        assert_eq!(account.name, "John Doe");
        assert_eq!(account.currency, "€");
        assert_eq!(account.country, "Spain");
        assert_eq!(account.balance, 0.0);
        assert_eq!(account.status, "Active");
        assert_eq!(account.account_number.len(), 20);
    }

    #[test]
    fn test_get_round_trips_stored_row() {
        let conn = test_conn();
        let created = insert_account(&conn, &NewAccount::new("Laura", "£", "UK")).unwrap();

        let fetched = get_account(&conn, created.id).unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.account_number, created.account_number);
        assert_eq!(
            fetched.created_at.timestamp_micros(),
            created.created_at.timestamp_micros()
        );

        assert!(get_account(&conn, 9999).unwrap().is_none());
    }

    #[test]
    fn test_list_orders_by_id() {
        let conn = test_conn();
        let a = insert_account(&conn, &NewAccount::new("A", "$", "USA")).unwrap();
        let b = insert_account(&conn, &NewAccount::new("B", "$", "USA")).unwrap();
        let c = insert_account(&conn, &NewAccount::new("C", "$", "USA")).unwrap();

        let ids: Vec<i64> = list_accounts(&conn).unwrap().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }

    #[test]
    fn test_partial_update_preserves_other_fields() {
        let conn = test_conn();
        let created = insert_account(&conn, &NewAccount::new("Laura", "£", "UK")).unwrap();

        let update = AccountUpdate {
            name: Some("Anna".to_string()),
            ..Default::default()
        };
        let updated = update_account(&conn, created.id, &update).unwrap().unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Anna");
        assert_eq!(updated.currency, "£");
        assert_eq!(updated.country, "UK");
        assert_eq!(updated.account_number, created.account_number);
    }

    #[test]
    fn test_update_missing_account() {
        let conn = test_conn();
        let update = AccountUpdate {
            name: Some("Ghost".to_string()),
            ..Default::default()
        };
        assert!(update_account(&conn, 42, &update).unwrap().is_none());
    }

    #[test]
    fn test_empty_update_returns_unchanged_account() {
        let conn = test_conn();
        let created = insert_account(&conn, &NewAccount::new("Laura", "£", "UK")).unwrap();

        let same = update_account(&conn, created.id, &AccountUpdate::default())
            .unwrap()
            .unwrap();
        assert_eq!(same, created);
    }

    #[test]
    fn test_delete_removes_account() {
        let conn = test_conn();
        let created = insert_account(&conn, &NewAccount::new("Charlie", "$", "USA")).unwrap();

        let removed = delete_account(&conn, created.id).unwrap().unwrap();
        assert_eq!(removed.id, created.id);
        assert!(get_account(&conn, created.id).unwrap().is_none());
        assert!(delete_account(&conn, created.id).unwrap().is_none());
        assert_eq!(count_accounts(&conn).unwrap(), 0);
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let conn = test_conn();
        let first = insert_account(&conn, &NewAccount::new("A", "$", "USA")).unwrap();
        delete_account(&conn, first.id).unwrap();

        let second = insert_account(&conn, &NewAccount::new("B", "$", "USA")).unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn test_update_is_persisted() {
        let conn = test_conn();
        let created = insert_account(&conn, &NewAccount::new("Laura", "£", "UK")).unwrap();

        let update = AccountUpdate {
            country: Some("Ireland".to_string()),
            ..Default::default()
        };
        update_account(&conn, created.id, &update).unwrap();

        let stored = get_account(&conn, created.id).unwrap().unwrap();
        assert_eq!(stored.name, "Laura");
        assert_eq!(stored.country, "Ireland");
    }

    #[test]
    fn test_insert_regenerates_colliding_account_number() {
        let conn = test_conn();
        let taken = "00000000000000000001".to_string();
        let first = insert_account_with(&conn, &NewAccount::new("A", "$", "USA"), || taken.clone())
            .unwrap();
        assert_eq!(first.account_number, taken);

        let mut numbers = vec!["00000000000000000002".to_string(), taken.clone()];
        let second = insert_account_with(&conn, &NewAccount::new("B", "$", "USA"), || {
            numbers.pop().unwrap()
        })
        .unwrap();

        assert_eq!(second.account_number, "00000000000000000002");
        assert_eq!(count_accounts(&conn).unwrap(), 2);
    }

    #[test]
    fn test_insert_gives_up_after_repeated_collisions() {
        let conn = test_conn();
        let taken = "00000000000000000001".to_string();
        insert_account_with(&conn, &NewAccount::new("A", "$", "USA"), || taken.clone()).unwrap();

        let mut calls = 0;
        let result = insert_account_with(&conn, &NewAccount::new("B", "$", "USA"), || {
            calls += 1;
            taken.clone()
        });

        assert!(result.is_err());
        assert_eq!(calls, ACCOUNT_NUMBER_ATTEMPTS);
        assert_eq!(count_accounts(&conn).unwrap(), 1);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.db");
        let path = path.to_str().unwrap();

        let id = {
            let conn = open_database(path).unwrap();
            insert_account(&conn, &NewAccount::new("Laura", "£", "UK")).unwrap().id
        };

        let conn = open_database(path).unwrap();
        let account = get_account(&conn, id).unwrap().unwrap();
        assert_eq!(account.name, "Laura");
    }
}
