use rusqlite::{Connection, Row, params};

use super::OptionalExt;
use crate::models::AccountRow;
use crate::{Database, Result};

const ACCOUNT_COLUMNS: &str = "id, username, name, email, password, is_email_verified, \
     email_verification_token, password_reset_token, is_admin, is_blocked, created_at";

pub(super) fn account_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<AccountRow> {
    Ok(AccountRow {
        id: row.get(offset)?,
        username: row.get(offset + 1)?,
        name: row.get(offset + 2)?,
        email: row.get(offset + 3)?,
        password: row.get(offset + 4)?,
        is_email_verified: row.get(offset + 5)?,
        email_verification_token: row.get(offset + 6)?,
        password_reset_token: row.get(offset + 7)?,
        is_admin: row.get(offset + 8)?,
        is_blocked: row.get(offset + 9)?,
        created_at: row.get(offset + 10)?,
    })
}

pub(super) const ACCOUNT_COLUMNS_PREFIXED: &str = "a.id, a.username, a.name, a.email, a.password, \
     a.is_email_verified, a.email_verification_token, a.password_reset_token, a.is_admin, \
     a.is_blocked, a.created_at";

impl Database {
    // -- Accounts --

    /// Insert a new account and return its id. Duplicate username or email
    /// surfaces as `DbError::Conflict`.
    pub fn create_account(
        &self,
        username: &str,
        name: &str,
        email: &str,
        password_hash: Option<&str>,
        email_verification_token: Option<&str>,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO accounts (username, name, email, password, email_verification_token)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![username, name, email, password_hash, email_verification_token],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_account_by_id(&self, id: i64) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "id = ?1", params![id]))
    }

    pub fn get_account_by_email(&self, email: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "email = ?1", params![email]))
    }

    pub fn get_account_by_username(&self, username: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "username = ?1", params![username]))
    }

    pub fn get_account_by_verification_token(&self, token: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| {
            query_account(conn, "email_verification_token = ?1", params![token])
        })
    }

    pub fn get_account_by_reset_token(&self, token: &str) -> Result<Option<AccountRow>> {
        self.with_conn(|conn| query_account(conn, "password_reset_token = ?1", params![token]))
    }

    /// Returns true if a row was updated.
    pub fn mark_email_verified(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE accounts SET is_email_verified = 1, email_verification_token = NULL
                 WHERE id = ?1",
                [id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn set_password_reset_token(&self, id: i64, token: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE accounts SET password_reset_token = ?1 WHERE id = ?2",
                params![token, id],
            )?;
            Ok(())
        })
    }

    pub fn set_password(&self, id: i64, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE accounts SET password = ?1 WHERE id = ?2",
                params![password_hash, id],
            )?;
            Ok(())
        })
    }

    /// Replace the password, consume the reset token and drop every session
    /// of the account in one transaction.
    pub fn reset_password(&self, id: i64, password_hash: &str) -> Result<()> {
        self.transaction(|tx| {
            tx.execute(
                "UPDATE accounts SET password = ?1, password_reset_token = NULL WHERE id = ?2",
                params![password_hash, id],
            )?;
            tx.execute("DELETE FROM sessions WHERE account_id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn set_blocked(&self, id: i64, blocked: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE accounts SET is_blocked = ?1 WHERE id = ?2",
                params![blocked, id],
            )?;
            Ok(())
        })
    }
}

fn query_account(
    conn: &Connection,
    predicate: &str,
    params: impl rusqlite::Params,
) -> Result<Option<AccountRow>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {predicate}");
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row(params, |row| account_from_row(row, 0)).optional()
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::queries::fixtures;

    #[test]
    fn duplicate_email_is_a_conflict() {
        let db = Database::open_in_memory().unwrap();
        db.create_account("alice", "Alice", "a@x.com", Some("h"), Some("t1"))
            .unwrap();

        let err = db
            .create_account("alice2", "Alice", "a@x.com", Some("h"), Some("t2"))
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn verification_consumes_token() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .create_account("bob", "Bob", "b@x.com", Some("h"), Some("verify-me"))
            .unwrap();

        let account = db.get_account_by_verification_token("verify-me").unwrap().unwrap();
        assert_eq!(account.id, id);
        assert!(!account.is_email_verified);

        assert!(db.mark_email_verified(id).unwrap());
        assert!(db.get_account_by_verification_token("verify-me").unwrap().is_none());
        assert!(db.get_account_by_id(id).unwrap().unwrap().is_email_verified);
    }

    #[test]
    fn reset_password_drops_sessions() {
        let db = Database::open_in_memory().unwrap();
        let id = fixtures::account(&db, "carol");
        let expires = chrono::Utc::now() + chrono::Duration::days(1);
        db.create_session(id, "tok", None, expires).unwrap();
        db.set_password_reset_token(id, "reset").unwrap();

        db.reset_password(id, "new-hash").unwrap();

        let account = db.get_account_by_id(id).unwrap().unwrap();
        assert_eq!(account.password.as_deref(), Some("new-hash"));
        assert!(account.password_reset_token.is_none());
        assert!(db.list_sessions(id).unwrap().is_empty());
    }
}
