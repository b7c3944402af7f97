use chrono::{DateTime, Utc};
use rusqlite::{Row, params};

use super::OptionalExt;
use super::accounts::{ACCOUNT_COLUMNS_PREFIXED, account_from_row};
use crate::models::{AccountRow, SessionRow};
use crate::{Database, Result};

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: row.get(0)?,
        account_id: row.get(1)?,
        token: row.get(2)?,
        ip: row.get(3)?,
        expires_at: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl Database {
    // -- Sessions --

    pub fn create_session(
        &self,
        account_id: i64,
        token: &str,
        ip: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<SessionRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (account_id, token, ip, expires_at) VALUES (?1, ?2, ?3, ?4)",
                params![account_id, token, ip, expires_at],
            )?;
            let id = conn.last_insert_rowid();
            let row = conn.query_row(
                "SELECT id, account_id, token, ip, expires_at, created_at FROM sessions WHERE id = ?1",
                [id],
                session_from_row,
            )?;
            Ok(row)
        })
    }

    /// Look up a session by token together with the account that owns it.
    pub fn get_session_with_account(
        &self,
        token: &str,
    ) -> Result<Option<(SessionRow, AccountRow)>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT s.id, s.account_id, s.token, s.ip, s.expires_at, s.created_at, {ACCOUNT_COLUMNS_PREFIXED}
                 FROM sessions s
                 JOIN accounts a ON a.id = s.account_id
                 WHERE s.token = ?1"
            );
            conn.query_row(&sql, [token], |row| {
                Ok((session_from_row(row)?, account_from_row(row, 6)?))
            })
            .optional()
        })
    }

    pub fn list_sessions(&self, account_id: i64) -> Result<Vec<SessionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, account_id, token, ip, expires_at, created_at
                 FROM sessions WHERE account_id = ?1
                 ORDER BY expires_at DESC",
            )?;
            let rows = stmt
                .query_map([account_id], session_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns true if a session was deleted.
    pub fn delete_session_by_token(&self, token: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM sessions WHERE token = ?1", [token])?;
            Ok(n > 0)
        })
    }

    /// Delete a session only if it belongs to `account_id`.
    pub fn delete_session_for_account(&self, account_id: i64, session_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM sessions WHERE id = ?1 AND account_id = ?2",
                params![session_id, account_id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn set_session_expiry(&self, session_id: i64, expires_at: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE sessions SET expires_at = ?1 WHERE id = ?2",
                params![expires_at, session_id],
            )?;
            Ok(())
        })
    }
}
