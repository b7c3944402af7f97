use rusqlite::{Row, params};

use super::OptionalExt;
use crate::models::AccessKeyRow;
use crate::{Database, Result};

const ACCESS_KEY_COLUMNS: &str =
    "id, gallery_id, token, name, can_download, can_use_collections, created_at";

fn access_key_from_row(row: &Row<'_>) -> rusqlite::Result<AccessKeyRow> {
    Ok(AccessKeyRow {
        id: row.get(0)?,
        gallery_id: row.get(1)?,
        token: row.get(2)?,
        name: row.get(3)?,
        can_download: row.get(4)?,
        can_use_collections: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl Database {
    // -- Access keys --

    /// Insert an access key. A token collision is a `DbError::Conflict`.
    pub fn insert_access_key(
        &self,
        gallery_id: i64,
        token: &str,
        name: &str,
        can_download: bool,
        can_use_collections: bool,
    ) -> Result<AccessKeyRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO access_keys (gallery_id, token, name, can_download, can_use_collections)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![gallery_id, token, name, can_download, can_use_collections],
            )?;
            let id = conn.last_insert_rowid();
            let sql = format!("SELECT {ACCESS_KEY_COLUMNS} FROM access_keys WHERE id = ?1");
            Ok(conn.query_row(&sql, [id], access_key_from_row)?)
        })
    }

    pub fn get_access_key_by_token(&self, token: &str) -> Result<Option<AccessKeyRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {ACCESS_KEY_COLUMNS} FROM access_keys WHERE token = ?1");
            conn.query_row(&sql, [token], access_key_from_row).optional()
        })
    }

    pub fn get_access_key(&self, id: i64) -> Result<Option<AccessKeyRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {ACCESS_KEY_COLUMNS} FROM access_keys WHERE id = ?1");
            conn.query_row(&sql, [id], access_key_from_row).optional()
        })
    }

    pub fn list_access_keys(&self, gallery_id: i64) -> Result<Vec<AccessKeyRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {ACCESS_KEY_COLUMNS} FROM access_keys WHERE gallery_id = ?1 ORDER BY id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([gallery_id], access_key_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Delete an access key of `gallery_id`. Its private collection
    /// memberships are removed through cascade.
    pub fn delete_access_key(&self, gallery_id: i64, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM access_keys WHERE id = ?1 AND gallery_id = ?2",
                params![id, gallery_id],
            )?;
            Ok(n > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use crate::queries::fixtures;

    #[test]
    fn tokens_are_globally_unique() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::account(&db, "owner");
        let first = fixtures::gallery(&db, owner);
        let second = fixtures::gallery(&db, owner);
        fixtures::access_key(&db, first.id, "same");

        let err = db
            .insert_access_key(second.id, "same", "Other", false, false)
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn delete_is_scoped_to_gallery() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::account(&db, "owner");
        let first = fixtures::gallery(&db, owner);
        let second = fixtures::gallery(&db, owner);
        let key = fixtures::access_key(&db, first.id, "k1");

        assert!(!db.delete_access_key(second.id, key.id).unwrap());
        assert!(db.delete_access_key(first.id, key.id).unwrap());
        assert!(db.get_access_key(key.id).unwrap().is_none());
    }

    #[test]
    fn flags_round_trip_through_sqlite() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::account(&db, "owner");
        let gallery = fixtures::gallery(&db, owner);
        db.insert_access_key(gallery.id, "k", "View only", true, false)
            .unwrap();

        let key = db.get_access_key_by_token("k").unwrap().unwrap();
        assert!(key.can_download);
        assert!(!key.can_use_collections);
    }
}
