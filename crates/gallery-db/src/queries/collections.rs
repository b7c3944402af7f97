use rusqlite::{Row, params};

use super::OptionalExt;
use super::images::{IMAGE_COLUMNS, image_from_row};
use crate::models::{AccessKeyImageCountRow, CollectionRow, ImageRow};
use crate::{Database, Result};

const COLLECTION_COLUMNS: &str = "id, gallery_id, name, is_shared, created_at";

fn collection_from_row(row: &Row<'_>) -> rusqlite::Result<CollectionRow> {
    Ok(CollectionRow {
        id: row.get(0)?,
        gallery_id: row.get(1)?,
        name: row.get(2)?,
        is_shared: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl Database {
    // -- Collections --

    pub fn insert_collection(
        &self,
        gallery_id: i64,
        name: &str,
        is_shared: bool,
    ) -> Result<CollectionRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO collections (gallery_id, name, is_shared) VALUES (?1, ?2, ?3)",
                params![gallery_id, name, is_shared],
            )?;
            let id = conn.last_insert_rowid();
            let sql = format!("SELECT {COLLECTION_COLUMNS} FROM collections WHERE id = ?1");
            Ok(conn.query_row(&sql, [id], collection_from_row)?)
        })
    }

    pub fn get_collection(&self, id: i64) -> Result<Option<CollectionRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {COLLECTION_COLUMNS} FROM collections WHERE id = ?1");
            conn.query_row(&sql, [id], collection_from_row).optional()
        })
    }

    pub fn list_collections(&self, gallery_id: i64) -> Result<Vec<CollectionRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {COLLECTION_COLUMNS} FROM collections WHERE gallery_id = ?1 ORDER BY id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([gallery_id], collection_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_collection(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM collections WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    // -- Shared collection membership --

    pub fn shared_member_exists(&self, collection_id: i64, image_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM shared_collection_images
                               WHERE collection_id = ?1 AND image_id = ?2)",
                params![collection_id, image_id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Add an image to a shared collection. A repeat insert is a
    /// `DbError::Conflict`; a private collection is rejected by trigger.
    pub fn insert_shared_member(&self, collection_id: i64, image_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO shared_collection_images (collection_id, image_id) VALUES (?1, ?2)",
                params![collection_id, image_id],
            )?;
            Ok(())
        })
    }

    pub fn delete_shared_member(&self, collection_id: i64, image_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM shared_collection_images WHERE collection_id = ?1 AND image_id = ?2",
                params![collection_id, image_id],
            )?;
            Ok(n > 0)
        })
    }

    pub fn list_shared_images(&self, collection_id: i64) -> Result<Vec<ImageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {IMAGE_COLUMNS}
                 FROM shared_collection_images s
                 JOIN images i ON i.id = s.image_id
                 WHERE s.collection_id = ?1
                 ORDER BY s.id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([collection_id], image_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_shared_members(&self, collection_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM shared_collection_images WHERE collection_id = ?1",
                [collection_id],
                |row| row.get(0),
            )?;
            Ok(n as u64)
        })
    }

    // -- Private collection membership --

    pub fn private_member_exists(
        &self,
        access_key_id: i64,
        collection_id: i64,
        image_id: i64,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM private_collection_images
                               WHERE access_key_id = ?1 AND collection_id = ?2 AND image_id = ?3)",
                params![access_key_id, collection_id, image_id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Add an image to one access key's view of a private collection.
    pub fn insert_private_member(
        &self,
        access_key_id: i64,
        collection_id: i64,
        image_id: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO private_collection_images (access_key_id, collection_id, image_id)
                 VALUES (?1, ?2, ?3)",
                params![access_key_id, collection_id, image_id],
            )?;
            Ok(())
        })
    }

    pub fn delete_private_member(
        &self,
        access_key_id: i64,
        collection_id: i64,
        image_id: i64,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM private_collection_images
                 WHERE access_key_id = ?1 AND collection_id = ?2 AND image_id = ?3",
                params![access_key_id, collection_id, image_id],
            )?;
            Ok(n > 0)
        })
    }

    /// Images one access key has put into a private collection.
    pub fn list_private_images(
        &self,
        access_key_id: i64,
        collection_id: i64,
    ) -> Result<Vec<ImageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {IMAGE_COLUMNS}
                 FROM private_collection_images p
                 JOIN images i ON i.id = p.image_id
                 WHERE p.access_key_id = ?1 AND p.collection_id = ?2
                 ORDER BY p.id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![access_key_id, collection_id], image_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_private_members(&self, collection_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM private_collection_images WHERE collection_id = ?1",
                [collection_id],
                |row| row.get(0),
            )?;
            Ok(n as u64)
        })
    }

    /// Per-key image counts for a private collection, covering every key of
    /// the gallery that may use collections (zero counts included), newest
    /// key first.
    pub fn private_image_counts(
        &self,
        gallery_id: i64,
        collection_id: i64,
    ) -> Result<Vec<AccessKeyImageCountRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT k.id, k.name, COUNT(p.id)
                 FROM access_keys k
                 LEFT JOIN private_collection_images p
                   ON p.access_key_id = k.id AND p.collection_id = ?2
                 WHERE k.gallery_id = ?1 AND k.can_use_collections = 1
                 GROUP BY k.id, k.name
                 ORDER BY k.id DESC",
            )?;
            let rows = stmt
                .query_map(params![gallery_id, collection_id], |row| {
                    Ok(AccessKeyImageCountRow {
                        access_key_id: row.get(0)?,
                        name: row.get(1)?,
                        image_count: row.get::<_, i64>(2)? as u64,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// `(image_id, collection_id)` pairs an access key can see: every shared
    /// membership in the gallery plus the key's own private memberships.
    pub fn visible_collection_ids(
        &self,
        gallery_id: i64,
        access_key_id: i64,
    ) -> Result<Vec<(i64, i64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT s.image_id, s.collection_id
                 FROM shared_collection_images s
                 JOIN collections c ON c.id = s.collection_id
                 WHERE c.gallery_id = ?1
                 UNION ALL
                 SELECT p.image_id, p.collection_id
                 FROM private_collection_images p
                 JOIN collections c ON c.id = p.collection_id
                 WHERE c.gallery_id = ?1 AND p.access_key_id = ?2
                 ORDER BY 2, 1",
            )?;
            let rows = stmt
                .query_map(params![gallery_id, access_key_id], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
