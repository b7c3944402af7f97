use rusqlite::{Row, params};

use super::OptionalExt;
use crate::models::ImageRow;
use crate::{Database, Result};

pub(super) const IMAGE_COLUMNS: &str =
    "i.id, i.gallery_id, i.file_name, i.width, i.height, i.size, i.created_at";

pub(super) fn image_from_row(row: &Row<'_>) -> rusqlite::Result<ImageRow> {
    Ok(ImageRow {
        id: row.get(0)?,
        gallery_id: row.get(1)?,
        file_name: row.get(2)?,
        width: row.get::<_, i64>(3)? as u32,
        height: row.get::<_, i64>(4)? as u32,
        size: row.get::<_, i64>(5)? as u64,
        created_at: row.get(6)?,
    })
}

impl Database {
    // -- Images --

    /// Insert image metadata. A file name already used in the gallery is a
    /// `DbError::Conflict`.
    pub fn insert_image(
        &self,
        gallery_id: i64,
        file_name: &str,
        width: u32,
        height: u32,
        size: u64,
    ) -> Result<ImageRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO images (gallery_id, file_name, width, height, size)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![gallery_id, file_name, width as i64, height as i64, size as i64],
            )?;
            let id = conn.last_insert_rowid();
            let sql = format!("SELECT {IMAGE_COLUMNS} FROM images i WHERE i.id = ?1");
            Ok(conn.query_row(&sql, [id], image_from_row)?)
        })
    }

    pub fn image_name_taken(&self, gallery_id: i64, file_name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let taken: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM images WHERE gallery_id = ?1 AND file_name = ?2)",
                params![gallery_id, file_name],
                |row| row.get(0),
            )?;
            Ok(taken)
        })
    }

    pub fn get_image(&self, id: i64) -> Result<Option<ImageRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {IMAGE_COLUMNS} FROM images i WHERE i.id = ?1");
            conn.query_row(&sql, [id], image_from_row).optional()
        })
    }

    /// Fetch an image only if it belongs to `gallery_id`.
    pub fn get_image_in_gallery(&self, gallery_id: i64, id: i64) -> Result<Option<ImageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {IMAGE_COLUMNS} FROM images i WHERE i.id = ?1 AND i.gallery_id = ?2"
            );
            conn.query_row(&sql, params![id, gallery_id], image_from_row)
                .optional()
        })
    }

    pub fn list_images(&self, gallery_id: i64) -> Result<Vec<ImageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {IMAGE_COLUMNS} FROM images i WHERE i.gallery_id = ?1 ORDER BY i.id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([gallery_id], image_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Delete an image and, through cascade, its collection memberships.
    pub fn delete_image(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM images WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }
}
