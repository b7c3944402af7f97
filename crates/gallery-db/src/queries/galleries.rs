use gallery_types::models::Role;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use super::{OptionalExt, parse_column};
use crate::models::{GalleryRow, MemberRow};
use crate::{Database, Result};

fn gallery_from_row(row: &Row<'_>) -> rusqlite::Result<GalleryRow> {
    Ok(GalleryRow {
        id: row.get(0)?,
        uuid: parse_column(row, 1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl Database {
    // -- Galleries --

    /// Create a gallery and its OWNER membership as one unit of work.
    ///
    /// If the membership insert fails the gallery insert is rolled back, so a
    /// gallery never exists without an owner.
    pub fn create_gallery_with_owner(
        &self,
        owner_id: i64,
        uuid: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<GalleryRow> {
        self.transaction(|tx| {
            tx.execute(
                "INSERT INTO galleries (uuid, name, description) VALUES (?1, ?2, ?3)",
                params![uuid.to_string(), name, description],
            )?;
            let gallery_id = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO gallery_members (gallery_id, account_id, access_level)
                 VALUES (?1, ?2, ?3)",
                params![gallery_id, owner_id, Role::Owner.as_str()],
            )?;
            query_gallery(tx, gallery_id)?.ok_or_else(|| {
                rusqlite::Error::QueryReturnedNoRows.into()
            })
        })
    }

    pub fn get_gallery(&self, id: i64) -> Result<Option<GalleryRow>> {
        self.with_conn(|conn| query_gallery(conn, id))
    }

    /// Every gallery the account is a member of, with its role, oldest first.
    pub fn list_galleries_for_account(&self, account_id: i64) -> Result<Vec<(GalleryRow, Role)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT g.id, g.uuid, g.name, g.description, g.created_at, m.access_level
                 FROM gallery_members m
                 JOIN galleries g ON g.id = m.gallery_id
                 WHERE m.account_id = ?1
                 ORDER BY g.id",
            )?;
            let rows = stmt
                .query_map([account_id], |row| {
                    Ok((gallery_from_row(row)?, parse_column(row, 5)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Update the given fields; `None` leaves a field untouched.
    pub fn update_gallery(
        &self,
        id: i64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<GalleryRow>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE galleries
                 SET name = COALESCE(?1, name), description = COALESCE(?2, description)
                 WHERE id = ?3",
                params![name, description, id],
            )?;
            query_gallery(conn, id)
        })
    }

    /// Delete a gallery. Images, collections, access keys, members and both
    /// collection membership tables go with it through `ON DELETE CASCADE`.
    pub fn delete_gallery(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM galleries WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    // -- Members --

    pub fn get_member_role(&self, account_id: i64, gallery_id: i64) -> Result<Option<Role>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT access_level FROM gallery_members WHERE account_id = ?1 AND gallery_id = ?2",
                params![account_id, gallery_id],
                |row| parse_column(row, 0),
            )
            .optional()
        })
    }

    pub fn list_members(&self, gallery_id: i64) -> Result<Vec<MemberRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT a.id, a.username, a.name, m.access_level
                 FROM gallery_members m
                 JOIN accounts a ON a.id = m.account_id
                 WHERE m.gallery_id = ?1
                 ORDER BY m.id",
            )?;
            let rows = stmt
                .query_map([gallery_id], |row| {
                    Ok(MemberRow {
                        account_id: row.get(0)?,
                        username: row.get(1)?,
                        name: row.get(2)?,
                        access_level: parse_column(row, 3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Grant `role` on a gallery. An existing membership is a `DbError::Conflict`.
    pub fn add_member(&self, gallery_id: i64, account_id: i64, role: Role) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO gallery_members (gallery_id, account_id, access_level)
                 VALUES (?1, ?2, ?3)",
                params![gallery_id, account_id, role.as_str()],
            )?;
            Ok(())
        })
    }

    /// Remove a non-owner membership. Returns true if a row was deleted.
    pub fn remove_member(&self, gallery_id: i64, account_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM gallery_members
                 WHERE gallery_id = ?1 AND account_id = ?2 AND access_level != 'OWNER'",
                params![gallery_id, account_id],
            )?;
            Ok(n > 0)
        })
    }
}

fn query_gallery(conn: &Connection, id: i64) -> Result<Option<GalleryRow>> {
    conn.query_row(
        "SELECT id, uuid, name, description, created_at FROM galleries WHERE id = ?1",
        [id],
        gallery_from_row,
    )
    .optional()
}
