use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE accounts (
                id                                  INTEGER PRIMARY KEY AUTOINCREMENT,
                username                            TEXT NOT NULL UNIQUE,
                name                                TEXT NOT NULL,
                email                               TEXT NOT NULL UNIQUE,
                password                            TEXT,
                is_email_verified                   INTEGER NOT NULL DEFAULT 0,
                email_verification_token            TEXT UNIQUE,
                password_reset_token                TEXT UNIQUE,
                account_deletion_token              TEXT UNIQUE,
                account_deletion_token_expires_at   TEXT,
                is_admin                            INTEGER NOT NULL DEFAULT 0,
                is_blocked                          INTEGER NOT NULL DEFAULT 0,
                created_at                          TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE sessions (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id  INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                token       TEXT NOT NULL UNIQUE,
                ip          TEXT,
                expires_at  TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_sessions_account ON sessions(account_id);

            CREATE TABLE galleries (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                uuid        TEXT NOT NULL UNIQUE,
                name        TEXT NOT NULL,
                description TEXT,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE gallery_members (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                gallery_id    INTEGER NOT NULL REFERENCES galleries(id) ON DELETE CASCADE,
                account_id    INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                access_level  TEXT NOT NULL CHECK (access_level IN ('OWNER', 'EDITOR', 'VIEWER')),
                UNIQUE(account_id, gallery_id)
            );

            CREATE UNIQUE INDEX idx_gallery_single_owner
                ON gallery_members(gallery_id) WHERE access_level = 'OWNER';

            CREATE TABLE images (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                gallery_id  INTEGER NOT NULL REFERENCES galleries(id) ON DELETE CASCADE,
                file_name   TEXT NOT NULL,
                width       INTEGER NOT NULL,
                height      INTEGER NOT NULL,
                size        INTEGER NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(gallery_id, file_name)
            );

            CREATE TABLE access_keys (
                id                   INTEGER PRIMARY KEY AUTOINCREMENT,
                gallery_id           INTEGER NOT NULL REFERENCES galleries(id) ON DELETE CASCADE,
                token                TEXT NOT NULL UNIQUE,
                name                 TEXT NOT NULL,
                can_download         INTEGER NOT NULL,
                can_use_collections  INTEGER NOT NULL,
                created_at           TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE collections (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                gallery_id  INTEGER NOT NULL REFERENCES galleries(id) ON DELETE CASCADE,
                name        TEXT NOT NULL,
                is_shared   INTEGER NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE shared_collection_images (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                collection_id  INTEGER NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
                image_id       INTEGER NOT NULL REFERENCES images(id) ON DELETE CASCADE,
                UNIQUE(collection_id, image_id)
            );

            CREATE TABLE private_collection_images (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                access_key_id  INTEGER NOT NULL REFERENCES access_keys(id) ON DELETE CASCADE,
                collection_id  INTEGER NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
                image_id       INTEGER NOT NULL REFERENCES images(id) ON DELETE CASCADE,
                UNIQUE(access_key_id, collection_id, image_id)
            );

            CREATE INDEX idx_private_collection ON private_collection_images(collection_id);

            -- A collection's sharing mode picks exactly one membership table.
            CREATE TRIGGER shared_images_require_shared_collection
            BEFORE INSERT ON shared_collection_images
            WHEN (SELECT is_shared FROM collections WHERE id = NEW.collection_id) = 0
            BEGIN
                SELECT RAISE(ABORT, 'collection is private');
            END;

            CREATE TRIGGER private_images_require_private_collection
            BEFORE INSERT ON private_collection_images
            WHEN (SELECT is_shared FROM collections WHERE id = NEW.collection_id) = 1
            BEGIN
                SELECT RAISE(ABORT, 'collection is shared');
            END;

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    Ok(())
}
