//! Authorization core of the gallery backend.
//!
//! Every decision about who may see or change what goes through this crate:
//! sessions for account holders, gallery roles for members, capability flags
//! for anonymous access-key holders, and the collection membership engine that
//! picks between shared and per-key private membership.
//!
//! Functions are synchronous and take a `&Database`; async callers run them on
//! a blocking thread.

pub mod access_key;
pub mod collections;
pub mod error;
pub mod membership;
pub mod role;
pub mod session;

pub use error::{AccessError, Result};
pub use role::{Operation, allows};

use rand::RngCore;

/// 32 random bytes, hex encoded. Used for session tokens, access keys and
/// email tokens.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use gallery_db::Database;
    use gallery_db::models::{AccessKeyRow, CollectionRow, GalleryRow, ImageRow};
    use gallery_types::models::Role;

    pub struct World {
        pub db: Database,
        pub owner: i64,
        pub editor: i64,
        pub viewer: i64,
        pub stranger: i64,
        pub gallery: GalleryRow,
    }

    pub fn account(db: &Database, username: &str) -> i64 {
        db.create_account(
            username,
            username,
            &format!("{username}@example.com"),
            Some("hash"),
            None,
        )
        .unwrap()
    }

    /// A gallery with one member per role and an unrelated account.
    pub fn world() -> World {
        let db = Database::open_in_memory().unwrap();
        let owner = account(&db, "owner");
        let editor = account(&db, "editor");
        let viewer = account(&db, "viewer");
        let stranger = account(&db, "stranger");
        let gallery = crate::membership::create_gallery(&db, owner, "Holiday", None).unwrap();
        db.add_member(gallery.id, editor, Role::Editor).unwrap();
        db.add_member(gallery.id, viewer, Role::Viewer).unwrap();
        World {
            db,
            owner,
            editor,
            viewer,
            stranger,
            gallery,
        }
    }

    pub fn image(db: &Database, gallery_id: i64, name: &str) -> ImageRow {
        db.insert_image(gallery_id, name, 8, 6, 2048).unwrap()
    }

    pub fn collection(db: &Database, gallery_id: i64, is_shared: bool) -> CollectionRow {
        let name = if is_shared { "Shared" } else { "Private" };
        db.insert_collection(gallery_id, name, is_shared).unwrap()
    }

    pub fn key(db: &Database, gallery_id: i64, token: &str, use_collections: bool) -> AccessKeyRow {
        db.insert_access_key(gallery_id, token, token, true, use_collections)
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn tokens_are_64_hex_chars_and_distinct() {
        let a = super::generate_token();
        let b = super::generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
