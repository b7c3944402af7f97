use gallery_db::Database;
use gallery_db::models::{AccessKeyRow, CollectionRow, ImageRow};
use tracing::{info, warn};

use crate::membership::authorize;
use crate::{AccessError, Operation, Result, generate_token};

const TOKEN_ATTEMPTS: usize = 3;

/// Resolve the token an anonymous visitor presented.
pub fn resolve_access_key(db: &Database, token: &str) -> Result<AccessKeyRow> {
    db.get_access_key_by_token(token)?
        .ok_or(AccessError::AccessKeyNotFound)
}

pub fn require_download(key: &AccessKeyRow) -> Result<()> {
    if !key.can_download {
        return Err(AccessError::Forbidden);
    }
    Ok(())
}

pub fn require_collections(key: &AccessKeyRow) -> Result<()> {
    if !key.can_use_collections {
        return Err(AccessError::Forbidden);
    }
    Ok(())
}

/// A collection referenced through `key`. One from another gallery is
/// forbidden, not hidden.
pub fn collection_for_key(
    db: &Database,
    key: &AccessKeyRow,
    collection_id: i64,
) -> Result<CollectionRow> {
    let collection = db
        .get_collection(collection_id)?
        .ok_or(AccessError::CollectionNotFound)?;
    if collection.gallery_id != key.gallery_id {
        return Err(AccessError::Forbidden);
    }
    Ok(collection)
}

/// An image referenced through `key`. Images outside the key's gallery look
/// exactly like missing ones.
pub fn image_for_key(db: &Database, key: &AccessKeyRow, image_id: i64) -> Result<ImageRow> {
    db.get_image_in_gallery(key.gallery_id, image_id)?
        .ok_or(AccessError::ImageNotFound)
}

pub fn create_access_key(
    db: &Database,
    account_id: i64,
    gallery_id: i64,
    name: &str,
    can_download: bool,
    can_use_collections: bool,
) -> Result<AccessKeyRow> {
    authorize(db, account_id, gallery_id, Operation::CreateAccessKey)?;

    for _ in 0..TOKEN_ATTEMPTS {
        let token = generate_token();
        match db.insert_access_key(gallery_id, &token, name, can_download, can_use_collections) {
            Ok(key) => {
                info!("Access key {} created for gallery {}", key.id, gallery_id);
                return Ok(key);
            }
            Err(e) if e.is_conflict() => warn!("Access key token collision, retrying"),
            Err(e) => return Err(e.into()),
        }
    }
    Err(AccessError::Conflict("Could not allocate an access key".into()))
}

pub fn list_access_keys(db: &Database, account_id: i64, gallery_id: i64) -> Result<Vec<AccessKeyRow>> {
    authorize(db, account_id, gallery_id, Operation::ListAccessKeys)?;
    Ok(db.list_access_keys(gallery_id)?)
}

pub fn delete_access_key(
    db: &Database,
    account_id: i64,
    gallery_id: i64,
    access_key_id: i64,
) -> Result<()> {
    authorize(db, account_id, gallery_id, Operation::DeleteAccessKey)?;
    if !db.delete_access_key(gallery_id, access_key_id)? {
        return Err(AccessError::AccessKeyNotFound);
    }
    info!("Access key {} deleted from gallery {}", access_key_id, gallery_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::membership::create_gallery;

    #[test]
    fn unknown_token_is_not_found() {
        let w = fixtures::world();
        assert!(matches!(
            resolve_access_key(&w.db, "missing"),
            Err(AccessError::AccessKeyNotFound)
        ));
    }

    #[test]
    fn capability_flags_gate_operations() {
        let w = fixtures::world();
        let key = w
            .db
            .insert_access_key(w.gallery.id, "k", "Guests", false, false)
            .unwrap();
        assert!(matches!(require_download(&key), Err(AccessError::Forbidden)));
        assert!(matches!(require_collections(&key), Err(AccessError::Forbidden)));

        let full = fixtures::key(&w.db, w.gallery.id, "full", true);
        require_download(&full).unwrap();
        require_collections(&full).unwrap();
    }

    #[test]
    fn cross_gallery_references() {
        let w = fixtures::world();
        let other = create_gallery(&w.db, w.stranger, "Other", None).unwrap();
        let foreign_image = fixtures::image(&w.db, other.id, "x.jpg");
        let foreign_collection = fixtures::collection(&w.db, other.id, true);
        let key = fixtures::key(&w.db, w.gallery.id, "k", true);

        assert!(matches!(
            image_for_key(&w.db, &key, foreign_image.id),
            Err(AccessError::ImageNotFound)
        ));
        assert!(matches!(
            collection_for_key(&w.db, &key, foreign_collection.id),
            Err(AccessError::Forbidden)
        ));
        assert!(matches!(
            collection_for_key(&w.db, &key, 9999),
            Err(AccessError::CollectionNotFound)
        ));
    }

    #[test]
    fn viewers_cannot_manage_keys() {
        let w = fixtures::world();
        assert!(matches!(
            create_access_key(&w.db, w.viewer, w.gallery.id, "Guests", true, true),
            Err(AccessError::Forbidden)
        ));
        assert!(matches!(
            list_access_keys(&w.db, w.viewer, w.gallery.id),
            Err(AccessError::Forbidden)
        ));

        let key = create_access_key(&w.db, w.editor, w.gallery.id, "Guests", true, false).unwrap();
        assert_eq!(key.token.len(), 64);
        assert_eq!(list_access_keys(&w.db, w.owner, w.gallery.id).unwrap().len(), 1);

        delete_access_key(&w.db, w.owner, w.gallery.id, key.id).unwrap();
        assert!(matches!(
            delete_access_key(&w.db, w.owner, w.gallery.id, key.id),
            Err(AccessError::AccessKeyNotFound)
        ));
    }
}
