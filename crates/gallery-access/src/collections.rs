//! Collection membership engine.
//!
//! A shared collection has one image set that every access key of the gallery
//! sees and edits. A private collection keeps a separate image set per access
//! key. Adding an image twice is an error; removing an image that is not there
//! succeeds.

use std::collections::BTreeMap;

use gallery_db::Database;
use gallery_db::models::{AccessKeyImageCountRow, AccessKeyRow, CollectionRow, ImageRow};
use gallery_types::models::Role;
use tracing::{debug, info};

use crate::access_key::{collection_for_key, image_for_key, require_collections, resolve_access_key};
use crate::membership::authorize;
use crate::{AccessError, Operation, Result, allows};

/// Key, collection and image of one membership request, all checked to
/// belong to the same gallery.
struct Target {
    key: AccessKeyRow,
    collection: CollectionRow,
    image: ImageRow,
}

fn resolve_target(db: &Database, token: &str, collection_id: i64, image_id: i64) -> Result<Target> {
    let key = resolve_access_key(db, token)?;
    require_collections(&key)?;
    let collection = collection_for_key(db, &key, collection_id)?;
    let image = image_for_key(db, &key, image_id)?;
    Ok(Target {
        key,
        collection,
        image,
    })
}

/// Add an image to a collection on behalf of an access key.
pub fn add_image(db: &Database, token: &str, collection_id: i64, image_id: i64) -> Result<()> {
    let Target {
        key,
        collection,
        image,
    } = resolve_target(db, token, collection_id, image_id)?;

    let inserted = if collection.is_shared {
        if db.shared_member_exists(collection.id, image.id)? {
            return Err(AccessError::AlreadyMember);
        }
        db.insert_shared_member(collection.id, image.id)
    } else {
        if db.private_member_exists(key.id, collection.id, image.id)? {
            return Err(AccessError::AlreadyMember);
        }
        db.insert_private_member(key.id, collection.id, image.id)
    };

    // A concurrent add can slip between the check and the insert.
    inserted.map_err(|e| {
        if e.is_conflict() {
            AccessError::AlreadyMember
        } else {
            e.into()
        }
    })?;

    debug!(
        "Key {} added image {} to collection {}",
        key.id, image.id, collection.id
    );
    Ok(())
}

/// Remove an image from a collection on behalf of an access key. Removing an
/// image that is not in the collection is a no-op.
pub fn remove_image(db: &Database, token: &str, collection_id: i64, image_id: i64) -> Result<()> {
    let Target {
        key,
        collection,
        image,
    } = resolve_target(db, token, collection_id, image_id)?;

    let removed = if collection.is_shared {
        db.delete_shared_member(collection.id, image.id)?
    } else {
        db.delete_private_member(key.id, collection.id, image.id)?
    };
    if removed {
        debug!(
            "Key {} removed image {} from collection {}",
            key.id, image.id, collection.id
        );
    }
    Ok(())
}

/// What an access key sees inside a collection: the whole set of a shared
/// collection, or only its own rows of a private one.
pub fn contents_for_key(
    db: &Database,
    token: &str,
    collection_id: i64,
) -> Result<(CollectionRow, Vec<ImageRow>)> {
    let key = resolve_access_key(db, token)?;
    require_collections(&key)?;
    let collection = collection_for_key(db, &key, collection_id)?;

    let images = if collection.is_shared {
        db.list_shared_images(collection.id)?
    } else {
        db.list_private_images(key.id, collection.id)?
    };
    Ok((collection, images))
}

/// A gallery member's view of a collection.
#[derive(Debug, Clone)]
pub enum MemberContents {
    /// Images of a shared collection.
    Shared(Vec<ImageRow>),
    /// Image counts per collection-capable access key, newest key first.
    Private(Vec<AccessKeyImageCountRow>),
}

/// Look up a collection and check the account's role on its gallery.
/// Outsiders are forbidden rather than told the collection is missing.
fn collection_for_member(
    db: &Database,
    account_id: i64,
    collection_id: i64,
    op: Operation,
) -> Result<(CollectionRow, Role)> {
    let collection = db
        .get_collection(collection_id)?
        .ok_or(AccessError::CollectionNotFound)?;
    let role = db
        .get_member_role(account_id, collection.gallery_id)?
        .ok_or(AccessError::Forbidden)?;
    if !allows(role, op) {
        return Err(AccessError::Forbidden);
    }
    Ok((collection, role))
}

pub fn contents_for_member(
    db: &Database,
    account_id: i64,
    collection_id: i64,
) -> Result<(CollectionRow, MemberContents)> {
    let (collection, _) =
        collection_for_member(db, account_id, collection_id, Operation::ViewCollection)?;

    let contents = if collection.is_shared {
        MemberContents::Shared(db.list_shared_images(collection.id)?)
    } else {
        MemberContents::Private(db.private_image_counts(collection.gallery_id, collection.id)?)
    };
    Ok((collection, contents))
}

/// Drill into the images one access key has put in a private collection.
pub fn private_contents_for_member(
    db: &Database,
    account_id: i64,
    collection_id: i64,
    access_key_id: i64,
) -> Result<(CollectionRow, AccessKeyRow, Vec<ImageRow>)> {
    let (collection, _) =
        collection_for_member(db, account_id, collection_id, Operation::ViewCollection)?;
    let key = db
        .get_access_key(access_key_id)?
        .ok_or(AccessError::AccessKeyNotFound)?;
    if key.gallery_id != collection.gallery_id {
        return Err(AccessError::Forbidden);
    }

    let images = if collection.is_shared {
        db.list_shared_images(collection.id)?
    } else {
        db.list_private_images(key.id, collection.id)?
    };
    Ok((collection, key, images))
}

/// For every image in the key's gallery, the collections the key can see it
/// in. Images in no visible collection are absent from the map.
pub fn collection_ids_for_key(db: &Database, key: &AccessKeyRow) -> Result<BTreeMap<i64, Vec<i64>>> {
    let mut map: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for (image_id, collection_id) in db.visible_collection_ids(key.gallery_id, key.id)? {
        map.entry(image_id).or_default().push(collection_id);
    }
    Ok(map)
}

pub fn create_collection(
    db: &Database,
    account_id: i64,
    gallery_id: i64,
    name: &str,
    is_shared: bool,
) -> Result<CollectionRow> {
    authorize(db, account_id, gallery_id, Operation::CreateCollection)?;
    let collection = db.insert_collection(gallery_id, name, is_shared)?;
    info!(
        "Collection {} ({}) created in gallery {}",
        collection.id,
        if is_shared { "shared" } else { "private" },
        gallery_id
    );
    Ok(collection)
}

pub fn list_collections(db: &Database, account_id: i64, gallery_id: i64) -> Result<Vec<CollectionRow>> {
    authorize(db, account_id, gallery_id, Operation::ListCollections)?;
    Ok(db.list_collections(gallery_id)?)
}

pub fn delete_collection(db: &Database, account_id: i64, collection_id: i64) -> Result<()> {
    let (collection, _) =
        collection_for_member(db, account_id, collection_id, Operation::DeleteCollection)?;
    db.delete_collection(collection.id)?;
    info!(
        "Collection {} deleted from gallery {}",
        collection.id, collection.gallery_id
    );
    Ok(())
}
