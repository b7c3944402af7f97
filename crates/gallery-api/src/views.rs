//! Row to response conversions.

use gallery_db::models::{
    AccessKeyImageCountRow, AccessKeyRow, CollectionRow, GalleryRow, ImageRow, MemberRow, SessionRow,
};
use gallery_storage::image_key;
use gallery_types::api::{
    AccessKeyImageCount, AccessKeyResponse, CollectionResponse, GallerySummary, ImageResponse,
    MemberResponse, SessionResponse, SharedCollection,
};
use gallery_types::models::Role;
use uuid::Uuid;

pub fn image(row: ImageRow, gallery_uuid: Uuid) -> ImageResponse {
    ImageResponse {
        key: image_key(gallery_uuid, &row.file_name),
        id: row.id,
        gallery_id: row.gallery_id,
        file_name: row.file_name,
        width: row.width,
        height: row.height,
        size: row.size,
    }
}

pub fn images(rows: Vec<ImageRow>, gallery_uuid: Uuid) -> Vec<ImageResponse> {
    rows.into_iter().map(|row| image(row, gallery_uuid)).collect()
}

pub fn gallery_summary(row: GalleryRow, role: Role) -> GallerySummary {
    GallerySummary {
        id: row.id,
        uuid: row.uuid,
        name: row.name,
        description: row.description,
        access_level: role,
        created_at: row.created_at,
    }
}

pub fn collection(row: CollectionRow) -> CollectionResponse {
    CollectionResponse {
        id: row.id,
        gallery_id: row.gallery_id,
        name: row.name,
        is_shared: row.is_shared,
        created_at: row.created_at,
    }
}

pub fn shared_collection(row: CollectionRow) -> SharedCollection {
    SharedCollection {
        id: row.id,
        name: row.name,
        is_shared: row.is_shared,
    }
}

pub fn access_key(row: AccessKeyRow) -> AccessKeyResponse {
    AccessKeyResponse {
        id: row.id,
        gallery_id: row.gallery_id,
        access_key: row.token,
        name: row.name,
        can_download: row.can_download,
        can_use_collections: row.can_use_collections,
        created_at: row.created_at,
    }
}

pub fn access_key_count(row: AccessKeyImageCountRow) -> AccessKeyImageCount {
    AccessKeyImageCount {
        id: row.access_key_id,
        name: row.name,
        image_count: row.image_count,
    }
}

pub fn member(row: MemberRow) -> MemberResponse {
    MemberResponse {
        account_id: row.account_id,
        username: row.username,
        name: row.name,
        access_level: row.access_level,
    }
}

pub fn session(row: SessionRow) -> SessionResponse {
    SessionResponse {
        id: row.id,
        ip: row.ip,
        expires_at: row.expires_at,
    }
}
