use gallery_db::Database;
use gallery_db::models::{GalleryRow, MemberRow};
use gallery_types::models::Role;
use tracing::info;
use uuid::Uuid;

use crate::{AccessError, Operation, Result, allows};

pub fn resolve_role(db: &Database, account_id: i64, gallery_id: i64) -> Result<Option<Role>> {
    Ok(db.get_member_role(account_id, gallery_id)?)
}

/// Check that the account may perform `op` on the gallery.
///
/// No membership at all is reported as [`AccessError::NotMember`] so that
/// outsiders cannot tell a gallery exists.
pub fn authorize(db: &Database, account_id: i64, gallery_id: i64, op: Operation) -> Result<Role> {
    let role = resolve_role(db, account_id, gallery_id)?.ok_or(AccessError::NotMember)?;
    if !allows(role, op) {
        return Err(AccessError::Forbidden);
    }
    Ok(role)
}

/// Create a gallery owned by `account_id`. The gallery row and the OWNER
/// membership are written in one transaction.
pub fn create_gallery(
    db: &Database,
    account_id: i64,
    name: &str,
    description: Option<&str>,
) -> Result<GalleryRow> {
    let gallery = db.create_gallery_with_owner(account_id, Uuid::new_v4(), name, description)?;
    info!("Account {} created gallery {}", account_id, gallery.id);
    Ok(gallery)
}

pub fn list_members(db: &Database, account_id: i64, gallery_id: i64) -> Result<Vec<MemberRow>> {
    authorize(db, account_id, gallery_id, Operation::ViewGallery)?;
    Ok(db.list_members(gallery_id)?)
}

/// Give another account EDITOR or VIEWER access.
pub fn grant_member(
    db: &Database,
    actor_id: i64,
    gallery_id: i64,
    username: &str,
    role: Role,
) -> Result<MemberRow> {
    authorize(db, actor_id, gallery_id, Operation::ManageMembers)?;
    if role == Role::Owner {
        return Err(AccessError::Invalid(
            "A gallery has exactly one owner".into(),
        ));
    }

    let account = db
        .get_account_by_username(username)?
        .ok_or_else(|| AccessError::NotFound("Account not found".into()))?;

    db.add_member(gallery_id, account.id, role).map_err(|e| {
        if e.is_conflict() {
            AccessError::Conflict("Account is already a member of this gallery".into())
        } else {
            e.into()
        }
    })?;

    info!(
        "Account {} granted {} on gallery {} to account {}",
        actor_id, role, gallery_id, account.id
    );
    Ok(MemberRow {
        account_id: account.id,
        username: account.username,
        name: account.name,
        access_level: role,
    })
}

pub fn revoke_member(db: &Database, actor_id: i64, gallery_id: i64, account_id: i64) -> Result<()> {
    authorize(db, actor_id, gallery_id, Operation::ManageMembers)?;
    match resolve_role(db, account_id, gallery_id)? {
        None => Err(AccessError::NotFound("Member not found".into())),
        Some(Role::Owner) => Err(AccessError::Invalid(
            "The owner cannot be removed from a gallery".into(),
        )),
        Some(_) => {
            db.remove_member(gallery_id, account_id)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn creator_becomes_sole_owner() {
        let w = fixtures::world();
        assert_eq!(
            resolve_role(&w.db, w.owner, w.gallery.id).unwrap(),
            Some(Role::Owner)
        );
        let owners = w
            .db
            .list_members(w.gallery.id)
            .unwrap()
            .into_iter()
            .filter(|m| m.access_level == Role::Owner)
            .count();
        assert_eq!(owners, 1);
    }

    #[test]
    fn outsiders_get_not_member() {
        let w = fixtures::world();
        assert!(matches!(
            authorize(&w.db, w.stranger, w.gallery.id, Operation::ViewGallery),
            Err(AccessError::NotMember)
        ));
    }

    #[test]
    fn roles_follow_the_table() {
        let w = fixtures::world();
        assert!(authorize(&w.db, w.viewer, w.gallery.id, Operation::ViewGallery).is_ok());
        assert!(matches!(
            authorize(&w.db, w.viewer, w.gallery.id, Operation::UploadImage),
            Err(AccessError::Forbidden)
        ));
        assert!(authorize(&w.db, w.editor, w.gallery.id, Operation::UploadImage).is_ok());
        assert!(matches!(
            authorize(&w.db, w.editor, w.gallery.id, Operation::DeleteGallery),
            Err(AccessError::Forbidden)
        ));
        assert_eq!(
            authorize(&w.db, w.owner, w.gallery.id, Operation::DeleteGallery).unwrap(),
            Role::Owner
        );
    }

    #[test]
    fn only_owner_manages_members() {
        let w = fixtures::world();
        assert!(matches!(
            grant_member(&w.db, w.editor, w.gallery.id, "stranger", Role::Viewer),
            Err(AccessError::Forbidden)
        ));

        let member = grant_member(&w.db, w.owner, w.gallery.id, "stranger", Role::Viewer).unwrap();
        assert_eq!(member.account_id, w.stranger);
        assert!(matches!(
            grant_member(&w.db, w.owner, w.gallery.id, "stranger", Role::Editor),
            Err(AccessError::Conflict(_))
        ));
    }

    #[test]
    fn second_owner_cannot_be_granted() {
        let w = fixtures::world();
        assert!(matches!(
            grant_member(&w.db, w.owner, w.gallery.id, "stranger", Role::Owner),
            Err(AccessError::Invalid(_))
        ));
    }

    #[test]
    fn owner_cannot_be_revoked() {
        let w = fixtures::world();
        assert!(matches!(
            revoke_member(&w.db, w.owner, w.gallery.id, w.owner),
            Err(AccessError::Invalid(_))
        ));
        revoke_member(&w.db, w.owner, w.gallery.id, w.viewer).unwrap();
        assert!(matches!(
            revoke_member(&w.db, w.owner, w.gallery.id, w.viewer),
            Err(AccessError::NotFound(_))
        ));
    }
}
