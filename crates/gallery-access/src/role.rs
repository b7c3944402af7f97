use gallery_types::models::Role;

/// Things a gallery member can ask to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ViewGallery,
    ListCollections,
    ViewCollection,
    UpdateGallery,
    UploadImage,
    DeleteImage,
    CreateCollection,
    DeleteCollection,
    CreateAccessKey,
    DeleteAccessKey,
    ListAccessKeys,
    DeleteGallery,
    ManageMembers,
}

impl Operation {
    pub const ALL: [Operation; 13] = [
        Operation::ViewGallery,
        Operation::ListCollections,
        Operation::ViewCollection,
        Operation::UpdateGallery,
        Operation::UploadImage,
        Operation::DeleteImage,
        Operation::CreateCollection,
        Operation::DeleteCollection,
        Operation::CreateAccessKey,
        Operation::DeleteAccessKey,
        Operation::ListAccessKeys,
        Operation::DeleteGallery,
        Operation::ManageMembers,
    ];
}

/// The single role/operation table. Every role check goes through here.
pub fn allows(role: Role, op: Operation) -> bool {
    use Operation::*;

    match op {
        ViewGallery | ListCollections | ViewCollection => true,
        UpdateGallery | UploadImage | DeleteImage | CreateCollection | DeleteCollection
        | CreateAccessKey | DeleteAccessKey | ListAccessKeys => {
            matches!(role, Role::Owner | Role::Editor)
        }
        DeleteGallery | ManageMembers => role == Role::Owner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_can_do_everything() {
        for op in Operation::ALL {
            assert!(allows(Role::Owner, op), "{op:?}");
        }
    }

    #[test]
    fn editor_cannot_delete_gallery_or_manage_members() {
        let denied: Vec<_> = Operation::ALL
            .into_iter()
            .filter(|op| !allows(Role::Editor, *op))
            .collect();
        assert_eq!(denied, vec![Operation::DeleteGallery, Operation::ManageMembers]);
    }

    #[test]
    fn viewer_only_reads() {
        let allowed: Vec<_> = Operation::ALL
            .into_iter()
            .filter(|op| allows(Role::Viewer, *op))
            .collect();
        assert_eq!(
            allowed,
            vec![
                Operation::ViewGallery,
                Operation::ListCollections,
                Operation::ViewCollection
            ]
        );
    }
}
