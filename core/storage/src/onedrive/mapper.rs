//! Graph records to canonical entities.

use unidrive_common::{Entity, FileEntry, FolderEntry, Permission, VersionRecord, ROOT_SENTINEL};

use super::service::{DriveItem, DriveItemVersion, GraphIdentity, GraphPermission, IdentitySet};
use crate::mapper::{
    extension_of, mime_from_name, non_blank, parse_timestamp, IntoEntity, IntoPermission,
    IntoVersion,
};

/// Parent id of an item.
///
/// Items directly under the drive root report a parent path ending in
/// `root:`; they and the root item itself belong to the root sentinel.
fn parent_of(item: &DriveItem) -> Option<String> {
    if item.root.is_some() {
        return Some(ROOT_SENTINEL.to_string());
    }

    let parent = item.parent_reference.as_ref()?;
    if parent
        .path
        .as_deref()
        .is_some_and(|p| p.ends_with("root:"))
    {
        return Some(ROOT_SENTINEL.to_string());
    }
    parent.id.clone()
}

impl IntoEntity for DriveItem {
    fn into_entity(self) -> Option<Entity> {
        let parent = parent_of(&self);
        let id = non_blank(self.id)?;
        let name = non_blank(self.name)?;
        let created_at = parse_timestamp(self.created_date_time.as_deref())?;
        let modified_at = parse_timestamp(self.last_modified_date_time.as_deref())?;

        if self.folder.is_some() || self.root.is_some() {
            return Some(
                FolderEntry::new(id, name, parent.as_deref())
                    .with_times(created_at, modified_at)
                    .into(),
            );
        }

        let mime_type = non_blank(self.file.and_then(|f| f.mime_type))
            .unwrap_or_else(|| mime_from_name(&name));
        let extension = extension_of(&name);

        Some(
            FileEntry::new(id, name, parent.as_deref())
                .with_times(created_at, modified_at)
                .with_mime_type(mime_type)
                .with_size(self.size.and_then(|s| s.value()))
                .with_extension(extension)
                .into(),
        )
    }
}

fn user_of(set: Option<IdentitySet>) -> Option<GraphIdentity> {
    set.and_then(|s| s.user)
}

impl IntoPermission for GraphPermission {
    fn into_permission(self) -> Option<Permission> {
        let id = non_blank(self.id)?;
        let role = self.roles.into_iter().find(|r| !r.trim().is_empty())?;

        let user = user_of(self.granted_to_v2).or_else(|| user_of(self.granted_to));
        let scope = match (self.link.and_then(|l| non_blank(l.scope)), &user) {
            (Some(scope), _) => scope,
            (None, Some(_)) => "user".to_string(),
            (None, None) => String::new(),
        };
        let (email, display_name) = match user {
            Some(user) => (non_blank(user.email), non_blank(user.display_name)),
            None => (None, None),
        };

        Some(
            Permission::new(id, role, scope)
                .with_email(email)
                .with_display_name(display_name),
        )
    }
}

impl IntoVersion for DriveItemVersion {
    fn into_version(self) -> Option<VersionRecord> {
        let id = non_blank(self.id)?;
        let modified_at = parse_timestamp(self.last_modified_date_time.as_deref())?;
        let author = user_of(self.last_modified_by)
            .and_then(|u| non_blank(u.display_name).or_else(|| non_blank(u.email)));

        Some(
            VersionRecord::new(id)
                .with_modified_at(modified_at)
                .with_author(author)
                .with_size(self.size.and_then(|s| s.value())),
        )
    }
}
