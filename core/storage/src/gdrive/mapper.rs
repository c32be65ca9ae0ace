//! Drive records to canonical entities.

use unidrive_common::{Entity, FileEntry, FolderEntry, Permission, VersionRecord};

use super::service::{DriveFile, DrivePermission, DriveRevision, DRIVE_FOLDER_MIME};
use crate::mapper::{
    extension_of, mime_from_name, non_blank, parse_timestamp, IntoEntity, IntoPermission,
    IntoVersion,
};

impl IntoEntity for DriveFile {
    fn into_entity(self) -> Option<Entity> {
        let id = non_blank(self.id)?;
        let name = non_blank(self.name)?;
        let created_at = parse_timestamp(self.created_time.as_deref())?;
        let modified_at = parse_timestamp(self.modified_time.as_deref())?;
        let parent = self.parents.first().map(String::as_str);

        let mime_type = non_blank(self.mime_type);
        if mime_type.as_deref() == Some(DRIVE_FOLDER_MIME) {
            return Some(
                FolderEntry::new(id, name, parent)
                    .with_times(created_at, modified_at)
                    .into(),
            );
        }

        let mime_type = mime_type.unwrap_or_else(|| mime_from_name(&name));
        let extension = non_blank(self.file_extension).or_else(|| extension_of(&name));
        let entry = FileEntry::new(id, name, parent)
            .with_times(created_at, modified_at)
            .with_mime_type(mime_type)
            .with_size(self.size.and_then(|s| s.value()))
            .with_extension(extension);

        Some(entry.into())
    }
}

impl IntoPermission for DrivePermission {
    fn into_permission(self) -> Option<Permission> {
        let id = non_blank(self.id)?;
        let role = non_blank(self.role)?;
        let scope = non_blank(self.kind).unwrap_or_default();

        Some(
            Permission::new(id, role, scope)
                .with_email(non_blank(self.email_address))
                .with_display_name(non_blank(self.display_name)),
        )
    }
}

impl IntoVersion for DriveRevision {
    fn into_version(self) -> Option<VersionRecord> {
        let id = non_blank(self.id)?;
        let modified_at = parse_timestamp(self.modified_time.as_deref())?;
        let author = self
            .last_modifying_user
            .and_then(|u| non_blank(u.display_name).or_else(|| non_blank(u.email_address)));

        Some(
            VersionRecord::new(id)
                .with_modified_at(modified_at)
                .with_author(author)
                .with_size(self.size.and_then(|s| s.value())),
        )
    }
}
