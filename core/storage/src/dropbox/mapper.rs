//! Dropbox metadata to canonical entities.

use unidrive_common::{Entity, FileEntry, FolderEntry, VersionRecord};

use super::service::Metadata;
use crate::mapper::{extension_of, mime_from_name, non_blank, parse_timestamp, IntoEntity, IntoVersion};

/// Parent directory of a lower-cased Dropbox path; `None` at the top level.
fn parent_dir(path_lower: Option<&str>) -> Option<&str> {
    let (parent, _) = path_lower?.trim_end_matches('/').rsplit_once('/')?;
    (!parent.is_empty()).then_some(parent)
}

impl IntoEntity for Metadata {
    fn into_entity(self) -> Option<Entity> {
        let id = non_blank(self.id)?;
        let name = non_blank(self.name)?;
        let parent = parent_dir(self.path_lower.as_deref());

        match self.tag.as_deref() {
            Some("folder") => Some(FolderEntry::new(id, name, parent).into()),
            Some("file") => {
                let client_modified = parse_timestamp(self.client_modified.as_deref())?;
                let server_modified = parse_timestamp(self.server_modified.as_deref())?;
                let mime_type = mime_from_name(&name);
                let extension = extension_of(&name);

                Some(
                    FileEntry::new(id, name, parent)
                        .with_times(client_modified, server_modified)
                        .with_mime_type(mime_type)
                        .with_size(self.size.and_then(|s| s.value()))
                        .with_extension(extension)
                        .into(),
                )
            }
            // Deleted entries and unknown tags
            _ => None,
        }
    }
}

impl IntoVersion for Metadata {
    fn into_version(self) -> Option<VersionRecord> {
        let rev = non_blank(self.rev)?;
        let modified_at = parse_timestamp(self.server_modified.as_deref())?;

        Some(
            VersionRecord::new(rev)
                .with_modified_at(modified_at)
                .with_size(self.size.and_then(|s| s.value())),
        )
    }
}
