//! Changeset export to the filesystem.
//!
//! The document is staged under a unique name and renamed into place, so a
//! reader never observes a partially written `gtfs-changes.osm`.

use std::io;
use std::path::{Path, PathBuf};

use cap_std::{ambient_authority, fs::Dir};
use tracing::info;
use uuid::Uuid;

use crate::domain::EXPORT_FILE_NAME;

/// Write `xml` to `output_dir/gtfs-changes.osm`, creating the directory if
/// needed. Returns the final path.
///
/// # Errors
///
/// Returns any I/O error raised while creating, writing, or renaming.
pub fn write_changeset(output_dir: &Path, xml: &str) -> io::Result<PathBuf> {
    Dir::create_ambient_dir_all(output_dir, ambient_authority())?;
    let directory = Dir::open_ambient_dir(output_dir, ambient_authority())?;

    let staging_name = format!(".{EXPORT_FILE_NAME}.tmp-{}", Uuid::new_v4().simple());
    directory.write(&staging_name, xml.as_bytes())?;
    if let Err(error) = directory.rename(&staging_name, &directory, EXPORT_FILE_NAME) {
        let _ = directory.remove_file(&staging_name);
        return Err(error);
    }

    let path = output_dir.join(EXPORT_FILE_NAME);
    info!(path = %path.display(), bytes = xml.len(), "changeset exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    //! Export round-trip through a scratch directory.

    use super::*;

    #[test]
    fn writes_and_replaces_the_export_file() {
        let scratch = tempfile::tempdir().expect("scratch dir");
        let output = scratch.path().join("exports");

        write_changeset(&output, "<osm/>").expect("first export");
        let path = write_changeset(&output, "<osm version=\"0.6\"/>").expect("second export");

        assert_eq!(path, output.join("gtfs-changes.osm"));
        let directory = Dir::open_ambient_dir(&output, ambient_authority()).expect("open output");
        assert_eq!(
            directory
                .read_to_string(EXPORT_FILE_NAME)
                .expect("export readable"),
            "<osm version=\"0.6\"/>"
        );
        let entries = directory
            .entries()
            .expect("list output")
            .count();
        assert_eq!(entries, 1, "staging files are renamed away");
    }
}
