//! Album download. The showcase bundles the full mixtape as a ZIP archive;
//! the download hotspot copies it into the user's chosen directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};

/// Copy the bundled archive into `target_dir`, keeping its file name.
/// Returns the path written.
pub fn export_archive(archive: &Path, target_dir: &Path) -> Result<PathBuf> {
    ensure!(
        archive.is_file(),
        "album archive {} does not exist",
        archive.display()
    );
    let file_name = archive
        .file_name()
        .with_context(|| format!("archive path {} has no file name", archive.display()))?;

    fs::create_dir_all(target_dir)
        .with_context(|| format!("creating download directory {}", target_dir.display()))?;
    let destination = target_dir.join(file_name);
    fs::copy(archive, &destination).with_context(|| {
        format!(
            "copying {} to {}",
            archive.display(),
            destination.display()
        )
    })?;
    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn copies_archive_into_fresh_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = dir.path().join("mixtape.zip");
        let mut file = fs::File::create(&archive).expect("creating archive fixture");
        file.write_all(b"PK\x03\x04").expect("writing fixture");

        let target = dir.path().join("downloads");
        let written = export_archive(&archive, &target).expect("exporting archive");
        assert_eq!(written, target.join("mixtape.zip"));
        assert_eq!(fs::read(&written).expect("reading copy"), b"PK\x03\x04");
    }

    #[test]
    fn missing_archive_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.zip");
        assert!(export_archive(&missing, dir.path()).is_err());
    }
}
