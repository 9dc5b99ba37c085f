use super::Error;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Creates `path` if needed and makes it writable by everyone, so containers running as other
/// users can drop files in it.
pub fn prepare_directory(path: &Path) -> Result<(), Error> {
    fs::create_dir_all(path).map_err(|e| Error::io(path, e))?;
    make_world_writable(path)
}

#[cfg(unix)]
fn make_world_writable(path: &Path) -> Result<(), Error> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o777)).map_err(|e| Error::io(path, e))
}

#[cfg(not(unix))]
fn make_world_writable(_path: &Path) -> Result<(), Error> {
    Ok(())
}

pub fn write_archive(directory: &Path, file_name: &str, contents: &[u8]) -> Result<PathBuf, Error> {
    let path = directory.join(file_name);
    fs::write(&path, contents).map_err(|e| Error::io(&path, e))?;
    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(path)
}

pub fn extract_archive(archive_path: &Path, destination: &Path) -> Result<(), Error> {
    prepare_directory(destination)?;
    let file = fs::File::open(archive_path).map_err(|e| Error::io(archive_path, e))?;
    let into_archive_error = |source: zip::result::ZipError| Error::Archive {
        path: archive_path.to_path_buf(),
        source,
    };
    let mut archive = zip::ZipArchive::new(file).map_err(into_archive_error)?;
    archive.extract(destination).map_err(into_archive_error)?;
    debug!(
        "Extracted {} entries from {} into {}",
        archive.len(),
        archive_path.display(),
        destination.display()
    );
    Ok(())
}
