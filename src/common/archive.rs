//! Scan source archives
//!
//! A scan declaration may point at a ready-made zip file or at a directory.
//! Directories are packed into an in-memory zip before upload.

use std::io::{Cursor, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{Error, Result};

/// Read the archive bytes for a scan source path
pub fn load_source_archive(path: &Path) -> Result<Vec<u8>> {
    if path.is_dir() {
        tracing::debug!("Packing directory {} into a zip archive", path.display());
        return zip_directory(path);
    }

    std::fs::read(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })
}

/// Pack every file below `root` into a zip archive, paths relative to `root`
pub fn zip_directory(root: &Path) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut pending = vec![root.to_path_buf()];
    let mut entries = 0usize;

    while let Some(dir) = pending.pop() {
        let mut children = std::fs::read_dir(&dir)?
            .collect::<std::io::Result<Vec<_>>>()?;
        children.sort_by_key(|entry| entry.file_name());

        for child in children {
            let path = child.path();
            let relative = path
                .strip_prefix(root)
                .map_err(|e| Error::Internal(e.to_string()))?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if path.is_dir() {
                writer.add_directory(format!("{}/", name), options)?;
                pending.push(path);
            } else {
                writer.start_file(name, options)?;
                writer.write_all(&std::fs::read(&path)?)?;
                entries += 1;
            }
        }
    }

    if entries == 0 {
        return Err(Error::Archive(format!(
            "directory '{}' contains no files",
            root.display()
        )));
    }

    Ok(writer.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zip_directory_keeps_relative_layout() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        std::fs::write(dir.path().join("main.c"), "int main() { return 0; }").unwrap();
        std::fs::write(dir.path().join("src/nested/util.c"), "void f() {}").unwrap();

        let bytes = zip_directory(dir.path()).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();

        assert!(names.contains(&"main.c".to_string()));
        assert!(names.contains(&"src/nested/util.c".to_string()));
        assert!(archive.by_name("src/nested/util.c").is_ok());
    }

    #[test]
    fn test_empty_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            zip_directory(dir.path()),
            Err(Error::Archive(_))
        ));
    }

    #[test]
    fn test_plain_file_is_read_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("source.zip");
        std::fs::write(&file, b"PK\x03\x04fake").unwrap();

        assert_eq!(load_source_archive(&file).unwrap(), b"PK\x03\x04fake");
    }
}
