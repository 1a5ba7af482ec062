use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> io::Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Directory a file lives in, `.` for bare file names
    pub fn parent_dir<P: AsRef<Path>>(path: P) -> PathBuf {
        match path.as_ref().parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Write `data` to `path` through a temporary file in the same directory
    ///
    /// The file at `path` is either left untouched or fully replaced.
    pub fn write_atomically<P: AsRef<Path>>(path: P, data: &[u8]) -> io::Result<()> {
        let path = path.as_ref();
        let dir = Self::parent_dir(path);
        Self::ensure_dir(&dir)?;

        let mut temp = NamedTempFile::new_in(&dir)?;
        temp.write_all(data)?;
        temp.flush()?;
        temp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}
