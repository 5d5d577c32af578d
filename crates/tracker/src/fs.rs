// File-system capability used by the store.
//
// The store never touches `std::fs` directly so hosts with their own storage
// layer (or tests) can substitute an implementation.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Raw file primitives the store needs.
pub trait StateFs: Send + Sync + 'static {
    fn exists(&self, path: &Path) -> bool;

    fn read(&self, path: &Path) -> io::Result<String>;

    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Create `path` and its parents. A directory that already exists is not an error.
    fn mkdir(&self, path: &Path) -> io::Result<()>;
}

/// Local disk, with owner-only permissions and atomic replace on write.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl StateFs for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let tmp_path = temp_path_for(path);
        let mut file = open_private_truncate(&tmp_path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_data()?;
        drop(file);

        if let Err(error) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(error);
        }
        Ok(())
    }

    fn mkdir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)?;
        ensure_owner_only_dir(path)
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!("{name}.tmp.{}", std::process::id()))
}

fn open_private_truncate(path: &Path) -> io::Result<fs::File> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;

        OpenOptions::new().create(true).write(true).truncate(true).mode(0o600).open(path)
    }
    #[cfg(not(unix))]
    {
        OpenOptions::new().create(true).write(true).truncate(true).open(path)
    }
}

fn ensure_owner_only_dir(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mode = fs::metadata(path)?.permissions().mode() & 0o777;
        if mode != 0o700 {
            fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
        }
    }

    #[cfg(not(unix))]
    {
        let _ = path;
    }

    Ok(())
}

/// In-memory file system. Counts writes so callers can observe how often
/// the store actually hit storage.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: Mutex<HashMap<PathBuf, String>>,
    dirs: Mutex<Vec<PathBuf>>,
    writes: AtomicUsize,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a file.
    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), contents.into());
        self
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn contents(&self, path: &Path) -> Option<String> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner).get(path).cloned()
    }

    pub fn has_dir(&self, path: &Path) -> bool {
        self.dirs.lock().unwrap_or_else(PoisonError::into_inner).iter().any(|d| d == path)
    }
}

impl StateFs for MemoryFs {
    fn exists(&self, path: &Path) -> bool {
        self.contents(path).is_some() || self.has_dir(path)
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        self.contents(path).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("`{}` not found", path.display()))
        })
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn mkdir(&self, path: &Path) -> io::Result<()> {
        let mut dirs = self.dirs.lock().unwrap_or_else(PoisonError::into_inner);
        if !dirs.iter().any(|d| d == path) {
            dirs.push(path.to_path_buf());
        }
        Ok(())
    }
}

impl<T: StateFs> StateFs for std::sync::Arc<T> {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        (**self).read(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        (**self).write(path, contents)
    }

    fn mkdir(&self, path: &Path) -> io::Result<()> {
        (**self).mkdir(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn local_write_replaces_contents_and_leaves_no_temp_file() {
        let tmp = tempdir().expect("tempdir should be created");
        let path = tmp.path().join("positions.json");

        LocalFs.write(&path, "{\"a\":{}}").expect("first write");
        LocalFs.write(&path, "{}").expect("second write");

        assert_eq!(LocalFs.read(&path).expect("read back"), "{}");
        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .expect("dir listing")
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn local_mkdir_is_idempotent() {
        let tmp = tempdir().expect("tempdir should be created");
        let dir = tmp.path().join("plugin").join("state");

        LocalFs.mkdir(&dir).expect("first mkdir");
        LocalFs.mkdir(&dir).expect("second mkdir");
        assert!(LocalFs.exists(&dir));
    }

    #[cfg(unix)]
    #[test]
    fn local_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().expect("tempdir should be created");
        let dir = tmp.path().join("private");
        LocalFs.mkdir(&dir).expect("mkdir");
        let path = dir.join("positions.json");
        LocalFs.write(&path, "{}").expect("write");

        let file_mode = fs::metadata(&path).expect("file metadata").permissions().mode() & 0o777;
        let dir_mode = fs::metadata(&dir).expect("dir metadata").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn memory_fs_counts_writes() {
        let mem = MemoryFs::new();
        let path = Path::new("/vault/.revisit/positions.json");
        assert!(!mem.exists(path));

        mem.write(path, "{}").unwrap();
        mem.write(path, "{\"a\":{}}").unwrap();

        assert_eq!(mem.write_count(), 2);
        assert_eq!(mem.read(path).unwrap(), "{\"a\":{}}");
    }

    #[test]
    fn memory_fs_read_missing_is_not_found() {
        let error = MemoryFs::new().read(Path::new("/nope.json")).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::NotFound);
    }
}
