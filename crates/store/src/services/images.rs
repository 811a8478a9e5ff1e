//! Filesystem storage for uploaded product and part images.
//!
//! Filenames are sanitized before use. When a name is already taken, a
//! `_copy` suffix is appended before the extension, repeatedly, until the
//! name is free - so `disk.jpg` collides to `disk_copy.jpg`, and again to
//! `disk_copy_copy.jpg`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Image storage rooted at one directory (one instance per image kind).
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    /// Open an image store, creating its directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The directory this store writes into.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store image bytes, resolving filename collisions with the `_copy`
    /// suffix policy. Returns the filename actually used.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if the file cannot be written.
    pub fn save(&self, filename: &str, bytes: &[u8]) -> io::Result<String> {
        let mut name = sanitize_filename(filename);
        if name.is_empty() {
            name = "image".to_owned();
        }

        while self.root.join(&name).exists() {
            name = copy_suffixed(&name);
        }

        fs::write(self.root.join(&name), bytes)?;
        Ok(name)
    }

    /// Remove a stored image, best-effort. A missing file is not an error;
    /// other failures are logged and swallowed.
    pub fn remove(&self, filename: &str) {
        let name = sanitize_filename(filename);
        if name.is_empty() {
            return;
        }

        match fs::remove_file(self.root.join(&name)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(filename = %name, error = %e, "failed to remove image file");
            }
        }
    }
}

/// Append `_copy` before the extension: `disk.jpg` -> `disk_copy.jpg`.
/// Names without an extension get the suffix at the end.
fn copy_suffixed(name: &str) -> String {
    match name.split_once('.') {
        Some((stem, ext)) => format!("{stem}_copy.{ext}"),
        None => format!("{name}_copy"),
    }
}

/// Reduce an uploaded filename to a safe basename: path components are
/// dropped and anything outside `[A-Za-z0-9._-]` becomes `_`.
fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    // A dotfile-only or dots-only name is as good as empty.
    if cleaned.chars().all(|c| c == '.') {
        String::new()
    } else {
        cleaned
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_suffix_before_extension() {
        assert_eq!(copy_suffixed("disk.jpg"), "disk_copy.jpg");
        assert_eq!(copy_suffixed("disk_copy.jpg"), "disk_copy_copy.jpg");
        assert_eq!(copy_suffixed("noext"), "noext_copy");
    }

    #[test]
    fn test_sanitize_strips_paths_and_specials() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\photos\\pc case.png"), "pc_case.png");
        assert_eq!(sanitize_filename("ok-name_1.webp"), "ok-name_1.webp");
        assert_eq!(sanitize_filename("..."), "");
    }

    #[test]
    fn test_save_cascading_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::open(dir.path()).unwrap();

        assert_eq!(store.save("disk.jpg", b"one").unwrap(), "disk.jpg");
        assert_eq!(store.save("disk.jpg", b"two").unwrap(), "disk_copy.jpg");
        assert_eq!(store.save("disk.jpg", b"three").unwrap(), "disk_copy_copy.jpg");

        assert_eq!(fs::read(dir.path().join("disk.jpg")).unwrap(), b"one");
        assert_eq!(fs::read(dir.path().join("disk_copy.jpg")).unwrap(), b"two");
        assert_eq!(
            fs::read(dir.path().join("disk_copy_copy.jpg")).unwrap(),
            b"three"
        );
    }

    #[test]
    fn test_remove_is_best_effort() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::open(dir.path()).unwrap();

        let name = store.save("gpu.png", b"img").unwrap();
        store.remove(&name);
        assert!(!dir.path().join(&name).exists());

        // Removing again is silently fine.
        store.remove(&name);
    }
}
