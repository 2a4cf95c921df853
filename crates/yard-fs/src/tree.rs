//! Directory tree operations
//!
//! Copying, write-protection and removal of whole directory trees. The
//! version-control directory is treated specially: it is never copied when
//! exporting a snapshot and never write-protected.

use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Name of the version-control metadata directory.
pub const VCS_DIR: &str = ".git";

/// Recursively copy `src` into a new directory `dst`.
///
/// Entries whose file name appears in `skip` are left out at every depth.
/// Fails if `dst` already exists.
pub fn copy_tree(src: &Path, dst: &Path, skip: &[&str]) -> Result<()> {
    if dst.exists() {
        return Err(Error::DestinationExists {
            path: dst.to_path_buf(),
        });
    }
    copy_dir(src, dst, skip)
}

fn copy_dir(src: &Path, dst: &Path, skip: &[&str]) -> Result<()> {
    fs::create_dir_all(dst).map_err(|e| Error::io(dst, e))?;

    for entry in read_dir_sorted(src)? {
        let name = entry.file_name().map(|n| n.to_string_lossy().into_owned());
        if name.as_deref().is_some_and(|n| skip.contains(&n)) {
            continue;
        }
        let Some(name) = name else { continue };
        let target = dst.join(&name);

        if entry.is_dir() {
            copy_dir(&entry, &target, skip)?;
        } else {
            fs::copy(&entry, &target).map_err(|e| Error::io(&entry, e))?;
        }
    }

    Ok(())
}

/// Toggle write permission on every file below `root`.
///
/// Directories keep their permissions so checkouts and removals inside the
/// tree still work. Files inside [`VCS_DIR`] are skipped unless `include_vcs`.
pub fn set_readonly(root: &Path, readonly: bool, include_vcs: bool) -> Result<()> {
    if root.is_file() {
        return set_file_readonly(root, readonly);
    }

    for entry in read_dir_sorted(root)? {
        if entry.is_dir() {
            if !include_vcs && entry.file_name().is_some_and(|n| n == VCS_DIR) {
                continue;
            }
            set_readonly(&entry, readonly, include_vcs)?;
        } else {
            set_file_readonly(&entry, readonly)?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn set_file_readonly(path: &Path, readonly: bool) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::symlink_metadata(path).map_err(|e| Error::io(path, e))?;
    if metadata.file_type().is_symlink() {
        return Ok(());
    }
    let mode = metadata.permissions().mode();
    let new_mode = if readonly { mode & !0o222 } else { mode | 0o200 };
    if new_mode != mode {
        fs::set_permissions(path, fs::Permissions::from_mode(new_mode))
            .map_err(|e| Error::io(path, e))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_file_readonly(path: &Path, readonly: bool) -> Result<()> {
    let mut permissions = fs::metadata(path)
        .map_err(|e| Error::io(path, e))?
        .permissions();
    #[allow(clippy::permissions_set_readonly_false)]
    permissions.set_readonly(readonly);
    fs::set_permissions(path, permissions).map_err(|e| Error::io(path, e))
}

/// Check whether a file is write-protected.
pub fn is_readonly(path: &Path) -> Result<bool> {
    let metadata = fs::metadata(path).map_err(|e| Error::io(path, e))?;
    Ok(metadata.permissions().readonly())
}

/// Remove a directory tree, lifting write protection first.
///
/// A missing path is not an error.
pub fn remove_tree(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    set_readonly(path, false, true)?;
    fs::remove_dir_all(path).map_err(|e| Error::io(path, e))
}

/// Remove empty directories walking upward from `from`.
///
/// Stops at the first non-empty directory, at `boundary` (never removed) or
/// after `max_levels` removals. Returns the number of directories removed.
pub fn prune_empty_dirs(from: &Path, boundary: &Path, max_levels: usize) -> Result<usize> {
    let mut removed = 0;
    let mut current = from.to_path_buf();

    while removed < max_levels && current != boundary && current.starts_with(boundary) {
        if !current.is_dir() {
            match current.parent() {
                Some(parent) => {
                    current = parent.to_path_buf();
                    continue;
                }
                None => break,
            }
        }
        let is_empty = fs::read_dir(&current)
            .map_err(|e| Error::io(&current, e))?
            .next()
            .is_none();
        if !is_empty {
            break;
        }
        fs::remove_dir(&current).map_err(|e| Error::io(&current, e))?;
        tracing::debug!(path = %current.display(), "pruned empty directory");
        removed += 1;

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    Ok(removed)
}

/// List files below `root` whose extension is in `extensions`.
///
/// Extensions compare case-insensitively and without the leading dot. The
/// VCS directory is never entered. Results are sorted.
pub fn list_files(root: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    collect_files(root, extensions, &mut found)?;
    found.sort();
    Ok(found)
}

fn collect_files(dir: &Path, extensions: &[&str], found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in read_dir_sorted(dir)? {
        if entry.is_dir() {
            if entry.file_name().is_some_and(|n| n == VCS_DIR) {
                continue;
            }
            collect_files(&entry, extensions, found)?;
        } else if let Some(ext) = entry.extension() {
            let ext = ext.to_string_lossy().to_lowercase();
            if extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
                found.push(entry);
            }
        }
    }
    Ok(())
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| Error::io(dir, e))?
        .map(|entry| entry.map(|e| e.path()).map_err(|e| Error::io(dir, e)))
        .collect::<Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}
