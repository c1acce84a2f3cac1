//! Atomic file operations
//!
//! Store snapshots are written through a temp file that is synced and then
//! renamed over the destination, so a crash leaves either the old file or
//! the new one, never a partial write.

use std::fs::{self, File};
use std::io;
use std::path::Path;

/// Atomically write a file using a writer function, keeping the replaced
/// file at `backup` when given
///
/// # Example
///
/// ```ignore
/// atomic_write_with("data/snapshots/latest.jsonl", None::<&Path>, |file| {
///     writeln!(file, "line1")?;
///     Ok(())
/// })?;
/// ```
pub fn atomic_write_with<P, B, F>(path: P, backup: Option<B>, write_fn: F) -> io::Result<()>
where
    P: AsRef<Path>,
    B: AsRef<Path>,
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let path = path.as_ref();
    let temp_path = path.with_extension("tmp");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(&temp_path)?;
    write_fn(&mut file)?;
    file.sync_all()?;

    if let Some(backup) = backup {
        let backup = backup.as_ref();
        if path.exists() {
            if backup.exists() {
                fs::remove_file(backup)?;
            }
            fs::rename(path, backup)?;
        }
    }

    fs::rename(&temp_path, path)
}

/// Remove `.tmp` files left behind by an interrupted write
pub fn cleanup_temp_files<P: AsRef<Path>>(dir: P) -> io::Result<usize> {
    let dir = dir.as_ref();
    let mut cleaned = 0;

    if !dir.exists() {
        return Ok(0);
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map(|e| e == "tmp").unwrap_or(false) {
            fs::remove_file(&path)?;
            cleaned += 1;
        }
    }

    Ok(cleaned)
}
