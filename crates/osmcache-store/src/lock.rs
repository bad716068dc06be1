use osmcache_core::error::DiskError;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::StoreError;
use crate::layout::CacheLayout;

/// Age after which a lock is taken over on platforms without a pid check
pub const STALE_LOCK_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Exclusive writer lock for one cache location
///
/// Held by downloads and clears. Released when dropped. The lock file holds
/// the owner's pid; a lock whose owner is gone is taken over.
#[derive(Debug)]
pub struct WriteLock {
    path: PathBuf,
}

impl WriteLock {
    /// Take the lock, failing with `StoreError::Busy` if a live writer holds it
    pub fn acquire(layout: &CacheLayout) -> Result<Self, StoreError> {
        layout.ensure_root()?;
        let path = layout.lock_path();

        match create_lock(&path) {
            Ok(lock) => return Ok(lock),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(DiskError::from_io(&path, e).into()),
        }

        let Some(owner) = stale_owner(&path) else {
            return Err(StoreError::Busy { path });
        };
        if !remove_stale(&path, &owner)? {
            return Err(StoreError::Busy { path });
        }
        tracing::warn!(
            "Took over stale cache lock {} (owner: {})",
            path.display(),
            if owner.is_empty() { "unknown" } else { owner.as_str() }
        );

        match create_lock(&path) {
            Ok(lock) => Ok(lock),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StoreError::Busy { path }),
            Err(e) => Err(DiskError::from_io(&path, e).into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn create_lock(path: &Path) -> std::io::Result<WriteLock> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let _ = writeln!(file, "{}", std::process::id());
    tracing::debug!("Acquired cache write lock {}", path.display());
    Ok(WriteLock { path: path.to_path_buf() })
}

/// Contents of the lock file when its owner is gone, `None` while it is held
fn stale_owner(path: &Path) -> Option<String> {
    let contents = fs::read_to_string(path).ok()?;
    let owner = contents.trim().to_string();
    let stale = match owner.parse::<u32>() {
        Ok(pid) => !process_alive(pid).unwrap_or(true) || older_than(path, STALE_LOCK_AGE),
        Err(_) => older_than(path, STALE_LOCK_AGE),
    };
    stale.then_some(owner)
}

/// Whether `pid` is running, `None` where it cannot be told
#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> Option<bool> {
    let proc_root = Path::new("/proc");
    if !proc_root.is_dir() {
        return None;
    }
    Some(proc_root.join(pid.to_string()).exists())
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> Option<bool> {
    None
}

fn older_than(path: &Path, age: Duration) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|elapsed| elapsed > age)
}

/// Move the stale lock aside and delete it
///
/// Returns false when the file moved aside is not the one judged stale,
/// which means another writer took the lock in between; it is put back.
fn remove_stale(path: &Path, owner: &str) -> Result<bool, StoreError> {
    let aside = path.with_extension(format!("stale-{}", std::process::id()));
    match fs::rename(path, &aside) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(DiskError::from_io(path, e).into()),
    }

    let moved = fs::read_to_string(&aside).map_err(|e| DiskError::from_io(&aside, e))?;
    if moved.trim() != owner {
        fs::rename(&aside, path).map_err(|e| DiskError::from_io(path, e))?;
        return Ok(false);
    }
    fs::remove_file(&aside).map_err(|e| DiskError::from_io(&aside, e))?;
    Ok(true)
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!("Failed to release cache lock {}: {}", self.path.display(), e);
        }
    }
}
