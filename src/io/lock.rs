use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Advisory lock held while a command reads, edits and saves a plan file.
///
/// The lock lives in a sibling `<file>.lock` and is taken with flock on Unix,
/// so two `fdt` invocations on the same plan never interleave their saves.
pub struct PlanLock {
    _file: File,
    path: PathBuf,
}

/// Error type for lock operations
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    CreateError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not lock {path}: another fdt process is editing this plan")]
    Timeout { path: PathBuf },
}

/// Lock file path for a plan file: `plan.fdd.json` -> `plan.fdd.json.lock`
pub fn lock_path(plan: &Path) -> PathBuf {
    let mut name: OsString = plan.file_name().map(OsString::from).unwrap_or_default();
    name.push(".lock");
    plan.with_file_name(name)
}

impl PlanLock {
    /// Lock the given plan file, waiting up to `timeout`
    pub fn acquire(plan: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = lock_path(plan);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| LockError::CreateError {
                path: path.clone(),
                source: e,
            })?;

        let start = Instant::now();
        loop {
            match try_lock(&file) {
                Ok(()) => {
                    tracing::trace!(path = %path.display(), "plan lock acquired");
                    return Ok(PlanLock { _file: file, path });
                }
                Err(_) if start.elapsed() < timeout => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(_) => return Err(LockError::Timeout { path: plan.to_path_buf() }),
            }
        }
    }

    /// Acquire with default timeout (5 seconds)
    pub fn acquire_default(plan: &Path) -> Result<Self, LockError> {
        Self::acquire(plan, Duration::from_secs(5))
    }
}

impl Drop for PlanLock {
    fn drop(&mut self) {
        // flock is released with the file handle
        let _ = fs::remove_file(&self.path);
    }
}

/// Try to take an exclusive flock without blocking
#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let fd = file.as_raw_fd();
    let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_path_is_sibling() {
        assert_eq!(
            lock_path(Path::new("/work/plan.fdd.json")),
            PathBuf::from("/work/plan.fdd.json.lock")
        );
    }

    #[test]
    fn test_acquire_and_release_lock() {
        let tmp = TempDir::new().unwrap();
        let plan = tmp.path().join("plan.fdd.json");

        let lock = PlanLock::acquire_default(&plan).unwrap();
        assert!(lock_path(&plan).exists());
        drop(lock);
        assert!(!lock_path(&plan).exists());

        assert!(PlanLock::acquire_default(&plan).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_lock_contention() {
        let tmp = TempDir::new().unwrap();
        let plan = tmp.path().join("plan.fdd.json");

        let _held = PlanLock::acquire_default(&plan).unwrap();
        let second = PlanLock::acquire(&plan, Duration::from_millis(50));
        assert!(matches!(second, Err(LockError::Timeout { .. })));
    }

    #[test]
    fn test_different_plans_do_not_contend() {
        let tmp = TempDir::new().unwrap();
        let _a = PlanLock::acquire_default(&tmp.path().join("a.fdd.json")).unwrap();
        assert!(PlanLock::acquire(&tmp.path().join("b.fdd.json"), Duration::from_millis(50)).is_ok());
    }
}
