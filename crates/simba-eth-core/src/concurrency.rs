use crate::CoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Exclusive advisory lock guarding a workflow file against concurrent runs.
///
/// The lock lives next to the workflow as `<file>.lock` and is released on drop.
pub struct WorkflowLock {
    lock_file: File,
    path: PathBuf,
}

impl WorkflowLock {
    pub fn lock_path(workflow_path: &Path) -> PathBuf {
        let mut name = workflow_path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".lock");
        workflow_path.with_file_name(name)
    }

    /// Block until the workflow is free.
    pub fn acquire(workflow_path: &Path) -> Result<Self, CoreError> {
        let path = Self::lock_path(workflow_path);
        let file = open_lock_file(&path)?;
        file.lock_exclusive()?;
        Self::held(file, path)
    }

    /// `None` when another process is deploying the same workflow.
    pub fn try_acquire(workflow_path: &Path) -> Result<Option<Self>, CoreError> {
        let path = Self::lock_path(workflow_path);
        let file = open_lock_file(&path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Self::held(file, path).map(Some),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                debug!("{} is held by pid {:?}", path.display(), Self::holder(workflow_path));
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Pid recorded by the current or last holder of the lock.
    pub fn holder(workflow_path: &Path) -> Option<u32> {
        std::fs::read_to_string(Self::lock_path(workflow_path))
            .ok()?
            .trim()
            .parse()
            .ok()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn held(mut file: File, path: PathBuf) -> Result<Self, CoreError> {
        file.set_len(0)?;
        write!(file, "{}", std::process::id())?;
        file.flush()?;
        Ok(Self {
            lock_file: file,
            path,
        })
    }
}

fn open_lock_file(path: &Path) -> Result<File, CoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    Ok(OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)?)
}

impl Drop for WorkflowLock {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
    }
}

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// First Ctrl-C lets the current action finish, the second exits.
pub fn install_signal_handler() {
    let _ = ctrlc::set_handler(move || {
        if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            std::process::exit(130);
        }
        SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
        eprintln!("\nshutdown requested, finishing current action...");
    });
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_path_sits_next_to_workflow() {
        let path = WorkflowLock::lock_path(Path::new("/tmp/deploy/wf.json"));
        assert_eq!(path, Path::new("/tmp/deploy/wf.json.lock"));
    }

    #[test]
    fn lock_acquire_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = dir.path().join("wf.json");

        {
            let lock = WorkflowLock::acquire(&workflow).unwrap();
            assert!(lock.path().exists());
            assert_eq!(WorkflowLock::holder(&workflow), Some(std::process::id()));
        }
    }

    #[test]
    fn holder_is_none_without_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(WorkflowLock::holder(&dir.path().join("wf.json")), None);
    }

    #[test]
    fn try_acquire_returns_none_when_held() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = dir.path().join("wf.json");

        let _lock = WorkflowLock::acquire(&workflow).unwrap();
        let result = WorkflowLock::try_acquire(&workflow).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn lock_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = dir.path().join("wf.json");

        {
            let _lock = WorkflowLock::acquire(&workflow).unwrap();
        }

        let lock2 = WorkflowLock::try_acquire(&workflow).unwrap();
        assert!(lock2.is_some());
    }
}
