use super::*;
use crate::io::FsStoreIo;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

fn fast_lock(path: PathBuf) -> FileLock {
    FileLock::new(Arc::new(FsStoreIo), path).with_retry(Duration::from_millis(2), 500)
}

#[test]
fn acquire_then_release_allows_reacquire() {
    let dir = tempdir().expect("tempdir");
    let lock = fast_lock(dir.path().join("queue.json.lock"));
    {
        let _guard = lock.acquire().expect("first acquire");
    }
    let _guard = lock.acquire().expect("second acquire after release");
}

#[test]
fn second_acquire_blocks_while_held() {
    let dir = tempdir().expect("tempdir");
    let lock_path = dir.path().join("queue.json.lock");
    let lock = FileLock::new(Arc::new(FsStoreIo), &lock_path).with_retry(Duration::from_millis(5), 3);
    let _held = lock.acquire().expect("first acquire");
    let err = lock.acquire().unwrap_err();
    assert!(matches!(err, oj_core::OjError::LockTimeout { .. }));
}

#[test]
fn concurrent_with_lock_produces_no_lost_updates() {
    let dir = tempdir().expect("tempdir");
    let lock_path = dir.path().join("queue.json.lock");
    let data_path = dir.path().join("counter.txt");
    std::fs::write(&data_path, "").expect("seed counter");

    let lock = Arc::new(fast_lock(lock_path));
    let workers = 4;
    let ops = 25;
    let handles: Vec<_> = (0..workers)
        .map(|w| {
            let lock = Arc::clone(&lock);
            let data_path = data_path.clone();
            std::thread::spawn(move || {
                for i in 0..ops {
                    lock.with_lock(|| {
                        let current = std::fs::read_to_string(&data_path).unwrap_or_default();
                        let updated = format!("{current}{w}-{i}\n");
                        std::fs::write(&data_path, updated)?;
                        Ok(())
                    })
                    .expect("with_lock");
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("join");
    }

    let contents = std::fs::read_to_string(&data_path).expect("read counter");
    let ids: HashSet<&str> = contents.lines().collect();
    assert_eq!(ids.len(), workers * ops);
}

/// In-memory `StoreIo` whose `modified()` timestamp can be backdated, to
/// exercise stale-lock reclamation without waiting on a real clock.
#[derive(Default, Clone)]
struct FakeStoreIo {
    files: Arc<Mutex<HashMap<PathBuf, (Vec<u8>, std::time::SystemTime)>>>,
}

impl StoreIo for FakeStoreIo {
    fn read(&self, path: &Path) -> std::io::Result<Option<Vec<u8>>> {
        Ok(self.files.lock().unwrap().get(path).map(|(d, _)| d.clone()))
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> std::io::Result<()> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), (data.to_vec(), std::time::SystemTime::now()));
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        let mut files = self.files.lock().unwrap();
        if let Some(entry) = files.remove(from) {
            files.insert(to.to_path_buf(), entry);
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> std::io::Result<()> {
        self.files.lock().unwrap().remove(path);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn create_exclusive(&self, path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut files = self.files.lock().unwrap();
        if files.contains_key(path) {
            return Err(std::io::Error::from(std::io::ErrorKind::AlreadyExists));
        }
        files.insert(path.to_path_buf(), (data.to_vec(), std::time::SystemTime::now()));
        Ok(())
    }

    fn modified(&self, path: &Path) -> std::io::Result<std::time::SystemTime> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|(_, mtime)| *mtime)
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
    }

    fn list_dir(&self, _dir: &Path) -> std::io::Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[test]
fn stale_lock_is_reclaimed_by_mtime() {
    let io = FakeStoreIo::default();
    let path = PathBuf::from("/fake/queue.json.lock");
    io.files.lock().unwrap().insert(
        path.clone(),
        (
            b"99999".to_vec(),
            std::time::SystemTime::now() - Duration::from_secs(31),
        ),
    );

    let lock = FileLock::new(Arc::new(io), path)
        .with_stale_timeout(Duration::from_secs(30))
        .with_retry(Duration::from_millis(1), 5);
    let guard = lock.acquire().expect("reclaim stale lock");
    drop(guard);
}
