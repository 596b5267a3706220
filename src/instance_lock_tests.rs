use super::*;
use serial_test::serial;

#[test]
fn token_hash_prefix_is_deterministic_and_distinct() {
    assert_eq!(token_hash_prefix("abc"), token_hash_prefix("abc"));
    assert_ne!(token_hash_prefix("abc"), token_hash_prefix("xyz"));
    assert_eq!(token_hash_prefix("abc").len(), 16);
}

#[test]
#[serial]
fn acquire_writes_own_pid_and_release_removes_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bridge.lock");
    let lock = InstanceLock::acquire(path.clone()).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.trim().parse::<u32>().unwrap(), std::process::id());
    drop(lock);
    assert!(!path.exists());
}

#[test]
#[serial]
fn acquire_fails_when_a_live_pid_holds_the_lock() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bridge.lock");
    std::fs::write(&path, std::process::id().to_string()).unwrap();

    let err = InstanceLock::acquire(path).unwrap_err();
    assert!(matches!(err, LockError::AlreadyRunning(pid) if pid == std::process::id() as i32));
}

#[test]
#[serial]
fn acquire_removes_a_stale_lock_and_proceeds() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bridge.lock");
    // Implausibly large PID: `kill(pid, None)` fails with ESRCH since no
    // such process exists, which is exactly what "stale" means here.
    std::fs::write(&path, "2147483647").unwrap();

    let lock = InstanceLock::acquire(path.clone()).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.trim().parse::<u32>().unwrap(), std::process::id());
    drop(lock);
}
