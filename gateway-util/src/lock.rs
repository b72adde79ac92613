use super::dirs::get_service_dir;
use named_lock::{NamedLock, NamedLockGuard};

// Only one gateway instance may own a service directory at a time
pub fn init_process_lock(service_name: &str) -> Result<(NamedLock, NamedLockGuard), String> {
    let dir = get_service_dir(service_name);
    std::fs::create_dir_all(&dir).map_err(|e| {
        let msg = format!("Failed to create service directory {}: {}", dir.display(), e);
        println!("{}", msg);
        msg
    })?;

    let lock_name = format!("{}_lock", service_name);
    let lock = NamedLock::create(&lock_name).map_err(|e| {
        let msg = format!("Failed to create process lock {}: {}", lock_name, e);
        println!("{}", msg);
        msg
    })?;

    let guard = lock.lock().map_err(|e| {
        let msg = format!("Another {} instance is already running: {}", service_name, e);
        println!("{}", msg);
        msg
    })?;

    Ok((lock, guard))
}
