use daemonize::Daemonize;
use std::fs::File;

/// Detaches the process before any runtime threads exist. Output goes to
/// /dev/null, the pid file and working directory live in the service dir.
pub fn daemonize_process(service_name: &str) -> Result<(), String> {
    let root_dir = gateway_util::get_service_dir(service_name);
    if !root_dir.exists() {
        std::fs::create_dir_all(&root_dir).map_err(|e| {
            let msg = format!(
                "Failed to create service directory {}: {}",
                root_dir.display(),
                e
            );
            println!("{}", msg);
            msg
        })?;
    }

    let open_null = || {
        File::open("/dev/null").map_err(|e| {
            let msg = format!("Failed to open /dev/null: {}", e);
            println!("{}", msg);
            msg
        })
    };

    let pid_file = root_dir.join(format!("{}.pid", service_name));
    let daemonize = Daemonize::new()
        .pid_file(pid_file)
        .chown_pid_file(true)
        .stdout(open_null()?)
        .stderr(open_null()?)
        .working_directory(root_dir);

    daemonize.start().map_err(|e| {
        let msg = format!("Error daemonizing {} service: {}", service_name, e);
        println!("{}", msg);
        msg
    })?;

    Ok(())
}
