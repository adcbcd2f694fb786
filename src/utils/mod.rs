pub mod env;
pub mod instantiate_run;
pub mod progress_bars;

/// Memory currently in use on the host, in MB.
pub fn get_memory_usage() -> u64 {
    use sysinfo::System;
    let mut sys = System::new();
    sys.refresh_memory();
    sys.used_memory() / (1024 * 1024)
}
