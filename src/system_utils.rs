use {std::sync::OnceLock, sysinfo::System};

static SYSTEM: OnceLock<System> = OnceLock::new();

/// Logical CPUs, used as the default hashing thread count.
pub fn get_cpu_count() -> usize {
    SYSTEM
        .get_or_init(|| {
            let mut sys = System::new();
            sys.refresh_cpu_all();
            sys
        })
        .cpus()
        .len()
        .max(1)
}
