// Thread creation with optional core reservation (CPU pinning)
// Uses sched_setaffinity on Linux; elsewhere the reservation is advisory only

use std::io;
use std::thread::{self, JoinHandle};

/// A set of CPUs that threads spawned through it are pinned to.
///
/// An empty reservation places no affinity restriction on spawned threads.
#[derive(Clone, Debug, Default)]
pub struct CoreReservation {
    name: String,
    cpus: Vec<usize>,
    stack_size: Option<usize>,
}

impl CoreReservation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cpus: Vec::new(),
            stack_size: None,
        }
    }

    pub fn with_cpus(mut self, cpus: impl IntoIterator<Item = usize>) -> Self {
        self.cpus = cpus.into_iter().collect();
        self
    }

    pub fn with_stack_size(mut self, stack_size: Option<usize>) -> Self {
        self.stack_size = stack_size;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cpus(&self) -> &[usize] {
        &self.cpus
    }

    /// Spawn the `index`-th thread of this reservation.
    ///
    /// Thread names are `<reservation>-<index>`. When CPUs are reserved, the
    /// thread pins itself to the whole set before running `f`.
    pub fn spawn<F, T>(&self, index: usize, f: F) -> io::Result<JoinHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let mut builder = thread::Builder::new().name(format!("{}-{}", self.name, index));
        if let Some(size) = self.stack_size {
            builder = builder.stack_size(size);
        }

        let cpus = self.cpus.clone();
        builder.spawn(move || {
            if !cpus.is_empty() {
                if let Err(e) = pin_current_thread(&cpus) {
                    tracing::warn!(error = %e, ?cpus, "failed to pin thread; running unpinned");
                }
            }
            f()
        })
    }
}

#[cfg(target_os = "linux")]
fn pin_current_thread(cpus: &[usize]) -> io::Result<()> {
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        for &cpu in cpus {
            if cpu >= libc::CPU_SETSIZE as usize {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("CPU {} out of range", cpu),
                ));
            }
            libc::CPU_SET(cpu, &mut set);
        }
        if libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn pin_current_thread(_cpus: &[usize]) -> io::Result<()> {
    // No portable affinity API; reservation is advisory
    Ok(())
}
