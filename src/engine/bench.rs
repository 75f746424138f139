use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use sysinfo::{CpuExt, SystemExt};

/// A run profiler, capturing the wall-clock cost of a simulation run.
#[derive(Debug, Clone)]
pub struct Profiler {
    /// The time point where the run started.
    pub simulation_start: SystemTime,
    time_start: Instant,

    /// The wall-clock duration of the run.
    pub duration: Duration,
    /// The number of events that were fired.
    pub event_count: usize,

    /// The hardware environment of the execution.
    pub env: ProfilerEnv,
}

impl Profiler {
    /// Starts the profile.
    pub(crate) fn start(&mut self) {
        self.simulation_start = SystemTime::now();
        self.time_start = Instant::now();
    }

    /// Finishes the profile.
    pub(crate) fn finish(&mut self, event_count: usize) {
        self.event_count = event_count;
        self.duration = self.time_start.elapsed();
    }

    /// Returns the observed event throughput in events per wall-clock second.
    #[must_use]
    pub fn throughput(&self) -> f64 {
        if self.duration.is_zero() {
            0.0
        } else {
            self.event_count as f64 / self.duration.as_secs_f64()
        }
    }

    /// Appends a human-readable report to the given file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or written.
    pub fn write_to(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let f = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path.as_ref())?;
        let mut f = BufWriter::new(f);

        writeln!(f, "{{")?;
        self.env.write_to(&mut f)?;
        writeln!(
            f,
            "\t{} events ({} events/s)",
            self.event_count,
            self.throughput().floor() as usize
        )?;
        writeln!(f, "\tin {:?}", self.duration)?;
        writeln!(f, "}}")?;

        Ok(())
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self {
            simulation_start: SystemTime::now(),
            time_start: Instant::now(),
            duration: Duration::ZERO,
            event_count: 0,
            env: ProfilerEnv::default(),
        }
    }
}

/// A description of the runtime environment.
#[derive(Debug, Clone)]
pub struct ProfilerEnv {
    /// The target arch.
    pub arch: String,
    /// The target os.
    pub os: String,
    /// The target os family.
    pub os_family: String,

    system: Arc<sysinfo::System>,
}

impl ProfilerEnv {
    fn write_to(&self, f: &mut impl Write) -> std::io::Result<()> {
        writeln!(
            f,
            "\t{} / {}",
            self.system.host_name().unwrap_or("Unknown-System".into()),
            self.system.long_os_version().unwrap_or(self.os.clone())
        )?;
        writeln!(f, "\t{}-{}-{}", self.arch, self.os_family, self.os)?;
        if let Some(cpu) = self.system.cpus().first() {
            writeln!(f, "\t{} ({}) @ {}MHz", cpu.name(), cpu.brand(), cpu.frequency())?;
        }

        Ok(())
    }
}

impl PartialEq for ProfilerEnv {
    fn eq(&self, other: &Self) -> bool {
        self.arch == other.arch && self.os == other.os && self.os_family == other.os_family
    }
}

impl Eq for ProfilerEnv {}

impl Default for ProfilerEnv {
    fn default() -> Self {
        let mut system = sysinfo::System::new();
        system.refresh_cpu();
        system.refresh_memory();

        Self {
            arch: std::env::consts::ARCH.to_string(),
            os: std::env::consts::OS.to_string(),
            os_family: std::env::consts::FAMILY.to_string(),

            system: Arc::new(system),
        }
    }
}
