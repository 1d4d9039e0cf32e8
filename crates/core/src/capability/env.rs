//! Environment readers: where device signals come from.

use std::path::Path;

use tokio::sync::watch;

use crate::AppConfig;

/// Error type for a single failed probe.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProbeError {
    #[error("signal unsupported: {0}")]
    Unsupported(&'static str),

    #[error("probe failed: {0}")]
    Failed(String),
}

/// Ambient device and accessibility signals.
///
/// Every probe is independently fallible; callers substitute defaults.
pub trait EnvironmentReader: Send + Sync {
    /// Approximate device memory in GiB, `None` if the platform hides it.
    fn device_memory_gib(&self) -> Result<Option<f64>, ProbeError>;

    /// Logical CPU core count, `None` if unknown.
    fn logical_cores(&self) -> Result<Option<u32>, ProbeError>;

    /// Try to acquire a 3D rendering context.
    fn acquire_gpu_context(&self) -> Result<bool, ProbeError>;

    /// Current reduced-motion accessibility preference.
    fn prefers_reduced_motion(&self) -> Result<bool, ProbeError>;

    /// Current dark color-scheme preference.
    fn prefers_dark(&self) -> Result<bool, ProbeError>;

    /// Live reduced-motion updates. Dropping the receiver unsubscribes.
    fn watch_reduced_motion(&self) -> watch::Receiver<bool>;
}

/// A scripted signal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal<T> {
    Present(T),
    Absent,
    Broken,
}

impl<T: Clone> Signal<T> {
    fn read(&self, name: &'static str) -> Result<Option<T>, ProbeError> {
        match self {
            Signal::Present(v) => Ok(Some(v.clone())),
            Signal::Absent => Ok(None),
            Signal::Broken => Err(ProbeError::Failed(format!("{name} probe threw"))),
        }
    }
}

/// Environment with fixed, injected signals.
///
/// Useful for tests and for hosts that already know the device signals.
#[derive(Debug)]
pub struct StaticEnvironment {
    memory: Signal<f64>,
    cores: Signal<u32>,
    gpu: Signal<bool>,
    dark: Signal<bool>,
    reduced_motion: watch::Sender<bool>,
}

impl Default for StaticEnvironment {
    fn default() -> Self {
        Self {
            memory: Signal::Present(8.0),
            cores: Signal::Present(8),
            gpu: Signal::Present(true),
            dark: Signal::Present(false),
            reduced_motion: watch::Sender::new(false),
        }
    }
}

impl StaticEnvironment {
    /// A capable device: 8 GiB, 8 cores, GPU, no reduced motion.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn memory(mut self, signal: Signal<f64>) -> Self {
        self.memory = signal;
        self
    }

    pub fn cores(mut self, signal: Signal<u32>) -> Self {
        self.cores = signal;
        self
    }

    pub fn gpu(mut self, signal: Signal<bool>) -> Self {
        self.gpu = signal;
        self
    }

    pub fn dark(mut self, signal: Signal<bool>) -> Self {
        self.dark = signal;
        self
    }

    pub fn reduced_motion(self, value: bool) -> Self {
        self.reduced_motion.send_replace(value);
        self
    }

    /// Change the reduced-motion preference, notifying subscribers.
    pub fn set_reduced_motion(&self, value: bool) {
        self.reduced_motion.send_replace(value);
    }
}

impl EnvironmentReader for StaticEnvironment {
    fn device_memory_gib(&self) -> Result<Option<f64>, ProbeError> {
        self.memory.read("device memory")
    }

    fn logical_cores(&self) -> Result<Option<u32>, ProbeError> {
        self.cores.read("logical cores")
    }

    fn acquire_gpu_context(&self) -> Result<bool, ProbeError> {
        self.gpu
            .read("gpu context")?
            .ok_or(ProbeError::Unsupported("gpu context"))
    }

    fn prefers_reduced_motion(&self) -> Result<bool, ProbeError> {
        Ok(*self.reduced_motion.borrow())
    }

    fn prefers_dark(&self) -> Result<bool, ProbeError> {
        self.dark.read("color scheme")?.ok_or(ProbeError::Unsupported("color scheme"))
    }

    fn watch_reduced_motion(&self) -> watch::Receiver<bool> {
        self.reduced_motion.subscribe()
    }
}

/// Reads signals from the machine this process runs on, with config
/// overrides taking precedence.
#[derive(Debug)]
pub struct HostEnvironment {
    memory_override: Option<f64>,
    cores_override: Option<u32>,
    gpu_override: Option<bool>,
    dark: Option<bool>,
    reduced_motion: watch::Sender<bool>,
}

impl HostEnvironment {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            memory_override: config.device_memory_gib,
            cores_override: config.logical_cores,
            gpu_override: config.gpu_rendering,
            dark: config.prefers_dark,
            reduced_motion: watch::Sender::new(config.reduced_motion.unwrap_or(false)),
        }
    }

    /// Push a new reduced-motion preference from the host.
    pub fn set_reduced_motion(&self, value: bool) {
        self.reduced_motion.send_replace(value);
    }
}

/// Parse the `MemTotal:` line of `/proc/meminfo` into GiB.
fn parse_meminfo_gib(meminfo: &str) -> Option<f64> {
    let line = meminfo.lines().find(|l| l.starts_with("MemTotal:"))?;
    let kib: f64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kib / (1024.0 * 1024.0))
}

fn has_render_node(dri: &Path) -> Result<bool, ProbeError> {
    let entries = match std::fs::read_dir(dri) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(ProbeError::Failed(e.to_string())),
    };
    Ok(entries
        .filter_map(Result::ok)
        .any(|entry| entry.file_name().to_string_lossy().starts_with("renderD")))
}

impl EnvironmentReader for HostEnvironment {
    fn device_memory_gib(&self) -> Result<Option<f64>, ProbeError> {
        if let Some(gib) = self.memory_override {
            return Ok(Some(gib));
        }
        match std::fs::read_to_string("/proc/meminfo") {
            Ok(meminfo) => Ok(parse_meminfo_gib(&meminfo)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ProbeError::Failed(e.to_string())),
        }
    }

    fn logical_cores(&self) -> Result<Option<u32>, ProbeError> {
        if let Some(cores) = self.cores_override {
            return Ok(Some(cores));
        }
        std::thread::available_parallelism()
            .map(|n| Some(u32::try_from(n.get()).unwrap_or(u32::MAX)))
            .map_err(|e| ProbeError::Failed(e.to_string()))
    }

    fn acquire_gpu_context(&self) -> Result<bool, ProbeError> {
        match self.gpu_override {
            Some(gpu) => Ok(gpu),
            None => has_render_node(Path::new("/dev/dri")),
        }
    }

    fn prefers_reduced_motion(&self) -> Result<bool, ProbeError> {
        Ok(*self.reduced_motion.borrow())
    }

    fn prefers_dark(&self) -> Result<bool, ProbeError> {
        self.dark.ok_or(ProbeError::Unsupported("color scheme"))
    }

    fn watch_reduced_motion(&self) -> watch::Receiver<bool> {
        self.reduced_motion.subscribe()
    }
}
