//! VM and tool configuration.
//!
//! [`VmConfig`] describes an existing VM as the hypervisor reports it.
//! [`PcfdevConfig`] holds the tool settings, loaded from environment
//! variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

/// Prefix shared by every VM this tool creates.
pub const VM_NAME_PREFIX: &str = "pcfdev-";

/// Name of the VM imported from the bundled image.
pub const DEFAULT_VM_NAME: &str = concat!("pcfdev-v", env!("CARGO_PKG_VERSION"));

/// Name of the VM imported from a user-supplied image.
pub const CUSTOM_VM_NAME: &str = "pcfdev-custom";

/// Minimum memory the platform needs to come up, in MB.
pub const MIN_MEMORY_MB: u64 = 3072;

/// Name of the port-forwarding rule for guest SSH.
pub const SSH_FORWARD_RULE: &str = "ssh";

/// Host address the SSH port is forwarded on.
pub const SSH_HOST: &str = "127.0.0.1";

/// Whether `name` is one of the names this tool manages.
pub fn is_recognized_vm_name(name: &str) -> bool {
    name == DEFAULT_VM_NAME || name == CUSTOM_VM_NAME
}

/// Configuration of an existing VM.
///
/// Assembled once per query and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmConfig {
    /// VM name
    pub name: String,
    /// Address on the host-only network
    pub ip: Ipv4Addr,
    /// Domain resolving to `ip`
    pub domain: String,
    /// Host port forwarded to guest SSH
    pub ssh_port: u16,
    /// Memory in MB
    pub memory_mb: u64,
    /// Virtual CPU count
    pub cpus: u32,
}

/// Tool settings.
#[derive(Debug, Clone)]
pub struct PcfdevConfig {
    /// VM to operate on.
    pub vm_name: String,

    /// Disk image imported when the VM does not exist.
    pub ova_path: PathBuf,

    /// Timeout for short guest commands.
    pub ssh_timeout: Duration,

    /// Timeout for the provisioning script.
    pub provision_timeout: Duration,

    /// Memory for a new VM when none is requested, in MB.
    pub default_memory_mb: u64,

    /// CPU count for a new VM when none is requested.
    pub default_cpus: u32,

    /// Services provisioned when none are requested.
    pub default_services: String,
}

/// Configuration validation error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("VM image not found: {0}")]
    MissingImage(PathBuf),

    #[error("{0} is not a PCF Dev VM name")]
    UnrecognizedVmName(String),

    #[error("default memory must be at least {MIN_MEMORY_MB} MB, got {0}")]
    InsufficientMemory(u64),

    #[error("default CPU count must be at least 1")]
    NoCpus,
}

impl Default for PcfdevConfig {
    fn default() -> Self {
        Self {
            vm_name: DEFAULT_VM_NAME.to_string(),
            ova_path: default_home().join(".pcfdev").join("ova").join("pcfdev.ova"),
            ssh_timeout: Duration::from_secs(30),
            provision_timeout: Duration::from_secs(20 * 60),
            default_memory_mb: 4096,
            default_cpus: 2,
            default_services: "default".to_string(),
        }
    }
}

fn default_home() -> PathBuf {
    std::env::var("PCFDEV_HOME")
        .or_else(|_| std::env::var("HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

impl PcfdevConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `PCFDEV_VM_NAME` | `pcfdev-v<version>` |
    /// | `PCFDEV_OVA_PATH` | `$HOME/.pcfdev/ova/pcfdev.ova` |
    /// | `PCFDEV_SSH_TIMEOUT_SECS` | `30` |
    /// | `PCFDEV_PROVISION_TIMEOUT_SECS` | `1200` |
    /// | `PCFDEV_DEFAULT_MEMORY_MB` | `4096` |
    /// | `PCFDEV_DEFAULT_CPUS` | `2` |
    /// | `PCFDEV_DEFAULT_SERVICES` | `default` |
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            vm_name: std::env::var("PCFDEV_VM_NAME").unwrap_or(default.vm_name),
            ova_path: std::env::var("PCFDEV_OVA_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.ova_path),
            ssh_timeout: std::env::var("PCFDEV_SSH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.ssh_timeout),
            provision_timeout: std::env::var("PCFDEV_PROVISION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.provision_timeout),
            default_memory_mb: std::env::var("PCFDEV_DEFAULT_MEMORY_MB")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.default_memory_mb),
            default_cpus: std::env::var("PCFDEV_DEFAULT_CPUS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.default_cpus),
            default_services: std::env::var("PCFDEV_DEFAULT_SERVICES")
                .unwrap_or(default.default_services),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_recognized_vm_name(&self.vm_name) {
            return Err(ConfigError::UnrecognizedVmName(self.vm_name.clone()));
        }
        if self.default_memory_mb < MIN_MEMORY_MB {
            return Err(ConfigError::InsufficientMemory(self.default_memory_mb));
        }
        if self.default_cpus == 0 {
            return Err(ConfigError::NoCpus);
        }
        if !self.ova_path.exists() {
            return Err(ConfigError::MissingImage(self.ova_path.clone()));
        }
        Ok(())
    }

    /// Validate configuration but only log warnings instead of failing.
    ///
    /// The image is usually downloaded after startup, so a missing image is
    /// not fatal here.
    pub fn validate_warn(&self) {
        if let Err(e) = self.validate() {
            tracing::warn!(error = %e, "Configuration problem");
        }
    }
}
