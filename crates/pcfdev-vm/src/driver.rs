//! Interfaces to the hypervisor, the host network stack and the guest.
//!
//! Implementations live outside this crate (they shell out to the
//! hypervisor's management executable and to `ssh`). Everything in the
//! lifecycle core talks to them only through these traits.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

/// A host-only network adapter, either present on the host or to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    /// Host-assigned name (e.g. `vboxnet0`); empty until created
    pub name: String,
    /// Host side address of the adapter
    pub ip: Ipv4Addr,
    /// Hardware address, if known
    pub hardware_address: String,
    /// Whether the adapter already exists on the host
    pub exists: bool,
}

impl NetworkInterface {
    /// An adapter that is already configured on the host.
    pub fn existing(name: impl Into<String>, ip: Ipv4Addr) -> Self {
        Self {
            name: name.into(),
            ip,
            hardware_address: String::new(),
            exists: true,
        }
    }

    /// An adapter that still has to be created.
    pub fn to_create(ip: Ipv4Addr) -> Self {
        Self {
            name: String::new(),
            ip,
            hardware_address: String::new(),
            exists: false,
        }
    }
}

/// Run state as reported by the hypervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Powered on
    Running,
    /// State saved to disk by a suspend request
    Suspended,
    /// State saved to disk outside of a suspend request (host shutdown, GUI)
    Saved,
    /// Execution paused, memory still resident
    Paused,
    /// Cleanly powered off
    PoweredOff,
    /// Powered off without a clean shutdown
    Aborted,
    /// Anything else the hypervisor reports
    Unknown(String),
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Running => write!(f, "running"),
            RunState::Suspended => write!(f, "suspended"),
            RunState::Saved => write!(f, "saved"),
            RunState::Paused => write!(f, "paused"),
            RunState::PoweredOff => write!(f, "poweroff"),
            RunState::Aborted => write!(f, "aborted"),
            RunState::Unknown(s) => write!(f, "{s}"),
        }
    }
}

/// Memory and CPU allocated to a VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmResources {
    /// Memory in MB
    pub memory_mb: u64,
    /// Virtual CPU count
    pub cpus: u32,
}

/// Hypervisor driver.
///
/// One implementation per hypervisor; the lifecycle core is agnostic of
/// which one is selected.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Power on a VM.
    async fn start_vm(&self, name: &str) -> Result<()>;

    /// Power off a VM.
    async fn stop_vm(&self, name: &str) -> Result<()>;

    /// Save VM state to disk and power it off.
    async fn suspend_vm(&self, name: &str) -> Result<()>;

    /// Restore a VM from its saved state.
    async fn resume_vm(&self, name: &str) -> Result<()>;

    /// Unregister a VM and delete its disks.
    async fn destroy_vm(&self, name: &str) -> Result<()>;

    /// Whether a VM registration with this name exists.
    async fn vm_exists(&self, name: &str) -> Result<bool>;

    /// Whether the VM is powered on.
    async fn is_vm_running(&self, name: &str) -> Result<bool>;

    /// Detailed run state.
    async fn vm_state(&self, name: &str) -> Result<RunState>;

    /// Address the VM was configured with.
    async fn get_vm_ip(&self, name: &str) -> Result<Ipv4Addr>;

    /// Host port of the named port-forwarding rule.
    async fn get_host_forward_port(&self, name: &str, rule_name: &str) -> Result<u16>;

    /// Memory and CPU configured for the VM.
    async fn get_vm_resources(&self, name: &str) -> Result<VmResources>;

    /// Host-only adapters known to the hypervisor.
    async fn get_host_only_interfaces(&self) -> Result<Vec<NetworkInterface>>;

    /// Create a host-only adapter at `ip`, returning its name.
    async fn create_host_only_interface(&self, ip: Ipv4Addr) -> Result<String>;

    /// Attach the named host-only adapter to the VM.
    async fn attach_network_interface(&self, interface_name: &str, name: &str) -> Result<()>;

    /// Register a VM from a disk image.
    async fn import_vm(&self, name: &str, image_path: &Path) -> Result<()>;

    /// Set memory and CPU for a powered-off VM.
    async fn configure_vm(&self, name: &str, resources: VmResources) -> Result<()>;

    /// Add a NAT port-forwarding rule from `host_port` to `guest_port`.
    async fn forward_port(
        &self,
        name: &str,
        rule_name: &str,
        host_port: u16,
        guest_port: u16,
    ) -> Result<()>;

    /// Names of all registered VMs.
    async fn list_vms(&self) -> Result<Vec<String>>;

    /// Free-form hypervisor description of a VM, for diagnostics.
    async fn vm_info(&self, name: &str) -> Result<String>;
}

/// Addresses configured on the host's network interfaces, hypervisor
/// managed or not.
#[async_trait]
pub trait HostNetwork: Send + Sync {
    /// All interfaces currently configured on the host.
    async fn interfaces(&self) -> Result<Vec<NetworkInterface>>;
}

/// Best-effort reachability check.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Whether anything answers at `ip`.
    async fn try_ip(&self, ip: Ipv4Addr) -> Result<bool>;
}

/// Command channel into the guest.
#[async_trait]
pub trait GuestShell: Send + Sync {
    /// Run a command, discarding its output.
    async fn run_command(&self, command: &str, host: &str, port: u16, timeout: Duration)
        -> Result<()>;

    /// Run a command and capture its standard output.
    async fn get_output(
        &self,
        command: &str,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<String>;

    /// Open an interactive session, returning once the user exits.
    async fn start_session(&self, host: &str, port: u16, timeout: Duration) -> Result<()>;
}

/// Host memory accounting.
#[async_trait]
pub trait HostMemory: Send + Sync {
    /// Memory currently available for new allocations, in MB.
    async fn free_memory_mb(&self) -> Result<u64>;

    /// Total physical memory, in MB.
    async fn total_memory_mb(&self) -> Result<u64>;
}
