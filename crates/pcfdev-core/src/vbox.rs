//! Hypervisor-level operations composed from driver primitives.
//!
//! This is where a disk image becomes a registered VM: a host-only subnet is
//! chosen by the [`Picker`], the adapter is created or reused, resources are
//! applied and the guest SSH port is forwarded.

use crate::config::{VmConfig, SSH_FORWARD_RULE, VM_NAME_PREFIX};
use pcfdev_vm::{AddressTable, Driver, Picker, Result, RunState, VmResources};
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Guest port SSH listens on.
const GUEST_SSH_PORT: u16 = 22;

/// Everything needed to import a VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Memory and CPUs to configure
    pub resources: VmResources,
    /// Subnet requested by the user; picked automatically when `None`
    pub subnet: Option<Ipv4Addr>,
}

/// Hypervisor operations on PCF Dev VMs.
pub struct VBox {
    driver: Arc<dyn Driver>,
    picker: Picker,
    table: Arc<AddressTable>,
}

impl VBox {
    /// Create a new VBox over the given driver.
    pub fn new(driver: Arc<dyn Driver>, picker: Picker, table: Arc<AddressTable>) -> Self {
        Self {
            driver,
            picker,
            table,
        }
    }

    /// The underlying driver.
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Whether a VM named `name` is registered.
    pub async fn vm_exists(&self, name: &str) -> Result<bool> {
        self.driver.vm_exists(name).await
    }

    /// Hypervisor run state of `name`.
    pub async fn vm_state(&self, name: &str) -> Result<RunState> {
        self.driver.vm_state(name).await
    }

    /// Assemble the configuration of an existing VM.
    pub async fn vm_config(&self, name: &str) -> Result<VmConfig> {
        let ip = self.driver.get_vm_ip(name).await?;
        let ssh_port = self
            .driver
            .get_host_forward_port(name, SSH_FORWARD_RULE)
            .await?;
        let resources = self.driver.get_vm_resources(name).await?;

        Ok(VmConfig {
            name: name.to_string(),
            ip,
            domain: self.table.domain_for_ip(ip),
            ssh_port,
            memory_mb: resources.memory_mb,
            cpus: resources.cpus,
        })
    }

    /// Whether another PCF Dev VM, not named `name`, is running.
    pub async fn conflicting_vm_present(&self, name: &str) -> Result<bool> {
        for other in self.driver.list_vms().await? {
            if other == name || !other.starts_with(VM_NAME_PREFIX) {
                continue;
            }
            if self.driver.is_vm_running(&other).await? {
                tracing::warn!(vm = %name, conflicting = %other, "Conflicting VM is running");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Register `name` from `image_path` and wire up its networking.
    pub async fn import_vm(&self, name: &str, image_path: &Path, spec: &ImportSpec) -> Result<()> {
        let start = std::time::Instant::now();
        tracing::info!(
            vm = %name,
            image = %image_path.display(),
            memory_mb = spec.resources.memory_mb,
            cpus = spec.resources.cpus,
            "Importing VM"
        );

        let candidates = self.driver.get_host_only_interfaces().await?;
        let (iface, _) = match spec.subnet {
            Some(subnet) => {
                self.picker
                    .select_requested_interface(subnet, &candidates)
                    .await?
            }
            None => self.picker.select_available_interface(&candidates).await?,
        };

        let iface_name = if iface.exists {
            iface.name.clone()
        } else {
            let created = self.driver.create_host_only_interface(iface.ip).await?;
            tracing::debug!(vm = %name, interface = %created, ip = %iface.ip, "Created host-only interface");
            created
        };

        self.driver.import_vm(name, image_path).await?;
        let ssh_port = match self.finish_import(name, &iface_name, spec).await {
            Ok(port) => port,
            Err(e) => {
                tracing::error!(vm = %name, error = %e, "Import failed, removing VM");
                if let Err(cleanup) = self.driver.destroy_vm(name).await {
                    tracing::warn!(vm = %name, error = %cleanup, "Failed to remove partial VM");
                }
                return Err(e);
            }
        };

        tracing::info!(
            vm = %name,
            interface = %iface_name,
            ip = %self.table.ip_for_subnet(iface.ip),
            ssh_port,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "VM imported"
        );
        Ok(())
    }

    /// Configure a freshly imported VM and forward its SSH port.
    async fn finish_import(&self, name: &str, iface_name: &str, spec: &ImportSpec) -> Result<u16> {
        self.driver.configure_vm(name, spec.resources).await?;
        self.driver.attach_network_interface(iface_name, name).await?;

        let ssh_port = free_port().await?;
        self.driver
            .forward_port(name, SSH_FORWARD_RULE, ssh_port, GUEST_SSH_PORT)
            .await?;
        Ok(ssh_port)
    }

    /// Power on the VM.
    pub async fn start_vm(&self, config: &VmConfig) -> Result<()> {
        tracing::info!(vm = %config.name, ip = %config.ip, "Starting VM");
        self.driver.start_vm(&config.name).await
    }

    /// Power off the VM.
    pub async fn stop_vm(&self, config: &VmConfig) -> Result<()> {
        tracing::info!(vm = %config.name, "Stopping VM");
        self.driver.stop_vm(&config.name).await
    }

    /// Save the VM state to disk.
    pub async fn suspend_vm(&self, config: &VmConfig) -> Result<()> {
        tracing::info!(vm = %config.name, "Suspending VM");
        self.driver.suspend_vm(&config.name).await
    }

    /// Restore the VM from its saved state.
    pub async fn resume_vm(&self, config: &VmConfig) -> Result<()> {
        tracing::info!(vm = %config.name, "Resuming VM");
        self.driver.resume_vm(&config.name).await
    }

    /// Remove the VM.
    pub async fn destroy_vm(&self, config: &VmConfig) -> Result<()> {
        tracing::info!(vm = %config.name, "Destroying VM");
        self.driver.destroy_vm(&config.name).await
    }

    /// Destroy every PCF Dev VM regardless of state.
    ///
    /// Running VMs are powered off first. Keeps going after a failure and
    /// returns the first error.
    pub async fn destroy_pcfdev_vms(&self) -> Result<()> {
        let mut first_error = None;

        for name in self.driver.list_vms().await? {
            if !name.starts_with(VM_NAME_PREFIX) {
                continue;
            }
            tracing::info!(vm = %name, "Destroying PCF Dev VM");

            let result = async {
                if self.driver.is_vm_running(&name).await? {
                    self.driver.stop_vm(&name).await?;
                }
                self.driver.destroy_vm(&name).await
            }
            .await;

            if let Err(e) = result {
                tracing::error!(vm = %name, error = %e, "Failed to destroy VM");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// An unused local TCP port.
async fn free_port() -> Result<u16> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
    Ok(listener.local_addr()?.port())
}
