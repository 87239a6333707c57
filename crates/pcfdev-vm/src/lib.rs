//! # pcfdev-vm
//!
//! Collaborator interfaces and host-only network allocation for the PCF Dev
//! VM lifecycle.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pcfdev_vm::{AddressTable, HostNetwork, Picker, TcpProber};
//! use std::sync::Arc;
//!
//! # async fn example(network: Arc<dyn HostNetwork>) -> pcfdev_vm::Result<()> {
//! let table = Arc::new(AddressTable::default());
//! let picker = Picker::new(table.clone(), network, Arc::new(TcpProber::default()));
//!
//! // Pick a subnet given the adapters the hypervisor already manages
//! let (iface, _reused) = picker.select_available_interface(&[]).await?;
//! println!("{} -> {}", iface.ip, table.domain_for_ip(table.ip_for_subnet(iface.ip)));
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Address Table**: nine fixed subnets, VM addresses and domains
//! - **Picker**: collision-free subnet selection with adapter reuse
//! - **Collaborator Traits**: hypervisor driver, host network, guest shell,
//!   liveness probe, host memory

mod address;
mod driver;
mod error;
mod memory;
mod picker;
mod probe;

pub use address::{ip_for_subnet, subnet_for_ip, AddressEntry, AddressTable};
pub use driver::{
    Driver, GuestShell, HostMemory, HostNetwork, NetworkInterface, Prober, RunState, VmResources,
};
pub use error::{Result, VmError};
pub use memory::ProcMeminfo;
pub use picker::Picker;
pub use probe::{TcpProber, DEFAULT_PROBE_PORT, DEFAULT_PROBE_TIMEOUT};
