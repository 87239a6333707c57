//! # pcfdev-core
//!
//! Lifecycle state machine for the PCF Dev virtual machine.
//!
//! The hypervisor is the only source of truth. Every command asks the
//! [`VmFactory`] for the current state of the VM, calls one operation on the
//! returned [`Vm`], and exits. Nothing is persisted in between.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   pcfdev-core (host)                     │
//! ├──────────────────────────────────────────────────────────┤
//! │                                                          │
//! │  ┌─────────────────┐     ┌──────────────────────────┐    │
//! │  │   VmFactory     │────▶│  Vm                      │    │
//! │  │   - vm(name)    │     │  NotCreated | Stopped |  │    │
//! │  └─────────────────┘     │  Running | Suspended |   │    │
//! │           │              │  Paused | Saved |        │    │
//! │           │              │  Aborted | Unprovisioned │    │
//! │           │              │  | Recoverable | Invalid │    │
//! │           ▼              └──────────────────────────┘    │
//! │  ┌─────────────────┐                │                    │
//! │  │     VBox        │◀───────────────┘                    │
//! │  │  - import_vm()  │     ┌──────────────────────────┐    │
//! │  │  - start_vm()   │────▶│  Picker + AddressTable   │    │
//! │  └─────────────────┘     │  (from pcfdev-vm)        │    │
//! │           │              └──────────────────────────┘    │
//! └───────────┼──────────────────────────────────────────────┘
//!             ▼
//!     Driver / GuestShell / Ui collaborators
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use pcfdev_core::{Collaborators, Context, PcfdevConfig, StartOpts, VmFactory};
//! use pcfdev_vm::AddressTable;
//! use std::sync::Arc;
//!
//! # async fn example(collaborators: Collaborators) -> pcfdev_core::Result<()> {
//! let settings = PcfdevConfig::from_env();
//! let ctx = Arc::new(Context::new(settings.clone(), AddressTable::default(), collaborators));
//! let factory = VmFactory::new(ctx);
//!
//! let vm = factory.vm(&settings.vm_name).await?;
//! let opts = StartOpts::builder().memory_mb(6144).build()?;
//! vm.verify_start_opts(&opts).await?;
//! vm.start(&opts).await?;
//!
//! println!("{}", factory.vm(&settings.vm_name).await?.status());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
mod debug;
pub mod error;
pub mod factory;
pub mod host;
pub mod opts;
pub mod provision;
pub mod state;
pub mod vbox;

#[cfg(test)]
mod testutil;

pub use config::{
    ConfigError, PcfdevConfig, VmConfig, CUSTOM_VM_NAME, DEFAULT_VM_NAME, MIN_MEMORY_MB,
};
pub use context::{Collaborators, Context};
pub use error::{CoreError, Result};
pub use factory::VmFactory;
pub use host::{CertStore, CloudFoundryCli, Ui};
pub use opts::{StartOpts, StartOptsBuilder};
pub use provision::ProvisionOptions;
pub use state::{Operation, StateKind, Vm};
pub use vbox::{ImportSpec, VBox};
