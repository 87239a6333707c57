//! Shared collaborator set handed to every state.

use crate::config::PcfdevConfig;
use crate::host::{CertStore, CloudFoundryCli, Ui};
use crate::vbox::VBox;
use pcfdev_vm::{AddressTable, Driver, GuestShell, HostMemory, HostNetwork, Picker, Prober};
use std::sync::Arc;

/// Concrete collaborator implementations, selected at startup.
#[derive(Clone)]
pub struct Collaborators {
    /// Hypervisor driver
    pub driver: Arc<dyn Driver>,
    /// Host interface listing
    pub network: Arc<dyn HostNetwork>,
    /// Liveness probe
    pub prober: Arc<dyn Prober>,
    /// Guest command channel
    pub shell: Arc<dyn GuestShell>,
    /// Host memory accounting
    pub memory: Arc<dyn HostMemory>,
    /// Terminal
    pub ui: Arc<dyn Ui>,
    /// OS certificate store
    pub cert_store: Arc<dyn CertStore>,
    /// `cf` CLI
    pub cf: Arc<dyn CloudFoundryCli>,
}

/// Everything a state needs to carry out its operations.
pub struct Context {
    /// Hypervisor operations
    pub vbox: VBox,
    /// Address table
    pub table: Arc<AddressTable>,
    /// Guest command channel
    pub shell: Arc<dyn GuestShell>,
    /// Host memory accounting
    pub memory: Arc<dyn HostMemory>,
    /// Terminal
    pub ui: Arc<dyn Ui>,
    /// OS certificate store
    pub cert_store: Arc<dyn CertStore>,
    /// `cf` CLI
    pub cf: Arc<dyn CloudFoundryCli>,
    /// Tool settings
    pub settings: PcfdevConfig,
}

impl Context {
    /// Wire the collaborators together.
    pub fn new(settings: PcfdevConfig, table: AddressTable, collaborators: Collaborators) -> Self {
        let table = Arc::new(table);
        let picker = Picker::new(
            Arc::clone(&table),
            collaborators.network,
            collaborators.prober,
        );
        let vbox = VBox::new(collaborators.driver, picker, Arc::clone(&table));

        Self {
            vbox,
            table,
            shell: collaborators.shell,
            memory: collaborators.memory,
            ui: collaborators.ui,
            cert_store: collaborators.cert_store,
            cf: collaborators.cf,
            settings,
        }
    }
}
